//! FlashRESP - A Bitmap-Driven RESP Command Parser
//!
//! This is the command-line front end. It reads pipelined RESP commands from
//! a file or stdin, parses them with the bitmap parser, and prints one line
//! per command.

use anyhow::Context;
use flashresp::commands::{CommandTable, PassThrough, ResolveCommand};
use flashresp::connection::{CommandReader, ReaderConfig, ReaderStats};
use flashresp::protocol::{CommandParser, ParserConfig};
use flashresp::scan::Kernel;
use std::fmt::Write as _;
use std::time::Instant;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncWriteExt, BufWriter};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Command-line configuration
struct Config {
    /// Input file; stdin when absent
    input: Option<String>,
    /// Scan kernel
    kernel: Kernel,
    /// Initial slot array size
    slots: usize,
    /// Reject leading zeros in count and length fields
    strict: bool,
    /// Accept command names outside the built-in table
    any_command: bool,
    /// Only print the summary
    quiet: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: None,
            kernel: Kernel::detect(),
            slots: ReaderConfig::default().initial_slots,
            strict: false,
            any_command: false,
            quiet: false,
        }
    }
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> Self {
        let mut config = Config::default();
        let args: Vec<String> = std::env::args().collect();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--kernel" | "-k" => {
                    if i + 1 < args.len() {
                        config.kernel = match args[i + 1].as_str() {
                            "auto" => Kernel::detect(),
                            name => name.parse().unwrap_or_else(|e| {
                                eprintln!("Error: {}", e);
                                std::process::exit(1);
                            }),
                        };
                        i += 2;
                    } else {
                        eprintln!("Error: --kernel requires a value");
                        std::process::exit(1);
                    }
                }
                "--slots" | "-s" => {
                    if i + 1 < args.len() {
                        config.slots = args[i + 1].parse().unwrap_or_else(|_| {
                            eprintln!("Error: invalid slot count");
                            std::process::exit(1);
                        });
                        i += 2;
                    } else {
                        eprintln!("Error: --slots requires a value");
                        std::process::exit(1);
                    }
                }
                "--strict" => {
                    config.strict = true;
                    i += 1;
                }
                "--any-command" => {
                    config.any_command = true;
                    i += 1;
                }
                "--quiet" | "-q" => {
                    config.quiet = true;
                    i += 1;
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("FlashRESP version {}", flashresp::VERSION);
                    std::process::exit(0);
                }
                arg if !arg.starts_with('-') && config.input.is_none() => {
                    config.input = Some(arg.to_string());
                    i += 1;
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                    print_help();
                    std::process::exit(1);
                }
            }
        }

        config
    }

    fn reader_config(&self) -> ReaderConfig {
        ReaderConfig {
            initial_slots: self.slots,
            kernel: self.kernel,
            ..ReaderConfig::default()
        }
    }

    fn parser_config(&self) -> ParserConfig {
        ParserConfig {
            strict_numbers: self.strict,
            ..ParserConfig::default()
        }
    }
}

fn print_help() {
    let kernels: Vec<&str> = Kernel::available().into_iter().map(Kernel::name).collect();
    println!(
        r#"
FlashRESP - A Bitmap-Driven RESP Command Parser

USAGE:
    flashresp [OPTIONS] [FILE]

Reads pipelined RESP commands from FILE (or stdin) and prints one line per
command.

OPTIONS:
    -k, --kernel <NAME>   Scan kernel: auto, {} (default: auto)
    -s, --slots <N>       Initial slot array size (default: 64)
        --strict          Reject leading zeros in count and length fields
        --any-command     Accept command names outside the built-in table
    -q, --quiet           Only print the summary
    -v, --version         Print version information
    -h, --help            Print this help message

EXAMPLES:
    printf '*1\r\n$4\r\nPING\r\n' | flashresp
    flashresp --kernel scalar capture.resp
    RUST_LOG=trace flashresp --quiet capture.resp
"#,
        kernels.join(", ")
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = Config::from_args();

    // Set up logging; stdout carries the parsed commands
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let input: Box<dyn AsyncRead + Unpin + Send> = match &config.input {
        Some(path) => Box::new(
            File::open(path)
                .await
                .with_context(|| format!("failed to open {}", path))?,
        ),
        None => Box::new(tokio::io::stdin()),
    };
    debug!(kernel = %config.kernel, slots = config.slots, "Starting reader");

    let started = Instant::now();
    let stats = if config.any_command {
        let parser = CommandParser::with_resolver(PassThrough).with_config(config.parser_config());
        run(CommandReader::with_parser(input, config.reader_config(), parser), config.quiet).await?
    } else {
        let parser = CommandParser::with_resolver(CommandTable).with_config(config.parser_config());
        run(CommandReader::with_parser(input, config.reader_config(), parser), config.quiet).await?
    };

    let elapsed = started.elapsed();
    let mib_per_sec = stats.bytes_read as f64 / (1024.0 * 1024.0) / elapsed.as_secs_f64().max(1e-9);
    info!(
        commands = stats.commands,
        batches = stats.batches,
        bytes = stats.bytes_read,
        rescanned = stats.rescanned_bytes,
        elapsed_ms = elapsed.as_millis() as u64,
        "Parsed {} commands ({:.1} MiB/s)",
        stats.commands,
        mib_per_sec
    );

    Ok(())
}

/// Prints every command the reader produces.
async fn run<R, C>(mut reader: CommandReader<R, C>, quiet: bool) -> anyhow::Result<ReaderStats>
where
    R: AsyncRead + Unpin,
    C: ResolveCommand,
{
    let mut out = BufWriter::new(tokio::io::stdout());
    let mut line = String::new();

    while let Some(batch) = reader.next_batch().await? {
        if quiet {
            continue;
        }
        for command in batch {
            line.clear();
            write!(line, "{}", command.name().escape_ascii())?;
            for arg in command.args() {
                write!(line, " \"{}\"", arg.escape_ascii())?;
            }
            line.push('\n');
            out.write_all(line.as_bytes()).await?;
        }
    }

    out.flush().await?;
    Ok(reader.stats())
}
