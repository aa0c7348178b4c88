//! `avr-stack`: report the worst-case stack usage of an Intel HEX image

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use avr_stack::{AnalysisConfig, FirmwareMemory, RevisitPolicy, StackAnalysis};
use clap::{ArgAction, Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "avr-stack", version)]
#[command(about = "Static worst-case stack usage of AVR firmware", long_about = None)]
struct Args {
    /// Intel HEX firmware image
    file: PathBuf,

    /// Explored steps before the result is declared unbounded
    #[arg(long, default_value_t = AnalysisConfig::DEFAULT.max_steps)]
    max_steps: u64,

    /// States on one path before the result is declared unbounded
    #[arg(long, default_value_t = AnalysisConfig::DEFAULT.max_depth)]
    max_depth: usize,

    /// Bytes pushed by CALL/RCALL (3 on devices with a 22-bit PC)
    #[arg(long, default_value_t = AnalysisConfig::DEFAULT.return_address_bytes)]
    return_address_bytes: u8,

    /// How states reached again are treated
    #[arg(long, value_enum, default_value_t = Revisit::HigherHeight)]
    revisit: Revisit,

    /// Entry point word address (decimal or 0x-prefixed)
    #[arg(long, default_value = "0", value_parser = parse_address)]
    entry: u32,

    /// Print the report as JSON
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Revisit {
    FirstVisit,
    HigherHeight,
}

impl From<Revisit> for RevisitPolicy {
    fn from(revisit: Revisit) -> Self {
        match revisit {
            Revisit::FirstVisit => RevisitPolicy::FirstVisit,
            Revisit::HigherHeight => RevisitPolicy::HigherHeight,
        }
    }
}

fn parse_address(text: &str) -> std::result::Result<u32, String> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|e| format!("invalid address '{}': {}", text, e))
}

impl Args {
    fn config(&self) -> Result<AnalysisConfig> {
        AnalysisConfig::new(
            self.entry,
            self.max_steps,
            self.max_depth,
            self.return_address_bytes,
            self.revisit.into(),
        )
        .context("invalid analysis options")
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &Args) -> Result<()> {
    let config = args.config()?;

    let text = fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let memory = FirmwareMemory::parse_hex(&text)
        .with_context(|| format!("failed to load {}", args.file.display()))?;

    tracing::debug!("Loaded {} bytes from {}", memory.len(), args.file.display());

    let report = StackAnalysis::new(memory, config)
        .analyze()
        .with_context(|| format!("failed to analyze {}", args.file.display()))?;

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("failed to serialize report")?;
        println!("{}", json);
    } else {
        print!("{}", report);
    }

    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_defaults_match_library() {
        let args = Args::try_parse_from(["avr-stack", "fw.hex"]).unwrap();
        assert_eq!(args.config().unwrap(), AnalysisConfig::default());
        assert!(!args.json);
        assert_eq!(args.verbose, 0);
    }

    #[test]
    fn test_options() {
        let args = Args::try_parse_from([
            "avr-stack",
            "fw.hex",
            "--max-steps",
            "10",
            "--max-depth",
            "5",
            "--return-address-bytes",
            "3",
            "--revisit",
            "first-visit",
            "--entry",
            "0x34",
            "--json",
            "-vv",
        ])
        .unwrap();

        let config = args.config().unwrap();
        assert_eq!(config.entry_point, 0x34);
        assert_eq!(config.max_steps, 10);
        assert_eq!(config.max_depth, 5);
        assert_eq!(config.return_address_bytes, 3);
        assert_eq!(config.revisit, RevisitPolicy::FirstVisit);
        assert!(args.json);
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_invalid_options() {
        let args = Args::try_parse_from(["avr-stack", "fw.hex", "--return-address-bytes", "4"])
            .unwrap();
        assert!(args.config().is_err());

        assert!(Args::try_parse_from(["avr-stack", "fw.hex", "--entry", "0xZZ"]).is_err());
        assert!(Args::try_parse_from(["avr-stack", "fw.hex", "--revisit", "always"]).is_err());
    }

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("52"), Ok(52));
        assert_eq!(parse_address("0x34"), Ok(0x34));
        assert_eq!(parse_address("0X1f"), Ok(0x1F));
        assert!(parse_address("-1").is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let args = Args::try_parse_from(["avr-stack", "/nonexistent/fw.hex"]).unwrap();
        let err = run(&args).unwrap_err();
        assert!(format!("{:#}", err).contains("failed to read /nonexistent/fw.hex"));
    }
}
