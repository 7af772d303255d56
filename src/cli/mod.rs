//! Command-line interface for offline artifact inspection.

pub mod commands;

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "emu-dispatch", version, about = "Inspect, encode and decode calls for emulated contracts")]
pub struct Cli {
    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file (defaults to ./emulator-dispatch.toml when present)
    #[arg(long, global = true, env = "EMULATOR_DISPATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding <name>.abi / <name>.bin artifacts
    #[arg(long, global = true)]
    pub artifacts: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            return Verbosity::Quiet;
        }
        match self.verbose {
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            _ => Verbosity::Trace,
        }
    }

    /// Shared options every command needs to locate artifacts.
    pub fn global(&self) -> GlobalArgs {
        GlobalArgs {
            config: self.config.clone(),
            artifacts: self.artifacts.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    Trace,
}

impl Verbosity {
    pub fn to_log_level(self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "info",
            Verbosity::Trace => "debug",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GlobalArgs {
    pub config: Option<PathBuf>,
    pub artifacts: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the functions of a compiled contract
    Inspect(InspectArgs),
    /// ABI-encode a call to a contract function
    Encode(EncodeArgs),
    /// Decode the return data of a contract function
    Decode(DecodeArgs),
}

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Contract name, e.g. `Counter` for Counter.abi / Counter.bin
    pub contract: String,

    /// Print the function table as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct EncodeArgs {
    pub contract: String,

    pub function: String,

    /// Arguments as a JSON array (positional) or object (named)
    #[arg(long)]
    pub args: Option<String>,
}

#[derive(Debug, Args)]
pub struct DecodeArgs {
    pub contract: String,

    /// Function name, or its signature (`add(uint256,uint256)`) when overloaded
    pub function: String,

    /// Hex-encoded return data, with or without 0x
    pub data: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_levels() {
        let cli = Cli::parse_from(["emu-dispatch", "-vv", "inspect", "Counter"]);
        assert_eq!(cli.verbosity(), Verbosity::Trace);
        let cli = Cli::parse_from(["emu-dispatch", "-q", "inspect", "Counter"]);
        assert_eq!(cli.verbosity().to_log_level(), "error");
    }

    #[test]
    fn parses_encode_args() {
        let cli = Cli::parse_from([
            "emu-dispatch",
            "--artifacts",
            "out",
            "encode",
            "Counter",
            "increment",
            "--args",
            "[5]",
        ]);
        let Commands::Encode(args) = cli.command else {
            panic!("expected encode");
        };
        assert_eq!(args.function, "increment");
        assert_eq!(args.args.as_deref(), Some("[5]"));
        assert_eq!(cli.artifacts, Some(PathBuf::from("out")));
    }
}
