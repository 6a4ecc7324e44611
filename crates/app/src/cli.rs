use anyhow::Result;
use clap::{Parser, Subcommand};
use vision::pipeline::{AnalyzeCliArgs, AnalyzeConfig, PipelineCliArgs, PipelineConfig};

use crate::{live, still};

/// Live frame analysis with overlays written as JSON lines.
#[derive(Debug, Parser)]
#[command(name = "framelens", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Stream frames through the analysis pipeline.
    Live(PipelineCliArgs),
    /// Analyse a single image and print its overlay.
    Analyze(AnalyzeCliArgs),
}

pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Live(args) => live::run(PipelineConfig::try_from(args)?),
        Command::Analyze(args) => still::run(AnalyzeConfig::try_from(args)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_both_subcommands() {
        let cli = Cli::try_parse_from(["framelens", "live", "--mode", "classify"]).unwrap();
        assert!(matches!(cli.command, Command::Live(_)));

        let cli = Cli::try_parse_from([
            "framelens",
            "analyze",
            "desk.png",
            "--device-orientation",
            "landscape-right",
        ])
        .unwrap();
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.image.to_str(), Some("desk.png"));
    }
}
