//! CLI argument definitions.

use crate::config::{FeatureLayout, OutputFormat};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Compute audio fingerprint embeddings with a remote `neuralfp` model.
#[derive(Debug, Parser)]
#[command(name = "fpembed")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Input files or directories to embed.
    pub inputs: Vec<PathBuf>,

    /// Common options for embedding.
    #[command(flatten)]
    pub embed: EmbedArgs,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage configuration.
    Config {
        /// Configuration action to perform.
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Check server and model readiness.
    Health,
    /// Compute features for one file without contacting the server.
    Features {
        /// Audio file to analyze.
        file: PathBuf,
        /// Output path (default: `<stem>.features.json` next to the input).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Config subcommand actions.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Create default configuration file.
    Init,
    /// Display current configuration.
    Show,
    /// Print configuration file path.
    Path,
}

/// Arguments for embedding files.
#[derive(Debug, Args)]
#[allow(clippy::struct_excessive_bools)]
pub struct EmbedArgs {
    /// Inference server address (`host:port` or URL).
    #[arg(short, long, global = true, env = "FPEMBED_SERVER")]
    pub server: Option<String>,

    /// Model name on the server.
    #[arg(short, long, global = true, env = "FPEMBED_MODEL")]
    pub model: Option<String>,

    /// Request timeout in seconds.
    #[arg(long, global = true, env = "FPEMBED_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Maximum number of feature tensors per request.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..), env = "FPEMBED_CHUNK_SIZE")]
    pub chunk_size: Option<u64>,

    /// Feature axis order.
    #[arg(long, value_enum, global = true, env = "FPEMBED_LAYOUT")]
    pub layout: Option<FeatureLayout>,

    /// Output formats (comma-separated: json,csv).
    #[arg(short, long, value_delimiter = ',', env = "FPEMBED_FORMAT")]
    pub format: Option<Vec<OutputFormat>>,

    /// Output directory (default: same as input).
    #[arg(short, long, env = "FPEMBED_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Resample audio whose sample rate differs from the model's.
    #[arg(long, global = true)]
    pub resample: bool,

    /// Reprocess files even if output exists.
    #[arg(long)]
    pub force: bool,

    /// Stop on first error.
    #[arg(long)]
    pub fail_fast: bool,

    /// Hide progress bars.
    #[arg(long)]
    pub no_progress: bool,

    /// Only print warnings and errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase verbosity (-v: debug, -vv: trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_simple() {
        let cli = Cli::try_parse_from(["fpembed", "test.wav"]).unwrap();
        assert_eq!(cli.inputs.len(), 1);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_parse_with_options() {
        let cli = Cli::try_parse_from([
            "fpembed",
            "a.wav",
            "b.flac",
            "-s",
            "triton:8000",
            "--chunk-size",
            "256",
            "-f",
            "json,csv",
            "--layout",
            "frames-first",
            "-q",
        ])
        .unwrap();
        assert_eq!(cli.inputs.len(), 2);
        assert_eq!(cli.embed.server.as_deref(), Some("triton:8000"));
        assert_eq!(cli.embed.chunk_size, Some(256));
        assert_eq!(
            cli.embed.format,
            Some(vec![OutputFormat::Json, OutputFormat::Csv])
        );
        assert_eq!(cli.embed.layout, Some(FeatureLayout::FramesFirst));
        assert!(cli.embed.quiet);
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        assert!(Cli::try_parse_from(["fpembed", "a.wav", "--chunk-size", "0"]).is_err());
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(Cli::try_parse_from(["fpembed", "a.wav", "-f", "npy"]).is_err());
    }

    #[test]
    fn test_cli_parse_config_subcommand() {
        let cli = Cli::try_parse_from(["fpembed", "config", "show"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Config {
                action: ConfigAction::Show
            })
        ));
    }

    #[test]
    fn test_cli_parse_health_with_server() {
        let cli = Cli::try_parse_from(["fpembed", "health", "--server", "10.0.0.5:8000"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Health)));
        assert_eq!(cli.embed.server.as_deref(), Some("10.0.0.5:8000"));
    }

    #[test]
    fn test_cli_parse_features_subcommand() {
        let cli =
            Cli::try_parse_from(["fpembed", "features", "clip.wav", "-o", "out.json"]).unwrap();
        match cli.command {
            Some(Command::Features { file, output }) => {
                assert_eq!(file, PathBuf::from("clip.wav"));
                assert_eq!(output, Some(PathBuf::from("out.json")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
