//! CLI argument parsing for orden

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for reports
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "orden")]
#[command(version)]
#[command(about = "Profile-guided method layout ordering for packed binaries", long_about = None)]
pub struct Cli {
    /// Aggregated method profile file (CSV)
    pub profile: PathBuf,

    /// Show a per-interaction statistics summary instead of the layout order
    #[arg(short = 'c', long = "summary")]
    pub summary: bool,

    /// Use the legacy cold-start-only ordering heuristic
    #[arg(long = "legacy")]
    pub legacy: bool,

    /// Treat methods whose display name contains SUBSTR as hot (repeatable)
    #[arg(short = 'w', long = "whitelist", value_name = "SUBSTR")]
    pub whitelist: Vec<String>,

    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Enable debug tracing to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_profile_path() {
        let cli = Cli::parse_from(["orden", "stats.csv"]);
        assert_eq!(cli.profile, PathBuf::from("stats.csv"));
        assert!(!cli.summary);
        assert!(!cli.legacy);
    }

    #[test]
    fn test_cli_summary_flag() {
        let cli = Cli::parse_from(["orden", "-c", "stats.csv"]);
        assert!(cli.summary);
    }

    #[test]
    fn test_cli_collects_whitelist_substrings() {
        let cli = Cli::parse_from(["orden", "-w", "Startup", "-w", "CriticalPath", "stats.csv"]);
        assert_eq!(cli.whitelist, vec!["Startup", "CriticalPath"]);
    }

    #[test]
    fn test_cli_requires_profile() {
        assert!(Cli::try_parse_from(["orden"]).is_err());
    }
}
