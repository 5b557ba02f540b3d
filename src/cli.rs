//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Social Insight - integrate and summarize a social-network dataset
///
/// Loads the users, friendships, posts and reactions tables, cleans them,
/// computes per-user activity and writes a Markdown, JSON or CSV report.
///
/// Examples:
///   social-insight
///   social-insight --users data/users.csv --friends data/friends.csv \
///       --posts data/posts.csv --reactions data/reactions.csv
///   social-insight --format csv -o users.csv
///   social-insight --min-age 20 --max-age 29 --top-n 5
///   social-insight --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Users table (URL or local path)
    #[arg(long, value_name = "SRC", env = "SOCIAL_INSIGHT_USERS")]
    pub users: Option<String>,

    /// Friendships table (URL or local path)
    #[arg(long, value_name = "SRC", env = "SOCIAL_INSIGHT_FRIENDS")]
    pub friends: Option<String>,

    /// Posts table (URL or local path)
    #[arg(long, value_name = "SRC", env = "SOCIAL_INSIGHT_POSTS")]
    pub posts: Option<String>,

    /// Reactions table (URL or local path)
    #[arg(long, value_name = "SRC", env = "SOCIAL_INSIGHT_REACTIONS")]
    pub reactions: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .social-insight.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json, csv)
    ///
    /// csv writes the integrated per-user table instead of a report.
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Number of users listed in each top-performers table
    #[arg(long, value_name = "N")]
    pub top_n: Option<usize>,

    /// Only summarize users at least this old
    #[arg(long, value_name = "AGE")]
    pub min_age: Option<i64>,

    /// Only summarize users at most this old
    #[arg(long, value_name = "AGE")]
    pub max_age: Option<i64>,

    /// Only summarize users with at least this much total activity
    #[arg(long, value_name = "N")]
    pub min_activity: Option<u64>,

    /// HTTP request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .social-insight.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
    /// Integrated user table as CSV
    Csv,
}

impl OutputFormat {
    /// Conventional file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if self.top_n == Some(0) {
            return Err("Top N must be at least 1".to_string());
        }

        if let (Some(min), Some(max)) = (self.min_age, self.max_age) {
            if min > max {
                return Err(format!(
                    "Minimum age ({}) is greater than maximum age ({})",
                    min, max
                ));
            }
        }

        let sources = [
            ("users", &self.users),
            ("friends", &self.friends),
            ("posts", &self.posts),
            ("reactions", &self.reactions),
        ];
        for (name, source) in sources {
            if let Some(value) = source {
                if value.trim().is_empty() {
                    return Err(format!("--{} must not be empty", name));
                }
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            users: None,
            friends: None,
            posts: None,
            reactions: None,
            config: None,
            output: None,
            format: None,
            top_n: None,
            min_age: None,
            max_age: None,
            min_activity: None,
            timeout: None,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_default_args_are_valid() {
        assert!(make_args().validate().is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_age_range() {
        let mut args = make_args();
        args.min_age = Some(40);
        args.max_age = Some(30);
        assert!(args.validate().is_err());

        args.max_age = Some(40);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_zero_values() {
        let mut args = make_args();
        args.timeout = Some(0);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.top_n = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_empty_source() {
        let mut args = make_args();
        args.posts = Some("  ".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "social-insight",
            "--users",
            "users.csv",
            "--format",
            "json",
            "--min-activity",
            "5",
            "-v",
        ])
        .unwrap();

        assert_eq!(args.users.as_deref(), Some("users.csv"));
        assert_eq!(args.format, Some(OutputFormat::Json));
        assert_eq!(args.min_activity, Some(5));
        assert!(args.verbose);
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
