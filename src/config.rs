//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.social-insight.toml` files.

use crate::cli::{Args, OutputFormat};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use social_insight::loader::{
    LoaderOptions, Source, SourceSet, DEFAULT_FRIENDS_URL, DEFAULT_POSTS_URL,
    DEFAULT_REACTIONS_URL, DEFAULT_USERS_URL,
};
use social_insight::report::UserFilter;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".social-insight.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Input table locations.
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Loader settings.
    #[serde(default)]
    pub loader: LoaderConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,

    /// Which users the filtered summary covers.
    #[serde(default)]
    pub filter: FilterConfig,
}

/// Where the four tables come from. Each value is a URL or a local path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_users")]
    pub users: String,

    #[serde(default = "default_friends")]
    pub friends: String,

    #[serde(default = "default_posts")]
    pub posts: String,

    #[serde(default = "default_reactions")]
    pub reactions: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            users: default_users(),
            friends: default_friends(),
            posts: default_posts(),
            reactions: default_reactions(),
        }
    }
}

fn default_users() -> String {
    DEFAULT_USERS_URL.to_string()
}

fn default_friends() -> String {
    DEFAULT_FRIENDS_URL.to_string()
}

fn default_posts() -> String {
    DEFAULT_POSTS_URL.to_string()
}

fn default_reactions() -> String {
    DEFAULT_REACTIONS_URL.to_string()
}

/// Loader settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    60
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Output file path. Defaults to `social_insight_report.<ext>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    #[serde(default)]
    pub format: OutputFormat,

    /// Users listed in each top-performers table.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output: None,
            format: OutputFormat::default(),
            top_n: default_top_n(),
        }
    }
}

fn default_top_n() -> usize {
    10
}

/// Filter applied to the filtered-selection summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_age: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_activity: Option<u64>,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Only values the CLI actually provides are overridden.
    pub fn merge_with_args(&mut self, args: &Args) {
        let overrides = [
            (&mut self.sources.users, &args.users),
            (&mut self.sources.friends, &args.friends),
            (&mut self.sources.posts, &args.posts),
            (&mut self.sources.reactions, &args.reactions),
        ];
        for (target, value) in overrides {
            if let Some(value) = value {
                *target = value.clone();
            }
        }

        if let Some(timeout) = args.timeout {
            self.loader.timeout_seconds = timeout;
        }

        if let Some(ref output) = args.output {
            self.report.output = Some(output.display().to_string());
        }
        if let Some(format) = args.format {
            self.report.format = format;
        }
        if let Some(top_n) = args.top_n {
            self.report.top_n = top_n;
        }

        if args.min_age.is_some() {
            self.filter.min_age = args.min_age;
        }
        if args.max_age.is_some() {
            self.filter.max_age = args.max_age;
        }
        if args.min_activity.is_some() {
            self.filter.min_activity = args.min_activity;
        }
    }

    /// The sources a pipeline run should read.
    pub fn source_set(&self) -> SourceSet {
        SourceSet {
            users: Source::from(self.sources.users.as_str()),
            friendships: Source::from(self.sources.friends.as_str()),
            posts: Source::from(self.sources.posts.as_str()),
            reactions: Source::from(self.sources.reactions.as_str()),
        }
    }

    /// Loader options derived from `[loader]`.
    pub fn loader_options(&self, show_progress: bool) -> LoaderOptions {
        LoaderOptions {
            timeout: Some(Duration::from_secs(self.loader.timeout_seconds)),
            show_progress,
        }
    }

    pub fn user_filter(&self) -> UserFilter {
        UserFilter {
            min_age: self.filter.min_age,
            max_age: self.filter.max_age,
            min_activity: self.filter.min_activity,
        }
    }

    /// Where the report is written.
    pub fn output_path(&self) -> PathBuf {
        match self.report.output {
            Some(ref output) => PathBuf::from(output),
            None => PathBuf::from(format!(
                "social_insight_report.{}",
                self.report.format.extension()
            )),
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.sources.users, DEFAULT_USERS_URL);
        assert_eq!(config.loader.timeout_seconds, 60);
        assert_eq!(config.report.top_n, 10);
        assert_eq!(config.report.format, OutputFormat::Markdown);
        assert!(config.user_filter().is_empty());
        assert!(config.source_set().any_remote());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[sources]
users = "data/users.csv"
reactions = "https://example.com/reactions.csv"

[loader]
timeout_seconds = 5

[report]
format = "json"
top_n = 3

[filter]
min_age = 20
max_age = 29
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        let sources = config.source_set();

        assert_eq!(sources.users, Source::Path(PathBuf::from("data/users.csv")));
        assert!(sources.reactions.is_remote());
        assert_eq!(config.sources.posts, DEFAULT_POSTS_URL);
        assert_eq!(config.loader.timeout_seconds, 5);
        assert_eq!(config.report.format, OutputFormat::Json);
        assert_eq!(config.report.top_n, 3);
        assert_eq!(config.filter.min_age, Some(20));
        assert_eq!(config.filter.min_activity, None);
        assert_eq!(config.output_path(), PathBuf::from("social_insight_report.json"));
    }

    #[test]
    fn test_merge_with_args() {
        let mut config: Config = toml::from_str(
            r#"
[report]
output = "from_config.md"
top_n = 3
"#,
        )
        .unwrap();
        let args = Args::try_parse_from([
            "social-insight",
            "--posts",
            "local/posts.csv",
            "--top-n",
            "7",
            "--min-age",
            "30",
            "--timeout",
            "15",
        ])
        .unwrap();

        config.merge_with_args(&args);

        assert_eq!(config.sources.posts, "local/posts.csv");
        assert_eq!(config.report.top_n, 7);
        assert_eq!(config.report.output.as_deref(), Some("from_config.md"));
        assert_eq!(config.filter.min_age, Some(30));
        assert_eq!(
            config.loader_options(false).timeout,
            Some(Duration::from_secs(15))
        );
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[sources]"));
        assert!(toml_str.contains("[loader]"));
        assert!(toml_str.contains("[report]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.report.top_n, 10);
    }
}
