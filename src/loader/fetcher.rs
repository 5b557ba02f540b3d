//! Fetching and parsing the four source tables.

use super::source::{Source, SourceSet};
use crate::error::{PipelineError, Result, Table};
use crate::models::{RawFriendship, RawPost, RawReaction, RawTables, RawUser};
use indicatif::{ProgressBar, ProgressStyle};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

/// Columns every table must declare.
pub fn required_columns(table: Table) -> &'static [&'static str] {
    match table {
        Table::Users => &["Name", "Surname", "Age", "Subscription Date"],
        Table::Friendships => &["Friend 1", "Friend 2"],
        Table::Posts => &["User", "Post Type", "Post Date"],
        Table::Reactions => &["User", "Reaction Type", "Reaction Date"],
    }
}

/// Options for loading tables.
#[derive(Debug, Clone, Default)]
pub struct LoaderOptions {
    /// Timeout applied to each HTTP request. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Whether to show a spinner while fetching.
    pub show_progress: bool,
}

/// Reads the four source tables.
pub struct Loader {
    http_client: reqwest::Client,
    options: LoaderOptions,
}

impl Loader {
    pub fn new(options: LoaderOptions) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build().map_err(PipelineError::HttpClient)?;

        Ok(Self {
            http_client,
            options,
        })
    }

    /// Load all four tables. Either every table loads or an error is
    /// returned and nothing is kept.
    pub async fn load(&self, sources: &SourceSet) -> Result<RawTables> {
        info!("Loading source tables");

        let spinner = self.spinner();

        let fetched = futures::try_join!(
            self.fetch_text(Table::Users, &sources.users),
            self.fetch_text(Table::Friendships, &sources.friendships),
            self.fetch_text(Table::Posts, &sources.posts),
            self.fetch_text(Table::Reactions, &sources.reactions),
        );

        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }

        let (users, friendships, posts, reactions) = fetched?;

        let tables = RawTables {
            users: parse_table::<RawUser>(Table::Users, &sources.users, &users)?,
            friendships: parse_table::<RawFriendship>(
                Table::Friendships,
                &sources.friendships,
                &friendships,
            )?,
            posts: parse_table::<RawPost>(Table::Posts, &sources.posts, &posts)?,
            reactions: parse_table::<RawReaction>(
                Table::Reactions,
                &sources.reactions,
                &reactions,
            )?,
        };

        info!(
            "Loaded {} users, {} friendships, {} posts, {} reactions",
            tables.users.len(),
            tables.friendships.len(),
            tables.posts.len(),
            tables.reactions.len()
        );

        Ok(tables)
    }

    fn spinner(&self) -> Option<ProgressBar> {
        if !self.options.show_progress {
            return None;
        }
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.set_message("Fetching source tables...");
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    }

    async fn fetch_text(&self, table: Table, source: &Source) -> Result<String> {
        debug!("Fetching {} from {}", table, source);

        match source {
            Source::Path(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|e| PipelineError::load(table, source.to_string(), e)),
            Source::Url(url) => {
                let response = self.http_client.get(url).send().await.map_err(|e| {
                    let reason = if e.is_timeout() {
                        "request timed out".to_string()
                    } else if e.is_connect() {
                        format!("cannot connect: {}", e)
                    } else {
                        format!("request failed: {}", e)
                    };
                    PipelineError::load(table, url.clone(), reason)
                })?;

                let status = response.status();
                if !status.is_success() {
                    return Err(PipelineError::load(
                        table,
                        url.clone(),
                        format!("HTTP status {}", status),
                    ));
                }

                response
                    .text()
                    .await
                    .map_err(|e| PipelineError::load(table, url.clone(), e))
            }
        }
    }
}

/// Parse CSV text into rows of `T`, checking the declared columns first.
pub fn parse_table<T: DeserializeOwned>(
    table: Table,
    source: &Source,
    text: &str,
) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| PipelineError::load(table, source.to_string(), e))?
        .clone();

    for column in required_columns(table) {
        if !headers.iter().any(|h| h == *column) {
            return Err(PipelineError::load(
                table,
                source.to_string(),
                format!("missing column `{}`", column),
            ));
        }
    }

    let mut rows = Vec::new();
    for (index, record) in reader.deserialize::<T>().enumerate() {
        let row = record.map_err(|e| {
            PipelineError::load(table, source.to_string(), format!("row {}: {}", index + 1, e))
        })?;
        rows.push(row);
    }

    debug!("Parsed {} rows from {}", rows.len(), table);
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserId;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_csv(dir: &Path, name: &str, content: &str) -> Source {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        Source::Path(path)
    }

    fn local_sources(dir: &Path) -> SourceSet {
        SourceSet {
            users: write_csv(
                dir,
                "users.csv",
                "Name,Surname,Age,Subscription Date\nAda,Lovelace,36,1600000000\nAlan,Turing,41,1610000000\n",
            ),
            friendships: write_csv(dir, "friends.csv", "Friend 1,Friend 2\n1,2\n"),
            posts: write_csv(
                dir,
                "posts.csv",
                "User,Post Type,Post Date\n1,Text,1620000000\n",
            ),
            reactions: write_csv(
                dir,
                "reactions.csv",
                "User,Reaction Type,Reaction Date\n2.0,Like,1630000000\n,,\n",
            ),
        }
    }

    #[test]
    fn test_load_local_tables() {
        let dir = TempDir::new().unwrap();
        let sources = local_sources(dir.path());
        let loader = Loader::new(LoaderOptions::default()).unwrap();

        let tables = tokio_test::block_on(loader.load(&sources)).unwrap();

        assert_eq!(tables.users.len(), 2);
        assert_eq!(tables.users[1].surname, "Turing");
        assert_eq!(tables.friendships[0].friend_2, UserId(2));
        assert_eq!(tables.posts[0].post_type, "Text");
        assert_eq!(tables.reactions.len(), 2);
        assert_eq!(tables.reactions[0].user, Some(UserId(2)));
        assert_eq!(tables.reactions[1].user, None);
    }

    #[test]
    fn test_one_missing_file_fails_whole_load() {
        let dir = TempDir::new().unwrap();
        let mut sources = local_sources(dir.path());
        sources.posts = Source::Path(dir.path().join("does-not-exist.csv"));
        let loader = Loader::new(LoaderOptions::default()).unwrap();

        let err = tokio_test::block_on(loader.load(&sources)).unwrap_err();

        match err {
            PipelineError::Load { table, .. } => assert_eq!(table, Table::Posts),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_column_is_load_failure() {
        let source = Source::from("users.csv");
        let result =
            parse_table::<RawUser>(Table::Users, &source, "Name,Surname,Age\nAda,Lovelace,36\n");

        let err = result.unwrap_err();
        assert!(err.is_load_failure());
        assert!(err.to_string().contains("Subscription Date"));
    }

    #[test]
    fn test_missing_column_detected_on_empty_table() {
        let source = Source::from("friends.csv");
        let result = parse_table::<RawFriendship>(Table::Friendships, &source, "Friend 1\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_bad_cell_reports_row() {
        let source = Source::from("posts.csv");
        let result = parse_table::<RawPost>(
            Table::Posts,
            &source,
            "User,Post Type,Post Date\n1,Text,100\nx,Text,200\n",
        );
        let message = result.unwrap_err().to_string();
        assert!(message.contains("row 2"), "{message}");
    }

    #[test]
    fn test_extra_columns_are_ignored() {
        let source = Source::from("friends.csv");
        let rows = parse_table::<RawFriendship>(
            Table::Friendships,
            &source,
            ",Friend 1,Friend 2\n0,3,4\n",
        )
        .unwrap();
        assert_eq!(rows[0].friend_1, UserId(3));
    }
}
