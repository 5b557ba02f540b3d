//! Source locations for the four input tables.

use crate::error::Table;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Public CSV exports of the reference dataset.
pub const DEFAULT_USERS_URL: &str =
    "https://raw.githubusercontent.com/cayaaa14/data-real/refs/heads/main/user_table.csv";
pub const DEFAULT_FRIENDS_URL: &str =
    "https://raw.githubusercontent.com/cayaaa14/data-real/refs/heads/main/friends_table.csv";
pub const DEFAULT_POSTS_URL: &str =
    "https://raw.githubusercontent.com/cayaaa14/data-real/refs/heads/main/posts_table.csv";
pub const DEFAULT_REACTIONS_URL: &str =
    "https://raw.githubusercontent.com/cayaaa14/data-real/refs/heads/main/reactions_table.csv";

/// Where a table is read from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Source {
    /// Remote CSV fetched over HTTP(S).
    Url(String),
    /// Local CSV file.
    Path(PathBuf),
}

impl Source {
    pub fn is_remote(&self) -> bool {
        matches!(self, Source::Url(_))
    }
}

impl FromStr for Source {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Ok(Source::Url(trimmed.to_string()))
        } else {
            Ok(Source::Path(PathBuf::from(trimmed)))
        }
    }
}

impl From<&str> for Source {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(source) => source,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Url(url) => write!(f, "{}", url),
            Source::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// The four sources a pipeline run reads.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceSet {
    pub users: Source,
    pub friendships: Source,
    pub posts: Source,
    pub reactions: Source,
}

impl Default for SourceSet {
    fn default() -> Self {
        Self {
            users: Source::from(DEFAULT_USERS_URL),
            friendships: Source::from(DEFAULT_FRIENDS_URL),
            posts: Source::from(DEFAULT_POSTS_URL),
            reactions: Source::from(DEFAULT_REACTIONS_URL),
        }
    }
}

impl SourceSet {
    pub fn get(&self, table: Table) -> &Source {
        match table {
            Table::Users => &self.users,
            Table::Friendships => &self.friendships,
            Table::Posts => &self.posts,
            Table::Reactions => &self.reactions,
        }
    }

    pub fn any_remote(&self) -> bool {
        [Table::Users, Table::Friendships, Table::Posts, Table::Reactions]
            .iter()
            .any(|t| self.get(*t).is_remote())
    }
}
