//! Loading the four source tables.

pub mod cache;
pub mod fetcher;
pub mod source;

pub use cache::TableCache;
pub use fetcher::{parse_table, required_columns, Loader, LoaderOptions};
pub use source::{
    Source, SourceSet, DEFAULT_FRIENDS_URL, DEFAULT_POSTS_URL, DEFAULT_REACTIONS_URL,
    DEFAULT_USERS_URL,
};
