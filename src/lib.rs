//! Social Insight - a small ETL pipeline over a social-network dataset.
//!
//! Four tables (users, friendships, posts, reactions) are loaded, cleaned,
//! aggregated per user and joined into one [`IntegratedUserRecord`] per
//! user. The [`report`] module derives the summaries a dashboard or a
//! written report needs from that dataset.
//!
//! ```no_run
//! use social_insight::loader::{Loader, LoaderOptions, SourceSet};
//! use social_insight::pipeline::Pipeline;
//!
//! # async fn demo() -> social_insight::Result<()> {
//! let loader = Loader::new(LoaderOptions::default())?;
//! let mut pipeline = Pipeline::new(loader);
//! let dataset = pipeline.run(&SourceSet::default()).await?;
//! println!("{} users", dataset.users.len());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;
pub mod models;
pub mod pipeline;
pub mod report;

pub use error::{PipelineError, Result, Table};
pub use models::{Dataset, IntegratedUserRecord};
pub use pipeline::{build_dataset, Pipeline};
