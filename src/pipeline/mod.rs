//! The data-integration pipeline.
//!
//! Loader → Cleaner → Aggregator → Integrator. Each run rebuilds the
//! dataset from scratch; a failure at any stage aborts the run and no
//! partial dataset is returned.

pub mod aggregator;
pub mod cleaner;
pub mod integrator;

pub use aggregator::{aggregate, Aggregates, UserCounts};
pub use cleaner::clean;
pub use integrator::integrate;

use crate::error::Result;
use crate::loader::{Loader, SourceSet, TableCache};
use crate::models::{Dataset, RawTables};
use tracing::info;

/// Run cleaning, aggregation and integration over loaded tables.
pub fn build_dataset(raw: &RawTables) -> Result<Dataset> {
    let (tables, cleaning) = clean(raw)?;
    let aggregates = aggregate(&tables.friendships, &tables.posts, &tables.reactions)?;
    let users = integrate(&tables.users, &aggregates);

    info!("Built integrated dataset with {} users", users.len());

    Ok(Dataset {
        users,
        posts: aggregates.posts,
        reactions: aggregates.reactions,
        friendship_count: tables.friendships.len(),
        cleaning,
    })
}

/// Loads sources and builds datasets, remembering loaded tables for the
/// lifetime of the value.
pub struct Pipeline {
    loader: Loader,
    cache: TableCache,
}

impl Pipeline {
    pub fn new(loader: Loader) -> Self {
        Self {
            loader,
            cache: TableCache::new(),
        }
    }

    /// Load (or reuse) the tables for `sources` and build the dataset.
    pub async fn run(&mut self, sources: &SourceSet) -> Result<Dataset> {
        let loader = &self.loader;
        let raw = self
            .cache
            .get_or_load(sources, || loader.load(sources))
            .await?;
        build_dataset(&raw)
    }

    /// Forget loaded tables so the next run fetches again.
    pub fn invalidate(&mut self) {
        self.cache.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RawFriendship, RawPost, RawReaction, RawUser, UserId};

    fn sample_raw() -> RawTables {
        let user = |name: &str, age| RawUser {
            name: name.to_string(),
            surname: "Doe".to_string(),
            age,
            subscription_date: 1_600_000_000,
        };
        let post = |owner| RawPost {
            user: UserId(owner),
            post_type: "Photo".to_string(),
            post_date: 1_610_000_000,
        };
        let reaction = |actor: Option<i64>, kind: Option<&str>, date| RawReaction {
            user: actor.map(UserId),
            reaction_type: kind.map(String::from),
            reaction_date: date,
        };

        RawTables {
            users: vec![user("A", 15), user("B", 35), user("C", 65), user("D", 42)],
            friendships: vec![
                RawFriendship {
                    friend_1: UserId(1),
                    friend_2: UserId(2),
                },
                RawFriendship {
                    friend_1: UserId(1),
                    friend_2: UserId(3),
                },
            ],
            posts: vec![post(1), post(1), post(2), post(3)],
            reactions: vec![
                reaction(Some(2), Some("Like"), Some(1_620_000_000.0)),
                reaction(Some(3), Some("Like"), Some(1_620_000_100.0)),
                reaction(None, Some("Love"), Some(1_620_000_200.0)),
                reaction(Some(4), None, Some(1_620_000_300.0)),
                reaction(Some(2), Some("Love"), None),
            ],
        }
    }

    #[test]
    fn test_build_dataset_end_to_end() {
        let dataset = build_dataset(&sample_raw()).unwrap();

        assert_eq!(dataset.users.len(), 4);
        assert_eq!(dataset.posts.len(), 4);
        assert_eq!(dataset.reactions.len(), 4);
        assert_eq!(dataset.friendship_count, 2);

        let friends: Vec<_> = dataset.users.iter().map(|u| u.friend_count).collect();
        assert_eq!(friends, vec![2, 1, 1, 0]);
        let posts: Vec<_> = dataset.users.iter().map(|u| u.post_count).collect();
        assert_eq!(posts, vec![2, 1, 1, 0]);

        // Missing-actor reaction is not attributed to anyone.
        let given: u64 = dataset.users.iter().map(|u| u.reactions_given).sum();
        assert_eq!(given, 4);

        // Reactions 1..=4 pair with posts 2,3,4,1 owned by users 1,2,3,1.
        let received: Vec<_> = dataset.users.iter().map(|u| u.reactions_received).collect();
        assert_eq!(received, vec![2, 1, 1, 0]);
    }

    #[test]
    fn test_dataset_invariants() {
        let dataset = build_dataset(&sample_raw()).unwrap();

        for record in &dataset.users {
            assert_eq!(
                record.total_activity,
                record.friend_count + record.post_count + record.reactions_given
            );
            assert!(record.engagement_ratio.is_finite());
            assert!(record.engagement_ratio >= 0.0);
        }
        assert_eq!(dataset.users.len(), dataset.cleaning.users.rows_out);
    }

    #[test]
    fn test_pipeline_memoizes_tables() {
        let dir = tempfile::TempDir::new().unwrap();
        let write = |name: &str, body: &str| {
            let path = dir.path().join(name);
            std::fs::write(&path, body).unwrap();
            crate::loader::Source::Path(path)
        };
        let sources = SourceSet {
            users: write("u.csv", "Name,Surname,Age,Subscription Date\nA,B,30,1600000000\n"),
            friendships: write("f.csv", "Friend 1,Friend 2\n"),
            posts: write("p.csv", "User,Post Type,Post Date\n1,Text,1600000000\n"),
            reactions: write("r.csv", "User,Reaction Type,Reaction Date\n1,Like,1600000000\n"),
        };
        let loader = Loader::new(Default::default()).unwrap();
        let mut pipeline = Pipeline::new(loader);

        let first = tokio_test::block_on(pipeline.run(&sources)).unwrap();
        std::fs::remove_file(dir.path().join("u.csv")).unwrap();
        let second = tokio_test::block_on(pipeline.run(&sources)).unwrap();
        assert_eq!(first, second);

        pipeline.invalidate();
        assert!(tokio_test::block_on(pipeline.run(&sources)).is_err());
    }
}
