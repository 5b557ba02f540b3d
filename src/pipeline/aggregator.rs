//! Per-user aggregates over the relationship tables.
//!
//! Posts and reactions are numbered 1..N in cleaned table order. Reactions
//! carry no reference to the post they were left on, so each is paired with
//! a post by `(reaction_id mod post_count) + 1`. That pairing is arbitrary
//! but deterministic, and `reactions_received` is defined by it.

use crate::error::{PipelineError, Result};
use crate::models::{
    Post, PostId, PostRecord, RawFriendship, Reaction, ReactionId, ReactionRecord, UserId,
};
use std::collections::BTreeMap;
use tracing::debug;

/// Count per user id. Users with no entry have no occurrences.
pub type UserCounts = BTreeMap<UserId, u64>;

/// Output of the aggregation step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregates {
    pub friend_count: UserCounts,
    pub post_count: UserCounts,
    pub reactions_given: UserCounts,
    pub reactions_received: UserCounts,
    /// Cleaned posts with their sequential ids.
    pub posts: Vec<PostRecord>,
    /// Cleaned reactions with their sequential ids and paired posts.
    pub reactions: Vec<ReactionRecord>,
}

/// Compute every per-user aggregate.
pub fn aggregate(
    friendships: &[RawFriendship],
    posts: &[Post],
    reactions: &[Reaction],
) -> Result<Aggregates> {
    let posts = number_posts(posts);
    let reactions = number_reactions(reactions, posts.len())?;

    let aggregates = Aggregates {
        friend_count: friend_counts(friendships),
        post_count: count_by(posts.iter().map(|p| p.user_id)),
        reactions_given: count_by(reactions.iter().map(|r| r.user_id)),
        reactions_received: reactions_received(&posts, &reactions),
        posts,
        reactions,
    };

    debug!(
        "Aggregated: {} users with friends, {} posters, {} reactors, {} users receiving reactions",
        aggregates.friend_count.len(),
        aggregates.post_count.len(),
        aggregates.reactions_given.len(),
        aggregates.reactions_received.len()
    );

    Ok(aggregates)
}

/// Degree per user: each friendship row adds one to both endpoints.
/// `(a, b)` and `(b, a)` are counted independently.
pub fn friend_counts(friendships: &[RawFriendship]) -> UserCounts {
    count_by(
        friendships
            .iter()
            .map(|f| f.friend_1)
            .chain(friendships.iter().map(|f| f.friend_2)),
    )
}

/// Assign post ids 1..N in table order.
pub fn number_posts(posts: &[Post]) -> Vec<PostRecord> {
    posts
        .iter()
        .enumerate()
        .map(|(index, post)| PostRecord {
            post_id: PostId(index + 1),
            user_id: post.user,
            post_type: post.post_type.clone(),
            posted_at: post.posted_at,
        })
        .collect()
}

/// Assign reaction ids 1..N in table order and pair each with a post.
///
/// Fails when there are reactions but no posts to pair them with.
pub fn number_reactions(reactions: &[Reaction], post_count: usize) -> Result<Vec<ReactionRecord>> {
    if post_count == 0 && !reactions.is_empty() {
        return Err(PipelineError::DegenerateInput(format!(
            "cannot pair {} reactions with posts: the posts table is empty",
            reactions.len()
        )));
    }

    Ok(reactions
        .iter()
        .enumerate()
        .map(|(index, reaction)| {
            let reaction_id = index + 1;
            ReactionRecord {
                reaction_id: ReactionId(reaction_id),
                user_id: reaction.user,
                reaction_type: reaction.reaction_type.clone(),
                reacted_at: reaction.reacted_at,
                post_id: PostId(reaction_id % post_count + 1),
            }
        })
        .collect())
}

/// Reactions received per post owner, following the synthetic pairing.
pub fn reactions_received(posts: &[PostRecord], reactions: &[ReactionRecord]) -> UserCounts {
    // Post ids are dense and 1-based, so the owner of post `n` is at `n - 1`.
    count_by(reactions.iter().filter_map(|reaction| {
        posts
            .get(reaction.post_id.0.wrapping_sub(1))
            .map(|post| post.user_id)
    }))
}

fn count_by(ids: impl Iterator<Item = UserId>) -> UserCounts {
    let mut counts = UserCounts::new();
    for id in ids {
        *counts.entry(id).or_default() += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn friendship(a: i64, b: i64) -> RawFriendship {
        RawFriendship {
            friend_1: UserId(a),
            friend_2: UserId(b),
        }
    }

    fn post(owner: i64) -> Post {
        Post {
            user: UserId(owner),
            post_type: "Text".to_string(),
            posted_at: at(1_000),
        }
    }

    fn reaction(actor: i64, secs: i64) -> Reaction {
        Reaction {
            user: UserId(actor),
            reaction_type: "Like".to_string(),
            reacted_at: at(secs),
        }
    }

    #[test]
    fn test_friend_counts() {
        let counts = friend_counts(&[friendship(1, 2), friendship(1, 3)]);

        assert_eq!(counts.get(&UserId(1)), Some(&2));
        assert_eq!(counts.get(&UserId(2)), Some(&1));
        assert_eq!(counts.get(&UserId(3)), Some(&1));
        assert_eq!(counts.get(&UserId(4)), None);
    }

    #[test]
    fn test_friend_counts_symmetric_under_column_swap() {
        let rows = vec![friendship(1, 2), friendship(2, 1), friendship(3, 1), friendship(4, 2)];
        let swapped: Vec<_> = rows
            .iter()
            .map(|f| friendship(f.friend_2.0, f.friend_1.0))
            .collect();

        assert_eq!(friend_counts(&rows), friend_counts(&swapped));
        assert_eq!(friend_counts(&rows).get(&UserId(1)), Some(&3));
    }

    #[test]
    fn test_post_counts() {
        let aggregates = aggregate(&[], &[post(1), post(1), post(2), post(3)], &[]).unwrap();

        assert_eq!(aggregates.post_count.get(&UserId(1)), Some(&2));
        assert_eq!(aggregates.post_count.get(&UserId(2)), Some(&1));
        assert_eq!(aggregates.post_count.get(&UserId(3)), Some(&1));
        assert_eq!(aggregates.post_count.get(&UserId(4)), None);
        let ids: Vec<_> = aggregates.posts.iter().map(|p| p.post_id.0).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_synthetic_pairing_formula() {
        let posts = [post(10), post(20), post(30)];
        let reactions: Vec<_> = (0..5).map(|i| reaction(1, i)).collect();

        let aggregates = aggregate(&[], &posts, &reactions).unwrap();

        // reaction_id 1..=5 with 3 posts -> (id % 3) + 1
        let paired: Vec<_> = aggregates.reactions.iter().map(|r| r.post_id.0).collect();
        assert_eq!(paired, vec![2, 3, 1, 2, 3]);

        assert_eq!(aggregates.reactions_received.get(&UserId(10)), Some(&1));
        assert_eq!(aggregates.reactions_received.get(&UserId(20)), Some(&2));
        assert_eq!(aggregates.reactions_received.get(&UserId(30)), Some(&2));
        assert_eq!(aggregates.reactions_given.get(&UserId(1)), Some(&5));
    }

    #[test]
    fn test_reactions_without_posts_fail() {
        let err = aggregate(&[], &[], &[reaction(1, 0)]).unwrap_err();
        assert!(matches!(err, PipelineError::DegenerateInput(_)));
    }

    #[test]
    fn test_no_posts_no_reactions_is_fine() {
        let aggregates = aggregate(&[friendship(1, 2)], &[], &[]).unwrap();
        assert!(aggregates.reactions_received.is_empty());
        assert_eq!(aggregates.friend_count.len(), 2);
    }
}
