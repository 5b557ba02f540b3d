//! Per-table normalization of the raw source tables.
//!
//! Timestamps are converted from epoch seconds, reactions have their gaps
//! dropped or filled, and every table is deduplicated on full rows while
//! keeping the first occurrence in place.

use crate::error::{PipelineError, Result, Table};
use crate::models::{
    CleanTables, CleaningReport, Post, RawFriendship, RawPost, RawReaction, RawTables, RawUser,
    Reaction, TableCleaning, User, UserId,
};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use tracing::{debug, info};

/// Clean all four tables.
pub fn clean(raw: &RawTables) -> Result<(CleanTables, CleaningReport)> {
    let (users, users_report) = clean_users(&raw.users)?;
    let (friendships, friendships_report) = clean_friendships(&raw.friendships);
    let (posts, posts_report) = clean_posts(&raw.posts)?;
    let (reactions, reactions_report) = clean_reactions(&raw.reactions)?;

    let report = CleaningReport {
        users: users_report,
        friendships: friendships_report,
        posts: posts_report,
        reactions: reactions_report,
    };

    info!(
        "Cleaned tables: {} users, {} friendships, {} posts, {} reactions",
        users.len(),
        friendships.len(),
        posts.len(),
        reactions.len()
    );

    Ok((
        CleanTables {
            users,
            friendships,
            posts,
            reactions,
        },
        report,
    ))
}

pub fn clean_users(rows: &[RawUser]) -> Result<(Vec<User>, TableCleaning)> {
    let converted = rows
        .iter()
        .map(|row| {
            Ok(User {
                name: row.name.clone(),
                surname: row.surname.clone(),
                age: row.age,
                subscribed_at: epoch_to_datetime(Table::Users, row.subscription_date as f64)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let (users, removed) = dedup_stable(converted);
    debug!("users: {} duplicates removed", removed);

    let report = TableCleaning {
        rows_in: rows.len(),
        duplicates_removed: removed,
        rows_out: users.len(),
        ..Default::default()
    };
    Ok((users, report))
}

/// Friendships are deduplicated as ordered pairs; `(a, b)` and `(b, a)`
/// both survive.
pub fn clean_friendships(rows: &[RawFriendship]) -> (Vec<RawFriendship>, TableCleaning) {
    let (friendships, removed) = dedup_stable(rows.to_vec());
    debug!("friendships: {} duplicates removed", removed);

    let report = TableCleaning {
        rows_in: rows.len(),
        duplicates_removed: removed,
        rows_out: friendships.len(),
        ..Default::default()
    };
    (friendships, report)
}

pub fn clean_posts(rows: &[RawPost]) -> Result<(Vec<Post>, TableCleaning)> {
    let converted = rows
        .iter()
        .map(|row| {
            Ok(Post {
                user: row.user,
                post_type: row.post_type.clone(),
                posted_at: epoch_to_datetime(Table::Posts, row.post_date as f64)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let (posts, removed) = dedup_stable(converted);
    debug!("posts: {} duplicates removed", removed);

    let report = TableCleaning {
        rows_in: rows.len(),
        duplicates_removed: removed,
        rows_out: posts.len(),
        ..Default::default()
    };
    Ok((posts, report))
}

/// Drop reactions without an actor, fill missing type with the modal type
/// and missing date with the median raw epoch value, then convert and
/// deduplicate.
pub fn clean_reactions(rows: &[RawReaction]) -> Result<(Vec<Reaction>, TableCleaning)> {
    let with_actor: Vec<(UserId, &RawReaction)> = rows
        .iter()
        .filter_map(|row| row.user.map(|user| (user, row)))
        .collect();
    let dropped = rows.len() - with_actor.len();

    let types_missing = with_actor
        .iter()
        .filter(|(_, row)| row.reaction_type.is_none())
        .count();
    let dates_missing = with_actor
        .iter()
        .filter(|(_, row)| row.reaction_date.is_none())
        .count();

    let fill_type = if types_missing > 0 {
        let mode = modal_value(
            with_actor
                .iter()
                .filter_map(|(_, row)| row.reaction_type.as_deref()),
        );
        debug!("reactions: filling {} missing types with {:?}", types_missing, mode);
        mode.map(str::to_string)
    } else {
        None
    };

    let fill_date = if dates_missing > 0 {
        let mut observed: Vec<f64> = with_actor
            .iter()
            .filter_map(|(_, row)| row.reaction_date)
            .collect();
        let median = median(&mut observed);
        debug!("reactions: filling {} missing dates with {:?}", dates_missing, median);
        median
    } else {
        None
    };

    let mut converted = Vec::with_capacity(with_actor.len());
    for (user, row) in &with_actor {
        let reaction_type = row
            .reaction_type
            .clone()
            .or_else(|| fill_type.clone())
            .ok_or_else(|| {
                PipelineError::DegenerateInput(
                    "reactions have missing types but no observed type to fill from".to_string(),
                )
            })?;
        let epoch = row.reaction_date.or(fill_date).ok_or_else(|| {
            PipelineError::DegenerateInput(
                "reactions have missing dates but no observed date to fill from".to_string(),
            )
        })?;
        converted.push(Reaction {
            user: *user,
            reaction_type,
            reacted_at: epoch_to_datetime(Table::Reactions, epoch)?,
        });
    }

    let (reactions, removed) = dedup_stable(converted);
    debug!(
        "reactions: {} dropped for missing actor, {} duplicates removed",
        dropped, removed
    );

    let report = TableCleaning {
        rows_in: rows.len(),
        missing_actor_dropped: dropped,
        types_filled: types_missing,
        dates_filled: dates_missing,
        duplicates_removed: removed,
        rows_out: reactions.len(),
    };
    Ok((reactions, report))
}

/// The most frequent value. Ties resolve to the lexicographically smallest
/// value, which is the order tied modes are reported in.
pub fn modal_value<'a>(values: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let mut counts: HashMap<&'a str, usize> = HashMap::new();
    for value in values {
        *counts.entry(value).or_default() += 1;
    }

    counts
        .into_iter()
        .max_by(|(va, ca), (vb, cb)| ca.cmp(cb).then_with(|| vb.cmp(va)))
        .map(|(value, _)| value)
}

/// Median of the values, averaging the two middle values for even counts.
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// Convert epoch seconds (possibly fractional) to a UTC timestamp.
pub fn epoch_to_datetime(table: Table, epoch_seconds: f64) -> Result<DateTime<Utc>> {
    let whole = epoch_seconds.floor();
    let nanos = ((epoch_seconds - whole) * 1e9).round().min(999_999_999.0) as u32;

    let out_of_range = || {
        PipelineError::DegenerateInput(format!(
            "{} timestamp {} is outside the representable range",
            table, epoch_seconds
        ))
    };

    if !whole.is_finite() || whole.abs() > i64::MAX as f64 {
        return Err(out_of_range());
    }
    DateTime::from_timestamp(whole as i64, nanos).ok_or_else(out_of_range)
}

/// Remove rows identical to an earlier row, keeping first occurrences in
/// their original order. Returns the surviving rows and the number removed.
pub fn dedup_stable<T: Eq + Hash + Clone>(rows: Vec<T>) -> (Vec<T>, usize) {
    let total = rows.len();
    let mut seen: HashSet<T> = HashSet::with_capacity(total);
    let kept: Vec<T> = rows
        .into_iter()
        .filter(|row| seen.insert(row.clone()))
        .collect();
    let removed = total - kept.len();
    (kept, removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn raw_user(name: &str, age: i64, date: i64) -> RawUser {
        RawUser {
            name: name.to_string(),
            surname: "Doe".to_string(),
            age,
            subscription_date: date,
        }
    }

    fn raw_reaction(user: Option<i64>, kind: Option<&str>, date: Option<f64>) -> RawReaction {
        RawReaction {
            user: user.map(UserId),
            reaction_type: kind.map(String::from),
            reaction_date: date,
        }
    }

    /// Put cleaned tables back into raw form so they can be cleaned again.
    fn to_raw(clean: &CleanTables) -> RawTables {
        let epoch = |dt: &DateTime<Utc>| {
            dt.timestamp() as f64 + dt.timestamp_subsec_nanos() as f64 / 1e9
        };
        RawTables {
            users: clean
                .users
                .iter()
                .map(|u| RawUser {
                    name: u.name.clone(),
                    surname: u.surname.clone(),
                    age: u.age,
                    subscription_date: u.subscribed_at.timestamp(),
                })
                .collect(),
            friendships: clean.friendships.clone(),
            posts: clean
                .posts
                .iter()
                .map(|p| RawPost {
                    user: p.user,
                    post_type: p.post_type.clone(),
                    post_date: p.posted_at.timestamp(),
                })
                .collect(),
            reactions: clean
                .reactions
                .iter()
                .map(|r| RawReaction {
                    user: Some(r.user),
                    reaction_type: Some(r.reaction_type.clone()),
                    reaction_date: Some(epoch(&r.reacted_at)),
                })
                .collect(),
        }
    }

    #[test]
    fn test_users_converted_and_deduplicated() {
        let rows = vec![
            raw_user("Ada", 36, 1_600_000_000),
            raw_user("Bob", 22, 1_500_000_000),
            raw_user("Ada", 36, 1_600_000_000),
        ];

        let (users, report) = clean_users(&rows).unwrap();

        assert_eq!(users.len(), 2);
        assert_eq!(users[0].name, "Ada");
        assert_eq!(users[1].name, "Bob");
        assert_eq!(users[0].subscribed_at.year(), 2020);
        assert_eq!(report.duplicates_removed, 1);
        assert_eq!(report.rows_out, 2);
    }

    #[test]
    fn test_symmetric_friendships_are_kept() {
        let pair = |a, b| RawFriendship {
            friend_1: UserId(a),
            friend_2: UserId(b),
        };
        let rows = vec![pair(1, 2), pair(2, 1), pair(1, 2)];

        let (friendships, report) = clean_friendships(&rows);

        assert_eq!(friendships, vec![pair(1, 2), pair(2, 1)]);
        assert_eq!(report.duplicates_removed, 1);
    }

    #[test]
    fn test_reaction_missing_actor_dropped_and_type_filled() {
        let rows = vec![
            raw_reaction(Some(1), Some("Like"), Some(100.0)),
            raw_reaction(Some(2), Some("Like"), Some(200.0)),
            raw_reaction(Some(3), Some("Love"), Some(300.0)),
            raw_reaction(None, Some("Love"), Some(400.0)),
            raw_reaction(Some(4), None, Some(500.0)),
        ];

        let (reactions, report) = clean_reactions(&rows).unwrap();

        assert_eq!(reactions.len(), rows.len() - 1);
        assert_eq!(reactions[3].user, UserId(4));
        assert_eq!(reactions[3].reaction_type, "Like");
        assert_eq!(report.missing_actor_dropped, 1);
        assert_eq!(report.types_filled, 1);
    }

    #[test]
    fn test_reaction_date_filled_with_median_of_raw_values() {
        let rows = vec![
            raw_reaction(Some(1), Some("Like"), Some(100.0)),
            raw_reaction(Some(2), Some("Like"), Some(200.0)),
            raw_reaction(Some(3), Some("Like"), None),
            // Dropped before the median is taken.
            raw_reaction(None, Some("Like"), Some(10_000.0)),
        ];

        let (reactions, report) = clean_reactions(&rows).unwrap();

        assert_eq!(report.dates_filled, 1);
        assert_eq!(reactions[2].reacted_at.timestamp(), 150);
    }

    #[test]
    fn test_nan_cells_are_filled_like_blanks() {
        let source = crate::loader::Source::from("reactions.csv");
        let rows: Vec<RawReaction> = crate::loader::parse_table(
            Table::Reactions,
            &source,
            "User,Reaction Type,Reaction Date\n1,NaN,NaN\n2,Like,100\n3,Like,300\n",
        )
        .unwrap();

        let (reactions, report) = clean_reactions(&rows).unwrap();

        assert_eq!(reactions[0].reaction_type, "Like");
        assert_eq!(reactions[0].reacted_at.timestamp(), 200);
        assert_eq!(report.types_filled, 1);
        assert_eq!(report.dates_filled, 1);
    }

    #[test]
    fn test_unfillable_type_is_degenerate() {
        let rows = vec![raw_reaction(Some(1), None, Some(100.0))];
        let err = clean_reactions(&rows).unwrap_err();
        assert!(matches!(err, PipelineError::DegenerateInput(_)));
    }

    #[test]
    fn test_modal_value_tie_breaks_lexicographically() {
        let values = ["Wow", "Like", "Wow", "Like", "Angry"];
        assert_eq!(modal_value(values.iter().copied()), Some("Like"));
        assert_eq!(modal_value(std::iter::empty()), None);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&mut []), None);
    }

    #[test]
    fn test_fractional_epoch_keeps_subseconds() {
        let dt = epoch_to_datetime(Table::Reactions, 150.5).unwrap();
        assert_eq!(dt.timestamp(), 150);
        assert_eq!(dt.timestamp_subsec_millis(), 500);
        assert!(epoch_to_datetime(Table::Posts, 1e300).is_err());
    }

    #[test]
    fn test_cleaning_is_idempotent() {
        let raw = RawTables {
            users: vec![
                raw_user("Ada", 36, 1_600_000_000),
                raw_user("Ada", 36, 1_600_000_000),
                raw_user("Bob", 22, 1_500_000_000),
            ],
            friendships: vec![
                RawFriendship {
                    friend_1: UserId(1),
                    friend_2: UserId(2),
                },
                RawFriendship {
                    friend_1: UserId(1),
                    friend_2: UserId(2),
                },
            ],
            posts: vec![
                RawPost {
                    user: UserId(1),
                    post_type: "Text".to_string(),
                    post_date: 1_610_000_000,
                },
                RawPost {
                    user: UserId(1),
                    post_type: "Text".to_string(),
                    post_date: 1_610_000_000,
                },
            ],
            reactions: vec![
                raw_reaction(Some(1), Some("Like"), Some(100.0)),
                raw_reaction(Some(2), None, Some(201.0)),
                raw_reaction(Some(2), Some("Like"), None),
                raw_reaction(None, Some("Wow"), Some(100.0)),
            ],
        };

        let (once, _) = clean(&raw).unwrap();
        let (twice, report) = clean(&to_raw(&once)).unwrap();

        assert_eq!(once, twice);
        assert_eq!(report.users.duplicates_removed, 0);
        assert_eq!(report.reactions.duplicates_removed, 0);
    }
}
