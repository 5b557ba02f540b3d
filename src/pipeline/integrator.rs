//! Joining per-user aggregates onto the user table.

use super::aggregator::{Aggregates, UserCounts};
use crate::models::{AgeGroup, IntegratedUserRecord, User, UserId};
use chrono::Datelike;
use tracing::{debug, warn};

/// Build one integrated record per cleaned user.
///
/// Users are numbered 1..N in table order; that number is the id the
/// aggregates are joined on. Users absent from an aggregate get zero.
pub fn integrate(users: &[User], aggregates: &Aggregates) -> Vec<IntegratedUserRecord> {
    let records: Vec<IntegratedUserRecord> = users
        .iter()
        .enumerate()
        .map(|(index, user)| build_record(UserId(index as i64 + 1), user, aggregates))
        .collect();

    let unbucketed = records.iter().filter(|r| r.age_group.is_none()).count();
    if unbucketed > 0 {
        warn!("{} users have an age outside 0-100 and no age group", unbucketed);
    }
    debug!("Integrated {} user records", records.len());

    records
}

fn build_record(user_id: UserId, user: &User, aggregates: &Aggregates) -> IntegratedUserRecord {
    let lookup = |counts: &UserCounts| counts.get(&user_id).copied().unwrap_or(0);

    let friend_count = lookup(&aggregates.friend_count);
    let post_count = lookup(&aggregates.post_count);
    let reactions_given = lookup(&aggregates.reactions_given);
    let reactions_received = lookup(&aggregates.reactions_received);

    IntegratedUserRecord {
        user_id,
        name: user.name.clone(),
        surname: user.surname.clone(),
        age: user.age,
        subscribed_at: user.subscribed_at,
        friend_count,
        post_count,
        reactions_given,
        reactions_received,
        age_group: AgeGroup::from_age(user.age),
        registration_year: user.subscribed_at.year(),
        is_active_poster: post_count > 0,
        is_social: friend_count > 0,
        // +1 smooths users without posts; the denominator is never zero.
        engagement_ratio: reactions_received as f64 / (post_count + 1) as f64,
        total_activity: friend_count + post_count + reactions_given,
    }
}
