//! Data models for the social network pipeline.
//!
//! This module contains the raw rows read from the four source tables,
//! their cleaned counterparts, and the integrated per-user records the
//! pipeline produces.

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;

/// Identifier of a user.
///
/// User ids are positional (1-based row number in the cleaned user table).
/// The relationship tables reference users by the same numbering, but may
/// carry ids that match no user at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

/// Identifier of a post, 1-based in cleaned table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub usize);

/// Identifier of a reaction, 1-based in cleaned table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReactionId(pub usize);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ReactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Raw rows
// ---------------------------------------------------------------------------

/// A row of the users table as read from the source.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawUser {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Surname")]
    pub surname: String,
    #[serde(rename = "Age", deserialize_with = "lenient_i64")]
    pub age: i64,
    /// Epoch seconds.
    #[serde(rename = "Subscription Date", deserialize_with = "lenient_i64")]
    pub subscription_date: i64,
}

/// A row of the friendships table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub struct RawFriendship {
    #[serde(rename = "Friend 1", deserialize_with = "lenient_user_id")]
    pub friend_1: UserId,
    #[serde(rename = "Friend 2", deserialize_with = "lenient_user_id")]
    pub friend_2: UserId,
}

/// A row of the posts table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawPost {
    #[serde(rename = "User", deserialize_with = "lenient_user_id")]
    pub user: UserId,
    #[serde(rename = "Post Type")]
    pub post_type: String,
    /// Epoch seconds.
    #[serde(rename = "Post Date", deserialize_with = "lenient_i64")]
    pub post_date: i64,
}

/// A row of the reactions table. Every column may be missing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawReaction {
    #[serde(rename = "User", deserialize_with = "lenient_opt_user_id")]
    pub user: Option<UserId>,
    #[serde(rename = "Reaction Type", deserialize_with = "lenient_opt_string")]
    pub reaction_type: Option<String>,
    /// Epoch seconds. Kept as a float so a median fill can land between
    /// two whole seconds.
    #[serde(rename = "Reaction Date", deserialize_with = "lenient_opt_f64")]
    pub reaction_date: Option<f64>,
}

/// The four source tables exactly as loaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTables {
    pub users: Vec<RawUser>,
    pub friendships: Vec<RawFriendship>,
    pub posts: Vec<RawPost>,
    pub reactions: Vec<RawReaction>,
}

// ---------------------------------------------------------------------------
// Cleaned rows
// ---------------------------------------------------------------------------

/// A user after timestamp conversion and dedup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct User {
    pub name: String,
    pub surname: String,
    pub age: i64,
    pub subscribed_at: DateTime<Utc>,
}

/// A post after timestamp conversion and dedup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Post {
    pub user: UserId,
    pub post_type: String,
    pub posted_at: DateTime<Utc>,
}

/// A reaction after null handling, timestamp conversion and dedup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Reaction {
    pub user: UserId,
    pub reaction_type: String,
    pub reacted_at: DateTime<Utc>,
}

/// The four tables after cleaning, in original relative order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanTables {
    pub users: Vec<User>,
    pub friendships: Vec<RawFriendship>,
    pub posts: Vec<Post>,
    pub reactions: Vec<Reaction>,
}

// ---------------------------------------------------------------------------
// Numbered side tables
// ---------------------------------------------------------------------------

/// A cleaned post with its assigned sequential id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRecord {
    pub post_id: PostId,
    pub user_id: UserId,
    pub post_type: String,
    pub posted_at: DateTime<Utc>,
}

/// A cleaned reaction with its sequential id and synthetic target post.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReactionRecord {
    pub reaction_id: ReactionId,
    pub user_id: UserId,
    pub reaction_type: String,
    pub reacted_at: DateTime<Utc>,
    /// `(reaction_id mod post_count) + 1`. Not a real reference.
    pub post_id: PostId,
}

// ---------------------------------------------------------------------------
// Integrated output
// ---------------------------------------------------------------------------

/// Fixed age buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AgeGroup {
    #[serde(rename = "<20")]
    Under20,
    #[serde(rename = "20-29")]
    Twenties,
    #[serde(rename = "30-39")]
    Thirties,
    #[serde(rename = "40-49")]
    Forties,
    #[serde(rename = "50+")]
    FiftyPlus,
}

impl AgeGroup {
    pub const ALL: [AgeGroup; 5] = [
        AgeGroup::Under20,
        AgeGroup::Twenties,
        AgeGroup::Thirties,
        AgeGroup::Forties,
        AgeGroup::FiftyPlus,
    ];

    /// Bucket an age into `[0,20) [20,30) [30,40) [40,50) [50,100]`.
    ///
    /// Returns `None` outside `[0, 100]`.
    pub fn from_age(age: i64) -> Option<Self> {
        match age {
            0..=19 => Some(AgeGroup::Under20),
            20..=29 => Some(AgeGroup::Twenties),
            30..=39 => Some(AgeGroup::Thirties),
            40..=49 => Some(AgeGroup::Forties),
            50..=100 => Some(AgeGroup::FiftyPlus),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgeGroup::Under20 => "<20",
            AgeGroup::Twenties => "20-29",
            AgeGroup::Thirties => "30-39",
            AgeGroup::Forties => "40-49",
            AgeGroup::FiftyPlus => "50+",
        }
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Five-level classification of a user's total activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    /// No activity at all
    Inactive,
    /// 1 to 5
    Low,
    /// 6 to 15
    Medium,
    /// 16 to 30
    High,
    /// More than 30
    VeryHigh,
}

impl ActivityLevel {
    pub const ALL: [ActivityLevel; 5] = [
        ActivityLevel::Inactive,
        ActivityLevel::Low,
        ActivityLevel::Medium,
        ActivityLevel::High,
        ActivityLevel::VeryHigh,
    ];

    pub fn from_total(total_activity: u64) -> Self {
        match total_activity {
            0 => ActivityLevel::Inactive,
            1..=5 => ActivityLevel::Low,
            6..=15 => ActivityLevel::Medium,
            16..=30 => ActivityLevel::High,
            _ => ActivityLevel::VeryHigh,
        }
    }
}

impl fmt::Display for ActivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityLevel::Inactive => write!(f, "inactive"),
            ActivityLevel::Low => write!(f, "low"),
            ActivityLevel::Medium => write!(f, "medium"),
            ActivityLevel::High => write!(f, "high"),
            ActivityLevel::VeryHigh => write!(f, "very high"),
        }
    }
}

/// One row of the integrated per-user dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntegratedUserRecord {
    pub user_id: UserId,
    pub name: String,
    pub surname: String,
    pub age: i64,
    pub subscribed_at: DateTime<Utc>,
    pub friend_count: u64,
    pub post_count: u64,
    pub reactions_given: u64,
    pub reactions_received: u64,
    /// `None` when the age lies outside `[0, 100]`.
    pub age_group: Option<AgeGroup>,
    pub registration_year: i32,
    pub is_active_poster: bool,
    pub is_social: bool,
    pub engagement_ratio: f64,
    /// friends + posts + reactions given. Reactions received are not counted.
    pub total_activity: u64,
}

impl IntegratedUserRecord {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.surname)
    }

    pub fn activity_level(&self) -> ActivityLevel {
        ActivityLevel::from_total(self.total_activity)
    }
}

/// Per-table bookkeeping of what the cleaner did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableCleaning {
    pub rows_in: usize,
    pub missing_actor_dropped: usize,
    pub types_filled: usize,
    pub dates_filled: usize,
    pub duplicates_removed: usize,
    pub rows_out: usize,
}

/// Cleaning bookkeeping for all four tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleaningReport {
    pub users: TableCleaning,
    pub friendships: TableCleaning,
    pub posts: TableCleaning,
    pub reactions: TableCleaning,
}

/// Everything one pipeline run produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub users: Vec<IntegratedUserRecord>,
    pub posts: Vec<PostRecord>,
    pub reactions: Vec<ReactionRecord>,
    /// Number of cleaned friendship rows.
    pub friendship_count: usize,
    pub cleaning: CleaningReport,
}

// ---------------------------------------------------------------------------
// Lenient column parsing
// ---------------------------------------------------------------------------

/// Parse an integer cell, accepting a float spelling with no fraction
/// (`"12.0"`). Returns `None` for blanks and `NaN`.
pub fn parse_lenient_i64(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = trimmed.parse::<i64>() {
        return Some(value);
    }
    let value = trimmed.parse::<f64>().ok()?;
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}

fn parse_lenient_f64(raw: &str) -> Option<f64> {
    let value = raw.trim().parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}

fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_lenient_i64(&raw).ok_or_else(|| de::Error::custom(format!("invalid integer `{}`", raw)))
}

fn lenient_user_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<UserId, D::Error> {
    lenient_i64(deserializer).map(UserId)
}

fn lenient_opt_user_id<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<UserId>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) if s.eq_ignore_ascii_case("nan") => Ok(None),
        Some(s) => parse_lenient_i64(s)
            .map(|id| Some(UserId(id)))
            .ok_or_else(|| de::Error::custom(format!("invalid user id `{}`", s))),
    }
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|s| {
        let trimmed = s.trim();
        !trimmed.is_empty() && !trimmed.eq_ignore_ascii_case("nan")
    }))
}

fn lenient_opt_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) if s.eq_ignore_ascii_case("nan") => Ok(None),
        Some(s) => parse_lenient_f64(s)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid number `{}`", s))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_age_group_buckets() {
        assert_eq!(AgeGroup::from_age(0), Some(AgeGroup::Under20));
        assert_eq!(AgeGroup::from_age(15), Some(AgeGroup::Under20));
        assert_eq!(AgeGroup::from_age(20), Some(AgeGroup::Twenties));
        assert_eq!(AgeGroup::from_age(35), Some(AgeGroup::Thirties));
        assert_eq!(AgeGroup::from_age(49), Some(AgeGroup::Forties));
        assert_eq!(AgeGroup::from_age(65), Some(AgeGroup::FiftyPlus));
        assert_eq!(AgeGroup::from_age(100), Some(AgeGroup::FiftyPlus));
        assert_eq!(AgeGroup::from_age(101), None);
        assert_eq!(AgeGroup::from_age(-1), None);
    }

    #[test]
    fn test_age_group_ordering_and_labels() {
        assert!(AgeGroup::Under20 < AgeGroup::FiftyPlus);
        let labels: Vec<_> = AgeGroup::ALL.iter().map(|g| g.label()).collect();
        assert_eq!(labels, vec!["<20", "20-29", "30-39", "40-49", "50+"]);
    }

    #[test]
    fn test_activity_level_boundaries() {
        assert_eq!(ActivityLevel::from_total(0), ActivityLevel::Inactive);
        assert_eq!(ActivityLevel::from_total(1), ActivityLevel::Low);
        assert_eq!(ActivityLevel::from_total(5), ActivityLevel::Low);
        assert_eq!(ActivityLevel::from_total(6), ActivityLevel::Medium);
        assert_eq!(ActivityLevel::from_total(15), ActivityLevel::Medium);
        assert_eq!(ActivityLevel::from_total(16), ActivityLevel::High);
        assert_eq!(ActivityLevel::from_total(30), ActivityLevel::High);
        assert_eq!(ActivityLevel::from_total(31), ActivityLevel::VeryHigh);
        assert_eq!(ActivityLevel::VeryHigh.to_string(), "very high");
    }

    #[test]
    fn test_parse_lenient_i64() {
        assert_eq!(parse_lenient_i64("12"), Some(12));
        assert_eq!(parse_lenient_i64(" 12.0 "), Some(12));
        assert_eq!(parse_lenient_i64("12.5"), None);
        assert_eq!(parse_lenient_i64(""), None);
        assert_eq!(parse_lenient_i64("NaN"), None);
    }

    #[test]
    fn test_raw_reaction_deserializes_blanks_as_missing() {
        let data = "User,Reaction Type,Reaction Date\n3.0,,\n,like,1600000000\n1,NaN,NaN\n";
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let rows: Vec<RawReaction> = reader.deserialize().collect::<Result<_, _>>().unwrap();

        assert_eq!(rows[0].user, Some(UserId(3)));
        assert_eq!(rows[0].reaction_type, None);
        assert_eq!(rows[0].reaction_date, None);
        assert_eq!(rows[1].user, None);
        assert_eq!(rows[1].reaction_type.as_deref(), Some("like"));
        assert_eq!(rows[1].reaction_date, Some(1_600_000_000.0));
        assert_eq!(rows[2].user, Some(UserId(1)));
        assert_eq!(rows[2].reaction_type, None);
        assert_eq!(rows[2].reaction_date, None);
    }
}
