//! Descriptive statistics over the integrated dataset.
//!
//! Everything here is a pure function of a [`Dataset`]; nothing is cached
//! and every value can be recomputed on demand.

use crate::models::{
    ActivityLevel, AgeGroup, Dataset, IntegratedUserRecord, PostRecord, ReactionRecord,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// A label with a count, used for categorical breakdowns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub label: String,
    pub count: usize,
    /// Share of the breakdown's total, in percent.
    pub pct: f64,
}

/// Headline numbers over the whole dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub total_users: usize,
    pub total_friendships: usize,
    pub total_posts: usize,
    pub total_reactions: usize,
    pub mean_age: Option<f64>,
    pub median_age: Option<f64>,
    /// Sample standard deviation. `None` for fewer than two users.
    pub std_age: Option<f64>,
    pub min_age: Option<i64>,
    pub max_age: Option<i64>,
    pub users_with_friends: usize,
    pub mean_friends_per_social_user: Option<f64>,
    pub max_friends: Option<u64>,
    pub active_posters: usize,
    pub active_poster_pct: Option<f64>,
    pub mean_posts_per_active_poster: Option<f64>,
    pub max_posts: Option<u64>,
    pub users_reacting: usize,
    pub users_reacting_pct: Option<f64>,
}

/// Mean activity of the users in one age group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeGroupActivity {
    pub age_group: AgeGroup,
    pub users: usize,
    pub mean_friends: f64,
    pub mean_posts: f64,
    pub mean_reactions_given: f64,
    pub mean_reactions_received: f64,
}

/// Reactions per calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: usize,
}

/// Engagement ratio among users with at least one post.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngagementStats {
    pub posters: usize,
    pub mean: f64,
    pub median: f64,
    pub pct_above_median: f64,
}

/// Column a ranking or correlation is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Age,
    FriendCount,
    PostCount,
    ReactionsGiven,
    ReactionsReceived,
    EngagementRatio,
    TotalActivity,
}

impl Metric {
    pub fn name(&self) -> &'static str {
        match self {
            Metric::Age => "age",
            Metric::FriendCount => "friend_count",
            Metric::PostCount => "post_count",
            Metric::ReactionsGiven => "reactions_given",
            Metric::ReactionsReceived => "reactions_received",
            Metric::EngagementRatio => "engagement_ratio",
            Metric::TotalActivity => "total_activity",
        }
    }

    pub fn value(&self, record: &IntegratedUserRecord) -> f64 {
        match self {
            Metric::Age => record.age as f64,
            Metric::FriendCount => record.friend_count as f64,
            Metric::PostCount => record.post_count as f64,
            Metric::ReactionsGiven => record.reactions_given as f64,
            Metric::ReactionsReceived => record.reactions_received as f64,
            Metric::EngagementRatio => record.engagement_ratio,
            Metric::TotalActivity => record.total_activity as f64,
        }
    }
}

/// Columns the correlation matrix is computed over.
pub const CORRELATION_METRICS: [Metric; 6] = [
    Metric::Age,
    Metric::FriendCount,
    Metric::PostCount,
    Metric::ReactionsGiven,
    Metric::ReactionsReceived,
    Metric::TotalActivity,
];

/// Pairwise Pearson correlations. `None` where a column has no variance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub metrics: Vec<Metric>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn compute(records: &[IntegratedUserRecord], metrics: &[Metric]) -> Self {
        let columns: Vec<Vec<f64>> = metrics
            .iter()
            .map(|m| records.iter().map(|r| m.value(r)).collect())
            .collect();

        let values = columns
            .iter()
            .map(|xs| columns.iter().map(|ys| pearson(xs, ys)).collect())
            .collect();

        Self {
            metrics: metrics.to_vec(),
            values,
        }
    }

    pub fn get(&self, a: Metric, b: Metric) -> Option<f64> {
        let i = self.metrics.iter().position(|m| *m == a)?;
        let j = self.metrics.iter().position(|m| *m == b)?;
        self.values[i][j]
    }

    /// The off-diagonal pair with the largest absolute correlation, ignoring
    /// perfect correlations.
    pub fn strongest_pair(&self) -> Option<(Metric, Metric, f64)> {
        let mut best: Option<(Metric, Metric, f64)> = None;
        for (i, row) in self.values.iter().enumerate() {
            for (j, value) in row.iter().enumerate().skip(i + 1) {
                let Some(r) = *value else { continue };
                // Self-identical columns are not interesting.
                if 1.0 - r.abs() < 1e-12 {
                    continue;
                }
                if best.map_or(true, |(_, _, b)| r.abs() > b.abs()) {
                    best = Some((self.metrics[i], self.metrics[j], r));
                }
            }
        }
        best
    }
}

/// Mean total activity per age group and registration year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityHeatmap {
    pub years: Vec<i32>,
    pub rows: Vec<HeatmapRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapRow {
    pub age_group: AgeGroup,
    /// One cell per entry of `years`; `None` where no user falls in the cell.
    pub cells: Vec<Option<f64>>,
}

impl ActivityHeatmap {
    /// Users without an age group are left out.
    pub fn compute(records: &[IntegratedUserRecord]) -> Self {
        let mut sums: BTreeMap<(AgeGroup, i32), (u64, usize)> = BTreeMap::new();
        let mut years = BTreeSet::new();

        for record in records {
            let Some(group) = record.age_group else { continue };
            years.insert(record.registration_year);
            let cell = sums.entry((group, record.registration_year)).or_default();
            cell.0 += record.total_activity;
            cell.1 += 1;
        }

        let years: Vec<i32> = years.into_iter().collect();
        let rows = AgeGroup::ALL
            .iter()
            .filter(|group| sums.keys().any(|(g, _)| g == *group))
            .map(|group| HeatmapRow {
                age_group: *group,
                cells: years
                    .iter()
                    .map(|year| {
                        sums.get(&(*group, *year))
                            .map(|(sum, n)| *sum as f64 / *n as f64)
                    })
                    .collect(),
            })
            .collect();

        Self { years, rows }
    }

    /// The cell with the highest mean activity. Ties keep the first cell in
    /// age-group, then year order.
    pub fn peak(&self) -> Option<(AgeGroup, i32, f64)> {
        let mut best: Option<(AgeGroup, i32, f64)> = None;
        for row in &self.rows {
            for (year, cell) in self.years.iter().zip(&row.cells) {
                let Some(value) = *cell else { continue };
                if best.map_or(true, |(_, _, b)| value > b) {
                    best = Some((row.age_group, *year, value));
                }
            }
        }
        best
    }

    pub fn get(&self, group: AgeGroup, year: i32) -> Option<f64> {
        let column = self.years.iter().position(|y| *y == year)?;
        self.rows
            .iter()
            .find(|row| row.age_group == group)
            .and_then(|row| row.cells[column])
    }
}

/// Consumer-side selection over the integrated table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UserFilter {
    pub min_age: Option<i64>,
    pub max_age: Option<i64>,
    pub min_activity: Option<u64>,
}

impl UserFilter {
    pub fn matches(&self, record: &IntegratedUserRecord) -> bool {
        self.min_age.map_or(true, |min| record.age >= min)
            && self.max_age.map_or(true, |max| record.age <= max)
            && self
                .min_activity
                .map_or(true, |min| record.total_activity >= min)
    }

    pub fn is_empty(&self) -> bool {
        self.min_age.is_none() && self.max_age.is_none() && self.min_activity.is_none()
    }

    pub fn apply<'a>(&self, records: &'a [IntegratedUserRecord]) -> Vec<&'a IntegratedUserRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}

/// Summary of a filtered selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterSummary {
    pub filter: UserFilter,
    pub users: usize,
    pub mean_activity: Option<f64>,
    pub mean_engagement: Option<f64>,
}

impl FilterSummary {
    pub fn compute(records: &[IntegratedUserRecord], filter: UserFilter) -> Self {
        let selected = filter.apply(records);
        let activity: Vec<f64> = selected.iter().map(|r| r.total_activity as f64).collect();
        let engagement: Vec<f64> = selected.iter().map(|r| r.engagement_ratio).collect();
        Self {
            filter,
            users: selected.len(),
            mean_activity: mean(&activity),
            mean_engagement: mean(&engagement),
        }
    }
}

/// Short findings distilled from the other statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyInsights {
    pub most_active_age_group: Option<AgeGroup>,
    pub friends_posts_correlation: Option<f64>,
    pub age_activity_correlation: Option<f64>,
    pub top_reaction_type: Option<String>,
    pub inactive_pct: Option<f64>,
    pub high_engagement_pct: Option<f64>,
}

/// Every statistic the report renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insights {
    pub overview: Overview,
    pub age_distribution: Vec<CategoryCount>,
    pub age_group_activity: Vec<AgeGroupActivity>,
    pub top_by_activity: Vec<IntegratedUserRecord>,
    pub top_by_posts: Vec<IntegratedUserRecord>,
    pub reaction_types: Vec<CategoryCount>,
    pub post_types: Vec<CategoryCount>,
    pub reaction_timeline: Vec<DailyCount>,
    pub activity_levels: Vec<CategoryCount>,
    pub engagement: Option<EngagementStats>,
    pub correlations: CorrelationMatrix,
    pub heatmap: ActivityHeatmap,
    pub key_insights: KeyInsights,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filtered: Option<FilterSummary>,
}

impl Insights {
    pub fn compute(dataset: &Dataset, top_n: usize, filter: UserFilter) -> Self {
        let records = &dataset.users;
        let correlations = CorrelationMatrix::compute(records, &CORRELATION_METRICS);
        let age_group_activity = age_group_activity(records);
        let engagement = engagement_stats(records);
        let reaction_types = reaction_type_counts(&dataset.reactions);

        let key_insights = KeyInsights {
            most_active_age_group: most_active_age_group(records),
            friends_posts_correlation: correlations.get(Metric::FriendCount, Metric::PostCount),
            age_activity_correlation: correlations.get(Metric::Age, Metric::TotalActivity),
            top_reaction_type: reaction_types.first().map(|c| c.label.clone()),
            inactive_pct: percentage(
                records.iter().filter(|r| r.total_activity == 0).count(),
                records.len(),
            ),
            high_engagement_pct: engagement.as_ref().map(|e| e.pct_above_median),
        };

        Self {
            overview: overview(dataset),
            age_distribution: age_distribution(records),
            age_group_activity,
            top_by_activity: top_performers(records, Metric::TotalActivity, top_n),
            top_by_posts: top_performers(records, Metric::PostCount, top_n),
            reaction_types,
            post_types: post_type_counts(&dataset.posts),
            reaction_timeline: daily_reaction_timeline(&dataset.reactions),
            activity_levels: activity_distribution(records),
            engagement,
            correlations,
            heatmap: ActivityHeatmap::compute(records),
            key_insights,
            filtered: (!filter.is_empty()).then(|| FilterSummary::compute(records, filter)),
        }
    }
}

pub fn overview(dataset: &Dataset) -> Overview {
    let records = &dataset.users;
    let mut ages: Vec<f64> = records.iter().map(|r| r.age as f64).collect();
    let total = records.len();

    let social: Vec<f64> = records
        .iter()
        .filter(|r| r.is_social)
        .map(|r| r.friend_count as f64)
        .collect();
    let posters: Vec<f64> = records
        .iter()
        .filter(|r| r.is_active_poster)
        .map(|r| r.post_count as f64)
        .collect();
    let users_reacting = records.iter().filter(|r| r.reactions_given > 0).count();

    Overview {
        total_users: total,
        total_friendships: dataset.friendship_count,
        total_posts: dataset.posts.len(),
        total_reactions: dataset.reactions.len(),
        mean_age: mean(&ages),
        std_age: sample_std(&ages),
        median_age: median(&mut ages),
        min_age: records.iter().map(|r| r.age).min(),
        max_age: records.iter().map(|r| r.age).max(),
        users_with_friends: social.len(),
        mean_friends_per_social_user: mean(&social),
        max_friends: records.iter().map(|r| r.friend_count).max(),
        active_posters: posters.len(),
        active_poster_pct: percentage(posters.len(), total),
        mean_posts_per_active_poster: mean(&posters),
        max_posts: records.iter().map(|r| r.post_count).max(),
        users_reacting,
        users_reacting_pct: percentage(users_reacting, total),
    }
}

/// User count per age group, in bucket order, including empty groups.
pub fn age_distribution(records: &[IntegratedUserRecord]) -> Vec<CategoryCount> {
    AgeGroup::ALL
        .iter()
        .map(|group| {
            let count = records
                .iter()
                .filter(|r| r.age_group == Some(*group))
                .count();
            category(group.label(), count, records.len())
        })
        .collect()
}

/// Mean counts per age group. Groups without users are omitted.
pub fn age_group_activity(records: &[IntegratedUserRecord]) -> Vec<AgeGroupActivity> {
    AgeGroup::ALL
        .iter()
        .filter_map(|group| {
            let members: Vec<_> = records
                .iter()
                .filter(|r| r.age_group == Some(*group))
                .collect();
            if members.is_empty() {
                return None;
            }
            let n = members.len() as f64;
            let avg = |f: fn(&IntegratedUserRecord) -> u64| {
                members.iter().map(|r| f(*r) as f64).sum::<f64>() / n
            };
            Some(AgeGroupActivity {
                age_group: *group,
                users: members.len(),
                mean_friends: avg(|r| r.friend_count),
                mean_posts: avg(|r| r.post_count),
                mean_reactions_given: avg(|r| r.reactions_given),
                mean_reactions_received: avg(|r| r.reactions_received),
            })
        })
        .collect()
}

/// Age group with the highest mean total activity.
pub fn most_active_age_group(records: &[IntegratedUserRecord]) -> Option<AgeGroup> {
    let mut best: Option<(AgeGroup, f64)> = None;
    for group in AgeGroup::ALL {
        let activity: Vec<f64> = records
            .iter()
            .filter(|r| r.age_group == Some(group))
            .map(|r| r.total_activity as f64)
            .collect();
        if let Some(avg) = mean(&activity) {
            if best.map_or(true, |(_, b)| avg > b) {
                best = Some((group, avg));
            }
        }
    }
    best.map(|(group, _)| group)
}

/// The `n` highest records by `metric`. Ties keep table order.
pub fn top_performers(
    records: &[IntegratedUserRecord],
    metric: Metric,
    n: usize,
) -> Vec<IntegratedUserRecord> {
    let mut ranked: Vec<&IntegratedUserRecord> = records.iter().collect();
    ranked.sort_by(|a, b| metric.value(b).total_cmp(&metric.value(a)));
    ranked.into_iter().take(n).cloned().collect()
}

pub fn reaction_type_counts(reactions: &[ReactionRecord]) -> Vec<CategoryCount> {
    sorted_counts(reactions.iter().map(|r| r.reaction_type.as_str()))
}

pub fn post_type_counts(posts: &[PostRecord]) -> Vec<CategoryCount> {
    sorted_counts(posts.iter().map(|p| p.post_type.as_str()))
}

/// Reactions per calendar day, oldest first.
pub fn daily_reaction_timeline(reactions: &[ReactionRecord]) -> Vec<DailyCount> {
    let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for reaction in reactions {
        *per_day.entry(reaction.reacted_at.date_naive()).or_default() += 1;
    }
    per_day
        .into_iter()
        .map(|(date, count)| DailyCount { date, count })
        .collect()
}

/// User count per activity level, in level order.
pub fn activity_distribution(records: &[IntegratedUserRecord]) -> Vec<CategoryCount> {
    ActivityLevel::ALL
        .iter()
        .map(|level| {
            let count = records
                .iter()
                .filter(|r| r.activity_level() == *level)
                .count();
            category(&level.to_string(), count, records.len())
        })
        .collect()
}

pub fn engagement_stats(records: &[IntegratedUserRecord]) -> Option<EngagementStats> {
    let mut ratios: Vec<f64> = records
        .iter()
        .filter(|r| r.is_active_poster)
        .map(|r| r.engagement_ratio)
        .collect();
    let mean = mean(&ratios)?;
    let median = median(&mut ratios)?;
    let above = ratios.iter().filter(|r| **r > median).count();

    Some(EngagementStats {
        posters: ratios.len(),
        mean,
        median,
        pct_above_median: above as f64 / ratios.len() as f64 * 100.0,
    })
}

/// Describe a correlation coefficient.
pub fn strength_label(r: f64) -> &'static str {
    let magnitude = r.abs();
    if magnitude < 0.3 {
        "weak"
    } else if magnitude < 0.7 {
        "moderate"
    } else {
        "strong"
    }
}

/// Like [`strength_label`], with a `"none"` tier below 0.1.
pub fn relationship_label(r: f64) -> &'static str {
    if r.abs() < 0.1 {
        "none"
    } else {
        strength_label(r)
    }
}

/// Pearson correlation. `None` for fewer than two points or zero variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mx = mean(xs)?;
    let my = mean(ys)?;

    let (mut cov, mut vx, mut vy) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        let (dx, dy) = (x - mx, y - my);
        cov += dx * dy;
        vx += dx * dx;
        vy += dy * dy;
    }

    if vx == 0.0 || vy == 0.0 {
        return None;
    }
    Some((cov / (vx.sqrt() * vy.sqrt())).clamp(-1.0, 1.0))
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn median(values: &mut [f64]) -> Option<f64> {
    crate::pipeline::cleaner::median(values)
}

fn percentage(part: usize, whole: usize) -> Option<f64> {
    (whole > 0).then(|| part as f64 / whole as f64 * 100.0)
}

fn category(label: &str, count: usize, total: usize) -> CategoryCount {
    CategoryCount {
        label: label.to_string(),
        count,
        pct: percentage(count, total).unwrap_or(0.0),
    }
}

/// Sample standard deviation (n - 1 denominator).
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Counts per label, most frequent first, ties by label.
fn sorted_counts<'a>(labels: impl Iterator<Item = &'a str>) -> Vec<CategoryCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut total = 0;
    for label in labels {
        *counts.entry(label).or_default() += 1;
        total += 1;
    }
    let mut sorted: Vec<CategoryCount> = counts
        .into_iter()
        .map(|(label, count)| category(label, count, total))
        .collect();
    sorted.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    sorted
}
