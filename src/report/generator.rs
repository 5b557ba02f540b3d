//! Markdown, JSON and CSV rendering.
//!
//! The Markdown report is the textual counterpart of the exploration
//! dashboard: one section per view, tables instead of charts.

use super::insights::{
    relationship_label, strength_label, ActivityHeatmap, CategoryCount, CorrelationMatrix,
    FilterSummary, Insights, KeyInsights, Overview,
};
use super::{Report, ReportMetadata};
use crate::models::{CleaningReport, IntegratedUserRecord, TableCleaning};
use anyhow::{Context, Result};

/// How many of the busiest reaction days to list.
const TIMELINE_TOP_DAYS: usize = 10;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let insights = &report.insights;
    let mut output = String::new();

    output.push_str("# Social Network Insight Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_table_of_contents(insights));
    output.push_str(&generate_cleaning_section(&report.cleaning));
    output.push_str(&generate_overview_section(&insights.overview));
    output.push_str(&generate_demographics_section(insights));
    output.push_str(&generate_top_performers_section(insights));
    output.push_str(&generate_reactions_section(insights));
    output.push_str(&generate_activity_section(insights));
    output.push_str(&generate_correlation_section(&insights.correlations));
    output.push_str(&generate_heatmap_section(&insights.heatmap));
    output.push_str(&generate_key_insights_section(&insights.key_insights));
    if let Some(ref filtered) = insights.filtered {
        output.push_str(&generate_filter_section(filtered));
    }
    output.push_str(&generate_footer());

    output
}

fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Users:** {}\n", metadata.users_source));
    section.push_str(&format!("- **Friendships:** {}\n", metadata.friendships_source));
    section.push_str(&format!("- **Posts:** {}\n", metadata.posts_source));
    section.push_str(&format!("- **Reactions:** {}\n", metadata.reactions_source));
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n\n",
        metadata.duration_seconds
    ));

    section
}

fn generate_table_of_contents(insights: &Insights) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Data Cleaning](#data-cleaning)\n");
    toc.push_str("- [Overview](#overview)\n");
    toc.push_str("- [Demographics](#demographics)\n");
    toc.push_str("- [Top Performers](#top-performers)\n");
    toc.push_str("- [Reactions](#reactions)\n");
    toc.push_str("- [Activity](#activity)\n");
    toc.push_str("- [Correlations](#correlations)\n");
    toc.push_str("- [Activity by Age and Year](#activity-by-age-and-year)\n");
    toc.push_str("- [Key Insights](#key-insights)\n");
    if insights.filtered.is_some() {
        toc.push_str("- [Filtered Selection](#filtered-selection)\n");
    }
    toc.push('\n');

    toc
}

fn generate_cleaning_section(cleaning: &CleaningReport) -> String {
    let mut section = String::new();

    section.push_str("## Data Cleaning\n\n");
    section.push_str(
        "| Table | Rows In | Missing Actor Dropped | Types Filled | Dates Filled | Duplicates Removed | Rows Out |\n",
    );
    section.push_str("|:---|---:|---:|---:|---:|---:|---:|\n");

    let rows: [(&str, &TableCleaning); 4] = [
        ("users", &cleaning.users),
        ("friendships", &cleaning.friendships),
        ("posts", &cleaning.posts),
        ("reactions", &cleaning.reactions),
    ];
    for (name, table) in rows {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} |\n",
            name,
            table.rows_in,
            table.missing_actor_dropped,
            table.types_filled,
            table.dates_filled,
            table.duplicates_removed,
            table.rows_out
        ));
    }
    section.push('\n');

    section
}

fn generate_overview_section(overview: &Overview) -> String {
    let mut section = String::new();

    section.push_str("## Overview\n\n");
    section.push_str("| 👥 Users | 🤝 Friendships | 📝 Posts | 💝 Reactions |\n");
    section.push_str("|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} |\n\n",
        overview.total_users,
        overview.total_friendships,
        overview.total_posts,
        overview.total_reactions
    ));

    section.push_str("### Users\n\n");
    section.push_str(&format!("- Mean age: {}\n", fmt_opt(overview.mean_age, 1)));
    section.push_str(&format!("- Median age: {}\n", fmt_opt(overview.median_age, 1)));
    section.push_str(&format!("- Age std dev: {}\n", fmt_opt(overview.std_age, 1)));
    if let (Some(min), Some(max)) = (overview.min_age, overview.max_age) {
        section.push_str(&format!("- Age range: {}-{}\n", min, max));
    }

    section.push_str("\n### Friendships\n\n");
    section.push_str(&format!(
        "- Users with friends: {}\n",
        overview.users_with_friends
    ));
    section.push_str(&format!(
        "- Mean friends per user with friends: {}\n",
        fmt_opt(overview.mean_friends_per_social_user, 1)
    ));
    if let Some(max) = overview.max_friends {
        section.push_str(&format!("- Max friends per user: {}\n", max));
    }

    section.push_str("\n### Posts\n\n");
    section.push_str(&format!(
        "- Active posters: {} ({}%)\n",
        overview.active_posters,
        fmt_opt(overview.active_poster_pct, 1)
    ));
    section.push_str(&format!(
        "- Mean posts per active poster: {}\n",
        fmt_opt(overview.mean_posts_per_active_poster, 1)
    ));
    if let Some(max) = overview.max_posts {
        section.push_str(&format!("- Max posts per user: {}\n", max));
    }

    section.push_str("\n### Reactions\n\n");
    section.push_str(&format!(
        "- Users who reacted: {} ({}%)\n\n",
        overview.users_reacting,
        fmt_opt(overview.users_reacting_pct, 1)
    ));

    section
}

fn generate_demographics_section(insights: &Insights) -> String {
    let mut section = String::new();

    section.push_str("## Demographics\n\n");
    section.push_str("### Users per Age Group\n\n");
    section.push_str(&count_table("Age Group", "Users", &insights.age_distribution));

    if !insights.age_group_activity.is_empty() {
        section.push_str("### Mean Activity per Age Group\n\n");
        section.push_str(
            "| Age Group | Users | Friends | Posts | Reactions Given | Reactions Received |\n",
        );
        section.push_str("|:---|---:|---:|---:|---:|---:|\n");
        for row in &insights.age_group_activity {
            section.push_str(&format!(
                "| {} | {} | {:.2} | {:.2} | {:.2} | {:.2} |\n",
                row.age_group,
                row.users,
                row.mean_friends,
                row.mean_posts,
                row.mean_reactions_given,
                row.mean_reactions_received
            ));
        }
        section.push('\n');
    }

    section
}

fn generate_top_performers_section(insights: &Insights) -> String {
    let mut section = String::new();

    section.push_str("## Top Performers\n\n");
    section.push_str("### Most Active Users\n\n");
    section.push_str(&user_table(&insights.top_by_activity));
    section.push_str("### Top Content Creators\n\n");
    section.push_str(&user_table(&insights.top_by_posts));

    section
}

fn generate_reactions_section(insights: &Insights) -> String {
    let mut section = String::new();

    section.push_str("## Reactions\n\n");
    section.push_str("### Reaction Types\n\n");
    section.push_str(&count_table("Type", "Reactions", &insights.reaction_types));

    if let (Some(first), Some(last)) = (
        insights.reaction_timeline.first(),
        insights.reaction_timeline.last(),
    ) {
        section.push_str("### Daily Reactions\n\n");
        section.push_str(&format!(
            "Reactions span {} to {} across {} days.\n\n",
            first.date,
            last.date,
            insights.reaction_timeline.len()
        ));

        let mut busiest = insights.reaction_timeline.clone();
        busiest.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.date.cmp(&b.date)));
        busiest.truncate(TIMELINE_TOP_DAYS);

        section.push_str("| Date | Reactions |\n");
        section.push_str("|:---|---:|\n");
        for day in busiest {
            section.push_str(&format!("| {} | {} |\n", day.date, day.count));
        }
        section.push('\n');
    }

    section
}

fn generate_activity_section(insights: &Insights) -> String {
    let mut section = String::new();

    section.push_str("## Activity\n\n");
    section.push_str("### Activity Levels\n\n");
    section.push_str(&count_table("Level", "Users", &insights.activity_levels));

    if let Some(ref engagement) = insights.engagement {
        section.push_str("### Engagement Among Posters\n\n");
        section.push_str(&format!("- Posters: {}\n", engagement.posters));
        section.push_str(&format!("- Mean engagement ratio: {:.2}\n", engagement.mean));
        section.push_str(&format!("- Median engagement ratio: {:.2}\n", engagement.median));
        section.push_str(&format!(
            "- Above median: {:.1}%\n\n",
            engagement.pct_above_median
        ));
    }

    if !insights.post_types.is_empty() {
        section.push_str("### Post Types\n\n");
        section.push_str(&count_table("Type", "Posts", &insights.post_types));
    }

    section
}

fn generate_correlation_section(matrix: &CorrelationMatrix) -> String {
    let mut section = String::new();

    section.push_str("## Correlations\n\n");
    section.push_str("| |");
    for metric in &matrix.metrics {
        section.push_str(&format!(" {} |", metric.name()));
    }
    section.push_str("\n|:---|");
    section.push_str(&"---:|".repeat(matrix.metrics.len()));
    section.push('\n');

    for (metric, row) in matrix.metrics.iter().zip(&matrix.values) {
        section.push_str(&format!("| **{}** |", metric.name()));
        for value in row {
            section.push_str(&format!(" {} |", fmt_opt(*value, 3)));
        }
        section.push('\n');
    }
    section.push('\n');

    if let Some((a, b, r)) = matrix.strongest_pair() {
        section.push_str(&format!(
            "Strongest relationship: `{}` vs `{}` ({:.3}, {}).\n\n",
            a.name(),
            b.name(),
            r,
            strength_label(r)
        ));
    }

    section
}

fn generate_heatmap_section(heatmap: &ActivityHeatmap) -> String {
    let mut section = String::new();

    section.push_str("## Activity by Age and Year\n\n");
    if heatmap.rows.is_empty() {
        section.push_str("No users with a known age group.\n\n");
        return section;
    }

    section.push_str("Mean total activity per age group and registration year.\n\n");
    section.push_str("| Age Group |");
    for year in &heatmap.years {
        section.push_str(&format!(" {} |", year));
    }
    section.push_str("\n|:---|");
    section.push_str(&"---:|".repeat(heatmap.years.len()));
    section.push('\n');

    for row in &heatmap.rows {
        section.push_str(&format!("| {} |", row.age_group));
        for cell in &row.cells {
            section.push_str(&format!(" {} |", fmt_opt(*cell, 1)));
        }
        section.push('\n');
    }
    section.push('\n');

    if let Some((group, year, value)) = heatmap.peak() {
        section.push_str(&format!(
            "Peak: age group **{}** registered in **{}** ({:.1}).\n\n",
            group, year, value
        ));
    }

    section
}

fn generate_key_insights_section(key: &KeyInsights) -> String {
    let mut section = String::new();

    section.push_str("## Key Insights\n\n");

    if let Some(group) = key.most_active_age_group {
        section.push_str(&format!("- Most active age group: **{}**\n", group));
    }
    if let Some(pct) = key.high_engagement_pct {
        section.push_str(&format!(
            "- {:.1}% of content creators have engagement above the median\n",
            pct
        ));
    }
    if let Some(r) = key.friends_posts_correlation {
        let finding = if r > 0.3 {
            "more social users tend to post more"
        } else if r < -0.3 {
            "more social users tend to post less"
        } else {
            "no strong relationship between friend count and posting"
        };
        section.push_str(&format!(
            "- Friends vs posts correlation {:.3} ({}): {}\n",
            r,
            strength_label(r),
            finding
        ));
    }
    if let Some(r) = key.age_activity_correlation {
        section.push_str(&format!(
            "- Age vs total activity correlation {:.3} ({})\n",
            r,
            relationship_label(r)
        ));
    }
    if let Some(ref reaction) = key.top_reaction_type {
        section.push_str(&format!("- Most common reaction: **{}**\n", reaction));
    }
    if let Some(pct) = key.inactive_pct {
        section.push_str(&format!("- {:.1}% of users are inactive\n", pct));
    }
    section.push('\n');

    section
}

fn generate_filter_section(summary: &FilterSummary) -> String {
    let mut section = String::new();
    let filter = &summary.filter;

    section.push_str("## Filtered Selection\n\n");
    let bound = |v: Option<i64>| v.map_or_else(|| "any".to_string(), |v| v.to_string());
    section.push_str(&format!(
        "Ages {} to {}, minimum total activity {}.\n\n",
        bound(filter.min_age),
        bound(filter.max_age),
        filter.min_activity.unwrap_or(0)
    ));
    section.push_str(&format!("- Users: {}\n", summary.users));
    section.push_str(&format!(
        "- Mean total activity: {}\n",
        fmt_opt(summary.mean_activity, 1)
    ));
    section.push_str(&format!(
        "- Mean engagement ratio: {}\n\n",
        fmt_opt(summary.mean_engagement, 2)
    ));

    section
}

fn generate_footer() -> String {
    "---\n\n*Report generated by social-insight*\n".to_string()
}

fn count_table(label_header: &str, count_header: &str, counts: &[CategoryCount]) -> String {
    let mut table = String::new();
    if counts.is_empty() {
        table.push_str("No data.\n\n");
        return table;
    }

    table.push_str(&format!("| {} | {} | Share |\n", label_header, count_header));
    table.push_str("|:---|---:|---:|\n");
    for entry in counts {
        table.push_str(&format!(
            "| {} | {} | {:.1}% |\n",
            entry.label, entry.count, entry.pct
        ));
    }
    table.push('\n');

    table
}

fn user_table(records: &[IntegratedUserRecord]) -> String {
    let mut table = String::new();
    if records.is_empty() {
        table.push_str("No users.\n\n");
        return table;
    }

    table.push_str(
        "| User | Age | Friends | Posts | Reactions Given | Reactions Received | Total Activity |\n",
    );
    table.push_str("|:---|---:|---:|---:|---:|---:|---:|\n");
    for record in records {
        table.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} |\n",
            record.full_name(),
            record.age,
            record.friend_count,
            record.post_count,
            record.reactions_given,
            record.reactions_received,
            record.total_activity
        ));
    }
    table.push('\n');

    table
}

fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", precision, v),
        None => "n/a".to_string(),
    }
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Render the integrated table as CSV, one row per user.
pub fn generate_csv_table(records: &[IntegratedUserRecord]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer
            .serialize(record)
            .with_context(|| format!("Failed to serialize user {}", record.user_id))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV output: {}", e))?;
    String::from_utf8(bytes).context("CSV output was not valid UTF-8")
}
