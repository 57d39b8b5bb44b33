use chrono::{DateTime, Datelike, Duration, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use crate::{
    database::FileStore,
    models::{
        AnalyticsSummary, ChartData, CountEntry, FormType, MetadataRecord, TherapistRating,
        TrendBucket, TrendPeriod,
    },
    services::{
        master_file_service,
        wizard_service::{PRESSURE_PREFERENCES, PRESSURE_RATINGS},
    },
    utils::{AppResult, TtlCache},
};

const TOP_N: usize = 10;
const AGE_GROUPS: [&str; 6] = ["under_25", "25-34", "35-44", "45-54", "55-64", "65+"];

/// Master-file contents plus the aggregates computed from them
#[derive(Debug)]
pub struct AnalyticsSnapshot {
    pub intakes: Vec<MetadataRecord>,
    pub feedback: Vec<MetadataRecord>,
    pub summary: AnalyticsSummary,
    pub charts: ChartData,
    pub computed_at: DateTime<Utc>,
}

pub type AnalyticsCache = TtlCache<AnalyticsSnapshot>;

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SubmissionPage {
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub items: Vec<MetadataRecord>,
}

/// Cached snapshot, recomputed from the master files on a miss
pub async fn snapshot(store: &FileStore, cache: &AnalyticsCache) -> AppResult<Arc<AnalyticsSnapshot>> {
    if let Some(cached) = cache.get() {
        return Ok(cached);
    }

    let generation = cache.generation();
    let intakes = master_file_service::load(store, FormType::Intake).await?;
    let feedback = master_file_service::load(store, FormType::Feedback).await?;
    log::info!(
        "📊 Recomputing analytics ({} intakes, {} feedback)",
        intakes.len(),
        feedback.len()
    );

    Ok(cache.set_if_current(generation, compute(intakes, feedback, Utc::now())))
}

pub fn compute(intakes: Vec<MetadataRecord>, feedback: Vec<MetadataRecord>, now: DateTime<Utc>) -> AnalyticsSnapshot {
    let summary = summarize(&intakes, &feedback, now);
    let charts = charts(&intakes, &feedback);
    AnalyticsSnapshot {
        intakes,
        feedback,
        summary,
        charts,
        computed_at: now,
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn mean<I: Iterator<Item = f64>>(values: I) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| round2(sum / count as f64))
}

fn percentage<I: Iterator<Item = bool>>(flags: I) -> Option<f64> {
    let (yes, count) = flags.fold((0usize, 0usize), |(y, c), f| (y + f as usize, c + 1));
    (count > 0).then(|| round1(yes as f64 * 100.0 / count as f64))
}

pub fn summarize(intakes: &[MetadataRecord], feedback: &[MetadataRecord], now: DateTime<Utc>) -> AnalyticsSummary {
    let cutoff = now - Duration::days(30);

    let unique_clients: HashSet<String> = intakes.iter().chain(feedback).map(|r| r.client_key()).collect();

    let mut intakes_per_client: HashMap<String, usize> = HashMap::new();
    for record in intakes {
        *intakes_per_client.entry(record.client_key()).or_default() += 1;
    }

    let intake_details = || intakes.iter().filter_map(|r| r.intake.as_ref());
    let feedback_details = || feedback.iter().filter_map(|r| r.feedback.as_ref());

    AnalyticsSummary {
        total_intakes: intakes.len(),
        total_feedback: feedback.len(),
        unique_clients: unique_clients.len(),
        returning_clients: intakes_per_client.values().filter(|&&n| n > 1).count(),
        first_time_rate: percentage(intake_details().map(|i| i.first_visit)),
        average_rating: mean(feedback_details().map(|f| f.overall_rating as f64)),
        average_comfort: mean(feedback_details().filter_map(|f| f.comfort_rating).map(f64::from)),
        recommend_rate: percentage(feedback_details().map(|f| f.would_recommend)),
        return_rate: percentage(feedback_details().map(|f| f.would_return)),
        average_pain_reduction: mean(feedback_details().filter_map(|f| f.pain_change).map(f64::from)),
        intakes_last_30_days: intakes.iter().filter(|r| r.submitted_at >= cutoff).count(),
        feedback_last_30_days: feedback.iter().filter(|r| r.submitted_at >= cutoff).count(),
        last_submission_at: intakes.iter().chain(feedback).map(|r| r.submitted_at).max(),
    }
}

pub fn period_key(at: DateTime<Utc>, period: TrendPeriod) -> String {
    match period {
        TrendPeriod::Day => at.format("%Y-%m-%d").to_string(),
        TrendPeriod::Week => {
            let week = at.iso_week();
            format!("{}-W{:02}", week.year(), week.week())
        }
        TrendPeriod::Month => at.format("%Y-%m").to_string(),
    }
}

/// Ascending buckets; `limit` keeps the most recent ones
pub fn trends(snapshot: &AnalyticsSnapshot, period: TrendPeriod, limit: Option<usize>) -> Vec<TrendBucket> {
    #[derive(Default)]
    struct Acc {
        intakes: usize,
        feedback: usize,
        rated: usize,
        rating_sum: f64,
    }

    let mut buckets: BTreeMap<String, Acc> = BTreeMap::new();
    for record in &snapshot.intakes {
        buckets.entry(period_key(record.submitted_at, period)).or_default().intakes += 1;
    }
    for record in &snapshot.feedback {
        let acc = buckets.entry(period_key(record.submitted_at, period)).or_default();
        acc.feedback += 1;
        if let Some(fb) = &record.feedback {
            acc.rated += 1;
            acc.rating_sum += fb.overall_rating as f64;
        }
    }

    let mut result: Vec<TrendBucket> = buckets
        .into_iter()
        .map(|(period, acc)| TrendBucket {
            period,
            intakes: acc.intakes,
            feedback: acc.feedback,
            average_rating: (acc.rated > 0).then(|| round2(acc.rating_sum / acc.rated as f64)),
        })
        .collect();

    if let Some(limit) = limit {
        if result.len() > limit {
            result.drain(..result.len() - limit);
        }
    }
    result
}

fn fixed_counts<'a, I: Iterator<Item = &'a str>>(labels: &[&str], values: I) -> Vec<CountEntry> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for v in values {
        *counts.entry(v).or_default() += 1;
    }
    labels
        .iter()
        .map(|l| CountEntry {
            label: l.to_string(),
            count: counts.get(*l).copied().unwrap_or(0),
        })
        .collect()
}

/// Counts sorted by frequency then label, capped at `top`
fn ranked<I: Iterator<Item = String>>(values: I, top: usize) -> Vec<CountEntry> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for v in values {
        *counts.entry(v).or_default() += 1;
    }
    let mut entries: Vec<CountEntry> = counts
        .into_iter()
        .map(|(label, count)| CountEntry { label, count })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    entries.truncate(top);
    entries
}

pub fn age_group(age: u32) -> &'static str {
    match age {
        0..=24 => AGE_GROUPS[0],
        25..=34 => AGE_GROUPS[1],
        35..=44 => AGE_GROUPS[2],
        45..=54 => AGE_GROUPS[3],
        55..=64 => AGE_GROUPS[4],
        _ => AGE_GROUPS[5],
    }
}

/// Same thresholds as the SOAP assessment wording
fn pain_change_bucket(change: i16) -> &'static str {
    match change {
        c if c >= 3 => "significant_reduction",
        c if c >= 1 => "moderate_reduction",
        0 => "no_change",
        _ => "increased",
    }
}

pub fn charts(intakes: &[MetadataRecord], feedback: &[MetadataRecord]) -> ChartData {
    let intake_details: Vec<_> = intakes.iter().filter_map(|r| r.intake.as_ref()).collect();
    let feedback_details: Vec<_> = feedback.iter().filter_map(|r| r.feedback.as_ref()).collect();

    let ratings: Vec<String> = feedback_details.iter().map(|f| f.overall_rating.to_string()).collect();

    let mut age_groups = fixed_counts(
        &AGE_GROUPS,
        intake_details.iter().filter_map(|i| i.age).map(age_group),
    );
    let unknown_age = intake_details.iter().filter(|i| i.age.is_none()).count();
    if unknown_age > 0 {
        age_groups.push(CountEntry {
            label: "unknown".to_string(),
            count: unknown_age,
        });
    }

    let mut therapist_totals: BTreeMap<String, (usize, f64)> = BTreeMap::new();
    for f in &feedback_details {
        if let Some(name) = f.therapist_name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            let entry = therapist_totals.entry(name.to_string()).or_default();
            entry.0 += 1;
            entry.1 += f.overall_rating as f64;
        }
    }
    let mut therapists: Vec<TherapistRating> = therapist_totals
        .into_iter()
        .map(|(therapist, (sessions, sum))| TherapistRating {
            therapist,
            sessions,
            average_rating: round2(sum / sessions as f64),
        })
        .collect();
    therapists.sort_by(|a, b| {
        b.average_rating
            .partial_cmp(&a.average_rating)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.therapist.cmp(&b.therapist))
    });

    ChartData {
        pressure_preferences: fixed_counts(
            PRESSURE_PREFERENCES,
            intake_details.iter().map(|i| i.pressure_preference.as_str()),
        ),
        rating_distribution: fixed_counts(&["1", "2", "3", "4", "5"], ratings.iter().map(String::as_str)),
        pressure_ratings: fixed_counts(
            PRESSURE_RATINGS,
            feedback_details.iter().map(|f| f.pressure_rating.as_str()),
        ),
        pain_areas: ranked(intake_details.iter().flat_map(|i| i.pain_areas.iter().cloned()), TOP_N),
        primary_concerns: ranked(
            intake_details.iter().flat_map(|i| i.primary_concerns.iter().cloned()),
            TOP_N,
        ),
        referral_sources: ranked(
            intake_details
                .iter()
                .map(|i| i.referral_source.clone().unwrap_or_else(|| "not_specified".to_string())),
            TOP_N,
        ),
        age_groups,
        pain_change: fixed_counts(
            &["increased", "no_change", "moderate_reduction", "significant_reduction"],
            feedback_details.iter().filter_map(|f| f.pain_change).map(pain_change_bucket),
        ),
        therapists,
    }
}

/// Newest first, optionally filtered by category
pub fn submissions(
    snapshot: &AnalyticsSnapshot,
    form_type: Option<FormType>,
    limit: usize,
    offset: usize,
) -> SubmissionPage {
    let mut all: Vec<&MetadataRecord> = match form_type {
        Some(FormType::Intake) => snapshot.intakes.iter().collect(),
        Some(FormType::Feedback) => snapshot.feedback.iter().collect(),
        None => snapshot.intakes.iter().chain(&snapshot.feedback).collect(),
    };
    all.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));

    SubmissionPage {
        total: all.len(),
        limit,
        offset,
        items: all.into_iter().skip(offset).take(limit).cloned().collect(),
    }
}
