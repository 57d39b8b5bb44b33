use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, utoipa::ToSchema)]
pub struct AnalyticsSummary {
    pub total_intakes: usize,
    pub total_feedback: usize,
    pub unique_clients: usize,
    /// Clients with more than one intake
    pub returning_clients: usize,
    /// Percentage of intakes from clients who never had a massage before
    pub first_time_rate: Option<f64>,
    pub average_rating: Option<f64>,
    pub average_comfort: Option<f64>,
    pub recommend_rate: Option<f64>,
    pub return_rate: Option<f64>,
    pub average_pain_reduction: Option<f64>,
    pub intakes_last_30_days: usize,
    pub feedback_last_30_days: usize,
    pub last_submission_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TrendPeriod {
    Day,
    Week,
    #[default]
    Month,
}

#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct TrendBucket {
    pub period: String,
    pub intakes: usize,
    pub feedback: usize,
    pub average_rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct CountEntry {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct TherapistRating {
    pub therapist: String,
    pub sessions: usize,
    pub average_rating: f64,
}

/// Chart-ready aggregates for the dashboard
#[derive(Debug, Clone, Default, PartialEq, Serialize, utoipa::ToSchema)]
pub struct ChartData {
    pub pressure_preferences: Vec<CountEntry>,
    pub rating_distribution: Vec<CountEntry>,
    pub pressure_ratings: Vec<CountEntry>,
    pub pain_areas: Vec<CountEntry>,
    pub primary_concerns: Vec<CountEntry>,
    pub referral_sources: Vec<CountEntry>,
    pub age_groups: Vec<CountEntry>,
    pub pain_change: Vec<CountEntry>,
    pub therapists: Vec<TherapistRating>,
}
