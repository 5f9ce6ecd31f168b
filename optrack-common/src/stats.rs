///! Aggregate statistics bundle returned by the service's `/stats` endpoint.
use serde::{Deserialize, Serialize};

/// Full statistics report for the current filter set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsBundle {
    pub summary: StatsSummary,

    #[serde(default)]
    pub status_distribution: Vec<Bucket>,

    #[serde(default)]
    pub club_distribution: Vec<Bucket>,

    #[serde(default)]
    pub member_contributions: Vec<MemberContribution>,

    #[serde(default)]
    pub top_companies: Vec<Bucket>,

    /// Entries per day over the last 30 days, bucket label is the ISO date
    #[serde(default)]
    pub daily_timeline: Vec<Bucket>,

    #[serde(default)]
    pub contact_methods: ContactMethodCounts,

    #[serde(default)]
    pub opportunity_types: Vec<Bucket>,

    #[serde(default)]
    pub club_performance: Vec<ClubPerformance>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsSummary {
    #[serde(default)]
    pub total_entries: u64,

    #[serde(default)]
    pub recent_entries_7days: u64,

    #[serde(default)]
    pub recent_entries_30days: u64,

    #[serde(default)]
    pub average_per_member: f64,
}

/// One label/count pair of a distribution. The label arrives under the
/// service's `_id` wire key and may be null.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Bucket {
    #[serde(rename = "_id", default)]
    pub label: Option<String>,

    #[serde(default)]
    pub count: u64,
}

impl Bucket {
    pub fn label_or_unknown(&self) -> &str {
        self.label.as_deref().unwrap_or("Unknown")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactMethodCounts {
    #[serde(default)]
    pub email: u64,

    #[serde(default)]
    pub linkedin: u64,

    #[serde(default)]
    pub phone: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemberContribution {
    pub member_name: String,

    #[serde(default)]
    pub club: String,

    #[serde(default)]
    pub count: u64,

    #[serde(default)]
    pub yet_to_contact: u64,

    #[serde(default)]
    pub in_progress: u64,

    #[serde(default)]
    pub rejected: u64,

    #[serde(default)]
    pub requested_linkedin: u64,

    #[serde(default)]
    pub requested_mail: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClubPerformance {
    /// Club name; some service versions only emit it under `_id`
    #[serde(default)]
    pub club: Option<String>,

    #[serde(rename = "_id", default)]
    pub id: Option<String>,

    #[serde(default)]
    pub total_entries: u64,

    #[serde(default)]
    pub unique_members_count: u64,

    #[serde(default)]
    pub unique_companies_count: u64,

    #[serde(default)]
    pub active_count: u64,

    #[serde(default)]
    pub success_rate: f64,
}

impl ClubPerformance {
    pub fn name(&self) -> &str {
        self.club
            .as_deref()
            .or(self.id.as_deref())
            .unwrap_or("Unknown")
    }
}
