use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Clubs the tracking service accepts for an entry.
pub const ALLOWED_CLUBS: &[&str] = &[
    "The Big O",
    "Nature Watch",
    "8x8",
    "Acharya Gaming Club",
    "Others",
];

/// Outreach progress states, spelled exactly as the service emits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryStatus {
    #[serde(rename = "Yet to contact")]
    YetToContact,
    #[serde(rename = "In progress")]
    InProgress,
    #[serde(rename = "Rejected")]
    Rejected,
    #[serde(rename = "Requested on LinkedIn")]
    RequestedLinkedIn,
    #[serde(rename = "Requested on mail")]
    RequestedMail,
    /// Free-text state, requires non-empty notes
    #[serde(rename = "Others")]
    Others,
}

impl Default for EntryStatus {
    fn default() -> Self {
        EntryStatus::YetToContact
    }
}

impl EntryStatus {
    pub const ALL: &'static [EntryStatus] = &[
        EntryStatus::YetToContact,
        EntryStatus::InProgress,
        EntryStatus::Rejected,
        EntryStatus::RequestedLinkedIn,
        EntryStatus::RequestedMail,
        EntryStatus::Others,
    ];

    /// Wire representation of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::YetToContact => "Yet to contact",
            EntryStatus::InProgress => "In progress",
            EntryStatus::Rejected => "Rejected",
            EntryStatus::RequestedLinkedIn => "Requested on LinkedIn",
            EntryStatus::RequestedMail => "Requested on mail",
            EntryStatus::Others => "Others",
        }
    }

    /// Whether this status must be accompanied by notes
    pub fn requires_notes(&self) -> bool {
        matches!(self, EntryStatus::Others)
    }

    /// Statuses that count toward "active outreach" in performance metrics
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            EntryStatus::InProgress | EntryStatus::RequestedLinkedIn | EntryStatus::RequestedMail
        )
    }

    /// Parse a status from user or wire input (whitespace tolerated)
    pub fn parse(value: &str) -> Result<Self, StatusParseError> {
        let normalized = value.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str().eq_ignore_ascii_case(normalized))
            .ok_or_else(|| StatusParseError(value.to_string()))
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
#[error("unknown status '{0}'")]
pub struct StatusParseError(pub String);

/// One recorded outreach attempt, as stored by the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,

    pub member_name: String,

    pub club: String,

    pub company: String,

    #[serde(default)]
    pub opportunity_type: Option<String>,

    #[serde(default)]
    pub contact_person: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub linkedin: Option<String>,

    #[serde(default)]
    pub phone: Option<String>,

    #[serde(default)]
    pub status: EntryStatus,

    #[serde(default)]
    pub status_notes: Option<String>,

    pub entry_date: NaiveDate,

    pub created_at: NaiveDateTime,

    pub updated_at: NaiveDateTime,
}

/// Entry fields sent on create and update. Blank optionals are an explicit
/// `null` on the wire, never an empty string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryPayload {
    pub member_name: String,
    pub club: String,
    pub company: String,
    pub opportunity_type: Option<String>,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub linkedin: Option<String>,
    pub phone: Option<String>,
    pub status: EntryStatus,
    pub status_notes: Option<String>,
    pub entry_date: NaiveDate,
}

/// Filters for the entry list endpoint. Unset fields are omitted from the query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryFilters {
    pub member_name: Option<String>,
    pub company: Option<String>,
    pub club: Option<String>,
    pub opportunity_type: Option<String>,
    pub status: Option<EntryStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl EntryFilters {
    /// Filter for a single member's entries
    pub fn for_member(member_name: &str) -> Self {
        Self {
            member_name: Some(member_name.to_string()),
            ..Self::default()
        }
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(v) = &self.member_name {
            pairs.push(("member_name", v.clone()));
        }
        if let Some(v) = &self.company {
            pairs.push(("company", v.clone()));
        }
        if let Some(v) = &self.club {
            pairs.push(("club", v.clone()));
        }
        if let Some(v) = &self.opportunity_type {
            pairs.push(("opportunity_type", v.clone()));
        }
        if let Some(v) = &self.status {
            pairs.push(("status", v.as_str().to_string()));
        }
        if let Some(v) = &self.start_date {
            pairs.push(("start_date", v.to_string()));
        }
        if let Some(v) = &self.end_date {
            pairs.push(("end_date", v.to_string()));
        }
        pairs
    }
}

/// Filters for the statistics endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsFilters {
    pub club: Option<String>,
    pub member_name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl StatsFilters {
    pub fn for_club(club: &str) -> Self {
        Self {
            club: Some(club.to_string()),
            ..Self::default()
        }
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(v) = &self.club {
            pairs.push(("club", v.clone()));
        }
        if let Some(v) = &self.member_name {
            pairs.push(("member_name", v.clone()));
        }
        if let Some(v) = &self.start_date {
            pairs.push(("start_date", v.to_string()));
        }
        if let Some(v) = &self.end_date {
            pairs.push(("end_date", v.to_string()));
        }
        pairs
    }
}

/// Candidate contact fields for the duplicate check. Only non-empty fields
/// are sent to the service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DuplicateQuery {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linkedin: Option<String>,
    pub company: Option<String>,
    /// Entry being edited, excluded from the lookup so it never matches itself
    pub exclude_id: Option<String>,
}

impl DuplicateQuery {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(v) = &self.email {
            pairs.push(("email", v.clone()));
        }
        if let Some(v) = &self.phone {
            pairs.push(("phone", v.clone()));
        }
        if let Some(v) = &self.linkedin {
            pairs.push(("linkedin", v.clone()));
        }
        if let Some(v) = &self.company {
            pairs.push(("company", v.clone()));
        }
        if let Some(v) = &self.exclude_id {
            pairs.push(("exclude_id", v.clone()));
        }
        pairs
    }
}

/// Result of the pre-submission duplicate/financial lookup. Computed fresh
/// per submission attempt, never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DuplicateCheck {
    pub duplicate_contact: ContactMatch,

    pub company_exists: CompanyMatch,

    /// Company name matched the service's financial blocklist
    #[serde(default)]
    pub is_financial: bool,

    #[serde(default)]
    pub blocked_keywords: Vec<String>,
}

/// An existing entry shares email, phone, or linkedin with the candidate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactMatch {
    pub exists: bool,

    #[serde(default)]
    pub details: Option<PriorEntry>,
}

/// The candidate company has been contacted before (by anyone).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyMatch {
    pub exists: bool,

    #[serde(default)]
    pub count: u64,

    #[serde(default)]
    pub details: Option<PriorEntry>,
}

/// Summary of the matched prior entry. Contact channel values are present
/// only when the service includes them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriorEntry {
    #[serde(default)]
    pub company: Option<String>,

    #[serde(default)]
    pub member_name: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub entry_date: Option<String>,

    #[serde(default)]
    pub contact_person: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub linkedin: Option<String>,

    #[serde(default)]
    pub phone: Option<String>,
}

impl PriorEntry {
    /// Whether the service reported any of the matched record's own contact
    /// channel values
    pub fn has_channel_values(&self) -> bool {
        self.email.is_some() || self.linkedin.is_some() || self.phone.is_some()
    }
}
