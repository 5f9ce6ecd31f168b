///! Shared data types for the outreach tracking service API.
pub mod stats;
pub mod types;

pub use stats::{
    Bucket, ClubPerformance, ContactMethodCounts, MemberContribution, StatsBundle, StatsSummary,
};
pub use types::{
    ALLOWED_CLUBS, CompanyMatch, ContactMatch, DuplicateCheck, DuplicateQuery, Entry,
    EntryFilters, EntryPayload, EntryStatus, PriorEntry, StatsFilters, StatusParseError,
};
