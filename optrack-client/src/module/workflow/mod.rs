///! Validation and submission workflow for outreach entries.
///!
///! Gate order is chosen so that zero-network-cost checks run before any
///! round trip, and the non-overridable blocks always take precedence over
///! the confirmable company warning.
use chrono::NaiveDate;
use optrack_common::{DuplicateQuery, Entry, EntryPayload, EntryStatus, PriorEntry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::api::{ApiError, EntryApi};
use crate::module::draft::DraftStore;
use crate::module::stats::StatsManager;
use crate::session::SessionStore;

pub mod keywords;
pub mod ports;

pub use ports::ConfirmationPort;

/// Raw entry-form field values, exactly as the user typed them. Also the
/// shape persisted by the draft store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryForm {
    pub company: String,
    pub opportunity_type: String,
    pub contact_person: String,
    pub email: String,
    pub linkedin: String,
    pub phone: String,
    #[serde(default)]
    pub status: EntryStatus,
    pub status_notes: String,
    /// Defaults to today at normalization time
    #[serde(default)]
    pub entry_date: Option<NaiveDate>,
}

impl EntryForm {
    /// At least one of email, linkedin, phone is non-blank.
    pub fn has_contact_method(&self) -> bool {
        !self.email.trim().is_empty()
            || !self.linkedin.trim().is_empty()
            || !self.phone.trim().is_empty()
    }

    /// Whether there is anything worth persisting as a draft.
    pub fn has_meaningful_content(&self) -> bool {
        !self.company.trim().is_empty() || self.has_contact_method()
    }

    /// Trim everything and turn blank optionals into explicit absence.
    pub fn normalize(&self, member_name: &str, club: &str, today: NaiveDate) -> EntryPayload {
        EntryPayload {
            member_name: member_name.to_string(),
            club: club.to_string(),
            company: self.company.trim().to_string(),
            opportunity_type: blank_to_none(&self.opportunity_type),
            contact_person: blank_to_none(&self.contact_person),
            email: blank_to_none(&self.email),
            linkedin: blank_to_none(&self.linkedin),
            phone: blank_to_none(&self.phone),
            status: self.status,
            status_notes: blank_to_none(&self.status_notes),
            entry_date: self.entry_date.unwrap_or(today),
        }
    }
}

fn blank_to_none(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// The service requires at least this many digits in a phone number.
const MIN_PHONE_DIGITS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    /// Email, linkedin, and phone all blank
    MissingContact,
    /// Opportunity type contains a blocklisted financial term
    BlockedOpportunity,
    /// Status "Others" submitted without notes
    NotesRequired,
    /// Phone supplied but implausibly short
    InvalidPhone,
    /// No logged-in user to attribute the entry to
    NoSession,
    /// Duplicate/financial lookup did not complete; submission fails closed
    CheckFailed,
    /// Service classified the company as financial
    FinancialCompany,
    /// An existing entry already carries this contact information
    DuplicateContact,
    /// The dispatch itself was rejected by the service
    ServiceError,
    /// Another submission from this form is still outstanding
    InFlight,
}

#[derive(Debug, Clone)]
pub struct Rejection {
    pub kind: RejectionKind,
    pub message: String,
}

/// What became of one submission attempt.
#[derive(Debug)]
pub enum SubmissionOutcome {
    Created(Entry),
    Updated(Entry),
    Rejected(Rejection),
    /// User declined the company-exists warning; nothing was sent
    Cancelled,
}

fn rejected(kind: RejectionKind, message: impl Into<String>) -> SubmissionOutcome {
    SubmissionOutcome::Rejected(Rejection {
        kind,
        message: message.into(),
    })
}

/// Orchestrates the pre-submission gates and the dispatch. Owns no
/// presentation concerns; soft warnings go through the confirmation port.
pub struct SubmissionWorkflow {
    api: Arc<dyn EntryApi>,
    confirmations: Arc<dyn ConfirmationPort>,
    drafts: Arc<DraftStore>,
    stats: Arc<StatsManager>,
    session: Arc<SessionStore>,

    /// Taken for the duration of one attempt; a second submit while it is
    /// held is rejected without touching the network
    in_flight: Mutex<()>,
}

impl SubmissionWorkflow {
    pub fn new(
        api: Arc<dyn EntryApi>,
        confirmations: Arc<dyn ConfirmationPort>,
        drafts: Arc<DraftStore>,
        stats: Arc<StatsManager>,
        session: Arc<SessionStore>,
    ) -> Self {
        Self {
            api,
            confirmations,
            drafts,
            stats,
            session,
            in_flight: Mutex::new(()),
        }
    }

    /// Run the full gate sequence and, if everything passes, dispatch a
    /// create or an update depending on the session's editing marker.
    pub async fn submit(&self, form: &EntryForm) -> SubmissionOutcome {
        let _guard = match self.in_flight.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                return rejected(
                    RejectionKind::InFlight,
                    "A submission is already in progress.",
                );
            }
        };

        let attempt_id = uuid::Uuid::now_v7();
        info!(%attempt_id, company = %form.company.trim(), "Submission attempt started");

        // Gate 1: contact-method presence. No network cost.
        if !form.has_contact_method() {
            return rejected(
                RejectionKind::MissingContact,
                "Please provide at least one contact method (email, LinkedIn, or phone).",
            );
        }

        // Gate 2: financial-keyword screen on the opportunity type.
        if let Some(term) = keywords::first_blocked_term(&form.opportunity_type) {
            return rejected(
                RejectionKind::BlockedOpportunity,
                format!(
                    "Opportunity type \"{}\" contains the financial term \"{}\". \
                     Entries related to financial services are not accepted.",
                    form.opportunity_type.trim(),
                    term
                ),
            );
        }

        // Remaining zero-cost checks the service would bounce anyway.
        if form.status.requires_notes() && form.status_notes.trim().is_empty() {
            return rejected(
                RejectionKind::NotesRequired,
                "Status notes are required when the status is \"Others\".",
            );
        }
        let phone = form.phone.trim();
        if !phone.is_empty() && phone.chars().filter(|c| c.is_ascii_digit()).count() < MIN_PHONE_DIGITS
        {
            return rejected(
                RejectionKind::InvalidPhone,
                "Phone numbers must contain at least 7 digits.",
            );
        }

        let Some(user) = self.session.user().await else {
            return rejected(RejectionKind::NoSession, "Log in before submitting entries.");
        };
        let editing_id = self.session.editing_id().await;

        // Gate 3: remote duplicate/financial lookup. Fails closed.
        let query = duplicate_query(form, editing_id.as_deref());
        let check = match self.api.check_duplicate(&query).await {
            Ok(check) => check,
            Err(e) => {
                warn!(%attempt_id, "Duplicate check failed: {}", e);
                return rejected(
                    RejectionKind::CheckFailed,
                    "Error validating the entry. Please try again.",
                );
            }
        };

        // Hard block first: the financial classification can never be
        // confirmed past, regardless of the other signals.
        if check.is_financial {
            info!(%attempt_id, "Blocked financial company: {}", form.company.trim());
            return rejected(
                RejectionKind::FinancialCompany,
                financial_company_message(form.company.trim(), &check.blocked_keywords),
            );
        }

        if check.duplicate_contact.exists {
            let channels = matched_channels(form, check.duplicate_contact.details.as_ref());
            info!(%attempt_id, matched = ?channels, "Blocked duplicate contact");
            return rejected(
                RejectionKind::DuplicateContact,
                duplicate_contact_message(&channels, check.duplicate_contact.details.as_ref()),
            );
        }

        // Soft warning: same company, possibly a different contact person.
        if check.company_exists.exists {
            let prompt = company_exists_prompt(
                form.company.trim(),
                check.company_exists.count,
                check.company_exists.details.as_ref(),
            );
            if !self.confirmations.confirm(&prompt).await {
                info!(%attempt_id, "Submission cancelled at company warning");
                return SubmissionOutcome::Cancelled;
            }
        }

        let payload = form.normalize(&user.name, &user.club, chrono::Local::now().date_naive());

        let result = match &editing_id {
            Some(id) => self.api.update_entry(id, &payload).await.map(|e| (e, true)),
            None => self.api.create_entry(&payload).await.map(|e| (e, false)),
        };

        match result {
            Ok((entry, was_update)) => {
                self.finish_successful(&entry, editing_id.is_some()).await;
                info!(%attempt_id, entry_id = %entry.id, "Submission {}", if was_update { "updated" } else { "created" });
                if was_update {
                    SubmissionOutcome::Updated(entry)
                } else {
                    SubmissionOutcome::Created(entry)
                }
            }
            Err(e) => {
                warn!(%attempt_id, "Dispatch failed: {}", e);
                let message = match e {
                    ApiError::Service(msg) => msg,
                    _ => "Failed to connect to the entry service.".to_string(),
                };
                rejected(RejectionKind::ServiceError, message)
            }
        }
    }

    /// Post-submission effects. Local-state failures are logged, never
    /// escalated; the entry itself is already saved.
    async fn finish_successful(&self, _entry: &Entry, was_editing: bool) {
        if let Err(e) = self.drafts.clear().await {
            warn!("Failed to clear draft after submission: {}", e);
        }
        if was_editing {
            if let Err(e) = self.session.clear_editing().await {
                warn!("Failed to clear edit marker: {}", e);
            }
        }
        self.stats.invalidate().await;
    }
}

fn duplicate_query(form: &EntryForm, exclude_id: Option<&str>) -> DuplicateQuery {
    DuplicateQuery {
        email: blank_to_none(&form.email),
        phone: blank_to_none(&form.phone),
        linkedin: blank_to_none(&form.linkedin),
        company: blank_to_none(&form.company),
        exclude_id: exclude_id.map(str::to_string),
    }
}

/// Contact channels that were both supplied and present in the matched
/// record. When the service omits the matched record's channel values, every
/// supplied channel is reported.
fn matched_channels(form: &EntryForm, prior: Option<&PriorEntry>) -> Vec<&'static str> {
    let prior_has_values = prior.is_some_and(PriorEntry::has_channel_values);

    let candidates: [(&'static str, &str, Option<&String>); 3] = [
        ("email", form.email.trim(), prior.and_then(|p| p.email.as_ref())),
        ("phone", form.phone.trim(), prior.and_then(|p| p.phone.as_ref())),
        (
            "LinkedIn",
            form.linkedin.trim(),
            prior.and_then(|p| p.linkedin.as_ref()),
        ),
    ];

    candidates
        .into_iter()
        .filter_map(|(label, supplied, prior_value)| {
            if supplied.is_empty() {
                return None;
            }
            if !prior_has_values {
                return Some(label);
            }
            match prior_value {
                Some(v) if v.trim().eq_ignore_ascii_case(supplied) => Some(label),
                _ => None,
            }
        })
        .collect()
}

fn financial_company_message(company: &str, blocked_keywords: &[String]) -> String {
    let mut message = format!(
        "\"{company}\" appears to be a financial/banking/fintech/insurance company."
    );
    if !blocked_keywords.is_empty() {
        message.push_str(&format!("\nMatched terms: {}", blocked_keywords.join(", ")));
    }
    message.push_str("\nEntries from financial services companies are not accepted.");
    message
}

fn duplicate_contact_message(channels: &[&str], details: Option<&PriorEntry>) -> String {
    let channel_list = if channels.is_empty() {
        "contact details".to_string()
    } else {
        channels.join(", ")
    };

    let mut message = format!(
        "This contact information ({channel_list}) already exists in the database."
    );
    if let Some(details) = details {
        message.push_str(&format!(
            "\nCompany: {}\nAdded by: {}\nStatus: {}\nDate: {}",
            details.company.as_deref().unwrap_or("-"),
            details.member_name.as_deref().unwrap_or("-"),
            details.status.as_deref().unwrap_or("-"),
            details.entry_date.as_deref().unwrap_or("-"),
        ));
    }
    message.push_str("\nPlease do not create duplicate entries.");
    message
}

fn company_exists_prompt(company: &str, count: u64, details: Option<&PriorEntry>) -> String {
    let mut prompt = format!("\"{company}\" has already been contacted {count} time(s).");
    if let Some(details) = details {
        prompt.push_str(&format!(
            "\nPrevious entry: added by {}, status {}, date {}, contact {}.",
            details.member_name.as_deref().unwrap_or("-"),
            details.status.as_deref().unwrap_or("-"),
            details.entry_date.as_deref().unwrap_or("-"),
            details.contact_person.as_deref().unwrap_or("N/A"),
        ));
    }
    prompt.push_str("\nAre you contacting a DIFFERENT person at this company?");
    prompt
}

#[cfg(test)]
mod tests {
    use super::ports::testing::FixedConfirmation;
    use super::*;
    use crate::api::mock::MockApi;
    use optrack_common::{CompanyMatch, ContactMatch, DuplicateCheck, StatsFilters};
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Harness {
        _tmp: TempDir,
        api: Arc<MockApi>,
        confirm: Arc<FixedConfirmation>,
        drafts: Arc<DraftStore>,
        stats: Arc<StatsManager>,
        session: Arc<SessionStore>,
        workflow: Arc<SubmissionWorkflow>,
    }

    async fn harness(confirm_answer: bool) -> Harness {
        let tmp = TempDir::new().unwrap();
        let api = Arc::new(MockApi::default());
        let confirm = Arc::new(FixedConfirmation::new(confirm_answer));
        let drafts = Arc::new(DraftStore::new(tmp.path()));
        let stats = Arc::new(StatsManager::new(api.clone(), 60));
        let session = Arc::new(SessionStore::new(tmp.path()));
        session.login("Asha", "8x8").await.unwrap();

        let workflow = Arc::new(SubmissionWorkflow::new(
            api.clone(),
            confirm.clone(),
            drafts.clone(),
            stats.clone(),
            session.clone(),
        ));

        Harness {
            _tmp: tmp,
            api,
            confirm,
            drafts,
            stats,
            session,
            workflow,
        }
    }

    fn valid_form() -> EntryForm {
        EntryForm {
            company: "Acme Robotics".to_string(),
            opportunity_type: "software internship".to_string(),
            email: "meera@acme.test".to_string(),
            entry_date: chrono::NaiveDate::from_ymd_opt(2025, 11, 3),
            ..EntryForm::default()
        }
    }

    fn rejection(outcome: SubmissionOutcome) -> Rejection {
        match outcome {
            SubmissionOutcome::Rejected(rejection) => rejection,
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_contact_method_is_rejected_without_network() {
        let h = harness(true).await;
        let form = EntryForm {
            company: "Acme Robotics".to_string(),
            ..EntryForm::default()
        };

        let rejection = rejection(h.workflow.submit(&form).await);
        assert_eq!(rejection.kind, RejectionKind::MissingContact);
        assert_eq!(h.api.check_calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.api.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn blocked_opportunity_type_reports_first_term_before_any_call() {
        let h = harness(true).await;
        let form = EntryForm {
            company: "Acme".to_string(),
            opportunity_type: "fintech consulting".to_string(),
            email: "a@b.test".to_string(),
            ..EntryForm::default()
        };

        let rejection = rejection(h.workflow.submit(&form).await);
        assert_eq!(rejection.kind, RejectionKind::BlockedOpportunity);
        assert!(rejection.message.contains("\"fintech\""));
        assert_eq!(h.api.check_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn others_status_without_notes_is_rejected() {
        let h = harness(true).await;
        let form = EntryForm {
            status: EntryStatus::Others,
            ..valid_form()
        };

        let rejection = rejection(h.workflow.submit(&form).await);
        assert_eq!(rejection.kind, RejectionKind::NotesRequired);
        assert_eq!(h.api.check_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn short_phone_is_rejected_before_dispatch() {
        let h = harness(true).await;
        let form = EntryForm {
            email: String::new(),
            phone: "12-34".to_string(),
            ..valid_form()
        };

        let rejection = rejection(h.workflow.submit(&form).await);
        assert_eq!(rejection.kind, RejectionKind::InvalidPhone);
    }

    #[tokio::test]
    async fn financial_company_blocks_even_past_a_willing_confirmation() {
        let h = harness(true).await;
        *h.api.duplicate_response.lock().unwrap() = DuplicateCheck {
            is_financial: true,
            blocked_keywords: vec!["bank".to_string()],
            company_exists: CompanyMatch {
                exists: true,
                count: 1,
                details: None,
            },
            ..DuplicateCheck::default()
        };

        let rejection = rejection(h.workflow.submit(&valid_form()).await);
        assert_eq!(rejection.kind, RejectionKind::FinancialCompany);
        assert!(rejection.message.contains("bank"));
        // The soft warning never got a chance to override the hard block
        assert_eq!(h.confirm.times_asked(), 0);
        assert_eq!(h.api.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn duplicate_contact_message_names_only_channels_present_in_match() {
        let h = harness(true).await;
        *h.api.duplicate_response.lock().unwrap() = DuplicateCheck {
            duplicate_contact: ContactMatch {
                exists: true,
                details: Some(PriorEntry {
                    company: Some("Acme Robotics".to_string()),
                    member_name: Some("Ravi".to_string()),
                    status: Some("In progress".to_string()),
                    entry_date: Some("2025-10-20".to_string()),
                    email: Some("meera@acme.test".to_string()),
                    phone: Some("999999999".to_string()),
                    ..PriorEntry::default()
                }),
            },
            ..DuplicateCheck::default()
        };

        // Email matches the prior record, phone differs
        let form = EntryForm {
            phone: "12345678".to_string(),
            ..valid_form()
        };

        let rejection = rejection(h.workflow.submit(&form).await);
        assert_eq!(rejection.kind, RejectionKind::DuplicateContact);
        assert!(rejection.message.contains("email"));
        assert!(!rejection.message.contains("phone"));
        assert!(rejection.message.contains("Ravi"));
        assert_eq!(h.api.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn declined_company_warning_creates_nothing_and_keeps_draft() {
        let h = harness(false).await;
        let form = valid_form();
        h.drafts.save(&form).await.unwrap();

        *h.api.duplicate_response.lock().unwrap() = DuplicateCheck {
            company_exists: CompanyMatch {
                exists: true,
                count: 2,
                details: Some(PriorEntry {
                    member_name: Some("Ravi".to_string()),
                    ..PriorEntry::default()
                }),
            },
            ..DuplicateCheck::default()
        };

        let outcome = h.workflow.submit(&form).await;
        assert!(matches!(outcome, SubmissionOutcome::Cancelled));
        assert_eq!(h.confirm.times_asked(), 1);
        assert_eq!(h.api.create_calls.load(Ordering::SeqCst), 0);
        assert!(h.drafts.load_if_fresh().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn accepted_company_warning_proceeds_and_clears_local_state() {
        let h = harness(true).await;
        let form = valid_form();
        h.drafts.save(&form).await.unwrap();

        *h.api.duplicate_response.lock().unwrap() = DuplicateCheck {
            company_exists: CompanyMatch {
                exists: true,
                count: 1,
                details: None,
            },
            ..DuplicateCheck::default()
        };

        // Warm the stats cache, then make sure submission invalidates it
        h.stats.get(&StatsFilters::default()).await.unwrap();
        assert_eq!(h.api.stats_calls.load(Ordering::SeqCst), 1);

        let outcome = h.workflow.submit(&form).await;
        assert!(matches!(outcome, SubmissionOutcome::Created(_)));
        assert_eq!(h.confirm.times_asked(), 1);

        let created = h.api.created.lock().unwrap();
        assert_eq!(created.len(), 1);
        // Blank optionals went out as explicit absence, not empty strings
        assert_eq!(created[0].contact_person, None);
        assert_eq!(created[0].linkedin, None);
        assert_eq!(created[0].member_name, "Asha");
        drop(created);

        assert!(h.drafts.load_if_fresh().await.unwrap().is_none());

        h.stats.get(&StatsFilters::default()).await.unwrap();
        assert_eq!(h.api.stats_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn editing_session_dispatches_update_with_exclude_id() {
        let h = harness(true).await;
        h.session.set_editing("abc123").await.unwrap();

        let outcome = h.workflow.submit(&valid_form()).await;
        assert!(matches!(outcome, SubmissionOutcome::Updated(_)));

        let query = h.api.last_check_query.lock().unwrap().clone().unwrap();
        assert_eq!(query.exclude_id.as_deref(), Some("abc123"));

        let updated = h.api.updated.lock().unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].0, "abc123");
        drop(updated);

        assert!(h.session.editing_id().await.is_none());
        assert_eq!(h.api.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_duplicate_check_fails_closed() {
        let h = harness(true).await;
        h.api.check_fails.store(true, Ordering::SeqCst);

        let rejection = rejection(h.workflow.submit(&valid_form()).await);
        assert_eq!(rejection.kind, RejectionKind::CheckFailed);
        assert_eq!(h.api.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn service_rejection_surfaces_message_and_keeps_draft() {
        let h = harness(true).await;
        let form = valid_form();
        h.drafts.save(&form).await.unwrap();
        *h.api.create_fails_with.lock().unwrap() =
            Some("Financial company detected (bank)".to_string());

        let rejection = rejection(h.workflow.submit(&form).await);
        assert_eq!(rejection.kind, RejectionKind::ServiceError);
        assert_eq!(rejection.message, "Financial company detected (bank)");
        assert!(h.drafts.load_if_fresh().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn concurrent_submission_is_rejected_in_flight() {
        let h = harness(true).await;
        *h.api.check_delay.lock().unwrap() = Some(Duration::from_millis(120));

        let form = valid_form();
        let workflow = h.workflow.clone();
        let racing_form = form.clone();
        let first = tokio::spawn(async move { workflow.submit(&racing_form).await });

        tokio::time::sleep(Duration::from_millis(30)).await;
        let second = h.workflow.submit(&form).await;
        let rejection = rejection(second);
        assert_eq!(rejection.kind, RejectionKind::InFlight);

        let first = first.await.unwrap();
        assert!(matches!(first, SubmissionOutcome::Created(_)));
        assert_eq!(h.api.create_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn matched_channels_fall_back_to_supplied_when_match_has_no_values() {
        let form = EntryForm {
            email: "a@b.test".to_string(),
            phone: "12345678".to_string(),
            ..EntryForm::default()
        };
        let prior = PriorEntry::default();
        assert_eq!(matched_channels(&form, Some(&prior)), vec!["email", "phone"]);
    }

    #[test]
    fn normalize_defaults_date_to_today() {
        let form = EntryForm {
            company: " Acme ".to_string(),
            email: " a@b.test ".to_string(),
            ..EntryForm::default()
        };
        let today = chrono::NaiveDate::from_ymd_opt(2025, 11, 5).unwrap();
        let payload = form.normalize("Asha", "8x8", today);
        assert_eq!(payload.company, "Acme");
        assert_eq!(payload.email.as_deref(), Some("a@b.test"));
        assert_eq!(payload.entry_date, today);
        assert_eq!(payload.status, EntryStatus::YetToContact);
    }
}
