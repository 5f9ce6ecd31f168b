///! Console front end: command parsing and routing over the library.
///!
///! The workflow and the API client know nothing about this module; it only
///! turns lines of input into calls and outcomes into notices.
use async_trait::async_trait;
use chrono::NaiveDate;
use optrack_common::{ALLOWED_CLUBS, Entry, EntryFilters, EntryStatus, StatsFilters};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

use crate::api::{ApiError, EntryApi};
use crate::module::draft::DraftStore;
use crate::module::export;
use crate::module::renderer;
use crate::module::scheduled::FormBuffer;
use crate::module::stats::StatsManager;
use crate::module::suggest::{SuggestionKind, SuggestionProvider};
use crate::module::workflow::{
    ConfirmationPort, EntryForm, SubmissionOutcome, SubmissionWorkflow,
};
use crate::session::SessionStore;

#[derive(Debug, Clone, Copy)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Transient console notice, the toast of this front end.
pub fn notice(level: NoticeLevel, message: &str) {
    let prefix = match level {
        NoticeLevel::Info => "[info]",
        NoticeLevel::Success => "[ok]",
        NoticeLevel::Warning => "[warn]",
        NoticeLevel::Error => "[error]",
    };
    for line in message.lines() {
        println!("{prefix} {line}");
    }
}

/// Prompt on stdout and read one line from stdin without blocking the
/// runtime. None on EOF.
pub async fn prompt_line(prompt: &str) -> Option<String> {
    let prompt = prompt.to_string();
    tokio::task::spawn_blocking(move || {
        use std::io::{BufRead, Write};

        let mut out = std::io::stdout();
        write!(out, "{prompt}").ok()?;
        out.flush().ok()?;

        let mut line = String::new();
        let read = std::io::stdin().lock().read_line(&mut line).ok()?;
        if read == 0 {
            return None;
        }
        Some(line.trim_end_matches(['\r', '\n']).to_string())
    })
    .await
    .ok()
    .flatten()
}

/// y/N prompt implementation of the workflow's confirmation port.
#[derive(Default)]
pub struct ConsoleConfirmation;

#[async_trait]
impl ConfirmationPort for ConsoleConfirmation {
    async fn confirm(&self, prompt: &str) -> bool {
        notice(NoticeLevel::Warning, prompt);
        match prompt_line("Proceed? [y/N] ").await {
            Some(answer) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
            None => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Login,
    Logout,
    List(String),
    Show(String),
    Submit,
    Edit(String),
    Status(String),
    Stats(String),
    Suggest(String),
    Export(String),
    Reset,
    Quit,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        let (head, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (trimmed, ""),
        };

        match head.to_lowercase().as_str() {
            "help" | "?" => Command::Help,
            "login" => Command::Login,
            "logout" => Command::Logout,
            "list" | "entries" => Command::List(rest.to_string()),
            "show" => Command::Show(rest.to_string()),
            "submit" | "new" => Command::Submit,
            "edit" => Command::Edit(rest.to_string()),
            "status" => Command::Status(rest.to_string()),
            "stats" => Command::Stats(rest.to_string()),
            "suggest" => Command::Suggest(rest.to_string()),
            "export" => Command::Export(rest.to_string()),
            "reset" => Command::Reset,
            "quit" | "exit" | "q" => Command::Quit,
            other => Command::Unknown(other.to_string()),
        }
    }
}

/// Split `key=value` arguments; bare words continue the previous value so
/// `status=In progress company=Acme Robotics` parses as two pairs.
fn parse_key_values(args: &str) -> Result<Vec<(String, String)>, String> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    for token in args.split_whitespace() {
        match token.split_once('=') {
            Some((key, value)) => pairs.push((key.to_lowercase(), value.to_string())),
            None => match pairs.last_mut() {
                Some(last) => {
                    last.1.push(' ');
                    last.1.push_str(token);
                }
                None => return Err(format!("expected key=value, got '{token}'")),
            },
        }
    }
    Ok(pairs)
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("'{value}' is not a YYYY-MM-DD date"))
}

fn parse_entry_filters(args: &str) -> Result<EntryFilters, String> {
    let mut filters = EntryFilters::default();
    for (key, value) in parse_key_values(args)? {
        match key.as_str() {
            "member" => filters.member_name = Some(value),
            "company" => filters.company = Some(value),
            "club" => filters.club = Some(value),
            "type" => filters.opportunity_type = Some(value),
            "status" => {
                filters.status = Some(EntryStatus::parse(&value).map_err(|e| e.to_string())?)
            }
            "from" => filters.start_date = Some(parse_date(&value)?),
            "to" => filters.end_date = Some(parse_date(&value)?),
            other => return Err(format!("unknown filter '{other}'")),
        }
    }
    Ok(filters)
}

fn parse_stats_filters(args: &str) -> Result<StatsFilters, String> {
    let mut filters = StatsFilters::default();
    for (key, value) in parse_key_values(args)? {
        match key.as_str() {
            "club" => filters.club = Some(value),
            "member" => filters.member_name = Some(value),
            "from" => filters.start_date = Some(parse_date(&value)?),
            "to" => filters.end_date = Some(parse_date(&value)?),
            other => return Err(format!("unknown filter '{other}'")),
        }
    }
    Ok(filters)
}

fn entry_to_form(entry: &Entry) -> EntryForm {
    EntryForm {
        company: entry.company.clone(),
        opportunity_type: entry.opportunity_type.clone().unwrap_or_default(),
        contact_person: entry.contact_person.clone().unwrap_or_default(),
        email: entry.email.clone().unwrap_or_default(),
        linkedin: entry.linkedin.clone().unwrap_or_default(),
        phone: entry.phone.clone().unwrap_or_default(),
        status: entry.status,
        status_notes: entry.status_notes.clone().unwrap_or_default(),
        entry_date: Some(entry.entry_date),
    }
}

fn api_failure_message(e: &ApiError, generic: &str) -> String {
    if e.is_service_rejection() {
        e.to_string()
    } else {
        generic.to_string()
    }
}

const HELP_TEXT: &str = "\
Commands:
  login / logout            set or clear the current member
  submit                    fill the entry form and submit it
  edit <id>                 load an entry into the form; submit saves it
  status <id> <status>      patch just the status (notes prompted for Others)
  list [filters]            list entries (member= company= club= type= status= from= to=)
  show <id>                 full details of one entry
  stats [filters]           statistics report (club= member= from= to=)
  suggest company <text>    company-name autocomplete
  suggest contact <text>    contact-person autocomplete
  export entries [filters]  write filtered entries as CSV
  export stats [filters]    write the statistics bundle as JSON
  reset                     clear the form, draft, and edit marker
  quit";

pub struct CommandHandler {
    api: Arc<dyn EntryApi>,
    workflow: Arc<SubmissionWorkflow>,
    stats: Arc<StatsManager>,
    suggestions: Arc<SuggestionProvider>,
    session: Arc<SessionStore>,
    drafts: Arc<DraftStore>,
    form_buffer: FormBuffer,
    export_dir: PathBuf,
}

impl CommandHandler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        api: Arc<dyn EntryApi>,
        workflow: Arc<SubmissionWorkflow>,
        stats: Arc<StatsManager>,
        suggestions: Arc<SuggestionProvider>,
        session: Arc<SessionStore>,
        drafts: Arc<DraftStore>,
        form_buffer: FormBuffer,
        export_dir: PathBuf,
    ) -> Self {
        Self {
            api,
            workflow,
            stats,
            suggestions,
            session,
            drafts,
            form_buffer,
            export_dir,
        }
    }

    /// Read-eval loop until `quit` or EOF.
    pub async fn run(&self) {
        match self.session.user().await {
            Some(user) => notice(
                NoticeLevel::Info,
                &format!("Logged in as {} ({}). Type 'help' for commands.", user.name, user.club),
            ),
            None => notice(
                NoticeLevel::Info,
                "Type 'login' to get started, 'help' for commands.",
            ),
        }

        loop {
            let Some(line) = prompt_line("optrack> ").await else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }
            match Command::parse(&line) {
                Command::Quit => break,
                command => self.dispatch(command).await,
            }
        }
    }

    async fn dispatch(&self, command: Command) {
        match command {
            Command::Help => println!("{HELP_TEXT}"),
            Command::Login => self.handle_login().await,
            Command::Logout => self.handle_logout().await,
            Command::List(args) => self.handle_list(&args).await,
            Command::Show(id) => self.handle_show(&id).await,
            Command::Submit => self.handle_submit().await,
            Command::Edit(id) => self.handle_edit(&id).await,
            Command::Status(args) => self.handle_status(&args).await,
            Command::Stats(args) => self.handle_stats(&args).await,
            Command::Suggest(args) => self.handle_suggest(&args).await,
            Command::Export(args) => self.handle_export(&args).await,
            Command::Reset => self.handle_reset().await,
            Command::Quit => unreachable!("quit is handled by the loop"),
            Command::Unknown(head) => notice(
                NoticeLevel::Error,
                &format!("Unknown command '{head}' - try 'help'"),
            ),
        }
    }

    async fn handle_login(&self) {
        let Some(name) = prompt_line("  Member name: ").await else {
            return;
        };
        let name = name.trim().to_string();
        if name.is_empty() {
            notice(NoticeLevel::Error, "A member name is required.");
            return;
        }

        println!("  Clubs:");
        for (index, club) in ALLOWED_CLUBS.iter().enumerate() {
            println!("    {}. {club}", index + 1);
        }
        let Some(choice) = prompt_line("  Club: ").await else {
            return;
        };
        let choice = choice.trim();
        let club = choice
            .parse::<usize>()
            .ok()
            .and_then(|n| ALLOWED_CLUBS.get(n.wrapping_sub(1)))
            .copied()
            .or_else(|| {
                ALLOWED_CLUBS
                    .iter()
                    .find(|c| c.eq_ignore_ascii_case(choice))
                    .copied()
            });

        let Some(club) = club else {
            notice(NoticeLevel::Error, "Pick one of the listed clubs.");
            return;
        };

        if let Err(e) = self.session.login(&name, club).await {
            warn!("Failed to persist session: {}", e);
            notice(NoticeLevel::Error, "Could not save the session.");
            return;
        }
        notice(NoticeLevel::Success, &format!("Welcome, {name} ({club})."));
    }

    async fn handle_logout(&self) {
        if let Err(e) = self.session.logout().await {
            warn!("Failed to clear session: {}", e);
        }
        *self.form_buffer.write().await = None;
        notice(NoticeLevel::Info, "Logged out.");
    }

    async fn handle_list(&self, args: &str) {
        let filters = match parse_entry_filters(args) {
            Ok(filters) => filters,
            Err(e) => return notice(NoticeLevel::Error, &e),
        };

        match self.api.list_entries(&filters).await {
            Ok(entries) => print!("{}", renderer::render_entries_table(&entries)),
            Err(e) => {
                warn!("List failed: {}", e);
                notice(
                    NoticeLevel::Error,
                    &api_failure_message(&e, "Failed to load entries from the service."),
                );
            }
        }
    }

    async fn handle_show(&self, id: &str) {
        let id = id.trim();
        if id.is_empty() {
            return notice(NoticeLevel::Error, "Usage: show <id>");
        }

        match self.api.get_entry(id).await {
            Ok(entry) => print!("{}", renderer::render_entry_detail(&entry)),
            Err(e) => notice(
                NoticeLevel::Error,
                &api_failure_message(&e, "Failed to load the entry."),
            ),
        }
    }

    async fn handle_stats(&self, args: &str) {
        let filters = match parse_stats_filters(args) {
            Ok(filters) => filters,
            Err(e) => return notice(NoticeLevel::Error, &e),
        };

        match self.stats.get(&filters).await {
            Ok(bundle) => print!("{}", renderer::render_stats(&bundle)),
            Err(e) => {
                warn!("Stats failed: {}", e);
                notice(
                    NoticeLevel::Error,
                    &api_failure_message(&e, "Failed to load statistics from the service."),
                );
            }
        }
    }

    /// One form field: empty input keeps the current value, '-' clears it.
    async fn prompt_field(&self, label: &str, current: &str) -> Option<String> {
        let suffix = if current.is_empty() {
            String::new()
        } else {
            format!(" [{current}]")
        };
        let input = prompt_line(&format!("  {label}{suffix}: ")).await?;
        let input = input.trim();
        Some(match input {
            "" => current.to_string(),
            "-" => String::new(),
            other => other.to_string(),
        })
    }

    async fn update_buffer(&self, form: &EntryForm) {
        *self.form_buffer.write().await = Some(form.clone());
    }

    /// Interactive entry form feeding the submission workflow. The shared
    /// buffer is kept current so autosave sees live fields.
    async fn handle_submit(&self) {
        if self.session.user().await.is_none() {
            return notice(NoticeLevel::Error, "Log in before submitting entries.");
        }

        let mut form = self.form_buffer.read().await.clone().unwrap_or_default();
        if self.session.editing_id().await.is_some() {
            notice(NoticeLevel::Info, "Editing an existing entry; submit saves your changes.");
        }

        let Some(company) = self.prompt_field("Company", &form.company).await else {
            return;
        };
        form.company = company;
        self.update_buffer(&form).await;

        if let Some(hits) = self
            .suggestions
            .fetch(SuggestionKind::Company, &form.company)
            .await
        {
            notice(
                NoticeLevel::Info,
                &format!("Known companies: {}", hits.join(", ")),
            );
        }

        let Some(value) = self
            .prompt_field("Opportunity type", &form.opportunity_type)
            .await
        else {
            return;
        };
        form.opportunity_type = value;
        self.update_buffer(&form).await;

        let Some(value) = self
            .prompt_field("Contact person", &form.contact_person)
            .await
        else {
            return;
        };
        form.contact_person = value;
        self.update_buffer(&form).await;

        let Some(value) = self.prompt_field("Email", &form.email).await else {
            return;
        };
        form.email = value;
        let Some(value) = self.prompt_field("LinkedIn", &form.linkedin).await else {
            return;
        };
        form.linkedin = value;
        let Some(value) = self.prompt_field("Phone", &form.phone).await else {
            return;
        };
        form.phone = value;
        self.update_buffer(&form).await;

        println!("  Statuses:");
        for (index, status) in EntryStatus::ALL.iter().enumerate() {
            println!("    {}. {status}", index + 1);
        }
        if let Some(choice) = self.prompt_field("Status", form.status.as_str()).await {
            let choice = choice.trim();
            let picked = choice
                .parse::<usize>()
                .ok()
                .and_then(|n| EntryStatus::ALL.get(n.wrapping_sub(1)).copied())
                .or_else(|| EntryStatus::parse(choice).ok());
            match picked {
                Some(status) => form.status = status,
                None => return notice(NoticeLevel::Error, "Pick one of the listed statuses."),
            }
        } else {
            return;
        }

        if form.status.requires_notes() {
            let Some(notes) = self.prompt_field("Status notes", &form.status_notes).await
            else {
                return;
            };
            form.status_notes = notes;
        } else {
            form.status_notes.clear();
        }

        let date_default = form
            .entry_date
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        if let Some(value) = self
            .prompt_field("Entry date", &date_default.to_string())
            .await
        {
            match parse_date(value.trim()) {
                Ok(date) => form.entry_date = Some(date),
                Err(e) => return notice(NoticeLevel::Error, &e),
            }
        } else {
            return;
        }
        self.update_buffer(&form).await;

        match self.workflow.submit(&form).await {
            SubmissionOutcome::Created(entry) => {
                notice(NoticeLevel::Success, "Entry submitted successfully!");
                *self.form_buffer.write().await = None;
                self.show_mini_stats().await;
                print!("{}", renderer::render_entry_detail(&entry));
            }
            SubmissionOutcome::Updated(entry) => {
                notice(NoticeLevel::Success, "Entry updated successfully!");
                *self.form_buffer.write().await = None;
                self.show_mini_stats().await;
                print!("{}", renderer::render_entry_detail(&entry));
            }
            SubmissionOutcome::Rejected(rejection) => {
                // Form stays in the buffer for correction
                notice(NoticeLevel::Error, &rejection.message);
            }
            SubmissionOutcome::Cancelled => {
                notice(NoticeLevel::Info, "Submission cancelled.");
            }
        }
    }

    async fn show_mini_stats(&self) {
        if let Some(user) = self.session.user().await {
            if let Some(mini) = self.stats.mini_stats(&user).await {
                print!("{}", renderer::render_mini_stats(&mini));
            }
        }
    }

    async fn handle_edit(&self, id: &str) {
        let id = id.trim();
        if id.is_empty() {
            return notice(NoticeLevel::Error, "Usage: edit <id>");
        }

        match self.api.get_entry(id).await {
            Ok(entry) => {
                *self.form_buffer.write().await = Some(entry_to_form(&entry));
                if let Err(e) = self.session.set_editing(&entry.id).await {
                    warn!("Failed to persist edit marker: {}", e);
                }
                notice(
                    NoticeLevel::Info,
                    "Loaded entry for editing. Run 'submit' to save changes.",
                );
            }
            Err(e) => notice(
                NoticeLevel::Error,
                &api_failure_message(&e, "Failed to load the entry."),
            ),
        }
    }

    async fn handle_status(&self, args: &str) {
        let (id, status_text) = match args.trim().split_once(char::is_whitespace) {
            Some((id, rest)) => (id.trim(), rest.trim()),
            None => return notice(NoticeLevel::Error, "Usage: status <id> <status>"),
        };

        let status = match EntryStatus::parse(status_text) {
            Ok(status) => status,
            Err(e) => return notice(NoticeLevel::Error, &e.to_string()),
        };

        let notes = if status.requires_notes() {
            match prompt_line("  Status notes (required): ").await {
                Some(notes) if !notes.trim().is_empty() => Some(notes.trim().to_string()),
                _ => {
                    return notice(
                        NoticeLevel::Error,
                        "Status notes are required when the status is \"Others\".",
                    );
                }
            }
        } else {
            None
        };

        match self
            .api
            .patch_status(id, status, notes.as_deref())
            .await
        {
            Ok(entry) => {
                self.stats.invalidate().await;
                notice(
                    NoticeLevel::Success,
                    &format!("Status of {} set to {}.", entry.id, entry.status),
                );
            }
            Err(e) => notice(
                NoticeLevel::Error,
                &api_failure_message(&e, "Failed to update the status."),
            ),
        }
    }

    async fn handle_suggest(&self, args: &str) {
        let (kind, query) = match args.trim().split_once(char::is_whitespace) {
            Some((kind, query)) => (kind.to_lowercase(), query.trim()),
            None => return notice(NoticeLevel::Error, "Usage: suggest company|contact <text>"),
        };

        let kind = match kind.as_str() {
            "company" | "companies" => SuggestionKind::Company,
            "contact" | "contacts" => SuggestionKind::ContactPerson,
            _ => return notice(NoticeLevel::Error, "Usage: suggest company|contact <text>"),
        };

        match self.suggestions.fetch(kind, query).await {
            Some(hits) => {
                for hit in hits {
                    println!("  {hit}");
                }
            }
            None => notice(NoticeLevel::Info, "No suggestions."),
        }
    }

    async fn handle_export(&self, args: &str) {
        let (what, rest) = match args.trim().split_once(char::is_whitespace) {
            Some((what, rest)) => (what.to_lowercase(), rest.trim()),
            None => (args.trim().to_lowercase(), ""),
        };

        match what.as_str() {
            "entries" => {
                let filters = match parse_entry_filters(rest) {
                    Ok(filters) => filters,
                    Err(e) => return notice(NoticeLevel::Error, &e),
                };
                let entries = match self.api.list_entries(&filters).await {
                    Ok(entries) => entries,
                    Err(e) => {
                        return notice(
                            NoticeLevel::Error,
                            &api_failure_message(&e, "Failed to load entries for export."),
                        );
                    }
                };
                if entries.is_empty() {
                    return notice(NoticeLevel::Warning, "No entries to export.");
                }
                match export::export_entries_csv(&entries, &self.export_dir).await {
                    Ok(path) => notice(
                        NoticeLevel::Success,
                        &format!("Entries exported to {}", path.display()),
                    ),
                    Err(e) => {
                        warn!("Entry export failed: {}", e);
                        notice(NoticeLevel::Error, "Failed to export entries.");
                    }
                }
            }
            "stats" => {
                let filters = match parse_stats_filters(rest) {
                    Ok(filters) => filters,
                    Err(e) => return notice(NoticeLevel::Error, &e),
                };
                let bundle = match self.stats.get(&filters).await {
                    Ok(bundle) => bundle,
                    Err(e) => {
                        return notice(
                            NoticeLevel::Error,
                            &api_failure_message(&e, "Failed to load statistics for export."),
                        );
                    }
                };
                match export::export_stats_json(&bundle, &self.export_dir).await {
                    Ok(path) => notice(
                        NoticeLevel::Success,
                        &format!("Statistics exported to {}", path.display()),
                    ),
                    Err(e) => {
                        warn!("Stats export failed: {}", e);
                        notice(NoticeLevel::Error, "Failed to export statistics.");
                    }
                }
            }
            _ => notice(NoticeLevel::Error, "Usage: export entries|stats [filters]"),
        }
    }

    async fn handle_reset(&self) {
        match prompt_line("Clear the form and discard the draft? [y/N] ").await {
            Some(answer) if matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") => {}
            _ => return,
        }

        *self.form_buffer.write().await = None;
        if let Err(e) = self.drafts.clear().await {
            warn!("Failed to clear draft: {}", e);
        }
        if let Err(e) = self.session.clear_editing().await {
            warn!("Failed to clear edit marker: {}", e);
        }
        notice(NoticeLevel::Info, "Form, draft, and edit marker cleared.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::sample_entry;

    #[test]
    fn commands_parse_with_arguments() {
        assert_eq!(Command::parse("help"), Command::Help);
        assert_eq!(
            Command::parse("list club=8x8"),
            Command::List("club=8x8".to_string())
        );
        assert_eq!(Command::parse("show e42"), Command::Show("e42".to_string()));
        assert_eq!(Command::parse("  quit  "), Command::Quit);
        assert_eq!(
            Command::parse("frobnicate"),
            Command::Unknown("frobnicate".to_string())
        );
    }

    #[test]
    fn key_values_allow_spaces_in_trailing_words() {
        let pairs = parse_key_values("status=In progress company=Acme Robotics").unwrap();
        assert_eq!(
            pairs,
            vec![
                ("status".to_string(), "In progress".to_string()),
                ("company".to_string(), "Acme Robotics".to_string()),
            ]
        );
        assert!(parse_key_values("loose words first").is_err());
    }

    #[test]
    fn entry_filters_parse_status_and_dates() {
        let filters =
            parse_entry_filters("status=Requested on mail from=2025-11-01 to=2025-11-30").unwrap();
        assert_eq!(filters.status, Some(EntryStatus::RequestedMail));
        assert_eq!(filters.start_date.unwrap().to_string(), "2025-11-01");
        assert_eq!(filters.end_date.unwrap().to_string(), "2025-11-30");

        assert!(parse_entry_filters("status=Nope").is_err());
        assert!(parse_entry_filters("color=red").is_err());
    }

    #[test]
    fn edit_fills_the_form_from_the_entry() {
        let entry = sample_entry("e1", "Acme Robotics");
        let form = entry_to_form(&entry);
        assert_eq!(form.company, "Acme Robotics");
        assert_eq!(form.email, "contact@example.test");
        assert_eq!(form.linkedin, "");
        assert_eq!(form.entry_date, Some(entry.entry_date));
    }
}
