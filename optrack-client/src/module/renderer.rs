///! Plain-text rendering of service data for the console views. Pure
///! templating: nothing here talks to the network or mutates state.
use optrack_common::{Bucket, ClubPerformance, Entry, MemberContribution, StatsBundle};

use crate::module::stats::MiniStats;

const BAR_WIDTH: usize = 28;

/// Clip a value to `width` characters, padding with spaces.
fn cell(value: &str, width: usize) -> String {
    let clipped: String = if value.chars().count() > width {
        let mut s: String = value.chars().take(width.saturating_sub(1)).collect();
        s.push('…');
        s
    } else {
        value.to_string()
    };
    format!("{clipped:<width$}")
}

fn bar(count: u64, max: u64) -> String {
    if max == 0 {
        return String::new();
    }
    let filled = ((count as f64 / max as f64) * BAR_WIDTH as f64).round() as usize;
    "█".repeat(filled.max(usize::from(count > 0)))
}

fn contact_summary(entry: &Entry) -> String {
    let mut parts = Vec::new();
    if let Some(email) = &entry.email {
        parts.push(email.clone());
    }
    if entry.linkedin.is_some() {
        parts.push("LinkedIn".to_string());
    }
    if let Some(phone) = &entry.phone {
        parts.push(phone.clone());
    }
    if parts.is_empty() {
        "-".to_string()
    } else {
        parts.join(" / ")
    }
}

pub fn render_entries_table(entries: &[Entry]) -> String {
    if entries.is_empty() {
        return "No entries found\n".to_string();
    }

    let mut out = String::new();
    out.push_str(&format!(
        "{} {} {} {} {} {} {}\n",
        cell("Date", 10),
        cell("Member", 12),
        cell("Club", 12),
        cell("Company", 22),
        cell("Contact", 24),
        cell("Status", 21),
        cell("Id", 12),
    ));
    out.push_str(&"-".repeat(120));
    out.push('\n');

    for entry in entries {
        out.push_str(&format!(
            "{} {} {} {} {} {} {}\n",
            cell(&entry.entry_date.to_string(), 10),
            cell(&entry.member_name, 12),
            cell(&entry.club, 12),
            cell(&entry.company, 22),
            cell(&contact_summary(entry), 24),
            cell(entry.status.as_str(), 21),
            cell(&entry.id, 12),
        ));
    }
    out.push_str(&format!("{} entries\n", entries.len()));
    out
}

pub fn render_entry_detail(entry: &Entry) -> String {
    let mut out = String::new();
    out.push_str(&format!("Entry {}\n", entry.id));
    out.push_str(&format!("  Member:       {} ({})\n", entry.member_name, entry.club));
    out.push_str(&format!("  Company:      {}\n", entry.company));
    out.push_str(&format!(
        "  Opportunity:  {}\n",
        entry.opportunity_type.as_deref().unwrap_or("-")
    ));
    out.push_str(&format!(
        "  Contact:      {}\n",
        entry.contact_person.as_deref().unwrap_or("-")
    ));
    out.push_str(&format!("  Email:        {}\n", entry.email.as_deref().unwrap_or("-")));
    out.push_str(&format!(
        "  LinkedIn:     {}\n",
        entry.linkedin.as_deref().unwrap_or("-")
    ));
    out.push_str(&format!("  Phone:        {}\n", entry.phone.as_deref().unwrap_or("-")));
    out.push_str(&format!("  Status:       {}\n", entry.status));
    if let Some(notes) = &entry.status_notes {
        out.push_str(&format!("  Notes:        {notes}\n"));
    }
    out.push_str(&format!("  Entry date:   {}\n", entry.entry_date));
    out
}

fn render_distribution(title: &str, buckets: &[Bucket]) -> String {
    let mut out = format!("{title}\n");
    if buckets.is_empty() {
        out.push_str("  No data available\n");
        return out;
    }

    let max = buckets.iter().map(|b| b.count).max().unwrap_or(0);
    for bucket in buckets {
        out.push_str(&format!(
            "  {} {} {}\n",
            cell(bucket.label_or_unknown(), 24),
            cell(&bar(bucket.count, max), BAR_WIDTH),
            bucket.count,
        ));
    }
    out
}

fn render_club_performance(clubs: &[ClubPerformance]) -> String {
    let mut out = String::from("Club performance\n");
    if clubs.is_empty() {
        out.push_str("  No data available\n");
        return out;
    }

    out.push_str(&format!(
        "  {} {} {} {} {} {}\n",
        cell("Club", 22),
        cell("Entries", 8),
        cell("Members", 8),
        cell("Companies", 10),
        cell("Active", 7),
        "Success",
    ));
    for club in clubs {
        out.push_str(&format!(
            "  {} {} {} {} {} {:.1}%\n",
            cell(club.name(), 22),
            cell(&club.total_entries.to_string(), 8),
            cell(&club.unique_members_count.to_string(), 8),
            cell(&club.unique_companies_count.to_string(), 10),
            cell(&club.active_count.to_string(), 7),
            club.success_rate,
        ));
    }
    out
}

fn render_member_contributions(members: &[MemberContribution]) -> String {
    let mut out = String::from("Member contributions\n");
    if members.is_empty() {
        out.push_str("  No data available\n");
        return out;
    }

    for member in members {
        let mut breakdown = Vec::new();
        if member.in_progress > 0 {
            breakdown.push(format!("in progress {}", member.in_progress));
        }
        if member.requested_linkedin > 0 {
            breakdown.push(format!("linkedin {}", member.requested_linkedin));
        }
        if member.requested_mail > 0 {
            breakdown.push(format!("mail {}", member.requested_mail));
        }
        if member.yet_to_contact > 0 {
            breakdown.push(format!("pending {}", member.yet_to_contact));
        }
        if member.rejected > 0 {
            breakdown.push(format!("rejected {}", member.rejected));
        }

        out.push_str(&format!(
            "  {} {} {} {}\n",
            cell(&member.member_name, 16),
            cell(&member.club, 14),
            cell(&member.count.to_string(), 5),
            breakdown.join(", "),
        ));
    }
    out
}

pub fn render_stats(bundle: &StatsBundle) -> String {
    let summary = &bundle.summary;
    let mut out = String::new();
    out.push_str(&format!(
        "Total entries: {}   Last 7 days: {}   Last 30 days: {}   Avg/member: {}\n\n",
        summary.total_entries,
        summary.recent_entries_7days,
        summary.recent_entries_30days,
        summary.average_per_member,
    ));

    out.push_str(&render_distribution("Status distribution", &bundle.status_distribution));
    out.push('\n');
    out.push_str(&render_distribution("Club distribution", &bundle.club_distribution));
    out.push('\n');
    out.push_str(&render_distribution("Top companies", &bundle.top_companies));
    out.push('\n');

    let contact_buckets = [
        Bucket {
            label: Some("Email".to_string()),
            count: bundle.contact_methods.email,
        },
        Bucket {
            label: Some("LinkedIn".to_string()),
            count: bundle.contact_methods.linkedin,
        },
        Bucket {
            label: Some("Phone".to_string()),
            count: bundle.contact_methods.phone,
        },
    ];
    out.push_str(&render_distribution("Contact methods", &contact_buckets));
    out.push('\n');

    out.push_str(&render_distribution("Opportunity types", &bundle.opportunity_types));
    out.push('\n');
    out.push_str(&render_distribution("Daily timeline (30 days)", &bundle.daily_timeline));
    out.push('\n');
    out.push_str(&render_club_performance(&bundle.club_performance));
    out.push('\n');
    out.push_str(&render_member_contributions(&bundle.member_contributions));
    out
}

pub fn render_mini_stats(mini: &MiniStats) -> String {
    let rank = match mini.rank {
        Some((position, of)) => format!("#{position} of {of}"),
        None => "-".to_string(),
    };
    format!(
        "Your entries: {}   This week: {}   Club rank: {}\n",
        mini.total, mini.this_week, rank
    )
}
