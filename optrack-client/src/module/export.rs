///! CSV and JSON exports of service data, written under the data directory.
use anyhow::{Context, Result};
use chrono::Local;
use optrack_common::{Entry, StatsBundle};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

const CSV_HEADERS: &[&str] = &[
    "entry_date",
    "member_name",
    "club",
    "company",
    "opportunity_type",
    "contact_person",
    "email",
    "linkedin",
    "phone",
    "status",
    "status_notes",
    "created_at",
    "updated_at",
];

fn entries_csv_bytes(entries: &[Entry]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(CSV_HEADERS)
        .context("Failed to write CSV header")?;

    for entry in entries {
        writer
            .write_record([
                entry.entry_date.to_string().as_str(),
                &entry.member_name,
                &entry.club,
                &entry.company,
                entry.opportunity_type.as_deref().unwrap_or(""),
                entry.contact_person.as_deref().unwrap_or(""),
                entry.email.as_deref().unwrap_or(""),
                entry.linkedin.as_deref().unwrap_or(""),
                entry.phone.as_deref().unwrap_or(""),
                entry.status.as_str(),
                entry.status_notes.as_deref().unwrap_or(""),
                entry.created_at.to_string().as_str(),
                entry.updated_at.to_string().as_str(),
            ])
            .context("Failed to write CSV row")?;
    }

    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to finish CSV: {e}"))
}

/// Export entries as `entries_<date>.csv`. Record ids are omitted, matching
/// what a member would paste into a report.
pub async fn export_entries_csv(entries: &[Entry], dir: &Path) -> Result<PathBuf> {
    let bytes = entries_csv_bytes(entries)?;

    fs::create_dir_all(dir)
        .await
        .context("Failed to create export directory")?;
    let path = dir.join(format!("entries_{}.csv", Local::now().format("%Y-%m-%d")));
    fs::write(&path, bytes)
        .await
        .context("Failed to write CSV export")?;

    info!("Exported {} entries to {:?}", entries.len(), path);
    Ok(path)
}

/// Export a statistics bundle as `statistics_<date>.json`.
pub async fn export_stats_json(bundle: &StatsBundle, dir: &Path) -> Result<PathBuf> {
    let content =
        serde_json::to_string_pretty(bundle).context("Failed to serialize statistics")?;

    fs::create_dir_all(dir)
        .await
        .context("Failed to create export directory")?;
    let path = dir.join(format!("statistics_{}.json", Local::now().format("%Y-%m-%d")));
    fs::write(&path, content)
        .await
        .context("Failed to write statistics export")?;

    info!("Exported statistics to {:?}", path);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::sample_entry;
    use tempfile::TempDir;

    #[tokio::test]
    async fn csv_export_writes_header_and_rows() {
        let temp_dir = TempDir::new().unwrap();
        let mut entries = vec![sample_entry("e1", "Acme Robotics")];
        // Commas in fields must survive quoting
        entries.push(sample_entry("e2", "Initech, Inc."));

        let path = export_entries_csv(&entries, temp_dir.path()).await.unwrap();
        let content = std::fs::read_to_string(&path).unwrap();

        let mut lines = content.lines();
        assert_eq!(lines.next().unwrap().split(',').next(), Some("entry_date"));
        assert_eq!(content.lines().count(), 3);
        assert!(content.contains("\"Initech, Inc.\""));
    }

    #[tokio::test]
    async fn stats_export_round_trips_as_json() {
        let temp_dir = TempDir::new().unwrap();
        let bundle = StatsBundle::default();

        let path = export_stats_json(&bundle, temp_dir.path()).await.unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let back: StatsBundle = serde_json::from_str(&content).unwrap();
        assert_eq!(back.summary.total_entries, 0);
    }
}
