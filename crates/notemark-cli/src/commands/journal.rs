use std::path::Path;

use crate::commands::common::{
    format_journal_lines, format_timestamp, record_to_journal_item, App, JournalItem,
};
use crate::error::CliError;

pub async fn run_journal(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let app = App::open(db_path).await?;
    app.require_session()?;
    let records = app.reconciler.pending_records().await?;

    if as_json {
        let json_items = records
            .iter()
            .map(record_to_journal_item)
            .collect::<Vec<JournalItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No pending changes.");
    } else {
        for line in format_journal_lines(&records) {
            println!("{line}");
        }
    }

    let summary = app.reconciler.journal_summary().await?;
    let last_sync = app
        .reconciler
        .last_sync_at()
        .await?
        .map_or_else(|| "never".to_string(), format_timestamp);
    println!(
        "{} pending, {} dead-lettered; last sync: {last_sync}",
        summary.pending, summary.dead
    );
    Ok(())
}

pub async fn run_requeue(db_path: &Path) -> Result<(), CliError> {
    let app = App::open(db_path).await?;
    app.require_session()?;

    let count = app.reconciler.requeue_dead().await?;
    println!("Requeued {count} change(s)");
    Ok(())
}
