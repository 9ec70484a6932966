use std::path::Path;

use crate::commands::common::{normalize_note_identifier, resolve_note, App};
use crate::error::CliError;

pub async fn run_delete(id: &str, db_path: &Path) -> Result<(), CliError> {
    let normalized_id = normalize_note_identifier(id)?;
    let app = App::open(db_path).await?;
    app.require_session()?;
    let note = resolve_note(&normalized_id, &app.store).await?;

    app.reconciler.record_delete(&note.id).await?;
    println!("{}", note.id);
    Ok(())
}
