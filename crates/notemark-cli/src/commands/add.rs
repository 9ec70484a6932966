use std::path::Path;

use notemark_core::Note;

use crate::commands::common::{resolve_note_content, App};
use crate::error::CliError;

pub async fn run_add(
    title: Option<String>,
    content_parts: &[String],
    db_path: &Path,
) -> Result<(), CliError> {
    let app = App::open(db_path).await?;
    app.require_session()?;
    let content = resolve_note_content(content_parts)?;

    let note = app
        .reconciler
        .record_create(Note::new(title.unwrap_or_default(), content))
        .await?;

    println!("{}", note.id);
    Ok(())
}
