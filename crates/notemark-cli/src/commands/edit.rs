use std::path::Path;

use crate::commands::common::{
    capture_editor_input_with_initial, normalize_content, normalize_note_identifier,
    resolve_note, App,
};
use crate::error::CliError;

pub async fn run_edit(
    id: &str,
    title: Option<String>,
    content_parts: &[String],
    db_path: &Path,
) -> Result<(), CliError> {
    let normalized_id = normalize_note_identifier(id)?;
    let app = App::open(db_path).await?;
    app.require_session()?;
    let note = resolve_note(&normalized_id, &app.store).await?;

    let content = match normalize_content(&content_parts.join(" ")) {
        Some(content) => content,
        None if title.is_some() => note.content.clone(),
        None => capture_editor_input_with_initial(&note.content)?.ok_or(CliError::EmptyContent)?,
    };
    let title = title.unwrap_or_else(|| note.title.clone());

    if title == note.title && content == note.content {
        println!("{}", note.id);
        return Ok(());
    }

    let updated = app
        .reconciler
        .record_update(&note.edit(title, content))
        .await?;
    println!("{}", updated.id);
    Ok(())
}
