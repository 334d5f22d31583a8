use crate::commands::common::{normalize_tags, note_preview, resolve_note_content, Context};
use crate::error::CliError;

pub async fn run_add(
    content_parts: &[String],
    tags: &[String],
    context: &Context,
) -> Result<(), CliError> {
    let content = resolve_note_content(content_parts)?;

    let mut engine = context.engine()?;
    let note = engine.push_new(&content, normalize_tags(tags)).await?;

    println!("Created {} {}", note.key, note_preview(note.title(), 40));
    Ok(())
}
