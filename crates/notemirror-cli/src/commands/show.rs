use notemirror_core::{timestamp, Note, RemoteStore};

use crate::commands::common::{normalize_note_key, render_tags, Context};
use crate::error::CliError;

pub async fn run_show(
    key: &str,
    version: Option<u64>,
    as_json: bool,
    context: &Context,
) -> Result<(), CliError> {
    let key = normalize_note_key(key)?;
    let note = context.remote()?.fetch_note(&key, version).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&note)?);
    } else {
        print!("{}", format_note_details(&note));
    }
    Ok(())
}

pub fn format_note_details(note: &Note) -> String {
    let modified = note
        .modified_at()
        .map_or_else(|_| note.modify_date.clone(), timestamp::display);
    let mut details = format!(
        "key:      {}\ntitle:    {}\nversion:  {}\nmodified: {modified}\n",
        note.key,
        note.title(),
        note.version
    );
    let tags = render_tags(&note.tags);
    if !tags.is_empty() {
        details.push_str(&format!("tags:     {tags}\n"));
    }
    if note.is_deleted() {
        details.push_str("status:   trashed\n");
    }
    details.push('\n');
    details.push_str(&note.content);
    if !note.content.ends_with('\n') {
        details.push('\n');
    }
    details
}
