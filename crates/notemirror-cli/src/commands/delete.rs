use notemirror_core::RemoteStore;

use crate::commands::common::{normalize_note_key, removal_message, Context};
use crate::error::CliError;

pub async fn run_trash(key: &str, context: &Context) -> Result<(), CliError> {
    let key = normalize_note_key(key)?;
    let mut engine = context.engine()?;
    let mirrored = engine.mirror().contains(&key);
    engine.trash(&key).await?;

    println!("{}", removal_message("Trashed", &key, mirrored));
    Ok(())
}

pub async fn run_delete(key: &str, context: &Context) -> Result<(), CliError> {
    let key = normalize_note_key(key)?;
    let remote = context.remote()?;
    let mirror = context.open_mirror()?;

    let note = remote.fetch_note(&key, None).await?;
    remote.delete_note(&note).await?;
    let mirrored = mirror.contains(&key);
    mirror.remove(&key)?;

    println!("{}", removal_message("Deleted", &key, mirrored));
    Ok(())
}
