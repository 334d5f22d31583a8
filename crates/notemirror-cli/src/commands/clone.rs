use notemirror_core::{Mirror, SyncEngine};

use crate::commands::common::Context;
use crate::commands::sync::{finish, format_report_lines};
use crate::error::CliError;

pub async fn run_clone(overwrite: bool, context: &Context) -> Result<(), CliError> {
    let remote = context.remote()?;
    let mirror = Mirror::create(context.mirror_dir.clone(), overwrite)?;
    let mut engine = SyncEngine::new(mirror, remote, context.engine_config());

    let report = engine.clone_all(overwrite).await?;

    println!("Cloned into {}", engine.mirror().root().display());
    for line in format_report_lines(&report) {
        println!("{line}");
    }
    finish(&report)
}
