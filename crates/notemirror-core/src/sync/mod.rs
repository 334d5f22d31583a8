//! Reconciliation between the local mirror and a remote note store.
//!
//! Decisions are derived only from current state: the content file's mtime
//! against its recorded sync point on one side, and the remote `modifydate`
//! on the other. Rerunning a pass after an interruption is therefore safe.

mod report;

#[cfg(test)]
mod tests;

pub use report::{NoteOutcome, SyncFailure, SyncReport};

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Instant, SystemTime};

use crate::config::EngineConfig;
use crate::mirror::{Mirror, MirrorRecord};
use crate::models::{Index, Note};
use crate::remote::RemoteStore;
use crate::{timestamp, Error, Result};

/// Drives reconciliation of a [`Mirror`] against a [`RemoteStore`].
pub struct SyncEngine<R> {
    mirror: Mirror,
    remote: R,
    config: EngineConfig,
    last_remote_write: Option<Instant>,
}

impl<R: RemoteStore> SyncEngine<R> {
    pub const fn new(mirror: Mirror, remote: R, config: EngineConfig) -> Self {
        Self {
            mirror,
            remote,
            config,
            last_remote_write: None,
        }
    }

    pub const fn mirror(&self) -> &Mirror {
        &self.mirror
    }

    pub const fn remote(&self) -> &R {
        &self.remote
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Reconcile a single note that exists in the mirror.
    ///
    /// When both sides changed since the last sync, `prefer_local` makes the
    /// local edit authoritative; otherwise the remote copy wins whenever it is
    /// also the more recent of the two.
    pub async fn sync_note(&mut self, key: &str, prefer_local: bool) -> Result<NoteOutcome> {
        let local = self.mirror.read(key)?;
        let remote = self.fetch_note(key).await?;
        let outcome = self.reconcile(local, remote, prefer_local).await?;
        self.progress(key, outcome);
        Ok(outcome)
    }

    /// Reconcile every note in the remote index.
    ///
    /// Per-note failures are collected in the report and do not stop the pass.
    /// Failing to list the mirror or to fetch the index aborts it.
    /// Entries that only exist locally are left alone.
    pub async fn sync_all(&mut self, prefer_local: bool) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        let mut local = BTreeMap::new();
        let mut unreadable = BTreeSet::new();

        for key in self.mirror.list()? {
            match self.mirror.read(&key) {
                Ok(record) => {
                    local.insert(key, record);
                }
                Err(error) if error.is_not_found() => {
                    tracing::debug!("Mirror entry {} is incomplete, treating it as absent", key);
                }
                Err(error) => {
                    report.fail(&key, error);
                    unreadable.insert(key);
                }
            }
        }

        let index = self.fetch_index().await?;
        let mut seen = BTreeSet::new();

        for summary in index.data {
            if summary.key.is_empty() {
                tracing::warn!("Skipping index entry without a key");
                continue;
            }
            if unreadable.contains(&summary.key) || !seen.insert(summary.key.clone()) {
                continue;
            }

            let result = match local.remove(&summary.key) {
                Some(record) => self.reconcile_listed(record, &summary, prefer_local).await,
                None => self.materialize(&summary, false).await,
            };
            match result {
                Ok(outcome) => {
                    self.progress(&summary.key, outcome);
                    report.record(&summary.key, outcome);
                }
                Err(error) => report.fail(&summary.key, error),
            }
        }

        if !local.is_empty() {
            tracing::debug!(
                "{} mirror entries have no remote counterpart and were left alone",
                local.len()
            );
        }

        Ok(report)
    }

    /// Initial checkout of every live remote note into the mirror.
    ///
    /// With `overwrite` unset, an existing entry holding a newer local edit is
    /// reported as a conflict instead of being replaced.
    pub async fn clone_all(&mut self, overwrite: bool) -> Result<SyncReport> {
        let index = self.fetch_index().await?;
        let mut report = SyncReport::default();
        let mut seen = BTreeSet::new();

        for summary in index.data {
            if summary.key.is_empty() || !seen.insert(summary.key.clone()) {
                continue;
            }
            match self.materialize(&summary, overwrite).await {
                Ok(outcome) => {
                    self.progress(&summary.key, outcome);
                    report.record(&summary.key, outcome);
                }
                Err(error) => report.fail(&summary.key, error),
            }
        }

        Ok(report)
    }

    /// Create a note remotely and write the store's copy into the mirror.
    pub async fn push_new(&mut self, content: &str, tags: Vec<String>) -> Result<Note> {
        let now = timestamp::format(SystemTime::now())?;
        let mut draft = Note::new(content, tags);
        draft.create_date.clone_from(&now);
        draft.modify_date = now;

        let mut saved = self.push(&draft).await?;
        if saved.key.is_empty() {
            return Err(Error::Remote {
                operation: "upsert_note",
                key: None,
                status: 200,
                message: "store did not assign a key to the new note".to_string(),
            });
        }
        if saved.content.is_empty() {
            saved.content = draft.content;
        }
        if saved.tags.is_empty() {
            saved.tags = draft.tags;
        }
        if saved.modified_at().is_err() {
            saved.modify_date = draft.modify_date;
        }

        self.mirror.write(&saved, true)?;
        self.progress(&saved.key, NoteOutcome::Pushed);
        Ok(saved)
    }

    /// Trash a note remotely, then drop its mirror entry.
    ///
    /// The remote copy is fetched first so the trash request carries the
    /// store's content rather than whatever is in the mirror.
    pub async fn trash(&mut self, key: &str) -> Result<Note> {
        let remote = self.fetch_note(key).await?;
        let trashed = self.remote.trash_note(&remote).await?;
        self.last_remote_write = Some(Instant::now());
        self.mirror.remove(key)?;
        self.progress(key, NoteOutcome::Removed);
        Ok(trashed)
    }

    async fn reconcile_listed(
        &mut self,
        local: MirrorRecord,
        summary: &Note,
        prefer_local: bool,
    ) -> Result<NoteOutcome> {
        if summary.is_deleted() {
            self.mirror.remove(&local.key)?;
            return Ok(NoteOutcome::Removed);
        }
        if local.content_mod_time == summary.modified_at()? {
            return Ok(NoteOutcome::Unchanged);
        }
        let remote = self.fetch_note(&local.key).await?;
        self.reconcile(local, remote, prefer_local).await
    }

    async fn reconcile(
        &mut self,
        local: MirrorRecord,
        remote: Note,
        prefer_local: bool,
    ) -> Result<NoteOutcome> {
        if remote.is_deleted() {
            self.mirror.remove(&local.key)?;
            return Ok(NoteOutcome::Removed);
        }

        let synced_at = local.synced_at()?;
        let remote_at = remote.modified_at()?;

        if local.content_mod_time > synced_at {
            if remote_at > local.content_mod_time && !prefer_local {
                self.mirror.write(&remote, true)?;
                return Ok(NoteOutcome::Pulled);
            }
            return self.push_local(&local, &remote).await;
        }

        if remote_at > synced_at {
            self.mirror.write(&remote, true)?;
            return Ok(NoteOutcome::Pulled);
        }

        Ok(NoteOutcome::Unchanged)
    }

    /// Local edit wins: upload it if the remote differs, then move the sync point.
    ///
    /// The remote differs when its content, tags or `modifydate` disagree with
    /// the mirror. The dates are compared against the recorded sync point,
    /// before it is moved to the content file's mtime.
    async fn push_local(&mut self, local: &MirrorRecord, remote: &Note) -> Result<NoteOutcome> {
        let remote_moved = remote.modified_at()? != local.synced_at()?;
        let mut note = local.to_note();
        note.modify_date = timestamp::format(local.content_mod_time)?;

        let differs =
            remote_moved || note.content != remote.content || !remote.same_tags(&note.tags);
        let outcome = if differs {
            let saved = self.push(&note).await?;
            if !saved.key.is_empty() && saved.key != note.key {
                return Err(Error::Remote {
                    operation: "upsert_note",
                    key: Some(note.key),
                    status: 200,
                    message: format!("store answered with a different key {:?}", saved.key),
                });
            }
            // The store's stamp is what its index will report next time.
            if saved.modified_at().is_ok() {
                note.modify_date = saved.modify_date;
            }
            NoteOutcome::Pushed
        } else {
            NoteOutcome::Restamped
        };

        self.mirror.write(&note, true)?;
        Ok(outcome)
    }

    async fn materialize(&mut self, summary: &Note, overwrite: bool) -> Result<NoteOutcome> {
        if summary.is_deleted() {
            return Ok(NoteOutcome::Skipped);
        }
        let note = self.fetch_note(&summary.key).await?;
        if note.is_deleted() {
            return Ok(NoteOutcome::Skipped);
        }
        self.mirror.write(&note, overwrite)?;
        Ok(NoteOutcome::Materialized)
    }

    async fn fetch_note(&self, key: &str) -> Result<Note> {
        let mut note = self.remote.fetch_note(key, None).await?;
        if note.key.is_empty() {
            note.key = key.to_string();
        } else if note.key != key {
            return Err(Error::Remote {
                operation: "fetch_note",
                key: Some(key.to_string()),
                status: 200,
                message: format!("store answered with a different key {:?}", note.key),
            });
        }
        Ok(note)
    }

    async fn push(&mut self, note: &Note) -> Result<Note> {
        let saved = self.remote.upsert_note(note).await;
        self.last_remote_write = Some(Instant::now());
        saved
    }

    /// Fetch the full index, first waiting out the cooldown after a remote write.
    async fn fetch_index(&self) -> Result<Index> {
        if let Some(last_write) = self.last_remote_write {
            let elapsed = last_write.elapsed();
            if elapsed < self.config.index_cooldown {
                let wait = self.config.index_cooldown - elapsed;
                tracing::debug!("Waiting {:?} before listing the remote index", wait);
                tokio::time::sleep(wait).await;
            }
        }
        self.remote.fetch_index().await
    }

    fn progress(&self, key: &str, outcome: NoteOutcome) {
        if !outcome.is_mutation() {
            tracing::trace!("{}: {}", key, outcome);
        } else if self.config.verbose {
            tracing::info!("{}: {}", key, outcome);
        } else {
            tracing::debug!("{}: {}", key, outcome);
        }
    }
}
