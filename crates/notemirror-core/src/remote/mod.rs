//! Remote note store contract consumed by the sync engine.

mod http;

pub use http::{login, ClientConfig, Credentials, HttpNoteStore, DEFAULT_BASE_URL};

use crate::models::{Index, Note};
use crate::{Error, Result};

/// Operations the sync engine needs from a remote note store.
///
/// Every call runs to completion before the engine issues the next one.
#[allow(async_fn_in_trait)]
pub trait RemoteStore {
    /// Fetch one index page. `mark` is the cursor returned by the previous
    /// page, or `None` for the first page.
    async fn fetch_index_page(&self, mark: Option<&str>) -> Result<Index>;

    /// Fetch a full note. `version` selects a historical revision.
    async fn fetch_note(&self, key: &str, version: Option<u64>) -> Result<Note>;

    /// Create the note when its key is empty, otherwise update it. Returns the
    /// store's canonical copy.
    async fn upsert_note(&self, note: &Note) -> Result<Note>;

    /// Set the tombstone flag on a note. Trashing twice is harmless.
    async fn trash_note(&self, note: &Note) -> Result<Note>;

    /// Fetch every index page and fold them into one index.
    async fn fetch_index(&self) -> Result<Index> {
        let mut index = Index::default();
        let mut mark: Option<String> = None;

        loop {
            let page = self.fetch_index_page(mark.as_deref()).await?;
            let next = page.next_mark().map(ToOwned::to_owned);
            index.absorb(page);

            match next {
                None => break,
                Some(next) if mark.as_deref() == Some(next.as_str()) => {
                    return Err(Error::Remote {
                        operation: "fetch_index_page",
                        key: None,
                        status: 200,
                        message: format!("paging cursor {next:?} did not advance"),
                    });
                }
                Some(next) => mark = Some(next),
            }
        }

        tracing::debug!(
            "Fetched remote index: {} notes, count={}",
            index.data.len(),
            index.count
        );
        Ok(index)
    }
}
