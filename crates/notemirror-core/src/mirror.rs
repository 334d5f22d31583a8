//! Local mirror: one directory per note under a mirror root.
//!
//! Layout of `<root>/<key>/`:
//!
//! | file          | content                                   |
//! |---------------|-------------------------------------------|
//! | `text.txt`    | note body, byte-exact                     |
//! | `.Key`        | the note key                              |
//! | `.Modifydate` | fixed-point `modifydate` last known synced |
//! | `Tags`        | one tag per line                          |
//!
//! The modification time of `text.txt` doubles as a clock. Every write sets
//! it to the note's parsed `modifydate`, so a later mtime means the file was
//! edited outside of notemirror since the last sync.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[cfg(unix)]
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};

use crate::models::Note;
use crate::{timestamp, Error, Result};

pub const CONTENT_FILE: &str = "text.txt";
pub const KEY_FILE: &str = ".Key";
pub const MODIFY_DATE_FILE: &str = ".Modifydate";
pub const TAGS_FILE: &str = "Tags";

#[cfg(unix)]
const DIR_MODE: u32 = 0o700;
#[cfg(unix)]
const FILE_MODE: u32 = 0o600;

/// A note as found in the mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorRecord {
    /// Directory name, which is the note key
    pub key: String,
    pub content: String,
    pub tags: Vec<String>,
    /// Fixed-point `modifydate` recorded at the last sync
    pub modify_date: String,
    /// OS modification time of the content file, read fresh
    pub content_mod_time: SystemTime,
}

impl MirrorRecord {
    /// Instant of the last sync, parsed from the recorded `modifydate`.
    pub fn synced_at(&self) -> Result<SystemTime> {
        timestamp::parse(&self.modify_date)
    }

    /// True when the content file changed after the recorded sync point.
    pub fn is_locally_edited(&self) -> Result<bool> {
        Ok(self.content_mod_time > self.synced_at()?)
    }

    /// Note carrying the local state, suitable for pushing.
    #[must_use]
    pub fn to_note(&self) -> Note {
        Note {
            key: self.key.clone(),
            content: self.content.clone(),
            tags: self.tags.clone(),
            modify_date: self.modify_date.clone(),
            ..Note::default()
        }
    }
}

/// Directory-per-note store rooted at a single path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mirror {
    root: PathBuf,
}

impl Mirror {
    /// Open a mirror, creating the root directory when it does not exist.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            create_private_dir_all(&root)?;
        }
        Ok(Self { root })
    }

    /// Create a fresh mirror root.
    ///
    /// Fails when the root already exists unless `overwrite` is set.
    pub fn create(root: impl Into<PathBuf>, overwrite: bool) -> Result<Self> {
        let root = root.into();
        if root.exists() && !overwrite {
            return Err(Error::InvalidInput(format!(
                "mirror directory {} already exists",
                root.display()
            )));
        }
        Self::open(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the note with `key`.
    pub fn note_dir(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.note_dir(key)
            .is_ok_and(|dir| dir.join(CONTENT_FILE).is_file())
    }

    /// Keys of all note directories, sorted. Plain files in the root are ignored.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(key) => keys.push(key),
                Err(name) => {
                    tracing::warn!("Skipping mirror entry with non UTF-8 name: {:?}", name);
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    /// Read the mirror entry for `key`.
    ///
    /// Returns [`Error::NotFound`] when the directory or its content file is
    /// missing, or when no sync point was ever recorded for it.
    pub fn read(&self, key: &str) -> Result<MirrorRecord> {
        let dir = self.note_dir(key)?;

        let mut file = match File::open(dir.join(CONTENT_FILE)) {
            Ok(file) => file,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return Err(Error::NotFound(key.to_string()));
            }
            Err(error) => return Err(error.into()),
        };
        let mut content = String::new();
        file.read_to_string(&mut content)?;
        let content_mod_time = file.metadata()?.modified()?;

        let modify_date = match fs::read_to_string(dir.join(MODIFY_DATE_FILE)) {
            Ok(raw) => raw.trim().to_string(),
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return Err(Error::NotFound(format!(
                    "{key} has no recorded sync point"
                )));
            }
            Err(error) => return Err(error.into()),
        };

        let tags = match fs::read_to_string(dir.join(TAGS_FILE)) {
            Ok(raw) => parse_tags(&raw),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(error) => return Err(error.into()),
        };

        Ok(MirrorRecord {
            key: key.to_string(),
            content,
            tags,
            modify_date,
            content_mod_time,
        })
    }

    /// Write `note` into its directory.
    ///
    /// When the entry already exists, its content file was modified after
    /// `note.modify_date`, and `force_update` is false, the write is refused
    /// with [`Error::Conflict`] before anything on disk changes.
    ///
    /// On success the content file's modification time equals the parsed
    /// `note.modify_date`.
    pub fn write(&self, note: &Note, force_update: bool) -> Result<()> {
        let dir = self.note_dir(&note.key)?;
        let incoming = note.modified_at()?;
        let content_path = dir.join(CONTENT_FILE);

        match fs::metadata(&content_path) {
            Ok(metadata) => {
                let on_disk = metadata.modified()?;
                if on_disk > incoming && !force_update {
                    return Err(Error::Conflict {
                        key: note.key.clone(),
                        on_disk: timestamp::format(on_disk)
                            .unwrap_or_else(|_| timestamp::display(on_disk)),
                        incoming: note.modify_date.clone(),
                    });
                }
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                create_private_dir_all(&dir)?;
            }
            Err(error) => return Err(error.into()),
        }

        let content_file = write_private(&content_path, note.content.as_bytes())?;
        content_file.set_modified(incoming)?;
        drop(content_file);

        write_private(&dir.join(TAGS_FILE), render_tags(&note.tags).as_bytes())?;
        write_private(&dir.join(KEY_FILE), note.key.as_bytes())?;
        // Written last: a sync point only exists once everything else landed.
        write_private(&dir.join(MODIFY_DATE_FILE), note.modify_date.trim().as_bytes())?;

        Ok(())
    }

    /// Remove the entry for `key`. Removing a missing entry is not an error.
    pub fn remove(&self, key: &str) -> Result<()> {
        let dir = self.note_dir(key)?;
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }

    /// Overwrite the content file as an external editor would and pin its mtime.
    #[cfg(test)]
    pub(crate) fn edit_content(&self, key: &str, content: &str, modified: SystemTime) {
        let path = self.note_dir(key).unwrap().join(CONTENT_FILE);
        let file = write_private(&path, content.as_bytes()).unwrap();
        file.set_modified(modified).unwrap();
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(Error::InvalidInput("note key cannot be empty".to_string()));
    }
    if key == "." || key == ".." || key.contains(['/', '\\', '\0']) {
        return Err(Error::InvalidInput(format!(
            "note key {key:?} is not a valid directory name"
        )));
    }
    Ok(())
}

fn parse_tags(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn render_tags(tags: &[String]) -> String {
    tags.iter().fold(String::new(), |mut rendered, tag| {
        rendered.push_str(tag);
        rendered.push('\n');
        rendered
    })
}

fn create_private_dir_all(path: &Path) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(DIR_MODE);
    builder.create(path)
}

fn write_private(path: &Path, bytes: &[u8]) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(FILE_MODE);

    let mut file = options.open(path)?;
    file.write_all(bytes)?;
    Ok(file)
}
