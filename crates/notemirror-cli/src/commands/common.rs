use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use notemirror_core::remote::{ClientConfig, HttpNoteStore};
use notemirror_core::{EngineConfig, Mirror, MirrorRecord, SyncEngine};
use serde::Serialize;

use crate::auth::resolve_credentials;
use crate::config_profiles::{
    default_mirror_dir, normalize_text_option, CliProfile, CliProfilesConfig,
};
use crate::error::CliError;

/// Profile and paths resolved for one invocation.
#[derive(Debug, Clone)]
pub struct Context {
    pub profile_name: String,
    pub profile: CliProfile,
    pub mirror_dir: PathBuf,
    pub verbose: bool,
}

impl Context {
    pub fn load(
        explicit_profile: Option<&str>,
        mirror_dir: Option<PathBuf>,
        verbose: bool,
    ) -> Result<Self, CliError> {
        let config = CliProfilesConfig::load().map_err(CliError::Config)?;
        Self::from_config(&config, explicit_profile, mirror_dir, verbose)
    }

    pub fn from_config(
        config: &CliProfilesConfig,
        explicit_profile: Option<&str>,
        mirror_dir: Option<PathBuf>,
        verbose: bool,
    ) -> Result<Self, CliError> {
        let profile_name = config.resolve_profile_name(explicit_profile);
        let profile = config.profile(&profile_name).cloned().unwrap_or_default();
        let mirror_dir = resolve_mirror_dir(mirror_dir, &profile)?;
        Ok(Self {
            profile_name,
            profile,
            mirror_dir,
            verbose,
        })
    }

    pub fn client_config(&self) -> Result<ClientConfig, CliError> {
        let base_url = normalize_text_option(env::var("NOTEMIRROR_API_URL").ok())
            .or_else(|| self.profile.api_base_url());
        let config = match base_url {
            Some(url) => ClientConfig::new(url)?,
            None => ClientConfig::default(),
        };
        apply_client_overrides(
            config,
            env::var("NOTEMIRROR_HTTP_TIMEOUT_SECS").ok(),
            env::var("NOTEMIRROR_INDEX_PAGE_SIZE").ok(),
        )
    }

    pub fn engine_config(&self) -> EngineConfig {
        let config = EngineConfig::new().with_verbose(self.verbose);
        match self.profile.index_cooldown_secs {
            Some(secs) => config.with_index_cooldown(Duration::from_secs(secs)),
            None => config,
        }
    }

    pub fn remote(&self) -> Result<HttpNoteStore, CliError> {
        let credentials = resolve_credentials(&self.profile_name, &self.profile)?;
        Ok(HttpNoteStore::new(self.client_config()?, credentials)?)
    }

    pub fn open_mirror(&self) -> Result<Mirror, CliError> {
        Ok(Mirror::open(self.mirror_dir.clone())?)
    }

    pub fn engine(&self) -> Result<SyncEngine<HttpNoteStore>, CliError> {
        let remote = self.remote()?;
        Ok(SyncEngine::new(self.open_mirror()?, remote, self.engine_config()))
    }
}

/// Apply the request timeout and index page size overrides, when set.
pub fn apply_client_overrides(
    config: ClientConfig,
    timeout_secs: Option<String>,
    index_page_size: Option<String>,
) -> Result<ClientConfig, CliError> {
    let mut config = config;
    if let Some(secs) = normalize_text_option(timeout_secs) {
        let secs = secs.parse::<u64>().map_err(|_| {
            CliError::Config(format!("NOTEMIRROR_HTTP_TIMEOUT_SECS is not a number: {secs}"))
        })?;
        config = config.with_timeout(Duration::from_secs(secs));
    }
    if let Some(size) = normalize_text_option(index_page_size) {
        let size = size.parse::<u32>().map_err(|_| {
            CliError::Config(format!("NOTEMIRROR_INDEX_PAGE_SIZE is not a number: {size}"))
        })?;
        config = config.with_index_page_size(size);
    }
    Ok(config)
}

/// Confirmation line for `trash` and `delete`.
pub fn removal_message(verb: &str, key: &str, mirrored: bool) -> String {
    if mirrored {
        format!("{verb} {key} and removed its mirror entry")
    } else {
        format!("{verb} {key}")
    }
}

/// `--mirror-dir`, then `NOTEMIRROR_MIRROR_DIR`, then the profile, then the data dir.
pub fn resolve_mirror_dir(
    explicit: Option<PathBuf>,
    profile: &CliProfile,
) -> Result<PathBuf, CliError> {
    if let Some(dir) = explicit {
        return Ok(dir);
    }
    if let Some(dir) = normalize_text_option(env::var("NOTEMIRROR_MIRROR_DIR").ok()) {
        return Ok(PathBuf::from(dir));
    }
    if let Some(dir) = profile.mirror_dir() {
        return Ok(dir);
    }
    default_mirror_dir().map_err(CliError::Config)
}

#[derive(Debug, Serialize)]
pub struct MirrorListItem {
    pub key: String,
    pub preview: String,
    pub tags: Vec<String>,
    pub modify_date: String,
    pub synced_at: String,
    pub locally_edited: bool,
}

/// Readable mirror records, sorted by key. Incomplete entries are skipped.
pub fn read_mirror_records(mirror: &Mirror) -> Result<Vec<MirrorRecord>, CliError> {
    let mut records = Vec::new();
    for key in mirror.list()? {
        match mirror.read(&key) {
            Ok(record) => records.push(record),
            Err(error) if error.is_not_found() => {
                tracing::debug!("Skipping incomplete mirror entry {}", key);
            }
            Err(error) => return Err(error.into()),
        }
    }
    Ok(records)
}

pub fn format_record_lines(records: &[MirrorRecord]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    records
        .iter()
        .map(|record| {
            let marker = if is_locally_edited(record) { '*' } else { ' ' };
            let preview = note_preview(&record.content, 40);
            let relative_time = record
                .synced_at()
                .map_or_else(|_| "never".to_string(), |at| {
                    format_relative_time(system_time_millis(at), now_ms)
                });
            let tags = render_tags(&record.tags);

            if tags.is_empty() {
                format!("{} {marker} {preview:<40}  {relative_time}", record.key)
            } else {
                format!(
                    "{} {marker} {preview:<40}  {relative_time:<10}  {tags}",
                    record.key
                )
            }
        })
        .collect()
}

pub fn record_to_list_item(record: &MirrorRecord) -> MirrorListItem {
    let mut tags = record.tags.clone();
    tags.sort();

    MirrorListItem {
        key: record.key.clone(),
        preview: note_preview(&record.content, 80),
        tags,
        modify_date: record.modify_date.clone(),
        synced_at: record
            .synced_at()
            .map_or_else(|_| String::new(), notemirror_core::timestamp::display),
        locally_edited: is_locally_edited(record),
    }
}

fn is_locally_edited(record: &MirrorRecord) -> bool {
    record.is_locally_edited().unwrap_or(false)
}

fn system_time_millis(instant: SystemTime) -> i64 {
    DateTime::<Utc>::from(instant).timestamp_millis()
}

/// First non-blank line with whitespace collapsed, cut to `max_chars`.
pub fn note_preview(content: &str, max_chars: usize) -> String {
    let first_line = content
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("");
    let collapsed = first_line.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn render_tags(tags: &[String]) -> String {
    let mut tags = tags.to_vec();
    tags.sort();
    tags.into_iter()
        .map(|tag| format!("#{tag}"))
        .collect::<Vec<String>>()
        .join(" ")
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut normalized = Vec::new();
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !normalized.iter().any(|existing: &String| existing == tag) {
            normalized.push(tag.to_string());
        }
    }
    normalized
}

pub fn resolve_note_content(content_parts: &[String]) -> Result<String, CliError> {
    if let Some(content) = normalize_content(&content_parts.join(" ")) {
        return Ok(content);
    }

    if let Some(content) = read_piped_stdin()? {
        return Ok(content);
    }

    if let Some(content) = capture_editor_input()? {
        return Ok(content);
    }

    Err(CliError::EmptyContent)
}

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn normalize_note_key(key: &str) -> Result<String, CliError> {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyNoteKey)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_content(&buffer))
}

pub fn capture_editor_input() -> Result<Option<String>, CliError> {
    let editor = preferred_editor();
    let temp_file = create_temp_note_file_path();
    std::fs::write(&temp_file, "")?;

    let launch_result = launch_editor(&editor, &temp_file);
    let note_content = std::fs::read_to_string(&temp_file)?;
    let _ = std::fs::remove_file(&temp_file);

    launch_result?;
    Ok(normalize_content(&note_content))
}

pub fn launch_editor(editor: &str, file_path: &Path) -> Result<(), CliError> {
    match Command::new(editor).arg(file_path).status() {
        Ok(status) => {
            if status.success() {
                Ok(())
            } else {
                Err(CliError::EditorFailed(format!(
                    "`{editor}` exited with status {status}"
                )))
            }
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            let mut parts = editor.split_whitespace();
            let Some(program) = parts.next() else {
                return Err(CliError::EditorFailed("empty EDITOR command".into()));
            };

            let mut command = Command::new(program);
            command.args(parts).arg(file_path);

            let status = command.status()?;
            if status.success() {
                Ok(())
            } else {
                Err(CliError::EditorFailed(format!(
                    "`{editor}` exited with status {status}"
                )))
            }
        }
        Err(err) => Err(CliError::Io(err)),
    }
}

pub fn preferred_editor() -> String {
    env::var("VISUAL")
        .or_else(|_| env::var("EDITOR"))
        .unwrap_or_else(|_| default_editor().to_string())
}

pub const fn default_editor() -> &'static str {
    if cfg!(windows) {
        "notepad"
    } else {
        "vi"
    }
}

pub fn create_temp_note_file_path() -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    env::temp_dir().join(format!("notemirror-note-{}-{now}.txt", std::process::id()))
}
