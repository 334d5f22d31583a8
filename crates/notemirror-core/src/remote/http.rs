//! HTTP adapter for the Simplenote-style note API.

use std::fmt;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use super::RemoteStore;
use crate::models::{Index, Note};
use crate::util::{compact_text, is_http_url, normalize_text_option};
use crate::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://simple-note.appspot.com";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Connection settings for [`HttpNoteStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL without trailing slash
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Requested index page length; server default when `None`
    pub index_page_size: Option<u32>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        Ok(Self {
            base_url,
            ..Self::default()
        })
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_index_page_size(mut self, size: u32) -> Self {
        self.index_page_size = Some(size);
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn build_client(&self) -> Result<Client> {
        Ok(Client::builder().timeout(self.timeout).build()?)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            index_page_size: None,
        }
    }
}

/// Account email plus the token issued by [`login`].
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub auth_token: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, auth_token: impl Into<String>) -> Result<Self> {
        let email = normalize_text_option(Some(email.into()))
            .ok_or_else(|| Error::InvalidInput("email must not be empty".to_string()))?;
        let auth_token = normalize_text_option(Some(auth_token.into()))
            .ok_or_else(|| Error::InvalidInput("auth token must not be empty".to_string()))?;
        Ok(Self { email, auth_token })
    }

    fn query(&self) -> [(&'static str, &str); 2] {
        [("auth", &self.auth_token), ("email", &self.email)]
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Credentials")
            .field("email", &self.email)
            .field("auth_token", &"[REDACTED]")
            .finish()
    }
}

/// Exchange email and password for an auth token.
pub async fn login(config: &ClientConfig, email: &str, password: &str) -> Result<Credentials> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(Error::InvalidInput(
            "email and password are required".to_string(),
        ));
    }

    let response = config
        .build_client()?
        .post(config.url("api/login"))
        .header(
            reqwest::header::CONTENT_TYPE,
            "application/x-www-form-urlencoded",
        )
        .body(login_body(email.trim(), password))
        .send()
        .await?;
    let response = check_status(response, "login", None).await?;

    let token = response.text().await?;
    Credentials::new(email, token).map_err(|_| Error::Remote {
        operation: "login",
        key: None,
        status: StatusCode::OK.as_u16(),
        message: "login response did not include an auth token".to_string(),
    })
}

fn login_body(email: &str, password: &str) -> String {
    let form = format!(
        "email={}&password={}",
        urlencoding::encode(email),
        urlencoding::encode(password)
    );
    BASE64.encode(form)
}

/// [`RemoteStore`] backed by the note service's HTTP API.
#[derive(Clone)]
pub struct HttpNoteStore {
    config: ClientConfig,
    credentials: Credentials,
    client: Client,
}

impl HttpNoteStore {
    pub fn new(config: ClientConfig, credentials: Credentials) -> Result<Self> {
        let client = config.build_client()?;
        Ok(Self {
            config,
            credentials,
            client,
        })
    }

    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub const fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Trash the note, then delete it permanently.
    pub async fn delete_note(&self, note: &Note) -> Result<()> {
        let trashed = self.trash_note(note).await?;
        if trashed.deleted != 1 {
            return Err(Error::Remote {
                operation: "delete_note",
                key: Some(note.key.clone()),
                status: StatusCode::OK.as_u16(),
                message: format!("note not marked deleted (deleted={})", trashed.deleted),
            });
        }

        let request = self
            .authorized(self.client.delete(self.data_url(&note.key, None)?));
        let response = request.send().await?;
        check_status(response, "delete_note", Some(&note.key)).await?;
        tracing::debug!("Deleted note {} permanently", note.key);
        Ok(())
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.query(&self.credentials.query())
    }

    fn data_url(&self, key: &str, version: Option<u64>) -> Result<String> {
        let key = require_key(key)?;
        let encoded = urlencoding::encode(key);
        Ok(match version {
            Some(version) => self.config.url(&format!("api2/data/{encoded}/{version}")),
            None => self.config.url(&format!("api2/data/{encoded}")),
        })
    }

    async fn send_note(
        &self,
        request: RequestBuilder,
        operation: &'static str,
        key: Option<&str>,
    ) -> Result<Note> {
        let response = self.authorized(request).send().await?;
        let response = check_status(response, operation, key).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl fmt::Debug for HttpNoteStore {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("HttpNoteStore")
            .field("config", &self.config)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl RemoteStore for HttpNoteStore {
    async fn fetch_index_page(&self, mark: Option<&str>) -> Result<Index> {
        let mut request = self.authorized(self.client.get(self.config.url("api2/index")));
        if let Some(mark) = mark {
            request = request.query(&[("mark", mark)]);
        }
        if let Some(length) = self.config.index_page_size {
            request = request.query(&[("length", length)]);
        }

        let response = check_status(request.send().await?, "fetch_index_page", None).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn fetch_note(&self, key: &str, version: Option<u64>) -> Result<Note> {
        let url = self.data_url(key, version)?;
        let response = self.authorized(self.client.get(url)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(key.to_string()));
        }
        let response = check_status(response, "fetch_note", Some(key)).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn upsert_note(&self, note: &Note) -> Result<Note> {
        let (url, key) = if note.key.is_empty() {
            (self.config.url("api2/data"), None)
        } else {
            (self.data_url(&note.key, None)?, Some(note.key.as_str()))
        };

        let request = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json; charset=utf-8")
            .body(serde_json::to_vec(note)?);
        let saved = self.send_note(request, "upsert_note", key).await?;
        tracing::debug!("Upserted note {} (version {})", saved.key, saved.version);
        Ok(saved)
    }

    async fn trash_note(&self, note: &Note) -> Result<Note> {
        require_key(&note.key)?;
        let mut trashed = note.clone();
        trashed.deleted = 1;
        self.upsert_note(&trashed).await
    }
}

fn require_key(key: &str) -> Result<&str> {
    let key = key.trim();
    if key.is_empty() {
        Err(Error::InvalidInput("note key cannot be empty".to_string()))
    } else {
        Ok(key)
    }
}

fn normalize_base_url(raw: String) -> Result<String> {
    let url = normalize_text_option(Some(raw))
        .ok_or_else(|| Error::InvalidInput("base URL must not be empty".to_string()))?;
    if is_http_url(&url) {
        Ok(url.trim_end_matches('/').to_string())
    } else {
        Err(Error::InvalidInput(
            "base URL must include http:// or https://".to_string(),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

async fn check_status(
    response: Response,
    operation: &'static str,
    key: Option<&str>,
) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(Error::Remote {
        operation,
        key: key.map(ToOwned::to_owned),
        status: status.as_u16(),
        message: parse_api_error(status, &body),
    })
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return compact_text(&message);
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string()
    } else {
        trimmed
    }
}
