// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod demo;

pub use demo::DemoBackend;

use anyhow::{Context, Result, anyhow, bail};
use bizdesk_app::{Collection, FieldEdit, ResourceKind, TenantContext};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const TENANT_HEADER: &str = "x-tenant-id";

/// The collection endpoints the views read from and commit inline edits to.
pub trait Backend: Send + Sync {
    fn list(&self, kind: ResourceKind) -> Result<Collection>;

    fn update_field(&self, edit: &FieldEdit) -> Result<()>;

    fn ping(&self) -> Result<()> {
        self.list(ResourceKind::Members).map(|_| ())
    }
}

#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    context: TenantContext,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(
        base_url: &str,
        context: TenantContext,
        token: Option<&str>,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = validate_base_url(base_url)?;
        if context.tenant_id.trim().is_empty() {
            bail!("api.tenant_id must not be empty -- set it to your workspace id");
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static(TENANT_HEADER),
            HeaderValue::from_str(&context.tenant_id)
                .context("api.tenant_id contains characters not allowed in a header")?,
        );
        if let Some(token) = token.map(str::trim).filter(|token| !token.is_empty()) {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .context("api token contains characters not allowed in a header")?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            context,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    pub fn context(&self) -> &TenantContext {
        &self.context
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn collection_url(&self, kind: ResourceKind) -> Result<Url> {
        self.base_url
            .join(&format!("{}/", kind.path()))
            .with_context(|| format!("build {} endpoint", kind.label()))
    }

    pub fn record_url(&self, kind: ResourceKind, id: i64) -> Result<Url> {
        self.collection_url(kind)?
            .join(&format!("{id}/"))
            .with_context(|| format!("build {} record endpoint", kind.label()))
    }

    fn get_list<T: DeserializeOwned>(&self, kind: ResourceKind) -> Result<Vec<T>> {
        let url = self.collection_url(kind)?;
        debug!(resource = kind.label(), %url, "fetching collection");
        let response = self
            .http
            .get(url)
            .send()
            .map_err(|error| self.connection_error(error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        let body = response
            .text()
            .with_context(|| format!("read {} response", kind.label()))?;
        let parsed: ListEnvelope<serde_json::Value> = serde_json::from_str(&body)
            .with_context(|| format!("decode {} response", kind.label()))?;
        let rows = decode_rows(kind, parsed.into_rows());
        debug!(resource = kind.label(), count = rows.len(), "collection fetched");
        Ok(rows)
    }

    fn connection_error(&self, error: reqwest::Error) -> anyhow::Error {
        if error.is_timeout() {
            return anyhow!(
                "request to {} timed out after {:?} -- raise [api].timeout or retry",
                self.base_url,
                self.timeout
            );
        }
        connection_error(self.base_url.as_str(), error)
    }
}

impl Backend for Client {
    fn list(&self, kind: ResourceKind) -> Result<Collection> {
        Ok(match kind {
            ResourceKind::Members => Collection::Members(self.get_list(kind)?),
            ResourceKind::Goals => Collection::Goals(self.get_list(kind)?),
            ResourceKind::Items => Collection::Items(self.get_list(kind)?),
        })
    }

    fn update_field(&self, edit: &FieldEdit) -> Result<()> {
        edit.validate(&self.context)?;

        let url = self.record_url(edit.kind, edit.record_id)?;
        let mut body = serde_json::Map::new();
        body.insert(
            edit.field.clone(),
            serde_json::to_value(&edit.value).context("encode field value")?,
        );
        debug!(
            resource = edit.kind.label(),
            record_id = edit.record_id,
            field = %edit.field,
            %url,
            "updating field"
        );

        let response = self
            .http
            .patch(url)
            .json(&body)
            .send()
            .map_err(|error| self.connection_error(error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }
        Ok(())
    }
}

/// Parses a configured backend root. The result always ends with a slash so
/// resource paths join under it.
pub fn validate_base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        bail!("api.base_url must not be empty");
    }
    let mut base_url = Url::parse(trimmed)
        .with_context(|| format!("api.base_url {trimmed:?} is not a valid URL"))?;
    if !matches!(base_url.scheme(), "http" | "https") {
        bail!(
            "api.base_url must use http or https, got {:?}",
            base_url.scheme()
        );
    }
    if !base_url.path().ends_with('/') {
        let path = format!("{}/", base_url.path());
        base_url.set_path(&path);
    }
    Ok(base_url)
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    anyhow!(
        "cannot reach {} -- check [api].base_url and that the backend is running ({})",
        base_url,
        error
    )
}

/// Turns a failed response into the message shown to the user. A `detail`
/// payload is passed through verbatim.
fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(detail) = parsed.detail
        && !detail.trim().is_empty()
    {
        return anyhow!("{}", detail.trim());
    }

    if status == StatusCode::UNAUTHORIZED {
        return anyhow!("not signed in -- set [api].token or BIZDESK_API_TOKEN");
    }
    if status == StatusCode::FORBIDDEN {
        return anyhow!("this account cannot access the workspace -- check [api].tenant_id");
    }

    let body = body.trim();
    if !body.is_empty() && body.len() < 100 && !body.contains('{') && !body.contains('<') {
        return anyhow!("server error ({}): {}", status.as_u16(), body);
    }

    anyhow!("server returned {}", status.as_u16())
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    detail: Option<String>,
}

/// Collections arrive either as a bare array or as a page with `results`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListEnvelope<T> {
    Plain(Vec<T>),
    Paged { results: Vec<T> },
}

impl<T> ListEnvelope<T> {
    fn into_rows(self) -> Vec<T> {
        match self {
            Self::Plain(rows) | Self::Paged { results: rows } => rows,
        }
    }
}

/// Rows without a usable id are skipped so the rest of the list still shows.
fn decode_rows<T: DeserializeOwned>(kind: ResourceKind, raw: Vec<serde_json::Value>) -> Vec<T> {
    raw.into_iter()
        .enumerate()
        .filter_map(|(index, row)| match serde_json::from_value(row) {
            Ok(row) => Some(row),
            Err(error) => {
                warn!(resource = kind.label(), index, %error, "skipping undecodable row");
                None
            }
        })
        .collect()
}
