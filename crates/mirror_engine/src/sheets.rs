use std::time::Duration;

use mirror_core::{CellAddress, CellRange};
use mirror_logging::mirror_debug;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{CellValue, RemoteStore, RemoteStoreError, StoreFailureKind};

pub const DEFAULT_SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/";

#[derive(Debug, Clone)]
pub struct SheetsSettings {
    pub api_base: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for SheetsSettings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_SHEETS_API_BASE.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Google Sheets values API client for a single spreadsheet.
///
/// Authenticates with an already-issued bearer token; obtaining or
/// refreshing that token happens elsewhere.
pub struct SheetsStore {
    client: reqwest::Client,
    api_base: Url,
    spreadsheet_id: String,
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct ValueRangeResponse {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueRangeRequest<'a, T: Serialize> {
    range: &'a str,
    major_dimension: &'static str,
    values: T,
}

impl SheetsStore {
    pub fn new(
        settings: SheetsSettings,
        spreadsheet_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Result<Self, RemoteStoreError> {
        let api_base = Url::parse(&settings.api_base).map_err(|err| {
            RemoteStoreError::new("connect", StoreFailureKind::Network, err.to_string())
        })?;
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| {
                RemoteStoreError::new("connect", StoreFailureKind::Network, err.to_string())
            })?;
        Ok(Self {
            client,
            api_base,
            spreadsheet_id: spreadsheet_id.into(),
            access_token: access_token.into(),
        })
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    fn values_url(&self, operation: &'static str, range: &str) -> Result<Url, RemoteStoreError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| {
                RemoteStoreError::new(
                    operation,
                    StoreFailureKind::Network,
                    format!("api base {} cannot carry a path", self.api_base),
                )
            })?
            .pop_if_empty()
            .extend(["spreadsheets", self.spreadsheet_id.as_str(), "values", range]);
        Ok(url)
    }

    async fn send(
        &self,
        operation: &'static str,
        method: Method,
        url: Url,
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, RemoteStoreError> {
        mirror_debug!("Sheets {} {} {}", operation, method, url);
        let mut request = self
            .client
            .request(method, url)
            .bearer_auth(&self.access_token);
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|err| map_reqwest_error(operation, err))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| map_reqwest_error(operation, err))?;

        if !status.is_success() {
            let kind = match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreFailureKind::Auth,
                other => StoreFailureKind::HttpStatus(other.as_u16()),
            };
            return Err(RemoteStoreError::new(
                operation,
                kind,
                String::from_utf8_lossy(&bytes).trim().to_string(),
            ));
        }
        Ok(bytes.to_vec())
    }

    async fn update<T: Serialize + Sync>(
        &self,
        operation: &'static str,
        range: &str,
        values: T,
    ) -> Result<(), RemoteStoreError> {
        let mut url = self.values_url(operation, range)?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED");
        let body = serde_json::to_vec(&ValueRangeRequest {
            range,
            major_dimension: "ROWS",
            values,
        })
        .map_err(|err| {
            RemoteStoreError::new(operation, StoreFailureKind::MalformedResponse, err.to_string())
        })?;
        self.send(operation, Method::PUT, url, Some(body)).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl RemoteStore for SheetsStore {
    async fn read_cell(
        &self,
        sheet: &str,
        cell: CellAddress,
    ) -> Result<Option<String>, RemoteStoreError> {
        let range = qualified_range(sheet, &cell.to_string());
        let url = self.values_url("read", &range)?;
        let bytes = self.send("read", Method::GET, url, None).await?;
        let parsed: ValueRangeResponse = serde_json::from_slice(&bytes).map_err(|err| {
            RemoteStoreError::new("read", StoreFailureKind::MalformedResponse, err.to_string())
        })?;

        let value = parsed
            .values
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .map(|value| match value {
                serde_json::Value::String(text) => text,
                other => other.to_string(),
            });
        Ok(value)
    }

    async fn write_range(
        &self,
        sheet: &str,
        range: CellRange,
        rows: &[(CellValue, CellValue)],
    ) -> Result<(), RemoteStoreError> {
        let range = qualified_range(sheet, &range.to_string());
        self.update("write_range", &range, rows).await
    }

    async fn write_cell(
        &self,
        sheet: &str,
        cell: CellAddress,
        value: &str,
    ) -> Result<(), RemoteStoreError> {
        let range = qualified_range(sheet, &cell.to_string());
        self.update("write_cell", &range, [[value]]).await
    }
}

/// `Sheet1!C1`, quoting the sheet name when it is not a plain identifier.
fn qualified_range(sheet: &str, a1: &str) -> String {
    let plain = !sheet.is_empty() && sheet.chars().all(|c| c.is_alphanumeric() || c == '_');
    if plain {
        format!("{sheet}!{a1}")
    } else {
        format!("'{}'!{a1}", sheet.replace('\'', "''"))
    }
}

fn map_reqwest_error(operation: &'static str, err: reqwest::Error) -> RemoteStoreError {
    let kind = if err.is_timeout() {
        StoreFailureKind::Timeout
    } else {
        StoreFailureKind::Network
    };
    RemoteStoreError::new(operation, kind, err.to_string())
}
