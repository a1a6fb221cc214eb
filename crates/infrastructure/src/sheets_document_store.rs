use async_trait::async_trait;
use serde_json::{Value, json};

use presentia_application::{DocumentRangeStore, NamedRange};
use presentia_core::{AppError, AppResult};

/// Connection settings for the spreadsheet values API.
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    /// API base, e.g. `https://sheets.googleapis.com/v4/spreadsheets`.
    pub base_url: String,
    /// Identifier of the shared spreadsheet.
    pub spreadsheet_id: String,
    /// OAuth bearer token for every request.
    pub access_token: String,
}

/// Spreadsheet-backed implementation of the document range store.
///
/// Every operation maps onto one call of the values API; all transport
/// and non-success responses surface as [`AppError::Unavailable`] so the
/// sync layer treats them as retryable.
pub struct SheetsDocumentStore {
    http_client: reqwest::Client,
    config: SheetsConfig,
}

impl SheetsDocumentStore {
    /// Creates a new spreadsheet store.
    #[must_use]
    pub fn new(http_client: reqwest::Client, config: SheetsConfig) -> Self {
        Self {
            http_client,
            config,
        }
    }

    fn values_url(&self, range: &str, suffix: &str) -> String {
        format!(
            "{}/{}/values/{}{}",
            self.config.base_url, self.config.spreadsheet_id, range, suffix
        )
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> AppResult<Value> {
        let response = request
            .bearer_auth(&self.config.access_token)
            .send()
            .await
            .map_err(|error| AppError::Unavailable(format!("spreadsheet request failed: {error}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Unavailable(format!(
                "spreadsheet API returned {status}: {body}"
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|error| AppError::Unavailable(format!("malformed spreadsheet response: {error}")))
    }

    fn decode_rows(payload: &Value) -> Vec<Vec<String>> {
        payload
            .get("values")
            .and_then(Value::as_array)
            .map(|rows| {
                rows.iter()
                    .map(|row| {
                        row.as_array()
                            .map(|cells| {
                                cells
                                    .iter()
                                    .map(|cell| match cell {
                                        Value::String(text) => text.clone(),
                                        other => other.to_string(),
                                    })
                                    .collect()
                            })
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentRangeStore for SheetsDocumentStore {
    async fn read_range(&self, range: NamedRange) -> AppResult<Vec<Vec<String>>> {
        let url = self.values_url(range.read_span(), "");
        let payload = self.send(self.http_client.get(url)).await?;
        Ok(Self::decode_rows(&payload))
    }

    async fn append_rows(&self, range: NamedRange, rows: Vec<Vec<String>>) -> AppResult<()> {
        let url = self.values_url(range.read_span(), ":append?valueInputOption=USER_ENTERED");
        self.send(self.http_client.post(url).json(&json!({ "values": rows })))
            .await?;
        Ok(())
    }

    async fn clear_range(&self, range: NamedRange) -> AppResult<()> {
        let url = self.values_url(range.read_span(), ":clear");
        self.send(self.http_client.post(url).json(&json!({})))
            .await?;
        Ok(())
    }

    async fn overwrite_range(&self, range: NamedRange, rows: Vec<Vec<String>>) -> AppResult<()> {
        let url = self.values_url(range.read_span(), "?valueInputOption=USER_ENTERED");
        self.send(self.http_client.put(url).json(&json!({ "values": rows })))
            .await?;
        Ok(())
    }
}
