use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Value, json};

use presentia_application::ObjectStore;
use presentia_core::{AppError, AppResult};

const MULTIPART_BOUNDARY: &str = "presentia_upload_boundary";

/// Drive-style implementation of the binary object store.
///
/// Uploads the base64 payload of a `data:` URL as a multipart/related
/// request, makes the file publicly readable, and returns a direct-view
/// URL suitable for the roster row.
pub struct DriveObjectStore {
    http_client: reqwest::Client,
    upload_url: String,
    api_url: String,
    access_token: String,
    folder_id: Option<String>,
}

fn base64_payload(data_url: &str) -> AppResult<&str> {
    let payload = data_url
        .split_once("base64,")
        .map(|(_, payload)| payload)
        .ok_or_else(|| {
            AppError::Validation("object upload requires a base64 data: URL".to_owned())
        })?;
    BASE64
        .decode(payload)
        .map_err(|error| AppError::Validation(format!("undecodable image payload: {error}")))?;
    Ok(payload)
}

impl DriveObjectStore {
    /// Creates a new object store.
    #[must_use]
    pub fn new(
        http_client: reqwest::Client,
        upload_url: impl Into<String>,
        api_url: impl Into<String>,
        access_token: impl Into<String>,
        folder_id: Option<String>,
    ) -> Self {
        Self {
            http_client,
            upload_url: upload_url.into(),
            api_url: api_url.into(),
            access_token: access_token.into(),
            folder_id,
        }
    }

    fn multipart_body(&self, file_name: &str, payload: &str, mime_type: &str) -> String {
        let mut metadata = json!({ "name": file_name });
        if let (Some(folder), Some(object)) = (&self.folder_id, metadata.as_object_mut()) {
            object.insert("parents".to_owned(), json!([folder]));
        }

        format!(
            "--{MULTIPART_BOUNDARY}\r\n\
             Content-Type: application/json; charset=UTF-8\r\n\r\n\
             {metadata}\r\n\
             --{MULTIPART_BOUNDARY}\r\n\
             Content-Type: {mime_type}\r\n\
             Content-Transfer-Encoding: base64\r\n\r\n\
             {payload}\r\n\
             --{MULTIPART_BOUNDARY}--"
        )
    }

    /// Best-effort: a file that stays private is still uploaded, the
    /// public link just will not render for other devices.
    async fn share_publicly(&self, file_id: &str) {
        let url = format!("{}/files/{file_id}/permissions", self.api_url);
        let result = self
            .http_client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&json!({ "role": "reader", "type": "anyone" }))
            .send()
            .await;
        match result {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                tracing::warn!(file_id, status = %response.status(), "object share failed");
            }
            Err(error) => {
                tracing::warn!(file_id, %error, "object share failed");
            }
        }
    }
}

#[async_trait]
impl ObjectStore for DriveObjectStore {
    async fn upload(&self, file_name: &str, data_url: &str, mime_type: &str) -> AppResult<String> {
        let payload = base64_payload(data_url)?;
        let body = self.multipart_body(file_name, payload, mime_type);

        let url = format!("{}/files?uploadType=multipart", self.upload_url);
        let response = self
            .http_client
            .post(url)
            .bearer_auth(&self.access_token)
            .header(
                "Content-Type",
                format!("multipart/related; boundary={MULTIPART_BOUNDARY}"),
            )
            .body(body)
            .send()
            .await
            .map_err(|error| AppError::Unavailable(format!("object upload failed: {error}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Unavailable(format!(
                "object store returned {status}: {body}"
            )));
        }

        let payload = response
            .json::<Value>()
            .await
            .map_err(|error| AppError::Unavailable(format!("malformed upload response: {error}")))?;
        let file_id = payload
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::Unavailable("upload response carried no file id".to_owned()))?;

        self.share_publicly(file_id).await;
        Ok(format!("https://drive.google.com/uc?export=view&id={file_id}"))
    }
}
