//! Transfer client for the extraction backend. One call = one HTTP request.

use crate::error::TransferError;
use crate::types::{
    BatchResults, BatchUploadResponse, DocumentResult, ExportFormat, ExportPayload, HistoryEntry,
    UploadResponse, ValidationIssue, ValidationSummary,
};
use reqwest::blocking::{multipart, Client};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A file attached to a multipart form.
#[derive(Debug, Clone, PartialEq)]
pub struct FilePart {
    pub field: &'static str,
    pub filename: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Json(Value),
    Multipart(Vec<FilePart>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path below the base URL, e.g. `/api/history`.
    pub path: String,
    pub body: Body,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: Body::Empty,
        }
    }

    pub fn post(path: impl Into<String>, body: Body) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub status_text: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Moves a request to the backend and brings back whatever it answered.
/// Status handling and decoding live in [`ExtractorClient`].
pub trait Transport: Send + Sync {
    fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransferError>;
}

/// `reqwest` blocking transport against a base URL.
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransferError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransferError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn network_error(e: reqwest::Error) -> TransferError {
    TransferError::Network(
        if e.is_connect() || e.is_timeout() {
            "Check your internet connection and try again."
        } else {
            "Network error."
        }
        .to_string(),
    )
}

impl Transport for HttpTransport {
    fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransferError> {
        let url = format!("{}{}", self.base_url, request.path);
        let builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        let builder = match request.body {
            Body::Empty => builder,
            Body::Json(v) => builder.json(&v),
            Body::Multipart(parts) => {
                let mut form = multipart::Form::new();
                for part in parts {
                    let p = multipart::Part::bytes(part.bytes)
                        .file_name(part.filename)
                        .mime_str(&part.mime)
                        .map_err(|e| TransferError::Encode(format!("Invalid MIME type: {}", e)))?;
                    form = form.part(part.field, p);
                }
                builder.multipart(form)
            }
        };

        let response = builder.send().map_err(network_error)?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response.bytes().map_err(network_error)?.to_vec();
        Ok(ApiResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            content_type,
            body,
        })
    }
}

/// Typed operations against the extraction API.
pub struct ExtractorClient<T: Transport = HttpTransport> {
    transport: T,
}

impl<T: Transport> ExtractorClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn call(&self, request: ApiRequest) -> Result<ApiResponse, TransferError> {
        tracing::debug!(method = ?request.method, path = %request.path, "api request");
        let response = self.transport.send(request)?;
        if !response.is_success() {
            let message = if response.status_text.is_empty() {
                format!("HTTP {}", response.status)
            } else {
                response.status_text.clone()
            };
            return Err(TransferError::Http {
                status: response.status,
                message,
            });
        }
        Ok(response)
    }

    fn call_json<R: DeserializeOwned>(&self, request: ApiRequest) -> Result<R, TransferError> {
        let response = self.call(request)?;
        serde_json::from_slice(&response.body).map_err(|e| TransferError::Decode(e.to_string()))
    }

    fn call_export(
        &self,
        request: ApiRequest,
        format: ExportFormat,
    ) -> Result<ExportPayload, TransferError> {
        let response = self.call(request)?;
        match format {
            ExportFormat::Json => serde_json::from_slice(&response.body)
                .map(ExportPayload::Json)
                .map_err(|e| TransferError::Decode(e.to_string())),
            ExportFormat::Csv => Ok(ExportPayload::Bytes(response.body)),
        }
    }

    pub fn upload(&self, file: FilePart) -> Result<UploadResponse, TransferError> {
        self.call_json(ApiRequest::post(
            "/api/upload",
            Body::Multipart(vec![FilePart { field: "file", ..file }]),
        ))
    }

    pub fn upload_batch(&self, files: Vec<FilePart>) -> Result<BatchUploadResponse, TransferError> {
        let parts = files
            .into_iter()
            .map(|f| FilePart { field: "files", ..f })
            .collect();
        self.call_json(ApiRequest::post("/api/upload-batch", Body::Multipart(parts)))
    }

    pub fn batch_results(&self, batch_id: &str) -> Result<BatchResults, TransferError> {
        self.call_json(ApiRequest::get(format!("/api/batch-results/{}", batch_id)))
    }

    pub fn history(&self) -> Result<Vec<HistoryEntry>, TransferError> {
        self.call_json(ApiRequest::get("/api/history"))
    }

    pub fn results(&self, document_id: i64) -> Result<DocumentResult, TransferError> {
        self.call_json(ApiRequest::get(format!("/api/results/{}", document_id)))
    }

    pub fn validation_summary(&self, document_id: i64) -> Result<ValidationSummary, TransferError> {
        self.call_json(ApiRequest::get(format!(
            "/api/validation-summary/{}",
            document_id
        )))
    }

    pub fn validation_issues(&self, document_id: i64) -> Result<Vec<ValidationIssue>, TransferError> {
        self.call_json(ApiRequest::get(format!(
            "/api/validation-issues/{}",
            document_id
        )))
    }

    pub fn acknowledge_issue(&self, issue_id: i64) -> Result<Value, TransferError> {
        self.call_json(ApiRequest::post(
            format!("/api/ignore-warning/{}", issue_id),
            Body::Empty,
        ))
    }

    pub fn export(&self, document_id: i64, format: ExportFormat) -> Result<ExportPayload, TransferError> {
        self.call_export(
            ApiRequest::get(format!("/api/export/{}/{}", document_id, format.as_str())),
            format,
        )
    }

    pub fn export_batch(&self, batch_id: &str, format: ExportFormat) -> Result<ExportPayload, TransferError> {
        self.call_export(
            ApiRequest::post(
                format!("/api/download-batch/{}", batch_id),
                Body::Json(json!({ "format": format.as_str() })),
            ),
            format,
        )
    }

    pub fn save_corrections(
        &self,
        document_id: i64,
        corrections: Map<String, Value>,
    ) -> Result<Value, TransferError> {
        self.call_json(ApiRequest::post(
            format!("/api/correct/{}", document_id),
            Body::Json(Value::Object(corrections)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Canned {
        response: ApiResponse,
        seen: Mutex<Vec<ApiRequest>>,
    }

    impl Canned {
        fn new(status: u16, status_text: &str, body: &str) -> Self {
            Self {
                response: ApiResponse {
                    status,
                    status_text: status_text.to_string(),
                    content_type: None,
                    body: body.as_bytes().to_vec(),
                },
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl Transport for Canned {
        fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransferError> {
            self.seen.lock().unwrap().push(request);
            Ok(self.response.clone())
        }
    }

    #[test]
    fn non_success_becomes_http_error_with_status_text() {
        let client = ExtractorClient::new(Canned::new(404, "Not Found", "{}"));
        let err = client.history().unwrap_err();
        assert_eq!(
            err,
            TransferError::Http {
                status: 404,
                message: "Not Found".into()
            }
        );
    }

    #[test]
    fn bad_mime_fails_before_sending() {
        let transport = HttpTransport::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let request = ApiRequest::post(
            "/api/upload",
            Body::Multipart(vec![FilePart {
                field: "file",
                filename: "scan.pdf".into(),
                mime: "not a mime".into(),
                bytes: vec![1],
            }]),
        );
        let err = transport.send(request).unwrap_err();
        assert_eq!(err.kind(), crate::error::FailureKind::EncodeError);
        assert!(err.to_string().starts_with("Invalid request: Invalid MIME type"));
    }

    #[test]
    fn bad_json_is_decode_error() {
        let client = ExtractorClient::new(Canned::new(200, "OK", "<html>"));
        assert!(matches!(client.history(), Err(TransferError::Decode(_))));
    }

    #[test]
    fn csv_export_is_opaque_bytes() {
        let client = ExtractorClient::new(Canned::new(200, "OK", "Field Name,Field Value\n"));
        let payload = client.export(7, ExportFormat::Csv).unwrap();
        assert_eq!(payload, ExportPayload::Bytes(b"Field Name,Field Value\n".to_vec()));
        let seen = client.transport().seen.lock().unwrap();
        assert_eq!(seen[0].path, "/api/export/7/csv");
        assert_eq!(seen[0].method, Method::Get);
    }

    #[test]
    fn batch_export_posts_format() {
        let client = ExtractorClient::new(Canned::new(200, "OK", "{\"docs\":[]}"));
        client.export_batch("b1", ExportFormat::Json).unwrap();
        let seen = client.transport().seen.lock().unwrap();
        assert_eq!(seen[0].path, "/api/download-batch/b1");
        assert_eq!(seen[0].body, Body::Json(json!({"format": "json"})));
    }

    #[test]
    fn batch_upload_uses_repeated_files_field() {
        let client = ExtractorClient::new(Canned::new(200, "OK", "{\"batch_id\":\"b9\"}"));
        let part = |name: &str| FilePart {
            field: "file",
            filename: name.to_string(),
            mime: "application/pdf".into(),
            bytes: vec![1, 2, 3],
        };
        let resp = client.upload_batch(vec![part("a.pdf"), part("b.pdf")]).unwrap();
        assert_eq!(resp.batch_id, "b9");
        let seen = client.transport().seen.lock().unwrap();
        match &seen[0].body {
            Body::Multipart(parts) => {
                assert_eq!(parts.len(), 2);
                assert!(parts.iter().all(|p| p.field == "files"));
            }
            other => panic!("unexpected body {:?}", other),
        }
    }
}
