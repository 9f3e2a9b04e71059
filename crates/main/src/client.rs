//! Blocking client for a remote `/submit` endpoint.

use std::time::Duration;

use log::{debug, info};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use serde::Deserialize;
use thiserror::Error;

use medreport::config::ClientConfig;
use medreport::{Locale, ServiceRecord, PDF_MIME_TYPE};

/// Failure to get a report back from the server. Never retried.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection, timeout or body read failure.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The server answered 2xx with something other than a PDF.
    #[error("expected a PDF, got `{content_type}`")]
    UnexpectedContentType { content_type: String },
}

/// A report returned by the server.
#[derive(Debug, Clone)]
pub struct SubmittedReport {
    pub bytes: Vec<u8>,
    /// Name from `Content-Disposition`, or the locale default.
    pub filename: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    field: Option<String>,
}

/// Posts service records and collects the rendered PDF.
pub struct ReportClient {
    http: Client,
    endpoint: String,
    locale: Locale,
}

impl ReportClient {
    pub fn new(config: &ClientConfig, locale: Locale) -> Result<Self, TransportError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            locale,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Submits a validated record.
    pub fn submit(&self, record: &ServiceRecord) -> Result<SubmittedReport, TransportError> {
        self.send(self.http.post(&self.endpoint).json(record))
    }

    /// Submits a raw JSON payload as is; the server does the validation.
    pub fn submit_payload(&self, json: Vec<u8>) -> Result<SubmittedReport, TransportError> {
        self.send(
            self.http
                .post(&self.endpoint)
                .header(CONTENT_TYPE, "application/json")
                .body(json),
        )
    }

    fn send(&self, request: RequestBuilder) -> Result<SubmittedReport, TransportError> {
        debug!("submitting service record to {}", self.endpoint);
        let response = request.send()?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        let content_type = header_str(response.headers().get(CONTENT_TYPE));
        if !content_type.starts_with(PDF_MIME_TYPE) {
            return Err(TransportError::UnexpectedContentType { content_type });
        }

        let filename = filename_from_disposition(&header_str(response.headers().get(CONTENT_DISPOSITION)))
            .unwrap_or_else(|| self.locale.report_filename().to_string());
        let bytes = response.bytes()?.to_vec();
        info!("received {filename} ({} bytes)", bytes.len());

        Ok(SubmittedReport { bytes, filename })
    }
}

fn header_str(value: Option<&reqwest::header::HeaderValue>) -> String {
    value
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Extracts `filename=` from a `Content-Disposition` value.
fn filename_from_disposition(value: &str) -> Option<String> {
    value
        .split(';')
        .filter_map(|part| part.trim().strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
        .find(|name| !name.is_empty())
}

/// Readable message from an error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            error,
            field: Some(field),
        }) if !error.contains(&field) => format!("{field}: {error}"),
        Ok(ErrorBody { error, .. }) => error,
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}
