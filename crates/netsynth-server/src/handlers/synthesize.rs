//! Synthesis handler and request validation.
//!
//! Validation runs entirely before admission: a request that fails here
//! never occupies a slot, never gets a workspace and never starts the tool.

use axum::body::{Body, Bytes};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap};
use axum::Json;

use crate::config::ServerConfig;
use crate::error::{ApiError, ValidationError};
use crate::schema::synthesize::{SynthesisQuery, SynthesisSettings, SynthesizeRequest, SynthesizeResponse};
use crate::service::SynthesisJob;
use crate::state::AppState;

/// Supported request encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// `{"verilog": ..., "yosys_settings": {...}}`
    Json,
    /// Raw Verilog; settings come from the query string.
    PlainText,
}

impl PayloadKind {
    fn from_headers(headers: &HeaderMap) -> Result<Self, ValidationError> {
        let raw = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        let mime = raw.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match mime.as_str() {
            "application/json" => Ok(PayloadKind::Json),
            "text/plain" => Ok(PayloadKind::PlainText),
            _ => Err(ValidationError::UnsupportedContentType(raw.to_string())),
        }
    }
}

/// Synthesizes a Verilog design and returns the gate-level netlist.
///
/// `POST /synthesize`
pub async fn synthesize(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<SynthesisQuery>, QueryRejection>,
    body: Body,
) -> Result<Json<SynthesizeResponse>, ApiError> {
    let bytes = read_body(&state.config, &headers, body).await?;
    let kind = PayloadKind::from_headers(&headers)?;

    let settings = match kind {
        PayloadKind::PlainText => Some(
            query
                .map(|Query(settings)| settings)
                .map_err(|err| ValidationError::InvalidOption(err.body_text()))?,
        ),
        PayloadKind::Json => None,
    };

    let job = validate_request(&state.config, kind, &bytes, settings)?;
    let response = state.service.submit(job).await?;
    Ok(Json(response))
}

async fn read_body(
    config: &ServerConfig,
    headers: &HeaderMap,
    body: Body,
) -> Result<Bytes, ValidationError> {
    let limit = config.max_request_bytes;
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if declared.is_some_and(|len| len > limit as u64) {
        return Err(ValidationError::PayloadTooLarge { limit });
    }

    let bytes = axum::body::to_bytes(body, limit)
        .await
        .map_err(|_| ValidationError::PayloadTooLarge { limit })?;
    if bytes.is_empty() {
        return Err(ValidationError::EmptyBody);
    }
    Ok(bytes)
}

/// Turns a raw payload into a [`SynthesisJob`].
///
/// `query` carries the settings for plain-text payloads and is ignored for
/// JSON payloads, whose settings are part of the body.
pub fn validate_request(
    config: &ServerConfig,
    kind: PayloadKind,
    bytes: &[u8],
    query: Option<SynthesisQuery>,
) -> Result<SynthesisJob, ValidationError> {
    if bytes.is_empty() {
        return Err(ValidationError::EmptyBody);
    }
    if bytes.len() > config.max_request_bytes {
        return Err(ValidationError::PayloadTooLarge {
            limit: config.max_request_bytes,
        });
    }

    let (source, settings) = match kind {
        PayloadKind::Json => {
            let request: SynthesizeRequest = serde_json::from_slice(bytes)
                .map_err(|err| ValidationError::Malformed(err.to_string()))?;
            (request.verilog, request.yosys_settings)
        }
        PayloadKind::PlainText => {
            let source = std::str::from_utf8(bytes)
                .map_err(|_| ValidationError::Malformed("body is not valid UTF-8".to_string()))?;
            (source.to_string(), query.unwrap_or_default())
        }
    };

    if source.trim().is_empty() {
        return Err(ValidationError::EmptySource);
    }
    if source.len() > config.max_source_bytes {
        return Err(ValidationError::SourceTooLarge {
            limit: config.max_source_bytes,
        });
    }

    let options = settings.options();
    options
        .validate()
        .map_err(|err| ValidationError::InvalidOption(err.to_string()))?;

    Ok(SynthesisJob {
        source,
        options,
        timeout: effective_timeout(config, &settings)?,
    })
}

fn effective_timeout(
    config: &ServerConfig,
    settings: &SynthesisSettings,
) -> Result<std::time::Duration, ValidationError> {
    match settings.timeout_secs {
        None => Ok(config.timeout),
        Some(0) => Err(ValidationError::InvalidOption(
            "timeout_secs must be positive".to_string(),
        )),
        Some(secs) => Ok(std::time::Duration::from_secs(secs).min(config.timeout)),
    }
}
