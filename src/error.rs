use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// A provider payload that cannot be turned into a valid candle series.
///
/// The whole batch is rejected; records are never patched or dropped.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("malformed data from {provider}: {reason}")]
pub struct MalformedData {
    pub provider: String,
    pub reason: String,
}

impl MalformedData {
    pub fn new(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            reason: reason.into(),
        }
    }
}

/// Failure of a single provider call. Any of these moves the fallback chain
/// on to the next provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("{provider} returned HTTP {status}: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("{provider} rate limit exceeded")]
    RateLimited { provider: String },

    #[error("{provider} did not respond within {after:?}")]
    Timeout { provider: String, after: Duration },

    #[error(transparent)]
    Malformed(#[from] MalformedData),

    #[error("{provider} cannot serve this request: {reason}")]
    Unsupported { provider: String, reason: String },

    #[error("{provider} returned no data")]
    Empty { provider: String },

    #[error("no providers configured")]
    NotConfigured,
}

/// Errors surfaced by the analysis pipeline.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error(transparent)]
    MalformedData(#[from] MalformedData),

    #[error("no market data available for {symbol}: {source}")]
    DataUnavailable {
        symbol: String,
        #[source]
        source: Box<ProviderError>,
    },

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),
}

impl AnalysisError {
    /// Stable tag for the error kind, used in API responses and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::MalformedData(_) => "malformed_data",
            AnalysisError::DataUnavailable { .. } => "data_unavailable",
            AnalysisError::InsufficientData(_) => "insufficient_data",
            AnalysisError::UnknownSymbol(_) => "unknown_symbol",
        }
    }
}

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Analysis failed for {symbol}: {source}")]
    Analysis {
        symbol: String,
        #[source]
        source: AnalysisError,
    },

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl AppError {
    pub fn analysis(symbol: impl Into<String>, source: AnalysisError) -> Self {
        AppError::Analysis {
            symbol: symbol.into(),
            source,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind, symbol) = match &self {
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request", None),
            AppError::Analysis { symbol, source } => {
                let status = match source {
                    AnalysisError::UnknownSymbol(_) => StatusCode::BAD_REQUEST,
                    AnalysisError::InsufficientData(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    AnalysisError::MalformedData(_) => StatusCode::BAD_GATEWAY,
                    AnalysisError::DataUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
                };
                (status, source.kind(), Some(symbol.clone()))
            }
            AppError::Anyhow(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", None),
        };

        let body = Json(json!({
            "error": self.to_string(),
            "kind": kind,
            "symbol": symbol,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
