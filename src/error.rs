//! Error types for transfer execution.
//!
//! Every failure surfaces as exactly one [`TransferError`] from
//! `load_request`: engine status errors tagged with the status family that
//! produced them, caller-initiated cancellation as its own recognizable
//! variant, and configuration problems caught before any I/O happens.
//! Protocol-level non-success statuses (an HTTP 404, say) are deliberately
//! *not* errors; they reach the observer as response metadata and the
//! decision to treat them as fatal stays with the caller.

use std::fmt;

use thiserror::Error;

/// Status family that produced an engine error, mirroring libcurl's three
/// code spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDomain {
    /// Per-transfer status codes (`CURLcode`).
    Easy,
    /// Multi-transfer-manager status codes (`CURLMcode`).
    Multi,
    /// Shared-resource status codes (`CURLSHcode`).
    Share,
}

impl fmt::Display for ErrorDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Easy => "curl",
            Self::Multi => "curl-multi",
            Self::Share => "curl-share",
        })
    }
}

/// Errors surfaced by a transfer.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The transfer was aborted by a cancellation request. Reported for
    /// cancellations observed at any callback boundary, including before
    /// the first byte moved.
    #[error("transfer cancelled")]
    Cancelled {
        /// The URL the cancelled transfer was addressing.
        url: Option<String>,
    },

    /// The engine reported a non-success status.
    #[error("{domain} error {code}: {message}")]
    Engine {
        /// Which status family the code belongs to.
        domain: ErrorDomain,
        /// Raw numeric status code.
        code: i32,
        /// Captured diagnostic text when the engine supplied any, else the
        /// generic description of the code.
        message: String,
        /// HTTP/FTP response status code when one was received.
        response_code: Option<u32>,
        /// The failing URL.
        url: Option<String>,
    },

    /// The request could not be translated into engine options.
    #[error("invalid request: {reason}")]
    InvalidRequest {
        /// What made the request untranslatable.
        reason: String,
        /// The offending URL when one was supplied.
        url: Option<String>,
    },
}

impl TransferError {
    /// Creates a configuration error for the given request URL.
    pub(crate) fn invalid(reason: impl Into<String>, url: Option<&str>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
            url: url.map(str::to_owned),
        }
    }

    /// Maps a failed `perform` into a structured error.
    ///
    /// The cancellation flag wins over the engine status: a callback that
    /// short-circuited the transfer shows up as a write/abort code, and
    /// `CURLE_ABORTED_BY_CALLBACK` from the progress checkpoint likewise
    /// means the caller asked for it.
    pub(crate) fn from_perform(
        err: &curl::Error,
        cancelled: bool,
        diagnostic: Option<String>,
        response_code: Option<u32>,
        url: &str,
    ) -> Self {
        if cancelled || err.is_aborted_by_callback() {
            return Self::Cancelled {
                url: Some(url.to_owned()),
            };
        }
        let message = diagnostic
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| err.description().to_owned());
        Self::Engine {
            domain: ErrorDomain::Easy,
            code: err.code() as i32,
            message,
            response_code,
            url: Some(url.to_owned()),
        }
    }

    /// Maps an engine error raised while applying options, before the
    /// transfer started.
    pub(crate) fn from_curl(err: &curl::Error, url: Option<&str>) -> Self {
        Self::Engine {
            domain: ErrorDomain::Easy,
            code: err.code() as i32,
            message: err.description().to_owned(),
            response_code: None,
            url: url.map(str::to_owned),
        }
    }

    /// True when this is a cancellation outcome.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Status family for engine errors.
    #[must_use]
    pub fn domain(&self) -> Option<ErrorDomain> {
        match self {
            Self::Engine { domain, .. } => Some(*domain),
            _ => None,
        }
    }

    /// Raw engine status code, when this is an engine error.
    #[must_use]
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Engine { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Protocol response status attached to the failure, when available.
    #[must_use]
    pub fn response_code(&self) -> Option<u32> {
        match self {
            Self::Engine { response_code, .. } => *response_code,
            _ => None,
        }
    }

    /// The failing URL, when one is attached.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Cancelled { url }
            | Self::Engine { url, .. }
            | Self::InvalidRequest { url, .. } => url.as_deref(),
        }
    }
}

impl From<curl::MultiError> for TransferError {
    fn from(err: curl::MultiError) -> Self {
        Self::Engine {
            domain: ErrorDomain::Multi,
            code: err.code() as i32,
            message: err.to_string(),
            response_code: None,
            url: None,
        }
    }
}

impl From<curl::ShareError> for TransferError {
    fn from(err: curl::ShareError) -> Self {
        Self::Engine {
            domain: ErrorDomain::Share,
            code: err.code() as i32,
            message: err.to_string(),
            response_code: None,
            url: None,
        }
    }
}
