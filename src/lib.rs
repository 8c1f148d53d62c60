//! Observer-driven transfer handles on top of libcurl.
//!
//! This library turns a declarative [`Request`] (URL, method, headers, body
//! source, protocol options) into an executed network transfer against
//! HTTP/FTP-family protocols. Results stream incrementally to a
//! [`TransferObserver`] while the transfer runs, and a [`CancelToken`] can
//! abort it from any thread.
//!
//! # Architecture
//!
//! - [`request`] - immutable transfer descriptions and protocol options
//! - [`observer`] - the callback contract for in-flight notifications
//! - [`response`] - response metadata parsed from received header blocks
//! - [`handle`] - the execution controller: one blocking transfer at a
//!   time per handle, cooperative cross-thread cancellation
//! - [`error`] - structured errors with status family, code, and context
//!
//! The engine (libcurl via the `curl` crate) runs each transfer on a
//! background thread while `load_request` blocks the caller; callbacks fire
//! sequentially on that thread, each one checking the cancellation flag
//! before doing work.
//!
//! # Example
//!
//! ```no_run
//! use curl_transfer::{BufferObserver, Request, TransferHandle};
//!
//! # fn example() -> Result<(), curl_transfer::TransferError> {
//! let mut handle = TransferHandle::new();
//! let mut observer = BufferObserver::new();
//! handle.load_request(Request::get("https://example.com/"), &mut observer)?;
//! println!("{} bytes, status {:?}", observer.data.len(), observer.last_status());
//! # Ok(())
//! # }
//! ```

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod binding;
pub mod error;
mod ftp;
pub mod handle;
pub mod observer;
mod options;
pub mod request;
pub mod response;

pub use error::{ErrorDomain, TransferError};
pub use handle::{CancelToken, HandleConfig, ProxyCredentials, TransferHandle};
pub use observer::{BufferObserver, DebugKind, TransferObserver};
pub use request::{Body, Method, Proxy, ProxyKind, Request, SslLevel};
pub use response::ResponseHead;

/// Version string of the underlying transfer engine, e.g. `8.5.0`.
#[must_use]
pub fn version() -> String {
    curl::Version::get().version().to_string()
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_version_reports_engine_version() {
        let version = super::version();
        assert!(version.contains('.'), "unexpected version string: {version}");
    }
}
