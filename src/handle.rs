//! Transfer handle: the unit of execution.
//!
//! A [`TransferHandle`] runs one transfer at a time. `load_request`
//! translates the request, configures a fresh engine instance, runs
//! `perform` on a background thread and blocks until it finishes, then maps
//! the outcome into a single [`Result`]. Cancellation is cooperative: a
//! [`CancelToken`] sets a shared flag from any thread, and the next
//! callback boundary inside the engine observes it and aborts.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::{fmt, thread};

use curl::easy::Easy2;
use tracing::{debug, instrument, warn};

use crate::binding::{BodySource, Collector};
use crate::error::TransferError;
use crate::ftp;
use crate::observer::TransferObserver;
use crate::options::TransferOptions;
use crate::request::Request;

/// Credentials presented to proxies, shared by every transfer made through
/// handles built from the same configuration.
#[derive(Clone)]
pub struct ProxyCredentials {
    username: String,
    password: String,
}

impl ProxyCredentials {
    /// Creates a credential pair.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub(crate) fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for ProxyCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Handle-wide configuration.
///
/// Carries the concerns that used to live in process-wide state: proxy
/// credentials and the master proxy allowance. Passed at construction and
/// immutable for the handle's lifetime.
#[derive(Debug, Clone)]
pub struct HandleConfig {
    /// Credentials sent when a request routes through a proxy.
    pub proxy_credentials: Option<ProxyCredentials>,
    /// Master switch: when false, request proxy descriptors are ignored.
    pub allows_proxy: bool,
    /// User-Agent header for every transfer; engine default when absent.
    pub user_agent: Option<String>,
}

impl Default for HandleConfig {
    fn default() -> Self {
        Self {
            proxy_credentials: None,
            allows_proxy: true,
            user_agent: None,
        }
    }
}

/// Clonable cancellation token for a handle.
///
/// Settable from any thread at any time; cancellation takes effect at the
/// next callback boundary inside the running transfer, not instantaneously.
/// Setting it with no transfer in flight makes the *next* transfer abort at
/// its first checkpoint. Repeated calls are idempotent and never disturb a
/// result that has already been returned.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Requests cancellation. Does not block and does not wait for the
    /// transfer to notice.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation is currently requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// One transfer-execution handle.
///
/// Reusable: after `load_request` returns, the handle is idle and can run
/// the next request. At most one transfer executes per handle at a time,
/// which the `&mut self` receiver enforces statically.
#[derive(Debug, Default)]
pub struct TransferHandle {
    config: HandleConfig,
    cancel: CancelToken,
    executing: AtomicBool,
    initial_ftp_path: Option<String>,
}

impl TransferHandle {
    /// Creates a handle with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a handle with explicit configuration.
    #[must_use]
    pub fn with_config(config: HandleConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Returns a token that can cancel this handle's transfers from any
    /// thread.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Requests cancellation of the current (or next) transfer.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// True while a transfer is in flight on this handle.
    #[must_use]
    pub fn is_executing(&self) -> bool {
        self.executing.load(Ordering::SeqCst)
    }

    /// Initial remote working directory reported by the most recent
    /// successful FTP-class transfer.
    #[must_use]
    pub fn initial_ftp_path(&self) -> Option<&str> {
        self.initial_ftp_path.as_deref()
    }

    /// Executes one transfer to completion, blocking the calling thread.
    ///
    /// Received data, response metadata, upload progress and protocol
    /// traces stream to `observer` in arrival order while the transfer
    /// runs; by the time this returns, everything has been delivered.
    /// A pending cancellation (set before or during the call) surfaces as
    /// [`TransferError::Cancelled`] and is consumed, leaving the handle
    /// ready for reuse.
    ///
    /// # Errors
    ///
    /// - [`TransferError::InvalidRequest`] when the request cannot be
    ///   translated into engine options; nothing was sent.
    /// - [`TransferError::Cancelled`] when a cancellation request was
    ///   observed at a callback boundary.
    /// - [`TransferError::Engine`] for every engine-reported failure, with
    ///   status family, code, diagnostic text, the failing URL, and the
    ///   protocol response code when one was received. Protocol-level
    ///   non-success statuses (e.g. HTTP 404) alone are *not* failures;
    ///   they reach the observer via its response hook.
    #[instrument(
        level = "debug",
        skip(self, request, observer),
        fields(url = %request.url(), method = %request.method())
    )]
    pub fn load_request(
        &mut self,
        request: Request,
        observer: &mut dyn TransferObserver,
    ) -> Result<(), TransferError> {
        let result = self.execute(request, observer);
        // Consume any cancellation request, whatever the outcome, so the
        // handle is reusable.
        self.cancel.flag.store(false, Ordering::SeqCst);
        result
    }

    fn execute(
        &mut self,
        request: Request,
        observer: &mut dyn TransferObserver,
    ) -> Result<(), TransferError> {
        let mut opts = TransferOptions::from_request(&request, &self.config)?;
        opts.verbose = observer.wants_debug();

        self.executing.store(true, Ordering::SeqCst);
        let result = self.run_transfer(request, &opts, observer);
        self.executing.store(false, Ordering::SeqCst);
        result
    }

    fn run_transfer(
        &mut self,
        mut request: Request,
        opts: &TransferOptions,
        observer: &mut dyn TransferObserver,
    ) -> Result<(), TransferError> {
        let body = request.take_body().map(BodySource::from);
        let collector = Collector::new(observer, Arc::clone(&self.cancel.flag), body);
        let mut easy = Easy2::new(collector);

        // The guard owns the post-transfer command list the engine borrows;
        // it drops only after perform has returned.
        let quote_guard = crate::binding::configure(&mut easy, opts)?;

        debug!("starting transfer");
        let (mut easy, outcome) = run_on_background_thread(easy);
        drop(quote_guard);

        match outcome {
            Ok(()) => {
                self.initial_ftp_path = ftp::entry_path(&easy);
                debug!(ftp_entry_path = ?self.initial_ftp_path, "transfer complete");
                Ok(())
            }
            Err(err) => {
                let cancelled = self.cancel.flag.load(Ordering::SeqCst);
                let diagnostic = easy.take_error_buf();
                let response_code = easy.response_code().ok().filter(|&code| code != 0);
                let mapped =
                    TransferError::from_perform(&err, cancelled, diagnostic, response_code, &opts.url);
                if mapped.is_cancelled() {
                    debug!("transfer cancelled");
                } else {
                    warn!(error = %mapped, "transfer failed");
                }
                Err(mapped)
            }
        }
    }
}

/// Runs `perform` on a dedicated background thread and blocks until it
/// finishes. The scope guarantees the join, so borrows inside the collector
/// (the observer, the upload stream) stay valid for exactly the duration of
/// the transfer.
fn run_on_background_thread<H>(easy: Easy2<H>) -> (Easy2<H>, Result<(), curl::Error>)
where
    H: curl::easy::Handler + Send,
{
    thread::scope(|scope| {
        let worker = scope.spawn(move || {
            let outcome = easy.perform();
            (easy, outcome)
        });
        match worker.join() {
            Ok(pair) => pair,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    })
}
