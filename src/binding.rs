//! Engine binding: callback collector and option application.
//!
//! One [`Collector`] is handed to one `Easy2` for one transfer. Every
//! callback consults the shared cancellation flag first and short-circuits
//! the engine when it is set: the write callback by consuming fewer bytes
//! than offered, the header callback by returning false, the read callback
//! by aborting, and the progress callback by vetoing continuation. Whatever
//! code the engine then reports, the error mapper turns a set flag into a
//! cancellation outcome.

use std::io::{Cursor, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use curl::easy::{Easy2, Handler, InfoType, List, ProxyType, ReadError, WriteError};
use tracing::{trace, warn};

use crate::error::TransferError;
use crate::ftp;
use crate::observer::{DebugKind, TransferObserver};
use crate::options::TransferOptions;
use crate::request::{Body, ProxyKind};
use crate::response::HeaderAccumulator;

/// Unified upload source: in-memory bytes or a caller stream.
pub(crate) enum BodySource {
    Bytes(Cursor<Vec<u8>>),
    Reader(Box<dyn Read + Send>),
}

impl From<Body> for BodySource {
    fn from(body: Body) -> Self {
        match body {
            Body::Bytes(data) => Self::Bytes(Cursor::new(data)),
            Body::Reader { reader, .. } => Self::Reader(reader),
        }
    }
}

impl BodySource {
    /// Reads the next chunk, retrying transient interruptions: an
    /// `Interrupted` stream error is not a failed upload.
    fn read_chunk(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        loop {
            let result = match self {
                Self::Bytes(cursor) => cursor.read(buf),
                Self::Reader(reader) => reader.read(buf),
            };
            match result {
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => {}
                other => return other,
            }
        }
    }
}

/// Per-transfer callback state, borrowed pieces included: the observer
/// belongs to the caller and outlives the transfer.
pub(crate) struct Collector<'obs> {
    observer: &'obs mut dyn TransferObserver,
    cancelled: Arc<AtomicBool>,
    headers: HeaderAccumulator,
    body: Option<BodySource>,
    upload_done_notified: bool,
    forward_debug: bool,
}

impl<'obs> Collector<'obs> {
    pub(crate) fn new(
        observer: &'obs mut dyn TransferObserver,
        cancelled: Arc<AtomicBool>,
        body: Option<BodySource>,
    ) -> Self {
        let forward_debug = observer.wants_debug();
        Self {
            observer,
            cancelled,
            headers: HeaderAccumulator::new(),
            body,
            upload_done_notified: false,
            forward_debug,
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn notify_upload_done(&mut self) {
        if !self.upload_done_notified {
            self.upload_done_notified = true;
            self.observer.on_upload_chunk(0);
        }
    }
}

impl Handler for Collector<'_> {
    fn write(&mut self, data: &[u8]) -> Result<usize, WriteError> {
        if self.is_cancelled() {
            trace!("write callback observed cancellation");
            return Ok(0);
        }
        self.observer.on_data(data);
        Ok(data.len())
    }

    fn header(&mut self, data: &[u8]) -> bool {
        if self.is_cancelled() {
            trace!("header callback observed cancellation");
            return false;
        }
        if let Some(head) = self.headers.push_line(data) {
            trace!(status = head.status(), "received response head");
            self.observer.on_response(&head);
        }
        true
    }

    fn read(&mut self, data: &mut [u8]) -> Result<usize, ReadError> {
        if self.is_cancelled() {
            trace!("read callback observed cancellation");
            return Err(ReadError::Abort);
        }
        let Some(source) = self.body.as_mut() else {
            self.notify_upload_done();
            return Ok(0);
        };
        match source.read_chunk(data) {
            Ok(0) => {
                self.notify_upload_done();
                Ok(0)
            }
            Ok(n) => {
                // Heads-up goes out before the engine writes the chunk.
                self.observer.on_upload_chunk(n);
                Ok(n)
            }
            Err(err) => {
                warn!(error = %err, "upload source read failed");
                Err(ReadError::Abort)
            }
        }
    }

    fn progress(&mut self, _dltotal: f64, _dlnow: f64, _ultotal: f64, _ulnow: f64) -> bool {
        !self.is_cancelled()
    }

    fn debug(&mut self, kind: InfoType, data: &[u8]) {
        if !self.forward_debug {
            return;
        }
        let text = String::from_utf8_lossy(data);
        self.observer.on_debug(debug_kind(&kind), &text);
    }
}

fn debug_kind(kind: &InfoType) -> DebugKind {
    match kind {
        InfoType::HeaderIn => DebugKind::HeaderIn,
        InfoType::HeaderOut => DebugKind::HeaderOut,
        InfoType::DataIn => DebugKind::DataIn,
        InfoType::DataOut => DebugKind::DataOut,
        InfoType::SslDataIn => DebugKind::SslDataIn,
        InfoType::SslDataOut => DebugKind::SslDataOut,
        _ => DebugKind::Text,
    }
}

/// Applies translated options onto the engine handle.
///
/// Returns the post-transfer command guard, which must stay alive until
/// `perform` has returned.
pub(crate) fn configure<H: Handler>(
    easy: &mut Easy2<H>,
    opts: &TransferOptions,
) -> Result<Option<ftp::PostQuoteList>, TransferError> {
    apply_engine_options(easy, opts)
        .map_err(|err| TransferError::from_curl(&err, Some(&opts.url)))?;
    ftp::set_use_ssl(easy, opts.ssl_level)?;
    ftp::set_create_missing_dirs(easy, opts.create_intermediate_dirs)?;
    ftp::set_post_transfer_commands(easy, &opts.post_transfer_commands)
}

fn apply_engine_options<H: Handler>(
    easy: &mut Easy2<H>,
    opts: &TransferOptions,
) -> Result<(), curl::Error> {
    easy.url(&opts.url)?;
    // Timeouts rely on the progress checkpoint, not signals; signals and
    // threads do not mix.
    easy.signal(false)?;
    easy.progress(true)?;
    easy.verbose(opts.verbose)?;
    easy.follow_location(true)?;

    if let Some(agent) = &opts.user_agent {
        easy.useragent(agent)?;
    }
    if opts.nobody {
        easy.nobody(true)?;
    }
    if opts.upload {
        easy.upload(true)?;
    }
    if opts.post {
        easy.post(true)?;
    }
    if let Some(method) = &opts.custom_method {
        easy.custom_request(method)?;
    }
    if let Some(range) = &opts.range {
        easy.range(range)?;
    }
    if let Some(encoding) = &opts.accept_encoding {
        easy.accept_encoding(encoding)?;
    }
    if let Some(len) = opts.upload_len {
        easy.in_filesize(len)?;
    }
    if !opts.header_lines.is_empty() {
        let mut list = List::new();
        for line in &opts.header_lines {
            list.append(line)?;
        }
        easy.http_headers(list)?;
    }

    easy.ssl_verify_peer(opts.verify_peer)?;

    if let Some(proxy) = &opts.proxy {
        easy.proxy(&proxy.url)?;
        if let Some(port) = proxy.port {
            easy.proxy_port(port)?;
        }
        easy.proxy_type(match proxy.kind {
            ProxyKind::Http => ProxyType::Http,
            ProxyKind::Socks4 => ProxyType::Socks4,
            ProxyKind::Socks5 => ProxyType::Socks5,
        })?;
        if let Some(credentials) = &opts.proxy_credentials {
            easy.proxy_username(credentials.username())?;
            easy.proxy_password(credentials.password())?;
        }
    }

    Ok(())
}
