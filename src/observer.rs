//! Observer contract for in-flight transfer notifications.
//!
//! The executing transfer forwards received data, response metadata, upload
//! progress, and raw protocol traces to a [`TransferObserver`] in strict
//! arrival order. Only `on_data` is required; the remaining hooks default to
//! no-ops so observers implement just what they care about.

use crate::response::ResponseHead;

/// Classification of a raw protocol trace line, mirroring libcurl's
/// `curl_infotype`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugKind {
    /// Informational text from the engine.
    Text,
    /// Header data received from the peer.
    HeaderIn,
    /// Header data sent to the peer.
    HeaderOut,
    /// Protocol data received from the peer.
    DataIn,
    /// Protocol data sent to the peer.
    DataOut,
    /// TLS-layer data received.
    SslDataIn,
    /// TLS-layer data sent.
    SslDataOut,
}

/// Receiver for transfer events.
///
/// Implementations must return promptly: every hook runs synchronously on
/// the transfer's execution context, and time spent here stalls the engine.
/// Observers cross into that context, hence the `Send` bound.
pub trait TransferObserver: Send {
    /// A chunk of response body arrived. Chunks are delivered verbatim in
    /// the exact byte order produced by the engine.
    fn on_data(&mut self, data: &[u8]);

    /// A complete response header block was received and parsed. Fires
    /// before any `on_data` for the same transfer; interim blocks (HTTP
    /// 1xx) are delivered as they complete.
    fn on_response(&mut self, response: &ResponseHead) {
        let _ = response;
    }

    /// The next `len` bytes of the upload body are about to go out on the
    /// wire. A length of 0 fires exactly once, when the source is exhausted
    /// and the upload is about to complete.
    fn on_upload_chunk(&mut self, len: usize) {
        let _ = len;
    }

    /// Raw protocol trace from the engine. Must not block or panic.
    fn on_debug(&mut self, kind: DebugKind, text: &str) {
        let _ = (kind, text);
    }

    /// Whether the observer wants `on_debug` traffic. Verbose engine mode
    /// is only enabled when this returns true, keeping the trace path free
    /// for everyone else.
    fn wants_debug(&self) -> bool {
        false
    }
}

/// Observer that buffers everything in memory.
///
/// Convenient for small transfers and for tests: collects body bytes,
/// response heads, and upload progress notifications.
#[derive(Debug, Default)]
pub struct BufferObserver {
    /// Concatenated response body.
    pub data: Vec<u8>,
    /// Every response head received, in arrival order.
    pub responses: Vec<ResponseHead>,
    /// Every `on_upload_chunk` length, in arrival order.
    pub upload_chunks: Vec<usize>,
}

impl BufferObserver {
    /// Creates an empty buffer observer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Status code of the last response head, when one arrived.
    #[must_use]
    pub fn last_status(&self) -> Option<u16> {
        self.responses.last().map(ResponseHead::status)
    }
}

impl TransferObserver for BufferObserver {
    fn on_data(&mut self, data: &[u8]) {
        self.data.extend_from_slice(data);
    }

    fn on_response(&mut self, response: &ResponseHead) {
        self.responses.push(response.clone());
    }

    fn on_upload_chunk(&mut self, len: usize) {
        self.upload_chunks.push(len);
    }
}
