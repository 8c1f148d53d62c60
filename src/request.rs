//! Request data model for transfers.
//!
//! A [`Request`] is an immutable description of one transfer: target URL,
//! method, wire headers (key-unique, insertion order preserved), an optional
//! body source, and protocol options for TLS, proxying and FTP-specific
//! behavior. The handle never mutates a request; translating it into engine
//! options happens separately and without I/O.

use std::fmt;
use std::io::Read;

/// HTTP method, or the protocol-equivalent operation for non-HTTP schemes.
///
/// `Head` suppresses response-body transfer regardless of protocol (handy
/// for FTP), and `Put` enables upload mode regardless of protocol (again
/// handy for FTP uploads).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Method {
    /// Plain retrieval; the engine default.
    #[default]
    Get,
    /// Fetch response metadata only, no body.
    Head,
    /// Upload the request body to the target.
    Put,
    /// HTTP POST.
    Post,
    /// HTTP DELETE, sent as a custom request string.
    Delete,
    /// Any other method string, sent verbatim on the wire.
    Custom(String),
}

impl Method {
    /// Returns the wire representation of the method.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Delete => "DELETE",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body source for upload transfers.
///
/// Either in-memory bytes or a readable stream pulled chunk by chunk while
/// the transfer runs. A stream is consumed by exactly one transfer.
pub enum Body {
    /// Complete body held in memory.
    Bytes(Vec<u8>),
    /// Streamed body, read on demand from the executing transfer.
    Reader {
        /// The byte stream to upload.
        reader: Box<dyn Read + Send>,
        /// Total length when known; forwarded to the engine so it can send
        /// a Content-Length instead of chunked encoding.
        len: Option<u64>,
    },
}

impl Body {
    /// Creates an in-memory body.
    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(data.into())
    }

    /// Creates a streamed body with an optional known length.
    pub fn reader(reader: impl Read + Send + 'static, len: Option<u64>) -> Self {
        Self::Reader {
            reader: Box::new(reader),
            len,
        }
    }

    /// Returns the body length when known up front.
    #[must_use]
    pub fn len(&self) -> Option<u64> {
        match self {
            Self::Bytes(data) => Some(data.len() as u64),
            Self::Reader { len, .. } => *len,
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(data) => f.debug_tuple("Bytes").field(&data.len()).finish(),
            Self::Reader { len, .. } => f.debug_struct("Reader").field("len", len).finish(),
        }
    }
}

/// Desired TLS usage level for protocols where TLS is negotiated in-band
/// (FTP over explicit TLS). Maps onto libcurl's `CURLUSESSL_*` levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SslLevel {
    /// Do not attempt TLS; the engine default.
    #[default]
    None,
    /// Try TLS, fall back to plain if the server refuses.
    Try,
    /// Require TLS for the control connection.
    Control,
    /// Require TLS for control and data connections.
    All,
}

/// Proxy protocol spoken to the proxy server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProxyKind {
    /// Plain HTTP proxy (CONNECT for tunneled schemes).
    #[default]
    Http,
    /// SOCKS4 proxy.
    Socks4,
    /// SOCKS5 proxy.
    Socks5,
}

/// Proxy descriptor attached to a request.
///
/// Credentials are not part of the descriptor; they come from
/// [`HandleConfig`](crate::HandleConfig) so one credential set can serve
/// every handle built from the same configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proxy {
    /// Proxy host, either bare (`proxy.example.com`) or a proxy URL.
    pub url: String,
    /// Explicit proxy port; the protocol default applies when absent.
    pub port: Option<u16>,
    /// Protocol spoken to the proxy.
    pub kind: ProxyKind,
}

impl Proxy {
    /// Creates an HTTP proxy descriptor for the given host.
    pub fn http(url: impl Into<String>, port: Option<u16>) -> Self {
        Self {
            url: url.into(),
            port,
            kind: ProxyKind::Http,
        }
    }
}

/// Immutable description of one transfer.
///
/// Built by the caller, handed to
/// [`TransferHandle::load_request`](crate::TransferHandle::load_request).
/// Headers keep insertion order for wire formatting and keys stay unique:
/// setting a header that already exists replaces its value in place.
#[derive(Debug)]
pub struct Request {
    pub(crate) url: String,
    pub(crate) method: Method,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Option<Body>,
    pub(crate) ssl_level: SslLevel,
    pub(crate) verify_peer: bool,
    pub(crate) proxy: Option<Proxy>,
    pub(crate) create_intermediate_dirs: u32,
    pub(crate) post_transfer_commands: Vec<String>,
}

impl Request {
    /// Creates a request with default protocol options: peer verification
    /// on, no TLS level preference, no proxy, no FTP extras.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            headers: Vec::new(),
            body: None,
            ssl_level: SslLevel::default(),
            verify_peer: true,
            proxy: None,
            create_intermediate_dirs: 0,
            post_transfer_commands: Vec::new(),
        }
    }

    /// Creates a GET request for the given URL.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    /// Returns the target URL as supplied by the caller.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Sets a header, replacing any existing value for the same key.
    ///
    /// Key comparison is ASCII case-insensitive; the replacement keeps the
    /// original position so wire ordering stays stable.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self
            .headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            slot.1 = value;
        } else {
            self.headers.push((name, value));
        }
        self
    }

    /// Returns the value of a header, matched ASCII case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Iterates headers in insertion order.
    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Attaches a body; its presence switches the transfer into upload mode
    /// regardless of the method.
    pub fn set_body(&mut self, body: Body) -> &mut Self {
        self.body = Some(body);
        self
    }

    /// Returns true when the request carries a body source.
    #[must_use]
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// Sets the desired TLS usage level (`CURLOPT_USE_SSL`).
    pub fn set_ssl_level(&mut self, level: SslLevel) -> &mut Self {
        self.ssl_level = level;
        self
    }

    /// Enables or disables peer certificate verification
    /// (`CURLOPT_SSL_VERIFYPEER`). On by default.
    pub fn set_verify_peer(&mut self, verify: bool) -> &mut Self {
        self.verify_peer = verify;
        self
    }

    /// Routes the transfer through the given proxy, subject to the handle's
    /// proxy allowance.
    pub fn set_proxy(&mut self, proxy: Proxy) -> &mut Self {
        self.proxy = Some(proxy);
        self
    }

    /// A value greater than 0 makes the engine create missing remote
    /// directories when uploading (`CURLOPT_FTP_CREATE_MISSING_DIRS`).
    pub fn set_create_intermediate_dirs(&mut self, depth: u32) -> &mut Self {
        self.create_intermediate_dirs = depth;
        self
    }

    /// Commands executed in order on the control connection once the main
    /// transfer is done (`CURLOPT_POSTQUOTE`).
    pub fn set_post_transfer_commands(&mut self, commands: Vec<String>) -> &mut Self {
        self.post_transfer_commands = commands;
        self
    }

    pub(crate) fn take_body(&mut self) -> Option<Body> {
        self.body.take()
    }
}
