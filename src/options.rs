//! Option translation: one [`Request`] in, the flat engine option set out.
//!
//! Translation is pure — no I/O, no engine handle — so the method mapping,
//! special-cased headers, and protocol options are all testable in
//! isolation. The produced [`TransferOptions`] owns every string value for
//! the duration of the transfer that consumes it.

use url::Url;

use crate::error::TransferError;
use crate::handle::{HandleConfig, ProxyCredentials};
use crate::request::{Body, Method, Proxy, Request, SslLevel};

/// Flat set of engine options for one transfer.
///
/// String values live here, owned, until the configuration step hands them
/// to the engine right before `perform`.
#[derive(Debug)]
pub(crate) struct TransferOptions {
    pub url: String,
    /// Suppress response-body transfer (`CURLOPT_NOBODY`).
    pub nobody: bool,
    /// Upload mode with a read-callback body (`CURLOPT_UPLOAD`).
    pub upload: bool,
    /// HTTP POST mode (`CURLOPT_POST`), used for body-less POSTs.
    pub post: bool,
    /// Verbatim method string override (`CURLOPT_CUSTOMREQUEST`).
    pub custom_method: Option<String>,
    /// Wire header lines, `Name: value`, insertion order preserved.
    pub header_lines: Vec<String>,
    /// Byte-range option (`CURLOPT_RANGE`), lifted from a custom header.
    pub range: Option<String>,
    /// Content-decoding option (`CURLOPT_ACCEPT_ENCODING`), lifted from a
    /// custom header.
    pub accept_encoding: Option<String>,
    /// Upload size when known up front.
    pub upload_len: Option<u64>,
    pub verify_peer: bool,
    pub ssl_level: SslLevel,
    pub proxy: Option<Proxy>,
    pub proxy_credentials: Option<ProxyCredentials>,
    pub create_intermediate_dirs: u32,
    pub post_transfer_commands: Vec<String>,
    pub user_agent: Option<String>,
    /// Engine verbose mode; decided by the observer's debug appetite, not
    /// by the request.
    pub verbose: bool,
}

impl TransferOptions {
    /// Translates a request against the handle configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::InvalidRequest`] for an unparseable URL, an
    /// empty custom method, or a post-transfer command containing a NUL
    /// byte. Absent protocol options are engine defaults, never errors.
    pub fn from_request(
        request: &Request,
        config: &HandleConfig,
    ) -> Result<Self, TransferError> {
        let url = request.url();
        Url::parse(url)
            .map_err(|err| TransferError::invalid(format!("unparseable URL: {err}"), Some(url)))?;

        let mut nobody = false;
        let mut upload = false;
        let mut post = false;
        let mut custom_method = None;
        match request.method() {
            Method::Get => {}
            Method::Head => nobody = true,
            Method::Put => upload = true,
            Method::Post => post = true,
            Method::Delete => custom_method = Some("DELETE".to_owned()),
            Method::Custom(name) => {
                if name.trim().is_empty() {
                    return Err(TransferError::invalid("empty custom method", Some(url)));
                }
                custom_method = Some(name.clone());
            }
        }

        // Any body source switches the transfer into upload mode regardless
        // of method; POST keeps its wire method via a custom request string
        // so the engine does not fall back to PUT.
        let upload_len = if request.has_body() {
            upload = true;
            if post {
                post = false;
                custom_method.get_or_insert_with(|| "POST".to_owned());
            }
            request.body.as_ref().and_then(Body::len)
        } else {
            None
        };

        let mut header_lines = Vec::new();
        let mut range = None;
        let mut accept_encoding = None;
        for (name, value) in request.headers() {
            if name.eq_ignore_ascii_case("Range") {
                range = Some(value.to_owned());
            } else if name.eq_ignore_ascii_case("Accept-Encoding") {
                accept_encoding = Some(value.to_owned());
            } else {
                header_lines.push(format!("{name}: {value}"));
            }
        }

        for command in &request.post_transfer_commands {
            if command.contains('\0') {
                return Err(TransferError::invalid(
                    "post-transfer command contains a NUL byte",
                    Some(url),
                ));
            }
        }

        let proxy = if config.allows_proxy {
            request.proxy.clone()
        } else {
            None
        };
        let proxy_credentials = proxy
            .is_some()
            .then(|| config.proxy_credentials.clone())
            .flatten();

        Ok(Self {
            url: url.to_owned(),
            nobody,
            upload,
            post,
            custom_method,
            header_lines,
            range,
            accept_encoding,
            upload_len,
            verify_peer: request.verify_peer,
            ssl_level: request.ssl_level,
            proxy,
            proxy_credentials,
            create_intermediate_dirs: request.create_intermediate_dirs,
            post_transfer_commands: request.post_transfer_commands.clone(),
            user_agent: config.user_agent.clone(),
            verbose: false,
        })
    }
}
