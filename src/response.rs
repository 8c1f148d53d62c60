//! Response metadata and header-block accumulation.
//!
//! The engine delivers headers one line at a time. Lines are appended to an
//! accumulation buffer until the blank line that ends a header block, at
//! which point the block is parsed into a [`ResponseHead`] and the buffer is
//! cleared for the next block (redirect hops and HTTP 1xx interim responses
//! produce several blocks per transfer).

use tracing::trace;

/// Parsed response metadata: status code plus the header mapping, with
/// arrival order preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    status: u16,
    reason: String,
    headers: Vec<(String, String)>,
}

impl ResponseHead {
    /// Protocol status code (HTTP status line or FTP reply code).
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Reason phrase from the status line; may be empty.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Headers in arrival order.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Looks up a header value, matched ASCII case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// True for interim 1xx responses (e.g. `100 Continue`).
    #[must_use]
    pub fn is_informational(&self) -> bool {
        (100..200).contains(&self.status)
    }
}

/// Accumulates header lines until a block boundary, then parses the block.
#[derive(Debug, Default)]
pub(crate) struct HeaderAccumulator {
    buf: Vec<u8>,
}

impl HeaderAccumulator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Feeds one header line as delivered by the engine.
    ///
    /// Returns the parsed head when `line` is the blank line closing a
    /// block. Blocks whose first line is not a recognizable status line
    /// (seen on some FTP servers) are dropped with a trace entry.
    pub(crate) fn push_line(&mut self, line: &[u8]) -> Option<ResponseHead> {
        if line == b"\r\n" || line == b"\n" {
            let block = std::mem::take(&mut self.buf);
            let head = parse_block(&block);
            if head.is_none() && !block.is_empty() {
                trace!(
                    len = block.len(),
                    "discarding header block without status line"
                );
            }
            return head;
        }
        self.buf.extend_from_slice(line);
        None
    }
}

fn parse_block(block: &[u8]) -> Option<ResponseHead> {
    let text = String::from_utf8_lossy(block);
    let mut lines = text.lines();
    let status_line = lines.next()?;
    let (status, reason) = parse_status_line(status_line)?;

    let mut headers = Vec::new();
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        headers.push((name.trim().to_owned(), value.trim().to_owned()));
    }

    Some(ResponseHead {
        status,
        reason,
        headers,
    })
}

/// Parses `HTTP/1.1 200 OK` (any `HTTP/x` version token) into code and
/// reason phrase.
fn parse_status_line(line: &str) -> Option<(u16, String)> {
    let mut parts = line.splitn(3, ' ');
    let version = parts.next()?;
    if !version.starts_with("HTTP/") {
        return None;
    }
    let status = parts.next()?.parse::<u16>().ok()?;
    let reason = parts.next().unwrap_or("").trim().to_owned();
    Some((status, reason))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn feed(acc: &mut HeaderAccumulator, lines: &[&str]) -> Option<ResponseHead> {
        let mut head = None;
        for line in lines {
            head = acc.push_line(line.as_bytes());
        }
        head
    }

    #[test]
    fn test_block_parses_status_and_ordered_headers() {
        let mut acc = HeaderAccumulator::new();
        let head = feed(
            &mut acc,
            &[
                "HTTP/1.1 200 OK\r\n",
                "Content-Type: text/plain\r\n",
                "X-Custom: a\r\n",
                "\r\n",
            ],
        )
        .unwrap();

        assert_eq!(head.status(), 200);
        assert_eq!(head.reason(), "OK");
        assert_eq!(head.header("content-type"), Some("text/plain"));
        assert_eq!(head.headers()[1].0, "X-Custom");
    }

    #[test]
    fn test_no_head_before_block_boundary() {
        let mut acc = HeaderAccumulator::new();
        assert!(acc.push_line(b"HTTP/1.1 200 OK\r\n").is_none());
        assert!(acc.push_line(b"Content-Length: 3\r\n").is_none());
    }

    #[test]
    fn test_interim_block_then_final_block() {
        let mut acc = HeaderAccumulator::new();
        let interim = feed(&mut acc, &["HTTP/1.1 100 Continue\r\n", "\r\n"]).unwrap();
        assert!(interim.is_informational());

        let fin = feed(
            &mut acc,
            &["HTTP/1.1 201 Created\r\n", "Location: /x\r\n", "\r\n"],
        )
        .unwrap();
        assert_eq!(fin.status(), 201);
        assert_eq!(fin.header("Location"), Some("/x"));
    }

    #[test]
    fn test_non_http_status_line_yields_no_head() {
        let mut acc = HeaderAccumulator::new();
        let head = feed(&mut acc, &["150 Opening BINARY mode data connection\r\n", "\r\n"]);
        assert!(head.is_none(), "FTP-style reply lines are not response heads");
    }

    #[test]
    fn test_status_line_without_reason_phrase() {
        let (status, reason) = parse_status_line("HTTP/2 304").unwrap();
        assert_eq!(status, 304);
        assert!(reason.is_empty());
    }

}
