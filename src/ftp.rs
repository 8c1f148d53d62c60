//! FTP-class engine options the safe `curl` wrapper does not expose.
//!
//! These go through `curl_easy_setopt`/`curl_easy_getinfo` on the raw
//! handle. The post-transfer command list is the one place the engine
//! borrows caller memory for the whole transfer: libcurl keeps the
//! `curl_slist` pointer until `perform` returns, so [`PostQuoteList`] owns
//! the list and must outlive the call that consumes it.

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_long};
use std::ptr;

use curl::easy::{Easy2, Handler};
use tracing::trace;

use crate::error::TransferError;
use crate::request::SslLevel;

// Option and info keys from curl/curl.h, absent from curl-sys' safe surface.
const CURLOPT_FTP_CREATE_MISSING_DIRS: curl_sys::CURLoption = 110; // long
const CURLOPT_USE_SSL: curl_sys::CURLoption = 119; // long
const CURLOPT_POSTQUOTE: curl_sys::CURLoption = 10_000 + 39; // object pointer
const CURLINFO_FTP_ENTRY_PATH: curl_sys::CURLINFO = 0x0010_0000 + 30; // string

const CURLUSESSL_NONE: c_long = 0;
const CURLUSESSL_TRY: c_long = 1;
const CURLUSESSL_CONTROL: c_long = 2;
const CURLUSESSL_ALL: c_long = 3;

/// Owns the `curl_slist` registered as `CURLOPT_POSTQUOTE`.
///
/// Dropping the guard frees the list; keep it alive until `perform` has
/// returned on the handle it was applied to.
#[derive(Debug)]
pub(crate) struct PostQuoteList {
    raw: *mut curl_sys::curl_slist,
}

impl PostQuoteList {
    fn build(commands: &[String]) -> Result<Self, TransferError> {
        let mut raw: *mut curl_sys::curl_slist = ptr::null_mut();
        for command in commands {
            let Ok(text) = CString::new(command.as_str()) else {
                // Already rejected during translation; repeated here so the
                // raw path can never hand libcurl a truncated command.
                unsafe { curl_sys::curl_slist_free_all(raw) };
                return Err(TransferError::invalid(
                    "post-transfer command contains a NUL byte",
                    None,
                ));
            };
            // SAFETY: `text` is a valid NUL-terminated string; libcurl
            // copies it into the new list node.
            let appended = unsafe { curl_sys::curl_slist_append(raw, text.as_ptr()) };
            if appended.is_null() {
                unsafe { curl_sys::curl_slist_free_all(raw) };
                return Err(TransferError::invalid(
                    "failed to allocate post-transfer command list",
                    None,
                ));
            }
            raw = appended;
        }
        Ok(Self { raw })
    }
}

impl Drop for PostQuoteList {
    fn drop(&mut self) {
        if !self.raw.is_null() {
            // SAFETY: `raw` was produced by curl_slist_append and is freed
            // exactly once, after the transfer that borrowed it finished.
            unsafe { curl_sys::curl_slist_free_all(self.raw) };
        }
    }
}

fn check(rc: curl_sys::CURLcode) -> Result<(), TransferError> {
    if rc == curl_sys::CURLE_OK {
        Ok(())
    } else {
        Err(TransferError::from_curl(&curl::Error::new(rc), None))
    }
}

/// Applies the desired in-band TLS level (`CURLOPT_USE_SSL`).
/// [`SslLevel::None`] is the engine default.
pub(crate) fn set_use_ssl<H: Handler>(
    easy: &Easy2<H>,
    level: SslLevel,
) -> Result<(), TransferError> {
    let value = match level {
        SslLevel::None => CURLUSESSL_NONE,
        SslLevel::Try => CURLUSESSL_TRY,
        SslLevel::Control => CURLUSESSL_CONTROL,
        SslLevel::All => CURLUSESSL_ALL,
    };
    // SAFETY: long-typed option on a live easy handle.
    check(unsafe { curl_sys::curl_easy_setopt(easy.raw(), CURLOPT_USE_SSL, value) })
}

/// Asks the engine to create up to `depth` missing remote directories when
/// uploading. 0 is the engine default and sets nothing.
pub(crate) fn set_create_missing_dirs<H: Handler>(
    easy: &Easy2<H>,
    depth: u32,
) -> Result<(), TransferError> {
    if depth == 0 {
        return Ok(());
    }
    // SAFETY: long-typed option on a live easy handle.
    check(unsafe {
        curl_sys::curl_easy_setopt(easy.raw(), CURLOPT_FTP_CREATE_MISSING_DIRS, c_long::from(depth))
    })
}

/// Registers the post-transfer command list and returns the guard that
/// keeps it alive. Empty lists set nothing and return no guard.
pub(crate) fn set_post_transfer_commands<H: Handler>(
    easy: &Easy2<H>,
    commands: &[String],
) -> Result<Option<PostQuoteList>, TransferError> {
    if commands.is_empty() {
        return Ok(None);
    }
    let list = PostQuoteList::build(commands)?;
    // SAFETY: the slist stays valid until the returned guard drops, which
    // the execution controller arranges to happen after perform.
    check(unsafe { curl_sys::curl_easy_setopt(easy.raw(), CURLOPT_POSTQUOTE, list.raw) })?;
    trace!(commands = commands.len(), "registered post-transfer commands");
    Ok(Some(list))
}

/// Initial remote working directory reported by an FTP-class transfer
/// (`CURLINFO_FTP_ENTRY_PATH`). `None` for other protocols or before any
/// transfer completed.
pub(crate) fn entry_path<H: Handler>(easy: &Easy2<H>) -> Option<String> {
    let mut out: *const c_char = ptr::null();
    // SAFETY: string info read into a pointer slot; libcurl owns the
    // returned buffer, which we copy out of before the handle changes.
    let rc = unsafe {
        curl_sys::curl_easy_getinfo(
            easy.raw(),
            CURLINFO_FTP_ENTRY_PATH,
            &mut out as *mut *const c_char,
        )
    };
    if rc != curl_sys::CURLE_OK || out.is_null() {
        return None;
    }
    // SAFETY: non-null pointer from a successful string getinfo.
    let path = unsafe { CStr::from_ptr(out) }.to_string_lossy().into_owned();
    if path.is_empty() { None } else { Some(path) }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    struct NullHandler;
    impl Handler for NullHandler {}

    #[test]
    fn test_entry_path_absent_before_any_transfer() {
        let easy = Easy2::new(NullHandler);
        assert_eq!(entry_path(&easy), None);
    }

    #[test]
    fn test_use_ssl_levels_apply_cleanly() {
        let easy = Easy2::new(NullHandler);
        for level in [SslLevel::None, SslLevel::Try, SslLevel::Control, SslLevel::All] {
            set_use_ssl(&easy, level).unwrap();
        }
    }

    #[test]
    fn test_create_missing_dirs_applies_cleanly() {
        let easy = Easy2::new(NullHandler);
        set_create_missing_dirs(&easy, 0).unwrap();
        set_create_missing_dirs(&easy, 2).unwrap();
    }

    #[test]
    fn test_post_transfer_command_list_builds_and_frees() {
        let easy = Easy2::new(NullHandler);
        let guard =
            set_post_transfer_commands(&easy, &["SITE CHMOD 644 x".to_owned(), "DELE y".to_owned()])
                .unwrap();
        assert!(guard.is_some());
        assert!(set_post_transfer_commands(&easy, &[]).unwrap().is_none());
    }
}
