//! Output file naming derived from the encoded URI.

use crate::error::{CardError, Result};

/// The two trailing path segments of a payload URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadSegments<'a> {
    pub venue: &'a str,
    pub table: &'a str,
}

/// Take the last two `/`-separated segments of `payload`.
///
/// Scheme and host are irrelevant; `"a/b"` works as well as a full URL.
/// Empty segments (e.g. from a trailing slash) are returned as-is.
pub fn split_payload(payload: &str) -> Result<PayloadSegments<'_>> {
    let mut parts = payload.rsplit('/');
    match (parts.next(), parts.next()) {
        (Some(table), Some(venue)) => Ok(PayloadSegments { venue, table }),
        _ => Err(CardError::MalformedPayload {
            payload: payload.to_string(),
        }),
    }
}

/// Name of the final image: `qr-code-<venue>-<table>.png`.
///
/// Segments are not escaped. Since they never contain `/`, the name is a
/// single path component on Unix, but it is still an opaque identifier.
pub fn result_file_name(payload: &str) -> Result<String> {
    let PayloadSegments { venue, table } = split_payload(payload)?;
    Ok(format!("qr-code-{venue}-{table}.png"))
}
