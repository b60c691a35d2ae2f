use crate::Error;

/// Max number of headers to parse from a response head.
const MAX_RESPONSE_HEADERS: usize = 128;

const HEADER_END: &[u8] = b"\r\n\r\n";

/// Position of the header/body separator, if the buffer holds one.
pub(crate) fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(HEADER_END.len()).position(|w| w == HEADER_END)
}

/// Parse a complete response head (including the terminating blank line)
/// and decide the body framing.
///
/// The head is inspected only to detect chunked transfer encoding. The
/// status code is logged and otherwise ignored; the watch protocol does
/// not act on it.
pub(crate) fn is_chunked(head: &[u8]) -> Result<bool, Error> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_RESPONSE_HEADERS];
    let mut response = httparse::Response::new(&mut headers);

    response.parse(head)?;

    if let Some(code) = response.code {
        debug!("response head: status {}", code);
    }

    let chunked = headers
        .iter()
        .take_while(|h| !h.name.is_empty())
        .filter(|h| h.name.eq_ignore_ascii_case("transfer-encoding"))
        .filter_map(|h| core::str::from_utf8(h.value).ok())
        // Header can list several codings, look for the "chunked" token.
        .any(|v| v.split(',').any(|t| t.trim().eq_ignore_ascii_case("chunked")));

    Ok(chunked)
}
