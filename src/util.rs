pub(crate) fn find_crlf(b: &[u8]) -> Option<usize> {
    let cr = b.iter().position(|c| *c == b'\r')?;
    let maybe_lf = b.get(cr + 1)?;
    if *maybe_lf == b'\n' {
        Some(cr)
    } else {
        None
    }
}

/// Remove the next `\n`-terminated line from the front of `buf`.
///
/// The returned line excludes the newline. Bytes that are not valid UTF-8
/// are decoded lossily.
pub(crate) fn split_line(buf: &mut Vec<u8>) -> Option<String> {
    let pos = buf.iter().position(|c| *c == b'\n')?;
    let line = String::from_utf8_lossy(&buf[..pos]).into_owned();
    buf.drain(..=pos);
    Some(line)
}
