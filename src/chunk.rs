use core::str;

use crate::util::find_crlf;

/// Incremental decoder for chunked transfer encoding.
///
/// Runs to a fixed point on every delivery and is resumable across
/// arbitrary partial deliveries: it consumes what it can and leaves the
/// rest for the next call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dechunker {
    /// Waiting for a `<hex-size>\r\n` line.
    Size,
    /// Waiting for the chunk payload plus its trailing CRLF.
    Data(usize),
    /// Saw the zero-size chunk. Nothing after it is touched.
    Ended,
}

impl Dechunker {
    pub fn new() -> Self {
        Dechunker::Size
    }

    /// Consume as much of `src` as possible, appending decoded payload
    /// bytes to `out`. Returns how many bytes of `src` were used.
    pub fn parse_input(&mut self, src: &[u8], out: &mut Vec<u8>) -> usize {
        let mut index_in = 0;

        loop {
            let more = match self {
                Dechunker::Size => self.read_size(src, &mut index_in),
                Dechunker::Data(_) => self.read_data(src, out, &mut index_in),
                Dechunker::Ended => false,
            };

            if !more {
                break;
            }
        }

        index_in
    }

    pub fn is_ended(&self) -> bool {
        matches!(self, Self::Ended)
    }

    fn read_size(&mut self, src: &[u8], index_in: &mut usize) -> bool {
        let src = &src[*index_in..];

        let i = match find_crlf(src) {
            Some(v) => v,
            None => return false,
        };

        // Chunk extensions after ";" are discarded.
        let len_end = src[..i].iter().position(|c| *c == b';').unwrap_or(i);

        let len = match str::from_utf8(&src[..len_end])
            .ok()
            .and_then(|s| usize::from_str_radix(s.trim(), 16).ok())
        {
            Some(v) => v,
            None => {
                // An unparseable size line stalls the decoder rather than
                // erroring; at this layer it is indistinguishable from a
                // frame that has not finished arriving.
                debug!("unparseable chunk size line, stalling");
                return false;
            }
        };

        *index_in += i + 2;
        *self = if len == 0 {
            Self::Ended
        } else {
            Self::Data(len)
        };

        true
    }

    fn read_data(&mut self, src: &[u8], out: &mut Vec<u8>, index_in: &mut usize) -> bool {
        let src = &src[*index_in..];

        let left = match self {
            Self::Data(v) => *v,
            _ => unreachable!(),
        };

        // The payload and its trailing CRLF must both be buffered before
        // anything is extracted. A declared size near usize::MAX can
        // never be satisfied; treat it like any other incomplete frame.
        let needed = match left.checked_add(2) {
            Some(v) => v,
            None => return false,
        };
        if src.len() < needed {
            return false;
        }

        out.extend_from_slice(&src[..left]);
        *index_in += left + 2;
        *self = Self::Size;

        true
    }
}
