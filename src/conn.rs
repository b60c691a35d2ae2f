use crate::chunk::Dechunker;
use crate::framer::{find_header_end, is_chunked};
use crate::util::split_line;
use crate::Error;

/// Terminal outcome of a watch connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome<T> {
    /// The line handler returned a value, ending the stream.
    Terminal(T),
    /// The remote closed the stream cleanly before any terminal value.
    Ended,
}

#[derive(Debug)]
enum State {
    AwaitingHeaders,
    Identity,
    Chunked(Dechunker),
}

/// Sans-IO parsing core of a watch connection.
///
/// Feed inbound socket bytes with [`push_data`][Connection::push_data],
/// report a remote close with [`push_close`][Connection::push_close] and a
/// transport fault with [`push_error`][Connection::push_error]. The first
/// of: a terminal handler value, a remote close, or an error settles the
/// outcome. Settlement happens at most once; every push after it is a
/// no-op, and the caller is expected to close the socket the moment
/// [`take_outcome`][Connection::take_outcome] yields a value.
///
/// The line handler is invoked once per decoded line whose trimmed form is
/// non-empty. Returning `Some(value)` stops the stream: no further
/// buffered bytes are dispatched even if more have already arrived.
#[derive(Debug)]
pub struct Connection<T, F> {
    handler: F,
    state: State,
    /// Unconsumed raw bytes off the socket.
    buf: Vec<u8>,
    /// Dechunked payload awaiting a line boundary. Chunk boundaries are a
    /// transport artifact uncorrelated with line boundaries, hence the
    /// second buffer.
    chunk_lines: Vec<u8>,
    outcome: Option<Result<WatchOutcome<T>, Error>>,
}

impl<T, F> Connection<T, F>
where
    F: FnMut(&str) -> Option<T>,
{
    pub fn new(handler: F) -> Self {
        Connection {
            handler,
            state: State::AwaitingHeaders,
            buf: Vec::new(),
            chunk_lines: Vec::new(),
            outcome: None,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.outcome.is_some()
    }

    /// Remove the settled outcome, if any.
    pub fn take_outcome(&mut self) -> Option<Result<WatchOutcome<T>, Error>> {
        self.outcome.take()
    }

    /// Feed bytes read off the socket.
    pub fn push_data(&mut self, data: &[u8]) {
        if self.is_settled() {
            return;
        }

        self.buf.extend_from_slice(data);

        if let State::AwaitingHeaders = self.state {
            let i = match find_header_end(&self.buf) {
                Some(v) => v,
                None => return,
            };

            // The head is dropped once the framing decision is made.
            let head: Vec<u8> = self.buf.drain(..i + 4).collect();

            match is_chunked(&head) {
                Ok(true) => {
                    trace!("body framing: chunked");
                    self.state = State::Chunked(Dechunker::new());
                }
                Ok(false) => {
                    trace!("body framing: identity");
                    self.state = State::Identity;
                }
                Err(e) => {
                    self.settle(Err(e));
                    return;
                }
            }
        }

        match self.state {
            State::Identity => self.process_identity(),
            State::Chunked(_) => self.process_chunked(),
            State::AwaitingHeaders => unreachable!(),
        }
    }

    /// The remote closed the stream. A clean close without a terminal
    /// value is not an error.
    pub fn push_close(&mut self) {
        self.settle(Ok(WatchOutcome::Ended));
    }

    /// A transport fault occurred. Partial parse state is dropped, not
    /// flushed.
    pub fn push_error(&mut self, err: Error) {
        self.settle(Err(err));
    }

    fn process_identity(&mut self) {
        while let Some(line) = split_line(&mut self.buf) {
            if self.dispatch(&line) {
                return;
            }
        }
    }

    fn process_chunked(&mut self) {
        let (used, ended) = match &mut self.state {
            State::Chunked(dechunker) => {
                let used = dechunker.parse_input(&self.buf, &mut self.chunk_lines);
                (used, dechunker.is_ended())
            }
            _ => unreachable!(),
        };

        self.buf.drain(..used);

        while let Some(line) = split_line(&mut self.chunk_lines) {
            if self.dispatch(&line) {
                return;
            }
        }

        if ended {
            // Zero-size chunk. The final line of the stream may arrive
            // without its newline; flush it before ending. Trailers and
            // any bytes after the zero chunk are never parsed.
            let rest = std::mem::take(&mut self.chunk_lines);
            if !rest.is_empty() {
                let line = String::from_utf8_lossy(&rest).into_owned();
                if self.dispatch(&line) {
                    return;
                }
            }
            self.settle(Ok(WatchOutcome::Ended));
        }
    }

    /// Returns true if the dispatch settled the outcome.
    fn dispatch(&mut self, line: &str) -> bool {
        let line = line.trim();
        if line.is_empty() {
            return false;
        }

        trace!("dispatch line ({} bytes)", line.len());

        if let Some(value) = (self.handler)(line) {
            self.settle(Ok(WatchOutcome::Terminal(value)));
            return true;
        }

        false
    }

    fn settle(&mut self, outcome: Result<WatchOutcome<T>, Error>) {
        if self.is_settled() {
            return;
        }
        self.buf.clear();
        self.chunk_lines.clear();
        self.outcome = Some(outcome);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const HEAD_CHUNKED: &[u8] = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n";
    const HEAD_IDENTITY: &[u8] = b"HTTP/1.1 200 OK\r\n\r\n";

    fn collecting(lines: &mut Vec<String>) -> impl FnMut(&str) -> Option<()> + '_ {
        move |line| {
            lines.push(line.to_string());
            None
        }
    }

    #[test]
    fn test_single_chunked_line_then_end() {
        // Scenario A
        let mut lines = Vec::new();
        let mut conn = Connection::new(collecting(&mut lines));
        conn.push_data(HEAD_CHUNKED);
        conn.push_data(b"5\r\nhello\r\n0\r\n\r\n");

        assert!(matches!(conn.take_outcome(), Some(Ok(WatchOutcome::Ended))));
        drop(conn);
        assert_eq!(lines, ["hello"]);
    }

    #[test]
    fn test_identity_fragmented() {
        // Scenario B
        let mut lines = Vec::new();
        let mut conn = Connection::new(collecting(&mut lines));
        conn.push_data(HEAD_IDENTITY);
        conn.push_data(b"on");
        conn.push_data(b"e\ntw");
        conn.push_data(b"o\n");

        assert!(!conn.is_settled());
        conn.push_close();
        assert!(matches!(conn.take_outcome(), Some(Ok(WatchOutcome::Ended))));
        drop(conn);
        assert_eq!(lines, ["one", "two"]);
    }

    #[test]
    fn test_terminal_stops_buffered_dispatch() {
        // Scenario C
        let mut seen = Vec::new();
        let mut conn = Connection::new(|line: &str| {
            seen.push(line.to_string());
            (seen.len() == 2).then_some(42)
        });
        conn.push_data(HEAD_IDENTITY);
        // Three complete lines in one delivery.
        conn.push_data(b"a\nb\nc\n");

        assert!(matches!(
            conn.take_outcome(),
            Some(Ok(WatchOutcome::Terminal(42)))
        ));
        drop(conn);
        assert_eq!(seen, ["a", "b"]);
    }

    #[test]
    fn test_error_before_headers() {
        // Scenario D
        let mut dispatched = false;
        let mut conn = Connection::new(|_: &str| -> Option<()> {
            dispatched = true;
            None
        });
        conn.push_data(b"HTTP/1.1 200 OK\r\nTransfer-Enco");
        conn.push_error(Error::HttpParseFail("reset".into()));

        assert!(matches!(conn.take_outcome(), Some(Err(_))));
        drop(conn);
        assert!(!dispatched);
    }

    #[test]
    fn test_header_separator_split_across_deliveries() {
        let mut lines = Vec::new();
        let mut conn = Connection::new(collecting(&mut lines));
        conn.push_data(b"HTTP/1.1 200 OK\r\n\r");
        conn.push_data(b"\nhi\n");
        conn.push_close();

        assert!(matches!(conn.take_outcome(), Some(Ok(WatchOutcome::Ended))));
        drop(conn);
        assert_eq!(lines, ["hi"]);
    }

    #[test]
    fn test_chunk_boundary_independence() {
        let body = b"4\r\nfir\n\r\n7\r\nsecond\n\r\n6\r\nthird\n\r\n0\r\n\r\n";

        let mut whole = Vec::new();
        let mut conn = Connection::new(collecting(&mut whole));
        conn.push_data(HEAD_CHUNKED);
        conn.push_data(body);
        assert!(conn.is_settled());
        drop(conn);

        // Byte-at-a-time delivery must dispatch the identical sequence.
        let mut split = Vec::new();
        let mut conn = Connection::new(collecting(&mut split));
        for b in HEAD_CHUNKED.iter().chain(body.iter()) {
            conn.push_data(&[*b]);
        }
        assert!(matches!(conn.take_outcome(), Some(Ok(WatchOutcome::Ended))));
        drop(conn);

        assert_eq!(whole, ["fir", "second", "third"]);
        assert_eq!(split, whole);
    }

    #[test]
    fn test_line_spanning_chunks() {
        let mut lines = Vec::new();
        let mut conn = Connection::new(collecting(&mut lines));
        conn.push_data(HEAD_CHUNKED);
        // One logical line split over three chunks.
        conn.push_data(b"3\r\nhel\r\n2\r\nlo\r\n1\r\n\n\r\n");
        conn.push_data(b"0\r\n\r\n");

        assert!(matches!(conn.take_outcome(), Some(Ok(WatchOutcome::Ended))));
        drop(conn);
        assert_eq!(lines, ["hello"]);
    }

    #[test]
    fn test_unterminated_final_line_flushed_at_end() {
        let mut lines = Vec::new();
        let mut conn = Connection::new(collecting(&mut lines));
        conn.push_data(HEAD_CHUNKED);
        // "tail" never gets its newline before the zero chunk.
        conn.push_data(b"3\r\nab\n\r\n4\r\ntail\r\n0\r\n\r\n");

        assert!(matches!(conn.take_outcome(), Some(Ok(WatchOutcome::Ended))));
        drop(conn);
        assert_eq!(lines, ["ab", "tail"]);
    }

    #[test]
    fn test_whitespace_tail_suppressed_at_end() {
        let mut lines = Vec::new();
        let mut conn = Connection::new(collecting(&mut lines));
        conn.push_data(HEAD_CHUNKED);
        conn.push_data(b"3\r\nhi\n\r\n3\r\n \t \r\n0\r\n\r\n");

        assert!(matches!(conn.take_outcome(), Some(Ok(WatchOutcome::Ended))));
        drop(conn);
        assert_eq!(lines, ["hi"]);
    }

    #[test]
    fn test_terminal_value_on_flushed_tail() {
        let mut conn = Connection::new(|line: &str| (line == "tail").then_some(7));
        conn.push_data(HEAD_CHUNKED);
        conn.push_data(b"4\r\ntail\r\n0\r\n\r\n");

        assert!(matches!(
            conn.take_outcome(),
            Some(Ok(WatchOutcome::Terminal(7)))
        ));
    }

    #[test]
    fn test_zero_chunk_ends_despite_trailing_garbage() {
        let mut lines = Vec::new();
        let mut conn = Connection::new(collecting(&mut lines));
        conn.push_data(HEAD_CHUNKED);
        conn.push_data(b"3\r\nhi\n\r\n0\r\n\r\nleftover junk");

        assert!(matches!(conn.take_outcome(), Some(Ok(WatchOutcome::Ended))));
        drop(conn);
        assert_eq!(lines, ["hi"]);
    }

    #[test]
    fn test_huge_chunk_size_stalls_stream() {
        let mut lines = Vec::new();
        let mut conn = Connection::new(collecting(&mut lines));
        conn.push_data(HEAD_CHUNKED);
        conn.push_data(b"ffffffffffffffff\r\nXYZ");

        assert!(!conn.is_settled());
        drop(conn);
        assert!(lines.is_empty());
    }

    #[test]
    fn test_blank_lines_suppressed() {
        let mut lines = Vec::new();
        let mut conn = Connection::new(collecting(&mut lines));
        conn.push_data(HEAD_IDENTITY);
        conn.push_data(b"\n   \n\t\nreal\n\r\n");
        conn.push_close();
        drop(conn);

        assert_eq!(lines, ["real"]);
    }

    #[test]
    fn test_settles_at_most_once() {
        let mut conn = Connection::new(|line: &str| Some(line.to_string()));
        conn.push_data(HEAD_IDENTITY);
        conn.push_data(b"first\n");
        // Late events after settlement are no-ops.
        conn.push_error(Error::HttpParseFail("late".into()));
        conn.push_close();
        conn.push_data(b"second\n");

        let outcome = conn.take_outcome();
        assert!(
            matches!(outcome, Some(Ok(WatchOutcome::Terminal(ref v))) if v == "first"),
            "{:?}",
            outcome
        );
        assert!(conn.take_outcome().is_none());
    }

    #[test]
    fn test_garbage_head_rejects() {
        let mut conn = Connection::new(|_: &str| -> Option<()> { None });
        conn.push_data(b"\x00\x01\x02\r\n\r\nrest\n");

        assert!(matches!(
            conn.take_outcome(),
            Some(Err(Error::HttpParseFail(_)))
        ));
    }
}
