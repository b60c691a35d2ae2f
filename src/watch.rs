use std::io::{ErrorKind, Read, Write};

use crate::conn::{Connection, WatchOutcome};
use crate::connect::connect;
use crate::request::RequestSpec;
use crate::tls::TlsOptions;
use crate::Error;

/// Blocking driver for a single watch invocation.
///
/// Owns exactly one socket for the lifetime of the watch. The read loop is
/// the cooperative scheduler described by the parsing core: events are
/// delivered to the [`Connection`] one at a time, so no locking is needed
/// around parser state. [`watch`][Watcher::watch] returns when the
/// completion signal settles, and the socket is closed at that instant.
///
/// There is no built-in timeout, reconnect or backoff. A server-enforced
/// deadline such as a `timeoutSeconds` query parameter is the caller's
/// tool for bounding the stream; retries mean invoking the whole watch
/// again with a fresh connection.
///
/// ```no_run
/// use kwatch::{Auth, RequestSpec, Scheme, Watcher};
///
/// let spec = RequestSpec {
///     scheme: Scheme::Https,
///     host: "api.cluster.test".into(),
///     port: 6443,
///     path: "/api/v1/namespaces/default/pods".into(),
///     query: Some("watch=1".into()),
///     auth: Auth::Bearer("token".into()),
/// };
///
/// let outcome = Watcher::new(spec).watch(|line| {
///     // Each non-empty line of the stream. For resource watches the
///     // caller parses the `{"type": ..., "object": ...}` JSON here.
///     line.contains("\"type\":\"DELETED\"").then(|| line.to_string())
/// })?;
/// # Ok::<(), kwatch::Error>(())
/// ```
pub struct Watcher {
    spec: RequestSpec,
    tls: TlsOptions,
}

const READ_BUF_SIZE: usize = 16 * 1024;

impl Watcher {
    pub fn new(spec: RequestSpec) -> Self {
        Watcher {
            spec,
            tls: TlsOptions::default(),
        }
    }

    pub fn with_tls(mut self, tls: TlsOptions) -> Self {
        self.tls = tls;
        self
    }

    /// Run the watch until the handler returns a value, the remote closes
    /// the stream, or a transport error occurs.
    pub fn watch<T, F>(&self, handler: F) -> Result<WatchOutcome<T>, Error>
    where
        F: FnMut(&str) -> Option<T>,
    {
        let mut stream = connect(&self.spec, &self.tls)?;

        let request = self.spec.encode();
        stream.write_all(&request)?;
        stream.flush()?;
        trace!("request sent, {} bytes", request.len());

        let mut conn = Connection::new(handler);
        let mut buf = [0u8; READ_BUF_SIZE];

        loop {
            if let Some(outcome) = conn.take_outcome() {
                // Dropping the stream closes the socket the instant the
                // completion signal settles.
                return outcome;
            }

            match stream.read(&mut buf) {
                Ok(0) => conn.push_close(),
                Ok(n) => conn.push_data(&buf[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => conn.push_error(Error::Io(e)),
            }
        }
    }
}
