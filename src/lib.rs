//! Watch-stream client speaking a minimal subset of HTTP/1.1.
//!
//! A watch is a long-lived GET whose response body is an unbounded,
//! incrementally delivered stream of newline-delimited event lines. The
//! parsing core is Sans-IO: a [`Connection`] is fed raw socket bytes via a
//! push API and settles a single-resolution outcome. [`Watcher`] is the
//! blocking driver that owns the socket.

#[macro_use]
extern crate log;

mod error;
pub use error::Error;

mod chunk;
mod framer;
mod util;

mod conn;
pub use conn::{Connection, WatchOutcome};

mod request;
pub use request::{Auth, RequestSpec, Scheme};

mod tls;
pub use tls::{TlsOptions, Verify};

mod connect;

mod watch;
pub use watch::Watcher;
