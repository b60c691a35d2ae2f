use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::sync::Arc;

use rustls::{ClientConnection, StreamOwned};
use rustls_pki_types::ServerName;

use crate::request::RequestSpec;
use crate::tls::{self, TlsOptions};
use crate::Error;

/// A plain or TLS-wrapped byte stream. One per watch invocation, never
/// reused; dropping it closes the socket.
pub(crate) enum Stream {
    Plain(TcpStream),
    Tls(Box<StreamOwned<ClientConnection, TcpStream>>),
}

/// Open the socket for a watch request.
///
/// TLS is negotiated lazily by rustls, so a handshake failure surfaces as
/// an I/O error on first read or write rather than here.
pub(crate) fn connect(spec: &RequestSpec, opts: &TlsOptions) -> Result<Stream, Error> {
    debug!("connecting to {}:{}", spec.host, spec.port);

    let sock =
        TcpStream::connect((spec.host.as_str(), spec.port)).map_err(Error::Connect)?;

    if !spec.scheme.is_tls() {
        return Ok(Stream::Plain(sock));
    }

    let config = Arc::new(tls::client_config(opts)?);

    let server_name = ServerName::try_from(spec.host.clone())
        .map_err(|_| Error::InvalidDnsName(spec.host.clone()))?;

    let conn = ClientConnection::new(config, server_name)?;

    Ok(Stream::Tls(Box::new(StreamOwned::new(conn, sock))))
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Stream::Plain(v) => v.read(buf),
            Stream::Tls(v) => v.read(buf),
        }
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Stream::Plain(v) => v.write(buf),
            Stream::Tls(v) => v.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Stream::Plain(v) => v.flush(),
            Stream::Tls(v) => v.flush(),
        }
    }
}
