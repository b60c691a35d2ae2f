use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("connect failed: {0}")]
    Connect(io::Error),

    #[error("invalid dns name: {0}")]
    InvalidDnsName(String),

    #[error("tls: {0}")]
    Tls(#[from] rustls::Error),

    #[error("tls config: {0}")]
    TlsConfig(String),

    #[error("bad pem in {0}: {1}")]
    BadPem(String, String),

    #[error("io error during streaming: {0}")]
    Io(#[from] io::Error),

    #[error("http parse fail: {0}")]
    HttpParseFail(String),
}

impl From<httparse::Error> for Error {
    fn from(value: httparse::Error) -> Self {
        Error::HttpParseFail(value.to_string())
    }
}
