use std::fmt;

use base64::prelude::BASE64_STANDARD;
use base64::Engine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn default_port(&self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }

    pub(crate) fn is_tls(&self) -> bool {
        matches!(self, Scheme::Https)
    }
}

/// Authorization method for the request.
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    None,
    Bearer(String),
    Basic(String, String),
}

impl Auth {
    /// Resolve the configured credentials into one method. A bearer token
    /// takes precedence over basic credentials when both are set.
    pub fn from_parts(token: Option<String>, basic: Option<(String, String)>) -> Auth {
        if let Some(token) = token {
            Auth::Bearer(token)
        } else if let Some((user, pass)) = basic {
            Auth::Basic(user, pass)
        } else {
            Auth::None
        }
    }
}

impl fmt::Debug for Auth {
    // Credentials stay out of logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::None => write!(f, "None"),
            Auth::Bearer(_) => write!(f, "Bearer(..)"),
            Auth::Basic(..) => write!(f, "Basic(..)"),
        }
    }
}

/// Target of a watch request.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
    pub path: String,
    /// Raw query string, appended after `?` when non-empty.
    pub query: Option<String>,
    pub auth: Auth,
}

impl RequestSpec {
    /// Render the exact request bytes. Pure function, no I/O.
    pub fn encode(&self) -> Vec<u8> {
        let mut target = self.path.clone();
        if let Some(query) = &self.query {
            if !query.is_empty() {
                target.push('?');
                target.push_str(query);
            }
        }

        // Default ports are omitted from the host header.
        let host_header = if self.port == self.scheme.default_port() {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        };

        let mut lines = vec![
            format!("GET {} HTTP/1.1", target),
            format!("Host: {}", host_header),
            "Accept: application/json".to_string(),
            "Connection: keep-alive".to_string(),
        ];

        match &self.auth {
            Auth::Bearer(token) => {
                lines.push(format!("Authorization: Bearer {}", token));
            }
            Auth::Basic(user, pass) => {
                let credentials = BASE64_STANDARD.encode(format!("{}:{}", user, pass));
                lines.push(format!("Authorization: Basic {}", credentials));
            }
            Auth::None => {}
        }

        let mut out = lines.join("\r\n").into_bytes();
        out.extend_from_slice(b"\r\n\r\n");
        out
    }
}
