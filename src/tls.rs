use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use rustls_pki_types::pem::PemObject;
use rustls_pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};

use crate::Error;

/// Server certificate trust policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Verify {
    /// Verify against the bundled webpki roots.
    #[default]
    Full,
    /// Accept any server certificate.
    Off,
    /// Verify against a PEM bundle on disk.
    CaFile(PathBuf),
}

/// TLS surface accepted from the caller: the trust policy plus an optional
/// client certificate and key for mutual TLS.
#[derive(Debug, Clone, Default)]
pub struct TlsOptions {
    pub verify: Verify,
    pub cert: Option<PathBuf>,
    pub key: Option<PathBuf>,
}

pub(crate) fn client_config(opts: &TlsOptions) -> Result<ClientConfig, Error> {
    let builder = ClientConfig::builder();

    let builder = match &opts.verify {
        Verify::Full => {
            let roots = RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            builder.with_root_certificates(roots)
        }
        Verify::Off => {
            warn!("server certificate verification is disabled");
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(NoVerifier))
        }
        Verify::CaFile(path) => {
            let mut roots = RootCertStore::empty();
            for cert in load_certs(path)? {
                roots.add(cert)?;
            }
            builder.with_root_certificates(roots)
        }
    };

    let config = match (&opts.cert, &opts.key) {
        (Some(cert), Some(key)) => {
            let key = PrivateKeyDer::from_pem_file(key)
                .map_err(|e| Error::BadPem(key.display().to_string(), e.to_string()))?;
            builder.with_client_auth_cert(load_certs(cert)?, key)?
        }
        (None, None) => builder.with_no_client_auth(),
        _ => {
            return Err(Error::TlsConfig(
                "client certificate and key must be set together".to_string(),
            ));
        }
    };

    Ok(config)
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, Error> {
    CertificateDer::pem_file_iter(path)
        .and_then(|iter| iter.collect())
        .map_err(|e| Error::BadPem(path.display().to_string(), e.to_string()))
}

/// Verifier used for [`Verify::Off`]: accepts everything.
#[derive(Debug)]
struct NoVerifier;

impl ServerCertVerifier for NoVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer,
        _intermediates: &[CertificateDer],
        _server_name: &ServerName,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
            SignatureScheme::ECDSA_NISTP521_SHA512,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::RSA_PSS_SHA384,
            SignatureScheme::RSA_PSS_SHA512,
            SignatureScheme::ED25519,
        ]
    }
}
