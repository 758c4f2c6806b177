//! Client certificate parsed from forwarded DER bytes.

use openssl::error::ErrorStack;
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::x509::{X509NameRef, X509};
use std::fmt;
use std::sync::Arc;

/// Error returned when forwarded bytes are not a usable X.509 certificate.
#[derive(Debug)]
pub struct CertificateError(ErrorStack);

impl fmt::Display for CertificateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid client certificate: {}", self.0)
    }
}

impl std::error::Error for CertificateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl From<ErrorStack> for CertificateError {
    fn from(e: ErrorStack) -> Self {
        Self(e)
    }
}

/// An X.509 client certificate forwarded by a TLS-terminating proxy.
///
/// Cheap to clone; stored in request extensions by the forwarding layer.
#[derive(Clone)]
pub struct ClientCertificate {
    x509: X509,
    der: Arc<[u8]>,
    thumbprint: Arc<str>,
    serial_number: Arc<str>,
}

impl ClientCertificate {
    /// Parse a DER-encoded certificate.
    pub fn from_der(der: &[u8]) -> Result<Self, CertificateError> {
        let x509 = X509::from_der(der)?;
        let thumbprint = hex_upper(&x509.digest(MessageDigest::sha1())?);
        let serial_number = x509.serial_number().to_bn()?.to_hex_str()?.to_string();

        Ok(Self {
            x509,
            der: Arc::from(der),
            thumbprint: Arc::from(thumbprint),
            serial_number: Arc::from(serial_number),
        })
    }

    /// The DER bytes the certificate was parsed from.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn x509(&self) -> &X509 {
        &self.x509
    }

    /// Subject distinguished name, most specific component first
    /// (`CN=client, O=Example`).
    pub fn subject(&self) -> String {
        format_name(self.x509.subject_name())
    }

    pub fn issuer(&self) -> String {
        format_name(self.x509.issuer_name())
    }

    /// The subject's common name, if present.
    pub fn common_name(&self) -> Option<String> {
        self.x509
            .subject_name()
            .entries_by_nid(Nid::COMMONNAME)
            .next()
            .and_then(|entry| entry.data().as_utf8().ok())
            .map(|cn| cn.to_string())
    }

    /// Uppercase hex SHA-1 of the DER bytes.
    pub fn thumbprint(&self) -> &str {
        &self.thumbprint
    }

    /// Uppercase hex serial number.
    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }

    pub fn not_before(&self) -> String {
        self.x509.not_before().to_string()
    }

    pub fn not_after(&self) -> String {
        self.x509.not_after().to_string()
    }
}

impl fmt::Debug for ClientCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCertificate")
            .field("subject", &self.subject())
            .field("thumbprint", &self.thumbprint)
            .finish()
    }
}

impl PartialEq for ClientCertificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for ClientCertificate {}

fn format_name(name: &X509NameRef) -> String {
    let mut parts: Vec<String> = name
        .entries()
        .map(|entry| {
            let key = entry.object().nid().short_name().unwrap_or("?");
            let value = entry
                .data()
                .as_utf8()
                .map(|v| v.to_string())
                .unwrap_or_default();
            format!("{key}={value}")
        })
        .collect();
    parts.reverse();
    parts.join(", ")
}

fn hex_upper(bytes: &[u8]) -> String {
    use std::fmt::Write;

    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02X}");
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::self_signed_der;

    #[test]
    fn parses_generated_certificate() {
        let der = self_signed_der("client.example");
        let cert = ClientCertificate::from_der(&der).unwrap();

        assert_eq!(cert.der(), der.as_slice());
        assert_eq!(cert.subject(), "CN=client.example, O=Pipeline Tests");
        assert_eq!(cert.issuer(), cert.subject());
        assert_eq!(cert.common_name().as_deref(), Some("client.example"));
        assert_eq!(cert.serial_number(), "1092");
        assert!(!cert.not_before().is_empty());
        assert!(!cert.not_after().is_empty());
    }

    #[test]
    fn thumbprint_is_sha1_hex() {
        let der = self_signed_der("client.example");
        let cert = ClientCertificate::from_der(&der).unwrap();

        let expected = hex_upper(&openssl::sha::sha1(&der));
        assert_eq!(cert.thumbprint(), expected);
        assert_eq!(cert.thumbprint().len(), 40);
    }

    #[test]
    fn rejects_garbage() {
        assert!(ClientCertificate::from_der(b"abc").is_err());
        assert!(ClientCertificate::from_der(&[]).is_err());
    }

    #[test]
    fn equality_follows_der() {
        let der = self_signed_der("a.example");
        let first = ClientCertificate::from_der(&der).unwrap();
        let second = ClientCertificate::from_der(&der).unwrap();
        let other = ClientCertificate::from_der(&self_signed_der("b.example")).unwrap();

        assert_eq!(first, second);
        assert_ne!(first, other);
    }

    #[test]
    fn hex_upper_formats_bytes() {
        assert_eq!(hex_upper(&[0x00, 0xab, 0x10]), "00AB10");
    }
}
