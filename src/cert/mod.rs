//! Client certificate forwarding for proxy-terminated TLS.
//!
//! A reverse proxy that terminates TLS can pass the client's certificate to
//! the backend as base64 DER in a request header (`X-ARR-ClientCert` by
//! default). This module decodes that header into a [`ClientCertificate`].

mod certificate;
mod decode;
mod layer;
mod pool;

pub use certificate::{CertificateError, ClientCertificate};
pub use decode::{
    decode_certificate_header, decode_certificate_header_in, decode_header_with,
    decoded_len_upper_bound,
};
pub use layer::{CertificateForwardingLayer, CertificateForwardingService};
pub use pool::{BufferPool, PooledBuffer};
