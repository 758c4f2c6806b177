//! Base64 certificate header decoding.

use super::certificate::ClientCertificate;
use super::pool::BufferPool;
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Upper bound on the decoded length of a base64 value.
///
/// `len * 3 / 4` minus the trailing `=` padding, which is exact for
/// well-formed input. Returns `None` on arithmetic overflow.
pub fn decoded_len_upper_bound(encoded: &str) -> Option<usize> {
    let padding = match encoded.as_bytes() {
        [.., b'=', b'='] => 2,
        [.., b'='] => 1,
        _ => 0,
    };
    Some((encoded.len().checked_mul(3)? / 4).saturating_sub(padding))
}

/// Decode a base64 header value into a pooled buffer and hand the decoded
/// bytes to `convert`.
///
/// Returns `None` without calling `convert` when the value is blank, is not
/// valid base64, or decodes to nothing. `convert` sees exactly the decoded
/// bytes. The scratch buffer goes back to `pool` on every path.
pub fn decode_header_with<T>(
    value: &str,
    pool: &BufferPool,
    convert: impl FnOnce(&[u8]) -> Option<T>,
) -> Option<T> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let max = decoded_len_upper_bound(value)?;
    if max == 0 {
        return None;
    }

    let mut buffer = pool.rent(max);
    let written = match STANDARD.decode_slice(value, &mut buffer[..]) {
        Ok(written) => written,
        Err(e) => {
            tracing::debug!(error = %e, "client certificate header is not valid base64");
            return None;
        }
    };
    if written == 0 {
        return None;
    }

    convert(&buffer[..written])
}

/// Decode a forwarded certificate header using the shared buffer pool.
///
/// Bytes that decode but do not parse as a certificate are logged and
/// treated as "no certificate".
///
/// ```rust
/// use pipeline_defaults::decode_certificate_header;
///
/// assert!(decode_certificate_header("").is_none());
/// assert!(decode_certificate_header("not base64!!").is_none());
/// ```
pub fn decode_certificate_header(value: &str) -> Option<ClientCertificate> {
    decode_certificate_header_in(value, BufferPool::shared())
}

/// [`decode_certificate_header`] with an explicit pool.
pub fn decode_certificate_header_in(value: &str, pool: &BufferPool) -> Option<ClientCertificate> {
    decode_header_with(value, pool, |der| match ClientCertificate::from_der(der) {
        Ok(cert) => Some(cert),
        Err(e) => {
            tracing::warn!(error = %e, len = der.len(), "ignoring unparseable client certificate");
            None
        }
    })
}
