//! SASL PLAIN credential encoding.
//!
//! # Reference
//! - IRCv3 SASL: <https://ircv3.net/specs/extensions/sasl-3.1>
//! - RFC 4616 (PLAIN): <https://tools.ietf.org/html/rfc4616>

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

/// Maximum length of a single `AUTHENTICATE` payload.
pub const SASL_CHUNK_SIZE: usize = 400;

/// Encode PLAIN credentials as `authzid NUL authcid NUL password`.
///
/// The client sends its nick as authzid and its user name as authcid.
pub fn encode_plain(authzid: &str, authcid: &str, password: &str) -> String {
    let payload = format!("{}\0{}\0{}", authzid, authcid, password);
    BASE64.encode(payload.as_bytes())
}

/// Split an encoded response into `AUTHENTICATE` payloads.
///
/// A response that fills its last chunk exactly is terminated with `+`.
pub fn authenticate_payloads(encoded: &str) -> Vec<String> {
    if encoded.is_empty() {
        return vec!["+".to_string()];
    }

    // base64 output is ASCII, so byte chunks are char boundaries.
    let mut payloads: Vec<String> = encoded
        .as_bytes()
        .chunks(SASL_CHUNK_SIZE)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect();

    if encoded.len() % SASL_CHUNK_SIZE == 0 {
        payloads.push("+".to_string());
    }
    payloads
}
