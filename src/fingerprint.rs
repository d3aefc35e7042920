//! Deterministic request fingerprints.
//!
//! A [`Fingerprint`] is the xxh3-128 hash of a canonical serialization of a
//! [`SynthesisRequest`]. The serialization is fixed-order and versioned:
//!
//! ```text
//! huginn-fp-v1|<text byte length>:<text>|<language>|<expressiveness>|<guidance>|<temperature>|<speed>|<reference digest or ->
//! ```
//!
//! Floats are rendered with a fixed number of decimal digits, so requests
//! that differ only in noise beyond that precision share a fingerprint.
//! Nothing process-specific (addresses, random hasher seeds) enters the
//! hash, so fingerprints are stable across restarts.

use std::fmt;

use xxhash_rust::xxh3::xxh3_128;

use crate::types::SynthesisRequest;
use crate::{HuginnError, Result};

/// Schema tag prefixed to every canonical serialization.
const SCHEMA: &str = "huginn-fp-v1";

/// Encodes an absent reference audio.
const NO_REFERENCE: &str = "-";

/// Default number of decimal digits kept for float parameters.
pub const DEFAULT_FLOAT_PRECISION: u32 = 4;

/// Largest supported float precision. f32 carries ~7 significant digits;
/// anything beyond 9 only hashes representation noise.
pub const MAX_FLOAT_PRECISION: u32 = 9;

/// Fixed-length opaque cache key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 16]);

impl Fingerprint {
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

/// Computes fingerprints at a fixed float precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprinter {
    precision: u32,
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self {
            precision: DEFAULT_FLOAT_PRECISION,
        }
    }
}

impl Fingerprinter {
    /// Create a fingerprinter that keeps `precision` decimal digits.
    pub fn new(precision: u32) -> Result<Self> {
        if precision > MAX_FLOAT_PRECISION {
            return Err(HuginnError::Configuration(format!(
                "float precision must be at most {MAX_FLOAT_PRECISION}, got {precision}"
            )));
        }
        Ok(Self { precision })
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    /// Fingerprint a request. Pure and total.
    pub fn fingerprint(&self, request: &SynthesisRequest) -> Fingerprint {
        let canonical = self.canonicalize(request);
        Fingerprint(xxh3_128(canonical.as_bytes()).to_be_bytes())
    }

    /// The canonical serialization that is hashed.
    pub fn canonicalize(&self, request: &SynthesisRequest) -> String {
        let precision = self.precision as usize;
        let params = request.params();
        let text = request.text();
        let reference = request
            .reference_audio()
            .map(|audio| audio.digest_hex())
            .unwrap_or_else(|| NO_REFERENCE.to_string());

        let mut s = String::with_capacity(text.len() + 128);
        s.push_str(SCHEMA);
        s.push('|');
        s.push_str(&text.len().to_string());
        s.push(':');
        s.push_str(text);
        s.push('|');
        s.push_str(request.language());
        for value in [
            params.expressiveness,
            params.guidance_weight,
            params.temperature,
            params.speed_factor,
        ] {
            s.push('|');
            s.push_str(&canonical_float(value, precision));
        }
        s.push('|');
        s.push_str(&reference);
        s
    }
}

/// Render `value` with `precision` decimals; a value that rounds to zero is
/// always `0.000…`, never `-0.000…`.
fn canonical_float(value: f32, precision: usize) -> String {
    let rendered = format!("{value:.precision$}");
    match rendered.strip_prefix('-') {
        Some(rest) if rest.bytes().all(|b| b == b'0' || b == b'.') => rest.to_string(),
        _ => rendered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VoiceParams;

    fn request(text: &str, params: VoiceParams) -> SynthesisRequest {
        SynthesisRequest::builder(text).params(params).build().unwrap()
    }

    #[test]
    fn canonical_form_is_stable() {
        let fp = Fingerprinter::default();
        let canonical = fp.canonicalize(&request("Hello", VoiceParams::default()));
        assert_eq!(
            canonical,
            "huginn-fp-v1|5:Hello|en|0.5000|0.5000|0.7000|1.0000|-"
        );
    }

    #[test]
    fn negative_zero_is_normalised() {
        assert_eq!(canonical_float(-0.00001, 4), "0.0000");
        assert_eq!(canonical_float(-0.0, 2), "0.00");
        assert_eq!(canonical_float(-0.5, 1), "-0.5");
    }

    #[test]
    fn precision_zero_has_no_decimal_point() {
        assert_eq!(canonical_float(0.7, 0), "1");
    }

    #[test]
    fn text_length_prefix_prevents_delimiter_ambiguity() {
        let fp = Fingerprinter::default();
        let a = request("a|en", VoiceParams::default());
        let b = request("a", VoiceParams::default());
        assert_ne!(fp.fingerprint(&a), fp.fingerprint(&b));
    }

    #[test]
    fn precision_above_limit_rejected() {
        assert!(Fingerprinter::new(10).is_err());
        assert_eq!(Fingerprinter::new(9).unwrap().precision(), 9);
    }

    #[test]
    fn display_is_lowercase_hex() {
        let fp = Fingerprint::from_bytes([0xab; 16]);
        assert_eq!(fp.to_string(), "ab".repeat(16));
    }
}
