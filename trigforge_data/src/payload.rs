//! Level payload encoding: gzip, then URL-safe base64.
//!
//! This is the form a level string takes inside the save container and when
//! levels are shared as text.

use std::io::{Read, Write};

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use thiserror::Error;

/// URL-safe alphabet; padding is written but optional when reading.
const PAYLOAD_B64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("payload is not valid gzip: {0}")]
    Gzip(#[from] std::io::Error),
    #[error("payload does not decode to UTF-8 text: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Compress and encode a level string.
///
/// ```
/// use trigforge_data::payload::{decode_level, encode_level};
///
/// let blob = encode_level("1,1,2,15,3,15;");
/// assert_eq!(decode_level(&blob).unwrap(), "1,1,2,15,3,15;");
/// ```
pub fn encode_level(level: &str) -> String {
    PAYLOAD_B64.encode(gzip(level.as_bytes()))
}

/// Decode and decompress a payload back into its level string.
///
/// Surrounding whitespace and trailing NUL bytes (left by some save writers)
/// are ignored.
///
/// # Errors
/// A `PayloadError` naming the layer that failed.
pub fn decode_level(blob: &str) -> Result<String, PayloadError> {
    let trimmed = blob.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    let compressed = PAYLOAD_B64.decode(trimmed)?;
    Ok(String::from_utf8(gunzip(&compressed)?)?)
}

/// Gzip a byte buffer with the default compression level.
pub fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    // writing into a Vec cannot fail
    let _ = encoder.write_all(bytes);
    encoder.finish().unwrap_or_default()
}

/// Inflate a gzip stream.
///
/// # Errors
/// Any I/O error reported by the decoder (bad header, truncated stream).
pub fn gunzip(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(bytes).read_to_end(&mut out)?;
    Ok(out)
}
