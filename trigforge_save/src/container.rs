//! Outer layer of the save file: XOR 11, base64, gzip around the XML text.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use trigforge_data::payload::{gunzip, gzip};

use crate::SaveError;

pub const XOR_KEY: u8 = 11;

const CONTAINER_B64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_encode_padding(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

fn xor(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().map(|b| b ^ XOR_KEY).collect()
}

/// Decrypt raw container bytes into the XML document text.
///
/// The game writes the URL-safe alphabet on some platforms, so both
/// alphabets are accepted. Trailing NULs and whitespace are ignored.
///
/// # Errors
/// `SaveError::Base64`, `Io` (gzip) or `Utf8`, naming the layer that failed.
pub fn decrypt(bytes: &[u8]) -> Result<String, SaveError> {
    let text: Vec<u8> = xor(bytes)
        .into_iter()
        .filter(|b| !b.is_ascii_whitespace() && *b != 0)
        .map(|b| match b {
            b'-' => b'+',
            b'_' => b'/',
            other => other,
        })
        .collect();
    let compressed = CONTAINER_B64.decode(text)?;
    Ok(String::from_utf8(gunzip(&compressed)?)?)
}

/// Encrypt XML document text into container bytes.
pub fn encrypt(xml: &str) -> Vec<u8> {
    xor(CONTAINER_B64.encode(gzip(xml.as_bytes())).as_bytes())
}
