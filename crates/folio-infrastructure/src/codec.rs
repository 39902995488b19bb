//! Reversible text compression for stored records.
//!
//! Uses the LZ-String UTF-16 encoding: every output code unit is a printable
//! BMP character, so the compressed form is itself a valid string and can be
//! handed to any textual key-value store. Compression exists for the storage
//! quota, not for confidentiality.

use folio_core::error::{FolioError, Result};

/// Compresses `plaintext`.
///
/// The empty string maps to itself.
pub fn compress(plaintext: &str) -> Result<String> {
    if plaintext.is_empty() {
        return Ok(String::new());
    }

    let compressed = lz_str::compress_to_utf16(plaintext);
    if compressed.is_empty() {
        return Err(FolioError::compression(format!(
            "compression of {} bytes produced no output",
            plaintext.len()
        )));
    }
    Ok(compressed)
}

/// Inverse of [`compress`].
///
/// Input that is not a valid compressed stream fails with
/// `FolioError::Compression`; callers holding possibly legacy data fall back
/// to the raw string.
pub fn decompress(compressed: &str) -> Result<String> {
    if compressed.is_empty() {
        return Ok(String::new());
    }

    // Compressed output only uses code units >= 32. Lower units (newlines,
    // tabs in legacy JSON) would underflow inside the decoder.
    if let Some(unit) = compressed.encode_utf16().find(|unit| *unit < 32) {
        return Err(FolioError::compression(format!(
            "not a compressed stream (control character U+{:04X})",
            unit
        )));
    }

    let units = lz_str::decompress_from_utf16(compressed)
        .ok_or_else(|| FolioError::compression("decompression returned no data"))?;

    // A non-empty stream that decodes to nothing is not something `compress` emits.
    if units.is_empty() {
        return Err(FolioError::compression("decompression produced an empty result"));
    }

    String::from_utf16(&units)
        .map_err(|e| FolioError::compression(format!("decompressed data is not valid UTF-16: {}", e)))
}

/// Ratio of the original UTF-8 size to the compressed UTF-8 size.
///
/// Values above 1.0 mean compression saved space.
pub fn compression_ratio(original: &str) -> Result<f64> {
    let compressed = compress(original)?;
    if compressed.is_empty() {
        return Ok(1.0);
    }
    Ok(original.len() as f64 / compressed.len() as f64)
}
