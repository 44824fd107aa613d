//! Body charset detection and decoding
//!
//! Agents mostly send UTF-8, but older Windows agents post in the local ANSI
//! code page (GBK, Windows-1252, ...). Clean UTF-8 is taken as-is; anything
//! else goes through `chardetng`, and the guess is only trusted when its
//! confidence clears the configured threshold.

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};
use std::borrow::Cow;

/// Confidence given to a guess the detector itself considers reliable
const ASSESSED_CONFIDENCE: f32 = 1.0;
/// Confidence given to a guess the detector flags as doubtful
const UNASSESSED_CONFIDENCE: f32 = 0.6;

/// Best-effort guess for a byte buffer
#[derive(Debug, Clone, Copy)]
pub struct Detection {
    pub encoding: &'static Encoding,
    /// Score in `[0, 1]`
    pub confidence: f32,
}

/// How a body ended up as text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodePath {
    /// Input was valid UTF-8
    Utf8,
    /// Detector guess was trusted
    Detected(&'static str),
    /// Detector was not confident; undecodable bytes were replaced
    LossyUtf8,
}

/// Decoded body text plus how it was obtained
#[derive(Debug, Clone)]
pub struct DecodedText<'a> {
    pub text: Cow<'a, str>,
    pub path: DecodePath,
    /// Detector confidence when detection ran
    pub confidence: Option<f32>,
}

/// Guess the encoding of `bytes`.
pub fn detect(bytes: &[u8]) -> Detection {
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let (encoding, reliable) = detector.guess_assess(None, true);

    let base = if reliable { ASSESSED_CONFIDENCE } else { UNASSESSED_CONFIDENCE };
    let clean = clean_fraction(encoding, bytes);

    Detection { encoding, confidence: base * clean }
}

/// Decode a request body: UTF-8 first, then detection, then lossy UTF-8.
pub fn decode_body(bytes: &[u8], min_confidence: f32) -> DecodedText<'_> {
    let without_bom = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    if let Ok(text) = std::str::from_utf8(without_bom) {
        return DecodedText { text: Cow::Borrowed(text), path: DecodePath::Utf8, confidence: None };
    }

    let detection = detect(bytes);
    if detection.confidence > min_confidence && detection.encoding != UTF_8 {
        let (text, _, _) = detection.encoding.decode(bytes);
        return DecodedText {
            text,
            path: DecodePath::Detected(detection.encoding.name()),
            confidence: Some(detection.confidence),
        };
    }

    DecodedText {
        text: String::from_utf8_lossy(bytes),
        path: DecodePath::LossyUtf8,
        confidence: Some(detection.confidence),
    }
}

/// Fraction of decoded characters that are not U+FFFD
fn clean_fraction(encoding: &'static Encoding, bytes: &[u8]) -> f32 {
    let (text, _, had_errors) = encoding.decode(bytes);
    if !had_errors {
        return 1.0;
    }
    let total = text.chars().count();
    if total == 0 {
        return 0.0;
    }
    let replaced = text.chars().filter(|&c| c == '\u{FFFD}').count();
    (total - replaced) as f32 / total as f32
}
