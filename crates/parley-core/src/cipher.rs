//! Additive substitution codec for Parley.
//!
//! Shifts alphabetic characters within their case's 26-letter alphabet;
//! everything else (digits, punctuation, the frame delimiter, whitespace)
//! passes through unchanged. The same routine obscures chat bodies on the
//! wire and stored credential secrets.
//!
//! This is obfuscation, NOT cryptography. The shift is a fixed, publicly
//! guessable constant and the codec provides no confidentiality or
//! authenticity whatsoever. Do not treat it as a security boundary.

/// The shift applied when the configuration does not say otherwise.
pub const DEFAULT_SHIFT: u8 = 3;

/// Encode `text` by rotating each letter forward `shift` positions.
///
/// Total over its input domain — there is no error path. Non-alphabetic
/// characters, including multi-byte UTF-8, are passed through unchanged.
pub fn encode(text: &str, shift: u8) -> String {
    rotate(text, shift % 26)
}

/// Decode text produced by [`encode`] with the same `shift`.
///
/// `decode(encode(s, k), k) == s` for all inputs.
pub fn decode(text: &str, shift: u8) -> String {
    rotate(text, 26 - (shift % 26))
}

fn rotate(text: &str, shift: u8) -> String {
    text.chars()
        .map(|c| match c {
            'a'..='z' => (b'a' + (c as u8 - b'a' + shift) % 26) as char,
            'A'..='Z' => (b'A' + (c as u8 - b'A' + shift) % 26) as char,
            other => other,
        })
        .collect()
}
