//! Thread reference normalization and day-marker scanning.
//!
//! A thread reference may arrive as a bare numeric status ID or as a full
//! x.com / twitter.com status URL (with or without a query string). It is
//! always reduced to the bare ID before storage or any remote call.

use crate::error::Error;

const STATUS_SEGMENT: &str = "/status/";
const KNOWN_DOMAINS: [&str; 2] = ["x.com", "twitter.com"];

/// Reduce `input` to a bare status ID.
///
/// Accepted forms:
/// - `1234567890`
/// - `https://x.com/user/status/1234567890`
/// - `https://twitter.com/user/status/1234567890?s=20`
pub fn normalize_thread_ref(input: &str) -> Result<String, Error> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::Validation("thread reference cannot be empty".into()));
    }

    if is_all_digits(input) {
        return Ok(input.to_string());
    }

    if KNOWN_DOMAINS.iter().any(|d| input.contains(d)) {
        if let Some(idx) = input.find(STATUS_SEGMENT) {
            let rest = &input[idx + STATUS_SEGMENT.len()..];
            let id: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
            if !id.is_empty() {
                return Ok(id);
            }
        }
    }

    Err(Error::Validation(format!(
        "could not extract a status ID from '{input}'"
    )))
}

/// Scan text for a `Day <number>` marker (case-insensitive, whitespace
/// between the word and the number). Returns the first marker found, like
/// the posting template produces.
pub fn extract_day(text: &str) -> Option<u32> {
    let lower = text.to_lowercase();
    let bytes = lower.as_bytes();
    let mut start = 0;
    while let Some(pos) = lower[start..].find("day") {
        let after = start + pos + 3;
        let rest = &bytes[after.min(bytes.len())..];
        let ws_len = rest.iter().take_while(|b| b.is_ascii_whitespace()).count();
        if ws_len > 0 {
            let digits: &[u8] = &rest[ws_len..];
            let digit_len = digits.iter().take_while(|b| b.is_ascii_digit()).count();
            if digit_len > 0 {
                if let Ok(day) = std::str::from_utf8(&digits[..digit_len])
                    .unwrap_or("")
                    .parse::<u32>()
                {
                    return Some(day);
                }
            }
        }
        start = after;
    }
    None
}

fn is_all_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}
