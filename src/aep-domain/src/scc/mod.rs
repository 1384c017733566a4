//! Source Classification Code normalization and generalization.
//!
//! SCCs are nominally ten-digit hierarchical codes. Legacy inventory files
//! routinely truncate trailing digits (dropping precision from the
//! process-level down to the sector level), so every lookup against an
//! SCC-keyed table must be prepared to walk from the most specific form down
//! to increasingly general ones.

mod error;
pub use error::SccError;

/// Canonical width of a normalized SCC.
pub const SCC_WIDTH: usize = 10;

/// Zero-pad a raw SCC string to its canonical ten-digit form.
///
/// Padding side depends on input length, mirroring how legacy emission
/// inventories truncate codes from different ends depending on the original
/// field width they were punched into:
/// - len 10: returned unchanged.
/// - len 8, 7, 6, 5, 4, 3, 2: `"00"` is prepended, then the remainder is
///   right-padded with zeros out to ten digits.
/// - len 0: the fully-generic code `"0000000000"`.
/// - any other length is rejected.
pub fn normalize(raw: &str) -> Result<String, SccError> {
    let len = raw.len();
    let normalized = match len {
        10 => raw.to_string(),
        8 | 7 | 6 | 5 | 4 | 3 | 2 => {
            let mut s = String::with_capacity(SCC_WIDTH);
            s.push_str("00");
            s.push_str(raw);
            while s.len() < SCC_WIDTH {
                s.push('0');
            }
            s
        }
        0 => "0".repeat(SCC_WIDTH),
        _ => return Err(SccError::InvalidLength { raw: raw.to_string(), len }),
    };
    debug_assert_eq!(normalized.len(), SCC_WIDTH);
    Ok(normalized)
}

/// Idempotence helper: `normalize(normalize(s)?)? == normalize(s)?` for all valid inputs.
pub fn is_normalized(s: &str) -> bool {
    s.len() == SCC_WIDTH
}

/// Yield `scc`, then successively more general forms, by zeroing trailing
/// digit pairs from the right: `"1234567890"` -> `"1234567800"` ->
/// `"1234560000"` -> ... -> `"0000000000"`.
///
/// Used by the reference-lookup fallback algorithm (gsref/tref matching):
/// the first generalization that hits in a table is the most specific
/// surviving match.
pub fn generalizations(scc: &str) -> impl Iterator<Item = String> + '_ {
    debug_assert!(is_normalized(scc), "generalizations() expects an already-normalized SCC");
    let bytes = scc.as_bytes().to_vec();
    (0..=bytes.len() / 2).map(move |step| {
        let zeroed = step * 2;
        let mut generalized = bytes.clone();
        for b in generalized.iter_mut().skip(bytes.len().saturating_sub(zeroed)) {
            *b = b'0';
        }
        String::from_utf8(generalized).expect("SCC bytes are always ASCII digits")
    })
}
