//! Shared numeric formatting for text-based outputs

/// Fixed-precision decimal, with negative zero normalised to positive.
pub fn fixed(value: f64, decimals: usize) -> String {
    let s = format!("{value:.decimals$}");
    match s.strip_prefix('-') {
        Some(rest) if rest.bytes().all(|b| b == b'0' || b == b'.') => rest.to_string(),
        _ => s,
    }
}

/// Shortest representation that parses back to the same `f64`.
pub fn round_trip(value: f64) -> String {
    if value == 0.0 {
        // avoid "-0"
        return "0".to_string();
    }
    format!("{value}")
}

/// Row-major 3x4 affine matrix as used by `transform` attributes: the identity.
pub const IDENTITY_3X4: &str = "1 0 0 0 1 0 0 0 1 0 0 0";

/// Column-major 4x4 identity, as slicer part metadata expects.
pub const IDENTITY_4X4: &str = "1 0 0 0 0 1 0 0 0 0 1 0 0 0 0 1";

/// Deterministic UUID-shaped identifier: a zero-padded counter plus a fixed tail.
///
/// Only unique within one package, which is all the package needs.
pub fn counter_uuid(counter: usize, suffix: &str) -> String {
    format!("{counter:08x}{suffix}")
}
