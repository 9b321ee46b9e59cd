//! Hex dumps for wire traces

use std::fmt::Write;

/// Space separated upper-case hex: `[0x02, 0x1C, 0x20]` -> `"02 1C 20"`
pub fn format_spaced(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 3);
    for byte in data {
        if !out.is_empty() {
            out.push(' ');
        }
        // Infallible for String
        let _ = write!(out, "{byte:02X}");
    }
    out
}
