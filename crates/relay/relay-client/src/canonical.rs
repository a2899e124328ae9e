//! JSON encoding used for every hashed record.
//!
//! Receiving nodes re-derive proof hashes from their own encoding, so the
//! bytes must match it exactly: compact output, struct fields in declaration
//! order, sorted map keys, and HTML-sensitive characters escaped as `\u00XX`.

use std::io;

use serde::Serialize;
use serde_json::ser::{
    Formatter,
    Serializer,
};

/// Serializes `value` into the canonical byte form.
pub fn to_canonical_vec<T>(value: &T) -> serde_json::Result<Vec<u8>>
where
    T: Serialize + ?Sized,
{
    let mut out = Vec::with_capacity(256);
    let mut serializer = Serializer::with_formatter(&mut out, CanonicalFormatter);
    value.serialize(&mut serializer)?;
    Ok(out)
}

/// Compact formatter that additionally escapes `<`, `>`, `&`, U+2028 and
/// U+2029 inside strings.
struct CanonicalFormatter;

impl Formatter for CanonicalFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (index, ch) in fragment.char_indices() {
            let escaped = match ch {
                '<' => "\\u003c",
                '>' => "\\u003e",
                '&' => "\\u0026",
                '\u{2028}' => "\\u2028",
                '\u{2029}' => "\\u2029",
                _ => continue,
            };
            writer.write_all(fragment[start..index].as_bytes())?;
            writer.write_all(escaped.as_bytes())?;
            start = index + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}
