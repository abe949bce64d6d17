//! Small parsing helpers shared by the rule loaders and the wrapper layer.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Finds the byte offset right after `::slot` when the slot name is followed by
/// whitespace or the end of the line. `::s` must not match `::script-name`.
fn find_slot(line: &str, slot: &str) -> Option<usize> {
    let marker = format!("::{slot}");
    let mut search_from = 0;
    while let Some(pos) = line[search_from..].find(&marker) {
        let after = search_from + pos + marker.len();
        match line[after..].chars().next() {
            None => return Some(after),
            Some(c) if c.is_whitespace() => return Some(after),
            _ => search_from = after,
        }
    }
    None
}

/// Returns the value of `::slot value` in a double-colon delimited line.
///
/// The value runs up to the next ` ::` or the end of the line. An empty value
/// (a bare flag) yields `None`; use [`has_value_in_double_colon_del_list`] for flags.
pub(crate) fn slot_value_in_double_colon_del_list<'a>(line: &'a str, slot: &str) -> Option<&'a str> {
    let start = find_slot(line, slot)?;
    let rest = &line[start..];
    let end = rest.find(" ::").unwrap_or(rest.len());
    let value = rest[..end].trim();
    if value.is_empty() { None } else { Some(value) }
}

/// Checks whether `::slot` appears in the line, with or without a value.
pub(crate) fn has_value_in_double_colon_del_list(line: &str, slot: &str) -> bool {
    find_slot(line, slot).is_some()
}

/// Strips one pair of surrounding double quotes, so `""` becomes the empty string.
pub(crate) fn dequote_string(s: &str) -> &str {
    let s = s.trim();
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

/// Splits a `,`/`;` separated slot value into trimmed, non-empty parts.
pub(crate) fn split_list(s: &str) -> impl Iterator<Item = &str> {
    s.split([',', ';']).map(str::trim).filter(|part| !part.is_empty())
}

/// Parses `0041-005A,00C0` style code-point ranges (inclusive).
pub(crate) fn parse_hex_ranges(s: &str) -> Result<Vec<(u32, u32)>, String> {
    split_list(s)
        .map(|part| {
            let (lo, hi) = part.split_once('-').unwrap_or((part, part));
            let lo = u32::from_str_radix(lo.trim(), 16)
                .map_err(|e| format!("bad code point '{lo}': {e}"))?;
            let hi = u32::from_str_radix(hi.trim(), 16)
                .map_err(|e| format!("bad code point '{hi}': {e}"))?;
            if lo > hi {
                return Err(format!("empty range {part}"));
            }
            Ok((lo, hi))
        })
        .collect()
}

static UNICODE_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\\u([dD][89abAB][0-9a-fA-F]{2})\\u([dD][c-fC-F][0-9a-fA-F]{2})|\\u\{([0-9a-fA-F]{1,6})\}|\\U([0-9a-fA-F]{8})|\\u([0-9a-fA-F]{4})",
    )
    .unwrap()
});

/// Decodes `\uXXXX`, `\UXXXXXXXX` and `\u{X...}` escapes. UTF-16 surrogate pairs
/// written as two `\u` escapes are combined; anything undecodable is kept verbatim.
pub(crate) fn decode_unicode_escapes(s: &str) -> String {
    UNICODE_ESCAPE
        .replace_all(s, |caps: &Captures<'_>| {
            let hex = |i: usize| caps.get(i).and_then(|m| u32::from_str_radix(m.as_str(), 16).ok());
            let cp = match (hex(1), hex(2)) {
                (Some(high), Some(low)) => Some(0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)),
                _ => hex(3).or_else(|| hex(4)).or_else(|| hex(5)),
            };
            match cp.and_then(char::from_u32) {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}
