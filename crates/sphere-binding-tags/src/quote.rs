//! Go double-quoted string literals (`strconv.Quote` / `strconv.Unquote`).

use std::fmt::Write as _;

/// Quote `s` as a Go interpreted string literal, surrounding quotes included.
pub fn go_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{07}' => out.push_str("\\a"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0b}' => out.push_str("\\v"),
            c if is_go_printable(c) => out.push(c),
            c if (c as u32) < 0x80 => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c if (c as u32) < 0x10000 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => {
                let _ = write!(out, "\\U{:08x}", c as u32);
            }
        }
    }
    out.push('"');
    out
}

/// Go's `strconv.IsPrint`: graphic characters plus the ASCII space. Controls
/// and separators are caught by `char` predicates; format and private-use
/// characters come from the tables below.
fn is_go_printable(c: char) -> bool {
    if c == ' ' {
        return true;
    }
    if c.is_control() || c.is_whitespace() {
        return false;
    }
    let cp = c as u32;
    !in_ranges(cp, FORMAT) && !in_ranges(cp, PRIVATE_USE) && cp & 0xfffe != 0xfffe
}

fn in_ranges(cp: u32, ranges: &[(u32, u32)]) -> bool {
    ranges
        .binary_search_by(|&(lo, hi)| {
            if hi < cp {
                std::cmp::Ordering::Less
            } else if lo > cp {
                std::cmp::Ordering::Greater
            } else {
                std::cmp::Ordering::Equal
            }
        })
        .is_ok()
}

/// Unicode `Cf`, inclusive ranges.
const FORMAT: &[(u32, u32)] = &[
    (0x00ad, 0x00ad),
    (0x0600, 0x0605),
    (0x061c, 0x061c),
    (0x06dd, 0x06dd),
    (0x070f, 0x070f),
    (0x0890, 0x0891),
    (0x08e2, 0x08e2),
    (0x180e, 0x180e),
    (0x200b, 0x200f),
    (0x202a, 0x202e),
    (0x2060, 0x2064),
    (0x2066, 0x206f),
    (0xfeff, 0xfeff),
    (0xfff9, 0xfffb),
    (0x110bd, 0x110bd),
    (0x110cd, 0x110cd),
    (0x13430, 0x1343f),
    (0x1bca0, 0x1bca3),
    (0x1d173, 0x1d17a),
    (0xe0001, 0xe0001),
    (0xe0020, 0xe007f),
];

/// Unicode `Co`, inclusive ranges.
const PRIVATE_USE: &[(u32, u32)] = &[
    (0xe000, 0xf8ff),
    (0xf0000, 0xffffd),
    (0x100000, 0x10fffd),
];

/// Unquote a Go interpreted string literal (including its surrounding quotes).
///
/// Returns `None` on any syntax error, mirroring `strconv.Unquote`'s `ErrSyntax`,
/// and when byte escapes spell invalid UTF-8; see [`go_unquote_bytes`].
pub fn go_unquote(literal: &str) -> Option<String> {
    String::from_utf8(go_unquote_bytes(literal)?).ok()
}

/// Like [`go_unquote`], but byte escapes such as `\xff` may leave the result
/// outside UTF-8, as Go strings allow.
pub fn go_unquote_bytes(literal: &str) -> Option<Vec<u8>> {
    let inner = literal.strip_prefix('"')?.strip_suffix('"')?;
    if inner.contains('\n') {
        return None;
    }

    let mut bytes: Vec<u8> = Vec::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => return None,
            '\\' => {
                let esc = chars.next()?;
                match esc {
                    'a' => bytes.push(0x07),
                    'b' => bytes.push(0x08),
                    'f' => bytes.push(0x0c),
                    'n' => bytes.push(b'\n'),
                    'r' => bytes.push(b'\r'),
                    't' => bytes.push(b'\t'),
                    'v' => bytes.push(0x0b),
                    '\\' => bytes.push(b'\\'),
                    '"' => bytes.push(b'"'),
                    'x' => bytes.push(take_radix(&mut chars, 2, 16)? as u8),
                    '0'..='7' => {
                        let rest = take_radix(&mut chars, 2, 8)?;
                        let value = (esc as u32 - '0' as u32) * 64 + rest;
                        if value > 0xff {
                            return None;
                        }
                        bytes.push(value as u8);
                    }
                    'u' => push_char(&mut bytes, char::from_u32(take_radix(&mut chars, 4, 16)?)?),
                    'U' => push_char(&mut bytes, char::from_u32(take_radix(&mut chars, 8, 16)?)?),
                    _ => return None,
                }
            }
            c => push_char(&mut bytes, c),
        }
    }
    Some(bytes)
}

fn push_char(bytes: &mut Vec<u8>, c: char) {
    let mut buf = [0u8; 4];
    bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
}

fn take_radix(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    digits: usize,
    radix: u32,
) -> Option<u32> {
    let mut value = 0u32;
    for _ in 0..digits {
        let d = chars.next()?.to_digit(radix)?;
        value = value * radix + d;
    }
    Some(value)
}
