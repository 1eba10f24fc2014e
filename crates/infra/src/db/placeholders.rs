//! Placeholder rewriting for engines with ordinal parameters.

use std::borrow::Cow;

/// Rewrite `?` placeholders to `$1, $2, …` in order of appearance.
///
/// `?` is left untouched inside single-quoted literals, double-quoted
/// identifiers, `--` line comments, `/* */` block comments (which nest) and
/// dollar-quoted bodies (`$$ … $$`, `$tag$ … $tag$`). Returns the input
/// unchanged when it has no placeholder.
pub fn to_ordinal(sql: &str) -> Cow<'_, str> {
    if !sql.contains('?') {
        return Cow::Borrowed(sql);
    }

    // Every delimiter is ASCII, so byte offsets are always char boundaries.
    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len() + 8);
    let mut ordinal = 0usize;
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        i = match bytes[i] {
            b'\'' | b'"' => skip_quoted(bytes, i),
            b'-' if bytes.get(i + 1) == Some(&b'-') => skip_line_comment(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'*') => skip_block_comment(bytes, i),
            b'$' => match dollar_tag_len(bytes, i) {
                Some(tag_len) => skip_dollar_quoted(bytes, i, tag_len),
                None => i + 1,
            },
            b'?' => {
                out.push_str(&sql[copied..i]);
                ordinal += 1;
                out.push('$');
                out.push_str(&ordinal.to_string());
                copied = i + 1;
                i + 1
            }
            _ => i + 1,
        };
    }
    out.push_str(&sql[copied..]);

    Cow::Owned(out)
}

/// End of a `'…'` or `"…"` span starting at `start`; a doubled quote is an
/// escaped quote.
fn skip_quoted(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

fn skip_line_comment(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |pos| start + pos + 1)
}

fn skip_block_comment(bytes: &[u8], start: usize) -> usize {
    let mut depth = 1usize;
    let mut i = start + 2;
    while i < bytes.len() {
        match (bytes[i], bytes.get(i + 1)) {
            (b'/', Some(&b'*')) => {
                depth += 1;
                i += 2;
            }
            (b'*', Some(&b'/')) => {
                depth -= 1;
                i += 2;
                if depth == 0 {
                    return i;
                }
            }
            _ => i += 1,
        }
    }
    bytes.len()
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

/// Length of the opening `$tag$` at `start`, if one starts there.
///
/// Tags follow identifier rules, so `$1` is not a tag, and a `$` inside an
/// identifier never opens one.
fn dollar_tag_len(bytes: &[u8], start: usize) -> Option<usize> {
    if start > 0 && is_ident_byte(bytes[start - 1]) {
        return None;
    }
    let mut i = start + 1;
    match bytes.get(i) {
        Some(&b'$') => return Some(2),
        Some(&b) if b.is_ascii_alphabetic() || b == b'_' || b >= 0x80 => i += 1,
        _ => return None,
    }
    while let Some(&b) = bytes.get(i) {
        if b == b'$' {
            return Some(i + 1 - start);
        }
        if !(b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80) {
            return None;
        }
        i += 1;
    }
    None
}

fn skip_dollar_quoted(bytes: &[u8], start: usize, tag_len: usize) -> usize {
    let tag = &bytes[start..start + tag_len];
    let body = start + tag_len;
    bytes[body..]
        .windows(tag_len)
        .position(|w| w == tag)
        .map_or(bytes.len(), |pos| body + pos + tag_len)
}
