//! Collapsing of double-escaped entity references.
//!
//! Attribute values edited in the live tree sometimes arrive already
//! entity-encoded (`&amp;` typed into a field), and serializing them escapes
//! the ampersand a second time. `&amp;lt;` is turned back into `&lt;`, and so
//! on, until no double escape remains.

/// Longest entity name we are willing to recognise
const MAX_ENTITY_LEN: usize = 32;

pub fn collapse_double_escapes(input: &str) -> String {
    let mut current = input.to_string();
    loop {
        let next = collapse_once(&current);
        if next == current {
            return next;
        }
        current = next;
    }
}

fn collapse_once(input: &str) -> String {
    const DOUBLE: &str = "&amp;";
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find(DOUBLE) {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + DOUBLE.len()..];
        match entity_len(after) {
            Some(len) => {
                out.push('&');
                out.push_str(&after[..len]);
                rest = &after[len..];
            }
            None => {
                out.push_str(DOUBLE);
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Length of an entity body (`name;`, `#123;`, `#x1F;`) at the start of `s`
fn entity_len(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let (start, valid): (usize, fn(u8) -> bool) = match bytes {
        [b'#', b'x' | b'X', ..] => (2, |b: u8| b.is_ascii_hexdigit()),
        [b'#', ..] => (1, |b: u8| b.is_ascii_digit()),
        _ => (0, |b: u8| b.is_ascii_alphanumeric()),
    };

    let body = bytes[start..]
        .iter()
        .take(MAX_ENTITY_LEN)
        .take_while(|b| valid(**b))
        .count();
    if body == 0 {
        return None;
    }

    let end = start + body;
    (bytes.get(end) == Some(&b';')).then_some(end + 1)
}
