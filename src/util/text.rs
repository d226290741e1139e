use std::borrow::Cow;

/// Named entities decoded before tags are removed, in decode order.
const ENTITIES: [(&str, &str); 4] = [("&nbsp;", " "), ("&amp;", "&"), ("&lt;", "<"), ("&gt;", ">")];

/// Reduce an HTML fragment (a feed item description) to plain text.
///
/// 1. Decodes `&nbsp;`, `&amp;`, `&lt;` and `&gt;`.
/// 2. Drops every `<...>` span. A `<` with no closing `>` hides the rest of
///    the input, and a stray `>` is dropped.
/// 3. Collapses whitespace runs to one space and trims both ends.
///
/// Entities are decoded first, so an escaped tag such as `&lt;b&gt;` is
/// removed like a real one.
///
/// # Examples
///
/// ```
/// use gator::util::strip_markup;
///
/// assert_eq!(strip_markup("<p>Hello &amp; <b>world</b></p>"), "Hello & world");
/// assert_eq!(strip_markup("plain"), "plain");
/// assert_eq!(strip_markup("<unterminated"), "");
/// ```
pub fn strip_markup(html: &str) -> String {
    let mut text = Cow::Borrowed(html);
    for (entity, replacement) in ENTITIES {
        if text.contains(entity) {
            text = Cow::Owned(text.replace(entity, replacement));
        }
    }

    let mut visible = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => visible.push(c),
            _ => {}
        }
    }

    visible.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// SEC-001: Remove terminal control characters and ANSI escape sequences.
///
/// Feed titles and descriptions are printed straight to the terminal, so a
/// hostile feed could otherwise recolor output, move the cursor or retitle the
/// window. Tab, newline and carriage return survive; CSI (`ESC [`) and OSC
/// (`ESC ]`, ended by BEL or `ESC \\`) sequences are removed whole.
///
/// Returns `Cow::Borrowed` when there is nothing to strip.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    if !s.bytes().any(is_unsafe_byte) {
        return Cow::Borrowed(s);
    }

    let bytes = s.as_bytes();
    let len = bytes.len();
    let mut out = String::with_capacity(len);
    let mut i = 0;

    while i < len {
        match bytes[i] {
            0x1b if bytes.get(i + 1) == Some(&b'[') => {
                // CSI: parameters run until a final byte in 0x40..=0x7e
                i += 2;
                while i < len {
                    i += 1;
                    if (0x40..=0x7e).contains(&bytes[i - 1]) {
                        break;
                    }
                }
            }
            0x1b if bytes.get(i + 1) == Some(&b']') => {
                // OSC: runs until BEL or ST
                i += 2;
                while i < len {
                    if bytes[i] == 0x07 {
                        i += 1;
                        break;
                    }
                    if bytes[i] == 0x1b && bytes.get(i + 1) == Some(&b'\\') {
                        i += 2;
                        break;
                    }
                    i += 1;
                }
            }
            b if is_unsafe_byte(b) => i += 1,
            _ => {
                let start = i;
                while i < len && !is_unsafe_byte(bytes[i]) {
                    i += 1;
                }
                // Only ASCII bytes end a run, so the slice is on char boundaries
                out.push_str(&s[start..i]);
            }
        }
    }

    Cow::Owned(out)
}

fn is_unsafe_byte(b: u8) -> bool {
    b == 0x1b || b == 0x7f || (b < 0x20 && b != b'\t' && b != b'\n' && b != b'\r')
}
