//! Removal of non-architectural text. Each stage keeps the line count intact
//! so later diagnostics can still point at document lines.

use once_cell::sync::Lazy;
use regex::Regex;

static INLINE_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`[^`\n]*`").expect("inline code pattern is valid"));

/// All stages in order: fences, HTML comments, inline code spans
pub fn clean(text: &str) -> String {
    let text = strip_fences(text);
    let text = strip_html_comments(&text);
    neutralize_inline_code(&text)
}

/// Blank out ```` ``` ```` and `~~~` fenced blocks, fence lines included.
/// An unclosed fence runs to the end of the document.
pub fn strip_fences(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut open: Option<(char, usize)> = None;

    for line in text.split_inclusive('\n') {
        let trimmed = line.trim_start();
        let fence = fence_of(trimmed);

        match (open, fence) {
            (None, Some(found)) => open = Some(found),
            (Some((ch, len)), Some((found_ch, found_len)))
                if ch == found_ch
                    && found_len >= len
                    && trimmed.trim_end().chars().all(|c| c == ch) =>
            {
                open = None;
            }
            (None, None) => {
                out.push_str(line);
                continue;
            }
            _ => {}
        }
        if line.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

fn fence_of(trimmed: &str) -> Option<(char, usize)> {
    let ch = trimmed.chars().next()?;
    if ch != '`' && ch != '~' {
        return None;
    }
    let len = trimmed.chars().take_while(|&c| c == ch).count();
    (len >= 3).then_some((ch, len))
}

/// Remove `<!-- ... -->` blocks, keeping their newlines. An unclosed comment
/// runs to the end of the document.
pub fn strip_html_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("<!--") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 4..];
        let (comment, remainder) = match after.find("-->") {
            Some(end) => (&after[..end], &after[end + 3..]),
            None => (after, ""),
        };
        out.extend(comment.chars().filter(|&c| c == '\n'));
        rest = remainder;
    }
    out.push_str(rest);
    out
}

/// Drop single-backtick spans so their content never reads as an entry
pub fn neutralize_inline_code(text: &str) -> String {
    INLINE_CODE.replace_all(text, "").into_owned()
}
