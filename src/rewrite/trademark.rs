//! The ™ text transform.

use std::borrow::Cow;
use std::fmt::Display;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Glyph appended after every six-letter word.
pub const TRADEMARK: char = '™';

/// Exactly six ASCII letters with a word boundary on both sides.
///
/// `\b` is Unicode-aware, so a run glued to a digit, underscore or
/// non-ASCII letter is not a word of its own and is left alone.
static SIX_LETTER_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z]{6}\b").expect("static regex"));

/// Character references are copied through untouched so `&middot;` never
/// turns into `&middot™;`.
static CHAR_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(?:[A-Za-z][A-Za-z0-9]*|#[0-9]+|#[xX][0-9A-Fa-f]+);").expect("static regex")
});

/// Append ™ after every word made of exactly six ASCII letters.
///
/// ```
/// use hn_proxy::rewrite::add_trademark;
///
/// assert_eq!(add_trademark("The visual report"), "The visual™ report™");
/// ```
///
/// Not idempotent: ™ is not a word character, so a second pass marks the
/// same words again.
pub fn add_trademark(text: &str) -> Cow<'_, str> {
    SIX_LETTER_WORD.replace_all(text, |caps: &Captures| format!("{}{TRADEMARK}", &caps[0]))
}

/// [`add_trademark`] for values that may be absent or are not strings.
///
/// `None` yields an empty string; anything else is formatted first.
pub fn add_trademark_to<T: Display>(value: Option<T>) -> String {
    match value {
        Some(value) => add_trademark(&value.to_string()).into_owned(),
        None => String::new(),
    }
}

/// Apply [`add_trademark`] to raw HTML text, skipping character references.
pub(crate) fn add_trademark_raw(raw: &str) -> Cow<'_, str> {
    if !raw.contains('&') {
        return add_trademark(raw);
    }

    let mut out = String::with_capacity(raw.len() + 16);
    let mut last = 0;
    for reference in CHAR_REFERENCE.find_iter(raw) {
        out.push_str(&add_trademark(&raw[last..reference.start()]));
        out.push_str(reference.as_str());
        last = reference.end();
    }
    out.push_str(&add_trademark(&raw[last..]));

    if out == raw {
        Cow::Borrowed(raw)
    } else {
        Cow::Owned(out)
    }
}
