use std::borrow::Cow;

fn is_cased(c: char) -> bool {
    c.is_uppercase() || c.is_lowercase()
}

/// True when `s` has at least one cased character and none of them is lowercase.
///
/// ```
/// use fullfeed::util::is_upper;
///
/// assert!(is_upper("BREAKING NEWS 2024"));
/// assert!(!is_upper("Breaking news"));
/// assert!(!is_upper("2024 !!"));
/// ```
pub fn is_upper(s: &str) -> bool {
    s.chars().any(is_cased) && !s.chars().any(char::is_lowercase)
}

/// Title-cases `s`: a cased character following an uncased one is
/// uppercased, every other cased character is lowercased.
///
/// Word boundaries are anything uncased, so `"IT'S 1ST"` becomes `"It'S 1St"`.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut previous_cased = false;

    for c in s.chars() {
        if previous_cased {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        previous_cased = is_cased(c);
    }

    out
}

/// Removes characters that are not allowed in XML 1.0 text: C0 controls other
/// than tab, newline and carriage return, plus DEL.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    let is_forbidden = |c: char| c == '\u{7f}' || (c < ' ' && !matches!(c, '\t' | '\n' | '\r'));

    if !s.chars().any(is_forbidden) {
        return Cow::Borrowed(s);
    }
    Cow::Owned(s.chars().filter(|&c| !is_forbidden(c)).collect())
}
