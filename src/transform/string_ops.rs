use std::borrow::Cow;

use regex::Regex;

/// Returns an uppercase representation, avoiding allocation when unnecessary.
pub fn uppercase(input: &str) -> Cow<'_, str> {
    if input.chars().all(|ch| !ch.is_lowercase()) {
        Cow::Borrowed(input)
    } else {
        Cow::Owned(input.to_uppercase())
    }
}

/// Trims leading/trailing whitespace while borrowing the original.
pub fn trim(input: &str) -> Cow<'_, str> {
    Cow::Borrowed(input.trim())
}

/// Keeps at most `length` characters, cutting on character boundaries.
pub fn truncate_chars(value: &str, length: usize) -> Cow<'_, str> {
    match value.char_indices().nth(length) {
        Some((byte_idx, _)) => Cow::Borrowed(&value[..byte_idx]),
        None => Cow::Borrowed(value),
    }
}

/// Left-pads with `0` up to `width` characters. A leading sign stays in front
/// of the padding; values already `width` long or longer are untouched.
pub fn zero_pad(value: &str, width: usize) -> Cow<'_, str> {
    let len = value.chars().count();
    if len >= width {
        return Cow::Borrowed(value);
    }
    let zeros = "0".repeat(width - len);
    let padded = match value.strip_prefix(['-', '+']) {
        Some(rest) => format!("{}{zeros}{rest}", &value[..1]),
        None => format!("{zeros}{value}"),
    };
    Cow::Owned(padded)
}

/// Applies a regex replacement while avoiding allocation when there are no matches.
pub fn regex_replace<'a>(value: &'a str, regex: &Regex, replacement: &str) -> Cow<'a, str> {
    if regex.is_match(value) {
        Cow::Owned(regex.replace_all(value, replacement).into_owned())
    } else {
        Cow::Borrowed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_pad_matches_zfill_semantics() {
        assert_eq!(zero_pad("1234", 5), "01234");
        assert_eq!(zero_pad("12345", 5), "12345");
        assert_eq!(zero_pad("123456", 5), "123456");
        assert_eq!(zero_pad("-12", 5), "-0012");
        assert_eq!(zero_pad("", 5), "00000");
    }

    #[test]
    fn truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("sao paulo", 2), "sa");
        assert_eq!(truncate_chars("é", 2), "é");
        assert_eq!(truncate_chars("çãx", 2), "çã");
    }

    #[test]
    fn uppercase_borrows_when_already_upper() {
        assert!(matches!(uppercase("SP"), Cow::Borrowed(_)));
        assert_eq!(uppercase("sp"), "SP");
    }
}
