//! Recognizers for the two value shapes a statement row carries: decimal
//! amounts and `MONnn` date tokens.

use std::fmt::{Display, Formatter};
use std::sync::LazyLock;

use regex::Regex;

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{1,3}(?:[, ]\d{3})+\.\d{2}|\d+\.\d{2}").expect("hardcoded amount regex is valid")
});

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:^|[^A-Z])(?P<month>JAN|FEB|MAR|APR|MAY|JUN|JUL|AUG|SEP|OCT|NOV|DEC)\.?\s*(?P<day>\d{1,2})(?:[^0-9]|$)",
    )
    .expect("hardcoded date regex is valid")
});

/// Byte span of a recognized token inside the text it was found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMatch<T> {
    pub start: usize,
    pub end: usize,
    pub value: T,
}

/// Finds the first amount that is not glued to another digit on either side,
/// so a reference number in front of the amount is never read into it. The
/// returned value has thousands separators removed (`"2,500.00"` becomes
/// `"2500.00"`).
#[must_use]
pub fn find_amount(text: &str) -> Option<TokenMatch<String>> {
    let mut from = 0;
    while let Some(found) = AMOUNT_RE.find_at(text, from) {
        let digit_before = text[..found.start()]
            .chars()
            .next_back()
            .is_some_and(|ch| ch.is_ascii_digit());
        let digit_after = text[found.end()..]
            .chars()
            .next()
            .is_some_and(|ch| ch.is_ascii_digit());
        if !digit_before && !digit_after {
            return Some(TokenMatch {
                start: found.start(),
                end: found.end(),
                value: found
                    .as_str()
                    .chars()
                    .filter(|ch| !matches!(ch, ' ' | ','))
                    .collect(),
            });
        }
        // Matches start on an ASCII digit, so one byte on is a char boundary.
        from = found.start() + 1;
    }
    None
}

#[must_use]
pub fn extract_amount(text: &str) -> Option<String> {
    find_amount(text).map(|found| found.value)
}

#[must_use]
pub fn is_amount(text: &str) -> bool {
    find_amount(text).is_some()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateToken {
    pub month: &'static str,
    pub day: u8,
}

impl DateToken {
    /// Accepts any casing of a three-letter month abbreviation and a day in
    /// `1..=31`.
    #[must_use]
    pub fn new(month: &str, day: u8) -> Option<Self> {
        let month = MONTHS
            .iter()
            .copied()
            .find(|candidate| candidate.eq_ignore_ascii_case(month))?;
        (1..=31).contains(&day).then_some(Self { month, day })
    }

    #[must_use]
    pub fn canonical(&self) -> String {
        self.to_string()
    }
}

impl Display for DateToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{:02}", self.month, self.day)
    }
}

/// Finds the first valid date token; the span covers the month through the
/// last day digit.
#[must_use]
pub fn find_date_token(text: &str) -> Option<TokenMatch<DateToken>> {
    DATE_RE.captures_iter(text).find_map(|captures| {
        let month = captures.name("month")?;
        let day = captures.name("day")?;
        let token = DateToken::new(month.as_str(), day.as_str().parse().ok()?)?;
        Some(TokenMatch {
            start: month.start(),
            end: day.end(),
            value: token,
        })
    })
}

#[must_use]
pub fn parse_date_token(text: &str) -> Option<String> {
    find_date_token(text).map(|found| found.value.canonical())
}

/// `true` when the whole (trimmed) text is nothing but a date token.
#[must_use]
pub fn is_bare_date_token(text: &str) -> bool {
    let trimmed = text.trim();
    find_date_token(trimmed).is_some_and(|found| found.start == 0 && found.end == trimmed.len())
}
