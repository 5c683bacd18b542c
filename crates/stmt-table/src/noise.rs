//! Classification of statement boilerplate (headers, footers, account
//! metadata) that must never become a transaction.

use crate::tokens::is_amount;

/// Boilerplate fragments of the supported statement template. Matched as
/// substrings of the upper-cased, whitespace-collapsed description.
pub const DEFAULT_NOISE_PHRASES: &[&str] = &[
    "STATEMENT OF ACCOUNT",
    "STATEMENT PERIOD",
    "ACCOUNT NUMBER",
    "ACCOUNT SUMMARY",
    "BRANCH TRANSIT",
    "DESCRIPTION",
    "CHEQUE/DEBIT",
    "DEPOSIT/CREDIT",
    "BALANCE FORWARD",
    "OPENING BALANCE",
    "CLOSING BALANCE",
    "MONTHLY",
    "NEXT STATEMENT",
    "DEP CONTENT",
    "ITEMS",
    "UNC BATCH",
    "CREDITS",
    "DEBITS",
    "NO.",
    "AMOUNT",
    "AVER.",
    "MIN.",
    "CUSTOMER SERVICE",
    "TELEPHONE BANKING",
    "1-800-",
    "P.O. BOX",
    "0028209",
];

const MIN_DESCRIPTION_CHARS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoiseRules {
    phrases: Vec<String>,
}

impl Default for NoiseRules {
    fn default() -> Self {
        Self::with_phrases(DEFAULT_NOISE_PHRASES.iter().copied())
    }
}

impl NoiseRules {
    /// Rules with no boilerplate phrases; the length and numeric-only checks
    /// still apply.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            phrases: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_phrases<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut rules = Self::empty();
        rules.extend(phrases);
        rules
    }

    pub fn extend<I, S>(&mut self, phrases: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for phrase in phrases {
            let phrase = crate::normalize::normalize_description(phrase.as_ref());
            if !phrase.is_empty() && !self.phrases.contains(&phrase) {
                self.phrases.push(phrase);
            }
        }
    }

    /// Parses a phrase list with one phrase per line. Blank lines and lines
    /// starting with `#` are ignored.
    #[must_use]
    pub fn parse_phrase_list(text: &str) -> Vec<String> {
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect()
    }

    #[must_use]
    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    /// `description_upper` must already be upper-cased and whitespace-collapsed.
    #[must_use]
    pub fn is_noise(&self, description_upper: &str) -> bool {
        if self
            .phrases
            .iter()
            .any(|phrase| description_upper.contains(phrase.as_str()))
        {
            return true;
        }

        if description_upper.chars().count() < MIN_DESCRIPTION_CHARS
            && !is_amount(description_upper)
        {
            return true;
        }

        description_upper
            .chars()
            .all(|ch| ch.is_ascii_digit() || matches!(ch, ' ' | '.' | ',' | '-'))
    }
}
