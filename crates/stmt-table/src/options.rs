use std::collections::BTreeSet;
use std::str::FromStr;
use std::time::Duration;

use crate::noise::NoiseRules;
use crate::normalize::DEFAULT_WITHDRAWAL_KEYWORDS;

pub const DEFAULT_EXTRACTION_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSelection {
    pages: BTreeSet<u32>,
}

impl PageSelection {
    #[must_use]
    pub fn contains(&self, page: u32) -> bool {
        self.pages.contains(&page)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl FromStr for PageSelection {
    type Err = String;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let mut pages = BTreeSet::new();
        for token in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if let Some((start, end)) = token.split_once('-') {
                let start: u32 = start
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid page range start: '{start}'"))?;
                let end: u32 = end
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid page range end: '{end}'"))?;
                if start == 0 || end == 0 {
                    return Err("pages are 1-based".to_string());
                }
                if end < start {
                    return Err(format!(
                        "invalid range '{token}': end is smaller than start"
                    ));
                }
                pages.extend(start..=end);
            } else {
                let page: u32 = token
                    .parse()
                    .map_err(|_| format!("invalid page number: '{token}'"))?;
                if page == 0 {
                    return Err("pages are 1-based".to_string());
                }
                pages.insert(page);
            }
        }

        if pages.is_empty() {
            return Err("page selection cannot be empty".to_string());
        }

        Ok(Self { pages })
    }
}

/// What a boilerplate line does to a description waiting for its amount line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NoiseLinePolicy {
    #[default]
    KeepPending,
    ClearPending,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
    /// Single-sheet workbook (`Sheet1`) with the CSV header row.
    Xlsx,
}

impl OutputFormat {
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv; charset=utf-8",
            Self::Json => "application/json; charset=utf-8",
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Xlsx => "xlsx",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "xlsx" => Ok(Self::Xlsx),
            other => Err(format!(
                "unsupported output format '{other}', expected csv, json or xlsx"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractOptions {
    pub pages: Option<PageSelection>,
    pub delimiter: u8,
    pub min_cols: usize,
    pub noise: NoiseRules,
    pub withdrawal_keywords: Vec<String>,
    pub noise_line_policy: NoiseLinePolicy,
    /// Upper bound for each extraction collaborator; `None` waits forever.
    pub extraction_timeout: Option<Duration>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            pages: None,
            delimiter: b',',
            min_cols: 2,
            noise: NoiseRules::default(),
            withdrawal_keywords: DEFAULT_WITHDRAWAL_KEYWORDS
                .iter()
                .map(|keyword| (*keyword).to_string())
                .collect(),
            noise_line_policy: NoiseLinePolicy::default(),
            extraction_timeout: Some(DEFAULT_EXTRACTION_TIMEOUT),
        }
    }
}

impl ExtractOptions {
    /// Replaces the withdrawal keywords, upper-casing them and skipping blanks.
    #[must_use]
    pub fn with_withdrawal_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.withdrawal_keywords = keywords
            .into_iter()
            .map(|keyword| keyword.as_ref().trim().to_uppercase())
            .filter(|keyword| !keyword.is_empty())
            .collect();
        self
    }

    pub(crate) fn validate(&self) -> Result<(), crate::ExtractError> {
        if self.min_cols < 2 {
            return Err(crate::ExtractError::InvalidOption(
                "min_cols must be at least 2".to_string(),
            ));
        }
        if !self.delimiter.is_ascii() {
            return Err(crate::ExtractError::InvalidOption(
                "delimiter must be a single ASCII character".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ExtractOptions, OutputFormat, PageSelection};
    use std::str::FromStr;

    #[test]
    fn parse_page_selection_range_and_single() {
        let selection = PageSelection::from_str("1-3,5").expect("selection should parse");
        assert!(selection.contains(1));
        assert!(selection.contains(2));
        assert!(selection.contains(3));
        assert!(selection.contains(5));
        assert!(!selection.contains(4));
    }

    #[test]
    fn reject_invalid_page_selection() {
        let err = PageSelection::from_str("3-1").expect_err("invalid range should fail");
        assert!(err.contains("invalid range"));
        assert!(PageSelection::from_str("0").is_err());
    }

    #[test]
    fn parse_output_format() {
        assert_eq!(OutputFormat::from_str(" JSON ").expect("json"), OutputFormat::Json);
        assert_eq!(OutputFormat::from_str("xlsx").expect("xlsx"), OutputFormat::Xlsx);
        assert!(OutputFormat::from_str("ods").is_err());
    }

    #[test]
    fn withdrawal_keywords_are_upper_cased() {
        let options = ExtractOptions::default().with_withdrawal_keywords(["pos ", "", "fee"]);
        assert_eq!(options.withdrawal_keywords, vec!["POS", "FEE"]);
    }

    #[test]
    fn rejects_too_few_columns() {
        let options = ExtractOptions {
            min_cols: 1,
            ..ExtractOptions::default()
        };
        assert!(options.validate().is_err());
    }
}
