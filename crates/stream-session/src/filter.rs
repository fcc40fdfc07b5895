//! Keyword filter for the stream subscription.

use thiserror::Error;

/// Rejected keyword list.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("keyword list is empty")]
    Empty,

    #[error("keyword {index} is empty")]
    EmptyKeyword { index: usize },
}

/// Ordered list of track keywords.
///
/// Order, case, and duplicates are preserved exactly as given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSpec {
    keywords: Vec<String>,
}

impl FilterSpec {
    pub fn new<I, S>(keywords: I) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keywords: Vec<String> = keywords.into_iter().map(Into::into).collect();
        if keywords.is_empty() {
            return Err(FilterError::Empty);
        }
        if let Some(index) = keywords.iter().position(|k| k.trim().is_empty()) {
            return Err(FilterError::EmptyKeyword { index });
        }
        Ok(Self { keywords })
    }

    /// Parse a comma-separated keyword list, e.g. `rust,tokio,Async IO`.
    pub fn parse(list: &str) -> Result<Self, FilterError> {
        if list.trim().is_empty() {
            return Err(FilterError::Empty);
        }
        Self::new(list.split(','))
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Value of the `track` request parameter.
    pub fn track_param(&self) -> String {
        self.keywords.join(",")
    }
}
