use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::PrError;

/// Field names produced by the reference matcher.
pub const FIELD_PROJECT: &str = "project";
pub const FIELD_REPO: &str = "repo";
pub const FIELD_NUMBER: &str = "number";

/// Named fields extracted from chat text (or passed in by a template call).
///
/// Values stay strings until a typed accessor is asked for them, so a
/// template can hand over `"42"` exactly like the matcher does.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchResult {
    fields: BTreeMap<String, String>,
}

impl MatchResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &str, value: impl Into<String>) -> Self {
        self.fields.insert(field.to_string(), value.into());
        self
    }

    /// Returns the raw value of a field, or `None` when it is absent.
    pub fn get_string(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Parses a field as an unsigned integer.
    pub fn get_int(&self, field: &str) -> Result<u64, PrError> {
        let raw = self
            .get_string(field)
            .ok_or_else(|| PrError::InvalidReference(format!("missing field `{}`", field)))?;
        raw.trim().parse::<u64>().map_err(|_| {
            PrError::InvalidReference(format!("field `{}` is not a number: {:?}", field, raw))
        })
    }
}

/// A validated pointer to one pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRef {
    pub project: String,
    pub repo: String,
    pub number: u64,
}

impl fmt::Display for PullRequestRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.project, self.repo, self.number)
    }
}

impl TryFrom<&MatchResult> for PullRequestRef {
    type Error = PrError;

    fn try_from(m: &MatchResult) -> Result<Self, Self::Error> {
        let non_empty = |field: &str| -> Result<String, PrError> {
            match m.get_string(field).map(str::trim) {
                Some(value) if !value.is_empty() => Ok(value.to_string()),
                _ => Err(PrError::InvalidReference(format!(
                    "missing field `{}`",
                    field
                ))),
            }
        };

        Ok(PullRequestRef {
            project: non_empty(FIELD_PROJECT)?,
            repo: non_empty(FIELD_REPO)?,
            number: m.get_int(FIELD_NUMBER)?,
        })
    }
}

/// Verdict recorded by a single review, as reported by GitHub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewState {
    Commented,
    Approved,
    ChangesRequested,
    Dismissed,
    Pending,
    /// Anything GitHub adds later. Counts as a real review.
    #[serde(other)]
    Unknown,
}

/// One entry of the review list. Only the state is consumed.
#[derive(Debug, Clone, Deserialize)]
pub struct Review {
    pub state: ReviewState,
}

#[cfg(test)]
impl Review {
    pub fn new(state: ReviewState) -> Self {
        Self { state }
    }
}

/// Summary handed to the message template.
///
/// Serialized with camelCase names so templates read `pr.inReview`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    /// Pull request title
    pub name: String,
    pub merged: bool,
    /// Never derived from reviews; always false for GitHub.
    pub declined: bool,
    pub approved: bool,
    pub in_review: bool,
}

/// Single-word classification of a [`PullRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewStatus {
    Merged,
    Declined,
    Approved,
    InReview,
    NoReview,
}

impl PullRequest {
    /// Collapses the flags, strongest signal first.
    pub fn status(&self) -> ReviewStatus {
        if self.merged {
            ReviewStatus::Merged
        } else if self.declined {
            ReviewStatus::Declined
        } else if self.approved {
            ReviewStatus::Approved
        } else if self.in_review {
            ReviewStatus::InReview
        } else {
            ReviewStatus::NoReview
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewStatus::Merged => write!(f, "merged"),
            ReviewStatus::Declined => write!(f, "declined"),
            ReviewStatus::Approved => write!(f, "approved"),
            ReviewStatus::InReview => write!(f, "in review"),
            ReviewStatus::NoReview => write!(f, "none"),
        }
    }
}
