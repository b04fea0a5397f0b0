pub mod github;
pub mod matcher;
pub mod reviews;
pub mod types;

pub use github::GithubFetcher;
pub use matcher::ReferenceMatcher;
pub use types::{MatchResult, PullRequest, PullRequestRef};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrError {
    #[error("GitHub API request failed: {0}")]
    ApiRequest(#[from] reqwest::Error),

    #[error("Invalid pull request reference: {0}")]
    InvalidReference(String),

    #[error("Pull request lookup was cancelled")]
    Cancelled,

    #[error("Failed to build GitHub client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}
