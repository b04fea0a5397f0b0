use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use super::reviews;
use super::types::{PullRequest, PullRequestRef, Review};
use super::PrError;
use crate::command::{Help, PullRequestFetcher};

const USER_AGENT: &str = concat!("pr-status/", env!("CARGO_PKG_VERSION"));
const GITHUB_JSON: &str = "application/vnd.github+json";

/// Only one page of reviews is read.
pub const REVIEWS_PAGE_SIZE: usize = 100;

/// Template function name the GitHub fetcher is exposed under.
pub const TEMPLATE_FUNCTION: &str = "githubPullRequest";

#[derive(Deserialize)]
struct PullResponse {
    title: String,
    #[serde(default)]
    merged: bool,
}

/// Pull request fetcher backed by the GitHub REST API.
#[derive(Clone)]
pub struct GithubFetcher {
    client: reqwest::Client,
    api_url: String,
    token: String,
}

impl GithubFetcher {
    pub fn new(token: impl Into<String>, api_url: &str) -> Result<Self, PrError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(PrError::ClientBuild)?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn pull_url(&self, reference: &PullRequestRef) -> String {
        format!(
            "{}/repos/{}/{}/pulls/{}",
            self.api_url, reference.project, reference.repo, reference.number
        )
    }

    /// Sends one request, giving up as soon as `cancel` fires.
    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        cancel: &CancellationToken,
    ) -> Result<T, PrError> {
        let request = request
            .bearer_auth(&self.token)
            .header(ACCEPT, GITHUB_JSON);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(PrError::Cancelled),
            result = execute::<T>(request) => result.map_err(PrError::from),
        }
    }
}

async fn execute<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, reqwest::Error> {
    let response = request.send().await?.error_for_status()?;
    response.json::<T>().await
}

impl std::fmt::Debug for GithubFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubFetcher")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PullRequestFetcher for GithubFetcher {
    fn template_function(&self) -> &'static str {
        TEMPLATE_FUNCTION
    }

    fn help(&self) -> Vec<Help> {
        vec![Help {
            command: "github pull request".to_string(),
            description: "tracks the state of github pull requests".to_string(),
            examples: vec![
                "https://github.com/home-assistant/home-assistant/pull/13958".to_string(),
            ],
        }]
    }

    /// Metadata first, then the first page of reviews. Either failure aborts.
    #[instrument(skip(self, cancel), fields(pr = %reference))]
    async fn get_pull_request(
        &self,
        reference: &PullRequestRef,
        cancel: &CancellationToken,
    ) -> Result<PullRequest, PrError> {
        let url = self.pull_url(reference);

        debug!("fetching PR metadata from GitHub API");
        let metadata: PullResponse = self.send(self.client.get(&url), cancel).await?;
        debug!(title = %metadata.title, merged = metadata.merged, "received PR metadata");

        debug!("fetching PR reviews from GitHub API");
        let reviews: Vec<Review> = self
            .send(
                self.client
                    .get(format!("{}/reviews", url))
                    .query(&[("per_page", REVIEWS_PAGE_SIZE)]),
                cancel,
            )
            .await?;
        if reviews.len() >= REVIEWS_PAGE_SIZE {
            warn!(
                count = reviews.len(),
                "review list fills a whole page, later reviews are ignored"
            );
        }

        let summary = reviews::classify(&reviews);
        debug!(
            reviews = reviews.len(),
            approved = summary.approved,
            in_review = summary.in_review,
            "classified reviews"
        );

        Ok(PullRequest {
            name: metadata.title,
            merged: metadata.merged,
            declined: false,
            approved: summary.approved,
            in_review: summary.in_review,
        })
    }
}
