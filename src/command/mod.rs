pub mod template;

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::GitHubConfig;
use crate::pr::{GithubFetcher, PrError, PullRequest, PullRequestRef};

/// Discovery metadata shown by `--list-commands`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Help {
    pub command: String,
    pub description: String,
    pub examples: Vec<String>,
}

/// A code-hosting service that can resolve a pull request into a summary.
/// Implementations are shared across concurrent lookups.
#[async_trait]
pub trait PullRequestFetcher: Send + Sync {
    /// Name the lookup is registered under in message templates.
    fn template_function(&self) -> &'static str;

    fn help(&self) -> Vec<Help>;

    /// Fetches one pull request. Returns an error, never a partial summary,
    /// when any upstream call fails or `cancel` fires.
    async fn get_pull_request(
        &self,
        reference: &PullRequestRef,
        cancel: &CancellationToken,
    ) -> Result<PullRequest, PrError>;
}

/// Whether pull request lookups are available at all.
#[derive(Clone)]
pub enum Capability {
    /// No credential configured; nothing gets registered.
    Disabled,
    Enabled(Arc<dyn PullRequestFetcher>),
}

impl Capability {
    pub fn from_config(config: &GitHubConfig) -> Result<Self, PrError> {
        match config.token() {
            None => {
                info!("no GitHub token configured, pull request lookups disabled");
                Ok(Capability::Disabled)
            }
            Some(token) => {
                let fetcher = GithubFetcher::new(token, &config.api_url)?;
                info!(api_url = %config.api_url, "pull request lookups enabled");
                Ok(Capability::Enabled(Arc::new(fetcher)))
            }
        }
    }

    pub fn fetcher(&self) -> Option<&Arc<dyn PullRequestFetcher>> {
        match self {
            Capability::Disabled => None,
            Capability::Enabled(fetcher) => Some(fetcher),
        }
    }

    pub fn help(&self) -> Vec<Help> {
        self.fetcher().map(|f| f.help()).unwrap_or_default()
    }
}

impl std::fmt::Debug for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::Disabled => write!(f, "Disabled"),
            Capability::Enabled(fetcher) => write!(f, "Enabled({})", fetcher.template_function()),
        }
    }
}
