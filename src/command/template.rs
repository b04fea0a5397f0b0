//! Message rendering with pull request lookups available as a template
//! function.
//!
//! When lookups are enabled the environment gains a function, for GitHub
//! `githubPullRequest(project, repo, number)`, taking three strings and
//! returning a record with `name`, `merged`, `declined`, `approved` and
//! `inReview`:
//!
//! ```jinja2
//! {% set pr = githubPullRequest(project, repo, number) %}
//! {% if pr.approved %}:white_check_mark:{% endif %} {{ pr.name }}
//! ```
//!
//! The render context carries `project`, `repo` and `number` of the matched
//! link. A failed lookup fails the whole render.

use std::sync::Arc;

use minijinja::{context, Environment, ErrorKind, Value};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use super::{Capability, PullRequestFetcher};
use crate::pr::types::{FIELD_NUMBER, FIELD_PROJECT, FIELD_REPO};
use crate::pr::{MatchResult, PrError, PullRequestRef};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Template rendering failed: {0}")]
    Template(#[from] minijinja::Error),

    #[error("Rendering task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl RenderError {
    /// The lookup failure behind a failed render, if that is what failed.
    pub fn fetch_error(&self) -> Option<&PrError> {
        let mut source: Option<&(dyn std::error::Error + 'static)> = match self {
            RenderError::Template(err) => Some(err),
            RenderError::Join(_) => None,
        };
        while let Some(err) = source {
            if let Some(pr_error) = err.downcast_ref::<PrError>() {
                return Some(pr_error);
            }
            source = err.source();
        }
        None
    }
}

/// Registers the fetcher's template function on `env`. A disabled
/// capability registers nothing.
///
/// The registered function blocks on `handle`, so the environment must only
/// render off the async runtime's worker threads.
pub fn register_functions(
    env: &mut Environment<'_>,
    capability: &Capability,
    handle: Handle,
    cancel: CancellationToken,
) {
    let Some(fetcher) = capability.fetcher() else {
        return;
    };
    let fetcher = Arc::clone(fetcher);
    let name = fetcher.template_function();

    env.add_function(name, move |project: String, repo: String, number: String| {
        lookup(fetcher.as_ref(), &handle, &cancel, project, repo, number)
    });
}

fn lookup(
    fetcher: &dyn PullRequestFetcher,
    handle: &Handle,
    cancel: &CancellationToken,
    project: String,
    repo: String,
    number: String,
) -> Result<Value, minijinja::Error> {
    let input = MatchResult::new()
        .with(FIELD_PROJECT, project)
        .with(FIELD_REPO, repo)
        .with(FIELD_NUMBER, number);

    let pull_request = PullRequestRef::try_from(&input)
        .and_then(|reference| handle.block_on(fetcher.get_pull_request(&reference, cancel)))
        .map_err(|err| {
            minijinja::Error::new(
                ErrorKind::InvalidOperation,
                format!("{} failed", fetcher.template_function()),
            )
            .with_source(err)
        })?;

    Ok(Value::from_serialize(&pull_request))
}

/// A message template bound to the lookup functions of one capability.
pub struct MessageRenderer {
    env: Environment<'static>,
    template: String,
}

impl MessageRenderer {
    /// Builds the environment and checks the template's syntax up front.
    /// Must be called from within a Tokio runtime.
    pub fn new(
        capability: &Capability,
        template: impl Into<String>,
        cancel: CancellationToken,
    ) -> Result<Self, RenderError> {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| minijinja::AutoEscape::None);
        register_functions(&mut env, capability, Handle::current(), cancel);

        let template = template.into();
        Environment::new().template_from_str(&template)?;

        Ok(Self { env, template })
    }

    /// Renders the message for one pull request on a blocking thread.
    #[instrument(skip(self), fields(pr = %reference))]
    pub async fn render(
        self: Arc<Self>,
        reference: PullRequestRef,
    ) -> Result<String, RenderError> {
        tokio::task::spawn_blocking(move || self.render_blocking(&reference)).await?
    }

    fn render_blocking(&self, reference: &PullRequestRef) -> Result<String, RenderError> {
        let ctx = context! {
            project => &reference.project,
            repo => &reference.repo,
            number => reference.number.to_string(),
        };
        let output = self.env.render_str(&self.template, ctx)?;
        debug!(bytes = output.len(), "rendered message");
        Ok(output)
    }
}
