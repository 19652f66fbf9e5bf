use crate::config::{CompareConfig, Config};
use crate::github::{parse_repo, GithubError, IssueTracker, RepoSlug};
use crate::vars::{parse_vars, VarError, Vars};
use serde::Serialize;
use thiserror::Error;
use tinytemplate::TinyTemplate;
use tracing::{debug, info, warn};
use yamlcmtdiff::{DiffResult, TemplateSummary};

const TEMPLATE_NAME: &str = "comment";

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("failed to parse comment template: {0}")]
    Parse(tinytemplate::error::Error),
    #[error("failed to render comment template: {0}")]
    Render(tinytemplate::error::Error),
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Github(#[from] GithubError),
    #[error(transparent)]
    Vars(#[from] VarError),
    #[error("repository not set: {0}")]
    MissingRepository(&'static str),
    #[error("pull request number required (use --github-pr)")]
    MissingPullRequest,
}

/// Everything a comment template can reference: the summary fields at the
/// top level plus `details`, `link` and `vars`.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateData {
    #[serde(flatten)]
    pub summary: TemplateSummary,
    pub details: String,
    pub link: String,
    pub vars: Vars,
}

impl TemplateData {
    pub fn new(result: &DiffResult, details: String, link: String, vars: Vars) -> Self {
        TemplateData {
            summary: result.template_summary(),
            details,
            link,
            vars,
        }
    }
}

/// Render a tinytemplate body without HTML escaping. Referencing a field that
/// does not exist fails.
pub fn render_template(template: &str, data: &TemplateData) -> Result<String, TemplateError> {
    let mut tt = TinyTemplate::new();
    tt.set_default_formatter(&tinytemplate::format_unescaped);
    tt.add_template(TEMPLATE_NAME, template)
        .map_err(TemplateError::Parse)?;
    tt.render(TEMPLATE_NAME, data).map_err(TemplateError::Render)
}

/// The single label applied by `--github-label`.
pub fn legacy_label<'a>(
    result: &DiffResult,
    changes_label: &'a str,
    no_changes_label: &'a str,
) -> &'a str {
    if result.has_differences() {
        changes_label
    } else {
        no_changes_label
    }
}

pub struct ReportRequest {
    pub repo: RepoSlug,
    pub number: u64,
    pub compare: CompareConfig,
    /// `--post-comment` was given.
    pub post_comment: bool,
    pub details: String,
    pub link: String,
    pub vars: Vars,
}

/// What was published for a request.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Delivery {
    pub comment: Option<String>,
    pub labels: Vec<String>,
}

/// Publish a comparison result to a pull request according to the compare
/// config. The comment is rendered before anything is sent, so a broken
/// template publishes nothing.
pub async fn report<T>(
    tracker: &T,
    result: &DiffResult,
    request: ReportRequest,
) -> Result<Delivery, ReportError>
where
    T: IssueTracker + ?Sized,
{
    let compare = &request.compare;
    let mut delivery = Delivery::default();

    let comment = match (&compare.template, request.post_comment && !compare.disable_comment) {
        (Some(template), true) => {
            let data = TemplateData::new(result, request.details, request.link, request.vars);
            Some(render_template(template, &data)?)
        }
        (None, true) => {
            warn!("no comment template configured, skipping comment");
            None
        }
        (_, false) => {
            debug!("comment disabled");
            None
        }
    };

    if let Some(body) = comment {
        tracker
            .post_comment(&request.repo, request.number, &body)
            .await?;
        delivery.comment = Some(body);
    }

    if compare.disable_label {
        debug!("labels disabled");
    } else {
        let labels = compare.labels.labels_for(result.counts());
        if labels.is_empty() {
            debug!("no labels to apply");
        } else {
            tracker
                .add_labels(&request.repo, request.number, &labels)
                .await?;
            delivery.labels = labels;
        }
    }

    info!(
        repo = %request.repo,
        number = request.number,
        comment = delivery.comment.is_some(),
        labels = delivery.labels.len(),
        "report delivered"
    );
    Ok(delivery)
}

/// The `--github-label` mode: one label chosen by whether anything changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRequest {
    pub repo: RepoSlug,
    pub number: u64,
    pub changes_label: String,
    pub no_changes_label: String,
}

/// What a run publishes to its pull request.
pub enum Publication {
    Report(ReportRequest),
    Label(LabelRequest),
}

/// Pull request options as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct PublishOptions {
    pub config: Option<Config>,
    pub github_label: bool,
    pub github_repo: Option<String>,
    pub github_pr: Option<u64>,
    pub post_comment: bool,
    pub link: String,
    pub vars: Vec<String>,
    pub changes_label: String,
    pub no_changes_label: String,
    pub details: String,
}

impl PublishOptions {
    /// Decide what to publish, if anything. A config file selects the
    /// config-driven report and `github_label` is then ignored.
    pub fn plan(self) -> Result<Option<Publication>, ReportError> {
        let number = self.github_pr;

        if let Some(config) = self.config {
            let repo = self
                .github_repo
                .or_else(|| config.repo_full_name())
                .ok_or(ReportError::MissingRepository(
                    "add it to the config or pass --github-repo",
                ))?;
            return Ok(Some(Publication::Report(ReportRequest {
                repo: parse_repo(&repo)?,
                number: number.ok_or(ReportError::MissingPullRequest)?,
                compare: config.yamlcmt.compare,
                post_comment: self.post_comment,
                details: self.details,
                link: self.link,
                vars: parse_vars(&self.vars)?,
            })));
        }

        if self.github_label {
            let repo = self
                .github_repo
                .ok_or(ReportError::MissingRepository("--github-label requires --github-repo"))?;
            return Ok(Some(Publication::Label(LabelRequest {
                repo: parse_repo(&repo)?,
                number: number.ok_or(ReportError::MissingPullRequest)?,
                changes_label: self.changes_label,
                no_changes_label: self.no_changes_label,
            })));
        }

        Ok(None)
    }
}

/// Apply the single `--github-label` label. An empty label name sends nothing.
pub async fn apply_label<T>(
    tracker: &T,
    result: &DiffResult,
    request: LabelRequest,
) -> Result<Delivery, ReportError>
where
    T: IssueTracker + ?Sized,
{
    let label = legacy_label(result, &request.changes_label, &request.no_changes_label);
    if label.is_empty() {
        debug!("label name is empty, nothing to apply");
        return Ok(Delivery::default());
    }

    let labels = vec![label.to_string()];
    tracker
        .add_labels(&request.repo, request.number, &labels)
        .await?;
    Ok(Delivery {
        comment: None,
        labels,
    })
}

pub async fn publish<T>(
    tracker: &T,
    result: &DiffResult,
    publication: Publication,
) -> Result<Delivery, ReportError>
where
    T: IssueTracker + ?Sized,
{
    match publication {
        Publication::Report(request) => report(tracker, result, request).await,
        Publication::Label(request) => apply_label(tracker, result, request).await,
    }
}
