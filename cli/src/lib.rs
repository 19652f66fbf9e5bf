// yamlcmt library exposing the CLI's building blocks
//
// main.rs wires these together; keeping them here lets the tests reach
// config loading, git access and PR reporting without the binary.

pub mod config;
pub mod git;
pub mod github;
pub mod report;
pub mod vars;

// Re-export key types for test convenience
pub use config::{CompareConfig, Config, ConfigError, LabelPolicy};
pub use git::{load_with_source_tracking, Git, GitError, VersionSource};
pub use github::{parse_repo, GithubClient, GithubError, IssueTracker, RepoSlug};
pub use report::{
    apply_label, publish, render_template, report, Delivery, LabelRequest, Publication,
    PublishOptions, ReportError, ReportRequest, TemplateData, TemplateError,
};
pub use vars::{parse_vars, TemplateVar, VarError, Vars};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const BUILD_VERSION: Option<&str> = option_env!("BUILD_VERSION");

// Test modules
#[cfg(test)]
pub mod tests;
