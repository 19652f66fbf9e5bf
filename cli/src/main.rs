use anyhow::{anyhow, bail, Context};
use clap::Parser;
use std::env;
use std::io::IsTerminal;
use std::process::ExitCode;
use tracing::{debug, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use yamlcmt::github::DEFAULT_API_URL;
use yamlcmt::{
    load_with_source_tracking, publish, Config, Git, GithubClient, PublishOptions, VersionSource,
};
use yamlcmtdiff::{parse_file, DiffResult, Document, Engine, RenderOptions, DEFAULT_IDENTITY_KEY};

fn init() {
    let log_level = env::var("LOG_LEVEL")
        .unwrap_or(String::from("warn"))
        .to_lowercase();

    if log_level == "none" || log_level.is_empty() {
        return;
    }

    let (level, filter) = match log_level.as_str() {
        "-1" | "error" => (Level::ERROR, EnvFilter::new("error")),
        "0" | "warn" | "warning" => (Level::WARN, EnvFilter::new("warn")),
        "1" | "info" | "default" => (Level::INFO, EnvFilter::new("info")),
        // Debug and trace only from our crates
        "2" | "debug" => (Level::DEBUG, EnvFilter::new("yamlcmt=debug,yamlcmtdiff=debug")),
        "3" | "trace" | "tracing" => (Level::TRACE, EnvFilter::new("yamlcmt=trace,yamlcmtdiff=trace")),
        // Everything
        "4" => (Level::DEBUG, EnvFilter::new("debug")),
        "5" => (Level::TRACE, EnvFilter::new("trace")),
        _ => (Level::WARN, EnvFilter::new("warn")),
    };

    // stdout carries the diff, logs go to stderr
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting default subscriber failed: {}", e);
    }
}

/// Compare multi-document YAML files by resource identity
#[derive(Parser, Debug)]
#[command(name = "yamlcmt", version, about)]
struct Cli {
    /// Old YAML file, or with --git-compare a file to check
    file1: Option<String>,

    /// New YAML file, or with --git-compare another file to check
    file2: Option<String>,

    /// Dotted path of the field that identifies a document
    #[arg(long, default_value = DEFAULT_IDENTITY_KEY)]
    key: String,

    /// Print only the counts line
    #[arg(short = 'c', long)]
    show_counts: bool,

    /// Include full document content
    #[arg(short, long)]
    verbose: bool,

    #[arg(long)]
    no_color: bool,

    /// Compare the working tree against a git reference
    #[arg(long, value_name = "REF")]
    git_compare: Option<String>,

    /// Apply a single changes/no-changes label to the pull request
    #[arg(long)]
    github_label: bool,

    #[arg(long, value_name = "OWNER/NAME")]
    github_repo: Option<String>,

    #[arg(long, value_name = "NUMBER")]
    github_pr: Option<u64>,

    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    github_api_url: String,

    #[arg(long, default_value = "config-sync/changes")]
    changes_label: String,

    #[arg(long, default_value = "config-sync/no-changes")]
    no_changes_label: String,

    /// yamlcmt.yaml with repository, comment template and label settings
    #[arg(long, value_name = "FILE")]
    config: Option<String>,

    /// Post the rendered comment template to the pull request
    #[arg(long)]
    post_comment: bool,

    /// Value of `link` in the comment template
    #[arg(long, default_value = "")]
    link: String,

    /// Template variable, repeatable; dotted keys nest
    #[arg(long = "var", value_name = "KEY=VALUE")]
    vars: Vec<String>,
}

impl Cli {
    fn github_client(&self) -> anyhow::Result<GithubClient> {
        let token = self
            .github_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or_else(|| anyhow!("GitHub token required: pass --github-token or set GITHUB_TOKEN"))?;
        Ok(GithubClient::new(token)?.with_api_url(&self.github_api_url))
    }

    fn commenting_from_config(&self) -> bool {
        self.post_comment && self.config.is_some()
    }
}

fn load_documents(cli: &Cli) -> anyhow::Result<(Vec<Document>, Vec<Document>)> {
    match &cli.git_compare {
        Some(reference) => {
            let git = Git::new();
            git.verify_reference(reference)?;

            let given: Vec<String> = cli.file1.iter().chain(cli.file2.iter()).cloned().collect();
            let files = if given.is_empty() {
                let files = git.changed_files(reference)?;
                eprintln!("Found {} changed YAML file(s)", files.len());
                files
            } else {
                given
            };

            Ok(load_with_source_tracking(&git, reference, &files)?)
        }
        None => {
            let (file1, file2) = match (&cli.file1, &cli.file2) {
                (Some(file1), Some(file2)) => (file1, file2),
                _ => bail!("two files are required unless --git-compare is given"),
            };
            let old = parse_file(file1, false)?;
            let new = parse_file(file2, false)?;
            Ok((old, new))
        }
    }
}

async fn publish_to_pull_request(
    cli: &Cli,
    result: &DiffResult,
    details: String,
) -> anyhow::Result<()> {
    let config = cli.config.as_ref().map(Config::load).transpose()?;
    let options = PublishOptions {
        config,
        github_label: cli.github_label,
        github_repo: cli.github_repo.clone(),
        github_pr: cli.github_pr,
        post_comment: cli.post_comment,
        link: cli.link.clone(),
        vars: cli.vars.clone(),
        changes_label: cli.changes_label.clone(),
        no_changes_label: cli.no_changes_label.clone(),
        details,
    };

    if let Some(publication) = options.plan()? {
        let client = cli.github_client()?;
        let delivery = publish(&client, result, publication)
            .await
            .context("failed to publish to pull request")?;
        debug!(?delivery, "published");
    }
    Ok(())
}

/// Returns whether any differences were found.
async fn run(cli: Cli) -> anyhow::Result<bool> {
    let (old_docs, new_docs) = load_documents(&cli)?;
    debug!(old = old_docs.len(), new = new_docs.len(), "documents loaded");

    let result = Engine::new(&cli.key).compare(&old_docs, &new_docs);

    if !cli.commenting_from_config() {
        if cli.show_counts {
            println!("{}", result.summary());
        } else {
            result.print(&RenderOptions {
                show_content: cli.verbose,
                color: !cli.no_color && std::io::stdout().is_terminal(),
            });
        }
    }

    let details = if cli.verbose {
        result.text(&RenderOptions {
            show_content: true,
            color: false,
        })
    } else {
        String::new()
    };
    publish_to_pull_request(&cli, &result, details).await?;

    Ok(result.has_differences())
}

#[tokio::main]
async fn main() -> ExitCode {
    init();

    info!(
        "yamlcmt version {}",
        yamlcmt::BUILD_VERSION.map_or(yamlcmt::VERSION, |v| v)
    );

    let cli = Cli::parse();
    match run(cli).await {
        Ok(false) => ExitCode::SUCCESS,
        Ok(true) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}
