use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use thiserror::Error;
use tracing::{debug, info};
use yamlcmtdiff::{parse_documents, Document, ParseError};

#[derive(Error, Debug)]
pub enum GitError {
    #[error("Failed to execute git: {0}")]
    CommandExecution(io::Error),

    #[error("git exited with code {0:?}: {1}")]
    CommandErrorMessage(Option<i32>, String),

    #[error("not a git repository (or any of the parent directories)")]
    NotARepository,

    #[error("git reference `{0}` does not exist")]
    UnknownReference(String),

    #[error("failed to read {path}: {source}")]
    Read { path: String, source: io::Error },

    #[error("{version} version of {path} is not valid UTF-8: {source}")]
    Encoding {
        version: &'static str,
        path: String,
        source: std::string::FromUtf8Error,
    },

    #[error("failed to parse {version} version of {path}: {source}")]
    Parse {
        version: &'static str,
        path: String,
        source: ParseError,
    },
}

/// Access to file contents at a revision and in the working tree.
pub trait VersionSource {
    /// Fails unless `reference` names a commit in a repository.
    fn verify_reference(&self, reference: &str) -> Result<(), GitError>;

    /// YAML files that differ between `reference` and the working tree and
    /// still exist in the working tree.
    fn changed_files(&self, reference: &str) -> Result<Vec<String>, GitError>;

    /// Contents of `path` at `reference`, `None` when it did not exist there.
    fn read_at(&self, reference: &str, path: &str) -> Result<Option<Vec<u8>>, GitError>;

    fn read_current(&self, path: &str) -> Result<Vec<u8>, GitError>;
}

/// The `git` executable, run in `workdir` or the current directory.
#[derive(Debug, Default, Clone)]
pub struct Git {
    workdir: Option<PathBuf>,
}

impl Git {
    pub fn new() -> Self {
        Git::default()
    }

    pub fn in_dir(workdir: impl Into<PathBuf>) -> Self {
        Git {
            workdir: Some(workdir.into()),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        match &self.workdir {
            Some(dir) => dir.join(path),
            None => PathBuf::from(path),
        }
    }

    fn output(&self, args: &[&str]) -> Result<Output, GitError> {
        let mut cmd = Command::new("git");
        cmd.args(args);
        if let Some(dir) = &self.workdir {
            cmd.current_dir(dir);
        }
        debug!(?args, "running git");
        cmd.output().map_err(GitError::CommandExecution)
    }

    /// Run git and return stdout, failing on a non-zero exit.
    fn run(&self, args: &[&str]) -> Result<Vec<u8>, GitError> {
        let output = self.output(args)?;
        if !output.status.success() {
            let err_string = String::from_utf8_lossy(&output.stderr);
            let message = format!("git {}: {}", args.join(" "), err_string.trim());
            return Err(GitError::CommandErrorMessage(output.status.code(), message));
        }
        Ok(output.stdout)
    }

    pub fn is_repository(&self) -> Result<bool, GitError> {
        let output = self.output(&["rev-parse", "--is-inside-work-tree"])?;
        Ok(output.status.success() && String::from_utf8_lossy(&output.stdout).trim() == "true")
    }
}

impl VersionSource for Git {
    fn verify_reference(&self, reference: &str) -> Result<(), GitError> {
        if !self.is_repository()? {
            return Err(GitError::NotARepository);
        }
        let spec = format!("{}^{{commit}}", reference);
        let output = self.output(&["rev-parse", "--verify", "--quiet", &spec])?;
        if !output.status.success() {
            return Err(GitError::UnknownReference(reference.to_string()));
        }
        Ok(())
    }

    fn changed_files(&self, reference: &str) -> Result<Vec<String>, GitError> {
        let stdout = self.run(&["diff", "--name-only", reference])?;
        let files = String::from_utf8_lossy(&stdout)
            .lines()
            .map(str::trim)
            .filter(|line| is_yaml_path(line))
            .filter(|line| self.resolve(line).exists())
            .map(String::from)
            .collect::<Vec<_>>();
        debug!(reference, count = files.len(), "changed YAML files");
        Ok(files)
    }

    fn read_at(&self, reference: &str, path: &str) -> Result<Option<Vec<u8>>, GitError> {
        let object = format!("{}:{}", reference, path);
        let output = self.output(&["show", &object])?;
        if output.status.success() {
            Ok(Some(output.stdout))
        } else {
            debug!(object = %object, "not present at reference");
            Ok(None)
        }
    }

    fn read_current(&self, path: &str) -> Result<Vec<u8>, GitError> {
        std::fs::read(self.resolve(path)).map_err(|e| GitError::Read {
            path: path.to_string(),
            source: e,
        })
    }
}

pub fn is_yaml_path(path: &str) -> bool {
    matches!(
        Path::new(path).extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Load the old (at `reference`) and new (working tree) documents of every
/// file, each document tagged with the file it came from. A file missing at
/// `reference` contributes no old documents.
pub fn load_with_source_tracking<S>(
    source: &S,
    reference: &str,
    files: &[String],
) -> Result<(Vec<Document>, Vec<Document>), GitError>
where
    S: VersionSource + ?Sized,
{
    let mut old_docs = Vec::new();
    let mut new_docs = Vec::new();

    for file in files {
        eprintln!("Processing: {}", file);

        match source.read_at(reference, file)? {
            Some(bytes) => {
                let docs = parse_version(bytes, file, "old")?;
                old_docs.extend(docs);
            }
            None => eprintln!("  (new file)"),
        }

        let bytes = source.read_current(file)?;
        new_docs.extend(parse_version(bytes, file, "new")?);
    }

    info!(
        reference,
        files = files.len(),
        old = old_docs.len(),
        new = new_docs.len(),
        "loaded documents"
    );
    Ok((old_docs, new_docs))
}

fn parse_version(
    bytes: Vec<u8>,
    file: &str,
    version: &'static str,
) -> Result<Vec<Document>, GitError> {
    let content = String::from_utf8(bytes).map_err(|e| GitError::Encoding {
        version,
        path: file.to_string(),
        source: e,
    })?;
    parse_documents(&content, Some(file)).map_err(|e| GitError::Parse {
        version,
        path: file.to_string(),
        source: e,
    })
}
