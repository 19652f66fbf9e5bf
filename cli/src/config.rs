use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use yamlcmtdiff::Counts;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
}

/// Contents of a `yamlcmt.yaml` file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub repository: Option<RepositoryConfig>,
    #[serde(default)]
    pub yamlcmt: YamlcmtConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepositoryConfig {
    pub owner: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct YamlcmtConfig {
    #[serde(default)]
    pub compare: CompareConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompareConfig {
    /// Comment body template. No comment is posted without one.
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub disable_comment: bool,
    #[serde(default)]
    pub disable_label: bool,
    #[serde(default)]
    pub labels: LabelPolicy,
}

/// Labels applied for a result. `add`, `delete` and `modify` accumulate;
/// `no_changes` is applied only when nothing changed. An empty name disables
/// that label.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LabelPolicy {
    pub add: String,
    pub delete: String,
    pub modify: String,
    pub no_changes: String,
}

impl Default for LabelPolicy {
    fn default() -> Self {
        LabelPolicy {
            add: String::from("yamlcmt/add"),
            delete: String::from("yamlcmt/delete"),
            modify: String::from("yamlcmt/modify"),
            no_changes: String::from("yamlcmt/no-changes"),
        }
    }
}

impl LabelPolicy {
    pub fn labels_for(&self, counts: Counts) -> Vec<String> {
        let labels = if counts.added == 0 && counts.deleted == 0 && counts.modified == 0 {
            vec![&self.no_changes]
        } else {
            [
                (counts.added > 0, &self.add),
                (counts.deleted > 0, &self.delete),
                (counts.modified > 0, &self.modify),
            ]
            .into_iter()
            .filter(|(applies, _)| *applies)
            .map(|(_, label)| label)
            .collect()
        };

        labels
            .into_iter()
            .filter(|label| !label.is_empty())
            .cloned()
            .collect()
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: display.clone(),
            source: e,
        })?;
        Config::parse(&content, &display)
    }

    pub fn parse(content: &str, name: &str) -> Result<Config, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
            path: name.to_string(),
            source: e,
        })
    }

    /// `owner/name` when the repository section is present.
    pub fn repo_full_name(&self) -> Option<String> {
        self.repository
            .as_ref()
            .map(|r| format!("{}/{}", r.owner, r.name))
    }
}
