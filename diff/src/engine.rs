use crate::compare::{compare_values, Difference};
use crate::document::Document;
use crate::identity::resolve;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

pub const DEFAULT_IDENTITY_KEY: &str = "metadata.name";

/// A resource present on both sides whose content differs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Modification {
    pub old: Document,
    pub new: Document,
    pub differences: Vec<Difference>,
}

/// Classification of one comparison run, keyed by identity.
///
/// The three key sets are disjoint. Identities present on both sides without
/// differences appear nowhere.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiffResult {
    pub added: BTreeMap<String, Document>,
    pub deleted: BTreeMap<String, Document>,
    pub modified: BTreeMap<String, Modification>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub added: usize,
    pub deleted: usize,
    pub modified: usize,
}

impl DiffResult {
    pub fn counts(&self) -> Counts {
        Counts {
            added: self.added.len(),
            deleted: self.deleted.len(),
            modified: self.modified.len(),
        }
    }

    /// `true` when anything was added, deleted or modified.
    pub fn has_differences(&self) -> bool {
        !(self.added.is_empty() && self.deleted.is_empty() && self.modified.is_empty())
    }
}

/// Correlates two document sets by identity and classifies the changes.
#[derive(Debug, Clone)]
pub struct Engine {
    key: String,
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new(DEFAULT_IDENTITY_KEY)
    }
}

impl Engine {
    /// `key` is the dotted path used as identity, e.g. `metadata.name`.
    pub fn new(key: impl Into<String>) -> Engine {
        Engine { key: key.into() }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Compare `old_docs` against `new_docs`.
    ///
    /// Within one set, documents sharing an identity but coming from different
    /// source files are told apart as `"<id> (from <file>)"`. The decision to
    /// annotate an identity is made over both sets together, so a resource keeps
    /// the same identity across versions. Any other collision keeps the last
    /// document seen. That includes a raw identity spelled exactly like an
    /// annotated one, e.g. a resource literally named `app (from a.yaml)`.
    pub fn compare(&self, old_docs: &[Document], new_docs: &[Document]) -> DiffResult {
        let old_raw = self.raw_identities(old_docs);
        let new_raw = self.raw_identities(new_docs);

        let mut colliding = colliding_identities(&old_raw);
        colliding.extend(colliding_identities(&new_raw));
        if !colliding.is_empty() {
            debug!(?colliding, "identities shared across source files");
        }

        let old_index = index(old_raw, &colliding);
        let new_index = index(new_raw, &colliding);

        let mut result = DiffResult::default();

        for (identity, doc) in &new_index {
            if !old_index.contains_key(identity) {
                result.added.insert(identity.clone(), (*doc).clone());
            }
        }

        for (identity, old_doc) in &old_index {
            match new_index.get(identity) {
                None => {
                    result.deleted.insert(identity.clone(), (*old_doc).clone());
                }
                Some(new_doc) => {
                    let differences = compare_values(&old_doc.content, &new_doc.content);
                    if differences.is_empty() {
                        continue;
                    }
                    debug!(identity = %identity, count = differences.len(), "resource modified");
                    result.modified.insert(
                        identity.clone(),
                        Modification {
                            old: (*old_doc).clone(),
                            new: (*new_doc).clone(),
                            differences,
                        },
                    );
                }
            }
        }

        let counts = result.counts();
        info!(
            key = %self.key,
            added = counts.added,
            deleted = counts.deleted,
            modified = counts.modified,
            "comparison complete"
        );
        result
    }

    fn raw_identities<'a>(&self, docs: &'a [Document]) -> Vec<(String, &'a Document)> {
        docs.iter()
            .map(|doc| (resolve(doc, &self.key), doc))
            .collect()
    }
}

/// Raw identities that occur with two or more distinct source files.
fn colliding_identities(raw: &[(String, &Document)]) -> BTreeSet<String> {
    let mut sources: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for (identity, doc) in raw {
        if let Some(source_file) = doc.source_file.as_deref() {
            sources
                .entry(identity.as_str())
                .or_default()
                .insert(source_file);
        }
    }

    sources
        .into_iter()
        .filter(|(_, files)| files.len() > 1)
        .map(|(identity, _)| identity.to_string())
        .collect()
}

fn index<'a>(
    raw: Vec<(String, &'a Document)>,
    colliding: &BTreeSet<String>,
) -> BTreeMap<String, &'a Document> {
    let mut docs = BTreeMap::new();
    for (identity, doc) in raw {
        let identity = match doc.source_file.as_deref() {
            Some(source_file) if colliding.contains(&identity) => {
                format!("{} (from {})", identity, source_file)
            }
            _ => identity,
        };
        if docs.insert(identity.clone(), doc).is_some() {
            warn!(identity = %identity, "duplicate identity, keeping the last document");
        }
    }
    docs
}
