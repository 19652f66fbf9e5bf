//! Identity-keyed structural diff for multi-document YAML.
//!
//! Two snapshots of a YAML bundle (Kubernetes manifests, config sets, ...) are
//! parsed into [Document]s, correlated by an identity key such as
//! `metadata.name`, and classified into added, deleted and modified resources.
//! Modified resources carry a path-addressed list of [Difference]s.
//!
//! ```
//! use yamlcmtdiff::{parse_documents, Engine};
//!
//! let old = parse_documents("metadata:\n  name: a\nvalue: 1\n", None).unwrap();
//! let new = parse_documents("metadata:\n  name: a\nvalue: 2\n", None).unwrap();
//!
//! let result = Engine::new("metadata.name").compare(&old, &new);
//! assert_eq!(result.summary(), "0 added, 0 deleted, 1 modified");
//! ```

pub mod compare;
pub mod document;
pub mod engine;
pub mod identity;
pub mod parser;
pub mod render;

pub use compare::{compare_values, Change, Difference, DifferenceKind, Key, Path};
pub use document::Document;
pub use engine::{Counts, DiffResult, Engine, Modification, DEFAULT_IDENTITY_KEY};
pub use identity::{resolve, synthetic_identity};
pub use parser::{clean_yaml_content, parse_documents, parse_file, ParseError};
pub use render::{RenderOptions, TemplateSummary};
