use crate::document::Document;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

const STDIN_NAME: &str = "<input>";

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse YAML in {name}: {source}")]
    Yaml {
        name: String,
        source: serde_yaml::Error,
    },
}

/// Drop leading comment lines, blank lines and `---` separators so that a
/// file's license header or a leading separator does not become an empty
/// document. Everything from the first real line onwards is returned
/// untouched, including the final newline that block scalars depend on.
pub fn clean_yaml_content(content: &str) -> &str {
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let trimmed = line.trim();
        if !(trimmed.is_empty() || trimmed.starts_with('#') || trimmed == "---") {
            return &content[offset..];
        }
        offset += line.len();
    }
    ""
}

/// Decode every document of a multi-document YAML stream.
///
/// Documents that decode to nothing (empty or comment-only) are skipped. When
/// `source` is given it is recorded on every document as its source file.
/// Any decode failure fails the whole stream.
pub fn parse_documents(content: &str, source: Option<&str>) -> Result<Vec<Document>, ParseError> {
    let name = source.unwrap_or(STDIN_NAME);
    let cleaned = clean_yaml_content(content);
    let mut docs = Vec::new();

    for (position, document) in serde_yaml::Deserializer::from_str(cleaned).enumerate() {
        let mut value = serde_yaml::Value::deserialize(document).map_err(|e| ParseError::Yaml {
            name: name.to_string(),
            source: e,
        })?;

        if value.is_null() {
            debug!(name, position, "skipping empty document");
            continue;
        }

        value.apply_merge().map_err(|e| ParseError::Yaml {
            name: name.to_string(),
            source: e,
        })?;

        let doc = Document::new(to_tree(value));
        docs.push(match source {
            Some(s) => doc.with_source(s),
            None => doc,
        });
    }

    debug!(name, count = docs.len(), "parsed documents");
    Ok(docs)
}

/// Read and decode `path`. With `track_source` the path is recorded on every
/// document.
pub fn parse_file(path: impl AsRef<Path>, track_source: bool) -> Result<Vec<Document>, ParseError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|e| ParseError::Read {
        path: display.clone(),
        source: e,
    })?;

    let docs = parse_documents(&content, Some(display.as_str()))?;
    if track_source {
        Ok(docs)
    } else {
        Ok(docs
            .into_iter()
            .map(|mut doc| {
                doc.source_file = None;
                doc
            })
            .collect())
    }
}

/// Convert a YAML value into the comparator's value tree. Tags are dropped and
/// non-string mapping keys are written out as their YAML scalar text.
fn to_tree(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => number_to_tree(&n),
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(seq) => Value::Array(seq.into_iter().map(to_tree).collect()),
        serde_yaml::Value::Mapping(mapping) => {
            let mut object = serde_json::Map::new();
            for (k, v) in mapping {
                let key = key_string(k);
                if object.insert(key.clone(), to_tree(v)).is_some() {
                    warn!(
                        key = %key,
                        "mapping keys collide once written as text, keeping the last value"
                    );
                }
            }
            Value::Object(object)
        }
        serde_yaml::Value::Tagged(tagged) => to_tree(tagged.value),
    }
}

fn number_to_tree(n: &serde_yaml::Number) -> Value {
    if let Some(i) = n.as_i64() {
        Value::from(i)
    } else if let Some(u) = n.as_u64() {
        Value::from(u)
    } else {
        // .nan and .inf have no JSON number form
        n.as_f64()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(n.to_string()))
    }
}

fn key_string(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Null => String::from("null"),
        serde_yaml::Value::Tagged(tagged) => key_string(tagged.value),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clean_strips_leading_comments_and_separators() {
        let content = "# Copyright header\n\n---\n# another\napiVersion: v1\n# inline comment\nkind: ConfigMap\n";
        assert_eq!(
            clean_yaml_content(content),
            "apiVersion: v1\n# inline comment\nkind: ConfigMap\n"
        );
    }

    #[test]
    fn test_clean_comment_only_content_is_empty() {
        assert_eq!(clean_yaml_content("# nothing here\n---\n\n"), "");
        assert_eq!(clean_yaml_content(""), "");
    }

    #[test]
    fn test_single_document() {
        let docs = parse_documents("metadata:\n  name: test\ndata:\n  key: value\n", None).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(
            docs[0].content,
            json!({"metadata": {"name": "test"}, "data": {"key": "value"}})
        );
        assert!(docs[0].source_file.is_none());
    }

    #[test]
    fn test_multiple_documents_with_empty_ones() {
        let yaml = "---\n# leading\n---\na: 1\n---\n---\nb: 2\n---\n# trailing comment only\n";
        let docs = parse_documents(yaml, Some("bundle.yaml")).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].content, json!({"a": 1}));
        assert_eq!(docs[1].content, json!({"b": 2}));
        assert!(docs
            .iter()
            .all(|d| d.source_file.as_deref() == Some("bundle.yaml")));
    }

    #[test]
    fn test_scalar_types_are_preserved() {
        let docs = parse_documents(
            "port: 80\nquoted: \"80\"\nenabled: true\nratio: 0.5\nnothing: ~\n",
            None,
        )
        .unwrap();
        assert_eq!(
            docs[0].content,
            json!({"port": 80, "quoted": "80", "enabled": true, "ratio": 0.5, "nothing": null})
        );
    }

    #[test]
    fn test_non_string_keys_and_tags() {
        let docs = parse_documents("1: one\ntrue: yes-value\nref: !Ref bucket\n", None).unwrap();
        assert_eq!(
            docs[0].content,
            json!({"1": "one", "true": "yes-value", "ref": "bucket"})
        );
    }

    #[test]
    fn test_trailing_block_scalar_keeps_its_newline() {
        let yaml = "# header\nmetadata:\n  name: a\ndata: |\n  x\n";
        let last = parse_documents(yaml, None).unwrap();
        assert_eq!(last[0].content["data"], json!("x\n"));

        let followed = format!("{}---\nmetadata:\n  name: b\n", yaml);
        let docs = parse_documents(&followed, None).unwrap();
        assert_eq!(docs[0].content, last[0].content);
    }

    #[test]
    fn test_keep_chomping_block_scalar_at_end_of_file() {
        let docs = parse_documents("data: |+\n  x\n\n", None).unwrap();
        assert_eq!(docs[0].content["data"], json!("x\n\n"));
    }

    #[test]
    fn test_colliding_stringified_keys_keep_last_value() {
        let docs = parse_documents("1: a\n\"1\": b\n", None).unwrap();
        assert_eq!(docs[0].content, json!({"1": "b"}));
    }

    #[test]
    fn test_merge_keys_are_applied() {
        let yaml = "base: &base\n  image: nginx\nservice:\n  <<: *base\n  port: 80\n";
        let docs = parse_documents(yaml, None).unwrap();
        assert_eq!(docs[0].content["service"], json!({"image": "nginx", "port": 80}));
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        let err = parse_documents("a: 1\n---\nb: [unclosed\n", Some("broken.yaml")).unwrap_err();
        assert!(matches!(err, ParseError::Yaml { .. }));
        assert!(err.to_string().contains("broken.yaml"));
    }

    #[test]
    fn test_raw_is_canonical() {
        let docs = parse_documents("b: 2\na: 1\n", None).unwrap();
        assert_eq!(docs[0].raw, "a: 1\nb: 2\n");
    }

    #[test]
    fn test_parse_file_missing() {
        let err = parse_file("/definitely/not/here.yaml", false).unwrap_err();
        assert!(matches!(err, ParseError::Read { .. }));
        assert!(err.to_string().contains("/definitely/not/here.yaml"));
    }

    #[test]
    fn test_parse_file_source_tracking() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.yaml");
        std::fs::write(&path, "metadata:\n  name: app\n").unwrap();

        let tracked = parse_file(&path, true).unwrap();
        assert_eq!(
            tracked[0].source_file.as_deref(),
            Some(path.display().to_string().as_str())
        );

        let untracked = parse_file(&path, false).unwrap();
        assert!(untracked[0].source_file.is_none());
    }
}
