use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// A user supplied template variable. Values that read as booleans or
/// numbers keep that type so template conditionals behave.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TemplateVar {
    String(String),
    Number(serde_json::Number),
    Bool(bool),
    Map(BTreeMap<String, TemplateVar>),
}

pub type Vars = BTreeMap<String, TemplateVar>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum VarError {
    #[error("invalid variable `{0}`: expected key=value")]
    MissingSeparator(String),
    #[error("invalid variable `{0}`: empty key segment")]
    EmptyKey(String),
    #[error("variable `{0}` conflicts with an earlier variable of the same name")]
    Conflict(String),
}

impl TemplateVar {
    pub fn parse(value: &str) -> TemplateVar {
        match value {
            "true" => return TemplateVar::Bool(true),
            "false" => return TemplateVar::Bool(false),
            _ => {}
        }

        // Only accept numbers that print back unchanged, so "007" stays text.
        match value.parse::<serde_json::Number>() {
            Ok(n) if n.to_string() == value => TemplateVar::Number(n),
            _ => TemplateVar::String(value.to_string()),
        }
    }
}

/// Parse `key=value` pairs. Dotted keys nest: `env.name=prod` becomes
/// `{"env": {"name": "prod"}}`. A later scalar replaces an earlier one with
/// the same key; a scalar and a map under one key is an error.
pub fn parse_vars<I, S>(pairs: I) -> Result<Vars, VarError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut vars = Vars::new();
    for pair in pairs {
        let pair = pair.as_ref();
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| VarError::MissingSeparator(pair.to_string()))?;
        let segments: Vec<&str> = key.split('.').collect();
        insert(&mut vars, &segments, TemplateVar::parse(value), key)?;
    }
    Ok(vars)
}

fn insert(
    vars: &mut Vars,
    segments: &[&str],
    value: TemplateVar,
    key: &str,
) -> Result<(), VarError> {
    let (first, rest) = match segments.split_first() {
        Some((first, rest)) if !first.is_empty() => (*first, rest),
        _ => return Err(VarError::EmptyKey(key.to_string())),
    };

    if rest.is_empty() {
        if let Some(TemplateVar::Map(_)) = vars.get(first) {
            return Err(VarError::Conflict(key.to_string()));
        }
        vars.insert(first.to_string(), value);
        return Ok(());
    }

    match vars
        .entry(first.to_string())
        .or_insert_with(|| TemplateVar::Map(BTreeMap::new()))
    {
        TemplateVar::Map(children) => insert(children, rest, value, key),
        _ => Err(VarError::Conflict(key.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flat_vars() {
        let vars = parse_vars(["env=prod", "team=platform"]).unwrap();
        assert_eq!(
            serde_json::to_value(&vars).unwrap(),
            json!({"env": "prod", "team": "platform"})
        );
    }

    #[test]
    fn test_dotted_keys_nest() {
        let vars = parse_vars(["cluster.name=east", "cluster.region=us-east-1", "owner=ops"]).unwrap();
        assert_eq!(
            serde_json::to_value(&vars).unwrap(),
            json!({"cluster": {"name": "east", "region": "us-east-1"}, "owner": "ops"})
        );
    }

    #[test]
    fn test_value_may_contain_equals() {
        let vars = parse_vars(["query=a=b"]).unwrap();
        assert_eq!(vars["query"], TemplateVar::String(String::from("a=b")));
    }

    #[test]
    fn test_typed_values() {
        assert_eq!(TemplateVar::parse("true"), TemplateVar::Bool(true));
        assert_eq!(TemplateVar::parse("42"), TemplateVar::Number(42.into()));
        assert_eq!(
            TemplateVar::parse("007"),
            TemplateVar::String(String::from("007"))
        );
        assert_eq!(TemplateVar::parse(""), TemplateVar::String(String::new()));
    }

    #[test]
    fn test_later_scalar_wins() {
        let vars = parse_vars(["env=dev", "env=prod"]).unwrap();
        assert_eq!(vars["env"], TemplateVar::String(String::from("prod")));
    }

    #[test]
    fn test_invalid_pairs() {
        assert_eq!(
            parse_vars(["novalue"]).unwrap_err(),
            VarError::MissingSeparator(String::from("novalue"))
        );
        assert_eq!(
            parse_vars(["a..b=1"]).unwrap_err(),
            VarError::EmptyKey(String::from("a..b"))
        );
        assert_eq!(
            parse_vars(["=1"]).unwrap_err(),
            VarError::EmptyKey(String::new())
        );
    }

    #[test]
    fn test_scalar_and_map_conflict() {
        assert_eq!(
            parse_vars(["a=1", "a.b=2"]).unwrap_err(),
            VarError::Conflict(String::from("a.b"))
        );
        assert_eq!(
            parse_vars(["a.b=2", "a=1"]).unwrap_err(),
            VarError::Conflict(String::from("a"))
        );
    }
}
