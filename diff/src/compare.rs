use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;
use tracing::trace;

/// One step into a document tree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum Key {
    StringKey(String),
    Index(usize),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::StringKey(s) => write!(f, "{}", s),
            Key::Index(i) => write!(f, "{}", i),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::StringKey(s.to_string())
    }
}

impl From<usize> for Key {
    fn from(i: usize) -> Self {
        Key::Index(i)
    }
}

/// Location of a value inside a document, outermost key first.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Path(Vec<Key>);

impl Path {
    pub fn root() -> Path {
        Path(Vec::new())
    }

    pub fn keys(&self) -> &[Key] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn child(&self, key: impl Into<Key>) -> Path {
        let mut keys = self.0.clone();
        keys.push(key.into());
        Path(keys)
    }
}

impl From<Vec<Key>> for Path {
    fn from(keys: Vec<Key>) -> Self {
        Path(keys)
    }
}

/// Dot/bracket notation: `spec.containers[0].image`. Keys that would be
/// ambiguous in that notation are written as `["a.b"]`. The root is `.`.
impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, ".");
        }
        for (position, key) in self.0.iter().enumerate() {
            match key {
                Key::Index(i) => write!(f, "[{}]", i)?,
                Key::StringKey(s) if needs_brackets(s) => {
                    write!(f, "[{}]", Value::String(s.clone()))?
                }
                Key::StringKey(s) => {
                    if position > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{}", s)?
                }
            }
        }
        Ok(())
    }
}

fn needs_brackets(key: &str) -> bool {
    key.is_empty() || key.contains(&['.', '[', ']', '"'][..])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DifferenceKind {
    ValueChanged,
    KeyAdded,
    KeyRemoved,
    ArrayLengthChanged,
}

impl fmt::Display for DifferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DifferenceKind::ValueChanged => "value-changed",
            DifferenceKind::KeyAdded => "key-added",
            DifferenceKind::KeyRemoved => "key-removed",
            DifferenceKind::ArrayLengthChanged => "array-length-changed",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Change {
    ValueChanged { old: Value, new: Value },
    KeyAdded { value: Value },
    KeyRemoved { value: Value },
    ArrayLengthChanged { old_len: usize, new_len: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Difference {
    pub path: Path,
    #[serde(flatten)]
    pub change: Change,
}

impl Difference {
    pub fn kind(&self) -> DifferenceKind {
        match self.change {
            Change::ValueChanged { .. } => DifferenceKind::ValueChanged,
            Change::KeyAdded { .. } => DifferenceKind::KeyAdded,
            Change::KeyRemoved { .. } => DifferenceKind::KeyRemoved,
            Change::ArrayLengthChanged { .. } => DifferenceKind::ArrayLengthChanged,
        }
    }

    /// The value on the old side, if the change has one. Length changes report
    /// the old length.
    pub fn old_value(&self) -> Option<Value> {
        match &self.change {
            Change::ValueChanged { old, .. } => Some(old.clone()),
            Change::KeyRemoved { value } => Some(value.clone()),
            Change::KeyAdded { .. } => None,
            Change::ArrayLengthChanged { old_len, .. } => Some(Value::from(*old_len)),
        }
    }

    pub fn new_value(&self) -> Option<Value> {
        match &self.change {
            Change::ValueChanged { new, .. } => Some(new.clone()),
            Change::KeyAdded { value } => Some(value.clone()),
            Change::KeyRemoved { .. } => None,
            Change::ArrayLengthChanged { new_len, .. } => Some(Value::from(*new_len)),
        }
    }
}

/// Compare two decoded values from the root. An empty result means the values
/// are deep-equal.
pub fn compare_values(old: &Value, new: &Value) -> Vec<Difference> {
    compare_at(old, new, &Path::root())
}

/// Compare two decoded values, prefixing every reported path with `prefix`.
pub fn compare_at(old: &Value, new: &Value, prefix: &Path) -> Vec<Difference> {
    let mut comparator = Comparator::default();
    let mut parent = prefix.keys().to_vec();
    comparator.compare(old, new, &mut parent);
    comparator.differences
}

#[derive(Default)]
struct Comparator {
    differences: Vec<Difference>,
}

impl Comparator {
    fn push(&mut self, parent: &[Key], change: Change) {
        let difference = Difference {
            path: Path(parent.to_vec()),
            change,
        };
        trace!(path = %difference.path, kind = %difference.kind(), "difference");
        self.differences.push(difference);
    }

    fn compare(&mut self, old: &Value, new: &Value, parent: &mut Vec<Key>) {
        match (old, new) {
            (Value::Object(l_object), Value::Object(r_object)) => {
                self.diff_object(l_object, r_object, parent)
            }
            (Value::Array(l_array), Value::Array(r_array)) => {
                self.diff_array(l_array, r_array, parent)
            }
            (l_value, r_value) => {
                // A container on either side here means the kinds differ, so the
                // whole subtree counts as replaced. Scalars compare type-aware.
                if l_value != r_value {
                    self.push(
                        parent,
                        Change::ValueChanged {
                            old: l_value.clone(),
                            new: r_value.clone(),
                        },
                    );
                }
            }
        }
    }

    fn diff_object(
        &mut self,
        l_object: &Map<String, Value>,
        r_object: &Map<String, Value>,
        parent: &mut Vec<Key>,
    ) {
        let keys: BTreeSet<&String> = l_object.keys().chain(r_object.keys()).collect();

        for k in keys {
            parent.push(Key::StringKey(k.clone()));
            match (l_object.get(k), r_object.get(k)) {
                (Some(l_item), Some(r_item)) => self.compare(l_item, r_item, parent),
                (Some(l_item), None) => self.push(
                    parent,
                    Change::KeyRemoved {
                        value: l_item.clone(),
                    },
                ),
                (None, Some(r_item)) => self.push(
                    parent,
                    Change::KeyAdded {
                        value: r_item.clone(),
                    },
                ),
                (None, None) => {}
            }
            parent.pop();
        }
    }

    fn diff_array(&mut self, l_array: &[Value], r_array: &[Value], parent: &mut Vec<Key>) {
        let l_array_len = l_array.len();
        let r_array_len = r_array.len();

        if l_array_len != r_array_len {
            self.push(
                parent,
                Change::ArrayLengthChanged {
                    old_len: l_array_len,
                    new_len: r_array_len,
                },
            );
        }

        for (index, (l_item, r_item)) in l_array.iter().zip(r_array.iter()).enumerate() {
            parent.push(Key::Index(index));
            self.compare(l_item, r_item, parent);
            parent.pop();
        }
    }
}
