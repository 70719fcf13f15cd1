//! Addressing of nested fields inside a JSON document, plus the in-place
//! mutations shared by the backends that cannot express them natively.

use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

/// A stored document: a JSON object at the root.
pub type Document = Map<String, Value>;

/// One step of a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Named field of an object.
    Key(String),
    /// Zero-based position inside a list.
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(name) => f.write_str(name),
            PathSegment::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Location of a field inside a document, rendered as a dotted path
/// (`games.2.questions`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// The document itself.
    pub fn root() -> Self {
        Self::default()
    }

    /// A top-level field.
    pub fn field(name: impl Into<String>) -> Self {
        Self::root().key(name)
    }

    /// Extend the path with a named field.
    pub fn key(mut self, name: impl Into<String>) -> Self {
        self.segments.push(PathSegment::Key(name.into()));
        self
    }

    /// Extend the path with a list position.
    pub fn index(mut self, index: usize) -> Self {
        self.segments.push(PathSegment::Index(index));
        self
    }

    /// Steps from the document root, outermost first.
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Whether the path addresses the document itself.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, segment) in self.segments.iter().enumerate() {
            if position > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

/// Overwrite of the value stored at `path`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldUpdate {
    /// Field to overwrite.
    pub path: FieldPath,
    /// Value written there.
    pub value: Value,
}

impl FieldUpdate {
    /// Overwrite `path` with `value`.
    pub fn new(path: FieldPath, value: Value) -> Self {
        Self { path, value }
    }
}

/// Value a field must still hold for a write to be applied, such as the
/// identifier an element had when its position (`games.1`) was resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Precondition {
    /// Field checked before writing.
    pub path: FieldPath,
    /// Value the field must equal.
    pub expected: Value,
}

impl Precondition {
    /// Require `path` to equal `expected`.
    pub fn new(path: FieldPath, expected: Value) -> Self {
        Self { path, expected }
    }

    /// Whether `document` satisfies the condition.
    pub fn holds(&self, document: &Document) -> bool {
        lookup(document, &self.path) == Some(&self.expected)
    }
}

/// Reasons a path cannot be applied to a document.
#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum PathError {
    /// Writes need at least one segment.
    #[error("the document root cannot be targeted")]
    Empty,
    /// An intermediate key is absent.
    #[error("field `{segment}` does not exist")]
    Missing { segment: String },
    /// A key was applied to something other than an object.
    #[error("`{segment}` is not an object")]
    NotAnObject { segment: String },
    /// An index or append was applied to something other than a list.
    #[error("`{segment}` is not a list")]
    NotAList { segment: String },
    /// The list is shorter than the addressed position.
    #[error("index {index} is out of bounds for a list of {len}")]
    OutOfBounds { index: usize, len: usize },
}

/// Read the value stored at `path`, if every segment resolves.
pub(crate) fn lookup<'a>(document: &'a Document, path: &FieldPath) -> Option<&'a Value> {
    let (first, rest) = path.segments.split_first()?;
    let PathSegment::Key(name) = first else {
        return None;
    };

    let mut current = document.get(name)?;
    for segment in rest {
        current = match segment {
            PathSegment::Key(name) => current.get(name.as_str())?,
            PathSegment::Index(index) => current.get(*index)?,
        };
    }
    Some(current)
}

/// Borrow the object located at `path`; the root path yields the document itself.
pub(crate) fn object_at<'a>(document: &'a Document, path: &FieldPath) -> Option<&'a Document> {
    if path.is_root() {
        return Some(document);
    }
    lookup(document, path)?.as_object()
}

/// Overwrite the value at `path`. The final key is created when absent, a final
/// index must already exist.
pub(crate) fn set(document: &mut Document, path: &FieldPath, value: Value) -> Result<(), PathError> {
    with_root(document, |root| {
        let (last, parents) = path.segments.split_last().ok_or(PathError::Empty)?;
        let container = descend(root, parents)?;

        match last {
            PathSegment::Key(name) => {
                container
                    .as_object_mut()
                    .ok_or_else(|| PathError::NotAnObject {
                        segment: name.clone(),
                    })?
                    .insert(name.clone(), value);
            }
            PathSegment::Index(_) => {
                *step(container, last)? = value;
            }
        }
        Ok(())
    })
}

/// Extend the list at `path` with `values`. A missing final key starts an empty list.
pub(crate) fn append(document: &mut Document, path: &FieldPath, values: Vec<Value>) -> Result<(), PathError> {
    with_root(document, |root| {
        let (last, parents) = path.segments.split_last().ok_or(PathError::Empty)?;
        let container = descend(root, parents)?;

        let target = match last {
            PathSegment::Key(name) => container
                .as_object_mut()
                .ok_or_else(|| PathError::NotAnObject {
                    segment: name.clone(),
                })?
                .entry(name.clone())
                .or_insert_with(|| Value::Array(Vec::new())),
            PathSegment::Index(_) => step(container, last)?,
        };

        target
            .as_array_mut()
            .ok_or_else(|| PathError::NotAList {
                segment: last.to_string(),
            })?
            .extend(values);
        Ok(())
    })
}

fn with_root<T>(
    document: &mut Document,
    apply: impl FnOnce(&mut Value) -> Result<T, PathError>,
) -> Result<T, PathError> {
    let mut root = Value::Object(std::mem::take(document));
    let outcome = apply(&mut root);
    if let Value::Object(map) = root {
        *document = map;
    }
    outcome
}

fn descend<'a>(root: &'a mut Value, segments: &[PathSegment]) -> Result<&'a mut Value, PathError> {
    let mut current = root;
    for segment in segments {
        current = step(current, segment)?;
    }
    Ok(current)
}

fn step<'a>(current: &'a mut Value, segment: &PathSegment) -> Result<&'a mut Value, PathError> {
    match segment {
        PathSegment::Key(name) => current
            .as_object_mut()
            .ok_or_else(|| PathError::NotAnObject {
                segment: name.clone(),
            })?
            .get_mut(name)
            .ok_or_else(|| PathError::Missing {
                segment: name.clone(),
            }),
        PathSegment::Index(index) => {
            let list = current.as_array_mut().ok_or_else(|| PathError::NotAList {
                segment: index.to_string(),
            })?;
            let len = list.len();
            list.get_mut(*index)
                .ok_or(PathError::OutOfBounds { index: *index, len })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn renders_dotted_paths() {
        let path = FieldPath::field("games").index(2).key("questions").index(0);
        assert_eq!(path.to_string(), "games.2.questions.0");
        assert_eq!(FieldPath::root().to_string(), "");
    }

    #[test]
    fn lookup_follows_keys_and_indexes() {
        let doc = document(json!({"games": [{"title": "a"}, {"title": "b"}]}));
        let path = FieldPath::field("games").index(1).key("title");
        assert_eq!(lookup(&doc, &path), Some(&json!("b")));
        assert_eq!(lookup(&doc, &FieldPath::field("games").index(5)), None);
        assert_eq!(lookup(&doc, &FieldPath::root()), None);
    }

    #[test]
    fn set_overwrites_a_list_position_only() {
        let mut doc = document(json!({"questions": [{"id": "a"}, {"id": "b"}, {"id": "c"}]}));
        set(&mut doc, &FieldPath::field("questions").index(1), json!({"id": "z"})).unwrap();
        assert_eq!(
            Value::Object(doc),
            json!({"questions": [{"id": "a"}, {"id": "z"}, {"id": "c"}]})
        );
    }

    #[test]
    fn set_creates_missing_final_key() {
        let mut doc = document(json!({"title": "quiz"}));
        set(&mut doc, &FieldPath::field("winner"), json!("p1")).unwrap();
        assert_eq!(doc.get("winner"), Some(&json!("p1")));
    }

    #[test]
    fn set_rejects_out_of_bounds_index_and_leaves_document_intact() {
        let mut doc = document(json!({"players": [1]}));
        let err = set(&mut doc, &FieldPath::field("players").index(3), json!(2)).unwrap_err();
        assert_eq!(err, PathError::OutOfBounds { index: 3, len: 1 });
        assert_eq!(Value::Object(doc), json!({"players": [1]}));
    }

    #[test]
    fn set_rejects_root_path() {
        let mut doc = Document::new();
        assert_eq!(set(&mut doc, &FieldPath::root(), json!(1)), Err(PathError::Empty));
    }

    #[test]
    fn append_extends_nested_lists_in_order() {
        let mut doc = document(json!({"games": [{"players": [{"id": "a"}]}]}));
        let path = FieldPath::field("games").index(0).key("players");
        append(&mut doc, &path, vec![json!({"id": "b"}), json!({"id": "c"})]).unwrap();
        assert_eq!(
            lookup(&doc, &path),
            Some(&json!([{"id": "a"}, {"id": "b"}, {"id": "c"}]))
        );
    }

    #[test]
    fn append_starts_missing_list() {
        let mut doc = Document::new();
        append(&mut doc, &FieldPath::field("questions"), vec![json!(1)]).unwrap();
        assert_eq!(doc.get("questions"), Some(&json!([1])));
    }

    #[test]
    fn precondition_compares_the_current_value() {
        let doc = document(json!({"games": [{"gameId": "a"}, {"gameId": "b"}]}));
        let second = FieldPath::field("games").index(1).key("gameId");

        assert!(Precondition::new(second.clone(), json!("b")).holds(&doc));
        assert!(!Precondition::new(second, json!("c")).holds(&doc));
        assert!(!Precondition::new(FieldPath::field("games").index(2).key("gameId"), json!("b")).holds(&doc));
    }

    #[test]
    fn append_rejects_non_list_target() {
        let mut doc = document(json!({"title": "quiz"}));
        let err = append(&mut doc, &FieldPath::field("title"), vec![json!(1)]).unwrap_err();
        assert_eq!(
            err,
            PathError::NotAList {
                segment: "title".into()
            }
        );
    }
}
