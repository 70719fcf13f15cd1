use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dao::document_store::Document;

pub const KEY_SEPARATOR: &str = "::";
pub const END_SUFFIX: &str = "\u{ffff}";

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    pub id: String,
    #[serde(default)]
    pub doc: Option<Value>,
}

/// Stored CouchDB document: the bookkeeping `_id`/`_rev` pair around the
/// caller's fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchEnvelope {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub body: Document,
}

impl CouchEnvelope {
    pub fn new(id: String, rev: Option<String>, body: Document) -> Self {
        Self { id, rev, body }
    }
}

/// Tables share one CouchDB database; documents are namespaced by table.
pub fn doc_id(table: &str, key: &str) -> String {
    format!("{table}{KEY_SEPARATOR}{key}")
}

pub fn table_prefix(table: &str) -> String {
    format!("{table}{KEY_SEPARATOR}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_flattens_body_next_to_bookkeeping_fields() {
        let body = json!({"title": "quiz", "players": []})
            .as_object()
            .cloned()
            .unwrap();
        let envelope = CouchEnvelope::new(doc_id("games", "g1"), Some("1-abc".into()), body);
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"_id": "games::g1", "_rev": "1-abc", "title": "quiz", "players": []})
        );
    }

    #[test]
    fn decoding_keeps_bookkeeping_out_of_the_body() {
        let envelope: CouchEnvelope =
            serde_json::from_value(json!({"_id": "users::u1", "_rev": "2-x", "username": "ana"}))
                .unwrap();
        assert_eq!(envelope.rev.as_deref(), Some("2-x"));
        assert_eq!(envelope.body.len(), 1);
        assert_eq!(envelope.body.get("username"), Some(&json!("ana")));
    }
}
