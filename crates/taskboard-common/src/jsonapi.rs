//! JSON:API document types.
//!
//! Only the parts of the convention the backend actually uses are modelled:
//! primary `data` (single or collection), `included`, `relationships`,
//! `links`/`meta` passthrough and `errors`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A `{type, id}` pair pointing at a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl ResourceIdentifier {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
            meta: None,
        }
    }
}

/// Linkage of a relationship: to-one or to-many.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationshipData {
    One(ResourceIdentifier),
    Many(Vec<ResourceIdentifier>),
}

/// A named relationship. A `null` linkage deserializes to `data: None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(default)]
    pub data: Option<RelationshipData>,
}

impl Relationship {
    pub fn to_one(id: ResourceIdentifier) -> Self {
        Self {
            data: Some(RelationshipData::One(id)),
        }
    }

    pub fn to_many(ids: Vec<ResourceIdentifier>) -> Self {
        Self {
            data: Some(RelationshipData::Many(ids)),
        }
    }

    /// Every identifier in the linkage, in document order.
    pub fn identifiers(&self) -> Vec<&ResourceIdentifier> {
        match &self.data {
            Some(RelationshipData::One(id)) => vec![id],
            Some(RelationshipData::Many(ids)) => ids.iter().collect(),
            None => Vec::new(),
        }
    }
}

/// A resource object.
///
/// `id` is empty for resources that have not been created yet; it is then
/// omitted from the serialized envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub relationships: BTreeMap<String, Relationship>,
}

impl Resource {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    pub fn with_relationship(mut self, name: &str, relationship: Relationship) -> Self {
        self.relationships.insert(name.to_string(), relationship);
        self
    }

    pub fn identifier(&self) -> ResourceIdentifier {
        ResourceIdentifier::new(self.kind.clone(), self.id.clone())
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name).filter(|v| !v.is_null())
    }

    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attr(name).and_then(Value::as_str)
    }

    pub fn attr_bool(&self, name: &str) -> Option<bool> {
        self.attr(name).and_then(Value::as_bool)
    }

    pub fn attr_i64(&self, name: &str) -> Option<i64> {
        match self.attr(name)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn attr_f64(&self, name: &str) -> Option<f64> {
        match self.attr(name)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Text fields come either as a bare string or as a formatted-text object
    /// `{value, format, processed}`; this returns the raw `value` either way.
    pub fn attr_text(&self, name: &str) -> Option<&str> {
        match self.attr(name)? {
            Value::String(s) => Some(s.as_str()),
            Value::Object(obj) => obj.get("value").and_then(Value::as_str),
            _ => None,
        }
    }

    pub fn attr_as<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        self.attr(name)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Id of a to-one relationship target.
    pub fn related_id(&self, name: &str) -> Option<&str> {
        self.relationships
            .get(name)
            .and_then(|r| r.identifiers().first().map(|id| id.id.as_str()))
    }

    /// Ids of every relationship target, to-one or to-many.
    pub fn related_ids(&self, name: &str) -> Vec<&str> {
        self.relationships
            .get(name)
            .map(|r| r.identifiers().into_iter().map(|id| id.id.as_str()).collect())
            .unwrap_or_default()
    }
}

/// Primary data of a document: a single resource or a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryData {
    Single(Box<Resource>),
    Many(Vec<Resource>),
}

/// An entry of the top-level `errors` array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// A top-level JSON:API document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub data: Option<PrimaryData>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included: Vec<Resource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorObject>,
}

impl Document {
    /// Mutation envelope `{data: {...}}` for a single resource.
    pub fn from_resource(resource: Resource) -> Self {
        Self {
            data: Some(PrimaryData::Single(Box::new(resource))),
            ..Self::default()
        }
    }

    /// Primary resources, whether the document carries one or many.
    pub fn resources(&self) -> Vec<&Resource> {
        match &self.data {
            Some(PrimaryData::Single(r)) => vec![r.as_ref()],
            Some(PrimaryData::Many(rs)) => rs.iter().collect(),
            None => Vec::new(),
        }
    }

    pub fn single(&self) -> Option<&Resource> {
        match &self.data {
            Some(PrimaryData::Single(r)) => Some(r.as_ref()),
            Some(PrimaryData::Many(rs)) => rs.first(),
            None => None,
        }
    }

    pub fn into_resources(self) -> Vec<Resource> {
        match self.data {
            Some(PrimaryData::Single(r)) => vec![*r],
            Some(PrimaryData::Many(rs)) => rs,
            None => Vec::new(),
        }
    }

    /// Look up a resource in `included` by type and id.
    pub fn find_included(&self, kind: &str, id: &str) -> Option<&Resource> {
        self.included.iter().find(|r| r.kind == kind && r.id == id)
    }

    /// Resolve a relationship of `resource` against `included`, skipping
    /// targets the server did not include.
    pub fn resolve<'a>(&'a self, resource: &'a Resource, relationship: &str) -> Vec<&'a Resource> {
        resource
            .relationships
            .get(relationship)
            .map(|r| {
                r.identifiers()
                    .into_iter()
                    .filter_map(|id| self.find_included(&id.kind, &id.id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// First `detail` (or `title`) from the `errors` array.
    pub fn error_detail(&self) -> Option<&str> {
        self.errors
            .iter()
            .find_map(|e| e.detail.as_deref().or(e.title.as_deref()))
    }

    /// Whether the server advertised a further page.
    pub fn has_next_page(&self) -> bool {
        self.links
            .as_ref()
            .and_then(|l| l.get("next"))
            .is_some_and(|next| !next.is_null())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn card_document() -> Value {
        json!({
            "data": [{
                "type": "node--card",
                "id": "c1",
                "attributes": {
                    "title": "Write docs",
                    "body": {"value": "Some *text*", "format": "basic_html"},
                    "field_position": "3",
                    "field_archived": false,
                    "field_due": null
                },
                "relationships": {
                    "uid": {"data": {"type": "user--user", "id": "u1"}},
                    "field_assignees": {"data": [
                        {"type": "user--user", "id": "u1"},
                        {"type": "user--user", "id": "u2"}
                    ]},
                    "field_labels": {"data": null}
                }
            }],
            "included": [
                {"type": "user--user", "id": "u1", "attributes": {"name": "alice"}}
            ],
            "links": {"next": {"href": "https://example.test/jsonapi?page[offset]=50"}}
        })
    }

    #[test]
    fn test_parse_collection_with_relationships() {
        let doc: Document = serde_json::from_value(card_document()).unwrap();
        let resources = doc.resources();
        assert_eq!(resources.len(), 1);

        let card = resources[0];
        assert_eq!(card.kind, "node--card");
        assert_eq!(card.attr_str("title"), Some("Write docs"));
        assert_eq!(card.attr_text("body"), Some("Some *text*"));
        assert_eq!(card.attr_i64("field_position"), Some(3));
        assert_eq!(card.attr_bool("field_archived"), Some(false));
        assert_eq!(card.attr("field_due"), None);
        assert_eq!(card.related_id("uid"), Some("u1"));
        assert_eq!(card.related_ids("field_assignees"), vec!["u1", "u2"]);
        assert!(card.related_ids("field_labels").is_empty());
        assert!(doc.has_next_page());
    }

    #[test]
    fn test_resolve_skips_missing_included() {
        let doc: Document = serde_json::from_value(card_document()).unwrap();
        let card = doc.single().unwrap();
        let assignees = doc.resolve(card, "field_assignees");
        assert_eq!(assignees.len(), 1);
        assert_eq!(assignees[0].attr_str("name"), Some("alice"));
    }

    #[test]
    fn test_mutation_envelope_omits_empty_parts() {
        let resource = Resource::new("node--card")
            .with_attribute("title", "New card")
            .with_relationship(
                "field_list",
                Relationship::to_one(ResourceIdentifier::new("node--list", "l1")),
            );
        let value = serde_json::to_value(Document::from_resource(resource)).unwrap();

        assert_eq!(
            value,
            json!({
                "data": {
                    "type": "node--card",
                    "attributes": {"title": "New card"},
                    "relationships": {
                        "field_list": {"data": {"type": "node--list", "id": "l1"}}
                    }
                }
            })
        );
    }

    #[test]
    fn test_error_detail_prefers_detail_over_title() {
        let doc: Document = serde_json::from_value(json!({
            "errors": [{"status": "422", "title": "Unprocessable", "detail": "title: This value should not be null."}]
        }))
        .unwrap();
        assert_eq!(doc.error_detail(), Some("title: This value should not be null."));
        assert!(doc.resources().is_empty());
    }

    #[test]
    fn test_null_data_is_empty() {
        let doc: Document = serde_json::from_value(json!({"data": null})).unwrap();
        assert!(doc.single().is_none());
        assert!(!doc.has_next_page());
    }
}
