//! Checklists and their nested items.
//!
//! Items reference their parent item; the tree is rebuilt client-side and
//! each level is ordered by `weight`. Items whose parent is missing, and
//! items caught in a parent cycle, are promoted to the top level so nothing
//! the server sent is hidden.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use taskboard_common::{Document, Resource};

use super::types;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: String,
    pub title: String,
    pub completed: bool,
    pub weight: i64,
    pub parent_id: Option<String>,
    pub children: Vec<ChecklistItem>,
}

impl ChecklistItem {
    pub fn from_resource(resource: &Resource) -> Self {
        Self {
            id: resource.id.clone(),
            title: resource.attr_str("title").unwrap_or_default().to_string(),
            completed: resource.attr_bool("field_completed").unwrap_or(false),
            weight: resource.attr_i64("field_weight").unwrap_or(0),
            parent_id: resource.related_id("field_parent").map(str::to_string),
            children: Vec::new(),
        }
    }

    /// `(completed, total)` over this item and its descendants.
    pub fn completion(&self) -> (usize, usize) {
        self.children.iter().fold(
            (usize::from(self.completed), 1),
            |(done, total), child| {
                let (d, t) = child.completion();
                (done + d, total + t)
            },
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checklist {
    pub id: String,
    pub title: String,
    pub card_id: Option<String>,
    pub items: Vec<ChecklistItem>,
}

impl Checklist {
    /// `(completed, total)` across every item at every depth.
    pub fn completion(&self) -> (usize, usize) {
        self.items.iter().fold((0, 0), |(done, total), item| {
            let (d, t) = item.completion();
            (done + d, total + t)
        })
    }

    /// Whole-number percentage; an empty checklist is 0%.
    pub fn progress_percent(&self) -> u8 {
        match self.completion() {
            (_, 0) => 0,
            (done, total) => ((done * 100) / total) as u8,
        }
    }
}

/// Nest flat items under their parents.
pub fn build_item_tree(items: Vec<ChecklistItem>) -> Vec<ChecklistItem> {
    let ids: HashSet<String> = items.iter().map(|i| i.id.clone()).collect();
    let mut by_parent: HashMap<Option<String>, Vec<ChecklistItem>> = HashMap::new();
    for item in items {
        let parent = item
            .parent_id
            .clone()
            .filter(|p| ids.contains(p) && *p != item.id);
        by_parent.entry(parent).or_default().push(item);
    }

    let mut visited = HashSet::new();
    let mut roots = attach(None, &mut by_parent, &mut visited);

    // Anything left belongs to a parent cycle.
    let mut leftovers: Vec<ChecklistItem> = by_parent.into_values().flatten().collect();
    leftovers.sort_by(|a, b| a.weight.cmp(&b.weight).then_with(|| a.id.cmp(&b.id)));
    for mut item in leftovers {
        item.children.clear();
        roots.push(item);
    }
    roots
}

fn attach(
    parent: Option<String>,
    by_parent: &mut HashMap<Option<String>, Vec<ChecklistItem>>,
    visited: &mut HashSet<String>,
) -> Vec<ChecklistItem> {
    let mut level = by_parent.remove(&parent).unwrap_or_default();
    level.sort_by(|a, b| a.weight.cmp(&b.weight).then_with(|| a.id.cmp(&b.id)));
    level
        .into_iter()
        .filter_map(|mut item| {
            if !visited.insert(item.id.clone()) {
                return None;
            }
            item.children = attach(Some(item.id.clone()), by_parent, visited);
            Some(item)
        })
        .collect()
}

/// Checklists of a document with their items resolved from `included`.
pub fn checklists_from_document(doc: &Document) -> Vec<Checklist> {
    doc.resources()
        .into_iter()
        .filter(|r| r.kind == types::CHECKLIST)
        .map(|resource| {
            let items = doc
                .resolve(resource, "field_items")
                .into_iter()
                .map(ChecklistItem::from_resource)
                .collect();
            Checklist {
                id: resource.id.clone(),
                title: resource.attr_str("title").unwrap_or_default().to_string(),
                card_id: resource.related_id("field_card").map(str::to_string),
                items: build_item_tree(items),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(id: &str, parent: Option<&str>, weight: i64, completed: bool) -> ChecklistItem {
        ChecklistItem {
            id: id.into(),
            title: id.to_uppercase(),
            completed,
            weight,
            parent_id: parent.map(str::to_string),
            children: Vec::new(),
        }
    }

    #[test]
    fn test_tree_nests_and_orders_by_weight() {
        let tree = build_item_tree(vec![
            item("b", None, 2, false),
            item("a", None, 1, true),
            item("a2", Some("a"), 5, false),
            item("a1", Some("a"), 0, true),
        ]);
        let roots: Vec<&str> = tree.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(roots, vec!["a", "b"]);
        let children: Vec<&str> = tree[0].children.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(children, vec!["a1", "a2"]);
    }

    #[test]
    fn test_orphans_become_roots() {
        let tree = build_item_tree(vec![item("x", Some("gone"), 0, false)]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].id, "x");
    }

    #[test]
    fn test_cycles_do_not_lose_items() {
        let tree = build_item_tree(vec![
            item("p", Some("q"), 0, false),
            item("q", Some("p"), 1, false),
            item("self", Some("self"), 2, false),
        ]);
        let mut ids: Vec<&str> = tree.iter().map(|i| i.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["p", "q", "self"]);
    }

    #[test]
    fn test_completion_counts_all_depths() {
        let checklist = Checklist {
            id: "cl".into(),
            title: "Launch".into(),
            card_id: None,
            items: build_item_tree(vec![
                item("a", None, 0, true),
                item("a1", Some("a"), 0, true),
                item("b", None, 1, false),
                item("b1", Some("b"), 0, false),
            ]),
        };
        assert_eq!(checklist.completion(), (2, 4));
        assert_eq!(checklist.progress_percent(), 50);

        let empty = Checklist {
            items: Vec::new(),
            ..checklist
        };
        assert_eq!(empty.progress_percent(), 0);
    }

    #[test]
    fn test_checklists_from_document_resolves_included_items() {
        let doc: Document = serde_json::from_value(json!({
            "data": [{
                "type": "node--checklist",
                "id": "cl1",
                "attributes": {"title": "QA"},
                "relationships": {
                    "field_card": {"data": {"type": "node--card", "id": "c1"}},
                    "field_items": {"data": [
                        {"type": "checklist_item--checklist_item", "id": "i1"},
                        {"type": "checklist_item--checklist_item", "id": "i2"},
                        {"type": "checklist_item--checklist_item", "id": "missing"}
                    ]}
                }
            }],
            "included": [
                {
                    "type": "checklist_item--checklist_item",
                    "id": "i2",
                    "attributes": {"title": "Child", "field_completed": true, "field_weight": 0},
                    "relationships": {"field_parent": {"data": {"type": "checklist_item--checklist_item", "id": "i1"}}}
                },
                {
                    "type": "checklist_item--checklist_item",
                    "id": "i1",
                    "attributes": {"title": "Parent", "field_weight": 0}
                }
            ]
        }))
        .unwrap();

        let lists = checklists_from_document(&doc);
        assert_eq!(lists.len(), 1);
        assert_eq!(lists[0].card_id.as_deref(), Some("c1"));
        assert_eq!(lists[0].items.len(), 1);
        assert_eq!(lists[0].items[0].children[0].title, "Child");
        assert_eq!(lists[0].completion(), (1, 2));
    }
}
