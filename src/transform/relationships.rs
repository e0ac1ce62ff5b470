//! Card-to-card links and the adjacency graph built from them.
//!
//! The backend stores each link once, from the source card's side. The
//! graph records both directions so either card can list its relations:
//!
//! | Stored       | Source sees    | Target sees      |
//! |--------------|----------------|------------------|
//! | `blocks`     | `blocks`       | `blocked_by`     |
//! | `relates_to` | `relates_to`   | `relates_to`     |
//! | `duplicates` | `duplicates`   | `duplicated_by`  |

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use taskboard_common::{Document, Resource};

use super::types;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Blocks,
    BlockedBy,
    RelatesTo,
    Duplicates,
    DuplicatedBy,
}

impl RelationKind {
    pub fn inverse(self) -> Self {
        match self {
            RelationKind::Blocks => RelationKind::BlockedBy,
            RelationKind::BlockedBy => RelationKind::Blocks,
            RelationKind::RelatesTo => RelationKind::RelatesTo,
            RelationKind::Duplicates => RelationKind::DuplicatedBy,
            RelationKind::DuplicatedBy => RelationKind::Duplicates,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "blocks" => Some(RelationKind::Blocks),
            "blocked_by" => Some(RelationKind::BlockedBy),
            "relates_to" | "related" => Some(RelationKind::RelatesTo),
            "duplicates" => Some(RelationKind::Duplicates),
            "duplicated_by" => Some(RelationKind::DuplicatedBy),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RelationKind::Blocks => "blocks",
            RelationKind::BlockedBy => "is blocked by",
            RelationKind::RelatesTo => "relates to",
            RelationKind::Duplicates => "duplicates",
            RelationKind::DuplicatedBy => "is duplicated by",
        }
    }
}

/// One stored link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardLink {
    pub id: String,
    pub source: String,
    pub target: String,
    pub kind: RelationKind,
}

impl CardLink {
    /// `None` for links with an unknown kind or a missing end.
    pub fn from_resource(resource: &Resource) -> Option<Self> {
        let kind = resource
            .attr_str("relationship_type")
            .and_then(RelationKind::parse);
        let Some(kind) = kind else {
            tracing::debug!(id = %resource.id, "skipping card link with unknown type");
            return None;
        };
        Some(Self {
            id: resource.id.clone(),
            source: resource.related_id("source_card")?.to_string(),
            target: resource.related_id("target_card")?.to_string(),
            kind,
        })
    }
}

/// An edge as seen from one card.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    pub kind: RelationKind,
    pub card: String,
    pub link_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipGraph {
    edges: BTreeMap<String, Vec<Edge>>,
}

impl RelationshipGraph {
    /// Build with inverse edges. Self-links are ignored; duplicate links
    /// produce a single edge.
    pub fn build<'a>(links: impl IntoIterator<Item = &'a CardLink>) -> Self {
        let mut graph = Self::default();
        for link in links {
            if link.source == link.target {
                continue;
            }
            graph.insert(&link.source, link.kind, &link.target, &link.id);
            graph.insert(&link.target, link.kind.inverse(), &link.source, &link.id);
        }
        for edges in graph.edges.values_mut() {
            edges.sort();
        }
        graph
    }

    fn insert(&mut self, from: &str, kind: RelationKind, to: &str, link_id: &str) {
        let edges = self.edges.entry(from.to_string()).or_default();
        if !edges.iter().any(|e| e.kind == kind && e.card == to) {
            edges.push(Edge {
                kind,
                card: to.to_string(),
                link_id: link_id.to_string(),
            });
        }
    }

    pub fn related(&self, card: &str) -> &[Edge] {
        self.edges.get(card).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn of_kind(&self, card: &str, kind: RelationKind) -> Vec<&str> {
        self.related(card)
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.card.as_str())
            .collect()
    }

    /// Cards that must finish before `card`.
    pub fn blockers(&self, card: &str) -> Vec<&str> {
        self.of_kind(card, RelationKind::BlockedBy)
    }

    pub fn is_blocked(&self, card: &str) -> bool {
        !self.blockers(card).is_empty()
    }

    pub fn card_count(&self) -> usize {
        self.edges.len()
    }
}

/// Links of a document.
pub fn links_from_document(doc: &Document) -> Vec<CardLink> {
    doc.resources()
        .into_iter()
        .filter(|r| r.kind == types::CARD_RELATIONSHIP)
        .filter_map(CardLink::from_resource)
        .collect()
}
