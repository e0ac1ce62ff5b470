use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use taskboard_common::{Document, Relationship, Resource, ResourceIdentifier};

use super::{owned_ids, timestamp_attr, types};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub list_id: Option<String>,
    pub board_id: Option<String>,
    pub position: f64,
    pub due_date: Option<DateTime<Utc>>,
    pub archived: bool,
    pub owner_id: Option<String>,
    pub assignee_ids: Vec<String>,
    pub label_ids: Vec<String>,
    pub created: Option<DateTime<Utc>>,
    pub changed: Option<DateTime<Utc>>,
}

impl Card {
    pub fn from_resource(resource: &Resource) -> Self {
        Self {
            id: resource.id.clone(),
            title: resource.attr_str("title").unwrap_or_default().to_string(),
            description: resource.attr_text("body").map(str::to_string),
            list_id: resource.related_id("field_list").map(str::to_string),
            board_id: resource.related_id("field_board").map(str::to_string),
            position: resource.attr_f64("field_position").unwrap_or(0.0),
            due_date: timestamp_attr(resource, "field_due_date"),
            archived: resource.attr_bool("field_archived").unwrap_or(false),
            owner_id: resource.related_id("uid").map(str::to_string),
            assignee_ids: owned_ids(resource.related_ids("field_assignees")),
            label_ids: owned_ids(resource.related_ids("field_labels")),
            created: timestamp_attr(resource, "created"),
            changed: timestamp_attr(resource, "changed"),
        }
    }

    /// Ownership as the permission predicates expect it.
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_id.as_deref() == Some(user_id)
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.archived && self.due_date.is_some_and(|due| due < now)
    }
}

/// Cards of a document, ordered by position then title.
pub fn cards_from_document(doc: &Document) -> Vec<Card> {
    let mut cards: Vec<Card> = doc
        .resources()
        .into_iter()
        .filter(|r| r.kind == types::CARD)
        .map(Card::from_resource)
        .collect();
    cards.sort_by(|a, b| {
        a.position
            .total_cmp(&b.position)
            .then_with(|| a.title.cmp(&b.title))
    });
    cards
}

/// Cards bucketed by list id. Cards without a list are left out.
pub fn group_by_list(cards: &[Card]) -> BTreeMap<String, Vec<Card>> {
    let mut lists: BTreeMap<String, Vec<Card>> = BTreeMap::new();
    for card in cards {
        if let Some(list) = &card.list_id {
            lists.entry(list.clone()).or_default().push(card.clone());
        }
    }
    lists
}

/// PATCH payload moving a card to `list_id` at `position`.
pub fn move_patch(card_id: &str, list_id: &str, position: f64) -> Resource {
    Resource::new(types::CARD)
        .with_id(card_id)
        .with_attribute("field_position", position)
        .with_relationship(
            "field_list",
            Relationship::to_one(ResourceIdentifier::new(types::LIST, list_id)),
        )
}
