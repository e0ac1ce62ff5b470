use taskboard_common::{Document, Query};

use crate::errors::ApiError;
use crate::http::ApiClient;
use crate::transform::cards::{cards_from_document, move_patch};
use crate::transform::checklists::checklists_from_document;
use crate::transform::comments::{comments_from_document, thread};
use crate::transform::relationships::links_from_document;
use crate::transform::{Card, CardLink, Checklist, Comment, RelationshipGraph, types};

const PAGE_SIZE: u32 = 50;

/// Every card on a board, archived ones only when asked for.
pub async fn board_cards(
    api: &ApiClient,
    board_id: &str,
    include_archived: bool,
) -> Result<Vec<Card>, ApiError> {
    let mut query = Query::new()
        .filter("field_board.id", board_id)
        .sort("field_position");
    if !include_archived {
        query = query.filter("field_archived", "0");
    }
    let doc = api.get_all(types::CARD, &query, PAGE_SIZE).await?;
    Ok(cards_from_document(&doc))
}

pub async fn get_card(api: &ApiClient, card_id: &str) -> Result<Card, ApiError> {
    let doc = api.get_resource(types::CARD, card_id, &Query::new()).await?;
    doc.single()
        .map(Card::from_resource)
        .ok_or_else(|| ApiError::Backend {
            status: 404,
            detail: format!("Card {} not found", card_id),
        })
}

pub async fn move_card(
    api: &ApiClient,
    card_id: &str,
    list_id: &str,
    position: f64,
) -> Result<Card, ApiError> {
    let updated = api
        .update_resource(move_patch(card_id, list_id, position))
        .await?;
    tracing::debug!(card_id, list_id, position, "card moved");
    Ok(Card::from_resource(&updated))
}

/// Threaded comments of a card, oldest first.
pub async fn card_comments(api: &ApiClient, card_id: &str) -> Result<Vec<Comment>, ApiError> {
    let query = Query::new()
        .filter("entity_id.id", card_id)
        .include("uid")
        .sort("created");
    let doc = api.get_all(types::COMMENT, &query, PAGE_SIZE).await?;
    Ok(thread(comments_from_document(&doc)))
}

pub async fn card_checklists(api: &ApiClient, card_id: &str) -> Result<Vec<Checklist>, ApiError> {
    let query = Query::new()
        .filter("field_card.id", card_id)
        .include("field_items");
    let doc = api.get_document(types::CHECKLIST, &query).await?;
    Ok(checklists_from_document(&doc))
}

/// Links touching `card_id` from either side, as a graph.
pub async fn card_relationships(
    api: &ApiClient,
    card_id: &str,
) -> Result<RelationshipGraph, ApiError> {
    let outgoing = api
        .get_document(
            types::CARD_RELATIONSHIP,
            &Query::new().filter("source_card.id", card_id),
        )
        .await?;
    let incoming = api
        .get_document(
            types::CARD_RELATIONSHIP,
            &Query::new().filter("target_card.id", card_id),
        )
        .await?;
    Ok(graph_from(&[outgoing, incoming]))
}

fn graph_from(docs: &[Document]) -> RelationshipGraph {
    let mut links: Vec<CardLink> = Vec::new();
    for doc in docs {
        for link in links_from_document(doc) {
            if !links.iter().any(|l| l.id == link.id) {
                links.push(link);
            }
        }
    }
    RelationshipGraph::build(&links)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_graph_from_merges_overlapping_documents() {
        let doc: Document = serde_json::from_value(json!({
            "data": [{
                "type": "card_relationship--card_relationship",
                "id": "l1",
                "attributes": {"relationship_type": "blocks"},
                "relationships": {
                    "source_card": {"data": {"type": "node--card", "id": "a"}},
                    "target_card": {"data": {"type": "node--card", "id": "b"}}
                }
            }]
        }))
        .unwrap();
        let graph = graph_from(&[doc.clone(), doc]);
        assert_eq!(graph.related("a").len(), 1);
        assert_eq!(graph.blockers("b"), vec!["a"]);
    }
}
