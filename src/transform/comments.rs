use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use taskboard_common::{Document, Resource};

use super::{timestamp_attr, types};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub name: String,
}

impl Author {
    fn from_user(user: &Resource) -> Self {
        let name = user
            .attr_str("display_name")
            .or_else(|| user.attr_str("name"))
            .unwrap_or("Unknown user");
        Self {
            id: user.id.clone(),
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub body: String,
    pub author: Option<Author>,
    pub card_id: Option<String>,
    pub parent_id: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub changed: Option<DateTime<Utc>>,
    pub replies: Vec<Comment>,
}

impl Comment {
    /// Build from a comment resource, resolving the author from `included`.
    /// An author that was not included keeps its id with a placeholder name.
    pub fn from_resource(resource: &Resource, doc: &Document) -> Self {
        let author = resource.related_id("uid").map(|id| {
            doc.find_included(types::USER, id)
                .map(Author::from_user)
                .unwrap_or_else(|| Author {
                    id: id.to_string(),
                    name: "Unknown user".to_string(),
                })
        });
        Self {
            id: resource.id.clone(),
            body: resource
                .attr_text("comment_body")
                .unwrap_or_default()
                .to_string(),
            author,
            card_id: resource.related_id("entity_id").map(str::to_string),
            parent_id: resource.related_id("pid").map(str::to_string),
            created: timestamp_attr(resource, "created"),
            changed: timestamp_attr(resource, "changed"),
            replies: Vec::new(),
        }
    }

    pub fn is_edited(&self) -> bool {
        match (self.created, self.changed) {
            (Some(created), Some(changed)) => changed > created,
            _ => false,
        }
    }

    /// Number of comments in this thread, including this one.
    pub fn thread_len(&self) -> usize {
        1 + self.replies.iter().map(Comment::thread_len).sum::<usize>()
    }
}

/// Flat comments of a document, oldest first.
pub fn comments_from_document(doc: &Document) -> Vec<Comment> {
    let mut comments: Vec<Comment> = doc
        .resources()
        .into_iter()
        .filter(|r| r.kind == types::COMMENT)
        .map(|r| Comment::from_resource(r, doc))
        .collect();
    sort_oldest_first(&mut comments);
    comments
}

/// Nest replies under their parent comment. Replies to comments that are
/// not present stay at the top level.
pub fn thread(comments: Vec<Comment>) -> Vec<Comment> {
    let present: std::collections::HashSet<String> =
        comments.iter().map(|c| c.id.clone()).collect();
    let mut children: HashMap<String, Vec<Comment>> = HashMap::new();
    let mut roots = Vec::new();
    for comment in comments {
        match comment.parent_id.clone() {
            Some(parent) if present.contains(&parent) && parent != comment.id => {
                children.entry(parent).or_default().push(comment)
            }
            _ => roots.push(comment),
        }
    }
    sort_oldest_first(&mut roots);
    let mut threads: Vec<Comment> = roots
        .into_iter()
        .map(|root| attach_replies(root, &mut children))
        .collect();

    // Parent cycles never reach a root; surface them flat.
    let mut stranded: Vec<Comment> = children.into_values().flatten().collect();
    sort_oldest_first(&mut stranded);
    threads.extend(stranded);
    threads
}

fn attach_replies(mut comment: Comment, children: &mut HashMap<String, Vec<Comment>>) -> Comment {
    let mut replies = children.remove(&comment.id).unwrap_or_default();
    sort_oldest_first(&mut replies);
    comment.replies = replies
        .into_iter()
        .map(|reply| attach_replies(reply, children))
        .collect();
    comment
}

fn sort_oldest_first(comments: &mut [Comment]) {
    comments.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.id.cmp(&b.id)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document() -> Document {
        serde_json::from_value(json!({
            "data": [
                {
                    "type": "comment--card_comment",
                    "id": "reply",
                    "attributes": {"comment_body": {"value": "Agreed"}, "created": "2024-05-02T09:00:00+00:00"},
                    "relationships": {
                        "uid": {"data": {"type": "user--user", "id": "u2"}},
                        "pid": {"data": {"type": "comment--card_comment", "id": "root"}},
                        "entity_id": {"data": {"type": "node--card", "id": "c1"}}
                    }
                },
                {
                    "type": "comment--card_comment",
                    "id": "root",
                    "attributes": {
                        "comment_body": "Ship it?",
                        "created": "2024-05-01T09:00:00+00:00",
                        "changed": "2024-05-01T10:00:00+00:00"
                    },
                    "relationships": {
                        "uid": {"data": {"type": "user--user", "id": "u1"}},
                        "entity_id": {"data": {"type": "node--card", "id": "c1"}}
                    }
                }
            ],
            "included": [
                {"type": "user--user", "id": "u1", "attributes": {"display_name": "Alice"}}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_authors_resolved_from_included() {
        let comments = comments_from_document(&document());
        assert_eq!(comments[0].id, "root");
        assert_eq!(comments[0].author.as_ref().unwrap().name, "Alice");
        assert_eq!(comments[1].author.as_ref().unwrap().name, "Unknown user");
        assert_eq!(comments[1].author.as_ref().unwrap().id, "u2");
        assert_eq!(comments[1].body, "Agreed");
    }

    #[test]
    fn test_thread_nests_replies() {
        let threads = thread(comments_from_document(&document()));
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].replies.len(), 1);
        assert_eq!(threads[0].replies[0].id, "reply");
        assert_eq!(threads[0].thread_len(), 2);
        assert!(threads[0].is_edited());
        assert!(!threads[0].replies[0].is_edited());
    }

    #[test]
    fn test_reply_to_missing_parent_stays_top_level() {
        let mut comments = comments_from_document(&document());
        comments.retain(|c| c.id == "reply");
        let threads = thread(comments);
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].id, "reply");
    }
}
