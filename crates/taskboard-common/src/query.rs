//! Query-string builder for JSON:API collection requests.
//!
//! ```
//! use taskboard_common::Query;
//!
//! let q = Query::new()
//!     .filter("field_list.id", "list-1")
//!     .include("field_assignees")
//!     .sort("field_position")
//!     .page(50, 0);
//! assert_eq!(q.to_pairs()[0], ("filter[field_list.id]".to_string(), "list-1".to_string()));
//! ```

/// Accumulated `filter`, `include`, `sort` and `page` parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    filters: Vec<(String, String)>,
    include: Vec<String>,
    sort: Vec<String>,
    limit: Option<u32>,
    offset: Option<u32>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand equality filter: `filter[path]=value`.
    pub fn filter(mut self, path: &str, value: impl Into<String>) -> Self {
        self.filters.push((format!("filter[{}]", path), value.into()));
        self
    }

    /// Named condition filter:
    /// `filter[name][condition][path|operator|value]`.
    pub fn condition(
        mut self,
        name: &str,
        path: &str,
        operator: &str,
        value: impl Into<String>,
    ) -> Self {
        let prefix = format!("filter[{}][condition]", name);
        self.filters.push((format!("{}[path]", prefix), path.to_string()));
        self.filters
            .push((format!("{}[operator]", prefix), operator.to_string()));
        self.filters.push((format!("{}[value]", prefix), value.into()));
        self
    }

    pub fn include(mut self, relationship: &str) -> Self {
        if !self.include.iter().any(|r| r == relationship) {
            self.include.push(relationship.to_string());
        }
        self
    }

    pub fn sort(mut self, field: &str) -> Self {
        self.sort.push(field.to_string());
        self
    }

    pub fn sort_desc(mut self, field: &str) -> Self {
        self.sort.push(format!("-{}", field));
        self
    }

    pub fn page(mut self, limit: u32, offset: u32) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
            && self.include.is_empty()
            && self.sort.is_empty()
            && self.limit.is_none()
            && self.offset.is_none()
    }

    /// Flatten into query pairs in a stable order: filters, include, sort, page.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = self.filters.clone();
        if !self.include.is_empty() {
            pairs.push(("include".to_string(), self.include.join(",")));
        }
        if !self.sort.is_empty() {
            pairs.push(("sort".to_string(), self.sort.join(",")));
        }
        if let Some(limit) = self.limit {
            pairs.push(("page[limit]".to_string(), limit.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("page[offset]".to_string(), offset.to_string()));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(k: &str, v: &str) -> (String, String) {
        (k.to_string(), v.to_string())
    }

    #[test]
    fn test_empty_query_has_no_pairs() {
        let q = Query::new();
        assert!(q.is_empty());
        assert!(q.to_pairs().is_empty());
    }

    #[test]
    fn test_full_query_order() {
        let q = Query::new()
            .filter("field_workspace.id", "ws-1")
            .include("field_role")
            .include("field_user")
            .sort("title")
            .sort_desc("created")
            .page(25, 50);

        assert_eq!(
            q.to_pairs(),
            vec![
                pair("filter[field_workspace.id]", "ws-1"),
                pair("include", "field_role,field_user"),
                pair("sort", "title,-created"),
                pair("page[limit]", "25"),
                pair("page[offset]", "50"),
            ]
        );
    }

    #[test]
    fn test_duplicate_include_is_ignored() {
        let q = Query::new().include("uid").include("uid");
        assert_eq!(q.to_pairs(), vec![pair("include", "uid")]);
    }

    #[test]
    fn test_condition_filter_expands_to_three_pairs() {
        let q = Query::new().condition("open", "status", "<>", "archived");
        assert_eq!(
            q.to_pairs(),
            vec![
                pair("filter[open][condition][path]", "status"),
                pair("filter[open][condition][operator]", "<>"),
                pair("filter[open][condition][value]", "archived"),
            ]
        );
    }
}
