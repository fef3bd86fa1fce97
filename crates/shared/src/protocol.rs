use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::RecordId;

pub const CREATED_AT: &str = "created_at";
pub const ARCHIVE_PAGE_SIZE: u32 = 20;
pub const ALL_CATEGORIES: &str = "all";

/// A persisted record: the entity fields plus the identity and timestamp
/// assigned when it was written. `created_at` never changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stored<E> {
    pub id: RecordId,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: E,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub descending: bool,
}

impl Default for Order {
    fn default() -> Self {
        Self {
            column: CREATED_AT.to_string(),
            descending: true,
        }
    }
}

/// Equality predicate on a single column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub order: Order,
    pub filters: Vec<Filter>,
    pub limit: Option<u32>,
    pub offset: u32,
}

impl ListQuery {
    pub fn newest_first() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filters.push(Filter {
            column: column.into(),
            value: value.to_string(),
        });
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, descending: bool) -> Self {
        self.order = Order {
            column: column.into(),
            descending,
        };
        self
    }

    /// One page of the photo archive. `None` and `"all"` both mean every
    /// category.
    pub fn archive_page(category: Option<&str>, limit: u32, offset: u32) -> Self {
        let query = Self::newest_first().limit(limit).offset(offset);
        match category {
            Some(category) if category != ALL_CATEGORIES => query.eq("category", category),
            _ => query,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GuestPhoto;

    #[test]
    fn stored_record_flattens_entity_fields() {
        let raw = r#"{
            "id": 9,
            "created_at": "2025-09-14T18:30:00Z",
            "guest_name": "Cara",
            "image_url": "https://cdn.example.com/a.jpg"
        }"#;
        let stored: Stored<GuestPhoto> = serde_json::from_str(raw).expect("stored photo");
        assert_eq!(stored.id, RecordId::Numeric(9));
        assert_eq!(stored.fields.guest_name, "Cara");

        let value = serde_json::to_value(&stored).expect("json");
        assert_eq!(value["image_url"], "https://cdn.example.com/a.jpg");
        assert!(value.get("fields").is_none());
    }

    #[test]
    fn archive_page_skips_filter_for_all() {
        let all = ListQuery::archive_page(Some(ALL_CATEGORIES), ARCHIVE_PAGE_SIZE, 40);
        assert!(all.filters.is_empty());
        assert_eq!(all.limit, Some(20));
        assert_eq!(all.offset, 40);

        let party = ListQuery::archive_page(Some("party"), 10, 0);
        assert_eq!(
            party.filters,
            vec![Filter {
                column: "category".into(),
                value: "party".into()
            }]
        );
        assert!(party.order.descending);
    }
}
