//! List query parsing: pagination, sort and exact-match filters.

use crate::db::{validate_field_name, FindQuery, SortOrder, CREATED_AT_FIELD};
use crate::error::AppError;
use crate::service::validation::Rules;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use utoipa::ToSchema;

pub const DEFAULT_LIMIT: u64 = 25;
pub const MAX_LIMIT: u64 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct PageRef {
    pub page: u64,
    pub limit: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageRef>,
}

#[derive(Clone, Debug)]
pub struct ListParams {
    pub page: u64,
    pub limit: u64,
    pub query: FindQuery,
}

impl ListParams {
    /// `page`, `limit` and `sort` are reserved; other keys filter when they name a field in `rules`.
    pub fn from_query(params: &HashMap<String, String>, rules: Rules) -> Result<Self, AppError> {
        let page = match params.get("page") {
            Some(v) => v
                .parse::<u64>()
                .ok()
                .filter(|p| *p >= 1)
                .ok_or_else(|| AppError::BadRequest("page must be a positive integer".into()))?,
            None => 1,
        };
        let limit = match params.get("limit") {
            Some(v) => v
                .parse::<u64>()
                .ok()
                .filter(|l| *l >= 1)
                .ok_or_else(|| AppError::BadRequest("limit must be a positive integer".into()))?
                .min(MAX_LIMIT),
            None => DEFAULT_LIMIT,
        };
        let sort = match params.get("sort") {
            Some(v) => parse_sort(v, rules)?,
            None => vec![(CREATED_AT_FIELD.to_string(), SortOrder::Desc)],
        };

        let mut filter = Map::new();
        for (k, v) in params {
            if rules.iter().any(|(name, _)| *name == k.as_str()) {
                filter.insert(k.clone(), Value::String(v.clone()));
            }
        }

        // a page past every possible row is just empty
        let offset = (page - 1).checked_mul(limit).unwrap_or(u64::MAX);

        Ok(ListParams {
            page,
            limit,
            query: FindQuery {
                filter,
                sort,
                limit: Some(limit),
                offset,
            },
        })
    }

    pub fn pagination(&self, total: u64) -> Pagination {
        let end = self.page.saturating_mul(self.limit);
        Pagination {
            next: (end < total).then_some(PageRef {
                page: self.page.saturating_add(1),
                limit: self.limit,
            }),
            prev: (self.page > 1).then_some(PageRef {
                page: self.page - 1,
                limit: self.limit,
            }),
        }
    }
}

/// `name,-createdAt` → name ascending then newest first.
fn parse_sort(raw: &str, rules: Rules) -> Result<Vec<(String, SortOrder)>, AppError> {
    let mut out = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (field, order) = match part.strip_prefix('-') {
            Some(f) => (f, SortOrder::Desc),
            None => (part, SortOrder::Asc),
        };
        let known = field == CREATED_AT_FIELD || rules.iter().any(|(name, _)| *name == field);
        if !known || validate_field_name(field).is_err() {
            return Err(AppError::BadRequest(format!("cannot sort by {}", field)));
        }
        out.push((field.to_string(), order));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Hospital, Resource};

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn defaults() {
        let p = ListParams::from_query(&params(&[]), Hospital::RULES).unwrap();
        assert_eq!(p.page, 1);
        assert_eq!(p.limit, DEFAULT_LIMIT);
        assert_eq!(p.query.offset, 0);
        assert_eq!(p.query.sort, vec![("createdAt".to_string(), SortOrder::Desc)]);
        assert!(p.query.filter.is_empty());
    }

    #[test]
    fn filters_only_known_fields() {
        let p = ListParams::from_query(
            &params(&[("province", "Bangkok"), ("password", "x"), ("page", "3"), ("limit", "10")]),
            Hospital::RULES,
        )
        .unwrap();
        assert_eq!(p.query.filter.len(), 1);
        assert_eq!(p.query.filter["province"], "Bangkok");
        assert_eq!(p.query.offset, 20);
    }

    #[test]
    fn limit_is_capped_and_sort_is_checked() {
        let p = ListParams::from_query(&params(&[("limit", "5000"), ("sort", "name,-createdAt")]), Hospital::RULES)
            .unwrap();
        assert_eq!(p.limit, MAX_LIMIT);
        assert_eq!(p.query.sort.len(), 2);
        assert!(ListParams::from_query(&params(&[("sort", "password")]), Hospital::RULES).is_err());
        assert!(ListParams::from_query(&params(&[("page", "0")]), Hospital::RULES).is_err());
    }

    #[test]
    fn pagination_links() {
        let p = ListParams::from_query(&params(&[("page", "2"), ("limit", "10")]), Hospital::RULES).unwrap();
        let links = p.pagination(35);
        assert_eq!(links.next, Some(PageRef { page: 3, limit: 10 }));
        assert_eq!(links.prev, Some(PageRef { page: 1, limit: 10 }));
        assert_eq!(p.pagination(20).next, None);
    }

    #[test]
    fn huge_page_is_past_the_end() {
        let p = ListParams::from_query(&params(&[("page", "999999999999999999"), ("limit", "100")]), Hospital::RULES)
            .unwrap();
        assert_eq!(p.query.offset, u64::MAX);
        let links = p.pagination(3);
        assert_eq!(links.next, None);
        assert_eq!(links.prev.map(|r| r.page), Some(999999999999999998));
    }
}
