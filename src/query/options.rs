//! Typed list options shared by every collection endpoint.
//!
//! Raw query-string input (`ListParams`) is validated once against a
//! per-endpoint `ListSpec` into a `ListQuery`; the `ListQuery` is the only
//! thing that touches SQL. Handlers never append filters conditionally on
//! their own.

use chrono::NaiveDate;
use serde::Deserialize;

use super::error::QueryError;
use super::sql::SqlWhere;

/// Raw, caller-supplied list parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
    pub status: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Static per-endpoint configuration: which columns the caller may touch
#[derive(Debug)]
pub struct ListSpec {
    /// Columns the free-text search OR-combines over
    pub search_columns: &'static [&'static str],
    /// Accepted values for the `status` equality filter; empty slice means
    /// the endpoint has no status filter
    pub status_values: &'static [&'static str],
    /// Column the inclusive date range applies to
    pub date_column: &'static str,
    /// Columns the caller may sort by
    pub sortable_columns: &'static [&'static str],
    pub default_sort: (&'static str, SortDirection),
}

/// Validated list query, ready to compile into SQL fragments
#[derive(Debug)]
pub struct ListQuery {
    spec: &'static ListSpec,
    search: Option<String>,
    status: Option<String>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    sort_column: &'static str,
    sort_direction: SortDirection,
    pub page: u32,
    pub per_page: u32,
}

impl ListQuery {
    pub fn build(params: ListParams, spec: &'static ListSpec) -> Result<Self, QueryError> {
        let search = params.search.and_then(non_empty);
        let status = match params.status.and_then(non_empty) {
            None => None,
            Some(s) => {
                if spec.status_values.contains(&s.as_str()) {
                    Some(s)
                } else {
                    return Err(QueryError::UnknownStatus(s));
                }
            }
        };

        if let (Some(start), Some(end)) = (params.start_date, params.end_date) {
            if start > end {
                return Err(QueryError::InvalidDateRange);
            }
        }

        let sort_column = match params.sort_by.and_then(non_empty) {
            None => spec.default_sort.0,
            Some(requested) => spec
                .sortable_columns
                .iter()
                .find(|c| **c == requested)
                .copied()
                .ok_or(QueryError::UnknownSortColumn(requested))?,
        };

        let sort_direction = match params.sort_order.and_then(non_empty) {
            None => {
                if sort_column == spec.default_sort.0 {
                    spec.default_sort.1
                } else {
                    SortDirection::Asc
                }
            }
            Some(order) => match order.to_ascii_lowercase().as_str() {
                "asc" => SortDirection::Asc,
                "desc" => SortDirection::Desc,
                _ => return Err(QueryError::InvalidSortOrder(order)),
            },
        };

        let Pagination { page, per_page } = Pagination::build(params.page, params.per_page)?;

        Ok(Self {
            spec,
            search,
            status,
            start_date: params.start_date,
            end_date: params.end_date,
            sort_column,
            sort_direction,
            page,
            per_page,
        })
    }

    /// Append the caller's filters to a WHERE fragment. Tenant scoping is
    /// the handler's job and always comes first.
    pub fn apply_filters(&self, w: &mut SqlWhere) {
        if let Some(search) = &self.search {
            if !self.spec.search_columns.is_empty() {
                w.ilike_any(self.spec.search_columns, search);
            }
        }
        if let Some(status) = &self.status {
            w.eq_str("status", status);
        }
        if let Some(start) = self.start_date {
            w.date_gte(self.spec.date_column, start);
        }
        if let Some(end) = self.end_date {
            w.date_lte(self.spec.date_column, end);
        }
    }

    pub fn order_clause(&self) -> String {
        format!("ORDER BY {} {}", self.sort_column, self.sort_direction.to_sql())
    }

    pub fn limit_clause(&self) -> String {
        format!("LIMIT {} OFFSET {}", self.per_page, self.offset())
    }

    pub fn offset(&self) -> u32 {
        (self.page - 1) * self.per_page
    }
}

/// Validated page window, shared by `ListQuery` and the endpoints that
/// paginate without the full filter set
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Pagination {
    pub fn build(page: Option<u32>, per_page: Option<u32>) -> Result<Self, QueryError> {
        let page = page.unwrap_or(1);
        if page < 1 {
            return Err(QueryError::InvalidPage);
        }

        let pagination = &crate::config::config().pagination;
        let per_page = match per_page {
            None => pagination.default_per_page,
            Some(0) => return Err(QueryError::InvalidPerPage),
            // Oversized requests are capped, not rejected
            Some(n) => n.min(pagination.max_per_page),
        };

        Ok(Self { page, per_page })
    }

    pub fn offset(&self) -> u32 {
        (self.page - 1) * self.per_page
    }

    pub fn limit_clause(&self) -> String {
        format!("LIMIT {} OFFSET {}", self.per_page, self.offset())
    }
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static SPEC: ListSpec = ListSpec {
        search_columns: &["first_name", "last_name", "email"],
        status_values: &["active", "archived"],
        date_column: "created_at",
        sortable_columns: &["created_at", "first_name", "company"],
        default_sort: ("created_at", SortDirection::Desc),
    };

    #[test]
    fn defaults_apply_when_params_absent() {
        let q = ListQuery::build(ListParams::default(), &SPEC).unwrap();
        assert_eq!(q.page, 1);
        assert_eq!(q.per_page, crate::config::config().pagination.default_per_page);
        assert_eq!(q.order_clause(), "ORDER BY created_at DESC");
    }

    #[test]
    fn unknown_sort_column_is_rejected() {
        let params = ListParams { sort_by: Some("password_hash".into()), ..Default::default() };
        let err = ListQuery::build(params, &SPEC).unwrap_err();
        assert!(matches!(err, QueryError::UnknownSortColumn(_)));
        assert_eq!(err.field(), "sort_by");
    }

    #[test]
    fn explicit_sort_defaults_to_ascending() {
        let params = ListParams { sort_by: Some("first_name".into()), ..Default::default() };
        let q = ListQuery::build(params, &SPEC).unwrap();
        assert_eq!(q.order_clause(), "ORDER BY first_name ASC");
    }

    #[test]
    fn unknown_status_is_rejected() {
        let params = ListParams { status: Some("pending".into()), ..Default::default() };
        assert!(matches!(
            ListQuery::build(params, &SPEC).unwrap_err(),
            QueryError::UnknownStatus(_)
        ));
    }

    #[test]
    fn per_page_is_capped_at_config_max() {
        let params = ListParams { per_page: Some(100_000), ..Default::default() };
        let q = ListQuery::build(params, &SPEC).unwrap();
        assert!(q.per_page <= crate::config::config().pagination.max_per_page);
    }

    #[test]
    fn inverted_date_range_is_rejected() {
        let params = ListParams {
            start_date: NaiveDate::from_ymd_opt(2026, 8, 2),
            end_date: NaiveDate::from_ymd_opt(2026, 8, 1),
            ..Default::default()
        };
        assert!(matches!(
            ListQuery::build(params, &SPEC).unwrap_err(),
            QueryError::InvalidDateRange
        ));
    }

    #[test]
    fn blank_params_count_as_absent() {
        let params = ListParams {
            search: Some("  ".into()),
            status: Some(String::new()),
            ..Default::default()
        };
        let q = ListQuery::build(params, &SPEC).unwrap();
        let mut w = SqlWhere::new();
        q.apply_filters(&mut w);
        assert_eq!(w.clause(), "1=1");
    }

    #[test]
    fn filters_compile_in_one_place() {
        let params = ListParams {
            search: Some("ann".into()),
            status: Some("active".into()),
            start_date: NaiveDate::from_ymd_opt(2026, 8, 1),
            end_date: NaiveDate::from_ymd_opt(2026, 8, 31),
            ..Default::default()
        };
        let q = ListQuery::build(params, &SPEC).unwrap();
        let mut w = SqlWhere::new();
        q.apply_filters(&mut w);
        assert_eq!(
            w.clause(),
            "(first_name ILIKE $1 OR last_name ILIKE $1 OR email ILIKE $1) \
             AND status = $2 AND created_at::date >= $3 AND created_at::date <= $4"
        );
    }

    #[test]
    fn offset_follows_page_and_per_page() {
        let params = ListParams { page: Some(3), per_page: Some(10), ..Default::default() };
        let q = ListQuery::build(params, &SPEC).unwrap();
        assert_eq!(q.offset(), 20);
        assert_eq!(q.limit_clause(), "LIMIT 10 OFFSET 20");
    }
}
