//! Typed lead query predicates
//!
//! Every listing, sync and export query is described by a [`LeadQuery`]
//! and rendered by [`push_filters`]. Column names never come from callers
//! directly; sorting goes through the [`SORTABLE_COLUMNS`] whitelist.

use super::model::{db_timestamp, LeadStatus};
use super::schema::SORTABLE_COLUMNS;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite};

/// A single predicate over the `leads` table
#[derive(Debug, Clone, PartialEq)]
pub enum LeadFilter {
    /// Substring of name, email or practice name. Case folding is ASCII
    /// only, matching SQLite's `LOWER()`.
    Search(String),
    Status(LeadStatus),
    UtmSource(String),
    /// `created_at >= t`
    CreatedFrom(DateTime<Utc>),
    /// `created_at < t`
    CreatedBefore(DateTime<Utc>),
    /// Non-empty `gclid`
    HasGclid,
    ConversionSent(bool),
    Ids(Vec<String>),
}

impl LeadFilter {
    /// Won leads with a click id that have not been uploaded yet
    pub fn pending_sync() -> Vec<LeadFilter> {
        vec![
            LeadFilter::Status(LeadStatus::Won),
            LeadFilter::HasGclid,
            LeadFilter::ConversionSent(false),
        ]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    fn sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Ordering of a lead query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeadSort {
    column: &'static str,
    direction: SortDirection,
}

impl Default for LeadSort {
    fn default() -> Self {
        Self {
            column: "created_at",
            direction: SortDirection::Desc,
        }
    }
}

impl LeadSort {
    /// Parse request parameters; unknown columns fall back to `created_at`
    /// and anything but `asc` sorts descending
    pub fn parse(sort_by: Option<&str>, sort_order: Option<&str>) -> Self {
        let column = sort_by
            .and_then(|col| SORTABLE_COLUMNS.iter().find(|c| **c == col))
            .copied()
            .unwrap_or("created_at");
        let direction = match sort_order {
            Some(order) if order.eq_ignore_ascii_case("asc") => SortDirection::Asc,
            _ => SortDirection::Desc,
        };
        Self { column, direction }
    }

    pub fn oldest_first() -> Self {
        Self {
            column: "created_at",
            direction: SortDirection::Asc,
        }
    }

    pub fn column(&self) -> &'static str {
        self.column
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }
}

/// Filters, ordering and window of a lead query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadQuery {
    pub filters: Vec<LeadFilter>,
    pub sort: LeadSort,
    pub limit: Option<u32>,
    pub offset: u32,
}

impl LeadQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: LeadFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn filters(mut self, filters: impl IntoIterator<Item = LeadFilter>) -> Self {
        self.filters.extend(filters);
        self
    }

    pub fn sort(mut self, sort: LeadSort) -> Self {
        self.sort = sort;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// One-based page of `per_page` rows
    pub fn page(mut self, page: u32, per_page: u32) -> Self {
        self.limit = Some(per_page);
        self.offset = page.saturating_sub(1).saturating_mul(per_page);
        self
    }
}

fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.to_ascii_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Append a `WHERE` clause for `filters` (nothing when empty)
pub fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, filters: &[LeadFilter]) {
    for (i, filter) in filters.iter().enumerate() {
        builder.push(if i == 0 { " WHERE " } else { " AND " });

        match filter {
            LeadFilter::Search(needle) => {
                let pattern = like_pattern(needle.trim());
                builder.push("(");
                for (j, column) in ["name", "email", "practice_name"].iter().enumerate() {
                    if j > 0 {
                        builder.push(" OR ");
                    }
                    builder
                        .push(format!("LOWER({}) LIKE ", column))
                        .push_bind(pattern.clone())
                        .push(" ESCAPE '\\'");
                }
                builder.push(")");
            }
            LeadFilter::Status(status) => {
                builder.push("status = ").push_bind(status.as_str());
            }
            LeadFilter::UtmSource(source) => {
                builder.push("utm_source = ").push_bind(source.clone());
            }
            LeadFilter::CreatedFrom(at) => {
                builder.push("created_at >= ").push_bind(db_timestamp(at));
            }
            LeadFilter::CreatedBefore(at) => {
                builder.push("created_at < ").push_bind(db_timestamp(at));
            }
            LeadFilter::HasGclid => {
                builder.push("(gclid IS NOT NULL AND TRIM(gclid) != '')");
            }
            LeadFilter::ConversionSent(sent) => {
                builder.push("gads_conversion_sent = ").push_bind(*sent);
            }
            LeadFilter::Ids(ids) if ids.is_empty() => {
                builder.push("0");
            }
            LeadFilter::Ids(ids) => {
                builder.push("id IN (");
                let mut list = builder.separated(", ");
                for id in ids {
                    list.push_bind(id.clone());
                }
                list.push_unseparated(")");
            }
        }
    }
}

/// Append `ORDER BY` and `LIMIT`/`OFFSET` for `query`
pub(crate) fn push_window(builder: &mut QueryBuilder<'_, Sqlite>, query: &LeadQuery) {
    builder.push(format!(
        " ORDER BY {} {}, id {}",
        query.sort.column(),
        query.sort.direction().sql(),
        query.sort.direction().sql()
    ));

    if let Some(limit) = query.limit {
        builder
            .push(" LIMIT ")
            .push_bind(i64::from(limit))
            .push(" OFFSET ")
            .push_bind(i64::from(query.offset));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(filters: &[LeadFilter]) -> String {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM leads");
        push_filters(&mut builder, filters);
        builder.sql().to_string()
    }

    #[test]
    fn test_no_filters_no_where() {
        assert_eq!(render(&[]), "SELECT * FROM leads");
    }

    #[test]
    fn test_filters_are_conjoined() {
        let sql = render(&[
            LeadFilter::Status(LeadStatus::Won),
            LeadFilter::HasGclid,
            LeadFilter::Ids(vec!["a".into(), "b".into()]),
        ]);
        assert_eq!(
            sql,
            "SELECT * FROM leads WHERE status = ? AND (gclid IS NOT NULL AND TRIM(gclid) != '') AND id IN (?, ?)"
        );
    }

    #[test]
    fn test_empty_id_list_matches_nothing() {
        assert_eq!(
            render(&[LeadFilter::Ids(vec![])]),
            "SELECT * FROM leads WHERE 0"
        );
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Li_Clinic"), "%li\\_clinic%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("Élan"), "%Élan%");
    }

    #[test]
    fn test_sort_whitelist() {
        let sort = LeadSort::parse(Some("practice_name"), Some("ASC"));
        assert_eq!(sort.column(), "practice_name");
        assert_eq!(sort.direction(), SortDirection::Asc);

        let sort = LeadSort::parse(Some("name; DROP TABLE leads"), Some("sideways"));
        assert_eq!(sort, LeadSort::default());
    }

    #[test]
    fn test_page_offsets() {
        let query = LeadQuery::new().page(3, 25);
        assert_eq!(query.limit, Some(25));
        assert_eq!(query.offset, 50);

        let query = LeadQuery::new().page(0, 25);
        assert_eq!(query.offset, 0);
    }
}
