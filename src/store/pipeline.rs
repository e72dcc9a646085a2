//! Declarative join/reshape query pipeline and the pagination wrapper.
//!
//! Every resource listing in the platform is the same five-stage shape:
//! filter by an owning key, join related tables by foreign key, flatten
//! known one-to-one joins, derive aggregates, reshape to a whitelisted
//! column set, sort. [`Pipeline`] is that shape built once and shared
//! across resources; call sites differ only in which tables and columns
//! appear at each stage.

use anyhow::{Context, Result};
use rusqlite::{params_from_iter, types::Value, Connection, Row};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

impl SortDirection {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "asc" | "ascending" => Some(SortDirection::Ascending),
            "desc" | "descending" => Some(SortDirection::Descending),
            _ => None,
        }
    }

    fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;

/// Page window requested by the caller. Both values are coerced from the
/// raw query string; missing, non-numeric or sub-1 input falls back to the
/// defaults rather than erroring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub page: u64,
    pub limit: u64,
}

impl Default for PageParams {
    fn default() -> Self {
        PageParams {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageParams {
    pub fn from_raw(page: Option<&str>, limit: Option<&str>) -> Self {
        let parse = |raw: Option<&str>, fallback: u64| {
            raw.and_then(|s| s.trim().parse::<u64>().ok())
                .filter(|n| *n >= 1)
                .unwrap_or(fallback)
        };
        PageParams {
            page: parse(page, DEFAULT_PAGE),
            limit: parse(limit, DEFAULT_LIMIT),
        }
    }

    fn offset(&self) -> u64 {
        (self.page - 1) * self.limit
    }
}

/// One page of results with total-count metadata, independent of the
/// resource being paginated.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub limit: u64,
    pub total_items: u64,
    pub total_pages: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl<T> Page<T> {
    fn assemble(items: Vec<T>, params: &PageParams, total_items: u64) -> Self {
        let total_pages = total_items.div_ceil(params.limit);
        Page {
            items,
            page: params.page,
            limit: params.limit,
            total_items,
            total_pages,
            has_next_page: params.page < total_pages,
            has_prev_page: params.page > 1,
        }
    }
}

/// Ordered stage list over one root table, compiled into a single SQL
/// statement at execution time.
pub struct Pipeline {
    from: String,
    columns: Vec<String>,
    select_params: Vec<Value>,
    joins: Vec<String>,
    filters: Vec<String>,
    filter_params: Vec<Value>,
    order_by: Option<String>,
}

impl Pipeline {
    pub fn over(table: &str, alias: &str) -> Self {
        Pipeline {
            from: format!("{} {}", table, alias),
            columns: Vec::new(),
            select_params: Vec::new(),
            joins: Vec::new(),
            filters: Vec::new(),
            filter_params: Vec::new(),
            order_by: None,
        }
    }

    /// Filter stage: exact-match or set-membership predicate. `clause` uses
    /// positional `?` placeholders matching `params` in order.
    pub fn filter<P: Into<Value>>(mut self, clause: &str, params: impl IntoIterator<Item = P>) -> Self {
        self.filters.push(format!("({})", clause));
        self.filter_params.extend(params.into_iter().map(Into::into));
        self
    }

    /// Join stage flattened to a single embedded object: the join
    /// cardinality is known to be exactly one, so an INNER JOIN attaches
    /// the referenced row in place. A dangling reference (cardinality
    /// zero) drops the row instead of surfacing a half-joined shape.
    pub fn join_one(mut self, table: &str, alias: &str, on: &str) -> Self {
        self.joins
            .push(format!("INNER JOIN {} {} ON {}", table, alias, on));
        self
    }

    /// Derive stage: a computed column (COUNT/SUM subselect, EXISTS
    /// membership flag) over the already-joined shape.
    pub fn derive<P: Into<Value>>(
        mut self,
        expr: &str,
        alias: &str,
        params: impl IntoIterator<Item = P>,
    ) -> Self {
        self.columns.push(format!("({}) AS {}", expr, alias));
        self.select_params.extend(params.into_iter().map(Into::into));
        self
    }

    /// Reshape stage: the whitelist of projected columns. Nothing outside
    /// this list can leak into the result set.
    pub fn reshape(mut self, columns: &[&str]) -> Self {
        self.columns.extend(columns.iter().map(|c| c.to_string()));
        self
    }

    /// Sort stage: single-key sort, column already validated by the
    /// caller's sort-key enum.
    pub fn sort(mut self, column: &str, direction: SortDirection) -> Self {
        self.order_by = Some(format!("{} {}", column, direction.as_sql()));
        self
    }

    fn select_sql(&self) -> String {
        let mut sql = format!("SELECT {} FROM {}", self.columns.join(", "), self.from);
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }
        if !self.filters.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.filters.join(" AND "));
        }
        if let Some(order_by) = &self.order_by {
            sql.push_str(" ORDER BY ");
            sql.push_str(order_by);
        }
        sql
    }

    // The count query skips derived columns and ordering but keeps the
    // joins: INNER JOINs can drop rows, so counting the bare root table
    // would overcount.
    fn count_sql(&self) -> String {
        let mut sql = format!("SELECT COUNT(*) FROM {}", self.from);
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }
        if !self.filters.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.filters.join(" AND "));
        }
        sql
    }

    fn all_params(&self) -> impl Iterator<Item = &Value> {
        self.select_params.iter().chain(self.filter_params.iter())
    }

    /// Executes the pipeline and maps every result row.
    pub fn fetch<T>(
        &self,
        conn: &Connection,
        map: impl FnMut(&Row) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>> {
        let sql = self.select_sql();
        let mut stmt = conn
            .prepare(&sql)
            .with_context(|| format!("Failed to prepare pipeline query: {}", sql))?;
        let rows = stmt
            .query_map(params_from_iter(self.all_params()), map)?
            .collect::<Result<Vec<T>, _>>()?;
        Ok(rows)
    }

    /// Executes the pipeline expecting at most one row.
    pub fn fetch_one<T>(
        &self,
        conn: &Connection,
        map: impl FnMut(&Row) -> rusqlite::Result<T>,
    ) -> Result<Option<T>> {
        Ok(self.fetch(conn, map)?.into_iter().next())
    }

    /// Pagination wrapper: runs the total count and the windowed fetch over
    /// the same built pipeline. The two reads are not transactional; under
    /// concurrent writers the count may drift from the window by design.
    pub fn paginate<T>(
        &self,
        conn: &Connection,
        params: &PageParams,
        map: impl FnMut(&Row) -> rusqlite::Result<T>,
    ) -> Result<Page<T>> {
        let total_items = conn
            .query_row(
                &self.count_sql(),
                params_from_iter(self.filter_params.iter()),
                |row| row.get::<_, i64>(0),
            )
            .context("Failed to count pipeline results")? as u64;

        let sql = format!("{} LIMIT ? OFFSET ?", self.select_sql());
        let limit = Value::from(params.limit as i64);
        let offset = Value::from(params.offset() as i64);
        let mut stmt = conn
            .prepare(&sql)
            .with_context(|| format!("Failed to prepare paginated pipeline query: {}", sql))?;
        let items = stmt
            .query_map(
                params_from_iter(self.all_params().chain([&limit, &offset])),
                map,
            )?
            .collect::<Result<Vec<T>, _>>()?;

        Ok(Page::assemble(items, params, total_items))
    }
}
