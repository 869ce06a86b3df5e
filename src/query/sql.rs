//! WHERE-fragment builder with numbered placeholders and typed parameters.
//!
//! Conditions are accumulated in insertion order and joined with AND;
//! placeholders are `$1..$n` in the order their parameters were pushed, so
//! the fragment can be spliced into any statement as long as its binds come
//! first.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::FromRow;
use uuid::Uuid;

/// A bind parameter with its Postgres-facing type preserved
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Uuid(Uuid),
    Str(String),
    Int(i64),
    Bool(bool),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
}

#[derive(Debug, Default)]
pub struct SqlWhere {
    conditions: Vec<String>,
    params: Vec<SqlParam>,
}

impl SqlWhere {
    pub fn new() -> Self {
        Self::default()
    }

    fn param(&mut self, value: SqlParam) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }

    pub fn eq_uuid(&mut self, column: &str, value: Uuid) -> &mut Self {
        let p = self.param(SqlParam::Uuid(value));
        self.conditions.push(format!("{} = {}", column, p));
        self
    }

    pub fn eq_str(&mut self, column: &str, value: &str) -> &mut Self {
        let p = self.param(SqlParam::Str(value.to_string()));
        self.conditions.push(format!("{} = {}", column, p));
        self
    }

    pub fn ne_uuid(&mut self, column: &str, value: Uuid) -> &mut Self {
        let p = self.param(SqlParam::Uuid(value));
        self.conditions.push(format!("{} <> {}", column, p));
        self
    }

    /// Condition without parameters, e.g. `seen_at IS NULL`
    pub fn raw(&mut self, condition: &str) -> &mut Self {
        self.conditions.push(condition.to_string());
        self
    }

    /// OR-combined case-insensitive substring match over a fixed column set
    pub fn ilike_any(&mut self, columns: &[&str], needle: &str) -> &mut Self {
        let pattern = format!("%{}%", escape_like(needle));
        let p = self.param(SqlParam::Str(pattern));
        let group = columns
            .iter()
            .map(|c| format!("{} ILIKE {}", c, p))
            .collect::<Vec<_>>()
            .join(" OR ");
        self.conditions.push(format!("({})", group));
        self
    }

    /// Inclusive lower bound on a timestamp column, by calendar date
    pub fn date_gte(&mut self, column: &str, date: NaiveDate) -> &mut Self {
        let p = self.param(SqlParam::Date(date));
        self.conditions.push(format!("{}::date >= {}", column, p));
        self
    }

    /// Inclusive upper bound on a timestamp column, by calendar date
    pub fn date_lte(&mut self, column: &str, date: NaiveDate) -> &mut Self {
        let p = self.param(SqlParam::Date(date));
        self.conditions.push(format!("{}::date <= {}", column, p));
        self
    }

    pub fn ts_gte(&mut self, column: &str, at: DateTime<Utc>) -> &mut Self {
        let p = self.param(SqlParam::Timestamp(at));
        self.conditions.push(format!("{} >= {}", column, p));
        self
    }

    pub fn ts_lt(&mut self, column: &str, at: DateTime<Utc>) -> &mut Self {
        let p = self.param(SqlParam::Timestamp(at));
        self.conditions.push(format!("{} < {}", column, p));
        self
    }

    /// The joined condition list, without the WHERE keyword
    pub fn clause(&self) -> String {
        if self.conditions.is_empty() {
            "1=1".to_string()
        } else {
            self.conditions.join(" AND ")
        }
    }

    pub fn params(&self) -> &[SqlParam] {
        &self.params
    }

    /// Placeholder index the next pushed parameter would get. Lets callers
    /// append their own `$n` binds after the fragment's.
    pub fn next_index(&self) -> usize {
        self.params.len() + 1
    }
}

/// Escape LIKE/ILIKE metacharacters in user-supplied search text
fn escape_like(needle: &str) -> String {
    needle.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

pub fn bind_query<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    p: &'q SqlParam,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match p {
        SqlParam::Uuid(v) => q.bind(*v),
        SqlParam::Str(v) => q.bind(v),
        SqlParam::Int(v) => q.bind(*v),
        SqlParam::Bool(v) => q.bind(*v),
        SqlParam::Date(v) => q.bind(*v),
        SqlParam::Timestamp(v) => q.bind(*v),
    }
}

pub fn bind_query_as<'q, O>(
    q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>,
    p: &'q SqlParam,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, PgRow>,
{
    match p {
        SqlParam::Uuid(v) => q.bind(*v),
        SqlParam::Str(v) => q.bind(v),
        SqlParam::Int(v) => q.bind(*v),
        SqlParam::Bool(v) => q.bind(*v),
        SqlParam::Date(v) => q.bind(*v),
        SqlParam::Timestamp(v) => q.bind(*v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_placeholders_in_push_order() {
        let mut w = SqlWhere::new();
        let business = Uuid::new_v4();
        w.eq_uuid("business_id", business).eq_str("status", "active");
        assert_eq!(w.clause(), "business_id = $1 AND status = $2");
        assert_eq!(w.params().len(), 2);
        assert_eq!(w.next_index(), 3);
    }

    #[test]
    fn search_group_reuses_one_parameter() {
        let mut w = SqlWhere::new();
        w.ilike_any(&["first_name", "email"], "ann");
        assert_eq!(w.clause(), "(first_name ILIKE $1 OR email ILIKE $1)");
        assert_eq!(w.params(), &[SqlParam::Str("%ann%".to_string())]);
    }

    #[test]
    fn like_metacharacters_are_escaped() {
        let mut w = SqlWhere::new();
        w.ilike_any(&["name"], "100%_done");
        assert_eq!(w.params(), &[SqlParam::Str("%100\\%\\_done%".to_string())]);
    }

    #[test]
    fn empty_builder_renders_tautology() {
        assert_eq!(SqlWhere::new().clause(), "1=1");
    }

    #[test]
    fn date_bounds_cast_column_to_date() {
        let mut w = SqlWhere::new();
        let d = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
        w.date_gte("created_at", d).date_lte("created_at", d);
        assert_eq!(w.clause(), "created_at::date >= $1 AND created_at::date <= $2");
    }
}
