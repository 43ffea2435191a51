//! Select builder for projected, paginated reads.
//!
//! Renders `SELECT <columns> FROM <table> [WHERE ...] [ORDER BY ...]
//! [LIMIT/OFFSET]` where every identifier comes from a compile-time
//! allow-list and every value is bound. Rows come back as JSON maps so
//! projected reads do not have to round-trip through a fixed struct shape.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{Column, PgPool, Row};
use uuid::Uuid;

use crate::query::QueryArgs;
use crate::store::StoreError;

/// Bindable condition value. Kept to the types the schema actually uses so
/// binds stay statically typed.
#[derive(Debug, Clone)]
pub enum Bind {
    Uuid(Uuid),
    Text(String),
    Bool(bool),
}

pub struct SelectQuery {
    table: &'static str,
    columns: Vec<String>,
    conditions: Vec<(&'static str, Bind)>,
    order_by: Option<&'static str>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl SelectQuery {
    /// `default_columns` is the endpoint's default projection; both it and
    /// any explicit selection must originate from the resource allow-list.
    pub fn new(table: &'static str, default_columns: &[&str]) -> Self {
        Self {
            table,
            columns: default_columns.iter().map(|c| c.to_string()).collect(),
            conditions: vec![],
            order_by: None,
            limit: None,
            offset: None,
        }
    }

    pub fn select(mut self, selection: Option<Vec<String>>) -> Self {
        if let Some(columns) = selection {
            if !columns.is_empty() {
                self.columns = columns;
            }
        }
        self
    }

    pub fn filter(mut self, column: &'static str, value: Bind) -> Self {
        self.conditions.push((column, value));
        self
    }

    pub fn order_by(mut self, clause: &'static str) -> Self {
        self.order_by = Some(clause);
        self
    }

    pub fn page(mut self, args: &QueryArgs) -> Self {
        self.limit = Some(args.take);
        self.offset = Some(args.skip);
        self
    }

    pub async fn fetch_all(self, pool: &PgPool) -> Result<Vec<Map<String, Value>>, StoreError> {
        let sql = self.render();
        let mut query = sqlx::query(&sql);
        for (_, value) in &self.conditions {
            query = bind_value(query, value);
        }
        let rows = query.fetch_all(pool).await?;
        Ok(rows.iter().map(row_to_map).collect())
    }

    pub async fn fetch_optional(
        self,
        pool: &PgPool,
    ) -> Result<Option<Map<String, Value>>, StoreError> {
        let sql = self.render();
        let mut query = sqlx::query(&sql);
        for (_, value) in &self.conditions {
            query = bind_value(query, value);
        }
        let row = query.fetch_optional(pool).await?;
        Ok(row.as_ref().map(row_to_map))
    }

    /// Count with the same conditions, ignoring projection and paging
    pub async fn count(self, pool: &PgPool) -> Result<i64, StoreError> {
        let where_clause = self.render_where();
        let sql = format!(
            "SELECT COUNT(*) AS count FROM \"{}\"{}",
            self.table, where_clause
        );

        let mut query = sqlx::query(&sql);
        for (_, value) in &self.conditions {
            query = bind_value(query, value);
        }
        let row = query.fetch_one(pool).await?;
        let count: i64 = row.try_get("count").map_err(StoreError::from)?;
        Ok(count)
    }

    fn render(&self) -> String {
        let select_clause = self
            .columns
            .iter()
            .map(|c| format!("\"{}\"", c))
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = format!("SELECT {} FROM \"{}\"", select_clause, self.table);
        sql.push_str(&self.render_where());

        if let Some(order) = self.order_by {
            sql.push_str(" ORDER BY ");
            sql.push_str(order);
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }

        sql
    }

    fn render_where(&self) -> String {
        if self.conditions.is_empty() {
            return String::new();
        }

        let clauses: Vec<String> = self
            .conditions
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("\"{}\" = ${}", column, i + 1))
            .collect();

        format!(" WHERE {}", clauses.join(" AND "))
    }
}

/// Render a RETURNING/SELECT column list from an optional projection,
/// falling back to the resource default.
pub fn column_list(selection: &Option<Vec<String>>, default: &[&str]) -> String {
    match selection {
        Some(columns) if !columns.is_empty() => columns
            .iter()
            .map(|c| format!("\"{}\"", c))
            .collect::<Vec<_>>()
            .join(", "),
        _ => default
            .iter()
            .map(|c| format!("\"{}\"", c))
            .collect::<Vec<_>>()
            .join(", "),
    }
}

pub(crate) fn bind_value<'q>(
    query: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    value: &'q Bind,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match value {
        Bind::Uuid(v) => query.bind(*v),
        Bind::Text(v) => query.bind(v),
        Bind::Bool(v) => query.bind(*v),
    }
}

/// Convert a row into a JSON map, trying the column types the schema uses.
/// Unknown types degrade to null rather than failing the whole read.
pub fn row_to_map(row: &PgRow) -> Map<String, Value> {
    let mut map = Map::new();

    for i in 0..row.len() {
        let name = row.column(i).name().to_string();

        let value = if let Ok(v) = row.try_get::<Option<Uuid>, _>(i) {
            v.map(|u| Value::String(u.to_string())).unwrap_or(Value::Null)
        } else if let Ok(v) = row.try_get::<Option<bool>, _>(i) {
            v.map(Value::Bool).unwrap_or(Value::Null)
        } else if let Ok(v) = row.try_get::<Option<i64>, _>(i) {
            v.map(|n| Value::Number(n.into())).unwrap_or(Value::Null)
        } else if let Ok(v) = row.try_get::<Option<DateTime<Utc>>, _>(i) {
            v.map(|t| Value::String(t.to_rfc3339())).unwrap_or(Value::Null)
        } else if let Ok(v) = row.try_get::<Option<String>, _>(i) {
            v.map(Value::String).unwrap_or(Value::Null)
        } else if let Ok(v) = row.try_get::<Option<Value>, _>(i) {
            v.unwrap_or(Value::Null)
        } else {
            Value::Null
        };

        map.insert(name, value);
    }

    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_projection_and_paging() {
        let sql = SelectQuery::new("users", &["id", "username"])
            .page(&QueryArgs {
                select: None,
                skip: 20,
                take: 10,
            })
            .order_by("\"created_at\" DESC, \"id\" ASC")
            .render();

        assert_eq!(
            sql,
            "SELECT \"id\", \"username\" FROM \"users\" \
             ORDER BY \"created_at\" DESC, \"id\" ASC LIMIT 10 OFFSET 20"
        );
    }

    #[test]
    fn explicit_selection_replaces_default() {
        let sql = SelectQuery::new("users", &["id", "username"])
            .select(Some(vec!["username".to_string()]))
            .render();
        assert_eq!(sql, "SELECT \"username\" FROM \"users\"");
    }

    #[test]
    fn empty_selection_keeps_default() {
        let sql = SelectQuery::new("users", &["id"]).select(Some(vec![])).render();
        assert_eq!(sql, "SELECT \"id\" FROM \"users\"");
    }

    #[test]
    fn conditions_become_numbered_binds() {
        let user_id = Uuid::nil();
        let sql = SelectQuery::new("messages", &["id", "content"])
            .filter("user_id", Bind::Uuid(user_id))
            .filter("village_id", Bind::Uuid(user_id))
            .render();
        assert_eq!(
            sql,
            "SELECT \"id\", \"content\" FROM \"messages\" \
             WHERE \"user_id\" = $1 AND \"village_id\" = $2"
        );
    }
}
