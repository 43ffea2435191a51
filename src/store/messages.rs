//! Message repository. List reads share one filter shape so the data query
//! and the count query always agree.

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::query::QueryArgs;
use crate::store::models::MESSAGE_FIELDS;
use crate::store::query::{column_list, row_to_map, Bind, SelectQuery};
use crate::store::{Db, StoreError};

const LIST_ORDER: &str = "\"created_at\" DESC, \"id\" ASC";

/// Equality filters applied identically to find_many and count
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageFilter {
    pub user_id: Option<Uuid>,
    pub village_id: Option<Uuid>,
}

fn filtered(query: SelectQuery, filter: MessageFilter) -> SelectQuery {
    let mut query = query;
    if let Some(user_id) = filter.user_id {
        query = query.filter("user_id", Bind::Uuid(user_id));
    }
    if let Some(village_id) = filter.village_id {
        query = query.filter("village_id", Bind::Uuid(village_id));
    }
    query
}

pub async fn find_many(
    db: &Db,
    args: &QueryArgs,
    filter: MessageFilter,
) -> Result<Vec<Map<String, Value>>, StoreError> {
    filtered(SelectQuery::new("messages", MESSAGE_FIELDS), filter)
        .select(args.select.clone())
        .order_by(LIST_ORDER)
        .page(args)
        .fetch_all(db)
        .await
}

pub async fn count(db: &Db, filter: MessageFilter) -> Result<i64, StoreError> {
    filtered(SelectQuery::new("messages", MESSAGE_FIELDS), filter)
        .count(db)
        .await
}

pub async fn find_unique(
    db: &Db,
    id: Uuid,
    select: Option<Vec<String>>,
) -> Result<Option<Map<String, Value>>, StoreError> {
    SelectQuery::new("messages", MESSAGE_FIELDS)
        .select(select)
        .filter("id", Bind::Uuid(id))
        .fetch_optional(db)
        .await
}

/// Owning account of a message, for self-or-admin checks
pub async fn owner(db: &Db, id: Uuid) -> Result<Option<Uuid>, StoreError> {
    let row = sqlx::query_scalar::<_, Uuid>("SELECT \"user_id\" FROM \"messages\" WHERE \"id\" = $1")
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

pub async fn create(
    db: &Db,
    user_id: Uuid,
    village_id: Uuid,
    content: &str,
) -> Result<Map<String, Value>, StoreError> {
    let sql = format!(
        "INSERT INTO \"messages\" (\"content\", \"user_id\", \"village_id\") \
         VALUES ($1, $2, $3) RETURNING {}",
        column_list(&None, MESSAGE_FIELDS)
    );

    let row = sqlx::query(&sql)
        .bind(content)
        .bind(user_id)
        .bind(village_id)
        .fetch_one(db)
        .await?;
    Ok(row_to_map(&row))
}

pub async fn update(
    db: &Db,
    id: Uuid,
    content: &str,
    select: Option<Vec<String>>,
) -> Result<Option<Map<String, Value>>, StoreError> {
    let sql = format!(
        "UPDATE \"messages\" SET \"content\" = $1, \"updated_at\" = NOW() \
         WHERE \"id\" = $2 RETURNING {}",
        column_list(&select, MESSAGE_FIELDS)
    );

    let row = sqlx::query(&sql)
        .bind(content)
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(row.as_ref().map(row_to_map))
}

pub async fn delete(
    db: &Db,
    id: Uuid,
    select: Option<Vec<String>>,
) -> Result<Option<Map<String, Value>>, StoreError> {
    let sql = format!(
        "DELETE FROM \"messages\" WHERE \"id\" = $1 RETURNING {}",
        column_list(&select, MESSAGE_FIELDS)
    );

    let row = sqlx::query(&sql).bind(id).fetch_optional(db).await?;
    Ok(row.as_ref().map(row_to_map))
}
