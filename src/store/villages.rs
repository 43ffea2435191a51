//! Village repository plus the membership join table.

use serde::Deserialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::query::QueryArgs;
use crate::store::models::VILLAGE_FIELDS;
use crate::store::query::{bind_value, column_list, row_to_map, Bind, SelectQuery};
use crate::store::{Db, StoreError};

const LIST_ORDER: &str = "\"created_at\" DESC, \"id\" ASC";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VillagePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
}

pub async fn find_many(db: &Db, args: &QueryArgs) -> Result<Vec<Map<String, Value>>, StoreError> {
    SelectQuery::new("villages", VILLAGE_FIELDS)
        .select(args.select.clone())
        .order_by(LIST_ORDER)
        .page(args)
        .fetch_all(db)
        .await
}

pub async fn count(db: &Db) -> Result<i64, StoreError> {
    SelectQuery::new("villages", VILLAGE_FIELDS).count(db).await
}

pub async fn find_unique(
    db: &Db,
    id: Uuid,
    select: Option<Vec<String>>,
) -> Result<Option<Map<String, Value>>, StoreError> {
    SelectQuery::new("villages", VILLAGE_FIELDS)
        .select(select)
        .filter("id", Bind::Uuid(id))
        .fetch_optional(db)
        .await
}

/// Create a village; the creator becomes its first member.
pub async fn create(
    db: &Db,
    creator_id: Uuid,
    name: &str,
    description: Option<&str>,
    is_public: bool,
) -> Result<Map<String, Value>, StoreError> {
    let village_id = Uuid::new_v4();
    let sql = format!(
        "INSERT INTO \"villages\" (\"id\", \"name\", \"description\", \"is_public\") \
         VALUES ($1, $2, $3, $4) RETURNING {}",
        column_list(&None, VILLAGE_FIELDS)
    );

    let mut tx = db.begin().await?;

    let row = sqlx::query(&sql)
        .bind(village_id)
        .bind(name)
        .bind(description)
        .bind(is_public)
        .fetch_one(&mut *tx)
        .await?;
    let village = row_to_map(&row);

    sqlx::query("INSERT INTO \"village_members\" (\"village_id\", \"user_id\") VALUES ($1, $2)")
        .bind(village_id)
        .bind(creator_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(village)
}

pub async fn update(
    db: &Db,
    id: Uuid,
    patch: &VillagePatch,
    select: Option<Vec<String>>,
) -> Result<Option<Map<String, Value>>, StoreError> {
    let mut sets: Vec<String> = Vec::new();
    let mut binds: Vec<Bind> = Vec::new();

    if let Some(name) = &patch.name {
        binds.push(Bind::Text(name.clone()));
        sets.push(format!("\"name\" = ${}", binds.len()));
    }
    if let Some(description) = &patch.description {
        binds.push(Bind::Text(description.clone()));
        sets.push(format!("\"description\" = ${}", binds.len()));
    }
    if let Some(is_public) = patch.is_public {
        binds.push(Bind::Bool(is_public));
        sets.push(format!("\"is_public\" = ${}", binds.len()));
    }

    if sets.is_empty() {
        return Err(StoreError::Validation(
            "No editable fields were provided.".to_string(),
        ));
    }

    sets.push("\"updated_at\" = NOW()".to_string());
    binds.push(Bind::Uuid(id));

    let sql = format!(
        "UPDATE \"villages\" SET {} WHERE \"id\" = ${} RETURNING {}",
        sets.join(", "),
        binds.len(),
        column_list(&select, VILLAGE_FIELDS)
    );

    let mut query = sqlx::query(&sql);
    for bind in &binds {
        query = bind_value(query, bind);
    }
    let row = query.fetch_optional(db).await?;
    Ok(row.as_ref().map(row_to_map))
}

pub async fn delete(
    db: &Db,
    id: Uuid,
    select: Option<Vec<String>>,
) -> Result<Option<Map<String, Value>>, StoreError> {
    let sql = format!(
        "DELETE FROM \"villages\" WHERE \"id\" = $1 RETURNING {}",
        column_list(&select, VILLAGE_FIELDS)
    );

    let row = sqlx::query(&sql).bind(id).fetch_optional(db).await?;
    Ok(row.as_ref().map(row_to_map))
}

pub async fn is_member(db: &Db, village_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
    let row = sqlx::query(
        "SELECT 1 AS present FROM \"village_members\" WHERE \"village_id\" = $1 AND \"user_id\" = $2",
    )
    .bind(village_id)
    .bind(user_id)
    .fetch_optional(db)
    .await?;
    Ok(row.is_some())
}

/// Remove a user from a village; returns how many membership rows went away
pub async fn leave(db: &Db, village_id: Uuid, user_id: Uuid) -> Result<u64, StoreError> {
    let result = sqlx::query(
        "DELETE FROM \"village_members\" WHERE \"village_id\" = $1 AND \"user_id\" = $2",
    )
    .bind(village_id)
    .bind(user_id)
    .execute(db)
    .await?;
    Ok(result.rows_affected())
}
