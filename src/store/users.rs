//! User repository. Mutations are single statements; concurrent edits
//! resolve by the store's last-write-wins semantics.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::middleware::AccountDirectory;
use crate::query::QueryArgs;
use crate::store::models::{UserRecord, USER_FIELDS};
use crate::store::query::{bind_value, column_list, row_to_map, Bind, SelectQuery};
use crate::store::{Db, StoreError};

const LIST_ORDER: &str = "\"created_at\" DESC, \"id\" ASC";

/// Editable account fields. Admin/active flags and identity linkage are not
/// client-editable through this surface.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    pub username: Option<String>,
    pub is_anonymous: Option<bool>,
}

pub async fn find_many(db: &Db, args: &QueryArgs) -> Result<Vec<Map<String, Value>>, StoreError> {
    SelectQuery::new("users", USER_FIELDS)
        .select(args.select.clone())
        .order_by(LIST_ORDER)
        .page(args)
        .fetch_all(db)
        .await
}

pub async fn count(db: &Db) -> Result<i64, StoreError> {
    SelectQuery::new("users", USER_FIELDS).count(db).await
}

pub async fn find_unique(
    db: &Db,
    id: Uuid,
    select: Option<Vec<String>>,
) -> Result<Option<Map<String, Value>>, StoreError> {
    SelectQuery::new("users", USER_FIELDS)
        .select(select)
        .filter("id", Bind::Uuid(id))
        .fetch_optional(db)
        .await
}

/// Typed lookup by external subject identifier, used by the access gate
pub async fn find_by_subject(db: &Db, subject_id: &str) -> Result<Option<UserRecord>, StoreError> {
    let record = sqlx::query_as::<_, UserRecord>("SELECT * FROM \"users\" WHERE \"subject_id\" = $1")
        .bind(subject_id)
        .fetch_optional(db)
        .await?;
    Ok(record)
}

pub async fn create(
    db: &Db,
    subject_id: &str,
    username: &str,
) -> Result<Map<String, Value>, StoreError> {
    let sql = format!(
        "INSERT INTO \"users\" (\"subject_id\", \"username\") VALUES ($1, $2) RETURNING {}",
        column_list(&None, USER_FIELDS)
    );

    let row = sqlx::query(&sql)
        .bind(subject_id)
        .bind(username)
        .fetch_one(db)
        .await?;
    Ok(row_to_map(&row))
}

pub async fn update(
    db: &Db,
    id: Uuid,
    patch: &UserPatch,
    select: Option<Vec<String>>,
) -> Result<Option<Map<String, Value>>, StoreError> {
    let mut sets: Vec<String> = Vec::new();
    let mut binds: Vec<Bind> = Vec::new();

    if let Some(username) = &patch.username {
        binds.push(Bind::Text(username.clone()));
        sets.push(format!("\"username\" = ${}", binds.len()));
    }
    if let Some(is_anonymous) = patch.is_anonymous {
        binds.push(Bind::Bool(is_anonymous));
        sets.push(format!("\"is_anonymous\" = ${}", binds.len()));
    }

    if sets.is_empty() {
        return Err(StoreError::Validation(
            "No editable fields were provided.".to_string(),
        ));
    }

    sets.push("\"updated_at\" = NOW()".to_string());
    binds.push(Bind::Uuid(id));

    let sql = format!(
        "UPDATE \"users\" SET {} WHERE \"id\" = ${} RETURNING {}",
        sets.join(", "),
        binds.len(),
        column_list(&select, USER_FIELDS)
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
        "DELETE FROM \"users\" WHERE \"id\" = $1 RETURNING {}",
        column_list(&select, USER_FIELDS)
    );

    let row = sqlx::query(&sql).bind(id).fetch_optional(db).await?;
    Ok(row.as_ref().map(row_to_map))
}

/// Store-backed account directory for the access gate
pub struct PgAccountDirectory {
    db: Db,
}

impl PgAccountDirectory {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccountDirectory for PgAccountDirectory {
    async fn find_by_subject(&self, subject_id: &str) -> Result<Option<UserRecord>, StoreError> {
        find_by_subject(&self.db, subject_id).await
    }
}
