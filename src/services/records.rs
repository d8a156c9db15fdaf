//! Record synchronizer: CRUD over the `projects`, `certificates` and
//! `skills` tables, written once for every [`Resource`].

use crate::models::resource::{FieldValue, Resource};
use chrono::Utc;
use serde::Serialize;
use sqlx::{QueryBuilder, SqlitePool, sqlite::Sqlite, types::Json};
use std::{fmt::Display, marker::PhantomData, sync::Arc};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{operation} failed: {cause}")]
pub struct PersistenceError {
    pub operation: String,
    pub cause: String,
}

impl PersistenceError {
    fn new(operation: impl Into<String>, cause: impl Display) -> Self {
        Self {
            operation: operation.into(),
            cause: cause.to_string(),
        }
    }
}

/// Equality filter on a single column.
#[derive(Debug, Clone)]
pub struct Filter {
    pub column: &'static str,
    pub value: String,
}

/// One page of a paginated listing.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total_count: i64,
    pub total_pages: u32,
}

/// Number of pages needed for `total_count` rows; never less than one.
pub fn total_pages(total_count: i64, per_page: u32) -> u32 {
    let per_page = i64::from(per_page.max(1));
    let pages = (total_count.max(0) + per_page - 1) / per_page;
    pages.max(1) as u32
}

pub struct RecordStore<T> {
    db: Arc<SqlitePool>,
    _resource: PhantomData<fn() -> T>,
}

impl<T> Clone for RecordStore<T> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            _resource: PhantomData,
        }
    }
}

impl<T: Resource> RecordStore<T> {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self {
            db,
            _resource: PhantomData,
        }
    }

    fn table() -> &'static str {
        T::KIND.table()
    }

    /// Insert a row built from `fields` and return it as stored.
    pub async fn create(&self, fields: &T::Fields) -> Result<T, PersistenceError> {
        let columns = T::columns(fields);

        let mut builder = QueryBuilder::<Sqlite>::new("INSERT INTO ");
        builder.push(Self::table());
        builder.push(" (");
        for (name, _) in &columns {
            builder.push(*name);
            builder.push(", ");
        }
        builder.push("created_at) VALUES (");
        for (_, value) in columns {
            push_value(&mut builder, value);
            builder.push(", ");
        }
        builder.push_bind(Utc::now());
        builder.push(") RETURNING *");

        builder
            .build_query_as::<T>()
            .fetch_one(&*self.db)
            .await
            .map_err(|err| PersistenceError::new(format!("insert into {}", Self::table()), err))
    }

    /// Overwrite the columns of row `id`. `Ok(None)` when no such row exists.
    pub async fn update(&self, id: i64, fields: &T::Fields) -> Result<Option<T>, PersistenceError> {
        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE ");
        builder.push(Self::table());
        builder.push(" SET ");
        for (index, (name, value)) in T::columns(fields).into_iter().enumerate() {
            if index > 0 {
                builder.push(", ");
            }
            builder.push(name);
            builder.push(" = ");
            push_value(&mut builder, value);
        }
        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(" RETURNING *");

        builder
            .build_query_as::<T>()
            .fetch_optional(&*self.db)
            .await
            .map_err(|err| PersistenceError::new(format!("update {}", Self::table()), err))
    }

    /// Delete row `id`. Returns whether a row was removed.
    pub async fn delete(&self, id: i64) -> Result<bool, PersistenceError> {
        let mut builder = QueryBuilder::<Sqlite>::new("DELETE FROM ");
        builder.push(Self::table());
        builder.push(" WHERE id = ");
        builder.push_bind(id);

        let result = builder
            .build()
            .execute(&*self.db)
            .await
            .map_err(|err| PersistenceError::new(format!("delete from {}", Self::table()), err))?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn find(&self, id: i64) -> Result<Option<T>, PersistenceError> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM ");
        builder.push(Self::table());
        builder.push(" WHERE id = ");
        builder.push_bind(id);

        builder
            .build_query_as::<T>()
            .fetch_optional(&*self.db)
            .await
            .map_err(|err| PersistenceError::new(format!("select from {}", Self::table()), err))
    }

    /// Every row, optionally filtered, in the resource's listing order.
    pub async fn list(&self, filter: Option<&Filter>) -> Result<Vec<T>, PersistenceError> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM ");
        builder.push(Self::table());
        if let Some(filter) = filter {
            builder.push(" WHERE ");
            builder.push(filter.column);
            builder.push(" = ");
            builder.push_bind(filter.value.clone());
        }
        builder.push(" ORDER BY ");
        builder.push(T::KIND.order_by());

        builder
            .build_query_as::<T>()
            .fetch_all(&*self.db)
            .await
            .map_err(|err| PersistenceError::new(format!("list {}", Self::table()), err))
    }

    /// One page of the listing. `page` is 1-based; range checks against the
    /// page count belong to the caller.
    pub async fn list_page(&self, page: u32, per_page: u32) -> Result<Page<T>, PersistenceError> {
        let per_page = per_page.max(1);
        let offset = i64::from(page.saturating_sub(1)) * i64::from(per_page);

        let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM ");
        builder.push(Self::table());
        builder.push(" ORDER BY ");
        builder.push(T::KIND.order_by());
        builder.push(" LIMIT ");
        builder.push_bind(i64::from(per_page));
        builder.push(" OFFSET ");
        builder.push_bind(offset);

        let items = builder
            .build_query_as::<T>()
            .fetch_all(&*self.db)
            .await
            .map_err(|err| PersistenceError::new(format!("page {}", Self::table()), err))?;
        let total_count = self.count().await?;

        Ok(Page {
            items,
            page,
            per_page,
            total_count,
            total_pages: total_pages(total_count, per_page),
        })
    }

    pub async fn count(&self) -> Result<i64, PersistenceError> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM ");
        builder.push(Self::table());

        builder
            .build_query_scalar::<i64>()
            .fetch_one(&*self.db)
            .await
            .map_err(|err| PersistenceError::new(format!("count {}", Self::table()), err))
    }
}

fn push_value(builder: &mut QueryBuilder<'_, Sqlite>, value: FieldValue) {
    match value {
        FieldValue::Text(text) => builder.push_bind(text),
        FieldValue::Integer(number) => builder.push_bind(number),
        FieldValue::List(items) => builder.push_bind(Json(items)),
    };
}
