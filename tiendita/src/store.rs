//! Data access: pooled SQLite store for the `usuarios` and `productos` tables.
//!
//! All queries are parameterized. The store owns no business logic; handlers
//! decide how an empty result or a zero row count maps to a response.

use std::str::FromStr;

use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open store {url}: {source}")]
    Connect { url: String, source: sqlx::Error },
    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),
    #[error("update affected no rows")]
    NoRowsAffected,
}

/// User record as stored. The credential never leaves the HTTP boundary;
/// responses map this into a stripped view.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price_cost: f64,
    pub price_sale: f64,
    pub quantity: i64,
    pub image: String,
}

/// Validated product fields without an identifier. Produced by the HTTP
/// boundary, consumed by [`Store::create_product`] and
/// [`Store::update_product`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price_cost: f64,
    pub price_sale: f64,
    pub quantity: i64,
    pub image: String,
}

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS usuarios (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS productos (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT NOT NULL,
        price_cost REAL NOT NULL,
        price_sale REAL NOT NULL,
        quantity INTEGER NOT NULL,
        image TEXT NOT NULL DEFAULT ''
    )",
];

/// Cloneable handle over the connection pool. Passed into [`crate::http::AppState`]
/// instead of living in a process global.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|source| StoreError::Connect {
                url: String::from(url),
                source,
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|source| StoreError::Connect {
                url: String::from(url),
                source,
            })?;

        Ok(Self { pool })
    }

    /// In-memory database for tests. Every SQLite connection to `:memory:`
    /// sees its own database, so the pool is pinned to a single connection
    /// that is never recycled.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let url = "sqlite::memory:";
        let options =
            SqliteConnectOptions::from_str(url).map_err(|source| StoreError::Connect {
                url: String::from(url),
                source,
            })?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|source| StoreError::Connect {
                url: String::from(url),
                source,
            })?;

        Ok(Self { pool })
    }

    /// Create the tables on first run. Not a migration system; existing
    /// tables are left untouched.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let users =
            sqlx::query_as::<_, User>("SELECT id, name, password_hash FROM usuarios ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        Ok(users)
    }

    pub async fn find_user_by_name(&self, name: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, password_hash FROM usuarios WHERE name = ?1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn insert_user(&self, name: &str, password_hash: &str) -> Result<i64, StoreError> {
        let result = sqlx::query("INSERT INTO usuarios (name, password_hash) VALUES (?1, ?2)")
            .bind(name)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn count_products(&self) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM productos")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let products =
            sqlx::query_as::<_, Product>("SELECT * FROM productos ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        Ok(products)
    }

    pub async fn get_product(&self, id: i64) -> Result<Option<Product>, StoreError> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM productos WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    /// Assigns `max(id) + 1` (1 on an empty table) and inserts, both inside
    /// one transaction. SQLite serializes writers, so two concurrent creates
    /// cannot commit the same id; `id` is the primary key, so a collision
    /// would surface as a constraint error rather than a duplicate row.
    pub async fn create_product(&self, fields: &NewProduct) -> Result<Product, StoreError> {
        let mut tx = self.pool.begin().await?;

        let last_id: Option<i64> = sqlx::query_scalar("SELECT MAX(id) FROM productos")
            .fetch_one(&mut *tx)
            .await?;
        let id = last_id.unwrap_or(0) + 1;

        sqlx::query(
            "INSERT INTO productos (id, name, description, price_cost, price_sale, quantity, image)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(id)
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(fields.price_cost)
        .bind(fields.price_sale)
        .bind(fields.quantity)
        .bind(&fields.image)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Product {
            id,
            name: fields.name.clone(),
            description: fields.description.clone(),
            price_cost: fields.price_cost,
            price_sale: fields.price_sale,
            quantity: fields.quantity,
            image: fields.image.clone(),
        })
    }

    /// Full-row overwrite after an existence pre-check. Returns `None` when
    /// the id is absent and the post-update row otherwise.
    pub async fn update_product(
        &self,
        id: i64,
        fields: &NewProduct,
    ) -> Result<Option<Product>, StoreError> {
        let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM productos WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        if existing.is_none() {
            return Ok(None);
        }

        let result = sqlx::query(
            "UPDATE productos
             SET name = ?1, description = ?2, price_cost = ?3, price_sale = ?4,
                 quantity = ?5, image = ?6
             WHERE id = ?7",
        )
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(fields.price_cost)
        .bind(fields.price_sale)
        .bind(fields.quantity)
        .bind(&fields.image)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NoRowsAffected);
        }

        match self.get_product(id).await? {
            Some(product) => Ok(Some(product)),
            None => Err(StoreError::NoRowsAffected),
        }
    }

    /// Hard delete. Returns whether a row was removed.
    pub async fn delete_product(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM productos WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use anyhow::Result;

    use super::{NewProduct, Store};

    fn sample(name: &str) -> NewProduct {
        NewProduct {
            name: String::from(name),
            description: String::from("a product"),
            price_cost: 10.0,
            price_sale: 15.5,
            quantity: 3,
            image: String::new(),
        }
    }

    async fn store() -> Result<Store> {
        let store = Store::in_memory().await?;
        store.ensure_schema().await?;
        Ok(store)
    }

    #[tokio::test]
    async fn create_assigns_sequential_ids_from_one() -> Result<()> {
        let store = store().await?;

        let first = store.create_product(&sample("first")).await?;
        let second = store.create_product(&sample("second")).await?;

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        Ok(())
    }

    #[tokio::test]
    async fn create_uses_max_plus_one_after_deletions() -> Result<()> {
        let store = store().await?;

        store.create_product(&sample("first")).await?;
        store.create_product(&sample("second")).await?;
        assert!(store.delete_product(1).await?);

        let third = store.create_product(&sample("third")).await?;
        assert_eq!(third.id, 3);
        Ok(())
    }

    #[tokio::test]
    async fn update_returns_none_for_missing_id() -> Result<()> {
        let store = store().await?;
        let updated = store.update_product(99, &sample("ghost")).await?;
        assert!(updated.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn update_overwrites_full_row() -> Result<()> {
        let store = store().await?;
        store.create_product(&sample("original")).await?;

        let mut fields = sample("renamed");
        fields.quantity = 42;
        fields.image = String::from("renamed.png");
        let updated = store.update_product(1, &fields).await?.expect("row exists");

        assert_eq!(updated.name, "renamed");
        assert_eq!(updated.quantity, 42);
        assert_eq!(updated.image, "renamed.png");
        Ok(())
    }

    #[tokio::test]
    async fn delete_reports_missing_rows() -> Result<()> {
        let store = store().await?;
        assert!(!store.delete_product(1).await?);
        Ok(())
    }

    #[tokio::test]
    async fn find_user_by_name_round_trips() -> Result<()> {
        let store = store().await?;
        let id = store.insert_user("alice", "$argon2id$fake").await?;

        let found = store.find_user_by_name("alice").await?.expect("user exists");
        assert_eq!(found.id, id);
        assert_eq!(found.password_hash, "$argon2id$fake");
        assert!(store.find_user_by_name("bob").await?.is_none());
        Ok(())
    }
}
