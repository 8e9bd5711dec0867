//! Persistence adapter over a relational store.
//!
//! All statements are parameter-bound; values never reach SQL through string
//! concatenation. Failures surface as an opaque [`PersistenceError`] carrying
//! the driver message — callers only distinguish failed from succeeded, and
//! rely on statement-level atomicity for "no partial writes".

use crate::models::{Customer, Invoice, InvoiceStatus, User};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Driver(String),
    #[error("no row matched id {0}")]
    RowNotFound(String),
}

impl From<sqlx::Error> for PersistenceError {
    fn from(err: sqlx::Error) -> Self {
        Self::Driver(err.to_string())
    }
}

/// Store seam the mutation pipeline depends on. Lets pipeline and handler
/// tests run against any backing implementation.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    async fn insert_invoice(
        &self,
        customer_id: &str,
        amount_cents: i64,
        status: InvoiceStatus,
        date: NaiveDate,
    ) -> Result<String, PersistenceError>;

    async fn update_invoice(
        &self,
        id: &str,
        customer_id: &str,
        amount_cents: i64,
        status: InvoiceStatus,
    ) -> Result<(), PersistenceError>;

    async fn delete_invoice(&self, id: &str) -> Result<(), PersistenceError>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, PersistenceError>;

    async fn list_invoices(&self) -> Result<Vec<Invoice>, PersistenceError>;

    async fn list_customers(&self) -> Result<Vec<Customer>, PersistenceError>;
}

/// SQLite-backed storage. Cheap to clone and share across handlers.
#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    /// Open (or create) the database at the given SQLx URL and ensure the
    /// schema exists. In-memory databases are pinned to a single connection
    /// so every statement sees the same store.
    pub async fn open(url: &str) -> Result<Self, PersistenceError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let max_connections = if url.contains(":memory:") || url.contains("mode=memory") {
            1
        } else {
            5
        };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let storage = Self { pool };
        storage.migrate().await?;
        Ok(storage)
    }

    async fn migrate(&self) -> Result<(), PersistenceError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS invoices (
                id          TEXT PRIMARY KEY,
                customer_id TEXT NOT NULL,
                amount      INTEGER NOT NULL,
                status      TEXT NOT NULL,
                date        TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS customers (
                id    TEXT PRIMARY KEY,
                name  TEXT NOT NULL,
                email TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                id       TEXT PRIMARY KEY,
                name     TEXT NOT NULL,
                email    TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert a user row (`password` must already be a bcrypt hash).
    /// Used by the seed script; the mutation pipeline never writes users.
    pub async fn create_user(&self, user: &User) -> Result<(), PersistenceError> {
        sqlx::query("INSERT INTO users (id, name, email, password) VALUES (?, ?, ?, ?)")
            .bind(&user.id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Insert a customer row. Seed-only, like `create_user`.
    pub async fn create_customer(&self, customer: &Customer) -> Result<(), PersistenceError> {
        sqlx::query("INSERT INTO customers (id, name, email) VALUES (?, ?, ?)")
            .bind(&customer.id)
            .bind(&customer.name)
            .bind(&customer.email)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Close the underlying pool. Subsequent statements fail, which is how
    /// tests exercise the store-unreachable paths.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl InvoiceStore for Storage {
    async fn insert_invoice(
        &self,
        customer_id: &str,
        amount_cents: i64,
        status: InvoiceStatus,
        date: NaiveDate,
    ) -> Result<String, PersistenceError> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO invoices (id, customer_id, amount, status, date) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(customer_id)
        .bind(amount_cents)
        .bind(status)
        .bind(date)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    async fn update_invoice(
        &self,
        id: &str,
        customer_id: &str,
        amount_cents: i64,
        status: InvoiceStatus,
    ) -> Result<(), PersistenceError> {
        let result = sqlx::query(
            "UPDATE invoices SET customer_id = ?, amount = ?, status = ? WHERE id = ?",
        )
        .bind(customer_id)
        .bind(amount_cents)
        .bind(status)
        .bind(id)
        .execute(&self.pool)
        .await?;

        // Success means exactly one row changed.
        if result.rows_affected() == 0 {
            return Err(PersistenceError::RowNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn delete_invoice(&self, id: &str) -> Result<(), PersistenceError> {
        let result = sqlx::query("DELETE FROM invoices WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::RowNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, PersistenceError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, password FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn list_invoices(&self) -> Result<Vec<Invoice>, PersistenceError> {
        let invoices = sqlx::query_as::<_, Invoice>(
            "SELECT id, customer_id, amount, status, date FROM invoices ORDER BY date DESC, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(invoices)
    }

    async fn list_customers(&self) -> Result<Vec<Customer>, PersistenceError> {
        let customers = sqlx::query_as::<_, Customer>(
            "SELECT id, name, email FROM customers ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(customers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open_test_storage() -> Storage {
        Storage::open("sqlite::memory:")
            .await
            .expect("in-memory storage")
    }

    #[tokio::test]
    async fn test_insert_and_list_invoice() {
        let storage = open_test_storage().await;
        let date = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();

        let id = storage
            .insert_invoice("c1", 4999, InvoiceStatus::Paid, date)
            .await
            .expect("insert");

        let invoices = storage.list_invoices().await.expect("list");
        assert_eq!(invoices.len(), 1);
        assert_eq!(invoices[0].id, id);
        assert_eq!(invoices[0].amount, 4999);
        assert_eq!(invoices[0].status, InvoiceStatus::Paid);
        assert_eq!(invoices[0].date, date);
    }

    #[tokio::test]
    async fn test_update_changes_exactly_one_row() {
        let storage = open_test_storage().await;
        let date = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
        let id = storage
            .insert_invoice("c1", 100, InvoiceStatus::Pending, date)
            .await
            .expect("insert");

        storage
            .update_invoice(&id, "c2", 250, InvoiceStatus::Paid)
            .await
            .expect("update");

        let invoices = storage.list_invoices().await.expect("list");
        assert_eq!(invoices[0].customer_id, "c2");
        assert_eq!(invoices[0].amount, 250);
        assert_eq!(invoices[0].status, InvoiceStatus::Paid);
        // Date is not part of the update shape and must survive.
        assert_eq!(invoices[0].date, date);
    }

    #[tokio::test]
    async fn test_update_unknown_id_fails_without_writing() {
        let storage = open_test_storage().await;
        let err = storage
            .update_invoice("missing", "c1", 100, InvoiceStatus::Paid)
            .await
            .expect_err("unknown id");
        assert!(matches!(err, PersistenceError::RowNotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_removes_row_and_missing_id_fails() {
        let storage = open_test_storage().await;
        let date = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        let id = storage
            .insert_invoice("c1", 100, InvoiceStatus::Pending, date)
            .await
            .expect("insert");

        storage.delete_invoice(&id).await.expect("delete");
        assert!(storage.list_invoices().await.expect("list").is_empty());

        // Second delete: no row matched, store unchanged, no panic.
        let err = storage.delete_invoice(&id).await.expect_err("gone");
        assert!(matches!(err, PersistenceError::RowNotFound(_)));
    }

    #[tokio::test]
    async fn test_bound_parameters_keep_hostile_input_literal() {
        let storage = open_test_storage().await;
        let hostile = "x'); DROP TABLE invoices; --";
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();

        storage
            .insert_invoice(hostile, 100, InvoiceStatus::Pending, date)
            .await
            .expect("insert");

        let invoices = storage.list_invoices().await.expect("table still exists");
        assert_eq!(invoices.len(), 1);
        assert_eq!(invoices[0].customer_id, hostile);
    }

    #[tokio::test]
    async fn test_user_lookup_by_email() {
        let storage = open_test_storage().await;
        let user = User {
            id: "u1".to_string(),
            name: "User".to_string(),
            email: "user@nextmail.com".to_string(),
            password: "$2b$12$not-a-real-hash".to_string(),
        };
        storage.create_user(&user).await.expect("create user");

        let found = storage
            .get_user_by_email("user@nextmail.com")
            .await
            .expect("lookup");
        assert_eq!(found.map(|u| u.id), Some("u1".to_string()));

        let missing = storage
            .get_user_by_email("nobody@nextmail.com")
            .await
            .expect("lookup");
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_customers_listed_by_name() {
        let storage = open_test_storage().await;
        for (id, name, email) in [
            ("c2", "Lee Robinson", "lee@robinson.com"),
            ("c1", "Amy Burns", "amy@burns.com"),
        ] {
            storage
                .create_customer(&Customer {
                    id: id.to_string(),
                    name: name.to_string(),
                    email: email.to_string(),
                })
                .await
                .expect("create customer");
        }

        let customers = storage.list_customers().await.expect("list");
        assert_eq!(customers[0].name, "Amy Burns");
        assert_eq!(customers[1].name, "Lee Robinson");
    }
}
