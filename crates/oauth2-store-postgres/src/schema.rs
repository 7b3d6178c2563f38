//! Schema management for the token table.
//!
//! The table name is configurable, so statements are rendered once per
//! [`TokenSchema`] with the identifier spliced in. Names are validated as
//! plain identifiers before they ever reach SQL.
//!
//! # Table Structure
//!
//! | Column               | Type          | Notes                        |
//! |----------------------|---------------|------------------------------|
//! | `access`             | `TEXT`        | primary key                  |
//! | `refresh`            | `TEXT`        | unique when not null         |
//! | `client_id`          | `TEXT`        |                              |
//! | `user_id`            | `TEXT`        | nullable                     |
//! | `redirect_uri`       | `TEXT`        | nullable                     |
//! | `scope`              | `TEXT`        |                              |
//! | `access_create_at`   | `TIMESTAMPTZ` |                              |
//! | `access_expires_in`  | `BIGINT`      | microseconds                 |
//! | `refresh_create_at`  | `TIMESTAMPTZ` | nullable                     |
//! | `refresh_expires_in` | `BIGINT`      | microseconds, nullable       |

use sqlx_core::query::query;
use sqlx_core::query_scalar::query_scalar;
use tracing::{debug, info, instrument};

use crate::PgPool;
use crate::config::validate_table_name;
use crate::error::Result;

/// Column list shared by every statement, in tuple order.
pub(crate) const COLUMNS: &str = "client_id, user_id, redirect_uri, scope, \
     access, access_create_at, access_expires_in, \
     refresh, refresh_create_at, refresh_expires_in";

/// Rendered SQL for one token table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSchema {
    table: String,
    quoted: String,
    insert: String,
    select_by_access: String,
    select_by_refresh: String,
    delete_by_access: String,
    delete_by_refresh: String,
}

impl TokenSchema {
    /// Renders the statements for `table`.
    ///
    /// `table` may be schema-qualified (`auth.tokens`).
    ///
    /// # Errors
    ///
    /// Returns `PostgresError::Config` if the name is not a plain identifier.
    pub fn new(table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        validate_table_name(&table)?;

        let quoted = table
            .split('.')
            .map(|part| format!("\"{part}\""))
            .collect::<Vec<_>>()
            .join(".");

        Ok(Self {
            insert: format!(
                "INSERT INTO {quoted} ({COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
            ),
            select_by_access: format!("SELECT {COLUMNS} FROM {quoted} WHERE access = $1"),
            select_by_refresh: format!("SELECT {COLUMNS} FROM {quoted} WHERE refresh = $1"),
            delete_by_access: format!("DELETE FROM {quoted} WHERE access = $1"),
            delete_by_refresh: format!("DELETE FROM {quoted} WHERE refresh = $1"),
            table,
            quoted,
        })
    }

    /// Table name as configured.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Table name quoted for SQL.
    #[must_use]
    pub fn quoted_table(&self) -> &str {
        &self.quoted
    }

    pub(crate) fn insert_sql(&self) -> &str {
        &self.insert
    }

    pub(crate) fn select_by_access_sql(&self) -> &str {
        &self.select_by_access
    }

    pub(crate) fn select_by_refresh_sql(&self) -> &str {
        &self.select_by_refresh
    }

    pub(crate) fn delete_by_access_sql(&self) -> &str {
        &self.delete_by_access
    }

    pub(crate) fn delete_by_refresh_sql(&self) -> &str {
        &self.delete_by_refresh
    }

    /// Unqualified table name, used to derive index names.
    fn base_name(&self) -> &str {
        self.table.rsplit('.').next().unwrap_or(&self.table)
    }

    /// `CREATE TABLE IF NOT EXISTS` statement for the token table.
    #[must_use]
    pub fn create_table_sql(&self) -> String {
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                access TEXT PRIMARY KEY,
                refresh TEXT,
                client_id TEXT NOT NULL,
                user_id TEXT,
                redirect_uri TEXT,
                scope TEXT NOT NULL DEFAULT '',
                access_create_at TIMESTAMPTZ NOT NULL,
                access_expires_in BIGINT NOT NULL,
                refresh_create_at TIMESTAMPTZ,
                refresh_expires_in BIGINT
            )
            "#,
            table = self.quoted
        )
    }

    /// Unique partial index on `refresh`.
    #[must_use]
    pub fn create_refresh_index_sql(&self) -> String {
        format!(
            r#"CREATE UNIQUE INDEX IF NOT EXISTS "idx_{base}_refresh" ON {table} (refresh) WHERE refresh IS NOT NULL"#,
            base = self.base_name(),
            table = self.quoted
        )
    }

    /// Creates the table and its indexes if they do not exist yet.
    ///
    /// Both statements always run, so a table created elsewhere without the
    /// refresh index gets it here. Idempotent; safe to call on every startup.
    ///
    /// # Errors
    ///
    /// Returns an error if a DDL statement fails.
    #[instrument(skip(self, pool), fields(table = %self.table))]
    pub async fn ensure_table(&self, pool: &PgPool) -> Result<()> {
        if self.table_exists(pool).await? {
            debug!("Token table exists, checking indexes");
        } else {
            info!("Creating token table");
        }

        query(&self.create_table_sql()).execute(pool).await?;
        query(&self.create_refresh_index_sql())
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Checks if the table exists in the database.
    ///
    /// Unqualified names are resolved against the current schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog query fails.
    #[instrument(skip(self, pool), fields(table = %self.table))]
    pub async fn table_exists(&self, pool: &PgPool) -> Result<bool> {
        let exists: bool = query_scalar(
            r#"
            SELECT EXISTS (
                SELECT FROM information_schema.tables
                WHERE table_schema = COALESCE($1, current_schema())
                  AND table_name = $2
            )
            "#,
        )
        .bind(self.table.split_once('.').map(|(schema, _)| schema))
        .bind(self.base_name())
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }
}
