//! PostgreSQL implementation of the account and session stores.
//!
//! Schema lives in `db/sql/01_roster.sql`. Users and admins have separate
//! tables with the same columns, except that only `users` carries
//! `provider_client_ref`.

use super::{
    Account, AccountKind, AccountStore, Conflicts, NewAccount, ProfileUpdate, SessionRecord,
    SessionStore, Status, StoreError,
};
use async_trait::async_trait;
use sqlx::{postgres::PgRow, Connection, PgPool, Row};
use tracing::{info_span, Instrument, Span};

const TIMESTAMP_FORMAT: &str = r#"'YYYY-MM-DD"T"HH24:MI:SS"Z"'"#;

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_span(operation: &'static str, statement: &str) -> Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn returning_columns(kind: AccountKind) -> String {
    let client_ref = match kind {
        AccountKind::User => "provider_client_ref",
        AccountKind::Admin => "NULL::text AS provider_client_ref",
    };
    format!(
        "id, name, email, password_hash, status, {client_ref}, \
         to_char(created_at AT TIME ZONE 'utc', {TIMESTAMP_FORMAT}) AS created_at, \
         to_char(updated_at AT TIME ZONE 'utc', {TIMESTAMP_FORMAT}) AS updated_at"
    )
}

fn account_from_row(kind: AccountKind, row: &PgRow) -> Result<Account, sqlx::Error> {
    let token: String = row.try_get("status")?;
    let status = token.parse::<Status>().map_err(|e| sqlx::Error::ColumnDecode {
        index: "status".to_string(),
        source: Box::new(e),
    })?;

    Ok(Account {
        id: row.try_get("id")?,
        kind,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        status,
        provider_client_ref: row.try_get("provider_client_ref")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code == "23505"),
        _ => false,
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self.pool.acquire().instrument(acquire_span).await?;
        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping().instrument(ping_span).await?;
        Ok(())
    }

    async fn create(&self, account: NewAccount) -> Result<Account, StoreError> {
        let kind = account.kind;
        let query = match kind {
            AccountKind::User => format!(
                "INSERT INTO users (id, name, email, password_hash, status, provider_client_ref) \
                 VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
                returning_columns(kind)
            ),
            AccountKind::Admin => format!(
                "INSERT INTO admins (id, name, email, password_hash, status) \
                 VALUES ($1, $2, $3, $4, $5) RETURNING {}",
                returning_columns(kind)
            ),
        };

        let mut statement = sqlx::query(&query)
            .bind(&account.id)
            .bind(&account.name)
            .bind(&account.email)
            .bind(&account.password_hash)
            .bind(Status::Pending.as_str());
        if kind == AccountKind::User {
            statement = statement.bind(&account.provider_client_ref);
        }

        let row = statement
            .fetch_one(&self.pool)
            .instrument(db_span("INSERT", &query))
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    StoreError::Duplicate { kind }
                } else {
                    StoreError::Database(err)
                }
            })?;

        Ok(account_from_row(kind, &row)?)
    }

    async fn find(&self, kind: AccountKind, id: &str) -> Result<Option<Account>, StoreError> {
        let query = format!(
            "SELECT {} FROM {} WHERE id = $1",
            returning_columns(kind),
            kind.table()
        );
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", &query))
            .await?;
        Ok(row.map(|row| account_from_row(kind, &row)).transpose()?)
    }

    async fn find_by_email(
        &self,
        kind: AccountKind,
        email: &str,
    ) -> Result<Option<Account>, StoreError> {
        let query = format!(
            "SELECT {} FROM {} WHERE email = $1",
            returning_columns(kind),
            kind.table()
        );
        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", &query))
            .await?;
        Ok(row.map(|row| account_from_row(kind, &row)).transpose()?)
    }

    async fn conflicts(
        &self,
        kind: AccountKind,
        name: Option<&str>,
        email: Option<&str>,
        ignore_id: Option<&str>,
    ) -> Result<Conflicts, StoreError> {
        let table = kind.table();
        let query = format!(
            "SELECT \
               EXISTS(SELECT 1 FROM {table} WHERE name = $1 AND ($3::text IS NULL OR id <> $3)) AS name_taken, \
               EXISTS(SELECT 1 FROM {table} WHERE email = $2 AND ($3::text IS NULL OR id <> $3)) AS email_taken"
        );
        let row = sqlx::query(&query)
            .bind(name)
            .bind(email)
            .bind(ignore_id)
            .fetch_one(&self.pool)
            .instrument(db_span("SELECT", &query))
            .await?;
        Ok(Conflicts {
            name: row.try_get("name_taken")?,
            email: row.try_get("email_taken")?,
        })
    }

    async fn list(&self, kind: AccountKind) -> Result<Vec<Account>, StoreError> {
        let query = format!(
            "SELECT {} FROM {} ORDER BY created_at DESC",
            returning_columns(kind),
            kind.table()
        );
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .instrument(db_span("SELECT", &query))
            .await?;
        Ok(rows
            .iter()
            .map(|row| account_from_row(kind, row))
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn update_profile(
        &self,
        kind: AccountKind,
        id: &str,
        update: ProfileUpdate,
    ) -> Result<Option<Account>, StoreError> {
        let query = format!(
            "UPDATE {} SET name = COALESCE($1, name), email = COALESCE($2, email), updated_at = NOW() \
             WHERE id = $3 RETURNING {}",
            kind.table(),
            returning_columns(kind)
        );
        let row = sqlx::query(&query)
            .bind(update.name)
            .bind(update.email)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(db_span("UPDATE", &query))
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    StoreError::Duplicate { kind }
                } else {
                    StoreError::Database(err)
                }
            })?;
        Ok(row.map(|row| account_from_row(kind, &row)).transpose()?)
    }

    async fn save_status(
        &self,
        kind: AccountKind,
        id: &str,
        status: Status,
    ) -> Result<Option<Account>, StoreError> {
        let query = format!(
            "UPDATE {} SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING {}",
            kind.table(),
            returning_columns(kind)
        );
        let row = sqlx::query(&query)
            .bind(status.as_str())
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(db_span("UPDATE", &query))
            .await?;
        Ok(row.map(|row| account_from_row(kind, &row)).transpose()?)
    }

    async fn save_password_hash(
        &self,
        kind: AccountKind,
        id: &str,
        password_hash: &str,
    ) -> Result<Option<Account>, StoreError> {
        let query = format!(
            "UPDATE {} SET password_hash = $1, updated_at = NOW() WHERE id = $2 RETURNING {}",
            kind.table(),
            returning_columns(kind)
        );
        let row = sqlx::query(&query)
            .bind(password_hash)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(db_span("UPDATE", &query))
            .await?;
        Ok(row.map(|row| account_from_row(kind, &row)).transpose()?)
    }

    async fn delete(&self, kind: AccountKind, id: &str) -> Result<bool, StoreError> {
        let query = format!("DELETE FROM {} WHERE id = $1", kind.table());
        let result = sqlx::query(&query)
            .bind(id)
            .execute(&self.pool)
            .instrument(db_span("DELETE", &query))
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn create_session(
        &self,
        admin_id: &str,
        token_hash: &[u8],
        ttl_seconds: i64,
    ) -> Result<(), StoreError> {
        let query = r"
            INSERT INTO admin_sessions (token_hash, admin_id, expires_at)
            VALUES ($1, $2, NOW() + make_interval(secs => $3::double precision))
        ";
        sqlx::query(query)
            .bind(token_hash)
            .bind(admin_id)
            .bind(ttl_seconds)
            .execute(&self.pool)
            .instrument(db_span("INSERT", query))
            .await?;
        Ok(())
    }

    async fn lookup_session(&self, token_hash: &[u8]) -> Result<Option<SessionRecord>, StoreError> {
        let query = r"
            SELECT admin_id, EXTRACT(EPOCH FROM expires_at)::bigint AS expires_at_unix
            FROM admin_sessions
            WHERE token_hash = $1 AND expires_at > NOW()
        ";
        let row = sqlx::query(query)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;
        Ok(row
            .map(|row| -> Result<SessionRecord, sqlx::Error> {
                Ok(SessionRecord {
                    admin_id: row.try_get("admin_id")?,
                    expires_at_unix: row.try_get("expires_at_unix")?,
                })
            })
            .transpose()?)
    }

    async fn delete_session(&self, token_hash: &[u8]) -> Result<bool, StoreError> {
        let query = "DELETE FROM admin_sessions WHERE token_hash = $1";
        let result = sqlx::query(query)
            .bind(token_hash)
            .execute(&self.pool)
            .instrument(db_span("DELETE", query))
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_columns_select_null_client_ref() {
        let columns = returning_columns(AccountKind::Admin);
        assert!(columns.contains("NULL::text AS provider_client_ref"));
        let columns = returning_columns(AccountKind::User);
        assert!(columns.contains(", provider_client_ref,"));
    }

    #[test]
    fn timestamps_render_as_utc() {
        let columns = returning_columns(AccountKind::User);
        assert!(columns.contains(r#"'YYYY-MM-DD"T"HH24:MI:SS"Z"'"#));
    }
}
