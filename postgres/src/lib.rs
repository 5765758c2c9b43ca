//! `PostgreSQL` store for the helpdesk.
//!
//! This crate provides the durable implementation of
//! [`HelpdeskStore`](helpdesk_runtime::HelpdeskStore). Queries are checked at
//! runtime, so building it needs no database. It supports:
//!
//! - Row-locked ticket mutations (`SELECT … FOR UPDATE`) committed together
//!   with their conversation entries and attachment rows
//! - Per-year ticket numbering serialized by a transaction-scoped advisory lock
//! - Embedded migrations
//!
//! # Example
//!
//! ```ignore
//! use helpdesk_postgres::PostgresStore;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PostgresStore::connect("postgres://localhost/helpdesk", 10).await?;
//!     store.migrate().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod rows;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, TimeZone, Utc};
use helpdesk_core::access::ListQuery;
use helpdesk_core::attachment::{Attachment, NewAttachment, StoredReference};
use helpdesk_core::conversation::Message;
use helpdesk_core::numbering::TicketNumber;
use helpdesk_core::{
    AttachmentId, MessageId, Ticket, TicketDraft, TicketError, TicketId, User, UserId,
};
use helpdesk_runtime::{Changes, Committed, HelpdeskStore, StoreError, TicketMutation, UserUpsert};
use rows::{
    ATTACHMENT_COLUMNS, AttachmentRow, MESSAGE_COLUMNS, MessageRow, TICKET_COLUMNS, TicketRow,
    USER_COLUMNS, UserRow, convert_all,
};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};

/// Key of the advisory lock serializing ticket numbering.
const NUMBERING_LOCK: i64 = 0x6865_6c70_6465_736b;

/// Map a driver error, recording it against `operation`.
fn database_error(operation: &'static str, error: &sqlx::Error) -> TicketError {
    metrics::counter!("helpdesk_store_errors_total", "operation" => operation).increment(1);
    tracing::error!(operation, error = %error, "Database operation failed");
    StoreError::Database(error.to_string()).into()
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

fn to_i64(value: u64, what: &str) -> Result<i64, TicketError> {
    i64::try_from(value).map_err(|_| TicketError::Validation(format!("{what} out of range")))
}

/// `PostgreSQL`-backed [`HelpdeskStore`].
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect a pool to `database_url`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the pool cannot be created.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        tracing::info!(max_connections, "Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    async fn insert_attachment(
        tx: &mut Transaction<'_, Postgres>,
        attachment: NewAttachment,
        message_id: Option<MessageId>,
    ) -> Result<Attachment, TicketError> {
        let id: (i64,) = sqlx::query_as(
            r"
            INSERT INTO attachments (
                ticket_id, message_id, filename, stored_path, filesize, uploaded_by, uploaded_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            ",
        )
        .bind(attachment.ticket_id.get())
        .bind(message_id.map(MessageId::get))
        .bind(&attachment.filename)
        .bind(attachment.reference.as_str())
        .bind(to_i64(attachment.filesize, "filesize")?)
        .bind(attachment.uploaded_by.get())
        .bind(attachment.uploaded_at)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| database_error("insert_attachment", &e))?;

        Ok(attachment.into_attachment(AttachmentId(id.0), message_id))
    }

    async fn write_changes(
        tx: &mut Transaction<'_, Postgres>,
        ticket: &Ticket,
        changes: Changes,
    ) -> Result<Committed, TicketError> {
        sqlx::query(
            r"
            UPDATE tickets SET
                assignee_id = $2, status = $3, is_urgent = $4, title = $5,
                description = $6, steps = $7, url = $8, updated_at = $9
            WHERE id = $1
            ",
        )
        .bind(ticket.id.get())
        .bind(ticket.assignee_id.map(UserId::get))
        .bind(ticket.status.as_str())
        .bind(ticket.is_urgent)
        .bind(&ticket.title)
        .bind(&ticket.description)
        .bind(&ticket.steps)
        .bind(&ticket.url)
        .bind(ticket.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| database_error("update_ticket", &e))?;

        let Changes {
            messages,
            attachments,
            events,
        } = changes;
        let mut committed_messages = Vec::with_capacity(messages.len());
        let mut committed_attachments = Vec::new();

        for mut new_message in messages {
            let attachment = new_message.attachment.take();
            let id: (i64,) = sqlx::query_as(
                r"
                INSERT INTO messages (ticket_id, sender_id, sender_role, text, created_at)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id
                ",
            )
            .bind(new_message.ticket_id.get())
            .bind(new_message.sender_id.map(UserId::get))
            .bind(new_message.sender_role.as_str())
            .bind(&new_message.text)
            .bind(new_message.created_at)
            .fetch_one(&mut **tx)
            .await
            .map_err(|e| database_error("insert_message", &e))?;

            let message = new_message.into_message(MessageId(id.0));
            if let Some(attachment) = attachment {
                committed_attachments
                    .push(Self::insert_attachment(tx, attachment, Some(message.id)).await?);
            }
            committed_messages.push(message);
        }

        for attachment in attachments {
            committed_attachments.push(Self::insert_attachment(tx, attachment, None).await?);
        }

        Ok(Committed {
            ticket: ticket.clone(),
            messages: committed_messages,
            attachments: committed_attachments,
            events,
        })
    }
}

fn year_bounds(at: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc
        .with_ymd_and_hms(at.year(), 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(at);
    let end = Utc
        .with_ymd_and_hms(at.year() + 1, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(at);
    (start, end)
}

#[async_trait]
impl HelpdeskStore for PostgresStore {
    async fn upsert_user(&self, user: UserUpsert) -> Result<User, TicketError> {
        let row: UserRow = sqlx::query_as(&format!(
            r"
            INSERT INTO users (external_id, username, display_name, role, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (external_id) DO UPDATE SET
                username = EXCLUDED.username,
                display_name = EXCLUDED.display_name,
                role = EXCLUDED.role
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(user.external_id.get())
        .bind(&user.username)
        .bind(&user.display_name)
        .bind(user.role.as_str())
        .bind(user.at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| database_error("upsert_user", &e))?;

        Ok(User::try_from(row)?)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, TicketError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| database_error("get_user", &e))?;

        Ok(row.map(User::try_from).transpose()?)
    }

    async fn create_ticket(
        &self,
        author: UserId,
        draft: TicketDraft,
        at: DateTime<Utc>,
    ) -> Result<Ticket, TicketError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| database_error("begin", &e))?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(NUMBERING_LOCK)
            .execute(&mut *tx)
            .await
            .map_err(|e| database_error("numbering_lock", &e))?;

        let (start, end) = year_bounds(at);
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM tickets WHERE created_at >= $1 AND created_at < $2",
        )
        .bind(start)
        .bind(end)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| database_error("count_tickets", &e))?;

        let created_this_year = u64::try_from(count.0).unwrap_or_default();
        let number = TicketNumber::for_instant(at, created_this_year).to_string();

        let row: TicketRow = sqlx::query_as(&format!(
            r"
            INSERT INTO tickets (
                number, author_id, status, is_urgent, title, description, steps, url,
                created_at, updated_at
            ) VALUES ($1, $2, 'new', $3, $4, $5, $6, $7, $8, $8)
            RETURNING {TICKET_COLUMNS}
            "
        ))
        .bind(&number)
        .bind(author.get())
        .bind(draft.is_urgent)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(&draft.steps)
        .bind(&draft.url)
        .bind(at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                TicketError::from(StoreError::DuplicateNumber(number.clone()))
            } else {
                database_error("insert_ticket", &e)
            }
        })?;

        tx.commit()
            .await
            .map_err(|e| database_error("commit", &e))?;

        Ok(Ticket::try_from(row)?)
    }

    async fn get_ticket(&self, id: TicketId) -> Result<Option<Ticket>, TicketError> {
        let row: Option<TicketRow> =
            sqlx::query_as(&format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1"))
                .bind(id.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| database_error("get_ticket", &e))?;

        Ok(row.map(Ticket::try_from).transpose()?)
    }

    async fn list_tickets(&self, query: &ListQuery) -> Result<Vec<Ticket>, TicketError> {
        let rows: Vec<TicketRow> = sqlx::query_as(&format!(
            r"
            SELECT {TICKET_COLUMNS} FROM tickets
            WHERE ($1::BIGINT IS NULL OR author_id = $1)
              AND ($2::TEXT IS NULL OR status = $2)
              AND ($3::BOOLEAN IS NULL OR is_urgent = $3)
            ORDER BY updated_at DESC, id DESC
            "
        ))
        .bind(query.author.map(UserId::get))
        .bind(query.status.map(|status| status.as_str()))
        .bind(query.urgent)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| database_error("list_tickets", &e))?;

        Ok(convert_all(rows)?)
    }

    async fn modify_ticket(
        &self,
        id: TicketId,
        mutation: TicketMutation,
    ) -> Result<Committed, TicketError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| database_error("begin", &e))?;

        let row: Option<TicketRow> = sqlx::query_as(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.get())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| database_error("lock_ticket", &e))?;

        let mut ticket = match row {
            Some(row) => Ticket::try_from(row)?,
            None => return Err(TicketError::ticket_not_found(id)),
        };

        // Dropping `tx` on any error below rolls the unit back.
        let changes = mutation(&mut ticket)?;
        let committed = Self::write_changes(&mut tx, &ticket, changes).await?;

        tx.commit()
            .await
            .map_err(|e| database_error("commit", &e))?;
        Ok(committed)
    }

    async fn list_messages(&self, ticket: TicketId) -> Result<Vec<Message>, TicketError> {
        let rows: Vec<MessageRow> = sqlx::query_as(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE ticket_id = $1 ORDER BY created_at, id"
        ))
        .bind(ticket.get())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| database_error("list_messages", &e))?;

        Ok(convert_all(rows)?)
    }

    async fn ticket_attachments(&self, ticket: TicketId) -> Result<Vec<Attachment>, TicketError> {
        let rows: Vec<AttachmentRow> = sqlx::query_as(&format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM attachments \
             WHERE ticket_id = $1 AND message_id IS NULL ORDER BY id"
        ))
        .bind(ticket.get())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| database_error("ticket_attachments", &e))?;

        Ok(convert_all(rows)?)
    }

    async fn message_attachments(
        &self,
        ticket: TicketId,
    ) -> Result<Vec<Attachment>, TicketError> {
        let rows: Vec<AttachmentRow> = sqlx::query_as(&format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM attachments \
             WHERE ticket_id = $1 AND message_id IS NOT NULL ORDER BY id"
        ))
        .bind(ticket.get())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| database_error("message_attachments", &e))?;

        Ok(convert_all(rows)?)
    }

    async fn find_attachment(
        &self,
        reference: &StoredReference,
    ) -> Result<Option<Attachment>, TicketError> {
        let row: Option<AttachmentRow> = sqlx::query_as(&format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM attachments WHERE stored_path = $1 \
             ORDER BY (message_id IS NOT NULL), id LIMIT 1"
        ))
        .bind(reference.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| database_error("find_attachment", &e))?;

        Ok(row.map(Attachment::try_from).transpose()?)
    }

    async fn ping(&self) -> Result<(), TicketError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| database_error("ping", &e))?;
        Ok(())
    }
}
