//! libSQL backend: async `Database` trait implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::models::{
    Category, Draft, Email, NewDraft, NewEmail, NewPrompt, Prompt, TriageCommit, TriageUpdate,
    serialize_action_items,
};
use crate::store::migrations;
use crate::store::traits::Database;

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// A transaction on that connection would absorb any statement issued
/// while it is open, so every statement goes through `lock`.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
    /// Shared by reads; held exclusively by writes and triage transactions.
    lock: RwLock<()>,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    DatabaseError::Pool(format!("Failed to create database directory: {e}"))
                })?;
            }
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db)?;
        backend.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let backend = Self::from_database(db)?;
        backend.run_migrations().await?;
        Ok(backend)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
            lock: RwLock::new(()),
        })
    }

    /// Get the connection.
    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

/// Fixed-width RFC 3339 so stored timestamps sort lexically.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Convert `Option<&str>` to libsql Value.
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

const EMAIL_COLUMNS: &str = "id, sender, subject, body, timestamp, category, action_items, is_read";

const PROMPT_COLUMNS: &str = "id, name, template, description";

const DRAFT_COLUMNS: &str = "id, email_id, subject, body, status, created_at";

/// Map a libsql Row to an Email. Column order matches EMAIL_COLUMNS.
fn row_to_email(row: &libsql::Row) -> Result<Email, libsql::Error> {
    let timestamp_str: String = row.get(4)?;
    let category_str: String = row.get(5)?;
    let is_read: i64 = row.get(7)?;

    Ok(Email {
        id: row.get(0)?,
        sender: row.get(1)?,
        subject: row.get(2)?,
        body: row.get(3)?,
        timestamp: parse_datetime(&timestamp_str),
        category: category_str.parse().unwrap_or_default(),
        action_items: row.get(6)?,
        is_read: is_read != 0,
    })
}

/// Map a libsql Row to a Prompt. Column order matches PROMPT_COLUMNS.
fn row_to_prompt(row: &libsql::Row) -> Result<Prompt, libsql::Error> {
    Ok(Prompt {
        id: row.get(0)?,
        name: row.get(1)?,
        template: row.get(2)?,
        description: row.get(3).ok(),
    })
}

/// Map a libsql Row to a Draft. Column order matches DRAFT_COLUMNS.
fn row_to_draft(row: &libsql::Row) -> Result<Draft, libsql::Error> {
    let created_str: String = row.get(5)?;
    Ok(Draft {
        id: row.get(0)?,
        email_id: row.get(1).ok(),
        subject: row.get(2)?,
        body: row.get(3)?,
        status: row.get(4)?,
        created_at: parse_datetime(&created_str),
    })
}

/// Drain rows through a mapper, skipping rows that fail to parse.
async fn collect_rows<T>(
    mut rows: libsql::Rows,
    map: fn(&libsql::Row) -> Result<T, libsql::Error>,
    what: &str,
) -> Vec<T> {
    let mut out = Vec::new();
    while let Ok(Some(row)) = rows.next().await {
        match map(&row) {
            Ok(item) => out.push(item),
            Err(e) => warn!("Skipping {what} row: {e}"),
        }
    }
    out
}

/// Insert a draft row on `conn` (plain connection or open transaction).
async fn insert_draft_row(conn: &Connection, draft: &NewDraft) -> Result<Draft, DatabaseError> {
    let id = Uuid::new_v4().to_string();
    let created_at = Utc::now();
    conn.execute(
        "INSERT INTO drafts (id, email_id, subject, body, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            id.clone(),
            opt_text(draft.email_id.as_deref()),
            draft.subject.clone(),
            draft.body.clone(),
            draft.status.clone(),
            format_datetime(&created_at),
        ],
    )
    .await
    .map_err(|e| DatabaseError::Query(format!("insert_draft: {e}")))?;

    debug!(id = %id, email_id = ?draft.email_id, "Draft inserted into DB");
    Ok(Draft {
        id,
        email_id: draft.email_id.clone(),
        subject: draft.subject.clone(),
        body: draft.body.clone(),
        status: draft.status.clone(),
        created_at,
    })
}

async fn draft_exists_for_email(conn: &Connection, email_id: &str) -> Result<bool, DatabaseError> {
    let mut rows = conn
        .query(
            "SELECT 1 FROM drafts WHERE email_id = ?1 LIMIT 1",
            params![email_id],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("draft_exists_for_email: {e}")))?;
    let row = rows
        .next()
        .await
        .map_err(|e| DatabaseError::Query(format!("draft_exists_for_email: {e}")))?;
    Ok(row.is_some())
}

/// Body of `commit_triage`, run inside the transaction.
async fn apply_triage(
    conn: &Connection,
    email_id: &str,
    update: &TriageUpdate,
) -> Result<TriageCommit, DatabaseError> {
    let exists = {
        let mut rows = conn
            .query("SELECT 1 FROM emails WHERE id = ?1", params![email_id])
            .await
            .map_err(|e| DatabaseError::Query(format!("commit_triage lookup: {e}")))?;
        rows.next()
            .await
            .map_err(|e| DatabaseError::Query(format!("commit_triage lookup: {e}")))?
            .is_some()
    };
    if !exists {
        return Err(DatabaseError::NotFound {
            entity: "email".to_string(),
            id: email_id.to_string(),
        });
    }

    if let Some(category) = update.category {
        conn.execute(
            "UPDATE emails SET category = ?1 WHERE id = ?2",
            params![category.label(), email_id],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("commit_triage category: {e}")))?;
    }

    if let Some(items) = &update.action_items {
        conn.execute(
            "UPDATE emails SET action_items = ?1 WHERE id = ?2",
            params![serialize_action_items(items), email_id],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("commit_triage action_items: {e}")))?;
    }

    let mut commit = TriageCommit::default();
    if let Some(draft) = &update.draft {
        if draft_exists_for_email(conn, email_id).await? {
            debug!(email_id = email_id, "Draft already exists for email, keeping it");
        } else {
            insert_draft_row(conn, draft).await?;
            commit.draft_created = true;
        }
    }

    Ok(commit)
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl Database for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        let _guard = self.lock.write().await;
        migrations::run_migrations(self.conn()).await
    }

    // ── Emails ──────────────────────────────────────────────────────

    async fn insert_email(&self, email: &NewEmail) -> Result<Email, DatabaseError> {
        let _guard = self.lock.write().await;
        let id = Uuid::new_v4().to_string();
        self.conn()
            .execute(
                "INSERT INTO emails (id, sender, subject, body, timestamp, category, action_items, is_read)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, '[]', 0)",
                params![
                    id.clone(),
                    email.sender.clone(),
                    email.subject.clone(),
                    email.body.clone(),
                    format_datetime(&email.timestamp),
                    email.category.label(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_email: {e}")))?;

        debug!(id = %id, sender = %email.sender, "Email inserted into DB");
        Ok(Email {
            id,
            sender: email.sender.clone(),
            subject: email.subject.clone(),
            body: email.body.clone(),
            timestamp: email.timestamp,
            category: email.category,
            action_items: "[]".to_string(),
            is_read: false,
        })
    }

    async fn get_email(&self, id: &str) -> Result<Option<Email>, DatabaseError> {
        let _guard = self.lock.read().await;
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {EMAIL_COLUMNS} FROM emails WHERE id = ?1"),
                params![id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_email: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let email = row_to_email(&row)
                    .map_err(|e| DatabaseError::Query(format!("row parse: {e}")))?;
                Ok(Some(email))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_email: {e}"))),
        }
    }

    async fn list_emails(&self, skip: usize, limit: usize) -> Result<Vec<Email>, DatabaseError> {
        let _guard = self.lock.read().await;
        let rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {EMAIL_COLUMNS} FROM emails ORDER BY timestamp ASC, rowid ASC LIMIT ?1 OFFSET ?2"
                ),
                params![limit as i64, skip as i64],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_emails: {e}")))?;

        Ok(collect_rows(rows, row_to_email, "email").await)
    }

    async fn list_emails_by_category(
        &self,
        category: Category,
    ) -> Result<Vec<Email>, DatabaseError> {
        let _guard = self.lock.read().await;
        let rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {EMAIL_COLUMNS} FROM emails WHERE category = ?1 ORDER BY timestamp ASC, rowid ASC"
                ),
                params![category.label()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_emails_by_category: {e}")))?;

        Ok(collect_rows(rows, row_to_email, "email").await)
    }

    async fn count_emails(&self) -> Result<usize, DatabaseError> {
        let _guard = self.lock.read().await;
        let mut rows = self
            .conn()
            .query("SELECT COUNT(*) FROM emails", ())
            .await
            .map_err(|e| DatabaseError::Query(format!("count_emails: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let count: i64 = row.get(0).unwrap_or(0);
                Ok(count as usize)
            }
            Ok(None) => Ok(0),
            Err(e) => Err(DatabaseError::Query(format!("count_emails: {e}"))),
        }
    }

    async fn delete_all_emails(&self) -> Result<usize, DatabaseError> {
        let _guard = self.lock.write().await;
        let count = self
            .conn()
            .execute("DELETE FROM emails", ())
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_all_emails: {e}")))?;
        info!(count, "Deleted all emails");
        Ok(count as usize)
    }

    async fn commit_triage(
        &self,
        email_id: &str,
        update: &TriageUpdate,
    ) -> Result<TriageCommit, DatabaseError> {
        let _guard = self.lock.write().await;

        let tx = self
            .conn()
            .transaction()
            .await
            .map_err(|e| DatabaseError::Transaction(format!("begin: {e}")))?;

        match apply_triage(&tx, email_id, update).await {
            Ok(commit) => {
                tx.commit()
                    .await
                    .map_err(|e| DatabaseError::Transaction(format!("commit: {e}")))?;
                debug!(
                    email_id = email_id,
                    category = ?update.category,
                    draft_created = commit.draft_created,
                    "Triage committed"
                );
                Ok(commit)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(email_id = email_id, error = %rollback_err, "Rollback failed");
                }
                Err(e)
            }
        }
    }

    // ── Prompts ─────────────────────────────────────────────────────

    async fn get_prompt_by_name(&self, name: &str) -> Result<Option<Prompt>, DatabaseError> {
        let _guard = self.lock.read().await;
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {PROMPT_COLUMNS} FROM prompts WHERE name = ?1"),
                params![name],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_prompt_by_name: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let prompt = row_to_prompt(&row)
                    .map_err(|e| DatabaseError::Query(format!("row parse: {e}")))?;
                Ok(Some(prompt))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_prompt_by_name: {e}"))),
        }
    }

    async fn list_prompts(&self) -> Result<Vec<Prompt>, DatabaseError> {
        let _guard = self.lock.read().await;
        let rows = self
            .conn()
            .query(
                &format!("SELECT {PROMPT_COLUMNS} FROM prompts ORDER BY name ASC"),
                (),
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_prompts: {e}")))?;

        Ok(collect_rows(rows, row_to_prompt, "prompt").await)
    }

    async fn upsert_prompt(&self, prompt: &NewPrompt) -> Result<Prompt, DatabaseError> {
        let guard = self.lock.write().await;
        self.conn()
            .execute(
                "INSERT INTO prompts (id, name, template, description) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(name) DO UPDATE SET
                    template = excluded.template,
                    description = excluded.description",
                params![
                    Uuid::new_v4().to_string(),
                    prompt.name.clone(),
                    prompt.template.clone(),
                    opt_text(prompt.description.as_deref()),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_prompt: {e}")))?;

        drop(guard);

        debug!(name = %prompt.name, "Prompt upserted");
        self.get_prompt_by_name(&prompt.name)
            .await?
            .ok_or_else(|| DatabaseError::NotFound {
                entity: "prompt".to_string(),
                id: prompt.name.clone(),
            })
    }

    // ── Drafts ──────────────────────────────────────────────────────

    async fn insert_draft(&self, draft: &NewDraft) -> Result<Draft, DatabaseError> {
        let _guard = self.lock.write().await;
        insert_draft_row(self.conn(), draft).await
    }

    async fn list_drafts(&self) -> Result<Vec<Draft>, DatabaseError> {
        let _guard = self.lock.read().await;
        let rows = self
            .conn()
            .query(
                &format!("SELECT {DRAFT_COLUMNS} FROM drafts ORDER BY created_at ASC, rowid ASC"),
                (),
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_drafts: {e}")))?;

        Ok(collect_rows(rows, row_to_draft, "draft").await)
    }

    async fn get_draft_for_email(&self, email_id: &str) -> Result<Option<Draft>, DatabaseError> {
        let _guard = self.lock.read().await;
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {DRAFT_COLUMNS} FROM drafts WHERE email_id = ?1 ORDER BY created_at ASC LIMIT 1"
                ),
                params![email_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_draft_for_email: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let draft = row_to_draft(&row)
                    .map_err(|e| DatabaseError::Query(format!("row parse: {e}")))?;
                Ok(Some(draft))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_draft_for_email: {e}"))),
        }
    }

    async fn delete_all_drafts(&self) -> Result<usize, DatabaseError> {
        let _guard = self.lock.write().await;
        let count = self
            .conn()
            .execute("DELETE FROM drafts", ())
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_all_drafts: {e}")))?;
        info!(count, "Deleted all drafts");
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActionItem;

    async fn test_db() -> LibSqlBackend {
        LibSqlBackend::new_memory().await.unwrap()
    }

    fn make_email(subject: &str) -> NewEmail {
        NewEmail::new("alice@example.com", subject, "Can we meet Tuesday?")
    }

    // ── Email tests ─────────────────────────────────────────────────

    #[tokio::test]
    async fn insert_and_get_email() {
        let db = test_db().await;
        let inserted = db.insert_email(&make_email("Hello")).await.unwrap();

        let loaded = db.get_email(&inserted.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, inserted.id);
        assert_eq!(loaded.sender, "alice@example.com");
        assert_eq!(loaded.subject, "Hello");
        assert_eq!(loaded.category, Category::Uncategorized);
        assert_eq!(loaded.action_items, "[]");
        assert!(!loaded.is_read);
    }

    #[tokio::test]
    async fn get_email_not_found() {
        let db = test_db().await;
        assert!(db.get_email("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_emails_paginates_oldest_first() {
        let db = test_db().await;
        let now = Utc::now();
        for (i, subject) in ["a", "b", "c"].iter().enumerate() {
            let email = make_email(subject).with_timestamp(now - chrono::Duration::hours(3 - i as i64));
            db.insert_email(&email).await.unwrap();
        }

        let all = db.list_emails(0, 100).await.unwrap();
        let subjects: Vec<&str> = all.iter().map(|e| e.subject.as_str()).collect();
        assert_eq!(subjects, vec!["a", "b", "c"]);

        let page = db.list_emails(1, 1).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].subject, "b");
        assert_eq!(db.count_emails().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn list_by_category_filters() {
        let db = test_db().await;
        let first = db.insert_email(&make_email("one")).await.unwrap();
        db.insert_email(&make_email("two")).await.unwrap();

        let update = TriageUpdate {
            category: Some(Category::Spam),
            ..Default::default()
        };
        db.commit_triage(&first.id, &update).await.unwrap();

        let pending = db
            .list_emails_by_category(Category::Uncategorized)
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].subject, "two");

        let spam = db.list_emails_by_category(Category::Spam).await.unwrap();
        assert_eq!(spam.len(), 1);
    }

    // ── Triage commit tests ─────────────────────────────────────────

    #[tokio::test]
    async fn commit_triage_writes_all_fields() {
        let db = test_db().await;
        let email = db.insert_email(&make_email("Meeting")).await.unwrap();

        let update = TriageUpdate {
            category: Some(Category::ToDo),
            action_items: Some(vec![ActionItem {
                task: "Confirm meeting".into(),
                deadline: Some("Tuesday".into()),
            }]),
            draft: Some(NewDraft::reply_to(&email, "Sounds good.")),
        };
        let commit = db.commit_triage(&email.id, &update).await.unwrap();
        assert!(commit.draft_created);

        let loaded = db.get_email(&email.id).await.unwrap().unwrap();
        assert_eq!(loaded.category, Category::ToDo);
        let items = loaded.action_item_list();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].task, "Confirm meeting");

        let draft = db.get_draft_for_email(&email.id).await.unwrap().unwrap();
        assert_eq!(draft.subject, "Re: Meeting");
        assert_eq!(draft.body, "Sounds good.");
        assert_eq!(draft.status, "draft");
    }

    #[tokio::test]
    async fn commit_triage_skipped_fields_stay_unchanged() {
        let db = test_db().await;
        let email = db.insert_email(&make_email("Keep")).await.unwrap();

        db.commit_triage(&email.id, &TriageUpdate::default())
            .await
            .unwrap();

        let loaded = db.get_email(&email.id).await.unwrap().unwrap();
        assert_eq!(loaded.category, Category::Uncategorized);
        assert_eq!(loaded.action_items, "[]");
        assert!(db.list_drafts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn commit_triage_keeps_existing_draft() {
        let db = test_db().await;
        let email = db.insert_email(&make_email("Twice")).await.unwrap();

        let first = TriageUpdate {
            draft: Some(NewDraft::reply_to(&email, "first")),
            ..Default::default()
        };
        let second = TriageUpdate {
            draft: Some(NewDraft::reply_to(&email, "second")),
            ..Default::default()
        };
        assert!(db.commit_triage(&email.id, &first).await.unwrap().draft_created);
        assert!(!db.commit_triage(&email.id, &second).await.unwrap().draft_created);

        let drafts = db.list_drafts().await.unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].body, "first");
    }

    #[tokio::test]
    async fn commit_triage_unknown_email_writes_nothing() {
        let db = test_db().await;
        let email = db.insert_email(&make_email("Real")).await.unwrap();
        let update = TriageUpdate {
            category: Some(Category::Important),
            draft: Some(NewDraft::reply_to(&email, "x")),
            ..Default::default()
        };

        let err = db.commit_triage("missing", &update).await.unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
        assert!(db.list_drafts().await.unwrap().is_empty());

        // The connection is usable after the rollback.
        db.commit_triage(&email.id, &update).await.unwrap();
        let loaded = db.get_email(&email.id).await.unwrap().unwrap();
        assert_eq!(loaded.category, Category::Important);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn failed_triage_keeps_concurrent_writes() {
        let db = Arc::new(test_db().await);
        let existing = db.insert_email(&make_email("existing")).await.unwrap();
        let important = TriageUpdate {
            category: Some(Category::Important),
            ..Default::default()
        };
        db.commit_triage(&existing.id, &important).await.unwrap();

        let failing = {
            let db = Arc::clone(&db);
            tokio::spawn(async move {
                let update = TriageUpdate {
                    category: Some(Category::Spam),
                    ..Default::default()
                };
                for _ in 0..500 {
                    let err = db.commit_triage("missing", &update).await.unwrap_err();
                    assert!(matches!(err, DatabaseError::NotFound { .. }));
                }
            })
        };

        let writers: Vec<_> = (0..4)
            .map(|w| {
                let db = Arc::clone(&db);
                tokio::spawn(async move {
                    for i in 0..50 {
                        db.insert_email(&make_email(&format!("w{w}-{i}")))
                            .await
                            .unwrap();
                    }
                    db.upsert_prompt(&NewPrompt {
                        name: format!("prompt-{w}"),
                        template: "{email_body}".into(),
                        description: None,
                    })
                    .await
                    .unwrap();
                })
            })
            .collect();

        failing.await.unwrap();
        for writer in writers {
            writer.await.unwrap();
        }

        assert_eq!(db.count_emails().await.unwrap(), 201);
        assert_eq!(db.list_prompts().await.unwrap().len(), 4);
        let existing = db.get_email(&existing.id).await.unwrap().unwrap();
        assert_eq!(existing.category, Category::Important);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_triage_commits_are_isolated() {
        let db = Arc::new(test_db().await);
        let mut ids = Vec::new();
        for i in 0..20 {
            ids.push(db.insert_email(&make_email(&format!("e{i}"))).await.unwrap());
        }

        let tasks: Vec<_> = ids
            .iter()
            .enumerate()
            .map(|(i, email)| {
                let db = Arc::clone(&db);
                let email = email.clone();
                tokio::spawn(async move {
                    let target = if i % 2 == 0 { email.id.clone() } else { format!("gone-{i}") };
                    let update = TriageUpdate {
                        category: Some(Category::ToDo),
                        draft: Some(NewDraft::reply_to(&email, "ok")),
                        ..Default::default()
                    };
                    db.commit_triage(&target, &update).await.is_ok()
                })
            })
            .collect();

        let mut committed = 0;
        for task in tasks {
            if task.await.unwrap() {
                committed += 1;
            }
        }

        assert_eq!(committed, 10);
        assert_eq!(db.list_drafts().await.unwrap().len(), 10);
        assert_eq!(
            db.list_emails_by_category(Category::ToDo).await.unwrap().len(),
            10
        );
        assert_eq!(db.count_emails().await.unwrap(), 20);
    }

    // ── Prompt tests ────────────────────────────────────────────────

    #[tokio::test]
    async fn upsert_prompt_inserts_then_replaces() {
        let db = test_db().await;
        let created = db
            .upsert_prompt(&NewPrompt {
                name: "categorization".into(),
                template: "v1 {email_body}".into(),
                description: None,
            })
            .await
            .unwrap();
        assert_eq!(created.template, "v1 {email_body}");
        assert!(created.description.is_none());

        let updated = db
            .upsert_prompt(&NewPrompt {
                name: "categorization".into(),
                template: "v2 {email_body}".into(),
                description: Some("second".into()),
            })
            .await
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.template, "v2 {email_body}");
        assert_eq!(updated.description.as_deref(), Some("second"));
        assert_eq!(db.list_prompts().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn get_prompt_by_name_missing() {
        let db = test_db().await;
        assert!(db.get_prompt_by_name("auto_reply").await.unwrap().is_none());
    }

    // ── Draft tests ─────────────────────────────────────────────────

    #[tokio::test]
    async fn insert_standalone_draft() {
        let db = test_db().await;
        let draft = db
            .insert_draft(&NewDraft {
                email_id: None,
                subject: "Hello".into(),
                body: "Body".into(),
                status: "draft".into(),
            })
            .await
            .unwrap();

        let drafts = db.list_drafts().await.unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].id, draft.id);
        assert!(drafts[0].email_id.is_none());
    }

    #[tokio::test]
    async fn delete_all_clears_tables() {
        let db = test_db().await;
        let email = db.insert_email(&make_email("x")).await.unwrap();
        db.insert_draft(&NewDraft::reply_to(&email, "y")).await.unwrap();

        assert_eq!(db.delete_all_drafts().await.unwrap(), 1);
        assert_eq!(db.delete_all_emails().await.unwrap(), 1);
        assert_eq!(db.count_emails().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn new_local_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let db_path = tmp.path().join("nested").join("triage.db");
        let db = LibSqlBackend::new_local(&db_path).await.unwrap();
        db.insert_email(&make_email("persisted")).await.unwrap();
        assert!(db_path.exists());
    }
}
