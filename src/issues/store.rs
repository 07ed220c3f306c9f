//! Issue Storage
//! Mission: Persist security issues, always keyed back to their owner

use crate::db::{column_timestamp, column_uuid, format_timestamp, Database};
use crate::issues::models::{
    Issue, IssueChanges, IssueFilter, IssuePriority, IssueStatus, IssueType, NewIssue,
};
use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, types::Type, OptionalExtension, Row};
use tracing::debug;
use uuid::Uuid;

const ISSUE_COLUMNS: &str =
    "id, title, description, type, priority, status, user_id, created_at, updated_at";

/// Issue storage backed by the shared database handle
#[derive(Clone)]
pub struct IssueStore {
    db: Database,
}

impl IssueStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn create(&self, owner: &Uuid, new: NewIssue) -> Result<Issue> {
        let now = Utc::now();
        let issue = Issue {
            id: Uuid::new_v4(),
            title: new.title,
            description: new.description,
            issue_type: new.issue_type,
            priority: new.priority,
            status: new.status,
            user_id: *owner,
            created_at: now,
            updated_at: now,
        };

        let conn = self.db.lock().await;
        conn.execute(
            "INSERT INTO issues (id, title, description, type, priority, status, user_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                issue.id.to_string(),
                issue.title,
                issue.description,
                issue.issue_type.as_str(),
                issue.priority.as_str(),
                issue.status.as_str(),
                issue.user_id.to_string(),
                format_timestamp(&issue.created_at),
                format_timestamp(&issue.updated_at),
            ],
        )
        .context("Failed to insert issue")?;

        debug!(issue_id = %issue.id, user_id = %owner, "Stored issue");
        Ok(issue)
    }

    pub async fn find_by_id(&self, id: &Uuid) -> Result<Option<Issue>> {
        let conn = self.db.lock().await;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM issues WHERE id = ?1",
            ISSUE_COLUMNS
        ))?;

        stmt.query_row(params![id.to_string()], issue_from_row)
            .optional()
            .context("Failed to load issue")
    }

    /// All issues owned by `owner`, newest first
    pub async fn find_by_owner(&self, owner: &Uuid, filter: IssueFilter) -> Result<Vec<Issue>> {
        let conn = self.db.lock().await;

        let issues = match filter.issue_type {
            Some(issue_type) => {
                let mut stmt = conn.prepare_cached(&format!(
                    "SELECT {} FROM issues WHERE user_id = ?1 AND type = ?2
                     ORDER BY created_at DESC, rowid DESC",
                    ISSUE_COLUMNS
                ))?;
                let rows = stmt.query_map(
                    params![owner.to_string(), issue_type.as_str()],
                    issue_from_row,
                )?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            }
            None => {
                let mut stmt = conn.prepare_cached(&format!(
                    "SELECT {} FROM issues WHERE user_id = ?1
                     ORDER BY created_at DESC, rowid DESC",
                    ISSUE_COLUMNS
                ))?;
                let rows = stmt.query_map(params![owner.to_string()], issue_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            }
        };

        issues.context("Failed to list issues")
    }

    /// Apply a partial update; the owner column is never written.
    /// Returns `None` when the issue no longer exists.
    pub async fn update(&self, id: &Uuid, changes: IssueChanges) -> Result<Option<Issue>> {
        // Read, apply and write under one lock so a concurrent delete cannot interleave
        let conn = self.db.lock().await;

        let current = {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT {} FROM issues WHERE id = ?1",
                ISSUE_COLUMNS
            ))?;
            stmt.query_row(params![id.to_string()], issue_from_row)
                .optional()
                .context("Failed to load issue for update")?
        };
        let Some(mut issue) = current else {
            return Ok(None);
        };

        changes.apply(&mut issue);
        issue.updated_at = Utc::now();

        let rows = conn
            .execute(
                "UPDATE issues SET title = ?1, description = ?2, type = ?3, priority = ?4,
                     status = ?5, updated_at = ?6
                 WHERE id = ?7",
                params![
                    issue.title,
                    issue.description,
                    issue.issue_type.as_str(),
                    issue.priority.as_str(),
                    issue.status.as_str(),
                    format_timestamp(&issue.updated_at),
                    issue.id.to_string(),
                ],
            )
            .context("Failed to update issue")?;

        Ok((rows > 0).then_some(issue))
    }

    /// Delete by id. Returns whether a row was removed.
    pub async fn delete(&self, id: &Uuid) -> Result<bool> {
        let conn = self.db.lock().await;
        let rows = conn
            .execute("DELETE FROM issues WHERE id = ?1", params![id.to_string()])
            .context("Failed to delete issue")?;
        Ok(rows > 0)
    }
}

fn issue_from_row(row: &Row<'_>) -> rusqlite::Result<Issue> {
    Ok(Issue {
        id: column_uuid(row, 0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        issue_type: column_enum(row, 3, IssueType::parse)?,
        priority: column_enum(row, 4, IssuePriority::parse)?,
        status: column_enum(row, 5, IssueStatus::parse)?,
        user_id: column_uuid(row, 6)?,
        created_at: column_timestamp(row, 7)?,
        updated_at: column_timestamp(row, 8)?,
    })
}

fn column_enum<T>(row: &Row<'_>, idx: usize, parse: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unknown enum value {:?}", raw).into(),
        )
    })
}
