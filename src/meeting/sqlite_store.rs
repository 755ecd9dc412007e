//! SQLite-backed meeting record store.
//!
//! Raw SQL with rusqlite, no ORM. Action items are stored as a JSON column
//! since they are read and written as a whole set.

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use uuid::Uuid;

use crate::backlog::ActionItem;

use super::{Meeting, MeetingPatch, MeetingStatus, MeetingStore, NewMeeting};

pub struct SqliteMeetingStore {
    db_path: PathBuf,
}

impl SqliteMeetingStore {
    pub fn new(db_path: PathBuf) -> Self {
        Self { db_path }
    }

    /// Store at the default data-dir location.
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(crate::global::db_file()?))
    }

    fn connect(db_path: &PathBuf) -> Result<Connection> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }

        let conn = Connection::open(db_path).context("Failed to open database connection")?;
        migrate(&conn)?;
        Ok(conn)
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = Self::connect(&db_path)?;
            f(&conn)
        })
        .await
        .context("Database task panicked")?
    }
}

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS meetings (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            meeting_type TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            scheduled_date TEXT NOT NULL DEFAULT '',
            scheduled_time TEXT NOT NULL DEFAULT '',
            project_id TEXT,
            sprint_id TEXT,
            status TEXT NOT NULL,
            transcript TEXT NOT NULL DEFAULT '',
            action_items TEXT NOT NULL DEFAULT '[]',
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )
    .context("Failed to create meetings table")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_meetings_created_at ON meetings(created_at DESC)",
        [],
    )
    .context("Failed to create index on created_at")?;

    Ok(())
}

fn row_to_meeting(row: &rusqlite::Row<'_>) -> rusqlite::Result<(Meeting, String, String)> {
    let status: String = row.get(8)?;
    let action_items_json: String = row.get(10)?;
    let meeting = Meeting {
        id: row.get(0)?,
        title: row.get(1)?,
        meeting_type: row.get(2)?,
        description: row.get(3)?,
        scheduled_date: row.get(4)?,
        scheduled_time: row.get(5)?,
        project_id: row.get(6)?,
        sprint_id: row.get(7)?,
        status: MeetingStatus::Scheduled, // replaced after parsing
        transcript: row.get(9)?,
        action_items: Vec::new(), // replaced after parsing
    };
    Ok((meeting, status, action_items_json))
}

fn finish_meeting(parts: (Meeting, String, String)) -> Result<Meeting> {
    let (mut meeting, status, action_items_json) = parts;
    meeting.status = status
        .parse()
        .ok()
        .with_context(|| format!("Invalid meeting status '{}'", status))?;
    meeting.action_items =
        serde_json::from_str(&action_items_json).context("Invalid action items JSON")?;
    Ok(meeting)
}

const SELECT_COLUMNS: &str = "id, title, meeting_type, description, scheduled_date, \
     scheduled_time, project_id, sprint_id, status, transcript, action_items";

#[async_trait]
impl MeetingStore for SqliteMeetingStore {
    async fn create(&self, meeting: NewMeeting) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let returned = id.clone();

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO meetings (id, title, meeting_type, description, scheduled_date, \
                 scheduled_time, project_id, sprint_id, status) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    id,
                    meeting.title,
                    meeting.meeting_type,
                    meeting.description,
                    meeting.scheduled_date,
                    meeting.scheduled_time,
                    meeting.project_id,
                    meeting.sprint_id,
                    MeetingStatus::Scheduled.as_str(),
                ],
            )
            .context("Failed to insert meeting")?;
            Ok(())
        })
        .await?;

        Ok(returned)
    }

    async fn get(&self, id: &str) -> Result<Option<Meeting>> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let parts = conn
                .query_row(
                    &format!("SELECT {} FROM meetings WHERE id = ?1", SELECT_COLUMNS),
                    params![id],
                    row_to_meeting,
                )
                .optional()
                .context("Failed to query meeting")?;

            parts.map(finish_meeting).transpose()
        })
        .await
    }

    async fn update(&self, id: &str, patch: MeetingPatch) -> Result<()> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            if let Some(transcript) = patch.transcript {
                let changed = conn
                    .execute(
                        "UPDATE meetings SET transcript = ?1, updated_at = CURRENT_TIMESTAMP \
                         WHERE id = ?2",
                        params![transcript, id],
                    )
                    .context("Failed to update transcript")?;
                anyhow::ensure!(changed == 1, "meeting {} not found", id);
            }

            if let Some(action_items) = patch.action_items {
                let json = serde_json::to_string(&action_items)
                    .context("Failed to serialize action items")?;
                let changed = conn
                    .execute(
                        "UPDATE meetings SET action_items = ?1, updated_at = CURRENT_TIMESTAMP \
                         WHERE id = ?2",
                        params![json, id],
                    )
                    .context("Failed to update action items")?;
                anyhow::ensure!(changed == 1, "meeting {} not found", id);
            }

            Ok(())
        })
        .await
    }

    async fn start(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE meetings SET status = ?1, updated_at = CURRENT_TIMESTAMP WHERE id = ?2",
                    params![MeetingStatus::InProgress.as_str(), id],
                )
                .context("Failed to start meeting")?;
            anyhow::ensure!(changed == 1, "meeting {} not found", id);
            Ok(())
        })
        .await
    }

    async fn complete(
        &self,
        id: &str,
        transcript: &str,
        action_items: &[ActionItem],
    ) -> Result<()> {
        let id = id.to_string();
        let transcript = transcript.to_string();
        let json =
            serde_json::to_string(action_items).context("Failed to serialize action items")?;

        self.with_conn(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE meetings SET status = ?1, transcript = ?2, action_items = ?3, \
                     updated_at = CURRENT_TIMESTAMP WHERE id = ?4",
                    params![MeetingStatus::Completed.as_str(), transcript, json, id],
                )
                .context("Failed to complete meeting")?;
            anyhow::ensure!(changed == 1, "meeting {} not found", id);
            Ok(())
        })
        .await
    }

    async fn list(&self, limit: usize) -> Result<Vec<Meeting>> {
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {} FROM meetings ORDER BY created_at DESC, id DESC LIMIT ?1",
                    SELECT_COLUMNS
                ))
                .context("Failed to prepare meetings list query")?;

            let rows = stmt
                .query_map(params![limit as i64], row_to_meeting)
                .context("Failed to list meetings")?;

            let mut meetings = Vec::new();
            for row in rows {
                meetings.push(finish_meeting(row?)?);
            }
            Ok(meetings)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backlog::{ItemType, Priority};
    use tempfile::TempDir;

    fn test_store() -> (TempDir, SqliteMeetingStore) {
        let dir = TempDir::new().unwrap();
        let store = SqliteMeetingStore::new(dir.path().join("test.db"));
        (dir, store)
    }

    fn new_meeting(title: &str) -> NewMeeting {
        NewMeeting {
            title: title.to_string(),
            meeting_type: "sprint-planning".to_string(),
            project_id: Some("proj-1".to_string()),
            ..Default::default()
        }
    }

    fn test_item() -> ActionItem {
        ActionItem {
            id: Uuid::new_v4(),
            item_type: ItemType::Task,
            title: "Follow up".to_string(),
            description: "Follow up on the deploy".to_string(),
            priority: Priority::High,
            assignee: None,
            due_date: None,
            status: Some("planning".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_round_trip() {
        let (_dir, store) = test_store();
        let id = store.create(new_meeting("Planning")).await.unwrap();

        let meeting = store.get(&id).await.unwrap().unwrap();
        assert_eq!(meeting.title, "Planning");
        assert_eq!(meeting.meeting_type, "sprint-planning");
        assert_eq!(meeting.project_id, Some("proj-1".to_string()));
        assert_eq!(meeting.status, MeetingStatus::Scheduled);
    }

    #[tokio::test]
    async fn test_get_nonexistent_is_none() {
        let (_dir, store) = test_store();
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_complete_persists_items_json() {
        let (_dir, store) = test_store();
        let id = store.create(new_meeting("Retro")).await.unwrap();
        let item = test_item();

        store
            .complete(&id, "[10:00:00] wrap up\n", &[item.clone()])
            .await
            .unwrap();

        let meeting = store.get(&id).await.unwrap().unwrap();
        assert_eq!(meeting.status, MeetingStatus::Completed);
        assert_eq!(meeting.action_items, vec![item]);
    }

    #[tokio::test]
    async fn test_update_missing_meeting_errors() {
        let (_dir, store) = test_store();
        let result = store
            .update(
                "missing",
                MeetingPatch {
                    transcript: Some("text".to_string()),
                    action_items: None,
                },
            )
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let (_dir, store) = test_store();
        store.create(new_meeting("First")).await.unwrap();
        store.create(new_meeting("Second")).await.unwrap();

        let meetings = store.list(10).await.unwrap();
        assert_eq!(meetings.len(), 2);
    }
}
