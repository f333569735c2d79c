//! SQLite-backed store.
//!
//! Uses prepared statements; rows come back in insertion order.

use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection, SqlitePool};

use super::store::LeadRemoval;
use super::{timestamp, Store};
use crate::errors::AppError;
use crate::models::{
    FollowUpLevel, Interaction, Lead, LeadStatus, RevisionInfo, Source, Tag, TagAssignment,
    TagType, Task, TaskPriority, TaskStatus,
};

const LEAD_COLUMNS: &str = "id, name, phone, email, query, status, source, follow_up_level, \
     course_tag_id, subject_tag_id, term_tag_id, faculty_tag_id, custom_tag_ids, \
     assigned_to, created_at, updated_at";

const TAG_COLUMNS: &str = "id, name, tag_type, parent_id, created_at, updated_at";

const INTERACTION_COLUMNS: &str =
    "id, lead_id, notes, status, follow_up_level, author, created_at";

const TASK_COLUMNS: &str =
    "id, lead_id, lead_name, lead_query, deadline, priority, status, assignee, created_at";

/// Store backed by a SQLite connection pool.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn revision_info(&self) -> Result<RevisionInfo, AppError> {
        let row = sqlx::query("SELECT revision_id, generated_at FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(RevisionInfo {
            revision_id: row.try_get("revision_id")?,
            generated_at: row.try_get("generated_at")?,
        })
    }

    async fn bump_revision(&self) -> Result<i64, AppError> {
        let row = sqlx::query(
            "UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1 RETURNING revision_id",
        )
        .bind(timestamp())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("revision_id")?)
    }

    // ==================== LEADS ====================

    async fn list_leads(&self) -> Result<Vec<Lead>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads ORDER BY created_at, rowid"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(lead_from_row).collect()
    }

    async fn get_lead(&self, id: &str) -> Result<Option<Lead>, AppError> {
        let row = sqlx::query(&format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(lead_from_row).transpose()
    }

    async fn put_lead(&self, lead: &Lead) -> Result<(), AppError> {
        let mut conn = self.pool.acquire().await?;
        upsert_lead(&mut conn, lead).await
    }

    async fn remove_lead_cascade(&self, id: &str) -> Result<LeadRemoval, AppError> {
        let mut tx = self.pool.begin().await?;

        let interactions = sqlx::query("DELETE FROM interactions WHERE lead_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let tasks = sqlx::query("DELETE FROM tasks WHERE lead_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let removed = sqlx::query("DELETE FROM leads WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;

        tx.commit().await?;

        Ok(LeadRemoval {
            removed,
            interactions,
            tasks,
        })
    }

    // ==================== TAGS ====================

    async fn list_tags(&self) -> Result<Vec<Tag>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {TAG_COLUMNS} FROM tags ORDER BY created_at, rowid"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(tag_from_row).collect()
    }

    async fn get_tag(&self, id: &str) -> Result<Option<Tag>, AppError> {
        let row = sqlx::query(&format!("SELECT {TAG_COLUMNS} FROM tags WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(tag_from_row).transpose()
    }

    async fn put_tag(&self, tag: &Tag) -> Result<(), AppError> {
        let mut conn = self.pool.acquire().await?;
        upsert_tag(&mut conn, tag).await
    }

    async fn put_tag_with_leads(&self, tag: &Tag, leads: &[Lead]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        upsert_tag(&mut tx, tag).await?;
        for lead in leads {
            upsert_lead(&mut tx, lead).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn remove_tag_cascade(&self, id: &str) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM tags WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if removed == 0 {
            return Ok(0);
        }
        let children = sqlx::query("DELETE FROM tags WHERE parent_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(removed + children)
    }

    // ==================== SOURCES ====================

    async fn list_sources(&self) -> Result<Vec<Source>, AppError> {
        let rows = sqlx::query("SELECT id, name, created_at FROM sources ORDER BY created_at, rowid")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(source_from_row).collect()
    }

    async fn get_source(&self, id: &str) -> Result<Option<Source>, AppError> {
        let row = sqlx::query("SELECT id, name, created_at FROM sources WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(source_from_row).transpose()
    }

    async fn put_source(&self, source: &Source) -> Result<(), AppError> {
        sqlx::query(
            r#"INSERT INTO sources (id, name, created_at) VALUES (?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET name = excluded.name"#,
        )
        .bind(&source.id)
        .bind(&source.name)
        .bind(&source.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove_source(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM sources WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ==================== INTERACTIONS ====================

    async fn list_interactions(
        &self,
        lead_id: Option<&str>,
    ) -> Result<Vec<Interaction>, AppError> {
        let rows = match lead_id {
            Some(lead_id) => {
                sqlx::query(&format!(
                    "SELECT {INTERACTION_COLUMNS} FROM interactions WHERE lead_id = ? ORDER BY created_at, rowid"
                ))
                .bind(lead_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {INTERACTION_COLUMNS} FROM interactions ORDER BY created_at, rowid"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(interaction_from_row).collect()
    }

    async fn put_interaction_with_lead(
        &self,
        interaction: &Interaction,
        lead: &Lead,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        insert_interaction(&mut tx, interaction).await?;
        upsert_lead(&mut tx, lead).await?;

        tx.commit().await?;
        Ok(())
    }

    // ==================== TASKS ====================

    async fn list_tasks(&self, lead_id: Option<&str>) -> Result<Vec<Task>, AppError> {
        let rows = match lead_id {
            Some(lead_id) => {
                sqlx::query(&format!(
                    "SELECT {TASK_COLUMNS} FROM tasks WHERE lead_id = ? ORDER BY created_at, rowid"
                ))
                .bind(lead_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {TASK_COLUMNS} FROM tasks ORDER BY created_at, rowid"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(task_from_row).collect()
    }

    async fn get_task(&self, id: &str) -> Result<Option<Task>, AppError> {
        let row = sqlx::query(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(task_from_row).transpose()
    }

    async fn put_task(&self, task: &Task) -> Result<(), AppError> {
        sqlx::query(&format!(
            r#"INSERT INTO tasks ({TASK_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET
                   deadline = excluded.deadline, priority = excluded.priority,
                   status = excluded.status, assignee = excluded.assignee"#
        ))
        .bind(&task.id)
        .bind(&task.lead_id)
        .bind(&task.lead_name)
        .bind(&task.lead_query)
        .bind(&task.deadline)
        .bind(task.priority.as_str())
        .bind(task.status.as_str())
        .bind(&task.assignee)
        .bind(&task.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove_task(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// Writes shared by single-record and grouped operations

async fn upsert_lead(conn: &mut SqliteConnection, lead: &Lead) -> Result<(), AppError> {
    let custom_json = serde_json::to_string(&lead.tags.custom)?;

    sqlx::query(&format!(
        r#"INSERT INTO leads ({LEAD_COLUMNS})
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
           ON CONFLICT(id) DO UPDATE SET
               name = excluded.name, phone = excluded.phone, email = excluded.email,
               query = excluded.query, status = excluded.status, source = excluded.source,
               follow_up_level = excluded.follow_up_level,
               course_tag_id = excluded.course_tag_id, subject_tag_id = excluded.subject_tag_id,
               term_tag_id = excluded.term_tag_id, faculty_tag_id = excluded.faculty_tag_id,
               custom_tag_ids = excluded.custom_tag_ids, assigned_to = excluded.assigned_to,
               updated_at = excluded.updated_at"#
    ))
    .bind(&lead.id)
    .bind(&lead.name)
    .bind(&lead.phone)
    .bind(&lead.email)
    .bind(&lead.query)
    .bind(lead.status.as_str())
    .bind(&lead.source)
    .bind(lead.follow_up_level.get() as i64)
    .bind(&lead.tags.course)
    .bind(&lead.tags.subject)
    .bind(&lead.tags.term)
    .bind(&lead.tags.faculty)
    .bind(&custom_json)
    .bind(&lead.assigned_to)
    .bind(&lead.created_at)
    .bind(&lead.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn upsert_tag(conn: &mut SqliteConnection, tag: &Tag) -> Result<(), AppError> {
    sqlx::query(&format!(
        r#"INSERT INTO tags ({TAG_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?)
           ON CONFLICT(id) DO UPDATE SET
               name = excluded.name, tag_type = excluded.tag_type,
               parent_id = excluded.parent_id, updated_at = excluded.updated_at"#
    ))
    .bind(&tag.id)
    .bind(&tag.name)
    .bind(tag.tag_type.as_str())
    .bind(&tag.parent_id)
    .bind(&tag.created_at)
    .bind(&tag.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn insert_interaction(
    conn: &mut SqliteConnection,
    interaction: &Interaction,
) -> Result<(), AppError> {
    sqlx::query(&format!(
        r#"INSERT INTO interactions ({INTERACTION_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?)
           ON CONFLICT(id) DO UPDATE SET
               notes = excluded.notes, status = excluded.status,
               follow_up_level = excluded.follow_up_level, author = excluded.author"#
    ))
    .bind(&interaction.id)
    .bind(&interaction.lead_id)
    .bind(&interaction.notes)
    .bind(interaction.status.as_str())
    .bind(interaction.follow_up_level.get() as i64)
    .bind(&interaction.author)
    .bind(&interaction.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// Helper functions for row conversion

fn corrupt(what: &str, value: &str) -> AppError {
    AppError::Database(format!("Stored {} is invalid: {}", what, value))
}

fn status_column(row: &SqliteRow) -> Result<LeadStatus, AppError> {
    let status: String = row.try_get("status")?;
    LeadStatus::parse(&status).ok_or_else(|| corrupt("lead status", &status))
}

fn level_column(row: &SqliteRow) -> Result<FollowUpLevel, AppError> {
    let level: i64 = row.try_get("follow_up_level")?;
    u8::try_from(level)
        .ok()
        .and_then(|l| FollowUpLevel::try_from(l).ok())
        .ok_or_else(|| corrupt("follow-up level", &level.to_string()))
}

fn lead_from_row(row: &SqliteRow) -> Result<Lead, AppError> {
    let custom_json: String = row.try_get("custom_tag_ids")?;

    Ok(Lead {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        phone: row.try_get("phone")?,
        email: row.try_get("email")?,
        query: row.try_get("query")?,
        status: status_column(row)?,
        source: row.try_get("source")?,
        follow_up_level: level_column(row)?,
        tags: TagAssignment {
            course: row.try_get("course_tag_id")?,
            subject: row.try_get("subject_tag_id")?,
            term: row.try_get("term_tag_id")?,
            faculty: row.try_get("faculty_tag_id")?,
            custom: parse_json_array(&custom_json)?,
        },
        assigned_to: row.try_get("assigned_to")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn tag_from_row(row: &SqliteRow) -> Result<Tag, AppError> {
    let tag_type: String = row.try_get("tag_type")?;

    Ok(Tag {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        tag_type: TagType::parse(&tag_type).ok_or_else(|| corrupt("tag type", &tag_type))?,
        parent_id: row.try_get("parent_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn source_from_row(row: &SqliteRow) -> Result<Source, AppError> {
    Ok(Source {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        created_at: row.try_get("created_at")?,
    })
}

fn interaction_from_row(row: &SqliteRow) -> Result<Interaction, AppError> {
    Ok(Interaction {
        id: row.try_get("id")?,
        lead_id: row.try_get("lead_id")?,
        notes: row.try_get("notes")?,
        status: status_column(row)?,
        follow_up_level: level_column(row)?,
        author: row.try_get("author")?,
        created_at: row.try_get("created_at")?,
    })
}

fn task_from_row(row: &SqliteRow) -> Result<Task, AppError> {
    let priority: String = row.try_get("priority")?;
    let status: String = row.try_get("status")?;

    Ok(Task {
        id: row.try_get("id")?,
        lead_id: row.try_get("lead_id")?,
        lead_name: row.try_get("lead_name")?,
        lead_query: row.try_get("lead_query")?,
        deadline: row.try_get("deadline")?,
        priority: TaskPriority::parse(&priority)
            .ok_or_else(|| corrupt("task priority", &priority))?,
        status: TaskStatus::parse(&status).ok_or_else(|| corrupt("task status", &status))?,
        assignee: row.try_get("assignee")?,
        created_at: row.try_get("created_at")?,
    })
}

fn parse_json_array(s: &str) -> Result<Vec<String>, AppError> {
    serde_json::from_str(s).map_err(|_| corrupt("custom_tag_ids", s))
}
