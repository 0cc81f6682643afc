use crate::dto::progress_dto::{ProgressUpdate, UpdateProgressPayload};
use crate::error::Result;
use crate::models::progress::{Badge, HistoryEntry, TopicProgress, MAX_LEVEL, PERFECT_SCORE};
use crate::services::quiz_service::QuestionHistory;
use crate::utils::time::now;
use async_trait::async_trait;
use sqlx::{SqliteConnection, SqlitePool};

#[derive(Clone)]
pub struct ProgressService {
    pool: SqlitePool,
}

impl ProgressService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Highest unlocked level for the topic, 1 when nothing is recorded.
    pub async fn get_topic_progress(&self, user_id: &str, topic: &str) -> Result<u32> {
        let level = sqlx::query_scalar::<_, u32>(
            "SELECT max_level FROM progress WHERE user_id = ? AND topic = ?",
        )
        .bind(user_id)
        .bind(topic.trim())
        .fetch_optional(&self.pool)
        .await?;
        Ok(level.unwrap_or(1))
    }

    /// Records answered questions, then applies the unlock and badge rules.
    /// Everything lands in one transaction.
    pub async fn update_progress(&self, payload: UpdateProgressPayload) -> Result<ProgressUpdate> {
        let user_id = payload.user_id.trim().to_string();
        let topic = payload.topic.trim().to_string();

        let answered: Vec<HistoryEntry> = payload
            .answered_questions
            .into_iter()
            .filter(|q| !q.trim().is_empty())
            .map(|question_text| HistoryEntry {
                user_id: user_id.clone(),
                topic: topic.clone(),
                question_text,
                created_at: now(),
            })
            .collect();

        let mut tx = self.pool.begin().await?;
        for entry in &answered {
            sqlx::query(
                "INSERT INTO history (user_id, topic, question_text, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(&entry.user_id)
            .bind(&entry.topic)
            .bind(&entry.question_text)
            .bind(entry.created_at)
            .execute(&mut *tx)
            .await?;
        }

        let mut update = ProgressUpdate {
            unlocked: false,
            new_max_level: None,
            badge_awarded: false,
        };
        if payload.score >= PERFECT_SCORE {
            if payload.level == MAX_LEVEL && payload.score == PERFECT_SCORE {
                update.badge_awarded = award_badge(&mut *tx, &user_id, &topic).await?;
            }
            update.new_max_level = unlock_next_level(&mut *tx, &user_id, &topic, payload.level).await?;
            update.unlocked = update.new_max_level.is_some();
        }
        tx.commit().await?;

        if !answered.is_empty() {
            tracing::debug!(user_id = %user_id, topic = %topic, recorded = answered.len(), "Recorded answered questions");
        }
        if let Some(level) = update.new_max_level {
            tracing::info!(user_id = %user_id, topic = %topic, level, "Level unlocked");
        }
        if update.badge_awarded {
            tracing::info!(user_id = %user_id, topic = %topic, "Badge awarded");
        }
        Ok(update)
    }

    pub async fn get_user_badges(&self, user_id: &str) -> Result<Vec<Badge>> {
        let badges = sqlx::query_as::<_, Badge>(
            "SELECT * FROM badges WHERE user_id = ? ORDER BY awarded_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(badges)
    }
}

/// Awards the topic badge unless the user already holds it.
async fn award_badge(conn: &mut SqliteConnection, user_id: &str, topic: &str) -> Result<bool> {
    let inserted = sqlx::query(
        "INSERT OR IGNORE INTO badges (user_id, topic, awarded_at) VALUES (?, ?, ?)",
    )
    .bind(user_id)
    .bind(topic)
    .bind(now())
    .execute(conn)
    .await?
    .rows_affected();
    Ok(inserted == 1)
}

/// Advances the topic by one level when `level` is the current maximum.
async fn unlock_next_level(
    conn: &mut SqliteConnection,
    user_id: &str,
    topic: &str,
    level: u32,
) -> Result<Option<u32>> {
    let current = sqlx::query_as::<_, TopicProgress>(
        "SELECT * FROM progress WHERE user_id = ? AND topic = ?",
    )
    .bind(user_id)
    .bind(topic)
    .fetch_optional(&mut *conn)
    .await?
    .map(|p| p.max_level)
    .unwrap_or(1);
    if level != current || current >= MAX_LEVEL {
        return Ok(None);
    }

    let next = TopicProgress {
        user_id: user_id.to_string(),
        topic: topic.to_string(),
        max_level: current + 1,
        updated_at: now(),
    };
    sqlx::query(
        r#"
        INSERT INTO progress (user_id, topic, max_level, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT (user_id, topic)
        DO UPDATE SET max_level = excluded.max_level, updated_at = excluded.updated_at
        "#,
    )
    .bind(&next.user_id)
    .bind(&next.topic)
    .bind(next.max_level)
    .bind(next.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(Some(next.max_level))
}

#[async_trait]
impl QuestionHistory for ProgressService {
    async fn prior_questions(&self, user_id: &str, topic: &str) -> Vec<String> {
        let rows = sqlx::query_scalar::<_, String>(
            "SELECT question_text FROM history WHERE user_id = ? AND trim(topic) = ? ORDER BY id",
        )
        .bind(user_id)
        .bind(topic.trim())
        .fetch_all(&self.pool)
        .await;
        match rows {
            Ok(questions) => questions,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Could not read question history");
                Vec::new()
            }
        }
    }
}
