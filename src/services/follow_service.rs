use crate::error::{Error, Result};
use crate::models::follow::Follow;
use crate::models::user::UserSummary;
use crate::utils::time::now;
use rand::seq::SliceRandom;
use sqlx::types::Json;
use sqlx::SqlitePool;
use std::collections::HashSet;

pub const MAX_EXPLORE_INTERESTS: usize = 10;

#[derive(Clone)]
pub struct FollowService {
    pool: SqlitePool,
}

impl FollowService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Flips the follow edge and returns whether `follower_id` now follows.
    pub async fn toggle_follow(&self, follower_id: &str, following_id: &str) -> Result<bool> {
        let follower_id = follower_id.trim();
        let following_id = following_id.trim();
        if follower_id.is_empty() || following_id.is_empty() {
            return Err(Error::BadRequest("Missing IDs".to_string()));
        }
        if follower_id == following_id {
            return Err(Error::BadRequest("Users cannot follow themselves".to_string()));
        }

        let mut tx = self.pool.begin().await?;
        let removed = sqlx::query("DELETE FROM follows WHERE follower_id = ? AND following_id = ?")
            .bind(follower_id)
            .bind(following_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let is_following = removed == 0;
        if is_following {
            let edge = Follow {
                follower_id: follower_id.to_string(),
                following_id: following_id.to_string(),
                created_at: now(),
            };
            sqlx::query("INSERT INTO follows (follower_id, following_id, created_at) VALUES (?, ?, ?)")
                .bind(&edge.follower_id)
                .bind(&edge.following_id)
                .bind(edge.created_at)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        tracing::info!(follower_id, following_id, is_following, "Follow toggled");
        Ok(is_following)
    }

    pub async fn get_following(&self, user_id: &str) -> Result<Vec<UserSummary>> {
        let users = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT u.user_id, u.nickname, u.avatar_url, 1 AS is_following
            FROM follows f
            JOIN users u ON u.user_id = f.following_id
            WHERE f.follower_id = ?
            ORDER BY f.created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    /// Topic bubbles: the interests of everyone `user_id` follows, deduplicated
    /// and shuffled.
    pub async fn explore_interests(&self, user_id: &str) -> Result<Vec<String>> {
        let lists: Vec<Json<Vec<String>>> = sqlx::query_scalar(
            r#"
            SELECT u.interests
            FROM follows f
            JOIN users u ON u.user_id = f.following_id
            WHERE f.follower_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut seen = HashSet::new();
        let mut interests: Vec<String> = lists
            .into_iter()
            .flat_map(|list| list.0)
            .filter(|i| seen.insert(i.clone()))
            .collect();

        interests.shuffle(&mut rand::thread_rng());
        interests.truncate(MAX_EXPLORE_INTERESTS);
        Ok(interests)
    }
}
