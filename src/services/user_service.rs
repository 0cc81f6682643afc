use crate::database::is_unique_violation;
use crate::dto::user_dto::{ProfileResponse, RegisterPayload, UpdateProfilePayload};
use crate::error::{Error, Result};
use crate::models::user::{User, UserSummary};
use crate::utils::time::now;
use sqlx::types::Json;
use sqlx::SqlitePool;
use std::collections::HashSet;
use uuid::Uuid;

const NICKNAME_TAKEN: &str = "This nickname is already taken.";

#[derive(Clone)]
pub struct UserService {
    pool: SqlitePool,
}

impl From<User> for ProfileResponse {
    fn from(user: User) -> Self {
        Self {
            user_id: user.user_id,
            nickname: user.nickname,
            interests: user.interests.0,
            avatar_url: user.avatar_url,
        }
    }
}

fn clean_interests(interests: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    interests
        .into_iter()
        .map(|i| i.trim().to_string())
        .filter(|i| !i.is_empty() && seen.insert(i.clone()))
        .collect()
}

fn clean_nickname(nickname: &str) -> Result<String> {
    let nickname = nickname.trim();
    if nickname.is_empty() {
        return Err(Error::BadRequest("Nickname must not be blank".to_string()));
    }
    Ok(nickname.to_string())
}

fn nickname_conflict(err: sqlx::Error) -> Error {
    if is_unique_violation(&err) {
        Error::Conflict(NICKNAME_TAKEN.to_string())
    } else {
        err.into()
    }
}

impl UserService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn register(&self, payload: RegisterPayload) -> Result<ProfileResponse> {
        let user = User {
            user_id: format!("u_{}", Uuid::new_v4()),
            nickname: clean_nickname(&payload.nickname)?,
            password: payload.password,
            interests: Json(clean_interests(payload.interests)),
            avatar_url: payload.avatar_url.unwrap_or_default(),
            created_at: now(),
        };

        sqlx::query(
            r#"
            INSERT INTO users (user_id, nickname, password, interests, avatar_url, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.user_id)
        .bind(&user.nickname)
        .bind(&user.password)
        .bind(&user.interests)
        .bind(&user.avatar_url)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(nickname_conflict)?;

        tracing::info!(user_id = %user.user_id, "Registered user");
        Ok(user.into())
    }

    pub async fn login(&self, nickname: &str, password: &str) -> Result<ProfileResponse> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE nickname = ? AND trim(password) = ?")
            .bind(nickname.trim())
            .bind(password.trim())
            .fetch_optional(&self.pool)
            .await?
            .map(ProfileResponse::from)
            .ok_or_else(|| Error::Unauthorized("User not found or incorrect password".to_string()))
    }

    pub async fn get_user(&self, user_id: &str) -> Result<ProfileResponse> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .map(ProfileResponse::from)
            .ok_or_else(|| Error::NotFound("User not found".to_string()))
    }

    pub async fn update_profile(
        &self,
        user_id: &str,
        payload: UpdateProfilePayload,
    ) -> Result<ProfileResponse> {
        let nickname = payload.nickname.as_deref().map(clean_nickname).transpose()?;

        let mut tx = self.pool.begin().await?;
        let mut user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".to_string()))?;

        if let Some(nick) = nickname {
            user.nickname = nick;
        }
        if let Some(interests) = payload.interests {
            user.interests = Json(clean_interests(interests));
        }
        if let Some(url) = payload.avatar_url {
            user.avatar_url = url;
        }

        sqlx::query("UPDATE users SET nickname = ?, interests = ?, avatar_url = ? WHERE user_id = ?")
            .bind(&user.nickname)
            .bind(&user.interests)
            .bind(&user.avatar_url)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(nickname_conflict)?;
        tx.commit().await?;

        Ok(user.into())
    }

    /// Case-insensitive nickname search, excluding the caller.
    pub async fn search_users(&self, current_user_id: &str, query: &str) -> Result<Vec<UserSummary>> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let users = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT u.user_id, u.nickname, u.avatar_url,
                   EXISTS (
                       SELECT 1 FROM follows f
                       WHERE f.follower_id = ? AND f.following_id = u.user_id
                   ) AS is_following
            FROM users u
            WHERE u.user_id != ? AND instr(lower(u.nickname), ?) > 0
            ORDER BY u.rowid
            "#,
        )
        .bind(current_user_id)
        .bind(current_user_id)
        .bind(&query)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }
}
