pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::config::{Config, QuizSettings};
use crate::services::{
    follow_service::FollowService,
    generator_service::CandidateGenerator,
    llm_client::{GeminiClient, TextGenerator},
    progress_service::ProgressService,
    quiz_service::{QuizAssembler, QuizService},
    refine_service::RefineService,
    user_service::UserService,
    validator_service::CandidateValidator,
    wiki_service::{Encyclopedia, SourceResolver, WikipediaClient},
};
use axum::{
    routing::{get, post},
    Router,
};
use reqwest::Client;
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub quiz_service: QuizService,
    pub user_service: UserService,
    pub follow_service: FollowService,
    pub progress_service: ProgressService,
    pub refine_service: RefineService,
}

impl AppState {
    pub fn new(config: &Config, pool: SqlitePool) -> error::Result<Self> {
        // Each external call carries its own timeout; this only bounds a stuck connection.
        let http_client = Client::builder()
            .timeout(config.quiz.request_timeout * 2)
            .build()?;

        let llm: Arc<dyn TextGenerator> = Arc::new(GeminiClient::new(
            http_client.clone(),
            config.gemini_api_key.clone(),
            config.gemini_api_base.clone(),
            config.gemini_model.clone(),
            config.quiz.request_timeout,
        ));
        let encyclopedia: Arc<dyn Encyclopedia> = Arc::new(WikipediaClient::new(
            http_client,
            config.wiki_api_url.clone(),
            config.wiki_article_base.clone(),
            config.wiki_user_agent.clone(),
            config.quiz.request_timeout,
        ));

        Ok(Self::from_parts(
            pool,
            llm,
            encyclopedia,
            config.quiz.clone(),
        ))
    }

    /// Wires the services around already-built external clients.
    pub fn from_parts(
        pool: SqlitePool,
        llm: Arc<dyn TextGenerator>,
        encyclopedia: Arc<dyn Encyclopedia>,
        settings: QuizSettings,
    ) -> Self {
        let progress_service = ProgressService::new(pool.clone());

        let resolver = SourceResolver::new(encyclopedia, settings.search_limit, settings.article_pick);
        let assembler = QuizAssembler::new(
            CandidateGenerator::new(llm.clone(), settings.clone()),
            CandidateValidator::new(llm.clone(), settings.clone()),
            settings.target_count,
            settings.max_attempts,
        );
        let quiz_service = QuizService::new(resolver, assembler, Arc::new(progress_service.clone()));

        Self {
            user_service: UserService::new(pool.clone()),
            follow_service: FollowService::new(pool.clone()),
            refine_service: RefineService::new(llm, settings.language.clone(), settings.request_timeout),
            progress_service,
            quiz_service,
            pool,
        }
    }
}

/// All API routes with state applied. Quiz generation is capped at
/// `quiz_rps` requests per second for each user.
pub fn build_router(state: AppState, quiz_rps: u32) -> Router {
    let quiz_api = Router::new()
        .route("/api/quiz/generate", post(routes::quiz::generate_quiz))
        .layer(axum::middleware::from_fn_with_state(
            middleware::rate_limit::UserRateLimiter::new(quiz_rps),
            middleware::rate_limit::per_user_limit,
        ));

    let user_api = Router::new()
        .route("/api/users/register", post(routes::users::register))
        .route("/api/users/login", post(routes::users::login))
        .route("/api/users/search", get(routes::users::search_users))
        .route(
            "/api/users/:id",
            get(routes::users::get_user).patch(routes::users::update_profile),
        )
        .route("/api/users/:id/following", get(routes::social::get_following))
        .route("/api/users/:id/explore", get(routes::social::explore_interests))
        .route("/api/users/:id/badges", get(routes::progress::get_user_badges))
        .route("/api/follows/toggle", post(routes::social::toggle_follow));

    let progress_api = Router::new()
        .route(
            "/api/progress",
            get(routes::progress::get_topic_progress).post(routes::progress::update_progress),
        )
        .route("/api/interests/refine", post(routes::interests::refine_interest));

    Router::new()
        .route("/health", get(routes::health::health))
        .merge(quiz_api)
        .merge(user_api)
        .merge(progress_api)
        .with_state(state)
}
