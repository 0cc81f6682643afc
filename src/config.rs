use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_api_base: String,
    pub wiki_api_url: String,
    pub wiki_article_base: String,
    pub wiki_user_agent: String,
    pub quiz_rps: u32,
    pub database_url: String,
    pub quiz: QuizSettings,
}

/// How the resolver picks one article from the re-ranked search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArticlePick {
    Top,
    RandomTopThree,
}

impl FromStr for ArticlePick {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "top" => Ok(ArticlePick::Top),
            "random" => Ok(ArticlePick::RandomTopThree),
            other => Err(format!("expected 'top' or 'random', got '{}'", other)),
        }
    }
}

/// Whether candidates come from one request each or from a single array request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    Parallel,
    Batched,
}

impl FromStr for GenerationMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "parallel" => Ok(GenerationMode::Parallel),
            "batched" => Ok(GenerationMode::Batched),
            other => Err(format!("expected 'parallel' or 'batched', got '{}'", other)),
        }
    }
}

/// Knobs of the quiz pipeline. Handed to each pipeline component at construction.
#[derive(Debug, Clone)]
pub struct QuizSettings {
    pub language: String,
    pub search_limit: usize,
    pub article_pick: ArticlePick,
    pub source_char_limit: usize,
    pub generation_mode: GenerationMode,
    pub target_count: usize,
    pub max_attempts: usize,
    pub request_timeout: Duration,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            language: "English".to_string(),
            search_limit: 5,
            article_pick: ArticlePick::RandomTopThree,
            source_char_limit: 15_000,
            generation_mode: GenerationMode::Parallel,
            target_count: 5,
            max_attempts: 2,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let defaults = QuizSettings::default();
        let quiz = QuizSettings {
            language: get_env_or("QUIZ_LANGUAGE", &defaults.language),
            search_limit: get_env_parse_or("SEARCH_LIMIT", defaults.search_limit)?.clamp(3, 10),
            article_pick: get_env_parse_or("ARTICLE_PICK", defaults.article_pick)?,
            source_char_limit: get_env_parse_or("SOURCE_CHAR_LIMIT", defaults.source_char_limit)?,
            generation_mode: get_env_parse_or("GENERATION_MODE", defaults.generation_mode)?,
            target_count: get_env_parse_or("QUIZ_TARGET_COUNT", defaults.target_count)?.max(1),
            max_attempts: get_env_parse_or("QUIZ_MAX_ATTEMPTS", defaults.max_attempts)?,
            request_timeout: Duration::from_secs(get_env_parse_or("REQUEST_TIMEOUT_SECS", 30u64)?),
        };

        Ok(Self {
            server_address: get_env_or("SERVER_ADDRESS", "0.0.0.0:3000"),
            gemini_api_key: get_env("GEMINI_API_KEY")?,
            gemini_model: get_env_or("GEMINI_MODEL", "gemini-2.5-flash"),
            gemini_api_base: get_env_or(
                "GEMINI_API_BASE",
                "https://generativelanguage.googleapis.com/v1beta",
            ),
            wiki_api_url: get_env_or("WIKI_API_URL", "https://en.wikipedia.org/w/api.php"),
            wiki_article_base: get_env_or("WIKI_ARTICLE_BASE", "https://en.wikipedia.org/wiki/"),
            wiki_user_agent: get_env_or("WIKI_USER_AGENT", "KnowlyQuizBot/1.0"),
            quiz_rps: get_env_parse_or("QUIZ_RPS", 20)?,
            database_url: get_env_or("DATABASE_URL", "sqlite::memory:"),
            quiz,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}
