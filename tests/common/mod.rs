#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use quiz_backend::config::{ArticlePick, QuizSettings};
use quiz_backend::error::{Error, Result};
use quiz_backend::models::quiz::{SearchHit, SourceDocument};
use quiz_backend::services::llm_client::TextGenerator;
use quiz_backend::services::wiki_service::Encyclopedia;
use serde_json::json;
use sqlx::SqlitePool;
use std::time::Duration;

/// Stand-in for the text-generation service. Generation prompts get a fresh
/// numbered question each call; verification prompts are answered from the
/// question text they carry.
#[derive(Default)]
pub struct ScriptedModel {
    /// Every n-th generated question is one the checkers reject.
    pub doubtful_every: Option<usize>,
    /// Every n-th generated question has a single option.
    pub malformed_every: Option<usize>,
    pub checks_fail: bool,
    pub generation_fails: bool,
    counter: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn honest() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn doubtful_every(k: usize) -> Arc<Self> {
        Arc::new(Self {
            doubtful_every: Some(k),
            ..Self::default()
        })
    }

    pub fn malformed_every(k: usize) -> Arc<Self> {
        Arc::new(Self {
            malformed_every: Some(k),
            ..Self::default()
        })
    }

    pub fn failing_checks() -> Arc<Self> {
        Arc::new(Self {
            checks_fail: true,
            ..Self::default()
        })
    }

    pub fn failing_generation() -> Arc<Self> {
        Arc::new(Self {
            generation_fails: true,
            ..Self::default()
        })
    }

    pub fn generation_prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.starts_with("You are a professional quiz creator"))
            .cloned()
            .collect()
    }

    fn next_question(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        if self.malformed_every.map_or(false, |k| n % k == 0) {
            return json!({
                "question": format!("Broken question {}?", n),
                "options": [{ "text": "Only", "is_correct": true }],
            })
            .to_string();
        }
        let stem = if self.doubtful_every.map_or(false, |k| n % k == 0) {
            format!("Doubtful claim {} about the sky?", n)
        } else {
            format!("Which fact number {} about astronomy is true?", n)
        };
        let body = json!({
            "question": stem,
            "options": [
                { "text": format!("Right {}", n), "is_correct": true },
                { "text": format!("Wrong A {}", n), "is_correct": false },
                { "text": format!("Wrong B {}", n), "is_correct": false },
                { "text": format!("Wrong C {}", n), "is_correct": false },
            ],
            "explanation": format!("Fact {} is stated in the article (Source: https://example.org/x) https://example.org/y", n),
        });
        format!("```json\n{}\n```", body)
    }

    fn check_reply(prompt: &str) -> String {
        let doubtful = prompt
            .lines()
            .find_map(|l| l.strip_prefix("Question: "))
            .map_or(false, |q| q.starts_with("Doubtful"));
        if prompt.starts_with("Verify this question") {
            json!({ "confident": !doubtful, "reason": "checked" }).to_string()
        } else if prompt.starts_with("You are a strict quiz editor") {
            json!({ "pass": !doubtful, "reason": "checked" }).to_string()
        } else if doubtful {
            json!({ "predicted_answer": "Wrong A" }).to_string()
        } else {
            json!({ "predicted_answer": "Right" }).to_string()
        }
    }
}

#[async_trait]
impl TextGenerator for ScriptedModel {
    async fn generate(&self, prompt: &str, _temperature: f32, _force_json: bool) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        if prompt.starts_with("You are a professional quiz creator") {
            if self.generation_fails {
                return Err(Error::Upstream("generation offline".into()));
            }
            return Ok(self.next_question());
        }
        if prompt.starts_with("You help users of a quiz app") {
            if prompt.contains("last reply") {
                return Ok(json!({ "status": "specific", "question": null, "refined_topic": "Black holes" }).to_string());
            }
            return Ok(json!({ "status": "broad", "question": "Which part of astronomy? (e.g. planets, stars)", "refined_topic": null }).to_string());
        }
        if self.checks_fail {
            return Err(Error::Upstream("validation offline".into()));
        }
        Ok(Self::check_reply(prompt))
    }
}

/// Encyclopedia over a fixed set of articles; search is a case-insensitive
/// title/content match.
pub struct FakeEncyclopedia {
    pub articles: Vec<SourceDocument>,
}

impl FakeEncyclopedia {
    pub fn astronomy() -> Arc<Self> {
        Arc::new(Self {
            articles: vec![astronomy_article()],
        })
    }
}

#[async_trait]
impl Encyclopedia for FakeEncyclopedia {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let query = query.to_lowercase();
        Ok(self
            .articles
            .iter()
            .filter(|a| a.title.to_lowercase().contains(&query) || a.content.to_lowercase().contains(&query))
            .take(limit)
            .map(|a| SearchHit {
                title: a.title.clone(),
                snippet: a.content.chars().take(60).collect(),
            })
            .collect())
    }

    async fn extract(&self, title: &str) -> Result<Option<SourceDocument>> {
        Ok(self.articles.iter().find(|a| a.title == title).cloned())
    }
}

pub fn astronomy_article() -> SourceDocument {
    SourceDocument {
        title: "Astronomy".into(),
        content: "Astronomy is a natural science that studies celestial objects and the phenomena that occur in the cosmos. \
                  It uses mathematics, physics and chemistry to explain their origin and their overall evolution. \
                  Objects of interest include planets, moons, stars, nebulae, galaxies, meteoroids, asteroids, and comets."
            .into(),
        url: "https://en.wikipedia.org/wiki/Astronomy".into(),
    }
}

pub fn test_settings() -> QuizSettings {
    QuizSettings {
        article_pick: ArticlePick::Top,
        request_timeout: Duration::from_secs(5),
        ..QuizSettings::default()
    }
}

/// A fresh, migrated in-memory database.
pub async fn memory_pool() -> SqlitePool {
    quiz_backend::database::create_pool("sqlite::memory:")
        .await
        .unwrap()
}
