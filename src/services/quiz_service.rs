use crate::dto::quiz_dto::QuizResponse;
use crate::models::quiz::{AcceptedQuestion, QuestionCandidate, SourceDocument};
use crate::services::fallback_service::synthesize_questions;
use crate::services::generator_service::CandidateGenerator;
use crate::services::validator_service::CandidateValidator;
use crate::services::wiki_service::SourceResolver;
use crate::utils::shuffle::shuffle_answers;
use async_trait::async_trait;
use std::sync::Arc;

pub const DEFAULT_TOPIC: &str = "General Knowledge";

/// Previously asked question texts for a (user, topic) pair.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuestionHistory: Send + Sync {
    async fn prior_questions(&self, user_id: &str, topic: &str) -> Vec<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyState {
    Accumulating,
    Done,
    Exhausted,
}

/// Per-request counters of the assembly loop. Never outlives one request.
#[derive(Debug, Clone)]
pub struct GenerationAttemptState {
    pub target_count: usize,
    pub accepted: Vec<AcceptedQuestion>,
    pub attempts: usize,
    pub max_attempts: usize,
}

impl GenerationAttemptState {
    pub fn new(target_count: usize, max_attempts: usize) -> Self {
        Self {
            target_count,
            accepted: Vec::with_capacity(target_count),
            attempts: 0,
            max_attempts,
        }
    }

    pub fn state(&self) -> AssemblyState {
        if self.accepted.len() >= self.target_count {
            AssemblyState::Done
        } else if self.attempts >= self.max_attempts {
            AssemblyState::Exhausted
        } else {
            AssemblyState::Accumulating
        }
    }

    pub fn needed(&self) -> usize {
        self.target_count.saturating_sub(self.accepted.len())
    }

    pub fn contains(&self, question: &str) -> bool {
        self.accepted.iter().any(|q| q.question == question)
    }

    /// Shuffles and appends `candidate` unless the set is full or already
    /// holds the same question text.
    pub fn push(&mut self, candidate: &QuestionCandidate) -> bool {
        if self.needed() == 0 || self.contains(&candidate.question) {
            return false;
        }
        self.accepted.push(shuffle_answers(candidate));
        true
    }

    fn extend<'a>(&mut self, candidates: impl IntoIterator<Item = &'a QuestionCandidate>) -> usize {
        candidates.into_iter().filter(|q| self.push(q)).count()
    }
}

/// Drives generation and validation until the target count is reached,
/// degrading through backfill, ungated regeneration and synthetic questions.
#[derive(Clone)]
pub struct QuizAssembler {
    generator: CandidateGenerator,
    validator: CandidateValidator,
    target_count: usize,
    max_attempts: usize,
}

impl QuizAssembler {
    pub fn new(
        generator: CandidateGenerator,
        validator: CandidateValidator,
        target_count: usize,
        max_attempts: usize,
    ) -> Self {
        Self {
            generator,
            validator,
            target_count,
            max_attempts,
        }
    }

    /// Never returns an empty set for a non-empty target.
    pub async fn assemble(
        &self,
        source: &SourceDocument,
        topic: &str,
        difficulty: u8,
        exclusions: &[String],
    ) -> Vec<AcceptedQuestion> {
        let mut state = GenerationAttemptState::new(self.target_count, self.max_attempts);

        while state.state() == AssemblyState::Accumulating {
            state.attempts += 1;
            let needed = state.needed();
            tracing::info!(
                topic,
                attempt = state.attempts,
                needed,
                requesting = needed + 2,
                "Assembling quiz"
            );

            let batch = self
                .generator
                .generate(source, topic, difficulty, exclusions, needed + 2)
                .await;
            if batch.is_empty() {
                tracing::warn!(topic, attempt = state.attempts, "Generator returned no candidates");
                continue;
            }

            let validated = self.validator.validate(batch.clone(), source).await;
            let added = state.extend(&validated);
            tracing::info!(
                topic,
                attempt = state.attempts,
                validated = validated.len(),
                added,
                "Validated candidates added"
            );

            if state.needed() > 0 {
                let backfilled = state.extend(&batch);
                if backfilled > 0 {
                    tracing::warn!(
                        topic,
                        attempt = state.attempts,
                        backfilled,
                        "Validation filtered too many, backfilling with unvalidated candidates"
                    );
                }
            }
        }

        if state.accepted.is_empty() && self.target_count > 0 {
            tracing::warn!(topic, "No questions after all attempts, trying ungated generation");
            let batch = self
                .generator
                .generate(source, topic, difficulty, exclusions, self.target_count)
                .await;
            state.extend(&batch);
        }

        if state.accepted.is_empty() && self.target_count > 0 {
            tracing::warn!(topic, article = %source.title, "Generation failed entirely, using synthetic questions");
            let synthetic = synthesize_questions(source, self.target_count);
            state.extend(&synthetic);
        }

        tracing::info!(
            topic,
            questions = state.accepted.len(),
            attempts = state.attempts,
            outcome = ?state.state(),
            "Quiz assembled"
        );
        state.accepted
    }
}

/// Entry point callers use: resolve the source, look up history, assemble.
#[derive(Clone)]
pub struct QuizService {
    resolver: SourceResolver,
    assembler: QuizAssembler,
    history: Arc<dyn QuestionHistory>,
}

impl QuizService {
    pub fn new(
        resolver: SourceResolver,
        assembler: QuizAssembler,
        history: Arc<dyn QuestionHistory>,
    ) -> Self {
        Self {
            resolver,
            assembler,
            history,
        }
    }

    pub async fn generate_quiz(&self, user_id: &str, topic: &str, difficulty: u8) -> QuizResponse {
        let topic = match topic.trim() {
            "" => DEFAULT_TOPIC,
            t => t,
        };
        let difficulty = difficulty.clamp(1, 10);

        let exclusions = self.history.prior_questions(user_id, topic).await;
        tracing::info!(user_id, topic, difficulty, excluded = exclusions.len(), "Quiz requested");

        let source = match self.resolver.resolve(topic).await {
            Ok(source) => source,
            Err(e) => {
                tracing::warn!(topic, error = %e, "Could not resolve a source document");
                return QuizResponse::Error {
                    message: e.to_string(),
                };
            }
        };

        let questions = self
            .assembler
            .assemble(&source, topic, difficulty, &exclusions)
            .await;

        if questions.is_empty() {
            return QuizResponse::Error {
                message: "Failed to generate valid questions after checks.".to_string(),
            };
        }

        QuizResponse::Success {
            topic: topic.to_string(),
            level: difficulty,
            source_title: source.title,
            questions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ArticlePick, QuizSettings};
    use crate::error::{Error, Result};
    use crate::models::quiz::{OptionCandidate, SearchHit};
    use crate::services::llm_client::TextGenerator;
    use crate::services::wiki_service::MockEncyclopedia;

    struct Offline;

    #[async_trait]
    impl TextGenerator for Offline {
        async fn generate(&self, _p: &str, _t: f32, _j: bool) -> Result<String> {
            Err(Error::Upstream("offline".into()))
        }
    }

    fn candidate(question: &str) -> QuestionCandidate {
        QuestionCandidate {
            question: question.to_string(),
            options: vec![
                OptionCandidate { text: "Right".into(), is_correct: true },
                OptionCandidate { text: "Wrong".into(), is_correct: false },
            ],
            explanation: String::new(),
            citation: String::new(),
        }
    }

    fn source() -> SourceDocument {
        SourceDocument {
            title: "Astronomy".into(),
            content: "Astronomy is a natural science that studies celestial objects.".into(),
            url: "https://en.wikipedia.org/wiki/Astronomy".into(),
        }
    }

    fn offline_assembler() -> QuizAssembler {
        let llm: Arc<dyn TextGenerator> = Arc::new(Offline);
        let settings = QuizSettings::default();
        QuizAssembler::new(
            CandidateGenerator::new(llm.clone(), settings.clone()),
            CandidateValidator::new(llm, settings),
            5,
            2,
        )
    }

    #[test]
    fn state_transitions() {
        let mut state = GenerationAttemptState::new(2, 2);
        assert_eq!(state.state(), AssemblyState::Accumulating);
        state.attempts = 2;
        assert_eq!(state.state(), AssemblyState::Exhausted);
        assert!(state.push(&candidate("a?")));
        assert!(state.push(&candidate("b?")));
        assert_eq!(state.state(), AssemblyState::Done);
    }

    #[test]
    fn push_deduplicates_and_respects_target() {
        let mut state = GenerationAttemptState::new(2, 2);
        assert!(state.push(&candidate("a?")));
        assert!(!state.push(&candidate("a?")));
        assert!(state.push(&candidate("b?")));
        assert!(!state.push(&candidate("c?")));
        assert_eq!(state.accepted.len(), 2);
    }

    #[tokio::test]
    async fn offline_model_falls_back_to_synthetic_questions() {
        let questions = offline_assembler()
            .assemble(&source(), "Astronomy", 3, &[])
            .await;
        assert!(!questions.is_empty());
        assert!(questions.len() <= 5);
        for q in &questions {
            assert!(q.correct_index < q.options.len());
        }
    }

    #[tokio::test]
    async fn history_is_passed_and_resolution_failure_is_reported() {
        let mut history = MockQuestionHistory::new();
        history
            .expect_prior_questions()
            .withf(|user, topic| user == "u_1" && topic == "Nothingness")
            .times(1)
            .returning(|_, _| vec!["Old question?".to_string()]);

        let mut wiki = MockEncyclopedia::new();
        wiki.expect_search().returning(|_, _| Ok(Vec::<SearchHit>::new()));

        let service = QuizService::new(
            SourceResolver::new(Arc::new(wiki), 5, ArticlePick::Top),
            offline_assembler(),
            Arc::new(history),
        );
        let response = service.generate_quiz("u_1", "  Nothingness ", 4).await;
        match response {
            QuizResponse::Error { message } => assert!(message.contains("Nothingness")),
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn blank_topic_uses_default() {
        let mut history = MockQuestionHistory::new();
        history.expect_prior_questions().returning(|_, _| Vec::new());

        let mut wiki = MockEncyclopedia::new();
        wiki.expect_search()
            .withf(|query, _| query == DEFAULT_TOPIC)
            .returning(|_, _| {
                Ok(vec![SearchHit {
                    title: "General knowledge".into(),
                    snippet: String::new(),
                }])
            });
        wiki.expect_extract().returning(|_| {
            Ok(Some(SourceDocument {
                title: "General knowledge".into(),
                content: "General knowledge is information accumulated over time.".into(),
                url: "https://en.wikipedia.org/wiki/General_knowledge".into(),
            }))
        });

        let service = QuizService::new(
            SourceResolver::new(Arc::new(wiki), 5, ArticlePick::Top),
            offline_assembler(),
            Arc::new(history),
        );
        match service.generate_quiz("u_1", "   ", 0).await {
            QuizResponse::Success { topic, level, questions, .. } => {
                assert_eq!(topic, DEFAULT_TOPIC);
                assert_eq!(level, 1);
                assert!(!questions.is_empty());
            }
            other => panic!("expected success, got {:?}", other),
        }
    }
}
