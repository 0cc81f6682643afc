pub mod fallback_service;
pub mod follow_service;
pub mod generator_service;
pub mod llm_client;
pub mod progress_service;
pub mod quiz_service;
pub mod refine_service;
pub mod user_service;
pub mod validator_service;
pub mod wiki_service;
