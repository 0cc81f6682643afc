pub mod progress_dto;
pub mod quiz_dto;
pub mod user_dto;
