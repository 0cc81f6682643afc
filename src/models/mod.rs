pub mod follow;
pub mod progress;
pub mod quiz;
pub mod user;
