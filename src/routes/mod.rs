pub mod health;
pub mod interests;
pub mod progress;
pub mod quiz;
pub mod social;
pub mod users;
