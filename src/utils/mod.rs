pub mod json_extract;
pub mod shuffle;
pub mod text;
pub mod time;
