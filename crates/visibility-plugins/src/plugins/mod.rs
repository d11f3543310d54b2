pub mod content;
pub mod llm_mentions;
pub mod page_speed;
pub mod premium;
pub mod schema;
pub mod schema_generator;
