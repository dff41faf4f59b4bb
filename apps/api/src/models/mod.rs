pub mod embedding;
pub mod job;
pub mod requirement;
pub mod resume;
pub mod score;
pub mod skill;
pub mod text;
