pub mod book;
pub mod health;
pub mod narration;
