pub mod chat;
pub mod essence;
pub mod journal;
pub mod mood;
pub mod tasks;
