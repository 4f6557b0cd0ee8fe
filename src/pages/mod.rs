pub mod chat;
pub mod graph;
pub mod not_found;
