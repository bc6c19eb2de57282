pub mod chat_stream;
pub mod classify;
pub mod config;
pub mod frames;
pub mod render;
pub mod sanitize;
pub mod stream;
