pub mod auth_service;
pub mod chat_service;
pub mod config;
pub mod constants;
pub mod credentials;
pub mod event_line;
pub mod request;
pub mod stream_consumer;
