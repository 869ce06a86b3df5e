pub mod auth;
pub mod chat;
pub mod clients;
pub mod dashboard;
pub mod notifications;
