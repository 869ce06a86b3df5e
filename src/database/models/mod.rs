pub mod chat;
pub mod client;
pub mod notification;
pub mod staff;
pub mod token;
