//! Client for a document question-answering service.
//!
//! [`session::SessionManager`] owns the bearer credential and its lifecycle;
//! [`conversation::ConversationController`] drives a chat with optimistic updates.
//! Both talk to the service through [`api::DocChatApi`].

pub mod api;
pub mod config;
pub mod conversation;
pub mod error;
pub mod library;
pub mod session;
pub mod storage;
pub mod views;

pub use error::ClientError;
