//! Request/response contract of the document Q&A service.

pub mod auth;
pub mod client;
pub mod types;

#[cfg(test)]
pub mod fake;

use async_trait::async_trait;

use crate::error::ClientError;
pub use auth::{auth_channel, AuthChannel, AuthWriter, Credential};
pub use client::HttpApi;
pub use types::{
    AuthResponse, ChatRequest, ChatResponse, Citation, DocumentInfo, DocumentUpload, HistoryItem,
    LoginRequest, SignupRequest, UserIdentity,
};

/// Operations the client issues against the service.
///
/// Implementations attach the current bearer credential themselves, by reading an
/// [`AuthChannel`] when each request is built. Callers never pass tokens around.
#[async_trait]
pub trait DocChatApi: Send + Sync {
    async fn sign_up(&self, request: &SignupRequest) -> Result<AuthResponse, ClientError>;

    async fn sign_in(&self, request: &LoginRequest) -> Result<AuthResponse, ClientError>;

    /// `GET /auth/me`
    async fn current_user(&self) -> Result<UserIdentity, ClientError>;

    async fn list_documents(&self) -> Result<Vec<DocumentInfo>, ClientError>;

    async fn upload_document(&self, upload: DocumentUpload) -> Result<DocumentInfo, ClientError>;

    async fn delete_document(&self, id: &str) -> Result<(), ClientError>;

    async fn ask(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError>;

    async fn chat_history(&self) -> Result<Vec<HistoryItem>, ClientError>;
}
