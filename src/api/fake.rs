//! In-memory stand-in for the service, used by unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{
    AuthChannel, AuthResponse, ChatRequest, ChatResponse, DocChatApi, DocumentInfo,
    DocumentUpload, HistoryItem, LoginRequest, SignupRequest, UserIdentity,
};
use crate::error::ClientError;

/// A call as the service saw it, including the bearer token that was attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub endpoint: &'static str,
    pub bearer: Option<String>,
}

#[derive(Default)]
struct Scripted {
    auth: Option<Result<AuthResponse, ClientError>>,
    me: Option<Result<UserIdentity, ClientError>>,
    documents: Option<Result<Vec<DocumentInfo>, ClientError>>,
    upload: Option<Result<DocumentInfo, ClientError>>,
    delete: Option<Result<(), ClientError>>,
    answers: VecDeque<Result<ChatResponse, ClientError>>,
    history: Option<Result<Vec<HistoryItem>, ClientError>>,
    calls: Vec<RecordedCall>,
    questions: Vec<ChatRequest>,
    uploads: Vec<String>,
}

pub struct FakeApi {
    auth: AuthChannel,
    scripted: Mutex<Scripted>,
}

fn unscripted<T>() -> Result<T, ClientError> {
    Err(ClientError::transport("no response scripted"))
}

impl FakeApi {
    pub fn new(auth: AuthChannel) -> Self {
        Self {
            auth,
            scripted: Mutex::new(Scripted::default()),
        }
    }

    pub fn user(id: &str, email: &str, full_name: &str) -> UserIdentity {
        UserIdentity {
            id: id.to_string(),
            email: email.to_string(),
            full_name: Some(full_name.to_string()),
            role: Some("user".to_string()),
        }
    }

    pub fn document(id: &str, filename: &str) -> DocumentInfo {
        DocumentInfo {
            id: id.to_string(),
            filename: filename.to_string(),
            file_type: Some("application/pdf".to_string()),
            file_size: 1024,
            chunk_count: 3,
            uploaded_at: "2024-05-01T10:00:00+00:00".to_string(),
        }
    }

    pub fn on_auth(&self, result: Result<AuthResponse, ClientError>) {
        self.scripted.lock().unwrap().auth = Some(result);
    }

    pub fn on_me(&self, result: Result<UserIdentity, ClientError>) {
        self.scripted.lock().unwrap().me = Some(result);
    }

    pub fn on_documents(&self, result: Result<Vec<DocumentInfo>, ClientError>) {
        self.scripted.lock().unwrap().documents = Some(result);
    }

    pub fn on_upload(&self, result: Result<DocumentInfo, ClientError>) {
        self.scripted.lock().unwrap().upload = Some(result);
    }

    pub fn on_delete(&self, result: Result<(), ClientError>) {
        self.scripted.lock().unwrap().delete = Some(result);
    }

    /// Queue the response for the next `ask`.
    pub fn push_answer(&self, result: Result<ChatResponse, ClientError>) {
        self.scripted.lock().unwrap().answers.push_back(result);
    }

    pub fn on_history(&self, result: Result<Vec<HistoryItem>, ClientError>) {
        self.scripted.lock().unwrap().history = Some(result);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.scripted.lock().unwrap().calls.clone()
    }

    pub fn calls_to(&self, endpoint: &str) -> usize {
        self.calls().iter().filter(|c| c.endpoint == endpoint).count()
    }

    pub fn questions(&self) -> Vec<ChatRequest> {
        self.scripted.lock().unwrap().questions.clone()
    }

    pub fn uploads(&self) -> Vec<String> {
        self.scripted.lock().unwrap().uploads.clone()
    }

    fn record(&self, endpoint: &'static str) -> std::sync::MutexGuard<'_, Scripted> {
        let bearer = self.auth.bearer();
        let mut scripted = self.scripted.lock().unwrap();
        scripted.calls.push(RecordedCall { endpoint, bearer });
        scripted
    }
}

#[async_trait]
impl DocChatApi for FakeApi {
    async fn sign_up(&self, _request: &SignupRequest) -> Result<AuthResponse, ClientError> {
        self.record("signup").auth.clone().unwrap_or_else(unscripted)
    }

    async fn sign_in(&self, _request: &LoginRequest) -> Result<AuthResponse, ClientError> {
        self.record("login").auth.clone().unwrap_or_else(unscripted)
    }

    async fn current_user(&self) -> Result<UserIdentity, ClientError> {
        self.record("me").me.clone().unwrap_or_else(unscripted)
    }

    async fn list_documents(&self) -> Result<Vec<DocumentInfo>, ClientError> {
        self.record("documents").documents.clone().unwrap_or_else(unscripted)
    }

    async fn upload_document(&self, upload: DocumentUpload) -> Result<DocumentInfo, ClientError> {
        let mut scripted = self.record("upload");
        scripted.uploads.push(upload.filename);
        scripted.upload.clone().unwrap_or_else(unscripted)
    }

    async fn delete_document(&self, _id: &str) -> Result<(), ClientError> {
        self.record("delete").delete.clone().unwrap_or_else(unscripted)
    }

    async fn ask(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError> {
        let mut scripted = self.record("chat");
        scripted.questions.push(request.clone());
        scripted.answers.pop_front().unwrap_or_else(unscripted)
    }

    async fn chat_history(&self) -> Result<Vec<HistoryItem>, ClientError> {
        self.record("history").history.clone().unwrap_or_else(unscripted)
    }
}
