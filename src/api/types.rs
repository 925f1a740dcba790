use serde::{Deserialize, Serialize};

/// Body of `POST /auth/signup`
#[derive(Debug, Clone, Serialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

/// Body of `POST /auth/login`
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserIdentity,
}

/// Identity of the signed-in user, as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl UserIdentity {
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub file_type: Option<String>,
    pub file_size: u64,
    pub chunk_count: u32,
    pub uploaded_at: String,
}

/// A file ready to be sent to `POST /documents/upload`
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub filename: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Body of `POST /chat`.
///
/// `document_ids` is always serialized, `null` meaning "search every document".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub question: String,
    pub document_ids: Option<Vec<String>>,
}

impl ChatRequest {
    pub fn all_documents(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            document_ids: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<Citation>,
}

/// Pointer back to the source material behind an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub document: String,
    pub excerpt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub id: String,
    pub created_at: String,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<Citation>,
}

/// Error body. FastAPI-style services put either a string or a list of
/// validation entries under `detail`; only the string form is user-facing.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub detail: serde_json::Value,
}
