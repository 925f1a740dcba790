use async_trait::async_trait;
use reqwest::{IntoUrl, Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use tokio::time::Duration;
use tracing::{debug, warn};

use super::auth::AuthChannel;
use super::types::{
    AuthResponse, ChatRequest, ChatResponse, DocumentInfo, DocumentUpload, ErrorBody, HistoryItem,
    LoginRequest, SignupRequest, UserIdentity,
};
use super::DocChatApi;
use crate::config::Config;
use crate::error::ClientError;

/// HTTP implementation of [`DocChatApi`]
#[derive(Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
    auth: AuthChannel,
}

impl HttpApi {
    pub fn new(config: &Config, auth: AuthChannel) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(ClientError::transport)?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `/documents/{id}` with the id encoded as a single path segment.
    fn document_url(&self, id: &str) -> Result<Url, ClientError> {
        let mut url = Url::parse(&self.base_url).map_err(ClientError::transport)?;
        url.path_segments_mut()
            .map_err(|_| ClientError::transport(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .push("documents")
            .push(id);
        Ok(url)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.request_to(method, self.url(path))
    }

    /// Build a request with the credential currently on the channel, if any.
    fn request_to(&self, method: Method, url: impl IntoUrl) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match self.auth.bearer() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let response = builder.send().await.map_err(|e| {
            debug!(error = %e, "request failed before a response arrived");
            ClientError::transport(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_from_response(status, &body));
        }

        response.json::<T>().await.map_err(|e| {
            warn!(error = %e, "malformed response body");
            ClientError::transport(e)
        })
    }
}

/// Map a non-success response onto the error taxonomy. Only a string `detail` is
/// treated as a user-facing remote error.
pub(crate) fn error_from_response(status: StatusCode, body: &str) -> ClientError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: serde_json::Value::String(detail),
        }) => ClientError::remote(status.as_u16(), detail),
        _ => {
            debug!(%status, body, "error response without a usable detail");
            ClientError::transport(format!("unexpected status {}", status))
        }
    }
}

#[async_trait]
impl DocChatApi for HttpApi {
    async fn sign_up(&self, request: &SignupRequest) -> Result<AuthResponse, ClientError> {
        self.send(self.request(Method::POST, "/auth/signup").json(request))
            .await
    }

    async fn sign_in(&self, request: &LoginRequest) -> Result<AuthResponse, ClientError> {
        self.send(self.request(Method::POST, "/auth/login").json(request))
            .await
    }

    async fn current_user(&self) -> Result<UserIdentity, ClientError> {
        self.send(self.request(Method::GET, "/auth/me")).await
    }

    async fn list_documents(&self) -> Result<Vec<DocumentInfo>, ClientError> {
        self.send(self.request(Method::GET, "/documents")).await
    }

    async fn upload_document(&self, upload: DocumentUpload) -> Result<DocumentInfo, ClientError> {
        let part = reqwest::multipart::Part::bytes(upload.bytes)
            .file_name(upload.filename)
            .mime_str(upload.mime_type)
            .map_err(ClientError::transport)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        self.send(self.request(Method::POST, "/documents/upload").multipart(form))
            .await
    }

    async fn delete_document(&self, id: &str) -> Result<(), ClientError> {
        let url = self.document_url(id)?;
        let _: serde_json::Value = self.send(self.request_to(Method::DELETE, url)).await?;
        Ok(())
    }

    async fn ask(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError> {
        self.send(self.request(Method::POST, "/chat").json(request))
            .await
    }

    async fn chat_history(&self) -> Result<Vec<HistoryItem>, ClientError> {
        self.send(self.request(Method::GET, "/chat/history")).await
    }
}
