//! Fetch-and-render list screens: documents and chat history.

use tracing::warn;

use crate::api::{DocChatApi, HistoryItem};
use crate::error::ClientError;

pub const HISTORY_FAILED_NOTICE: &str = "Failed to load chat history";

/// State of a list screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListView<T> {
    Loading,
    Loaded(Vec<T>),
    Empty,
    Failed(String),
}

impl<T> ListView<T> {
    /// Settle a list fetch. Failures only ever show the generic `failure_notice`.
    pub fn from_result(result: Result<Vec<T>, ClientError>, failure_notice: &str) -> Self {
        match result {
            Ok(items) if items.is_empty() => ListView::Empty,
            Ok(items) => ListView::Loaded(items),
            Err(e) => {
                warn!(error = %e, "{}", failure_notice);
                ListView::Failed(failure_notice.to_string())
            }
        }
    }

    pub fn items(&self) -> &[T] {
        match self {
            ListView::Loaded(items) => items,
            _ => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, ListView::Loading)
    }

    pub fn notice(&self) -> Option<&str> {
        match self {
            ListView::Failed(notice) => Some(notice),
            _ => None,
        }
    }
}

/// Load the chat history screen (most recent first, as the service orders it).
pub async fn load_history<A: DocChatApi>(api: &A) -> ListView<HistoryItem> {
    ListView::from_result(api.chat_history().await, HISTORY_FAILED_NOTICE)
}
