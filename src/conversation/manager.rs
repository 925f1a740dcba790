use std::sync::Arc;

use tracing::{debug, warn};

use crate::api::{ChatRequest, ChatResponse, DocChatApi};
use crate::conversation::history::{ConversationHistory, Message};
use crate::error::ClientError;

pub const NO_DOCUMENTS_NOTICE: &str = "Please upload documents first";
pub const ANSWER_FAILED_NOTICE: &str = "Failed to get response";

/// Where a single submission ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Pending,
    Committed,
    RolledBack,
}

/// Ticket for the one outstanding request. Consumed by
/// [`ConversationController::complete`], so a submission resolves exactly once.
#[derive(Debug)]
pub struct PendingSubmission {
    id: u64,
    request: ChatRequest,
}

impl PendingSubmission {
    pub fn request(&self) -> &ChatRequest {
        &self.request
    }
}

/// Result of the synchronous half of a submission
#[derive(Debug)]
pub enum Begin {
    /// The user turn is on screen; send `request` and hand the result to `complete`
    Ready(PendingSubmission),
    /// Empty question, or another request is still outstanding
    Ignored,
    /// Precondition failed; nothing was appended or sent
    Blocked(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Ignored,
    Blocked { notice: String },
    Answered,
    RolledBack { notice: String },
}

/// Owns the message list for one chat view and reconciles optimistic user turns
/// with the answers (or failures) that come back.
pub struct ConversationController<A: DocChatApi> {
    api: Arc<A>,
    history: ConversationHistory,
    input: String,
    document_count: usize,
    outstanding: Option<u64>,
    next_submission: u64,
    last_state: Option<SubmissionState>,
}

impl<A: DocChatApi> ConversationController<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            history: ConversationHistory::new(),
            input: String::new(),
            document_count: 0,
            outstanding: None,
            next_submission: 0,
            last_state: None,
        }
    }

    /// Create a controller and read the document count from the service.
    pub async fn open(api: Arc<A>) -> Self {
        let mut controller = Self::new(api);
        controller.refresh_documents().await;
        controller
    }

    /// Re-read the document count. On failure the previous count is kept.
    pub async fn refresh_documents(&mut self) -> usize {
        match self.api.list_documents().await {
            Ok(documents) => self.document_count = documents.len(),
            Err(e) => warn!(error = %e, "failed to fetch documents"),
        }
        self.document_count
    }

    pub fn set_document_count(&mut self, count: usize) {
        self.document_count = count;
    }

    pub fn document_count(&self) -> usize {
        self.document_count
    }

    pub fn messages(&self) -> &[Message] {
        self.history.messages()
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
    }

    pub fn is_pending(&self) -> bool {
        self.outstanding.is_some()
    }

    pub fn last_state(&self) -> Option<SubmissionState> {
        self.last_state
    }

    /// Start over with an empty conversation. Refused while a request is outstanding.
    pub fn clear(&mut self) -> bool {
        if self.is_pending() {
            return false;
        }
        self.history.clear();
        self.input.clear();
        self.last_state = None;
        true
    }

    /// Submit the question and wait for the service to answer it.
    pub async fn submit(&mut self, question: &str) -> SubmitOutcome {
        match self.begin(question) {
            Begin::Ready(ticket) => {
                let result = self.api.ask(ticket.request()).await;
                self.complete(ticket, result)
            }
            Begin::Ignored => SubmitOutcome::Ignored,
            Begin::Blocked(notice) => SubmitOutcome::Blocked { notice },
        }
    }

    /// Synchronous half of a submission: guards, then the optimistic append.
    pub fn begin(&mut self, question: &str) -> Begin {
        if question.trim().is_empty() || self.outstanding.is_some() {
            return Begin::Ignored;
        }
        if self.document_count == 0 {
            return Begin::Blocked(NO_DOCUMENTS_NOTICE.to_string());
        }

        self.history.push(Message::user(question));
        self.input.clear();

        let id = self.next_submission;
        self.next_submission += 1;
        self.outstanding = Some(id);
        self.last_state = Some(SubmissionState::Pending);
        debug!(submission = id, "question submitted");

        Begin::Ready(PendingSubmission {
            id,
            request: ChatRequest::all_documents(question),
        })
    }

    /// Resolve the outstanding submission with the service's result.
    pub fn complete(
        &mut self,
        ticket: PendingSubmission,
        result: Result<ChatResponse, ClientError>,
    ) -> SubmitOutcome {
        if self.outstanding != Some(ticket.id) {
            warn!(submission = ticket.id, "ignoring result for a submission that is not outstanding");
            return SubmitOutcome::Ignored;
        }
        self.outstanding = None;

        match result {
            Ok(response) => {
                self.history
                    .push(Message::assistant(response.answer, response.sources));
                self.last_state = Some(SubmissionState::Committed);
                SubmitOutcome::Answered
            }
            Err(e) => {
                // The guard in `begin` makes the optimistic turn the last entry.
                self.history.pop_last();
                self.last_state = Some(SubmissionState::RolledBack);
                debug!(submission = ticket.id, error = %e, "submission rolled back");
                SubmitOutcome::RolledBack {
                    notice: e.user_message(ANSWER_FAILED_NOTICE),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::auth_channel;
    use crate::api::fake::FakeApi;
    use crate::api::Citation;
    use crate::conversation::history::Role;

    fn controller_with_docs(count: usize) -> (Arc<FakeApi>, ConversationController<FakeApi>) {
        let (_writer, channel) = auth_channel();
        let api = Arc::new(FakeApi::new(channel));
        let mut controller = ConversationController::new(api.clone());
        controller.set_document_count(count);
        (api, controller)
    }

    fn answer(text: &str, sources: Vec<Citation>) -> Result<ChatResponse, ClientError> {
        Ok(ChatResponse {
            answer: text.to_string(),
            sources,
        })
    }

    #[tokio::test]
    async fn success_appends_user_then_assistant() {
        let (api, mut controller) = controller_with_docs(1);
        api.push_answer(answer(
            "42",
            vec![Citation {
                document: "a.pdf".to_string(),
                excerpt: "...".to_string(),
            }],
        ));

        let outcome = controller.submit("What is the answer?").await;

        assert_eq!(outcome, SubmitOutcome::Answered);
        let messages = controller.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], Message::user("What is the answer?"));
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, "42");
        assert_eq!(messages[1].citations().len(), 1);
        assert_eq!(messages[1].citations()[0].document, "a.pdf");
        assert_eq!(controller.last_state(), Some(SubmissionState::Committed));
    }

    #[tokio::test]
    async fn request_searches_every_document() {
        let (api, mut controller) = controller_with_docs(2);
        api.push_answer(answer("ok", vec![]));

        controller.submit("  spaced question ").await;

        assert_eq!(api.questions(), vec![ChatRequest::all_documents("  spaced question ")]);
    }

    #[tokio::test]
    async fn failure_restores_the_prior_sequence() {
        let (api, mut controller) = controller_with_docs(1);
        api.push_answer(answer("first", vec![]));
        controller.submit("one").await;
        let before = controller.messages().to_vec();

        api.push_answer(Err(ClientError::remote(500, "Server error")));
        let outcome = controller.submit("two").await;

        assert_eq!(
            outcome,
            SubmitOutcome::RolledBack {
                notice: "Server error".to_string()
            }
        );
        assert_eq!(controller.messages(), before.as_slice());
        assert!(!controller.is_pending());
        assert_eq!(controller.last_state(), Some(SubmissionState::RolledBack));
    }

    #[tokio::test]
    async fn transport_failure_uses_generic_notice() {
        let (api, mut controller) = controller_with_docs(1);
        api.push_answer(Err(ClientError::transport("timed out")));

        let outcome = controller.submit("hello").await;

        assert_eq!(
            outcome,
            SubmitOutcome::RolledBack {
                notice: ANSWER_FAILED_NOTICE.to_string()
            }
        );
        assert!(controller.messages().is_empty());
    }

    #[tokio::test]
    async fn no_documents_blocks_without_a_request() {
        let (api, mut controller) = controller_with_docs(0);
        controller.set_input("anything");

        let outcome = controller.submit("anything").await;

        assert_eq!(
            outcome,
            SubmitOutcome::Blocked {
                notice: NO_DOCUMENTS_NOTICE.to_string()
            }
        );
        assert!(controller.messages().is_empty());
        assert_eq!(controller.input(), "anything");
        assert_eq!(api.calls_to("chat"), 0);
    }

    #[tokio::test]
    async fn blank_question_is_a_no_op() {
        let (api, mut controller) = controller_with_docs(1);

        assert_eq!(controller.submit("   \n").await, SubmitOutcome::Ignored);
        assert!(controller.messages().is_empty());
        assert!(api.calls().is_empty());
    }

    #[test]
    fn optimistic_turn_is_visible_before_the_request_resolves() {
        let (_api, mut controller) = controller_with_docs(1);
        controller.set_input("why?");

        let Begin::Ready(ticket) = controller.begin("why?") else {
            panic!("expected a ready submission");
        };

        assert_eq!(controller.messages(), &[Message::user("why?")]);
        assert_eq!(controller.input(), "");
        assert!(controller.is_pending());
        assert_eq!(ticket.request().document_ids, None);
    }

    #[test]
    fn second_submission_is_ignored_while_one_is_outstanding() {
        let (_api, mut controller) = controller_with_docs(1);

        let Begin::Ready(first) = controller.begin("first") else {
            panic!("expected a ready submission");
        };
        assert!(matches!(controller.begin("second"), Begin::Ignored));
        assert_eq!(controller.history().trailing_unanswered(), 1);
        assert!(!controller.clear());

        let outcome = controller.complete(
            first,
            Ok(ChatResponse {
                answer: "done".to_string(),
                sources: vec![],
            }),
        );
        assert_eq!(outcome, SubmitOutcome::Answered);
        assert_eq!(controller.messages().len(), 2);
        assert!(matches!(controller.begin("third"), Begin::Ready(_)));
    }

    #[tokio::test]
    async fn open_reads_document_count_and_keeps_it_on_failure() {
        let (_writer, channel) = auth_channel();
        let api = Arc::new(FakeApi::new(channel));
        api.on_documents(Ok(vec![
            FakeApi::document("d1", "a.pdf"),
            FakeApi::document("d2", "b.txt"),
        ]));

        let mut controller = ConversationController::open(api.clone()).await;
        assert_eq!(controller.document_count(), 2);

        api.on_documents(Err(ClientError::transport("offline")));
        assert_eq!(controller.refresh_documents().await, 2);
    }
}
