//! Chat conversation state: the message sequence and its controller

pub mod commands;
pub mod history;
pub mod manager;

pub use commands::{get_help_text, parse_slash_command, ParsedCommand, SlashCommand};
pub use history::{ConversationHistory, Message, Role};
pub use manager::{Begin, ConversationController, PendingSubmission, SubmissionState, SubmitOutcome};
