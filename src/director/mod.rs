//! 编排层：回合执行、主持协议、状态机与恢复快照

pub mod director;
pub mod error;
pub mod executor;
pub mod moderator;
pub mod state;
pub mod validation;

pub use director::{Director, RunRequest, AUTO_GUIDANCE};
pub use error::DirectorError;
pub use executor::{extract_and_clean, Backoff, FixedBackoff, NoBackoff, TurnExecutor, MAX_RETRIES, RETRY_DELAY};
pub use moderator::{parse_moderator_output, ModeratorVerdict, DEFAULT_GUIDANCE};
pub use state::{
    ConversationOutcome, GuidanceRequest, HostMessage, LogEntry, ModerationMode, Phase,
    ResumeSnapshot, WAITING_FOR_GUIDANCE,
};
pub use validation::{sanitize_input, validate_user_input, MAX_INPUT_LENGTH, MIN_INPUT_LENGTH};
