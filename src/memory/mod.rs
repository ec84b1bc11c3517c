//! 记忆层：对话回合与滑动窗口历史

pub mod conversation;

pub use conversation::{
    ConversationMemory, DialogueTurn, Message, Role, DEFAULT_WINDOW_SIZE,
};
