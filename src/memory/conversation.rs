//! 对话记忆：滑动窗口历史
//!
//! 完整保留全部对话回合（用于日志与序列化），但构建发言者上下文时只取最近
//! window_size 条；主持人侧则以扁平文本形式获取同一窗口。

use serde::{Deserialize, Serialize};

/// 窗口默认大小（回合数）
pub const DEFAULT_WINDOW_SIZE: usize = 6;

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Assistant,
    System,
}

/// 单条消息
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// 一个对话回合：发言者、可见内容、轮次（0 保留给起始提问）、可选独白
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DialogueTurn {
    pub speaker: String,
    pub content: String,
    pub round: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monologue: Option<String>,
}

impl DialogueTurn {
    pub fn new(speaker: impl Into<String>, content: impl Into<String>, round: u32) -> Self {
        Self {
            speaker: speaker.into(),
            content: content.into(),
            round,
            monologue: None,
        }
    }

    /// `[Speaker, Round N]: content` 格式，窗口历史与上下文字符串共用
    fn formatted(&self) -> String {
        format!("[{}, Round {}]: {}", self.speaker, self.round, self.content)
    }
}

/// 滑动窗口记忆：只追加，不截断底层完整日志；窗口视图始终返回
/// 最近 min(window_size, total) 条，按时间顺序。
/// 主持人/系统条目不进入记忆，只有起始提问与发言者回合。
#[derive(Clone, Debug)]
pub struct ConversationMemory {
    window_size: usize,
    turns: Vec<DialogueTurn>,
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE)
    }
}

impl ConversationMemory {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size,
            turns: Vec::new(),
        }
    }

    /// 追加一个回合（发言者或起始用户，不含主持人/系统）
    pub fn add_turn(&mut self, speaker: impl Into<String>, content: impl Into<String>, round: u32) {
        self.turns.push(DialogueTurn::new(speaker, content, round));
    }

    /// 最近 window_size 条回合，转为发言者可用的历史消息。
    /// 所有历史均以 `[Speaker, Round N]:` 前缀的 User 消息呈现。
    pub fn windowed_history(&self) -> Vec<Message> {
        self.window().iter().map(|t| Message::user(t.formatted())).collect()
    }

    /// 同一窗口的扁平文本（每回合一行），供主持人上下文使用；
    /// max_turns 为 None 时用 window_size
    pub fn context_string(&self, max_turns: Option<usize>) -> String {
        let n = max_turns.unwrap_or(self.window_size);
        let start = self.turns.len().saturating_sub(n);
        self.turns[start..]
            .iter()
            .map(|t| t.formatted())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn window(&self) -> &[DialogueTurn] {
        let start = self.turns.len().saturating_sub(self.window_size);
        &self.turns[start..]
    }

    /// 完整回合列表（序列化边界：ResumeSnapshot 只携带这个）
    pub fn turns(&self) -> &[DialogueTurn] {
        &self.turns
    }

    /// 从序列化回合列表恢复
    pub fn from_turns(turns: Vec<DialogueTurn>, window_size: usize) -> Self {
        Self { window_size, turns }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
