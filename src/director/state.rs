//! 编排状态：消息日志、运行阶段、可序列化恢复快照
//!
//! 活状态（持有句柄）与快照（纯数据）是两个类型，不是同一结构体的可选字段；
//! 导出快照的路径上根本不存在句柄字段，序列化边界由构造保证。

use serde::{Deserialize, Serialize};

use crate::memory::DialogueTurn;

/// 人工指引模式下返回给宿主的 status 字面量
pub const WAITING_FOR_GUIDANCE: &str = "WAITING_FOR_GUIDANCE";

/// 三种运行模式：直连 / AI 主持 / 人工指引（主持人只做摘要，随后暂停）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationMode {
    Direct,
    AiModerated,
    HumanGuided,
}

impl ModerationMode {
    /// 是否需要主持人句柄
    pub fn moderated(&self) -> bool {
        !matches!(self, ModerationMode::Direct)
    }

    /// 状态字符串用的模式描述
    pub fn describe(&self) -> &'static str {
        match self {
            ModerationMode::Direct => "DIRECT",
            ModerationMode::AiModerated => "MODERATED",
            ModerationMode::HumanGuided => "USER-GUIDED",
        }
    }
}

/// 消息日志条目：带标签的和类型，取代原设计里按内容前缀嗅探的 role/content 字典
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogEntry {
    /// 一个发言者的可见回合（独白已剥离存放）
    Actor {
        speaker: String,
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        monologue: Option<String>,
    },
    /// 主持人为下一位发言者生成的上下文
    ModeratorContext {
        target: String,
        summary: String,
        guidance: String,
    },
    /// 人工指引回显
    UserGuidance { target: String, text: String },
    /// 不可恢复失败的诊断条目
    Error { message: String },
}

/// 宿主可见的 {role, content, monologue} 投影
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HostMessage {
    pub role: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monologue: Option<String>,
}

impl LogEntry {
    /// 渲染为宿主约定的形状；系统条目沿用原有内容前缀约定
    pub fn to_message(&self) -> HostMessage {
        match self {
            LogEntry::Actor {
                speaker,
                content,
                monologue,
            } => HostMessage {
                role: speaker.clone(),
                content: content.clone(),
                monologue: monologue.clone(),
            },
            LogEntry::ModeratorContext {
                target,
                summary,
                guidance,
            } => HostMessage {
                role: "system".to_string(),
                content: format!(
                    "MODERATOR CONTEXT (for {}):\nSUMMARY: {}\nGUIDANCE: {}",
                    target, summary, guidance
                ),
                monologue: None,
            },
            LogEntry::UserGuidance { target, text } => HostMessage {
                role: "system".to_string(),
                content: format!("USER GUIDANCE FOR {}: {}", target, text),
                monologue: None,
            },
            LogEntry::Error { message } => HostMessage {
                role: "system".to_string(),
                content: format!("Error: {}", message),
                monologue: None,
            },
        }
    }

    /// 是否为发言者回合（统计 2N 条目时用）
    pub fn is_actor(&self) -> bool {
        matches!(self, LogEntry::Actor { .. })
    }
}

/// 运行阶段（状态机的离散状态）
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    /// round 为 1 起始，speaker_index 0/1 对应两位发言者
    Running { round: u32, speaker_index: usize },
    WaitingForGuidance { pending_speaker: String },
    Completed { success: bool },
    Failed { reason: String },
}

/// 可序列化恢复快照：OrchestrationState 去句柄后的投影。
/// 只在人工指引模式暂停时创建，被 resume 消费一次。
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResumeSnapshot {
    pub current_round: u32,
    pub total_rounds: u32,
    pub actor_1: String,
    pub actor_2: String,
    pub next_speaker: String,
    pub other_speaker: String,
    pub profile: String,
    pub mode: ModerationMode,
    pub input_for_next_speaker: String,
    #[serde(default)]
    pub last_summary: Option<String>,
    #[serde(default)]
    pub last_guidance: Option<String>,
    pub previous_response: String,
    pub log: Vec<LogEntry>,
    pub memory_turns: Vec<DialogueTurn>,
    pub window_size: usize,
}

/// 暂停时宿主提示人工输入所需的数据
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GuidanceRequest {
    pub summary: String,
    pub next_speaker: String,
    /// 主持人自己的指引；resume 时传 "auto" 即采用它
    #[serde(default)]
    pub auto_guidance: Option<String>,
}

/// run/resume 的统一返回形状：成功与失败路径一致
#[derive(Clone, Debug)]
pub struct ConversationOutcome {
    pub log: Vec<LogEntry>,
    pub status: String,
    pub success: bool,
    pub resume: Option<ResumeSnapshot>,
    pub guidance_request: Option<GuidanceRequest>,
}

impl ConversationOutcome {
    /// 宿主形状的完整消息日志
    pub fn host_messages(&self) -> Vec<HostMessage> {
        self.log.iter().map(LogEntry::to_message).collect()
    }

    pub(crate) fn failed(log: Vec<LogEntry>, status: String) -> Self {
        Self {
            log,
            status,
            success: false,
            resume: None,
            guidance_request: None,
        }
    }
}
