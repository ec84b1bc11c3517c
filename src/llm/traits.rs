//! 发言能力抽象
//!
//! 所有后端（OpenAI 兼容 / Persona 包装 / Mock）实现 ActorClient：
//! 给定本次输入与显式历史，返回原始文本。能力本身无状态，历史由编排器显式传入。

use async_trait::async_trait;
use thiserror::Error;

use crate::memory::Message;

/// 能力调用失败（瞬时错误，由 TurnExecutor 负责重试）
#[derive(Error, Debug, Clone)]
pub enum LlmError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// 发言能力 trait：一次调用 = 一段文本输出
#[async_trait]
pub trait ActorClient: Send + Sync {
    /// 以 input 为当前输入、history 为显式上下文，返回原始响应文本
    async fn complete(&self, input: &str, history: &[Message]) -> Result<String, LlmError>;
}
