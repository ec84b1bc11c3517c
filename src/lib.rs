//! Symposium - 双智能体对话编排引擎
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **director**: 编排状态机、回合执行与重试、主持人协议、恢复快照
//! - **llm**: 发言能力抽象与实现（OpenAI 兼容 / 人格解析 / Mock）
//! - **memory**: 滑动窗口对话记忆

pub mod config;
pub mod director;
pub mod llm;
pub mod memory;

pub use director::{
    ConversationOutcome, Director, GuidanceRequest, ModerationMode, ResumeSnapshot, RunRequest,
};
