//! 编排错误类型
//!
//! 瞬时调用错误在 TurnExecutor 内部重试并升级为 ActorFailed；
//! 主持人关键失败与回退解析区分开；配置缺失与恢复误用 fail fast。

use thiserror::Error;

/// 编排过程中的不可恢复错误（瞬时错误已在重试层吸收）
#[derive(Error, Debug, Clone)]
pub enum DirectorError {
    /// 所需能力句柄缺失或解析失败（对话开始前即失败）
    #[error("Missing capability: {0}")]
    MissingCapability(String),

    /// 发言者调用在重试耗尽后永久失败
    #[error("{actor} failed in round {round}: {reason}")]
    ActorFailed {
        actor: String,
        round: u32,
        reason: String,
    },

    /// 主持人关键失败（句柄缺失或执行器耗尽重试），区别于协议回退
    #[error("Moderator failed after {speaker} in round {round}: {reason}")]
    ModeratorFailed {
        speaker: String,
        round: u32,
        reason: String,
    },

    /// 恢复快照缺少必要的重建数据
    #[error("Invalid resume snapshot: {0}")]
    ResumeMisuse(String),

    /// 请求参数非法（轮数为 0、起始发言者不存在等）
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}
