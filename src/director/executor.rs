//! 回合执行器：带上限的重试与独白提取
//!
//! 一次 invoke = 一次发言者/主持人调用：句柄缺失立即失败；瞬时错误按固定
//! 间隔重试至 MAX_RETRIES；成功响应先剥离 <think> 块再修剪返回。
//! 退避策略可注入，测试用 NoBackoff 保证不依赖真实时钟。

use std::sync::Arc;
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;

use crate::director::DirectorError;
use crate::llm::ActorClient;
use crate::memory::Message;

/// 单次调用最大尝试次数
pub const MAX_RETRIES: usize = 3;
/// 两次尝试之间的固定间隔
pub const RETRY_DELAY: Duration = Duration::from_secs(2);

fn think_block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<think>(.*?)</think>").expect("think block regex is valid")
    })
}

/// 提取首个 <think> 块为独白，并从可见文本中移除全部块
pub fn extract_and_clean(raw: &str) -> (String, Option<String>) {
    let re = think_block_regex();
    let monologue = re
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string());
    let clean = re.replace_all(raw, "").trim().to_string();
    (clean, monologue)
}

/// 重试间隔策略；生产用真实 sleep，测试注入空实现
#[async_trait]
pub trait Backoff: Send + Sync {
    async fn wait(&self, attempt: usize);
}

/// 固定间隔退避（tokio sleep）
pub struct FixedBackoff(pub Duration);

#[async_trait]
impl Backoff for FixedBackoff {
    async fn wait(&self, _attempt: usize) {
        tokio::time::sleep(self.0).await;
    }
}

/// 不等待（测试用）
pub struct NoBackoff;

#[async_trait]
impl Backoff for NoBackoff {
    async fn wait(&self, _attempt: usize) {}
}

/// 回合执行器：封装重试、退避与响应清洗
pub struct TurnExecutor {
    backoff: Box<dyn Backoff>,
}

impl Default for TurnExecutor {
    fn default() -> Self {
        Self::new(Box::new(FixedBackoff(RETRY_DELAY)))
    }
}

impl TurnExecutor {
    pub fn new(backoff: Box<dyn Backoff>) -> Self {
        Self { backoff }
    }

    /// 调用一个能力句柄，返回 (可见文本, 独白)。
    /// 空字符串响应是合法结果；仅含空白的非空响应视为无效并走重试。
    pub async fn invoke(
        &self,
        handle: Option<&Arc<dyn ActorClient>>,
        input: &str,
        history: &[Message],
        actor_name: &str,
        round: u32,
    ) -> Result<(String, Option<String>), DirectorError> {
        let Some(handle) = handle else {
            tracing::error!(round, actor = actor_name, "Cannot invoke: handle is missing");
            return Err(DirectorError::MissingCapability(actor_name.to_string()));
        };

        let mut last_error = String::new();
        for attempt in 1..=MAX_RETRIES {
            tracing::info!(
                round,
                actor = actor_name,
                attempt,
                max = MAX_RETRIES,
                "Requesting turn"
            );
            match handle.complete(input, history).await {
                Ok(raw) if raw.is_empty() => {
                    tracing::info!(round, actor = actor_name, "Returned an empty string");
                    return Ok((String::new(), None));
                }
                Ok(raw) if !raw.trim().is_empty() => {
                    let (clean, monologue) = extract_and_clean(&raw);
                    if clean.is_empty() {
                        tracing::warn!(
                            round,
                            actor = actor_name,
                            "Visible text empty after monologue extraction"
                        );
                    }
                    return Ok((clean, monologue));
                }
                Ok(raw) => {
                    // 非空但全是空白：当作无效响应重试
                    last_error = format!("blank response ({} chars)", raw.len());
                    tracing::error!(
                        round,
                        actor = actor_name,
                        attempt,
                        "Invalid blank response"
                    );
                }
                Err(e) => {
                    last_error = e.to_string();
                    tracing::error!(
                        round,
                        actor = actor_name,
                        attempt,
                        error = %e,
                        "Turn failed"
                    );
                }
            }
            if attempt < MAX_RETRIES {
                tracing::info!(round, actor = actor_name, "Retrying after backoff");
                self.backoff.wait(attempt).await;
            }
        }

        tracing::error!(round, actor = actor_name, "Failed permanently");
        Err(DirectorError::ActorFailed {
            actor: actor_name.to_string(),
            round,
            reason: last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmError, ScriptedActor};

    fn executor() -> TurnExecutor {
        TurnExecutor::new(Box::new(NoBackoff))
    }

    fn handle(actor: ScriptedActor) -> Arc<dyn ActorClient> {
        Arc::new(actor)
    }

    #[tokio::test]
    async fn test_success() {
        let h = handle(ScriptedActor::replies(vec!["Hello world"]));
        let (text, monologue) = executor()
            .invoke(Some(&h), "test", &[], "TestActor", 1)
            .await
            .unwrap();
        assert_eq!(text, "Hello world");
        assert!(monologue.is_none());
    }

    #[tokio::test]
    async fn test_think_block_extracted() {
        let h = handle(ScriptedActor::replies(vec![
            "<think>internal</think>Visible response",
        ]));
        let (text, monologue) = executor()
            .invoke(Some(&h), "test", &[], "TestActor", 1)
            .await
            .unwrap();
        assert_eq!(text, "Visible response");
        assert_eq!(monologue.as_deref(), Some("internal"));
    }

    #[tokio::test]
    async fn test_multiline_case_insensitive_think_block() {
        let h = handle(ScriptedActor::replies(vec![
            "<THINK>line one\nline two</THINK>\n\nAnswer",
        ]));
        let (text, monologue) = executor()
            .invoke(Some(&h), "test", &[], "TestActor", 1)
            .await
            .unwrap();
        assert_eq!(text, "Answer");
        assert_eq!(monologue.as_deref(), Some("line one\nline two"));
    }

    #[tokio::test]
    async fn test_entirely_think_block_yields_empty_visible() {
        let h = handle(ScriptedActor::replies(vec!["<think>only thoughts</think>"]));
        let (text, monologue) = executor()
            .invoke(Some(&h), "test", &[], "TestActor", 1)
            .await
            .unwrap();
        assert_eq!(text, "");
        assert_eq!(monologue.as_deref(), Some("only thoughts"));
    }

    #[tokio::test]
    async fn test_retry_then_success() {
        let actor = ScriptedActor::new(vec![
            Err(LlmError::Request("timeout".to_string())),
            Ok("recovered".to_string()),
        ]);
        let h: Arc<dyn ActorClient> = Arc::new(actor);
        let (text, _) = executor()
            .invoke(Some(&h), "test", &[], "TestActor", 1)
            .await
            .unwrap();
        assert_eq!(text, "recovered");
    }

    #[tokio::test]
    async fn test_permanent_failure_after_max_retries() {
        let actor = Arc::new(ScriptedActor::always_failing("fail"));
        let h: Arc<dyn ActorClient> = actor.clone();
        let err = executor()
            .invoke(Some(&h), "test", &[], "TestActor", 2)
            .await
            .unwrap_err();
        assert_eq!(actor.call_count(), MAX_RETRIES);
        match err {
            DirectorError::ActorFailed { actor, round, .. } => {
                assert_eq!(actor, "TestActor");
                assert_eq!(round, 2);
            }
            other => panic!("Expected ActorFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_handle_fails_without_retry() {
        let err = executor()
            .invoke(None, "test", &[], "TestActor", 1)
            .await
            .unwrap_err();
        assert!(matches!(err, DirectorError::MissingCapability(_)));
    }

    #[tokio::test]
    async fn test_empty_response_is_valid() {
        let actor = Arc::new(ScriptedActor::replies(vec![""]));
        let h: Arc<dyn ActorClient> = actor.clone();
        let (text, monologue) = executor()
            .invoke(Some(&h), "test", &[], "TestActor", 1)
            .await
            .unwrap();
        assert_eq!(text, "");
        assert!(monologue.is_none());
        assert_eq!(actor.call_count(), 1);
    }

    #[tokio::test]
    async fn test_blank_response_retries() {
        let actor = ScriptedActor::new(vec![Ok("   ".to_string()), Ok("ok now".to_string())]);
        let h: Arc<dyn ActorClient> = Arc::new(actor);
        let (text, _) = executor()
            .invoke(Some(&h), "test", &[], "TestActor", 1)
            .await
            .unwrap();
        assert_eq!(text, "ok now");
    }
}
