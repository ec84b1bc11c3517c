//! 主持人协议：提示构建与 SUMMARY/GUIDANCE 文本解析
//!
//! 调用走 TurnExecutor（与发言者共享重试语义）。输出逐行解析，行首
//! 大小写不敏感匹配 SUMMARY: / GUIDANCE:，仅在首个冒号处切分。
//! 缺标记是回退而非失败：无任何标记时整段原文作为摘要（沿用原始行为，
//! 见 DESIGN.md 的 Open Question 记录）。

use std::sync::Arc;

use crate::director::executor::TurnExecutor;
use crate::director::DirectorError;
use crate::llm::ActorClient;

/// 无 GUIDANCE 标记时使用的指引
pub const DEFAULT_GUIDANCE: &str = "Continue the discussion naturally.";
/// 无 SUMMARY 标记但有 GUIDANCE 时使用的摘要占位
const SUMMARY_PLACEHOLDER: &str = "N/A";

/// 主持人一次评估的解析结果
#[derive(Clone, Debug)]
pub struct ModeratorVerdict {
    pub summary: String,
    pub guidance: String,
    pub raw: String,
}

/// 构建主持人输入：上一位发言者及其回复、下一位发言者、可选近期上下文
fn build_moderator_input(
    prev_speaker: &str,
    prev_response: &str,
    next_speaker: &str,
    context: Option<&str>,
) -> String {
    let mut input = format!(
        "The previous speaker was {}.\nTheir response was:\n---\n{}\n---\nThe next speaker will be {}.\n",
        prev_speaker, prev_response, next_speaker
    );
    if let Some(ctx) = context.filter(|c| !c.is_empty()) {
        input.push_str(&format!("\nRecent conversation context:\n{}\n", ctx));
    }
    input.push_str(
        "\n[Instruction Reminder: Follow the required output format precisely - two lines starting with SUMMARY: and GUIDANCE:]",
    );
    input
}

/// 解析主持人原始输出为 (summary, guidance)，含全部回退分支
pub fn parse_moderator_output(raw: &str) -> (String, String) {
    let mut summary: Option<String> = None;
    let mut guidance: Option<String> = None;

    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let upper = trimmed.to_uppercase();
        if upper.starts_with("SUMMARY:") && summary.is_none() {
            summary = trimmed.split_once(':').map(|(_, v)| v.trim().to_string());
        } else if upper.starts_with("GUIDANCE:") && guidance.is_none() {
            guidance = trimmed.split_once(':').map(|(_, v)| v.trim().to_string());
        }
    }

    match (summary, guidance) {
        (Some(s), Some(g)) => (s, g),
        (Some(s), None) => (s, DEFAULT_GUIDANCE.to_string()),
        (None, Some(g)) => (SUMMARY_PLACEHOLDER.to_string(), g),
        // 两个标记都没有：整段原文当作摘要
        (None, None) => (raw.trim().to_string(), DEFAULT_GUIDANCE.to_string()),
    }
}

/// 调用主持人并解析输出。句柄缺失或执行器耗尽重试是关键失败，
/// 与上面的协议回退严格区分。
pub async fn invoke_moderator(
    executor: &TurnExecutor,
    handle: Option<&Arc<dyn ActorClient>>,
    prev_speaker: &str,
    prev_response: &str,
    next_speaker: &str,
    round: u32,
    context: Option<&str>,
) -> Result<ModeratorVerdict, DirectorError> {
    if handle.is_none() {
        tracing::error!(round, "Cannot invoke moderator: handle is missing");
        return Err(DirectorError::ModeratorFailed {
            speaker: prev_speaker.to_string(),
            round,
            reason: "moderator capability not available".to_string(),
        });
    }

    let input = build_moderator_input(prev_speaker, prev_response, next_speaker, context);
    let (raw, _) = executor
        .invoke(handle, &input, &[], "Moderator", round)
        .await
        .map_err(|e| DirectorError::ModeratorFailed {
            speaker: prev_speaker.to_string(),
            round,
            reason: e.to_string(),
        })?;

    let (summary, guidance) = parse_moderator_output(&raw);
    tracing::info!(round, speaker = prev_speaker, "Moderator verdict parsed");
    Ok(ModeratorVerdict {
        summary,
        guidance,
        raw,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::director::executor::NoBackoff;
    use crate::llm::ScriptedActor;

    fn executor() -> TurnExecutor {
        TurnExecutor::new(Box::new(NoBackoff))
    }

    #[test]
    fn test_parse_both_markers() {
        let (summary, guidance) = parse_moderator_output("SUMMARY: X\nGUIDANCE: Y");
        assert_eq!(summary, "X");
        assert_eq!(guidance, "Y");
    }

    #[test]
    fn test_parse_case_insensitive_markers() {
        let (summary, guidance) = parse_moderator_output("summary: lower\nGuidance: mixed");
        assert_eq!(summary, "lower");
        assert_eq!(guidance, "mixed");
    }

    #[test]
    fn test_parse_preserves_downstream_colons() {
        let (summary, guidance) =
            parse_moderator_output("SUMMARY: point one: detail\nGUIDANCE: do this: then that");
        assert_eq!(summary, "point one: detail");
        assert_eq!(guidance, "do this: then that");
    }

    #[test]
    fn test_parse_no_markers_falls_back_to_raw_summary() {
        let raw = "Just some plain text without markers";
        let (summary, guidance) = parse_moderator_output(raw);
        assert_eq!(summary, raw);
        assert_eq!(guidance, DEFAULT_GUIDANCE);
    }

    #[test]
    fn test_parse_only_summary() {
        let (summary, guidance) = parse_moderator_output("SUMMARY: Only a summary here");
        assert_eq!(summary, "Only a summary here");
        assert_eq!(guidance, DEFAULT_GUIDANCE);
    }

    #[test]
    fn test_parse_only_guidance() {
        let (summary, guidance) = parse_moderator_output("GUIDANCE: Only guidance here");
        assert_eq!(summary, "N/A");
        assert_eq!(guidance, "Only guidance here");
    }

    #[tokio::test]
    async fn test_invoke_includes_context_and_names() {
        let actor = std::sync::Arc::new(ScriptedActor::replies(vec![
            "SUMMARY: sum\nGUIDANCE: guide",
        ]));
        let h: std::sync::Arc<dyn crate::llm::ActorClient> = actor.clone();
        let verdict = invoke_moderator(
            &executor(),
            Some(&h),
            "Socrates",
            "a response",
            "Confucius",
            1,
            Some("Some prior context"),
        )
        .await
        .unwrap();
        assert_eq!(verdict.summary, "sum");
        assert_eq!(verdict.guidance, "guide");
        assert!(!verdict.raw.is_empty());

        let sent = actor.inputs();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("Socrates"));
        assert!(sent[0].contains("Confucius"));
        assert!(sent[0].contains("Some prior context"));
        assert!(sent[0].contains("SUMMARY: and GUIDANCE:"));
    }

    #[tokio::test]
    async fn test_missing_handle_is_critical() {
        let err = invoke_moderator(&executor(), None, "Socrates", "r", "Confucius", 1, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DirectorError::ModeratorFailed { .. }));
    }

    #[tokio::test]
    async fn test_executor_failure_is_critical() {
        let h: std::sync::Arc<dyn crate::llm::ActorClient> =
            std::sync::Arc::new(ScriptedActor::always_failing("down"));
        let err = invoke_moderator(&executor(), Some(&h), "Socrates", "r", "Confucius", 2, None)
            .await
            .unwrap_err();
        match err {
            DirectorError::ModeratorFailed { speaker, round, .. } => {
                assert_eq!(speaker, "Socrates");
                assert_eq!(round, 2);
            }
            other => panic!("Expected ModeratorFailed, got {:?}", other),
        }
    }
}
