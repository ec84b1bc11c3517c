//! Mock 发言能力（用于测试，无需 API）
//!
//! 按脚本顺序消费预置响应（成功或错误），并记录调用次数，便于验证重试语义。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{ActorClient, LlmError};
use crate::memory::Message;

/// 脚本式 Mock：每次 complete 弹出队首结果；脚本耗尽后回显输入。
/// 收到的 input 全部记录，供测试断言提示词装配。
#[derive(Debug, Default)]
pub struct ScriptedActor {
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    inputs: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedActor {
    pub fn new(script: Vec<Result<String, LlmError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            inputs: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// 全部成功响应的便捷构造
    pub fn replies<S: Into<String>>(replies: Vec<S>) -> Self {
        Self::new(replies.into_iter().map(|s| Ok(s.into())).collect())
    }

    /// 每次调用都失败的便捷构造（脚本长度覆盖任何重试上限）
    pub fn always_failing(reason: &str) -> Self {
        Self::new(
            (0..16)
                .map(|_| Err(LlmError::Request(reason.to_string())))
                .collect(),
        )
    }

    /// 已发生的调用次数
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 历次调用收到的 input（按顺序）
    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().expect("inputs lock poisoned").clone()
    }
}

#[async_trait]
impl ActorClient for ScriptedActor {
    async fn complete(&self, input: &str, _history: &[Message]) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs
            .lock()
            .expect("inputs lock poisoned")
            .push(input.to_string());
        let next = self.script.lock().expect("script lock poisoned").pop_front();
        match next {
            Some(result) => result,
            None => Ok(format!("Echo: {}", input)),
        }
    }
}
