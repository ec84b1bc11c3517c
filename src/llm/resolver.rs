//! 能力解析：从 (profile, persona_id) 得到一个可调用的句柄
//!
//! 编排器不持有任何构造逻辑：宿主提供 CapabilityResolver，解析失败等同于
//! 句柄缺失。恢复暂停的对话时也走同一条路径，从身份与 profile 重建句柄。

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::llm::{ActorClient, OpenAiClient, PersonaClient};

/// 宿主边界：给定 profile 与 persona id，解析一个活句柄
pub trait CapabilityResolver: Send + Sync {
    fn resolve(&self, profile: &str, persona_id: &str) -> Option<Arc<dyn ActorClient>>;
}

/// 基于 prompt 文件的解析器：config/prompts/<persona>_<profile>.txt 作为
/// system prompt，底层共用一个 OpenAI 兼容客户端。文件缺失即解析失败。
pub struct PersonaResolver {
    prompts_dir: PathBuf,
    client: Arc<OpenAiClient>,
}

impl PersonaResolver {
    pub fn new(cfg: &AppConfig, prompts_dir: impl Into<PathBuf>) -> Self {
        let client = Arc::new(OpenAiClient::new(
            cfg.llm.base_url.as_deref(),
            &cfg.llm.model,
            None,
        ));
        Self {
            prompts_dir: prompts_dir.into(),
            client,
        }
    }

    fn prompt_path(&self, profile: &str, persona_id: &str) -> PathBuf {
        self.prompts_dir.join(format!(
            "{}_{}.txt",
            persona_id.to_lowercase(),
            profile.to_lowercase()
        ))
    }
}

impl CapabilityResolver for PersonaResolver {
    fn resolve(&self, profile: &str, persona_id: &str) -> Option<Arc<dyn ActorClient>> {
        let path = self.prompt_path(profile, persona_id);
        match std::fs::read_to_string(&path) {
            Ok(prompt) if !prompt.trim().is_empty() => Some(Arc::new(PersonaClient::new(
                self.client.clone(),
                prompt.trim().to_string(),
            ))),
            Ok(_) => {
                tracing::error!("Prompt file {} is empty", path.display());
                None
            }
            Err(e) => {
                tracing::error!("Cannot read prompt file {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// 静态映射解析器：测试与嵌入式宿主用，key 为 "<profile>/<persona_id>"
#[derive(Default)]
pub struct StaticResolver {
    handles: HashMap<String, Arc<dyn ActorClient>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, profile: &str, persona_id: &str, handle: Arc<dyn ActorClient>) -> Self {
        self.handles
            .insert(Self::key(profile, persona_id), handle);
        self
    }

    fn key(profile: &str, persona_id: &str) -> String {
        format!("{}/{}", profile.to_lowercase(), persona_id.to_lowercase())
    }
}

impl CapabilityResolver for StaticResolver {
    fn resolve(&self, profile: &str, persona_id: &str) -> Option<Arc<dyn ActorClient>> {
        self.handles.get(&Self::key(profile, persona_id)).cloned()
    }
}

/// prompts 目录探测：优先 config/prompts，其次 ../config/prompts
pub fn default_prompts_dir() -> PathBuf {
    for candidate in ["config/prompts", "../config/prompts"] {
        if Path::new(candidate).is_dir() {
            return PathBuf::from(candidate);
        }
    }
    PathBuf::from("config/prompts")
}
