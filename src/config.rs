//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `SYMPOSIUM__*` 覆盖
//! （双下划线表示嵌套，如 `SYMPOSIUM__LLM__MODEL=gpt-4o-mini`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub conversation: ConversationSection,
}

/// [app] 段：应用名
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    pub name: Option<String>,
}

/// [llm] 段：OpenAI 兼容端点与模型
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: None,
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

/// [conversation] 段：默认发言者、轮数、记忆窗口
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConversationSection {
    #[serde(default = "default_actor_1")]
    pub actor_1: String,
    #[serde(default = "default_actor_2")]
    pub actor_2: String,
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_rounds")]
    pub rounds: u32,
    /// 记忆窗口大小（回合数）
    #[serde(default = "default_window_size")]
    pub window_size: usize,
}

impl Default for ConversationSection {
    fn default() -> Self {
        Self {
            actor_1: default_actor_1(),
            actor_2: default_actor_2(),
            profile: default_profile(),
            rounds: default_rounds(),
            window_size: default_window_size(),
        }
    }
}

fn default_actor_1() -> String {
    "Socrates".to_string()
}

fn default_actor_2() -> String {
    "Confucius".to_string()
}

fn default_profile() -> String {
    "philosophy".to_string()
}

fn default_rounds() -> u32 {
    3
}

fn default_window_size() -> usize {
    crate::memory::DEFAULT_WINDOW_SIZE
}

/// 从 config 目录加载配置，环境变量 SYMPOSIUM__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 SYMPOSIUM__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("SYMPOSIUM")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
