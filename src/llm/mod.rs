//! LLM 层：发言能力抽象、OpenAI 兼容实现、人格解析与 Mock

pub mod mock;
pub mod openai;
pub mod resolver;
pub mod traits;

pub use mock::ScriptedActor;
pub use openai::{OpenAiClient, PersonaClient};
pub use resolver::{default_prompts_dir, CapabilityResolver, PersonaResolver, StaticResolver};
pub use traits::{ActorClient, LlmError};
