//! Symposium - 双智能体对话编排引擎
//!
//! 入口：初始化日志、加载配置与人格解析器，在命令行驱动一场对话。
//! 用法：symposium [direct|moderated|guided] <起始话题...>

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use symposium::config::load_config;
use symposium::director::{sanitize_input, validate_user_input, WAITING_FOR_GUIDANCE};
use symposium::llm::{default_prompts_dir, PersonaResolver};
use symposium::{Director, ModerationMode, RunRequest};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 日志：默认 info，可通过 RUST_LOG 覆盖
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .with(fmt::layer())
        .init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let mode = match args.first().map(String::as_str) {
        Some("direct") => {
            args.remove(0);
            ModerationMode::Direct
        }
        Some("guided") => {
            args.remove(0);
            ModerationMode::HumanGuided
        }
        Some("moderated") => {
            args.remove(0);
            ModerationMode::AiModerated
        }
        _ => ModerationMode::AiModerated,
    };

    let topic = sanitize_input(&args.join(" "));
    validate_user_input(&topic).map_err(anyhow::Error::msg)?;

    let cfg = load_config(None).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        Default::default()
    });

    let resolver = PersonaResolver::new(&cfg, default_prompts_dir());
    let director =
        Director::new(Arc::new(resolver)).with_window_size(cfg.conversation.window_size);

    let request = RunRequest {
        initial_input: topic,
        rounds: cfg.conversation.rounds,
        actor_1: cfg.conversation.actor_1.clone(),
        actor_2: cfg.conversation.actor_2.clone(),
        profile: cfg.conversation.profile.clone(),
        mode,
    };

    let mut outcome = director.run(request).await;

    // 人工指引模式：每次暂停从 stdin 读取指引（或 "auto"）后恢复
    while outcome.status == WAITING_FOR_GUIDANCE {
        let guidance_request = outcome
            .guidance_request
            .take()
            .context("paused without a guidance request")?;
        let snapshot = outcome.resume.take().context("paused without a snapshot")?;

        println!("\n--- Moderator summary ---\n{}", guidance_request.summary);
        print!(
            "Guidance for {} (or \"auto\"): ",
            guidance_request.next_speaker
        );
        std::io::stdout().flush()?;
        let mut guidance = String::new();
        std::io::stdin()
            .read_line(&mut guidance)
            .context("failed to read guidance")?;

        outcome = director.resume(snapshot, guidance.trim()).await;
    }

    println!();
    for msg in outcome.host_messages() {
        match msg.monologue {
            Some(monologue) => println!("[{}] {}\n  (monologue: {})", msg.role, msg.content, monologue),
            None => println!("[{}] {}", msg.role, msg.content),
        }
    }
    println!("\n{}", outcome.status);

    if !outcome.success {
        anyhow::bail!("conversation did not complete successfully");
    }
    Ok(())
}
