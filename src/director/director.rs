//! Director：对话状态机
//!
//! 驱动两位发言者与可选主持人的回合顺序，三种模式：直连（输出原样作为下一位
//! 输入）、AI 主持（摘要+指引包入下一位输入）、人工指引（主持人只做摘要，
//! 随后导出快照交还宿主，等待 resume 注入指引）。
//!
//! 任何发言者永久失败或主持人关键失败都立即中止当前 run/resume 调用：
//! 日志追加一条 Error 条目，返回 success=false，剩余回合不再尝试。
//! 编排器自身不做对话级重试，单次调用的重试在 TurnExecutor 内完成。

use std::sync::Arc;

use crate::director::executor::TurnExecutor;
use crate::director::moderator::{invoke_moderator, ModeratorVerdict, DEFAULT_GUIDANCE};
use crate::director::state::{
    ConversationOutcome, GuidanceRequest, LogEntry, ModerationMode, Phase, ResumeSnapshot,
    WAITING_FOR_GUIDANCE,
};
use crate::director::DirectorError;
use crate::llm::{ActorClient, CapabilityResolver};
use crate::memory::{ConversationMemory, DEFAULT_WINDOW_SIZE};

/// resume 时表示「采用主持人自己的指引」的字面量
pub const AUTO_GUIDANCE: &str = "auto";

/// 一次 run 的请求参数；actor_1 先发言
#[derive(Clone, Debug)]
pub struct RunRequest {
    pub initial_input: String,
    pub rounds: u32,
    pub actor_1: String,
    pub actor_2: String,
    pub profile: String,
    pub mode: ModerationMode,
}

/// 一个座位：身份 + 活句柄（不可序列化，永不进入快照）
struct Seat {
    name: String,
    handle: Arc<dyn ActorClient>,
}

/// 进行中对话的活状态；暂停时由 export_snapshot 剥掉句柄后投影为纯数据
struct LiveConversation {
    phase: Phase,
    total_rounds: u32,
    profile: String,
    mode: ModerationMode,
    seats: [Seat; 2],
    moderator: Option<Arc<dyn ActorClient>>,
    pending_input: String,
    last_summary: Option<String>,
    last_guidance: Option<String>,
    previous_response: String,
    log: Vec<LogEntry>,
    memory: ConversationMemory,
}

impl LiveConversation {
    fn running(&self) -> Option<(u32, usize)> {
        match self.phase {
            Phase::Running {
                round,
                speaker_index,
            } => Some((round, speaker_index)),
            _ => None,
        }
    }

    /// 剥离句柄的序列化投影，round/index 指向待发言的下一个回合。
    /// 句柄字段根本不存在于快照类型上，序列化边界由构造保证。
    fn export_snapshot(&self, round: u32, index: usize) -> ResumeSnapshot {
        ResumeSnapshot {
            current_round: round,
            total_rounds: self.total_rounds,
            actor_1: self.seats[0].name.clone(),
            actor_2: self.seats[1].name.clone(),
            next_speaker: self.seats[index].name.clone(),
            other_speaker: self.seats[1 - index].name.clone(),
            profile: self.profile.clone(),
            mode: self.mode,
            input_for_next_speaker: self.pending_input.clone(),
            last_summary: self.last_summary.clone(),
            last_guidance: self.last_guidance.clone(),
            previous_response: self.previous_response.clone(),
            log: self.log.clone(),
            memory_turns: self.memory.turns().to_vec(),
            window_size: self.memory.window_size(),
        }
    }
}

/// 一个 segment（一次发言 + 可选主持）结束后的走向
enum SegmentEnd {
    /// 下一位输入已备好，继续循环
    Continue,
    /// 人工指引模式：暂停等待外部输入，快照已导出
    Paused(GuidanceRequest, Box<ResumeSnapshot>),
    /// 对话完成
    Finished,
}

/// 将主持人摘要/指引包入下一位发言者的输入
fn wrap_with_moderator_context(response: &str, summary: &str, guidance: &str) -> String {
    let guidance = if guidance.is_empty() {
        DEFAULT_GUIDANCE
    } else {
        guidance
    };
    format!(
        "{}\n\n--- Moderator Context ---\nSummary: {}\nGuidance for your response: {}\n--- End Context ---",
        response, summary, guidance
    )
}

/// 对话编排器。单线程顺序执行：每次能力调用都阻塞当前任务直至返回或重试耗尽。
pub struct Director {
    resolver: Arc<dyn CapabilityResolver>,
    executor: TurnExecutor,
    window_size: usize,
}

impl Director {
    pub fn new(resolver: Arc<dyn CapabilityResolver>) -> Self {
        Self {
            resolver,
            executor: TurnExecutor::default(),
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }

    /// 替换执行器（测试注入 NoBackoff）
    pub fn with_executor(mut self, executor: TurnExecutor) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    /// 开始一个对话。直连/AI 主持模式内部循环跑完全部回合；
    /// 人工指引模式只执行一个 segment 即返回 WAITING_FOR_GUIDANCE 与快照。
    /// 任何必需句柄缺失在首个回合前就失败，不产生部分对话。
    pub async fn run(&self, req: RunRequest) -> ConversationOutcome {
        tracing::info!(
            mode = req.mode.describe(),
            profile = %req.profile,
            rounds = req.rounds,
            starter = %req.actor_1,
            "Director starting conversation"
        );

        if let Err(e) = validate_request(&req) {
            tracing::error!(error = %e, "Rejecting run request");
            return ConversationOutcome::failed(Vec::new(), format!("Error: {}", e));
        }

        let seats = match self.resolve_seats(&req.profile, &req.actor_1, &req.actor_2) {
            Ok(seats) => seats,
            Err(e) => {
                return ConversationOutcome::failed(Vec::new(), format!("Error: {}", e));
            }
        };
        let moderator = if req.mode.moderated() {
            match self.resolver.resolve(&req.profile, "moderator") {
                Some(h) => Some(h),
                None => {
                    let e = DirectorError::MissingCapability(format!(
                        "moderator ('{}' profile)",
                        req.profile
                    ));
                    tracing::error!(error = %e, "Capability resolution failed");
                    return ConversationOutcome::failed(Vec::new(), format!("Error: {}", e));
                }
            }
        } else {
            None
        };

        let mut memory = ConversationMemory::new(self.window_size);
        memory.add_turn("User", req.initial_input.clone(), 0);

        let mut conv = LiveConversation {
            phase: Phase::Running {
                round: 1,
                speaker_index: 0,
            },
            total_rounds: req.rounds,
            profile: req.profile.clone(),
            mode: req.mode,
            seats,
            moderator,
            pending_input: req.initial_input.clone(),
            last_summary: None,
            last_guidance: None,
            previous_response: String::new(),
            log: Vec::new(),
            memory,
        };

        self.drive(conv).await
    }

    /// 从快照恢复被暂停的对话：重建句柄，拼装恢复输入（上次回复 + 存储的摘要
    /// + 人工指引或 "auto" 选中的主持人指引），再执行一个 segment。
    pub async fn resume(&self, snapshot: ResumeSnapshot, guidance: &str) -> ConversationOutcome {
        if let Err(e) = validate_snapshot(&snapshot) {
            tracing::error!(error = %e, "Rejecting resume");
            return ConversationOutcome::failed(snapshot.log, format!("Error: {}", e));
        }

        let seats = match self.resolve_seats(&snapshot.profile, &snapshot.actor_1, &snapshot.actor_2)
        {
            Ok(seats) => seats,
            Err(e) => {
                return ConversationOutcome::failed(snapshot.log, format!("Error: {}", e));
            }
        };
        let moderator = match self.resolver.resolve(&snapshot.profile, "moderator") {
            Some(h) => Some(h),
            None => {
                let e = DirectorError::MissingCapability(format!(
                    "moderator ('{}' profile)",
                    snapshot.profile
                ));
                tracing::error!(error = %e, "Capability resolution failed on resume");
                return ConversationOutcome::failed(snapshot.log, format!("Error: {}", e));
            }
        };

        let speaker_index = if snapshot.next_speaker == snapshot.actor_1 {
            0
        } else {
            1
        };
        let chosen_guidance = if guidance == AUTO_GUIDANCE {
            snapshot
                .last_guidance
                .clone()
                .filter(|g| !g.is_empty())
                .unwrap_or_else(|| DEFAULT_GUIDANCE.to_string())
        } else {
            guidance.to_string()
        };
        let summary = snapshot
            .last_summary
            .clone()
            .unwrap_or_else(|| "N/A".to_string());

        tracing::info!(
            round = snapshot.current_round,
            next = %snapshot.next_speaker,
            auto = guidance == AUTO_GUIDANCE,
            "Resuming conversation"
        );

        let mut log = snapshot.log.clone();
        log.push(LogEntry::UserGuidance {
            target: snapshot.next_speaker.clone(),
            text: chosen_guidance.clone(),
        });

        let conv = LiveConversation {
            phase: Phase::Running {
                round: snapshot.current_round,
                speaker_index,
            },
            total_rounds: snapshot.total_rounds,
            profile: snapshot.profile.clone(),
            mode: snapshot.mode,
            seats,
            moderator,
            pending_input: wrap_with_moderator_context(
                &snapshot.previous_response,
                &summary,
                &chosen_guidance,
            ),
            last_summary: snapshot.last_summary.clone(),
            last_guidance: snapshot.last_guidance.clone(),
            previous_response: snapshot.previous_response.clone(),
            log,
            memory: ConversationMemory::from_turns(snapshot.memory_turns, snapshot.window_size),
        };

        self.drive(conv).await
    }

    fn resolve_seats(
        &self,
        profile: &str,
        actor_1: &str,
        actor_2: &str,
    ) -> Result<[Seat; 2], DirectorError> {
        let mut resolve = |name: &str| -> Result<Seat, DirectorError> {
            match self.resolver.resolve(profile, name) {
                Some(handle) => Ok(Seat {
                    name: name.to_string(),
                    handle,
                }),
                None => {
                    let e = DirectorError::MissingCapability(format!(
                        "{} ('{}' profile)",
                        name, profile
                    ));
                    tracing::error!(error = %e, "Capability resolution failed");
                    Err(e)
                }
            }
        };
        Ok([resolve(actor_1)?, resolve(actor_2)?])
    }

    /// 按模式驱动状态机直到完成、暂停或失败
    async fn drive(&self, mut conv: LiveConversation) -> ConversationOutcome {
        loop {
            match self.execute_segment(&mut conv).await {
                Ok(SegmentEnd::Continue) => {
                    // 人工指引模式不会走到这里：segment 要么暂停要么完成
                    continue;
                }
                Ok(SegmentEnd::Paused(request, snapshot)) => {
                    tracing::info!(
                        next = %request.next_speaker,
                        "Conversation paused for external guidance"
                    );
                    return ConversationOutcome {
                        log: conv.log,
                        status: WAITING_FOR_GUIDANCE.to_string(),
                        success: false,
                        resume: Some(*snapshot),
                        guidance_request: Some(request),
                    };
                }
                Ok(SegmentEnd::Finished) => {
                    let status = format!(
                        "{} conversation ('{}' profile) completed after {} rounds.",
                        conv.mode.describe(),
                        conv.profile,
                        conv.total_rounds
                    );
                    tracing::info!(status = %status, "Conversation completed");
                    return ConversationOutcome {
                        log: conv.log,
                        status,
                        success: true,
                        resume: None,
                        guidance_request: None,
                    };
                }
                Err(e) => {
                    tracing::error!(error = %e, "Conversation aborted");
                    conv.log.push(LogEntry::Error {
                        message: e.to_string(),
                    });
                    conv.phase = Phase::Failed {
                        reason: e.to_string(),
                    };
                    return ConversationOutcome::failed(conv.log, format!("Error: {}", e));
                }
            }
        }
    }

    /// 执行一个 segment：当前发言者发言，随后按模式主持或暂停。
    /// 第二位发言者结束后轮次 +1；完成判定在主持之前（人工指引模式的
    /// 收尾 segment 不再调用主持人，没有下一位需要指引）。
    async fn execute_segment(
        &self,
        conv: &mut LiveConversation,
    ) -> Result<SegmentEnd, DirectorError> {
        let (round, index) = conv
            .running()
            .ok_or_else(|| DirectorError::InvalidRequest("conversation is not running".into()))?;
        let speaker_name = conv.seats[index].name.clone();
        let listener_name = conv.seats[1 - index].name.clone();

        let history = conv.memory.windowed_history();
        let (text, monologue) = self
            .executor
            .invoke(
                Some(&conv.seats[index].handle),
                &conv.pending_input,
                &history,
                &speaker_name,
                round,
            )
            .await?;

        conv.log.push(LogEntry::Actor {
            speaker: speaker_name.clone(),
            content: text.clone(),
            monologue,
        });
        conv.memory.add_turn(speaker_name.clone(), text.clone(), round);
        conv.previous_response = text.clone();

        // 完成判定：第二位发言者刚结束且已达请求轮数
        let finished = index == 1 && round >= conv.total_rounds;
        // bookkeeping：第二位发言者之后轮次 +1，发言权交还第一位
        let next_round = if index == 1 { round + 1 } else { round };
        let next_index = 1 - index;
        conv.phase = Phase::Running {
            round: next_round,
            speaker_index: next_index,
        };

        match conv.mode {
            ModerationMode::Direct => {
                if finished {
                    conv.phase = Phase::Completed { success: true };
                    return Ok(SegmentEnd::Finished);
                }
                conv.pending_input = text;
                Ok(SegmentEnd::Continue)
            }
            ModerationMode::AiModerated => {
                // 原始行为：每个回合之后都主持，包括最后一个
                let verdict = self
                    .moderate(conv, &speaker_name, &text, &listener_name, round)
                    .await?;
                if finished {
                    conv.phase = Phase::Completed { success: true };
                    return Ok(SegmentEnd::Finished);
                }
                conv.pending_input =
                    wrap_with_moderator_context(&text, &verdict.summary, &verdict.guidance);
                Ok(SegmentEnd::Continue)
            }
            ModerationMode::HumanGuided => {
                if finished {
                    conv.phase = Phase::Completed { success: true };
                    return Ok(SegmentEnd::Finished);
                }
                let verdict = self
                    .moderate(conv, &speaker_name, &text, &listener_name, round)
                    .await?;
                conv.pending_input = String::new();
                let snapshot = conv.export_snapshot(next_round, next_index);
                conv.phase = Phase::WaitingForGuidance {
                    pending_speaker: listener_name.clone(),
                };
                Ok(SegmentEnd::Paused(
                    GuidanceRequest {
                        summary: verdict.summary,
                        next_speaker: listener_name,
                        auto_guidance: Some(verdict.guidance),
                    },
                    Box::new(snapshot),
                ))
            }
        }
    }

    /// 调用主持人并记录 ModeratorContext 日志条目与最近裁决
    async fn moderate(
        &self,
        conv: &mut LiveConversation,
        speaker: &str,
        response: &str,
        listener: &str,
        round: u32,
    ) -> Result<ModeratorVerdict, DirectorError> {
        let context = conv.memory.context_string(None);
        let verdict = invoke_moderator(
            &self.executor,
            conv.moderator.as_ref(),
            speaker,
            response,
            listener,
            round,
            Some(&context),
        )
        .await?;

        conv.log.push(LogEntry::ModeratorContext {
            target: listener.to_string(),
            summary: verdict.summary.clone(),
            guidance: verdict.guidance.clone(),
        });
        conv.last_summary = Some(verdict.summary.clone());
        conv.last_guidance = Some(verdict.guidance.clone());
        Ok(verdict)
    }
}

fn validate_request(req: &RunRequest) -> Result<(), DirectorError> {
    if req.rounds == 0 {
        return Err(DirectorError::InvalidRequest(
            "at least one round is required".into(),
        ));
    }
    if req.actor_1.trim().is_empty() || req.actor_2.trim().is_empty() {
        return Err(DirectorError::InvalidRequest(
            "both actor identities are required".into(),
        ));
    }
    if req.actor_1 == req.actor_2 {
        return Err(DirectorError::InvalidRequest(
            "the two actors must be distinct".into(),
        ));
    }
    Ok(())
}

fn validate_snapshot(snapshot: &ResumeSnapshot) -> Result<(), DirectorError> {
    if snapshot.mode != ModerationMode::HumanGuided {
        return Err(DirectorError::ResumeMisuse(
            "only human-guided conversations can be resumed".into(),
        ));
    }
    if snapshot.actor_1.trim().is_empty() || snapshot.actor_2.trim().is_empty() {
        return Err(DirectorError::ResumeMisuse(
            "actor identities are missing".into(),
        ));
    }
    if snapshot.next_speaker != snapshot.actor_1 && snapshot.next_speaker != snapshot.actor_2 {
        return Err(DirectorError::ResumeMisuse(format!(
            "next speaker '{}' is not one of the actors",
            snapshot.next_speaker
        )));
    }
    if snapshot.total_rounds == 0 || snapshot.current_round == 0 {
        return Err(DirectorError::ResumeMisuse(
            "round counters are inconsistent".into(),
        ));
    }
    Ok(())
}
