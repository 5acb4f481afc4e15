//! Inbound message pipeline: trigger, shield, mission, reply.
//!
//! A message that does not start with a tier prefix is passed through
//! untouched and produces no reply. Triggered missions for one actor run one
//! at a time, in arrival order.

use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::core::context::{DistilledMemory, select_context};
use crate::core::contract::{AutonomyLevel, build_contract};
use crate::core::trigger::parse_trigger;
use crate::io::agent::Agent;
use crate::io::approval::ApprovalGate;
use crate::io::clock::{Clock, SystemClock};
use crate::io::config::AutonomyConfig;
use crate::io::tools::{ToolContext, ToolRegistry};
use crate::mission::{MissionOutcome, MissionRunner};
use crate::queue::ActorQueue;
use crate::shield::{Shield, ShieldedText};

#[derive(Debug, Clone, PartialEq)]
pub enum InboundReply {
    /// Not a mission trigger; nothing to send back.
    Passthrough,
    RateLimited { reply_text: String },
    Mission(MissionReply),
}

impl InboundReply {
    pub fn reply_text(&self) -> Option<&str> {
        match self {
            Self::Passthrough => None,
            Self::RateLimited { reply_text } => Some(reply_text),
            Self::Mission(reply) => Some(&reply.reply_text),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MissionReply {
    pub reply_text: String,
    pub level: AutonomyLevel,
    pub outcome: MissionOutcome,
    pub warnings: Vec<String>,
    pub injection_markers: Vec<&'static str>,
}

/// Long-lived host for missions: owns the shield, queue and collaborators.
pub struct Sidecar<A, G> {
    config: Arc<AutonomyConfig>,
    shield: Shield,
    queue: ActorQueue,
    tools: Arc<ToolRegistry>,
    agent: Arc<A>,
    approvals: Arc<G>,
    clock: Arc<dyn Clock>,
    memory: Arc<DistilledMemory>,
}

impl<A, G> Sidecar<A, G>
where
    A: Agent + 'static,
    G: ApprovalGate + 'static,
{
    /// Creates the allowed root if it does not exist yet.
    pub fn new(config: AutonomyConfig, tools: ToolRegistry, agent: A, approvals: G) -> Result<Self> {
        fs::create_dir_all(&config.allowed_root).with_context(|| {
            format!("create allowed root {}", config.allowed_root.display())
        })?;
        Ok(Self {
            shield: Shield::new(config.rate_limit_per_minute),
            config: Arc::new(config),
            queue: ActorQueue::new(),
            tools: Arc::new(tools),
            agent: Arc::new(agent),
            approvals: Arc::new(approvals),
            clock: Arc::new(SystemClock),
            memory: Arc::new(DistilledMemory::default()),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_memory(mut self, memory: DistilledMemory) -> Self {
        self.memory = Arc::new(memory);
        self
    }

    pub fn agent(&self) -> &A {
        &self.agent
    }

    pub fn approvals(&self) -> &G {
        &self.approvals
    }

    /// Turn one inbound message into at most one reply.
    ///
    /// Errors only when the mission task itself could not be joined.
    #[instrument(skip_all, fields(actor = %actor))]
    pub async fn handle_message(&self, actor: &str, text: &str) -> Result<InboundReply> {
        let Some(trigger) = parse_trigger(text) else {
            return Ok(InboundReply::Passthrough);
        };

        let admission = self.shield.inbound(actor, text);
        if !admission.admitted {
            return Ok(InboundReply::RateLimited {
                reply_text: admission.reason.unwrap_or_default(),
            });
        }

        let contract = build_contract(actor, &trigger.goal, trigger.level, self.clock.now());
        let context = select_context(&self.memory, &trigger.goal);
        let tool_ctx = ToolContext {
            actor_id: actor.to_string(),
            mode: trigger.level,
            mission_id: Some(contract.mission_id.clone()),
            fs_root: self.config.allowed_root.clone(),
        };
        info!(mission_id = %contract.mission_id, level = %trigger.level, "mission queued");

        let agent = self.agent.clone();
        let approvals = self.approvals.clone();
        let tools = self.tools.clone();
        let clock = self.clock.clone();
        let outcome = self
            .queue
            .enqueue(actor, move || async move {
                let runner = MissionRunner {
                    agent: &*agent,
                    approvals: &*approvals,
                    tools: &tools,
                    clock: &*clock,
                };
                runner.run(&contract, &tool_ctx, Some(&context)).await
            })
            .await
            .with_context(|| format!("mission task for {actor} failed"))?;

        let shielded = self.shield.outbound(&outcome.summary);
        Ok(InboundReply::Mission(MissionReply {
            reply_text: format_reply(trigger.level, &shielded),
            level: trigger.level,
            warnings: shielded.warnings,
            injection_markers: admission.injection_markers,
            outcome,
        }))
    }
}

/// `[Auto-N Mission]` header, cleaned text, and a warnings line when any.
pub fn format_reply(level: AutonomyLevel, shielded: &ShieldedText) -> String {
    let mut reply = format!("[{} Mission]\n{}", level.label(), shielded.text);
    if !shielded.warnings.is_empty() {
        reply.push_str(&format!("\n(Warnings: {})", shielded.warnings.join(", ")));
    }
    reply
}
