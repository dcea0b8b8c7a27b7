//! Intake agent: the conversational layer of the intake assistant.
//!
//! Each chat turn is classified deterministically (`intake_core::intake`).
//! Structured data, completion, titles and conflict choices never reach the
//! language model; only free conversation does, and its replies pass the
//! [`guardrails`] before the user sees them.
//!
//! # Key Types
//!
//! - `IntakeRuntime` - per-turn orchestration (see `runtime` module)
//! - `LlmClient` - pluggable chat-completion oracle, `GroqClient` for production
//! - `GuardrailPolicy` - blocks fabricated pull-request links and claims
//!
//! The model only collects information. Pull requests exist once the
//! delivery layer reports them, never because the model said so.

pub mod conversation;
pub mod guardrails;
pub mod llm;
pub mod prompts;
pub mod runtime;

pub use guardrails::{GuardrailDecision, GuardrailPolicy};
pub use llm::{ChatMessage, GroqClient, LlmClient};
pub use runtime::IntakeRuntime;
