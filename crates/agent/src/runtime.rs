use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use intake_core::domain::resource::ResourceType;
use intake_core::domain::session::{Session, SessionId, SessionSummary};
use intake_core::errors::{ApplicationError, DomainError};
use intake_core::flows::{
    FlowAction, FlowContext, FlowEngine, FlowTransitionError, IntakeEvent, IntakeFlow,
};
use intake_core::intake::classifier::is_descriptive_title;
use intake_core::intake::{
    classify, parse_fields, validate, ClassifierInput, ConflictChoice, Intent,
};
use intake_delivery::{ConflictResolver, DeliveryOutcome, PrOrchestrator, Resolution};
use intake_store::{SessionLocks, SessionStore, StoreError};

use crate::conversation;
use crate::guardrails::{GuardrailDecision, GuardrailPolicy};
use crate::llm::{ChatMessage, LlmClient};
use crate::prompts::oracle_messages;

/// Runs chat turns: classify the latest message, dispatch it, move the
/// session through the intake flow and answer with plain text.
pub struct IntakeRuntime {
    sessions: Arc<dyn SessionStore>,
    locks: SessionLocks,
    flow: FlowEngine<IntakeFlow>,
    oracle: Arc<dyn LlmClient>,
    orchestrator: Arc<PrOrchestrator>,
    resolver: ConflictResolver,
    guardrails: GuardrailPolicy,
}

impl IntakeRuntime {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        oracle: Arc<dyn LlmClient>,
        orchestrator: Arc<PrOrchestrator>,
    ) -> Self {
        Self {
            sessions,
            locks: SessionLocks::default(),
            flow: FlowEngine::default(),
            oracle,
            resolver: ConflictResolver::new(Arc::clone(&orchestrator)),
            orchestrator,
            guardrails: GuardrailPolicy::default(),
        }
    }

    pub fn with_guardrails(mut self, guardrails: GuardrailPolicy) -> Self {
        self.guardrails = guardrails;
        self
    }

    /// Answers the last message of `messages`. Never fails: errors become reply text.
    pub async fn handle_chat(&self, session_id: &SessionId, messages: &[ChatMessage]) -> String {
        let Some(latest) = messages.last() else {
            return conversation::welcome();
        };
        let correlation_id = Uuid::new_v4().to_string();
        let _turn = self.locks.acquire(session_id).await;

        match self.run_turn(session_id, latest.content.trim(), messages, &correlation_id).await {
            Ok(reply) => reply,
            Err(error) => {
                warn!(
                    event_name = "intake.turn.failed",
                    correlation_id = %correlation_id,
                    session_id = %session_id.0,
                    error = %error,
                    "chat turn failed"
                );
                if error.resets_session() {
                    if let Err(store_error) = self.sessions.delete(session_id).await {
                        warn!(
                            event_name = "intake.session.reset_failed",
                            session_id = %session_id.0,
                            error = %store_error
                        );
                    }
                }
                error.user_message()
            }
        }
    }

    /// Drops all state for the session. Unknown ids are fine.
    pub async fn reset(&self, session_id: &SessionId) -> Result<(), ApplicationError> {
        let _turn = self.locks.acquire(session_id).await;
        self.sessions.delete(session_id).await.map_err(store_failure)?;
        info!(event_name = "intake.session.reset", session_id = %session_id.0);
        Ok(())
    }

    pub async fn session_summary(
        &self,
        session_id: &SessionId,
    ) -> Result<SessionSummary, ApplicationError> {
        let session = self.sessions.get_or_default(session_id).await.map_err(store_failure)?;
        Ok(session.summary())
    }

    async fn run_turn(
        &self,
        session_id: &SessionId,
        text: &str,
        history: &[ChatMessage],
        correlation_id: &str,
    ) -> Result<String, ApplicationError> {
        let mut session = self.sessions.get_or_default(session_id).await.map_err(store_failure)?;
        let before = session.state;
        let intent = classify(
            text,
            ClassifierInput {
                state: session.state,
                current_resource_type: session.current_resource_type,
            },
        );
        info!(
            event_name = "intake.turn.received",
            correlation_id,
            session_id = %session_id.0,
            state = ?before,
            intent = intent_label(&intent)
        );

        let reply = match intent {
            Intent::ConflictChoice(choice) => self.on_conflict_choice(&mut session, choice).await?,
            Intent::PrTitle(title) => self.on_pr_title(&mut session, title).await?,
            Intent::StructuredData(resource_type) => {
                self.on_structured_data(&mut session, text, resource_type)?
            }
            Intent::Complete => self.on_complete(&mut session)?,
            Intent::ValidationHelp => conversation::validation_help(session.current_resource_type),
            Intent::Conversation => {
                self.on_conversation(&mut session, history, correlation_id).await?
            }
        };

        info!(
            event_name = "intake.turn.completed",
            correlation_id,
            session_id = %session_id.0,
            from = ?before,
            to = ?session.state,
            resources = session.counts().total()
        );
        self.persist(session_id, session).await?;
        Ok(reply)
    }

    fn on_structured_data(
        &self,
        session: &mut Session,
        text: &str,
        resource_type: ResourceType,
    ) -> Result<String, ApplicationError> {
        let fields = match parse_fields(text, resource_type) {
            Ok(fields) => fields,
            Err(error) => return Ok(conversation::parse_failed(&error)),
        };
        let record = match validate(&fields, resource_type) {
            Ok(record) => record,
            Err(error) => {
                info!(
                    event_name = "intake.resource.rejected",
                    resource_type = %resource_type,
                    fields = ?error.fields()
                );
                return Ok(conversation::validation_failed(&error));
            }
        };

        let name = record.name().to_string();
        session.accept_resource(record);
        self.transition(session, IntakeEvent::ResourceAccepted)?;
        info!(event_name = "intake.resource.accepted", resource_type = %resource_type, %name);
        Ok(conversation::resource_accepted(resource_type, &name))
    }

    fn on_complete(&self, session: &mut Session) -> Result<String, ApplicationError> {
        match self.apply_event(session, IntakeEvent::CompletionRequested) {
            Ok(()) => Ok(conversation::ask_for_title(session.counts())),
            Err(FlowTransitionError::NothingCollected { .. }) => {
                Ok(conversation::NOTHING_COLLECTED.to_string())
            }
            Err(error) => Err(flow_failure(error)),
        }
    }

    async fn on_pr_title(
        &self,
        session: &mut Session,
        title: String,
    ) -> Result<String, ApplicationError> {
        if !is_descriptive_title(&title) {
            self.transition(session, IntakeEvent::TitleRejected)?;
            return Ok(conversation::TITLE_TOO_SHORT.to_string());
        }

        let counts = session.counts();
        match self.orchestrator.submit(&session.resources, &title).await {
            DeliveryOutcome::Success { url, number } => {
                info!(event_name = "intake.pr.created", pr_number = number, %url);
                self.transition(session, IntakeEvent::PrOpened)?;
                Ok(conversation::pr_created(&title, &url, counts))
            }
            DeliveryOutcome::PrExists(conflict) => {
                info!(event_name = "intake.pr.conflict", pr_number = conflict.pr_number);
                let reply = conversation::pr_conflict(&conflict);
                session.pr_conflict = Some(conflict);
                session.pending_pr_title = Some(title);
                self.transition(session, IntakeEvent::PrConflictDetected)?;
                Ok(reply)
            }
            DeliveryOutcome::Failed(error) => {
                self.transition(session, IntakeEvent::DeliveryFailed)?;
                Ok(conversation::delivery_failed(&error))
            }
        }
    }

    async fn on_conflict_choice(
        &self,
        session: &mut Session,
        choice: Option<ConflictChoice>,
    ) -> Result<String, ApplicationError> {
        let Some(choice) = choice else {
            self.transition(session, IntakeEvent::ConflictChoiceUnclear)?;
            return Ok(conversation::CONFLICT_OPTIONS.to_string());
        };
        let conflict = session.pr_conflict.clone().ok_or_else(|| {
            ApplicationError::Delivery("pull request conflict details are missing".to_string())
        })?;
        let title = session.pending_pr_title.clone().unwrap_or_else(|| conflict.pr_title.clone());

        if choice == ConflictChoice::ReplaceExisting {
            self.transition(session, IntakeEvent::ReplaceChosen)?;
        }

        match self.resolver.resolve(choice, &conflict, &session.resources, &title).await {
            Resolution::Appended { conflict, comment_posted } => {
                self.transition(session, IntakeEvent::AppendChosen)?;
                Ok(conversation::appended(&conflict, comment_posted))
            }
            Resolution::Replaced { closed, url, counts, .. } => {
                self.transition(session, IntakeEvent::PrOpened)?;
                Ok(conversation::replaced(closed, &url, counts))
            }
            Resolution::CloseFailed { error, .. } => {
                self.transition(session, IntakeEvent::DeliveryFailed)?;
                Ok(conversation::close_failed(&error))
            }
            Resolution::ReplacementFailed { reason, .. } => {
                self.transition(session, IntakeEvent::DeliveryFailed)?;
                Ok(conversation::replacement_failed(&reason))
            }
        }
    }

    async fn on_conversation(
        &self,
        session: &mut Session,
        history: &[ChatMessage],
        correlation_id: &str,
    ) -> Result<String, ApplicationError> {
        let reply = self
            .oracle
            .complete(&oracle_messages(history))
            .await
            .map_err(|error| ApplicationError::Oracle(format!("{error:#}")))?;

        let detected = match self.guardrails.evaluate(&reply) {
            GuardrailDecision::Allow => {
                let detected = conversation::detect_resource_type(&reply);
                (reply, detected)
            }
            GuardrailDecision::Degrade { reason_code, user_message } => {
                warn!(event_name = "intake.guardrail.degraded", correlation_id, reason_code);
                (user_message, None)
            }
        };

        match detected {
            (reply, Some(resource_type)) => {
                self.transition(session, IntakeEvent::ResourceTypeDetected)?;
                session.current_resource_type = Some(resource_type);
                Ok(reply)
            }
            (reply, None) => {
                self.transition(session, IntakeEvent::ConversationContinued)?;
                Ok(reply)
            }
        }
    }

    fn apply_event(
        &self,
        session: &mut Session,
        event: IntakeEvent,
    ) -> Result<(), FlowTransitionError> {
        let context = FlowContext::with_collected(session.counts().total());
        let outcome = self.flow.apply(session.state, event, &context)?;
        session.state = outcome.to;
        if outcome.actions.contains(&FlowAction::ClearSession) {
            session.reset();
        }
        Ok(())
    }

    fn transition(
        &self,
        session: &mut Session,
        event: IntakeEvent,
    ) -> Result<(), ApplicationError> {
        self.apply_event(session, event).map_err(flow_failure)
    }

    async fn persist(
        &self,
        session_id: &SessionId,
        session: Session,
    ) -> Result<(), ApplicationError> {
        let result = if session == Session::default() {
            self.sessions.delete(session_id).await
        } else {
            self.sessions.put(session_id, session).await
        };
        result.map_err(store_failure)
    }
}

fn intent_label(intent: &Intent) -> &'static str {
    match intent {
        Intent::ConflictChoice(_) => "conflict_choice",
        Intent::PrTitle(_) => "pr_title",
        Intent::StructuredData(_) => "structured_data",
        Intent::Complete => "complete",
        Intent::ValidationHelp => "validation_help",
        Intent::Conversation => "conversation",
    }
}

fn flow_failure(error: FlowTransitionError) -> ApplicationError {
    DomainError::from(error).into()
}

fn store_failure(error: StoreError) -> ApplicationError {
    ApplicationError::SessionStore(error.to_string())
}
