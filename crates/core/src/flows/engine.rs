use thiserror::Error;

use crate::flows::states::{FlowAction, FlowContext, IntakeEvent, IntakeState, TransitionOutcome};

pub trait FlowDefinition {
    fn initial_state(&self) -> IntakeState;
    fn transition(
        &self,
        current: IntakeState,
        event: IntakeEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>;
}

#[derive(Clone, Debug, Default)]
pub struct IntakeFlow;

impl FlowDefinition for IntakeFlow {
    fn initial_state(&self) -> IntakeState {
        IntakeState::Idle
    }

    fn transition(
        &self,
        current: IntakeState,
        event: IntakeEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition_intake(current, event, context)
    }
}

pub struct FlowEngine<F> {
    flow: F,
}

impl<F> FlowEngine<F>
where
    F: FlowDefinition,
{
    pub fn new(flow: F) -> Self {
        Self { flow }
    }

    pub fn initial_state(&self) -> IntakeState {
        self.flow.initial_state()
    }

    pub fn apply(
        &self,
        current: IntakeState,
        event: IntakeEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        self.flow.transition(current, event, context)
    }
}

impl Default for FlowEngine<IntakeFlow> {
    fn default() -> Self {
        Self::new(IntakeFlow)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("no resources collected before completion was requested in {state:?}")]
    NothingCollected { state: IntakeState },
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: IntakeState, event: IntakeEvent },
}

fn transition_intake(
    current: IntakeState,
    event: IntakeEvent,
    context: &FlowContext,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use FlowAction::{
        ClearSession, CloseExistingPullRequest, CommentOnExistingPullRequest,
        PromptForConflictChoice, PromptForFields, PromptForMoreResources, PromptForPrTitle,
        PromptForResourceType, ResubmitPendingTitle,
    };
    use IntakeEvent::{
        AppendChosen, CompletionRequested, ConflictChoiceUnclear, ConversationContinued,
        DeliveryFailed, PrConflictDetected, PrOpened, ReplaceChosen, ResourceAccepted,
        ResourceTypeDetected, SessionReset, TitleRejected,
    };
    use IntakeState::{
        AwaitingMoreResources, AwaitingPrTitle, CollectingData, CollectingResourceType, Idle,
        PrConflict, PrCreated,
    };

    let (to, actions) = match (current, event) {
        (_, SessionReset) => (Idle, vec![ClearSession]),
        (Idle | CollectingResourceType, ConversationContinued) => {
            (CollectingResourceType, vec![PromptForResourceType])
        }
        (CollectingData | AwaitingMoreResources, ConversationContinued) => (current, Vec::new()),
        (
            Idle | CollectingResourceType | CollectingData | AwaitingMoreResources,
            ResourceTypeDetected,
        ) => (CollectingData, vec![PromptForFields]),
        (CollectingData, ResourceAccepted) => (AwaitingMoreResources, vec![PromptForMoreResources]),
        (
            Idle | CollectingResourceType | CollectingData | AwaitingMoreResources,
            CompletionRequested,
        ) => {
            if context.collected_resources == 0 {
                return Err(FlowTransitionError::NothingCollected { state: current });
            }
            (AwaitingPrTitle, vec![PromptForPrTitle])
        }
        (AwaitingPrTitle, TitleRejected) => (AwaitingPrTitle, vec![PromptForPrTitle]),
        (AwaitingPrTitle, PrOpened) => (PrCreated, vec![ClearSession]),
        (AwaitingPrTitle, PrConflictDetected) => (PrConflict, vec![PromptForConflictChoice]),
        (PrConflict, ConflictChoiceUnclear) => (PrConflict, vec![PromptForConflictChoice]),
        (PrConflict, AppendChosen) => {
            (PrCreated, vec![CommentOnExistingPullRequest, ClearSession])
        }
        (PrConflict, ReplaceChosen) => {
            (AwaitingPrTitle, vec![CloseExistingPullRequest, ResubmitPendingTitle])
        }
        (AwaitingPrTitle | PrConflict, DeliveryFailed) => (Idle, vec![ClearSession]),
        _ => {
            return Err(FlowTransitionError::InvalidTransition { state: current, event });
        }
    };

    Ok(TransitionOutcome { from: current, to, event, actions })
}
