use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntakeState {
    #[default]
    Idle,
    CollectingResourceType,
    CollectingData,
    AwaitingMoreResources,
    AwaitingPrTitle,
    PrCreated,
    PrConflict,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntakeEvent {
    ConversationContinued,
    ResourceTypeDetected,
    ResourceAccepted,
    CompletionRequested,
    TitleRejected,
    PrOpened,
    PrConflictDetected,
    ConflictChoiceUnclear,
    AppendChosen,
    ReplaceChosen,
    DeliveryFailed,
    SessionReset,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FlowContext {
    pub collected_resources: usize,
}

impl FlowContext {
    pub fn with_collected(collected_resources: usize) -> Self {
        Self { collected_resources }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowAction {
    PromptForResourceType,
    PromptForFields,
    PromptForMoreResources,
    PromptForPrTitle,
    PromptForConflictChoice,
    CommentOnExistingPullRequest,
    CloseExistingPullRequest,
    ResubmitPendingTitle,
    ClearSession,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: IntakeState,
    pub to: IntakeState,
    pub event: IntakeEvent,
    pub actions: Vec<FlowAction>,
}
