pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod intake;

pub use domain::resource::{FieldMap, ResourceRecord, ResourceType};
pub use domain::session::{
    PrConflict, ResourceBatch, ResourceCounts, Session, SessionId, SessionSummary,
};
pub use errors::{ApplicationError, DomainError};
pub use flows::{FlowEngine, FlowTransitionError, IntakeEvent, IntakeFlow, IntakeState};
pub use intake::{classify, parse_fields, validate, ClassifierInput, ConflictChoice, Intent};
