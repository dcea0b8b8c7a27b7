use thiserror::Error;

use crate::flows::FlowTransitionError;
use crate::intake::parser::ParseError;
use crate::intake::validator::ValidationError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    FlowTransition(#[from] FlowTransitionError),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("session store failure: {0}")]
    SessionStore(String),
    #[error("oracle failure: {0}")]
    Oracle(String),
    #[error("delivery failure: {0}")]
    Delivery(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    /// Chat text shown when a turn fails outside the normal handler replies.
    pub fn user_message(&self) -> String {
        format!("❌ System Error: {self}")
    }

    /// Whether the failure invalidates the collected resources.
    pub fn resets_session(&self) -> bool {
        matches!(self, Self::Delivery(_))
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::resource::ResourceType;
    use crate::errors::{ApplicationError, DomainError};
    use crate::flows::{FlowTransitionError, IntakeState};
    use crate::intake::parser::ParseError;
    use crate::intake::validator::ValidationError;

    #[test]
    fn parse_error_message_passes_through_domain_error() {
        let error = DomainError::from(ParseError::FieldCountMismatch {
            expected: 2,
            actual: 1,
            fields: vec!["intake_id".to_owned(), "bucket_name".to_owned()],
        });

        assert_eq!(
            error.to_string(),
            "Expected 2 values but got 1.\nRequired fields: intake_id, bucket_name"
        );
    }

    #[test]
    fn validation_error_is_a_domain_error() {
        let error = ApplicationError::from(DomainError::from(ValidationError {
            resource_type: ResourceType::S3Bucket,
            violations: Vec::new(),
        }));

        assert!(matches!(error, ApplicationError::Domain(DomainError::Validation(_))));
        assert!(!error.resets_session());
    }

    #[test]
    fn system_error_message_wraps_the_cause() {
        let error = ApplicationError::Oracle("connection refused".to_owned());
        assert_eq!(error.user_message(), "❌ System Error: oracle failure: connection refused");
        assert!(!error.resets_session());
    }

    #[test]
    fn delivery_failures_reset_the_session() {
        assert!(ApplicationError::Delivery("push rejected".to_owned()).resets_session());

        let flow = ApplicationError::from(DomainError::from(
            FlowTransitionError::NothingCollected { state: IntakeState::Idle },
        ));
        assert!(!flow.resets_session());
    }
}
