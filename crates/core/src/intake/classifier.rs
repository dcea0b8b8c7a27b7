use crate::domain::resource::ResourceType;
use crate::flows::states::IntakeState;

pub const MIN_STRUCTURED_LEN: usize = 40;
pub const MIN_TITLE_WORDS: usize = 3;

const QUESTION_MARKERS: [&str; 6] = ["what", "how", "which", "prefer", "?", "format"];
const COMPLETION_KEYWORDS: [&str; 3] = ["done", "create pr", "finish"];
const APPEND_KEYWORDS: [&str; 5] = ["add", "existing", "option 1", "1", "keep"];
const REPLACE_KEYWORDS: [&str; 5] = ["close", "new", "option 2", "2", "fresh"];
const VALIDATION_HELP: &str = "validation help";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConflictChoice {
    AppendToExisting,
    ReplaceExisting,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Intent {
    ConflictChoice(Option<ConflictChoice>),
    PrTitle(String),
    StructuredData(ResourceType),
    Complete,
    ValidationHelp,
    Conversation,
}

/// The parts of a session the classifier looks at.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClassifierInput {
    pub state: IntakeState,
    pub current_resource_type: Option<ResourceType>,
}

/// Maps one user message to exactly one intent. Rules apply in priority order.
pub fn classify(text: &str, input: ClassifierInput) -> Intent {
    let text = text.trim();
    let lower = text.to_lowercase();

    if input.state == IntakeState::PrConflict {
        return Intent::ConflictChoice(parse_conflict_choice(&lower));
    }

    if input.state == IntakeState::AwaitingPrTitle {
        return Intent::PrTitle(text.to_owned());
    }

    if let Some(resource_type) = input.current_resource_type {
        if looks_structured(text, &lower) {
            return Intent::StructuredData(resource_type);
        }
    }

    if is_completion(&lower) {
        return Intent::Complete;
    }

    if lower.contains(VALIDATION_HELP) {
        return Intent::ValidationHelp;
    }

    Intent::Conversation
}

pub fn parse_conflict_choice(lower: &str) -> Option<ConflictChoice> {
    if APPEND_KEYWORDS.iter().any(|keyword| lower.contains(keyword)) {
        Some(ConflictChoice::AppendToExisting)
    } else if REPLACE_KEYWORDS.iter().any(|keyword| lower.contains(keyword)) {
        Some(ConflictChoice::ReplaceExisting)
    } else {
        None
    }
}

fn looks_structured(text: &str, lower: &str) -> bool {
    let has_separators = text.contains(',') || (text.contains(':') && text.contains('\n'));
    let is_substantial = text.chars().count() > MIN_STRUCTURED_LEN;
    let is_question = QUESTION_MARKERS.iter().any(|marker| lower.contains(marker));
    has_separators && is_substantial && !is_question
}

fn is_completion(lower: &str) -> bool {
    COMPLETION_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
        || (lower.contains("no") && lower.contains("more"))
}

pub fn is_descriptive_title(title: &str) -> bool {
    title.split_whitespace().count() >= MIN_TITLE_WORDS
}

#[cfg(test)]
mod tests {
    use crate::domain::resource::ResourceType;
    use crate::flows::states::IntakeState;
    use crate::intake::classifier::{
        classify, is_descriptive_title, ClassifierInput, ConflictChoice, Intent,
    };

    const GLUE_LINE: &str = "M1, sales_db, s3://bucket/sales, Sales data, 123456789012, crm, \
                             sales, latam, us-east-1, source, dev, raw, Jane, j@x.com, jane";

    fn input(state: IntakeState, current_resource_type: Option<ResourceType>) -> ClassifierInput {
        ClassifierInput { state, current_resource_type }
    }

    #[test]
    fn conflict_state_takes_priority_over_everything() {
        let conflict = input(IntakeState::PrConflict, Some(ResourceType::GlueDb));

        assert_eq!(
            classify("1", conflict),
            Intent::ConflictChoice(Some(ConflictChoice::AppendToExisting))
        );
        assert_eq!(
            classify("close and create new", conflict),
            Intent::ConflictChoice(Some(ConflictChoice::ReplaceExisting))
        );
        assert_eq!(
            classify("Option 2", conflict),
            Intent::ConflictChoice(Some(ConflictChoice::ReplaceExisting))
        );
        assert_eq!(classify("done", conflict), Intent::ConflictChoice(None));
        assert_eq!(
            classify(GLUE_LINE, conflict),
            Intent::ConflictChoice(Some(ConflictChoice::AppendToExisting))
        );
    }

    #[test]
    fn awaiting_title_treats_any_text_as_title() {
        let awaiting = input(IntakeState::AwaitingPrTitle, None);
        assert_eq!(
            classify("  Add sales analytics resources  ", awaiting),
            Intent::PrTitle("Add sales analytics resources".to_owned())
        );
        assert_eq!(classify("done", awaiting), Intent::PrTitle("done".to_owned()));
    }

    #[test]
    fn structured_data_requires_active_resource_type() {
        let collecting = input(IntakeState::CollectingData, Some(ResourceType::GlueDb));
        assert_eq!(classify(GLUE_LINE, collecting), Intent::StructuredData(ResourceType::GlueDb));

        let idle = input(IntakeState::Idle, None);
        assert_eq!(classify(GLUE_LINE, idle), Intent::Conversation);
    }

    #[test]
    fn multiline_colon_input_is_structured() {
        let text = "intake_id: M1\nbucket_name: landing\nbucket_description: raw zone";
        let collecting = input(IntakeState::CollectingData, Some(ResourceType::S3Bucket));
        assert_eq!(classify(text, collecting), Intent::StructuredData(ResourceType::S3Bucket));
    }

    #[test]
    fn short_or_question_like_text_is_not_structured() {
        let collecting = input(IntakeState::CollectingData, Some(ResourceType::GlueDb));
        assert_eq!(classify("a, b, c", collecting), Intent::Conversation);
        assert_eq!(
            classify("which fields, in what order, do you need for the database?", collecting),
            Intent::Conversation
        );
        assert_eq!(
            classify("can you show me the format, with all fields listed please", collecting),
            Intent::Conversation
        );
    }

    #[test]
    fn completion_keywords_are_detected() {
        let idle = input(IntakeState::AwaitingMoreResources, None);
        for text in ["done", "Let's create PR", "finish up", "no, nothing more"] {
            assert_eq!(classify(text, idle), Intent::Complete, "{text}");
        }
        assert_eq!(classify("I want a glue database", idle), Intent::Conversation);
    }

    #[test]
    fn ambiguous_text_prefers_structured_only_with_active_type() {
        let text = "done: M1, sales_db, s3://bucket/sales, Sales data, 123456789012";
        let active = input(IntakeState::CollectingData, Some(ResourceType::GlueDb));
        let inactive = input(IntakeState::AwaitingMoreResources, None);

        assert_eq!(classify(text, active), Intent::StructuredData(ResourceType::GlueDb));
        assert_eq!(classify(text, inactive), Intent::Complete);
    }

    #[test]
    fn validation_help_is_recognized() {
        let collecting = input(IntakeState::CollectingData, Some(ResourceType::GlueDb));
        assert_eq!(classify("validation help", collecting), Intent::ValidationHelp);
    }

    #[test]
    fn titles_need_three_words() {
        assert!(is_descriptive_title("Add sales resources"));
        assert!(!is_descriptive_title("Add resources"));
        assert!(!is_descriptive_title("   "));
    }
}
