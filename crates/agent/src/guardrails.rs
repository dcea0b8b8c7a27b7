//! Screens oracle replies before they reach the user. The oracle only collects
//! information; pull requests exist only once the backend reports them.

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailDecision {
    Allow,
    Degrade { reason_code: &'static str, user_message: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuardrailPolicy {
    pub block_pull_request_links: bool,
    pub block_creation_claims: bool,
}

impl Default for GuardrailPolicy {
    fn default() -> Self {
        Self { block_pull_request_links: true, block_creation_claims: true }
    }
}

const CREATION_CLAIMS: [&str; 7] = [
    "pr created",
    "pr has been created",
    "pull request created",
    "pull request has been created",
    "created the pr",
    "created the pull request",
    "pr is now open",
];

const SAFE_REPLY: &str = "I can only collect resource details. The pull request is opened by \
                          the backend once you type **'done'** and give it a title.\n\n\
                          Which resource would you like to add: a Glue Database, an S3 Bucket \
                          or an IAM Role?";

impl GuardrailPolicy {
    pub fn evaluate(&self, reply: &str) -> GuardrailDecision {
        let lower = reply.to_lowercase();

        if self.block_pull_request_links && mentions_pull_request_link(&lower) {
            return GuardrailDecision::Degrade {
                reason_code: "fabricated_pull_request_link",
                user_message: SAFE_REPLY.to_string(),
            };
        }

        if self.block_creation_claims && CREATION_CLAIMS.iter().any(|claim| lower.contains(claim)) {
            return GuardrailDecision::Degrade {
                reason_code: "pull_request_creation_claim",
                user_message: SAFE_REPLY.to_string(),
            };
        }

        GuardrailDecision::Allow
    }
}

fn mentions_pull_request_link(lower: &str) -> bool {
    let has_pull_path = lower.match_indices("/pull/").any(|(index, matched)| {
        lower[index + matched.len()..].starts_with(|ch: char| ch.is_ascii_digit())
    });
    has_pull_path || (lower.contains("github.com/") && lower.contains("/pull"))
}
