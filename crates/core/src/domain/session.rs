use serde::{Deserialize, Serialize};

use crate::domain::resource::{ResourceRecord, ResourceType};
use crate::flows::states::IntakeState;

pub const DEFAULT_SESSION_ID: &str = "default";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl Default for SessionId {
    fn default() -> Self {
        Self(DEFAULT_SESSION_ID.to_owned())
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCounts {
    pub glue_dbs: usize,
    pub s3_buckets: usize,
    pub iam_roles: usize,
}

impl ResourceCounts {
    pub fn total(&self) -> usize {
        self.glue_dbs + self.s3_buckets + self.iam_roles
    }
}

/// Resources collected during one session, one ordered list per type.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceBatch {
    pub glue_dbs: Vec<ResourceRecord>,
    pub s3_buckets: Vec<ResourceRecord>,
    pub iam_roles: Vec<ResourceRecord>,
}

impl ResourceBatch {
    pub fn of_type(&self, resource_type: ResourceType) -> &[ResourceRecord] {
        match resource_type {
            ResourceType::GlueDb => &self.glue_dbs,
            ResourceType::S3Bucket => &self.s3_buckets,
            ResourceType::IamRole => &self.iam_roles,
        }
    }

    pub fn push(&mut self, record: ResourceRecord) {
        match record.resource_type {
            ResourceType::GlueDb => self.glue_dbs.push(record),
            ResourceType::S3Bucket => self.s3_buckets.push(record),
            ResourceType::IamRole => self.iam_roles.push(record),
        }
    }

    pub fn counts(&self) -> ResourceCounts {
        ResourceCounts {
            glue_dbs: self.glue_dbs.len(),
            s3_buckets: self.s3_buckets.len(),
            iam_roles: self.iam_roles.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.counts().total() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceRecord> {
        self.glue_dbs.iter().chain(self.s3_buckets.iter()).chain(self.iam_roles.iter())
    }
}

/// An open pull request that already exists for the source branch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrConflict {
    pub pr_number: u64,
    pub pr_url: String,
    pub pr_title: String,
    pub glue_count: usize,
    pub s3_count: usize,
    pub iam_count: usize,
}

impl PrConflict {
    pub fn new(pr_number: u64, pr_url: String, pr_title: String, counts: ResourceCounts) -> Self {
        Self {
            pr_number,
            pr_url,
            pr_title,
            glue_count: counts.glue_dbs,
            s3_count: counts.s3_buckets,
            iam_count: counts.iam_roles,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub state: IntakeState,
    pub resources: ResourceBatch,
    pub current_resource_type: Option<ResourceType>,
    pub pr_conflict: Option<PrConflict>,
    pub pending_pr_title: Option<String>,
}

impl Session {
    pub fn counts(&self) -> ResourceCounts {
        self.resources.counts()
    }

    /// Appends a validated record and clears the active resource type.
    pub fn accept_resource(&mut self, record: ResourceRecord) {
        self.resources.push(record);
        self.current_resource_type = None;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            state: self.state,
            resources: self.counts(),
            current_resource_type: self.current_resource_type,
            has_pr_conflict: self.pr_conflict.is_some(),
        }
    }
}

/// Redacted view of a session: counts and flags, never field values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub state: IntakeState,
    pub resources: ResourceCounts,
    pub current_resource_type: Option<ResourceType>,
    pub has_pr_conflict: bool,
}

#[cfg(test)]
mod tests {
    use crate::domain::resource::{ResourceRecord, ResourceType};
    use crate::domain::session::{PrConflict, Session};
    use crate::flows::states::IntakeState;

    fn record(resource_type: ResourceType, name: &str) -> ResourceRecord {
        ResourceRecord {
            resource_type,
            fields: [(resource_type.name_field(), name)].into_iter().collect(),
        }
    }

    #[test]
    fn accepting_a_resource_routes_it_by_type_and_clears_active_type() {
        let mut session = Session {
            current_resource_type: Some(ResourceType::S3Bucket),
            ..Session::default()
        };

        session.accept_resource(record(ResourceType::S3Bucket, "landing"));
        session.accept_resource(record(ResourceType::IamRole, "etl-role"));

        let counts = session.counts();
        assert_eq!((counts.glue_dbs, counts.s3_buckets, counts.iam_roles), (0, 1, 1));
        assert_eq!(session.current_resource_type, None);
        let names = session.resources.iter().map(ResourceRecord::name).collect::<Vec<_>>();
        assert_eq!(names, ["landing", "etl-role"]);
    }

    #[test]
    fn reset_is_idempotent() {
        let mut session = Session {
            state: IntakeState::PrConflict,
            pending_pr_title: Some("Add sales resources".to_owned()),
            pr_conflict: Some(PrConflict::new(
                7,
                "https://example.test/pull/7".to_owned(),
                "Existing".to_owned(),
                Default::default(),
            )),
            ..Session::default()
        };
        session.accept_resource(record(ResourceType::GlueDb, "sales"));

        session.reset();
        let once = session.clone();
        session.reset();

        assert_eq!(once, Session::default());
        assert_eq!(session, once);
    }

    #[test]
    fn summary_exposes_counts_only() {
        let mut session = Session::default();
        session.accept_resource(record(ResourceType::GlueDb, "sales"));
        let summary = session.summary();

        assert_eq!(summary.state, IntakeState::Idle);
        assert_eq!(summary.resources.total(), 1);
        assert!(!summary.has_pr_conflict);
        let json = serde_json::to_string(&summary).expect("serialize summary");
        assert!(!json.contains("sales"));
    }
}
