use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const GLUE_DB_FIELDS: [&str; 15] = [
    "intake_id",
    "database_name",
    "database_s3_location",
    "database_description",
    "aws_account_id",
    "source_name",
    "enterprise_or_func_name",
    "enterprise_or_func_subgrp_name",
    "region",
    "data_construct",
    "data_env",
    "data_layer",
    "data_leader",
    "data_owner_email",
    "data_owner_github_uname",
];

pub const S3_BUCKET_FIELDS: [&str; 7] = [
    "intake_id",
    "bucket_name",
    "bucket_description",
    "aws_account_id",
    "aws_region",
    "usage_type",
    "enterprise_or_func_name",
];

pub const IAM_ROLE_FIELDS: [&str; 12] = [
    "intake_id",
    "role_name",
    "role_description",
    "aws_account_id",
    "enterprise_or_func_name",
    "enterprise_or_func_subgrp_name",
    "role_owner",
    "data_env",
    "usage_type",
    "compute_size",
    "max_session_duration",
    "access_to_resources",
];

pub const IAM_OPTIONAL_FIELDS: [&str; 3] = ["glue_crawler", "glue_job_access_configs", "athena"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    GlueDb,
    S3Bucket,
    IamRole,
}

impl ResourceType {
    pub const ALL: [ResourceType; 3] = [Self::GlueDb, Self::S3Bucket, Self::IamRole];

    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            Self::GlueDb => &GLUE_DB_FIELDS,
            Self::S3Bucket => &S3_BUCKET_FIELDS,
            Self::IamRole => &IAM_ROLE_FIELDS,
        }
    }

    pub fn optional_fields(self) -> &'static [&'static str] {
        match self {
            Self::IamRole => &IAM_OPTIONAL_FIELDS,
            Self::GlueDb | Self::S3Bucket => &[],
        }
    }

    /// Field whose value names the generated artifact file.
    pub fn name_field(self) -> &'static str {
        match self {
            Self::GlueDb => "database_name",
            Self::S3Bucket => "bucket_name",
            Self::IamRole => "role_name",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::GlueDb => "Glue Database",
            Self::S3Bucket => "S3 Bucket",
            Self::IamRole => "IAM Role",
        }
    }

    /// Subdirectory of the artifact root holding this type's files.
    pub fn artifact_dir(self) -> &'static str {
        match self {
            Self::GlueDb => "glue_databases",
            Self::S3Bucket => "s3_buckets",
            Self::IamRole => "iam_roles",
        }
    }

    /// Value of the `resource_type` tag written at the top of each artifact.
    pub fn artifact_tag(self) -> &'static str {
        match self {
            Self::GlueDb => "glue_database",
            Self::S3Bucket => "s3_bucket",
            Self::IamRole => "iam_role",
        }
    }

    pub fn from_artifact_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|resource_type| resource_type.artifact_tag() == tag)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = match self {
            Self::GlueDb => "glue_db",
            Self::S3Bucket => "s3_bucket",
            Self::IamRole => "iam_role",
        };
        f.write_str(key)
    }
}

/// Field-name to value mapping that keeps insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldMap {
    entries: Vec<(String, String)>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value. Re-inserting an existing key replaces the value in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.iter().find(|(existing, _)| existing == key).map(|(_, value)| value.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for FieldMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl Serialize for FieldMap {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FieldMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct FieldMapVisitor;

        impl<'de> Visitor<'de> for FieldMapVisitor {
            type Value = FieldMap;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a mapping of field names to string values")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut map = FieldMap::new();
                while let Some((key, value)) = access.next_entry::<String, String>()? {
                    map.insert(key, value);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(FieldMapVisitor)
    }
}

/// A validated resource, ready to be appended to a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub resource_type: ResourceType,
    pub fields: FieldMap,
}

impl ResourceRecord {
    pub fn name(&self) -> &str {
        self.fields.get(self.resource_type.name_field()).unwrap_or_default()
    }
}
