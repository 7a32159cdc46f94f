use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the registry subject for a record is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectNameStrategy {
    /// `{topic}-value` or `{topic}-key`.
    #[default]
    TopicName,
    /// The record's full name.
    RecordName,
    /// `{topic}-{record full name}`.
    TopicRecordName,
}

impl SubjectNameStrategy {
    pub fn subject_name(&self, topic: &str, is_key: bool, record_name: &str) -> String {
        match self {
            SubjectNameStrategy::TopicName => {
                let suffix = if is_key { "key" } else { "value" };
                format!("{}-{}", topic, suffix)
            }
            SubjectNameStrategy::RecordName => record_name.to_string(),
            SubjectNameStrategy::TopicRecordName => format!("{}-{}", topic, record_name),
        }
    }
}

/// Returned when a strategy name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStrategy(pub String);

impl fmt::Display for UnknownStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown subject name strategy '{}'", self.0)
    }
}

impl std::error::Error for UnknownStrategy {}

impl FromStr for SubjectNameStrategy {
    type Err = UnknownStrategy;

    /// Accepts snake case names as well as Confluent strategy class names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let simple = s.rsplit('.').next().unwrap_or(s);
        match simple {
            "topic_name" | "TopicNameStrategy" => Ok(SubjectNameStrategy::TopicName),
            "record_name" | "RecordNameStrategy" => Ok(SubjectNameStrategy::RecordName),
            "topic_record_name" | "TopicRecordNameStrategy" => {
                Ok(SubjectNameStrategy::TopicRecordName)
            }
            _ => Err(UnknownStrategy(s.to_string())),
        }
    }
}
