/// Shared types used across the codebase

use serde::{Deserialize, Serialize};

/// Mutating operations gated by the ownership policy.
/// Used by handlers to phrase denials and by the policy for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Create,
    Update,
    Delete,
    Upload, // Photo association, authorized exactly like Update
}

impl Operation {
    pub fn verb(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Upload => "upload a photo for",
        }
    }
}

/// Kinds of resource exposed by the API, used in messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceKind {
    Bootcamp,
    Course,
    User,
}

impl ResourceKind {
    pub fn name(&self) -> &'static str {
        match self {
            ResourceKind::Bootcamp => "bootcamp",
            ResourceKind::Course => "course",
            ResourceKind::User => "user",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ResourceKind::Bootcamp => "Bootcamp",
            ResourceKind::Course => "Course",
            ResourceKind::User => "User",
        }
    }
}

/// A string that does not name any variant of a closed set (role, skill, ...)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self { kind, value: value.into() }
    }
}
