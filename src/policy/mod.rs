//! Ownership policy for owned resources.
//!
//! Every mutating request on a bootcamp (and, through its parent, on a course)
//! is decided here. The functions are pure: they never touch the store, never
//! log, and return a [`Decision`] value instead of an error so handlers can
//! inspect the reason and shape the response themselves.
//!
//! Two rules are enforced:
//! - mutation requires the requester to be the owner or an admin
//! - a non-admin may own at most one bootcamp at a time

pub mod creation_lock;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::types::UnknownVariant;

pub use creation_lock::CreationLocks;

/// Coarse permission tier carried by every principal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownVariant::new("role", other)),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated identity behind a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
}

impl Principal {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// A resource with a single designated owner.
///
/// `owner_id` returns `None` when the owner is missing (for example the owning
/// user was deleted); the policy treats that as a denial for everybody.
pub trait OwnedResource {
    fn resource_id(&self) -> Uuid;
    fn owner_id(&self) -> Option<Uuid>;
}

/// Ownership view of a dependent resource: it carries its own id but the
/// owner of the parent it references. A parent that cannot be resolved leaves
/// the owner empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InheritedOwnership {
    pub resource_id: Uuid,
    pub owner: Option<Uuid>,
}

impl InheritedOwnership {
    pub fn through<P: OwnedResource>(resource_id: Uuid, parent: Option<&P>) -> Self {
        Self {
            resource_id,
            owner: parent.and_then(|p| p.owner_id()),
        }
    }
}

impl OwnedResource for InheritedOwnership {
    fn resource_id(&self) -> Uuid {
        self.resource_id
    }

    fn owner_id(&self) -> Option<Uuid> {
        self.owner
    }
}

/// Why a request was denied. The ids are informational only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    NotOwnerOrAdmin { resource_id: Uuid, requester_id: Uuid },
    OwnerUnknown { resource_id: Uuid },
    AlreadyPublished { requester_id: Uuid },
}

impl DenyReason {
    pub fn code(&self) -> &'static str {
        match self {
            DenyReason::NotOwnerOrAdmin { .. } => "NotOwnerOrAdmin",
            DenyReason::OwnerUnknown { .. } => "OwnerUnknown",
            DenyReason::AlreadyPublished { .. } => "AlreadyPublished",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::NotOwnerOrAdmin { resource_id, requester_id } => write!(
                f,
                "user {} is neither the owner of {} nor an admin",
                requester_id, resource_id
            ),
            DenyReason::OwnerUnknown { resource_id } => {
                write!(f, "resource {} has no resolvable owner", resource_id)
            }
            DenyReason::AlreadyPublished { requester_id } => {
                write!(f, "the user with ID {} has already published a bootcamp", requester_id)
            }
        }
    }
}

/// Outcome of an authorization check
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny { reason: DenyReason },
}

impl Decision {
    fn deny(reason: DenyReason) -> Self {
        Decision::Deny { reason }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn reason(&self) -> Option<&DenyReason> {
        match self {
            Decision::Allow => None,
            Decision::Deny { reason } => Some(reason),
        }
    }
}

/// Decide whether `principal` may update, delete or attach a photo to `resource`.
///
/// The resource must already be resolved; a missing resource is the caller's
/// NotFound and never reaches this function.
pub fn authorize_mutation<R: OwnedResource + ?Sized>(principal: &Principal, resource: &R) -> Decision {
    let Some(owner) = resource.owner_id() else {
        return Decision::deny(DenyReason::OwnerUnknown {
            resource_id: resource.resource_id(),
        });
    };

    if principal.is_admin() || principal.id == owner {
        Decision::Allow
    } else {
        Decision::deny(DenyReason::NotOwnerOrAdmin {
            resource_id: resource.resource_id(),
            requester_id: principal.id,
        })
    }
}

/// Decide whether `principal` may create another owned resource, given the
/// result of looking up the one it already owns. Admins are never capped.
pub fn authorize_creation<R: OwnedResource>(principal: &Principal, existing: Option<&R>) -> Decision {
    match existing {
        Some(_) if !principal.is_admin() => Decision::deny(DenyReason::AlreadyPublished {
            requester_id: principal.id,
        }),
        _ => Decision::Allow,
    }
}
