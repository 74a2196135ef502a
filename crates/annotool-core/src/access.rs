//! Access gate combining a resource's own access level with the caller's
//! capability on the owning video.
//!
//! The capability comes from the external video platform (see
//! [`crate::traits::VideoInterface`]); this module only combines it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::resource::{Access, Resource};

/// Permission a caller holds for a video, as reported by the video platform.
///
/// Variants are ordered from weakest to strongest.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Capability {
    /// The platform does not know the video
    NotFound,
    #[default]
    None,
    Annotate,
    Admin,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::None => write!(f, "NONE"),
            Self::Annotate => write!(f, "ANNOTATE"),
            Self::Admin => write!(f, "ADMIN"),
        }
    }
}

impl std::str::FromStr for Capability {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "NOT_FOUND" => Ok(Self::NotFound),
            "NONE" => Ok(Self::None),
            "ANNOTATE" => Ok(Self::Annotate),
            "ADMIN" => Ok(Self::Admin),
            _ => Err(format!("Invalid capability: {}", s)),
        }
    }
}

/// Decide whether `user_id`, holding `capability` on the owning video, may see
/// `resource`.
///
/// Public resources are always visible. Private and shared-with-admin
/// resources need an admin capability, or the caller must be the resource's
/// creator or last updater.
pub fn has_access(resource: &Resource, user_id: Uuid, capability: Capability) -> bool {
    match resource.access {
        Access::Public => true,
        Access::Private | Access::SharedWithAdmin => {
            capability >= Capability::Admin || resource.is_owned_by(user_id)
        }
    }
}
