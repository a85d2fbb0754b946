// src/model/ids.rs

//! Opaque identifier newtypes.
//!
//! Identity never depends on list position: every node, dependency and
//! project is addressed by one of these ids.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Project (schedule aggregate) identifier.
    ProjectId
);

string_id!(
    /// Identifier of an activity node within one project.
    ActivityId
);

string_id!(
    /// Identifier of a reusable activity definition in the catalog.
    CatalogActivityId
);

string_id!(
    /// Identifier of an external dependency attached to an activity.
    DependencyId
);

string_id!(
    /// Resource role or equipment type (e.g. `surveyor`, `crane`).
    ResourceRole
);

impl ActivityId {
    /// Fresh random id for activities attached ad hoc.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}
