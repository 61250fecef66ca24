//! Identifier newtypes.
//!
//! Project, column and task ids are assigned by the server and are opaque
//! strings. Records created optimistically carry a temporary id until the
//! server's response replaces it. Client mutation ids are ULIDs generated
//! locally.

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Prefix marking a client-assigned placeholder id
const TEMPORARY_PREFIX: &str = "tmp-";

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing id string
            pub fn from_string(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// A placeholder id for a record the server has not assigned yet
            pub fn temporary() -> Self {
                Self(format!("{}{}", TEMPORARY_PREFIX, Ulid::new().to_string().to_lowercase()))
            }

            /// Whether this is a client-side placeholder
            pub fn is_temporary(&self) -> bool {
                self.0.starts_with(TEMPORARY_PREFIX)
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

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identity of a project; boards are 1:1 with projects
    ProjectId
);
string_id!(
    /// Identity of a column on a board
    ColumnId
);
string_id!(
    /// Identity of a task card
    TaskId
);

/// Correlates an optimistic local mutation with its response and its echo on
/// the real-time channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientMutationId(Ulid);

impl ClientMutationId {
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl fmt::Display for ClientMutationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ClientMutationId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Ulid::from_string(s)?))
    }
}

impl Default for ClientMutationId {
    fn default() -> Self {
        Self::new()
    }
}
