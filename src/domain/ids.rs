//! Type-safe entity identifiers and session tokens.
//!
//! Every persisted entity gets its own newtype around [`uuid::Uuid`] (v4)
//! so an account id can never be passed where a plan id is expected.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Creates a new random identifier (UUID v4).
            #[must_use]
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Creates an identifier from an existing [`uuid::Uuid`].
            #[must_use]
            pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner [`uuid::Uuid`].
            #[must_use]
            pub const fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<uuid::Uuid> for $name {
            fn from(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for uuid::Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(
    /// Unique identifier of an [`super::Account`].
    AccountId
);

define_id!(
    /// Unique identifier of a [`super::Plan`].
    PlanId
);

define_id!(
    /// Unique identifier of a [`super::PurchaseRequest`].
    PurchaseId
);

define_id!(
    /// Unique identifier of a [`super::GenerationJob`].
    JobId
);

/// Opaque bearer token naming a [`super::Session`].
///
/// 64 lowercase hex characters drawn from two v4 UUIDs. `Debug` only shows
/// a short prefix so tokens do not end up in logs.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Generates a fresh random token.
    #[must_use]
    pub fn generate() -> Self {
        let a = uuid::Uuid::new_v4().simple();
        let b = uuid::Uuid::new_v4().simple();
        Self(format!("{a}{b}"))
    }

    /// Wraps a token string received from a client.
    #[must_use]
    pub fn from_string(token: String) -> Self {
        Self(token)
    }

    /// Returns the token as sent to clients.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(6).collect();
        write!(f, "SessionToken({prefix}…)")
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn new_generates_unique_ids() {
        assert_ne!(AccountId::new(), AccountId::new());
        assert_ne!(JobId::default(), JobId::default());
    }

    #[test]
    fn display_is_uuid_format() {
        let id = PlanId::new();
        let s = id.to_string();
        assert_eq!(s.len(), 36);
        assert!(s.contains('-'));
    }

    #[test]
    fn serde_is_transparent() {
        let uuid = uuid::Uuid::new_v4();
        let id = PurchaseId::from_uuid(uuid);
        let Ok(json) = serde_json::to_string(&id) else {
            panic!("serialization failed");
        };
        assert_eq!(json, format!("\"{uuid}\""));
        let Ok(back) = serde_json::from_str::<PurchaseId>(&json) else {
            panic!("deserialization failed");
        };
        assert_eq!(*back.as_uuid(), uuid);
    }

    #[test]
    fn session_tokens_are_long_and_unique() {
        let a = SessionToken::generate();
        let b = SessionToken::generate();
        assert_eq!(a.as_str().len(), 64);
        assert_ne!(a, b);
    }

    #[test]
    fn session_token_debug_is_truncated() {
        let token = SessionToken::generate();
        let rendered = format!("{token:?}");
        assert!(!rendered.contains(token.as_str()));
    }
}
