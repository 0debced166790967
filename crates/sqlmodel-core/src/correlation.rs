//! Correlation identifiers.
//!
//! Every logical connection, command and transaction gets a v4 UUID when it is
//! created. The id stays the same for the lifetime of the instance, so an
//! interceptor can match a "starting" event to the "ending" event that is
//! emitted later for the same instance.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! correlation_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh random id.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// The underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
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
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

correlation_id!(
    /// Identifies one logical database connection.
    ConnectionId
);
correlation_id!(
    /// Identifies one command instance.
    CommandId
);
correlation_id!(
    /// Identifies one transaction instance.
    TransactionId
);

/// Identifies the logical scope (session / unit of work) that owns an event.
///
/// `lease` distinguishes reuses of the same scope instance, e.g. when sessions
/// are pooled and handed out again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextId {
    pub instance_id: Uuid,
    pub lease: u32,
}

impl ContextId {
    /// A new scope instance on its first lease.
    #[must_use]
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4(),
            lease: 0,
        }
    }

    /// The same instance handed out again.
    #[must_use]
    pub const fn next_lease(self) -> Self {
        Self {
            instance_id: self.instance_id,
            lease: self.lease.wrapping_add(1),
        }
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.instance_id, self.lease)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_stable() {
        let a = CommandId::new();
        let b = CommandId::new();
        assert_ne!(a, b);

        let copy = a;
        assert_eq!(a, copy);
        assert_eq!(a.to_string(), copy.as_uuid().to_string());
    }

    #[test]
    fn context_lease_keeps_instance() {
        let ctx = ContextId::new();
        let next = ctx.next_lease();
        assert_eq!(ctx.instance_id, next.instance_id);
        assert_eq!(next.lease, 1);
        assert!(next.to_string().ends_with(":1"));
    }
}
