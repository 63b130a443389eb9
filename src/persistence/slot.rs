//! Named snapshot slots.

use std::fmt;

/// One of the four persisted collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Customer accounts.
    Accounts,
    /// Plan catalog.
    Plans,
    /// Purchase requests.
    Purchases,
    /// Open sessions.
    Sessions,
}

impl Slot {
    /// Every slot, in rehydration order.
    pub const ALL: [Self; 4] = [Self::Accounts, Self::Plans, Self::Purchases, Self::Sessions];

    /// Storage key of the slot.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::Accounts => "accounts",
            Self::Plans => "plans",
            Self::Purchases => "purchases",
            Self::Sessions => "sessions",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
