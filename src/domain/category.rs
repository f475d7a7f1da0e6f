//! Category entity and the polymorphic category reference.
//!
//! A transaction points at either a shared system category or a category the
//! user created. The two are resolved through a single repository contract
//! (`ports::CategoryRepository`), so validation downstream never branches on
//! which kind it got.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::TransactionType;

/// Reference to a category, resolved once at the repository boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "id", rename_all = "snake_case")]
pub enum CategoryRef {
    System(Uuid),
    UserOwned(Uuid),
}

impl CategoryRef {
    pub fn id(&self) -> Uuid {
        match self {
            CategoryRef::System(id) | CategoryRef::UserOwned(id) => *id,
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self, CategoryRef::System(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    id: Uuid,
    /// None for system categories shared across all users.
    user_id: Option<Uuid>,
    name: String,
    kind: TransactionType,
    is_active: bool,
}

impl Category {
    pub fn new(
        id: Uuid,
        user_id: Option<Uuid>,
        name: String,
        kind: TransactionType,
        is_active: bool,
    ) -> Self {
        Self {
            id,
            user_id,
            name,
            kind,
            is_active,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.user_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TransactionType {
        self.kind
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn is_system(&self) -> bool {
        self.user_id.is_none()
    }

    /// System categories are usable by everyone; user categories only by
    /// their owner.
    pub fn usable_by(&self, user_id: Uuid) -> bool {
        match self.user_id {
            None => true,
            Some(owner) => owner == user_id,
        }
    }
}
