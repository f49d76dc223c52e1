//! Authenticated identities and the request channels they sign.

use serde::{Deserialize, Serialize};

use crate::delegation::Delegation;
use crate::principal::Principal;

/// An authenticated principal together with the delegation that lets it
/// sign requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    principal: Principal,
    delegation: Delegation,
}

impl Identity {
    /// Creates a new identity.
    #[must_use]
    pub const fn new(principal: Principal, delegation: Delegation) -> Self {
        Self {
            principal,
            delegation,
        }
    }

    /// The canonical account identifier.
    #[must_use]
    pub const fn principal(&self) -> &Principal {
        &self.principal
    }

    /// The raw delegation. Only request signing should need this.
    #[must_use]
    pub const fn delegation(&self) -> &Delegation {
        &self.delegation
    }

    /// Returns true once the delegation can no longer sign requests.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.delegation.is_expired()
    }

    /// Builds a request channel bound to this identity.
    #[must_use]
    pub fn channel(&self) -> RequestChannel {
        RequestChannel {
            principal: self.principal.clone(),
            authorization: self.delegation.authorization(),
        }
    }
}

/// Credentials attached to every request made for one identity.
#[derive(Clone)]
pub struct RequestChannel {
    principal: Principal,
    authorization: String,
}

impl RequestChannel {
    /// The principal requests are made for.
    #[must_use]
    pub const fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Value of the `Authorization` header.
    #[must_use]
    pub fn authorization(&self) -> &str {
        &self.authorization
    }
}

impl std::fmt::Debug for RequestChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestChannel")
            .field("principal", &self.principal)
            .finish_non_exhaustive()
    }
}
