use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;

use super::Role;

/// Request information for authentication
#[derive(Debug, Clone)]
pub struct AuthRequest {
    pub headers: HashMap<String, String>,
    pub source_ip: IpAddr,
}

/// Authenticated identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub name: String,
    pub role: Role,
    pub method: String,
}

impl Identity {
    /// The identity handed out when auth is disabled. Full capability, so a
    /// bare development instance is usable without any account setup.
    pub fn anonymous() -> Self {
        Self {
            user_id: "anonymous".to_string(),
            name: "Anonymous".to_string(),
            role: Role::SuperAdmin,
            method: "none".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_identity() {
        let identity = Identity::anonymous();
        assert_eq!(identity.user_id, "anonymous");
        assert_eq!(identity.method, "none");
        assert_eq!(identity.role, Role::SuperAdmin);
    }

    #[test]
    fn test_identity_serialization() {
        let identity = Identity {
            user_id: "user123".to_string(),
            name: "Ada".to_string(),
            role: Role::Agent,
            method: "user_token".to_string(),
        };

        let json = serde_json::to_string(&identity).unwrap();
        let deserialized: Identity = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.user_id, "user123");
        assert_eq!(deserialized.role, Role::Agent);
        assert_eq!(deserialized.method, "user_token");
    }
}
