//! Session gate.
//!
//! Account management lives with an external identity provider. The live view
//! only needs to know whether someone is signed in before it mounts.

use crate::config::IdentityConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub uid: String,
    pub display_name: Option<String>,
}

pub trait IdentityProvider: Send + Sync {
    fn current_user(&self) -> Option<UserProfile>;

    fn has_active_session(&self) -> bool {
        self.current_user().is_some()
    }
}

/// Operator named in the local config file.
#[derive(Debug, Clone, Default)]
pub struct LocalOperator {
    user: Option<String>,
}

impl LocalOperator {
    pub fn new(user: Option<String>) -> Self {
        Self {
            user: user
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()),
        }
    }

    pub fn from_config(config: &IdentityConfig) -> Self {
        Self::new(config.user.clone())
    }
}

impl IdentityProvider for LocalOperator {
    fn current_user(&self) -> Option<UserProfile> {
        self.user.as_ref().map(|user| UserProfile {
            uid: user.clone(),
            display_name: Some(user.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_operator_has_no_session() {
        assert!(!LocalOperator::new(Some("   ".to_string())).has_active_session());
        assert!(!LocalOperator::new(None).has_active_session());
    }

    #[test]
    fn configured_operator_is_signed_in() {
        let operator = LocalOperator::from_config(&IdentityConfig {
            user: Some(" carer ".to_string()),
        });
        let user = operator.current_user().expect("user");
        assert_eq!(user.uid, "carer");
    }
}
