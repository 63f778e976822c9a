//! Voter identity.
//!
//! Authentication lives outside this crate. Callers hand services an
//! [`Actor`] resolved by an [`IdentityProvider`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ballotbox_common::config::AuthConfig;
use ballotbox_common::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// The authenticated caller of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub voter_id: String,
    pub is_admin: bool,
}

impl Actor {
    /// A voter without the administrator capability.
    pub fn voter(voter_id: impl Into<String>) -> Self {
        Self {
            voter_id: voter_id.into(),
            is_admin: false,
        }
    }

    /// A voter holding the administrator capability.
    pub fn admin(voter_id: impl Into<String>) -> Self {
        Self {
            voter_id: voter_id.into(),
            is_admin: true,
        }
    }

    /// Fail with [`AppError::Forbidden`] unless the actor is an administrator.
    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Administrator access required".to_string(),
            ))
        }
    }
}

/// Resolves bearer tokens to actors.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a token, returning `None` when it is not recognised.
    async fn resolve(&self, token: &str) -> AppResult<Option<Actor>>;
}

/// Identity provider backed by a fixed token table.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenIdentity {
    tokens: HashMap<String, Actor>,
}

impl StaticTokenIdentity {
    /// Create an empty token table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the token table from the `[auth]` configuration section.
    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        let tokens = config
            .tokens
            .iter()
            .map(|grant| {
                (
                    grant.token.clone(),
                    Actor {
                        voter_id: grant.voter_id.clone(),
                        is_admin: grant.admin,
                    },
                )
            })
            .collect();
        Self { tokens }
    }

    /// Register a token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>, actor: Actor) -> Self {
        self.tokens.insert(token.into(), actor);
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticTokenIdentity {
    async fn resolve(&self, token: &str) -> AppResult<Option<Actor>> {
        Ok(self.tokens.get(token).cloned())
    }
}

/// Shared identity provider handle.
pub type IdentityService = Arc<dyn IdentityProvider>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ballotbox_common::config::TokenGrant;

    #[tokio::test]
    async fn test_resolve_from_config() {
        let config = AuthConfig {
            tokens: vec![
                TokenGrant {
                    token: "t-admin".to_string(),
                    voter_id: "admin1".to_string(),
                    admin: true,
                },
                TokenGrant {
                    token: "t-voter".to_string(),
                    voter_id: "voter1".to_string(),
                    admin: false,
                },
            ],
        };
        let identity = StaticTokenIdentity::from_config(&config);

        assert_eq!(
            identity.resolve("t-admin").await.unwrap(),
            Some(Actor::admin("admin1"))
        );
        assert_eq!(
            identity.resolve("t-voter").await.unwrap(),
            Some(Actor::voter("voter1"))
        );
        assert_eq!(identity.resolve("unknown").await.unwrap(), None);
    }

    #[test]
    fn test_require_admin() {
        assert!(Actor::admin("a").require_admin().is_ok());
        assert!(matches!(
            Actor::voter("v").require_admin(),
            Err(AppError::Forbidden(_))
        ));
    }
}
