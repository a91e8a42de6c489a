//! Access guard interface.
//!
//! Caller verification happens before the engine runs; the engine itself
//! assumes the gate has passed. The trait is the seam for real deployments
//! to plug their identity provider into; the static guard covers the CLI.

use tracing::debug;

use crate::error::{RebakError, Result};

/// An authorized caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub subject: String,
    pub admin: bool,
}

/// Verifies caller identity and role before any engine operation.
pub trait AccessGuard {
    fn authorize(&self, token: &str) -> Result<Caller>;
}

/// Guard backed by a configured list of admin tokens. An empty list means
/// the gate is open, for local single-user use.
pub struct StaticTokenGuard {
    admin_tokens: Vec<String>,
}

impl StaticTokenGuard {
    #[must_use]
    pub fn new(admin_tokens: Vec<String>) -> Self {
        Self { admin_tokens }
    }
}

impl AccessGuard for StaticTokenGuard {
    fn authorize(&self, token: &str) -> Result<Caller> {
        if self.admin_tokens.is_empty() {
            debug!("no admin tokens configured, access gate open");
            return Ok(Caller {
                subject: "local".into(),
                admin: true,
            });
        }
        if token.is_empty() {
            return Err(RebakError::Unauthorized("missing token".into()));
        }
        if self.admin_tokens.iter().any(|t| t == token) {
            Ok(Caller {
                subject: "token".into(),
                admin: true,
            })
        } else {
            Err(RebakError::Unauthorized("unknown token".into()))
        }
    }
}

/// The engine requires an admin caller.
pub fn require_admin(caller: &Caller) -> Result<()> {
    if caller.admin {
        Ok(())
    } else {
        Err(RebakError::Unauthorized("admin role required".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_token_list_opens_the_gate() {
        let guard = StaticTokenGuard::new(vec![]);
        let caller = guard.authorize("").unwrap();
        assert!(caller.admin);
    }

    #[test]
    fn known_token_is_admin() {
        let guard = StaticTokenGuard::new(vec!["s3cret".into()]);
        let caller = guard.authorize("s3cret").unwrap();
        assert!(caller.admin);
        require_admin(&caller).unwrap();
    }

    #[test]
    fn unknown_or_missing_token_is_rejected() {
        let guard = StaticTokenGuard::new(vec!["s3cret".into()]);
        assert!(guard.authorize("wrong").is_err());
        assert!(guard.authorize("").is_err());
    }

    #[test]
    fn non_admin_caller_is_rejected() {
        let caller = Caller {
            subject: "viewer".into(),
            admin: false,
        };
        assert!(require_admin(&caller).is_err());
    }
}
