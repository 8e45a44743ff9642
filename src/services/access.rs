//! Access decision function for note downloads.
//!
//! Pure decision logic: given a note's gates and the request identity,
//! decide whether the download may proceed. Side effects (logging,
//! download recording, HTTP status mapping) belong to the caller.

use uuid::Uuid;

use crate::models::user::UserRole;

/// Per-resource access gates.
///
/// `premium` and `requires_login` are independent: free content can still
/// be login-gated, and premium content implies a login requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessGates {
    pub premium: bool,
    pub requires_login: bool,
}

/// Resolved identity of the requester, if authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestIdentity {
    pub user_id: Uuid,
    pub role: UserRole,
}

/// Reason a download was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// Authentication is required (maps to 401)
    LoginRequired,
    /// PRO membership is required (maps to 403)
    ProRequired,
}

/// Outcome of the access decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny(DenyReason),
}

/// Decide whether the requester may access a resource.
///
/// Rules, applied in order:
/// 1. Premium content requires authentication.
/// 2. Premium content requires a role with premium access
///    (PRO, or the ADMIN/MANAGER bypass for moderation).
/// 3. Non-premium content with the login gate set requires authentication.
/// 4. Everything else is allowed.
pub fn decide(gates: AccessGates, identity: Option<&RequestIdentity>) -> AccessDecision {
    if gates.premium {
        return match identity {
            None => AccessDecision::Deny(DenyReason::LoginRequired),
            Some(id) if id.role.has_premium_access() => AccessDecision::Allow,
            Some(_) => AccessDecision::Deny(DenyReason::ProRequired),
        };
    }

    if gates.requires_login && identity.is_none() {
        return AccessDecision::Deny(DenyReason::LoginRequired);
    }

    AccessDecision::Allow
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(role: UserRole) -> RequestIdentity {
        RequestIdentity {
            user_id: Uuid::new_v4(),
            role,
        }
    }

    const OPEN: AccessGates = AccessGates {
        premium: false,
        requires_login: false,
    };
    const LOGIN_GATED: AccessGates = AccessGates {
        premium: false,
        requires_login: true,
    };
    const PREMIUM: AccessGates = AccessGates {
        premium: true,
        requires_login: false,
    };

    #[test]
    fn open_content_allows_everyone() {
        assert_eq!(decide(OPEN, None), AccessDecision::Allow);
        for role in [UserRole::Free, UserRole::Pro, UserRole::Admin, UserRole::Manager] {
            assert_eq!(decide(OPEN, Some(&identity(role))), AccessDecision::Allow);
        }
    }

    #[test]
    fn premium_denies_anonymous_with_login_required() {
        assert_eq!(
            decide(PREMIUM, None),
            AccessDecision::Deny(DenyReason::LoginRequired)
        );
    }

    #[test]
    fn premium_denies_free_role() {
        assert_eq!(
            decide(PREMIUM, Some(&identity(UserRole::Free))),
            AccessDecision::Deny(DenyReason::ProRequired)
        );
    }

    #[test]
    fn premium_allows_pro() {
        assert_eq!(
            decide(PREMIUM, Some(&identity(UserRole::Pro))),
            AccessDecision::Allow
        );
    }

    #[test]
    fn premium_allows_staff_bypass() {
        assert_eq!(
            decide(PREMIUM, Some(&identity(UserRole::Admin))),
            AccessDecision::Allow
        );
        assert_eq!(
            decide(PREMIUM, Some(&identity(UserRole::Manager))),
            AccessDecision::Allow
        );
    }

    #[test]
    fn login_gated_free_content_denies_anonymous() {
        assert_eq!(
            decide(LOGIN_GATED, None),
            AccessDecision::Deny(DenyReason::LoginRequired)
        );
    }

    #[test]
    fn login_gated_free_content_allows_any_authenticated_role() {
        for role in [UserRole::Free, UserRole::Pro, UserRole::Admin, UserRole::Manager] {
            assert_eq!(
                decide(LOGIN_GATED, Some(&identity(role))),
                AccessDecision::Allow,
                "role {:?} should pass the login gate",
                role
            );
        }
    }

    #[test]
    fn gates_are_independent() {
        // Premium with the login gate also set behaves like premium alone
        let both = AccessGates {
            premium: true,
            requires_login: true,
        };
        assert_eq!(
            decide(both, Some(&identity(UserRole::Free))),
            AccessDecision::Deny(DenyReason::ProRequired)
        );
        assert_eq!(decide(both, Some(&identity(UserRole::Pro))), AccessDecision::Allow);
    }
}
