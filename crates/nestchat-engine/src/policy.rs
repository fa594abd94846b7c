// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gating policy for conversation starts.
//!
//! Only the first message between a pair is gated. Rules are evaluated in a
//! fixed order and the first failing rule decides the denial.

use nestchat_core::types::{RateLimitPeriod, RateLimitState, User};
use nestchat_core::{ForbiddenReason, NestchatError};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    NotPremium,
    RecipientUnavailable,
    TestAccountMismatch,
    RateLimitExceeded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// `warning` is surfaced to the client but does not block the write.
    Allow { warning: Option<RateLimitPeriod> },
    Deny(DenyReason),
}

impl GateDecision {
    /// The warning to surface, or the denial as an error.
    pub fn into_result(self) -> Result<Option<RateLimitPeriod>, NestchatError> {
        match self {
            Self::Allow { warning } => Ok(warning),
            Self::Deny(reason) => Err(reason.into()),
        }
    }
}

impl From<DenyReason> for NestchatError {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::NotPremium => Self::Forbidden(ForbiddenReason::NotPremium),
            DenyReason::RecipientUnavailable => {
                Self::Forbidden(ForbiddenReason::RecipientUnavailable)
            }
            DenyReason::TestAccountMismatch => Self::Forbidden(ForbiddenReason::TestAccountMismatch),
            DenyReason::RateLimitExceeded => Self::RateLimited {
                message: "too many new conversations started, try again later".to_string(),
            },
        }
    }
}

pub fn can_send_initial_message(sender: &User, recipient: &User, is_first: bool) -> GateDecision {
    if !is_first {
        return GateDecision::Allow { warning: None };
    }
    if !sender.premium {
        return GateDecision::Deny(DenyReason::NotPremium);
    }
    if !recipient.available_for_chat {
        return GateDecision::Deny(DenyReason::RecipientUnavailable);
    }
    // Sender side only.
    if sender.test_account && !recipient.test_account {
        return GateDecision::Deny(DenyReason::TestAccountMismatch);
    }
    match sender.rate_limit {
        RateLimitState::Exceeded => GateDecision::Deny(DenyReason::RateLimitExceeded),
        RateLimitState::Warning(period) => GateDecision::Allow {
            warning: Some(period),
        },
        RateLimitState::None => GateDecision::Allow { warning: None },
    }
}

/// Rate-limit flags for a message listing. Only shown while the viewer
/// has not yet written to the partner, since only starts are limited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitMeta {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub rate_limit_exceeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit_warning: Option<RateLimitPeriod>,
}

pub fn rate_limit_meta(viewer: &User, has_history: bool) -> RateLimitMeta {
    if has_history {
        return RateLimitMeta::default();
    }
    match viewer.rate_limit {
        RateLimitState::Exceeded => RateLimitMeta {
            rate_limit_exceeded: true,
            rate_limit_warning: None,
        },
        RateLimitState::Warning(period) => RateLimitMeta {
            rate_limit_exceeded: false,
            rate_limit_warning: Some(period),
        },
        RateLimitState::None => RateLimitMeta::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nestchat_core::types::{Gender, Role, UserId};

    fn user(id: &str) -> User {
        User {
            id: UserId::from(id),
            url: id.into(),
            first_name: id.into(),
            role: Role::Parent,
            gender: Gender::Female,
            premium: true,
            rate_limit: RateLimitState::None,
            available_for_chat: true,
            test_account: false,
            disabled: false,
            locale: "en".into(),
            safety_messages_disabled: false,
            last_login: None,
        }
    }

    #[test]
    fn replies_are_never_gated() {
        let mut sender = user("s");
        sender.premium = false;
        sender.rate_limit = RateLimitState::Exceeded;
        let decision = can_send_initial_message(&sender, &user("r"), false);
        assert_eq!(decision, GateDecision::Allow { warning: None });
    }

    #[test]
    fn rules_apply_in_order() {
        let mut sender = user("s");
        let mut recipient = user("r");
        sender.premium = false;
        recipient.available_for_chat = false;
        assert_eq!(
            can_send_initial_message(&sender, &recipient, true),
            GateDecision::Deny(DenyReason::NotPremium)
        );
        sender.premium = true;
        assert_eq!(
            can_send_initial_message(&sender, &recipient, true),
            GateDecision::Deny(DenyReason::RecipientUnavailable)
        );
        recipient.available_for_chat = true;
        sender.test_account = true;
        sender.rate_limit = RateLimitState::Exceeded;
        assert_eq!(
            can_send_initial_message(&sender, &recipient, true),
            GateDecision::Deny(DenyReason::TestAccountMismatch)
        );
        sender.test_account = false;
        assert_eq!(
            can_send_initial_message(&sender, &recipient, true),
            GateDecision::Deny(DenyReason::RateLimitExceeded)
        );
    }

    #[test]
    fn test_account_rule_is_one_directional() {
        let sender = user("s");
        let mut recipient = user("r");
        recipient.test_account = true;
        assert!(matches!(
            can_send_initial_message(&sender, &recipient, true),
            GateDecision::Allow { .. }
        ));
        let mut test_sender = user("t");
        test_sender.test_account = true;
        assert!(matches!(
            can_send_initial_message(&test_sender, &recipient, true),
            GateDecision::Allow { .. }
        ));
    }

    #[test]
    fn warning_state_allows_with_warning() {
        let mut sender = user("s");
        sender.rate_limit = RateLimitState::Warning(RateLimitPeriod::Day);
        let warning = can_send_initial_message(&sender, &user("r"), true)
            .into_result()
            .unwrap();
        assert_eq!(warning, Some(RateLimitPeriod::Day));
    }

    #[test]
    fn denials_map_to_error_kinds() {
        let err: NestchatError = DenyReason::RateLimitExceeded.into();
        assert!(matches!(err, NestchatError::RateLimited { .. }));
        let err: NestchatError = DenyReason::NotPremium.into();
        assert!(matches!(
            err,
            NestchatError::Forbidden(ForbiddenReason::NotPremium)
        ));
    }

    #[test]
    fn rate_limit_meta_hidden_once_history_exists() {
        let mut viewer = user("v");
        viewer.rate_limit = RateLimitState::Exceeded;
        assert!(rate_limit_meta(&viewer, false).rate_limit_exceeded);
        assert_eq!(rate_limit_meta(&viewer, true), RateLimitMeta::default());
    }
}
