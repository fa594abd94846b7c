// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User fixtures.
//!
//! Builders default to a premium, available, non-test account in the `en`
//! locale. The chat-partner url is `<id>-url`.

use chrono::{DateTime, Utc};
use nestchat_core::types::{Gender, RateLimitState, Role, User, UserId};

pub struct UserBuilder {
    user: User,
}

impl UserBuilder {
    pub fn new(id: &str, role: Role) -> Self {
        Self {
            user: User {
                id: UserId::from(id),
                url: format!("{id}-url"),
                first_name: id.to_string(),
                role,
                gender: Gender::Female,
                premium: true,
                rate_limit: RateLimitState::None,
                available_for_chat: true,
                test_account: false,
                disabled: false,
                locale: "en".to_string(),
                safety_messages_disabled: false,
                last_login: None,
            },
        }
    }

    pub fn gender(mut self, gender: Gender) -> Self {
        self.user.gender = gender;
        self
    }

    pub fn premium(mut self, premium: bool) -> Self {
        self.user.premium = premium;
        self
    }

    pub fn rate_limit(mut self, state: RateLimitState) -> Self {
        self.user.rate_limit = state;
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.user.available_for_chat = false;
        self
    }

    pub fn test_account(mut self) -> Self {
        self.user.test_account = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.user.disabled = true;
        self
    }

    pub fn locale(mut self, locale: &str) -> Self {
        self.user.locale = locale.to_string();
        self
    }

    pub fn safety_messages_disabled(mut self) -> Self {
        self.user.safety_messages_disabled = true;
        self
    }

    pub fn last_login(mut self, at: DateTime<Utc>) -> Self {
        self.user.last_login = Some(at);
        self
    }

    pub fn build(self) -> User {
        self.user
    }
}

pub fn parent(id: &str) -> User {
    UserBuilder::new(id, Role::Parent).build()
}

pub fn babysitter(id: &str) -> User {
    UserBuilder::new(id, Role::Babysitter).build()
}

pub fn childminder(id: &str) -> User {
    UserBuilder::new(id, Role::Childminder).build()
}
