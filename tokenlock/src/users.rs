//! The fixed set of users and their token accounting.

use std::fmt::{Debug, Formatter};
use crate::config::UserConfig;
use crate::usage::UsageRecord;

/// A person allowed to open the lock a limited number of times per period.
pub struct User {
    identifier: char,
    credential: String,
    token_limit: u32,
    tokens_used: u32,
}

impl User {
    pub fn new(identifier: char, credential: impl Into<String>, token_limit: u32) -> Self {
        User {
            identifier,
            credential: credential.into(),
            token_limit,
            tokens_used: 0,
        }
    }

    pub fn identifier(&self) -> char {
        self.identifier
    }

    pub fn token_limit(&self) -> u32 {
        self.token_limit
    }

    pub fn tokens_used(&self) -> u32 {
        self.tokens_used
    }

    /// Whether the user still has a token left this period.
    pub fn is_authorized(&self) -> bool {
        self.tokens_used < self.token_limit
    }

    pub(crate) fn use_token(&mut self) {
        self.tokens_used += 1;
    }

    pub(crate) fn reset_tokens(&mut self) {
        self.tokens_used = 0;
    }
}

impl Debug for User {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "User({:?}, {}/{} tokens)", self.identifier, self.tokens_used, self.token_limit)
    }
}

/// All users known to the lock, in config order.
#[derive(Debug, Default)]
pub struct UserRegistry {
    users: Vec<User>,
}

impl UserRegistry {
    pub fn new(users: Vec<User>) -> Self {
        UserRegistry { users }
    }

    pub fn from_config(users: &[UserConfig]) -> Self {
        Self::new(
            users
                .iter()
                .map(|u| User::new(u.identifier, u.credential.clone(), u.tokens))
                .collect(),
        )
    }

    /// Finds the first user whose credential equals `input`.
    pub fn find_by_credential(&self, input: &str) -> Option<usize> {
        self.users.iter().position(|u| u.credential == input)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut User> {
        self.users.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &User> {
        self.users.iter()
    }

    /// Counts one used token per record, for every user the record belongs to.
    ///
    /// Records of identifiers nobody has are ignored.
    pub fn reconstruct_tokens_used(&mut self, records: &[UsageRecord]) {
        for user in self.users.iter_mut() {
            let used = records.iter().filter(|r| r.identifier == user.identifier).count();
            user.tokens_used += used as u32;
        }
    }

    pub fn reset_all(&mut self) {
        self.users.iter_mut().for_each(User::reset_tokens);
    }
}
