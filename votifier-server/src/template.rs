//! `${key}` substitution of vote fields into command templates.

use std::collections::HashMap;
use votifier_protocol::Vote;

pub const SERVICE_NAME: &str = "service-name";
pub const USER_NAME: &str = "user-name";
pub const ADDRESS: &str = "address";
pub const TIME_STAMP: &str = "time-stamp";

/// Placeholder values for one rendering pass.
///
/// Rendering rules:
/// - `${key}` is replaced by the value for `key`
/// - unknown keys and an unterminated `${` are copied verbatim
/// - `$${key}` renders as the literal `${key}`
/// - inserted values are never substituted again
#[derive(Debug, Clone, Default)]
pub struct Substitutions {
    values: HashMap<String, String>,
}

impl Substitutions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the mapping exposed to command templates for a vote.
    pub fn for_vote(vote: &Vote) -> Self {
        let mut subs = Self::new();
        subs.insert(SERVICE_NAME, vote.service_name());
        subs.insert(USER_NAME, vote.username());
        subs.insert(ADDRESS, vote.address());
        subs.insert(TIME_STAMP, vote.timestamp());
        subs
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn render(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            rest = &rest[pos..];

            if rest.starts_with("$${") {
                out.push_str("${");
                rest = &rest[3..];
            } else if let Some(body) = rest.strip_prefix("${") {
                match body.find('}') {
                    Some(end) => {
                        let key = &body[..end];
                        match self.get(key) {
                            Some(value) => out.push_str(value),
                            None => out.push_str(&rest[..end + 3]),
                        }
                        rest = &body[end + 1..];
                    }
                    None => {
                        out.push_str(rest);
                        rest = "";
                    }
                }
            } else {
                out.push('$');
                rest = &rest[1..];
            }
        }

        out.push_str(rest);
        out
    }
}
