//! Request shape validation helpers.
//!
//! Validators collect every violated constraint before failing, so a client
//! sees all problems with a payload in one `400` response.

use crate::error::AppError;

/// Accumulates constraint violations for one payload
#[derive(Debug, Default)]
pub struct Violations {
    messages: Vec<String>,
}

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, ok: bool, message: &str) {
        if !ok {
            self.messages.push(message.to_string());
        }
    }

    /// `Ok` when nothing was violated, otherwise one `BadRequest` listing all messages
    pub fn finish(self) -> Result<(), AppError> {
        if self.messages.is_empty() {
            Ok(())
        } else {
            Err(AppError::BadRequest(self.messages.join(", ")))
        }
    }
}

/// Length in characters, not bytes
pub fn has_min_chars(value: &str, min: usize) -> bool {
    value.chars().count() >= min
}

/// Pragmatic email shape check: `local@domain.tld`, no whitespace, one `@`.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}
