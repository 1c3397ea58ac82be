//! Participant identity validation
//!
//! A participant is identified either by a syntactically valid email address
//! or by an externally supplied id (e.g. a crowd-sourcing platform's
//! participant id passed in the session URL). External-id participants are
//! offered a return-to-platform redirect on completion; email participants
//! are not.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Syntactic email check: local part, one '@', domain with a dot-separated
/// TLD of at least two letters. Deliverability is out of scope.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    let local_ok = local
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "._%+-".contains(c));
    if !local_ok {
        return false;
    }
    let Some((name, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    if name.is_empty() || name.starts_with('.') || name.ends_with('.') {
        return false;
    }
    let name_ok = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    name_ok && tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic())
}

/// Validated participant identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Identity {
    /// Self-reported email address
    Email(String),
    /// Externally supplied participant id
    External(String),
}

impl Identity {
    /// Resolve a submission to an identity: a valid email wins, otherwise a
    /// non-empty participant id, otherwise the submission is rejected.
    pub fn from_submission(email: Option<&str>, participant_id: Option<&str>) -> Result<Identity> {
        let email = email.map(str::trim).filter(|s| !s.is_empty());
        let pid = participant_id.map(str::trim).filter(|s| !s.is_empty());

        if let Some(email) = email {
            if is_valid_email(email) {
                return Ok(Identity::Email(email.to_string()));
            }
            if pid.is_none() {
                return Err(Error::InvalidIdentity(
                    "Please provide a valid email address".to_string(),
                ));
            }
        }
        if let Some(pid) = pid {
            return Ok(Identity::External(pid.to_string()));
        }
        Err(Error::InvalidIdentity(
            "Please provide either an email address or a participant id".to_string(),
        ))
    }

    /// The identity string used to key the result bundle
    pub fn user_id(&self) -> &str {
        match self {
            Identity::Email(s) | Identity::External(s) => s,
        }
    }

    /// External-id participants get the completion redirect
    pub fn is_external(&self) -> bool {
        matches!(self, Identity::External(_))
    }
}
