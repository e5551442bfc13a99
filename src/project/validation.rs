use thiserror::Error;

/// Longest accepted project name
pub const MAX_NAME_LEN: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} is {len} characters long, the limit is {MAX_NAME_LEN}")]
    TooLong { field: &'static str, len: usize },

    #[error("{field} contains '{ch}'; only lowercase letters, digits and '-' are allowed")]
    InvalidCharacter { field: &'static str, ch: char },
}

/// Checks a project name against `^[a-z0-9-]{1,50}$`.
///
/// The name becomes a directory name, a hostname label and a container name, so anything
/// outside that charset is rejected.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    validate_label("name", name)
}

/// Hostname prefixes follow the same rules as names.
pub fn validate_hostname_prefix(prefix: &str) -> Result<(), ValidationError> {
    validate_label("hostname prefix", prefix)
}

fn validate_label(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    let len = value.chars().count();
    if len > MAX_NAME_LEN {
        return Err(ValidationError::TooLong { field, len });
    }
    if let Some(ch) = value
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
    {
        return Err(ValidationError::InvalidCharacter { field, ch });
    }
    Ok(())
}
