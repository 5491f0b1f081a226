//! Compound resource IDs such as `service:role`

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("unexpected ID format {id:?}, expected {expected}")]
    Malformed { id: String, expected: &'static str },
}

/// Splits `id` on `:` into exactly `N` non-empty parts
pub fn split_id<const N: usize>(id: &str, expected: &'static str) -> Result<[String; N], IdError> {
    let malformed = || IdError::Malformed {
        id: id.to_string(),
        expected,
    };
    let parts: Vec<String> = id.split(':').map(str::to_string).collect();
    if parts.iter().any(String::is_empty) {
        return Err(malformed());
    }
    parts.try_into().map_err(|_| malformed())
}

pub fn join_id(parts: &[&str]) -> String {
    parts.join(":")
}
