// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Length-checked strings for the fixed-size path fields of the record.

use std::fmt;

use thiserror::Error;

/// Bytes reserved on the wire for each string field. Larger than `PATH_MAX`
/// on Linux including its terminator.
pub const FIELD_CAPACITY: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoundedError {
    #[error("value is {len} bytes, field holds at most {max}")]
    TooLong { len: usize, max: usize },

    #[error("value contains a NUL byte")]
    InteriorNul,
}

/// A string guaranteed to fit a record field with room for the NUL terminator.
///
/// Construction rejects oversized input instead of truncating it, so a value
/// read back from the wire is always exactly what was stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BoundedString(String);

impl BoundedString {
    /// Longest accepted value in bytes.
    pub const MAX_LEN: usize = FIELD_CAPACITY - 1;

    pub fn new(value: impl Into<String>) -> Result<Self, BoundedError> {
        let value = value.into();
        if value.len() > Self::MAX_LEN {
            return Err(BoundedError::TooLong { len: value.len(), max: Self::MAX_LEN });
        }
        if value.as_bytes().contains(&0) {
            return Err(BoundedError::InteriorNul);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copy into a `FIELD_CAPACITY` slot, zero-filling the remainder.
    pub(crate) fn write_field(&self, field: &mut [u8]) {
        let bytes = self.0.as_bytes();
        let (head, tail) = field.split_at_mut(bytes.len());
        head.copy_from_slice(bytes);
        tail.fill(0);
    }

    /// Read back a NUL-terminated slot. A slot with no terminator is invalid.
    pub(crate) fn read_field(field: &[u8]) -> Option<Self> {
        let end = field.iter().position(|&b| b == 0)?;
        let value = std::str::from_utf8(&field[..end]).ok()?;
        Some(Self(value.to_string()))
    }
}

impl TryFrom<&str> for BoundedString {
    type Error = BoundedError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl AsRef<str> for BoundedString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BoundedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[path = "bounded_tests.rs"]
mod tests;
