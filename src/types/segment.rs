// ABOUTME: Phantom-typed remote path segments for compile-time type safety.
// ABOUTME: Prevents mixing release labels, symlink names, and dependency directory names.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use thiserror::Error;

/// Marker types for phantom type parameters.
/// Using empty enums prevents instantiation and requires no trait bounds.
pub enum ReleaseMarker {}
pub enum LinkMarker {}
pub enum DirMarker {}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SegmentError {
    #[error("name cannot be empty")]
    Empty,

    #[error("name exceeds maximum length of 255 characters")]
    TooLong,

    #[error("name cannot be '.' or '..'")]
    Relative,

    #[error("name cannot start with a hyphen")]
    StartsWithHyphen,

    #[error("invalid character in name: '{0}'")]
    InvalidChar(char),
}

/// A single, validated path component below the deploy path.
///
/// Only ASCII letters, digits, `.`, `_` and `-` are accepted, so a segment can
/// be joined onto a remote path and embedded in a shell command without
/// escaping surprises. The marker type keeps a release label from being passed
/// where a symlink name is expected.
#[must_use = "segments name remote paths and should not be ignored"]
pub struct Segment<T> {
    value: String,
    _marker: PhantomData<T>,
}

impl<T> Segment<T> {
    pub fn new(value: &str) -> Result<Self, SegmentError> {
        if value.is_empty() {
            return Err(SegmentError::Empty);
        }

        if value.len() > 255 {
            return Err(SegmentError::TooLong);
        }

        if value == "." || value == ".." {
            return Err(SegmentError::Relative);
        }

        if value.starts_with('-') {
            return Err(SegmentError::StartsWithHyphen);
        }

        if let Some(c) = value
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '.' | '_' | '-'))
        {
            return Err(SegmentError::InvalidChar(c));
        }

        Ok(Self {
            value: value.to_string(),
            _marker: PhantomData,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn into_inner(self) -> String {
        self.value
    }
}

impl Segment<ReleaseMarker> {
    /// Label derived from the local clock, e.g. `202401011200`.
    pub fn timestamp() -> Self {
        let value = chrono::Local::now().format("%Y%m%d%H%M").to_string();
        Self {
            value,
            _marker: PhantomData,
        }
    }
}

impl Segment<LinkMarker> {
    /// The conventional live symlink name.
    pub fn current() -> Self {
        Self {
            value: "current".to_string(),
            _marker: PhantomData,
        }
    }
}

impl Segment<DirMarker> {
    pub fn node_modules() -> Self {
        Self {
            value: "node_modules".to_string(),
            _marker: PhantomData,
        }
    }
}

// Manual trait implementations that don't require T to implement the trait.
// This is necessary because T is only used as a phantom type marker.

impl<T> std::fmt::Debug for Segment<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Segment").field(&self.value).finish()
    }
}

impl<T> Clone for Segment<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> PartialEq for Segment<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Eq for Segment<T> {}

impl<T> PartialEq<str> for Segment<T> {
    fn eq(&self, other: &str) -> bool {
        self.value == other
    }
}

impl<T> Hash for Segment<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T> std::fmt::Display for Segment<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<T> Serialize for Segment<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Segment<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::new(&value).map_err(serde::de::Error::custom)
    }
}

/// Name of one release directory under the deploy path.
pub type ReleaseLabel = Segment<ReleaseMarker>;
/// Name of the live symlink under the deploy path.
pub type LinkName = Segment<LinkMarker>;
/// Name of the dependency directory inside a release.
pub type DirName = Segment<DirMarker>;
