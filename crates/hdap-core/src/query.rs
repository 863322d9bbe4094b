//! Convenience builder for HTTP query parameters.
//!
//! This module provides a lightweight helper for constructing URL query
//! pairs from optional values, including the comma-joined list form the
//! directory protocol uses for field selections and sort keys.

use std::fmt::Display;

/// Builder for assembling query parameter pairs.
#[derive(Debug, Default, Clone)]
pub struct QueryPairs {
    pairs: Vec<(&'static str, String)>,
}

impl QueryPairs {
    /// Create a new, empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    /// Append a required key/value pair.
    pub fn push<T>(&mut self, key: &'static str, value: T)
    where
        T: Display,
    {
        self.pairs.push((key, value.to_string()));
    }

    /// Append a key/value pair when the value is present.
    pub fn push_opt<T>(&mut self, key: &'static str, value: Option<T>)
    where
        T: ToString,
    {
        if let Some(value) = value {
            self.pairs.push((key, value.to_string()));
        }
    }

    /// Append `key=true` when the flag is set.
    pub fn push_flag(&mut self, key: &'static str, flag: bool) {
        if flag {
            self.pairs.push((key, "true".to_string()));
        }
    }

    /// Append the comma-joined form of a list value when it is present
    /// and non-empty.
    pub fn push_joined<S>(&mut self, key: &'static str, values: Option<&[S]>)
    where
        S: AsRef<str>,
    {
        if let Some(values) = values {
            if !values.is_empty() {
                let joined = values
                    .iter()
                    .map(AsRef::as_ref)
                    .collect::<Vec<_>>()
                    .join(",");
                self.pairs.push((key, joined));
            }
        }
    }

    /// Return the collected key/value pairs.
    #[must_use]
    pub fn into_pairs(self) -> Vec<(&'static str, String)> {
        self.pairs
    }

    /// Returns true if no parameters have been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
