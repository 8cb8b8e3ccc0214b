//! Canonical equality keys for queries.
//!
//! A fingerprint is the JSON encoding of the normalized query: filters are
//! collected into a `BTreeMap` after unset and empty values are dropped, so
//! two queries that mean the same thing encode to the same string no matter
//! how their filter maps were built.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::hash::fnv1a_hash;
use crate::query::{Query, SortSpec};
use crate::types::Scalar;

#[derive(Serialize)]
struct Canonical<'a> {
    page: u32,
    size: u32,
    sort: Option<&'a SortSpec>,
    filters: BTreeMap<&'a str, &'a Scalar>,
}

/// Deterministic string identifying the effective content of a [`Query`].
///
/// Only meant for equality checks; it is not a transport format.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryFingerprint(String);

impl QueryFingerprint {
    /// Computes the fingerprint of `query`.
    #[must_use]
    pub fn of(query: &Query) -> Self {
        let canonical = Canonical {
            page: query.page_index,
            size: query.page_size,
            sort: query.sort.as_ref(),
            filters: query.active_filters(),
        };
        // Plain structs of strings, integers and booleans always serialize.
        let encoded = serde_json::to_string(&canonical).unwrap_or_default();
        Self(encoded)
    }

    /// The canonical string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short digest for log fields.
    #[must_use]
    pub fn digest(&self) -> u32 {
        fnv1a_hash(&self.0)
    }
}

impl fmt::Display for QueryFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.digest())
    }
}
