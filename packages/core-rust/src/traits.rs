use std::fmt::Debug;

use crate::compose::QueryVocabulary;
use crate::query::SortSpec;
use crate::types::{EntityId, Scalar};

/// A record type exposed by the remote API as a paginated collection.
///
/// One implementation per entity parametrizes the generic list, detail and
/// mutation controllers: labels for fallback messages, the sort/filter
/// vocabulary, and how a draft projects onto an existing row.
pub trait Entity: Clone + Debug + Send + Sync + 'static {
    /// Payload accepted by `create` and `update`.
    type Draft: Clone + Debug + Send + Sync + 'static;

    /// Path segment of the collection on the remote API (e.g. `"children"`).
    const RESOURCE: &'static str;
    /// Singular label used in user-facing fallback messages.
    const SINGULAR: &'static str;
    /// Plural label used in user-facing fallback messages.
    const PLURAL: &'static str;
    /// UI-to-server name mapping for sort columns and filters.
    const VOCABULARY: QueryVocabulary;

    /// Server-assigned identifier.
    fn id(&self) -> &EntityId;

    /// Sort applied when the view has no explicit sort.
    fn default_sort() -> Option<SortSpec> {
        None
    }

    /// Applies the fields carried by `draft` to this row.
    ///
    /// Used for optimistic patches and by in-memory remotes for updates.
    fn apply_draft(&mut self, draft: &Self::Draft);

    /// Builds a new row from a draft and a freshly assigned id.
    fn from_draft(id: EntityId, draft: &Self::Draft) -> Self;

    /// Server-side validation of a draft. `Err` carries the message the
    /// server would answer with.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message when the draft is rejected.
    fn validate(_draft: &Self::Draft) -> Result<(), String> {
        Ok(())
    }

    /// Comparable value of a server-side field, for sorting and equality filters.
    fn field(&self, server_name: &str) -> Option<Scalar>;

    /// Whether this row satisfies one server-side filter parameter.
    ///
    /// The default compares [`Entity::field`] against the parameter: text
    /// fields match case-insensitively by substring, other scalars by their
    /// rendered value. Rows lacking the field do not match.
    fn matches(&self, param: &str, value: &str) -> bool {
        match self.field(param) {
            Some(Scalar::Text(text)) => text.to_lowercase().contains(&value.to_lowercase()),
            Some(other) => other.to_param() == value,
            None => false,
        }
    }
}
