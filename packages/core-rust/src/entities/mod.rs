//! Concrete entities of the management console.
//!
//! Each entity carries its own sort/filter vocabulary; the controllers in
//! `rollcall-sync` are instantiated once per entity with these types.

pub mod children;
pub mod clubs;
pub mod leaders;
pub mod pagelas;
pub mod shelters;
pub mod users;

pub use children::{Child, ChildDraft, Gender};
pub use clubs::{Club, ClubDraft, Weekday};
pub use leaders::{Leader, LeaderDraft};
pub use pagelas::{Pagela, PagelaDraft};
pub use shelters::{Shelter, ShelterDraft};
pub use users::{Role, User, UserDraft};

use serde::{Deserialize, Deserializer};

/// Deserializes a field that can be absent (`None`) or explicitly `null`
/// (`Some(None)`), so drafts can distinguish "leave as is" from "clear".
#[allow(clippy::option_option)]
pub(crate) fn deserialize_double_option<'de, T, D>(
    deserializer: D,
) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

/// Case-insensitive substring match of `needle` against any of `haystacks`.
pub(crate) fn search_any(haystacks: &[&str], needle: &str) -> bool {
    let needle = needle.to_lowercase();
    haystacks
        .iter()
        .any(|h| h.to_lowercase().contains(&needle))
}
