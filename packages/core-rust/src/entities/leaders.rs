use serde::{Deserialize, Serialize};

use super::search_any;
use crate::compose::QueryVocabulary;
use crate::query::SortSpec;
use crate::traits::Entity;
use crate::types::{EntityId, Scalar};

/// A volunteer leader, optionally assigned to a club.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Leader {
    pub id: EntityId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub club_number: Option<i64>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::option_option)]
pub struct LeaderDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// `Some(None)` unassigns the leader from its club.
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "super::deserialize_double_option"
    )]
    pub club_number: Option<Option<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl Entity for Leader {
    type Draft = LeaderDraft;

    const RESOURCE: &'static str = "leaders";
    const SINGULAR: &'static str = "líder";
    const PLURAL: &'static str = "líderes";
    const VOCABULARY: QueryVocabulary = QueryVocabulary {
        sort_param: "sort",
        order_param: "order",
        sort_fields: &[("name", "name"), ("email", "email"), ("club", "clubNumber")],
        filter_keys: &[
            ("search", "searchString"),
            ("club", "clubNumber"),
            ("unassigned", "withoutClub"),
        ],
    };

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn default_sort() -> Option<SortSpec> {
        Some(SortSpec::asc("name"))
    }

    fn apply_draft(&mut self, draft: &LeaderDraft) {
        if let Some(v) = &draft.name {
            self.name.clone_from(v);
        }
        if let Some(v) = &draft.email {
            self.email.clone_from(v);
        }
        if let Some(v) = &draft.phone {
            self.phone = Some(v.clone());
        }
        if let Some(v) = draft.club_number {
            self.club_number = v;
        }
        if let Some(v) = draft.is_active {
            self.is_active = v;
        }
    }

    fn from_draft(id: EntityId, draft: &LeaderDraft) -> Self {
        let mut leader = Leader {
            id,
            name: String::new(),
            email: String::new(),
            phone: None,
            club_number: None,
            is_active: true,
        };
        leader.apply_draft(draft);
        leader
    }

    fn validate(draft: &LeaderDraft) -> Result<(), String> {
        match draft.email.as_deref() {
            Some(email) if email.contains('@') => Ok(()),
            _ => Err("E-mail do líder inválido".to_string()),
        }
    }

    fn field(&self, server_name: &str) -> Option<Scalar> {
        match server_name {
            "name" => Some(Scalar::from(self.name.as_str())),
            "email" => Some(Scalar::from(self.email.as_str())),
            "clubNumber" => self.club_number.map(Scalar::Int),
            _ => None,
        }
    }

    fn matches(&self, param: &str, value: &str) -> bool {
        match param {
            "searchString" => search_any(&[&self.name, &self.email], value),
            "clubNumber" => self.club_number.map(|n| n.to_string()).as_deref() == Some(value),
            "withoutClub" => (self.club_number.is_none()).to_string() == value,
            _ => false,
        }
    }
}
