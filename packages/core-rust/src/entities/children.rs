use serde::{Deserialize, Serialize};

use super::search_any;
use crate::compose::QueryVocabulary;
use crate::query::SortSpec;
use crate::traits::Entity;
use crate::types::{EntityId, Scalar};

/// Gender as recorded on the enrollment form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Gender {
    M,
    F,
}

impl Gender {
    fn as_str(self) -> &'static str {
        match self {
            Gender::M => "M",
            Gender::F => "F",
        }
    }
}

/// A child enrolled in a club.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Child {
    pub id: EntityId,
    pub name: String,
    pub gender: Gender,
    /// ISO date (`YYYY-MM-DD`); sorts lexicographically.
    pub birth_date: String,
    pub guardian_name: String,
    pub guardian_phone: String,
    #[serde(default)]
    pub club_number: Option<i64>,
    pub is_active: bool,
    /// ISO date the child joined.
    pub joined_at: String,
}

/// Create/update payload for [`Child`]. `None` leaves a field untouched on update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guardian_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guardian_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub club_number: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub joined_at: Option<String>,
}

impl Entity for Child {
    type Draft = ChildDraft;

    const RESOURCE: &'static str = "children";
    const SINGULAR: &'static str = "criança";
    const PLURAL: &'static str = "crianças";
    const VOCABULARY: QueryVocabulary = QueryVocabulary {
        sort_param: "orderBy",
        order_param: "order",
        sort_fields: &[
            ("name", "name"),
            ("birthDate", "birthDate"),
            ("joinedAt", "joinedAt"),
            ("club", "clubNumber"),
        ],
        filter_keys: &[
            ("search", "searchString"),
            ("club", "clubNumber"),
            ("gender", "gender"),
            ("active", "isActive"),
        ],
    };

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn default_sort() -> Option<SortSpec> {
        Some(SortSpec::asc("name"))
    }

    fn apply_draft(&mut self, draft: &ChildDraft) {
        if let Some(v) = &draft.name {
            self.name.clone_from(v);
        }
        if let Some(v) = draft.gender {
            self.gender = v;
        }
        if let Some(v) = &draft.birth_date {
            self.birth_date.clone_from(v);
        }
        if let Some(v) = &draft.guardian_name {
            self.guardian_name.clone_from(v);
        }
        if let Some(v) = &draft.guardian_phone {
            self.guardian_phone.clone_from(v);
        }
        if let Some(v) = draft.club_number {
            self.club_number = Some(v);
        }
        if let Some(v) = draft.is_active {
            self.is_active = v;
        }
        if let Some(v) = &draft.joined_at {
            self.joined_at.clone_from(v);
        }
    }

    fn from_draft(id: EntityId, draft: &ChildDraft) -> Self {
        let mut child = Child {
            id,
            name: String::new(),
            gender: Gender::F,
            birth_date: String::new(),
            guardian_name: String::new(),
            guardian_phone: String::new(),
            club_number: None,
            is_active: true,
            joined_at: String::new(),
        };
        child.apply_draft(draft);
        child
    }

    fn validate(draft: &ChildDraft) -> Result<(), String> {
        if draft.name.as_deref().is_none_or(|n| n.trim().is_empty()) {
            return Err("Nome da criança é obrigatório".to_string());
        }
        if draft.birth_date.as_deref().is_none_or(str::is_empty) {
            return Err("Data de nascimento é obrigatória".to_string());
        }
        Ok(())
    }

    fn field(&self, server_name: &str) -> Option<Scalar> {
        match server_name {
            "name" => Some(Scalar::from(self.name.as_str())),
            "birthDate" => Some(Scalar::from(self.birth_date.as_str())),
            "joinedAt" => Some(Scalar::from(self.joined_at.as_str())),
            "clubNumber" => self.club_number.map(Scalar::Int),
            "gender" => Some(Scalar::from(self.gender.as_str())),
            "isActive" => Some(Scalar::Bool(self.is_active)),
            _ => None,
        }
    }

    fn matches(&self, param: &str, value: &str) -> bool {
        match param {
            "searchString" => search_any(&[&self.name, &self.guardian_name], value),
            "gender" => self.gender.as_str().eq_ignore_ascii_case(value),
            "clubNumber" => self.club_number.map(|n| n.to_string()).as_deref() == Some(value),
            "isActive" => self.is_active.to_string() == value,
            _ => false,
        }
    }
}
