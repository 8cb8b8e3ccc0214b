use serde::{Deserialize, Serialize};

use super::search_any;
use crate::compose::QueryVocabulary;
use crate::query::SortSpec;
use crate::traits::Entity;
use crate::types::{EntityId, Scalar};

/// A shelter: the facility where clubs meet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shelter {
    pub id: EntityId,
    pub name: String,
    pub city: String,
    /// Two-letter state code.
    pub state: String,
    #[serde(default)]
    pub capacity: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShelterDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<i64>,
}

impl Entity for Shelter {
    type Draft = ShelterDraft;

    const RESOURCE: &'static str = "shelters";
    const SINGULAR: &'static str = "abrigo";
    const PLURAL: &'static str = "abrigos";
    const VOCABULARY: QueryVocabulary = QueryVocabulary {
        sort_param: "sort",
        order_param: "order",
        sort_fields: &[("name", "name"), ("city", "address.city"), ("capacity", "capacity")],
        filter_keys: &[
            ("search", "searchString"),
            ("city", "address.city"),
            ("state", "address.state"),
        ],
    };

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn default_sort() -> Option<SortSpec> {
        Some(SortSpec::asc("name"))
    }

    fn apply_draft(&mut self, draft: &ShelterDraft) {
        if let Some(v) = &draft.name {
            self.name.clone_from(v);
        }
        if let Some(v) = &draft.city {
            self.city.clone_from(v);
        }
        if let Some(v) = &draft.state {
            self.state.clone_from(v);
        }
        if let Some(v) = draft.capacity {
            self.capacity = Some(v);
        }
    }

    fn from_draft(id: EntityId, draft: &ShelterDraft) -> Self {
        let mut shelter = Shelter {
            id,
            name: String::new(),
            city: String::new(),
            state: String::new(),
            capacity: None,
        };
        shelter.apply_draft(draft);
        shelter
    }

    fn validate(draft: &ShelterDraft) -> Result<(), String> {
        if draft.name.as_deref().is_none_or(|n| n.trim().is_empty()) {
            return Err("Nome do abrigo é obrigatório".to_string());
        }
        if let Some(state) = &draft.state {
            if state.len() != 2 {
                return Err("UF deve ter duas letras".to_string());
            }
        }
        Ok(())
    }

    fn field(&self, server_name: &str) -> Option<Scalar> {
        match server_name {
            "name" => Some(Scalar::from(self.name.as_str())),
            "address.city" => Some(Scalar::from(self.city.as_str())),
            "address.state" => Some(Scalar::from(self.state.as_str())),
            "capacity" => self.capacity.map(Scalar::Int),
            _ => None,
        }
    }

    fn matches(&self, param: &str, value: &str) -> bool {
        match param {
            "searchString" => search_any(&[&self.name, &self.city], value),
            "address.state" => self.state.eq_ignore_ascii_case(value),
            other => match self.field(other) {
                Some(Scalar::Text(text)) => text.to_lowercase().contains(&value.to_lowercase()),
                Some(scalar) => scalar.to_param() == value,
                None => false,
            },
        }
    }
}
