use serde::{Deserialize, Serialize};

use crate::compose::QueryVocabulary;
use crate::query::SortSpec;
use crate::traits::Entity;
use crate::types::{EntityId, Scalar};

/// Weekly attendance sheet of one child.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagela {
    pub id: EntityId,
    pub child_id: EntityId,
    pub year: i64,
    /// ISO week number, 1..=53.
    pub week: i64,
    pub present: bool,
    pub did_meditation: bool,
    pub recited_verse: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagelaDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_id: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub present: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub did_meditation: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recited_verse: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Entity for Pagela {
    type Draft = PagelaDraft;

    const RESOURCE: &'static str = "pagelas";
    const SINGULAR: &'static str = "pagela";
    const PLURAL: &'static str = "pagelas";
    const VOCABULARY: QueryVocabulary = QueryVocabulary {
        sort_param: "sort",
        order_param: "order",
        sort_fields: &[("week", "week"), ("year", "year")],
        filter_keys: &[("child", "childId"), ("year", "year"), ("week", "week")],
    };

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn default_sort() -> Option<SortSpec> {
        Some(SortSpec::desc("week"))
    }

    fn apply_draft(&mut self, draft: &PagelaDraft) {
        if let Some(v) = &draft.child_id {
            self.child_id = v.clone();
        }
        if let Some(v) = draft.year {
            self.year = v;
        }
        if let Some(v) = draft.week {
            self.week = v;
        }
        if let Some(v) = draft.present {
            self.present = v;
        }
        if let Some(v) = draft.did_meditation {
            self.did_meditation = v;
        }
        if let Some(v) = draft.recited_verse {
            self.recited_verse = v;
        }
        if let Some(v) = &draft.notes {
            self.notes = Some(v.clone());
        }
    }

    fn from_draft(id: EntityId, draft: &PagelaDraft) -> Self {
        let mut pagela = Pagela {
            id,
            child_id: EntityId::from(""),
            year: 0,
            week: 0,
            present: false,
            did_meditation: false,
            recited_verse: false,
            notes: None,
        };
        pagela.apply_draft(draft);
        pagela
    }

    fn validate(draft: &PagelaDraft) -> Result<(), String> {
        if draft.child_id.is_none() {
            return Err("Pagela precisa de uma criança".to_string());
        }
        match draft.week {
            Some(w) if (1..=53).contains(&w) => Ok(()),
            _ => Err("Semana deve estar entre 1 e 53".to_string()),
        }
    }

    fn field(&self, server_name: &str) -> Option<Scalar> {
        match server_name {
            "childId" => Some(Scalar::from(self.child_id.as_str())),
            "year" => Some(Scalar::Int(self.year)),
            "week" => Some(Scalar::Int(self.week)),
            "present" => Some(Scalar::Bool(self.present)),
            _ => None,
        }
    }

    fn matches(&self, param: &str, value: &str) -> bool {
        match param {
            "childId" => self.child_id.as_str() == value,
            other => self
                .field(other)
                .is_some_and(|scalar| scalar.to_param() == value),
        }
    }
}
