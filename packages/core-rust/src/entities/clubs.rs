use serde::{Deserialize, Serialize};

use crate::compose::QueryVocabulary;
use crate::query::SortSpec;
use crate::traits::Entity;
use crate::types::{EntityId, Scalar};

/// Day of the week a club meets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    fn as_str(self) -> &'static str {
        match self {
            Weekday::Monday => "monday",
            Weekday::Tuesday => "tuesday",
            Weekday::Wednesday => "wednesday",
            Weekday::Thursday => "thursday",
            Weekday::Friday => "friday",
            Weekday::Saturday => "saturday",
            Weekday::Sunday => "sunday",
        }
    }
}

/// A club: the group children attend weekly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Club {
    pub id: EntityId,
    pub number: i64,
    pub weekday: Weekday,
    /// Meeting time, `HH:MM`.
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub coordinator_name: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClubDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekday: Option<Weekday>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinator_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl Entity for Club {
    type Draft = ClubDraft;

    const RESOURCE: &'static str = "clubs";
    const SINGULAR: &'static str = "clube";
    const PLURAL: &'static str = "clubes";
    const VOCABULARY: QueryVocabulary = QueryVocabulary {
        sort_param: "sort",
        order_param: "order",
        sort_fields: &[("number", "number"), ("weekday", "weekday"), ("time", "time")],
        filter_keys: &[
            ("search", "searchString"),
            ("weekday", "weekday"),
            ("active", "isActive"),
        ],
    };

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn default_sort() -> Option<SortSpec> {
        Some(SortSpec::asc("number"))
    }

    fn apply_draft(&mut self, draft: &ClubDraft) {
        if let Some(v) = draft.number {
            self.number = v;
        }
        if let Some(v) = draft.weekday {
            self.weekday = v;
        }
        if let Some(v) = &draft.time {
            self.time = Some(v.clone());
        }
        if let Some(v) = &draft.coordinator_name {
            self.coordinator_name = Some(v.clone());
        }
        if let Some(v) = draft.is_active {
            self.is_active = v;
        }
    }

    fn from_draft(id: EntityId, draft: &ClubDraft) -> Self {
        let mut club = Club {
            id,
            number: 0,
            weekday: Weekday::Saturday,
            time: None,
            coordinator_name: None,
            is_active: true,
        };
        club.apply_draft(draft);
        club
    }

    fn validate(draft: &ClubDraft) -> Result<(), String> {
        match draft.number {
            Some(n) if n > 0 => Ok(()),
            _ => Err("Número do clube deve ser positivo".to_string()),
        }
    }

    fn field(&self, server_name: &str) -> Option<Scalar> {
        match server_name {
            "number" => Some(Scalar::Int(self.number)),
            "weekday" => Some(Scalar::from(self.weekday.as_str())),
            "time" => self.time.as_deref().map(Scalar::from),
            "isActive" => Some(Scalar::Bool(self.is_active)),
            _ => None,
        }
    }

    fn matches(&self, param: &str, value: &str) -> bool {
        match param {
            "searchString" => {
                self.number.to_string().contains(value)
                    || self
                        .coordinator_name
                        .as_deref()
                        .is_some_and(|c| super::search_any(&[c], value))
            }
            "weekday" => self.weekday.as_str().eq_ignore_ascii_case(value),
            "isActive" => self.is_active.to_string() == value,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_matches_number_or_coordinator() {
        let club = Club::from_draft(
            EntityId::from("k-1"),
            &ClubDraft {
                number: Some(42),
                coordinator_name: Some("Paula".into()),
                ..ClubDraft::default()
            },
        );
        assert!(club.matches("searchString", "42"));
        assert!(club.matches("searchString", "pau"));
        assert!(!club.matches("searchString", "7"));
        assert!(club.matches("weekday", "SATURDAY"));
    }

    #[test]
    fn number_must_be_positive() {
        assert!(Club::validate(&ClubDraft::default()).is_err());
        assert!(Club::validate(&ClubDraft {
            number: Some(3),
            ..ClubDraft::default()
        })
        .is_ok());
    }
}
