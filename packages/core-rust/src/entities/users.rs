use serde::{Deserialize, Serialize};

use super::search_any;
use crate::compose::QueryVocabulary;
use crate::query::SortSpec;
use crate::traits::Entity;
use crate::types::{EntityId, Scalar};

/// Access role of a console user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Coordinator,
    Teacher,
}

impl Role {
    fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Coordinator => "coordinator",
            Role::Teacher => "teacher",
        }
    }
}

/// A console user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: EntityId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub active: bool,
    /// Whether the user finished the first-access profile.
    pub completed: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Entity for User {
    type Draft = UserDraft;

    const RESOURCE: &'static str = "users";
    const SINGULAR: &'static str = "usuário";
    const PLURAL: &'static str = "usuários";
    const VOCABULARY: QueryVocabulary = QueryVocabulary {
        sort_param: "sort",
        order_param: "order",
        sort_fields: &[
            ("name", "name"),
            ("email", "email"),
            ("role", "role"),
            ("createdAt", "createdAt"),
        ],
        filter_keys: &[("search", "q"), ("role", "role"), ("active", "active")],
    };

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn default_sort() -> Option<SortSpec> {
        Some(SortSpec::desc("createdAt"))
    }

    fn apply_draft(&mut self, draft: &UserDraft) {
        if let Some(v) = &draft.name {
            self.name.clone_from(v);
        }
        if let Some(v) = &draft.email {
            self.email.clone_from(v);
        }
        if let Some(v) = draft.role {
            self.role = v;
        }
        if let Some(v) = draft.active {
            self.active = v;
        }
    }

    fn from_draft(id: EntityId, draft: &UserDraft) -> Self {
        let mut user = User {
            id,
            name: String::new(),
            email: String::new(),
            role: Role::Teacher,
            active: true,
            completed: false,
            created_at: String::new(),
        };
        user.apply_draft(draft);
        user
    }

    fn validate(draft: &UserDraft) -> Result<(), String> {
        if draft.email.as_deref().is_none_or(|e| !e.contains('@')) {
            return Err("E-mail inválido".to_string());
        }
        if draft.password.as_deref().is_some_and(|p| p.len() < 6) {
            return Err("Senha deve ter ao menos 6 caracteres".to_string());
        }
        Ok(())
    }

    fn field(&self, server_name: &str) -> Option<Scalar> {
        match server_name {
            "name" => Some(Scalar::from(self.name.as_str())),
            "email" => Some(Scalar::from(self.email.as_str())),
            "role" => Some(Scalar::from(self.role.as_str())),
            "active" => Some(Scalar::Bool(self.active)),
            "createdAt" => Some(Scalar::from(self.created_at.as_str())),
            _ => None,
        }
    }

    fn matches(&self, param: &str, value: &str) -> bool {
        match param {
            "q" => search_any(&[&self.name, &self.email], value),
            "role" => self.role.as_str() == value,
            "active" => self.active.to_string() == value,
            _ => false,
        }
    }
}
