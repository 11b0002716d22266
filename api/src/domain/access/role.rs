use uuid::Uuid;

use crate::domain::access::ability::{Action, Rule, Subject};

#[derive(Debug, Clone)]
pub struct Permission {
    pub id: Uuid,
    pub action: Action,
    pub subject: Subject,
    pub inverted: bool,
    pub description: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Permission {
    pub fn rule(&self) -> Rule {
        Rule {
            action: self.action,
            subject: self.subject,
            inverted: self.inverted,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_system: bool,
    pub permissions: Vec<Permission>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Role {
    pub fn rules(&self) -> Vec<Rule> {
        self.permissions.iter().map(Permission::rule).collect()
    }
}

pub const ADMIN_ROLE: &str = "admin";
pub const USER_ROLE: &str = "user";
