use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Verb half of a permission. `Manage` matches every action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Manage,
    Create,
    Read,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::Manage,
        Action::Create,
        Action::Read,
        Action::Update,
        Action::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Manage => "manage",
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }

    fn covers(&self, other: Action) -> bool {
        *self == Action::Manage || *self == other
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Action::ALL
            .into_iter()
            .find(|a| a.as_str() == needle)
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

/// Resource half of a permission. `All` matches every subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Subject {
    #[serde(rename = "all")]
    All,
    User,
    Role,
    Permission,
    ApiKey,
    Setting,
    TermPolicy,
    ActivityLog,
    Notification,
    File,
}

impl Subject {
    pub const ALL: [Subject; 10] = [
        Subject::All,
        Subject::User,
        Subject::Role,
        Subject::Permission,
        Subject::ApiKey,
        Subject::Setting,
        Subject::TermPolicy,
        Subject::ActivityLog,
        Subject::Notification,
        Subject::File,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::All => "all",
            Subject::User => "User",
            Subject::Role => "Role",
            Subject::Permission => "Permission",
            Subject::ApiKey => "ApiKey",
            Subject::Setting => "Setting",
            Subject::TermPolicy => "TermPolicy",
            Subject::ActivityLog => "ActivityLog",
            Subject::Notification => "Notification",
            Subject::File => "File",
        }
    }

    fn covers(&self, other: Subject) -> bool {
        *self == Subject::All || *self == other
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Subject {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        Subject::ALL
            .into_iter()
            .find(|subj| subj.as_str().to_ascii_lowercase() == needle)
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown variant `{0}`")]
pub struct UnknownVariant(pub String);

/// A single `can` (or, when `inverted`, `cannot`) statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Rule {
    pub action: Action,
    pub subject: Subject,
    pub inverted: bool,
}

impl Rule {
    pub fn can(action: Action, subject: Subject) -> Self {
        Self {
            action,
            subject,
            inverted: false,
        }
    }

    pub fn cannot(action: Action, subject: Subject) -> Self {
        Self {
            action,
            subject,
            inverted: true,
        }
    }

    fn matches(&self, action: Action, subject: Subject) -> bool {
        self.action.covers(action) && self.subject.covers(subject)
    }
}

/// Ordered rule set. Later rules take precedence over earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ability {
    rules: Vec<Rule>,
}

impl Ability {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Merges the rule sets of several roles. Deny rules are moved behind every
    /// allow rule so a `cannot` coming from any role overrides a `can` from another.
    pub fn from_roles<I, R>(roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = Rule>,
    {
        let (mut allow, mut deny): (Vec<Rule>, Vec<Rule>) = (Vec::new(), Vec::new());
        for role in roles {
            for rule in role {
                let bucket = if rule.inverted { &mut deny } else { &mut allow };
                if !bucket.contains(&rule) {
                    bucket.push(rule);
                }
            }
        }
        allow.extend(deny);
        Self { rules: allow }
    }

    pub fn can(&self, action: Action, subject: Subject) -> bool {
        self.rules
            .iter()
            .rev()
            .find(|rule| rule.matches(action, subject))
            .map(|rule| !rule.inverted)
            .unwrap_or(false)
    }

    pub fn cannot(&self, action: Action, subject: Subject) -> bool {
        !self.can(action, subject)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
