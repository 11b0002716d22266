use uuid::Uuid;

use crate::application::errors::{AppError, AppResult, ErrorCode};
use crate::application::ports::role_repository::RoleRepository;
use crate::domain::access::ability::{Ability, Action, Subject};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    Session(Uuid),
    ApiKey(Uuid),
}

/// Authenticated caller together with the ability compiled from its roles.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: Uuid,
    pub method: AuthMethod,
    pub ability: Ability,
}

impl Principal {
    pub fn can(&self, action: Action, subject: Subject) -> bool {
        self.ability.can(action, subject)
    }

    pub fn require(&self, action: Action, subject: Subject) -> AppResult<()> {
        if self.can(action, subject) {
            Ok(())
        } else {
            tracing::debug!(user_id = %self.user_id, %action, %subject, "ability_denied");
            Err(AppError::code(ErrorCode::Forbidden))
        }
    }

    /// Owners always pass; everyone else needs the ability.
    pub fn require_owner_or(&self, owner_id: Uuid, action: Action, subject: Subject) -> AppResult<()> {
        if self.user_id == owner_id {
            Ok(())
        } else {
            self.require(action, subject)
        }
    }

    pub fn session_id(&self) -> Option<Uuid> {
        match self.method {
            AuthMethod::Session(id) => Some(id),
            AuthMethod::ApiKey(_) => None,
        }
    }
}

pub async fn ability_for_user<R>(roles: &R, user_id: Uuid) -> anyhow::Result<Ability>
where
    R: RoleRepository + ?Sized,
{
    let roles = roles.roles_for_user(user_id).await?;
    Ok(Ability::from_roles(roles.iter().map(|r| r.rules())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::access::ability::Rule;

    fn principal(rules: Vec<Rule>) -> Principal {
        Principal {
            user_id: Uuid::new_v4(),
            method: AuthMethod::Session(Uuid::new_v4()),
            ability: Ability::new(rules),
        }
    }

    #[test]
    fn require_maps_denial_to_forbidden() {
        let p = principal(vec![Rule::can(Action::Read, Subject::User)]);
        assert!(p.require(Action::Read, Subject::User).is_ok());
        let err = p.require(Action::Delete, Subject::User).unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::Forbidden);
    }

    #[test]
    fn owner_bypasses_ability() {
        let p = principal(vec![]);
        assert!(p.require_owner_or(p.user_id, Action::Read, Subject::File).is_ok());
        assert!(
            p.require_owner_or(Uuid::new_v4(), Action::Read, Subject::File)
                .is_err()
        );
    }

    #[test]
    fn session_id_only_for_session_auth() {
        let mut p = principal(vec![]);
        assert!(p.session_id().is_some());
        p.method = AuthMethod::ApiKey(Uuid::new_v4());
        assert_eq!(p.session_id(), None);
    }
}
