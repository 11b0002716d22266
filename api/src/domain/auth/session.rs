use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub refresh_token_hash: String,
    pub user_agent: Option<String>,
    pub ip: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Revoked,
    Expired,
}

impl Session {
    pub fn state_at(&self, now: DateTime<Utc>) -> SessionState {
        if self.revoked_at.is_some() {
            SessionState::Revoked
        } else if self.expires_at <= now {
            SessionState::Expired
        } else {
            SessionState::Active
        }
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.state_at(now) == SessionState::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(expires_in: Duration, revoked: bool) -> Session {
        let now = Utc::now();
        Session {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            refresh_token_hash: String::new(),
            user_agent: None,
            ip: None,
            expires_at: now + expires_in,
            revoked_at: revoked.then_some(now),
            last_used_at: None,
            created_at: now,
        }
    }

    #[test]
    fn state_reflects_revocation_before_expiry() {
        let now = Utc::now();
        assert_eq!(
            session(Duration::hours(1), false).state_at(now),
            SessionState::Active
        );
        assert_eq!(
            session(Duration::hours(1), true).state_at(now),
            SessionState::Revoked
        );
        assert_eq!(
            session(Duration::hours(-1), true).state_at(now),
            SessionState::Revoked
        );
        assert_eq!(
            session(Duration::hours(-1), false).state_at(now),
            SessionState::Expired
        );
    }
}
