use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct TermPolicy {
    pub id: Uuid,
    /// e.g. `terms`, `privacy`
    pub kind: String,
    pub version: String,
    pub title: String,
    pub content: String,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TermPolicy {
    pub fn is_published(&self) -> bool {
        self.published_at.is_some()
    }
}

/// Latest published policy of every kind, ordered by kind.
pub fn current_per_kind(policies: &[TermPolicy]) -> Vec<TermPolicy> {
    let mut latest: HashMap<&str, &TermPolicy> = HashMap::new();
    for p in policies.iter().filter(|p| p.is_published()) {
        match latest.get(p.kind.as_str()) {
            Some(existing) if existing.published_at >= p.published_at => {}
            _ => {
                latest.insert(p.kind.as_str(), p);
            }
        }
    }
    let mut out: Vec<TermPolicy> = latest.into_values().cloned().collect();
    out.sort_by(|a, b| a.kind.cmp(&b.kind));
    out
}

/// Current policies the user has not accepted yet.
pub fn pending(current: Vec<TermPolicy>, accepted: &HashSet<Uuid>) -> Vec<TermPolicy> {
    current
        .into_iter()
        .filter(|p| !accepted.contains(&p.id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn policy(kind: &str, version: &str, published_days_ago: Option<i64>) -> TermPolicy {
        let now = Utc::now();
        TermPolicy {
            id: Uuid::new_v4(),
            kind: kind.into(),
            version: version.into(),
            title: format!("{kind} {version}"),
            content: String::new(),
            published_at: published_days_ago.map(|d| now - Duration::days(d)),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn picks_most_recently_published_per_kind() {
        let policies = vec![
            policy("terms", "1", Some(30)),
            policy("terms", "2", Some(1)),
            policy("terms", "3", None),
            policy("privacy", "1", Some(10)),
        ];
        let current = current_per_kind(&policies);
        let versions: Vec<(&str, &str)> = current
            .iter()
            .map(|p| (p.kind.as_str(), p.version.as_str()))
            .collect();
        assert_eq!(versions, vec![("privacy", "1"), ("terms", "2")]);
    }

    #[test]
    fn pending_excludes_accepted_policies() {
        let terms = policy("terms", "2", Some(1));
        let privacy = policy("privacy", "1", Some(3));
        let accepted: HashSet<Uuid> = [terms.id].into_iter().collect();
        let left = pending(vec![terms, privacy.clone()], &accepted);
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].id, privacy.id);
    }
}
