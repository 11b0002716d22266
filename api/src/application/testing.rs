//! In-memory port implementations backing the use-case tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::application::ports::activity_log_repository::{ActivityFilter, ActivityLogRepository};
use crate::application::ports::api_key_repository::ApiKeyRepository;
use crate::application::ports::files_repository::{FilesRepository, NewStoredFile};
use crate::application::ports::notification_repository::NotificationRepository;
use crate::application::ports::notification_sender::{
    DeliveryReceipt, NotificationSender, NotificationSignal, Recipient,
};
use crate::application::ports::permission_repository::PermissionRepository;
use crate::application::ports::role_repository::RoleRepository;
use crate::application::ports::session_repository::{NewSession, SessionRepository};
use crate::application::ports::setting_repository::{SettingInput, SettingRepository};
use crate::application::ports::storage_port::{PresignedUpload, StoragePort, StoredObject};
use crate::application::ports::term_policy_repository::TermPolicyRepository;
use crate::application::ports::user_repository::UserRepository;
use crate::application::access::{AuthMethod, Principal};
use crate::domain::access::ability::{Ability, Action, Rule, Subject};
use crate::domain::access::role::{Permission, Role};
use crate::domain::activity::activity_log::{ActivityLog, NewActivity};
use crate::domain::auth::api_key::ApiKey;
use crate::domain::auth::session::Session;
use crate::domain::files::stored_file::StoredFile;
use crate::domain::notifications::notification::{
    Channel, DeliveryStatus, NewNotification, Notification,
};
use crate::domain::settings::setting::Setting;
use crate::domain::terms::term_policy::TermPolicy;
use crate::domain::users::user::{User, UserCredentials};

#[derive(Debug, Clone)]
struct UserRec {
    id: Uuid,
    email: String,
    name: String,
    password_hash: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    deleted: bool,
}

#[derive(Debug, Clone)]
struct RoleRec {
    id: Uuid,
    name: String,
    description: Option<String>,
    is_system: bool,
    created_at: DateTime<Utc>,
    deleted: bool,
}

#[derive(Default)]
struct State {
    users: Vec<UserRec>,
    user_roles: Vec<(Uuid, Uuid)>,
    roles: Vec<RoleRec>,
    role_permissions: Vec<(Uuid, Uuid)>,
    permissions: Vec<Permission>,
    sessions: Vec<Session>,
    api_keys: Vec<(ApiKey, String)>,
    settings: Vec<Setting>,
    policies: Vec<(TermPolicy, bool)>,
    acceptances: Vec<(Uuid, Uuid)>,
    activity: Vec<ActivityLog>,
    notifications: Vec<(Notification, DateTime<Utc>)>,
    files: Vec<(StoredFile, bool)>,
}

impl State {
    fn role(&self, rec: &RoleRec) -> Role {
        let permissions = self
            .role_permissions
            .iter()
            .filter(|(rid, _)| *rid == rec.id)
            .filter_map(|(_, pid)| self.permissions.iter().find(|p| p.id == *pid).cloned())
            .collect();
        Role {
            id: rec.id,
            name: rec.name.clone(),
            description: rec.description.clone(),
            is_system: rec.is_system,
            permissions,
            created_at: rec.created_at,
            updated_at: rec.created_at,
        }
    }

    fn user(&self, rec: &UserRec) -> User {
        let roles = self
            .user_roles
            .iter()
            .filter(|(uid, _)| *uid == rec.id)
            .filter_map(|(_, rid)| self.roles.iter().find(|r| r.id == *rid && !r.deleted))
            .map(|r| r.name.clone())
            .collect();
        User {
            id: rec.id,
            email: rec.email.clone(),
            name: rec.name.clone(),
            is_active: rec.is_active,
            roles,
            created_at: rec.created_at,
            updated_at: rec.created_at,
        }
    }
}

fn paginate<T: Clone>(all: Vec<T>, page: PageRequest) -> Page<T> {
    let total = all.len() as i64;
    let items = all
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit as usize)
        .collect();
    Page::new(items, total, page)
}

/// One shared store implementing every repository port.
#[derive(Default)]
pub struct MemoryDb {
    state: Mutex<State>,
}

impl MemoryDb {
    pub fn notification(&self, id: Uuid) -> Option<Notification> {
        let st = self.state.lock().unwrap();
        st.notifications
            .iter()
            .find(|(n, _)| n.id == id)
            .map(|(n, _)| n.clone())
    }

    pub fn notifications_for(&self, user_id: Uuid) -> Vec<Notification> {
        let st = self.state.lock().unwrap();
        st.notifications
            .iter()
            .filter(|(n, _)| n.user_id == user_id)
            .map(|(n, _)| n.clone())
            .collect()
    }

    pub fn session(&self, id: Uuid) -> Option<Session> {
        let st = self.state.lock().unwrap();
        st.sessions.iter().find(|s| s.id == id).cloned()
    }

    pub fn activity(&self) -> Vec<ActivityLog> {
        self.state.lock().unwrap().activity.clone()
    }

    pub fn expire_api_key(&self, id: Uuid, at: DateTime<Utc>) {
        let mut st = self.state.lock().unwrap();
        if let Some((k, _)) = st.api_keys.iter_mut().find(|(k, _)| k.id == id) {
            k.expires_at = Some(at);
        }
    }

    pub fn expire_session(&self, id: Uuid) {
        let mut st = self.state.lock().unwrap();
        if let Some(s) = st.sessions.iter_mut().find(|s| s.id == id) {
            s.expires_at = Utc::now() - chrono::Duration::seconds(1);
        }
    }

    pub fn raw_setting_count(&self) -> usize {
        self.state.lock().unwrap().settings.len()
    }
}

#[async_trait]
impl UserRepository for MemoryDb {
    async fn create_user(
        &self,
        email: &str,
        name: &str,
        password_hash: &str,
    ) -> anyhow::Result<User> {
        let mut st = self.state.lock().unwrap();
        if st
            .users
            .iter()
            .any(|u| !u.deleted && u.email.eq_ignore_ascii_case(email))
        {
            anyhow::bail!("duplicate email");
        }
        let rec = UserRec {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.to_string(),
            password_hash: password_hash.to_string(),
            is_active: true,
            created_at: Utc::now(),
            deleted: false,
        };
        st.users.push(rec.clone());
        Ok(st.user(&rec))
    }

    async fn email_exists(&self, email: &str) -> anyhow::Result<bool> {
        let st = self.state.lock().unwrap();
        Ok(st
            .users
            .iter()
            .any(|u| !u.deleted && u.email.eq_ignore_ascii_case(email)))
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let st = self.state.lock().unwrap();
        Ok(st
            .users
            .iter()
            .find(|u| u.id == id && !u.deleted)
            .map(|u| st.user(u)))
    }

    async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> anyhow::Result<Option<UserCredentials>> {
        let st = self.state.lock().unwrap();
        Ok(st
            .users
            .iter()
            .find(|u| !u.deleted && u.email.eq_ignore_ascii_case(email))
            .map(|u| UserCredentials {
                id: u.id,
                password_hash: u.password_hash.clone(),
                is_active: u.is_active,
            }))
    }

    async fn find_credentials_by_id(&self, id: Uuid) -> anyhow::Result<Option<UserCredentials>> {
        let st = self.state.lock().unwrap();
        Ok(st
            .users
            .iter()
            .find(|u| !u.deleted && u.id == id)
            .map(|u| UserCredentials {
                id: u.id,
                password_hash: u.password_hash.clone(),
                is_active: u.is_active,
            }))
    }

    async fn list(&self, search: Option<&str>, page: PageRequest) -> anyhow::Result<Page<User>> {
        let st = self.state.lock().unwrap();
        let needle = search.map(|s| s.to_lowercase());
        let all: Vec<User> = st
            .users
            .iter()
            .filter(|u| !u.deleted)
            .filter(|u| match &needle {
                Some(n) => u.email.to_lowercase().contains(n) || u.name.to_lowercase().contains(n),
                None => true,
            })
            .map(|u| st.user(u))
            .collect();
        Ok(paginate(all, page))
    }

    async fn update_profile(
        &self,
        id: Uuid,
        name: Option<&str>,
        is_active: Option<bool>,
    ) -> anyhow::Result<Option<User>> {
        let mut st = self.state.lock().unwrap();
        let Some(rec) = st.users.iter_mut().find(|u| u.id == id && !u.deleted) else {
            return Ok(None);
        };
        if let Some(n) = name {
            rec.name = n.to_string();
        }
        if let Some(a) = is_active {
            rec.is_active = a;
        }
        let rec = rec.clone();
        Ok(Some(st.user(&rec)))
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> anyhow::Result<bool> {
        let mut st = self.state.lock().unwrap();
        match st.users.iter_mut().find(|u| u.id == id && !u.deleted) {
            Some(rec) => {
                rec.password_hash = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_roles(&self, user_id: Uuid, role_ids: &[Uuid]) -> anyhow::Result<()> {
        let mut st = self.state.lock().unwrap();
        st.user_roles.retain(|(uid, _)| *uid != user_id);
        for rid in role_ids {
            st.user_roles.push((user_id, *rid));
        }
        Ok(())
    }

    async fn soft_delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut st = self.state.lock().unwrap();
        match st.users.iter_mut().find(|u| u.id == id && !u.deleted) {
            Some(rec) => {
                rec.deleted = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl RoleRepository for MemoryDb {
    async fn list(&self) -> anyhow::Result<Vec<Role>> {
        let st = self.state.lock().unwrap();
        Ok(st
            .roles
            .iter()
            .filter(|r| !r.deleted)
            .map(|r| st.role(r))
            .collect())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Role>> {
        let st = self.state.lock().unwrap();
        Ok(st
            .roles
            .iter()
            .find(|r| r.id == id && !r.deleted)
            .map(|r| st.role(r)))
    }

    async fn find_by_name(&self, name: &str) -> anyhow::Result<Option<Role>> {
        let st = self.state.lock().unwrap();
        Ok(st
            .roles
            .iter()
            .find(|r| r.name == name && !r.deleted)
            .map(|r| st.role(r)))
    }

    async fn create(
        &self,
        name: &str,
        description: Option<&str>,
        is_system: bool,
    ) -> anyhow::Result<Role> {
        let mut st = self.state.lock().unwrap();
        let rec = RoleRec {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.map(str::to_string),
            is_system,
            created_at: Utc::now(),
            deleted: false,
        };
        st.roles.push(rec.clone());
        Ok(st.role(&rec))
    }

    async fn update(
        &self,
        id: Uuid,
        name: Option<&str>,
        description: Option<Option<&str>>,
    ) -> anyhow::Result<Option<Role>> {
        let mut st = self.state.lock().unwrap();
        let Some(rec) = st.roles.iter_mut().find(|r| r.id == id && !r.deleted) else {
            return Ok(None);
        };
        if let Some(n) = name {
            rec.name = n.to_string();
        }
        if let Some(d) = description {
            rec.description = d.map(str::to_string);
        }
        let rec = rec.clone();
        Ok(Some(st.role(&rec)))
    }

    async fn set_permissions(&self, role_id: Uuid, permission_ids: &[Uuid]) -> anyhow::Result<()> {
        let mut st = self.state.lock().unwrap();
        st.role_permissions.retain(|(rid, _)| *rid != role_id);
        for pid in permission_ids {
            st.role_permissions.push((role_id, *pid));
        }
        Ok(())
    }

    async fn soft_delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut st = self.state.lock().unwrap();
        match st.roles.iter_mut().find(|r| r.id == id && !r.deleted) {
            Some(rec) => {
                rec.deleted = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn roles_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Role>> {
        let st = self.state.lock().unwrap();
        Ok(st
            .user_roles
            .iter()
            .filter(|(uid, _)| *uid == user_id)
            .filter_map(|(_, rid)| st.roles.iter().find(|r| r.id == *rid && !r.deleted))
            .map(|r| st.role(r))
            .collect())
    }

    async fn existing_ids(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Uuid>> {
        let st = self.state.lock().unwrap();
        Ok(ids
            .iter()
            .copied()
            .filter(|id| st.roles.iter().any(|r| r.id == *id && !r.deleted))
            .collect())
    }
}

#[async_trait]
impl PermissionRepository for MemoryDb {
    async fn list(&self) -> anyhow::Result<Vec<Permission>> {
        Ok(self.state.lock().unwrap().permissions.clone())
    }

    async fn find(
        &self,
        action: Action,
        subject: Subject,
        inverted: bool,
    ) -> anyhow::Result<Option<Permission>> {
        let st = self.state.lock().unwrap();
        Ok(st
            .permissions
            .iter()
            .find(|p| p.action == action && p.subject == subject && p.inverted == inverted)
            .cloned())
    }

    async fn create(
        &self,
        action: Action,
        subject: Subject,
        inverted: bool,
        description: Option<&str>,
    ) -> anyhow::Result<Permission> {
        let mut st = self.state.lock().unwrap();
        let p = Permission {
            id: Uuid::new_v4(),
            action,
            subject,
            inverted,
            description: description.map(str::to_string),
            created_at: Utc::now(),
        };
        st.permissions.push(p.clone());
        Ok(p)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut st = self.state.lock().unwrap();
        let before = st.permissions.len();
        st.permissions.retain(|p| p.id != id);
        st.role_permissions.retain(|(_, pid)| *pid != id);
        Ok(st.permissions.len() != before)
    }

    async fn existing_ids(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Uuid>> {
        let st = self.state.lock().unwrap();
        Ok(ids
            .iter()
            .copied()
            .filter(|id| st.permissions.iter().any(|p| p.id == *id))
            .collect())
    }
}

#[async_trait]
impl SessionRepository for MemoryDb {
    async fn create(&self, session: NewSession) -> anyhow::Result<Session> {
        let mut st = self.state.lock().unwrap();
        let s = Session {
            id: session.id,
            user_id: session.user_id,
            refresh_token_hash: session.refresh_token_hash,
            user_agent: session.user_agent,
            ip: session.ip,
            expires_at: session.expires_at,
            revoked_at: None,
            last_used_at: None,
            created_at: Utc::now(),
        };
        st.sessions.push(s.clone());
        Ok(s)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Session>> {
        Ok(self.session(id))
    }

    async fn rotate_refresh(
        &self,
        id: Uuid,
        refresh_token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        let mut st = self.state.lock().unwrap();
        match st
            .sessions
            .iter_mut()
            .find(|s| s.id == id && s.revoked_at.is_none())
        {
            Some(s) => {
                s.refresh_token_hash = refresh_token_hash.to_string();
                s.expires_at = expires_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn touch(&self, id: Uuid) -> anyhow::Result<()> {
        let mut st = self.state.lock().unwrap();
        if let Some(s) = st.sessions.iter_mut().find(|s| s.id == id) {
            s.last_used_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn revoke(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut st = self.state.lock().unwrap();
        match st
            .sessions
            .iter_mut()
            .find(|s| s.id == id && s.revoked_at.is_none())
        {
            Some(s) => {
                s.revoked_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn revoke_for_user(&self, user_id: Uuid, keep: Option<Uuid>) -> anyhow::Result<u64> {
        let mut st = self.state.lock().unwrap();
        let mut n = 0;
        for s in st.sessions.iter_mut() {
            if s.user_id == user_id && s.revoked_at.is_none() && Some(s.id) != keep {
                s.revoked_at = Some(Utc::now());
                n += 1;
            }
        }
        Ok(n)
    }

    async fn list_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Session>> {
        let st = self.state.lock().unwrap();
        Ok(st
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn purge_expired(&self, before: DateTime<Utc>) -> anyhow::Result<u64> {
        let mut st = self.state.lock().unwrap();
        let n = st.sessions.len();
        st.sessions.retain(|s| s.expires_at >= before);
        Ok((n - st.sessions.len()) as u64)
    }
}

#[async_trait]
impl ApiKeyRepository for MemoryDb {
    async fn create(
        &self,
        user_id: Uuid,
        name: &str,
        prefix: &str,
        key_hash: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> anyhow::Result<ApiKey> {
        let mut st = self.state.lock().unwrap();
        let key = ApiKey {
            id: Uuid::new_v4(),
            user_id,
            name: name.to_string(),
            prefix: prefix.to_string(),
            is_active: true,
            expires_at,
            last_used_at: None,
            created_at: Utc::now(),
            deleted_at: None,
        };
        st.api_keys.push((key.clone(), key_hash.to_string()));
        Ok(key)
    }

    async fn find_by_hash(&self, key_hash: &str) -> anyhow::Result<Option<ApiKey>> {
        let st = self.state.lock().unwrap();
        Ok(st
            .api_keys
            .iter()
            .find(|(_, h)| h == key_hash)
            .map(|(k, _)| k.clone()))
    }

    async fn list_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<ApiKey>> {
        let st = self.state.lock().unwrap();
        Ok(st
            .api_keys
            .iter()
            .filter(|(k, _)| k.user_id == user_id && k.deleted_at.is_none())
            .map(|(k, _)| k.clone())
            .collect())
    }

    async fn revoke(&self, id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
        let mut st = self.state.lock().unwrap();
        match st
            .api_keys
            .iter_mut()
            .find(|(k, _)| k.id == id && k.user_id == user_id && k.deleted_at.is_none())
        {
            Some((k, _)) => {
                k.deleted_at = Some(Utc::now());
                k.is_active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn deactivate_for_user(&self, user_id: Uuid) -> anyhow::Result<u64> {
        let mut st = self.state.lock().unwrap();
        let mut n = 0;
        for (k, _) in st.api_keys.iter_mut() {
            if k.user_id == user_id && k.is_active {
                k.is_active = false;
                n += 1;
            }
        }
        Ok(n)
    }

    async fn touch(&self, id: Uuid) -> anyhow::Result<()> {
        let mut st = self.state.lock().unwrap();
        if let Some((k, _)) = st.api_keys.iter_mut().find(|(k, _)| k.id == id) {
            k.last_used_at = Some(Utc::now());
        }
        Ok(())
    }
}

#[async_trait]
impl SettingRepository for MemoryDb {
    async fn list(&self, public_only: bool) -> anyhow::Result<Vec<Setting>> {
        let st = self.state.lock().unwrap();
        let mut out: Vec<Setting> = st
            .settings
            .iter()
            .filter(|s| !public_only || s.is_public)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(out)
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<Setting>> {
        let st = self.state.lock().unwrap();
        Ok(st.settings.iter().find(|s| s.key == key).cloned())
    }

    async fn upsert(&self, input: SettingInput) -> anyhow::Result<Setting> {
        let mut st = self.state.lock().unwrap();
        let now = Utc::now();
        let created_at = st
            .settings
            .iter()
            .find(|s| s.key == input.key)
            .map(|s| s.created_at)
            .unwrap_or(now);
        st.settings.retain(|s| s.key != input.key);
        let setting = Setting {
            key: input.key,
            value: input.value,
            description: input.description,
            is_public: input.is_public,
            is_secret: input.is_secret,
            created_at,
            updated_at: now,
        };
        st.settings.push(setting.clone());
        Ok(setting)
    }

    async fn delete(&self, key: &str) -> anyhow::Result<bool> {
        let mut st = self.state.lock().unwrap();
        let n = st.settings.len();
        st.settings.retain(|s| s.key != key);
        Ok(st.settings.len() != n)
    }
}

#[async_trait]
impl TermPolicyRepository for MemoryDb {
    async fn list(&self, include_drafts: bool) -> anyhow::Result<Vec<TermPolicy>> {
        let st = self.state.lock().unwrap();
        Ok(st
            .policies
            .iter()
            .filter(|(p, deleted)| !deleted && (include_drafts || p.is_published()))
            .map(|(p, _)| p.clone())
            .collect())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<TermPolicy>> {
        let st = self.state.lock().unwrap();
        Ok(st
            .policies
            .iter()
            .find(|(p, deleted)| p.id == id && !deleted)
            .map(|(p, _)| p.clone()))
    }

    async fn create(
        &self,
        kind: &str,
        version: &str,
        title: &str,
        content: &str,
    ) -> anyhow::Result<Option<TermPolicy>> {
        let mut st = self.state.lock().unwrap();
        if st
            .policies
            .iter()
            .any(|(p, deleted)| !deleted && p.kind == kind && p.version == version)
        {
            return Ok(None);
        }
        let now = Utc::now();
        let p = TermPolicy {
            id: Uuid::new_v4(),
            kind: kind.to_string(),
            version: version.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            published_at: None,
            created_at: now,
            updated_at: now,
        };
        st.policies.push((p.clone(), false));
        Ok(Some(p))
    }

    async fn update_draft(
        &self,
        id: Uuid,
        title: Option<&str>,
        content: Option<&str>,
    ) -> anyhow::Result<Option<TermPolicy>> {
        let mut st = self.state.lock().unwrap();
        let Some((p, _)) = st
            .policies
            .iter_mut()
            .find(|(p, deleted)| p.id == id && !deleted && !p.is_published())
        else {
            return Ok(None);
        };
        if let Some(t) = title {
            p.title = t.to_string();
        }
        if let Some(c) = content {
            p.content = c.to_string();
        }
        Ok(Some(p.clone()))
    }

    async fn publish(&self, id: Uuid, at: DateTime<Utc>) -> anyhow::Result<Option<TermPolicy>> {
        let mut st = self.state.lock().unwrap();
        let Some((p, _)) = st
            .policies
            .iter_mut()
            .find(|(p, deleted)| p.id == id && !deleted && !p.is_published())
        else {
            return Ok(None);
        };
        p.published_at = Some(at);
        Ok(Some(p.clone()))
    }

    async fn soft_delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut st = self.state.lock().unwrap();
        match st
            .policies
            .iter_mut()
            .find(|(p, deleted)| p.id == id && !*deleted)
        {
            Some((_, deleted)) => {
                *deleted = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn accepted_policy_ids(&self, user_id: Uuid) -> anyhow::Result<HashSet<Uuid>> {
        let st = self.state.lock().unwrap();
        Ok(st
            .acceptances
            .iter()
            .filter(|(_, uid)| *uid == user_id)
            .map(|(pid, _)| *pid)
            .collect())
    }

    async fn record_acceptance(
        &self,
        policy_id: Uuid,
        user_id: Uuid,
        _ip: Option<&str>,
    ) -> anyhow::Result<bool> {
        let mut st = self.state.lock().unwrap();
        if st.acceptances.contains(&(policy_id, user_id)) {
            return Ok(false);
        }
        st.acceptances.push((policy_id, user_id));
        Ok(true)
    }
}

#[async_trait]
impl ActivityLogRepository for MemoryDb {
    async fn record(&self, entry: NewActivity) -> anyhow::Result<()> {
        let mut st = self.state.lock().unwrap();
        st.activity.push(ActivityLog {
            id: Uuid::new_v4(),
            actor_id: entry.actor_id,
            action: entry.action,
            subject: entry.subject,
            subject_id: entry.subject_id,
            metadata: entry.metadata,
            ip: entry.ip,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn list(
        &self,
        filter: &ActivityFilter,
        page: PageRequest,
    ) -> anyhow::Result<Page<ActivityLog>> {
        let st = self.state.lock().unwrap();
        let mut all: Vec<ActivityLog> = st
            .activity
            .iter()
            .filter(|a| filter.actor_id.map_or(true, |id| a.actor_id == Some(id)))
            .filter(|a| filter.subject.as_ref().map_or(true, |s| &a.subject == s))
            .filter(|a| filter.action.as_ref().map_or(true, |s| &a.action == s))
            .cloned()
            .collect();
        all.reverse();
        Ok(paginate(all, page))
    }
}

#[async_trait]
impl NotificationRepository for MemoryDb {
    async fn enqueue(
        &self,
        notification: NewNotification,
        status: DeliveryStatus,
    ) -> anyhow::Result<Notification> {
        let mut st = self.state.lock().unwrap();
        let now = Utc::now();
        let n = Notification {
            id: Uuid::new_v4(),
            user_id: notification.user_id,
            channel: notification.channel,
            title: notification.title,
            body: notification.body,
            data: notification.data,
            status,
            attempts: 0,
            last_error: None,
            external_id: None,
            read_at: None,
            sent_at: (status == DeliveryStatus::Sent).then_some(now),
            created_at: now,
        };
        st.notifications.push((n.clone(), now));
        Ok(n)
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        unread_only: bool,
        page: PageRequest,
    ) -> anyhow::Result<Page<Notification>> {
        let st = self.state.lock().unwrap();
        let mut all: Vec<Notification> = st
            .notifications
            .iter()
            .map(|(n, _)| n)
            .filter(|n| n.user_id == user_id && n.channel == Channel::InApp)
            .filter(|n| !unread_only || n.read_at.is_none())
            .cloned()
            .collect();
        all.reverse();
        Ok(paginate(all, page))
    }

    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
        let mut st = self.state.lock().unwrap();
        match st
            .notifications
            .iter_mut()
            .find(|(n, _)| {
                n.id == id && n.user_id == user_id && n.channel == Channel::InApp
            })
        {
            Some((n, _)) => {
                if n.read_at.is_none() {
                    n.read_at = Some(Utc::now());
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_read(&self, user_id: Uuid) -> anyhow::Result<u64> {
        let mut st = self.state.lock().unwrap();
        let mut count = 0;
        for (n, _) in st.notifications.iter_mut() {
            if n.user_id == user_id && n.read_at.is_none() && n.channel == Channel::InApp {
                n.read_at = Some(Utc::now());
                count += 1;
            }
        }
        Ok(count)
    }

    async fn claim_pending(
        &self,
        limit: i64,
        stale_before: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Notification>> {
        let mut st = self.state.lock().unwrap();
        let now = Utc::now();
        let mut out = Vec::new();
        for (n, updated) in st.notifications.iter_mut() {
            if out.len() as i64 >= limit {
                break;
            }
            let claimable = n.status == DeliveryStatus::Pending
                || (n.status == DeliveryStatus::Processing && *updated < stale_before);
            if claimable {
                n.status = DeliveryStatus::Processing;
                n.attempts += 1;
                *updated = now;
                out.push(n.clone());
            }
        }
        Ok(out)
    }

    async fn mark_sent(&self, id: Uuid, external_id: Option<&str>) -> anyhow::Result<()> {
        let mut st = self.state.lock().unwrap();
        if let Some((n, updated)) = st.notifications.iter_mut().find(|(n, _)| n.id == id) {
            n.status = DeliveryStatus::Sent;
            n.external_id = external_id.map(str::to_string);
            n.sent_at = Some(Utc::now());
            *updated = Utc::now();
        }
        Ok(())
    }

    async fn mark_failure(
        &self,
        id: Uuid,
        error: &str,
        status: DeliveryStatus,
    ) -> anyhow::Result<()> {
        let mut st = self.state.lock().unwrap();
        if let Some((n, updated)) = st.notifications.iter_mut().find(|(n, _)| n.id == id) {
            n.status = status;
            n.last_error = Some(error.to_string());
            *updated = Utc::now();
        }
        Ok(())
    }

    async fn update_by_external_id(
        &self,
        external_id: &str,
        status: DeliveryStatus,
        error: Option<&str>,
    ) -> anyhow::Result<bool> {
        let mut st = self.state.lock().unwrap();
        match st
            .notifications
            .iter_mut()
            .find(|(n, _)| n.external_id.as_deref() == Some(external_id))
        {
            Some((n, _)) => {
                n.status = status;
                if let Some(e) = error {
                    n.last_error = Some(e.to_string());
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl FilesRepository for MemoryDb {
    async fn insert_file(&self, file: NewStoredFile) -> anyhow::Result<StoredFile> {
        let mut st = self.state.lock().unwrap();
        let f = StoredFile {
            id: Uuid::new_v4(),
            owner_id: file.owner_id,
            filename: file.filename,
            content_type: file.content_type,
            size: file.size,
            storage_key: file.storage_key,
            content_hash: file.content_hash,
            created_at: Utc::now(),
        };
        st.files.push((f.clone(), false));
        Ok(f)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<StoredFile>> {
        let st = self.state.lock().unwrap();
        Ok(st
            .files
            .iter()
            .find(|(f, deleted)| f.id == id && !deleted)
            .map(|(f, _)| f.clone()))
    }

    async fn list_for_owner(
        &self,
        owner_id: Uuid,
        page: PageRequest,
    ) -> anyhow::Result<Page<StoredFile>> {
        let st = self.state.lock().unwrap();
        let all: Vec<StoredFile> = st
            .files
            .iter()
            .filter(|(f, deleted)| f.owner_id == owner_id && !deleted)
            .map(|(f, _)| f.clone())
            .collect();
        Ok(paginate(all, page))
    }

    async fn soft_delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut st = self.state.lock().unwrap();
        match st
            .files
            .iter_mut()
            .find(|(f, deleted)| f.id == id && !*deleted)
        {
            Some((_, deleted)) => {
                *deleted = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Creates a user whose single private role carries `rules`.
pub async fn seed_user(db: &MemoryDb, email: &str, password: &str, rules: Vec<Rule>) -> User {
    let hash = crate::application::services::passwords::hash_password(password).unwrap();
    let user = UserRepository::create_user(db, email, "Test User", &hash)
        .await
        .unwrap();
    if !rules.is_empty() {
        let role = RoleRepository::create(db, &format!("role-{}", user.id), None, false)
            .await
            .unwrap();
        let mut ids = Vec::new();
        for rule in rules {
            let p = PermissionRepository::create(db, rule.action, rule.subject, rule.inverted, None)
                .await
                .unwrap();
            ids.push(p.id);
        }
        RoleRepository::set_permissions(db, role.id, &ids).await.unwrap();
        UserRepository::set_roles(db, user.id, &[role.id]).await.unwrap();
    }
    UserRepository::find_by_id(db, user.id).await.unwrap().unwrap()
}

pub fn principal(user_id: Uuid, rules: Vec<Rule>) -> Principal {
    Principal {
        user_id,
        method: AuthMethod::Session(Uuid::new_v4()),
        ability: Ability::new(rules),
    }
}

pub fn admin(user_id: Uuid) -> Principal {
    principal(user_id, vec![Rule::can(Action::Manage, Subject::All)])
}

/// Object store keyed by `<owner>/<filename>`.
#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    pub presign: bool,
}

impl MemoryStorage {
    pub fn with_presign() -> Self {
        Self {
            presign: true,
            ..Default::default()
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }
}

#[async_trait]
impl StoragePort for MemoryStorage {
    async fn put(
        &self,
        owner_id: Uuid,
        original_filename: Option<&str>,
        _content_type: Option<&str>,
        bytes: &[u8],
    ) -> anyhow::Result<StoredObject> {
        let filename = original_filename.unwrap_or("file.bin").to_string();
        let key = format!("{}/{}", owner_id, filename);
        self.objects
            .lock()
            .unwrap()
            .insert(key.clone(), bytes.to_vec());
        Ok(StoredObject {
            key,
            filename,
            size: bytes.len() as i64,
            content_hash: crate::application::services::secrets::sha256_hex(
                &String::from_utf8_lossy(bytes),
            ),
        })
    }

    async fn get(&self, key: &str) -> anyhow::Result<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("not_found"))
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn presign_get(&self, key: &str, ttl: Duration) -> anyhow::Result<Option<String>> {
        Ok(self
            .presign
            .then(|| format!("https://objects.test/{}?ttl={}", key, ttl.as_secs())))
    }

    async fn presign_put(
        &self,
        owner_id: Uuid,
        filename: &str,
        _content_type: Option<&str>,
        ttl: Duration,
    ) -> anyhow::Result<Option<PresignedUpload>> {
        if !self.presign {
            return Ok(None);
        }
        let key = format!("{}/{}", owner_id, filename);
        Ok(Some(PresignedUpload {
            url: format!("https://objects.test/{}?ttl={}&method=put", key, ttl.as_secs()),
            key,
            method: "PUT".into(),
        }))
    }
}

#[derive(Default)]
pub struct RecordingSignal {
    seen: Mutex<Vec<Uuid>>,
}

impl RecordingSignal {
    pub fn seen(&self) -> Vec<Uuid> {
        self.seen.lock().unwrap().clone()
    }
}

impl NotificationSignal for RecordingSignal {
    fn enqueued(&self, notification: &Notification) {
        self.seen.lock().unwrap().push(notification.id);
    }
}

pub struct ScriptedSender {
    fail: bool,
    sent: Mutex<Vec<(Uuid, String)>>,
}

impl ScriptedSender {
    pub fn ok() -> Self {
        Self {
            fail: false,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<(Uuid, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSender for ScriptedSender {
    fn supports(&self, channel: Channel) -> bool {
        !channel.is_stored_only()
    }

    async fn send(
        &self,
        notification: &Notification,
        recipient: &Recipient,
    ) -> anyhow::Result<DeliveryReceipt> {
        if self.fail {
            anyhow::bail!("provider unavailable");
        }
        self.sent
            .lock()
            .unwrap()
            .push((notification.id, recipient.address.clone()));
        Ok(DeliveryReceipt {
            external_id: Some(format!("ext-{}", notification.id)),
        })
    }
}
