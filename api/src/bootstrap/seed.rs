use uuid::Uuid;

use crate::application::ports::permission_repository::PermissionRepository;
use crate::application::ports::role_repository::RoleRepository;
use crate::application::ports::user_repository::UserRepository;
use crate::application::services::passwords::hash_password;
use crate::domain::access::ability::{Action, Subject};
use crate::domain::access::role::{ADMIN_ROLE, Role, USER_ROLE};

async fn ensure_permission<P>(
    permissions: &P,
    action: Action,
    subject: Subject,
) -> anyhow::Result<Uuid>
where
    P: PermissionRepository + ?Sized,
{
    if let Some(existing) = permissions.find(action, subject, false).await? {
        return Ok(existing.id);
    }
    let description = format!("{action} {subject}");
    let created = permissions
        .create(action, subject, false, Some(&description))
        .await?;
    Ok(created.id)
}

async fn ensure_role<R>(roles: &R, name: &str, description: &str) -> anyhow::Result<(Role, bool)>
where
    R: RoleRepository + ?Sized,
{
    if let Some(role) = roles.find_by_name(name).await? {
        return Ok((role, false));
    }
    let role = roles.create(name, Some(description), true).await?;
    tracing::info!(role = name, "system_role_created");
    Ok((role, true))
}

/// Idempotent startup seed: the permission catalogue, the `admin` and `user`
/// system roles, and optionally a bootstrap administrator.
pub async fn seed<U, R, P>(
    users: &U,
    roles: &R,
    permissions: &P,
    admin: Option<(&str, &str)>,
) -> anyhow::Result<()>
where
    U: UserRepository + ?Sized,
    R: RoleRepository + ?Sized,
    P: PermissionRepository + ?Sized,
{
    let manage_all = ensure_permission(permissions, Action::Manage, Subject::All).await?;
    for subject in Subject::ALL.into_iter().filter(|s| *s != Subject::All) {
        for action in Action::ALL.into_iter().filter(|a| *a != Action::Manage) {
            ensure_permission(permissions, action, subject).await?;
        }
    }

    let (admin_role, _) = ensure_role(roles, ADMIN_ROLE, "Full access").await?;
    if !admin_role
        .permissions
        .iter()
        .any(|p| p.id == manage_all)
    {
        let mut ids: Vec<Uuid> = admin_role.permissions.iter().map(|p| p.id).collect();
        ids.push(manage_all);
        roles.set_permissions(admin_role.id, &ids).await?;
    }

    let (user_role, created) = ensure_role(roles, USER_ROLE, "Default role for new accounts").await?;
    if created {
        let read_policies =
            ensure_permission(permissions, Action::Read, Subject::TermPolicy).await?;
        roles.set_permissions(user_role.id, &[read_policies]).await?;
    }

    if let Some((email, password)) = admin {
        seed_admin(users, email, password, admin_role.id).await?;
    }
    Ok(())
}

async fn seed_admin<U>(users: &U, email: &str, password: &str, role_id: Uuid) -> anyhow::Result<()>
where
    U: UserRepository + ?Sized,
{
    let email = email.trim().to_lowercase();
    if users.email_exists(&email).await? {
        tracing::debug!(%email, "bootstrap_admin_exists");
        return Ok(());
    }
    let hash = hash_password(password)?;
    let user = users.create_user(&email, "Administrator", &hash).await?;
    users.set_roles(user.id, &[role_id]).await?;
    tracing::info!(user_id = %user.id, %email, "bootstrap_admin_created");
    Ok(())
}
