pub mod activity_log_repository_sqlx;
pub mod api_key_repository_sqlx;
pub mod files_repository_sqlx;
pub mod notification_repository_sqlx;
pub mod permission_repository_sqlx;
pub mod role_repository_sqlx;
pub mod session_repository_sqlx;
pub mod setting_repository_sqlx;
pub mod term_policy_repository_sqlx;
pub mod user_repository_sqlx;

/// Wraps user input for a substring `ILIKE`, escaping the pattern metacharacters.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut out = String::with_capacity(term.len() + 2);
    out.push('%');
    for ch in term.trim().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('%');
    out
}
