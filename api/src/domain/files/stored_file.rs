use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct StoredFile {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub filename: String,
    pub content_type: Option<String>,
    pub size: i64,
    pub storage_key: String,
    pub content_hash: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
