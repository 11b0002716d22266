use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ActivityLog {
    pub id: Uuid,
    pub actor_id: Option<Uuid>,
    pub action: String,
    pub subject: String,
    pub subject_id: Option<String>,
    pub metadata: serde_json::Value,
    pub ip: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone)]
pub struct NewActivity {
    pub actor_id: Option<Uuid>,
    pub action: String,
    pub subject: String,
    pub subject_id: Option<String>,
    pub metadata: serde_json::Value,
    pub ip: Option<String>,
}

impl NewActivity {
    pub fn new(actor_id: Option<Uuid>, action: &str, subject: &str) -> Self {
        Self {
            actor_id,
            action: action.to_string(),
            subject: subject.to_string(),
            subject_id: None,
            metadata: serde_json::Value::Object(Default::default()),
            ip: None,
        }
    }

    pub fn with_subject_id(mut self, id: impl ToString) -> Self {
        self.subject_id = Some(id.to_string());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_ip(mut self, ip: Option<String>) -> Self {
        self.ip = ip;
        self
    }
}
