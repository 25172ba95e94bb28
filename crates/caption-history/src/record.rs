use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One generated caption as kept in a user's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionRecord {
    pub id: String,
    pub user_id: String,
    pub caption: String,
    pub platform: String,
    pub tone: String,
    pub length: String,
    pub image_url: String,
    pub model_used: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewCaptionRecord {
    pub user_id: String,
    pub caption: String,
    pub platform: String,
    pub tone: String,
    pub length: String,
    pub image_url: String,
    pub model_used: String,
}

impl From<NewCaptionRecord> for CaptionRecord {
    fn from(v: NewCaptionRecord) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: v.user_id,
            caption: v.caption,
            platform: v.platform,
            tone: v.tone,
            length: v.length,
            image_url: v.image_url,
            model_used: v.model_used,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}
