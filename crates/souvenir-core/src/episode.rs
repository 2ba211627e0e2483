use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::new_id;

/// The kind of raw event an episode captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EpisodeType {
    Conversation,
    Observation,
    ToolResult,
    Error,
    Decision,
    UserDirective,
}

impl EpisodeType {
    /// Default importance for an episode of this type, used when the
    /// caller of `record` doesn't supply one explicitly.
    pub fn default_importance(self) -> f64 {
        match self {
            EpisodeType::UserDirective => 0.95,
            EpisodeType::Error | EpisodeType::ToolResult => 0.8,
            EpisodeType::Decision => 0.75,
            EpisodeType::Conversation => 0.4,
            EpisodeType::Observation => 0.3,
        }
    }

    /// The `[<type>] <content>` transcript tag used when building
    /// consolidation prompts.
    pub fn transcript_tag(self) -> &'static str {
        match self {
            EpisodeType::Conversation => "conversation",
            EpisodeType::Observation => "observation",
            EpisodeType::ToolResult => "tool_result",
            EpisodeType::Error => "error",
            EpisodeType::Decision => "decision",
            EpisodeType::UserDirective => "user_directive",
        }
    }
}

/// A single timestamped raw event, the source material for consolidation.
///
/// Episodes are append-only: once `consolidated` flips to `true` it never
/// reverts, and no other field is ever mutated after insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub id: String,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub episode_type: EpisodeType,
    pub content: String,
    pub importance: f64,
    pub access_count: u64,
    pub last_accessed: Option<DateTime<Utc>>,
    pub consolidated: bool,
}

impl Episode {
    /// Build a new episode with the type's default importance and an id
    /// minted from the current instant, ready for `EpisodeBuffer::push`.
    pub fn new(session_id: impl Into<String>, episode_type: EpisodeType, content: impl Into<String>) -> Self {
        Self::with_importance(session_id, episode_type, content, episode_type.default_importance())
    }

    pub fn with_importance(
        session_id: impl Into<String>,
        episode_type: EpisodeType,
        content: impl Into<String>,
        importance: f64,
    ) -> Self {
        Self {
            id: new_id(),
            session_id: session_id.into(),
            timestamp: Utc::now(),
            episode_type,
            content: content.into(),
            importance: importance.clamp(0.0, 1.0),
            access_count: 0,
            last_accessed: None,
            consolidated: false,
        }
    }

    /// The transcript line this episode contributes to a consolidation prompt.
    pub fn transcript_line(&self) -> String {
        format!("[{}] {}", self.episode_type.transcript_tag(), self.content)
    }
}
