//! services/viewer/src/workflow/history.rs
//!
//! The learning history and the currently loaded content, persisted through
//! the `KeyValueStore` port under two keys.

use crate::adapters::protocol::ContentResponse;
use chrono::{DateTime, Utc};
use learning_viewer_core::domain::{CurrentSession, GeneratedContent, HistoryItem};
use learning_viewer_core::ports::{KeyValueStore, PortError, PortResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

pub const HISTORY_KEY: &str = "history";
pub const CURRENT_SESSION_KEY: &str = "current-session";

/// Group label for entries that carry no subject.
pub const UNCATEGORIZED: &str = "General";

//=========================================================================================
// "Impure" Storage Record Structs
//=========================================================================================

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct HistoryRecord {
    id: String,
    query: String,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    chapter: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    session_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<HistoryRecord> for HistoryItem {
    fn from(rec: HistoryRecord) -> Self {
        Self {
            id: rec.id,
            query: rec.query,
            subject: rec.subject,
            chapter: rec.chapter,
            content: rec.content,
            session_id: rec.session_id,
            created_at: rec.created_at,
        }
    }
}

impl From<&HistoryItem> for HistoryRecord {
    fn from(item: &HistoryItem) -> Self {
        Self {
            id: item.id.clone(),
            query: item.query.clone(),
            subject: item.subject.clone(),
            chapter: item.chapter.clone(),
            content: item.content.clone(),
            session_id: item.session_id.clone(),
            created_at: item.created_at,
        }
    }
}

/// The history fields flattened next to the loaded content.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct CurrentSessionRecord {
    #[serde(flatten)]
    item: HistoryRecord,
    #[serde(default)]
    generated: Option<ContentResponse>,
    #[serde(default)]
    mindmap_code: Option<String>,
}

impl TryFrom<CurrentSessionRecord> for CurrentSession {
    type Error = PortError;

    fn try_from(rec: CurrentSessionRecord) -> PortResult<Self> {
        let generated = rec
            .generated
            .map(GeneratedContent::try_from)
            .transpose()?;
        Ok(Self {
            item: rec.item.into(),
            generated,
            mindmap_code: rec.mindmap_code,
        })
    }
}

impl From<&CurrentSession> for CurrentSessionRecord {
    fn from(session: &CurrentSession) -> Self {
        Self {
            item: (&session.item).into(),
            generated: session.generated.as_ref().map(ContentResponse::from),
            mindmap_code: session.mindmap_code.clone(),
        }
    }
}

//=========================================================================================
// The Repository
//=========================================================================================

/// Most-recent-first history plus the current session, over any store.
///
/// Clones share one write lock, so every read-modify-write of the two keys
/// made through them is serialized.
#[derive(Clone)]
pub struct HistoryRepository {
    store: Arc<dyn KeyValueStore>,
    writes: Arc<Mutex<()>>,
}

impl HistoryRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            writes: Arc::new(Mutex::new(())),
        }
    }

    /// All entries, most recent first.
    pub async fn list(&self) -> PortResult<Vec<HistoryItem>> {
        Ok(self.load_records().await?.into_iter().map(Into::into).collect())
    }

    pub async fn find(&self, id: &str) -> PortResult<Option<HistoryItem>> {
        Ok(self.list().await?.into_iter().find(|item| item.id == id))
    }

    /// Prepends an entry. The history has no size cap.
    pub async fn record(&self, item: &HistoryItem) -> PortResult<()> {
        let _write = self.writes.lock().await;
        let mut records = self.load_records().await?;
        records.insert(0, item.into());
        self.save_records(&records).await?;
        info!(id = %item.id, entries = records.len(), "History entry recorded.");
        Ok(())
    }

    /// Removes the entry with `id`, returning whether one existed.
    pub async fn delete(&self, id: &str) -> PortResult<bool> {
        let _write = self.writes.lock().await;
        let mut records = self.load_records().await?;
        let before = records.len();
        records.retain(|rec| rec.id != id);
        if records.len() == before {
            return Ok(false);
        }
        self.save_records(&records).await?;
        info!(id, "History entry removed.");
        Ok(true)
    }

    /// Forgets the whole history and the current session.
    pub async fn clear(&self) -> PortResult<()> {
        let _write = self.writes.lock().await;
        self.store.delete(HISTORY_KEY).await?;
        self.store.delete(CURRENT_SESSION_KEY).await?;
        info!("History cleared.");
        Ok(())
    }

    /// Entries grouped by subject, each group most recent first.
    pub async fn grouped_by_subject(&self) -> PortResult<BTreeMap<String, Vec<HistoryItem>>> {
        let mut groups: BTreeMap<String, Vec<HistoryItem>> = BTreeMap::new();
        for item in self.list().await? {
            let subject = item
                .subject
                .clone()
                .unwrap_or_else(|| UNCATEGORIZED.to_string());
            groups.entry(subject).or_default().push(item);
        }
        Ok(groups)
    }

    pub async fn load_current(&self) -> PortResult<Option<CurrentSession>> {
        let Some(raw) = self.store.get(CURRENT_SESSION_KEY).await? else {
            return Ok(None);
        };
        let record: CurrentSessionRecord = serde_json::from_str(&raw)
            .map_err(|e| PortError::Schema(format!("{}: {}", CURRENT_SESSION_KEY, e)))?;
        record.try_into().map(Some)
    }

    pub async fn set_current(&self, session: &CurrentSession) -> PortResult<()> {
        let _write = self.writes.lock().await;
        self.write_current(session).await
    }

    async fn write_current(&self, session: &CurrentSession) -> PortResult<()> {
        let raw = serde_json::to_string(&CurrentSessionRecord::from(session))
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        self.store.put(CURRENT_SESSION_KEY, raw).await
    }

    /// Unloads the current content so the viewer shows its empty state.
    pub async fn clear_current(&self) -> PortResult<()> {
        let _write = self.writes.lock().await;
        self.store.delete(CURRENT_SESSION_KEY).await
    }

    /// Makes a history entry the current session.
    ///
    /// Generated content is not stored per entry, so it is only kept when the
    /// entry is already the one loaded.
    pub async fn open(&self, id: &str) -> PortResult<CurrentSession> {
        let _write = self.writes.lock().await;
        let item = self
            .find(id)
            .await?
            .ok_or_else(|| PortError::NotFound(format!("history entry {}", id)))?;
        let previous = self.load_current().await?;
        let session = match previous {
            Some(current) if current.item.id == item.id => CurrentSession { item, ..current },
            _ => CurrentSession {
                item,
                generated: None,
                mindmap_code: None,
            },
        };
        self.write_current(&session).await?;
        Ok(session)
    }

    async fn load_records(&self) -> PortResult<Vec<HistoryRecord>> {
        match self.store.get(HISTORY_KEY).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| PortError::Schema(format!("{}: {}", HISTORY_KEY, e))),
            None => Ok(Vec::new()),
        }
    }

    async fn save_records(&self, records: &[HistoryRecord]) -> PortResult<()> {
        let raw = serde_json::to_string(records).map_err(|e| PortError::Unexpected(e.to_string()))?;
        self.store.put(HISTORY_KEY, raw).await
    }
}
