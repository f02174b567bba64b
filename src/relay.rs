use crate::notion::{NotionClient, DEFAULT_API_URL};
use crate::record::ProblemRecord;
use crate::settings::SettingsBackend;
use crate::SyncError;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

/// One sync request crossing from the page side to the privileged side.
/// The record is moved into the message; nothing else is shared.
struct SyncRequest {
    record: ProblemRecord,
    reply: oneshot::Sender<Result<Value, SyncError>>,
}

/// Cloneable page-side handle. `sync` sends the record over the channel and
/// awaits the correlated response.
#[derive(Clone)]
pub struct RelayHandle {
    tx: mpsc::Sender<SyncRequest>,
}

impl RelayHandle {
    pub async fn sync(&self, record: ProblemRecord) -> Result<Value, SyncError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(SyncRequest { record, reply })
            .await
            .map_err(|_| SyncError::RelayClosed)?;
        response.await.map_err(|_| SyncError::RelayClosed)?
    }
}

/// The privileged side: alone holds the settings store (credentials) and the
/// network client. Settings are re-read for every request.
pub struct SyncRelay<S> {
    store: S,
    api_url: String,
}

impl<S> SyncRelay<S>
where
    S: SettingsBackend + Send + Sync + 'static,
{
    pub fn new(store: S) -> Self {
        SyncRelay {
            store,
            api_url: DEFAULT_API_URL.to_string(),
        }
    }

    pub fn with_api_url<U: Into<String>>(mut self, api_url: U) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn spawn(self) -> RelayHandle {
        let (tx, mut rx) = mpsc::channel::<SyncRequest>(10);
        tokio::spawn(async move {
            while let Some(req) = rx.recv().await {
                let result = self.handle(&req.record).await;
                if let Err(e) = &result {
                    warn!("Sync failed for '{}': {}", req.record.title, e);
                }
                if req.reply.send(result).is_err() {
                    warn!("Requester dropped before the sync response arrived");
                }
            }
        });
        RelayHandle { tx }
    }

    async fn handle(&self, record: &ProblemRecord) -> Result<Value, SyncError> {
        record.validate()?;

        let settings = self.store.load().await?;
        let (api_key, database_id) = match (&settings.notion_api_key, &settings.database_id) {
            (Some(key), Some(id)) => (key.clone(), id.clone()),
            _ => {
                return Err(SyncError::Configuration(
                    "Notion API key and database id are not configured".to_string(),
                ))
            }
        };
        if !settings.auto_sync {
            return Err(SyncError::Configuration(
                "Auto sync is disabled in the settings".to_string(),
            ));
        }

        let client = NotionClient::with_url(api_key, database_id, self.api_url.clone());
        let result = client.create_page(record, settings.include_code).await?;
        info!("Synced '{}' to Notion", record.title);
        Ok(result)
    }
}
