use crate::record::get_now;
use crate::SyncError;
use chrono::{DateTime, FixedOffset};
use futures::TryStreamExt;
use lazy_regex::regex_is_match;
use sqlx::{sqlite::SqliteConnectOptions, Row, SqlitePool};
use std::collections::HashMap;
use tracing::debug;

pub const KEY_API_KEY: &str = "notionApiKey";
pub const KEY_DATABASE_ID: &str = "databaseId";
pub const KEY_DEFAULT_SHEET: &str = "defaultSheet";
pub const KEY_AUTO_SYNC: &str = "autoSync";
pub const KEY_INCLUDE_CODE: &str = "includeCode";
pub const KEY_SYNC_COUNT: &str = "syncCount";
pub const KEY_LAST_SYNC_TIME: &str = "lastSyncTime";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub notion_api_key: Option<String>,
    pub database_id: Option<String>,
    pub default_sheet: String,
    pub auto_sync: bool,
    pub include_code: bool,
    pub sync_count: u32,
    pub last_sync_time: Option<DateTime<FixedOffset>>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            notion_api_key: None,
            database_id: None,
            default_sheet: String::new(),
            auto_sync: true,
            include_code: true,
            sync_count: 0,
            last_sync_time: None,
        }
    }
}

impl Settings {
    fn from_map(map: HashMap<String, String>) -> Settings {
        let defaults = Settings::default();
        Settings {
            notion_api_key: map.get(KEY_API_KEY).filter(|v| !v.is_empty()).cloned(),
            database_id: map.get(KEY_DATABASE_ID).filter(|v| !v.is_empty()).cloned(),
            default_sheet: map.get(KEY_DEFAULT_SHEET).cloned().unwrap_or_default(),
            auto_sync: map
                .get(KEY_AUTO_SYNC)
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.auto_sync),
            include_code: map
                .get(KEY_INCLUDE_CODE)
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.include_code),
            sync_count: map
                .get(KEY_SYNC_COUNT)
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            last_sync_time: map
                .get(KEY_LAST_SYNC_TIME)
                .and_then(|v| DateTime::parse_from_rfc3339(v).ok()),
        }
    }
}

/// API keys issued by Notion carry one of two known prefixes.
pub fn validate_api_key(key: &str) -> Result<(), SyncError> {
    if key.starts_with("ntn_") || key.starts_with("secret_") {
        Ok(())
    } else {
        Err(SyncError::Configuration(
            r#"Invalid API key format. It should start with "ntn_" or "secret_""#.to_string(),
        ))
    }
}

/// Database ids are 32 hex digits, bare or in canonical UUID grouping.
pub fn validate_database_id(id: &str) -> Result<(), SyncError> {
    let ok = regex_is_match!(r"^[0-9a-fA-F]{32}$", id)
        || regex_is_match!(
            r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$",
            id
        );
    if ok {
        Ok(())
    } else {
        Err(SyncError::Configuration(
            "Invalid database id format. Copy the 32-character id from your Notion database URL"
                .to_string(),
        ))
    }
}

#[async_trait::async_trait]
pub trait SettingsBackend {
    async fn load(&self) -> Result<Settings, SyncError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), SyncError>;
    async fn reset(&self) -> Result<(), SyncError>;

    /// Bumps the running sync counter and stamps the last sync time. Owned
    /// by the surface that observed the success, not by the relay.
    async fn record_sync(&self) -> Result<u32, SyncError> {
        let count = self.load().await?.sync_count + 1;
        self.set(KEY_SYNC_COUNT, &count.to_string()).await?;
        self.set(KEY_LAST_SYNC_TIME, &get_now().to_rfc3339()).await?;
        Ok(count)
    }
}

#[async_trait::async_trait]
impl<T: SettingsBackend + Send + Sync> SettingsBackend for std::sync::Arc<T> {
    async fn load(&self) -> Result<Settings, SyncError> {
        (**self).load().await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), SyncError> {
        (**self).set(key, value).await
    }

    async fn reset(&self) -> Result<(), SyncError> {
        (**self).reset().await
    }
}

pub struct SettingsStore {
    table: String,
    pool: SqlitePool,
}

impl SettingsStore {
    pub async fn new(filename: &str) -> Result<SettingsStore, SyncError> {
        let opt = SqliteConnectOptions::new()
            .filename(filename)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(opt).await?;
        let store = SettingsStore {
            table: "settings".to_string(),
            pool,
        };
        if !store.is_table_exists().await? {
            debug!("Create table {}", store.table);
            store.create_table().await?;
        } else {
            debug!("Use table {}", store.table);
        }
        Ok(store)
    }

    async fn is_table_exists(&self) -> Result<bool, sqlx::Error> {
        Ok(
            sqlx::query("SELECT name FROM sqlite_master WHERE type='table' AND name = ?")
                .bind(&self.table)
                .fetch_optional(&self.pool)
                .await?
                .is_some(),
        )
    }

    async fn create_table(&self) -> Result<(), sqlx::Error> {
        let query = format!(
            "CREATE TABLE {} (
                key TEXT PRIMARY KEY,
                value TEXT,
                updated_at DATETIME
             )",
            &self.table
        );
        sqlx::query(query.as_str()).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl SettingsBackend for SettingsStore {
    async fn load(&self) -> Result<Settings, SyncError> {
        let mut map = HashMap::new();
        let query = format!("SELECT key, value FROM {}", self.table);
        let mut rows = sqlx::query(&query).fetch(&self.pool);
        while let Some(row) = rows.try_next().await? {
            map.insert(row.try_get("key")?, row.try_get("value")?);
        }
        Ok(Settings::from_map(map))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), SyncError> {
        let query = format!(
            "INSERT OR REPLACE INTO {} (key, value, updated_at) VALUES (?, ?, ?)",
            self.table
        );
        sqlx::query(&query)
            .bind(key)
            .bind(value)
            .bind(get_now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn reset(&self) -> Result<(), SyncError> {
        let query = format!("DELETE FROM {}", self.table);
        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }
}

/// In-memory backend for tests and embedding without sqlite.
#[derive(Debug, Default)]
pub struct MemoryStore {
    map: std::sync::Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn with_credentials(api_key: &str, database_id: &str) -> Self {
        let store = MemoryStore::default();
        {
            let mut map = store.map.lock().unwrap();
            map.insert(KEY_API_KEY.to_string(), api_key.to_string());
            map.insert(KEY_DATABASE_ID.to_string(), database_id.to_string());
        }
        store
    }
}

#[async_trait::async_trait]
impl SettingsBackend for MemoryStore {
    async fn load(&self) -> Result<Settings, SyncError> {
        Ok(Settings::from_map(self.map.lock().unwrap().clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), SyncError> {
        self.map
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn reset(&self) -> Result<(), SyncError> {
        self.map.lock().unwrap().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::Path;
    use tokio::fs;

    #[tokio::test]
    async fn create_new_file() {
        if Path::new("settings_test.db").is_file() {
            fs::remove_file("settings_test.db").await.unwrap();
        }

        assert!(!Path::new("settings_test.db").is_file());
        SettingsStore::new("settings_test.db").await.unwrap();
        assert!(Path::new("settings_test.db").is_file());

        fs::remove_file("settings_test.db").await.unwrap();
    }

    #[tokio::test]
    async fn set_load_reset_roundtrip() {
        if Path::new("settings_test2.db").is_file() {
            fs::remove_file("settings_test2.db").await.unwrap();
        }

        let store = SettingsStore::new("settings_test2.db").await.unwrap();
        assert_eq!(store.load().await.unwrap(), Settings::default());

        store.set(KEY_API_KEY, "ntn_abc").await.unwrap();
        store.set(KEY_DATABASE_ID, "db1").await.unwrap();
        store.set(KEY_AUTO_SYNC, "false").await.unwrap();
        store.set(KEY_DEFAULT_SHEET, "SDE Sheet").await.unwrap();

        let settings = store.load().await.unwrap();
        assert_eq!(settings.notion_api_key.as_deref(), Some("ntn_abc"));
        assert_eq!(settings.database_id.as_deref(), Some("db1"));
        assert!(!settings.auto_sync);
        assert!(settings.include_code);
        assert_eq!(settings.default_sheet, "SDE Sheet");

        store.set(KEY_AUTO_SYNC, "true").await.unwrap();
        assert!(store.load().await.unwrap().auto_sync);

        store.reset().await.unwrap();
        assert_eq!(store.load().await.unwrap(), Settings::default());

        fs::remove_file("settings_test2.db").await.unwrap();
    }

    #[tokio::test]
    async fn record_sync_bumps_counter_and_timestamp() {
        let store = MemoryStore::default();
        assert_eq!(store.load().await.unwrap().sync_count, 0);
        assert!(store.load().await.unwrap().last_sync_time.is_none());

        assert_eq!(store.record_sync().await.unwrap(), 1);
        assert_eq!(store.record_sync().await.unwrap(), 2);

        let settings = store.load().await.unwrap();
        assert_eq!(settings.sync_count, 2);
        assert!(settings.last_sync_time.is_some());
    }

    #[test]
    fn api_key_prefixes() {
        assert!(validate_api_key("ntn_abcdef").is_ok());
        assert!(validate_api_key("secret_abcdef").is_ok());
        assert!(validate_api_key("sk-abcdef").is_err());
        assert!(validate_api_key("").is_err());
    }

    #[test]
    fn database_id_formats() {
        assert!(validate_database_id("1be5d6016008802998b9ef6a0aeaedbb").is_ok());
        assert!(validate_database_id("1be5d601-6008-8029-98b9-ef6a0aeaedbb").is_ok());
        assert!(validate_database_id("1BE5D6016008802998B9EF6A0AEAEDBB").is_ok());
        assert!(validate_database_id("not-a-database-id").is_err());
        assert!(validate_database_id("1be5d60160").is_err());
        // Hyphens only accepted in canonical grouping.
        assert!(validate_database_id("1be5d6016008-802998b9ef6a0aeaedbb").is_err());
    }

    #[test]
    fn empty_values_count_as_absent_credentials() {
        let mut map = HashMap::new();
        map.insert(KEY_API_KEY.to_string(), String::new());
        let settings = Settings::from_map(map);
        assert!(settings.notion_api_key.is_none());
    }
}
