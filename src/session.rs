//! Session persistence: API token and minimal user identity.

use anyhow::Result;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
use std::{collections::HashMap, io::ErrorKind, path::PathBuf};
use tokio::{
    fs,
    io::{AsyncWriteExt, BufWriter},
    sync::RwLock,
};

use crate::api::models::{LoginResponse, UserRole};

/// Keys of the persisted session values.
pub const TOKEN_KEY: &str = "jwt_token";
pub const USER_ID_KEY: &str = "user_id";
pub const USERNAME_KEY: &str = "username";
pub const USER_DATA_KEY: &str = "user_data";

/// Values stored for one API server.
type Entry = HashMap<String, String>;

/// Stores the session in a local JSON file, one entry per API server.
///
/// Constructed once at startup and shared by every gateway; reads come from
/// memory, writes (login/logout) go through to disk.
pub struct SessionStore {
    /// Location of the session file on disk.
    path: PathBuf,
    /// Key of this server's entry inside the file.
    entry_key: String,
    /// In-memory copy of this server's entry.
    cache: RwLock<Entry>,
}

impl SessionStore {
    /// Open the store for `server_url`, loading any saved session.
    pub async fn open(path: impl Into<PathBuf>, server_url: &str) -> Result<Self> {
        let path = path.into();
        let entry_key = Self::entry_key(server_url);
        let mut map = load_map(&path).await?;
        let entry = map.remove(&entry_key).unwrap_or_default();
        tracing::info!(
            "session store opened: {} (logged in: {})",
            path.display(),
            entry.contains_key(TOKEN_KEY)
        );
        Ok(Self {
            path,
            entry_key,
            cache: RwLock::new(entry),
        })
    }

    /// In-memory store that never touches disk contents of other servers.
    #[cfg(test)]
    pub fn in_memory(token: Option<&str>, user_id: Option<i64>) -> Self {
        let mut entry = Entry::new();
        if let Some(t) = token {
            entry.insert(TOKEN_KEY.into(), t.into());
        }
        if let Some(id) = user_id {
            entry.insert(USER_ID_KEY.into(), id.to_string());
        }
        Self {
            path: std::env::temp_dir().join(format!("swiftflow-{}.json", uuid::Uuid::new_v4())),
            entry_key: Self::entry_key("test"),
            cache: RwLock::new(entry),
        }
    }

    /// Stable key for a server URL (trailing slash insensitive).
    fn entry_key(server_url: &str) -> String {
        let normalized = server_url.trim().trim_end_matches('/');
        let hash = Sha256::digest(normalized.as_bytes());
        format!("session:{}", URL_SAFE_NO_PAD.encode(hash))
    }

    pub async fn token(&self) -> Option<String> {
        self.cache.read().await.get(TOKEN_KEY).cloned()
    }

    pub async fn user_id(&self) -> Option<i64> {
        self.cache
            .read()
            .await
            .get(USER_ID_KEY)
            .and_then(|v| v.parse().ok())
    }

    pub async fn username(&self) -> Option<String> {
        self.cache.read().await.get(USERNAME_KEY).cloned()
    }

    /// Full login response saved at login, if readable.
    pub async fn login_response(&self) -> Option<LoginResponse> {
        let cache = self.cache.read().await;
        let raw = cache.get(USER_DATA_KEY)?;
        serde_json::from_str(raw).ok()
    }

    /// Role of the stored user, if a login response was saved.
    pub async fn role(&self) -> Option<UserRole> {
        self.login_response().await.map(|r| r.user.role)
    }

    pub async fn is_logged_in(&self) -> bool {
        self.token().await.is_some()
    }

    /// Persist token and identity from a successful login.
    pub async fn save_login(&self, resp: &LoginResponse) -> Result<()> {
        let mut cache = self.cache.write().await;
        cache.insert(TOKEN_KEY.into(), resp.token.clone());
        cache.insert(USER_ID_KEY.into(), resp.user.id.to_string());
        cache.insert(USERNAME_KEY.into(), resp.user.username.clone());
        cache.insert(USER_DATA_KEY.into(), serde_json::to_string(resp)?);
        self.persist(&cache).await
    }

    /// Remove every stored value for this server.
    pub async fn clear(&self) -> Result<()> {
        let mut cache = self.cache.write().await;
        cache.remove(TOKEN_KEY);
        cache.remove(USER_ID_KEY);
        cache.remove(USERNAME_KEY);
        cache.remove(USER_DATA_KEY);
        self.persist(&cache).await
    }

    /// Merge this server's entry into the file, keeping other servers' entries.
    async fn persist(&self, entry: &Entry) -> Result<()> {
        let mut map = load_map(&self.path).await?;
        if entry.is_empty() {
            map.remove(&self.entry_key);
        } else {
            map.insert(self.entry_key.clone(), entry.clone());
        }
        save_map(&self.path, &map).await
    }
}

/// Load the whole session map from disk.
async fn load_map(path: &PathBuf) -> Result<HashMap<String, Entry>> {
    match fs::read(path).await {
        Ok(data) => {
            if data.is_empty() {
                return Ok(HashMap::new());
            }
            Ok(serde_json::from_slice(&data)?)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
        Err(e) => Err(e.into()),
    }
}

/// Persist the session map, creating directories if needed.
async fn save_map(path: &PathBuf, map: &HashMap<String, Entry>) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).await?;
    }
    let data = serde_json::to_vec_pretty(map)?;
    let file = fs::File::create(path).await?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&data).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::User;

    fn login(token: &str, id: i64) -> LoginResponse {
        LoginResponse {
            token: token.into(),
            user: User {
                id,
                username: "budi".into(),
                role: UserRole::Sales,
                initial: "B".into(),
                is_active: true,
                created_at: "2026-01-01T00:00:00Z".into(),
            },
        }
    }

    #[tokio::test]
    async fn login_survives_reopen_and_logout_clears_everything() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/session.json");

        let store = SessionStore::open(&path, "http://api.local/api/").await.unwrap();
        assert!(!store.is_logged_in().await);
        store.save_login(&login("tok-1", 12)).await.unwrap();

        let reopened = SessionStore::open(&path, "http://api.local/api").await.unwrap();
        assert_eq!(reopened.token().await.as_deref(), Some("tok-1"));
        assert_eq!(reopened.user_id().await, Some(12));
        assert_eq!(reopened.username().await.as_deref(), Some("budi"));
        assert_eq!(reopened.login_response().await, Some(login("tok-1", 12)));
        assert_eq!(reopened.role().await, Some(UserRole::Sales));

        reopened.clear().await.unwrap();
        let after = SessionStore::open(&path, "http://api.local/api").await.unwrap();
        assert!(after.token().await.is_none());
        assert!(after.user_id().await.is_none());
        assert!(after.login_response().await.is_none());
        assert!(after.role().await.is_none());
    }

    #[tokio::test]
    async fn sessions_are_isolated_per_server() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let a = SessionStore::open(&path, "https://a.example/api").await.unwrap();
        a.save_login(&login("tok-a", 1)).await.unwrap();
        let b = SessionStore::open(&path, "https://b.example/api").await.unwrap();
        assert!(b.token().await.is_none());
        b.save_login(&login("tok-b", 2)).await.unwrap();

        let a_again = SessionStore::open(&path, "https://a.example/api").await.unwrap();
        assert_eq!(a_again.token().await.as_deref(), Some("tok-a"));
    }

    #[tokio::test]
    async fn empty_file_is_treated_as_no_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, b"").unwrap();
        let store = SessionStore::open(&path, "http://x").await.unwrap();
        assert!(!store.is_logged_in().await);
    }
}
