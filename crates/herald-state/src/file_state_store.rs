use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use herald_core::{write_text_atomic, StateStore};
use serde::{Deserialize, Serialize};

pub const HERALD_STATE_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct HeraldState {
    schema_version: u32,
    #[serde(default)]
    cursor: Option<String>,
    /// Username to public avatar URL.
    #[serde(default)]
    avatars: BTreeMap<String, String>,
}

impl Default for HeraldState {
    fn default() -> Self {
        Self {
            schema_version: HERALD_STATE_SCHEMA_VERSION,
            cursor: None,
            avatars: BTreeMap::new(),
        }
    }
}

/// JSON-file [`StateStore`]. Every mutation is flushed with an atomic rename,
/// so a crash leaves either the previous or the new document on disk.
pub struct FileStateStore {
    path: PathBuf,
    state: Mutex<HeraldState>,
}

impl FileStateStore {
    pub fn load(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read state file {}", path.display()))?;
            serde_json::from_str::<HeraldState>(&raw).with_context(|| {
                format!("failed to parse herald state file {}", path.display())
            })?
        } else {
            HeraldState::default()
        };

        if state.schema_version != HERALD_STATE_SCHEMA_VERSION {
            bail!(
                "unsupported herald state schema: expected {}, found {}",
                HERALD_STATE_SCHEMA_VERSION,
                state.schema_version
            );
        }

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, HeraldState>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("herald state mutex is poisoned"))
    }

    fn save(&self, state: &HeraldState) -> Result<()> {
        let mut payload =
            serde_json::to_string_pretty(state).context("failed to serialize state")?;
        payload.push('\n');
        write_text_atomic(&self.path, &payload)
            .with_context(|| format!("failed to write state file {}", self.path.display()))?;
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut HeraldState) -> bool) -> Result<()> {
        let mut state = self.lock()?;
        let mut next = state.clone();
        if !apply(&mut next) {
            return Ok(());
        }
        self.save(&next)?;
        *state = next;
        Ok(())
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn get_cursor(&self) -> Result<Option<String>> {
        Ok(self.lock()?.cursor.clone())
    }

    async fn set_cursor(&self, id: &str) -> Result<()> {
        self.update(|state| {
            if state.cursor.as_deref() == Some(id) {
                return false;
            }
            state.cursor = Some(id.to_string());
            true
        })
    }

    async fn get_avatar(&self, username: &str) -> Result<Option<String>> {
        Ok(self.lock()?.avatars.get(username).cloned())
    }

    async fn set_avatar(&self, username: &str, url: &str) -> Result<()> {
        self.update(|state| {
            if state.avatars.get(username).map(String::as_str) == Some(url) {
                return false;
            }
            state.avatars.insert(username.to_string(), url.to_string());
            true
        })
    }
}
