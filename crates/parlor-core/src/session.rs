use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::model::User;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn label(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl std::str::FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(anyhow!("unknown theme: {other} (expected light or dark)")),
        }
    }
}

/// What survives between invocations: the bearer token, the logged-in
/// user, and the theme preference. An absent file means logged out.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Session {
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default)]
    pub user: Option<User>,

    #[serde(default)]
    pub theme: Theme,
}

impl Session {
    pub fn is_logged_in(&self) -> bool {
        self.token.is_some()
    }
}

#[derive(Debug)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;
        let path = data_dir.join("session.json");
        info!(session = %path.display(), "opened session store");
        Ok(Self { path })
    }

    /// A corrupt session file logs out rather than erroring: the user can
    /// always log in again.
    #[tracing::instrument(skip(self))]
    pub fn load(&self) -> anyhow::Result<Session> {
        if !self.path.exists() {
            debug!("no session file; starting logged out");
            return Ok(Session::default());
        }

        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed reading {}", self.path.display()))?;

        match serde_json::from_str(&raw) {
            Ok(session) => Ok(session),
            Err(err) => {
                warn!(error = %err, "session file unreadable; treating as logged out");
                Ok(Session::default())
            }
        }
    }

    #[tracing::instrument(skip(self, session))]
    pub fn save(&self, session: &Session) -> anyhow::Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir)?;
        let serialized = serde_json::to_string_pretty(session)?;
        temp.write_all(serialized.as_bytes())?;
        temp.flush()?;

        temp.persist(&self.path)
            .map_err(|err| anyhow!("failed to persist {}: {}", self.path.display(), err))?;

        debug!(logged_in = session.is_logged_in(), "saved session");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn clear(&self) -> anyhow::Result<()> {
        let mut logged_out = self.load()?;
        logged_out.token = None;
        logged_out.user = None;
        self.save(&logged_out)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::{Session, SessionStore, Theme};
    use crate::model::User;

    #[test]
    fn missing_file_means_logged_out() {
        let temp = tempdir().expect("tempdir");
        let store = SessionStore::open(temp.path()).expect("open store");

        let session = store.load().expect("load");
        assert!(!session.is_logged_in());
        assert_eq!(session.theme, Theme::Light);
    }

    #[test]
    fn roundtrip_preserves_token_user_and_theme() {
        let temp = tempdir().expect("tempdir");
        let store = SessionStore::open(temp.path()).expect("open store");

        let session = Session {
            token: Some("tok-123".to_string()),
            user: Some(User {
                id: "u1".to_string(),
                name: "Dana".to_string(),
                email: "dana@example.com".to_string(),
            }),
            theme: Theme::Dark,
        };
        store.save(&session).expect("save");

        let loaded = store.load().expect("load");
        assert_eq!(loaded.token.as_deref(), Some("tok-123"));
        assert_eq!(loaded.user.map(|u| u.name), Some("Dana".to_string()));
        assert_eq!(loaded.theme, Theme::Dark);
    }

    #[test]
    fn clear_keeps_theme() {
        let temp = tempdir().expect("tempdir");
        let store = SessionStore::open(temp.path()).expect("open store");

        store
            .save(&Session {
                token: Some("tok".to_string()),
                user: None,
                theme: Theme::Dark,
            })
            .expect("save");
        store.clear().expect("clear");

        let loaded = store.load().expect("load");
        assert!(!loaded.is_logged_in());
        assert_eq!(loaded.theme, Theme::Dark);
    }

    #[test]
    fn corrupt_file_degrades_to_logged_out() {
        let temp = tempdir().expect("tempdir");
        let store = SessionStore::open(temp.path()).expect("open store");
        std::fs::write(temp.path().join("session.json"), "{not json").expect("write");

        let session = store.load().expect("load");
        assert!(!session.is_logged_in());
    }
}
