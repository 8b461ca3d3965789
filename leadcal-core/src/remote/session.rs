//! The signed-in user's backend session, persisted between CLI runs.

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::config::base_dir;
use crate::error::{SyncError, SyncResult};

/// Refresh a little before the real expiry so in-flight calls don't race it.
const EXPIRY_SKEW_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Token grant response of the backend's auth endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub user: GrantUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GrantUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl TryFrom<TokenGrant> for AuthSession {
    type Error = SyncError;

    fn try_from(grant: TokenGrant) -> SyncResult<Self> {
        let expires_at = TimeDelta::try_seconds(grant.expires_in)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .ok_or_else(|| {
                SyncError::SessionInvalid(format!("Invalid token lifetime: {}", grant.expires_in))
            })?;

        Ok(AuthSession {
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            expires_at,
            user_id: grant.user.id,
            email: grant.user.email,
        })
    }
}

impl AuthSession {
    pub fn default_path() -> SyncResult<PathBuf> {
        Ok(base_dir()?.join("session.toml"))
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() + TimeDelta::seconds(EXPIRY_SKEW_SECS) >= self.expires_at
    }

    /// Load a stored session; `None` when nobody has logged in.
    pub fn load(path: &Path) -> SyncResult<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(path)?;
        let session = toml::from_str(&contents).map_err(|e| {
            SyncError::Serialization(format!(
                "Failed to parse session from {}: {e}",
                path.display()
            ))
        })?;

        Ok(Some(session))
    }

    pub fn save(&self, path: &Path) -> SyncResult<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| SyncError::Serialization(format!("Failed to serialize session: {e}")))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;

        // Set to owner-only (0600) since file contains tokens:
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    pub fn remove(path: &Path) -> SyncResult<()> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(expires_in: i64) -> AuthSession {
        AuthSession {
            access_token: "at".into(),
            refresh_token: "rt".into(),
            expires_at: Utc::now() + TimeDelta::seconds(expires_in),
            user_id: "u1".into(),
            email: Some("ana@example.com".into()),
        }
    }

    #[test]
    fn save_then_load_returns_same_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.toml");
        let original = session(3600);

        original.save(&path).unwrap();

        assert_eq!(AuthSession::load(&path).unwrap(), Some(original));
    }

    #[cfg(unix)]
    #[test]
    fn saved_session_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.toml");
        session(3600).save(&path).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn missing_file_means_no_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.toml");

        assert_eq!(AuthSession::load(&path).unwrap(), None);
        AuthSession::remove(&path).unwrap();
    }

    fn grant(expires_in: i64) -> TokenGrant {
        TokenGrant {
            access_token: "at".into(),
            refresh_token: "rt".into(),
            expires_in,
            user: GrantUser {
                id: "u1".into(),
                email: None,
            },
        }
    }

    #[test]
    fn grant_lifetime_sets_expiry() {
        let session = AuthSession::try_from(grant(3600)).unwrap();
        assert_eq!(session.user_id, "u1");
        assert!(!session.is_expired());
    }

    #[test]
    fn out_of_range_grant_lifetime_is_rejected() {
        for expires_in in [i64::MAX, i64::MIN] {
            assert!(matches!(
                AuthSession::try_from(grant(expires_in)),
                Err(SyncError::SessionInvalid(_))
            ));
        }
    }

    #[test]
    fn expiry_includes_skew() {
        assert!(session(30).is_expired());
        assert!(!session(3600).is_expired());
    }
}
