//! Settings repository implementation

use crate::error::Result;
use crate::models::{Settings, SyncInterval};
use crate::session::Session;
use rusqlite::{params, Connection, OptionalExtension};

const SYNC_INTERVAL_KEY: &str = "sync_interval";
const SESSION_KEY: &str = "session";
const LAST_SYNC_PREFIX: &str = "last_sync_at:";

/// Trait for key/value settings storage
pub trait SettingsRepository {
    /// Load user preferences
    fn load(&self) -> Result<Settings>;

    /// Save user preferences
    fn save(&self, settings: &Settings) -> Result<()>;

    /// Persisted session, if any
    fn load_session(&self) -> Result<Option<Session>>;

    fn save_session(&self, session: &Session) -> Result<()>;

    fn clear_session(&self) -> Result<()>;

    /// Last successful sync pass for an account (Unix ms)
    fn last_sync_at(&self, user_id: &str) -> Result<Option<i64>>;

    fn set_last_sync_at(&self, user_id: &str, at_ms: i64) -> Result<()>;

    /// Forget last-sync times for every account
    fn clear_last_sync(&self) -> Result<()>;
}

/// `SQLite` implementation of `SettingsRepository`
pub struct SqliteSettingsRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteSettingsRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)",
            params![key, value],
        )?;
        Ok(())
    }

    fn delete_setting(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM settings WHERE key = ?", params![key])?;
        Ok(())
    }
}

impl SettingsRepository for SqliteSettingsRepository<'_> {
    fn load(&self) -> Result<Settings> {
        let mut settings = Settings::default();

        if let Some(value) = self.get_setting(SYNC_INTERVAL_KEY)? {
            match value.parse::<SyncInterval>() {
                Ok(interval) => settings.sync_interval = interval,
                Err(error) => tracing::warn!("Ignoring stored sync interval: {error}"),
            }
        }

        Ok(settings)
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        self.set_setting(SYNC_INTERVAL_KEY, settings.sync_interval.as_str())
    }

    fn load_session(&self) -> Result<Option<Session>> {
        let Some(raw) = self.get_setting(SESSION_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(error) => {
                tracing::warn!("Discarding unreadable stored session: {error}");
                self.clear_session()?;
                Ok(None)
            }
        }
    }

    fn save_session(&self, session: &Session) -> Result<()> {
        self.set_setting(SESSION_KEY, &serde_json::to_string(session)?)
    }

    fn clear_session(&self) -> Result<()> {
        self.delete_setting(SESSION_KEY)
    }

    fn last_sync_at(&self, user_id: &str) -> Result<Option<i64>> {
        Ok(self
            .get_setting(&format!("{LAST_SYNC_PREFIX}{user_id}"))?
            .and_then(|value| value.parse().ok()))
    }

    fn set_last_sync_at(&self, user_id: &str, at_ms: i64) -> Result<()> {
        self.set_setting(&format!("{LAST_SYNC_PREFIX}{user_id}"), &at_ms.to_string())
    }

    fn clear_last_sync(&self) -> Result<()> {
        self.conn.execute(
            "DELETE FROM settings WHERE substr(key, 1, length(?1)) = ?1",
            params![LAST_SYNC_PREFIX],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::session::test_session;

    fn setup() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_load_default_settings() {
        let db = setup();
        let repo = SqliteSettingsRepository::new(db.connection());

        let settings = repo.load().unwrap();
        assert_eq!(settings.sync_interval, SyncInterval::ManualOnly);
    }

    #[test]
    fn test_save_and_load_settings() {
        let db = setup();
        let repo = SqliteSettingsRepository::new(db.connection());

        repo.save(&Settings {
            sync_interval: SyncInterval::Every30Minutes,
        })
        .unwrap();

        assert_eq!(
            repo.load().unwrap().sync_interval,
            SyncInterval::Every30Minutes
        );
    }

    #[test]
    fn test_session_round_trip_and_clear() {
        let db = setup();
        let repo = SqliteSettingsRepository::new(db.connection());

        assert!(repo.load_session().unwrap().is_none());

        let session = test_session("a@b.co");
        repo.save_session(&session).unwrap();
        assert_eq!(repo.load_session().unwrap(), Some(session));

        repo.clear_session().unwrap();
        assert!(repo.load_session().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_session_is_discarded() {
        let db = setup();
        let repo = SqliteSettingsRepository::new(db.connection());

        repo.set_setting(SESSION_KEY, "not json").unwrap();
        assert!(repo.load_session().unwrap().is_none());
        assert!(repo.get_setting(SESSION_KEY).unwrap().is_none());
    }

    #[test]
    fn test_last_sync_is_tracked_per_user() {
        let db = setup();
        let repo = SqliteSettingsRepository::new(db.connection());

        repo.set_last_sync_at("a", 10).unwrap();
        repo.set_last_sync_at("b", 20).unwrap();
        assert_eq!(repo.last_sync_at("a").unwrap(), Some(10));
        assert_eq!(repo.last_sync_at("b").unwrap(), Some(20));

        repo.clear_last_sync().unwrap();
        assert_eq!(repo.last_sync_at("a").unwrap(), None);
        assert_eq!(repo.last_sync_at("b").unwrap(), None);
    }
}
