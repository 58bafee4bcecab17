//! JSON file state store.
//!
//! The whole [`StateSnapshot`] lives in one pretty-printed JSON document.
//! Saves write a sibling temporary file and rename it over the target, so a
//! crash mid-save leaves the previous document intact.

use kindergarten_application::ports::state_store::{StateStore, StoreError};
use kindergarten_domain::StateSnapshot;
use kindergarten_domain::util::lock;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// State store backed by a single JSON file.
///
/// Saves are serialized through a mutex; two concurrent saves never
/// interleave their temporary files.
pub struct JsonStateStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "state.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl StateStore for JsonStateStore {
    fn load(&self) -> Result<Option<StateSnapshot>, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No state file yet");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        if contents.trim().is_empty() {
            return Ok(None);
        }

        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn save(&self, snapshot: &StateSnapshot) -> Result<(), StoreError> {
        let _guard = lock(&self.write_lock);

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(snapshot)?;
        let temp = self.temp_path();
        {
            let mut file = fs::File::create(&temp)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&temp, &self.path)?;

        debug!(
            path = %self.path.display(),
            zones = snapshot.zones.len(),
            attendees = snapshot.attendee_count(),
            "State file written"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use kindergarten_domain::{
        AttendeeRecord, ChannelId, CommunityId, RoleId, UserId, ZoneRecord,
    };

    fn snapshot() -> StateSnapshot {
        let end = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut snapshot = StateSnapshot {
            zones: vec![ZoneRecord {
                community_id: CommunityId::new(1),
                channel_id: ChannelId::new(10),
                role_id: RoleId::new(20),
                announce_role_id: None,
                required_votes: 3,
                attendees: vec![AttendeeRecord {
                    user_id: UserId::new(7),
                    end_time: end,
                    community_id: Some(CommunityId::new(1)),
                }],
            }],
            ..Default::default()
        };
        snapshot.target_cooldowns.insert(UserId::new(7), end);
        snapshot
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStateStore::new(dir.path().join("state.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");
        let store = JsonStateStore::new(&path);

        store.save(&snapshot()).unwrap();
        assert!(path.exists());
        assert!(!store.temp_path().exists());
        assert_eq!(store.load().unwrap(), Some(snapshot()));

        // Ids are written as strings
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"communityId\": \"1\""));
        assert!(raw.contains("\"targetCooldowns\""));
    }

    #[test]
    fn test_save_replaces_previous_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStateStore::new(dir.path().join("state.json"));

        store.save(&snapshot()).unwrap();
        store.save(&StateSnapshot::default()).unwrap();
        assert_eq!(store.load().unwrap(), Some(StateSnapshot::default()));
    }

    #[test]
    fn test_corrupt_file_is_a_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();

        let store = JsonStateStore::new(&path);
        assert!(matches!(store.load(), Err(StoreError::Serialization(_))));
    }

    #[test]
    fn test_empty_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "\n").unwrap();

        assert!(JsonStateStore::new(&path).load().unwrap().is_none());
    }
}
