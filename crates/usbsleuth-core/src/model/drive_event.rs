/// Normalized volume hot-plug event.
///
/// One `DriveEvent` is produced by the watcher per decoded OS notification
/// and consumed once by the refresh coordinator. It is a plain value: cloned,
/// never shared.
use std::fmt;
use std::path::PathBuf;

/// What happened to the volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriveAction {
    Inserted,
    Removed,
}

impl DriveAction {
    /// Human-readable label used in the activity log.
    pub fn label(self) -> &'static str {
        match self {
            Self::Inserted => "inserted",
            Self::Removed => "removed",
        }
    }
}

impl fmt::Display for DriveAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveEvent {
    pub action: DriveAction,
    /// Drive letter with its separator, e.g. `"G:"`.
    pub drive_letter: String,
}

impl DriveEvent {
    pub fn inserted(drive_letter: impl Into<String>) -> Self {
        Self {
            action: DriveAction::Inserted,
            drive_letter: drive_letter.into(),
        }
    }

    pub fn removed(drive_letter: impl Into<String>) -> Self {
        Self {
            action: DriveAction::Removed,
            drive_letter: drive_letter.into(),
        }
    }
}

/// Default mount root for a drive letter: `"G:"` → `G:\`.
pub fn default_mount_root(drive_letter: &str) -> PathBuf {
    PathBuf::from(format!("{}\\", drive_letter.trim_end_matches('\\')))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mount_root_appends_separator_once() {
        assert_eq!(default_mount_root("G:"), PathBuf::from("G:\\"));
        assert_eq!(default_mount_root("G:\\"), PathBuf::from("G:\\"));
    }

    #[test]
    fn constructors_set_action() {
        assert_eq!(DriveEvent::inserted("E:").action, DriveAction::Inserted);
        assert_eq!(DriveEvent::removed("E:").action, DriveAction::Removed);
        assert_eq!(DriveAction::Removed.to_string(), "removed");
    }
}
