//! Error types

use thiserror::Error;

/// Errors from race commands
#[derive(Debug, Error)]
pub enum RaceError {
    /// Fewer than two participants; nothing was changed.
    #[error("a race needs at least 2 participants, got {count}")]
    NotEnoughParticipants { count: usize },
}

/// Errors loading or saving settings
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Reading or writing the settings file failed.
    #[error("settings io error: {0}")]
    Io(#[from] std::io::Error),

    /// The settings file is not valid settings JSON.
    #[error("settings json error: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = RaceError::NotEnoughParticipants { count: 1 };
        assert_eq!(err.to_string(), "a race needs at least 2 participants, got 1");

        let parse = serde_json::from_str::<u32>("nope").unwrap_err();
        let err = SettingsError::from(parse);
        assert!(err.to_string().starts_with("settings json error"));
    }
}
