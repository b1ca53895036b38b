//! Client configuration.

use std::path::PathBuf;

/// Configuration for a [`Client`](crate::Client).
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Directory for durable storage. `None` selects the in-memory backend,
    /// which does not survive a restart.
    pub data_dir: Option<PathBuf>,
    /// Initial connectivity assumption. Hosts that cannot read their
    /// platform signal leave this `false` ("assume offline") and correct it
    /// via [`Client::set_online`](crate::Client::set_online).
    pub assume_online: bool,
}

impl ClientConfig {
    /// Persist under the given directory.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Start with connectivity assumed present.
    pub fn assume_online(mut self) -> Self {
        self.assume_online = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_offline_and_in_memory() {
        let config = ClientConfig::default();
        assert!(config.data_dir.is_none());
        assert!(!config.assume_online);
    }

    #[test]
    fn builder_helpers() {
        let config = ClientConfig::default()
            .with_data_dir("/tmp/satchel")
            .assume_online();
        assert_eq!(config.data_dir.as_deref(), Some("/tmp/satchel".as_ref()));
        assert!(config.assume_online);
    }
}
