//! Board geometry, fleet composition and client tuning knobs.

pub const BOARD_SIZE: usize = 10;
pub const BOARD_CELLS: usize = BOARD_SIZE * BOARD_SIZE;

/// Required fleet as `(ship length, count)` pairs.
pub const FLEET: [(usize, usize); 4] = [(1, 4), (2, 3), (3, 2), (4, 1)];

/// Longest ship in the fleet.
pub const MAX_SHIP_LENGTH: usize = 4;

/// Total number of ship segments in a legal placement.
pub const TOTAL_SHIP_CELLS: usize = 4 + 3 * 2 + 2 * 3 + 4;

/// Upper bound for a buffered, not yet terminated line.
pub const MAX_LINE_LENGTH: usize = 4096;

/// Number of ships of `length` the fleet requires, `None` for lengths
/// that are not part of the fleet at all.
pub fn fleet_count(length: usize) -> Option<usize> {
    FLEET
        .iter()
        .find(|(len, _)| *len == length)
        .map(|(_, count)| *count)
}

#[cfg(feature = "std")]
pub use self::client::ClientConfig;

#[cfg(feature = "std")]
mod client {
    use std::path::Path;
    use std::time::Duration;

    use log::LevelFilter;
    use serde::Deserialize;

    const DEFAULT_KEEP_ALIVE_MS: u64 = 5_000;
    const DEFAULT_RECEIVE_TIMEOUT_MS: u64 = 15_000;
    const DEFAULT_SEND_TIMEOUT_MS: u64 = 30_000;
    const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

    /// Runtime settings for one client connection.
    ///
    /// Every field may be omitted from the TOML file; missing values fall
    /// back to the defaults below.
    #[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
    #[serde(default)]
    pub struct ClientConfig {
        /// Interval between outgoing `KEEP_ALIVE` messages.
        pub keep_alive_interval_ms: u64,
        /// Silence on the receive side longer than this drops the
        /// connection. `0` disables the check.
        pub receive_timeout_ms: u64,
        pub send_timeout_ms: u64,
        pub connect_timeout_ms: u64,
        /// One of `off`, `error`, `warn`, `info`, `debug`, `trace`.
        pub log_level: String,
    }

    impl Default for ClientConfig {
        fn default() -> Self {
            Self {
                keep_alive_interval_ms: DEFAULT_KEEP_ALIVE_MS,
                receive_timeout_ms: DEFAULT_RECEIVE_TIMEOUT_MS,
                send_timeout_ms: DEFAULT_SEND_TIMEOUT_MS,
                connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
                log_level: "info".to_string(),
            }
        }
    }

    impl ClientConfig {
        /// Parse a configuration from TOML text.
        pub fn from_toml(text: &str) -> anyhow::Result<Self> {
            toml::from_str(text).map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))
        }

        /// Load a configuration file.
        pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
            let path = path.as_ref();
            let text = std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("Cannot read {}: {}", path.display(), e))?;
            Self::from_toml(&text)
        }

        pub fn keep_alive_interval(&self) -> Duration {
            Duration::from_millis(self.keep_alive_interval_ms)
        }

        pub fn receive_timeout(&self) -> Option<Duration> {
            (self.receive_timeout_ms > 0).then(|| Duration::from_millis(self.receive_timeout_ms))
        }

        pub fn send_timeout(&self) -> Duration {
            Duration::from_millis(self.send_timeout_ms)
        }

        pub fn connect_timeout(&self) -> Duration {
            Duration::from_millis(self.connect_timeout_ms)
        }

        /// Configured log level, `Info` when the value does not parse.
        pub fn level_filter(&self) -> LevelFilter {
            self.log_level.parse().unwrap_or(LevelFilter::Info)
        }
    }
}
