//! Encoder configuration.

use serde::{Deserialize, Serialize};

/// Default capacity hint for a fresh message buffer.
///
/// Large enough that typical calls (a function id, a few scalars and
/// tensor references) never reallocate.
pub const DEFAULT_INITIAL_CAPACITY: usize = 256;

/// Configuration for the message encoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Capacity hint for each new message buffer. Not a limit: the buffer
    /// grows on demand.
    pub initial_capacity: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_config_default() {
        assert_eq!(ProtocolConfig::default().initial_capacity, 256);
    }

    #[test]
    fn test_protocol_config_fills_missing_fields() {
        let config: ProtocolConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ProtocolConfig::default());

        let config: ProtocolConfig =
            serde_json::from_str(r#"{"initial_capacity": 64}"#).unwrap();
        assert_eq!(config.initial_capacity, 64);
    }
}
