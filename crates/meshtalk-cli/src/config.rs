//! On-disk overrides for [`NodeConfig`]'s radio-parameter section (spec §6.5).
//!
//! Timing constants are not exposed here: spec §6.5 treats them as protocol
//! constants, not deployment knobs, so only the substrate-specific radio
//! parameters are loadable from TOML, the way `wraith-cli::config::Config`
//! loads its network section.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use meshtalk_core::{NodeConfig, RadioParams};

/// Root of the demo CLI's TOML config file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TomlConfig {
    /// Radio-parameter overrides.
    #[serde(default)]
    pub radio: RadioOverrides,
}

/// Optional per-field overrides layered onto [`RadioParams::default`].
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RadioOverrides {
    /// Carrier frequency override, in Hz.
    pub freq_hz: Option<u32>,
    /// Channel bandwidth override, in kHz.
    pub bw_khz: Option<u32>,
    /// Spreading factor override.
    pub spreading_factor: Option<u8>,
    /// Transmit power override, in dBm.
    pub tx_dbm: Option<i8>,
}

impl TomlConfig {
    /// Load from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Load from `path` if it exists, or fall back to all-default overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` exists but cannot be parsed.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Layer these overrides onto [`NodeConfig::default`].
    #[must_use]
    pub fn into_node_config(self) -> NodeConfig {
        let mut radio = RadioParams::default();
        if let Some(v) = self.radio.freq_hz {
            radio.freq_hz = v;
        }
        if let Some(v) = self.radio.bw_khz {
            radio.bw_khz = v;
        }
        if let Some(v) = self.radio.spreading_factor {
            radio.spreading_factor = v;
        }
        if let Some(v) = self.radio.tx_dbm {
            radio.tx_dbm = v;
        }

        let mut config = NodeConfig::default();
        config.radio = radio;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_overrides_reproduce_default_radio_params() {
        let config = TomlConfig::default().into_node_config();
        assert_eq!(config.radio.freq_hz, RadioParams::default().freq_hz);
    }

    #[test]
    fn overrides_replace_only_named_fields() {
        let toml = TomlConfig {
            radio: RadioOverrides {
                tx_dbm: Some(20),
                ..Default::default()
            },
        };
        let config = toml.into_node_config();
        assert_eq!(config.radio.tx_dbm, 20);
        assert_eq!(config.radio.bw_khz, RadioParams::default().bw_khz);
    }
}
