pub mod estimate;
pub mod generate;
pub mod sample;
pub mod selftest;

use std::path::Path;

use sm3drbg_core::{DrbgConfig, Result};

/// Load the config file if one was given, apply the `--mode` override and
/// validate the result.
pub fn load_config(path: Option<&Path>, mode: Option<u8>) -> Result<DrbgConfig> {
    let mut config = match path {
        Some(path) => DrbgConfig::from_path(path)?,
        None => DrbgConfig::default(),
    };
    if let Some(mode) = mode {
        config.mode = mode;
    }
    config.validate()?;
    Ok(config)
}

pub fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_override_wins() {
        let config = load_config(None, Some(1)).unwrap();
        assert_eq!(config.mode, 1);
        assert_eq!(load_config(None, None).unwrap().mode, 3);
    }

    #[test]
    fn bad_mode_rejected() {
        assert!(load_config(None, Some(9)).is_err());
    }

    #[test]
    fn hex_lowercase() {
        assert_eq!(hex(&[0x00, 0xab, 0x10]), "00ab10");
    }
}
