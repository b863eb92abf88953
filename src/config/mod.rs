mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Locations searched, in order, when no config path is given.
pub const DEFAULT_CONFIG_PATHS: &[&str] = &["./reelprobe.toml", "~/.config/reelprobe/config.toml"];

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    expand_paths(&mut config);
    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    for path_str in DEFAULT_CONFIG_PATHS {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

fn expand_paths(config: &mut Config) {
    if let Some(path) = config.probe.ffprobe_path.take() {
        let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
        config.probe.ffprobe_path = Some(PathBuf::from(expanded));
    }
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.scan.concurrency == 0 {
        anyhow::bail!("scan.concurrency must be at least 1");
    }

    if !config.probe.native && !config.probe.fallback {
        anyhow::bail!("probe.native and probe.fallback cannot both be disabled");
    }

    if config.probe.fallback && config.probe.timeout_secs == 0 {
        anyhow::bail!("probe.timeout_secs must be at least 1");
    }

    if let Some(path) = &config.probe.ffprobe_path {
        if !path.exists() {
            tracing::warn!("Configured ffprobe path does not exist: {:?}", path);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_is_default() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.probe.native);
        assert!(config.probe.fallback);
        assert_eq!(config.scan.concurrency, 4);
        assert_eq!(config.scan.tolerance_secs, 1.0);
    }

    #[test]
    fn rejects_zero_concurrency() {
        let mut config = Config::default();
        config.scan.concurrency = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_no_probers() {
        let mut config = Config::default();
        config.probe.native = false;
        config.probe.fallback = false;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_zero_timeout() {
        let mut config = Config::default();
        config.probe.timeout_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn missing_ffprobe_path_only_warns() {
        let mut config = Config::default();
        config.probe.ffprobe_path = Some(PathBuf::from("/nonexistent/ffprobe"));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn ffprobe_options_follow_probe_section() {
        let config: Config = toml::from_str(
            "[probe]\nffprobe_path = \"/opt/ff/ffprobe\"\nanalyze_duration_us = 100\nprobe_size_bytes = 200\ntimeout_secs = 5\n",
        )
        .unwrap();
        let opts = config.probe.ffprobe_options();
        assert_eq!(opts.binary, Some(PathBuf::from("/opt/ff/ffprobe")));
        assert_eq!(opts.analyze_duration_us, 100);
        assert_eq!(opts.probe_size_bytes, 200);
        assert_eq!(opts.timeout, std::time::Duration::from_secs(5));
    }
}
