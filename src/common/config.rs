use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::sys::geometry::Rect;

/// Upper bound on screens in one mirror/expand request.
pub const MAX_SCREEN_GROUP_SIZE: usize = 32;

pub fn config_file() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tessera")
        .join("config.toml")
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub inner_window: InnerWindowSettings,
    #[serde(default)]
    pub split: SplitSettings,
    #[serde(default)]
    pub capture: CaptureSettings,
    #[serde(default)]
    pub vsync: VsyncSettings,
    #[serde(default)]
    pub screens: ScreenSettings,
    #[serde(default)]
    pub animation: AnimationSettings,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct InnerWindowSettings {
    /// Placeholder ("recent holder") windows are only shown when enabled.
    #[serde(default = "yes")]
    pub recent_holder_enabled: bool,
    #[serde(default)]
    pub placeholder_rect: Rect,
}

impl Default for InnerWindowSettings {
    fn default() -> Self {
        InnerWindowSettings {
            recent_holder_enabled: yes(),
            placeholder_rect: Rect::ZERO,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct SplitSettings {
    #[serde(default = "default_split_ratio")]
    pub default_ratio: f32,
    #[serde(default)]
    pub divider_rect: Rect,
}

impl Default for SplitSettings {
    fn default() -> Self {
        SplitSettings {
            default_ratio: default_split_ratio(),
            divider_rect: Rect::ZERO,
        }
    }
}

impl SplitSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if !(self.default_ratio > 0.0 && self.default_ratio < 1.0) {
            issues.push(format!(
                "split.default_ratio must be between 0 and 1 (exclusive), got {}",
                self.default_ratio
            ));
        }
        issues
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct CaptureSettings {
    #[serde(default = "default_capture_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        CaptureSettings {
            timeout_ms: default_capture_timeout_ms(),
        }
    }
}

impl CaptureSettings {
    pub fn timeout(&self) -> Duration { Duration::from_millis(self.timeout_ms) }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct VsyncSettings {
    #[serde(default = "default_refresh_rate")]
    pub refresh_rate: f64,
}

impl Default for VsyncSettings {
    fn default() -> Self {
        VsyncSettings {
            refresh_rate: default_refresh_rate(),
        }
    }
}

impl VsyncSettings {
    /// `None` unless the rate is positive and yields a representable interval.
    pub fn frame_interval(&self) -> Option<Duration> {
        if !(self.refresh_rate > 0.0 && self.refresh_rate.is_finite()) {
            return None;
        }
        Duration::try_from_secs_f64(1.0 / self.refresh_rate).ok()
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct ScreenSettings {
    #[serde(default = "default_max_group_size")]
    pub max_group_size: usize,
}

impl Default for ScreenSettings {
    fn default() -> Self {
        ScreenSettings {
            max_group_size: default_max_group_size(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct AnimationSettings {
    #[serde(default = "yes")]
    pub remote_enabled: bool,
}

impl Default for AnimationSettings {
    fn default() -> Self { AnimationSettings { remote_enabled: yes() } }
}

fn yes() -> bool { true }

fn default_split_ratio() -> f32 { 0.5 }

fn default_capture_timeout_ms() -> u64 { 2000 }

fn default_refresh_rate() -> f64 { 60.0 }

fn default_max_group_size() -> usize { MAX_SCREEN_GROUP_SIZE }

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::parse(&buf).with_context(|| format!("loading {}", path.display()))
    }

    pub fn parse(buf: &str) -> anyhow::Result<Config> {
        let config: Config = toml::from_str(buf)?;
        let issues = config.validate();
        if !issues.is_empty() {
            anyhow::bail!("invalid config: {}", issues.join("; "));
        }
        Ok(config)
    }

    /// Validates the entire configuration and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        issues.extend(self.split.validate());

        if self.capture.timeout_ms == 0 {
            issues.push("capture.timeout_ms must be greater than 0".to_string());
        }
        if self.vsync.frame_interval().is_none() {
            issues.push(format!(
                "vsync.refresh_rate must be a positive number, got {}",
                self.vsync.refresh_rate
            ));
        }
        if self.screens.max_group_size == 0 || self.screens.max_group_size > MAX_SCREEN_GROUP_SIZE
        {
            issues.push(format!(
                "screens.max_group_size must be between 1 and {MAX_SCREEN_GROUP_SIZE}, got {}",
                self.screens.max_group_size
            ));
        }

        issues
    }
}
