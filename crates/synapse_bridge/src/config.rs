//! # Bridge Configuration
//!
//! All timing, retry and cadence policy in one externally loadable struct.
//!
//! ## Design
//!
//! Deadlines and retry budgets are deployment decisions, not constants:
//! a broadcast wall runs a different cook budget than a laptop preview.
//! Everything here loads from TOML and has a sensible default.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use synapse_core::{CapabilitySet, GpuApi, TextureFormat, TimeMode};

use crate::error::{BridgeError, BridgeResult};
use crate::{DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_COOK_TIMEOUT_MS};

/// How the host frame loop couples to the external engine's cook cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CookMode {
    /// The host stalls its frame until the outstanding cook resolves;
    /// every host frame gets a matching cook.
    Synchronized,
    /// The host never stalls; cook output is consumed one frame late.
    DelayedSynchronized,
    /// The external engine free-runs; host ticks that collide with an
    /// outstanding cook are dropped.
    #[default]
    Independent,
}

/// Reconnect retry policy with exponential back-off.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum connect attempts before the instance faults.
    pub max_attempts: u32,
    /// Back-off before the second attempt; doubles each retry.
    pub base_backoff_ms: u64,
    /// Upper bound on a single back-off step, jitter excluded.
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff_ms: 250,
            max_backoff_ms: 4_000,
        }
    }
}

/// Bridge configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Host/engine cadence coupling.
    pub cook_mode: CookMode,
    /// Who drives the external engine's clock.
    pub time_mode: TimeMode,
    /// Host frame rate hint, used to step [`synapse_core::FrameTime`].
    pub frame_rate: u32,
    /// Wall-clock deadline for one cook.
    pub cook_timeout_ms: u64,
    /// Deadline for connect plus handshake plus content load.
    pub connect_timeout_ms: u64,
    /// Capacity of the worker-to-tick event queue.
    pub event_capacity: usize,
    /// GPU APIs the host accepts, most preferred first.
    pub preferred_apis: Vec<GpuApi>,
    /// Reconnect policy.
    pub retry: RetryPolicy,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            cook_mode: CookMode::default(),
            time_mode: TimeMode::default(),
            frame_rate: 60,
            cook_timeout_ms: DEFAULT_COOK_TIMEOUT_MS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            event_capacity: 1024,
            preferred_apis: vec![GpuApi::D3D12, GpuApi::Vulkan, GpuApi::D3D11],
            retry: RetryPolicy::default(),
        }
    }
}

impl BridgeConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// [`BridgeError::InvalidConfig`] if the file cannot be read or parsed.
    pub fn from_toml(path: impl AsRef<Path>) -> BridgeResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| BridgeError::InvalidConfig(e.to_string()))?;
        toml::from_str(&text).map_err(|e| BridgeError::InvalidConfig(e.to_string()))
    }

    /// Cook deadline as a [`Duration`].
    #[must_use]
    pub const fn cook_timeout(&self) -> Duration {
        Duration::from_millis(self.cook_timeout_ms)
    }

    /// Connect deadline as a [`Duration`].
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Capability set the host advertises during the handshake.
    #[must_use]
    pub fn host_capabilities(&self) -> CapabilitySet {
        CapabilitySet {
            gpu_apis: self.preferred_apis.clone(),
            formats: TextureFormat::ALL.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.cook_mode, CookMode::Independent);
        assert_eq!(config.cook_timeout(), Duration::from_millis(250));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.preferred_apis[0], GpuApi::D3D12);
    }

    #[test]
    fn test_parse_overrides() {
        let text = r#"
            cook_mode = "synchronized"
            time_mode = "internal"
            cook_timeout_ms = 100
            preferred_apis = ["vulkan"]

            [retry]
            max_attempts = 5
        "#;
        let config: BridgeConfig = toml::from_str(text).unwrap();
        assert_eq!(config.cook_mode, CookMode::Synchronized);
        assert_eq!(config.time_mode, TimeMode::Internal);
        assert_eq!(config.cook_timeout_ms, 100);
        assert_eq!(config.preferred_apis, vec![GpuApi::Vulkan]);
        assert_eq!(config.retry.max_attempts, 5);
        // Unspecified fields keep their defaults.
        assert_eq!(config.connect_timeout_ms, DEFAULT_CONNECT_TIMEOUT_MS);
        assert_eq!(config.retry.base_backoff_ms, 250);
    }

    #[test]
    fn test_host_capabilities_follow_preference() {
        let config = BridgeConfig {
            preferred_apis: vec![GpuApi::Vulkan, GpuApi::D3D11],
            ..BridgeConfig::default()
        };
        let caps = config.host_capabilities();
        assert_eq!(caps.gpu_apis, vec![GpuApi::Vulkan, GpuApi::D3D11]);
        assert!(caps.supports_format(TextureFormat::Rgba16F));
    }
}
