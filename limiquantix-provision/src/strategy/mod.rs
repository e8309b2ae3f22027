//! The uniform VM configuration contract.
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │            BackendStrategy Trait            │
//! │ (payload, cloud-init, sysprep, hardware)    │
//! └──────────────────────┬──────────────────────┘
//!                        │
//!          ┌─────────────┴─────────────┐
//!          ▼                           ▼
//! ┌───────────────────┐     ┌────────────────────┐
//! │  LegacyStrategy   │     │   ProxyStrategy    │
//! │ (v3, mutators)    │     │ (v4, get/update)   │
//! └───────────────────┘     └────────────────────┘
//! ```

mod legacy;
mod proxy;

pub use legacy::LegacyStrategy;
pub use proxy::ProxyStrategy;

use async_trait::async_trait;

use crate::error::Result;
use crate::payload::ConfigurationPayload;
use crate::types::HardwareSpec;

/// The two strategy variants, one per API generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    /// API v3, direct mutators
    Legacy,
    /// API v4, fetch/copy/submit
    Proxy,
}

impl StrategyKind {
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::Legacy => "legacy",
            StrategyKind::Proxy => "proxy",
        }
    }

    /// Major API version the variant talks to.
    pub fn api_major(&self) -> u32 {
        match self {
            StrategyKind::Legacy => 3,
            StrategyKind::Proxy => 4,
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Configuration operations on one target VM.
///
/// An instance is bound to a single VM handle for the duration of one
/// configuration call. Each operation either applies the whole change or
/// returns an error.
#[async_trait]
pub trait BackendStrategy: Send + Sync {
    /// Which variant this is.
    fn kind(&self) -> StrategyKind;

    /// Attach a boot-time payload to the VM.
    async fn attach_boot_payload(&self, payload: &ConfigurationPayload) -> Result<()>;

    /// Set the cloud-init script.
    async fn set_cloud_init_script(&self, script: &str) -> Result<()>;

    /// Set the sysprep answer script.
    async fn set_sysprep_script(&self, script: &str) -> Result<()>;

    /// Apply hardware properties.
    async fn set_hardware(&self, spec: &HardwareSpec) -> Result<()>;
}
