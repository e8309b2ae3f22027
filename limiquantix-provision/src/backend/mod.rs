//! Backend SDK boundary.
//!
//! The management system speaks one of two API generations:
//! - **v3**: a live VM handle with one mutator per field ([`LegacyVm`])
//! - **v4**: a per-VM service with `get`/`update` on whole values ([`VmService`])
//!
//! Handles are acquired per configuration call through a [`ProviderConnector`]
//! and released when dropped.

pub mod v3;
pub mod v4;

pub use v3::LegacyVm;
pub use v4::VmService;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::ManagementSystem;

/// Details of the generation 4 connection a service was created on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyContext {
    /// Version string the API reported when the connection was opened
    pub api_version: String,
    /// API endpoint
    pub endpoint: String,
}

/// A generation 4 service together with its connection details.
pub struct ProxySession {
    pub service: Box<dyn VmService>,
    pub context: ProxyContext,
}

/// Opens VM handles on a management system.
///
/// Each returned handle owns its session; dropping it releases the session
/// whether the configuration call succeeded or not.
#[async_trait]
pub trait ProviderConnector: Send + Sync {
    /// Open a generation 3 handle for the VM with the given backend reference.
    async fn connect_legacy(
        &self,
        ems: &ManagementSystem,
        vm_ref: &str,
    ) -> Result<Box<dyn LegacyVm>>;

    /// Open a generation 4 service for the VM with the given backend reference.
    async fn connect_proxy(
        &self,
        ems: &ManagementSystem,
        vm_ref: &str,
    ) -> Result<ProxySession>;
}
