//! Generation 3 API: direct mutators on a live VM handle.
//!
//! Every call is persisted by the backend when it returns.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::SdkError;
use crate::types::CpuTopology;

/// A live VM handle on a generation 3 management system.
///
/// Dropping the handle releases the session it was acquired on.
#[async_trait]
pub trait LegacyVm: Send + Sync {
    /// Backend reference of the VM.
    fn vm_ref(&self) -> &str;

    /// Attach a floppy holding the given files (name → content).
    async fn attach_floppy(&self, files: HashMap<String, String>) -> Result<(), SdkError>;

    /// Set the cloud-init script.
    async fn set_cloud_init(&self, script: &str) -> Result<(), SdkError>;

    /// Set the description; `None` clears it.
    async fn set_description(&self, description: Option<&str>) -> Result<(), SdkError>;

    /// Set the memory size in bytes.
    async fn set_memory(&self, bytes: u64) -> Result<(), SdkError>;

    /// Set the guaranteed memory in bytes.
    async fn set_memory_reserve(&self, bytes: u64) -> Result<(), SdkError>;

    /// Set cores per socket and socket count.
    async fn set_cpu_topology(&self, topology: CpuTopology) -> Result<(), SdkError>;

    /// Pin the VM to the host with the given backend reference.
    async fn set_host_affinity(&self, host_ref: &str) -> Result<(), SdkError>;
}
