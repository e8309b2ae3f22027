//! Type definitions shared by the coordinator and the strategies.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// =============================================================================
// MANAGEMENT SYSTEM
// =============================================================================

/// The virtualization management system a VM is provisioned through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagementSystem {
    /// Display name
    pub name: String,
    /// API endpoint, used only for diagnostics
    pub hostname: String,
    /// Version string the API reports (e.g., "3.5.5.0")
    pub api_version: String,
    /// Major API versions the system answers on
    pub supported_api_versions: BTreeSet<u32>,
}

impl ManagementSystem {
    /// Create a management system description.
    pub fn new(name: impl Into<String>, api_version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hostname: String::new(),
            api_version: api_version.into(),
            supported_api_versions: BTreeSet::new(),
        }
    }

    /// Set the API endpoint hostname.
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Set the supported major API versions.
    pub fn with_supported_versions(mut self, versions: impl IntoIterator<Item = u32>) -> Self {
        self.supported_api_versions = versions.into_iter().collect();
        self
    }

    /// Check whether a major API version is supported.
    pub fn supports_api(&self, major: u32) -> bool {
        self.supported_api_versions.contains(&major)
    }
}

/// A physical host known to the management system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    /// Inventory identifier
    pub id: u64,
    /// Host name
    pub name: String,
    /// Backend-native reference, used as the affinity target
    pub ems_ref: String,
}

// =============================================================================
// CUSTOMIZATION TEMPLATES
// =============================================================================

/// Kind of script a customization template holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    CloudInit,
    Sysprep,
    Kickstart,
}

impl TemplateKind {
    /// File name the script gets when attached as a boot-time file.
    pub fn default_filename(&self) -> &'static str {
        match self {
            TemplateKind::CloudInit => "user-data.txt",
            TemplateKind::Sysprep => "unattend.xml",
            TemplateKind::Kickstart => "ks.cfg",
        }
    }
}

/// A script template before substitution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomizationTemplate {
    pub id: u64,
    pub name: String,
    pub kind: TemplateKind,
    /// Raw script text, may contain `#placeholder#` tokens
    pub script: String,
}

impl CustomizationTemplate {
    pub fn new(id: u64, name: impl Into<String>, kind: TemplateKind, script: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            script: script.into(),
        }
    }

    /// File name used when the rendered script is attached as a file.
    pub fn default_filename(&self) -> &'static str {
        self.kind.default_filename()
    }
}

// =============================================================================
// HARDWARE
// =============================================================================

/// CPU topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuTopology {
    /// Cores per socket
    pub cores: u32,
    /// Number of sockets
    pub sockets: u32,
}

impl Default for CpuTopology {
    fn default() -> Self {
        Self { cores: 1, sockets: 1 }
    }
}

impl CpuTopology {
    /// Build a topology, treating unset values as 1.
    pub fn from_options(cores: Option<u32>, sockets: Option<u32>) -> Self {
        Self {
            cores: cores.unwrap_or(1),
            sockets: sockets.unwrap_or(1),
        }
    }

    /// Get total vCPUs.
    pub fn total_vcpus(&self) -> u32 {
        self.cores * self.sockets
    }
}

/// Hardware properties applied to a provisioned VM.
///
/// `cpu_topology` is always written to the backend. The v3 handle also
/// always receives `description`, where `None` clears it; the v4 replacement
/// leaves an unset description out. The remaining fields are only written
/// when set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareSpec {
    /// Description text
    pub description: Option<String>,
    /// Memory size in bytes
    pub memory_bytes: Option<u64>,
    /// Guaranteed memory in bytes
    pub memory_reserve_bytes: Option<u64>,
    /// CPU topology
    pub cpu_topology: CpuTopology,
    /// Backend reference of the host to pin the VM to
    pub host_affinity: Option<String>,
}
