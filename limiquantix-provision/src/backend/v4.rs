//! Generation 4 API: fetch a snapshot, submit a replacement.
//!
//! The service has no incremental mutators. A change is expressed as a `Vm`
//! value holding only the fields to replace and sent with a single `update`.
//! Unset fields are omitted from the submitted document.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SdkError;
use crate::payload::PayloadKind;

/// Service bound to one VM on a generation 4 management system.
///
/// Dropping the service releases the connection it was created from.
#[async_trait]
pub trait VmService: Send + Sync {
    /// Fetch the current representation of the VM.
    async fn get(&self) -> Result<Vm, SdkError>;

    /// Submit a replacement representation.
    async fn update(&self, vm: Vm) -> Result<(), SdkError>;
}

/// A file inside a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    pub name: String,
    pub content: String,
}

/// A payload attached to a VM device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    #[serde(rename = "type")]
    pub kind: PayloadKind,
    pub files: Vec<File>,
}

/// Guest initialization settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Initialization {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_script: Option<String>,
}

/// Memory guarantees.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryPolicy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guaranteed: Option<u64>,
}

/// CPU topology as the generation 4 API spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuTopology {
    pub cores: u32,
    pub sockets: u32,
}

/// CPU settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cpu {
    pub topology: CpuTopology,
}

/// Reference to a host by backend id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRef {
    pub id: String,
}

/// Placement restrictions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmPlacementPolicy {
    pub hosts: Vec<HostRef>,
}

/// VM representation used both as the fetched snapshot and as the
/// replacement submitted with `update`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_policy: Option<MemoryPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<Cpu>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initialization: Option<Initialization>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payloads: Option<Vec<Payload>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placement_policy: Option<VmPlacementPolicy>,
}

impl Vm {
    /// Start an empty replacement.
    pub fn builder() -> VmBuilder {
        VmBuilder { vm: Vm::default() }
    }
}

/// Builds a replacement `Vm` value.
///
/// The builder owns its value; nothing is shared with the snapshot it may
/// have started from.
#[derive(Debug, Clone)]
pub struct VmBuilder {
    vm: Vm,
}

impl VmBuilder {
    /// Start from a fetched snapshot, keeping all of its fields.
    pub fn from_snapshot(snapshot: Vm) -> Self {
        Self { vm: snapshot }
    }

    /// Replace the payload list.
    pub fn payloads(mut self, payloads: Vec<Payload>) -> Self {
        self.vm.payloads = Some(payloads);
        self
    }

    /// Set the initialization custom script.
    pub fn custom_script(mut self, script: impl Into<String>) -> Self {
        self.vm.initialization = Some(Initialization {
            custom_script: Some(script.into()),
        });
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.vm.description = Some(description.into());
        self
    }

    /// Memory size in bytes.
    pub fn memory(mut self, bytes: u64) -> Self {
        self.vm.memory = Some(bytes);
        self
    }

    /// Guaranteed memory in bytes.
    pub fn guaranteed_memory(mut self, bytes: u64) -> Self {
        self.vm.memory_policy = Some(MemoryPolicy {
            guaranteed: Some(bytes),
        });
        self
    }

    pub fn cpu_topology(mut self, cores: u32, sockets: u32) -> Self {
        self.vm.cpu = Some(Cpu {
            topology: CpuTopology { cores, sockets },
        });
        self
    }

    /// Restrict placement to the given hosts.
    pub fn placement_hosts(mut self, hosts: Vec<HostRef>) -> Self {
        self.vm.placement_policy = Some(VmPlacementPolicy { hosts });
        self
    }

    pub fn build(self) -> Vm {
        self.vm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_replacement_serialization() {
        let vm = Vm::builder().custom_script("#some_script").build();

        let json = serde_json::to_value(&vm).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "initialization": { "custom_script": "#some_script" } })
        );
    }

    #[test]
    fn test_payload_type_field() {
        let vm = Vm::builder()
            .payloads(vec![Payload {
                kind: PayloadKind::Floppy,
                files: vec![File {
                    name: "user-data.txt".into(),
                    content: "#cloud-config".into(),
                }],
            }])
            .build();

        let json = serde_json::to_value(&vm).unwrap();
        assert_eq!(json["payloads"][0]["type"], "floppy");
        assert_eq!(json["payloads"][0]["files"][0]["name"], "user-data.txt");
    }

    #[test]
    fn test_from_snapshot_keeps_fields() {
        let snapshot = Vm {
            id: Some("vm-1".into()),
            name: Some("web01".into()),
            memory: Some(1024),
            ..Default::default()
        };

        let vm = VmBuilder::from_snapshot(snapshot).payloads(Vec::new()).build();
        assert_eq!(vm.id.as_deref(), Some("vm-1"));
        assert_eq!(vm.memory, Some(1024));
        assert_eq!(vm.payloads, Some(Vec::new()));
    }
}
