//! The provisioning task as seen by the configuration layer.
//!
//! The workflow owns the task. This layer only reads its options and writes
//! flags into its phase context for later phases.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

use crate::types::ManagementSystem;

/// Phase-context flag: the backend sequences the cloud-init boot itself.
pub const BOOT_WITH_CLOUD_INIT: &str = "boot_with_cloud_init";

/// Phase-context flag: the first boot must run sysprep.
pub const BOOT_WITH_SYSPREP: &str = "boot_with_sysprep";

/// Option key holding uploaded sysprep answer-file text.
pub const SYSPREP_UPLOAD_TEXT: &str = "sysprep_upload_text";

/// Options recorded for a provisioning request.
///
/// Memory sizes are in MB. Keys without a dedicated field land in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customization_template_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src_vm_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest_host: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cores_per_socket: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_sockets: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vm_memory: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_reserve: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vm_description: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Transient flags handed from one provisioning phase to the next.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhaseContext(HashMap<String, Value>);

impl PhaseContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_flag(&mut self, key: &str, value: bool) {
        self.0.insert(key.to_string(), Value::Bool(value));
    }

    /// Read a boolean flag; `None` when unset or not a boolean.
    pub fn flag(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// An in-progress provisioning request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionTask {
    /// Task identifier
    pub id: String,
    /// Requested options
    pub options: ProvisionOptions,
    /// Flags for downstream phases
    pub phase_context: PhaseContext,
    /// Management system owning the source template
    pub management_system: ManagementSystem,
    /// Backend reference of the VM being configured, once it exists
    pub destination_vm_ref: Option<String>,
}

impl ProvisionTask {
    /// Create a task with empty options.
    pub fn new(management_system: ManagementSystem) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            options: ProvisionOptions::default(),
            phase_context: PhaseContext::new(),
            management_system,
            destination_vm_ref: None,
        }
    }

    /// Set the task options.
    pub fn with_options(mut self, options: ProvisionOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the destination VM reference.
    pub fn with_destination(mut self, vm_ref: impl Into<String>) -> Self {
        self.destination_vm_ref = Some(vm_ref.into());
        self
    }

    /// Look up any option by key, typed or not.
    ///
    /// Unset options and explicit nulls both return `None`.
    pub fn get_option(&self, key: &str) -> Option<Value> {
        if let Some(value) = self.options.extra.get(key) {
            return (!value.is_null()).then(|| value.clone());
        }

        let mut all = serde_json::to_value(&self.options).ok()?;
        all.get_mut(key)
            .map(Value::take)
            .filter(|v| !v.is_null())
    }

    /// Look up an option and return it only if it is a string.
    pub fn get_option_str(&self, key: &str) -> Option<String> {
        match self.get_option(key)? {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}
