//! Strategy for the v3 API.

use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{debug, info, instrument};

use super::{BackendStrategy, StrategyKind};
use crate::backend::LegacyVm;
use crate::error::{ProvisionError, Result};
use crate::payload::ConfigurationPayload;
use crate::types::HardwareSpec;

/// Configures a VM through the direct mutators of a v3 handle.
///
/// Each mutator is persisted as it returns, so a failure partway through
/// `set_hardware` leaves the fields set before it applied.
pub struct LegacyStrategy {
    vm: Box<dyn LegacyVm>,
}

impl LegacyStrategy {
    /// Bind to a live VM handle.
    pub fn new(vm: Box<dyn LegacyVm>) -> Self {
        Self { vm }
    }
}

#[async_trait]
impl BackendStrategy for LegacyStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Legacy
    }

    #[instrument(skip(self, payload), fields(vm_ref = %self.vm.vm_ref(), kind = %payload.kind()))]
    async fn attach_boot_payload(&self, payload: &ConfigurationPayload) -> Result<()> {
        let files: HashMap<String, String> = payload
            .files()
            .iter()
            .map(|f| (f.name.clone(), f.content.clone()))
            .collect();

        debug!(files = files.len(), "Attaching floppy");

        self.vm
            .attach_floppy(files)
            .await
            .map_err(|e| ProvisionError::backend("attach_floppy", e))?;

        info!("Floppy payload attached");
        Ok(())
    }

    #[instrument(skip(self, script), fields(vm_ref = %self.vm.vm_ref(), script_len = script.len()))]
    async fn set_cloud_init_script(&self, script: &str) -> Result<()> {
        self.vm
            .set_cloud_init(script)
            .await
            .map_err(|e| ProvisionError::backend("cloud_init", e))?;

        info!("Cloud-init script set");
        Ok(())
    }

    async fn set_sysprep_script(&self, _script: &str) -> Result<()> {
        Err(ProvisionError::UnsupportedOperation {
            operation: "set_sysprep_script",
            strategy: StrategyKind::Legacy.name(),
        })
    }

    #[instrument(skip(self, spec), fields(vm_ref = %self.vm.vm_ref()))]
    async fn set_hardware(&self, spec: &HardwareSpec) -> Result<()> {
        self.vm
            .set_description(spec.description.as_deref())
            .await
            .map_err(|e| ProvisionError::backend("description", e))?;

        if let Some(bytes) = spec.memory_bytes {
            self.vm
                .set_memory(bytes)
                .await
                .map_err(|e| ProvisionError::backend("memory", e))?;
        }

        if let Some(bytes) = spec.memory_reserve_bytes {
            self.vm
                .set_memory_reserve(bytes)
                .await
                .map_err(|e| ProvisionError::backend("memory_reserve", e))?;
        }

        self.vm
            .set_cpu_topology(spec.cpu_topology)
            .await
            .map_err(|e| ProvisionError::backend("cpu_topology", e))?;

        if let Some(host_ref) = &spec.host_affinity {
            self.vm
                .set_host_affinity(host_ref)
                .await
                .map_err(|e| ProvisionError::backend("host_affinity", e))?;
        }

        info!(
            cores = spec.cpu_topology.cores,
            sockets = spec.cpu_topology.sockets,
            memory_bytes = ?spec.memory_bytes,
            "Hardware applied"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SdkError;
    use crate::mock::{LegacyCall, MockLegacyVm};
    use crate::types::CpuTopology;

    #[tokio::test]
    async fn test_attach_maps_files_one_to_one() {
        let vm = MockLegacyVm::new("vm-1");
        let strategy = LegacyStrategy::new(Box::new(vm.clone()));
        let payload = ConfigurationPayload::floppy("user-data.txt", "#some_script").unwrap();

        strategy.attach_boot_payload(&payload).await.unwrap();

        let expected: HashMap<String, String> =
            [("user-data.txt".to_string(), "#some_script".to_string())].into();
        assert_eq!(vm.calls(), vec![LegacyCall::AttachFloppy(expected)]);
    }

    #[tokio::test]
    async fn test_sysprep_unsupported() {
        let vm = MockLegacyVm::new("vm-1");
        let strategy = LegacyStrategy::new(Box::new(vm.clone()));

        let err = strategy.set_sysprep_script("<unattend/>").await.unwrap_err();
        assert!(matches!(err, ProvisionError::UnsupportedOperation { .. }));
        assert!(vm.calls().is_empty());
    }

    #[tokio::test]
    async fn test_hardware_skips_unset_fields() {
        let vm = MockLegacyVm::new("vm-1");
        let strategy = LegacyStrategy::new(Box::new(vm.clone()));

        strategy.set_hardware(&HardwareSpec::default()).await.unwrap();

        assert_eq!(
            vm.calls(),
            vec![
                LegacyCall::Description(None),
                LegacyCall::CpuTopology(CpuTopology { cores: 1, sockets: 1 }),
            ]
        );
    }

    #[tokio::test]
    async fn test_failure_is_wrapped() {
        let vm = MockLegacyVm::new("vm-1");
        vm.fail_with(SdkError::Connection("reset by peer".into()));
        let strategy = LegacyStrategy::new(Box::new(vm.clone()));

        let err = strategy.set_cloud_init_script("#x").await.unwrap_err();
        assert!(matches!(
            err,
            ProvisionError::BackendOperation { operation: "cloud_init", source: SdkError::Connection(_) }
        ));
    }
}
