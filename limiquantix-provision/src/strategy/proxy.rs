//! Strategy for the v4 API.
//!
//! Every operation builds one replacement value and submits it with a single
//! `update`, so the backend sees each change as a whole.

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use super::{BackendStrategy, StrategyKind};
use crate::backend::v4::{File, HostRef, Payload, Vm, VmBuilder};
use crate::backend::{ProxyContext, ProxySession, VmService};
use crate::error::{ProvisionError, Result};
use crate::payload::ConfigurationPayload;
use crate::types::HardwareSpec;

/// Configures a VM by submitting replacement values to a v4 service.
pub struct ProxyStrategy {
    service: Box<dyn VmService>,
    context: ProxyContext,
}

impl ProxyStrategy {
    /// Bind to a service and its connection details.
    pub fn new(session: ProxySession) -> Self {
        Self {
            service: session.service,
            context: session.context,
        }
    }

    pub fn context(&self) -> &ProxyContext {
        &self.context
    }

    async fn submit(&self, operation: &'static str, vm: Vm) -> Result<()> {
        debug!(
            operation,
            endpoint = %self.context.endpoint,
            api_version = %self.context.api_version,
            "Submitting VM update"
        );

        self.service
            .update(vm)
            .await
            .map_err(|e| ProvisionError::backend(operation, e))
    }

    /// Replacement carrying the hardware fields.
    ///
    /// Unset optional fields are left out, so the backend keeps its values.
    fn hardware_replacement(spec: &HardwareSpec) -> Vm {
        let mut builder = Vm::builder().cpu_topology(spec.cpu_topology.cores, spec.cpu_topology.sockets);

        if let Some(description) = &spec.description {
            builder = builder.description(description.clone());
        }
        if let Some(bytes) = spec.memory_bytes {
            builder = builder.memory(bytes);
        }
        if let Some(bytes) = spec.memory_reserve_bytes {
            builder = builder.guaranteed_memory(bytes);
        }
        if let Some(host_ref) = &spec.host_affinity {
            builder = builder.placement_hosts(vec![HostRef { id: host_ref.clone() }]);
        }

        builder.build()
    }
}

#[async_trait]
impl BackendStrategy for ProxyStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Proxy
    }

    #[instrument(skip(self, payload), fields(kind = %payload.kind(), files = payload.files().len()))]
    async fn attach_boot_payload(&self, payload: &ConfigurationPayload) -> Result<()> {
        let snapshot = self
            .service
            .get()
            .await
            .map_err(|e| ProvisionError::backend("get", e))?;

        let files = payload
            .files()
            .iter()
            .map(|f| File {
                name: f.name.clone(),
                content: f.content.clone(),
            })
            .collect();

        let replacement = VmBuilder::from_snapshot(snapshot)
            .payloads(vec![Payload {
                kind: payload.kind(),
                files,
            }])
            .build();

        self.submit("update", replacement).await?;

        info!("Floppy payload attached");
        Ok(())
    }

    #[instrument(skip(self, script), fields(script_len = script.len()))]
    async fn set_cloud_init_script(&self, script: &str) -> Result<()> {
        self.submit("update", Vm::builder().custom_script(script).build())
            .await?;

        info!("Cloud-init script set");
        Ok(())
    }

    #[instrument(skip(self, script), fields(script_len = script.len()))]
    async fn set_sysprep_script(&self, script: &str) -> Result<()> {
        self.submit("update", Vm::builder().custom_script(script).build())
            .await?;

        info!("Sysprep script set");
        Ok(())
    }

    #[instrument(skip(self, spec))]
    async fn set_hardware(&self, spec: &HardwareSpec) -> Result<()> {
        self.submit("update", Self::hardware_replacement(spec)).await?;

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
    use crate::backend::v4::{Cpu, CpuTopology, MemoryPolicy, VmPlacementPolicy};
    use crate::error::SdkError;
    use crate::mock::MockVmService;
    use crate::payload::PayloadKind;

    fn strategy(service: &MockVmService) -> ProxyStrategy {
        ProxyStrategy::new(ProxySession {
            service: Box::new(service.clone()),
            context: ProxyContext {
                api_version: "4.2.0".into(),
                endpoint: "https://engine.example.com/ovirt-engine/api".into(),
            },
        })
    }

    #[tokio::test]
    async fn test_attach_replaces_payload_list() {
        let service = MockVmService::new(Vm {
            id: Some("vm-1".into()),
            name: Some("web01".into()),
            ..Default::default()
        });
        let payload = ConfigurationPayload::floppy("user-data.txt", "#some_script").unwrap();

        strategy(&service).attach_boot_payload(&payload).await.unwrap();

        let updates = service.updates();
        assert_eq!(updates.len(), 1);
        let vm = &updates[0];
        assert_eq!(vm.name.as_deref(), Some("web01"));

        let payloads = vm.payloads.as_ref().unwrap();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].kind, PayloadKind::Floppy);
        assert_eq!(
            payloads[0].files,
            vec![File { name: "user-data.txt".into(), content: "#some_script".into() }]
        );
    }

    #[tokio::test]
    async fn test_sysprep_sends_only_initialization() {
        let service = MockVmService::new(Vm::default());

        strategy(&service).set_sysprep_script("#some_script").await.unwrap();

        assert_eq!(
            service.updates(),
            vec![Vm::builder().custom_script("#some_script").build()]
        );
        assert_eq!(service.get_count(), 0);
    }

    #[tokio::test]
    async fn test_hardware_replacement() {
        let service = MockVmService::new(Vm::default());
        let spec = HardwareSpec {
            description: Some("abc".into()),
            memory_bytes: Some(2_147_483_648),
            memory_reserve_bytes: Some(1_073_741_824),
            cpu_topology: crate::types::CpuTopology { cores: 4, sockets: 2 },
            host_affinity: Some("host-ref-1".into()),
        };

        strategy(&service).set_hardware(&spec).await.unwrap();

        let vm = service.updates().remove(0);
        assert_eq!(vm.description.as_deref(), Some("abc"));
        assert_eq!(vm.memory, Some(2_147_483_648));
        assert_eq!(vm.memory_policy, Some(MemoryPolicy { guaranteed: Some(1_073_741_824) }));
        assert_eq!(vm.cpu, Some(Cpu { topology: CpuTopology { cores: 4, sockets: 2 } }));
        assert_eq!(
            vm.placement_policy,
            Some(VmPlacementPolicy { hosts: vec![HostRef { id: "host-ref-1".into() }] })
        );
    }

    #[tokio::test]
    async fn test_hardware_replacement_omits_unset_fields() {
        let service = MockVmService::new(Vm::default());

        strategy(&service).set_hardware(&HardwareSpec::default()).await.unwrap();

        let vm = service.updates().remove(0);
        assert_eq!(vm.description, None);
        assert_eq!(
            serde_json::to_value(&vm).unwrap(),
            serde_json::json!({ "cpu": { "topology": { "cores": 1, "sockets": 1 } } })
        );
    }

    #[tokio::test]
    async fn test_get_failure_submits_nothing() {
        let service = MockVmService::new(Vm::default());
        service.fail_with(SdkError::Authorization("token expired".into()));
        let payload = ConfigurationPayload::floppy("user-data.txt", "x").unwrap();

        let err = strategy(&service).attach_boot_payload(&payload).await.unwrap_err();

        assert!(matches!(err, ProvisionError::BackendOperation { operation: "get", .. }));
        assert!(service.updates().is_empty());
    }
}
