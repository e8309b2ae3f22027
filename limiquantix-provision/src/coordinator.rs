//! Provisioning-phase configuration operations.
//!
//! Each operation opens a strategy for the task's destination VM, performs a
//! single configuration change and records phase-context flags for later
//! phases. The strategy, and with it the backend handle, is dropped before
//! the operation returns.

use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::backend::ProviderConnector;
use crate::collaborators::{HostRepository, ScriptRenderer, SubstitutionProvider, TemplateRepository};
use crate::config::ProvisionConfig;
use crate::error::{ProvisionError, Result};
use crate::payload::ConfigurationPayload;
use crate::selector::open_strategy;
use crate::strategy::BackendStrategy;
use crate::task::{ProvisionTask, BOOT_WITH_CLOUD_INIT, BOOT_WITH_SYSPREP, SYSPREP_UPLOAD_TEXT};
use crate::types::{CpuTopology, CustomizationTemplate, HardwareSpec};
use crate::units::{megabytes_to_bytes, version_at_least};

/// Runs the configuration operations of a provisioning task.
///
/// Calls for the same VM must not overlap: the v4 backend has no versioned
/// updates, so a later submit silently overwrites an earlier one.
pub struct ConfigurationCoordinator {
    templates: Arc<dyn TemplateRepository>,
    substitutions: Arc<dyn SubstitutionProvider>,
    renderer: Arc<dyn ScriptRenderer>,
    hosts: Arc<dyn HostRepository>,
    connector: Arc<dyn ProviderConnector>,
    config: ProvisionConfig,
}

impl ConfigurationCoordinator {
    pub fn new(
        templates: Arc<dyn TemplateRepository>,
        substitutions: Arc<dyn SubstitutionProvider>,
        renderer: Arc<dyn ScriptRenderer>,
        hosts: Arc<dyn HostRepository>,
        connector: Arc<dyn ProviderConnector>,
    ) -> Self {
        Self {
            templates,
            substitutions,
            renderer,
            hosts,
            connector,
            config: ProvisionConfig::default(),
        }
    }

    /// Use the given configuration instead of the defaults.
    pub fn with_config(mut self, config: ProvisionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ProvisionConfig {
        &self.config
    }

    /// Attach the rendered customization template as a floppy file.
    ///
    /// Does nothing when the task has no customization template.
    #[instrument(skip(self, task), fields(task_id = %task.id))]
    pub async fn attach_floppy_payload(&self, task: &mut ProvisionTask) -> Result<()> {
        let Some((template, script)) = self.rendered_template(task).await? else {
            debug!("No customization template, skipping floppy payload");
            return Ok(());
        };

        let payload = ConfigurationPayload::floppy(template.default_filename(), script)?;

        let strategy = self.open(task).await?;
        strategy.attach_boot_payload(&payload).await?;

        info!(template = %template.name, file = %template.default_filename(), "Attached floppy payload");
        Ok(())
    }

    /// Set the rendered customization template as the cloud-init script.
    ///
    /// Does nothing when the task has no customization template. On success,
    /// `boot_with_cloud_init` is set if the management system reports a
    /// version at or above the configured threshold.
    #[instrument(skip(self, task), fields(task_id = %task.id))]
    pub async fn configure_cloud_init(&self, task: &mut ProvisionTask) -> Result<()> {
        let Some((template, script)) = self.rendered_template(task).await? else {
            debug!("No customization template, skipping cloud-init");
            return Ok(());
        };

        let strategy = self.open(task).await?;
        strategy.set_cloud_init_script(&script).await?;

        let reported = &task.management_system.api_version;
        if version_at_least(reported, &self.config.cloud_init_version_threshold) {
            task.phase_context.set_flag(BOOT_WITH_CLOUD_INIT, true);
        }

        info!(
            template = %template.name,
            api_version = %reported,
            boot_with_cloud_init = task.phase_context.flag(BOOT_WITH_CLOUD_INIT).unwrap_or(false),
            "Configured cloud-init"
        );
        Ok(())
    }

    /// Set the uploaded sysprep text as the VM's sysprep script.
    ///
    /// Does nothing when no sysprep text was supplied. On success,
    /// `boot_with_sysprep` is always set.
    #[instrument(skip(self, task), fields(task_id = %task.id))]
    pub async fn configure_sysprep(&self, task: &mut ProvisionTask) -> Result<()> {
        let Some(script) = task.get_option_str(SYSPREP_UPLOAD_TEXT) else {
            debug!("No sysprep text, skipping sysprep");
            return Ok(());
        };

        let strategy = self.open(task).await?;
        strategy.set_sysprep_script(&script).await?;

        task.phase_context.set_flag(BOOT_WITH_SYSPREP, true);

        info!("Configured sysprep");
        Ok(())
    }

    /// Apply description, memory, CPU topology and host affinity.
    #[instrument(skip(self, task), fields(task_id = %task.id))]
    pub async fn configure_container(&self, task: &mut ProvisionTask) -> Result<()> {
        let spec = self.hardware_spec(task).await?;

        let strategy = self.open(task).await?;
        strategy.set_hardware(&spec).await?;

        info!(
            cores = spec.cpu_topology.cores,
            sockets = spec.cpu_topology.sockets,
            host_affinity = ?spec.host_affinity,
            "Configured container"
        );
        Ok(())
    }

    /// Build the hardware field set from the task options.
    async fn hardware_spec(&self, task: &ProvisionTask) -> Result<HardwareSpec> {
        let options = &task.options;

        let host_affinity = match options.dest_host {
            Some(host_id) => Some(self.hosts.find_host(host_id).await?.ems_ref),
            None => None,
        };

        let memory_bytes = options.vm_memory.map(megabytes_to_bytes).transpose()?;
        let memory_reserve_bytes = options.memory_reserve.map(megabytes_to_bytes).transpose()?;

        Ok(HardwareSpec {
            description: options.vm_description.clone(),
            memory_bytes,
            memory_reserve_bytes,
            cpu_topology: CpuTopology::from_options(options.cores_per_socket, options.number_of_sockets),
            host_affinity,
        })
    }

    /// Resolve and render the task's customization template, if it has one.
    async fn rendered_template(
        &self,
        task: &ProvisionTask,
    ) -> Result<Option<(CustomizationTemplate, String)>> {
        let Some(template_id) = task.options.customization_template_id else {
            return Ok(None);
        };

        let template = self.templates.resolve_template(template_id).await?;
        let values = self.substitutions.prepare_substitution_options(task).await?;
        let script = self.renderer.render(&template, &values);

        debug!(template_id, kind = ?template.kind, "Rendered customization template");
        Ok(Some((template, script)))
    }

    /// Open a strategy bound to the task's destination VM.
    async fn open(&self, task: &ProvisionTask) -> Result<Box<dyn BackendStrategy>> {
        let vm_ref = task.destination_vm_ref.as_deref().ok_or_else(|| {
            ProvisionError::NotFound(format!("destination VM for task {}", task.id))
        })?;

        open_strategy(self.connector.as_ref(), &task.management_system, vm_ref).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockConnector, MockHosts, MockSubstitutions, MockTemplates};
    use crate::collaborators::PlaceholderRenderer;
    use crate::types::ManagementSystem;

    fn coordinator(connector: &MockConnector) -> ConfigurationCoordinator {
        ConfigurationCoordinator::new(
            Arc::new(MockTemplates::new()),
            Arc::new(MockSubstitutions::default()),
            Arc::new(PlaceholderRenderer),
            Arc::new(MockHosts::new()),
            Arc::new(connector.clone()),
        )
    }

    #[tokio::test]
    async fn test_missing_destination_is_not_found() {
        let connector = MockConnector::new();
        let ems = ManagementSystem::new("rhevm", "3.5.5.0").with_supported_versions([3]);
        let mut task = ProvisionTask::new(ems);

        let err = coordinator(&connector).configure_container(&mut task).await.unwrap_err();
        assert!(matches!(err, ProvisionError::NotFound(_)));
        assert_eq!(connector.sessions_opened(), 0);
    }

    #[tokio::test]
    async fn test_hardware_spec_from_options() {
        let connector = MockConnector::new();
        let ems = ManagementSystem::new("rhevm", "3.5.5.0").with_supported_versions([3]);
        let mut task = ProvisionTask::new(ems);
        task.options.vm_memory = Some(512);
        task.options.cores_per_socket = Some(2);

        let spec = coordinator(&connector).hardware_spec(&task).await.unwrap();
        assert_eq!(spec.memory_bytes, Some(536_870_912));
        assert_eq!(spec.memory_reserve_bytes, None);
        assert_eq!(spec.cpu_topology, CpuTopology { cores: 2, sockets: 1 });
        assert_eq!(spec.description, None);
    }
}
