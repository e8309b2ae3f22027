//! In-memory backends and collaborators for testing and development.
//!
//! The mocks record every backend call so tests can assert on exactly what
//! would have reached the management system. Clones share state, so a test
//! can keep one copy while handing another to the code under test.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info};

use crate::backend::v4::Vm;
use crate::backend::{LegacyVm, ProviderConnector, ProxyContext, ProxySession, VmService};
use crate::collaborators::{HostRepository, SubstitutionProvider, TemplateRepository};
use crate::error::{ProvisionError, Result, SdkError};
use crate::task::ProvisionTask;
use crate::types::{CpuTopology, CustomizationTemplate, Host, ManagementSystem};

/// Marks a handle as holding a backend session; counts the release on drop.
struct SessionGuard {
    released: Arc<AtomicUsize>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
        debug!("Mock session released");
    }
}

// =============================================================================
// V3
// =============================================================================

/// A call received by [`MockLegacyVm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegacyCall {
    AttachFloppy(HashMap<String, String>),
    CloudInit(String),
    Description(Option<String>),
    Memory(u64),
    MemoryReserve(u64),
    CpuTopology(CpuTopology),
    HostAffinity(String),
}

#[derive(Default)]
struct LegacyState {
    calls: Vec<LegacyCall>,
    failure: Option<SdkError>,
}

/// Mock v3 VM handle.
pub struct MockLegacyVm {
    vm_ref: String,
    state: Arc<Mutex<LegacyState>>,
    _session: Option<SessionGuard>,
}

impl Clone for MockLegacyVm {
    /// Clones share recorded calls but never the session.
    fn clone(&self) -> Self {
        Self {
            vm_ref: self.vm_ref.clone(),
            state: Arc::clone(&self.state),
            _session: None,
        }
    }
}

impl MockLegacyVm {
    pub fn new(vm_ref: impl Into<String>) -> Self {
        Self {
            vm_ref: vm_ref.into(),
            state: Arc::new(Mutex::new(LegacyState::default())),
            _session: None,
        }
    }

    fn with_session(mut self, released: Arc<AtomicUsize>) -> Self {
        self._session = Some(SessionGuard { released });
        self
    }

    /// Make every following call fail with `error`.
    pub fn fail_with(&self, error: SdkError) {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).failure = Some(error);
    }

    /// Calls received so far, in order.
    pub fn calls(&self) -> Vec<LegacyCall> {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).calls.clone()
    }

    fn record(&self, call: LegacyCall) -> std::result::Result<(), SdkError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(error) = &state.failure {
            return Err(error.clone());
        }
        debug!(vm_ref = %self.vm_ref, call = ?call, "Mock v3 call");
        state.calls.push(call);
        Ok(())
    }
}

#[async_trait]
impl LegacyVm for MockLegacyVm {
    fn vm_ref(&self) -> &str {
        &self.vm_ref
    }

    async fn attach_floppy(&self, files: HashMap<String, String>) -> std::result::Result<(), SdkError> {
        self.record(LegacyCall::AttachFloppy(files))
    }

    async fn set_cloud_init(&self, script: &str) -> std::result::Result<(), SdkError> {
        self.record(LegacyCall::CloudInit(script.to_string()))
    }

    async fn set_description(&self, description: Option<&str>) -> std::result::Result<(), SdkError> {
        self.record(LegacyCall::Description(description.map(str::to_string)))
    }

    async fn set_memory(&self, bytes: u64) -> std::result::Result<(), SdkError> {
        self.record(LegacyCall::Memory(bytes))
    }

    async fn set_memory_reserve(&self, bytes: u64) -> std::result::Result<(), SdkError> {
        self.record(LegacyCall::MemoryReserve(bytes))
    }

    async fn set_cpu_topology(&self, topology: CpuTopology) -> std::result::Result<(), SdkError> {
        self.record(LegacyCall::CpuTopology(topology))
    }

    async fn set_host_affinity(&self, host_ref: &str) -> std::result::Result<(), SdkError> {
        self.record(LegacyCall::HostAffinity(host_ref.to_string()))
    }
}

// =============================================================================
// V4
// =============================================================================

#[derive(Default)]
struct ServiceState {
    snapshot: Vm,
    updates: Vec<Vm>,
    gets: usize,
    failure: Option<SdkError>,
}

/// Mock v4 VM service.
pub struct MockVmService {
    state: Arc<Mutex<ServiceState>>,
    _session: Option<SessionGuard>,
}

impl Clone for MockVmService {
    /// Clones share recorded calls but never the session.
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            _session: None,
        }
    }
}

impl MockVmService {
    /// Create a service whose `get` returns `snapshot`.
    pub fn new(snapshot: Vm) -> Self {
        Self {
            state: Arc::new(Mutex::new(ServiceState {
                snapshot,
                ..Default::default()
            })),
            _session: None,
        }
    }

    fn with_session(mut self, released: Arc<AtomicUsize>) -> Self {
        self._session = Some(SessionGuard { released });
        self
    }

    /// Make every following call fail with `error`.
    pub fn fail_with(&self, error: SdkError) {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).failure = Some(error);
    }

    /// Replacement values submitted so far, in order.
    pub fn updates(&self) -> Vec<Vm> {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).updates.clone()
    }

    /// Number of `get` calls served.
    pub fn get_count(&self) -> usize {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).gets
    }
}

#[async_trait]
impl VmService for MockVmService {
    async fn get(&self) -> std::result::Result<Vm, SdkError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(error) = &state.failure {
            return Err(error.clone());
        }
        state.gets += 1;
        Ok(state.snapshot.clone())
    }

    async fn update(&self, vm: Vm) -> std::result::Result<(), SdkError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(error) = &state.failure {
            return Err(error.clone());
        }
        debug!(vm = ?vm, "Mock v4 update");
        state.updates.push(vm);
        Ok(())
    }
}

// =============================================================================
// CONNECTOR
// =============================================================================

struct ConnectorState {
    legacy_vm: MockLegacyVm,
    service: MockVmService,
    opened: AtomicUsize,
    released: Arc<AtomicUsize>,
    refuse: RwLock<Option<SdkError>>,
}

/// Mock connector handing out the same mock VM for every reference.
#[derive(Clone)]
pub struct MockConnector {
    inner: Arc<ConnectorState>,
}

impl MockConnector {
    /// Create a connector backed by a fresh v3 VM and v4 service.
    pub fn new() -> Self {
        info!("Creating mock provider connector");
        Self {
            inner: Arc::new(ConnectorState {
                legacy_vm: MockLegacyVm::new("mock-vm"),
                service: MockVmService::new(Vm::default()),
                opened: AtomicUsize::new(0),
                released: Arc::new(AtomicUsize::new(0)),
                refuse: RwLock::new(None),
            }),
        }
    }

    /// The v3 VM handed out by `connect_legacy`.
    pub fn legacy_vm(&self) -> MockLegacyVm {
        self.inner.legacy_vm.clone()
    }

    /// The v4 service handed out by `connect_proxy`.
    pub fn service(&self) -> MockVmService {
        self.inner.service.clone()
    }

    /// Refuse every following connection with `error`.
    pub fn refuse_with(&self, error: SdkError) {
        *self.inner.refuse.write().unwrap_or_else(|e| e.into_inner()) = Some(error);
    }

    pub fn sessions_opened(&self) -> usize {
        self.inner.opened.load(Ordering::SeqCst)
    }

    pub fn sessions_released(&self) -> usize {
        self.inner.released.load(Ordering::SeqCst)
    }

    fn check_refused(&self) -> Result<()> {
        match self.inner.refuse.read().unwrap_or_else(|e| e.into_inner()).as_ref() {
            Some(error) => Err(ProvisionError::backend("connect", error.clone())),
            None => Ok(()),
        }
    }
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderConnector for MockConnector {
    async fn connect_legacy(
        &self,
        ems: &ManagementSystem,
        vm_ref: &str,
    ) -> Result<Box<dyn LegacyVm>> {
        self.check_refused()?;
        self.inner.opened.fetch_add(1, Ordering::SeqCst);
        debug!(ems = %ems.name, vm_ref = %vm_ref, "Opened mock v3 session");

        let vm = MockLegacyVm {
            vm_ref: vm_ref.to_string(),
            ..self.inner.legacy_vm.clone()
        };
        Ok(Box::new(vm.with_session(Arc::clone(&self.inner.released))))
    }

    async fn connect_proxy(
        &self,
        ems: &ManagementSystem,
        vm_ref: &str,
    ) -> Result<ProxySession> {
        self.check_refused()?;
        self.inner.opened.fetch_add(1, Ordering::SeqCst);
        debug!(ems = %ems.name, vm_ref = %vm_ref, "Opened mock v4 session");

        let service = self.inner.service.clone().with_session(Arc::clone(&self.inner.released));
        Ok(ProxySession {
            service: Box::new(service),
            context: ProxyContext {
                api_version: ems.api_version.clone(),
                endpoint: ems.hostname.clone(),
            },
        })
    }
}

// =============================================================================
// COLLABORATORS
// =============================================================================

/// In-memory template store.
#[derive(Default)]
pub struct MockTemplates {
    templates: RwLock<HashMap<u64, CustomizationTemplate>>,
}

impl MockTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(self, template: CustomizationTemplate) -> Self {
        self.templates
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(template.id, template);
        self
    }
}

#[async_trait]
impl TemplateRepository for MockTemplates {
    async fn resolve_template(&self, template_id: u64) -> Result<CustomizationTemplate> {
        self.templates
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&template_id)
            .cloned()
            .ok_or_else(|| ProvisionError::NotFound(format!("customization template {}", template_id)))
    }
}

/// Fixed substitution values; counts how often they were requested.
#[derive(Default)]
pub struct MockSubstitutions {
    values: HashMap<String, String>,
    requests: AtomicUsize,
}

impl MockSubstitutions {
    pub fn new(values: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            values: values.into_iter().collect(),
            requests: AtomicUsize::new(0),
        }
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubstitutionProvider for MockSubstitutions {
    async fn prepare_substitution_options(
        &self,
        task: &ProvisionTask,
    ) -> Result<HashMap<String, String>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        debug!(task_id = %task.id, "Preparing mock substitution values");
        Ok(self.values.clone())
    }
}

/// In-memory host inventory.
#[derive(Default)]
pub struct MockHosts {
    hosts: RwLock<HashMap<u64, Host>>,
}

impl MockHosts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(self, host: Host) -> Self {
        self.hosts
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(host.id, host);
        self
    }
}

#[async_trait]
impl HostRepository for MockHosts {
    async fn find_host(&self, host_id: u64) -> Result<Host> {
        self.hosts
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&host_id)
            .cloned()
            .ok_or_else(|| ProvisionError::NotFound(format!("host {}", host_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sessions_released_on_drop() {
        let connector = MockConnector::new();
        let ems = ManagementSystem::new("rhevm", "4.1.0").with_supported_versions([4]);

        let session = connector.connect_proxy(&ems, "vm-1").await.unwrap();
        assert_eq!(connector.sessions_opened(), 1);
        assert_eq!(connector.sessions_released(), 0);

        drop(session);
        assert_eq!(connector.sessions_released(), 1);

        // Clones held by the test never count as sessions
        drop(connector.service());
        assert_eq!(connector.sessions_released(), 1);
    }

    #[tokio::test]
    async fn test_legacy_handle_shares_calls() {
        let connector = MockConnector::new();
        let ems = ManagementSystem::new("rhevm", "3.5.0.0").with_supported_versions([3]);

        let vm = connector.connect_legacy(&ems, "vm-7").await.unwrap();
        assert_eq!(vm.vm_ref(), "vm-7");
        vm.set_memory(1024).await.unwrap();

        assert_eq!(connector.legacy_vm().calls(), vec![LegacyCall::Memory(1024)]);
    }

    #[tokio::test]
    async fn test_refused_connection() {
        let connector = MockConnector::new();
        connector.refuse_with(SdkError::Connection("engine down".into()));
        let ems = ManagementSystem::new("rhevm", "3.5.0.0").with_supported_versions([3]);

        assert!(connector.connect_legacy(&ems, "vm-1").await.is_err());
        assert_eq!(connector.sessions_opened(), 0);
    }

    #[tokio::test]
    async fn test_missing_template_and_host() {
        assert!(matches!(
            MockTemplates::new().resolve_template(9).await,
            Err(ProvisionError::NotFound(_))
        ));
        assert!(matches!(
            MockHosts::new().find_host(9).await,
            Err(ProvisionError::NotFound(_))
        ));
    }
}
