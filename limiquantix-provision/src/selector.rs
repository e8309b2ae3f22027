//! Strategy selection from management system capabilities.

use tracing::{debug, instrument};

use crate::backend::ProviderConnector;
use crate::error::{ProvisionError, Result};
use crate::strategy::{BackendStrategy, LegacyStrategy, ProxyStrategy, StrategyKind};
use crate::types::ManagementSystem;

/// Pick the strategy for the highest API generation the system supports.
///
/// v4 wins over v3; a system supporting neither is rejected.
pub fn select_strategy(ems: &ManagementSystem) -> Result<StrategyKind> {
    if ems.supports_api(StrategyKind::Proxy.api_major()) {
        Ok(StrategyKind::Proxy)
    } else if ems.supports_api(StrategyKind::Legacy.api_major()) {
        Ok(StrategyKind::Legacy)
    } else {
        Err(ProvisionError::UnsupportedBackend(format!(
            "{} supports API versions {:?}, need 3 or 4",
            ems.name, ems.supported_api_versions
        )))
    }
}

/// Select a strategy and bind it to a freshly opened handle for `vm_ref`.
///
/// The handle lives exactly as long as the returned strategy.
#[instrument(skip(connector, ems), fields(ems = %ems.name))]
pub async fn open_strategy(
    connector: &dyn ProviderConnector,
    ems: &ManagementSystem,
    vm_ref: &str,
) -> Result<Box<dyn BackendStrategy>> {
    let kind = select_strategy(ems)?;
    debug!(strategy = %kind, "Selected backend strategy");

    let strategy: Box<dyn BackendStrategy> = match kind {
        StrategyKind::Legacy => {
            Box::new(LegacyStrategy::new(connector.connect_legacy(ems, vm_ref).await?))
        }
        StrategyKind::Proxy => {
            Box::new(ProxyStrategy::new(connector.connect_proxy(ems, vm_ref).await?))
        }
    };

    Ok(strategy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockConnector;

    fn ems(versions: &[u32]) -> ManagementSystem {
        ManagementSystem::new("rhevm", "4.1.0").with_supported_versions(versions.iter().copied())
    }

    #[test]
    fn test_selection_policy() {
        assert_eq!(select_strategy(&ems(&[3])).unwrap(), StrategyKind::Legacy);
        assert_eq!(select_strategy(&ems(&[3, 4])).unwrap(), StrategyKind::Proxy);
        assert_eq!(select_strategy(&ems(&[4])).unwrap(), StrategyKind::Proxy);
    }

    #[test]
    fn test_no_supported_version() {
        assert!(matches!(
            select_strategy(&ems(&[])),
            Err(ProvisionError::UnsupportedBackend(_))
        ));
        assert!(matches!(
            select_strategy(&ems(&[2, 5])),
            Err(ProvisionError::UnsupportedBackend(_))
        ));
    }

    #[tokio::test]
    async fn test_open_binds_matching_handle() {
        let connector = MockConnector::new();

        let strategy = open_strategy(&connector, &ems(&[3]), "vm-1").await.unwrap();
        assert_eq!(strategy.kind(), StrategyKind::Legacy);

        let strategy = open_strategy(&connector, &ems(&[3, 4]), "vm-1").await.unwrap();
        assert_eq!(strategy.kind(), StrategyKind::Proxy);

        assert_eq!(connector.sessions_opened(), 2);
    }
}
