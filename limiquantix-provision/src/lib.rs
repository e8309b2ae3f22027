//! # limiquantix Provision
//!
//! Provision-time configuration of a VM on a virtualization management
//! system that speaks one of two incompatible API generations.
//!
//! - **v3** exposes direct mutators on a live VM handle.
//! - **v4** exposes a per-VM service; changes are submitted as whole
//!   replacement values.
//!
//! A [`BackendStrategy`] hides the difference. [`select_strategy`] picks the
//! variant from the versions the management system supports, and the
//! [`ConfigurationCoordinator`] drives it for each provisioning phase.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │         ConfigurationCoordinator           │
//! │ (floppy, cloud-init, sysprep, container)   │
//! └─────────────────────┬──────────────────────┘
//!                       │ select_strategy / open_strategy
//!         ┌─────────────┴─────────────┐
//!         ▼                           ▼
//! ┌───────────────────┐     ┌───────────────────┐
//! │  LegacyStrategy   │     │   ProxyStrategy   │
//! │   (LegacyVm)      │     │   (VmService)     │
//! └───────────────────┘     └───────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use limiquantix_provision::{ConfigurationCoordinator, PlaceholderRenderer};
//!
//! let coordinator = ConfigurationCoordinator::new(
//!     templates, substitutions, Arc::new(PlaceholderRenderer), hosts, connector,
//! );
//!
//! coordinator.attach_floppy_payload(&mut task).await?;
//! coordinator.configure_container(&mut task).await?;
//! ```

pub mod backend;
pub mod collaborators;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod mock;
pub mod payload;
pub mod selector;
pub mod strategy;
pub mod task;
pub mod types;
pub mod units;

pub use backend::{LegacyVm, ProviderConnector, ProxyContext, ProxySession, VmService};
pub use collaborators::{
    HostRepository,
    PlaceholderRenderer,
    ScriptRenderer,
    SubstitutionProvider,
    TemplateRepository,
};
pub use config::ProvisionConfig;
pub use coordinator::ConfigurationCoordinator;
pub use error::{ProvisionError, Result, SdkError};
pub use payload::{ConfigurationPayload, PayloadFile, PayloadKind};
pub use selector::{open_strategy, select_strategy};
pub use strategy::{BackendStrategy, LegacyStrategy, ProxyStrategy, StrategyKind};
pub use task::{PhaseContext, ProvisionOptions, ProvisionTask};
pub use types::*;
pub use units::{megabytes_to_bytes, version_at_least};
