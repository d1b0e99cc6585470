//! Batch orchestration for plansync.
//!
//! [`MappingEngine`] ties together the configuration and rule stores, the
//! per-record transformation pipeline and the validation rule evaluator.
//! Store backends live in [`store`]: an [`InMemoryStore`] and a
//! [`JsonRepository`] rooted at a directory.
//!
//! # Example
//!
//! ```
//! use plansync_core::{ApplyOptions, InMemoryStore, MappingEngine};
//! use plansync_core::store::ConfigurationStore;
//! use plansync_model::{
//!     FieldMapping, MappingConfigId, MappingConfiguration, MappingRules, MappingType, Record,
//!     TenantId,
//! };
//!
//! let tenant = TenantId::new("acme").unwrap();
//! let id = MappingConfigId::new("payroll-to-rk").unwrap();
//! let rules = MappingRules {
//!     field_mappings: vec![FieldMapping::new("grossPay", "employeePreTax")],
//!     ..MappingRules::default()
//! };
//! let configuration = MappingConfiguration::new(
//!     id.clone(),
//!     tenant.clone(),
//!     MappingType::Contribution,
//!     "payroll",
//!     "recordkeeper",
//! )
//! .with_rules(rules);
//!
//! let store = InMemoryStore::new();
//! store.save_configuration(configuration, None).unwrap();
//!
//! let engine = MappingEngine::new(store);
//! let records = vec![Record::new().with("grossPay", 500_000)];
//! let result = engine
//!     .apply(&id, &records, &tenant, &ApplyOptions::dry_run())
//!     .unwrap();
//! assert!(result.success);
//! ```

pub mod engine;
pub mod error;
pub mod options;
pub mod recorder;
pub mod store;

pub use engine::MappingEngine;
pub use error::{EngineError, StoreError};
pub use options::{ApplyOptions, DEFAULT_ERROR_SAMPLE_SIZE, EngineOptions};
pub use recorder::{BatchRun, ExecutionLogRecorder};
pub use store::{
    ConfigurationSource, ConfigurationStore, ExecutionLogStore, InMemoryStore, JsonRepository,
    RuleSource, RuleStore,
};
