//! JSON directory repository.
//!
//! # Storage Format
//!
//! ```text
//! <root>/configurations/<id>.json   one MappingConfiguration per file
//! <root>/rules.json                 array of every ValidationRule
//! <root>/logs/<config id>.jsonl     one ExecutionLog per line, append-only
//! ```
//!
//! Identifiers are encoded into file names reversibly: ASCII letters, digits,
//! `-` and `_` are kept, every other byte becomes `~xx`.

use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use plansync_model::{
    ExecutionLog, MappingConfigId, MappingConfiguration, TenantId, ValidationRule,
};
use plansync_transform::FunctionRegistry;

use super::{
    ConfigurationSource, ConfigurationStore, ExecutionLogStore, RuleSource, RuleStore, check_rule,
    owned_configuration, prepare_save, touch,
};
use crate::error::StoreError;

const CONFIGURATIONS_DIR: &str = "configurations";
const LOGS_DIR: &str = "logs";
const RULES_FILE: &str = "rules.json";

/// File-system store rooted at one directory.
#[derive(Debug)]
pub struct JsonRepository {
    root: PathBuf,
    registry: FunctionRegistry,
    /// Serialises read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl JsonRepository {
    /// Open a repository, creating its directories if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        for dir in [root.join(CONFIGURATIONS_DIR), root.join(LOGS_DIR)] {
            fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
                path: dir.clone(),
                source,
            })?;
        }
        debug!(root = %root.display(), "opened JSON repository");
        Ok(Self {
            root,
            registry: FunctionRegistry::builtin(),
            write_lock: Mutex::new(()),
        })
    }

    #[must_use]
    pub fn with_registry(mut self, registry: FunctionRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn configuration_path(&self, id: &MappingConfigId) -> PathBuf {
        self.root
            .join(CONFIGURATIONS_DIR)
            .join(format!("{}.json", encode_file_name(id.as_str())))
    }

    fn log_path(&self, id: &MappingConfigId) -> PathBuf {
        self.root
            .join(LOGS_DIR)
            .join(format!("{}.jsonl", encode_file_name(id.as_str())))
    }

    fn rules_path(&self) -> PathBuf {
        self.root.join(RULES_FILE)
    }

    fn load_rules(&self) -> Result<Vec<ValidationRule>, StoreError> {
        Ok(read_json(&self.rules_path())?.unwrap_or_default())
    }

    fn write_configuration(&self, configuration: &MappingConfiguration) -> Result<(), StoreError> {
        write_json(&self.configuration_path(&configuration.id), configuration)
    }

    fn update(
        &self,
        id: &MappingConfigId,
        tenant_id: &TenantId,
        change: impl FnOnce(&mut MappingConfiguration),
    ) -> Result<MappingConfiguration, StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut configuration = owned_configuration(self.configuration(id)?, id, tenant_id)?;
        change(&mut configuration);
        touch(&mut configuration, Utc::now())?;
        self.write_configuration(&configuration)?;
        Ok(configuration)
    }
}

impl ConfigurationSource for JsonRepository {
    fn configuration(
        &self,
        id: &MappingConfigId,
    ) -> Result<Option<MappingConfiguration>, StoreError> {
        read_json(&self.configuration_path(id))
    }
}

impl ConfigurationStore for JsonRepository {
    fn save_configuration(
        &self,
        configuration: MappingConfiguration,
        expected_version: Option<u32>,
    ) -> Result<MappingConfiguration, StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;
        let existing = self.configuration(&configuration.id)?;
        let saved = prepare_save(
            existing.as_ref(),
            configuration,
            expected_version,
            &self.registry,
            Utc::now(),
        )?;
        self.write_configuration(&saved)?;
        debug!(
            mapping_config_id = %saved.id,
            version = saved.version,
            "saved mapping configuration"
        );
        Ok(saved)
    }

    fn list_configurations(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Vec<MappingConfiguration>, StoreError> {
        let dir = self.root.join(CONFIGURATIONS_DIR);
        let entries = fs::read_dir(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;

        let mut configurations = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|source| StoreError::Io {
                    path: dir.clone(),
                    source,
                })?
                .path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match read_json::<MappingConfiguration>(&path) {
                Ok(Some(configuration))
                    if &configuration.tenant_id == tenant_id && !configuration.is_deleted() =>
                {
                    configurations.push(configuration);
                }
                Ok(_) => {}
                Err(error) => warn!(%error, "skipping unreadable configuration file"),
            }
        }
        configurations.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(configurations)
    }

    fn set_active(
        &self,
        id: &MappingConfigId,
        tenant_id: &TenantId,
        active: bool,
    ) -> Result<MappingConfiguration, StoreError> {
        self.update(id, tenant_id, |configuration| configuration.active = active)
    }

    fn soft_delete_configuration(
        &self,
        id: &MappingConfigId,
        tenant_id: &TenantId,
    ) -> Result<MappingConfiguration, StoreError> {
        self.update(id, tenant_id, |configuration| {
            configuration.deleted_at = Some(Utc::now());
        })
    }
}

impl RuleSource for JsonRepository {
    fn rules_for_tenant(&self, tenant_id: &TenantId) -> Result<Vec<ValidationRule>, StoreError> {
        Ok(self
            .load_rules()?
            .into_iter()
            .filter(|rule| rule.scope.applies_to(tenant_id))
            .collect())
    }
}

impl RuleStore for JsonRepository {
    fn save_rule(&self, rule: ValidationRule) -> Result<(), StoreError> {
        check_rule(&rule)?;
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut rules = self.load_rules()?;
        match rules.iter_mut().find(|existing| existing.id == rule.id) {
            Some(existing) => *existing = rule,
            None => rules.push(rule),
        }
        write_json(&self.rules_path(), &rules)
    }
}

impl ExecutionLogStore for JsonRepository {
    fn append_log(&self, log: &ExecutionLog) -> Result<(), StoreError> {
        let path = self.log_path(&log.mapping_config_id);
        let mut line = serde_json::to_string(log).map_err(|source| StoreError::Serialize {
            what: format!("execution log {}", log.id),
            source,
        })?;
        line.push('\n');

        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;
        let io_error = |source| StoreError::Io {
            path: path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(io_error)?;
        file.write_all(line.as_bytes()).map_err(io_error)
    }

    fn logs_for_configuration(
        &self,
        id: &MappingConfigId,
    ) -> Result<Vec<ExecutionLog>, StoreError> {
        let path = self.log_path(id);
        let Some(contents) = read_optional(&path)? else {
            return Ok(Vec::new());
        };
        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line).map_err(|source| StoreError::Json {
                    path: path.clone(),
                    source,
                })
            })
            .collect()
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, StoreError> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(StoreError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let Some(contents) = read_optional(path)? else {
        return Ok(None);
    };
    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(value).map_err(|source| StoreError::Serialize {
        what: path.display().to_string(),
        source,
    })?;
    fs::write(path, json).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Encode an identifier as a file name.
fn encode_file_name(id: &str) -> String {
    let mut encoded = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            encoded.push(char::from(byte));
        } else {
            let _ = write!(encoded, "~{byte:02x}");
        }
    }
    encoded
}
