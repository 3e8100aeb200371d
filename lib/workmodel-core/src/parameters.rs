//! Work model parameters.
//!
//! The parameters document is a flat map of named entries, each shaped as `{"type": ..., "value": ...}`. Global settings
//! (`request_method`, `databases_prefix`, `override`) sit next to any number of function entries whose type is
//! `function`. Entries are decoded into typed values here, once, so the rest of the crate never inspects raw JSON.

use indexmap::IndexMap;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use snafu::{OptionExt as _, ResultExt as _};
use tracing::info;

use crate::errors::{ConfigurationError, InvalidFunction, InvalidProbability, InvalidSetting, MissingSetting};

/// Name of the setting holding the request method stamped on every descriptor.
pub const REQUEST_METHOD: &str = "request_method";

/// Name of the setting holding the prefix that marks database vertices.
pub const DATABASES_PREFIX: &str = "databases_prefix";

/// Name of the setting holding per-service overrides.
pub const OVERRIDE: &str = "override";

const FUNCTION_TYPE: &str = "function";

/// A single entry of the parameters document.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct ParameterEntry {
    /// Entry type, such as `function` or `string`.
    #[serde(rename = "type", default)]
    pub kind: String,

    /// Entry value, decoded lazily depending on the entry.
    #[serde(default)]
    pub value: Value,
}

impl ParameterEntry {
    /// Creates a new `ParameterEntry`.
    pub fn new<K: Into<String>>(kind: K, value: Value) -> Self {
        Self {
            kind: kind.into(),
            value,
        }
    }

    /// Returns `true` if this entry describes a candidate internal function.
    pub fn is_function(&self) -> bool {
        self.kind == FUNCTION_TYPE
    }

    /// Returns the recipient named by this entry's value, if it is one we recognize.
    ///
    /// Only the `recipient` field is read, so an entry meant for neither pool can be skipped without decoding the rest.
    pub fn recipient(&self) -> Option<Recipient> {
        self.value.get("recipient").and_then(Value::as_str).and_then(Recipient::from_name)
    }
}

/// The parameters document, with entries kept in document order.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ParameterDocument {
    entries: IndexMap<String, ParameterEntry>,
}

impl ParameterDocument {
    /// Creates a new `ParameterDocument` from the given entries.
    pub fn from_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, ParameterEntry)>,
        K: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Returns the entry with the given name, if any.
    pub fn get(&self, name: &str) -> Option<&ParameterEntry> {
        self.entries.get(name)
    }

    /// Decodes the value of the entry with the given name.
    ///
    /// Returns `Ok(None)` if no such entry exists.
    ///
    /// # Errors
    ///
    /// If the entry exists but its value cannot be decoded as `T`, an error is returned.
    pub fn value_of<T>(&self, name: &str) -> Result<Option<T>, ConfigurationError>
    where
        T: DeserializeOwned,
    {
        self.entries
            .get(name)
            .map(|entry| T::deserialize(&entry.value).context(InvalidSetting { setting: name }))
            .transpose()
    }

    /// Returns an iterator over all function entries, in document order.
    pub fn functions(&self) -> impl Iterator<Item = (&str, &ParameterEntry)> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.is_function())
            .map(|(id, entry)| (id.as_str(), entry))
    }

    /// Decodes the global settings.
    ///
    /// # Errors
    ///
    /// If `request_method` or `databases_prefix` are missing, or any of the global settings cannot be decoded, an
    /// error is returned.
    pub fn settings(&self) -> Result<Settings, ConfigurationError> {
        let overrides = self.value_of::<Overrides>(OVERRIDE)?.unwrap_or_default();
        let request_method = self
            .value_of::<String>(REQUEST_METHOD)?
            .context(MissingSetting { setting: REQUEST_METHOD })?;
        let databases_prefix = self
            .value_of::<String>(DATABASES_PREFIX)?
            .context(MissingSetting {
                setting: DATABASES_PREFIX,
            })?;

        let settings = Settings {
            request_method,
            databases_prefix,
            overrides,
        };
        settings.log_summary();

        Ok(settings)
    }
}

/// Per-service override.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Override {
    /// Sidecar to attach to the service, passed through untouched.
    #[serde(default)]
    pub sidecar: Option<Value>,

    /// Service function to force, bypassing weighted selection.
    #[serde(default)]
    pub function_id: Option<String>,
}

/// Overrides, keyed by service name.
pub type Overrides = IndexMap<String, Override>;

/// Global work model settings.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    /// Request method stamped on every chosen function.
    pub request_method: String,

    /// Services whose name starts with this prefix draw from the database pool.
    pub databases_prefix: String,

    /// Per-service overrides.
    pub overrides: Overrides,
}

impl Settings {
    /// Returns `true` if the given service is a database.
    pub fn is_database(&self, service: &str) -> bool {
        service.starts_with(&self.databases_prefix)
    }

    fn log_summary(&self) {
        info!(
            request_method = %self.request_method,
            databases_prefix = %self.databases_prefix,
            "Loaded work model settings."
        );
        for (service, over) in &self.overrides {
            info!(
                service = service.as_str(),
                sidecar = ?over.sidecar,
                function_id = over.function_id.as_deref(),
                "Loaded override."
            );
        }
    }
}

/// Which kind of vertex a function is meant for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Recipient {
    /// Plain services.
    Service,

    /// Database services.
    Database,
}

impl Recipient {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "service" => Some(Self::Service),
            "database" => Some(Self::Database),
            _ => None,
        }
    }
}

/// Optional runtime attributes of a function.
///
/// Only the attributes present in the parameters are ever emitted.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct RuntimeAttributes {
    /// Number of worker processes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<u32>,

    /// Number of threads per worker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<u32>,

    /// Number of replicas.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<u32>,

    /// CPU limit, in Kubernetes quantity notation.
    #[serde(rename = "cpu-limits", default, skip_serializing_if = "Option::is_none")]
    pub cpu_limits: Option<String>,

    /// CPU request, in Kubernetes quantity notation.
    #[serde(rename = "cpu-requests", default, skip_serializing_if = "Option::is_none")]
    pub cpu_requests: Option<String>,

    /// Memory limit, in Kubernetes quantity notation.
    #[serde(rename = "memory-limits", default, skip_serializing_if = "Option::is_none")]
    pub memory_limits: Option<String>,

    /// Memory request, in Kubernetes quantity notation.
    #[serde(rename = "memory-requests", default, skip_serializing_if = "Option::is_none")]
    pub memory_requests: Option<String>,
}

/// A candidate internal function.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct FunctionSpec {
    /// Function name, as understood by the simulator.
    pub name: String,

    /// Function parameters, passed through untouched.
    pub parameters: Value,

    /// Relative selection weight.
    pub probability: f64,

    /// Optional runtime attributes.
    #[serde(flatten)]
    pub runtime: RuntimeAttributes,
}

impl FunctionSpec {
    /// Decodes and validates the function entry with the given identifier.
    ///
    /// # Errors
    ///
    /// If the entry cannot be decoded, or its probability is negative or not finite, an error is returned.
    pub fn from_entry(function_id: &str, entry: &ParameterEntry) -> Result<Self, ConfigurationError> {
        let spec = Self::deserialize(&entry.value).context(InvalidFunction { function_id })?;
        if !spec.probability.is_finite() || spec.probability < 0.0 {
            return InvalidProbability {
                function_id,
                probability: spec.probability,
            }
            .fail();
        }

        Ok(spec)
    }
}
