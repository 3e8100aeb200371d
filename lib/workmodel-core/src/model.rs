//! Service graph input and work model output.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::parameters::{FunctionSpec, RuntimeAttributes};

/// A vertex of the service graph.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ServiceNode {
    /// Outbound call edges, passed through untouched.
    ///
    /// Numbers survive exactly as long as they fit in an `i64`, a `u64`, or an `f64`. Integers beyond the 64-bit range
    /// are read as floating-point values.
    pub external_services: Vec<Value>,
}

/// Simulated service topology, with services kept in document order.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ServiceGraph {
    services: IndexMap<String, ServiceNode>,
}

impl ServiceGraph {
    /// Creates a new `ServiceGraph` from the given services.
    pub fn from_services<I, K>(services: I) -> Self
    where
        I: IntoIterator<Item = (K, ServiceNode)>,
        K: Into<String>,
    {
        Self {
            services: services.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Returns the number of services in the graph.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns `true` if the graph has no services.
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Returns the service with the given name, if any.
    pub fn get(&self, name: &str) -> Option<&ServiceNode> {
        self.services.get(name)
    }

    /// Returns an iterator over all services, in graph order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ServiceNode)> {
        self.services.iter().map(|(name, node)| (name.as_str(), node))
    }
}

/// Output fields contributed by a chosen function.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Fragment {
    /// Single-entry map of function name to its parameters.
    pub internal_service: IndexMap<String, Value>,

    /// Request method used to call the service.
    pub request_method: String,

    /// Runtime attributes, limited to those the function declared.
    #[serde(flatten)]
    pub runtime: RuntimeAttributes,
}

impl Fragment {
    /// Builds the fragment for the given function.
    pub fn from_spec(request_method: &str, spec: &FunctionSpec) -> Self {
        let mut internal_service = IndexMap::with_capacity(1);
        internal_service.insert(spec.name.clone(), spec.parameters.clone());

        Self {
            internal_service,
            request_method: request_method.to_string(),
            runtime: spec.runtime.clone(),
        }
    }

    /// Returns the name of the function this fragment was built from.
    pub fn function_name(&self) -> Option<&str> {
        self.internal_service.keys().next().map(String::as_str)
    }
}

/// Finished descriptor of a single service.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ServiceDescriptor {
    /// Outbound call edges, copied verbatim from the service graph.
    pub external_services: Vec<Value>,

    /// Chosen function, or `None` if selection missed.
    #[serde(flatten)]
    pub fragment: Option<Fragment>,

    /// Sidecar attached by an override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sidecar: Option<Value>,
}

impl ServiceDescriptor {
    pub(crate) fn new(node: &ServiceNode) -> Self {
        Self {
            external_services: node.external_services.clone(),
            fragment: None,
            sidecar: None,
        }
    }

    /// Returns `true` if a function was assigned to this service.
    pub fn is_assigned(&self) -> bool {
        self.fragment.is_some()
    }
}

/// Per-service descriptors handed to the simulator.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct WorkModel {
    services: IndexMap<String, ServiceDescriptor>,
}

impl WorkModel {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            services: IndexMap::with_capacity(capacity),
        }
    }

    pub(crate) fn insert(&mut self, name: &str, descriptor: ServiceDescriptor) {
        self.services.insert(name.to_string(), descriptor);
    }

    /// Returns the number of services in the work model.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns `true` if the work model has no services.
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Returns the descriptor of the given service, if any.
    pub fn get(&self, name: &str) -> Option<&ServiceDescriptor> {
        self.services.get(name)
    }

    /// Returns an iterator over all descriptors, in service graph order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ServiceDescriptor)> {
        self.services.iter().map(|(name, desc)| (name.as_str(), desc))
    }

    /// Returns an iterator over the services that ended up without a function.
    pub fn unassigned(&self) -> impl Iterator<Item = &str> {
        self.iter().filter(|(_, desc)| !desc.is_assigned()).map(|(name, _)| name)
    }
}
