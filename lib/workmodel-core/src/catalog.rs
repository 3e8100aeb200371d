//! Function catalog.

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::{
    errors::ConfigurationError,
    model::Fragment,
    parameters::{FunctionSpec, ParameterDocument, Recipient},
};

/// A candidate function within a pool.
#[derive(Clone, Debug, PartialEq)]
pub struct PoolEntry {
    /// Fields merged into a descriptor when this function is chosen.
    pub fragment: Fragment,

    /// Relative selection weight.
    pub probability: f64,
}

/// Candidate functions for one kind of service, in insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Pool {
    entries: IndexMap<String, PoolEntry>,
}

impl Pool {
    /// Adds a function to the pool, replacing any previous function with the same identifier.
    pub fn insert<K: Into<String>>(&mut self, function_id: K, fragment: Fragment, probability: f64) {
        self.entries
            .insert(function_id.into(), PoolEntry { fragment, probability });
    }

    /// Returns the number of functions in the pool.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the pool holds no functions.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the function with the given identifier, if any.
    pub fn get(&self, function_id: &str) -> Option<&PoolEntry> {
        self.entries.get(function_id)
    }

    /// Returns the fragment of the function with the given identifier, if any.
    pub fn fragment(&self, function_id: &str) -> Option<&Fragment> {
        self.get(function_id).map(|entry| &entry.fragment)
    }

    /// Returns an iterator over function identifiers and their probabilities, in insertion order.
    pub fn probabilities(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.entries.iter().map(|(id, entry)| (id.as_str(), entry.probability))
    }

    /// Returns an iterator over the function identifiers, in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// Function catalog, split by recipient.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Catalog {
    services: Pool,
    databases: Pool,
}

impl Catalog {
    /// Indexes every function entry of the parameters document.
    ///
    /// Functions whose recipient is neither `service` nor `database` are left out of both pools without being decoded
    /// any further. When no function targets databases, the database pool becomes a copy of the service pool.
    ///
    /// # Errors
    ///
    /// If a function entry with a recognized recipient cannot be decoded, or declares an invalid probability, an error
    /// is returned.
    pub fn from_parameters(parameters: &ParameterDocument, request_method: &str) -> Result<Self, ConfigurationError> {
        let mut services = Pool::default();
        let mut databases = Pool::default();

        for (function_id, entry) in parameters.functions() {
            let Some(recipient) = entry.recipient() else {
                debug!(
                    function_id,
                    recipient = ?entry.value.get("recipient"),
                    "Function has no usable recipient. Skipping."
                );
                continue;
            };

            let spec = FunctionSpec::from_entry(function_id, entry)?;
            let fragment = Fragment::from_spec(request_method, &spec);
            match recipient {
                Recipient::Service => services.insert(function_id, fragment, spec.probability),
                Recipient::Database => databases.insert(function_id, fragment, spec.probability),
            }

            debug!(function_id, function = %spec.name, probability = spec.probability, "Indexed function.");
        }

        Ok(Self::from_pools(services, databases))
    }

    /// Creates a catalog from already-built pools, applying the database fallback if needed.
    pub fn from_pools(services: Pool, databases: Pool) -> Self {
        let databases = if databases.is_empty() {
            info!("No database functions specified. Falling back to service functions for databases.");
            services.clone()
        } else {
            databases
        };

        info!(
            service_functions = services.len(),
            database_functions = databases.len(),
            "Indexed function catalog."
        );

        Self { services, databases }
    }

    /// Returns the pool used for plain services.
    pub fn service_pool(&self) -> &Pool {
        &self.services
    }

    /// Returns the pool used for databases.
    pub fn database_pool(&self) -> &Pool {
        &self.databases
    }

    /// Returns the pool for the given recipient.
    pub fn pool_for(&self, recipient: Recipient) -> &Pool {
        match recipient {
            Recipient::Service => &self.services,
            Recipient::Database => &self.databases,
        }
    }
}
