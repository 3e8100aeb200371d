//! Work model generation for simulated service topologies.
//!
//! Given a service graph and a catalog of candidate internal functions, every service is assigned exactly one function,
//! drawn at random according to the functions' probabilities, and the resulting per-service descriptors are returned as
//! a [`WorkModel`]. Services whose name starts with the configured databases prefix draw from database functions, and
//! per-service overrides can force a sidecar or a specific function.
//!
//! This crate is purely computational: it takes already-parsed documents and an injected random source, and never
//! touches the filesystem.
#![deny(warnings)]
#![deny(missing_docs)]

use rand::RngCore;
use snafu::ResultExt as _;

pub mod assembler;
pub mod catalog;

mod errors;
pub use self::errors::{AssemblyError, ConfigurationError, WorkModelError};

pub mod model;
pub mod parameters;
pub mod selector;

use self::{
    assembler::ModelAssembler,
    catalog::Catalog,
    errors::{Assembly, Configuration},
    model::{ServiceGraph, WorkModel},
    parameters::ParameterDocument,
};

/// Generates the work model for the given service graph.
///
/// # Errors
///
/// If the parameters are invalid, or a service cannot be assembled, an error is returned.
pub fn generate_work_model<R>(
    parameters: &ParameterDocument, graph: &ServiceGraph, rng: R,
) -> Result<WorkModel, WorkModelError>
where
    R: RngCore,
{
    let settings = parameters.settings().context(Configuration)?;
    let catalog = Catalog::from_parameters(parameters, &settings.request_method).context(Configuration)?;

    ModelAssembler::new(&catalog, &settings)
        .assemble(graph, rng)
        .context(Assembly)
}
