use rand::{rngs::StdRng, SeedableRng as _};
use tracing::{debug, info, warn};
use workmodel_core::{generate_work_model, model::WorkModel};
use workmodel_error::{generic_error, ErrorContext as _, FileAction, GenericError};

use crate::{cli::Cli, config::Config};

/// Work model driver.
///
/// Takes the parsed command line and configuration, generates the work model, and writes it out.
pub struct Driver {
    config: Config,
    seed: Option<u64>,
    deny_unassigned: bool,
}

impl Driver {
    /// Creates a new `Driver` from the given command line.
    ///
    /// # Errors
    ///
    /// If the parameters file cannot be loaded, an error will be returned.
    pub fn from_cli(cli: Cli) -> Result<Self, GenericError> {
        let config = Config::try_from_file(&cli.parameters_file).error_context("Failed to load configuration.")?;

        Ok(Self {
            config,
            seed: cli.seed,
            deny_unassigned: cli.deny_unassigned,
        })
    }

    /// Runs the driver, writing the generated work model to the configured output path.
    ///
    /// # Errors
    ///
    /// If the service graph cannot be loaded, the work model cannot be generated, or it cannot be written, an error will
    /// be returned.
    pub fn run(self) -> Result<(), GenericError> {
        let location = &self.config.location;
        location.ensure_output_dir()?;

        let graph = location.load_service_graph()?;
        info!(
            path = %location.service_graph_path.display(),
            services = graph.len(),
            "Loaded service graph."
        );

        let mut rng = match self.seed {
            Some(seed) => {
                info!(seed, "Using fixed seed for function selection.");
                StdRng::seed_from_u64(seed)
            }
            None => StdRng::from_rng(&mut rand::rng()),
        };

        let work_model = generate_work_model(&self.config.parameters, &graph, &mut rng)
            .error_context("Failed to generate work model.")?;
        self.check_unassigned(&work_model)?;

        let output_path = location.output_path();
        let rendered = serde_json::to_string_pretty(&work_model).error_context("Failed to serialize work model.")?;
        debug!(work_model = %rendered, "Generated work model.");

        info!(path = %output_path.display(), "Writing work model.");
        std::fs::write(&output_path, rendered).file_context(FileAction::Write, "work model", &output_path)
    }

    fn check_unassigned(&self, work_model: &WorkModel) -> Result<(), GenericError> {
        let unassigned = work_model.unassigned().collect::<Vec<_>>();
        if unassigned.is_empty() {
            return Ok(());
        }

        let services = unassigned.join(", ");
        if self.deny_unassigned {
            return Err(generic_error!(
                "{} service(s) could not be assigned an internal service: {}",
                unassigned.len(),
                services
            ));
        }

        warn!(
            count = unassigned.len(),
            services = %services,
            "Some services were left without an internal service. The simulator will run them without any load."
        );
        Ok(())
    }
}
