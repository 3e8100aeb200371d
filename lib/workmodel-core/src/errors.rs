use snafu::Snafu;

/// A configuration error.
///
/// Raised while decoding the work model parameters, before any vertex has been processed.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)), visibility(pub(crate)))]
pub enum ConfigurationError {
    /// A required setting was not present in the parameters.
    #[snafu(display("Missing required setting '{}' in work model parameters.", setting))]
    MissingSetting {
        /// Name of the missing setting.
        setting: &'static str,
    },

    /// A setting was present but its value could not be decoded.
    #[snafu(display("Invalid value for setting '{}': {}", setting, source))]
    InvalidSetting {
        /// Name of the setting.
        setting: String,

        /// Underlying decoding error.
        source: serde_json::Error,
    },

    /// A function entry could not be decoded.
    #[snafu(display("Invalid definition for function '{}': {}", function_id, source))]
    InvalidFunction {
        /// Identifier of the function entry.
        function_id: String,

        /// Underlying decoding error.
        source: serde_json::Error,
    },

    /// A function entry declared a probability that cannot be used as a selection weight.
    #[snafu(display(
        "Function '{}' has probability {}, but probabilities must be finite and non-negative.",
        function_id,
        probability
    ))]
    InvalidProbability {
        /// Identifier of the function entry.
        function_id: String,

        /// The offending probability.
        probability: f64,
    },
}

/// An assembly error.
///
/// Raised while building the descriptor of a single vertex. Any assembly error invalidates the whole work model.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)), visibility(pub(crate)))]
pub enum AssemblyError {
    /// An override forced a function that is not registered in the service pool.
    #[snafu(display(
        "Override for service '{}' references function '{}', which is not a known service function.",
        service,
        function_id
    ))]
    UnknownOverrideFunction {
        /// Name of the overridden service.
        service: String,

        /// Function identifier given in the override.
        function_id: String,
    },
}

/// A work model generation error.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)), visibility(pub(crate)))]
pub enum WorkModelError {
    /// The parameters were invalid.
    #[snafu(display("Invalid work model parameters."))]
    Configuration {
        /// Underlying configuration error.
        source: ConfigurationError,
    },

    /// A vertex could not be assembled.
    #[snafu(display("Failed to assemble work model."))]
    Assembly {
        /// Underlying assembly error.
        source: AssemblyError,
    },
}
