use std::path::{Path, PathBuf};

use serde::Deserialize;
use workmodel_core::{model::ServiceGraph, parameters::ParameterDocument};
use workmodel_error::{ErrorContext as _, FileAction, GenericError};

const OUTPUT_PATH: &str = "OutputPath";
const OUTPUT_FILE: &str = "OutputFile";
const SERVICE_GRAPH_FILE_PATH: &str = "ServiceGraphFilePath";

const DEFAULT_OUTPUT_FILE: &str = "workmodel.json";
const DEFAULT_SERVICE_GRAPH_FILE: &str = "servicegraph.json";

#[derive(Deserialize)]
struct ParametersFile {
    #[serde(rename = "WorkModelParameters")]
    parameters: ParameterDocument,
}

/// Work model generator configuration, as loaded from the parameters file.
pub struct Config {
    /// Work model parameters.
    pub parameters: ParameterDocument,

    /// Where to read the service graph from and write the work model to.
    pub location: OutputLocation,
}

impl Config {
    /// Attempts to load a `Config` from the given parameters file.
    ///
    /// # Errors
    ///
    /// If an error occurs while reading the file, deserializing the parameters, or resolving the configured paths, it
    /// will be returned.
    pub fn try_from_file<P>(parameters_path: P) -> Result<Self, GenericError>
    where
        P: AsRef<Path>,
    {
        let parameters_path = parameters_path.as_ref();
        let raw = std::fs::read_to_string(parameters_path)
            .file_context(FileAction::Read, "parameters file", parameters_path)?;
        let file: ParametersFile = serde_json::from_str(&raw)
            .file_context(FileAction::Parse, "parameters file", parameters_path)?;

        let base_dir = match parameters_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let location = OutputLocation::resolve(&file.parameters, &base_dir)?;

        Ok(Self {
            parameters: file.parameters,
            location,
        })
    }
}

/// Resolved input and output paths.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OutputLocation {
    /// Directory the work model is written to.
    pub output_dir: PathBuf,

    /// File name of the work model.
    pub output_file: String,

    /// Path of the service graph to read.
    pub service_graph_path: PathBuf,
}

impl OutputLocation {
    /// Resolves the paths configured in the given parameters.
    ///
    /// `OutputPath` and `OutputFile` are only honored when non-empty; otherwise the output goes to `default_dir` under
    /// the default file name. The service graph is read from `ServiceGraphFilePath` when set, and from the output
    /// directory otherwise.
    ///
    /// # Errors
    ///
    /// If any of the path settings is not a string, an error is returned.
    pub fn resolve(parameters: &ParameterDocument, default_dir: &Path) -> Result<Self, GenericError> {
        let output_dir = match non_empty_setting(parameters, OUTPUT_PATH)? {
            Some(path) => {
                let trimmed = path.strip_suffix('/').filter(|p| !p.is_empty()).unwrap_or(path.as_str());
                PathBuf::from(trimmed)
            }
            None => default_dir.to_path_buf(),
        };

        let output_file =
            non_empty_setting(parameters, OUTPUT_FILE)?.unwrap_or_else(|| DEFAULT_OUTPUT_FILE.to_string());

        let service_graph_path = match parameters.value_of::<String>(SERVICE_GRAPH_FILE_PATH)? {
            Some(path) => PathBuf::from(path),
            None => output_dir.join(DEFAULT_SERVICE_GRAPH_FILE),
        };

        Ok(Self {
            output_dir,
            output_file,
            service_graph_path,
        })
    }

    /// Returns the full path of the work model file.
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(&self.output_file)
    }

    /// Creates the output directory if it does not exist yet.
    ///
    /// # Errors
    ///
    /// If the directory cannot be created, an error is returned.
    pub fn ensure_output_dir(&self) -> Result<(), GenericError> {
        std::fs::create_dir_all(&self.output_dir)
            .file_context(FileAction::Create, "output directory", &self.output_dir)
    }

    /// Loads the service graph.
    ///
    /// # Errors
    ///
    /// If the service graph cannot be read or parsed, an error is returned.
    pub fn load_service_graph(&self) -> Result<ServiceGraph, GenericError> {
        let path = &self.service_graph_path;
        let raw = std::fs::read_to_string(path).file_context(FileAction::Read, "service graph", path)?;
        serde_json::from_str(&raw).file_context(FileAction::Parse, "service graph", path)
    }
}

fn non_empty_setting(parameters: &ParameterDocument, name: &str) -> Result<Option<String>, GenericError> {
    Ok(parameters.value_of::<String>(name)?.filter(|value| !value.is_empty()))
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;

    fn parameters(value: Value) -> ParameterDocument {
        serde_json::from_value(value).unwrap()
    }

    fn string(value: &str) -> Value {
        json!({ "type": "string", "value": value })
    }

    #[test]
    fn defaults_to_parameters_directory() {
        let location = OutputLocation::resolve(&parameters(json!({})), Path::new("/etc/workmodel")).unwrap();

        assert_eq!(location.output_dir, PathBuf::from("/etc/workmodel"));
        assert_eq!(location.output_path(), PathBuf::from("/etc/workmodel/workmodel.json"));
        assert_eq!(location.service_graph_path, PathBuf::from("/etc/workmodel/servicegraph.json"));
    }

    #[test]
    fn configured_paths() {
        let params = parameters(json!({
            "OutputPath": string("/data/sim/"),
            "OutputFile": string("wm.json"),
            "ServiceGraphFilePath": string("/data/graphs/topology.json"),
        }));
        let location = OutputLocation::resolve(&params, Path::new("/unused")).unwrap();

        assert_eq!(location.output_dir, PathBuf::from("/data/sim"));
        assert_eq!(location.output_path(), PathBuf::from("/data/sim/wm.json"));
        assert_eq!(location.service_graph_path, PathBuf::from("/data/graphs/topology.json"));
    }

    #[test]
    fn empty_settings_fall_back() {
        let params = parameters(json!({
            "OutputPath": string(""),
            "OutputFile": string(""),
        }));
        let location = OutputLocation::resolve(&params, Path::new("base")).unwrap();

        assert_eq!(location.output_path(), PathBuf::from("base/workmodel.json"));
        assert_eq!(location.service_graph_path, PathBuf::from("base/servicegraph.json"));
    }

    #[test]
    fn root_output_path_kept() {
        let params = parameters(json!({ "OutputPath": string("/") }));
        let location = OutputLocation::resolve(&params, Path::new("base")).unwrap();

        assert_eq!(location.output_dir, PathBuf::from("/"));
    }

    #[test]
    fn non_string_path_rejected() {
        let params = parameters(json!({ "OutputPath": { "type": "string", "value": ["a"] } }));
        assert!(OutputLocation::resolve(&params, Path::new("base")).is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("WorkModelParameters.json");
        let document = json!({
            "WorkModelParameters": {
                "request_method": string("rest"),
                "databases_prefix": string("sdb"),
            }
        });
        std::fs::write(&path, document.to_string()).unwrap();

        let config = Config::try_from_file(&path).unwrap();
        assert_eq!(config.location.output_dir, dir.path());
        assert!(config.parameters.get("request_method").is_some());
    }

    #[test]
    fn load_requires_parameters_section() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("params.json");
        std::fs::write(&path, r#"{"request_method": {"type": "string", "value": "rest"}}"#).unwrap();

        assert!(Config::try_from_file(&path).is_err());
    }

    #[test]
    fn missing_file_reported() {
        let err = Config::try_from_file("/nonexistent/WorkModelParameters.json")
            .err()
            .unwrap();
        assert!(err.to_string().starts_with("Failed to read parameters file"));
    }
}
