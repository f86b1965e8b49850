use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

use crate::alignment::BioLocalAligner;
use crate::assembly::{AssemblyOptions, Cap3Config};
use crate::core::errors::{Result, ValidatorError};
use crate::pipeline::PipelineOptions;
use crate::qc::TrimmingOptions;
use crate::scoring::PciConfig;
use crate::validation::{ValidationOptions, ValidationRegistry};

/// Prefix of environment overrides, e.g. `BARCODE__ASSEMBLY__OVERLAP__MIN_OVERLAP_LENGTH=60`
pub const ENV_PREFIX: &str = "BARCODE";

/// Complete configuration of the barcode validator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ValidatorConfiguration {
    pub general: GeneralConfig,
    pub logging: LoggingConfig,
    pub trimming: TrimmingConfig,
    pub assembly: AssemblyConfig,
    pub validation: ValidationConfig,
    pub scoring: ScoringConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub name: String,
    /// Where result files are written
    pub output_dir: PathBuf,
    /// Worker threads for trimming and validation, 0 uses every core
    pub num_threads: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty`, `compact` or `json`
    pub format: String,
    /// Daily rolling log file; console only when unset
    pub file_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TrimmingConfig {
    pub traces: TrimmingOptions,
    /// Falls back to `traces` when unset
    pub consensus: Option<TrimmingOptions>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AssemblyConfig {
    pub overlap: AssemblyOptions,
    pub cap3: Cap3Config,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Options for each registered validation
    pub validations: Vec<ValidationOptions>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ScoringConfig {
    pub pci: PciConfig,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            name: "barcode-validator".to_string(),
            output_dir: PathBuf::from("./output"),
            num_threads: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            validations: ValidationRegistry::with_defaults(Arc::new(BioLocalAligner))
                .default_options(),
        }
    }
}

impl ValidatorConfiguration {
    /// Pipeline options carried by this configuration
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            trimming: self.trimming.traces.clone(),
            consensus_trimming: self.trimming.consensus.clone(),
            assembly: self.assembly.overlap,
            validations: self.validation.validations.clone(),
        }
    }

    /// Thread count after resolving 0 to the number of cores
    pub fn effective_threads(&self) -> usize {
        match self.general.num_threads {
            0 => num_cpus::get(),
            n => n,
        }
    }
}

/// `~/.config/barcode-validator/config.toml` or the platform equivalent
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("barcode-validator").join("config.toml"))
}

impl From<ConfigError> for ValidatorError {
    fn from(err: ConfigError) -> Self {
        ValidatorError::parse("configuration", err.to_string())
    }
}

// Keeps the non-blocking file writer alive for the life of the process
static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Configuration loading, validation and logging setup
#[derive(Debug, Clone, Default)]
pub struct ConfigurationManager {
    config: ValidatorConfiguration,
    config_path: Option<PathBuf>,
}

impl ConfigurationManager {
    /// Built-in defaults, the user configuration file if any, then `BARCODE__*` variables
    pub fn new() -> Result<Self> {
        Self::load(None)
    }

    /// Built-in defaults only
    pub fn new_with_defaults() -> Result<Self> {
        let manager = Self::default();
        manager.validate_configuration()?;
        Ok(manager)
    }

    /// Like [`new`](Self::new) with `config_path` layered over the user file
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        Self::load(Some(config_path.as_ref()))
    }

    fn load(config_path: Option<&Path>) -> Result<Self> {
        let defaults = toml::to_string(&ValidatorConfiguration::default()).map_err(|e| {
            ValidatorError::parse("configuration", format!("failed to serialize defaults: {e}"))
        })?;

        let mut builder =
            Config::builder().add_source(File::from_str(&defaults, FileFormat::Toml));
        if let Some(user_config) = user_config_path() {
            builder = builder.add_source(File::from(user_config).required(false));
        }
        if let Some(path) = config_path {
            if !path.exists() {
                return Err(ValidatorError::Io {
                    message: format!("configuration file {} not found", path.display()),
                });
            }
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: ValidatorConfiguration = builder.build()?.try_deserialize()?;
        let manager = Self {
            config,
            config_path: config_path.map(Path::to_path_buf),
        };
        manager.validate_configuration()?;
        Ok(manager)
    }

    pub fn config(&self) -> &ValidatorConfiguration {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ValidatorConfiguration {
        &mut self.config
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Reject out-of-range parameters before any work starts
    pub fn validate_configuration(&self) -> Result<()> {
        info!("🔍 Validating configuration...");
        let config = &self.config;

        config.trimming.traces.validate()?;
        if let Some(consensus) = &config.trimming.consensus {
            consensus.validate()?;
        }
        config.assembly.overlap.validate()?;
        for options in &config.validation.validations {
            options.ensure_identifier(options.params.identifier())?;
            options.params.validate()?;
        }

        if !matches!(config.logging.format.as_str(), "pretty" | "compact" | "json") {
            return Err(ValidatorError::invalid_parameter(
                "logging.format",
                &config.logging.format,
                "must be pretty, compact or json",
            ));
        }

        let available_threads = num_cpus::get();
        if config.general.num_threads > available_threads * 2 {
            warn!(
                "Configured threads ({}) exceeds available cores ({})",
                config.general.num_threads, available_threads
            );
        }

        info!("✅ Configuration validation passed");
        Ok(())
    }

    /// Install the global subscriber; later calls are no-ops
    pub fn setup_logging(&self) -> Result<()> {
        setup_logging(&self.config.logging)
    }

    pub fn save_config<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_string = toml::to_string_pretty(&self.config).map_err(|e| {
            ValidatorError::parse("configuration", format!("failed to serialize: {e}"))
        })?;
        std::fs::write(path.as_ref(), toml_string)?;
        info!("💾 Configuration saved to {}", path.as_ref().display());
        Ok(())
    }
}

/// Install a `tracing` subscriber for `logging`, unless one is already set
pub fn setup_logging(logging: &LoggingConfig) -> Result<()> {
    use tracing_appender::rolling;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if let Some(file_path) = &logging.file_path {
        let directory = file_path.parent().unwrap_or(Path::new("."));
        let file_name = file_path
            .file_name()
            .unwrap_or(std::ffi::OsStr::new("barcode-validator.log"));
        let (writer, guard) = tracing_appender::non_blocking(rolling::daily(directory, file_name));
        let _ = LOG_GUARD.set(guard);

        match logging.format.as_str() {
            "json" => registry
                .with(fmt::layer().json().with_writer(writer))
                .try_init(),
            "compact" => registry
                .with(fmt::layer().compact().with_ansi(false).with_writer(writer))
                .try_init(),
            _ => registry
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .try_init(),
        }
    } else {
        match logging.format.as_str() {
            "json" => registry
                .with(fmt::layer().json().with_thread_ids(true))
                .try_init(),
            "compact" => registry.with(fmt::layer().compact()).try_init(),
            _ => registry
                .with(fmt::layer().without_time().with_target(false))
                .try_init(),
        }
    };

    if installed.is_ok() {
        info!(
            "📝 Logging initialized with level: {}, format: {}",
            logging.level, logging.format
        );
    }
    Ok(())
}

/// Write the default configuration as a commented starting point
pub fn generate_config_template<P: AsRef<Path>>(path: P) -> Result<()> {
    let body = toml::to_string_pretty(&ValidatorConfiguration::default()).map_err(|e| {
        ValidatorError::parse("configuration", format!("failed to serialize template: {e}"))
    })?;
    let header = format!(
        "# barcode-validator configuration\n# Every key can be overridden with {ENV_PREFIX}__<SECTION>__<KEY>\n\n"
    );
    std::fs::write(path.as_ref(), header + &body)?;
    Ok(())
}
