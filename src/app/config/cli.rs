use super::serde_helpers::{env_flag_set, load_env_path_opt, load_env_string, load_env_var};
use super::{ConfigError, LogLevel};
use crate::sender::{DEFAULT_BASE_URL, DEFAULT_USER_AGENT};
use crate::{DEFAULT_PRODUCT, DISABLE_ENV_VAR, VERSION};
use clap::parser::ValueSource;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(
    name = "checkpoint-telemetry",
    author,
    version,
    about = "Send one anonymous usage report to the checkpoint service",
    long_about = None
)]
#[serde(default)]
pub struct Config {
    /// CLI command being reported (e.g. synth, diff, deploy)
    #[serde(skip)]
    pub command: String,

    /// JSON object attached to the report as its payload
    #[serde(skip)]
    #[arg(long, default_value = "{}")]
    pub payload: String,

    /// Product name reported to the checkpoint service
    #[arg(long, env = "CHECKPOINT_PRODUCT", default_value = DEFAULT_PRODUCT)]
    pub product: String,

    /// Checkpoint API base URL
    #[arg(long, env = "CHECKPOINT_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Request timeout in milliseconds
    #[arg(long, env = "CHECKPOINT_TIMEOUT_MS", default_value = "1000")]
    pub timeout_ms: u64,

    /// User-Agent header sent with every report
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Project directory holding cdktf.json
    #[arg(long, default_value = ".")]
    pub project_dir: PathBuf,

    /// Home directory holding .cdktf/config.json (defaults to $HOME)
    #[arg(long)]
    pub home_dir: Option<PathBuf>,

    /// Version of the reporting tool
    #[arg(long, default_value = VERSION)]
    pub tool_version: String,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "warn", ignore_case = true)]
    pub log_level: LogLevel,

    /// Skip reporting (CHECKPOINT_DISABLE has the same effect)
    #[arg(long)]
    pub disable: bool,

    /// Configuration file path (optional, TOML)
    #[serde(skip)]
    #[arg(long, env = "CHECKPOINT_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Derived fields (not CLI arguments)
    #[serde(skip)]
    #[arg(skip)]
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            command: String::new(),
            payload: "{}".to_string(),
            product: DEFAULT_PRODUCT.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: 1000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            project_dir: PathBuf::from("."),
            home_dir: None,
            tool_version: VERSION.to_string(),
            log_level: LogLevel::Warn,
            disable: false,
            config_file: None,
            timeout: Duration::from_millis(1000),
        }
    }
}

impl Config {
    /// Parses the command line. Values from `--config-file` only fill in
    /// settings that neither a flag nor an environment variable provided.
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let matches = Config::command().try_get_matches_from(args)?;
        let mut config = Config::from_arg_matches(&matches)?;

        if let Some(path) = config.config_file.clone() {
            let content = std::fs::read_to_string(&path)?;
            let file: FileConfig = toml::from_str(&content)?;
            config.merge_file(file, &matches);
        }

        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    fn merge_file(&mut self, file: FileConfig, matches: &ArgMatches) {
        let explicit = |id: &str| {
            matches!(
                matches.value_source(id),
                Some(ValueSource::CommandLine | ValueSource::EnvVariable)
            )
        };

        fill(&mut self.product, file.product, explicit("product"));
        fill(&mut self.base_url, file.base_url, explicit("base_url"));
        fill(&mut self.timeout_ms, file.timeout_ms, explicit("timeout_ms"));
        fill(&mut self.user_agent, file.user_agent, explicit("user_agent"));
        fill(&mut self.project_dir, file.project_dir, explicit("project_dir"));
        fill(&mut self.home_dir, file.home_dir.map(Some), explicit("home_dir"));
        fill(&mut self.tool_version, file.tool_version, explicit("tool_version"));
        fill(&mut self.log_level, file.log_level, explicit("log_level"));
        fill(&mut self.disable, file.disable, explicit("disable"));
    }

    /// Settings for hosts that embed the reporter without a command line.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        load_env_string("CHECKPOINT_PRODUCT", &mut config.product);
        load_env_string("CHECKPOINT_BASE_URL", &mut config.base_url);
        load_env_var("CHECKPOINT_TIMEOUT_MS", &mut config.timeout_ms)?;
        load_env_var("LOG_LEVEL", &mut config.log_level)?;
        load_env_path_opt("CHECKPOINT_CONFIG_FILE", &mut config.config_file);
        config.disable = env_flag_set(DISABLE_ENV_VAR);

        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::read_file(path.as_ref())?;
        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn post_process(&mut self) -> Result<(), ConfigError> {
        // Convert milliseconds to Duration
        self.timeout = Duration::from_millis(self.timeout_ms);
        Ok(())
    }

    /// The `--payload` argument as a JSON object.
    pub fn payload_object(&self) -> Result<Map<String, Value>, ConfigError> {
        match serde_json::from_str(&self.payload) {
            Ok(Value::Object(object)) => Ok(object),
            Ok(other) => Err(ConfigError::InvalidPayload(format!(
                "expected a JSON object, got {other}"
            ))),
            Err(e) => Err(ConfigError::InvalidPayload(e.to_string())),
        }
    }
}

/// TOML settings; absent keys leave the command-line value in place.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    product: Option<String>,
    base_url: Option<String>,
    timeout_ms: Option<u64>,
    user_agent: Option<String>,
    project_dir: Option<PathBuf>,
    home_dir: Option<PathBuf>,
    tool_version: Option<String>,
    log_level: Option<LogLevel>,
    disable: Option<bool>,
}

fn fill<T>(target: &mut T, from_file: Option<T>, explicit: bool) {
    if explicit {
        return;
    }
    if let Some(value) = from_file {
        *target = value;
    }
}
