use crate::models::{EngineKind, ReuseThreshold};
use fathom_error::{ErrorCode, ErrorContext, FathomError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use validator::Validate;

// Default constants
pub const DEFAULT_CLUSTER_NAME: &str = "fathom-minicluster";
pub const DEFAULT_NODES: usize = 3;
pub const MAX_NODES: usize = 64;
pub const DEFAULT_COLLECT_STATISTICS: bool = false;
pub const ENV_PREFIX: &str = "FATHOM";

/// The single read-only property set handed to the cluster coordinator.
#[derive(Debug, Deserialize, Clone, Default, Validate)]
#[validate(schema(function = "validate_engines"))]
pub struct HarnessConfig {
    #[serde(default)]
    #[validate(nested)]
    pub cluster: ClusterSettings,

    #[serde(default)]
    pub engines: EngineSettings,

    #[serde(default)]
    pub statistics: StatisticsSettings,

    /// Raw DataFusion session options applied to every connection
    #[serde(default)]
    pub datafusion_config: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Clone, Validate)]
pub struct ClusterSettings {
    #[serde(default = "default_cluster_name")]
    #[validate(length(min = 1))]
    pub name: String,

    #[serde(default = "default_nodes")]
    #[validate(range(min = 1, max = 64))]
    pub nodes: usize,

    #[serde(default)]
    pub reuse_threshold: ReuseThreshold,
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            name: default_cluster_name(),
            nodes: default_nodes(),
            reuse_threshold: ReuseThreshold::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EngineSettings {
    #[serde(default = "default_engine_enabled")]
    pub embedded: bool,
    #[serde(default = "default_engine_enabled")]
    pub distributed: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            embedded: default_engine_enabled(),
            distributed: default_engine_enabled(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StatisticsSettings {
    #[serde(default = "default_collect_statistics")]
    pub collect: bool,
}

impl Default for StatisticsSettings {
    fn default() -> Self {
        Self {
            collect: default_collect_statistics(),
        }
    }
}

fn default_cluster_name() -> String {
    DEFAULT_CLUSTER_NAME.to_string()
}

fn default_nodes() -> usize {
    DEFAULT_NODES
}

fn default_engine_enabled() -> bool {
    true
}

fn default_collect_statistics() -> bool {
    DEFAULT_COLLECT_STATISTICS
}

fn validate_engines(config: &HarnessConfig) -> std::result::Result<(), validator::ValidationError> {
    if config.engines.embedded || config.engines.distributed {
        Ok(())
    } else {
        Err(validator::ValidationError::new("no_engine_enabled"))
    }
}

impl HarnessConfig {
    /// Loads an optional YAML file, then `FATHOM__` environment overrides.
    ///
    /// `FATHOM__CLUSTER__REUSE_THRESHOLD=unbounded` maps to
    /// `cluster.reuse_threshold`.
    pub fn from_file(path: &str) -> Result<Self> {
        let builder = config::Config::builder();

        let builder = if std::path::Path::new(path).exists() {
            builder.add_source(config::File::with_name(path))
        } else {
            builder
        };

        Self::finish(builder.add_source(env_source()), Some(path))
    }

    /// Environment overrides only.
    pub fn from_env() -> Result<Self> {
        Self::finish(config::Config::builder().add_source(env_source()), None)
    }

    /// Builds a config from dotted keys, e.g. `cluster.reuse_threshold = "0"`.
    pub fn from_props(props: &HashMap<String, String>) -> Result<Self> {
        let mut builder = config::Config::builder();
        let mut keys: Vec<&String> = props.keys().collect();
        keys.sort();
        for key in keys {
            builder = builder.set_override(key.as_str(), props[key].as_str())?;
        }
        Self::finish(builder, None)
    }

    fn finish(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
        path: Option<&str>,
    ) -> Result<Self> {
        let with_path = |e: FathomError| {
            e.with_context(ErrorContext::Config {
                file_path: path.map(str::to_string),
                field: None,
            })
        };

        let cfg = builder
            .build()
            .map_err(|e| with_path(FathomError::from(e)))?;

        let harness_config: HarnessConfig = cfg
            .try_deserialize()
            .map_err(|e| with_path(FathomError::from(e)))?;

        harness_config.validate().map_err(|e| {
            with_path(FathomError::new(
                ErrorCode::InvalidConfig,
                format!("Configuration validation failed: {}", e),
            ))
        })?;

        Ok(harness_config)
    }

    pub fn with_reuse_threshold(mut self, threshold: ReuseThreshold) -> Self {
        self.cluster.reuse_threshold = threshold;
        self
    }

    pub fn reuse_threshold(&self) -> ReuseThreshold {
        self.cluster.reuse_threshold
    }

    /// Engines test bodies should be run against, in a stable order.
    pub fn enabled_engines(&self) -> Vec<EngineKind> {
        EngineKind::ALL
            .into_iter()
            .filter(|engine| match engine {
                EngineKind::Embedded => self.engines.embedded,
                EngineKind::Distributed => self.engines.distributed,
            })
            .collect()
    }

    pub fn is_engine_enabled(&self, engine: EngineKind) -> bool {
        self.enabled_engines().contains(&engine)
    }
}

fn env_source() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}
