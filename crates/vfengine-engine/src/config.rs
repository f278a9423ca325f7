//! Engine configuration.

use std::fmt;

use vfengine_common::NodeId;
use vfengine_core::plan::{RelationType, SinkKind};

/// Environment variable enabling chunk dumps.
pub const ENV_DEBUG: &str = "VFENGINE_DEBUG";

/// Environment variable selecting packed (`1`) or unpacked (`0`) pipelines.
pub const ENV_PACKED: &str = "VFENGINE_PACKED";

/// Error returned by [`EngineConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The minimum sink only exists for packed pipelines.
    MinSinkRequiresPacked,
    /// Selection propagation walks run-length segments, which only packed
    /// pipelines produce.
    CascadeRequiresPacked,
    /// An explicit scan list must name at least one node.
    EmptySourceNodes,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MinSinkRequiresPacked => write!(f, "the min sink requires packed execution"),
            Self::CascadeRequiresPacked => {
                write!(f, "cascade selection requires packed execution")
            }
            Self::EmptySourceNodes => write!(f, "source_nodes must not be empty"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for vfengine_common::Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// How a query is turned into a pipeline.
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct EngineConfig {
    /// Build factorized pipelines (packed joins, fan-out tree).
    pub packed: bool,
    /// Terminal operator.
    pub sink: SinkKind,
    /// Insert selection propagation in front of the sink.
    pub cascade_selection: bool,
    /// Emit a `trace` event for every chunk an operator publishes.
    pub debug_chunks: bool,
    /// Scan these ids instead of every node of the store.
    pub source_nodes: Option<Vec<NodeId>>,
    /// Relation type per joined attribute, N:N when absent.
    pub relation_types: Vec<(String, RelationType)>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            packed: true,
            sink: SinkKind::Count,
            cascade_selection: false,
            debug_chunks: false,
            source_nodes: None,
            relation_types: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Default configuration overridden by `VFENGINE_DEBUG` and
    /// `VFENGINE_PACKED`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable source.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(value) = lookup(ENV_DEBUG) {
            config.debug_chunks = is_truthy(&value);
        }
        if let Some(value) = lookup(ENV_PACKED) {
            config.packed = is_truthy(&value);
        }
        config
    }

    /// Selects packed or unpacked pipelines.
    #[must_use]
    pub fn with_packed(mut self, packed: bool) -> Self {
        self.packed = packed;
        self
    }

    /// Sets the terminal operator.
    #[must_use]
    pub fn with_sink(mut self, sink: SinkKind) -> Self {
        self.sink = sink;
        self
    }

    /// Enables selection propagation before the sink.
    #[must_use]
    pub fn with_cascade_selection(mut self) -> Self {
        self.cascade_selection = true;
        self
    }

    /// Enables chunk dumps.
    #[must_use]
    pub fn with_debug_chunks(mut self) -> Self {
        self.debug_chunks = true;
        self
    }

    /// Restricts the scan to `nodes`.
    #[must_use]
    pub fn with_source_nodes(mut self, nodes: Vec<NodeId>) -> Self {
        self.source_nodes = Some(nodes);
        self
    }

    /// Declares the relation type of the join producing `attribute`.
    #[must_use]
    pub fn with_relation_type(
        mut self,
        attribute: impl Into<String>,
        relation: RelationType,
    ) -> Self {
        self.relation_types.push((attribute.into(), relation));
        self
    }

    /// Validates the configuration, returning an error for invalid combinations.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any setting is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sink == SinkKind::Min && !self.packed {
            return Err(ConfigError::MinSinkRequiresPacked);
        }
        if self.cascade_selection && !self.packed {
            return Err(ConfigError::CascadeRequiresPacked);
        }
        if let Some(nodes) = &self.source_nodes
            && nodes.is_empty()
        {
            return Err(ConfigError::EmptySourceNodes);
        }
        Ok(())
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
