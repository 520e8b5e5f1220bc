//! Error types for nodus.
//!
//! Every failure surfaced by the runtime is a [`NodusError`] variant carrying
//! the identifiers it concerns (node id, component type, resource id) and a
//! stable code, so callers can route on the kind without parsing messages.

use thiserror::Error;

/// The main error type for nodus operations.
#[derive(Error, Debug)]
pub enum NodusError {
    // =========================================================================
    // Component Errors (E100-E199)
    // =========================================================================
    /// No factory is registered for the requested component type.
    #[error(
        "E101: nodeType:{component_type} for id:{node_id} new error:component not found. componentType={component_type}"
    )]
    ComponentNotFound {
        /// The unregistered component type.
        component_type: String,
        /// The node that asked for it.
        node_id: String,
    },

    /// Definition bytes could not be decoded.
    #[error("E102: Failed to decode definition: {cause}")]
    DefinitionDecode {
        /// Reason reported by the decoder.
        cause: String,
    },

    /// The component rejected its configuration during `init`.
    #[error("E103: Failed to initialize {component_type} node {node_id}: {source}")]
    ComponentInit {
        /// The node being initialized.
        node_id: String,
        /// Its component type.
        component_type: String,
        /// The component's own error.
        #[source]
        source: Box<NodusError>,
    },

    /// A configuration entry is missing or malformed.
    #[error("E104: Invalid configuration value '{field}': {cause}")]
    ConfigValue {
        /// The offending configuration key.
        field: String,
        /// Description of the problem.
        cause: String,
    },

    // =========================================================================
    // Resource Pool Errors (E200-E299)
    // =========================================================================
    /// The component does not expose a shareable network resource.
    #[error("E201: Component {component_type} is not a net resource node")]
    NotNetResource {
        /// The component type that lacks the capability.
        component_type: String,
    },

    /// No pooled resource is registered under the key.
    #[error("E202: net resource not found type={component_type} id={id}")]
    NetResourceNotFound {
        /// Component type of the lookup key.
        component_type: String,
        /// Resource id of the lookup key.
        id: String,
    },

    /// A pooled reference was configured but no pool is attached.
    #[error("E203: net pool is not configured (resource {id})")]
    NetPoolUnavailable {
        /// The resource id that could not be resolved.
        id: String,
    },

    /// Local mode without an established connection.
    #[error("E204: client not initialized for {component_type}")]
    ClientNotInitialized {
        /// The component type owning the wrapper.
        component_type: String,
    },

    /// The pooled resource is not of the type the consumer expects.
    #[error("E205: net resource {component_type}/{id} is not a {expected}")]
    ConnectionTypeMismatch {
        /// Component type of the lookup key.
        component_type: String,
        /// Resource id of the lookup key.
        id: String,
        /// The expected Rust type name.
        expected: &'static str,
    },

    /// Another caller is already dialing this connection.
    #[error("E206: connection to {server} is being established by another caller")]
    ConnectInProgress {
        /// The endpoint being dialed.
        server: String,
    },

    /// The sub-pool was stopped; a fresh one must be used.
    #[error("E207: pool for {component_type} has been stopped")]
    PoolStopped {
        /// Component type of the stopped sub-pool.
        component_type: String,
    },

    // =========================================================================
    // Lifecycle Errors (E300-E399)
    // =========================================================================
    /// The operation is not available for this component type.
    #[error("E301: {operation} is not supported by component {component_type}")]
    UnsupportedOperation {
        /// The requested operation.
        operation: &'static str,
        /// The component type that does not support it.
        component_type: String,
    },

    /// A composite has no child with the given id.
    #[error("E302: child node '{child_id}' not found")]
    ChildNotFound {
        /// The missing child id.
        child_id: String,
    },

    // =========================================================================
    // Variable Resolution Errors (E400-E499)
    // =========================================================================
    /// A variable scope could not be read.
    #[error("E401: Variable scope '{scope}' unavailable: {cause}")]
    ScopeUnavailable {
        /// The scope name (global, vars, secrets).
        scope: String,
        /// Reason reported by the scope source.
        cause: String,
    },

    // =========================================================================
    // I/O Errors (E500-E599)
    // =========================================================================
    /// Network operation failed.
    #[error("E501: Network error: {cause}")]
    Network {
        /// Description of the network failure.
        cause: String,
    },

    /// Generic I/O error.
    #[error("E502: I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization failed.
    #[error("E503: Serialization error: {0}")]
    Serialization(String),
}

impl NodusError {
    /// Stable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::ComponentNotFound { .. } => "E101",
            Self::DefinitionDecode { .. } => "E102",
            Self::ComponentInit { .. } => "E103",
            Self::ConfigValue { .. } => "E104",
            Self::NotNetResource { .. } => "E201",
            Self::NetResourceNotFound { .. } => "E202",
            Self::NetPoolUnavailable { .. } => "E203",
            Self::ClientNotInitialized { .. } => "E204",
            Self::ConnectionTypeMismatch { .. } => "E205",
            Self::ConnectInProgress { .. } => "E206",
            Self::PoolStopped { .. } => "E207",
            Self::UnsupportedOperation { .. } => "E301",
            Self::ChildNotFound { .. } => "E302",
            Self::ScopeUnavailable { .. } => "E401",
            Self::Network { .. } => "E501",
            Self::Io(_) => "E502",
            Self::Serialization(_) => "E503",
        }
    }

    /// Whether retrying the same call later may succeed.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::ConnectInProgress { .. } | Self::Network { .. } | Self::Io(_)
        )
    }

    #[must_use]
    pub fn is_config_error(&self) -> bool {
        match self {
            Self::ComponentInit { source, .. } => source.is_config_error(),
            Self::ComponentNotFound { .. }
            | Self::DefinitionDecode { .. }
            | Self::ConfigValue { .. }
            | Self::NotNetResource { .. } => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, NodusError>;
