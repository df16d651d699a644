//! Environment variable keys, grouped by concern.
//!
//! Every variable condaspawn reads is named here; nothing else calls
//! `std::env::var` with a literal.

/// Where user homes live and what gets generated inside them.
pub mod paths {
    pub const CONDASPAWN_HOME_ROOT: &str = "CONDASPAWN_HOME_ROOT";

    /// Inherited search path written into every kernel descriptor.
    pub const PATH: &str = "PATH";
}

/// Profile scaffolding (`ipython profile create --parallel`).
pub mod scaffold {
    pub const CONDASPAWN_IPYTHON: &str = "CONDASPAWN_IPYTHON";

    pub const CONDASPAWN_SCAFFOLD_TIMEOUT_SECS: &str = "CONDASPAWN_SCAFFOLD_TIMEOUT_SECS";

    /// `abort` (default) or `skip`.
    pub const CONDASPAWN_SCAFFOLD_FAILURE: &str = "CONDASPAWN_SCAFFOLD_FAILURE";
}

/// Provisioning pipeline switches.
pub mod pipeline {
    pub const CONDASPAWN_SORT_ENVS: &str = "CONDASPAWN_SORT_ENVS";
    pub const CONDASPAWN_FIX_OWNERSHIP: &str = "CONDASPAWN_FIX_OWNERSHIP";
}

/// Observability and logging.
pub mod observability {
    pub const CONDASPAWN_QUIET: &str = "CONDASPAWN_QUIET";

    pub const CONDASPAWN_LOG_LEVEL: &str = "CONDASPAWN_LOG_LEVEL";

    pub const CONDASPAWN_LOG_JSON: &str = "CONDASPAWN_LOG_JSON";
}
