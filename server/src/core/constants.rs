// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display)
pub const APP_NAME: &str = "Shepherd";

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "shepherd";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".shepherd";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name, looked up in the profile folder and the working directory
pub const CONFIG_FILE_NAME: &str = "shepherd.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "SHEPHERD_CONFIG";

// =============================================================================
// Environment Variables - Server
// =============================================================================

/// Environment variable for server host
pub const ENV_HOST: &str = "SHEPHERD_HOST";

/// Environment variable for server port
pub const ENV_PORT: &str = "SHEPHERD_PORT";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "SHEPHERD_LOG";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 5390;

/// API route prefix
pub const API_PREFIX: &str = "/api/v1";

/// Default log filter when neither SHEPHERD_LOG nor RUST_LOG is set
pub const DEFAULT_LOG_FILTER: &str = "info,shepherd=info,shepherd_server=info";

// =============================================================================
// Sessions
// =============================================================================

/// Environment variable for a directory of session files loaded at startup
pub const ENV_PRELOAD_DIR: &str = "SHEPHERD_PRELOAD_DIR";

/// Default maximum size of one uploaded session file (50 MB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

// =============================================================================
// Account Service
// =============================================================================

/// Environment variable for the account API base URL
pub const ENV_API_URL: &str = "SHEPHERD_API_URL";

/// Default account API base URL
pub const DEFAULT_API_URL: &str = "https://api.shepherd.dev/v1";

/// Session file name inside the profile folder
pub const SESSION_FILE_NAME: &str = "session.json";
