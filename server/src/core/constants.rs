// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display and platform directories)
pub const APP_NAME: &str = "WhatsUp";

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "whatsup";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".whatsup";

// =============================================================================
// Environment Variables
// =============================================================================

/// Environment variable for server host
pub const ENV_HOST: &str = "WHATSUP_HOST";

/// Environment variable for server port
pub const ENV_PORT: &str = "WHATSUP_PORT";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "WHATSUP_LOG";

/// Environment variable for debug mode
pub const ENV_DEBUG: &str = "WHATSUP_DEBUG";

/// Environment variable to override data directory
pub const ENV_DATA_DIR: &str = "WHATSUP_DATA_DIR";

/// Environment variable for the JWT signing secret
pub const ENV_JWT_SECRET: &str = "WHATSUP_JWT_SECRET";

/// Environment variable for allowed CORS origins (comma-separated)
pub const ENV_CORS_ORIGINS: &str = "WHATSUP_CORS_ORIGINS";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 8080;

/// Graceful shutdown timeout in seconds
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 10;

/// Access token lifetime for locally minted tokens
pub const DEFAULT_TOKEN_TTL_HOURS: u32 = 24;

// =============================================================================
// Query Grammar
// =============================================================================

/// First page index
pub const DEFAULT_PAGE: u32 = 0;

/// Default page size when the request names none
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Hard upper bound for page size
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Delimiter between sort fields in `sortBy`
pub const SORT_DELIMITER: char = ',';

/// Query-parameter prefix marking a filter criterion
pub const FILTER_PARAM_PREFIX: &str = "filter.";

/// Delimiter between field path and operator token in a filter key
pub const FILTER_OPERATOR_DELIMITER: char = ':';

// =============================================================================
// SQLite
// =============================================================================

/// SQLite database filename
pub const SQLITE_DB_FILENAME: &str = "whatsup.db";

/// Maximum pool connections
pub const SQLITE_MAX_CONNECTIONS: u32 = 5;

/// Busy timeout in seconds
pub const SQLITE_BUSY_TIMEOUT_SECS: u64 = 30;

/// Page cache size (negative = KiB)
pub const SQLITE_CACHE_SIZE: &str = "-64000";

/// SQLite WAL auto-checkpoint threshold (pages, ~4MB at 1000)
pub const SQLITE_WAL_AUTOCHECKPOINT: &str = "1000";

/// WAL checkpoint interval in seconds (5 minutes)
pub const SQLITE_CHECKPOINT_INTERVAL_SECS: u64 = 300;

// =============================================================================
// Media & Push
// =============================================================================

/// Upper bound for one media upload
pub const MEDIA_MAX_BYTES: usize = 10 * 1024 * 1024;

/// Fallback extension when an upload has none usable
pub const MEDIA_DEFAULT_EXTENSION: &str = "bin";

/// Per-user broadcast channel capacity; older events drop past this
pub const PUSH_CHANNEL_CAPACITY: usize = 64;

/// SSE keep-alive comment interval in seconds
pub const SSE_KEEPALIVE_SECS: u64 = 15;

/// Upper bound for a JSON request body
pub const MAX_JSON_BODY_BYTES: usize = 256 * 1024;
