//! Default values for tlink configuration.
//!
//! All hardcoded defaults are centralized here for easy maintenance.

// ============================================================================
// File Locations
// ============================================================================

/// Project-local configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "tlink.toml";

/// Directory under the user config dir holding `config.toml`.
pub const DEFAULT_CONFIG_DIR: &str = "tlink";

/// User configuration file name.
pub const DEFAULT_USER_CONFIG_FILE: &str = "config.toml";

// ============================================================================
// Connection Defaults
// ============================================================================

/// Default XML-RPC endpoint of a TestLink installation.
pub const DEFAULT_TESTLINK_URL: &str = "http://localhost/testlink/lib/api/xmlrpc/v1/xmlrpc.php";

/// Default HTTP timeout for a single remote call, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Export Defaults
// ============================================================================

/// Suites that do not exist yet are created on first use.
pub const DEFAULT_CREATE_MISSING_SUITES: bool = true;

/// Line appended to the notes of a skipped test.
pub const DEFAULT_SKIP_MARKER: &str = "++++ SKIPPED +++";

/// Line appended to the notes of an ignored test.
pub const DEFAULT_IGNORE_MARKER: &str = "++++ IGNORED +++";

/// Importance given to created test cases (2 = medium).
pub const DEFAULT_TEST_CASE_IMPORTANCE: u8 = 2;

/// Execution type given to created test cases (2 = automated).
pub const DEFAULT_EXECUTION_TYPE: u8 = 2;

/// Platform id used when no platform name is configured.
pub const NO_PLATFORM_ID: u64 = 0;
