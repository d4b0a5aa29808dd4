//! Crate-wide constants.

pub const APP_NAME: &str = "kiln";

/// Default root when neither `KILN_ROOT` nor the config file set one.
pub const DEFAULT_ROOT: &str = "/opt/kiln";

/// Environment variable overriding the root directory.
pub const ROOT_ENV: &str = "KILN_ROOT";

/// Environment variable overriding the cache directory.
pub const CACHE_ENV: &str = "KILN_CACHE";

/// Directory under the root holding per-recipe install prefixes.
pub const CELLAR_DIR: &str = "cellar";

/// Directory under the root holding `opt/<id>` links to installed prefixes.
pub const OPT_DIR: &str = "opt";

/// Length of a lowercase hex sha256 digest.
pub const SHA256_HEX_LEN: usize = 64;

/// Exit code for failures that happened before any step ran, or for a step
/// that ended without an exit code (killed by a signal).
pub const EXIT_PRE_STEP_FAILURE: i32 = 125;

/// Exit code when a step program exists but could not be executed.
pub const EXIT_CANNOT_EXECUTE: i32 = 126;

/// Exit code when a step program was not found.
pub const EXIT_NOT_FOUND: i32 = 127;

/// Exit code after an interrupt (128 + SIGINT).
pub const EXIT_CANCELLED: i32 = 130;
