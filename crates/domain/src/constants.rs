//! Store constants
//!
//! Centralized location for the setting names, their defaults and the retry
//! bounds used throughout the workspace.

// Setting names (the closed set recognised by every store)
pub const AUTO_SAVE_ENABLED: &str = "AutoSaveEnabled";
pub const AUTO_SAVE_INTERVAL: &str = "AutoSaveInterval";
pub const VERBOSE_LOGGING: &str = "VerboseLogging";
pub const DEBUG_LOGGING: &str = "DebugLogging";
pub const STUDIO_ENABLED: &str = "StudioEnabled";

/// Every recognised setting name, in seeding order.
pub const SETTING_NAMES: [&str; 5] =
    [AUTO_SAVE_ENABLED, AUTO_SAVE_INTERVAL, VERBOSE_LOGGING, DEBUG_LOGGING, STUDIO_ENABLED];

// Setting defaults
pub const DEFAULT_AUTO_SAVE_ENABLED: bool = false;
pub const DEFAULT_AUTO_SAVE_INTERVAL: u64 = 180; // time units
pub const DEFAULT_VERBOSE_LOGGING: bool = true;
pub const DEFAULT_DEBUG_LOGGING: bool = false;
pub const DEFAULT_STUDIO_ENABLED: bool = false;

// Retry configuration
pub const MAX_TRIES: u32 = 5;

/// Milliseconds represented by one time unit unless configured otherwise.
pub const DEFAULT_TIME_UNIT_MS: u64 = 1_000;
