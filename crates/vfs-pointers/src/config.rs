use serde::{Deserialize, Serialize};

pub const STRICT_ENV: &str = "VFS_POINTERS_STRICT";
pub const CHECK_ENV: &str = "VFS_POINTERS_CHECK";
pub const LINEAR_SCAN_ENV: &str = "VFS_POINTERS_LINEAR_SCAN";

/// Child arrays up to this length are scanned linearly instead of bisected.
pub const DEFAULT_LINEAR_SCAN_THRESHOLD: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Structural violations are returned as errors instead of being logged.
    pub strict: bool,
    /// Run the consistency walk after every event batch.
    pub check_consistency_after_batch: bool,
    pub linear_scan_threshold: usize,
}

impl RegistryConfig {
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_consistency_checks(mut self, enabled: bool) -> Self {
        self.check_consistency_after_batch = enabled;
        self
    }

    pub fn with_linear_scan_threshold(mut self, threshold: usize) -> Self {
        self.linear_scan_threshold = threshold;
        self
    }
}

impl Default for RegistryConfig {
    /// Debug builds are strict and self-checking; environment variables override.
    fn default() -> Self {
        Self {
            strict: env_flag(STRICT_ENV).unwrap_or(cfg!(debug_assertions)),
            check_consistency_after_batch: env_flag(CHECK_ENV).unwrap_or(cfg!(debug_assertions)),
            linear_scan_threshold: std::env::var(LINEAR_SCAN_ENV)
                .ok()
                .and_then(|value| value.trim().parse().ok())
                .unwrap_or(DEFAULT_LINEAR_SCAN_THRESHOLD),
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    let value = std::env::var(name).ok()?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
