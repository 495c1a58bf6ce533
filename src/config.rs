//! Tree construction configuration.

use serde::{Deserialize, Serialize};
use std::env;
use tracing::warn;

/// Environment variable toggling auto-simplification.
pub const SIMPLIFY_VAR: &str = "GPEXPR_SIMPLIFY";

/// Environment variable holding the parse-time depth ceiling.
pub const MAX_DEPTH_VAR: &str = "GPEXPR_MAX_DEPTH";

/// The depth ceiling used unless configured otherwise.
pub const DEFAULT_MAX_DEPTH: u32 = 512;

/// Options consulted when a `TreeExpr` is constructed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Also compute and cache a simplified form on construction.
    pub simplify: bool,
    /// Reject trees whose parenthesis nesting exceeds this level.
    ///
    /// The parser descends once per level, so this also bounds its stack use.
    pub max_depth: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            simplify: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Config {
    /// Load configuration from the environment, falling back to defaults.
    ///
    /// Values that fail to parse are ignored.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(val) = env::var(SIMPLIFY_VAR) {
            match parse_flag(&val) {
                Some(b) => cfg.simplify = b,
                None => warn!(var = SIMPLIFY_VAR, value = %val, "ignoring invalid flag"),
            }
        }
        if let Ok(val) = env::var(MAX_DEPTH_VAR) {
            match val.trim().parse::<u32>() {
                Ok(d) => cfg.max_depth = d,
                Err(_) => warn!(var = MAX_DEPTH_VAR, value = %val, "ignoring invalid depth"),
            }
        }

        cfg
    }

    /// The same configuration with auto-simplification set as given.
    pub fn with_simplify(mut self, simplify: bool) -> Self {
        self.simplify = simplify;
        self
    }

    /// The same configuration with the given depth ceiling.
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
