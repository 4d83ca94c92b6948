//! Playground configuration
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Widest chart width offered to snippets
pub const MAX_WIDTH: f64 = 928.0;

/// Tunables for provisioning and running snippets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    /// Width of the hosting viewport in CSS pixels
    pub viewport_width: f64,
    /// Default scale for `DOM.context2d`
    pub device_pixel_ratio: f64,
    /// Evaluation steps allowed per run, including settled continuations
    pub step_limit: u64,
    /// Nesting allowed for snippet function calls
    pub max_call_depth: usize,
    /// Quiet period after an edit before auto-run fires
    pub auto_run_delay_ms: u64,
    /// Delay before auto-running a freshly loaded example
    pub example_run_delay_ms: u64,
}

impl Config {
    /// The `width` offered to snippets
    pub fn width(&self) -> f64 {
        MAX_WIDTH.min(self.viewport_width - 40.0)
    }

    pub fn auto_run_delay(&self) -> Duration {
        Duration::from_millis(self.auto_run_delay_ms)
    }

    pub fn example_run_delay(&self) -> Duration {
        Duration::from_millis(self.example_run_delay_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            viewport_width: 1280.0,
            device_pixel_ratio: 1.0,
            step_limit: 5_000_000,
            max_call_depth: 1_000,
            auto_run_delay_ms: 1000,
            example_run_delay_ms: 500,
        }
    }
}
