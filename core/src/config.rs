//! Engine configuration.
//!
//! Everything the escalation scan and the matcher treat as policy lives here:
//! the default SLA duration, the warning/escalation thresholds, the scan
//! interval, and the profession keyword table. All of it is read-only once
//! the engine is built.

use crate::sla;
use crate::staff::Profession;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Hours allotted to resolve a complaint when the draft does not override.
    #[serde(default = "default_sla_hours")]
    pub default_sla_hours: f64,

    /// SLA ratio at which the assignee is warned. No status change.
    #[serde(default = "default_warning_ratio")]
    pub warning_ratio: f64,

    /// SLA ratio at which the complaint is escalated.
    #[serde(default = "default_escalation_ratio")]
    pub escalation_ratio: f64,

    /// Seconds between escalation scans when running on the scheduler.
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,

    /// Profession compatibility table: a profession handles a complaint when
    /// the category label (lowercased) contains any of its keywords.
    #[serde(default = "default_profession_keywords")]
    pub profession_keywords: HashMap<Profession, Vec<String>>,
}

fn default_sla_hours() -> f64 {
    48.0
}

fn default_warning_ratio() -> f64 {
    0.75
}

fn default_escalation_ratio() -> f64 {
    1.0
}

fn default_scan_interval_secs() -> u64 {
    900
}

fn default_profession_keywords() -> HashMap<Profession, Vec<String>> {
    let mut table = HashMap::new();
    table.insert(
        Profession::Electrician,
        keywords(&["electric", "power", "light", "wiring", "signal"]),
    );
    table.insert(
        Profession::Plumber,
        keywords(&["water", "pipe", "drain", "leak", "sewage", "restroom"]),
    );
    table.insert(
        Profession::Cleaner,
        keywords(&[
            "garbage",
            "waste",
            "sanitation",
            "trash",
            "cleaning",
            "recycling",
            "restroom",
            "blockage",
        ]),
    );
    table.insert(
        Profession::Mechanic,
        keywords(&["vehicle", "traffic", "signal"]),
    );
    // "Other" staff never auto-match; they can still be assigned manually.
    table.insert(Profession::Other, Vec::new());
    table
}

fn keywords(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_sla_hours: default_sla_hours(),
            warning_ratio: default_warning_ratio(),
            escalation_ratio: default_escalation_ratio(),
            scan_interval_secs: default_scan_interval_secs(),
            profession_keywords: default_profession_keywords(),
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file. Every field is individually defaultable, so a
    /// partial file overrides only what it names.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.default_sla_hours <= 0.0 || self.default_sla_hours > sla::MAX_SLA_HOURS {
            anyhow::bail!(
                "default_sla_hours must be in (0, {}]",
                sla::MAX_SLA_HOURS
            );
        }
        if self.warning_ratio <= 0.0 || self.warning_ratio > self.escalation_ratio {
            anyhow::bail!(
                "warning_ratio must be positive and not exceed escalation_ratio ({} > {})",
                self.warning_ratio,
                self.escalation_ratio
            );
        }
        Ok(())
    }
}
