//! Complaint data model.
//!
//! Status, priority, and category are closed enumerations — unknown strings
//! are rejected at the boundary (store reads, config parsing), never deep
//! inside the matcher or state machine.

use crate::types::{ComplaintId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
#[error("unknown {field} value: '{value}'")]
pub struct ParseEnumError {
    pub field: &'static str,
    pub value: String,
}

// ── Status ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplaintStatus {
    Open,
    InProgress,
    Resolved,
    Escalated,
}

impl ComplaintStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::InProgress => "IN_PROGRESS",
            Self::Resolved => "RESOLVED",
            Self::Escalated => "ESCALATED",
        }
    }
}

impl fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComplaintStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(Self::Open),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "RESOLVED" => Ok(Self::Resolved),
            "ESCALATED" => Ok(Self::Escalated),
            other => Err(ParseEnumError {
                field: "status",
                value: other.to_string(),
            }),
        }
    }
}

// ── Priority ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            "CRITICAL" => Ok(Self::Critical),
            other => Err(ParseEnumError {
                field: "priority",
                value: other.to_string(),
            }),
        }
    }
}

// ── Category ─────────────────────────────────────────────────────────────────

/// The fixed catalogue of civic issue categories accepted at intake.
/// The profession matcher tests its keywords against `label()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComplaintCategory {
    // Civil / roads
    #[serde(rename = "Road Damage")]
    RoadDamage,
    #[serde(rename = "Potholes")]
    Potholes,
    #[serde(rename = "Street Light Failure")]
    StreetLightFailure,
    // Plumbing / water
    #[serde(rename = "Water Leakage")]
    WaterLeakage,
    #[serde(rename = "Clogged Drain")]
    CloggedDrain,
    #[serde(rename = "Broken Pipe")]
    BrokenPipe,
    #[serde(rename = "Water Supply Issue")]
    WaterSupplyIssue,
    #[serde(rename = "Sewage Issue")]
    SewageIssue,
    // Electrical
    #[serde(rename = "Electric Shortage")]
    ElectricShortage,
    #[serde(rename = "Lighting")]
    Lighting,
    #[serde(rename = "Power Outage")]
    PowerOutage,
    #[serde(rename = "Faulty Wiring")]
    FaultyWiring,
    // Vehicle / traffic
    #[serde(rename = "Abandoned Vehicle")]
    AbandonedVehicle,
    #[serde(rename = "Traffic Signal Issue")]
    TrafficSignalIssue,
    #[serde(rename = "Illegal Parking")]
    IllegalParking,
    #[serde(rename = "Road Blockage")]
    RoadBlockage,
    // Environment / public spaces
    #[serde(rename = "Tree Damage")]
    TreeDamage,
    #[serde(rename = "Park Maintenance")]
    ParkMaintenance,
    #[serde(rename = "Graffiti")]
    Graffiti,
    #[serde(rename = "Vandalism")]
    Vandalism,
    #[serde(rename = "Noise Complaint")]
    NoiseComplaint,
    #[serde(rename = "Air Quality")]
    AirQuality,
    // Public services
    #[serde(rename = "Street Cleaning")]
    StreetCleaning,
    #[serde(rename = "Public Restroom Issue")]
    PublicRestroomIssue,
    #[serde(rename = "Waste Management")]
    WasteManagement,
    #[serde(rename = "Recycling Issue")]
    RecyclingIssue,
    #[serde(rename = "Animal Control")]
    AnimalControl,
    #[serde(rename = "Pest Control")]
    PestControl,
    #[serde(rename = "Fire Hazard")]
    FireHazard,
    #[serde(rename = "Health Hazard")]
    HealthHazard,
    // Sanitation / general
    #[serde(rename = "Garbage")]
    Garbage,
    #[serde(rename = "Safety")]
    Safety,
    #[serde(rename = "Other")]
    Other,
}

impl ComplaintCategory {
    pub const ALL: &'static [ComplaintCategory] = &[
        Self::RoadDamage,
        Self::Potholes,
        Self::StreetLightFailure,
        Self::WaterLeakage,
        Self::CloggedDrain,
        Self::BrokenPipe,
        Self::WaterSupplyIssue,
        Self::SewageIssue,
        Self::ElectricShortage,
        Self::Lighting,
        Self::PowerOutage,
        Self::FaultyWiring,
        Self::AbandonedVehicle,
        Self::TrafficSignalIssue,
        Self::IllegalParking,
        Self::RoadBlockage,
        Self::TreeDamage,
        Self::ParkMaintenance,
        Self::Graffiti,
        Self::Vandalism,
        Self::NoiseComplaint,
        Self::AirQuality,
        Self::StreetCleaning,
        Self::PublicRestroomIssue,
        Self::WasteManagement,
        Self::RecyclingIssue,
        Self::AnimalControl,
        Self::PestControl,
        Self::FireHazard,
        Self::HealthHazard,
        Self::Garbage,
        Self::Safety,
        Self::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::RoadDamage => "Road Damage",
            Self::Potholes => "Potholes",
            Self::StreetLightFailure => "Street Light Failure",
            Self::WaterLeakage => "Water Leakage",
            Self::CloggedDrain => "Clogged Drain",
            Self::BrokenPipe => "Broken Pipe",
            Self::WaterSupplyIssue => "Water Supply Issue",
            Self::SewageIssue => "Sewage Issue",
            Self::ElectricShortage => "Electric Shortage",
            Self::Lighting => "Lighting",
            Self::PowerOutage => "Power Outage",
            Self::FaultyWiring => "Faulty Wiring",
            Self::AbandonedVehicle => "Abandoned Vehicle",
            Self::TrafficSignalIssue => "Traffic Signal Issue",
            Self::IllegalParking => "Illegal Parking",
            Self::RoadBlockage => "Road Blockage",
            Self::TreeDamage => "Tree Damage",
            Self::ParkMaintenance => "Park Maintenance",
            Self::Graffiti => "Graffiti",
            Self::Vandalism => "Vandalism",
            Self::NoiseComplaint => "Noise Complaint",
            Self::AirQuality => "Air Quality",
            Self::StreetCleaning => "Street Cleaning",
            Self::PublicRestroomIssue => "Public Restroom Issue",
            Self::WasteManagement => "Waste Management",
            Self::RecyclingIssue => "Recycling Issue",
            Self::AnimalControl => "Animal Control",
            Self::PestControl => "Pest Control",
            Self::FireHazard => "Fire Hazard",
            Self::HealthHazard => "Health Hazard",
            Self::Garbage => "Garbage",
            Self::Safety => "Safety",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for ComplaintCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ComplaintCategory {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|c| c.label() == s)
            .copied()
            .ok_or_else(|| ParseEnumError {
                field: "category",
                value: s.to_string(),
            })
    }
}

// ── Location ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl Location {
    pub fn city(city: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            address: None,
            latitude: None,
            longitude: None,
        }
    }
}

// ── Complaint record ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Complaint {
    pub complaint_id: ComplaintId,
    pub title: String,
    pub description: String,
    pub category: ComplaintCategory,
    pub priority: Priority,
    pub status: ComplaintStatus,
    pub reporter_id: Option<UserId>,
    pub assigned_to: Option<UserId>,
    pub location: Location,
    pub created_at: DateTime<Utc>,
    pub sla_hours: f64,
    /// Fixed deadline, computed once at creation. Never recomputed.
    pub due_at: DateTime<Utc>,
    /// Set the first time the complaint reaches RESOLVED; never cleared.
    pub resolved_at: Option<DateTime<Utc>>,
    pub escalation_level: u32,
    /// Optimistic-concurrency version. Every conditional update bumps it.
    pub revision: i64,
}

/// Intake payload. The engine stamps identity, timestamps, and deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplaintDraft {
    pub title: String,
    pub description: String,
    pub category: ComplaintCategory,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub reporter_id: Option<UserId>,
    pub location: Location,
    /// Per-complaint SLA override; the configured default applies when absent.
    #[serde(default)]
    pub sla_hours: Option<f64>,
}

// ── Audit log entries ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEntry {
    pub status: ComplaintStatus,
    pub actor: String,
    pub notes: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentEntry {
    pub assigned_to: UserId,
    pub actor: String,
    pub notes: Option<String>,
    pub recorded_at: DateTime<Utc>,
}
