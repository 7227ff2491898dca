use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Appointment lifecycle as the backend reports it, lowercase on the wire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    pub fn label(self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
        }
    }
}

impl std::str::FromStr for AppointmentStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(AppointmentStatus::Pending),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "cancelled" | "canceled" => Ok(AppointmentStatus::Cancelled),
            "completed" => Ok(AppointmentStatus::Completed),
            other => Err(anyhow::anyhow!("unknown appointment status: {other}")),
        }
    }
}

/// A bookable offering. Owned by the backend; the client never mutates one.
///
/// Non-essential fields default so a sloppy payload degrades to blanks
/// instead of sinking the whole list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub price: f64,

    #[serde(default, rename = "duration")]
    pub duration_minutes: u32,

    #[serde(default)]
    pub category_id: Option<String>,

    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,

    #[serde(default)]
    pub name: String,
}

/// A booking. `time` is an `HH:MM` 24-hour string when present; an
/// appointment without one occupies the whole day for scheduling purposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,

    #[serde(default)]
    pub user_id: String,

    #[serde(default)]
    pub service_id: String,

    #[serde(default)]
    pub service_name: String,

    #[serde(default)]
    pub service_price: f64,

    #[serde(default)]
    pub service_duration: u32,

    pub date: NaiveDate,

    #[serde(default)]
    pub time: Option<String>,

    pub status: AppointmentStatus,

    #[serde(default)]
    pub notes: Option<String>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Coarse display bucket for a time of day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Morning,
    Afternoon,
    Evening,
}

impl Period {
    /// Canonical boundaries: hour < 12 morning, hour < 18 afternoon, else
    /// evening. The upstream screens disagreed between a two- and
    /// three-period split; this crate standardizes on three.
    pub fn for_hour(hour: u32) -> Self {
        if hour < 12 {
            Period::Morning
        } else if hour < 18 {
            Period::Afternoon
        } else {
            Period::Evening
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Period::Morning => "Morning",
            Period::Afternoon => "Afternoon",
            Period::Evening => "Evening",
        }
    }
}

/// A candidate bookable time for one service on one date. Ephemeral:
/// regenerated on every date or service change, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeSlot {
    pub time: String,
    pub period: Period,
    pub available: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Appointment,
    Promo,
    System,
}

impl Default for NotificationKind {
    fn default() -> Self {
        NotificationKind::System
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub read: bool,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub kind: NotificationKind,

    #[serde(default)]
    pub appointment_id: Option<String>,

    #[serde(default)]
    pub service_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct User {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub email: String,
}
