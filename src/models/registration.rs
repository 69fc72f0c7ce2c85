use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::event::EventResponse;
use crate::utils::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationStatus {
    Confirmed,
    Waitlisted,
    Cancelled,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Confirmed => "CONFIRMED",
            RegistrationStatus::Waitlisted => "WAITLISTED",
            RegistrationStatus::Cancelled => "CANCELLED",
        }
    }

    /// Confirmed and waitlisted swap freely, anything may be cancelled, and a
    /// cancelled registration is terminal. Staying in place is always legal.
    pub fn can_transition_to(self, next: RegistrationStatus) -> bool {
        use RegistrationStatus::*;

        match (self, next) {
            (from, to) if from == to => true,
            (Cancelled, _) => false,
            (_, Cancelled) => true,
            (Confirmed, Waitlisted) | (Waitlisted, Confirmed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegistrationStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CONFIRMED" => Ok(RegistrationStatus::Confirmed),
            "WAITLISTED" => Ok(RegistrationStatus::Waitlisted),
            "CANCELLED" => Ok(RegistrationStatus::Cancelled),
            _ => Err(AppError::InvalidArgument(format!(
                "Unknown registration status '{}'",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: String,
    pub event_id: String,
    pub user_id: String,
    pub status: RegistrationStatus,
    pub registration_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub attended: bool,
}

impl Registration {
    /// A registration awaiting admission. The store overwrites `status` when
    /// it makes the capacity decision.
    pub fn pending(event_id: &str, user_id: &str, notes: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_id: event_id.to_string(),
            user_id: user_id.to_string(),
            status: RegistrationStatus::Waitlisted,
            registration_date: Utc::now(),
            notes,
            attended: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status != RegistrationStatus::Cancelled
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationCreateRequest {
    pub event_id: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationUpdateRequest {
    pub status: RegistrationStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttendanceRequest {
    pub attended: bool,
}

pub type RegistrationResponse = Registration;

/// Which of a user's registrations a composite view should include.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationFilter {
    All,
    Active,
    Confirmed,
}

impl RegistrationFilter {
    pub fn admits(&self, registration: &Registration) -> bool {
        match self {
            RegistrationFilter::All => true,
            RegistrationFilter::Active => registration.is_active(),
            RegistrationFilter::Confirmed => {
                registration.status == RegistrationStatus::Confirmed
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationWithEvent {
    pub registration: RegistrationResponse,
    pub event: EventResponse,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendeeDashboard {
    pub registrations: Vec<RegistrationWithEvent>,
    pub count: usize,
}
