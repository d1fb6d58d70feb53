use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{AttemptId, ContestId};

const EARTH_RADIUS_M: f64 = 6_371_000.0;

//
// ─── CONTEST ───────────────────────────────────────────────────────────────────
//

/// Contest listing as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contest {
    #[serde(rename = "_id")]
    pub id: ContestId,
    pub title: String,
    #[serde(default = "all_filter")]
    pub category: String,
    #[serde(default = "all_filter")]
    pub difficulty: String,
    #[serde(default)]
    pub question_limit: Option<u32>,
    /// Duration in minutes.
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub allow_backtracking: bool,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub access_code: Option<String>,
    #[serde(default)]
    pub location: Option<GeoFence>,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub attempt_id: Option<AttemptId>,
}

fn all_filter() -> String {
    crate::model::launch::ALL_FILTER.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContestWindow {
    Upcoming,
    Active,
    Ended,
}

impl Contest {
    /// Where `now` falls relative to the contest's start and end (both inclusive).
    #[must_use]
    pub fn window(&self, now: DateTime<Utc>) -> ContestWindow {
        if now < self.start_time {
            ContestWindow::Upcoming
        } else if now > self.end_time {
            ContestWindow::Ended
        } else {
            ContestWindow::Active
        }
    }

    #[must_use]
    pub fn requires_access_code(&self) -> bool {
        self.access_code
            .as_deref()
            .is_some_and(|code| !code.trim().is_empty())
    }

    #[must_use]
    pub fn geofence(&self) -> Option<&GeoFence> {
        self.location.as_ref().filter(|fence| fence.enabled)
    }
}

//
// ─── LOCATION ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Circular venue fence; `radius` is in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoFence {
    #[serde(default)]
    pub enabled: bool,
    pub latitude: f64,
    pub longitude: f64,
    pub radius: f64,
}

impl GeoFence {
    #[must_use]
    pub fn center(&self) -> Coordinates {
        Coordinates {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }

    #[must_use]
    pub fn distance_m(&self, position: Coordinates) -> f64 {
        haversine_m(position, self.center())
    }

    #[must_use]
    pub fn contains(&self, position: Coordinates) -> bool {
        self.distance_m(position) <= self.radius
    }
}

/// Great-circle distance in metres.
#[must_use]
pub fn haversine_m(a: Coordinates, b: Coordinates) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let d_phi = (b.latitude - a.latitude).to_radians();
    let d_lambda = (b.longitude - a.longitude).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}
