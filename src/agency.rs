//! Static catalog of service agencies and nearest-agency lookup.

use serde::{Deserialize, Serialize};

use crate::error::QueueError;
use crate::geo;
use crate::models::{Agency, Coordinate};

/// An agency together with its distance from the point it was resolved for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearestAgency {
    pub agency: Agency,
    pub distance_km: f64,
}

/// Linear scan for the agency closest to `point`.
///
/// Only a strictly smaller distance replaces the current best, so ties keep
/// the agency listed first. Returns `None` only for an empty slice.
pub fn nearest_agency(point: &Coordinate, agencies: &[Agency]) -> Option<NearestAgency> {
    let mut iter = agencies.iter();
    let first = iter.next()?;
    let mut best = first;
    let mut best_distance = geo::distance_km(point, &first.location);

    for agency in iter {
        let distance = geo::distance_km(point, &agency.location);
        if distance < best_distance || (best_distance.is_nan() && !distance.is_nan()) {
            best = agency;
            best_distance = distance;
        }
    }

    log::debug!(
        "Nearest agency to ({}) is {} at {:.2}km",
        point,
        best.name,
        best_distance
    );

    Some(NearestAgency {
        agency: best.clone(),
        distance_km: best_distance,
    })
}

/// Immutable list of agencies, loaded once at start.
#[derive(Debug, Clone)]
pub struct AgencyDirectory {
    agencies: Vec<Agency>,
}

impl AgencyDirectory {
    pub fn new(agencies: Vec<Agency>) -> Self {
        Self { agencies }
    }

    pub fn agencies(&self) -> &[Agency] {
        &self.agencies
    }

    pub fn is_empty(&self) -> bool {
        self.agencies.is_empty()
    }

    /// Nearest agency to `point`; an empty directory is a configuration bug.
    pub fn nearest(&self, point: &Coordinate) -> Result<NearestAgency, QueueError> {
        nearest_agency(point, &self.agencies).ok_or_else(|| {
            log::error!("Nearest agency requested from an empty directory");
            QueueError::EmptyAgencyDirectory
        })
    }

    /// Exact lookup by agency name.
    pub fn find_by_name(&self, name: &str) -> Option<&Agency> {
        self.agencies.iter().find(|agency| agency.name == name)
    }
}

/// The Ouagadougou agencies of the water utility.
impl Default for AgencyDirectory {
    fn default() -> Self {
        Self::new(vec![
            Agency::new("ONEA Siège Central", "Ouaga 2000", 12.3101, -1.5383),
            Agency::new("ONEA Agence Pissy", "Pissy", 12.3708, -1.5735),
            Agency::new("ONEA Agence Larlé", "Larlé", 12.3822, -1.5265),
            Agency::new("ONEA Agence Kossodo", "Kossodo", 12.4102, -1.4702),
            Agency::new("ONEA Agence Patte d’Oie", "Patte d’Oie", 12.3535, -1.5412),
            Agency::new("ONEA Agence Gounghin", "Gounghin", 12.3649, -1.5076),
            Agency::new("ONEA Agence Tampouy", "Tampouy", 12.4012, -1.5487),
            Agency::new("ONEA Agence Zone du Bois", "Zone du Bois", 12.3432, -1.5260),
        ])
    }
}
