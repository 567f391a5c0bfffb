/// Coordinate resolution for forecast lookups.
///
/// Location is best-effort: a cycle never fails because the device position
/// is unknown. Resolution walks a fallback chain:
///
/// 1. last-known fix, if it is not stale;
/// 2. a live fix from the location source (saved as the new last-known fix);
/// 3. the last-known fix even if stale;
/// 4. the configured default coordinate.
///
/// # Clock injection
/// Staleness takes `now` as a parameter rather than calling `Utc::now()`
/// internally, which keeps it deterministic in tests.

use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};

use crate::model::{Coordinates, LocationError, LocationFix};
use crate::ports::LocationSource;
use crate::store::LaundryStore;

/// Default coordinate used when nothing else is known (Tokyo).
pub const DEFAULT_COORDINATES: Coordinates = Coordinates {
    latitude: 35.6762,
    longitude: 139.6503,
};

/// Age after which a stored fix is considered stale.
pub const DEFAULT_MAX_AGE_MINUTES: i64 = 60;

// ---------------------------------------------------------------------------
// Staleness check
// ---------------------------------------------------------------------------

/// Returns `true` if `fix` is older than `max_age` relative to `now`.
///
/// Staleness is strictly greater than the threshold:
///   age > max_age  →  stale
///   age == max_age →  not stale
pub fn is_stale_at(fix: &LocationFix, max_age: Duration, now: DateTime<Utc>) -> bool {
    now - fix.obtained_at > max_age
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Which step of the fallback chain produced the coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationOrigin {
    StoredFresh,
    Live,
    StoredStale,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedLocation {
    pub coordinates: Coordinates,
    pub origin: LocationOrigin,
}

pub struct LocationResolver {
    source: Box<dyn LocationSource>,
    default: Coordinates,
    max_age: Duration,
}

impl LocationResolver {
    pub fn new(source: Box<dyn LocationSource>, default: Coordinates, max_age: Duration) -> Self {
        Self {
            source,
            default,
            max_age,
        }
    }

    /// Resolves the coordinate to fetch a forecast for. Never fails.
    pub fn resolve(&self, store: &LaundryStore, now: DateTime<Utc>) -> ResolvedLocation {
        let stored = match store.load_location() {
            Ok(fix) => fix,
            Err(e) => {
                warn!(target: "location", "could not read last-known location: {}", e);
                None
            }
        };

        if let Some(fix) = stored.filter(|f| !is_stale_at(f, self.max_age, now)) {
            return ResolvedLocation {
                coordinates: fix.coordinates,
                origin: LocationOrigin::StoredFresh,
            };
        }

        match self.source.current_coordinates() {
            Ok(coordinates) if coordinates.is_valid() => {
                let fix = LocationFix {
                    coordinates,
                    obtained_at: now,
                };
                if let Err(e) = store.save_location(&fix) {
                    warn!(target: "location", "could not save location fix: {}", e);
                }
                return ResolvedLocation {
                    coordinates,
                    origin: LocationOrigin::Live,
                };
            }
            Ok(coordinates) => {
                warn!(
                    target: "location",
                    "ignoring out-of-range fix ({}, {})",
                    coordinates.latitude, coordinates.longitude
                );
            }
            Err(LocationError::PermissionDenied) => {
                debug!(target: "location", "permission denied, using fallback");
            }
            Err(e) => {
                warn!(target: "location", "{}, using fallback", e);
            }
        }

        match stored {
            Some(fix) => ResolvedLocation {
                coordinates: fix.coordinates,
                origin: LocationOrigin::StoredStale,
            },
            None => ResolvedLocation {
                coordinates: self.default,
                origin: LocationOrigin::Default,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use chrono::TimeZone;

    /// A fixed "now" used across all tests: 2024-05-01 13:00:00 UTC.
    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap()
    }

    struct StubSource(Result<Coordinates, LocationError>);

    impl LocationSource for StubSource {
        fn current_coordinates(&self) -> Result<Coordinates, LocationError> {
            self.0.clone()
        }
    }

    fn resolver(result: Result<Coordinates, LocationError>) -> LocationResolver {
        LocationResolver::new(
            Box::new(StubSource(result)),
            DEFAULT_COORDINATES,
            Duration::minutes(DEFAULT_MAX_AGE_MINUTES),
        )
    }

    fn store_with_fix(age_minutes: i64) -> LaundryStore {
        let store = LaundryStore::new(Box::new(InMemoryStore::new()));
        store
            .save_location(&LocationFix {
                coordinates: Coordinates::new(43.0618, 141.3545),
                obtained_at: fixed_now() - Duration::minutes(age_minutes),
            })
            .unwrap();
        store
    }

    // --- Staleness ----------------------------------------------------------

    #[test]
    fn test_fix_exactly_at_max_age_is_not_stale() {
        let fix = LocationFix {
            coordinates: DEFAULT_COORDINATES,
            obtained_at: fixed_now() - Duration::minutes(60),
        };
        assert!(!is_stale_at(&fix, Duration::minutes(60), fixed_now()));
    }

    #[test]
    fn test_fix_one_minute_past_max_age_is_stale() {
        let fix = LocationFix {
            coordinates: DEFAULT_COORDINATES,
            obtained_at: fixed_now() - Duration::minutes(61),
        };
        assert!(is_stale_at(&fix, Duration::minutes(60), fixed_now()));
    }

    // --- Fallback chain -----------------------------------------------------

    #[test]
    fn test_fresh_stored_fix_skips_live_lookup() {
        let store = store_with_fix(10);
        let resolved = resolver(Ok(Coordinates::new(0.0, 0.0))).resolve(&store, fixed_now());
        assert_eq!(resolved.origin, LocationOrigin::StoredFresh);
        assert_eq!(resolved.coordinates, Coordinates::new(43.0618, 141.3545));
    }

    #[test]
    fn test_stale_fix_is_replaced_by_live_fix() {
        let store = store_with_fix(120);
        let live = Coordinates::new(34.6937, 135.5023);
        let resolved = resolver(Ok(live)).resolve(&store, fixed_now());
        assert_eq!(resolved.origin, LocationOrigin::Live);
        assert_eq!(resolved.coordinates, live);

        let saved = store.load_location().unwrap().expect("live fix should be saved");
        assert_eq!(saved.coordinates, live);
        assert_eq!(saved.obtained_at, fixed_now());
    }

    #[test]
    fn test_permission_denied_uses_stale_fix() {
        let store = store_with_fix(120);
        let resolved = resolver(Err(LocationError::PermissionDenied)).resolve(&store, fixed_now());
        assert_eq!(resolved.origin, LocationOrigin::StoredStale);
        assert_eq!(resolved.coordinates, Coordinates::new(43.0618, 141.3545));
    }

    #[test]
    fn test_no_fix_and_no_source_uses_default() {
        let store = LaundryStore::new(Box::new(InMemoryStore::new()));
        let resolved = resolver(Err(LocationError::Unavailable("no provider".into()))).resolve(&store, fixed_now());
        assert_eq!(resolved.origin, LocationOrigin::Default);
        assert_eq!(resolved.coordinates, DEFAULT_COORDINATES);
    }

    #[test]
    fn test_out_of_range_live_fix_is_ignored() {
        let store = LaundryStore::new(Box::new(InMemoryStore::new()));
        let resolved = resolver(Ok(Coordinates::new(123.0, 500.0))).resolve(&store, fixed_now());
        assert_eq!(resolved.origin, LocationOrigin::Default);
        assert_eq!(store.load_location().unwrap(), None);
    }
}
