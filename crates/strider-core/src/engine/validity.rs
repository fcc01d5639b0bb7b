use crate::core::models::snapshot::Snapshot;

/// Whether a snapshot is free of NaN coordinates and velocities.
///
/// Meant to be checked after stepping or minimizing to detect a diverged
/// integration. Infinite values and box vectors are not inspected.
pub fn is_valid_snapshot(snapshot: &Snapshot) -> bool {
    let coordinates_ok = snapshot
        .coordinates()
        .iter()
        .all(|point| !point.coords.iter().any(|x| x.is_nan()));
    let velocities_ok = snapshot
        .velocities()
        .iter()
        .all(|velocity| !velocity.iter().any(|v| v.is_nan()));
    coordinates_ok && velocities_ok
}
