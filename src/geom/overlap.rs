use std::panic::{self, AssertUnwindSafe};

use geo::{Area, BooleanOps, MultiPolygon};

use crate::error::GeometryError;

/// Area of the polygonal part of `a ∩ b`. Intersections that collapse to a line
/// or point have zero area.
///
/// The overlay engine can panic on inputs the sanity check lets through (spikes,
/// extreme coordinates); that panic is contained here and reported as an error
/// for this pair only.
pub fn intersection_area(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> Result<f64, GeometryError> {
    let area = contained(|| a.intersection(b).unsigned_area())?;
    finite_area(area)
}

fn contained<T>(overlay: impl FnOnce() -> T) -> Result<T, GeometryError> {
    panic::catch_unwind(AssertUnwindSafe(overlay))
        .map_err(|payload| GeometryError::Intersection(panic_message(payload.as_ref())))
}

fn finite_area(area: f64) -> Result<f64, GeometryError> {
    if area.is_finite() { Ok(area) }
    else { Err(GeometryError::Intersection(format!("intersection area is {area}"))) }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload.downcast_ref::<&str>().map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "overlay panicked".to_string())
}
