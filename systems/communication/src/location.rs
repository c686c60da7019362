//! Seven-bit wrapped coordinates for location-carrying labels.

use tilebot_core::Point;

/// Period of a wrapped coordinate.
pub const WRAP: u32 = 128;

/// Reduces a point to coordinates modulo [`WRAP`].
#[must_use]
pub fn wrap_location(point: Point) -> (u32, u32) {
    (wrap(point.x()), wrap(point.y()))
}

/// Recovers the point closest to `near` whose wrapped coordinates are `(x, y)`.
///
/// Exact whenever the true point lies within half a period of `near` on both
/// axes.
#[must_use]
pub fn unwrap_location(x: u32, y: u32, near: Point) -> Point {
    Point::new(unwrap(x, near.x()), unwrap(y, near.y()))
}

fn wrap(coordinate: i32) -> u32 {
    u32::try_from(i64::from(coordinate).rem_euclid(i64::from(WRAP))).unwrap_or(0)
}

fn unwrap(wrapped: u32, reference: i32) -> i32 {
    let period = i64::from(WRAP);
    let reference = i64::from(reference);
    let delta = (i64::from(wrapped) - reference).rem_euclid(period);
    let value = if delta >= period / 2 {
        reference + delta - period
    } else {
        reference + delta
    };
    i32::try_from(value).unwrap_or(if value < 0 { i32::MIN } else { i32::MAX })
}
