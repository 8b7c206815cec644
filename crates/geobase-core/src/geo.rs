//! Geo Distance Engine.
//!
//! Great-circle distances use the haversine formula on a sphere of radius
//! [`EARTH_RADIUS_KM`]. [`nearby`] ranks candidates by distance to a reference
//! point, truncates to a count limit and then applies the radius cut.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, storypoint::Storypoint};

/// Mean earth radius used by [`distance_km`].
pub const EARTH_RADIUS_KM: f64 = 6371.0;

// ─── Coordinates ─────────────────────────────────────────────────────────────

/// A `(latitude, longitude)` pair in decimal degrees.
///
/// On the wire this is a two-element array `[lat, lon]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coords {
  pub lat: f64,
  pub lon: f64,
}

impl Coords {
  /// Validate and build a coordinate pair. Rejects non-finite values,
  /// `|lat| > 90` and `|lon| > 180`.
  pub fn new(lat: f64, lon: f64) -> Result<Self, Error> {
    let in_range = lat.is_finite()
      && lon.is_finite()
      && (-90.0..=90.0).contains(&lat)
      && (-180.0..=180.0).contains(&lon);
    if !in_range {
      return Err(Error::InvalidCoordinates { lat, lon });
    }
    Ok(Self { lat, lon })
  }
}

impl TryFrom<[f64; 2]> for Coords {
  type Error = Error;

  fn try_from([lat, lon]: [f64; 2]) -> Result<Self, Self::Error> { Self::new(lat, lon) }
}

impl From<Coords> for [f64; 2] {
  fn from(c: Coords) -> Self { [c.lat, c.lon] }
}

impl fmt::Display for Coords {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{},{}", self.lat, self.lon)
  }
}

/// Anything with a position that [`nearby`] can rank.
pub trait Located {
  fn coords(&self) -> Coords;
}

impl Located for Storypoint {
  fn coords(&self) -> Coords { self.coords }
}

// ─── Distance ────────────────────────────────────────────────────────────────

/// Haversine distance between `a` and `b` in kilometres.
pub fn distance_km(a: Coords, b: Coords) -> f64 {
  let d_lat = (b.lat - a.lat).to_radians();
  let d_lon = (b.lon - a.lon).to_radians();
  let h = (d_lat / 2.0).sin().powi(2)
    + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
  // Rounding can push `h` a hair above 1 for antipodal points.
  let h = h.min(1.0);
  2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Render a distance for display: `"X.X km"` from one kilometre up, otherwise
/// whole metres rounded down (`"Y m"`).
pub fn format_distance(km: f64) -> String {
  if km >= 1.0 {
    format!("{km:.1} km")
  } else {
    format!("{} m", (km * 1000.0).floor() as u64)
  }
}

// ─── Ranking ─────────────────────────────────────────────────────────────────

/// Limits applied by [`nearby`].
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct NearbyOptions {
  pub limit:     usize,
  pub radius_km: f64,
}

impl Default for NearbyOptions {
  fn default() -> Self { Self { limit: 10, radius_km: 100.0 } }
}

/// A candidate together with its distance from the reference point.
#[derive(Debug, Clone)]
pub struct RankedPoint<'a, T> {
  pub item:           &'a T,
  pub distance_km:    f64,
  pub distance_label: String,
}

/// Rank `candidates` by distance to `reference`.
///
/// Sorting is stable, so equidistant candidates keep their input order. The
/// result is truncated to `options.limit` *before* the radius filter runs,
/// so fewer than `limit` points may come back even when more lie inside the
/// radius further down the list.
pub fn nearby<'a, T: Located>(
  reference: Coords,
  candidates: &'a [T],
  options: NearbyOptions,
) -> Vec<RankedPoint<'a, T>> {
  let mut ranked: Vec<RankedPoint<'a, T>> = candidates
    .iter()
    .map(|item| {
      let distance_km = distance_km(reference, item.coords());
      RankedPoint { item, distance_km, distance_label: format_distance(distance_km) }
    })
    .collect();

  ranked.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
  ranked.truncate(options.limit);
  ranked.retain(|r| r.distance_km <= options.radius_km);
  ranked
}

#[cfg(test)]
mod tests {
  use super::*;

  fn c(lat: f64, lon: f64) -> Coords { Coords::new(lat, lon).unwrap() }

  #[derive(Debug)]
  struct Pin(&'static str, Coords);

  impl Located for Pin {
    fn coords(&self) -> Coords { self.1 }
  }

  fn opts(limit: usize, radius_km: f64) -> NearbyOptions { NearbyOptions { limit, radius_km } }

  #[test]
  fn distance_to_self_is_zero() {
    let a = c(45.07, 7.68);
    assert_eq!(distance_km(a, a), 0.0);
  }

  #[test]
  fn distance_is_symmetric() {
    let a = c(45.07, 7.68);
    let b = c(-33.86, 151.21);
    assert!((distance_km(a, b) - distance_km(b, a)).abs() < 1e-9);
  }

  #[test]
  fn one_degree_of_latitude() {
    let d = distance_km(c(0.0, 0.0), c(1.0, 0.0));
    assert!((d - 111.195).abs() < 0.01, "got {d}");
  }

  #[test]
  fn distances_add_up_along_a_meridian() {
    let (a, b, m) = (c(10.0, 20.0), c(30.0, 20.0), c(50.0, 20.0));
    let direct = distance_km(a, m);
    let via = distance_km(a, b) + distance_km(b, m);
    assert!((direct - via).abs() < 1e-6, "{direct} vs {via}");
  }

  #[test]
  fn antipodal_points_do_not_produce_nan() {
    let d = distance_km(c(0.0, 0.0), c(0.0, 180.0));
    assert!(d.is_finite());
    assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
  }

  #[test]
  fn coords_reject_out_of_range() {
    assert!(Coords::new(91.0, 0.0).is_err());
    assert!(Coords::new(0.0, -180.5).is_err());
    assert!(Coords::new(f64::NAN, 0.0).is_err());
    assert!(Coords::new(-90.0, 180.0).is_ok());
  }

  #[test]
  fn coords_travel_as_arrays() {
    let json = serde_json::to_string(&c(45.0, 7.5)).unwrap();
    assert_eq!(json, "[45.0,7.5]");
    assert!(serde_json::from_str::<Coords>("[120.0, 0.0]").is_err());
  }

  #[test]
  fn labels() {
    assert_eq!(format_distance(0.0), "0 m");
    assert_eq!(format_distance(0.4567), "456 m");
    assert_eq!(format_distance(0.9999), "999 m");
    assert_eq!(format_distance(1.0), "1.0 km");
    assert_eq!(format_distance(12.34), "12.3 km");
  }

  #[test]
  fn nearby_sorts_ascending() {
    let here = c(45.0, 7.0);
    let pins = [
      Pin("far", c(46.0, 7.0)),
      Pin("near", c(45.001, 7.0)),
      Pin("mid", c(45.1, 7.0)),
    ];
    let ranked = nearby(here, &pins, opts(10, f64::INFINITY));
    let names: Vec<_> = ranked.iter().map(|r| r.item.0).collect();
    assert_eq!(names, ["near", "mid", "far"]);
    assert!(ranked.windows(2).all(|w| w[0].distance_km <= w[1].distance_km));
    assert!(ranked[0].distance_label.ends_with(" m"));
    assert!(ranked[2].distance_label.ends_with(" km"));
  }

  #[test]
  fn nearby_ties_keep_input_order() {
    let here = c(0.0, 0.0);
    let pins = [
      Pin("east", c(0.0, 1.0)),
      Pin("west", c(0.0, -1.0)),
      Pin("origin", c(0.0, 0.0)),
    ];
    let ranked = nearby(here, &pins, opts(10, f64::INFINITY));
    let names: Vec<_> = ranked.iter().map(|r| r.item.0).collect();
    assert_eq!(names, ["origin", "east", "west"]);
  }

  #[test]
  fn nearby_never_exceeds_limit() {
    let here = c(0.0, 0.0);
    let pins: Vec<Pin> = (0..20).map(|i| Pin("p", c(0.0, f64::from(i) * 0.01))).collect();
    assert_eq!(nearby(here, &pins, opts(5, f64::INFINITY)).len(), 5);
    assert_eq!(nearby(here, &pins, opts(0, f64::INFINITY)).len(), 0);
  }

  #[test]
  fn radius_is_applied_after_the_limit() {
    let here = c(0.0, 0.0);
    // Three points ~1.1 km, ~2.2 km and ~500 km away.
    let pins = [
      Pin("a", c(0.0, 0.01)),
      Pin("b", c(0.0, 0.02)),
      Pin("far", c(0.0, 4.5)),
    ];
    let ranked = nearby(here, &pins, opts(3, 5.0));
    let names: Vec<_> = ranked.iter().map(|r| r.item.0).collect();
    assert_eq!(names, ["a", "b"]);

    // With limit 1 only the nearest survives truncation, even though `b` is
    // also inside the radius.
    let ranked = nearby(here, &pins, opts(1, 5.0));
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].item.0, "a");
  }
}
