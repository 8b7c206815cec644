//! Storypoint: a geolocated record owned by one company.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::geo::Coords;

/// A stored storypoint.
///
/// `coords` is unique within `company_id`. `company_id` never changes after
/// creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Storypoint {
  pub id:          Uuid,
  pub company_id:  Uuid,
  pub created_by:  Uuid,
  pub coords:      Coords,
  pub title:       String,
  pub description: String,
  /// Free-form history entries supplied by clients.
  pub history:     Vec<Value>,
  /// Reverse index of attachment ids, in upload order.
  pub file_ids:    Vec<Uuid>,
  #[serde(with = "chrono::serde::ts_seconds")]
  pub created_at:  DateTime<Utc>,
}

/// Input for [`GeoStore::add_storypoint`](crate::store::GeoStore::add_storypoint).
#[derive(Debug, Clone)]
pub struct NewStorypoint {
  pub company_id:  Uuid,
  pub created_by:  Uuid,
  pub coords:      Coords,
  pub title:       String,
  pub description: String,
}

impl NewStorypoint {
  /// Build an input, filling the defaults used when a client omits fields:
  /// the title falls back to the coordinates and the description to `""`.
  pub fn new(
    company_id: Uuid,
    created_by: Uuid,
    coords: Coords,
    title: Option<String>,
    description: Option<String>,
  ) -> Self {
    Self {
      company_id,
      created_by,
      coords,
      title: title
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| coords.to_string()),
      description: description.unwrap_or_default(),
    }
  }
}

/// Partial update for a storypoint. `None` and empty strings leave the field
/// unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorypointPatch {
  pub title:       Option<String>,
  pub description: Option<String>,
  pub coords:      Option<Coords>,
  pub history:     Option<Vec<Value>>,
}

impl StorypointPatch {
  pub fn apply(self, storypoint: &mut Storypoint) {
    if let Some(title) = self.title.filter(|t| !t.is_empty()) {
      storypoint.title = title;
    }
    if let Some(description) = self.description.filter(|d| !d.is_empty()) {
      storypoint.description = description;
    }
    if let Some(coords) = self.coords {
      storypoint.coords = coords;
    }
    if let Some(history) = self.history {
      storypoint.history = history;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample() -> Storypoint {
    Storypoint {
      id:          Uuid::new_v4(),
      company_id:  Uuid::new_v4(),
      created_by:  Uuid::new_v4(),
      coords:      Coords::new(45.0, 7.0).unwrap(),
      title:       "Alpha Base".into(),
      description: "first camp".into(),
      history:     vec![],
      file_ids:    vec![],
      created_at:  Utc::now(),
    }
  }

  #[test]
  fn default_title_is_rendered_coordinates() {
    let input = NewStorypoint::new(
      Uuid::nil(),
      Uuid::nil(),
      Coords::new(45.5, 7.0).unwrap(),
      None,
      None,
    );
    assert_eq!(input.title, "45.5,7");
    assert_eq!(input.description, "");
  }

  #[test]
  fn patch_ignores_empty_strings() {
    let mut sp = sample();
    StorypointPatch {
      title: Some(String::new()),
      description: Some("updated".into()),
      ..Default::default()
    }
    .apply(&mut sp);
    assert_eq!(sp.title, "Alpha Base");
    assert_eq!(sp.description, "updated");
  }

  #[test]
  fn patch_never_touches_company() {
    let mut sp = sample();
    let company = sp.company_id;
    StorypointPatch {
      coords: Some(Coords::new(1.0, 2.0).unwrap()),
      ..Default::default()
    }
    .apply(&mut sp);
    assert_eq!(sp.company_id, company);
    assert_eq!(sp.coords, Coords::new(1.0, 2.0).unwrap());
  }
}
