//! Company: the tenant boundary.
//!
//! `member_user_ids` and `storypoint_ids` are denormalised reverse indexes.
//! The authoritative relation is the child's `company_id`; readers that need
//! correctness should query by foreign key rather than trust these lists.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
  pub id:              Uuid,
  pub name:            String,
  pub description:     String,
  #[serde(with = "chrono::serde::ts_seconds")]
  pub created_at:      DateTime<Utc>,
  pub member_user_ids: Vec<Uuid>,
  pub storypoint_ids:  Vec<Uuid>,
}

/// Input for [`GeoStore::register_company`](crate::store::GeoStore::register_company).
#[derive(Debug, Clone)]
pub struct NewCompany {
  pub name:        String,
  pub description: String,
}
