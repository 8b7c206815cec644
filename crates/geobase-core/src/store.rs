//! The `GeoStore` trait, the persistence collaborator.
//!
//! Implemented by storage backends (e.g. `geobase-store-sqlite`). The HTTP
//! layer depends on this abstraction, not on any concrete backend.
//!
//! Methods that touch a record and its company-side reverse index
//! (`add_storypoint`, `delete_user`, …) are single logical operations. A
//! backend should perform both writes atomically when it can; callers must
//! not rely on it.

use std::future::Future;

use uuid::Uuid;

use crate::{
  attachment::{Attachment, NewAttachment},
  company::{Company, NewCompany},
  geo::Coords,
  storypoint::{NewStorypoint, Storypoint},
  user::{NewUser, User},
};

/// Error type of a [`GeoStore`] backend.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  /// `true` when a write was refused because it would break a uniqueness
  /// rule (company name, e-mail, storypoint coordinates, filename). Callers
  /// check for duplicates before writing, but two concurrent writers can
  /// both pass that check; the loser sees this.
  fn is_conflict(&self) -> bool;
}

/// Abstraction over a GeoBase store backend.
///
/// Every lookup that reads tenant data takes the `company_id` it is scoped
/// to, so a record belonging to another company reads as absent.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait GeoStore: Send + Sync {
  type Error: StoreError;

  // ── Companies ─────────────────────────────────────────────────────────

  /// Create a company together with its first member.
  fn register_company(
    &self,
    company: NewCompany,
    founder: NewUser,
  ) -> impl Future<Output = Result<(Company, User), Self::Error>> + Send + '_;

  fn get_company(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Company>, Self::Error>> + Send + '_;

  fn find_company_by_name<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Option<Company>, Self::Error>> + Send + 'a;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Look up a user by id regardless of company. Used to resolve the caller.
  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn find_user_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  /// All users whose `company_id` is `company_id`, in creation order.
  fn list_users(
    &self,
    company_id: Uuid,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  /// Insert a user and append it to the company's member list.
  fn add_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Persist `fullname`, `email` and `password_hash` of `user`.
  fn update_user<'a>(
    &'a self,
    user: &'a User,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Delete a user of `company_id` and pull it from the member list.
  /// Returns `false` if no such user exists in that company.
  fn delete_user(
    &self,
    company_id: Uuid,
    user_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Storypoints ───────────────────────────────────────────────────────

  /// All storypoints of `company_id`, in creation order.
  fn list_storypoints(
    &self,
    company_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Storypoint>, Self::Error>> + Send + '_;

  fn get_storypoint(
    &self,
    company_id: Uuid,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Storypoint>, Self::Error>> + Send + '_;

  /// The storypoint of `company_id` sitting exactly at `coords`, if any.
  fn find_storypoint_at(
    &self,
    company_id: Uuid,
    coords: Coords,
  ) -> impl Future<Output = Result<Option<Storypoint>, Self::Error>> + Send + '_;

  /// Insert a storypoint and append it to the company's storypoint list.
  fn add_storypoint(
    &self,
    input: NewStorypoint,
  ) -> impl Future<Output = Result<Storypoint, Self::Error>> + Send + '_;

  /// Persist `title`, `description`, `coords` and `history`.
  fn update_storypoint<'a>(
    &'a self,
    storypoint: &'a Storypoint,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Delete a storypoint together with its attachment records and pull it
  /// from the company's list. Returns the ids of the removed attachments so
  /// the caller can drop their blobs, or `None` if the storypoint does not
  /// exist in that company.
  fn delete_storypoint(
    &self,
    company_id: Uuid,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Vec<Uuid>>, Self::Error>> + Send + '_;

  // ── Attachments ───────────────────────────────────────────────────────

  /// Attachments of a storypoint, in upload order.
  fn list_attachments(
    &self,
    storypoint_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Attachment>, Self::Error>> + Send + '_;

  /// Look up an attachment by id alone. Used for blob reconciliation.
  fn get_attachment(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Attachment>, Self::Error>> + Send + '_;

  /// Look up an attachment that belongs to both `company_id` and
  /// `storypoint_id`.
  fn find_attachment(
    &self,
    company_id: Uuid,
    storypoint_id: Uuid,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Attachment>, Self::Error>> + Send + '_;

  fn find_attachment_by_name<'a>(
    &'a self,
    storypoint_id: Uuid,
    filename: &'a str,
  ) -> impl Future<Output = Result<Option<Attachment>, Self::Error>> + Send + 'a;

  /// Insert attachment metadata and append it to the storypoint's file list.
  fn add_attachment(
    &self,
    input: NewAttachment,
  ) -> impl Future<Output = Result<Attachment, Self::Error>> + Send + '_;

  fn rename_attachment<'a>(
    &'a self,
    id: Uuid,
    filename: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Pull an attachment from its storypoint's file list and delete its
  /// record. Returns `false` if it did not exist.
  fn delete_attachment(
    &self,
    storypoint_id: Uuid,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Token revocation list ─────────────────────────────────────────────

  /// Add `token` to the revocation list. Re-revoking is a no-op.
  fn revoke_token<'a>(
    &'a self,
    token: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Exact string match against the revocation list.
  fn is_token_revoked<'a>(
    &'a self,
    token: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;
}
