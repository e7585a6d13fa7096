//! Actor resolution and display names.

use crate::model::Actor;
use crate::store::{RecordStore, StoreError};

/// Resolve a user id into an [`Actor`] with the roles stored for it.
///
/// Unknown or blank user ids are a [`StoreError::PermissionDenied`]: an
/// unregistered identity may not act on tickets.
///
/// # Errors
///
/// Returns `PermissionDenied` for unknown users and propagates other store
/// failures unchanged.
pub fn resolve_actor<S: RecordStore>(store: &S, user_id: &str) -> Result<Actor, StoreError> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(StoreError::PermissionDenied(
            "no acting user given".to_string(),
        ));
    }
    match store.user(user_id) {
        Ok(user) => Ok(user.to_actor()),
        Err(StoreError::NotFound { .. }) => Err(StoreError::PermissionDenied(format!(
            "unknown user '{user_id}'"
        ))),
        Err(err) => Err(err),
    }
}

/// Human-readable name for a user, falling back to the id itself when the
/// user is unknown, unnamed, or the lookup fails.
pub fn display_name<S: RecordStore>(store: &S, user_id: &str) -> String {
    match store.user(user_id) {
        Ok(user) => user
            .full_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| user_id.to_string()),
        Err(err) => {
            if !matches!(err, StoreError::NotFound { .. }) {
                tracing::warn!(user = user_id, error = %err, "display name lookup failed");
            }
            user_id.to_string()
        }
    }
}
