//! Identifier resolution.
//!
//! Order: numeric id, then case-insensitive exact match on any lookup key,
//! then the first substring match. Ambiguous substrings resolve to the first
//! entity in store order.

use crate::text::fold;
use crm_core::action::ActionError;
use crm_core::directory::DirectoryEntity;

pub(crate) fn resolve<'a, T: DirectoryEntity>(
    entities: &'a [T],
    identifier: &str,
) -> Result<&'a T, ActionError> {
    let trimmed = identifier.trim();
    if trimmed.is_empty() {
        return Err(ActionError::validation("identifier", format!("no {} given", T::KIND)));
    }

    if let Ok(id) = trimmed.trim_start_matches('#').parse::<i64>() {
        if let Some(found) = entities.iter().find(|e| e.id() == id) {
            return Ok(found);
        }
    }

    let needle = fold(trimmed);
    if let Some(found) = entities
        .iter()
        .find(|e| e.lookup_keys().iter().any(|key| fold(key) == needle))
    {
        return Ok(found);
    }

    entities
        .iter()
        .find(|e| e.lookup_keys().iter().any(|key| fold(key).contains(&needle)))
        .ok_or_else(|| ActionError::not_found(T::KIND, trimmed))
}
