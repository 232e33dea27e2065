use std::collections::HashMap;
use suzu_core::notify::error::NotifyError;
use suzu_core::notify::port::UserDirectory;

/// Sentinel that mentions everyone in the chat.
pub const MENTION_ALL: &str = "all";

/// # Summary
/// Maps mention identifiers (emails) to platform user IDs.
///
/// # Logic
/// 1. Empty input resolves to nothing without a lookup.
/// 2. If any identifier is `"all"`, returns `["all"]` without a lookup.
/// 3. Otherwise performs one batched lookup and aligns the results with the input
///    by email (case-insensitive), never by response position.
///
/// # Returns
/// * User IDs in input order.
/// * `Err(NotifyError::MentionResolutionFailed)` if the lookup fails or any identifier is unresolved.
pub async fn resolve_mentions(
    directory: &dyn UserDirectory,
    identifiers: &[String],
) -> Result<Vec<String>, NotifyError> {
    if identifiers.is_empty() {
        return Ok(Vec::new());
    }
    if identifiers.iter().any(|id| id == MENTION_ALL) {
        return Ok(vec![MENTION_ALL.to_string()]);
    }

    let records = directory
        .lookup_user_ids(identifiers)
        .await
        .map_err(|e| NotifyError::MentionResolutionFailed(e.to_string()))?;

    let by_email: HashMap<String, String> = records
        .into_iter()
        .filter_map(|r| r.user_id.map(|id| (r.email.to_lowercase(), id)))
        .collect();

    identifiers
        .iter()
        .map(|identifier| {
            by_email
                .get(&identifier.to_lowercase())
                .cloned()
                .ok_or_else(|| {
                    NotifyError::MentionResolutionFailed(format!("no user found for {identifier}"))
                })
        })
        .collect()
}
