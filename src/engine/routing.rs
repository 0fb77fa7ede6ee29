//! Notification feed routing.
//!
//! Decides which suggestions a viewer sees for the active scope.

use crate::models::{Group, Scope, Suggestion, SuggestionKind};

/// Whether `suggestion` belongs in `viewer_id`'s feed under `scope`.
///
/// 1. Comments never reach the feed; they live in the task thread.
/// 2. Targeted suggestions reach only their target, whatever the scope.
/// 3. Everything else follows the scope: the exact group, or any group of
///    the active context when all groups are in view.
pub fn is_visible(suggestion: &Suggestion, viewer_id: &str, scope: &Scope, groups: &[Group]) -> bool {
    if let SuggestionKind::Comment { .. } = suggestion.kind {
        return false;
    }
    match &suggestion.user_id {
        Some(target) => target == viewer_id,
        None => scope.includes(&suggestion.group_id, groups),
    }
}

/// Suggestions visible to `viewer_id`, in input order.
pub fn filter_visible_suggestions<'a>(
    suggestions: &'a [Suggestion],
    viewer_id: &str,
    scope: &Scope,
    groups: &[Group],
) -> Vec<&'a Suggestion> {
    suggestions
        .iter()
        .filter(|s| is_visible(s, viewer_id, scope, groups))
        .collect()
}
