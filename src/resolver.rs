//! Destination-channel resolution.
//!
//! Two modes: the webhook delivery path uses the fixed configured
//! channel; the new-group-join path discovers a channel from the
//! group's own listing.

use crate::backend::{ChannelId, GroupScope};
use crate::lifecycle::StateHandle;

/// Fixed mode: the configured target channel, verbatim. Existence and
/// permission are only discovered at send time.
pub fn resolve_fixed(state: &StateHandle) -> Option<ChannelId> {
    state.target_channel()
}

/// Discovery mode, for a group the bot has just joined.
///
/// Preference order: the system channel if the bot can send there,
/// otherwise the first sendable channel in the group's listed order,
/// otherwise `None` (callers must treat `None` as "do nothing").
pub fn resolve_discovery(scope: &GroupScope) -> Option<ChannelId> {
    if let Some(system) = &scope.system_channel {
        let sendable = scope
            .channels
            .iter()
            .any(|channel| &channel.id == system && channel.can_send);
        if sendable {
            return Some(system.clone());
        }
    }

    scope
        .channels
        .iter()
        .find(|channel| channel.can_send)
        .map(|channel| channel.id.clone())
}
