//! Helpers shared by several use cases.

use crate::ports::platform::{PlatformError, PlatformGateway};
use kindergarten_domain::{RoleSnapshot, Zone};

/// Audit-log reasons attached to role changes
pub(crate) const REASON_CONFINED: &str = "Was naughty.";
pub(crate) const REASON_FREED: &str = "Was freed from the kindergarten";
pub(crate) const REASON_ZONE_ACCESS: &str = "Let the kindergarten attendees into their channel.";
pub(crate) const REASON_DENY_OVERWRITE: &str =
    "Ensure the naughty kids don't escape the kindergarten.";

/// Resolve the zone's confinement role, going to the platform only on a cache miss.
pub(crate) async fn zone_role(
    platform: &dyn PlatformGateway,
    zone: &Zone,
) -> Result<RoleSnapshot, PlatformError> {
    if let Some(role) = zone.cached_role() {
        return Ok(role);
    }

    let role = platform.role(zone.community_id(), zone.role_id()).await?;
    zone.cache_role(role.clone());
    Ok(role)
}
