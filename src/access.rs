// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::error::CoreError;
use crate::model::{CompleteSettings, GuildSettings};
use crate::platform::{MemberCapabilities, Platform};
use crate::store::Store;
use twilight_model::guild::Permissions;
use twilight_model::id::Id;
use twilight_model::id::marker::{GuildMarker, UserMarker};

/// Whether a member may act on tickets: they have the middleman role or are an administrator.
pub fn is_authorized(capabilities: &MemberCapabilities, settings: &CompleteSettings) -> bool {
	capabilities.roles.contains(&settings.middleman_role)
		|| capabilities.permissions.contains(Permissions::ADMINISTRATOR)
}

/// Whether a member holds a guild permission, counting administrators as holding everything
pub fn has_permission(capabilities: &MemberCapabilities, permission: Permissions) -> bool {
	capabilities.permissions.contains(Permissions::ADMINISTRATOR) || capabilities.permissions.contains(permission)
}

/// Looks up the actor's capabilities and fails with [CoreError::Unauthorized] if they may not act on tickets.
pub async fn authorize(
	platform: &dyn Platform,
	settings: &CompleteSettings,
	actor: Id<UserMarker>,
) -> Result<(), CoreError> {
	let capabilities = platform.member_capabilities(settings.guild, actor).await?;
	if is_authorized(&capabilities, settings) {
		Ok(())
	} else {
		tracing::debug!(user = %actor, guild = %settings.guild, "Rejected unauthorized ticket action");
		Err(CoreError::Unauthorized)
	}
}

/// Fails with [CoreError::MissingPermission] unless the actor holds the guild permission
pub async fn require_permission(
	platform: &dyn Platform,
	guild: Id<GuildMarker>,
	actor: Id<UserMarker>,
	permission: Permissions,
	permission_name: &'static str,
) -> Result<(), CoreError> {
	let capabilities = platform.member_capabilities(guild, actor).await?;
	if has_permission(&capabilities, permission) {
		Ok(())
	} else {
		Err(CoreError::MissingPermission(permission_name))
	}
}

/// Loads the guild's settings and fails with [CoreError::ConfigIncomplete] unless setup is finished.
pub fn require_settings(store: &Store, guild: Id<GuildMarker>) -> Result<CompleteSettings, CoreError> {
	store
		.guild_settings(guild)?
		.as_ref()
		.and_then(GuildSettings::complete)
		.ok_or(CoreError::ConfigIncomplete)
}
