// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Server setup and staff moderation.

use crate::access::{require_permission, require_settings};
use crate::audit::log_to_guild;
use crate::error::{CoreError, PlatformError};
use crate::model::{GuildSettings, SettingsField};
use crate::platform::Platform;
use crate::roles::protected_subset;
use crate::store::Store;
use crate::tickets::resolve::parse_explicit_user;
use twilight_model::guild::Permissions;
use twilight_model::id::Id;
use twilight_model::id::marker::{GuildMarker, RoleMarker, UserMarker};

/// Reads a channel or role ID, given bare or as a channel or role mention
pub fn parse_setting_id(input: &str) -> Result<u64, CoreError> {
	let trimmed = input.trim();
	let inner = trimmed
		.strip_prefix("<#")
		.or_else(|| trimmed.strip_prefix("<@&"))
		.and_then(|rest| rest.strip_suffix('>'))
		.unwrap_or(trimmed);
	match inner.parse::<u64>() {
		Ok(id) if id > 0 => Ok(id),
		_ => Err(CoreError::InvalidId(trimmed.to_string())),
	}
}

/// Sets every middleman setting at once, in [SettingsField::ALL] order. Administrators only.
pub async fn set_up_guild(
	store: &Store,
	platform: &dyn Platform,
	guild: Id<GuildMarker>,
	actor: Id<UserMarker>,
	ids: &[&str],
) -> Result<GuildSettings, CoreError> {
	require_permission(platform, guild, actor, Permissions::ADMINISTRATOR, "Administrator").await?;
	if ids.len() != SettingsField::ALL.len() {
		return Err(CoreError::SetupArgumentCount {
			expected: SettingsField::ALL.len(),
			given: ids.len(),
		});
	}

	let mut settings = GuildSettings::new(guild);
	for (field, input) in SettingsField::ALL.into_iter().zip(ids) {
		settings.set_field(field, parse_setting_id(input)?);
	}
	store.upsert_guild_settings(&settings)?;
	tracing::info!(%guild, user = %actor, "Middleman setup saved");
	Ok(settings)
}

/// Sets one middleman setting. Administrators only.
pub async fn set_setting(
	store: &Store,
	platform: &dyn Platform,
	guild: Id<GuildMarker>,
	actor: Id<UserMarker>,
	field_name: &str,
	value: &str,
) -> Result<GuildSettings, CoreError> {
	require_permission(platform, guild, actor, Permissions::ADMINISTRATOR, "Administrator").await?;
	let field = SettingsField::from_name(field_name).ok_or_else(|| CoreError::UnknownSetting(field_name.to_string()))?;
	let id = parse_setting_id(value)?;

	let mut settings = store.guild_settings(guild)?.unwrap_or_else(|| GuildSettings::new(guild));
	settings.set_field(field, id);
	store.upsert_guild_settings(&settings)?;
	tracing::info!(%guild, user = %actor, setting = field.name(), "Middleman setting changed");
	Ok(settings)
}

/// Gets the server's settings as stored, complete or not. Administrators only.
pub async fn show_settings(
	store: &Store,
	platform: &dyn Platform,
	guild: Id<GuildMarker>,
	actor: Id<UserMarker>,
) -> Result<GuildSettings, CoreError> {
	require_permission(platform, guild, actor, Permissions::ADMINISTRATOR, "Administrator").await?;
	Ok(store.guild_settings(guild)?.unwrap_or_else(|| GuildSettings::new(guild)))
}

/// Takes every role from a member except the protected ones they hold. Needs Manage Roles.
pub async fn demote(
	store: &Store,
	platform: &dyn Platform,
	guild: Id<GuildMarker>,
	actor: Id<UserMarker>,
	target_input: &str,
) -> Result<(Id<UserMarker>, Vec<Id<RoleMarker>>), CoreError> {
	let settings = require_settings(store, guild)?;
	require_permission(platform, guild, actor, Permissions::MANAGE_ROLES, "Manage Roles").await?;

	let not_resolved = || CoreError::TargetNotResolved {
		input: target_input.trim().to_string(),
	};
	let target = parse_explicit_user(target_input).ok_or_else(not_resolved)?;
	let member = platform.fetch_member(guild, target).await?.ok_or_else(not_resolved)?;
	let Some(existing_roles) = platform.guild_roles(guild).await? else {
		return Err(CoreError::External(PlatformError::bare("fetch guild roles")));
	};

	let kept = protected_subset(&settings, &member.roles, &existing_roles);
	platform
		.set_member_roles(guild, target, &kept, "Demote (keep only protected roles)")
		.await?;

	tracing::info!(%guild, user = %actor, %target, "Demoted member");
	log_to_guild(
		platform,
		&settings,
		&format!("🔻 Demoted <@{}> by <@{}> (kept protected roles only)", target, actor),
	)
	.await;
	Ok((target, kept))
}
