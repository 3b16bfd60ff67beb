// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use miette::IntoDiagnostic;
use std::collections::HashMap;
use std::future::IntoFuture;
use twilight_http::client::Client;
use twilight_http::error::ErrorType;
use twilight_http::response::StatusCode;
use twilight_model::guild::Permissions;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, RoleMarker, UserMarker};
use twilight_util::permission_calculator::PermissionCalculator;

// This permission list is reported to the user by panel_channel_missing_permissions_message below.
pub fn panel_channel_permissions() -> Permissions {
	Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES | Permissions::EMBED_LINKS
}

/// Generates the message to send when the bot can't post the request panel in the channel
pub fn panel_channel_missing_permissions_message(channel_mention: impl std::fmt::Display) -> String {
	format!(
		"❌ I need View Channel, Send Messages, and Embed Links in {} to post the MM panel.",
		channel_mention
	)
}

/// The guild-level permissions of the everyone role and of each of a member's roles
pub struct MemberRolePermissions {
	guild_id: Id<GuildMarker>,
	everyone: Permissions,
	member_roles: Vec<(Id<RoleMarker>, Permissions)>,
}

impl MemberRolePermissions {
	/// Looks up the permissions of the member's roles among the guild's roles. Roles the guild doesn't have grant
	/// nothing.
	pub fn new(
		guild_id: Id<GuildMarker>,
		guild_roles: impl IntoIterator<Item = (Id<RoleMarker>, Permissions)>,
		member_roles: &[Id<RoleMarker>],
	) -> Self {
		let guild_everyone_role_id: Id<RoleMarker> = guild_id.cast();
		let role_permissions: HashMap<Id<RoleMarker>, Permissions> = guild_roles.into_iter().collect();
		let everyone = role_permissions
			.get(&guild_everyone_role_id)
			.copied()
			.unwrap_or_else(Permissions::empty);
		let member_roles = member_roles
			.iter()
			.map(|role_id| {
				(
					*role_id,
					role_permissions
						.get(role_id)
						.copied()
						.unwrap_or_else(Permissions::empty),
				)
			})
			.collect();
		Self {
			guild_id,
			everyone,
			member_roles,
		}
	}

	pub fn calculator(&self, user_id: Id<UserMarker>) -> PermissionCalculator<'_> {
		PermissionCalculator::new(self.guild_id, user_id, self.everyone, &self.member_roles)
	}
}

/// Gets the list of permissions the bot has in the passed-in channel. The channel ID must reference a channel on the
/// passed-in guild.
pub async fn channel_permissions(
	guild_id: Id<GuildMarker>,
	channel_id: Id<ChannelMarker>,
	bot_user_id: Id<UserMarker>,
	http_client: &Client,
) -> miette::Result<Permissions> {
	let self_member_future = http_client.guild_member(guild_id, bot_user_id).into_future();
	let channel_data_future = http_client.channel(channel_id).into_future();
	let guild_roles_future = http_client.roles(guild_id).into_future();
	let (self_member, channel_data, guild_roles) =
		tokio::join!(self_member_future, channel_data_future, guild_roles_future);

	let self_member = self_member.into_diagnostic()?.model().await.into_diagnostic()?;
	let guild_roles = guild_roles.into_diagnostic()?.models().await.into_diagnostic()?;

	let channel_data = match channel_data {
		Ok(response) => response.model().await.into_diagnostic()?,
		Err(error) => {
			if let ErrorType::Response { status, .. } = error.kind() {
				if *status == StatusCode::FORBIDDEN || *status == StatusCode::NOT_FOUND {
					return Ok(Permissions::empty());
				}
			}
			return Err(error).into_diagnostic();
		}
	};
	let channel_permission_overwrites = channel_data.permission_overwrites.unwrap_or_default();

	let role_permissions = MemberRolePermissions::new(
		guild_id,
		guild_roles.iter().map(|role| (role.id, role.permissions)),
		&self_member.roles,
	);
	Ok(role_permissions
		.calculator(bot_user_id)
		.in_channel(channel_data.kind, &channel_permission_overwrites))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn member_permissions_combine_everyone_and_held_roles() {
		let guild_roles = [
			(Id::new(1), Permissions::VIEW_CHANNEL),
			(Id::new(20), Permissions::MANAGE_ROLES),
			(Id::new(21), Permissions::BAN_MEMBERS),
		];
		let permissions = MemberRolePermissions::new(Id::new(1), guild_roles, &[Id::new(20), Id::new(99)]);
		let root = permissions.calculator(Id::new(5)).root();

		assert!(root.contains(Permissions::VIEW_CHANNEL | Permissions::MANAGE_ROLES));
		assert!(!root.contains(Permissions::BAN_MEMBERS));
	}

	#[test]
	fn guild_owner_has_everything() {
		let permissions = MemberRolePermissions::new(Id::new(1), [], &[]);
		let root = permissions.calculator(Id::new(5)).owner_id(Id::new(5)).root();
		assert_eq!(root, Permissions::all());
	}
}
