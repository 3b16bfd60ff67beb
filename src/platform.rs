// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The operations the ticket and trip logic needs from the chat platform.

use crate::error::PlatformError;
use crate::model::Ticket;
use async_trait::async_trait;
use std::collections::HashSet;
use twilight_model::guild::Permissions;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, RoleMarker, UserMarker};

/// Who a channel permission grant applies to
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum GrantTarget {
	Role(Id<RoleMarker>),
	Member(Id<UserMarker>),
}

/// A permission overwrite on a channel
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ChannelGrant {
	pub target: GrantTarget,
	pub allow: Permissions,
	pub deny: Permissions,
}

impl ChannelGrant {
	pub fn allow(target: GrantTarget, allow: Permissions) -> Self {
		Self {
			target,
			allow,
			deny: Permissions::empty(),
		}
	}

	pub fn deny(target: GrantTarget, deny: Permissions) -> Self {
		Self {
			target,
			allow: Permissions::empty(),
			deny,
		}
	}
}

/// A guild member as far as the ticket and trip logic cares
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MemberInfo {
	pub id: Id<UserMarker>,
	pub username: String,
	/// The member's roles, not including the implicit everyone role
	pub roles: Vec<Id<RoleMarker>>,
}

/// The facts the access gate decides on
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MemberCapabilities {
	pub roles: Vec<Id<RoleMarker>>,
	pub permissions: Permissions,
}

impl Default for MemberCapabilities {
	fn default() -> Self {
		Self {
			roles: Vec::new(),
			permissions: Permissions::empty(),
		}
	}
}

/// What a new ticket channel should look like
#[derive(Clone, Debug)]
pub struct NewTicketChannel<'a> {
	pub guild: Id<GuildMarker>,
	pub category: Id<ChannelMarker>,
	pub name: &'a str,
	pub grants: &'a [ChannelGrant],
}

#[async_trait]
pub trait Platform: Send + Sync {
	/// The bot's own user ID
	fn bot_user(&self) -> Id<UserMarker>;

	async fn create_ticket_channel(&self, channel: NewTicketChannel<'_>) -> Result<Id<ChannelMarker>, PlatformError>;

	/// Replaces every permission overwrite on the channel with the given set
	async fn replace_channel_grants(
		&self,
		channel: Id<ChannelMarker>,
		grants: &[ChannelGrant],
	) -> Result<(), PlatformError>;

	/// Adds or replaces a single permission overwrite on the channel
	async fn set_channel_grant(&self, channel: Id<ChannelMarker>, grant: ChannelGrant) -> Result<(), PlatformError>;

	async fn delete_channel(&self, channel: Id<ChannelMarker>, reason: &str) -> Result<(), PlatformError>;

	/// Gets a guild member, or `None` if they aren't in the guild
	async fn fetch_member(
		&self,
		guild: Id<GuildMarker>,
		user: Id<UserMarker>,
	) -> Result<Option<MemberInfo>, PlatformError>;

	/// Gets the first page of guild members. The page may not contain every member.
	async fn list_members(&self, guild: Id<GuildMarker>, limit: u16) -> Result<Vec<MemberInfo>, PlatformError>;

	/// Gets the IDs of the guild's roles, or `None` if the guild can't be reached
	async fn guild_roles(&self, guild: Id<GuildMarker>) -> Result<Option<HashSet<Id<RoleMarker>>>, PlatformError>;

	/// Replaces the member's entire role set
	async fn set_member_roles(
		&self,
		guild: Id<GuildMarker>,
		user: Id<UserMarker>,
		roles: &[Id<RoleMarker>],
		reason: &str,
	) -> Result<(), PlatformError>;

	/// Gets the roles and guild-level permissions of a member. Members not in the guild have no capabilities.
	async fn member_capabilities(
		&self,
		guild: Id<GuildMarker>,
		user: Id<UserMarker>,
	) -> Result<MemberCapabilities, PlatformError>;

	async fn send_message(&self, channel: Id<ChannelMarker>, content: &str) -> Result<(), PlatformError>;

	/// Posts the ticket summary and its controls into the ticket's channel, pinging the role if given
	async fn send_ticket_summary(&self, ticket: &Ticket, ping: Option<Id<RoleMarker>>) -> Result<(), PlatformError>;
}
