// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::utils::permissions::MemberRolePermissions;
use super::utils::tickets::{ticket_controls, ticket_summary_embed};
use crate::error::PlatformError;
use crate::model::Ticket;
use crate::platform::{ChannelGrant, GrantTarget, MemberCapabilities, MemberInfo, NewTicketChannel, Platform};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use twilight_cache_inmemory::DefaultInMemoryCache;
use twilight_http::client::Client;
use twilight_http::error::{Error as HttpError, ErrorType};
use twilight_http::request::AuditLogReason;
use twilight_http::response::StatusCode;
use twilight_mention::fmt::Mention;
use twilight_model::channel::ChannelType;
use twilight_model::channel::permission_overwrite::{
	PermissionOverwrite as ChannelPermissionOverwrite, PermissionOverwriteType as ChannelPermissionOverwriteType,
};
use twilight_model::channel::message::AllowedMentions;
use twilight_model::guild::Role;
use twilight_model::http::permission_overwrite::{PermissionOverwrite, PermissionOverwriteType};
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, RoleMarker, UserMarker};

/// The [Platform] backed by Discord's HTTP API and the gateway cache
pub struct TwilightPlatform {
	http_client: Arc<Client>,
	cache: Arc<DefaultInMemoryCache>,
	bot_user: Id<UserMarker>,
}

impl TwilightPlatform {
	pub fn new(http_client: Arc<Client>, cache: Arc<DefaultInMemoryCache>, bot_user: Id<UserMarker>) -> Self {
		Self {
			http_client,
			cache,
			bot_user,
		}
	}

	async fn guild_role_models(&self, guild: Id<GuildMarker>) -> Result<Option<Vec<Role>>, PlatformError> {
		let response = match self.http_client.roles(guild).await {
			Ok(response) => response,
			Err(error) if is_status(&error, StatusCode::NOT_FOUND) || is_status(&error, StatusCode::FORBIDDEN) => {
				return Ok(None);
			}
			Err(error) => return Err(PlatformError::new("fetch guild roles", error)),
		};
		let roles = response
			.models()
			.await
			.map_err(|error| PlatformError::new("read guild roles", error))?;
		Ok(Some(roles))
	}

	async fn guild_owner(&self, guild: Id<GuildMarker>) -> Result<Id<UserMarker>, PlatformError> {
		if let Some(cached_guild) = self.cache.guild(guild) {
			return Ok(cached_guild.owner_id());
		}
		let guild_data = self
			.http_client
			.guild(guild)
			.await
			.map_err(|error| PlatformError::new("fetch guild", error))?
			.model()
			.await
			.map_err(|error| PlatformError::new("read guild", error))?;
		Ok(guild_data.owner_id)
	}
}

fn is_status(error: &HttpError, expected: StatusCode) -> bool {
	matches!(error.kind(), ErrorType::Response { status, .. } if *status == expected)
}

fn permission_overwrite(grant: &ChannelGrant) -> PermissionOverwrite {
	let (id, kind) = match grant.target {
		GrantTarget::Role(role) => (role.cast(), PermissionOverwriteType::Role),
		GrantTarget::Member(user) => (user.cast(), PermissionOverwriteType::Member),
	};
	PermissionOverwrite {
		allow: (!grant.allow.is_empty()).then_some(grant.allow),
		deny: (!grant.deny.is_empty()).then_some(grant.deny),
		id,
		kind,
	}
}

/// The same overwrite as [permission_overwrite], in the shape the channel create/update requests take
fn channel_permission_overwrite(grant: &ChannelGrant) -> ChannelPermissionOverwrite {
	let (id, kind) = match grant.target {
		GrantTarget::Role(role) => (role.cast(), ChannelPermissionOverwriteType::Role),
		GrantTarget::Member(user) => (user.cast(), ChannelPermissionOverwriteType::Member),
	};
	ChannelPermissionOverwrite {
		allow: grant.allow,
		deny: grant.deny,
		id,
		kind,
	}
}

#[async_trait]
impl Platform for TwilightPlatform {
	fn bot_user(&self) -> Id<UserMarker> {
		self.bot_user
	}

	async fn create_ticket_channel(&self, channel: NewTicketChannel<'_>) -> Result<Id<ChannelMarker>, PlatformError> {
		let overwrites: Vec<ChannelPermissionOverwrite> = channel.grants.iter().map(channel_permission_overwrite).collect();
		let created = self
			.http_client
			.create_guild_channel(channel.guild, channel.name)
			.kind(ChannelType::GuildText)
			.parent_id(channel.category)
			.permission_overwrites(&overwrites)
			.reason("MM ticket created")
			.await
			.map_err(|error| PlatformError::new("create ticket channel", error))?
			.model()
			.await
			.map_err(|error| PlatformError::new("read created ticket channel", error))?;
		Ok(created.id)
	}

	async fn replace_channel_grants(
		&self,
		channel: Id<ChannelMarker>,
		grants: &[ChannelGrant],
	) -> Result<(), PlatformError> {
		let overwrites: Vec<ChannelPermissionOverwrite> = grants.iter().map(channel_permission_overwrite).collect();
		self.http_client
			.update_channel(channel)
			.permission_overwrites(&overwrites)
			.await
			.map_err(|error| PlatformError::new("replace channel permissions", error))?;
		Ok(())
	}

	async fn set_channel_grant(&self, channel: Id<ChannelMarker>, grant: ChannelGrant) -> Result<(), PlatformError> {
		let overwrite = permission_overwrite(&grant);
		self.http_client
			.update_channel_permission(channel, &overwrite)
			.await
			.map_err(|error| PlatformError::new("edit channel permission", error))?;
		Ok(())
	}

	async fn delete_channel(&self, channel: Id<ChannelMarker>, reason: &str) -> Result<(), PlatformError> {
		match self.http_client.delete_channel(channel).reason(reason).await {
			Ok(_) => Ok(()),
			Err(error) if is_status(&error, StatusCode::NOT_FOUND) => Ok(()),
			Err(error) => Err(PlatformError::new("delete channel", error)),
		}
	}

	async fn fetch_member(
		&self,
		guild: Id<GuildMarker>,
		user: Id<UserMarker>,
	) -> Result<Option<MemberInfo>, PlatformError> {
		let response = match self.http_client.guild_member(guild, user).await {
			Ok(response) => response,
			Err(error) if is_status(&error, StatusCode::NOT_FOUND) => return Ok(None),
			Err(error) => return Err(PlatformError::new("fetch member", error)),
		};
		let member = response
			.model()
			.await
			.map_err(|error| PlatformError::new("read member", error))?;
		Ok(Some(MemberInfo {
			id: member.user.id,
			username: member.user.name,
			roles: member.roles,
		}))
	}

	async fn list_members(&self, guild: Id<GuildMarker>, limit: u16) -> Result<Vec<MemberInfo>, PlatformError> {
		let members = self
			.http_client
			.guild_members(guild)
			.limit(limit)
			.await
			.map_err(|error| PlatformError::new("list members", error))?
			.models()
			.await
			.map_err(|error| PlatformError::new("read member list", error))?;
		Ok(members
			.into_iter()
			.map(|member| MemberInfo {
				id: member.user.id,
				username: member.user.name,
				roles: member.roles,
			})
			.collect())
	}

	async fn guild_roles(&self, guild: Id<GuildMarker>) -> Result<Option<HashSet<Id<RoleMarker>>>, PlatformError> {
		let roles = self.guild_role_models(guild).await?;
		Ok(roles.map(|roles| roles.into_iter().map(|role| role.id).collect()))
	}

	async fn set_member_roles(
		&self,
		guild: Id<GuildMarker>,
		user: Id<UserMarker>,
		roles: &[Id<RoleMarker>],
		reason: &str,
	) -> Result<(), PlatformError> {
		self.http_client
			.update_guild_member(guild, user)
			.roles(roles)
			.reason(reason)
			.await
			.map_err(|error| PlatformError::new("update member roles", error))?;
		Ok(())
	}

	async fn member_capabilities(
		&self,
		guild: Id<GuildMarker>,
		user: Id<UserMarker>,
	) -> Result<MemberCapabilities, PlatformError> {
		let Some(member) = self.fetch_member(guild, user).await? else {
			return Ok(MemberCapabilities::default());
		};
		let Some(guild_roles) = self.guild_role_models(guild).await? else {
			return Ok(MemberCapabilities::default());
		};
		let owner = self.guild_owner(guild).await?;

		let role_permissions = MemberRolePermissions::new(
			guild,
			guild_roles.iter().map(|role| (role.id, role.permissions)),
			&member.roles,
		);
		let permissions = role_permissions.calculator(user).owner_id(owner).root();
		Ok(MemberCapabilities {
			roles: member.roles,
			permissions,
		})
	}

	async fn send_message(&self, channel: Id<ChannelMarker>, content: &str) -> Result<(), PlatformError> {
		self.http_client
			.create_message(channel)
			.content(content)
			.allowed_mentions(Some(&AllowedMentions::default()))
			.await
			.map_err(|error| PlatformError::new("send message", error))?;
		Ok(())
	}

	async fn send_ticket_summary(&self, ticket: &Ticket, ping: Option<Id<RoleMarker>>) -> Result<(), PlatformError> {
		let embed = ticket_summary_embed(ticket).map_err(|error| PlatformError::new("build ticket summary", error))?;
		let components = ticket_controls(ticket);
		let mut allowed_mentions = AllowedMentions::default();
		let content = ping.map(|role| {
			allowed_mentions.roles.push(role);
			format!("{} — ticket created.", role.mention())
		});

		let embeds = [embed];
		let mut create_message = self
			.http_client
			.create_message(ticket.get_channel())
			.embeds(&embeds)
			.components(&components)
			.allowed_mentions(Some(&allowed_mentions));
		if let Some(content) = &content {
			create_message = create_message.content(content);
		}
		create_message
			.await
			.map_err(|error| PlatformError::new("send ticket summary", error))?;
		Ok(())
	}
}
