// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! An in-memory [Platform] that records what it was asked to do.

use crate::error::PlatformError;
use crate::model::{CompleteSettings, GuildSettings, SettingsField, Ticket};
use crate::platform::{ChannelGrant, MemberCapabilities, MemberInfo, NewTicketChannel, Platform};
use crate::store::Store;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use twilight_model::guild::Permissions;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, RoleMarker, UserMarker};

pub const GUILD: Id<GuildMarker> = Id::new(1);
pub const BOT: Id<UserMarker> = Id::new(999);
pub const REQUEST_CHANNEL: Id<ChannelMarker> = Id::new(2);
pub const CATEGORY: Id<ChannelMarker> = Id::new(3);
pub const MM_ROLE: Id<RoleMarker> = Id::new(4);
pub const LOG_CHANNEL: Id<ChannelMarker> = Id::new(5);
pub const CLIENT_ROLE: Id<RoleMarker> = Id::new(6);
pub const MEMBERS_ROLE: Id<RoleMarker> = Id::new(7);

/// Stores complete settings for [GUILD] and returns them
pub fn configure_guild(store: &Store) -> CompleteSettings {
	let mut settings = GuildSettings::new(GUILD);
	let values = [
		REQUEST_CHANNEL.get(),
		CATEGORY.get(),
		MM_ROLE.get(),
		LOG_CHANNEL.get(),
		CLIENT_ROLE.get(),
		MEMBERS_ROLE.get(),
	];
	for (field, value) in SettingsField::ALL.into_iter().zip(values) {
		settings.set_field(field, value);
	}
	store.upsert_guild_settings(&settings).expect("settings stored");
	settings.complete().expect("settings complete")
}

#[derive(Default)]
pub struct FakeState {
	pub members: HashMap<(Id<GuildMarker>, Id<UserMarker>), MemberInfo>,
	pub permissions: HashMap<(Id<GuildMarker>, Id<UserMarker>), Permissions>,
	pub guild_roles: HashMap<Id<GuildMarker>, HashSet<Id<RoleMarker>>>,
	pub channel_grants: HashMap<Id<ChannelMarker>, Vec<ChannelGrant>>,
	pub created_channels: Vec<(String, Id<ChannelMarker>)>,
	pub deleted_channels: Vec<Id<ChannelMarker>>,
	pub messages: Vec<(Id<ChannelMarker>, String)>,
	pub summaries: Vec<(Ticket, Option<Id<RoleMarker>>)>,
	pub role_updates: Vec<(Id<UserMarker>, Vec<Id<RoleMarker>>)>,
	pub fail_channel_create: bool,
	pub fail_grants: bool,
	pub fail_delete: bool,
	pub fail_set_roles: bool,
	pub next_channel: u64,
}

pub struct FakePlatform {
	state: Mutex<FakeState>,
}

impl FakePlatform {
	/// A platform where [GUILD] exists with the configured roles and the bot can manage roles
	pub fn new() -> Self {
		let mut state = FakeState {
			next_channel: 500,
			..FakeState::default()
		};
		state
			.guild_roles
			.insert(GUILD, [MM_ROLE, CLIENT_ROLE, MEMBERS_ROLE].into_iter().collect());
		state.permissions.insert((GUILD, BOT), Permissions::MANAGE_ROLES);
		state.members.insert(
			(GUILD, BOT),
			MemberInfo {
				id: BOT,
				username: String::from("middleman-bot"),
				roles: Vec::new(),
			},
		);
		Self {
			state: Mutex::new(state),
		}
	}

	pub fn state(&self) -> MutexGuard<'_, FakeState> {
		self.state.lock().unwrap()
	}

	pub fn add_member(&self, user: Id<UserMarker>, username: &str, roles: &[Id<RoleMarker>]) {
		let mut state = self.state();
		let guild_roles = state.guild_roles.entry(GUILD).or_default();
		guild_roles.extend(roles.iter().copied());
		state.members.insert(
			(GUILD, user),
			MemberInfo {
				id: user,
				username: username.to_string(),
				roles: roles.to_vec(),
			},
		);
	}

	pub fn remove_member(&self, user: Id<UserMarker>) {
		self.state().members.remove(&(GUILD, user));
	}

	pub fn set_permissions(&self, user: Id<UserMarker>, permissions: Permissions) {
		self.state().permissions.insert((GUILD, user), permissions);
	}

	pub fn member_roles(&self, user: Id<UserMarker>) -> Vec<Id<RoleMarker>> {
		self.state()
			.members
			.get(&(GUILD, user))
			.map(|member| member.roles.clone())
			.unwrap_or_default()
	}

	pub fn grants(&self, channel: Id<ChannelMarker>) -> Vec<ChannelGrant> {
		self.state().channel_grants.get(&channel).cloned().unwrap_or_default()
	}

	pub fn messages_in(&self, channel: Id<ChannelMarker>) -> Vec<String> {
		self.state()
			.messages
			.iter()
			.filter(|(message_channel, _)| *message_channel == channel)
			.map(|(_, content)| content.clone())
			.collect()
	}
}

fn failure(action: &'static str) -> PlatformError {
	PlatformError::bare(action)
}

#[async_trait]
impl Platform for FakePlatform {
	fn bot_user(&self) -> Id<UserMarker> {
		BOT
	}

	async fn create_ticket_channel(&self, channel: NewTicketChannel<'_>) -> Result<Id<ChannelMarker>, PlatformError> {
		let mut state = self.state();
		if state.fail_channel_create {
			return Err(failure("create channel"));
		}
		state.next_channel += 1;
		let id = Id::new(state.next_channel);
		state.created_channels.push((channel.name.to_string(), id));
		state.channel_grants.insert(id, channel.grants.to_vec());
		Ok(id)
	}

	async fn replace_channel_grants(
		&self,
		channel: Id<ChannelMarker>,
		grants: &[ChannelGrant],
	) -> Result<(), PlatformError> {
		// Give concurrent operations a chance to run, like a real request would
		tokio::task::yield_now().await;
		let mut state = self.state();
		if state.fail_grants {
			return Err(failure("replace channel permissions"));
		}
		state.channel_grants.insert(channel, grants.to_vec());
		Ok(())
	}

	async fn set_channel_grant(&self, channel: Id<ChannelMarker>, grant: ChannelGrant) -> Result<(), PlatformError> {
		let mut state = self.state();
		if state.fail_grants {
			return Err(failure("edit channel permission"));
		}
		let grants = state.channel_grants.entry(channel).or_default();
		grants.retain(|existing| existing.target != grant.target);
		grants.push(grant);
		Ok(())
	}

	async fn delete_channel(&self, channel: Id<ChannelMarker>, _reason: &str) -> Result<(), PlatformError> {
		let mut state = self.state();
		if state.fail_delete {
			return Err(failure("delete channel"));
		}
		state.channel_grants.remove(&channel);
		state.deleted_channels.push(channel);
		Ok(())
	}

	async fn fetch_member(
		&self,
		guild: Id<GuildMarker>,
		user: Id<UserMarker>,
	) -> Result<Option<MemberInfo>, PlatformError> {
		Ok(self.state().members.get(&(guild, user)).cloned())
	}

	async fn list_members(&self, guild: Id<GuildMarker>, limit: u16) -> Result<Vec<MemberInfo>, PlatformError> {
		let state = self.state();
		let mut members: Vec<MemberInfo> = state
			.members
			.iter()
			.filter(|((member_guild, _), _)| *member_guild == guild)
			.map(|(_, member)| member.clone())
			.collect();
		members.sort_by_key(|member| member.id);
		members.truncate(usize::from(limit));
		Ok(members)
	}

	async fn guild_roles(&self, guild: Id<GuildMarker>) -> Result<Option<HashSet<Id<RoleMarker>>>, PlatformError> {
		Ok(self.state().guild_roles.get(&guild).cloned())
	}

	async fn set_member_roles(
		&self,
		guild: Id<GuildMarker>,
		user: Id<UserMarker>,
		roles: &[Id<RoleMarker>],
		_reason: &str,
	) -> Result<(), PlatformError> {
		let mut state = self.state();
		if state.fail_set_roles {
			return Err(failure("update member roles"));
		}
		let Some(member) = state.members.get_mut(&(guild, user)) else {
			return Err(failure("update member roles"));
		};
		member.roles = roles.to_vec();
		state.role_updates.push((user, roles.to_vec()));
		Ok(())
	}

	async fn member_capabilities(
		&self,
		guild: Id<GuildMarker>,
		user: Id<UserMarker>,
	) -> Result<MemberCapabilities, PlatformError> {
		let state = self.state();
		let Some(member) = state.members.get(&(guild, user)) else {
			return Ok(MemberCapabilities::default());
		};
		Ok(MemberCapabilities {
			roles: member.roles.clone(),
			permissions: state.permissions.get(&(guild, user)).copied().unwrap_or_else(Permissions::empty),
		})
	}

	async fn send_message(&self, channel: Id<ChannelMarker>, content: &str) -> Result<(), PlatformError> {
		self.state().messages.push((channel, content.to_string()));
		Ok(())
	}

	async fn send_ticket_summary(&self, ticket: &Ticket, ping: Option<Id<RoleMarker>>) -> Result<(), PlatformError> {
		self.state().summaries.push((ticket.clone(), ping));
		Ok(())
	}
}
