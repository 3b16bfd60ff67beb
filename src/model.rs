// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::schema::{guild_settings, ticket_participants, tickets, trips};
use chrono::{DateTime, TimeZone, Utc};
use diesel::prelude::*;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, RoleMarker, UserMarker};

/// The middleman settings of a guild using the bot.
///
/// Every field other than the guild ID is optional in storage; the guild is only usable for tickets and trips once
/// all of them are set (see [Self::complete]).
#[derive(AsChangeset, Clone, Debug, Default, Insertable, PartialEq, Queryable)]
#[diesel(table_name = guild_settings, primary_key(guild_id), treat_none_as_null = true)]
pub struct GuildSettings {
	/// The ID of the guild in question.
	///
	/// To get a Discord-facing version of this more easily, use [Self::get_guild].
	pub guild_id: i64,
	/// The ID of the channel in which the middleman request panel is posted.
	pub request_channel_id: Option<i64>,
	/// The ID of the category under which ticket channels are created.
	pub ticket_category_id: Option<i64>,
	/// The ID of the role all middlemen have.
	pub middleman_role_id: Option<i64>,
	/// The ID of the channel to which audit lines are posted.
	pub log_channel_id: Option<i64>,
	/// The first role that's never stripped from a member.
	pub protected_client_role_id: Option<i64>,
	/// The second role that's never stripped from a member.
	pub protected_members_role_id: Option<i64>,
}

impl GuildSettings {
	/// Creates an empty settings record for the guild.
	pub fn new(guild: Id<GuildMarker>) -> Self {
		Self {
			guild_id: database_id_from_discord_id(guild.get()),
			..Self::default()
		}
	}

	/// Gets the Discord-facing guild ID.
	///
	/// For the raw database representation, use [Self::guild_id].
	pub fn get_guild(&self) -> Id<GuildMarker> {
		Id::new(discord_id_from_database_id(self.guild_id))
	}

	/// Gets the settings in their fully-configured form, if every field is set.
	pub fn complete(&self) -> Option<CompleteSettings> {
		Some(CompleteSettings {
			guild: Id::new_checked(discord_id_from_database_id(self.guild_id))?,
			request_channel: optional_discord_id(self.request_channel_id)?,
			ticket_category: optional_discord_id(self.ticket_category_id)?,
			middleman_role: optional_discord_id(self.middleman_role_id)?,
			log_channel: optional_discord_id(self.log_channel_id)?,
			protected_roles: [
				optional_discord_id(self.protected_client_role_id)?,
				optional_discord_id(self.protected_members_role_id)?,
			],
		})
	}

	/// Lists the names of the fields that haven't been set yet.
	pub fn missing_fields(&self) -> Vec<&'static str> {
		SettingsField::ALL
			.into_iter()
			.filter(|field| self.field(*field).is_none())
			.map(|field| field.name())
			.collect()
	}

	/// Gets the raw value of a single field
	pub fn field(&self, field: SettingsField) -> Option<i64> {
		match field {
			SettingsField::RequestChannel => self.request_channel_id,
			SettingsField::TicketCategory => self.ticket_category_id,
			SettingsField::MiddlemanRole => self.middleman_role_id,
			SettingsField::LogChannel => self.log_channel_id,
			SettingsField::ProtectedClientRole => self.protected_client_role_id,
			SettingsField::ProtectedMembersRole => self.protected_members_role_id,
		}
	}

	/// Sets a single field to a Discord ID
	pub fn set_field(&mut self, field: SettingsField, discord_id: u64) {
		let value = Some(database_id_from_discord_id(discord_id));
		match field {
			SettingsField::RequestChannel => self.request_channel_id = value,
			SettingsField::TicketCategory => self.ticket_category_id = value,
			SettingsField::MiddlemanRole => self.middleman_role_id = value,
			SettingsField::LogChannel => self.log_channel_id = value,
			SettingsField::ProtectedClientRole => self.protected_client_role_id = value,
			SettingsField::ProtectedMembersRole => self.protected_members_role_id = value,
		}
	}
}

/// One configurable field of [GuildSettings]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SettingsField {
	RequestChannel,
	TicketCategory,
	MiddlemanRole,
	LogChannel,
	ProtectedClientRole,
	ProtectedMembersRole,
}

impl SettingsField {
	/// Every field, in setup argument order
	pub const ALL: [Self; 6] = [
		Self::RequestChannel,
		Self::TicketCategory,
		Self::MiddlemanRole,
		Self::LogChannel,
		Self::ProtectedClientRole,
		Self::ProtectedMembersRole,
	];

	pub fn name(&self) -> &'static str {
		match self {
			Self::RequestChannel => "request_channel",
			Self::TicketCategory => "ticket_category",
			Self::MiddlemanRole => "mm_role",
			Self::LogChannel => "log_channel",
			Self::ProtectedClientRole => "client_role",
			Self::ProtectedMembersRole => "members_role",
		}
	}

	pub fn from_name(name: &str) -> Option<Self> {
		Self::ALL
			.into_iter()
			.find(|field| field.name().eq_ignore_ascii_case(name))
	}
}

/// Guild settings with every field present, converted to Discord-facing IDs
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CompleteSettings {
	pub guild: Id<GuildMarker>,
	pub request_channel: Id<ChannelMarker>,
	pub ticket_category: Id<ChannelMarker>,
	pub middleman_role: Id<RoleMarker>,
	pub log_channel: Id<ChannelMarker>,
	pub protected_roles: [Id<RoleMarker>; 2],
}

impl CompleteSettings {
	pub fn is_protected(&self, role: Id<RoleMarker>) -> bool {
		self.protected_roles.contains(&role)
	}
}

/// The database representation of a middleman ticket, bound to the channel created for it
#[derive(Clone, Debug, Insertable, PartialEq, Queryable)]
#[diesel(table_name = tickets)]
pub struct Ticket {
	/// The ID of the channel the ticket lives in.
	///
	/// To get a Discord-facing version of this more easily, use [Self::get_channel].
	pub ticket_channel_id: i64,
	/// The ID of the guild the ticket is in.
	///
	/// To get a Discord-facing version of this more easily, use [Self::get_guild].
	pub guild_id: i64,
	/// The ID of the user who opened the ticket.
	///
	/// To get a Discord-facing version of this more easily, use [Self::get_owner].
	pub owner_id: i64,
	/// The ID of the other trader, if one was given or added.
	///
	/// To get a Discord-facing version of this more easily, use [Self::get_other].
	pub other_id: Option<i64>,
	/// The key of the trade value tier the ticket was opened from.
	pub tier_key: String,
	/// The tip offered to the middleman, as entered
	pub tip: String,
	/// The side of the trade the owner is on
	pub side: String,
	/// The trade details, as entered
	pub details: String,
	/// The ID of the middleman currently handling the ticket.
	///
	/// To get a Discord-facing version of this more easily, use [Self::get_claimant].
	pub claimed_by: Option<i64>,
	/// When the ticket was opened, in milliseconds since the Unix epoch
	pub created_at: i64,
	/// When the ticket was closed, in milliseconds since the Unix epoch
	pub closed_at: Option<i64>,
}

impl Ticket {
	/// The channel the ticket lives in.
	///
	/// For the raw database representation, use [Self::ticket_channel_id].
	pub fn get_channel(&self) -> Id<ChannelMarker> {
		Id::new(discord_id_from_database_id(self.ticket_channel_id))
	}

	/// The guild the ticket is in.
	///
	/// For the raw database representation, use [Self::guild_id].
	pub fn get_guild(&self) -> Id<GuildMarker> {
		Id::new(discord_id_from_database_id(self.guild_id))
	}

	/// The user who opened the ticket.
	///
	/// For the raw database representation, use [Self::owner_id].
	pub fn get_owner(&self) -> Id<UserMarker> {
		Id::new(discord_id_from_database_id(self.owner_id))
	}

	/// The other trader in the ticket, if known.
	///
	/// For the raw database representation, use [Self::other_id].
	pub fn get_other(&self) -> Option<Id<UserMarker>> {
		optional_discord_id(self.other_id)
	}

	/// The middleman handling the ticket, if it's claimed.
	///
	/// For the raw database representation, use [Self::claimed_by].
	pub fn get_claimant(&self) -> Option<Id<UserMarker>> {
		optional_discord_id(self.claimed_by)
	}

	pub fn get_created_at(&self) -> Option<DateTime<Utc>> {
		datetime_from_millis(self.created_at)
	}

	pub fn get_closed_at(&self) -> Option<DateTime<Utc>> {
		self.closed_at.and_then(datetime_from_millis)
	}

	pub fn state(&self) -> TicketState {
		if self.closed_at.is_some() {
			return TicketState::Closed;
		}
		match self.get_claimant() {
			Some(claimant) => TicketState::Claimed(claimant),
			None => TicketState::Unclaimed,
		}
	}
}

/// Where a ticket is in its lifecycle
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TicketState {
	Unclaimed,
	Claimed(Id<UserMarker>),
	Closed,
}

/// A user added to a ticket channel after it was opened
#[derive(Clone, Debug, Insertable, PartialEq, Queryable)]
#[diesel(table_name = ticket_participants)]
pub struct TicketParticipant {
	pub ticket_channel_id: i64,
	pub user_id: i64,
}

/// The database representation of an active trip
#[derive(Clone, Debug, Insertable, PartialEq, Queryable)]
#[diesel(table_name = trips)]
pub struct Trip {
	/// The ID of the guild in which the trip was started.
	///
	/// To get a Discord-facing version of this more easily, use [Self::get_guild].
	pub guild_id: i64,
	/// The ID of the user on the trip.
	///
	/// To get a Discord-facing version of this more easily, use [Self::get_user].
	pub user_id: i64,
	/// When the trip ends, in milliseconds since the Unix epoch
	pub end_at: i64,
	/// JSON list of the role IDs the user had when the trip started.
	///
	/// To get the parsed list, use [Self::get_saved_roles].
	pub saved_roles: String,
}

impl Trip {
	pub fn new(
		guild: Id<GuildMarker>,
		user: Id<UserMarker>,
		end_at: DateTime<Utc>,
		saved_roles: &[Id<RoleMarker>],
	) -> Result<Self, serde_json::Error> {
		Ok(Self {
			guild_id: database_id_from_discord_id(guild.get()),
			user_id: database_id_from_discord_id(user.get()),
			end_at: end_at.timestamp_millis(),
			saved_roles: serde_json::to_string(saved_roles)?,
		})
	}

	pub fn get_guild(&self) -> Id<GuildMarker> {
		Id::new(discord_id_from_database_id(self.guild_id))
	}

	pub fn get_user(&self) -> Id<UserMarker> {
		Id::new(discord_id_from_database_id(self.user_id))
	}

	/// When the trip ends. Values that can't be represented are treated as already past.
	pub fn get_end_at(&self) -> DateTime<Utc> {
		datetime_from_millis(self.end_at).unwrap_or(DateTime::<Utc>::MIN_UTC)
	}

	pub fn get_saved_roles(&self) -> Result<Vec<Id<RoleMarker>>, serde_json::Error> {
		if self.saved_roles.is_empty() {
			return Ok(Vec::new());
		}
		serde_json::from_str(&self.saved_roles)
	}
}

/// Converts an ID used with Discord (unsigned) to an ID for database use (signed)
pub fn database_id_from_discord_id(discord_id: u64) -> i64 {
	discord_id as i64
}

/// Converts an ID retrieved from the database (signed) to an ID for use with Discord (unsigned)
pub fn discord_id_from_database_id(database_id: i64) -> u64 {
	database_id as u64
}

fn optional_discord_id<T>(database_id: Option<i64>) -> Option<Id<T>> {
	database_id.and_then(|id| Id::new_checked(discord_id_from_database_id(id)))
}

/// Gets the [DateTime] for a millisecond Unix timestamp. If the conversion fails, returns `None`.
pub fn datetime_from_millis(millis: i64) -> Option<DateTime<Utc>> {
	Utc.timestamp_millis_opt(millis).single()
}
