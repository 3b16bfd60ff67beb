// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::database::DbPool;
use crate::error::StorageError;
use crate::model::{GuildSettings, Ticket, TicketParticipant, Trip, database_id_from_discord_id, discord_id_from_database_id};
use crate::schema::{guild_settings, ticket_participants, tickets, trips};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, UserMarker};

type Connection = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Durable storage for guild settings, tickets, and trips.
///
/// Each method is a single statement (or a read), so each write is atomic on its own.
#[derive(Clone)]
pub struct Store {
	pool: DbPool,
}

impl Store {
	pub fn new(pool: DbPool) -> Self {
		Self { pool }
	}

	fn connection(&self) -> Result<Connection, StorageError> {
		Ok(self.pool.get()?)
	}

	pub fn guild_settings(&self, guild: Id<GuildMarker>) -> Result<Option<GuildSettings>, StorageError> {
		let mut db_connection = self.connection()?;
		let settings = guild_settings::table
			.find(database_id_from_discord_id(guild.get()))
			.first(&mut db_connection)
			.optional()?;
		Ok(settings)
	}

	pub fn upsert_guild_settings(&self, settings: &GuildSettings) -> Result<(), StorageError> {
		let mut db_connection = self.connection()?;
		diesel::insert_into(guild_settings::table)
			.values(settings)
			.on_conflict(guild_settings::guild_id)
			.do_update()
			.set(settings)
			.execute(&mut db_connection)?;
		Ok(())
	}

	pub fn insert_ticket(&self, ticket: &Ticket) -> Result<(), StorageError> {
		let mut db_connection = self.connection()?;
		diesel::insert_into(tickets::table)
			.values(ticket)
			.execute(&mut db_connection)?;
		Ok(())
	}

	pub fn ticket(&self, channel: Id<ChannelMarker>) -> Result<Option<Ticket>, StorageError> {
		let mut db_connection = self.connection()?;
		let ticket = tickets::table
			.find(database_id_from_discord_id(channel.get()))
			.first(&mut db_connection)
			.optional()?;
		Ok(ticket)
	}

	/// Sets (or clears) the claimant of an open ticket. Returns `false` if the ticket doesn't exist or is closed.
	pub fn set_ticket_claimant(
		&self,
		channel: Id<ChannelMarker>,
		claimant: Option<Id<UserMarker>>,
	) -> Result<bool, StorageError> {
		let mut db_connection = self.connection()?;
		let db_claimant = claimant.map(|user| database_id_from_discord_id(user.get()));
		let updated = diesel::update(tickets::table)
			.filter(tickets::ticket_channel_id.eq(database_id_from_discord_id(channel.get())))
			.filter(tickets::closed_at.is_null())
			.set(tickets::claimed_by.eq(db_claimant))
			.execute(&mut db_connection)?;
		Ok(updated > 0)
	}

	/// Sets the other trader of an open ticket if none is recorded yet. Returns whether a change was made.
	pub fn fill_ticket_counterparty(&self, channel: Id<ChannelMarker>, user: Id<UserMarker>) -> Result<bool, StorageError> {
		let mut db_connection = self.connection()?;
		let updated = diesel::update(tickets::table)
			.filter(tickets::ticket_channel_id.eq(database_id_from_discord_id(channel.get())))
			.filter(tickets::closed_at.is_null())
			.filter(tickets::other_id.is_null())
			.set(tickets::other_id.eq(database_id_from_discord_id(user.get())))
			.execute(&mut db_connection)?;
		Ok(updated > 0)
	}

	/// Stamps the closure time on an open ticket. Returns `false` if the ticket doesn't exist or was already closed.
	pub fn close_ticket(&self, channel: Id<ChannelMarker>, closed_at: DateTime<Utc>) -> Result<bool, StorageError> {
		let mut db_connection = self.connection()?;
		let updated = diesel::update(tickets::table)
			.filter(tickets::ticket_channel_id.eq(database_id_from_discord_id(channel.get())))
			.filter(tickets::closed_at.is_null())
			.set(tickets::closed_at.eq(Some(closed_at.timestamp_millis())))
			.execute(&mut db_connection)?;
		Ok(updated > 0)
	}

	/// Records a user added to the ticket. Returns `false` if they were already recorded.
	pub fn add_ticket_participant(&self, channel: Id<ChannelMarker>, user: Id<UserMarker>) -> Result<bool, StorageError> {
		let mut db_connection = self.connection()?;
		let participant = TicketParticipant {
			ticket_channel_id: database_id_from_discord_id(channel.get()),
			user_id: database_id_from_discord_id(user.get()),
		};
		let inserted = diesel::insert_into(ticket_participants::table)
			.values(participant)
			.on_conflict_do_nothing()
			.execute(&mut db_connection)?;
		Ok(inserted > 0)
	}

	pub fn remove_ticket_participant(&self, channel: Id<ChannelMarker>, user: Id<UserMarker>) -> Result<(), StorageError> {
		let mut db_connection = self.connection()?;
		diesel::delete(ticket_participants::table)
			.filter(ticket_participants::ticket_channel_id.eq(database_id_from_discord_id(channel.get())))
			.filter(ticket_participants::user_id.eq(database_id_from_discord_id(user.get())))
			.execute(&mut db_connection)?;
		Ok(())
	}

	pub fn ticket_participants(&self, channel: Id<ChannelMarker>) -> Result<Vec<Id<UserMarker>>, StorageError> {
		let mut db_connection = self.connection()?;
		let participants: Vec<i64> = ticket_participants::table
			.filter(ticket_participants::ticket_channel_id.eq(database_id_from_discord_id(channel.get())))
			.select(ticket_participants::user_id)
			.order(ticket_participants::user_id.asc())
			.load(&mut db_connection)?;
		Ok(participants
			.into_iter()
			.map(|id| Id::new(discord_id_from_database_id(id)))
			.collect())
	}

	/// Inserts the trip, replacing any existing trip for the same guild and user.
	pub fn upsert_trip(&self, trip: &Trip) -> Result<(), StorageError> {
		let mut db_connection = self.connection()?;
		diesel::insert_into(trips::table)
			.values(trip)
			.on_conflict((trips::guild_id, trips::user_id))
			.do_update()
			.set((trips::end_at.eq(trip.end_at), trips::saved_roles.eq(&trip.saved_roles)))
			.execute(&mut db_connection)?;
		Ok(())
	}

	pub fn trip(&self, guild: Id<GuildMarker>, user: Id<UserMarker>) -> Result<Option<Trip>, StorageError> {
		let mut db_connection = self.connection()?;
		let trip = trips::table
			.find((database_id_from_discord_id(guild.get()), database_id_from_discord_id(user.get())))
			.first(&mut db_connection)
			.optional()?;
		Ok(trip)
	}

	/// Deletes the trip. Returns whether there was one to delete.
	pub fn delete_trip(&self, guild: Id<GuildMarker>, user: Id<UserMarker>) -> Result<bool, StorageError> {
		let mut db_connection = self.connection()?;
		let deleted = diesel::delete(
			trips::table.find((database_id_from_discord_id(guild.get()), database_id_from_discord_id(user.get()))),
		)
		.execute(&mut db_connection)?;
		Ok(deleted > 0)
	}

	pub fn all_trips(&self) -> Result<Vec<Trip>, StorageError> {
		let mut db_connection = self.connection()?;
		let all_trips = trips::table.load(&mut db_connection)?;
		Ok(all_trips)
	}

	pub fn guild_trips(&self, guild: Id<GuildMarker>) -> Result<Vec<Trip>, StorageError> {
		let mut db_connection = self.connection()?;
		let guild_trips = trips::table
			.filter(trips::guild_id.eq(database_id_from_discord_id(guild.get())))
			.order(trips::end_at.asc())
			.load(&mut db_connection)?;
		Ok(guild_trips)
	}
}
