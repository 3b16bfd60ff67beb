// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Trips: a member temporarily gives up every role except the protected ones, and gets them back when the trip ends.
//!
//! The trips table is the source of truth. Every stored trip has a timer armed in [TripTimers], and the timers are
//! rebuilt from the table by [Trips::reconcile_on_startup].

pub mod duration;
pub mod timers;

use crate::access::{authorize, has_permission, require_settings};
use crate::audit::log_to_guild;
use crate::error::{CoreError, PlatformError, StorageError};
use crate::model::{CompleteSettings, GuildSettings, Trip};
use crate::platform::Platform;
use crate::roles::{protected_subset, restoration_roles, snapshot_roles};
use crate::store::Store;
use chrono::{DateTime, Utc};
use duration::{DurationError, parse_trip_duration};
use humantime::format_duration;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use timers::TripTimers;
use twilight_model::guild::Permissions;
use twilight_model::id::Id;
use twilight_model::id::marker::{GuildMarker, RoleMarker, UserMarker};

/// How long to wait before trying again when roles couldn't be given back at the end of a trip
pub const RESTORE_RETRY_DELAY: Duration = Duration::from_secs(5 * 60);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TripStarted {
	pub duration: Duration,
	pub ends_at: DateTime<Utc>,
}

/// What happened when a trip ran out
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TripExpiry {
	/// Roles were given back and the trip was removed
	Restored,
	/// The member left the server; the trip was removed without restoring anything
	MemberGone,
	/// There was no stored trip to end
	NoTrip,
	/// The server couldn't be reached or isn't set up; the trip was left in place
	Skipped,
	/// Restoring failed; the trip was left in place and will be tried again
	RetryScheduled,
}

pub struct Trips {
	store: Store,
	platform: Arc<dyn Platform>,
	timers: TripTimers,
}

impl Trips {
	pub fn new(store: Store, platform: Arc<dyn Platform>) -> Arc<Self> {
		Arc::new(Self {
			store,
			platform,
			timers: TripTimers::new(),
		})
	}

	pub fn timers(&self) -> &TripTimers {
		&self.timers
	}

	/// Sends the member on a trip for the duration described by `input`. Only middlemen and administrators can go on
	/// trips.
	///
	/// A member who's already on a trip has their trip replaced, including the saved roles.
	pub async fn start(
		self: &Arc<Self>,
		guild: Id<GuildMarker>,
		user: Id<UserMarker>,
		input: &str,
	) -> Result<TripStarted, CoreError> {
		let duration = parse_trip_duration(input)?;
		let settings = require_settings(&self.store, guild)?;
		authorize(self.platform.as_ref(), &settings, user).await?;

		let bot_capabilities = self
			.platform
			.member_capabilities(guild, self.platform.bot_user())
			.await?;
		if !has_permission(&bot_capabilities, Permissions::MANAGE_ROLES) {
			return Err(CoreError::MissingBotPermission);
		}

		let Some(member) = self.platform.fetch_member(guild, user).await? else {
			return Err(CoreError::TargetNotResolved {
				input: user.to_string(),
			});
		};
		let Some(existing_roles) = self.platform.guild_roles(guild).await? else {
			return Err(CoreError::External(PlatformError::bare("fetch guild roles")));
		};

		let snapshot = snapshot_roles(guild, &member.roles);
		let kept = protected_subset(&settings, &snapshot, &existing_roles);
		let length = chrono::Duration::from_std(duration).map_err(|_| DurationError::TooLong)?;
		let ends_at = Utc::now() + length;

		let previous = self.store.trip(guild, user)?;
		let trip = Trip::new(guild, user, ends_at, &snapshot).map_err(StorageError::from)?;
		self.store.upsert_trip(&trip)?;

		if let Err(error) = self
			.platform
			.set_member_roles(guild, user, &kept, "Trip started (keep protected roles)")
			.await
		{
			self.roll_back_start(guild, user, previous);
			return Err(error.into());
		}

		self.arm(guild, user, ends_at);
		tracing::info!(%guild, %user, %ends_at, "Trip started");
		log_to_guild(
			self.platform.as_ref(),
			&settings,
			&format!("🧳 Trip started by <@{}> for {}", user, format_duration(duration)),
		)
		.await;

		Ok(TripStarted { duration, ends_at })
	}

	/// Puts the stored trip back the way it was before a start that couldn't strip the member's roles
	fn roll_back_start(&self, guild: Id<GuildMarker>, user: Id<UserMarker>, previous: Option<Trip>) {
		let result = match previous {
			Some(previous) => self.store.upsert_trip(&previous),
			None => self.store.delete_trip(guild, user).map(|_| ()),
		};
		if let Err(error) = result {
			tracing::error!(source = ?error, %guild, %user, "Failed to roll back a trip that couldn't start");
		}
	}

	/// Ends the member's trip early and gives their roles back
	pub async fn cancel(&self, guild: Id<GuildMarker>, user: Id<UserMarker>) -> Result<(), CoreError> {
		let settings = require_settings(&self.store, guild)?;
		let Some(trip) = self.store.trip(guild, user)? else {
			return Err(CoreError::NoActiveTrip);
		};
		let Some(existing_roles) = self.platform.guild_roles(guild).await? else {
			return Err(CoreError::External(PlatformError::bare("fetch guild roles")));
		};

		self.restore(&settings, &trip, &existing_roles, "Trip canceled (restore roles)")
			.await?;
		self.store.delete_trip(guild, user)?;
		self.timers.disarm((guild, user));

		tracing::info!(%guild, %user, "Trip canceled");
		log_to_guild(
			self.platform.as_ref(),
			&settings,
			&format!("🧳 Trip canceled — restored roles for <@{}>", user),
		)
		.await;
		Ok(())
	}

	/// Ends the member's trip because its time ran out.
	///
	/// Failing to give roles back leaves the trip stored and schedules another attempt after [RESTORE_RETRY_DELAY].
	/// A server that can't be reached or isn't set up leaves the trip stored with no timer; it's picked up again by
	/// [Self::reconcile_on_startup].
	pub async fn expire(self: &Arc<Self>, guild: Id<GuildMarker>, user: Id<UserMarker>) -> Result<TripExpiry, CoreError> {
		self.timers.disarm((guild, user));

		let existing_roles = match self.platform.guild_roles(guild).await {
			Ok(Some(roles)) => roles,
			Ok(None) => {
				tracing::debug!(%guild, %user, "Server unavailable; leaving trip in place");
				return Ok(TripExpiry::Skipped);
			}
			Err(error) => {
				tracing::warn!(source = ?error, %guild, %user, "Couldn't load server roles to end a trip");
				self.schedule_retry(guild, user);
				return Ok(TripExpiry::RetryScheduled);
			}
		};
		let Some(settings) = self.store.guild_settings(guild)?.as_ref().and_then(GuildSettings::complete) else {
			tracing::debug!(%guild, %user, "Server setup incomplete; leaving trip in place");
			return Ok(TripExpiry::Skipped);
		};
		let Some(trip) = self.store.trip(guild, user)? else {
			return Ok(TripExpiry::NoTrip);
		};

		let member = match self.platform.fetch_member(guild, user).await {
			Ok(member) => member,
			Err(error) => {
				tracing::warn!(source = ?error, %guild, %user, "Couldn't fetch member to end a trip");
				self.schedule_retry(guild, user);
				return Ok(TripExpiry::RetryScheduled);
			}
		};
		if member.is_none() {
			self.store.delete_trip(guild, user)?;
			tracing::info!(%guild, %user, "Member left during their trip; dropped it");
			return Ok(TripExpiry::MemberGone);
		}

		if let Err(error) = self
			.restore(&settings, &trip, &existing_roles, "Trip ended (restore roles)")
			.await
		{
			tracing::warn!(source = ?error, %guild, %user, "Couldn't restore roles at the end of a trip");
			self.schedule_retry(guild, user);
			return Ok(TripExpiry::RetryScheduled);
		}
		self.store.delete_trip(guild, user)?;

		tracing::info!(%guild, %user, "Trip ended");
		log_to_guild(
			self.platform.as_ref(),
			&settings,
			&format!("✅ Trip ended — restored roles for <@{}>", user),
		)
		.await;
		Ok(TripExpiry::Restored)
	}

	/// Arms a timer for every stored trip. Trips that ended while the bot was down end right away.
	pub fn reconcile_on_startup(self: &Arc<Self>) -> Result<usize, CoreError> {
		let stored_trips = self.store.all_trips()?;
		for trip in stored_trips.iter() {
			self.arm(trip.get_guild(), trip.get_user(), trip.get_end_at());
		}
		tracing::info!(count = stored_trips.len(), "Re-armed trip timers");
		Ok(stored_trips.len())
	}

	/// Lists the server's active trips, soonest to end first
	pub fn list(&self, guild: Id<GuildMarker>) -> Result<Vec<Trip>, CoreError> {
		require_settings(&self.store, guild)?;
		Ok(self.store.guild_trips(guild)?)
	}

	async fn restore(
		&self,
		settings: &CompleteSettings,
		trip: &Trip,
		existing_roles: &HashSet<Id<RoleMarker>>,
		reason: &str,
	) -> Result<(), CoreError> {
		let saved_roles = trip.get_saved_roles().map_err(StorageError::from)?;
		let restored = restoration_roles(settings, &saved_roles, existing_roles);
		self.platform
			.set_member_roles(trip.get_guild(), trip.get_user(), &restored, reason)
			.await?;
		Ok(())
	}

	fn arm(self: &Arc<Self>, guild: Id<GuildMarker>, user: Id<UserMarker>, fire_at: DateTime<Utc>) {
		let trips = Arc::clone(self);
		self.timers.arm((guild, user), fire_at, async move {
			if let Err(error) = trips.expire(guild, user).await {
				tracing::error!(source = ?error, %guild, %user, "Failed to end trip");
			}
		});
	}

	fn schedule_retry(self: &Arc<Self>, guild: Id<GuildMarker>, user: Id<UserMarker>) {
		let retry_at = Utc::now() + chrono::Duration::from_std(RESTORE_RETRY_DELAY).unwrap_or(chrono::Duration::zero());
		self.arm(guild, user, retry_at);
	}
}
