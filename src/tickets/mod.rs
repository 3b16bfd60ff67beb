// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The middleman ticket lifecycle: open, claim and unclaim, add users, close.
//!
//! A ticket is bound to the channel created for it. The stored claim state decides who can see that channel, and
//! every change to the claim state rewrites the channel's permission overwrites to match.

pub mod locks;
pub mod resolve;
pub mod tier;
pub mod visibility;

use crate::access::{authorize, require_settings};
use crate::audit::{log_to_guild, notify};
use crate::error::CoreError;
use crate::model::{CompleteSettings, Ticket, database_id_from_discord_id};
use crate::platform::{ChannelGrant, GrantTarget, NewTicketChannel, Platform};
use crate::store::Store;
use chrono::Utc;
use locks::TicketLocks;
use rand::Rng;
use resolve::{parse_explicit_user, resolve_counterparty};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tier::find_tier;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, UserMarker};
use visibility::{MEMBER_ACCESS, read_only_grants, ticket_grants};

/// Which side of the trade the ticket owner is on
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TradeSide {
	Buyer,
	Seller,
}

impl TradeSide {
	pub fn parse(input: &str) -> Result<Self, CoreError> {
		let input = input.trim();
		if input.eq_ignore_ascii_case("buyer") || input.eq_ignore_ascii_case("b") {
			Ok(Self::Buyer)
		} else if input.eq_ignore_ascii_case("seller") || input.eq_ignore_ascii_case("s") {
			Ok(Self::Seller)
		} else {
			Err(CoreError::InvalidSide(input.to_string()))
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Buyer => "Buyer",
			Self::Seller => "Seller",
		}
	}
}

impl fmt::Display for TradeSide {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

/// A request form submitted to open a ticket
#[derive(Clone, Debug)]
pub struct TicketRequest {
	pub guild: Id<GuildMarker>,
	pub owner: Id<UserMarker>,
	/// The other trader as entered: a mention, an ID, or a username
	pub counterparty: String,
	pub tier: String,
	pub details: String,
	pub side: String,
	pub tip: String,
}

pub struct Tickets {
	store: Store,
	platform: Arc<dyn Platform>,
	locks: TicketLocks,
	close_delay: Duration,
}

impl Tickets {
	pub fn new(store: Store, platform: Arc<dyn Platform>, close_delay: Duration) -> Self {
		Self {
			store,
			platform,
			locks: TicketLocks::default(),
			close_delay,
		}
	}

	/// How long a closed ticket's channel is kept before it's deleted
	pub fn close_delay(&self) -> Duration {
		self.close_delay
	}

	/// Fails unless the channel is one of the guild's tickets and the actor may act on tickets
	pub async fn check_actor(
		&self,
		guild: Id<GuildMarker>,
		channel: Id<ChannelMarker>,
		actor: Id<UserMarker>,
	) -> Result<(), CoreError> {
		self.authorized_settings(guild, channel, actor).await.map(|_| ())
	}

	/// Gets the ticket bound to a channel, if there is one
	pub fn find(&self, channel: Id<ChannelMarker>) -> Result<Option<Ticket>, CoreError> {
		Ok(self.store.ticket(channel)?)
	}

	/// Creates a ticket channel for the request and records the ticket.
	///
	/// Anyone in a set-up server can open a ticket. The ticket is only stored once its channel exists.
	pub async fn open(&self, request: TicketRequest) -> Result<Ticket, CoreError> {
		let settings = require_settings(&self.store, request.guild)?;
		let tier = find_tier(request.tier.trim()).ok_or_else(|| CoreError::InvalidTier(request.tier.clone()))?;
		let side = TradeSide::parse(&request.side)?;

		let Some(owner) = self.platform.fetch_member(request.guild, request.owner).await? else {
			return Err(CoreError::TargetNotResolved {
				input: request.owner.to_string(),
			});
		};
		let other = resolve_counterparty(self.platform.as_ref(), request.guild, &request.counterparty).await;

		let mut ticket = Ticket {
			ticket_channel_id: 0,
			guild_id: database_id_from_discord_id(request.guild.get()),
			owner_id: database_id_from_discord_id(owner.id.get()),
			other_id: other.map(|user| database_id_from_discord_id(user.get())),
			tier_key: tier.key.to_string(),
			tip: request.tip.trim().to_string(),
			side: side.to_string(),
			details: request.details.trim().to_string(),
			claimed_by: None,
			created_at: Utc::now().timestamp_millis(),
			closed_at: None,
		};

		let name = ticket_channel_name(&owner.username, rand::thread_rng().gen_range(1000..10000));
		let grants = ticket_grants(&settings, &ticket, &[], self.platform.bot_user());
		let channel = self
			.platform
			.create_ticket_channel(NewTicketChannel {
				guild: request.guild,
				category: settings.ticket_category,
				name: &name,
				grants: &grants,
			})
			.await
			.map_err(CoreError::ProvisioningFailed)?;
		ticket.ticket_channel_id = database_id_from_discord_id(channel.get());

		if let Err(error) = self.store.insert_ticket(&ticket) {
			if let Err(cleanup_error) = self.platform.delete_channel(channel, "MM ticket couldn't be saved").await {
				tracing::warn!(source = ?cleanup_error, %channel, "Failed to remove channel for unsaved ticket");
			}
			return Err(error.into());
		}

		tracing::info!(guild = %request.guild, %channel, owner = %owner.id, tier = tier.key, "Opened ticket");
		if let Err(error) = self
			.platform
			.send_ticket_summary(&ticket, Some(settings.middleman_role))
			.await
		{
			tracing::warn!(source = ?error, %channel, "Failed to post ticket summary");
		}
		log_to_guild(
			self.platform.as_ref(),
			&settings,
			&format!(
				"📨 Ticket <#{}> opened by <@{}> ({})",
				channel, owner.id, tier.label
			),
		)
		.await;

		Ok(ticket)
	}

	/// Assigns the ticket to the actor and locks the channel down to the people in the trade.
	///
	/// Claiming an already-claimed ticket takes it over from the previous claimant.
	pub async fn claim(
		&self,
		guild: Id<GuildMarker>,
		channel: Id<ChannelMarker>,
		actor: Id<UserMarker>,
	) -> Result<Ticket, CoreError> {
		let settings = self.authorized_settings(guild, channel, actor).await?;
		let _guard = self.locks.lock(channel).await;
		let ticket = self.open_ticket(guild, channel)?;

		let claimed = self.change_claimant(&settings, ticket, Some(actor)).await?;
		tracing::info!(%guild, %channel, claimant = %actor, "Ticket claimed");
		notify(
			self.platform.as_ref(),
			channel,
			&format!("✅ <@{}> claimed this ticket.", actor),
		)
		.await;
		log_to_guild(
			self.platform.as_ref(),
			&settings,
			&format!("🧑‍⚖️ <@{}> claimed ticket <#{}>", actor, channel),
		)
		.await;
		Ok(claimed)
	}

	/// Releases the ticket and opens the channel back up to every middleman
	pub async fn unclaim(
		&self,
		guild: Id<GuildMarker>,
		channel: Id<ChannelMarker>,
		actor: Id<UserMarker>,
	) -> Result<Ticket, CoreError> {
		let settings = self.authorized_settings(guild, channel, actor).await?;
		let _guard = self.locks.lock(channel).await;
		let ticket = self.open_ticket(guild, channel)?;

		let unclaimed = self.change_claimant(&settings, ticket, None).await?;
		tracing::info!(%guild, %channel, user = %actor, "Ticket unclaimed");
		notify(self.platform.as_ref(), channel, "🔓 Ticket unclaimed.").await;
		log_to_guild(
			self.platform.as_ref(),
			&settings,
			&format!("🔓 <@{}> unclaimed ticket <#{}>", actor, channel),
		)
		.await;
		Ok(unclaimed)
	}

	/// Lets another user into the ticket. Only mentions and IDs are accepted, never usernames.
	///
	/// The user is remembered so they keep access through claims, and becomes the ticket's other trader if it
	/// didn't have one yet.
	pub async fn add_user(
		&self,
		guild: Id<GuildMarker>,
		channel: Id<ChannelMarker>,
		actor: Id<UserMarker>,
		input: &str,
	) -> Result<Id<UserMarker>, CoreError> {
		let settings = self.authorized_settings(guild, channel, actor).await?;
		let Some(user) = parse_explicit_user(input) else {
			return Err(CoreError::TargetNotResolved {
				input: input.trim().to_string(),
			});
		};
		let _guard = self.locks.lock(channel).await;
		self.open_ticket(guild, channel)?;

		let newly_added = self.store.add_ticket_participant(channel, user)?;
		let grant = ChannelGrant::allow(GrantTarget::Member(user), MEMBER_ACCESS);
		if let Err(error) = self.platform.set_channel_grant(channel, grant).await {
			if newly_added {
				if let Err(revert_error) = self.store.remove_ticket_participant(channel, user) {
					tracing::error!(source = ?revert_error, %channel, %user, "Failed to forget participant after permission update failed");
				}
			}
			return Err(error.into());
		}
		let became_counterparty = self.store.fill_ticket_counterparty(channel, user)?;

		tracing::info!(%guild, %channel, %user, became_counterparty, "Added user to ticket");
		log_to_guild(
			self.platform.as_ref(),
			&settings,
			&format!("➕ <@{}> added <@{}> to ticket <#{}>", actor, user, channel),
		)
		.await;
		Ok(user)
	}

	/// Marks the ticket closed and deletes its channel after the configured delay.
	///
	/// The channel is made read-only before the ticket is marked closed, so a channel whose deletion fails stays
	/// locked.
	pub async fn close(
		&self,
		guild: Id<GuildMarker>,
		channel: Id<ChannelMarker>,
		actor: Id<UserMarker>,
	) -> Result<Ticket, CoreError> {
		let settings = self.authorized_settings(guild, channel, actor).await?;
		let guard = self.locks.lock(channel).await;
		let ticket = self.open_ticket(guild, channel)?;

		let bot = self.platform.bot_user();
		let participants = self.store.ticket_participants(channel)?;
		let open_grants = ticket_grants(&settings, &ticket, &participants, bot);
		self.platform
			.replace_channel_grants(channel, &read_only_grants(&open_grants, bot))
			.await?;

		let closed_at = Utc::now();
		let stamped = self.store.close_ticket(channel, closed_at);
		if !matches!(stamped, Ok(true)) {
			if let Err(revert_error) = self.platform.replace_channel_grants(channel, &open_grants).await {
				tracing::error!(source = ?revert_error, %channel, "Failed to unlock channel after closing the ticket failed");
			}
			stamped?;
			return Err(CoreError::TicketClosed);
		}
		drop(guard);
		self.locks.forget(channel);

		let closed = Ticket {
			closed_at: Some(closed_at.timestamp_millis()),
			..ticket
		};
		tracing::info!(%guild, %channel, user = %actor, "Ticket closed");
		if let Err(error) = self.platform.send_ticket_summary(&closed, None).await {
			tracing::warn!(source = ?error, %channel, "Failed to post closed ticket summary");
		}
		log_to_guild(
			self.platform.as_ref(),
			&settings,
			&format!("🗑️ Ticket <#{}> closed by <@{}>", channel, actor),
		)
		.await;

		let platform = Arc::clone(&self.platform);
		let delay = self.close_delay;
		tokio::spawn(async move {
			tokio::time::sleep(delay).await;
			if let Err(error) = platform.delete_channel(channel, "MM ticket closed").await {
				tracing::warn!(source = ?error, %channel, "Failed to delete closed ticket channel; it stays read-only");
			}
		});

		Ok(closed)
	}

	/// Checks setup, that the channel is a ticket, and that the actor may act on tickets
	async fn authorized_settings(
		&self,
		guild: Id<GuildMarker>,
		channel: Id<ChannelMarker>,
		actor: Id<UserMarker>,
	) -> Result<CompleteSettings, CoreError> {
		let settings = require_settings(&self.store, guild)?;
		match self.store.ticket(channel)? {
			Some(ticket) if ticket.get_guild() == guild => (),
			_ => return Err(CoreError::NotATicket),
		}
		authorize(self.platform.as_ref(), &settings, actor).await?;
		Ok(settings)
	}

	/// Loads the ticket, failing if it's been closed. Call with the ticket's lock held.
	fn open_ticket(&self, guild: Id<GuildMarker>, channel: Id<ChannelMarker>) -> Result<Ticket, CoreError> {
		let ticket = self
			.store
			.ticket(channel)?
			.filter(|ticket| ticket.get_guild() == guild)
			.ok_or(CoreError::NotATicket)?;
		if ticket.closed_at.is_some() {
			return Err(CoreError::TicketClosed);
		}
		Ok(ticket)
	}

	/// Stores the new claimant, then rewrites the channel's overwrites to match. If the overwrites can't be
	/// written, the stored claimant is put back.
	async fn change_claimant(
		&self,
		settings: &CompleteSettings,
		ticket: Ticket,
		claimant: Option<Id<UserMarker>>,
	) -> Result<Ticket, CoreError> {
		let channel = ticket.get_channel();
		let previous = ticket.get_claimant();
		if !self.store.set_ticket_claimant(channel, claimant)? {
			return Err(CoreError::TicketClosed);
		}
		let updated = Ticket {
			claimed_by: claimant.map(|user| database_id_from_discord_id(user.get())),
			..ticket
		};

		let participants = self.store.ticket_participants(channel)?;
		let grants = ticket_grants(settings, &updated, &participants, self.platform.bot_user());
		if let Err(error) = self.platform.replace_channel_grants(channel, &grants).await {
			if let Err(revert_error) = self.store.set_ticket_claimant(channel, previous) {
				tracing::error!(source = ?revert_error, %channel, "Failed to revert claimant after permission update failed");
			}
			return Err(error.into());
		}
		Ok(updated)
	}
}

/// Builds a channel name like `ticket-alice1234` from the owner's username
pub fn ticket_channel_name(username: &str, suffix: u16) -> String {
	let mut base: String = username
		.chars()
		.filter(char::is_ascii_alphanumeric)
		.map(|c| c.to_ascii_lowercase())
		.collect();
	if base.is_empty() {
		base.push_str("user");
	}
	format!("ticket-{}{}", base, suffix)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::store::tests::memory_store;
	use crate::testing::{CATEGORY, FakePlatform, GUILD, LOG_CHANNEL, MM_ROLE, configure_guild};
	use twilight_model::guild::Permissions;
	use visibility::members_with_access;

	const TRADER: Id<UserMarker> = Id::new(11);
	const OTHER_TRADER: Id<UserMarker> = Id::new(123456789012345678);
	const MIDDLEMAN: Id<UserMarker> = Id::new(50);
	const BYSTANDER: Id<UserMarker> = Id::new(60);

	fn service() -> (Tickets, Arc<FakePlatform>, Store) {
		let store = memory_store();
		configure_guild(&store);
		let platform = Arc::new(FakePlatform::new());
		platform.add_member(TRADER, "Alice_Trades", &[]);
		platform.add_member(OTHER_TRADER, "bob", &[]);
		platform.add_member(MIDDLEMAN, "mm", &[MM_ROLE]);
		platform.add_member(BYSTANDER, "bystander", &[]);
		let dyn_platform: Arc<dyn Platform> = platform.clone();
		let tickets = Tickets::new(store.clone(), dyn_platform, Duration::from_secs(3));
		(tickets, platform, store)
	}

	fn request(counterparty: &str) -> TicketRequest {
		TicketRequest {
			guild: GUILD,
			owner: TRADER,
			counterparty: counterparty.to_string(),
			tier: String::from("t1"),
			details: String::from("  my pet for your pet "),
			side: String::from("buyer"),
			tip: String::from("20m"),
		}
	}

	#[tokio::test]
	async fn opening_creates_channel_then_ticket() {
		let (tickets, platform, store) = service();
		let ticket = tickets.open(request("<@123456789012345678>")).await.unwrap();
		let channel = ticket.get_channel();

		let stored = store.ticket(channel).unwrap().expect("ticket stored");
		assert_eq!(stored, ticket);
		assert_eq!(stored.tier_key, "t1");
		assert_eq!(stored.get_owner(), TRADER);
		assert_eq!(stored.get_other(), Some(OTHER_TRADER));
		assert_eq!(stored.claimed_by, None);
		assert_eq!(stored.closed_at, None);
		assert_eq!(stored.side, "Buyer");
		assert_eq!(stored.details, "my pet for your pet");

		let state = platform.state();
		let (name, created) = &state.created_channels[0];
		assert_eq!(*created, channel);
		assert!(name.starts_with("ticket-alicetrades"));
		assert_eq!(name.len(), "ticket-alicetrades".len() + 4);
		assert_eq!(state.summaries[0], (ticket.clone(), Some(MM_ROLE)));
		drop(state);

		let grants = platform.grants(channel);
		assert!(grants.contains(&ChannelGrant::allow(
			GrantTarget::Role(MM_ROLE),
			visibility::MIDDLEMAN_ACCESS
		)));
		assert_eq!(
			members_with_access(&grants),
			vec![TRADER, OTHER_TRADER, crate::testing::BOT]
		);
		assert_eq!(platform.messages_in(LOG_CHANNEL).len(), 1);
	}

	#[tokio::test]
	async fn counterparty_can_be_found_by_username() {
		let (tickets, _platform, _store) = service();
		let ticket = tickets.open(request("BOB")).await.unwrap();
		assert_eq!(ticket.get_other(), Some(OTHER_TRADER));

		let ticket = tickets.open(request("nobody here")).await.unwrap();
		assert_eq!(ticket.get_other(), None);
	}

	#[tokio::test]
	async fn invalid_requests_create_nothing() {
		let (tickets, platform, _store) = service();

		let mut bad_tier = request("bob");
		bad_tier.tier = String::from("t9");
		assert!(matches!(tickets.open(bad_tier).await, Err(CoreError::InvalidTier(tier)) if tier == "t9"));

		let mut bad_side = request("bob");
		bad_side.side = String::from("middle");
		assert!(matches!(tickets.open(bad_side).await, Err(CoreError::InvalidSide(_))));

		let mut unconfigured = request("bob");
		unconfigured.guild = Id::new(77);
		assert!(matches!(tickets.open(unconfigured).await, Err(CoreError::ConfigIncomplete)));

		assert!(platform.state().created_channels.is_empty());
	}

	#[tokio::test]
	async fn failed_provisioning_stores_nothing() {
		let (tickets, platform, _store) = service();
		platform.state().fail_channel_create = true;

		assert!(matches!(
			tickets.open(request("bob")).await,
			Err(CoreError::ProvisioningFailed(_))
		));
		let state = platform.state();
		assert!(state.summaries.is_empty());
		assert!(state.messages.is_empty());
	}

	#[tokio::test]
	async fn claiming_locks_the_channel_to_the_trade() {
		let (tickets, platform, store) = service();
		let channel = tickets.open(request("<@123456789012345678>")).await.unwrap().get_channel();

		let claimed = tickets.claim(GUILD, channel, MIDDLEMAN).await.unwrap();
		assert_eq!(claimed.get_claimant(), Some(MIDDLEMAN));
		assert_eq!(store.ticket(channel).unwrap().unwrap().claimed_by, Some(50));

		let grants = platform.grants(channel);
		assert_eq!(
			members_with_access(&grants),
			vec![TRADER, OTHER_TRADER, MIDDLEMAN, crate::testing::BOT]
		);
		let middleman_grant = grants
			.iter()
			.find(|grant| grant.target == GrantTarget::Role(MM_ROLE))
			.expect("middleman role grant");
		assert!(middleman_grant.deny.contains(Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES));
		assert_eq!(
			platform.messages_in(channel),
			vec![String::from("✅ <@50> claimed this ticket.")]
		);
	}

	#[tokio::test]
	async fn another_middleman_can_take_over_a_claim() {
		let (tickets, platform, _store) = service();
		let admin = Id::new(70);
		platform.add_member(admin, "admin", &[]);
		platform.set_permissions(admin, Permissions::ADMINISTRATOR);
		let channel = tickets.open(request("bob")).await.unwrap().get_channel();

		tickets.claim(GUILD, channel, MIDDLEMAN).await.unwrap();
		let taken = tickets.claim(GUILD, channel, admin).await.unwrap();
		assert_eq!(taken.get_claimant(), Some(admin));
		assert!(!members_with_access(&platform.grants(channel)).contains(&MIDDLEMAN));
	}

	#[tokio::test]
	async fn only_middlemen_and_admins_act_on_tickets() {
		let (tickets, platform, store) = service();
		let channel = tickets.open(request("bob")).await.unwrap().get_channel();

		assert!(matches!(
			tickets.claim(GUILD, channel, TRADER).await,
			Err(CoreError::Unauthorized)
		));
		assert!(matches!(
			tickets.close(GUILD, channel, BYSTANDER).await,
			Err(CoreError::Unauthorized)
		));
		assert!(matches!(
			tickets.add_user(GUILD, channel, BYSTANDER, "<@60>").await,
			Err(CoreError::Unauthorized)
		));
		assert_eq!(store.ticket(channel).unwrap().unwrap().claimed_by, None);
		assert!(!members_with_access(&platform.grants(channel)).contains(&BYSTANDER));
	}

	#[tokio::test]
	async fn unclaiming_reopens_to_middlemen() {
		let (tickets, platform, _store) = service();
		let channel = tickets.open(request("bob")).await.unwrap().get_channel();
		tickets.claim(GUILD, channel, MIDDLEMAN).await.unwrap();

		let unclaimed = tickets.unclaim(GUILD, channel, MIDDLEMAN).await.unwrap();
		assert_eq!(unclaimed.get_claimant(), None);
		let grants = platform.grants(channel);
		assert!(grants.contains(&ChannelGrant::allow(
			GrantTarget::Role(MM_ROLE),
			visibility::MIDDLEMAN_ACCESS
		)));
		assert!(!members_with_access(&grants).contains(&MIDDLEMAN));
	}

	#[tokio::test]
	async fn failed_lockdown_reverts_the_claim() {
		let (tickets, platform, store) = service();
		let channel = tickets.open(request("bob")).await.unwrap().get_channel();
		platform.state().fail_grants = true;

		assert!(matches!(
			tickets.claim(GUILD, channel, MIDDLEMAN).await,
			Err(CoreError::External(_))
		));
		assert_eq!(store.ticket(channel).unwrap().unwrap().claimed_by, None);
	}

	#[tokio::test]
	async fn added_users_keep_access_through_claims() {
		let (tickets, platform, store) = service();
		let channel = tickets.open(request("nobody")).await.unwrap().get_channel();

		assert!(matches!(
			tickets.add_user(GUILD, channel, MIDDLEMAN, "bystander").await,
			Err(CoreError::TargetNotResolved { .. })
		));

		let added = tickets.add_user(GUILD, channel, MIDDLEMAN, "<@!60>").await.unwrap();
		assert_eq!(added, BYSTANDER);
		assert_eq!(store.ticket(channel).unwrap().unwrap().get_other(), Some(BYSTANDER));

		tickets
			.add_user(GUILD, channel, MIDDLEMAN, "123456789012345678")
			.await
			.unwrap();
		assert_eq!(store.ticket(channel).unwrap().unwrap().get_other(), Some(BYSTANDER));

		tickets.claim(GUILD, channel, MIDDLEMAN).await.unwrap();
		let with_access = members_with_access(&platform.grants(channel));
		assert!(with_access.contains(&BYSTANDER));
		assert!(with_access.contains(&OTHER_TRADER));
	}

	#[tokio::test(start_paused = true)]
	async fn closed_tickets_reject_everything_and_lose_their_channel() {
		let (tickets, platform, store) = service();
		let channel = tickets.open(request("bob")).await.unwrap().get_channel();
		tickets.claim(GUILD, channel, MIDDLEMAN).await.unwrap();

		let closed = tickets.close(GUILD, channel, MIDDLEMAN).await.unwrap();
		assert!(closed.closed_at.is_some());
		let stored = store.ticket(channel).unwrap().unwrap();
		assert_eq!(stored.closed_at, closed.closed_at);
		assert_eq!(stored.claimed_by, Some(50));

		assert!(matches!(
			tickets.claim(GUILD, channel, MIDDLEMAN).await,
			Err(CoreError::TicketClosed)
		));
		assert!(matches!(
			tickets.unclaim(GUILD, channel, MIDDLEMAN).await,
			Err(CoreError::TicketClosed)
		));
		assert!(matches!(
			tickets.add_user(GUILD, channel, MIDDLEMAN, "<@60>").await,
			Err(CoreError::TicketClosed)
		));
		assert!(matches!(
			tickets.close(GUILD, channel, MIDDLEMAN).await,
			Err(CoreError::TicketClosed)
		));
		assert_eq!(store.ticket(channel).unwrap().unwrap().claimed_by, Some(50));

		let (summary, ping) = platform.state().summaries.last().cloned().expect("closed summary");
		assert_eq!(summary.closed_at, closed.closed_at);
		assert_eq!(ping, None);

		assert!(platform.state().deleted_channels.is_empty());
		tokio::time::sleep(Duration::from_secs(4)).await;
		assert_eq!(platform.state().deleted_channels, vec![channel]);
	}

	#[tokio::test(start_paused = true)]
	async fn closing_locks_the_channel_even_if_deletion_fails() {
		let (tickets, platform, store) = service();
		let channel = tickets.open(request("<@123456789012345678>")).await.unwrap().get_channel();
		tickets.add_user(GUILD, channel, MIDDLEMAN, "<@60>").await.unwrap();
		platform.state().fail_delete = true;

		tickets.close(GUILD, channel, MIDDLEMAN).await.unwrap();
		tokio::time::sleep(Duration::from_secs(4)).await;
		assert!(platform.state().deleted_channels.is_empty());
		assert!(store.ticket(channel).unwrap().unwrap().closed_at.is_some());

		let grants = platform.grants(channel);
		assert_eq!(
			members_with_access(&grants),
			vec![TRADER, OTHER_TRADER, BYSTANDER, crate::testing::BOT]
		);
		for grant in grants.iter().filter(|grant| grant.target != GrantTarget::Member(crate::testing::BOT)) {
			assert!(!grant.allow.contains(Permissions::SEND_MESSAGES));
			assert!(grant.deny.contains(Permissions::SEND_MESSAGES));
		}
	}

	#[tokio::test]
	async fn failed_lock_keeps_the_ticket_open() {
		let (tickets, platform, store) = service();
		let channel = tickets.open(request("bob")).await.unwrap().get_channel();
		let grants_before = platform.grants(channel);
		platform.state().fail_grants = true;

		assert!(matches!(
			tickets.close(GUILD, channel, MIDDLEMAN).await,
			Err(CoreError::External(_))
		));
		assert_eq!(store.ticket(channel).unwrap().unwrap().closed_at, None);
		assert_eq!(platform.grants(channel), grants_before);

		platform.state().fail_grants = false;
		assert!(tickets.close(GUILD, channel, MIDDLEMAN).await.is_ok());
	}

	#[tokio::test]
	async fn failed_grant_forgets_the_added_user() {
		let (tickets, platform, store) = service();
		let channel = tickets.open(request("nobody")).await.unwrap().get_channel();
		platform.state().fail_grants = true;

		assert!(matches!(
			tickets.add_user(GUILD, channel, MIDDLEMAN, "<@60>").await,
			Err(CoreError::External(_))
		));
		assert!(store.ticket_participants(channel).unwrap().is_empty());
		assert_eq!(store.ticket(channel).unwrap().unwrap().get_other(), None);

		platform.state().fail_grants = false;
		tickets.claim(GUILD, channel, MIDDLEMAN).await.unwrap();
		assert!(!members_with_access(&platform.grants(channel)).contains(&BYSTANDER));
	}

	#[tokio::test]
	async fn claim_racing_a_close_finishes_before_the_close() {
		let (tickets, platform, store) = service();
		let channel = tickets.open(request("bob")).await.unwrap().get_channel();

		let (claimed, closed) = tokio::join!(
			tickets.claim(GUILD, channel, MIDDLEMAN),
			tickets.close(GUILD, channel, MIDDLEMAN)
		);
		assert_eq!(claimed.unwrap().get_claimant(), Some(MIDDLEMAN));
		let closed = closed.unwrap();
		assert_eq!(closed.get_claimant(), Some(MIDDLEMAN));

		let stored = store.ticket(channel).unwrap().unwrap();
		assert_eq!(stored, closed);
		let settings = require_settings(&store, GUILD).unwrap();
		let expected = read_only_grants(
			&ticket_grants(&settings, &stored, &[], crate::testing::BOT),
			crate::testing::BOT,
		);
		similar_asserts::assert_eq!(platform.grants(channel), expected);
	}

	#[tokio::test]
	async fn claim_after_a_racing_close_is_rejected() {
		let (tickets, platform, store) = service();
		let channel = tickets.open(request("bob")).await.unwrap().get_channel();

		let (closed, claimed) = tokio::join!(
			tickets.close(GUILD, channel, MIDDLEMAN),
			tickets.claim(GUILD, channel, MIDDLEMAN)
		);
		assert!(closed.is_ok());
		assert!(matches!(claimed, Err(CoreError::TicketClosed)));

		let stored = store.ticket(channel).unwrap().unwrap();
		assert_eq!(stored.claimed_by, None);
		assert!(stored.closed_at.is_some());
		let middleman_grant = platform
			.grants(channel)
			.into_iter()
			.find(|grant| grant.target == GrantTarget::Role(MM_ROLE))
			.expect("middleman role grant");
		assert!(middleman_grant.deny.contains(Permissions::SEND_MESSAGES));
	}

	#[tokio::test]
	async fn non_ticket_channels_are_rejected() {
		let (tickets, _platform, _store) = service();
		assert!(matches!(
			tickets.claim(GUILD, CATEGORY, MIDDLEMAN).await,
			Err(CoreError::NotATicket)
		));
		let channel = tickets.open(request("bob")).await.unwrap().get_channel();
		assert!(matches!(
			tickets.claim(Id::new(2), channel, MIDDLEMAN).await,
			Err(CoreError::ConfigIncomplete)
		));
	}

	#[test]
	fn sides_parse_loosely() {
		assert_eq!(TradeSide::parse(" Buyer ").unwrap(), TradeSide::Buyer);
		assert_eq!(TradeSide::parse("S").unwrap(), TradeSide::Seller);
		assert!(matches!(TradeSide::parse("both"), Err(CoreError::InvalidSide(side)) if side == "both"));
	}

	#[test]
	fn channel_names_use_plain_lowercase_usernames() {
		assert_eq!(ticket_channel_name("Alice_Trades.", 1234), "ticket-alicetrades1234");
		assert_eq!(ticket_channel_name("__", 1000), "ticket-user1000");
	}
}
