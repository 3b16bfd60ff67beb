// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Who can see a ticket channel in each ticket state.

use crate::model::{CompleteSettings, Ticket};
use crate::platform::{ChannelGrant, GrantTarget};
use twilight_model::guild::Permissions;
use twilight_model::id::Id;
use twilight_model::id::marker::{RoleMarker, UserMarker};

/// What every trader and helper in a ticket is allowed
pub const MEMBER_ACCESS: Permissions = Permissions::VIEW_CHANNEL
	.union(Permissions::SEND_MESSAGES)
	.union(Permissions::READ_MESSAGE_HISTORY);

/// What the middleman role is allowed on an unclaimed ticket
pub const MIDDLEMAN_ACCESS: Permissions = MEMBER_ACCESS.union(Permissions::MANAGE_MESSAGES);

const LOCKED_OUT: Permissions = Permissions::VIEW_CHANNEL.union(Permissions::SEND_MESSAGES);

/// The full set of permission overwrites a ticket channel should have for the ticket's current claim state.
///
/// Unclaimed tickets are open to the whole middleman role. Claimed tickets are locked down to the traders, anyone
/// added to the ticket, the claimant, and the bot.
pub fn ticket_grants(
	settings: &CompleteSettings,
	ticket: &Ticket,
	participants: &[Id<UserMarker>],
	bot: Id<UserMarker>,
) -> Vec<ChannelGrant> {
	let everyone: Id<RoleMarker> = settings.guild.cast();
	let claimant = ticket.get_claimant();

	let mut grants = Vec::new();
	match claimant {
		Some(_) => {
			grants.push(ChannelGrant::deny(GrantTarget::Role(everyone), LOCKED_OUT));
			grants.push(ChannelGrant::deny(GrantTarget::Role(settings.middleman_role), LOCKED_OUT));
		}
		None => {
			grants.push(ChannelGrant::deny(
				GrantTarget::Role(everyone),
				Permissions::VIEW_CHANNEL,
			));
			grants.push(ChannelGrant::allow(
				GrantTarget::Role(settings.middleman_role),
				MIDDLEMAN_ACCESS,
			));
		}
	}

	let mut members: Vec<Id<UserMarker>> = Vec::new();
	let candidates = [Some(ticket.get_owner()), ticket.get_other()]
		.into_iter()
		.flatten()
		.chain(participants.iter().copied())
		.chain(claimant)
		.chain([bot]);
	for member in candidates {
		if !members.contains(&member) {
			members.push(member);
		}
	}
	grants.extend(
		members
			.into_iter()
			.map(|member| ChannelGrant::allow(GrantTarget::Member(member), MEMBER_ACCESS)),
	);
	grants
}

/// Turns a ticket's overwrites into the ones for a closed ticket. Everyone who could read the channel still can, but
/// only the bot can post.
pub fn read_only_grants(grants: &[ChannelGrant], bot: Id<UserMarker>) -> Vec<ChannelGrant> {
	grants
		.iter()
		.map(|grant| {
			let mut grant = *grant;
			if grant.target != GrantTarget::Member(bot) {
				grant.allow.remove(Permissions::SEND_MESSAGES);
				grant.deny.insert(Permissions::SEND_MESSAGES);
			}
			grant
		})
		.collect()
}

/// The users a set of grants lets see the channel
pub fn members_with_access(grants: &[ChannelGrant]) -> Vec<Id<UserMarker>> {
	grants
		.iter()
		.filter_map(|grant| match grant.target {
			GrantTarget::Member(user) if grant.allow.contains(Permissions::VIEW_CHANNEL) => Some(user),
			_ => None,
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::store::tests::sample_ticket;

	fn settings() -> CompleteSettings {
		CompleteSettings {
			guild: Id::new(1),
			request_channel: Id::new(2),
			ticket_category: Id::new(3),
			middleman_role: Id::new(4),
			log_channel: Id::new(5),
			protected_roles: [Id::new(6), Id::new(7)],
		}
	}

	#[test]
	fn unclaimed_tickets_are_open_to_middlemen() {
		let mut ticket = sample_ticket(100);
		ticket.other_id = Some(12);
		let grants = ticket_grants(&settings(), &ticket, &[], Id::new(999));

		assert_eq!(
			grants[0],
			ChannelGrant::deny(GrantTarget::Role(Id::new(1)), Permissions::VIEW_CHANNEL)
		);
		assert_eq!(
			grants[1],
			ChannelGrant::allow(GrantTarget::Role(Id::new(4)), MIDDLEMAN_ACCESS)
		);
		assert_eq!(
			members_with_access(&grants),
			vec![Id::new(11), Id::new(12), Id::new(999)]
		);
	}

	#[test]
	fn claimed_tickets_lock_out_the_middleman_role() {
		let mut ticket = sample_ticket(100);
		ticket.other_id = Some(12);
		ticket.claimed_by = Some(50);
		let grants = ticket_grants(&settings(), &ticket, &[Id::new(30), Id::new(12)], Id::new(999));

		assert!(grants.contains(&ChannelGrant::deny(GrantTarget::Role(Id::new(4)), LOCKED_OUT)));
		assert!(grants.contains(&ChannelGrant::deny(GrantTarget::Role(Id::new(1)), LOCKED_OUT)));
		assert!(!grants.iter().any(|grant| grant.target == GrantTarget::Role(Id::new(4))
			&& grant.allow.contains(Permissions::VIEW_CHANNEL)));
		similar_asserts::assert_eq!(
			members_with_access(&grants),
			vec![Id::new(11), Id::new(12), Id::new(30), Id::new(50), Id::new(999)]
		);
	}

	#[test]
	fn closed_tickets_are_read_only_except_for_the_bot() {
		let ticket = sample_ticket(100);
		let bot = Id::new(999);
		let grants = read_only_grants(&ticket_grants(&settings(), &ticket, &[], bot), bot);

		assert_eq!(members_with_access(&grants), vec![Id::new(11), bot]);
		for grant in grants.iter() {
			if grant.target == GrantTarget::Member(bot) {
				assert_eq!(*grant, ChannelGrant::allow(GrantTarget::Member(bot), MEMBER_ACCESS));
			} else {
				assert!(!grant.allow.contains(Permissions::SEND_MESSAGES));
				assert!(grant.deny.contains(Permissions::SEND_MESSAGES));
			}
		}
		assert!(grants.contains(&ChannelGrant {
			target: GrantTarget::Role(Id::new(4)),
			allow: MIDDLEMAN_ACCESS.difference(Permissions::SEND_MESSAGES),
			deny: Permissions::SEND_MESSAGES,
		}));
	}
}
