// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::model::CompleteSettings;
use std::collections::HashSet;
use twilight_model::id::Id;
use twilight_model::id::marker::{GuildMarker, RoleMarker};

/// The member's roles with the guild's implicit everyone role removed
pub fn snapshot_roles(guild: Id<GuildMarker>, roles: &[Id<RoleMarker>]) -> Vec<Id<RoleMarker>> {
	let everyone: Id<RoleMarker> = guild.cast();
	let mut snapshot = Vec::with_capacity(roles.len());
	for role in roles {
		if *role != everyone && !snapshot.contains(role) {
			snapshot.push(*role);
		}
	}
	snapshot
}

/// The roles a member keeps when stripped: the protected roles they currently hold that still exist
pub fn protected_subset(
	settings: &CompleteSettings,
	current: &[Id<RoleMarker>],
	existing: &HashSet<Id<RoleMarker>>,
) -> Vec<Id<RoleMarker>> {
	current
		.iter()
		.copied()
		.filter(|role| settings.is_protected(*role) && existing.contains(role))
		.collect()
}

/// The roles to give back after a trip: every snapshotted role that still exists, plus both protected roles.
pub fn restoration_roles(
	settings: &CompleteSettings,
	snapshot: &[Id<RoleMarker>],
	existing: &HashSet<Id<RoleMarker>>,
) -> Vec<Id<RoleMarker>> {
	let mut restored: Vec<Id<RoleMarker>> = snapshot
		.iter()
		.copied()
		.filter(|role| existing.contains(role))
		.collect();
	for role in settings.protected_roles {
		if existing.contains(&role) && !restored.contains(&role) {
			restored.push(role);
		}
	}
	restored
}

#[cfg(test)]
mod tests {
	use super::*;

	fn settings() -> CompleteSettings {
		CompleteSettings {
			guild: Id::new(1),
			request_channel: Id::new(2),
			ticket_category: Id::new(3),
			middleman_role: Id::new(4),
			log_channel: Id::new(5),
			protected_roles: [Id::new(10), Id::new(11)],
		}
	}

	fn ids(raw: &[u64]) -> Vec<Id<RoleMarker>> {
		raw.iter().map(|id| Id::new(*id)).collect()
	}

	#[test]
	fn snapshot_drops_everyone_role() {
		assert_eq!(snapshot_roles(Id::new(1), &ids(&[1, 20, 10, 20])), ids(&[20, 10]));
	}

	#[test]
	fn stripping_keeps_only_held_protected_roles() {
		let existing: HashSet<_> = ids(&[10, 11, 20]).into_iter().collect();
		assert_eq!(protected_subset(&settings(), &ids(&[10, 20]), &existing), ids(&[10]));

		let without_ten: HashSet<_> = ids(&[11, 20]).into_iter().collect();
		assert!(protected_subset(&settings(), &ids(&[10, 20]), &without_ten).is_empty());
	}

	#[test]
	fn restoration_skips_deleted_roles_and_adds_protected() {
		let existing: HashSet<_> = ids(&[10, 11, 20]).into_iter().collect();
		assert_eq!(
			restoration_roles(&settings(), &ids(&[20, 21, 10]), &existing),
			ids(&[20, 10, 11])
		);
	}
}
