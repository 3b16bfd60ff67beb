// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Turning what a user typed into a user ID.

use crate::platform::Platform;
use regex::Regex;
use std::sync::LazyLock;
use twilight_model::id::Id;
use twilight_model::id::marker::{GuildMarker, UserMarker};

/// How many members are searched when matching by username
pub const NAME_SEARCH_LIMIT: u16 = 100;

static MENTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^<@!?(\d+)>$").unwrap());
static NUMERIC_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{15,20}$").unwrap());

/// Reads a user mention (`<@id>` or `<@!id>`) or a bare numeric user ID
pub fn parse_explicit_user(input: &str) -> Option<Id<UserMarker>> {
	let input = input.trim();
	if let Some(captures) = MENTION.captures(input) {
		return captures[1].parse().ok().and_then(Id::new_checked);
	}
	if NUMERIC_ID.is_match(input) {
		return input.parse().ok().and_then(Id::new_checked);
	}
	None
}

/// Finds the user meant by `input`: a mention or ID if it is one, otherwise a member whose username matches exactly
/// (ignoring case) among the first page of guild members.
///
/// Fetching members is best-effort; if it fails, nobody is found.
pub async fn resolve_counterparty(
	platform: &dyn Platform,
	guild: Id<GuildMarker>,
	input: &str,
) -> Option<Id<UserMarker>> {
	let input = input.trim();
	if input.is_empty() {
		return None;
	}
	if let Some(user) = parse_explicit_user(input) {
		return Some(user);
	}

	let members = match platform.list_members(guild, NAME_SEARCH_LIMIT).await {
		Ok(members) => members,
		Err(error) => {
			tracing::warn!(source = ?error, %guild, "Couldn't list members to look up a username");
			return None;
		}
	};
	let wanted = input.to_lowercase();
	members
		.into_iter()
		.find(|member| member.username.to_lowercase() == wanted)
		.map(|member| member.id)
}
