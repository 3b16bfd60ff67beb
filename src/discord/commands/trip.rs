// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::CommandContext;
use crate::discord::utils::responses::failure_message;
use crate::discord::utils::tickets::PANEL_COLOR;
use crate::model::Trip;
use twilight_mention::fmt::Mention;
use twilight_mention::timestamp::{Timestamp, TimestampStyle};
use twilight_util::builder::embed::EmbedBuilder;

/// Lines beyond this are left off the list so the embed stays within Discord's description limit
const MAX_LISTED_TRIPS: usize = 50;

fn trip_line(trip: &Trip) -> String {
	let ends = Timestamp::new(trip.get_end_at().timestamp().max(0) as u64, Some(TimestampStyle::RelativeTime));
	format!("• {} — ends {}", trip.get_user().mention(), ends.mention())
}

fn trip_list(trips: &[Trip]) -> String {
	let mut lines: Vec<String> = trips.iter().take(MAX_LISTED_TRIPS).map(trip_line).collect();
	if trips.len() > MAX_LISTED_TRIPS {
		lines.push(format!("…and {} more", trips.len() - MAX_LISTED_TRIPS));
	}
	lines.join("\n")
}

pub async fn handle_trip(context: &CommandContext<'_>) -> miette::Result<()> {
	let state = context.state;
	if context.args.is_empty() {
		let usage = format!(
			"Usage: `{0}trip <duration>` (like 2h or 1d) or `{0}trip cancel`",
			state.config.commands.prefix
		);
		return context.reply(&usage).await;
	}

	if context.args.len() == 1 && context.args[0].eq_ignore_ascii_case("cancel") {
		let result = state.trips.cancel(context.guild, context.author()).await;
		return context
			.reply_outcome(result.map(|_| String::from("✅ Trip canceled. Roles restored.")))
			.await;
	}

	let duration = context.args.join(" ");
	let result = state.trips.start(context.guild, context.author(), &duration).await;
	let outcome = result.map(|started| {
		format!(
			"✅ Trip started for **{}**. Roles removed (protected roles kept).",
			humantime::format_duration(started.duration)
		)
	});
	context.reply_outcome(outcome).await
}

pub async fn handle_list(context: &CommandContext<'_>) -> miette::Result<()> {
	let trips = match context.state.trips.list(context.guild) {
		Ok(trips) => trips,
		Err(error) => return context.reply(&failure_message(&error)).await,
	};
	if trips.is_empty() {
		return context.reply("✅ Nobody is on trip.").await;
	}

	let embed = EmbedBuilder::new()
		.title("🧳 Trip List")
		.description(trip_list(&trips))
		.color(PANEL_COLOR)
		.build();
	context.reply_embed(embed).await
}
