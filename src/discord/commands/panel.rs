// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::CommandContext;
use crate::access::{require_permission, require_settings};
use crate::audit::log_to_guild;
use crate::discord::utils::permissions::{
	channel_permissions, panel_channel_missing_permissions_message, panel_channel_permissions,
};
use crate::discord::utils::responses::failure_message;
use crate::discord::utils::tickets::{panel_embed, tier_select};
use crate::platform::Platform;
use miette::IntoDiagnostic;
use twilight_mention::fmt::Mention;
use twilight_model::guild::Permissions;

pub async fn handle_command(context: &CommandContext<'_>) -> miette::Result<()> {
	let state = context.state;
	let settings = match require_settings(&state.store, context.guild) {
		Ok(settings) => settings,
		Err(error) => return context.reply(&failure_message(&error)).await,
	};
	let permission_check = require_permission(
		state.platform.as_ref(),
		context.guild,
		context.author(),
		Permissions::MANAGE_CHANNELS,
		"Manage Channels",
	)
	.await;
	if let Err(error) = permission_check {
		return context.reply(&failure_message(&error)).await;
	}

	let request_channel = settings.request_channel;
	let bot_permissions = channel_permissions(
		context.guild,
		request_channel,
		state.platform.bot_user(),
		&state.http_client,
	)
	.await?;
	if !bot_permissions.contains(panel_channel_permissions()) {
		return context
			.reply(&panel_channel_missing_permissions_message(request_channel.mention()))
			.await;
	}

	let embed = panel_embed().into_diagnostic()?;
	let components = tier_select();
	state
		.http_client
		.create_message(request_channel)
		.embeds(&[embed])
		.components(&components)
		.await
		.into_diagnostic()?;

	tracing::info!(guild = %context.guild, user = %context.author(), channel = %request_channel, "MM panel posted");
	log_to_guild(
		state.platform.as_ref(),
		&settings,
		&format!("📌 MM panel posted by <@{}> in <#{}>", context.author(), request_channel),
	)
	.await;
	context.reply("✅ MM panel posted.").await
}
