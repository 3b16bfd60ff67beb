// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::CommandContext;
use crate::admin::{set_setting, set_up_guild, show_settings};
use crate::discord::utils::responses::failure_message;
use crate::discord::utils::tickets::PANEL_COLOR;
use crate::model::{GuildSettings, SettingsField, discord_id_from_database_id};
use twilight_util::builder::embed::{EmbedBuilder, EmbedFieldBuilder};

fn setup_usage(prefix: &str) -> String {
	format!(
		"Usage: `{}mmsetup <requestChannelId> <ticketCategoryId> <mmRoleId> <logChannelId> <clientRoleId> <membersRoleId>`",
		prefix
	)
}

fn set_usage(prefix: &str) -> String {
	let names: Vec<&str> = SettingsField::ALL.iter().map(|field| field.name()).collect();
	format!("Usage: `{}mmset <{}> <id>`", prefix, names.join("|"))
}

fn is_role(field: SettingsField) -> bool {
	matches!(
		field,
		SettingsField::MiddlemanRole | SettingsField::ProtectedClientRole | SettingsField::ProtectedMembersRole
	)
}

/// Shows a stored setting as a mention of the channel or role it refers to
fn setting_display(settings: &GuildSettings, field: SettingsField) -> String {
	match settings.field(field) {
		Some(id) if is_role(field) => format!("<@&{}>", discord_id_from_database_id(id)),
		Some(id) => format!("<#{}>", discord_id_from_database_id(id)),
		None => String::from("*Not set*"),
	}
}

pub async fn handle_setup(context: &CommandContext<'_>) -> miette::Result<()> {
	if context.args.len() != SettingsField::ALL.len() {
		return context.reply(&setup_usage(&context.state.config.commands.prefix)).await;
	}
	let result = set_up_guild(
		&context.state.store,
		context.state.platform.as_ref(),
		context.guild,
		context.author(),
		context.args,
	)
	.await;
	context
		.reply_outcome(result.map(|_| String::from("✅ MM setup saved.")))
		.await
}

pub async fn handle_set(context: &CommandContext<'_>) -> miette::Result<()> {
	let [field_name, value] = context.args else {
		return context.reply(&set_usage(&context.state.config.commands.prefix)).await;
	};
	let result = set_setting(
		&context.state.store,
		context.state.platform.as_ref(),
		context.guild,
		context.author(),
		field_name,
		value,
	)
	.await;
	let outcome = result.map(|settings| {
		let missing = settings.missing_fields();
		if missing.is_empty() {
			String::from("✅ Setting saved. Setup is complete.")
		} else {
			format!("✅ Setting saved. Still missing: {}", missing.join(", "))
		}
	});
	context.reply_outcome(outcome).await
}

pub async fn handle_show(context: &CommandContext<'_>) -> miette::Result<()> {
	let settings = match show_settings(
		&context.state.store,
		context.state.platform.as_ref(),
		context.guild,
		context.author(),
	)
	.await
	{
		Ok(settings) => settings,
		Err(error) => return context.reply(&failure_message(&error)).await,
	};

	let status = if settings.complete().is_some() {
		String::from("✅ Setup is complete.")
	} else {
		format!("⚠️ Missing: {}", settings.missing_fields().join(", "))
	};
	let mut embed = EmbedBuilder::new()
		.title("⚙️ MM Config")
		.description(status)
		.color(PANEL_COLOR);
	for field in SettingsField::ALL {
		embed = embed.field(EmbedFieldBuilder::new(field.name(), setting_display(&settings, field)).inline());
	}
	match embed.validate() {
		Ok(embed) => context.reply_embed(embed.build()).await,
		Err(error) => {
			tracing::error!(source = ?error, "Config embed failed validation");
			context.reply("❌ Couldn't show the config.").await
		}
	}
}
