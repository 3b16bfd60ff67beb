// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::state::BotState;
use super::utils::responses::failure_message;
use crate::error::CoreError;
use miette::IntoDiagnostic;
use twilight_model::channel::Message;
use twilight_model::channel::message::AllowedMentions;
use twilight_model::channel::message::embed::Embed;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, UserMarker};

mod demote;
mod panel;
mod setup;
mod ticket;
mod trip;

/// A prefix command invocation, split into its name and arguments
#[derive(Debug, Eq, PartialEq)]
pub struct ParsedCommand<'a> {
	pub name: String,
	pub args: Vec<&'a str>,
}

/// Splits a message into a command if it starts with the prefix
pub fn parse_command<'a>(prefix: &str, content: &'a str) -> Option<ParsedCommand<'a>> {
	let rest = content.trim_start().strip_prefix(prefix)?;
	let mut words = rest.split_whitespace();
	let name = words.next()?.to_lowercase();
	Some(ParsedCommand {
		name,
		args: words.collect(),
	})
}

/// The message a command came from, with the helpers every command uses to answer it
pub struct CommandContext<'a> {
	pub message: &'a Message,
	pub guild: Id<GuildMarker>,
	pub args: &'a [&'a str],
	pub state: &'a BotState,
}

impl CommandContext<'_> {
	pub fn author(&self) -> Id<UserMarker> {
		self.message.author.id
	}

	pub fn channel(&self) -> Id<ChannelMarker> {
		self.message.channel_id
	}

	/// Replies to the command message without pinging anyone
	pub async fn reply(&self, content: &str) -> miette::Result<()> {
		self.state
			.http_client
			.create_message(self.message.channel_id)
			.content(content)
			.reply(self.message.id)
			.allowed_mentions(Some(&AllowedMentions::default()))
			.await
			.into_diagnostic()?;
		Ok(())
	}

	pub async fn reply_embed(&self, embed: Embed) -> miette::Result<()> {
		self.state
			.http_client
			.create_message(self.message.channel_id)
			.embeds(&[embed])
			.reply(self.message.id)
			.allowed_mentions(Some(&AllowedMentions::default()))
			.await
			.into_diagnostic()?;
		Ok(())
	}

	/// Replies with the success line, or with the reason the operation failed
	pub async fn reply_outcome(&self, outcome: Result<String, CoreError>) -> miette::Result<()> {
		match outcome {
			Ok(content) => self.reply(&content).await,
			Err(error) => self.reply(&failure_message(&error)).await,
		}
	}
}

pub async fn route_message(message: &Message, state: &BotState) -> miette::Result<()> {
	if message.author.bot {
		return Ok(());
	}
	let Some(guild) = message.guild_id else {
		return Ok(());
	};
	let Some(command) = parse_command(&state.config.commands.prefix, &message.content) else {
		return Ok(());
	};

	let context = CommandContext {
		message,
		guild,
		args: &command.args,
		state,
	};
	tracing::debug!(command = %command.name, %guild, user = %message.author.id, "Running command");
	match command.name.as_str() {
		"mmsetup" => setup::handle_setup(&context).await,
		"mmset" => setup::handle_set(&context).await,
		"mmconfig" => setup::handle_show(&context).await,
		"postmm" => panel::handle_command(&context).await,
		"claim" => ticket::handle_claim(&context).await,
		"unclaim" => ticket::handle_unclaim(&context).await,
		"adduser" => ticket::handle_add_user(&context).await,
		"close" => ticket::handle_close(&context).await,
		"trip" => trip::handle_trip(&context).await,
		"triplist" => trip::handle_list(&context).await,
		"demote" => demote::handle_command(&context).await,
		_ => Ok(()),
	}
}
