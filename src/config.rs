// © 2024 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use kdl::{KdlDocument, KdlNode};
use miette::{IntoDiagnostic, bail};
use std::time::Duration;
use tokio::fs::read_to_string;

pub const DEFAULT_COMMAND_PREFIX: &str = ":";
pub const DEFAULT_CLOSE_DELAY: Duration = Duration::from_secs(3);
const DEFAULT_MAX_CONNECTIONS: u32 = 4;

pub async fn parse_config(config_path: &str) -> miette::Result<ConfigData> {
	let config_file_contents = read_to_string(config_path).await.into_diagnostic()?;
	parse_config_document(&config_file_contents)
}

/// Parses the bot configuration from KDL:
///
/// ```kdl
/// discord {
///     bot_token "..."
/// }
/// database {
///     path "middleman.sqlite"
///     max_connections 4
/// }
/// commands {
///     prefix ":"
/// }
/// tickets {
///     close_delay_seconds 3
/// }
/// ```
///
/// Only `discord.bot_token` and `database.path` are required.
pub fn parse_config_document(contents: &str) -> miette::Result<ConfigData> {
	let document: KdlDocument = contents.parse()?;

	let Some(bot_token) = child_string(&document, "discord", "bot_token") else {
		bail!("Config is missing discord.bot_token");
	};
	let Some(path) = child_string(&document, "database", "path") else {
		bail!("Config is missing database.path");
	};
	let max_connections = match child_integer(&document, "database", "max_connections") {
		Some(value) => u32::try_from(value).into_diagnostic()?,
		None => DEFAULT_MAX_CONNECTIONS,
	};
	if max_connections == 0 {
		bail!("database.max_connections must be at least 1");
	}
	let prefix = child_string(&document, "commands", "prefix").unwrap_or_else(|| String::from(DEFAULT_COMMAND_PREFIX));
	if prefix.is_empty() {
		bail!("commands.prefix can't be empty");
	}
	let close_delay = match child_integer(&document, "tickets", "close_delay_seconds") {
		Some(seconds) => Duration::from_secs(u64::try_from(seconds).into_diagnostic()?),
		None => DEFAULT_CLOSE_DELAY,
	};

	Ok(ConfigData {
		discord: DiscordConfig { bot_token },
		database: DatabaseConfig { path, max_connections },
		commands: CommandConfig { prefix },
		tickets: TicketConfig { close_delay },
	})
}

fn section<'a>(document: &'a KdlDocument, name: &str) -> Option<&'a KdlNode> {
	document.get(name)
}

fn child_string(document: &KdlDocument, section_name: &str, key: &str) -> Option<String> {
	let children = section(document, section_name)?.children()?;
	children.get_arg(key)?.as_string().map(String::from)
}

fn child_integer(document: &KdlDocument, section_name: &str, key: &str) -> Option<i128> {
	let children = section(document, section_name)?.children()?;
	children.get_arg(key)?.as_integer()
}

#[derive(Debug)]
pub struct ConfigData {
	pub discord: DiscordConfig,
	pub database: DatabaseConfig,
	pub commands: CommandConfig,
	pub tickets: TicketConfig,
}

#[derive(Debug)]
pub struct DiscordConfig {
	pub bot_token: String,
}

#[derive(Debug)]
pub struct DatabaseConfig {
	pub path: String,
	pub max_connections: u32,
}

#[derive(Debug)]
pub struct CommandConfig {
	pub prefix: String,
}

#[derive(Debug)]
pub struct TicketConfig {
	/// How long a closed ticket's channel stays before it's deleted
	pub close_delay: Duration,
}
