// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::CommandContext;
use crate::admin::demote;

pub async fn handle_command(context: &CommandContext<'_>) -> miette::Result<()> {
	let Some(target) = context.args.first() else {
		let usage = format!("Usage: `{}demote @user|userId`", context.state.config.commands.prefix);
		return context.reply(&usage).await;
	};
	let state = context.state;
	let result = demote(
		&state.store,
		state.platform.as_ref(),
		context.guild,
		context.author(),
		target,
	)
	.await;
	context
		.reply_outcome(result.map(|(user, _)| format!("✅ Demoted <@{}> (kept protected roles only).", user)))
		.await
}
