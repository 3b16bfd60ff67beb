// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::CommandContext;
use crate::model::Ticket;
use crate::platform::Platform;

/// Posts the updated summary under the command so the ticket's state stays visible
async fn repost_summary(context: &CommandContext<'_>, ticket: &Ticket) {
	if let Err(error) = context.state.platform.send_ticket_summary(ticket, None).await {
		tracing::warn!(source = ?error, channel = %ticket.get_channel(), "Failed to repost ticket summary");
	}
}

pub async fn handle_claim(context: &CommandContext<'_>) -> miette::Result<()> {
	let result = context
		.state
		.tickets
		.claim(context.guild, context.channel(), context.author())
		.await;
	match result {
		Ok(ticket) => {
			repost_summary(context, &ticket).await;
			Ok(())
		}
		Err(error) => context.reply_outcome(Err(error)).await,
	}
}

pub async fn handle_unclaim(context: &CommandContext<'_>) -> miette::Result<()> {
	let result = context
		.state
		.tickets
		.unclaim(context.guild, context.channel(), context.author())
		.await;
	match result {
		Ok(ticket) => {
			repost_summary(context, &ticket).await;
			Ok(())
		}
		Err(error) => context.reply_outcome(Err(error)).await,
	}
}

pub async fn handle_add_user(context: &CommandContext<'_>) -> miette::Result<()> {
	let Some(target) = context.args.first() else {
		let usage = format!("Usage: `{}adduser @user|userId`", context.state.config.commands.prefix);
		return context.reply(&usage).await;
	};
	let result = context
		.state
		.tickets
		.add_user(context.guild, context.channel(), context.author(), target)
		.await;
	context
		.reply_outcome(result.map(|user| format!("✅ Added <@{}> to this ticket.", user)))
		.await
}

pub async fn handle_close(context: &CommandContext<'_>) -> miette::Result<()> {
	let tickets = &context.state.tickets;
	let result = tickets
		.close(context.guild, context.channel(), context.author())
		.await;
	let delay_seconds = tickets.close_delay().as_secs();
	context
		.reply_outcome(result.map(|_| format!("🗑️ Closing ticket in {} seconds…", delay_seconds)))
		.await
}
