// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::{InteractionOrigin, defer_ephemeral, finish_deferred, outcome_message, respond};
use crate::discord::state::BotState;
use crate::discord::utils::responses::{ephemeral_response, failure_message};
use crate::discord::utils::tickets::{
	ADD_USER_INPUT_ID, ADD_USER_MODAL_ID, add_user_form_components, ticket_controls, ticket_summary_embed,
};
use miette::IntoDiagnostic;
use std::collections::HashMap;
use twilight_model::application::interaction::Interaction;
use twilight_model::channel::message::MessageFlags;
use twilight_model::http::interaction::{InteractionResponse, InteractionResponseType};
use twilight_util::builder::InteractionResponseDataBuilder;

/// Claims or unclaims the ticket, then redraws the summary the button sits under
pub async fn handle_claim(
	interaction: &Interaction,
	origin: InteractionOrigin,
	state: &BotState,
	claim: bool,
) -> miette::Result<()> {
	let response = InteractionResponse {
		kind: InteractionResponseType::DeferredUpdateMessage,
		data: None,
	};
	respond(state, interaction, &response).await?;

	let tickets = &state.tickets;
	let result = if claim {
		tickets.claim(origin.guild, origin.channel, origin.user).await
	} else {
		tickets.unclaim(origin.guild, origin.channel, origin.user).await
	};
	let interaction_client = state.http_client.interaction(state.application_id);
	match result {
		Ok(ticket) => {
			let embeds = vec![ticket_summary_embed(&ticket).into_diagnostic()?];
			let components = ticket_controls(&ticket);
			interaction_client
				.update_response(&interaction.token)
				.embeds(Some(embeds.as_slice()))
				.components(Some(components.as_slice()))
				.await
				.into_diagnostic()?;
		}
		Err(error) => {
			interaction_client
				.create_followup(&interaction.token)
				.content(&failure_message(&error))
				.flags(MessageFlags::EPHEMERAL)
				.await
				.into_diagnostic()?;
		}
	}
	Ok(())
}

/// Opens the add user form, as long as the user may act on this ticket
pub async fn show_add_user_form(
	interaction: &Interaction,
	origin: InteractionOrigin,
	state: &BotState,
) -> miette::Result<()> {
	let check = state
		.tickets
		.check_actor(origin.guild, origin.channel, origin.user)
		.await;
	if let Err(error) = check {
		return respond(state, interaction, &ephemeral_response(&failure_message(&error))).await;
	}

	let response = InteractionResponseDataBuilder::new()
		.custom_id(ADD_USER_MODAL_ID)
		.title("Add User")
		.components(add_user_form_components())
		.build();
	let response = InteractionResponse {
		kind: InteractionResponseType::Modal,
		data: Some(response),
	};
	respond(state, interaction, &response).await
}

pub async fn handle_add_user_form(
	interaction: &Interaction,
	origin: InteractionOrigin,
	values: HashMap<String, String>,
	state: &BotState,
) -> miette::Result<()> {
	defer_ephemeral(state, interaction).await?;

	let input = values.get(ADD_USER_INPUT_ID).map(String::as_str).unwrap_or_default();
	let result = state
		.tickets
		.add_user(origin.guild, origin.channel, origin.user, input)
		.await;
	let message = outcome_message(result, |user| format!("✅ Added <@{}> to this ticket.", user));
	finish_deferred(state, interaction, &message).await
}

pub async fn handle_close(interaction: &Interaction, origin: InteractionOrigin, state: &BotState) -> miette::Result<()> {
	defer_ephemeral(state, interaction).await?;

	let result = state
		.tickets
		.close(origin.guild, origin.channel, origin.user)
		.await;
	let message = outcome_message(result, |_| String::from("🗑️ Ticket closed. Deleting..."));
	finish_deferred(state, interaction, &message).await
}
