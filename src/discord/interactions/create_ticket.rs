// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::{InteractionOrigin, defer_ephemeral, finish_deferred, outcome_message, respond};
use crate::discord::state::BotState;
use crate::discord::utils::responses::{ephemeral_response, failure_message};
use crate::discord::utils::tickets::{request_form_components, request_inputs};
use crate::error::CoreError;
use crate::tickets::TicketRequest;
use crate::tickets::tier::find_tier;
use std::collections::HashMap;
use twilight_model::application::interaction::Interaction;
use twilight_model::application::interaction::message_component::MessageComponentInteractionData;
use twilight_model::http::interaction::{InteractionResponse, InteractionResponseType};
use twilight_util::builder::InteractionResponseDataBuilder;

const REQUEST_FORM_TITLE: &str = "Middleman Request Form";

/// Opens the trade request form for the tier picked from the panel
pub async fn show_request_form(
	interaction: &Interaction,
	interaction_data: &MessageComponentInteractionData,
	state: &BotState,
) -> miette::Result<()> {
	let selected = interaction_data.values.first().map(String::as_str).unwrap_or_default();
	let Some(tier) = find_tier(selected) else {
		let message = failure_message(&CoreError::InvalidTier(selected.to_string()));
		return respond(state, interaction, &ephemeral_response(&message)).await;
	};

	let response = InteractionResponseDataBuilder::new()
		.custom_id(format!("create_ticket/{}", tier.key))
		.title(REQUEST_FORM_TITLE)
		.components(request_form_components())
		.build();
	let response = InteractionResponse {
		kind: InteractionResponseType::Modal,
		data: Some(response),
	};
	respond(state, interaction, &response).await
}

/// Builds the ticket request from a submitted form. Missing inputs are treated as empty.
fn ticket_request(origin: InteractionOrigin, tier: &str, mut values: HashMap<String, String>) -> TicketRequest {
	let mut take = |input: &str| values.remove(input).unwrap_or_default();
	TicketRequest {
		guild: origin.guild,
		owner: origin.user,
		counterparty: take(request_inputs::OTHER_TRADER),
		tier: tier.to_string(),
		details: take(request_inputs::TRADE_DETAILS),
		side: take(request_inputs::YOUR_SIDE),
		tip: take(request_inputs::TIP),
	}
}

pub async fn handle_request_form(
	interaction: &Interaction,
	origin: InteractionOrigin,
	tier: &str,
	values: HashMap<String, String>,
	state: &BotState,
) -> miette::Result<()> {
	defer_ephemeral(state, interaction).await?;

	let request = ticket_request(origin, tier, values);
	let result = state.tickets.open(request).await;
	let message = outcome_message(result, |ticket| format!("✅ Ticket created: <#{}>", ticket.get_channel()));
	finish_deferred(state, interaction, &message).await
}
