// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::state::BotState;
use super::utils::responses::{ephemeral_response, failure_message};
use crate::error::CoreError;
use miette::IntoDiagnostic;
use std::collections::HashMap;
use twilight_model::application::interaction::Interaction;
use twilight_model::application::interaction::message_component::MessageComponentInteractionData;
use twilight_model::application::interaction::modal::ModalInteractionData;
use twilight_model::channel::message::MessageFlags;
use twilight_model::http::interaction::{InteractionResponse, InteractionResponseType};
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, UserMarker};
use twilight_util::builder::InteractionResponseDataBuilder;

mod create_ticket;
mod ticket_controls;

/// Where an interaction happened and who triggered it
#[derive(Clone, Copy, Debug)]
pub struct InteractionOrigin {
	pub guild: Id<GuildMarker>,
	pub channel: Id<ChannelMarker>,
	pub user: Id<UserMarker>,
}

impl InteractionOrigin {
	/// Gets the origin of an interaction that happened in a guild channel
	pub fn of(interaction: &Interaction) -> Option<Self> {
		Some(Self {
			guild: interaction.guild_id?,
			channel: interaction.channel.as_ref()?.id,
			user: interaction.author_id()?,
		})
	}
}

pub async fn route_interaction(
	interaction: &Interaction,
	interaction_data: &MessageComponentInteractionData,
	state: &BotState,
) -> miette::Result<()> {
	let custom_id_path: Vec<&str> = interaction_data.custom_id.split('/').collect();
	let Some(origin) = InteractionOrigin::of(interaction) else {
		return respond(state, interaction, &ephemeral_response("❌ This only works in a server.")).await;
	};

	match custom_id_path.as_slice() {
		["mm_tier_select"] => create_ticket::show_request_form(interaction, interaction_data, state).await,
		["ticket", "claim"] => ticket_controls::handle_claim(interaction, origin, state, true).await,
		["ticket", "unclaim"] => ticket_controls::handle_claim(interaction, origin, state, false).await,
		["ticket", "add_user"] => ticket_controls::show_add_user_form(interaction, origin, state).await,
		["ticket", "close"] => ticket_controls::handle_close(interaction, origin, state).await,
		_ => {
			tracing::warn!(custom_id = %interaction_data.custom_id, "Unknown component interaction");
			Ok(())
		}
	}
}

pub async fn route_modal_submit(
	interaction: &Interaction,
	modal_data: &ModalInteractionData,
	state: &BotState,
) -> miette::Result<()> {
	let custom_id_path: Vec<&str> = modal_data.custom_id.split('/').collect();
	let Some(origin) = InteractionOrigin::of(interaction) else {
		return respond(state, interaction, &ephemeral_response("❌ This only works in a server.")).await;
	};
	let values = modal_values(modal_data);

	match custom_id_path.as_slice() {
		["create_ticket", tier] => create_ticket::handle_request_form(interaction, origin, tier, values, state).await,
		["ticket", "add_user"] => ticket_controls::handle_add_user_form(interaction, origin, values, state).await,
		_ => {
			tracing::warn!(custom_id = %modal_data.custom_id, "Unknown modal submission");
			Ok(())
		}
	}
}

/// Collects the submitted text of every input in a modal, by input custom ID
fn modal_values(modal_data: &ModalInteractionData) -> HashMap<String, String> {
	let mut values = HashMap::new();
	for row in modal_data.components.iter() {
		for component in row.components.iter() {
			values.insert(component.custom_id.clone(), component.value.clone().unwrap_or_default());
		}
	}
	values
}

async fn respond(state: &BotState, interaction: &Interaction, response: &InteractionResponse) -> miette::Result<()> {
	state
		.http_client
		.interaction(state.application_id)
		.create_response(interaction.id, &interaction.token, response)
		.await
		.into_diagnostic()?;
	Ok(())
}

/// Acknowledges the interaction with a loading state only the user sees. Finish with [finish_deferred].
async fn defer_ephemeral(state: &BotState, interaction: &Interaction) -> miette::Result<()> {
	let response = InteractionResponse {
		kind: InteractionResponseType::DeferredChannelMessageWithSource,
		data: Some(
			InteractionResponseDataBuilder::new()
				.flags(MessageFlags::EPHEMERAL)
				.build(),
		),
	};
	respond(state, interaction, &response).await
}

async fn finish_deferred(state: &BotState, interaction: &Interaction, content: &str) -> miette::Result<()> {
	state
		.http_client
		.interaction(state.application_id)
		.update_response(&interaction.token)
		.content(Some(content))
		.await
		.into_diagnostic()?;
	Ok(())
}

/// Turns an operation's result into the line shown to the user
fn outcome_message<T>(result: Result<T, CoreError>, on_success: impl FnOnce(T) -> String) -> String {
	match result {
		Ok(value) => on_success(value),
		Err(error) => failure_message(&error),
	}
}
