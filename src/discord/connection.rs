// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::commands::route_message;
use super::interactions::{route_interaction, route_modal_submit};
use super::platform::TwilightPlatform;
use super::state::BotState;
use crate::config::ConfigData;
use crate::platform::Platform;
use crate::store::Store;
use crate::tickets::Tickets;
use crate::trips::Trips;
use miette::IntoDiagnostic;
use std::sync::Arc;
use twilight_cache_inmemory::{DefaultInMemoryCache, ResourceType};
use twilight_gateway::{EventTypeFlags, Intents, Shard, ShardId, StreamExt};
use twilight_http::client::Client;
use twilight_model::application::interaction::InteractionData;
use twilight_model::gateway::event::Event;

pub fn set_up_client(config: &ConfigData) -> Arc<Client> {
	Arc::new(Client::new(config.discord.bot_token.clone()))
}

pub async fn run_bot(store: Store, config: Arc<ConfigData>, http_client: Arc<Client>) -> miette::Result<()> {
	let intents = Intents::GUILDS | Intents::GUILD_MEMBERS | Intents::GUILD_MESSAGES | Intents::MESSAGE_CONTENT;

	let mut shard = Shard::new(ShardId::ONE, config.discord.bot_token.clone(), intents);

	let cache = Arc::new(
		DefaultInMemoryCache::builder()
			.resource_types(ResourceType::GUILD | ResourceType::ROLE)
			.build(),
	);

	let application_id = {
		let application_response = http_client.current_user_application().await.into_diagnostic()?;
		application_response.model().await.into_diagnostic()?.id
	};
	let bot_user_id = {
		let user_response = http_client.current_user().await.into_diagnostic()?;
		user_response.model().await.into_diagnostic()?.id
	};

	let platform = Arc::new(TwilightPlatform::new(
		Arc::clone(&http_client),
		Arc::clone(&cache),
		bot_user_id,
	));
	let shared_platform: Arc<dyn Platform> = platform.clone();
	let tickets = Tickets::new(store.clone(), Arc::clone(&shared_platform), config.tickets.close_delay);
	let trips = Trips::new(store.clone(), shared_platform);

	let rearmed = trips.reconcile_on_startup()?;
	tracing::info!(trips = rearmed, "Re-armed stored trip timers");

	let bot_state = Arc::new(BotState {
		http_client,
		application_id,
		config,
		store,
		platform,
		tickets,
		trips,
	});

	while let Some(event) = shard.next_event(EventTypeFlags::all()).await {
		let event = match event {
			Ok(event) => event,
			Err(error) => {
				tracing::warn!(source = ?error, "error receiving event");
				continue;
			}
		};
		cache.update(&event);

		tokio::spawn(handle_event(event, Arc::clone(&bot_state)));
	}

	Ok(())
}

async fn handle_event(event: Event, bot_state: Arc<BotState>) {
	let event_result = handle_event_route(event, &bot_state).await;
	if let Err(error) = event_result {
		tracing::error!(source = ?error, "An error occurred handling a gateway event");
	}
}

async fn handle_event_route(event: Event, bot_state: &BotState) -> miette::Result<()> {
	tracing::trace!("Incoming gateway message: {:?}", event);
	match event {
		Event::MessageCreate(message) => route_message(&message, bot_state).await?,
		Event::InteractionCreate(interaction) => match &interaction.data {
			Some(InteractionData::MessageComponent(interaction_data)) => {
				route_interaction(&interaction, interaction_data, bot_state).await?;
			}
			Some(InteractionData::ModalSubmit(modal_data)) => {
				route_modal_submit(&interaction, modal_data, bot_state).await?;
			}
			_ => (),
		},
		Event::Ready(ready) => {
			tracing::info!(user = %ready.user.name, guilds = ready.guilds.len(), "Discord gateway is ready");
		}
		_ => (),
	}
	Ok(())
}
