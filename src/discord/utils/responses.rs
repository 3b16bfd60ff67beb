// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::error::CoreError;
use twilight_model::channel::message::MessageFlags;
use twilight_model::http::interaction::{InteractionResponse, InteractionResponseType};
use twilight_util::builder::InteractionResponseDataBuilder;

pub const SOMETHING_WENT_WRONG: &str = "❌ Something went wrong. Please try again.";

/// Gets the line to show the user for a failed operation.
///
/// Failures that aren't the user's doing are logged here and shown as a generic message.
pub fn failure_message(error: &CoreError) -> String {
	match error {
		CoreError::External(_) | CoreError::Storage(_) => {
			tracing::error!(source = ?error, "Operation failed");
			String::from(SOMETHING_WENT_WRONG)
		}
		CoreError::ProvisioningFailed(_) => {
			tracing::error!(source = ?error, "Couldn't create a ticket channel");
			String::from("❌ Couldn't create the ticket channel. Check the bot's permissions in the ticket category.")
		}
		error => format!("❌ {}", capitalized(&error.to_string())),
	}
}

fn capitalized(message: &str) -> String {
	let mut chars = message.chars();
	match chars.next() {
		Some(first) => first.to_uppercase().chain(chars).collect(),
		None => String::new(),
	}
}

/// Builds a response only the interacting user can see
pub fn ephemeral_response(content: &str) -> InteractionResponse {
	let response = InteractionResponseDataBuilder::new()
		.content(content)
		.flags(MessageFlags::EPHEMERAL)
		.build();
	InteractionResponse {
		kind: InteractionResponseType::ChannelMessageWithSource,
		data: Some(response),
	}
}
