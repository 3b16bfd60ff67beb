// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::model::{Ticket, TicketState};
use crate::tickets::tier::{TIERS, Tier, find_tier};
use chrono::{DateTime, Utc};
use twilight_mention::fmt::Mention;
use twilight_mention::timestamp::{Timestamp, TimestampStyle};
use twilight_model::channel::message::Component;
use twilight_model::channel::message::component::{
	ActionRow, Button, ButtonStyle, SelectMenu, SelectMenuOption, SelectMenuType, TextInput, TextInputStyle,
};
use twilight_model::channel::message::embed::Embed;
use twilight_util::builder::embed::{EmbedBuilder, EmbedFieldBuilder, EmbedFooterBuilder};
use twilight_validate::embed::EmbedValidationError;

pub const PANEL_COLOR: u32 = 0x5b2cff;
pub const TIER_SELECT_ID: &str = "mm_tier_select";
pub const ADD_USER_MODAL_ID: &str = "ticket/add_user";
pub const ADD_USER_INPUT_ID: &str = "user_to_add";

/// Embed field values are capped at this many characters
const MAX_FIELD_LENGTH: usize = 1024;

/// The intake form's text inputs, by custom ID
pub mod request_inputs {
	pub const OTHER_TRADER: &str = "other_trader";
	pub const TRADE_DETAILS: &str = "trade_details";
	pub const YOUR_SIDE: &str = "your_side";
	pub const TIP: &str = "tip";
}

fn truncated(value: &str) -> String {
	value.chars().take(MAX_FIELD_LENGTH).collect()
}

fn or_placeholder(value: &str, placeholder: &str) -> String {
	if value.trim().is_empty() {
		placeholder.to_string()
	} else {
		truncated(value)
	}
}

fn relative_time(time: DateTime<Utc>) -> Timestamp {
	Timestamp::new(time.timestamp().max(0) as u64, Some(TimestampStyle::RelativeTime))
}

/// Builds the summary embed shown at the top of a ticket channel
pub fn ticket_summary_embed(ticket: &Ticket) -> Result<Embed, EmbedValidationError> {
	let trader = ticket.get_owner().mention().to_string();
	let other = match ticket.get_other() {
		Some(user) => user.mention().to_string(),
		None => String::from("*Not added yet*"),
	};
	let claimed = match ticket.get_claimant() {
		Some(user) => user.mention().to_string(),
		None => String::from("*Unclaimed*"),
	};
	let tier = match find_tier(&ticket.tier_key) {
		Some(tier) => format!("{}\n{}", tier.label, tier.description),
		None => ticket.tier_key.clone(),
	};
	let description = match ticket.state() {
		TicketState::Unclaimed => String::from("Ticket created. Please wait for a middleman."),
		TicketState::Claimed(_) => String::from("A middleman is handling this ticket."),
		TicketState::Closed => match ticket.get_closed_at() {
			Some(closed_at) => format!("This ticket was closed {}.", relative_time(closed_at).mention()),
			None => String::from("This ticket is closed."),
		},
	};
	let opened = match ticket.get_created_at() {
		Some(created_at) => relative_time(created_at).mention().to_string(),
		None => String::from("*Unknown*"),
	};

	let embed = EmbedBuilder::new()
		.title("📨 MM Ticket")
		.description(description)
		.color(PANEL_COLOR)
		.field(EmbedFieldBuilder::new("👤 Trader", trader))
		.field(EmbedFieldBuilder::new("🤝 Other Trader", other))
		.field(EmbedFieldBuilder::new(
			"📦 Trade Details",
			or_placeholder(&ticket.details, "*None*"),
		))
		.field(EmbedFieldBuilder::new("📌 Your Side", or_placeholder(&ticket.side, "*Not set*")).inline())
		.field(EmbedFieldBuilder::new("💎 Tier", tier).inline())
		.field(EmbedFieldBuilder::new("💰 Tip (20%)", or_placeholder(&ticket.tip, "*None*")).inline())
		.field(EmbedFieldBuilder::new("🧑‍⚖️ Claimed By", claimed).inline())
		.field(EmbedFieldBuilder::new("🕒 Opened", opened).inline())
		.footer(EmbedFooterBuilder::new("Use the buttons below, or the ticket commands if needed."))
		.validate()?
		.build();
	Ok(embed)
}

fn ticket_button(custom_id: &str, label: &str, style: ButtonStyle, disabled: bool) -> Component {
	Component::Button(Button {
		custom_id: Some(custom_id.to_string()),
		disabled,
		emoji: None,
		label: Some(label.to_string()),
		style,
		url: None,
		sku_id: None,
	})
}

/// The button row posted under the ticket summary. Buttons are disabled once the ticket is closed.
pub fn ticket_controls(ticket: &Ticket) -> Vec<Component> {
	let disabled = ticket.state() == TicketState::Closed;
	vec![Component::ActionRow(ActionRow {
		components: vec![
			ticket_button("ticket/claim", "Claim", ButtonStyle::Success, disabled),
			ticket_button("ticket/unclaim", "Unclaim", ButtonStyle::Danger, disabled),
			ticket_button("ticket/add_user", "Add User", ButtonStyle::Primary, disabled),
			ticket_button("ticket/close", "Close Ticket", ButtonStyle::Danger, disabled),
		],
	})]
}

/// Builds the request panel embed posted in the request channel
pub fn panel_embed() -> Result<Embed, EmbedValidationError> {
	let embed = EmbedBuilder::new()
		.title("🔒 Middleman Service")
		.description("**Secure • Trusted • Professional**\n\nSelect a trade value range below to open an MM ticket.")
		.color(PANEL_COLOR)
		.footer(EmbedFooterBuilder::new("Select your trade value range…"))
		.validate()?
		.build();
	Ok(embed)
}

fn tier_option(tier: &Tier) -> SelectMenuOption {
	SelectMenuOption {
		default: false,
		description: Some(tier.description.to_string()),
		emoji: None,
		label: tier.label.to_string(),
		value: tier.key.to_string(),
	}
}

/// The tier select menu posted under the request panel
pub fn tier_select() -> Vec<Component> {
	let select_menu = SelectMenu {
		channel_types: None,
		custom_id: String::from(TIER_SELECT_ID),
		default_values: None,
		disabled: false,
		kind: SelectMenuType::Text,
		max_values: None,
		min_values: None,
		options: Some(TIERS.iter().map(tier_option).collect()),
		placeholder: Some(String::from("Select your trade value range…")),
	};
	vec![Component::ActionRow(ActionRow {
		components: vec![Component::SelectMenu(select_menu)],
	})]
}

fn text_input_row(custom_id: &str, label: &str, style: TextInputStyle, placeholder: Option<&str>) -> Component {
	Component::ActionRow(ActionRow {
		components: vec![Component::TextInput(TextInput {
			custom_id: custom_id.to_string(),
			label: label.to_string(),
			max_length: None,
			min_length: None,
			placeholder: placeholder.map(String::from),
			required: Some(true),
			style,
			value: None,
		})],
	})
}

/// The components of the trade request form for a tier
pub fn request_form_components() -> Vec<Component> {
	vec![
		text_input_row(
			request_inputs::OTHER_TRADER,
			"Other Trader (@user, user, or ID)",
			TextInputStyle::Short,
			Some("Example: @SomeUser | SomeUser | 123456…"),
		),
		text_input_row(
			request_inputs::TRADE_DETAILS,
			"Trade Details",
			TextInputStyle::Paragraph,
			None,
		),
		text_input_row(
			request_inputs::YOUR_SIDE,
			"Your Side (Buyer or Seller)",
			TextInputStyle::Short,
			Some("Buyer / Seller"),
		),
		text_input_row(request_inputs::TIP, "MM Tip (20%)", TextInputStyle::Short, Some("Example: 20m")),
	]
}

/// The components of the form for adding a user to a ticket
pub fn add_user_form_components() -> Vec<Component> {
	vec![text_input_row(
		ADD_USER_INPUT_ID,
		"User mention or ID",
		TextInputStyle::Short,
		None,
	)]
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::store::tests::sample_ticket;

	fn field_value<'a>(embed: &'a Embed, name: &str) -> &'a str {
		embed
			.fields
			.iter()
			.find(|field| field.name == name)
			.map(|field| field.value.as_str())
			.unwrap_or_else(|| panic!("no field named {}", name))
	}

	#[test]
	fn summary_shows_placeholders_for_missing_parts() {
		let mut ticket = sample_ticket(50);
		ticket.other_id = None;
		ticket.claimed_by = None;
		ticket.tip = String::new();

		let embed = ticket_summary_embed(&ticket).unwrap();
		assert_eq!(field_value(&embed, "🤝 Other Trader"), "*Not added yet*");
		assert_eq!(field_value(&embed, "🧑‍⚖️ Claimed By"), "*Unclaimed*");
		assert_eq!(field_value(&embed, "💰 Tip (20%)"), "*None*");
		assert_eq!(field_value(&embed, "👤 Trader"), format!("<@{}>", ticket.get_owner()));
	}

	#[test]
	fn closed_summary_disables_the_controls() {
		let mut ticket = sample_ticket(50);
		ticket.claimed_by = Some(12);
		let embed = ticket_summary_embed(&ticket).unwrap();
		assert_eq!(embed.description.as_deref(), Some("A middleman is handling this ticket."));
		assert_eq!(field_value(&embed, "🕒 Opened"), "<t:1700000000:R>");

		ticket.closed_at = Some(1_700_000_600_000);
		let embed = ticket_summary_embed(&ticket).unwrap();
		assert_eq!(
			embed.description.as_deref(),
			Some("This ticket was closed <t:1700000600:R>.")
		);

		let Some(Component::ActionRow(row)) = ticket_controls(&ticket).into_iter().next() else {
			panic!("expected an action row");
		};
		assert_eq!(row.components.len(), 4);
		assert!(row.components.iter().all(|component| matches!(component, Component::Button(button) if button.disabled)));
	}

	#[test]
	fn open_summary_has_usable_controls() {
		let ticket = sample_ticket(50);
		let Some(Component::ActionRow(row)) = ticket_controls(&ticket).into_iter().next() else {
			panic!("expected an action row");
		};
		assert!(row.components.iter().all(|component| matches!(component, Component::Button(button) if !button.disabled)));
	}

	#[test]
	fn summary_truncates_long_details() {
		let mut ticket = sample_ticket(50);
		ticket.details = "x".repeat(3000);

		let embed = ticket_summary_embed(&ticket).unwrap();
		assert_eq!(field_value(&embed, "📦 Trade Details").chars().count(), MAX_FIELD_LENGTH);
	}

	#[test]
	fn tier_select_lists_every_tier() {
		let components = tier_select();
		let Some(Component::ActionRow(row)) = components.first() else {
			panic!("expected an action row");
		};
		let Some(Component::SelectMenu(menu)) = row.components.first() else {
			panic!("expected a select menu");
		};
		let values: Vec<&str> = menu
			.options
			.iter()
			.flatten()
			.map(|option| option.value.as_str())
			.collect();
		assert_eq!(values, ["t1", "t2", "t3", "t4"]);
	}
}
