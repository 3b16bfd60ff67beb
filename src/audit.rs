// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::model::CompleteSettings;
use crate::platform::Platform;
use twilight_model::id::Id;
use twilight_model::id::marker::ChannelMarker;

/// Posts a line to the guild's audit log channel. Failures are logged and otherwise ignored.
pub async fn log_to_guild(platform: &dyn Platform, settings: &CompleteSettings, line: &str) {
	if let Err(error) = platform.send_message(settings.log_channel, line).await {
		tracing::warn!(source = ?error, guild = %settings.guild, "Failed to post audit log line");
	}
}

/// Sends a message that's only informational. Failures are logged and otherwise ignored.
pub async fn notify(platform: &dyn Platform, channel: Id<ChannelMarker>, message: &str) {
	if let Err(error) = platform.send_message(channel, message).await {
		tracing::warn!(source = ?error, %channel, "Failed to send notification");
	}
}
