// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::platform::TwilightPlatform;
use crate::config::ConfigData;
use crate::store::Store;
use crate::tickets::Tickets;
use crate::trips::Trips;
use std::sync::Arc;
use twilight_http::client::Client;
use twilight_model::id::Id;
use twilight_model::id::marker::ApplicationMarker;

/// Everything an event handler needs, shared between all the event tasks
pub struct BotState {
	pub http_client: Arc<Client>,
	pub application_id: Id<ApplicationMarker>,
	pub config: Arc<ConfigData>,
	pub store: Store,
	pub platform: Arc<TwilightPlatform>,
	pub tickets: Tickets,
	pub trips: Arc<Trips>,
}
