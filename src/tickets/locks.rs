// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use twilight_model::id::Id;
use twilight_model::id::marker::ChannelMarker;

/// One async lock per ticket channel, so changes to a single ticket happen one at a time
#[derive(Clone, Default)]
pub struct TicketLocks {
	locks: Arc<Mutex<HashMap<Id<ChannelMarker>, Arc<AsyncMutex<()>>>>>,
}

impl TicketLocks {
	/// Waits for exclusive access to the ticket. Access is held until the guard is dropped.
	pub async fn lock(&self, channel: Id<ChannelMarker>) -> OwnedMutexGuard<()> {
		let lock = {
			let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
			Arc::clone(locks.entry(channel).or_default())
		};
		lock.lock_owned().await
	}

	/// Drops the lock for a ticket that won't change again
	pub fn forget(&self, channel: Id<ChannelMarker>) {
		self.locks
			.lock()
			.unwrap_or_else(|poisoned| poisoned.into_inner())
			.remove(&channel);
	}
}
