// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use twilight_model::id::Id;
use twilight_model::id::marker::{GuildMarker, UserMarker};

pub type TripKey = (Id<GuildMarker>, Id<UserMarker>);

struct ArmedTimer {
	generation: u64,
	handle: JoinHandle<()>,
}

#[derive(Default)]
struct TimerTable {
	next_generation: u64,
	timers: HashMap<TripKey, ArmedTimer>,
}

/// Registry of pending trip expirations, at most one per guild member.
///
/// This is a cache of what's in the trips table; it's rebuilt from the table at startup.
#[derive(Clone, Default)]
pub struct TripTimers {
	table: Arc<Mutex<TimerTable>>,
}

impl TripTimers {
	pub fn new() -> Self {
		Self::default()
	}

	fn table(&self) -> MutexGuard<'_, TimerTable> {
		// The table is never left half-updated, so a poisoned lock is still usable.
		self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
	}

	/// Arms a timer that runs `on_fire` at `fire_at`, replacing any timer already armed for the key.
	/// Times in the past fire right away.
	pub fn arm<F>(&self, key: TripKey, fire_at: DateTime<Utc>, on_fire: F)
	where
		F: Future<Output = ()> + Send + 'static,
	{
		let delay = delay_until(fire_at, Utc::now());
		let mut table = self.table();
		table.next_generation += 1;
		let generation = table.next_generation;

		let timers = self.clone();
		let handle = tokio::spawn(async move {
			sleep(delay).await;
			if timers.take_if_current(key, generation) {
				on_fire.await;
			}
		});

		if let Some(previous) = table.timers.insert(key, ArmedTimer { generation, handle }) {
			previous.handle.abort();
		}
	}

	/// Cancels the timer for the key. Returns whether one was armed.
	pub fn disarm(&self, key: TripKey) -> bool {
		match self.table().timers.remove(&key) {
			Some(timer) => {
				timer.handle.abort();
				true
			}
			None => false,
		}
	}

	pub fn is_armed(&self, key: TripKey) -> bool {
		self.table().timers.contains_key(&key)
	}

	pub fn armed_keys(&self) -> Vec<TripKey> {
		self.table().timers.keys().copied().collect()
	}

	/// Removes the entry for a timer that's firing, unless it has been replaced in the meantime.
	fn take_if_current(&self, key: TripKey, generation: u64) -> bool {
		let mut table = self.table();
		match table.timers.get(&key) {
			Some(timer) if timer.generation == generation => {
				table.timers.remove(&key);
				true
			}
			_ => false,
		}
	}
}

/// How long to wait from `now` until `fire_at`, clamped at zero
pub fn delay_until(fire_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
	(fire_at - now).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use tokio::sync::oneshot;

	fn key(user: u64) -> TripKey {
		(Id::new(1), Id::new(user))
	}

	#[test]
	fn past_times_have_no_delay() {
		let now = Utc::now();
		assert_eq!(delay_until(now - chrono::Duration::minutes(5), now), Duration::ZERO);
		assert_eq!(
			delay_until(now + chrono::Duration::minutes(5), now),
			Duration::from_secs(300)
		);
	}

	#[tokio::test(start_paused = true)]
	async fn fires_once_and_forgets_the_key() {
		let timers = TripTimers::new();
		let (sender, receiver) = oneshot::channel();
		timers.arm(key(2), Utc::now() + chrono::Duration::minutes(30), async move {
			let _ = sender.send(());
		});
		assert!(timers.is_armed(key(2)));

		receiver.await.expect("timer should fire");
		assert!(!timers.is_armed(key(2)));
	}

	#[tokio::test(start_paused = true)]
	async fn rearming_replaces_the_previous_timer() {
		let timers = TripTimers::new();
		let fired = Arc::new(AtomicUsize::new(0));

		let first = Arc::clone(&fired);
		timers.arm(key(2), Utc::now() + chrono::Duration::minutes(10), async move {
			first.fetch_add(1, Ordering::SeqCst);
		});
		let second = Arc::clone(&fired);
		timers.arm(key(2), Utc::now() + chrono::Duration::minutes(20), async move {
			second.fetch_add(10, Ordering::SeqCst);
		});
		assert_eq!(timers.armed_keys(), vec![key(2)]);

		sleep(Duration::from_secs(25 * 60)).await;
		assert_eq!(fired.load(Ordering::SeqCst), 10);
	}

	#[tokio::test(start_paused = true)]
	async fn disarmed_timers_never_fire() {
		let timers = TripTimers::new();
		let fired = Arc::new(AtomicUsize::new(0));
		let counter = Arc::clone(&fired);
		timers.arm(key(3), Utc::now(), async move {
			counter.fetch_add(1, Ordering::SeqCst);
		});
		assert!(timers.disarm(key(3)));
		assert!(!timers.disarm(key(3)));

		sleep(Duration::from_secs(1)).await;
		assert_eq!(fired.load(Ordering::SeqCst), 0);
	}
}
