// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use miette::Diagnostic;
use std::time::Duration;
use thiserror::Error;

/// The longest trip that can be requested
pub const MAX_TRIP_DURATION: Duration = Duration::from_secs(365 * 24 * 60 * 60);

#[derive(Debug, Diagnostic, Error, Eq, PartialEq)]
pub enum DurationError {
	#[error("{0:?} isn't a duration (try something like 2h, 90m, or 1d)")]
	Unparseable(String),
	#[error("the trip duration must be longer than zero")]
	NotPositive,
	#[error("trips can last at most {}", humantime::format_duration(MAX_TRIP_DURATION))]
	TooLong,
}

/// Parses a human duration expression ("2h", "90m", "1d", "1h 30m") into a trip duration.
pub fn parse_trip_duration(input: &str) -> Result<Duration, DurationError> {
	let input = input.trim();
	let duration = humantime::parse_duration(input).map_err(|_| DurationError::Unparseable(input.to_string()))?;
	if duration.is_zero() {
		return Err(DurationError::NotPositive);
	}
	if duration > MAX_TRIP_DURATION {
		return Err(DurationError::TooLong);
	}
	Ok(duration)
}
