// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::trips::duration::DurationError;
use miette::Diagnostic;
use thiserror::Error;

/// Errors from the ticket and trip operations.
///
/// Everything except [Self::External] and [Self::Storage] is an expected outcome that's reported back to the user
/// who triggered the operation.
#[derive(Debug, Diagnostic, Error)]
pub enum CoreError {
	#[error("the server hasn't finished middleman setup")]
	#[diagnostic(help("run the setup command with all six IDs"))]
	ConfigIncomplete,

	#[error("only middlemen and administrators can do that")]
	Unauthorized,

	#[error("you need the {0} permission for that")]
	MissingPermission(&'static str),

	#[error("setup takes {expected} IDs, but {given} were given")]
	#[diagnostic(help("give the request channel, ticket category, middleman role, log channel, client role, and members role"))]
	SetupArgumentCount { expected: usize, given: usize },

	#[error("{0:?} isn't a channel or role ID")]
	InvalidId(String),

	#[error("unknown setting {0:?}")]
	#[diagnostic(help("settings are request_channel, ticket_category, mm_role, log_channel, client_role, and members_role"))]
	UnknownSetting(String),

	#[error("couldn't find a user for {input:?}")]
	TargetNotResolved { input: String },

	#[error("unknown trade tier {0:?}")]
	InvalidTier(String),

	#[error("unknown trade side {0:?}; expected buyer or seller")]
	InvalidSide(String),

	#[error("the ticket channel couldn't be created")]
	ProvisioningFailed(#[source] PlatformError),

	#[error("this channel isn't a ticket")]
	NotATicket,

	#[error("this ticket is already closed")]
	TicketClosed,

	#[error("there's no active trip for that member")]
	NoActiveTrip,

	#[error(transparent)]
	InvalidDuration(#[from] DurationError),

	#[error("the bot needs the Manage Roles permission for that")]
	MissingBotPermission,

	#[error("a Discord request failed")]
	External(#[source] PlatformError),

	#[error(transparent)]
	Storage(#[from] StorageError),
}

impl From<PlatformError> for CoreError {
	fn from(error: PlatformError) -> Self {
		Self::External(error)
	}
}

/// A failed call to the chat platform
#[derive(Debug, Diagnostic, Error)]
#[error("{action} failed")]
pub struct PlatformError {
	pub action: &'static str,
	#[source]
	pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl PlatformError {
	pub fn new(action: &'static str, source: impl std::error::Error + Send + Sync + 'static) -> Self {
		Self {
			action,
			source: Some(Box::new(source)),
		}
	}

	/// Creates an error for a failure that has no underlying error value (for example, a missing resource)
	pub fn bare(action: &'static str) -> Self {
		Self { action, source: None }
	}
}

/// A failure in the persistent store
#[derive(Debug, Diagnostic, Error)]
pub enum StorageError {
	#[error("couldn't get a database connection")]
	Pool(#[from] diesel::r2d2::PoolError),

	#[error("database query failed")]
	Query(#[from] diesel::result::Error),

	#[error("stored role snapshot is unreadable")]
	Snapshot(#[from] serde_json::Error),
}
