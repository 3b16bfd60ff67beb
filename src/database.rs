// © 2024 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::config::ConfigData;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use miette::{Diagnostic, IntoDiagnostic};
use std::error::Error;
use std::fmt;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

// To get boxed errors (as returned by the migration runner) into miette, we need a wrapper type for them.
#[derive(Debug, Diagnostic)]
pub struct MigrationError(pub Box<dyn Error + Send + Sync>);

impl fmt::Display for MigrationError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(&self.0, f)
	}
}

impl Error for MigrationError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		self.0.source()
	}
}

/// Applies per-connection SQLite settings. Several tasks share the database file, so writers wait on each other
/// instead of failing immediately.
#[derive(Debug)]
struct SqlitePragmas;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
	fn on_acquire(&self, connection: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
		diesel::sql_query("PRAGMA busy_timeout = 5000")
			.execute(connection)
			.map_err(diesel::r2d2::Error::QueryError)?;
		diesel::sql_query("PRAGMA foreign_keys = ON")
			.execute(connection)
			.map_err(diesel::r2d2::Error::QueryError)?;
		Ok(())
	}
}

pub fn connect_db(config: &ConfigData) -> miette::Result<DbPool> {
	sqlite_pool(&config.database.path, config.database.max_connections).into_diagnostic()
}

pub(crate) fn sqlite_pool(path: &str, max_connections: u32) -> Result<DbPool, diesel::r2d2::PoolError> {
	let manager: ConnectionManager<SqliteConnection> = ConnectionManager::new(path);
	Pool::builder()
		.max_size(max_connections)
		.test_on_check_out(true)
		.connection_customizer(Box::new(SqlitePragmas))
		.build(manager)
}

pub fn run_embedded_migrations(db_connection_pool: &DbPool) -> Result<(), MigrationError> {
	let mut db_connection = match db_connection_pool.get() {
		Ok(connection) => connection,
		Err(error) => return Err(MigrationError(Box::new(error))),
	};
	match db_connection.run_pending_migrations(MIGRATIONS) {
		Ok(_) => Ok(()),
		Err(error) => Err(MigrationError(error)),
	}
}
