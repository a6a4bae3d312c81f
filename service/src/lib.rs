//! Service contains the business logic of the application.
//!
//! List of available Cargo features:
#![doc = document_features::document_features!()]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod command;
pub mod domain;
pub mod infra;
pub mod query;
pub mod read;

use std::sync::Arc;

use derive_more::Debug;

use crate::{
    domain::session,
    infra::{Reminders, VideoRooms},
};

pub use self::{command::Command, query::Query};

/// [`Service`] configuration.
#[derive(Clone, Copy, Debug, Default)]
pub struct Config {
    /// Window around the scheduled start in which a [`Session`] is allowed
    /// to be started.
    ///
    /// [`Session`]: domain::Session
    pub start_window: session::StartWindow,
}

/// Domain service.
#[derive(Clone, Debug)]
pub struct Service<Db> {
    /// Configuration of this [`Service`].
    config: Config,

    /// [`Database`] of this [`Service`].
    ///
    /// [`Database`]: infra::Database
    database: Db,

    /// [`VideoRooms`] provider of this [`Service`].
    #[debug(skip)]
    rooms: Arc<dyn VideoRooms>,

    /// [`Reminders`] dispatcher of this [`Service`].
    #[debug(skip)]
    reminders: Arc<dyn Reminders>,
}

impl<Db> Service<Db> {
    /// Creates a new [`Service`] with the provided parameters.
    #[must_use]
    pub fn new(
        config: Config,
        database: Db,
        rooms: Arc<dyn VideoRooms>,
        reminders: Arc<dyn Reminders>,
    ) -> Self {
        Self {
            config,
            database,
            rooms,
            reminders,
        }
    }

    /// Returns [`Config`] of this [`Service`].
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns [`Database`] of this [`Service`].
    ///
    /// [`Database`]: infra::Database
    #[must_use]
    pub fn database(&self) -> &Db {
        &self.database
    }

    /// Returns [`VideoRooms`] provider of this [`Service`].
    #[must_use]
    pub fn rooms(&self) -> &Arc<dyn VideoRooms> {
        &self.rooms
    }

    /// Returns [`Reminders`] dispatcher of this [`Service`].
    #[must_use]
    pub fn reminders(&self) -> &Arc<dyn Reminders> {
        &self.reminders
    }
}
