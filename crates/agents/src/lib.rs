//! Batch coordination and platform integrations for the content agent.

pub mod batch;
pub mod error;
pub mod integrations;

pub use {
    batch::{BatchCoordinator, BatchReport},
    error::{Error, Result},
    integrations::{Handshake, IntegrationManager, IntegrationState, Platform, SimulatedHandshake},
};
