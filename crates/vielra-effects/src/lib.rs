//! # vielra-effects: Effect Orchestrator for Vielra
//!
//! Asynchronous side effects live here and only here. Reducers stay pure;
//! effects observe dispatched actions, talk to the network collaborator and
//! report back with follow-up actions.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Store ── listen() ──► ┌──────────────────────────────────────────┐     │
//! │    ▲                   │        vielra-effects (THIS CRATE)       │     │
//! │    │                   │                                          │     │
//! │    │                   │   EffectOrchestrator                     │     │
//! │    │                   │     │  single-flight per key             │     │
//! │    │                   │     ▼                                    │     │
//! │    │                   │   LoginEffect, RevalidateTokenEffect,    │     │
//! │    │                   │   FetchPhraseCategoriesEffect, ...       │     │
//! │    │                   │     │                │                   │     │
//! │    │                   │     ▼                ▼                   │     │
//! │    │                   │   dyn ApiClient    TokenStore            │     │
//! │    │                   └──────────────────────┬───────────────────┘     │
//! │    │                                          │                         │
//! │    └──────── dispatch(follow-up) ◄────────────┘                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`effect`] - The `Effect` contract, flight policies, effect table
//! - [`orchestrator`] - Supervisor task and control handle
//! - [`api`] - Network collaborator trait and status mapping
//! - [`token`] - Access token storage
//! - [`effects`] - Auth and phrasebook effects
//! - [`error`] - Transport, failure and handle errors

pub mod api;
pub mod effect;
pub mod effects;
pub mod error;
pub mod orchestrator;
pub mod token;

pub use api::{ApiClient, ApiRequest, ApiResponse, Method, OfflineApiClient, SharedApiClient};
pub use effect::{CancelSignal, Effect, EffectContext, EffectTable, FlightPolicy};
pub use effects::app_effects;
pub use error::{EffectError, EffectFailure, EffectResult, ServerValidationError, TransportError};
pub use orchestrator::{EffectOrchestrator, OrchestratorConfig, OrchestratorHandle};
pub use token::{TokenStore, ACCESS_TOKEN_KEY};
