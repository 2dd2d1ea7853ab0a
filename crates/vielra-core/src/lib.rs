//! # vielra-core: Pure State Logic for Vielra
//!
//! This crate is the **heart** of the Vielra state layer. It contains the
//! slice contracts, the root reducer, the palette engine and the translation
//! aggregator as pure code with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Vielra State Architecture                        │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  Presentation (screens)                         │   │
//! │  │     reads: Theme, Translator, selectors   writes: dispatch()    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            vielra-store / vielra-effects (runtime)              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ vielra-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  slice    │  │  reducer  │  │   theme   │  │   i18n    │  │   │
//! │  │   │ Slice     │  │ Registry  │  │ derive_   │  │ Resource  │  │   │
//! │  │   │ Persist.  │  │ RootRed.  │  │ theme()   │  │ Aggregator│  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO STORAGE • NO NETWORK • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`action`] - The `Action` contract every root action enum implements
//! - [`slice`] - The `Slice` contract and persistence policies
//! - [`reducer`] - Slice registry and root reducer (store composer)
//! - [`tree`] - The composed state tree
//! - [`theme`] - Palette engine
//! - [`i18n`] - Translation resource aggregator
//! - [`modules`] - Feature slices (app, auth, settings, phrasebook)
//! - [`root`] - The application's root action and registry
//!
//! ## Example Usage
//!
//! ```rust
//! use vielra_core::modules::app::AppSliceAction;
//! use vielra_core::root::{app_registry, AppAction};
//! use vielra_core::theme::PaletteMode;
//!
//! let reducer = app_registry().expect("valid registry").compose();
//! let tree = reducer.initial_tree();
//! let next = reducer.reduce(&tree, &AppAction::App(AppSliceAction::TogglePaletteMode));
//!
//! assert_eq!(vielra_core::root::selectors::palette_mode(&next), PaletteMode::Dark);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod action;
pub mod error;
pub mod i18n;
pub mod modules;
pub mod reducer;
pub mod root;
pub mod slice;
pub mod theme;
pub mod tree;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use action::Action;
pub use error::{ConfigurationError, CoreError, CoreResult};
pub use i18n::{LanguageCode, MessageModule, ResourceAggregator, TranslationBundle};
pub use reducer::{RootReducer, SliceRegistry};
pub use slice::{DynSlice, Persistence, Slice, SliceValue};
pub use theme::{derive_theme, derive_theme_with, PaletteMode, PaletteOverrides, Theme};
pub use tree::StateTree;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Version of the persisted snapshot envelope.
///
/// Bumped only when the envelope itself changes shape; slice shapes carry
/// their own [`Slice::VERSION`].
pub const SNAPSHOT_FORMAT: u32 = 1;
