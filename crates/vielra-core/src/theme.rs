//! # Palette Engine
//!
//! Derives a complete [`Theme`] from a [`PaletteMode`]. The result is a fresh
//! value built from immutable static tables; nothing is cached or mutated.
//!
//! ## Derivation
//! ```text
//! ┌──────────────┐   ┌──────────────────────┐
//! │ BASE_PALETTE │   │ LIGHT / DARK palette │   mode-specific keys
//! │ primary      │   │ mode, text, status,  │
//! │ secondary    │   │ background, divider, │
//! │ common       │   │ action               │
//! └──────┬───────┘   └──────────┬───────────┘
//!        └────────┬─────────────┘
//!                 ▼
//!          Palette::compose ──► merge(overrides) ──► Theme { palette,
//!                                                            typography,
//!                                                            shape, spacing }
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

const FONT_FAMILY: &str = "Plus Jakarta Sans";

// =============================================================================
// Palette Mode
// =============================================================================

/// Two-valued display mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaletteMode {
    #[default]
    Light,
    Dark,
}

impl PaletteMode {
    /// The other mode.
    pub fn toggled(self) -> Self {
        match self {
            PaletteMode::Light => PaletteMode::Dark,
            PaletteMode::Dark => PaletteMode::Light,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaletteMode::Light => "light",
            PaletteMode::Dark => "dark",
        }
    }
}

impl fmt::Display for PaletteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaletteMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(PaletteMode::Light),
            "dark" => Ok(PaletteMode::Dark),
            other => Err(CoreError::UnknownPaletteMode(other.to_string())),
        }
    }
}

// =============================================================================
// Palette Types
// =============================================================================

/// Shades of one color role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorSet {
    pub main: &'static str,
    pub light: &'static str,
    pub dark: &'static str,
    pub contrast_text: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommonColors {
    pub white: &'static str,
    pub black: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TextColors {
    pub primary: &'static str,
    pub secondary: &'static str,
    pub disabled: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BackgroundColors {
    pub default: &'static str,
    pub paper: &'static str,
}

/// Interaction state colors and opacities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionColors {
    pub active: &'static str,
    pub hover: &'static str,
    pub hover_opacity: f32,
    pub selected: &'static str,
    pub selected_opacity: f32,
    pub disabled: &'static str,
    pub disabled_background: &'static str,
    pub disabled_opacity: f32,
    pub focus: &'static str,
    pub focus_opacity: f32,
    pub activated_opacity: f32,
}

/// Mode-independent brand colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasePalette {
    pub primary: ColorSet,
    pub secondary: ColorSet,
    pub common: CommonColors,
}

/// Mode-specific colors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModePalette {
    pub mode: PaletteMode,
    pub text: TextColors,
    pub background: BackgroundColors,
    pub success: ColorSet,
    pub info: ColorSet,
    pub warning: ColorSet,
    pub error: ColorSet,
    pub divider: &'static str,
    pub action: ActionColors,
}

/// Fully resolved palette.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Palette {
    pub mode: PaletteMode,
    pub primary: ColorSet,
    pub secondary: ColorSet,
    pub common: CommonColors,
    pub text: TextColors,
    pub background: BackgroundColors,
    pub success: ColorSet,
    pub info: ColorSet,
    pub warning: ColorSet,
    pub error: ColorSet,
    pub divider: &'static str,
    pub action: ActionColors,
}

/// Optional per-key replacements applied on top of a resolved palette.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PaletteOverrides {
    pub primary: Option<ColorSet>,
    pub secondary: Option<ColorSet>,
    pub common: Option<CommonColors>,
    pub text: Option<TextColors>,
    pub background: Option<BackgroundColors>,
    pub success: Option<ColorSet>,
    pub info: Option<ColorSet>,
    pub warning: Option<ColorSet>,
    pub error: Option<ColorSet>,
    pub divider: Option<&'static str>,
    pub action: Option<ActionColors>,
}

/// Color roles addressable by components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorRole {
    Primary,
    Secondary,
    Success,
    Info,
    Warning,
    Error,
}

impl Palette {
    /// Combines brand colors with a mode palette.
    pub fn compose(base: &BasePalette, mode: &ModePalette) -> Palette {
        Palette {
            mode: mode.mode,
            primary: base.primary,
            secondary: base.secondary,
            common: base.common,
            text: mode.text,
            background: mode.background,
            success: mode.success,
            info: mode.info,
            warning: mode.warning,
            error: mode.error,
            divider: mode.divider,
            action: mode.action,
        }
    }

    /// Returns a copy where every key set in `overrides` wins.
    pub fn merge(&self, overrides: &PaletteOverrides) -> Palette {
        Palette {
            mode: self.mode,
            primary: overrides.primary.unwrap_or(self.primary),
            secondary: overrides.secondary.unwrap_or(self.secondary),
            common: overrides.common.unwrap_or(self.common),
            text: overrides.text.unwrap_or(self.text),
            background: overrides.background.unwrap_or(self.background),
            success: overrides.success.unwrap_or(self.success),
            info: overrides.info.unwrap_or(self.info),
            warning: overrides.warning.unwrap_or(self.warning),
            error: overrides.error.unwrap_or(self.error),
            divider: overrides.divider.unwrap_or(self.divider),
            action: overrides.action.unwrap_or(self.action),
        }
    }

    /// Shades of a color role.
    pub fn role(&self, role: ColorRole) -> &ColorSet {
        match role {
            ColorRole::Primary => &self.primary,
            ColorRole::Secondary => &self.secondary,
            ColorRole::Success => &self.success,
            ColorRole::Info => &self.info,
            ColorRole::Warning => &self.warning,
            ColorRole::Error => &self.error,
        }
    }

    pub fn is_dark(&self) -> bool {
        self.mode == PaletteMode::Dark
    }
}

// =============================================================================
// Typography & Shape
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FontWeights {
    pub light: &'static str,
    pub regular: &'static str,
    pub medium: &'static str,
    pub bold: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextVariant {
    pub font_family: &'static str,
    pub font_size: f32,
    pub line_height: f32,
    pub letter_spacing: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Typography {
    pub font_weight: FontWeights,
    pub h1: TextVariant,
    pub h2: TextVariant,
    pub h3: TextVariant,
    pub h4: TextVariant,
    pub h5: TextVariant,
    pub h6: TextVariant,
    pub body1: TextVariant,
    pub body2: TextVariant,
    pub subtitle1: TextVariant,
    pub subtitle2: TextVariant,
    pub caption: TextVariant,
    pub button: TextVariant,
    pub overline: TextVariant,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Shape {
    pub border_radius: f32,
}

/// Layout spacing units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Spacing {
    pub unit: u16,
    pub horizontal: u16,
}

/// Derived visual tokens. Produced anew on every mode change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Theme {
    pub palette: Palette,
    pub typography: Typography,
    pub shape: Shape,
    pub spacing: Spacing,
}

// =============================================================================
// Static Tables
// =============================================================================

const GREY_400: &str = "#bdbdbd";
const GREY_600: &str = "#757575";
const GREY_900: &str = "#212121";

pub const BASE_PALETTE: BasePalette = BasePalette {
    primary: ColorSet {
        main: "#FF1D88",
        dark: "#DB1586",
        light: "#FFD1D5",
        contrast_text: "#fbfbfb",
    },
    secondary: ColorSet {
        main: "#0882ff",
        dark: "#0564DB",
        light: "#CDEFFF",
        contrast_text: "#fbfbfb",
    },
    common: CommonColors {
        white: "#ffffff",
        black: "#000000",
    },
};

const SUCCESS: ColorSet = ColorSet {
    main: "#02bf71",
    light: "#e9fff6",
    dark: "#04985a",
    contrast_text: "#fbfbfb",
};

const INFO: ColorSet = ColorSet {
    main: "#038fff",
    dark: "#066cc1",
    light: "#e8f7ff",
    contrast_text: "#fbfbfb",
};

const WARNING: ColorSet = ColorSet {
    main: "#ff9100",
    dark: "#ff9100",
    light: "#fdf4ed",
    contrast_text: "#fbfbfb",
};

const ERROR: ColorSet = ColorSet {
    main: "#f93324",
    light: "#fbedec",
    dark: "#de1a0a",
    contrast_text: "#fff7f7",
};

pub const LIGHT_PALETTE: ModePalette = ModePalette {
    mode: PaletteMode::Light,
    text: TextColors {
        primary: GREY_900,
        secondary: GREY_600,
        disabled: GREY_400,
    },
    background: BackgroundColors {
        default: "#f9f9f9",
        paper: "#ffffff",
    },
    success: SUCCESS,
    info: INFO,
    warning: WARNING,
    error: ERROR,
    divider: "rgba(0, 0, 0, 0.05)",
    action: ActionColors {
        active: "rgba(0, 0, 0, 0.54)",
        hover: "rgba(0, 0, 0, 0.04)",
        hover_opacity: 0.04,
        selected: "rgba(0, 0, 0, 0.08)",
        selected_opacity: 0.08,
        disabled: "rgba(0, 0, 0, 0.26)",
        disabled_background: "rgba(0, 0, 0, 0.12)",
        disabled_opacity: 0.38,
        focus: "rgba(0, 0, 0, 0.12)",
        focus_opacity: 0.12,
        activated_opacity: 0.12,
    },
};

pub const DARK_PALETTE: ModePalette = ModePalette {
    mode: PaletteMode::Dark,
    text: TextColors {
        primary: "#fbfbfb",
        secondary: "rgba(255, 255, 255, 0.75)",
        disabled: "rgba(255, 255, 255, 0.5)",
    },
    background: BackgroundColors {
        default: GREY_900,
        paper: "#0e0e0e",
    },
    success: SUCCESS,
    info: INFO,
    warning: WARNING,
    error: ERROR,
    divider: "rgba(255, 255, 255, 0.5)",
    action: ActionColors {
        active: "#fff",
        hover: "rgba(255, 255, 255, 0.08)",
        hover_opacity: 0.08,
        selected: "rgba(255, 255, 255, 0.16)",
        selected_opacity: 0.16,
        disabled: "rgba(255, 255, 255, 0.3)",
        disabled_background: "rgba(255, 255, 255, 0.12)",
        disabled_opacity: 0.38,
        focus: "rgba(255, 255, 255, 0.12)",
        focus_opacity: 0.12,
        activated_opacity: 0.24,
    },
};

const fn variant(font_size: f32, line_height: f32) -> TextVariant {
    TextVariant {
        font_family: FONT_FAMILY,
        font_size,
        line_height,
        letter_spacing: 0.2,
    }
}

pub const TYPOGRAPHY: Typography = Typography {
    font_weight: FontWeights {
        light: "200",
        regular: "400",
        medium: "500",
        bold: "600",
    },
    h1: variant(26.0, 32.0),
    h2: variant(22.0, 30.0),
    h3: variant(20.0, 28.0),
    h4: variant(18.0, 27.0),
    h5: variant(16.0, 24.0),
    h6: variant(14.2, 22.0),
    body1: variant(14.0, 19.0),
    body2: variant(13.0, 18.0),
    subtitle1: variant(12.0, 17.0),
    subtitle2: variant(11.2, 17.0),
    caption: variant(11.0, 17.0),
    button: variant(14.0, 18.0),
    overline: variant(12.0, 18.0),
};

pub const SHAPE: Shape = Shape { border_radius: 4.0 };

pub const SPACING: Spacing = Spacing {
    unit: 4,
    horizontal: 24,
};

// =============================================================================
// Derivation
// =============================================================================

/// Mode palette for `mode`.
pub fn mode_palette(mode: PaletteMode) -> &'static ModePalette {
    match mode {
        PaletteMode::Light => &LIGHT_PALETTE,
        PaletteMode::Dark => &DARK_PALETTE,
    }
}

/// Derives the theme for a mode.
pub fn derive_theme(mode: PaletteMode) -> Theme {
    Theme {
        palette: Palette::compose(&BASE_PALETTE, mode_palette(mode)),
        typography: TYPOGRAPHY,
        shape: SHAPE,
        spacing: SPACING,
    }
}

/// Derives the theme for a mode, then applies palette overrides.
pub fn derive_theme_with(mode: PaletteMode, overrides: &PaletteOverrides) -> Theme {
    let mut theme = derive_theme(mode);
    theme.palette = theme.palette.merge(overrides);
    theme
}
