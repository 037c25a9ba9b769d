//! Embed colours

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// A 24-bit RGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(pub u32);

impl Color {
    /// `#000000`
    pub const DEFAULT: Self = Self(0x00_0000);
    /// `#1ABC9C`
    pub const TEAL: Self = Self(0x1A_BC9C);
    /// `#11806A`
    pub const DARK_TEAL: Self = Self(0x11_806A);
    /// `#57F287`
    pub const BRAND_GREEN: Self = Self(0x57_F287);
    /// `#2ECC71`
    pub const GREEN: Self = Self(0x2E_CC71);
    /// `#1F8B4C`
    pub const DARK_GREEN: Self = Self(0x1F_8B4C);
    /// `#3498DB`
    pub const BLUE: Self = Self(0x34_98DB);
    /// `#206694`
    pub const DARK_BLUE: Self = Self(0x20_6694);
    /// `#9B59B6`
    pub const PURPLE: Self = Self(0x9B_59B6);
    /// `#71368A`
    pub const DARK_PURPLE: Self = Self(0x71_368A);
    /// `#E91E63`
    pub const MAGENTA: Self = Self(0xE9_1E63);
    /// `#AD1457`
    pub const DARK_MAGENTA: Self = Self(0xAD_1457);
    /// `#F1C40F`
    pub const GOLD: Self = Self(0xF1_C40F);
    /// `#C27C0E`
    pub const DARK_GOLD: Self = Self(0xC2_7C0E);
    /// `#E67E22`
    pub const ORANGE: Self = Self(0xE6_7E22);
    /// `#A84300`
    pub const DARK_ORANGE: Self = Self(0xA8_4300);
    /// `#ED4245`
    pub const BRAND_RED: Self = Self(0xED_4245);
    /// `#E74C3C`
    pub const RED: Self = Self(0xE7_4C3C);
    /// `#992D22`
    pub const DARK_RED: Self = Self(0x99_2D22);
    /// `#95A5A6`
    pub const LIGHTER_GREY: Self = Self(0x95_A5A6);
    /// `#607D8B`
    pub const DARK_GREY: Self = Self(0x60_7D8B);
    /// `#979C9F`
    pub const LIGHT_GREY: Self = Self(0x97_9C9F);
    /// `#546E7A`
    pub const DARKER_GREY: Self = Self(0x54_6E7A);
    /// `#7289DA`
    pub const OG_BLURPLE: Self = Self(0x72_89DA);
    /// `#5865F2`
    pub const BLURPLE: Self = Self(0x58_65F2);
    /// `#99AAB5`
    pub const GREYPLE: Self = Self(0x99_AAB5);
    /// `#313338`
    pub const DARK_THEME: Self = Self(0x31_3338);
    /// `#EB459E`
    pub const FUCHSIA: Self = Self(0xEB_459E);
    /// `#FEE75C`
    pub const YELLOW: Self = Self(0xFE_E75C);
    /// `#EB459F`
    pub const PINK: Self = Self(0xEB_459F);

    /// Look up a palette colour by name (`dark_teal`, `blurple`, ...)
    ///
    /// `gray` is accepted as a spelling of `grey`.
    #[must_use]
    pub fn named(name: &str) -> Option<Self> {
        let name = name.to_lowercase().replace("gray", "grey");
        let color = match name.as_str() {
            "default" => Self::DEFAULT,
            "teal" => Self::TEAL,
            "dark_teal" => Self::DARK_TEAL,
            "brand_green" => Self::BRAND_GREEN,
            "green" => Self::GREEN,
            "dark_green" => Self::DARK_GREEN,
            "blue" => Self::BLUE,
            "dark_blue" => Self::DARK_BLUE,
            "purple" => Self::PURPLE,
            "dark_purple" => Self::DARK_PURPLE,
            "magenta" => Self::MAGENTA,
            "dark_magenta" => Self::DARK_MAGENTA,
            "gold" => Self::GOLD,
            "dark_gold" => Self::DARK_GOLD,
            "orange" => Self::ORANGE,
            "dark_orange" => Self::DARK_ORANGE,
            "brand_red" => Self::BRAND_RED,
            "red" => Self::RED,
            "dark_red" => Self::DARK_RED,
            "lighter_grey" => Self::LIGHTER_GREY,
            "dark_grey" => Self::DARK_GREY,
            "light_grey" => Self::LIGHT_GREY,
            "darker_grey" => Self::DARKER_GREY,
            "og_blurple" => Self::OG_BLURPLE,
            "blurple" => Self::BLURPLE,
            "greyple" => Self::GREYPLE,
            "dark_theme" => Self::DARK_THEME,
            "fuchsia" => Self::FUCHSIA,
            "yellow" => Self::YELLOW,
            "pink" => Self::PINK,
            _ => return None,
        };
        Some(color)
    }

    /// Parse a 6-digit hex code, with or without a leading `#`
    #[must_use]
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 {
            return None;
        }
        u32::from_str_radix(hex, 16).ok().map(Self)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06X}", self.0)
    }
}

/// Turn user input into a colour: a palette name or a hex code
///
/// Unknown input falls back to [`Color::BLURPLE`].
#[must_use]
pub fn str_to_color(input: &str) -> Color {
    let input = input.trim();

    if let Some(color) = Color::named(input).or_else(|| Color::from_hex(input)) {
        return color;
    }

    warn!("Invalid color string '{}', falling back to blurple.", input);
    Color::BLURPLE
}
