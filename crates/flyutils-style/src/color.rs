use std::fmt;
use std::str::FromStr;

/// Color space a set of normalized components is expressed in.
///
/// Components are stored as-is; no conversion happens between spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorSpace {
    #[default]
    Srgb,
    DisplayP3,
}

/// 8-bit RGB triple, the decoded form of a `0xRRGGBB` literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb8 {
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Decode the low 24 bits of `hex` as `0xRRGGBB`.
    #[must_use]
    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xFF) as u8,
            g: ((hex >> 8) & 0xFF) as u8,
            b: (hex & 0xFF) as u8,
        }
    }

    #[must_use]
    pub const fn as_hex(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | (self.b as u32)
    }

    /// Normalize to an [`Rgba`] in the given space.
    #[must_use]
    pub fn to_rgba(self, alpha: f32, space: ColorSpace) -> Rgba {
        Rgba::new(
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
            alpha,
            space,
        )
    }
}

impl From<u32> for Rgb8 {
    fn from(hex: u32) -> Self {
        Self::from_hex(hex)
    }
}

/// Normalized color with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
    pub alpha: f32,
    pub space: ColorSpace,
}

impl Rgba {
    /// Build a color, clamping every component into `0.0..=1.0`.
    ///
    /// NaN components become `0.0`.
    #[must_use]
    pub fn new(red: f32, green: f32, blue: f32, alpha: f32, space: ColorSpace) -> Self {
        Self {
            red: unit(red),
            green: unit(green),
            blue: unit(blue),
            alpha: unit(alpha),
            space,
        }
    }

    /// sRGB color from `0xRRGGBB`.
    #[must_use]
    pub fn from_hex(hex: u32, alpha: f32) -> Self {
        Rgb8::from_hex(hex).to_rgba(alpha, ColorSpace::Srgb)
    }

    /// Display-P3 color from `0xRRGGBB`.
    #[must_use]
    pub fn from_p3_hex(hex: u32, alpha: f32) -> Self {
        Rgb8::from_hex(hex).to_rgba(alpha, ColorSpace::DisplayP3)
    }

    /// Same color with a different alpha.
    #[must_use]
    pub fn with_alpha(self, alpha: f32) -> Self {
        Self {
            alpha: unit(alpha),
            ..self
        }
    }

    /// Quantize the color channels back to bytes (alpha is dropped).
    #[must_use]
    pub fn to_rgb8(self) -> Rgb8 {
        Rgb8::new(
            quantize(self.red),
            quantize(self.green),
            quantize(self.blue),
        )
    }

    /// Parse `#RGB`, `#RRGGBB` or `#RRGGBBAA` (the `#` is optional) as sRGB.
    pub fn parse_hex(input: &str) -> Result<Self, ColorParseError> {
        let digits = input.trim();
        let digits = digits.strip_prefix('#').unwrap_or(digits);
        if digits.is_empty() {
            return Err(ColorParseError::Empty);
        }
        if let Some(bad) = digits.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(ColorParseError::InvalidDigit(bad));
        }
        let len = digits.len();
        if !matches!(len, 3 | 6 | 8) {
            return Err(ColorParseError::InvalidLength(len));
        }
        let value = u32::from_str_radix(digits, 16).map_err(|_| ColorParseError::Empty)?;
        match len {
            3 => {
                let expand = |nibble: u32| (nibble & 0xF) * 0x11;
                let hex = (expand(value >> 8) << 16) | (expand(value >> 4) << 8) | expand(value);
                Ok(Self::from_hex(hex, 1.0))
            }
            6 => Ok(Self::from_hex(value, 1.0)),
            8 => Ok(Self::from_hex(value >> 8, (value & 0xFF) as f32 / 255.0)),
            len => Err(ColorParseError::InvalidLength(len)),
        }
    }
}

impl FromStr for Rgba {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_hex(s)
    }
}

fn unit(component: f32) -> f32 {
    if component.is_nan() {
        0.0
    } else {
        component.clamp(0.0, 1.0)
    }
}

fn quantize(component: f32) -> u8 {
    (component * 255.0).round() as u8
}

/// Errors from [`Rgba::parse_hex`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorParseError {
    /// No digits after trimming and stripping `#`.
    Empty,
    /// Digit count other than 3, 6 or 8.
    InvalidLength(usize),
    /// A character that is not a hex digit.
    InvalidDigit(char),
}

impl fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty color string"),
            Self::InvalidLength(len) => {
                write!(f, "expected 3, 6 or 8 hex digits, found {len}")
            }
            Self::InvalidDigit(c) => write!(f, "invalid hex digit '{c}'"),
        }
    }
}

impl std::error::Error for ColorParseError {}

/// Build colors directly from `0xRRGGBB` integer literals.
///
/// ```
/// use flyutils_style::{ColorSpace, HexColor};
///
/// let accent = 0xFF8800u32.rgb_color();
/// assert_eq!(accent.red, 1.0);
/// assert_eq!(0x336699u32.p3_color_alpha(0.5).space, ColorSpace::DisplayP3);
/// ```
pub trait HexColor: Copy {
    /// The value masked to its low 24 bits.
    fn hex_bits(self) -> u32;

    fn rgb_color(self) -> Rgba {
        self.rgb_color_alpha(1.0)
    }

    fn rgb_color_alpha(self, alpha: f32) -> Rgba {
        Rgba::from_hex(self.hex_bits(), alpha)
    }

    fn p3_color(self) -> Rgba {
        self.p3_color_alpha(1.0)
    }

    fn p3_color_alpha(self, alpha: f32) -> Rgba {
        Rgba::from_p3_hex(self.hex_bits(), alpha)
    }
}

impl HexColor for u32 {
    fn hex_bits(self) -> u32 {
        self & 0x00FF_FFFF
    }
}

impl HexColor for i32 {
    fn hex_bits(self) -> u32 {
        (self as u32) & 0x00FF_FFFF
    }
}

impl HexColor for i64 {
    fn hex_bits(self) -> u32 {
        (self as u32) & 0x00FF_FFFF
    }
}
