//! 32-bit ARGB colors

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Packed `0xAARRGGBB` color.
///
/// In memory (little endian) the bytes are laid out B, G, R, A.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    /// Fully transparent black
    pub const TRANSPARENT: Color = Color(0x0000_0000);
    /// Opaque black
    pub const BLACK: Color = Color(0xFF00_0000);
    /// Opaque white
    pub const WHITE: Color = Color(0xFFFF_FFFF);
    /// Opaque red
    pub const RED: Color = Color(0xFFFF_0000);
    /// Opaque green
    pub const GREEN: Color = Color(0xFF00_FF00);
    /// Opaque blue
    pub const BLUE: Color = Color(0xFF00_00FF);

    /// Build a color from separate channels
    #[must_use]
    pub const fn argb(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self((a as u32) << 24 | (r as u32) << 16 | (g as u32) << 8 | b as u32)
    }

    /// Build a color from channels given in RGBA order
    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::argb(a, r, g, b)
    }

    /// Opaque color from RGB channels
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::argb(255, r, g, b)
    }

    /// Alpha channel
    #[must_use]
    #[inline]
    pub const fn a(self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Red channel
    #[must_use]
    #[inline]
    pub const fn r(self) -> u8 {
        (self.0 >> 16) as u8
    }

    /// Green channel
    #[must_use]
    #[inline]
    pub const fn g(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Blue channel
    #[must_use]
    #[inline]
    pub const fn b(self) -> u8 {
        self.0 as u8
    }

    /// Returns the shared byte value if all four channels are equal
    #[must_use]
    pub const fn uniform_byte(self) -> Option<u8> {
        let b = self.b();
        if self.g() == b && self.r() == b && self.a() == b {
            Some(b)
        } else {
            None
        }
    }

    /// Averaging blend of `self` over `dst`.
    ///
    /// Alpha 0 keeps `dst`, alpha 255 replaces it, anything else averages
    /// every channel (alpha included) without weighting.
    #[must_use]
    #[inline]
    pub const fn average_over(self, dst: Color) -> Color {
        match self.a() {
            0 => dst,
            255 => self,
            _ => Color::argb(
                avg(self.a(), dst.a()),
                avg(self.r(), dst.r()),
                avg(self.g(), dst.g()),
                avg(self.b(), dst.b()),
            ),
        }
    }

    /// Source-over alpha compositing of `self` onto `dst`.
    #[must_use]
    #[inline]
    pub const fn composite_over(self, dst: Color) -> Color {
        let alpha = self.a() as u16;
        match alpha {
            0 => dst,
            255 => self,
            _ => Color::argb(
                (alpha + blend_channel(0, dst.a(), alpha) as u16) as u8,
                blend_channel(self.r(), dst.r(), alpha),
                blend_channel(self.g(), dst.g(), alpha),
                blend_channel(self.b(), dst.b(), alpha),
            ),
        }
    }
}

impl From<[u8; 4]> for Color {
    /// Converts RGBA bytes.
    fn from([r, g, b, a]: [u8; 4]) -> Self {
        Color::rgba(r, g, b, a)
    }
}

impl From<Color> for [u8; 4] {
    fn from(color: Color) -> Self {
        [color.r(), color.g(), color.b(), color.a()]
    }
}

#[inline]
const fn avg(a: u8, b: u8) -> u8 {
    ((a as u16 + b as u16) / 2) as u8
}

/// Alpha blend a single channel.
/// Uses `(x + 1 + (x >> 8)) >> 8` instead of `x / 255`.
#[inline]
const fn blend_channel(src: u8, dst: u8, alpha: u16) -> u8 {
    let result = src as u16 * alpha + dst as u16 * (255 - alpha);
    ((result + 1 + (result >> 8)) >> 8) as u8
}
