//! Iteration count to pixel color.
//!
//! Bounded points are opaque black. Escaped points shade from a warm cream
//! toward dark brown as the escape takes longer:
//!
//! ```text
//! R = 235 - 2·n    G = 220 - 2·n    B = 200 - 2·n
//! ```
//!
//! With `MAX_ITERATIONS = 100` an escaped point has `n <= 99`, so the darkest
//! escaped shade is `(37, 22, 2)`. Channels saturate at zero if the budget is
//! ever raised.

use image::Rgba;

use crate::escape::EscapeResult;

pub const BOUNDED_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);
pub const ESCAPE_BASE: [u8; 3] = [235, 220, 200];
pub const ESCAPE_SHADE_STEP: u32 = 2;

pub fn map_color(bounded: bool, iterations: u32) -> Rgba<u8> {
    if bounded {
        return BOUNDED_COLOR;
    }

    let shade = iterations.saturating_mul(ESCAPE_SHADE_STEP);
    let [r, g, b] = ESCAPE_BASE.map(|base| u32::from(base).saturating_sub(shade) as u8);
    Rgba([r, g, b, 255])
}

impl EscapeResult {
    #[inline]
    pub fn color(&self) -> Rgba<u8> {
        map_color(self.bounded, self.iterations)
    }
}
