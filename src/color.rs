use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConvertError;

// ------------------------------------------------------------
// sRGB color
// ------------------------------------------------------------

/// An 8-bit sRGB color. Plain value type, compared by channels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::new(255, 255, 255);
    pub const BLACK: Color = Color::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#RRGGBB` or `RRGGBB`.
    pub fn from_hex(s: &str) -> Result<Self, ConvertError> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(ConvertError::InvalidHex(s.to_string()));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| ConvertError::InvalidHex(s.to_string()))
        };
        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    pub fn to_hex(self) -> String {
        format!("{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Perceived brightness on the 0-255 scale, `(r*299 + g*587 + b*114) / 1000`.
    #[inline(always)]
    pub fn brightness(self) -> u32 {
        (self.r as u32 * 299 + self.g as u32 * 587 + self.b as u32 * 114) / 1000
    }

    #[inline(always)]
    pub fn squared_rgb_distance(self, other: Color) -> u32 {
        let dr = self.r as i32 - other.r as i32;
        let dg = self.g as i32 - other.g as i32;
        let db = self.b as i32 - other.b as i32;
        (dr * dr + dg * dg + db * db) as u32
    }

    pub fn to_lab(self) -> LabColor {
        to_lab(self)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.to_hex())
    }
}

// ------------------------------------------------------------
// CIE Lab
// ------------------------------------------------------------

/// CIE L*a*b* (D65) coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize)]
pub struct LabColor {
    pub l: f64,
    pub a: f64,
    pub b: f64,
}

impl LabColor {
    pub const fn new(l: f64, a: f64, b: f64) -> Self {
        Self { l, a, b }
    }

    /// Hue angle in degrees, `atan2(b, a)` normalised to `[0, 360)`.
    #[inline]
    pub fn hue_degrees(&self) -> f64 {
        self.b.atan2(self.a).to_degrees().rem_euclid(360.0)
    }
}

// D65 reference white
const XN: f64 = 0.95047;
const YN: f64 = 1.0;
const ZN: f64 = 1.08883;

#[inline(always)]
fn srgb_to_linear(c: u8) -> f64 {
    let v = c as f64 / 255.0;
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

// CIE ε and κ, exact rational forms.
const LAB_EPSILON: f64 = 216.0 / 24389.0;
const LAB_KAPPA: f64 = 24389.0 / 27.0;

#[inline(always)]
fn lab_f(t: f64) -> f64 {
    if t > LAB_EPSILON {
        t.cbrt()
    } else {
        (LAB_KAPPA * t + 16.0) / 116.0
    }
}

/// sRGB → linear → XYZ (D65) → Lab.
pub fn to_lab(color: Color) -> LabColor {
    let r = srgb_to_linear(color.r);
    let g = srgb_to_linear(color.g);
    let b = srgb_to_linear(color.b);

    let x = r * 0.4124564 + g * 0.3575761 + b * 0.1804375;
    let y = r * 0.2126729 + g * 0.7151522 + b * 0.0721750;
    let z = r * 0.0193339 + g * 0.1191920 + b * 0.9503041;

    let fx = lab_f(x / XN);
    let fy = lab_f(y / YN);
    let fz = lab_f(z / ZN);

    LabColor {
        l: 116.0 * fy - 16.0,
        a: 500.0 * (fx - fy),
        b: 200.0 * (fy - fz),
    }
}

/// CIE76: plain Euclidean distance in Lab.
#[inline]
pub fn delta_e76(x: LabColor, y: LabColor) -> f64 {
    let dl = x.l - y.l;
    let da = x.a - y.a;
    let db = x.b - y.b;
    (dl * dl + da * da + db * db).sqrt()
}

const POW25_7: f64 = 6_103_515_625.0; // 25^7

/// CIEDE2000 color difference with unit weighting factors (kL = kC = kH = 1).
pub fn delta_e2000(x: LabColor, y: LabColor) -> f64 {
    let (l1, a1, b1) = (x.l, x.a, x.b);
    let (l2, a2, b2) = (y.l, y.a, y.b);

    let c1 = (a1 * a1 + b1 * b1).sqrt();
    let c2 = (a2 * a2 + b2 * b2).sqrt();
    let avg_c = 0.5 * (c1 + c2);
    let avg_c7 = avg_c.powi(7);
    let g = 0.5 * (1.0 - (avg_c7 / (avg_c7 + POW25_7)).sqrt());

    let a1p = (1.0 + g) * a1;
    let a2p = (1.0 + g) * a2;
    let c1p = (a1p * a1p + b1 * b1).sqrt();
    let c2p = (a2p * a2p + b2 * b2).sqrt();

    let h1p = hue_prime(b1, a1p);
    let h2p = hue_prime(b2, a2p);

    let delta_lp = l2 - l1;
    let delta_cp = c2p - c1p;

    // Achromatic pairs carry no hue information; every hue term collapses to 0.
    let chromatic = c1p * c2p != 0.0;

    let delta_hp_deg = if !chromatic {
        0.0
    } else {
        let diff = h2p - h1p;
        if diff.abs() <= 180.0 {
            diff
        } else if diff > 180.0 {
            diff - 360.0
        } else {
            diff + 360.0
        }
    };
    // sin(|x|) with the sign restored keeps d(a, b) == d(b, a) bit for bit.
    let delta_hp = 2.0
        * (c1p * c2p).sqrt()
        * (delta_hp_deg.abs().to_radians() / 2.0).sin().copysign(delta_hp_deg);

    let avg_lp = 0.5 * (l1 + l2);
    let avg_cp = 0.5 * (c1p + c2p);
    let avg_hp = if !chromatic {
        h1p + h2p
    } else if (h1p - h2p).abs() <= 180.0 {
        0.5 * (h1p + h2p)
    } else if h1p + h2p < 360.0 {
        0.5 * (h1p + h2p + 360.0)
    } else {
        0.5 * (h1p + h2p - 360.0)
    };

    let t = 1.0 - 0.17 * (avg_hp - 30.0).to_radians().cos()
        + 0.24 * (2.0 * avg_hp).to_radians().cos()
        + 0.32 * (3.0 * avg_hp + 6.0).to_radians().cos()
        - 0.20 * (4.0 * avg_hp - 63.0).to_radians().cos();

    let delta_theta = 30.0 * (-((avg_hp - 275.0) / 25.0).powi(2)).exp();
    let avg_cp7 = avg_cp.powi(7);
    let rc = 2.0 * (avg_cp7 / (avg_cp7 + POW25_7)).sqrt();
    let lm50 = (avg_lp - 50.0).powi(2);
    let sl = 1.0 + (0.015 * lm50) / (20.0 + lm50).sqrt();
    let sc = 1.0 + 0.045 * avg_cp;
    let sh = 1.0 + 0.015 * avg_cp * t;
    let rt = -(2.0 * delta_theta).to_radians().sin() * rc;

    let dl = delta_lp / sl;
    let dc = delta_cp / sc;
    let dh = delta_hp / sh;

    (dl * dl + dc * dc + dh * dh + rt * dc * dh).max(0.0).sqrt()
}

#[inline(always)]
fn hue_prime(b: f64, a_prime: f64) -> f64 {
    if b == 0.0 && a_prime == 0.0 {
        0.0
    } else {
        b.atan2(a_prime).to_degrees().rem_euclid(360.0)
    }
}

/// Shortest angular distance between two hues, in degrees `[0, 180]`.
#[inline]
pub fn hue_distance(h1: f64, h2: f64) -> f64 {
    let d = (h1 - h2).rem_euclid(360.0);
    d.min(360.0 - d)
}

// ------------------------------------------------------------
// Per-run Lab cache
// ------------------------------------------------------------

/// Memoises `to_lab` per distinct color for the lifetime of one conversion.
#[derive(Debug, Default)]
pub struct LabCache {
    map: HashMap<Color, LabColor>,
}

impl LabCache {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn lab(&mut self, color: Color) -> LabColor {
        *self.map.entry(color).or_insert_with(|| to_lab(color))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::palette::{FromColor, Lab, Srgb, color_difference::Ciede2000, white_point::D65};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn reference_lab(c: Color) -> Lab<D65, f32> {
        Lab::from_color(Srgb::new(c.r, c.g, c.b).into_format::<f32>())
    }

    fn random_color(rng: &mut StdRng) -> Color {
        Color::new(rng.r#gen(), rng.r#gen(), rng.r#gen())
    }

    #[test]
    fn white_and_black_hit_lab_extremes() {
        let white = to_lab(Color::WHITE);
        assert!((white.l - 100.0).abs() < 0.01, "{white:?}");
        assert!(white.a.abs() < 0.01 && white.b.abs() < 0.01);

        let black = to_lab(Color::BLACK);
        assert!(black.l.abs() < 1e-9);
        assert!(black.a.abs() < 1e-9 && black.b.abs() < 1e-9);
    }

    #[test]
    fn lab_agrees_with_palette_crate() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let c = random_color(&mut rng);
            let ours = to_lab(c);
            let theirs = reference_lab(c);
            assert!((ours.l - theirs.l as f64).abs() < 0.1, "{c}: {ours:?} vs {theirs:?}");
            assert!((ours.a - theirs.a as f64).abs() < 0.2, "{c}: {ours:?} vs {theirs:?}");
            assert!((ours.b - theirs.b as f64).abs() < 0.2, "{c}: {ours:?} vs {theirs:?}");
        }
    }

    #[test]
    fn lab_f_is_continuous_at_epsilon() {
        // Both branches meet at 6/29.
        assert!((lab_f(LAB_EPSILON) - 6.0 / 29.0).abs() < 1e-15);
        assert!((LAB_EPSILON.cbrt() - 6.0 / 29.0).abs() < 1e-15);
        let below = lab_f(LAB_EPSILON * (1.0 - 1e-9));
        let above = lab_f(LAB_EPSILON * (1.0 + 1e-9));
        assert!((above - below).abs() < 1e-9);
    }

    #[test]
    fn dark_greys_match_palette_crate() {
        // Linear branch of the Lab transfer function.
        for v in 0..=24u8 {
            let c = Color::new(v, v, v);
            let ours = to_lab(c);
            let theirs: Lab<D65, f64> = Lab::from_color(Srgb::new(v, v, v).into_format::<f64>());
            assert!((ours.l - theirs.l).abs() < 1e-3, "{c}: {ours:?} vs {theirs:?}");
        }
    }

    #[test]
    fn ciede2000_matches_published_pairs() {
        // Sharma, Wu & Dalal test data.
        let pairs = [
            ((50.0, 2.6772, -79.7751), (50.0, 0.0, -82.7485), 2.0425),
            ((50.0, 3.1571, -77.2803), (50.0, 0.0, -82.7485), 2.8615),
            ((50.0, -1.3802, -84.2814), (50.0, 0.0, -82.7485), 1.0),
            ((50.0, 2.5, 0.0), (50.0, 0.0, -2.5), 4.3065),
            ((50.0, 2.5, 0.0), (73.0, 25.0, -18.0), 27.1492),
            ((60.2574, -34.0099, 36.2677), (60.4626, -34.1751, 39.4387), 1.2644),
            ((22.7233, 20.0904, -46.6940), (23.0331, 14.9730, -42.5619), 2.0373),
            ((90.8027, -2.0831, 1.4410), (91.1528, -1.6435, 0.0447), 1.4441),
            ((2.0776, 0.0795, -1.1350), (0.9033, -0.0636, -0.5514), 0.9082),
        ];
        for ((l1, a1, b1), (l2, a2, b2), expected) in pairs {
            let d = delta_e2000(LabColor::new(l1, a1, b1), LabColor::new(l2, a2, b2));
            assert!((d - expected).abs() < 1e-4, "expected {expected}, got {d}");
        }
    }

    #[test]
    fn ciede2000_is_zero_against_itself() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..64 {
            let lab = to_lab(random_color(&mut rng));
            assert_eq!(delta_e2000(lab, lab), 0.0);
        }
    }

    #[test]
    fn ciede2000_is_symmetric() {
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..256 {
            let x = to_lab(random_color(&mut rng));
            let y = to_lab(random_color(&mut rng));
            assert_eq!(delta_e2000(x, y), delta_e2000(y, x));
        }
    }

    #[test]
    fn ciede2000_tracks_palette_crate() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let (x, y) = (random_color(&mut rng), random_color(&mut rng));
            let ours = delta_e2000(to_lab(x), to_lab(y));
            let theirs = reference_lab(x).difference(reference_lab(y)) as f64;
            assert!((ours - theirs).abs() < 0.1 + ours * 0.01, "{x} {y}: {ours} vs {theirs}");
        }
    }

    #[test]
    fn achromatic_pairs_never_produce_nan() {
        for v in [0u8, 1, 64, 128, 200, 255] {
            for w in [0u8, 17, 128, 254, 255] {
                let d = delta_e2000(to_lab(Color::new(v, v, v)), to_lab(Color::new(w, w, w)));
                assert!(d.is_finite());
            }
        }
        let zero = LabColor::new(50.0, 0.0, 0.0);
        assert!(delta_e2000(zero, LabColor::new(60.0, 0.0, 0.0)).is_finite());
        assert!(delta_e2000(zero, LabColor::new(50.0, 10.0, -3.0)).is_finite());
    }

    #[test]
    fn delta_e76_is_euclidean() {
        let d = delta_e76(LabColor::new(0.0, 3.0, 0.0), LabColor::new(0.0, 0.0, 4.0));
        assert!((d - 5.0).abs() < 1e-12);
    }

    #[test]
    fn hue_distance_wraps() {
        assert_eq!(hue_distance(350.0, 10.0), 20.0);
        assert_eq!(hue_distance(10.0, 350.0), 20.0);
        assert_eq!(hue_distance(0.0, 180.0), 180.0);
    }

    #[test]
    fn hex_round_trip_and_rejects_garbage() {
        let c = Color::from_hex("#1a2B3c").unwrap();
        assert_eq!(c, Color::new(0x1a, 0x2b, 0x3c));
        assert_eq!(c.to_hex(), "1A2B3C");
        assert!(Color::from_hex("12345").is_err());
        assert!(Color::from_hex("zz0000").is_err());
    }

    #[test]
    fn brightness_uses_rec601_weights() {
        assert_eq!(Color::WHITE.brightness(), 255);
        assert_eq!(Color::new(250, 250, 250).brightness(), 250);
        assert_eq!(Color::new(255, 0, 0).brightness(), 76);
    }

    #[test]
    fn lab_cache_converts_once_per_color() {
        let mut cache = LabCache::new();
        let red = Color::new(255, 0, 0);
        let first = cache.lab(red);
        let second = cache.lab(red);
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
    }
}
