use crate::color::Color;
use crate::palette::Palette;

/// Colors at or above this brightness are left unnumbered.
pub const WHITE_BRIGHTNESS: u32 = 250;

#[inline]
pub fn is_white(color: Color) -> bool {
    color.brightness() >= WHITE_BRIGHTNESS
}

/// Code for the `n`-th numbered color (0-based): `1`..`9`, then `A`..`Z`,
/// `AA`, `AB`, … (bijective base 26).
pub fn code_for(n: usize) -> String {
    if n < 9 {
        return (n + 1).to_string();
    }
    let mut m = n - 9 + 1;
    let mut letters = Vec::new();
    while m > 0 {
        m -= 1;
        letters.push(b'A' + (m % 26) as u8);
        m /= 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Codes and display names for each palette index.
#[derive(Clone, Debug, PartialEq)]
pub struct Labels {
    /// Empty for white and unused entries.
    pub codes: Vec<String>,
    pub names: Vec<&'static str>,
}

/// Walk used palette indices in ascending order, numbering every non-white
/// entry without gaps.
pub fn assign_labels(palette: &Palette, usage: &[usize]) -> Labels {
    let mut next = 0;
    let codes = palette
        .colors()
        .iter()
        .enumerate()
        .map(|(idx, &color)| {
            let used = usage.get(idx).is_some_and(|&n| n > 0);
            if !used || is_white(color) {
                String::new()
            } else {
                let code = code_for(next);
                next += 1;
                code
            }
        })
        .collect();
    let names = palette.colors().iter().map(|&c| reference_name(c)).collect();
    Labels { codes, names }
}

// ------------------------------------------------------------
// Named reference palette (display only)
// ------------------------------------------------------------

pub const REFERENCE_PALETTE: [(&str, Color); 24] = [
    ("White", Color::new(255, 255, 255)),
    ("Black", Color::new(0, 0, 0)),
    ("Light Gray", Color::new(200, 200, 200)),
    ("Gray", Color::new(128, 128, 128)),
    ("Dark Gray", Color::new(64, 64, 64)),
    ("Red", Color::new(220, 20, 60)),
    ("Dark Red", Color::new(139, 0, 0)),
    ("Pink", Color::new(255, 182, 193)),
    ("Orange", Color::new(255, 140, 0)),
    ("Peach", Color::new(255, 218, 185)),
    ("Yellow", Color::new(255, 215, 0)),
    ("Cream", Color::new(255, 253, 208)),
    ("Light Green", Color::new(144, 238, 144)),
    ("Green", Color::new(34, 139, 34)),
    ("Dark Green", Color::new(0, 100, 0)),
    ("Olive", Color::new(128, 128, 0)),
    ("Teal", Color::new(0, 128, 128)),
    ("Sky Blue", Color::new(135, 206, 235)),
    ("Blue", Color::new(30, 60, 200)),
    ("Navy", Color::new(0, 0, 128)),
    ("Purple", Color::new(128, 0, 128)),
    ("Lavender", Color::new(200, 170, 230)),
    ("Brown", Color::new(139, 69, 19)),
    ("Tan", Color::new(210, 180, 140)),
];

/// Closest reference name by squared RGB distance.
pub fn reference_name(color: Color) -> &'static str {
    REFERENCE_PALETTE
        .iter()
        .min_by_key(|(_, c)| color.squared_rgb_distance(*c))
        .map(|(name, _)| *name)
        .unwrap_or("Unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_run_digits_then_letters() {
        let codes: Vec<String> = (0..12).map(code_for).collect();
        assert_eq!(
            codes,
            ["1", "2", "3", "4", "5", "6", "7", "8", "9", "A", "B", "C"]
        );
        assert_eq!(code_for(9 + 25), "Z");
        assert_eq!(code_for(9 + 26), "AA");
        assert_eq!(code_for(9 + 27), "AB");
        assert_eq!(code_for(9 + 26 + 26 * 26), "AAA");
    }

    #[test]
    fn white_entries_get_no_code_and_leave_no_gap() {
        let palette = Palette::new(vec![
            Color::new(200, 0, 0),
            Color::new(252, 252, 252),
            Color::new(0, 0, 200),
            Color::new(0, 150, 0),
        ]);
        let labels = assign_labels(&palette, &[4, 2, 1, 3]);
        assert_eq!(labels.codes, vec!["1", "", "2", "3"]);
    }

    #[test]
    fn unused_entries_are_skipped() {
        let palette = Palette::new(vec![Color::new(200, 0, 0), Color::new(0, 0, 200)]);
        let labels = assign_labels(&palette, &[0, 5]);
        assert_eq!(labels.codes, vec!["", "1"]);
    }

    #[test]
    fn codes_are_unique_and_contiguous() {
        let colors: Vec<Color> = (0..40u8).map(|i| Color::new(i * 5, 100, 200 - i * 4)).collect();
        let palette = Palette::new(colors);
        let labels = assign_labels(&palette, &vec![1; 40]);
        let expected: Vec<String> = (0..40).map(code_for).collect();
        assert_eq!(labels.codes, expected);
    }

    #[test]
    fn reference_names_use_rgb_distance() {
        assert_eq!(reference_name(Color::new(250, 250, 250)), "White");
        assert_eq!(reference_name(Color::new(10, 5, 0)), "Black");
        assert_eq!(reference_name(Color::new(225, 25, 55)), "Red");
        assert_eq!(reference_name(Color::new(20, 60, 190)), "Blue");
    }

    #[test]
    fn brightness_threshold_matches_rule() {
        assert!(is_white(Color::new(250, 250, 250)));
        assert!(!is_white(Color::new(249, 249, 249)));
        assert!(is_white(Color::new(255, 255, 240)));
    }
}
