//! Property tests for hex color construction and parsing.

use flyutils_style::{ColorSpace, HexColor, Rgba};
use proptest::prelude::*;

proptest! {
    #[test]
    fn bytes_survive_normalization(hex in any::<u32>()) {
        let color = hex.rgb_color();
        prop_assert_eq!(color.to_rgb8().as_hex(), hex & 0x00FF_FFFF);
        prop_assert_eq!(color.space, ColorSpace::Srgb);
    }

    #[test]
    fn components_stay_in_unit_range(hex in any::<i64>(), alpha in any::<f32>()) {
        let color = hex.p3_color_alpha(alpha);
        for c in [color.red, color.green, color.blue, color.alpha] {
            prop_assert!((0.0..=1.0).contains(&c));
        }
    }

    #[test]
    fn formatted_hex_parses_back(hex in 0u32..=0x00FF_FFFF) {
        let parsed: Rgba = format!("#{hex:06x}").parse().unwrap();
        prop_assert_eq!(parsed, Rgba::from_hex(hex, 1.0));
    }

    #[test]
    fn non_hex_input_never_panics(input in ".{0,12}") {
        let _ = Rgba::parse_hex(&input);
    }
}
