//! Team colours for the charts.

use anyhow::{anyhow, Context, Result};
use plotters::style::RGBColor;
use rand::Rng;

/// Random channels stay at or below this so lines remain visible on white.
const RANDOM_CHANNEL_MAX: u8 = 200;

fn hex_value(hex: &str) -> Result<u32> {
    let digits = hex.trim().trim_start_matches('#');
    if digits.len() != 6 {
        return Err(anyhow!("Expected a #RRGGBB colour, got {:?}", hex));
    }
    u32::from_str_radix(digits, 16).with_context(|| format!("Invalid colour {:?}", hex))
}

/// Parses `#RRGGBB`.
pub fn parse_hex_color(hex: &str) -> Result<RGBColor> {
    let value = hex_value(hex)?;
    Ok(RGBColor(
        (value >> 16) as u8,
        (value >> 8) as u8,
        value as u8,
    ))
}

/// Inverted colour with the top nibble of red cleared.
pub fn complementary_color(hex: &str) -> Result<String> {
    let inverted = format!("{:06X}", 0xFF_FFFF ^ hex_value(hex)?);
    Ok(format!("#0{}", &inverted[1..]))
}

pub fn random_color<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut channel = || rng.gen_range(0..=RANDOM_CHANNEL_MAX);
    format!("#{:02X}{:02X}{:02X}", channel(), channel(), channel())
}

/// Makes teammates distinguishable in a comparison.
///
/// Every colour that is still shared when visited is replaced: by its
/// complement when comparing two drivers, otherwise by a random colour. The
/// last holder of a shared colour keeps it.
pub fn comparison_palette<R: Rng + ?Sized>(colors: &[String], rng: &mut R) -> Result<Vec<String>> {
    let mut palette = colors.to_vec();
    for i in 0..palette.len() {
        let shared = palette.iter().filter(|c| **c == palette[i]).count() > 1;
        if shared {
            palette[i] = if palette.len() == 2 {
                complementary_color(&palette[i])?
            } else {
                random_color(rng)
            };
        }
    }
    Ok(palette)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn colors(list: &[&str]) -> Vec<String> {
        list.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_parse_hex_color() {
        let c = parse_hex_color("#00D2BE").unwrap();
        assert_eq!((c.0, c.1, c.2), (0x00, 0xD2, 0xBE));
        assert!(parse_hex_color("#12345").is_err());
        assert!(parse_hex_color("#GGGGGG").is_err());
    }

    #[test]
    fn test_complementary_color() {
        assert_eq!(complementary_color("#00D2BE").unwrap(), "#0F2D41");
        assert_eq!(complementary_color("#FFFFFF").unwrap(), "#000000");
    }

    #[test]
    fn test_teammates_get_complement() {
        let mut rng = StdRng::seed_from_u64(5);
        let palette = comparison_palette(&colors(&["#00D2BE", "#00D2BE"]), &mut rng).unwrap();
        assert_eq!(palette, colors(&["#0F2D41", "#00D2BE"]));
    }

    #[test]
    fn test_distinct_colours_unchanged() {
        let mut rng = StdRng::seed_from_u64(5);
        let input = colors(&["#00D2BE", "#0600EF", "#DC0000"]);
        assert_eq!(comparison_palette(&input, &mut rng).unwrap(), input);
    }

    #[test]
    fn test_three_way_share_uses_random() {
        let mut rng = StdRng::seed_from_u64(5);
        let palette =
            comparison_palette(&colors(&["#00D2BE", "#00D2BE", "#DC0000"]), &mut rng).unwrap();

        assert_ne!(palette[0], "#00D2BE");
        assert_eq!(&palette[1..], &colors(&["#00D2BE", "#DC0000"])[..]);
        assert!(parse_hex_color(&palette[0]).is_ok());
    }
}
