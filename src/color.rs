// Hex color handling shared by the palette resolver and the drawing backend

/// An opaque sRGB color with 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    /// Parse `#rrggbb`, `rrggbb` or the short `#rgb` form.
    pub fn parse_hex(input: &str) -> Option<Rgb> {
        let hex = input.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return None;
        }
        match hex.len() {
            6 => {
                let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
                let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
                let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
                Some(Rgb { r, g, b })
            }
            3 => {
                let mut channels = [0u8; 3];
                for (i, c) in hex.chars().enumerate() {
                    let v = c.to_digit(16)? as u8;
                    channels[i] = v * 16 + v;
                }
                Some(Rgb::new(channels[0], channels[1], channels[2]))
            }
            _ => None,
        }
    }

    /// Lowercase `#rrggbb`.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Linear interpolation in RGB space, `t` clamped to [0, 1].
    pub fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }
}

/// Colors that mean "paint nothing" in a mark style.
pub fn is_transparent(color: &str) -> bool {
    matches!(color.trim().to_ascii_lowercase().as_str(), "none" | "transparent")
}

/// Sample a piecewise-linear ramp through `stops` at `t` in [0, 1].
///
/// Unparseable stops are skipped; returns `None` when nothing usable remains.
pub fn interpolate(stops: &[String], t: f64) -> Option<Rgb> {
    let parsed: Vec<Rgb> = stops.iter().filter_map(|s| Rgb::parse_hex(s)).collect();
    interpolate_rgb(&parsed, t)
}

fn interpolate_rgb(stops: &[Rgb], t: f64) -> Option<Rgb> {
    match stops.len() {
        0 => None,
        1 => Some(stops[0]),
        n => {
            let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
            let scaled = t * (n - 1) as f64;
            let lower = (scaled.floor() as usize).min(n - 2);
            Some(stops[lower].lerp(stops[lower + 1], scaled - lower as f64))
        }
    }
}

/// Resample a palette to exactly `count` colors spread evenly over its ramp.
///
/// Returns the palette unchanged when it already has `count` entries.
pub fn resample(colors: &[String], count: usize) -> Vec<String> {
    if colors.len() == count {
        return colors.to_vec();
    }
    let parsed: Vec<Rgb> = colors.iter().filter_map(|s| Rgb::parse_hex(s)).collect();
    if parsed.is_empty() {
        return Vec::new();
    }
    match count {
        0 => Vec::new(),
        1 => vec![parsed[parsed.len() / 2].to_hex()],
        n => (0..n)
            .filter_map(|i| interpolate_rgb(&parsed, i as f64 / (n - 1) as f64))
            .map(Rgb::to_hex)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_long_and_short() {
        assert_eq!(Rgb::parse_hex("#F9EFE8"), Some(Rgb::new(0xf9, 0xef, 0xe8)));
        assert_eq!(Rgb::parse_hex("08306b"), Some(Rgb::new(0x08, 0x30, 0x6b)));
        assert_eq!(Rgb::parse_hex("#ddd"), Some(Rgb::new(0xdd, 0xdd, 0xdd)));
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert_eq!(Rgb::parse_hex("transparent"), None);
        assert_eq!(Rgb::parse_hex("#12345"), None);
        assert_eq!(Rgb::parse_hex("#gg0000"), None);
    }

    #[test]
    fn test_to_hex_is_lowercase() {
        assert_eq!(Rgb::new(0xAB, 0x00, 0x0F).to_hex(), "#ab000f");
    }

    #[test]
    fn test_lerp_midpoint() {
        let black = Rgb::new(0, 0, 0);
        let white = Rgb::new(255, 255, 255);
        assert_eq!(black.lerp(white, 0.5), Rgb::new(128, 128, 128));
        assert_eq!(black.lerp(white, 2.0), white);
    }

    #[test]
    fn test_interpolate_endpoints() {
        let stops = vec!["#000000".to_string(), "#ffffff".to_string()];
        assert_eq!(interpolate(&stops, 0.0), Some(Rgb::new(0, 0, 0)));
        assert_eq!(interpolate(&stops, 1.0), Some(Rgb::new(255, 255, 255)));
        assert_eq!(interpolate(&[], 0.5), None);
    }

    #[test]
    fn test_resample_keeps_endpoints() {
        let stops = vec!["#000000".to_string(), "#ffffff".to_string()];
        let out = resample(&stops, 3);
        assert_eq!(out, vec!["#000000", "#808080", "#ffffff"]);
    }

    #[test]
    fn test_resample_same_length_is_identity() {
        let stops = vec!["#ABCDEF".to_string(), "#123456".to_string()];
        assert_eq!(resample(&stops, 2), stops);
    }

    #[test]
    fn test_is_transparent() {
        assert!(is_transparent("none"));
        assert!(is_transparent("Transparent"));
        assert!(!is_transparent("#000"));
    }
}
