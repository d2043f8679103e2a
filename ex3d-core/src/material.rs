/// Colours, materials and the per-export material table
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An 8-bit-per-channel RGB colour, (de)serialized as `#RRGGBB`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Fallback for leaves without a usable colour.
    pub const DEFAULT_GRAY: Rgb = Rgb::new(0x80, 0x80, 0x80);
    /// Padding colour for unused filament slots.
    pub const WHITE: Rgb = Rgb::new(0xFF, 0xFF, 0xFF);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Upper-case `#RRGGBB`.
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Channels as linear-light floats, the colour space glTF factors live in.
    pub fn to_linear(self) -> [f32; 3] {
        fn channel(c: u8) -> f32 {
            let c = f32::from(c) / 255.0;
            if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        }
        [channel(self.r), channel(self.g), channel(self.b)]
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Rgb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(format!("expected #RRGGBB colour, got {s:?}"));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|e| format!("bad colour {s:?}: {e}"))
        };
        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl TryFrom<String> for Rgb {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_hex()
    }
}

/// What a leaf's material can offer, resolved once per leaf before registry lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialSource {
    HasColor(Rgb),
    #[default]
    Colorless,
}

impl MaterialSource {
    /// The colour to register, or `None` when the default gray must be used.
    pub fn color(&self) -> Option<Rgb> {
        match self {
            MaterialSource::HasColor(rgb) => Some(*rgb),
            MaterialSource::Colorless => None,
        }
    }
}

/// Slicer projects always declare at least this many filament slots
pub const MIN_FILAMENT_SLOTS: usize = 2;

/// One entry of the material table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Material {
    /// Position in the table; only meaningful within one export call.
    pub id: usize,
    pub color: Rgb,
    pub name: String,
    /// 1-based filament slot.
    pub extruder: usize,
}

/// Insertion-ordered table of unique colours.
///
/// Deduplication is exact channel equality; near-identical colours stay distinct.
#[derive(Debug, Clone, Default)]
pub struct MaterialRegistry {
    materials: Vec<Material>,
}

impl MaterialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id of `color`, appending a new entry if it has not been seen.
    pub fn register(&mut self, color: Rgb) -> usize {
        if let Some(existing) = self.materials.iter().find(|m| m.color == color) {
            return existing.id;
        }

        let id = self.materials.len();
        self.materials.push(Material {
            id,
            color,
            name: format!("Color_{:02X}{:02X}{:02X}", color.r, color.g, color.b),
            extruder: id + 1,
        });
        id
    }

    pub fn get(&self, id: usize) -> Option<&Material> {
        self.materials.get(id)
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Filament colours for the slicer, padded with white up to `min_slots`.
    ///
    /// Never fewer than [`MIN_FILAMENT_SLOTS`] entries, whatever `min_slots` says.
    pub fn filament_colors(&self, min_slots: usize) -> Vec<Rgb> {
        let slots = min_slots.max(MIN_FILAMENT_SLOTS);
        let mut colors: Vec<Rgb> = self.materials.iter().map(|m| m.color).collect();
        while colors.len() < slots {
            colors.push(Rgb::WHITE);
        }
        colors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_format_hex() {
        let orange: Rgb = "#ffa500".parse().unwrap();
        assert_eq!(orange, Rgb::new(255, 165, 0));
        assert_eq!(orange.to_hex(), "#FFA500");
        assert!("#12345".parse::<Rgb>().is_err());
        assert!("#GG0000".parse::<Rgb>().is_err());
    }

    #[test]
    fn test_register_deduplicates() {
        let mut registry = MaterialRegistry::new();
        let a = registry.register(Rgb::new(255, 165, 0));
        let b = registry.register(Rgb::new(0, 0, 255));
        let c = registry.register(Rgb::new(255, 165, 0));

        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(c, a);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(1).unwrap().extruder, 2);
        assert_eq!(registry.get(0).unwrap().name, "Color_FFA500");
    }

    #[test]
    fn test_near_colors_are_distinct() {
        // Exact equality only: one channel step apart is a separate material.
        let mut registry = MaterialRegistry::new();
        registry.register(Rgb::new(128, 128, 128));
        registry.register(Rgb::new(128, 128, 129));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_filament_colors_padding() {
        let mut registry = MaterialRegistry::new();
        assert_eq!(registry.filament_colors(2), vec![Rgb::WHITE, Rgb::WHITE]);

        registry.register(Rgb::new(255, 165, 0));
        assert_eq!(
            registry.filament_colors(2),
            vec![Rgb::new(255, 165, 0), Rgb::WHITE]
        );

        registry.register(Rgb::new(1, 2, 3));
        registry.register(Rgb::new(4, 5, 6));
        assert_eq!(registry.filament_colors(2).len(), 3);
    }

    #[test]
    fn test_filament_colors_floor() {
        let mut registry = MaterialRegistry::new();
        registry.register(Rgb::new(0xFF, 0xA5, 0x00));
        let expected = vec![Rgb::new(0xFF, 0xA5, 0x00), Rgb::WHITE];
        assert_eq!(registry.filament_colors(0), expected);
        assert_eq!(registry.filament_colors(1), expected);
        assert_eq!(MaterialRegistry::new().filament_colors(0).len(), MIN_FILAMENT_SLOTS);
    }

    #[test]
    fn test_linear_color_endpoints() {
        assert_eq!(Rgb::new(0, 0, 0).to_linear(), [0.0, 0.0, 0.0]);
        let white = Rgb::WHITE.to_linear();
        assert!(white.iter().all(|c| (c - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_serde_hex_string() {
        let json = serde_json::to_string(&MaterialSource::HasColor(Rgb::new(1, 2, 3))).unwrap();
        assert_eq!(json, r##"{"has_color":"#010203"}"##);
        let back: MaterialSource = serde_json::from_str(&json).unwrap();
        assert_eq!(back.color(), Some(Rgb::new(1, 2, 3)));
    }
}
