use serde::{Deserialize, Serialize};

/// RGB-цвет с каналами в диапазоне 0–1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb { r: 1.0, g: 1.0, b: 1.0 };

    pub fn from_u8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        }
    }

    /// Разобрать строку вида "(126, 10, 1)": берутся первые три числа
    pub fn parse(s: &str) -> Option<Self> {
        let mut channels = s
            .split(|c: char| !c.is_ascii_digit())
            .filter(|t| !t.is_empty())
            .map(|t| t.parse::<u32>().map_or(255, |v| v.min(255)) as u8);
        let r = channels.next()?;
        let g = channels.next()?;
        let b = channels.next()?;
        Some(Self::from_u8(r, g, b))
    }

    /// Обратно в 0–255 (для цветового квадратика в дереве)
    pub fn to_u8(&self) -> [u8; 3] {
        let c = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [c(self.r), c(self.g), c(self.b)]
    }

    /// CSS-нотация `rgb(r, g, b)`
    pub fn css(&self) -> String {
        let [r, g, b] = self.to_u8();
        format!("rgb({r}, {g}, {b})")
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Self::WHITE
    }
}
