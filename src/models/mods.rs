//! Gameplay modifier bitset.
//!
//! Bit values follow the osu! client so that the raw value can be handed
//! straight to the performance calculator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Set of active gameplay modifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mods(pub u32);

impl Mods {
    pub const NONE: Mods = Mods(0);
    pub const NO_FAIL: Mods = Mods(1 << 0);
    pub const EASY: Mods = Mods(1 << 1);
    pub const TOUCH_DEVICE: Mods = Mods(1 << 2);
    pub const HIDDEN: Mods = Mods(1 << 3);
    pub const HARD_ROCK: Mods = Mods(1 << 4);
    pub const SUDDEN_DEATH: Mods = Mods(1 << 5);
    pub const DOUBLE_TIME: Mods = Mods(1 << 6);
    pub const RELAX: Mods = Mods(1 << 7);
    pub const HALF_TIME: Mods = Mods(1 << 8);
    /// Always set together with `DOUBLE_TIME`.
    pub const NIGHTCORE: Mods = Mods(1 << 9);
    pub const FLASHLIGHT: Mods = Mods(1 << 10);
    pub const AUTOPLAY: Mods = Mods(1 << 11);
    pub const SPUN_OUT: Mods = Mods(1 << 12);
    pub const AUTOPILOT: Mods = Mods(1 << 13);
    /// Always set together with `SUDDEN_DEATH`.
    pub const PERFECT: Mods = Mods(1 << 14);
    pub const SCORE_V2: Mods = Mods(1 << 29);

    /// Mods that change the difficulty attributes of a map. Everything else is
    /// irrelevant for star rating.
    pub const DIFFICULTY_MASK: Mods = Mods(
        Self::EASY.0
            | Self::HIDDEN.0
            | Self::HARD_ROCK.0
            | Self::DOUBLE_TIME.0
            | Self::HALF_TIME.0
            | Self::FLASHLIGHT.0
            | Self::TOUCH_DEVICE.0,
    );

    const ACRONYMS: [(Mods, &'static str); 15] = [
        (Mods::NO_FAIL, "NF"),
        (Mods::EASY, "EZ"),
        (Mods::TOUCH_DEVICE, "TD"),
        (Mods::HIDDEN, "HD"),
        (Mods::HARD_ROCK, "HR"),
        (Mods::PERFECT, "PF"),
        (Mods::SUDDEN_DEATH, "SD"),
        (Mods::NIGHTCORE, "NC"),
        (Mods::DOUBLE_TIME, "DT"),
        (Mods::RELAX, "RX"),
        (Mods::HALF_TIME, "HT"),
        (Mods::FLASHLIGHT, "FL"),
        (Mods::AUTOPLAY, "AT"),
        (Mods::SPUN_OUT, "SO"),
        (Mods::AUTOPILOT, "AP"),
    ];

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True if any bit of `other` is set.
    pub const fn active(self, other: Mods) -> bool {
        self.0 & other.0 != 0
    }

    /// True if every bit of `other` is set.
    pub const fn contains(self, other: Mods) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn difficulty_masked(self) -> Mods {
        self & Self::DIFFICULTY_MASK
    }

    /// Parses an acronym string such as `"HDHR"` or `"hd,dt"`.
    ///
    /// Implied mods are added automatically (NC implies DT, PF implies SD).
    /// Unknown acronyms yield `None`.
    pub fn from_acronyms(text: &str) -> Option<Mods> {
        let cleaned: String = text
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_uppercase();

        if cleaned.len() % 2 != 0 {
            return None;
        }

        let mut mods = Mods::NONE;
        let bytes = cleaned.as_bytes();
        for pair in bytes.chunks(2) {
            let acronym = std::str::from_utf8(pair).ok()?;
            let found = match acronym {
                "V2" => Mods::SCORE_V2,
                _ => Self::ACRONYMS
                    .iter()
                    .find(|(_, name)| *name == acronym)
                    .map(|(m, _)| *m)?,
            };
            mods |= found;
        }

        if mods.active(Mods::NIGHTCORE) {
            mods |= Mods::DOUBLE_TIME;
        }
        if mods.active(Mods::PERFECT) {
            mods |= Mods::SUDDEN_DEATH;
        }

        Some(mods)
    }
}

impl BitOr for Mods {
    type Output = Mods;

    fn bitor(self, rhs: Mods) -> Mods {
        Mods(self.0 | rhs.0)
    }
}

impl BitOrAssign for Mods {
    fn bitor_assign(&mut self, rhs: Mods) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Mods {
    type Output = Mods;

    fn bitand(self, rhs: Mods) -> Mods {
        Mods(self.0 & rhs.0)
    }
}

impl fmt::Display for Mods {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut written = false;
        for (m, name) in Self::ACRONYMS {
            // NC and PF already imply DT and SD, print only the stronger one.
            if m == Mods::DOUBLE_TIME && self.active(Mods::NIGHTCORE) {
                continue;
            }
            if m == Mods::SUDDEN_DEATH && self.active(Mods::PERFECT) {
                continue;
            }
            if self.active(m) {
                f.write_str(name)?;
                written = true;
            }
        }
        if self.active(Mods::SCORE_V2) {
            f.write_str("V2")?;
            written = true;
        }
        if !written {
            f.write_str("NM")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_acronyms() {
        assert_eq!(
            Mods::from_acronyms("HDHR"),
            Some(Mods::HIDDEN | Mods::HARD_ROCK)
        );
        assert_eq!(
            Mods::from_acronyms("nc"),
            Some(Mods::NIGHTCORE | Mods::DOUBLE_TIME)
        );
        assert_eq!(Mods::from_acronyms(""), Some(Mods::NONE));
        assert_eq!(Mods::from_acronyms("XX"), None);
        assert_eq!(Mods::from_acronyms("HDH"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Mods::NONE.to_string(), "NM");
        assert_eq!((Mods::HIDDEN | Mods::DOUBLE_TIME).to_string(), "HDDT");
        assert_eq!((Mods::PERFECT | Mods::SUDDEN_DEATH).to_string(), "PF");
    }

    #[test]
    fn test_difficulty_mask_drops_irrelevant_bits() {
        let mods = Mods::HIDDEN | Mods::NO_FAIL | Mods::SUDDEN_DEATH;
        assert_eq!(mods.difficulty_masked(), Mods::HIDDEN);
    }
}
