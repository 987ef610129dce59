//! Modifier sets, keysym names and the textual chord-step syntax.

use std::fmt;

use xkbcommon::xkb;
use xkbcommon::xkb::keysyms::{
    KEY_Hyper_R, KEY_ISO_Level3_Shift, KEY_ISO_Level5_Shift, KEY_Shift_L, KEY_XF86Switch_VT_1,
    KEY_XF86Switch_VT_12,
};

use crate::error::{Error, Result};

/// Core modifier mask, laid out like the xkb/X11 real modifiers
/// (Shift, Lock, Control, Mod1..Mod5).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Modifiers(u32);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const SHIFT: Modifiers = Modifiers(1 << 0);
    pub const CAPS: Modifiers = Modifiers(1 << 1);
    pub const CTRL: Modifiers = Modifiers(1 << 2);
    pub const MOD1: Modifiers = Modifiers(1 << 3);
    pub const MOD2: Modifiers = Modifiers(1 << 4);
    pub const MOD3: Modifiers = Modifiers(1 << 5);
    pub const MOD4: Modifiers = Modifiers(1 << 6);
    pub const MOD5: Modifiers = Modifiers(1 << 7);

    pub const ALT: Modifiers = Modifiers::MOD1;
    pub const SUPER: Modifiers = Modifiers::MOD4;

    const MASK: u32 = 0xff;

    // Display order follows the mask bits.
    const TOKENS: [(Modifiers, &'static str); 8] = [
        (Modifiers::SHIFT, "Sh"),
        (Modifiers::CAPS, "Cp"),
        (Modifiers::CTRL, "C"),
        (Modifiers::MOD1, "M"),
        (Modifiers::MOD2, "M2"),
        (Modifiers::MOD3, "M3"),
        (Modifiers::MOD4, "S"),
        (Modifiers::MOD5, "M5"),
    ];

    /// Builds a set from a raw depressed/latched/locked mask, dropping
    /// anything above the eight core modifiers.
    pub fn from_bits(bits: u32) -> Self {
        Modifiers(bits & Self::MASK)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: Modifiers) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn parse_token(token: &str) -> Result<Self> {
        Ok(match token {
            "Sh" => Modifiers::SHIFT,
            "Cp" => Modifiers::CAPS,
            "C" => Modifiers::CTRL,
            "M" | "M1" | "A" => Modifiers::MOD1,
            "M2" => Modifiers::MOD2,
            "M3" => Modifiers::MOD3,
            "S" | "M4" => Modifiers::MOD4,
            "M5" => Modifiers::MOD5,
            _ => return Err(Error::UnknownModifier(token.to_string())),
        })
    }

    pub fn tokens(self) -> impl Iterator<Item = &'static str> {
        Self::TOKENS
            .into_iter()
            .filter(move |(m, _)| self.contains(*m))
            .map(|(_, name)| name)
    }
}

impl std::ops::BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Modifiers) -> Modifiers {
        Modifiers(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for Modifiers {
    fn bitor_assign(&mut self, rhs: Modifiers) {
        self.0 |= rhs.0;
    }
}

/// One step of a chord: an exact modifier set plus a keysym.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct KeyStep {
    pub modifiers: Modifiers,
    pub keysym: u32,
}

impl KeyStep {
    pub fn new(modifiers: Modifiers, keysym: u32) -> Self {
        Self {
            modifiers: Modifiers::from_bits(modifiers.bits()),
            keysym,
        }
    }

    /// Parses `[mod-]*keysym`, e.g. `S-Sh-Return`.
    pub fn parse(step: &str) -> Result<Self> {
        let mut tokens: Vec<&str> = step.split('-').collect();
        let key = match tokens.pop() {
            Some(key) if !key.is_empty() => key,
            _ => return Err(Error::MissingKey(step.to_string())),
        };

        let mut modifiers = Modifiers::NONE;
        for token in tokens {
            modifiers |= Modifiers::parse_token(token)?;
        }

        Ok(KeyStep::new(modifiers, keysym_from_name(key)?))
    }
}

impl fmt::Display for KeyStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in self.modifiers.tokens() {
            write!(f, "{}-", token)?;
        }
        f.write_str(&keysym_name(self.keysym))
    }
}

/// Parses a space-separated chord pattern such as `S-x S-Sh-Return`.
pub fn parse_pattern(pattern: &str) -> Result<Vec<KeyStep>> {
    let steps = pattern
        .split_whitespace()
        .map(KeyStep::parse)
        .collect::<Result<Vec<_>>>()?;
    if steps.is_empty() {
        return Err(Error::EmptyPattern);
    }
    Ok(steps)
}

pub fn format_steps(steps: &[KeyStep]) -> String {
    steps
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn keysym_from_name(name: &str) -> Result<u32> {
    let exact = xkb::keysym_from_name(name, xkb::KEYSYM_NO_FLAGS).raw();
    if exact != xkb::keysyms::KEY_NoSymbol {
        return Ok(exact);
    }
    let folded = xkb::keysym_from_name(name, xkb::KEYSYM_CASE_INSENSITIVE).raw();
    if folded != xkb::keysyms::KEY_NoSymbol {
        return Ok(folded);
    }
    Err(Error::UnknownKeysym(name.to_string()))
}

pub fn keysym_name(keysym: u32) -> String {
    xkb::keysym_get_name(xkb::Keysym::from(keysym))
}

/// Shift, Control, Caps/Shift lock, Meta, Alt, Super, Hyper and the ISO
/// level shifts. These never advance a chord.
pub fn is_modifier_keysym(keysym: u32) -> bool {
    (KEY_Shift_L..=KEY_Hyper_R).contains(&keysym)
        || keysym == KEY_ISO_Level3_Shift
        || keysym == KEY_ISO_Level5_Shift
}

/// Maps `XF86Switch_VT_n` to `n`.
pub fn vt_for_keysym(keysym: u32) -> Option<i32> {
    if (KEY_XF86Switch_VT_1..=KEY_XF86Switch_VT_12).contains(&keysym) {
        Some((keysym - KEY_XF86Switch_VT_1) as i32 + 1)
    } else {
        None
    }
}
