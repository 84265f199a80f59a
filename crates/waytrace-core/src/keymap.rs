//! XKB keymap decoding
//!
//! The compositor describes the keyboard layout by shipping a text-format
//! XKB keymap once at startup and again whenever the layout changes. This
//! module owns the compiler context plus the currently installed
//! keymap/state pair and resolves raw key codes and modifier bits against
//! them. The keymap and state are always a matched pair: a new state is
//! derived from every freshly compiled keymap and both are swapped in with
//! a single assignment, so no lookup can mix an old keymap with new state.

use xkbcommon::xkb;

use crate::error::KeymapError;

/// Offset between wayland key codes and XKB keycodes (historical X11 rule).
pub const KEYCODE_OFFSET: u32 = 8;

/// `wl_keyboard.keymap_format` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeymapFormat {
    NoKeymap,
    XkbV1,
    Unknown(u32),
}

impl From<u32> for KeymapFormat {
    fn from(raw: u32) -> Self {
        match raw {
            0 => KeymapFormat::NoKeymap,
            1 => KeymapFormat::XkbV1,
            other => KeymapFormat::Unknown(other),
        }
    }
}

impl KeymapFormat {
    pub fn raw(self) -> u32 {
        match self {
            KeymapFormat::NoKeymap => 0,
            KeymapFormat::XkbV1 => 1,
            KeymapFormat::Unknown(raw) => raw,
        }
    }
}

pub struct KeymapDecoder {
    context: xkb::Context,
    // Matched pair; the state is derived from exactly this keymap.
    pair: Option<(xkb::Keymap, xkb::State)>,
}

impl Default for KeymapDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl KeymapDecoder {
    pub fn new() -> Self {
        Self {
            context: xkb::Context::new(xkb::CONTEXT_NO_FLAGS),
            pair: None,
        }
    }

    /// Whether a keymap is currently installed.
    pub fn has_keymap(&self) -> bool {
        self.pair.is_some()
    }

    /// Compile `bytes` and replace the installed keymap/state pair.
    ///
    /// The caller keeps ownership of whatever mapping backs `bytes`; the
    /// decoder only reads it during compilation. On any error the
    /// previously installed pair stays untouched.
    pub fn install(&mut self, bytes: &[u8], format: KeymapFormat) -> Result<(), KeymapError> {
        if format != KeymapFormat::XkbV1 {
            return Err(KeymapError::UnsupportedFormat(format.raw()));
        }
        // Compositors NUL-terminate the map per wl_keyboard convention.
        let text = bytes.strip_suffix(&[0]).unwrap_or(bytes);
        let text = std::str::from_utf8(text).map_err(|_| KeymapError::InvalidText)?;
        let keymap = xkb::Keymap::new_from_string(
            &self.context,
            text.to_owned(),
            xkb::KEYMAP_FORMAT_TEXT_V1,
            xkb::KEYMAP_COMPILE_NO_FLAGS,
        )
        .ok_or(KeymapError::CompileFailed)?;
        let state = xkb::State::new(&keymap);
        // The new pair is fully constructed before the old one is dropped.
        self.pair = Some((keymap, state));
        Ok(())
    }

    /// Fold a `wl_keyboard.modifiers` update into the live state.
    pub fn apply_modifiers(&mut self, depressed: u32, latched: u32, locked: u32, group: u32) {
        if let Some((_, state)) = &mut self.pair {
            let _ = state.update_mask(depressed, latched, locked, 0, 0, group);
        }
    }

    /// Resolve the single keysym the current state assigns to a raw code.
    ///
    /// Returns the keysym's name and raw value, or `None` while no keymap
    /// is installed.
    pub fn resolve_symbol(&self, raw_code: u32) -> Option<(String, u32)> {
        let (_, state) = self.pair.as_ref()?;
        let sym = state.key_get_one_sym(xkb::Keycode::new(raw_code + KEYCODE_OFFSET));
        Some((xkb::keysym_get_name(sym), sym.raw()))
    }

    /// UTF-8 text for a raw code. `None` stands for a key release, which
    /// never carries text regardless of the keymap.
    pub fn resolve_text(&self, raw_code: Option<u32>) -> String {
        let Some((_, state)) = self.pair.as_ref() else {
            return String::new();
        };
        let keycode = raw_code.map_or(0, |code| code + KEYCODE_OFFSET);
        state.key_get_utf8(xkb::Keycode::new(keycode))
    }

    /// Display name of one modifier bit in the currently installed keymap.
    pub fn modifier_name(&self, bit: u32) -> Option<String> {
        let (keymap, _) = self.pair.as_ref()?;
        let name = keymap.mod_get_name(bit);
        if name.is_empty() {
            None
        } else {
            Some(name.to_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimal text keymap binding keycode 24 (raw code 16) to one symbol.
    // Self-contained so tests never depend on system xkb data files.
    fn keymap_text(symbol: &str) -> Vec<u8> {
        format!(
            concat!(
                "xkb_keymap {{\n",
                "    xkb_keycodes {{\n",
                "        minimum = 8;\n",
                "        maximum = 255;\n",
                "        <AD01> = 24;\n",
                "    }};\n",
                "    xkb_types {{\n",
                "        type \"ONE_LEVEL\" {{\n",
                "            modifiers = none;\n",
                "            level_name[1] = \"Any\";\n",
                "        }};\n",
                "    }};\n",
                "    xkb_compatibility {{\n",
                "    }};\n",
                "    xkb_symbols {{\n",
                "        key <AD01> {{ type = \"ONE_LEVEL\", [ {symbol} ] }};\n",
                "    }};\n",
                "}};\n",
            ),
            symbol = symbol
        )
        .into_bytes()
    }

    const RAW_CODE: u32 = 16; // +8 = keycode 24

    #[test]
    fn test_unsupported_format_rejected() {
        let mut decoder = KeymapDecoder::new();
        let err = decoder
            .install(&keymap_text("q"), KeymapFormat::NoKeymap)
            .unwrap_err();
        assert!(matches!(err, KeymapError::UnsupportedFormat(0)));
        assert!(!decoder.has_keymap());
    }

    #[test]
    fn test_install_and_resolve() {
        let mut decoder = KeymapDecoder::new();
        decoder.install(&keymap_text("q"), KeymapFormat::XkbV1).unwrap();
        let (name, sym) = decoder.resolve_symbol(RAW_CODE).unwrap();
        assert_eq!(name, "q");
        assert_eq!(sym, 0x71);
        assert_eq!(decoder.resolve_text(Some(RAW_CODE)), "q");
    }

    #[test]
    fn test_trailing_nul_is_stripped() {
        let mut decoder = KeymapDecoder::new();
        let mut bytes = keymap_text("q");
        bytes.push(0);
        decoder.install(&bytes, KeymapFormat::XkbV1).unwrap();
        assert!(decoder.has_keymap());
    }

    #[test]
    fn test_replacement_is_atomic() {
        let mut decoder = KeymapDecoder::new();
        decoder.install(&keymap_text("q"), KeymapFormat::XkbV1).unwrap();
        assert_eq!(decoder.resolve_symbol(RAW_CODE).unwrap().0, "q");

        decoder.install(&keymap_text("w"), KeymapFormat::XkbV1).unwrap();
        // Every lookup after a successful install reflects only the new map.
        assert_eq!(decoder.resolve_symbol(RAW_CODE).unwrap().0, "w");
        assert_eq!(decoder.resolve_text(Some(RAW_CODE)), "w");
    }

    #[test]
    fn test_failed_install_keeps_previous_pair() {
        let mut decoder = KeymapDecoder::new();
        decoder.install(&keymap_text("q"), KeymapFormat::XkbV1).unwrap();
        let err = decoder.install(b"not a keymap", KeymapFormat::XkbV1).unwrap_err();
        assert!(matches!(err, KeymapError::CompileFailed));
        assert_eq!(decoder.resolve_symbol(RAW_CODE).unwrap().0, "q");
    }

    #[test]
    fn test_release_text_always_empty() {
        let mut decoder = KeymapDecoder::new();
        // Before any keymap exists.
        assert_eq!(decoder.resolve_text(None), "");
        decoder.install(&keymap_text("q"), KeymapFormat::XkbV1).unwrap();
        // And with one installed.
        assert_eq!(decoder.resolve_text(None), "");
    }

    #[test]
    fn test_lookups_without_keymap_degrade() {
        let mut decoder = KeymapDecoder::new();
        assert!(decoder.resolve_symbol(RAW_CODE).is_none());
        assert_eq!(decoder.resolve_text(Some(RAW_CODE)), "");
        assert!(decoder.modifier_name(0).is_none());
        // Modifier updates before a keymap arrives must not crash.
        decoder.apply_modifiers(1, 0, 0, 0);
    }

    #[test]
    fn test_core_modifier_names() {
        let mut decoder = KeymapDecoder::new();
        decoder.install(&keymap_text("q"), KeymapFormat::XkbV1).unwrap();
        // The eight core modifiers exist in every compiled keymap.
        assert_eq!(decoder.modifier_name(0).as_deref(), Some("Shift"));
        assert_eq!(decoder.modifier_name(2).as_deref(), Some("Control"));
    }
}
