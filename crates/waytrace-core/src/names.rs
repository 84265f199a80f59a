//! Symbolic names for enumerated protocol values
//!
//! Log lines show enumerated fields as `numeric (name)`. Values this
//! version does not know about are not errors, they just render with the
//! `unknown` fallback.

use crate::event::{SEAT_KEYBOARD, SEAT_POINTER, SEAT_TOUCH};

/// Linux input button codes as delivered in `wl_pointer.button`.
pub fn pointer_button_name(button: u32) -> &'static str {
    match button {
        0x110 => "left",
        0x111 => "right",
        0x112 => "middle",
        0x113 => "side",
        0x114 => "extra",
        0x115 => "forward",
        0x116 => "back",
        0x117 => "task",
        _ => "unknown",
    }
}

pub fn button_state_name(state: u32) -> &'static str {
    match state {
        0 => "released",
        1 => "pressed",
        _ => "unknown state",
    }
}

pub fn key_state_name(state: u32) -> &'static str {
    match state {
        0 => "released",
        1 => "pressed",
        _ => "unknown",
    }
}

pub fn axis_name(axis: u32) -> &'static str {
    match axis {
        0 => "vertical",
        1 => "horizontal",
        _ => "unknown",
    }
}

pub fn axis_source_name(source: u32) -> &'static str {
    match source {
        0 => "wheel",
        1 => "finger",
        2 => "continuous",
        3 => "wheel tilt",
        _ => "unknown",
    }
}

pub fn keymap_format_name(format: u32) -> &'static str {
    match format {
        0 => "none",
        1 => "xkb v1",
        _ => "unknown",
    }
}

/// Drag-and-drop action bitsets from `wl_data_device_manager.dnd_action`.
pub fn dnd_actions_name(actions: u32) -> &'static str {
    match actions {
        0 => "none",
        1 => "copy",
        2 => "move",
        3 => "copy, move",
        4 => "ask",
        5 => "copy, ask",
        6 => "move, ask",
        7 => "copy, move, ask",
        _ => "unknown",
    }
}

pub fn toplevel_state_name(state: u32) -> &'static str {
    match state {
        1 => "maximized",
        2 => "fullscreen",
        3 => "resizing",
        4 => "activated",
        5 => "tiled-left",
        6 => "tiled-right",
        7 => "tiled-top",
        8 => "tiled-bottom",
        _ => "unknown",
    }
}

/// Space-joined capability names for `wl_seat.capabilities`.
pub fn seat_capabilities_names(capabilities: u32) -> String {
    if capabilities == 0 {
        return "none".to_string();
    }
    let mut names = Vec::new();
    if capabilities & SEAT_POINTER != 0 {
        names.push("pointer");
    }
    if capabilities & SEAT_KEYBOARD != 0 {
        names.push("keyboard");
    }
    if capabilities & SEAT_TOUCH != 0 {
        names.push("touch");
    }
    names.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_names() {
        assert_eq!(pointer_button_name(0x110), "left");
        assert_eq!(pointer_button_name(0x117), "task");
        assert_eq!(pointer_button_name(0x999), "unknown");
    }

    #[test]
    fn test_state_fallbacks() {
        assert_eq!(button_state_name(2), "unknown state");
        assert_eq!(key_state_name(1), "pressed");
        assert_eq!(key_state_name(7), "unknown");
    }

    #[test]
    fn test_dnd_action_sets() {
        assert_eq!(dnd_actions_name(0), "none");
        assert_eq!(dnd_actions_name(7), "copy, move, ask");
        assert_eq!(dnd_actions_name(8), "unknown");
    }

    #[test]
    fn test_seat_capabilities() {
        assert_eq!(seat_capabilities_names(0), "none");
        assert_eq!(seat_capabilities_names(SEAT_POINTER | SEAT_KEYBOARD), "pointer keyboard");
        assert_eq!(seat_capabilities_names(SEAT_TOUCH), "touch");
    }
}
