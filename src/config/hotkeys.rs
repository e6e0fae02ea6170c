//! Named hotkey combinations offered by the Hotkey Combo action.

/// Display name -> keys pressed together (held in order, released in reverse).
const PREDEFINED_HOTKEYS: &[(&str, &[&str])] = &[
    // System & navigation
    ("Switch Apps (Alt+Tab)", &["alt", "tab"]),
    ("Close Window (Alt+F4)", &["alt", "f4"]),
    ("Show Desktop (Win+D)", &["win", "d"]),
    ("Open File Explorer (Win+E)", &["win", "e"]),
    ("Open Run Dialog (Win+R)", &["win", "r"]),
    // File & window management
    ("Copy (Ctrl+C)", &["ctrl", "c"]),
    ("Cut (Ctrl+X)", &["ctrl", "x"]),
    ("Paste (Ctrl+V)", &["ctrl", "v"]),
    ("Undo (Ctrl+Z)", &["ctrl", "z"]),
    ("Redo (Ctrl+Y)", &["ctrl", "y"]),
    ("Select All (Ctrl+A)", &["ctrl", "a"]),
    ("New Window (Ctrl+N)", &["ctrl", "n"]),
    ("New Folder (Ctrl+Shift+N)", &["ctrl", "shift", "n"]),
    ("Properties (Alt+Enter)", &["alt", "enter"]),
    // Browser
    ("New Tab (Ctrl+T)", &["ctrl", "t"]),
    ("Close Tab (Ctrl+W)", &["ctrl", "w"]),
    ("Reopen Closed Tab (Ctrl+Shift+T)", &["ctrl", "shift", "t"]),
    ("Next Tab (Ctrl+Tab)", &["ctrl", "tab"]),
    ("Previous Tab (Ctrl+Shift+Tab)", &["ctrl", "shift", "tab"]),
    ("Focus Address Bar (Ctrl+L)", &["ctrl", "l"]),
    // Text editing
    ("Move Cursor Word Left (Ctrl+Left)", &["ctrl", "left"]),
    ("Move Cursor Word Right (Ctrl+Right)", &["ctrl", "right"]),
    ("Delete Previous Word (Ctrl+Backspace)", &["ctrl", "backspace"]),
    ("Select Word Left (Ctrl+Shift+Left)", &["ctrl", "shift", "left"]),
    ("Select Word Right (Ctrl+Shift+Right)", &["ctrl", "shift", "right"]),
    ("Jump to Start of Doc (Ctrl+Home)", &["ctrl", "home"]),
    ("Jump to End of Doc (Ctrl+End)", &["ctrl", "end"]),
];

/// Look up the key list for a hotkey name. Exact match.
pub fn resolve(name: &str) -> Option<&'static [&'static str]> {
    PREDEFINED_HOTKEYS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, keys)| *keys)
}

/// All hotkey names, sorted.
pub fn names() -> Vec<&'static str> {
    let mut out: Vec<_> = PREDEFINED_HOTKEYS.iter().map(|(n, _)| *n).collect();
    out.sort_unstable();
    out
}
