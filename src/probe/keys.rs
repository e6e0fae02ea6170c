use enigo::Key;

/// Map a key name from the automation vocabulary ("enter", "ctrl", "f5", "a")
/// onto an Enigo key. Names are case-insensitive; a single character is typed
/// as itself. Returns `None` for names this backend cannot press on the
/// current platform.
pub fn parse_key(name: &str) -> Option<Key> {
    let trimmed = name.trim();
    let mut chars = trimmed.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Some(Key::Unicode(c.to_ascii_lowercase()));
    }

    let lower = trimmed.to_ascii_lowercase();
    let key = match lower.as_str() {
        "alt" | "altleft" | "altright" => Key::Alt,
        "ctrl" | "ctrlleft" | "ctrlright" => Key::Control,
        "shift" | "shiftleft" | "shiftright" => Key::Shift,
        "win" | "winleft" | "winright" | "command" => Key::Meta,
        "enter" | "return" => Key::Return,
        "esc" | "escape" => Key::Escape,
        "tab" => Key::Tab,
        "space" => Key::Space,
        "backspace" => Key::Backspace,
        "del" | "delete" => Key::Delete,
        "home" => Key::Home,
        "end" => Key::End,
        "pageup" | "pgup" => Key::PageUp,
        "pagedown" | "pgdn" => Key::PageDown,
        "up" => Key::UpArrow,
        "down" => Key::DownArrow,
        "left" => Key::LeftArrow,
        "right" => Key::RightArrow,
        "capslock" => Key::CapsLock,
        "help" => Key::Help,
        "f1" => Key::F1,
        "f2" => Key::F2,
        "f3" => Key::F3,
        "f4" => Key::F4,
        "f5" => Key::F5,
        "f6" => Key::F6,
        "f7" => Key::F7,
        "f8" => Key::F8,
        "f9" => Key::F9,
        "f10" => Key::F10,
        "f11" => Key::F11,
        "f12" => Key::F12,
        "f13" => Key::F13,
        "f14" => Key::F14,
        "f15" => Key::F15,
        "f16" => Key::F16,
        "f17" => Key::F17,
        "f18" => Key::F18,
        "f19" => Key::F19,
        "f20" => Key::F20,
        // Keypad
        "num0" => Key::Numpad0,
        "num1" => Key::Numpad1,
        "num2" => Key::Numpad2,
        "num3" => Key::Numpad3,
        "num4" => Key::Numpad4,
        "num5" => Key::Numpad5,
        "num6" => Key::Numpad6,
        "num7" => Key::Numpad7,
        "num8" => Key::Numpad8,
        "num9" => Key::Numpad9,
        "add" => Key::Add,
        "subtract" => Key::Subtract,
        "multiply" => Key::Multiply,
        "divide" => Key::Divide,
        "decimal" => Key::Decimal,
        // Media
        "volumeup" => Key::VolumeUp,
        "volumedown" => Key::VolumeDown,
        "volumemute" => Key::VolumeMute,
        "playpause" => Key::MediaPlayPause,
        "nexttrack" => Key::MediaNextTrack,
        "prevtrack" => Key::MediaPrevTrack,
        other => return platform_key(other),
    };
    Some(key)
}

/// Keys Enigo provides on Windows and on X11/Wayland, but not on macOS.
#[cfg(any(target_os = "windows", all(unix, not(target_os = "macos"))))]
fn non_mac_key(name: &str) -> Option<Key> {
    let key = match name {
        "insert" => Key::Insert,
        "print" | "printscreen" | "prntscrn" | "prtscr" => Key::PrintScr,
        "pause" => Key::Pause,
        "numlock" => Key::Numlock,
        "f21" => Key::F21,
        "f22" => Key::F22,
        "f23" => Key::F23,
        "f24" => Key::F24,
        "stop" => Key::MediaStop,
        "clear" => Key::Clear,
        "execute" => Key::Execute,
        "select" => Key::Select,
        "hanguel" | "hangul" => Key::Hangul,
        "hanja" => Key::Hanja,
        "kanji" => Key::Kanji,
        "modechange" => Key::ModeChange,
        _ => return None,
    };
    Some(key)
}

#[cfg(target_os = "windows")]
fn platform_key(name: &str) -> Option<Key> {
    if let Some(key) = non_mac_key(name) {
        return Some(key);
    }
    let key = match name {
        "scrolllock" => Key::Scroll,
        "apps" => Key::Apps,
        "separator" => Key::Separator,
        "sleep" => Key::Sleep,
        "accept" => Key::Accept,
        "convert" => Key::Convert,
        "nonconvert" => Key::NonConvert,
        "final" => Key::Final,
        "junja" => Key::Junja,
        "kana" => Key::Kana,
        "browserback" => Key::BrowserBack,
        "browserfavorites" => Key::BrowserFavorites,
        "browserforward" => Key::BrowserForward,
        "browserhome" => Key::BrowserHome,
        "browserrefresh" => Key::BrowserRefresh,
        "browsersearch" => Key::BrowserSearch,
        "browserstop" => Key::BrowserStop,
        "launchapp1" => Key::LaunchApp1,
        "launchapp2" => Key::LaunchApp2,
        "launchmail" => Key::LaunchMail,
        "launchmediaselect" => Key::LaunchMediaSelect,
        _ => return None,
    };
    Some(key)
}

#[cfg(all(unix, not(target_os = "macos")))]
fn platform_key(name: &str) -> Option<Key> {
    match name {
        "scrolllock" => Some(Key::ScrollLock),
        other => non_mac_key(other),
    }
}

#[cfg(target_os = "macos")]
fn platform_key(name: &str) -> Option<Key> {
    match name {
        "fn" => Some(Key::Function),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_keys() {
        assert_eq!(parse_key("enter"), Some(Key::Return));
        assert_eq!(parse_key("Return"), Some(Key::Return));
        assert_eq!(parse_key("ctrlleft"), Some(Key::Control));
        assert_eq!(parse_key("pgdn"), Some(Key::PageDown));
        assert_eq!(parse_key("F4"), Some(Key::F4));
        assert_eq!(parse_key("f17"), Some(Key::F17));
        assert_eq!(parse_key("num0"), Some(Key::Numpad0));
        assert_eq!(parse_key("num9"), Some(Key::Numpad9));
        assert_eq!(parse_key("volumeup"), Some(Key::VolumeUp));
        assert_eq!(parse_key("volumemute"), Some(Key::VolumeMute));
        assert_eq!(parse_key("playpause"), Some(Key::MediaPlayPause));
        assert_eq!(parse_key("prevtrack"), Some(Key::MediaPrevTrack));
        assert_eq!(parse_key("help"), Some(Key::Help));
        assert_eq!(parse_key("multiply"), Some(Key::Multiply));
    }

    #[cfg(any(target_os = "windows", all(unix, not(target_os = "macos"))))]
    #[test]
    fn editing_and_lock_keys() {
        assert_eq!(parse_key("insert"), Some(Key::Insert));
        assert_eq!(parse_key("printscreen"), Some(Key::PrintScr));
        assert_eq!(parse_key("prtscr"), Some(Key::PrintScr));
        assert_eq!(parse_key("pause"), Some(Key::Pause));
        assert_eq!(parse_key("numlock"), Some(Key::Numlock));
        assert_eq!(parse_key("f24"), Some(Key::F24));
        assert!(parse_key("scrolllock").is_some());
    }

    #[cfg(target_os = "windows")]
    #[test]
    fn windows_only_keys() {
        assert_eq!(parse_key("apps"), Some(Key::Apps));
        assert_eq!(parse_key("scrolllock"), Some(Key::Scroll));
        assert_eq!(parse_key("launchmediaselect"), Some(Key::LaunchMediaSelect));
    }

    #[test]
    fn single_characters_are_unicode() {
        assert_eq!(parse_key("c"), Some(Key::Unicode('c')));
        assert_eq!(parse_key("C"), Some(Key::Unicode('c')));
        assert_eq!(parse_key("7"), Some(Key::Unicode('7')));
    }

    #[test]
    fn unknown_names() {
        assert_eq!(parse_key(""), None);
        assert_eq!(parse_key("yen"), None);
        assert_eq!(parse_key("hyperdrive"), None);
    }
}
