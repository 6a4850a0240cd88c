use crate::settings::{SettingKey, Settings, SettingsStore};

/// Identifier for a keyboard key the controls can bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Named(NamedKey),
    Character(char),
}

impl KeyCode {
    pub fn from_name(name: &str) -> Option<Self> {
        if let Some(key) = parse_named_key(name) {
            return Some(key);
        }
        let mut chars = name.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) if ch.is_ascii_alphanumeric() => {
                Some(Self::Character(ch.to_ascii_uppercase()))
            }
            _ => None,
        }
    }
}

fn parse_named_key(name: &str) -> Option<KeyCode> {
    use NamedKey::*;
    let key = match name {
        "Left" => Left,
        "Right" => Right,
        "Up" => Up,
        "Down" => Down,
        "Escape" | "Esc" => Escape,
        _ => return None,
    };
    Some(KeyCode::Named(key))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Left,
    Right,
    Up,
    Down,
    Escape,
}

/// What a key press does to the settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlAction {
    /// Move a setting by this many steps of its range.
    Nudge(SettingKey, f32),
    TogglePerspective,
    Reset,
}

/// Keyboard layout standing in for the slider panel.
pub const BINDINGS: [(&str, ControlAction); 25] = [
    ("Left", ControlAction::Nudge(SettingKey::CameraX, -1.0)),
    ("Right", ControlAction::Nudge(SettingKey::CameraX, 1.0)),
    ("Down", ControlAction::Nudge(SettingKey::CameraY, -1.0)),
    ("Up", ControlAction::Nudge(SettingKey::CameraY, 1.0)),
    ("A", ControlAction::Nudge(SettingKey::LightX, -1.0)),
    ("D", ControlAction::Nudge(SettingKey::LightX, 1.0)),
    ("Q", ControlAction::Nudge(SettingKey::LightY, -1.0)),
    ("E", ControlAction::Nudge(SettingKey::LightY, 1.0)),
    ("W", ControlAction::Nudge(SettingKey::LightZ, -1.0)),
    ("S", ControlAction::Nudge(SettingKey::LightZ, 1.0)),
    ("J", ControlAction::Nudge(SettingKey::TargetX, -1.0)),
    ("L", ControlAction::Nudge(SettingKey::TargetX, 1.0)),
    ("U", ControlAction::Nudge(SettingKey::TargetY, -1.0)),
    ("O", ControlAction::Nudge(SettingKey::TargetY, 1.0)),
    ("I", ControlAction::Nudge(SettingKey::TargetZ, -1.0)),
    ("K", ControlAction::Nudge(SettingKey::TargetZ, 1.0)),
    ("Z", ControlAction::Nudge(SettingKey::ProjectionWidth, -1.0)),
    ("X", ControlAction::Nudge(SettingKey::ProjectionWidth, 1.0)),
    ("C", ControlAction::Nudge(SettingKey::ProjectionHeight, -1.0)),
    ("V", ControlAction::Nudge(SettingKey::ProjectionHeight, 1.0)),
    ("F", ControlAction::Nudge(SettingKey::FieldOfView, -1.0)),
    ("G", ControlAction::Nudge(SettingKey::FieldOfView, 1.0)),
    ("B", ControlAction::Nudge(SettingKey::Bias, -1.0)),
    ("N", ControlAction::Nudge(SettingKey::Bias, 1.0)),
    ("P", ControlAction::TogglePerspective),
];

/// Multiplier applied to nudges while shift is held.
pub const COARSE_FACTOR: f32 = 10.0;

#[derive(Debug, Clone)]
pub struct Controls {
    bindings: Vec<(KeyCode, ControlAction)>,
}

impl Default for Controls {
    fn default() -> Self {
        let mut bindings: Vec<_> = BINDINGS
            .iter()
            .filter_map(|(name, action)| KeyCode::from_name(name).map(|key| (key, *action)))
            .collect();
        bindings.push((KeyCode::Character('R'), ControlAction::Reset));
        Self { bindings }
    }
}

impl Controls {
    pub fn action_for(&self, key: KeyCode, coarse: bool) -> Option<ControlAction> {
        let key = match key {
            KeyCode::Character(ch) => KeyCode::Character(ch.to_ascii_uppercase()),
            named => named,
        };
        let (_, action) = self.bindings.iter().find(|(bound, _)| *bound == key)?;
        Some(match *action {
            ControlAction::Nudge(setting, steps) if coarse => {
                ControlAction::Nudge(setting, steps * COARSE_FACTOR)
            }
            other => other,
        })
    }

    /// Applies a key press to the store. Returns whether a redraw is due.
    pub fn handle_key(&self, key: KeyCode, coarse: bool, store: &SettingsStore) -> bool {
        match self.action_for(key, coarse) {
            Some(action) => apply(action, store),
            None => false,
        }
    }

    pub fn bindings(&self) -> &[(KeyCode, ControlAction)] {
        &self.bindings
    }
}

pub fn apply(action: ControlAction, store: &SettingsStore) -> bool {
    store.update(|settings| match action {
        ControlAction::Nudge(key, steps) => settings.nudge(key, steps),
        ControlAction::TogglePerspective => {
            settings.toggle_perspective();
            true
        }
        ControlAction::Reset => {
            let defaults = Settings::default();
            let changed = *settings != defaults;
            *settings = defaults;
            changed
        }
    })
}
