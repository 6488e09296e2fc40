/// Key bindings for the terminal front end
///
/// A keymap file has one `key = event-id` binding per line. Blank lines and
/// `#` comments are ignored. Keys are single characters or one of the names
/// `Up`, `Down`, `Left`, `Right`, `Esc`, `Space`, `Enter`, `Tab`.
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crossterm::event::KeyCode;
use nom::{
    bytes::complete::{take_till1, take_while1},
    character::complete::{char, space0},
    combinator::{all_consuming, opt, rest},
    sequence::{delimited, preceded, tuple},
    IResult,
};
use rig3d_core::{CameraView, Preset};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeymapError {
    #[error("failed to read keymap {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: expected `key = event-id`, got `{text}`")]
    Syntax { line: usize, text: String },

    #[error("line {line}: unknown key `{key}`")]
    UnknownKey { line: usize, key: String },
}

/// A key as written in a keymap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Up,
    Down,
    Left,
    Right,
    Esc,
    Space,
    Enter,
    Tab,
}

impl Key {
    /// Letters are case-insensitive.
    pub fn from_name(name: &str) -> Option<Key> {
        let mut chars = name.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Some(Key::from_char(c));
        }
        let key = match name.to_ascii_lowercase().as_str() {
            "up" => Key::Up,
            "down" => Key::Down,
            "left" => Key::Left,
            "right" => Key::Right,
            "esc" | "escape" => Key::Esc,
            "space" => Key::Space,
            "enter" | "return" => Key::Enter,
            "tab" => Key::Tab,
            _ => return None,
        };
        Some(key)
    }

    fn from_char(c: char) -> Key {
        match c {
            ' ' => Key::Space,
            '\t' => Key::Tab,
            c => Key::Char(c.to_ascii_lowercase()),
        }
    }

    pub fn from_code(code: KeyCode) -> Option<Key> {
        let key = match code {
            KeyCode::Char(c) => Key::from_char(c),
            KeyCode::Up => Key::Up,
            KeyCode::Down => Key::Down,
            KeyCode::Left => Key::Left,
            KeyCode::Right => Key::Right,
            KeyCode::Esc => Key::Esc,
            KeyCode::Enter => Key::Enter,
            KeyCode::Tab => Key::Tab,
            _ => return None,
        };
        Some(key)
    }
}

/// What a bound key does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Forwarded to the simulation as an input event.
    Sim(String),
    Camera(CameraView),
    ToggleWireframe,
    Quit,
}

impl Action {
    fn from_event(event: &str) -> Action {
        match event {
            "quit" => Action::Quit,
            "toggle-wireframe" => Action::ToggleWireframe,
            other => match other.strip_prefix("camera-").and_then(CameraView::from_label) {
                Some(view) => Action::Camera(view),
                None => Action::Sim(other.to_string()),
            },
        }
    }
}

const COMMON_BINDINGS: &str = "\
7 = toggle-wireframe
Esc = quit
";

const TRANSFORMER_BINDINGS: &str = "\
1 = camera-frontal
2 = camera-lateral
3 = camera-top
4 = camera-perspective

# Robot joints
r = rotate-head-cw
f = rotate-head-ccw
e = arms-out
d = arms-in
w = legs-forward
s = legs-back
a = feet-out
q = feet-in

# Truck mode
c = transform-close
v = transform-open

# Trailer
Up = trailer-forward
Down = trailer-back
Left = trailer-left
Right = trailer-right
";

const CRANE_BINDINGS: &str = "\
1 = camera-frontal
2 = camera-lateral
3 = camera-top
4 = camera-isometric
5 = camera-perspective
6 = camera-follow

q = slew-left
a = slew-right
w = trolley-in
s = trolley-out
e = hook-up
d = hook-down
r = claw-close
f = claw-open
g = claw-grab   # full close
t = claw-release
";

#[derive(Debug, Clone, Default)]
pub struct Keymap {
    bindings: HashMap<Key, Action>,
}

impl Keymap {
    pub fn parse(text: &str) -> Result<Self, KeymapError> {
        let mut bindings = HashMap::new();
        for (index, line) in text.lines().enumerate() {
            let line_no = index + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let (_, (key_name, event)) =
                all_consuming(binding)(trimmed).map_err(|_| KeymapError::Syntax {
                    line: line_no,
                    text: trimmed.to_string(),
                })?;
            let key = Key::from_name(key_name).ok_or_else(|| KeymapError::UnknownKey {
                line: line_no,
                key: key_name.to_string(),
            })?;
            bindings.insert(key, Action::from_event(event));
        }
        Ok(Self { bindings })
    }

    pub fn load(path: &Path) -> Result<Self, KeymapError> {
        let text = fs::read_to_string(path).map_err(|source| KeymapError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Wireframe and quit keys plus the default cameras and controls of
    /// `preset`.
    pub fn for_preset(preset: Preset) -> Result<Self, KeymapError> {
        let mut keymap = Self::parse(COMMON_BINDINGS)?;
        let controls = match preset {
            Preset::Transformer => TRANSFORMER_BINDINGS,
            Preset::TowerCrane => CRANE_BINDINGS,
        };
        keymap.merge(Self::parse(controls)?);
        Ok(keymap)
    }

    /// Bindings in `other` replace ours for the same key.
    pub fn merge(&mut self, other: Keymap) {
        self.bindings.extend(other.bindings);
    }

    pub fn action(&self, key: Key) -> Option<&Action> {
        self.bindings.get(&key)
    }

    /// Camera views reachable from this keymap, in `CameraView::ALL` order.
    pub fn views(&self) -> Vec<CameraView> {
        CameraView::ALL
            .into_iter()
            .filter(|view| self.bindings.values().any(|a| *a == Action::Camera(*view)))
            .collect()
    }

    /// Simulation event ids referenced by this keymap.
    pub fn sim_events(&self) -> impl Iterator<Item = &str> + '_ {
        self.bindings.values().filter_map(|action| match action {
            Action::Sim(event) => Some(event.as_str()),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// `key = event-id [# comment]`
fn binding(input: &str) -> IResult<&str, (&str, &str)> {
    let (input, (key, _, event, _, _)) = tuple((
        take_till1(|c: char| c.is_whitespace() || c == '='),
        delimited(space0, char('='), space0),
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
        space0,
        opt(preceded(char('#'), rest)),
    ))(input)?;
    Ok((input, (key, event)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bindings_and_comments() {
        let keymap = Keymap::parse(
            "# header\n\n  W = legs-forward  # lean\nUp=trailer-forward\nesc = quit\n3 = camera-top\n",
        )
        .unwrap();
        assert_eq!(keymap.len(), 4);
        assert_eq!(
            keymap.action(Key::Char('w')),
            Some(&Action::Sim("legs-forward".into()))
        );
        assert_eq!(
            keymap.action(Key::Up),
            Some(&Action::Sim("trailer-forward".into()))
        );
        assert_eq!(keymap.action(Key::Esc), Some(&Action::Quit));
        assert_eq!(
            keymap.action(Key::Char('3')),
            Some(&Action::Camera(CameraView::Top))
        );
    }

    #[test]
    fn test_syntax_error_reports_line() {
        let err = Keymap::parse("w = legs-forward\nthis is wrong\n").unwrap_err();
        assert!(matches!(err, KeymapError::Syntax { line: 2, .. }));

        let err = Keymap::parse("w = \n").unwrap_err();
        assert!(matches!(err, KeymapError::Syntax { line: 1, .. }));
    }

    #[test]
    fn test_unknown_key_name() {
        let err = Keymap::parse("PageUp = hook-up").unwrap_err();
        match err {
            KeymapError::UnknownKey { line, key } => {
                assert_eq!(line, 1);
                assert_eq!(key, "PageUp");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_key_codes() {
        assert_eq!(Key::from_code(KeyCode::Char('Q')), Some(Key::Char('q')));
        assert_eq!(Key::from_code(KeyCode::Char(' ')), Some(Key::Space));
        assert_eq!(Key::from_code(KeyCode::Left), Some(Key::Left));
        assert_eq!(Key::from_code(KeyCode::F(1)), None);
        assert_eq!(Key::from_name("Space"), Some(Key::Space));
    }

    #[test]
    fn test_default_keymaps_bind_preset_events() {
        for preset in Preset::ALL {
            let keymap = Keymap::for_preset(preset).unwrap();
            let sim = preset.build().unwrap();
            for event in keymap.sim_events() {
                assert!(
                    sim.inputs().command(event).is_some(),
                    "{preset}: `{event}` is not bound"
                );
            }
            assert_eq!(keymap.action(Key::Esc), Some(&Action::Quit));
        }
    }

    #[test]
    fn test_camera_keys_per_preset() {
        let crane = Keymap::for_preset(Preset::TowerCrane).unwrap();
        assert_eq!(crane.views(), CameraView::ALL.to_vec());
        assert_eq!(
            crane.action(Key::Char('4')),
            Some(&Action::Camera(CameraView::Isometric))
        );
        assert_eq!(
            crane.action(Key::Char('6')),
            Some(&Action::Camera(CameraView::Follow))
        );

        let transformer = Keymap::for_preset(Preset::Transformer).unwrap();
        assert_eq!(transformer.views().len(), 4);
        assert_eq!(
            transformer.action(Key::Char('4')),
            Some(&Action::Camera(CameraView::Perspective))
        );
        assert_eq!(transformer.action(Key::Char('6')), None);

        let custom = Keymap::parse("9 = camera-follow\n0 = camera-sideways").unwrap();
        assert_eq!(custom.action(Key::Char('9')), Some(&Action::Camera(CameraView::Follow)));
        assert_eq!(
            custom.action(Key::Char('0')),
            Some(&Action::Sim("camera-sideways".into()))
        );
    }

    #[test]
    fn test_merge_overrides() {
        let mut keymap = Keymap::for_preset(Preset::Transformer).unwrap();
        keymap.merge(Keymap::parse("q = quit").unwrap());
        assert_eq!(keymap.action(Key::Char('q')), Some(&Action::Quit));
        assert_eq!(
            keymap.action(Key::Char('a')),
            Some(&Action::Sim("feet-out".into()))
        );
    }
}
