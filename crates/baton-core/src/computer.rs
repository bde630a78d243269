//! Computer-control vocabulary.
//!
//! A model that drives a virtual device emits [`ComputerCall`] items, each
//! carrying one [`ComputerAction`]. The runtime executes the action against a
//! device and always answers with a fresh screenshot.

use serde::{Deserialize, Serialize};

/// Kind of environment the controlled device presents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    /// macOS desktop.
    Mac,
    /// Windows desktop.
    Windows,
    /// Ubuntu desktop.
    Ubuntu,
    /// A headless or headed web browser.
    Browser,
}

/// Pointer button used by a click.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    /// Primary button.
    #[default]
    Left,
    /// Secondary button.
    Right,
    /// Middle button / wheel press.
    Wheel,
    /// Browser back button.
    Back,
    /// Browser forward button.
    Forward,
}

/// A screen coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position in pixels.
    pub x: i32,
    /// Vertical position in pixels.
    pub y: i32,
}

/// A primitive operation requested by the model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComputerAction {
    /// Single click.
    Click {
        /// X coordinate.
        x: i32,
        /// Y coordinate.
        y: i32,
        /// Button to press.
        #[serde(default)]
        button: MouseButton,
    },
    /// Double click with the primary button.
    DoubleClick {
        /// X coordinate.
        x: i32,
        /// Y coordinate.
        y: i32,
    },
    /// Scroll at a position.
    Scroll {
        /// X coordinate.
        x: i32,
        /// Y coordinate.
        y: i32,
        /// Horizontal scroll distance.
        scroll_x: i32,
        /// Vertical scroll distance.
        scroll_y: i32,
    },
    /// Type text at the current focus.
    Type {
        /// Text to type.
        text: String,
    },
    /// Wait for the device to settle.
    Wait,
    /// Move the pointer.
    Move {
        /// X coordinate.
        x: i32,
        /// Y coordinate.
        y: i32,
    },
    /// Press a key combination.
    Keypress {
        /// Keys pressed together.
        keys: Vec<String>,
    },
    /// Drag the pointer along a path.
    Drag {
        /// Waypoints, starting with the press position.
        path: Vec<Point>,
    },
    /// Capture the screen without acting.
    Screenshot,
}

impl ComputerAction {
    /// Short action name, used in logs and spans.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Click { .. } => "click",
            Self::DoubleClick { .. } => "double_click",
            Self::Scroll { .. } => "scroll",
            Self::Type { .. } => "type",
            Self::Wait => "wait",
            Self::Move { .. } => "move",
            Self::Keypress { .. } => "keypress",
            Self::Drag { .. } => "drag",
            Self::Screenshot => "screenshot",
        }
    }
}

/// A safety check the provider attached to a computer call.
///
/// It must be acknowledged before the action runs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyCheck {
    /// Check identifier.
    pub id: String,
    /// Machine-readable check code.
    pub code: String,
    /// Human-readable explanation.
    pub message: String,
}

/// A model-issued computer action call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputerCall {
    /// Item identifier.
    pub id: String,
    /// Call identifier echoed by the output item.
    pub call_id: String,
    /// Action to perform.
    pub action: ComputerAction,
    /// Checks that must be acknowledged before acting.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pending_safety_checks: Vec<SafetyCheck>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn click_defaults_to_left_button() {
        let action: ComputerAction =
            serde_json::from_value(serde_json::json!({"type": "click", "x": 3, "y": 4})).unwrap();
        assert_eq!(
            action,
            ComputerAction::Click {
                x: 3,
                y: 4,
                button: MouseButton::Left
            }
        );
    }

    #[test]
    fn drag_path_roundtrip_shape() {
        let action = ComputerAction::Drag {
            path: vec![Point { x: 0, y: 0 }, Point { x: 10, y: 5 }],
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "drag");
        assert_eq!(json["path"][1]["x"], 10);
    }

    #[test]
    fn action_kind_names() {
        assert_eq!(ComputerAction::Wait.kind(), "wait");
        assert_eq!(ComputerAction::Screenshot.kind(), "screenshot");
        assert_eq!(
            ComputerAction::Keypress {
                keys: vec!["ctrl".into(), "c".into()]
            }
            .kind(),
            "keypress"
        );
    }

    #[test]
    fn safety_checks_omitted_when_empty() {
        let call = ComputerCall {
            id: "cu_1".into(),
            call_id: "call_1".into(),
            action: ComputerAction::Screenshot,
            pending_safety_checks: vec![],
        };
        let json = serde_json::to_value(&call).unwrap();
        assert!(json.get("pending_safety_checks").is_none());
    }
}
