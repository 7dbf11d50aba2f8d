//! Reusable settings group for a window's position, size and state.
//!
//! Include it in an application schema as a group:
//!
//! ```
//! use settingskit::settings_schema;
//! use settingskit::window::WindowStateSettings;
//!
//! settings_schema! {
//!     pub struct AppSettings {
//!         groups {
//!             main_window_state: WindowStateSettings = "MainWindowState";
//!         }
//!     }
//! }
//! ```

use crate::error::Result;
use crate::settings_schema;

/// Marks a coordinate or extent that was never saved.
pub const UNSET: i32 = i32::MIN;

settings_schema! {
    /// Location, size and maximized state of a window.
    pub struct WindowStateSettings {
        fields {
            /// Left edge of the window.
            left / set_left: i32 = "Left", default UNSET;
            /// Top edge of the window.
            top / set_top: i32 = "Top", default UNSET;
            /// Width of the window.
            width / set_width: i32 = "Width", default UNSET;
            /// Height of the window.
            height / set_height: i32 = "Height", default UNSET;
            /// Whether the window is maximized.
            is_maximized / set_is_maximized: bool = "IsMaximized", default false;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowBounds {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl WindowStateSettings {
    /// The saved bounds, if all four were saved.
    pub fn bounds(&self) -> Option<WindowBounds> {
        let bounds = WindowBounds {
            left: self.left(),
            top: self.top(),
            width: self.width(),
            height: self.height(),
        };
        let saved = [bounds.left, bounds.top, bounds.width, bounds.height]
            .iter()
            .all(|v| *v != UNSET);
        saved.then_some(bounds)
    }

    pub fn save(&self, bounds: WindowBounds, is_maximized: bool) -> Result<()> {
        self.set_left(bounds.left)?;
        self.set_top(bounds.top)?;
        self.set_width(bounds.width)?;
        self.set_height(bounds.height)?;
        self.set_is_maximized(is_maximized)
    }
}
