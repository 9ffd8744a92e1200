//! Colours for the trajectory scene.

pub mod theme;

pub use theme::ViewerTheme;
