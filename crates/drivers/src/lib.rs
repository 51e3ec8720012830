//! Platform driver for the Redress support agent.
//!
//! The [`a11y::AccessibilityEngine`] is the only component that touches the
//! platform UI surface: it turns the accessibility tree into
//! [`redress_types::ScreenState`] snapshots, executes clicks, text entry,
//! scrolls, and gestures, and provides the waits the control loop paces
//! itself with.

pub mod a11y;

pub use a11y::AccessibilityEngine;
