//! # Pane Layout
//!
//! State machine for how the editors and the preview share the screen.
//!
//! ```text
//!            toggle                toggle               toggle
//! Horizontal ──────► Vertical ──────────► Stacked ──────────► Horizontal
//!      (desktop only; on mobile everything renders Stacked)
//!
//! Desktop ◄──── viewport crosses 768px ────► Mobile
//! ```
//!
//! The user's arrangement preference survives a trip through mobile.
//! Resize gestures only move the preview size, never the state.

use serde::{Deserialize, Serialize};

/// Viewports narrower than this are mobile
pub const MOBILE_BREAKPOINT: f64 = 768.0;

pub const DEFAULT_PREVIEW_SIZE: f64 = 50.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    #[default]
    Horizontal,
    Vertical,
    Stacked,
}

impl LayoutMode {
    /// Next arrangement in the toggle cycle
    pub fn next(self) -> Self {
        match self {
            LayoutMode::Horizontal => LayoutMode::Vertical,
            LayoutMode::Vertical => LayoutMode::Stacked,
            LayoutMode::Stacked => LayoutMode::Horizontal,
        }
    }

    /// Axis the editor/preview divider moves along
    pub fn resize_axis(self) -> Axis {
        match self {
            LayoutMode::Horizontal => Axis::X,
            LayoutMode::Vertical | LayoutMode::Stacked => Axis::Y,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    #[default]
    Desktop,
    Mobile,
}

impl DeviceClass {
    pub fn from_viewport_width(width: f64) -> Self {
        if width < MOBILE_BREAKPOINT {
            DeviceClass::Mobile
        } else {
            DeviceClass::Desktop
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerKind {
    Mouse,
    Touch,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn along(self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
        }
    }
}

/// An in-progress drag on the divider
#[derive(Debug, Clone, Copy, PartialEq)]
struct ResizeGesture {
    kind: PointerKind,
    axis: Axis,
    origin: f64,
    start_size: f64,
    extent: f64,
}

/// Serializable view of the layout
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutState {
    pub mode: LayoutMode,
    pub effective_mode: LayoutMode,
    pub device: DeviceClass,
    pub preview_size: f64,
    pub resizing: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutManager {
    preferred: LayoutMode,
    device: DeviceClass,
    preview_size: f64,
    gesture: Option<ResizeGesture>,
}

impl LayoutManager {
    pub fn new(mode: LayoutMode) -> Self {
        Self {
            preferred: mode,
            device: DeviceClass::Desktop,
            preview_size: DEFAULT_PREVIEW_SIZE,
            gesture: None,
        }
    }

    /// The stored arrangement preference
    pub fn mode(&self) -> LayoutMode {
        self.preferred
    }

    /// What is actually on screen
    pub fn effective_mode(&self) -> LayoutMode {
        match self.device {
            DeviceClass::Desktop => self.preferred,
            DeviceClass::Mobile => LayoutMode::Stacked,
        }
    }

    pub fn device(&self) -> DeviceClass {
        self.device
    }

    pub fn preview_size(&self) -> f64 {
        self.preview_size
    }

    pub fn is_resizing(&self) -> bool {
        self.gesture.is_some()
    }

    /// Cycle the arrangement. Ignored on mobile.
    pub fn toggle_layout(&mut self) -> bool {
        if self.device == DeviceClass::Mobile {
            return false;
        }
        self.gesture = None;
        self.preferred = self.preferred.next();
        true
    }

    /// Select an arrangement directly. Ignored on mobile.
    pub fn set_mode(&mut self, mode: LayoutMode) -> bool {
        if self.device == DeviceClass::Mobile {
            return false;
        }
        if self.preferred != mode {
            self.gesture = None;
            self.preferred = mode;
        }
        true
    }

    /// Reinstate a persisted preference regardless of device class
    pub(crate) fn restore_preference(&mut self, mode: LayoutMode) {
        self.gesture = None;
        self.preferred = mode;
    }

    /// Re-derive the device class. Returns true when it changed.
    pub fn on_viewport_resize(&mut self, width: f64) -> bool {
        let device = DeviceClass::from_viewport_width(width);
        if device == self.device {
            return false;
        }
        tracing::debug!(?device, width, "device class changed");
        self.device = device;
        self.gesture = None;
        true
    }

    /// Start dragging the divider. `extent` is the container length along
    /// the resize axis; non-positive extents are rejected.
    pub fn begin_resize(&mut self, kind: PointerKind, pointer: Point, extent: f64) -> bool {
        if !(extent > 0.0) || !extent.is_finite() {
            return false;
        }
        let axis = self.effective_mode().resize_axis();
        self.gesture = Some(ResizeGesture {
            kind,
            axis,
            origin: pointer.along(axis),
            start_size: self.preview_size,
            extent,
        });
        true
    }

    /// Move the divider. The size is derived from the absolute pointer
    /// position against the gesture origin, so repeated updates never drift.
    pub fn update_resize(&mut self, pointer: Point) -> Option<f64> {
        let gesture = self.gesture?;
        let delta = pointer.along(gesture.axis) - gesture.origin;
        let size = gesture.start_size - delta / gesture.extent * 100.0;
        if size.is_nan() {
            return Some(self.preview_size);
        }
        self.preview_size = size.clamp(0.0, 100.0);
        Some(self.preview_size)
    }

    /// Finish the gesture, keeping the last size
    pub fn end_resize(&mut self) -> Option<PointerKind> {
        self.gesture.take().map(|gesture| gesture.kind)
    }

    /// Abort the gesture and restore the size it started from
    pub fn cancel_resize(&mut self) {
        if let Some(gesture) = self.gesture.take() {
            self.preview_size = gesture.start_size;
        }
    }

    pub fn state(&self) -> LayoutState {
        LayoutState {
            mode: self.preferred,
            effective_mode: self.effective_mode(),
            device: self.device,
            preview_size: self.preview_size,
            resizing: self.is_resizing(),
        }
    }
}

impl Default for LayoutManager {
    fn default() -> Self {
        Self::new(LayoutMode::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_cycle() {
        let mut layout = LayoutManager::default();
        assert_eq!(layout.mode(), LayoutMode::Horizontal);

        assert!(layout.toggle_layout());
        assert_eq!(layout.mode(), LayoutMode::Vertical);
        assert!(layout.toggle_layout());
        assert_eq!(layout.mode(), LayoutMode::Stacked);
        assert!(layout.toggle_layout());
        assert_eq!(layout.mode(), LayoutMode::Horizontal);
    }

    #[test]
    fn test_mobile_preserves_preference() {
        let mut layout = LayoutManager::default();
        layout.set_mode(LayoutMode::Vertical);

        assert!(layout.on_viewport_resize(600.0));
        assert_eq!(layout.device(), DeviceClass::Mobile);
        assert_eq!(layout.effective_mode(), LayoutMode::Stacked);
        assert_eq!(layout.mode(), LayoutMode::Vertical);

        assert!(layout.on_viewport_resize(1280.0));
        assert_eq!(layout.effective_mode(), LayoutMode::Vertical);
    }

    #[test]
    fn test_toggle_ignored_on_mobile() {
        let mut layout = LayoutManager::default();
        layout.on_viewport_resize(375.0);

        assert!(!layout.toggle_layout());
        assert!(!layout.set_mode(LayoutMode::Stacked));
        assert_eq!(layout.mode(), LayoutMode::Horizontal);
    }

    #[test]
    fn test_breakpoint_boundary() {
        assert_eq!(DeviceClass::from_viewport_width(767.9), DeviceClass::Mobile);
        assert_eq!(DeviceClass::from_viewport_width(768.0), DeviceClass::Desktop);

        let mut layout = LayoutManager::default();
        assert!(!layout.on_viewport_resize(1024.0));
    }

    #[test]
    fn test_resize_from_gesture_origin() {
        let mut layout = LayoutManager::default();
        assert!(layout.begin_resize(PointerKind::Mouse, Point::new(500.0, 10.0), 1000.0));

        // 100px right of origin in a 1000px container shrinks the preview by 10%
        assert_eq!(layout.update_resize(Point::new(600.0, 10.0)), Some(40.0));
        // Same pointer position again: no accumulation
        assert_eq!(layout.update_resize(Point::new(600.0, 10.0)), Some(40.0));
        assert_eq!(layout.update_resize(Point::new(400.0, 99.0)), Some(60.0));

        assert_eq!(layout.end_resize(), Some(PointerKind::Mouse));
        assert_eq!(layout.preview_size(), 60.0);
        assert_eq!(layout.update_resize(Point::new(0.0, 0.0)), None);
    }

    #[test]
    fn test_resize_is_clamped() {
        let mut layout = LayoutManager::default();
        layout.begin_resize(PointerKind::Touch, Point::new(0.0, 0.0), 200.0);

        assert_eq!(layout.update_resize(Point::new(10_000.0, 0.0)), Some(0.0));
        assert_eq!(layout.update_resize(Point::new(-10_000.0, 0.0)), Some(100.0));
        assert_eq!(layout.update_resize(Point::new(f64::INFINITY, 0.0)), Some(0.0));
    }

    #[test]
    fn test_vertical_resize_uses_y_axis() {
        let mut layout = LayoutManager::new(LayoutMode::Vertical);
        layout.begin_resize(PointerKind::Touch, Point::new(0.0, 300.0), 600.0);

        assert_eq!(layout.update_resize(Point::new(900.0, 300.0)), Some(50.0));
        assert_eq!(layout.update_resize(Point::new(0.0, 240.0)), Some(60.0));
    }

    #[test]
    fn test_zero_extent_rejected() {
        let mut layout = LayoutManager::default();
        assert!(!layout.begin_resize(PointerKind::Mouse, Point::default(), 0.0));
        assert!(!layout.begin_resize(PointerKind::Mouse, Point::default(), f64::NAN));
        assert!(!layout.is_resizing());
    }

    #[test]
    fn test_cancel_restores_size() {
        let mut layout = LayoutManager::default();
        layout.begin_resize(PointerKind::Mouse, Point::new(0.0, 0.0), 100.0);
        layout.update_resize(Point::new(30.0, 0.0));
        assert_eq!(layout.preview_size(), 20.0);

        layout.cancel_resize();
        assert_eq!(layout.preview_size(), DEFAULT_PREVIEW_SIZE);
    }

    #[test]
    fn test_device_change_ends_gesture() {
        let mut layout = LayoutManager::default();
        layout.begin_resize(PointerKind::Touch, Point::new(0.0, 0.0), 100.0);
        layout.on_viewport_resize(320.0);
        assert!(!layout.is_resizing());
    }
}
