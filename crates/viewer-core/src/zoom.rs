//! Zoom factor driven by wheel notches and pinch gestures.

use doc_model::MIN_ZOOM;

/// Zoom change applied by one wheel notch.
pub const ZOOM_STEP: f32 = 0.1;

/// Slack used when comparing against the floor, so that `1.0 - 8 * 0.1`
/// still counts as reaching 0.2.
const FLOOR_TOLERANCE: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

/// Current zoom factor. Always `>= MIN_ZOOM`, unbounded above.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomState {
    zoom: f32,
}

impl Default for ZoomState {
    fn default() -> Self {
        Self { zoom: 1.0 }
    }
}

impl ZoomState {
    pub fn zoom(&self) -> f32 {
        self.zoom
    }
}

#[derive(Debug, Clone, Default)]
pub struct ZoomController {
    state: ZoomState,
}

impl ZoomController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts at `zoom`, raised to the floor if needed.
    pub fn with_zoom(zoom: f32) -> Self {
        let zoom = if zoom.is_finite() { zoom.max(MIN_ZOOM) } else { 1.0 };
        Self { state: ZoomState { zoom } }
    }

    pub fn state(&self) -> ZoomState {
        self.state
    }

    pub fn zoom(&self) -> f32 {
        self.state.zoom
    }

    /// One discrete notch. Returns whether the zoom changed.
    ///
    /// Zooming out is refused once the result would drop below the floor.
    pub fn step(&mut self, direction: ZoomDirection) -> bool {
        let next = match direction {
            ZoomDirection::In => self.state.zoom + ZOOM_STEP,
            ZoomDirection::Out => {
                let next = self.state.zoom - ZOOM_STEP;
                if next < MIN_ZOOM - FLOOR_TOLERANCE {
                    log::debug!("zoom out refused at {:.2}", self.state.zoom);
                    return false;
                }
                next.max(MIN_ZOOM)
            }
        };

        self.set(next)
    }

    /// Continuous gesture input. Non-finite or non-positive factors are
    /// ignored, as is a factor that would overflow the zoom.
    pub fn scale_by(&mut self, factor: f32) -> bool {
        if !factor.is_finite() || factor <= 0.0 {
            return false;
        }

        self.set((self.state.zoom * factor).max(MIN_ZOOM))
    }

    pub fn effective_dpi(&self, base_dpi: f32) -> f32 {
        base_dpi * self.state.zoom
    }

    fn set(&mut self, zoom: f32) -> bool {
        if !zoom.is_finite() {
            log::debug!("zoom {:.3} kept, {zoom} is out of range", self.state.zoom);
            return false;
        }
        if (zoom - self.state.zoom).abs() < f32::EPSILON {
            return false;
        }

        log::debug!("zoom {:.3} -> {:.3}", self.state.zoom, zoom);
        self.state.zoom = zoom;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wheel_steps_by_a_tenth() {
        let mut zoom = ZoomController::new();
        assert!(zoom.step(ZoomDirection::In));
        assert!((zoom.zoom() - 1.1).abs() < 1e-5);

        assert!(zoom.step(ZoomDirection::Out));
        assert!(zoom.step(ZoomDirection::Out));
        assert!((zoom.zoom() - 0.9).abs() < 1e-5);
    }

    #[test]
    fn zoom_out_stops_at_floor_despite_float_drift() {
        let mut zoom = ZoomController::new();
        let mut accepted = 0;
        for _ in 0..20 {
            if zoom.step(ZoomDirection::Out) {
                accepted += 1;
            }
        }

        assert_eq!(accepted, 8);
        assert!((zoom.zoom() - MIN_ZOOM).abs() < 1e-4);
        assert!(zoom.zoom() >= MIN_ZOOM);
    }

    #[test]
    fn zoom_in_has_no_ceiling() {
        let mut zoom = ZoomController::with_zoom(50.0);
        assert!(zoom.step(ZoomDirection::In));
        assert!(zoom.scale_by(10.0));
        assert!(zoom.zoom() > 500.0);
    }

    #[test]
    fn pinch_clamps_to_floor() {
        let mut zoom = ZoomController::new();
        assert!(zoom.scale_by(0.01));
        assert_eq!(zoom.zoom(), MIN_ZOOM);

        assert!(!zoom.scale_by(0.5));
        assert_eq!(zoom.zoom(), MIN_ZOOM);
    }

    #[test]
    fn pinch_ignores_invalid_factors() {
        let mut zoom = ZoomController::new();
        assert!(!zoom.scale_by(0.0));
        assert!(!zoom.scale_by(-2.0));
        assert!(!zoom.scale_by(f32::NAN));
        assert!(!zoom.scale_by(f32::INFINITY));
        assert_eq!(zoom.zoom(), 1.0);
    }

    #[test]
    fn overflowing_pinch_is_ignored() {
        let mut zoom = ZoomController::with_zoom(1e30);
        assert!(zoom.scale_by(1e8));
        let top = zoom.zoom();

        assert!(!zoom.scale_by(1e30));
        assert!(!zoom.scale_by(1e30));
        assert_eq!(zoom.zoom(), top);

        assert!(zoom.scale_by(1e-30), "pinching back in still changes the zoom");
        assert!((zoom.zoom() - 1e8).abs() < 1e3, "zoom is {}", zoom.zoom());
    }

    #[test]
    fn effective_dpi_scales_base() {
        let zoom = ZoomController::with_zoom(1.5);
        assert_eq!(zoom.effective_dpi(300.0), 450.0);
    }

    #[test]
    fn with_zoom_enforces_floor() {
        assert_eq!(ZoomController::with_zoom(0.05).zoom(), MIN_ZOOM);
        assert_eq!(ZoomController::with_zoom(f32::NAN).zoom(), 1.0);
    }
}
