use viewer_core::ZoomDirection;

/// User input a document session reacts to. Coordinates are display pixels
/// relative to the top-left corner of the page raster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Click { x: f32, y: f32 },
    WheelZoom { direction: ZoomDirection },
    /// Multiplicative zoom factor reported by a pinch gesture.
    PinchZoom { factor: f32 },
    /// Jump to a 1-based page number.
    PageNavigate { page: u32 },
    NextPage,
    PrevPage,
}
