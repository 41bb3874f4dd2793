/// Network input size `(width, height)` used when a configuration omits one.
pub const DEFAULT_INPUT_SIZE: (u32, u32) = (640, 640);

/// Pixels kept free on the limiting axis by `DetLongMaxRescale`.
/// Magic value, must match the preprocessing the model was exported with.
pub const LONG_MAX_MARGIN: u32 = 4;
