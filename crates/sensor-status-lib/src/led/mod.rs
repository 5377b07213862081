//! LED control — color palette, parameter addressing, device writes.

mod color;
mod ops;

pub use color::{LedColor, interesting_colors, parse_color};
pub use ops::{
    DISPLAY_PARAMETER, LED_COUNT, led_parameter, set_device, set_display, set_led_color,
    valid_led,
};
