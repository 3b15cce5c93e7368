pub mod clock;
pub mod duration;

pub use clock::{Clock, SystemClock};
pub use duration::{format_duration_long, parse_duration};
