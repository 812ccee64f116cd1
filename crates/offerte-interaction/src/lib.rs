//! Time-driven UI helpers for offerte editors.
//!
//! Every type here is a small state machine that takes the current time as
//! an argument instead of reading a clock or owning a timer. The UI layer
//! polls them from its own frame or tick loop.
//!
//! - [`LongPress`] - press-and-hold detection with move tolerance
//! - [`AnimatedCounter`] - ease-out animation of totals
//! - [`ConnectivityMonitor`] and [`SaveIndicator`] - the save badge

mod counter;
mod indicator;
mod long_press;

pub use counter::{AnimatedCounter, DEFAULT_DURATION_MS, ease_out_cubic};
pub use indicator::{Connectivity, ConnectivityMonitor, SaveIndicator, relative_time};
pub use long_press::{LongPress, LongPressConfig, LongPressEvent, Point};
