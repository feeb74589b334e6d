pub mod format;
pub mod progress;

pub use format::{format_amount, format_date};
pub use progress::create_progress_bar;
