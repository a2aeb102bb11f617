//! Progress reporting for tree loading.
//!
//! With the `progress` feature the helpers return styled `indicatif` bars;
//! without it they return an inert [`ProgressBar`] with the same methods.

use std::time::Duration;

#[cfg(feature = "progress")]
pub use indicatif::ProgressBar;

#[cfg(feature = "progress")]
use indicatif::ProgressStyle;

#[cfg(feature = "progress")]
const SPINNER_TEMPLATE: &str = "{spinner:.cyan} {msg}";
#[cfg(feature = "progress")]
const BAR_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";
#[cfg(feature = "progress")]
const BAR_CHARS: &str = "█▓▒░  ";

/// Ticking spinner for work of unknown length
pub fn spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    #[cfg(feature = "progress")]
    if let Ok(style) = ProgressStyle::default_spinner().template(SPINNER_TEMPLATE) {
        spinner.set_style(style);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

/// Bar counting `len` items
pub fn counter(len: u64, message: &'static str) -> ProgressBar {
    let bar = ProgressBar::new(len);
    #[cfg(feature = "progress")]
    if let Ok(style) = ProgressStyle::default_bar().template(BAR_TEMPLATE) {
        bar.set_style(style.progress_chars(BAR_CHARS));
    }
    bar.set_message(message);
    bar
}

#[cfg(not(feature = "progress"))]
pub use self::inert::ProgressBar;

#[cfg(not(feature = "progress"))]
mod inert {
    use std::borrow::Cow;
    use std::time::Duration;

    /// Accepts every call the tree loader makes and draws nothing
    #[derive(Debug, Clone, Default)]
    pub struct ProgressBar;

    impl ProgressBar {
        pub fn new(_len: u64) -> Self {
            ProgressBar
        }

        pub fn new_spinner() -> Self {
            ProgressBar
        }

        pub fn set_message(&self, _msg: impl Into<Cow<'static, str>>) {}
        pub fn enable_steady_tick(&self, _interval: Duration) {}
        pub fn inc(&self, _delta: u64) {}
        pub fn finish_with_message(&self, _msg: impl Into<Cow<'static, str>>) {}
    }
}
