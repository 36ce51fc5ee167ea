//! Contract between the window runtime and the application built on it.

mod app;

pub use app::{App, AppControl};
