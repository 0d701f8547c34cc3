#![forbid(unsafe_code)]

pub mod countdown;
pub mod error;
pub mod model;
pub mod scoring;
pub mod time;

pub use time::Clock;
