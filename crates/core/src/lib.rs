#![forbid(unsafe_code)]

pub mod derivation;
pub mod grading;
pub mod model;
pub mod scenario;
pub mod time;

pub use time::Clock;
