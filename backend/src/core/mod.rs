//! Core primitives shared by every component: fixed-point arithmetic and time.

pub mod fixed;
pub mod time;
