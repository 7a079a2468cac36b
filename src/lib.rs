//! A vertical taskbar docked to the left edge of the primary screen.
//!
//! The crate is split into a platform-neutral core (window list
//! synchronization, label layout, click-to-toggle activation) and the
//! capabilities it consumes from the OS, see [`platform`].

pub mod config;
pub mod constants;
pub mod controller;
pub mod entry;
pub mod error;
pub mod event_loop;
pub mod platform;
pub mod text_layout;
pub mod tracing_sub;
pub mod window_list;
