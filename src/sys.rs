//! Interfaces to the X11 command-line tools winpos drives.

pub mod command;
pub mod screen;
pub mod window;
