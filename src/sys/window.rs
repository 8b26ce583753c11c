use std::fmt;

use tracing::debug;

use super::command::{CommandError, CommandRunner};
use crate::args;

pub type Pid = u32;

/// An X11 window id as printed by `xdotool search`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(u64);

impl WindowId {
    pub fn new(id: u64) -> WindowId { WindowId(id) }

    pub fn get(&self) -> u64 { self.0 }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Everything winpos needs from the window system. Every method is a single
/// blocking call into the environment.
pub trait WindowSystem {
    /// Ids of processes whose command line matches `pattern`. Empty when
    /// nothing matches.
    fn find_processes(&self, pattern: &str) -> Result<Vec<Pid>, CommandError>;

    /// Windows matching all given filters, in enumeration order. When `pid`
    /// is given only visible windows are considered.
    fn search_windows(
        &self,
        pid: Option<Pid>,
        name: Option<&str>,
    ) -> Result<Vec<WindowId>, CommandError>;

    fn move_window(&self, id: WindowId, x: i32, y: i32) -> Result<(), CommandError>;

    fn resize_window(&self, id: WindowId, width: u32, height: u32) -> Result<(), CommandError>;

    fn set_window_desktop(&self, id: WindowId, desktop: u32) -> Result<(), CommandError>;

    fn desktop_count(&self) -> Result<u32, CommandError>;

    fn set_desktop_count(&self, count: u32) -> Result<(), CommandError>;
}

/// [`WindowSystem`] backed by `xdotool` and `pgrep`.
pub struct Xdotool<R> {
    runner: R,
}

impl<R: CommandRunner> Xdotool<R> {
    pub fn new(runner: R) -> Self { Xdotool { runner } }

    fn xdotool(&self, args: &[String]) -> Result<String, CommandError> {
        self.runner.run("xdotool", args)
    }
}

fn parse_lines<T: std::str::FromStr>(program: &str, output: &str) -> Result<Vec<T>, CommandError> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            line.parse().map_err(|_| CommandError::InvalidOutput {
                program: program.to_string(),
                output: output.to_string(),
            })
        })
        .collect()
}

fn empty_on_no_match(result: Result<String, CommandError>) -> Result<String, CommandError> {
    match result {
        Err(e) if e.is_no_match() => Ok(String::new()),
        other => other,
    }
}

impl<R: CommandRunner> WindowSystem for Xdotool<R> {
    fn find_processes(&self, pattern: &str) -> Result<Vec<Pid>, CommandError> {
        let output = empty_on_no_match(self.runner.run("pgrep", &args!["-f", pattern]))?;
        let pids = parse_lines("pgrep", &output)?;
        debug!(pattern, ?pids, "process lookup");
        Ok(pids)
    }

    fn search_windows(
        &self,
        pid: Option<Pid>,
        name: Option<&str>,
    ) -> Result<Vec<WindowId>, CommandError> {
        let mut args = args!["search"];
        if let Some(pid) = pid {
            args.extend(args!["--onlyvisible", "--pid", pid]);
        }
        if let Some(name) = name {
            args.extend(args!["--name", name]);
        }
        let output = empty_on_no_match(self.xdotool(&args))?;
        let windows = parse_lines::<u64>("xdotool", &output)?
            .into_iter()
            .map(WindowId::new)
            .collect::<Vec<_>>();
        debug!(?pid, ?name, ?windows, "window search");
        Ok(windows)
    }

    fn move_window(&self, id: WindowId, x: i32, y: i32) -> Result<(), CommandError> {
        self.xdotool(&args!["windowmove", id, x, y]).map(drop)
    }

    fn resize_window(&self, id: WindowId, width: u32, height: u32) -> Result<(), CommandError> {
        self.xdotool(&args!["windowsize", id, width, height]).map(drop)
    }

    fn set_window_desktop(&self, id: WindowId, desktop: u32) -> Result<(), CommandError> {
        self.xdotool(&args!["set_desktop_for_window", id, desktop]).map(drop)
    }

    fn desktop_count(&self) -> Result<u32, CommandError> {
        let output = self.xdotool(&args!["get_num_desktops"])?;
        output.trim().parse::<u32>().map_err(|_| CommandError::InvalidOutput {
            program: "xdotool".to_string(),
            output,
        })
    }

    fn set_desktop_count(&self, count: u32) -> Result<(), CommandError> {
        self.xdotool(&args!["set_num_desktops", count]).map(drop)
    }
}
