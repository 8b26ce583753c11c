use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::io;

use crate::sys::command::CommandError;
use crate::sys::window::{Pid, WindowId, WindowSystem};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    FindProcesses(String),
    SearchWindows { pid: Option<Pid>, name: Option<String> },
    Move(WindowId, i32, i32),
    Resize(WindowId, u32, u32),
    SetDesktop(WindowId, u32),
    DesktopCount,
    SetDesktopCount(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Move,
    Resize,
    SetDesktop,
    DesktopCount,
    SetDesktopCount,
}

struct FakeWindow {
    id: WindowId,
    pid: Pid,
    title: String,
}

/// An in-memory window system that records every call made against it.
pub struct FakeSystem {
    processes: HashMap<String, Vec<Pid>>,
    windows: Vec<FakeWindow>,
    desktops: Cell<u32>,
    failing: Vec<Op>,
    calls: RefCell<Vec<Call>>,
}

impl FakeSystem {
    pub fn new() -> Self {
        FakeSystem {
            processes: HashMap::new(),
            windows: Vec::new(),
            desktops: Cell::new(1),
            failing: Vec::new(),
            calls: RefCell::default(),
        }
    }

    pub fn with_process(mut self, pattern: &str, pids: &[Pid]) -> Self {
        self.processes.insert(pattern.to_string(), pids.to_vec());
        self
    }

    /// Windows are enumerated in the order they are added.
    pub fn with_window(mut self, id: u64, pid: Pid, title: &str) -> Self {
        self.windows.push(FakeWindow {
            id: WindowId::new(id),
            pid,
            title: title.to_string(),
        });
        self
    }

    pub fn with_desktops(self, count: u32) -> Self {
        self.desktops.set(count);
        self
    }

    pub fn failing(mut self, op: Op) -> Self {
        self.failing.push(op);
        self
    }

    pub fn desktops(&self) -> u32 { self.desktops.get() }

    pub fn calls(&self) -> Vec<Call> { self.calls.borrow().clone() }

    fn record(&self, call: Call, op: Option<Op>) -> Result<(), CommandError> {
        self.calls.borrow_mut().push(call);
        match op {
            Some(op) if self.failing.contains(&op) => Err(CommandError::Spawn {
                program: format!("{op:?}"),
                source: io::Error::other("injected failure"),
            }),
            _ => Ok(()),
        }
    }
}

impl WindowSystem for FakeSystem {
    fn find_processes(&self, pattern: &str) -> Result<Vec<Pid>, CommandError> {
        self.record(Call::FindProcesses(pattern.to_string()), None)?;
        Ok(self.processes.get(pattern).cloned().unwrap_or_default())
    }

    fn search_windows(
        &self,
        pid: Option<Pid>,
        name: Option<&str>,
    ) -> Result<Vec<WindowId>, CommandError> {
        self.record(
            Call::SearchWindows {
                pid,
                name: name.map(str::to_string),
            },
            None,
        )?;
        Ok(self
            .windows
            .iter()
            .filter(|w| pid.is_none_or(|pid| w.pid == pid))
            .filter(|w| name.is_none_or(|name| w.title.contains(name)))
            .map(|w| w.id)
            .collect())
    }

    fn move_window(&self, id: WindowId, x: i32, y: i32) -> Result<(), CommandError> {
        self.record(Call::Move(id, x, y), Some(Op::Move))
    }

    fn resize_window(&self, id: WindowId, width: u32, height: u32) -> Result<(), CommandError> {
        self.record(Call::Resize(id, width, height), Some(Op::Resize))
    }

    fn set_window_desktop(&self, id: WindowId, desktop: u32) -> Result<(), CommandError> {
        self.record(Call::SetDesktop(id, desktop), Some(Op::SetDesktop))
    }

    fn desktop_count(&self) -> Result<u32, CommandError> {
        self.record(Call::DesktopCount, Some(Op::DesktopCount))?;
        Ok(self.desktops.get())
    }

    fn set_desktop_count(&self, count: u32) -> Result<(), CommandError> {
        self.record(Call::SetDesktopCount(count), Some(Op::SetDesktopCount))?;
        self.desktops.set(count);
        Ok(())
    }
}
