//! Applies the configured window rules to the live screens and windows.
//!
//! A run validates every rule up front, grows the number of virtual desktops
//! so that every configured desktop exists, and then places each window in
//! configuration order. Problems with a single rule are logged and the rule
//! is skipped; nothing here aborts the run.

mod error;
#[cfg(test)]
pub(crate) mod testing;

use strum::Display;
use tracing::{error, info, info_span, warn};

use crate::common::config::{RawRule, WindowRule};
use crate::layout_engine::ResolvedGeometry;
use crate::sys::screen::Screen;
use crate::sys::window::{WindowId, WindowSystem};

pub use error::{ResolveError, RuleError};

/// The three independent calls that place a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Step {
    Move,
    Resize,
    Desktop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub window: WindowId,
    pub geometry: ResolvedGeometry,
    pub desktop: u32,
    /// Steps whose external call failed. The others were still applied.
    pub failed_steps: Vec<Step>,
}

#[derive(Debug)]
pub enum Outcome {
    Arranged(Placement),
    Skipped(RuleError),
}

#[derive(Debug)]
pub struct RuleOutcome {
    pub name: String,
    pub outcome: Outcome,
}

#[derive(Debug, Default)]
pub struct ArrangeReport {
    pub rules: Vec<RuleOutcome>,
}

impl ArrangeReport {
    pub fn arranged(&self) -> usize {
        self.rules.iter().filter(|r| matches!(r.outcome, Outcome::Arranged(_))).count()
    }

    pub fn skipped(&self) -> usize { self.rules.len() - self.arranged() }
}

pub struct Arranger<'a, W> {
    system: &'a W,
    screens: &'a [Screen],
}

impl<'a, W: WindowSystem> Arranger<'a, W> {
    /// `screens` must already be ordered left to right.
    pub fn new(system: &'a W, screens: &'a [Screen]) -> Self { Arranger { system, screens } }

    pub fn run(&self, rules: &[RawRule]) -> ArrangeReport {
        let validated: Vec<_> = rules
            .iter()
            .map(|raw| {
                let _span = info_span!("rule", name = raw.name()).entered();
                raw.validate()
            })
            .collect();

        let max_desktop = validated.iter().flatten().map(|rule| rule.desktop).max();
        if let Some(max_desktop) = max_desktop {
            self.ensure_desktops(max_desktop.saturating_add(1));
        }

        let mut report = ArrangeReport::default();
        for (raw, rule) in rules.iter().zip(validated) {
            let _span = info_span!("rule", name = raw.name()).entered();
            let outcome = match rule.map_err(RuleError::from).and_then(|r| self.arrange_window(&r)) {
                Ok(placement) if !placement.failed_steps.is_empty() => {
                    let failed: Vec<String> =
                        placement.failed_steps.iter().map(Step::to_string).collect();
                    warn!(failed = %failed.join(","), "window only partially arranged");
                    Outcome::Arranged(placement)
                }
                Ok(placement) => Outcome::Arranged(placement),
                Err(e) => {
                    error!("{e}");
                    Outcome::Skipped(e)
                }
            };
            report.rules.push(RuleOutcome {
                name: raw.name().to_string(),
                outcome,
            });
        }

        info!(
            arranged = report.arranged(),
            skipped = report.skipped(),
            "arrangement finished"
        );
        report
    }

    /// Makes sure at least `count` virtual desktops exist. Never removes
    /// desktops, and leaves the count alone if it cannot be read.
    pub fn ensure_desktops(&self, count: u32) {
        match self.system.desktop_count() {
            Ok(current) if current >= count => {
                info!(current, "there are already {count} or more desktops");
            }
            Ok(current) => {
                info!(current, count, "adding virtual desktops");
                if let Err(e) = self.system.set_desktop_count(count) {
                    error!("failed to set the number of desktops: {e}");
                }
            }
            Err(e) => error!("failed to read the number of desktops: {e}"),
        }
    }

    /// Finds the window a rule refers to. When several windows match, the
    /// last one enumerated wins.
    pub fn resolve_window(&self, rule: &WindowRule) -> Result<WindowId, ResolveError> {
        let pid = match &rule.search_process {
            Some(pattern) => {
                let pids = self.system.find_processes(pattern)?;
                if pids.len() > 1 {
                    return Err(ResolveError::AmbiguousProcess {
                        pattern: pattern.clone(),
                        pids,
                    });
                }
                let Some(&pid) = pids.first() else {
                    return Err(ResolveError::NoProcess(pattern.clone()));
                };
                Some(pid)
            }
            None => None,
        };

        let windows = self.system.search_windows(pid, rule.search_name.as_deref())?;
        windows.last().copied().ok_or(ResolveError::NoWindow)
    }

    pub fn arrange_window(&self, rule: &WindowRule) -> Result<Placement, RuleError> {
        let Some(screen) = self.screens.get(rule.screen) else {
            return Err(RuleError::ScreenOutOfRange {
                screen: rule.screen,
                available: self.screens.len(),
            });
        };

        let window = self.resolve_window(rule)?;
        let geometry = ResolvedGeometry::resolve(rule.width, rule.height, &rule.align, screen);
        let mut failed_steps = Vec::new();

        info!(%window, screen = %screen.name, x = geometry.x, y = geometry.y, "moving window");
        if let Err(e) = self.system.move_window(window, geometry.x, geometry.y) {
            error!(%window, "failed to move window: {e}");
            failed_steps.push(Step::Move);
        }

        info!(%window, width = geometry.width, height = geometry.height, "resizing window");
        if let Err(e) = self.system.resize_window(window, geometry.width, geometry.height) {
            error!(%window, "failed to resize window: {e}");
            failed_steps.push(Step::Resize);
        }

        info!(%window, desktop = rule.desktop, "moving window to desktop");
        if let Err(e) = self.system.set_window_desktop(window, rule.desktop) {
            error!(%window, "failed to move window to desktop: {e}");
            failed_steps.push(Step::Desktop);
        }

        Ok(Placement {
            window,
            geometry,
            desktop: rule.desktop,
            failed_steps,
        })
    }
}
