//! Console reporter.
//!
//! Writes one line per event to stderr. Download progress redraws a single
//! line in place when stderr is a terminal and is skipped otherwise.

use std::io::{IsTerminal, Write, stderr};
use std::sync::Mutex;

use crossterm::{
    QueueableCommand,
    cursor::MoveToColumn,
    style::{Color, Stylize},
    terminal::{Clear, ClearType},
};

use super::theme::{Theme, format_progress_bar, format_size};
use tapbin_core::Reporter;
use tapbin_schema::{PackageName, Sha256Digest, Version};

/// [`Reporter`] that prints styled status lines.
#[derive(Debug)]
pub struct ConsoleReporter {
    quiet: bool,
    interactive: bool,
    theme: Theme,
    /// Last whole percentage drawn, so redraws happen at most 100 times.
    last_pct: Mutex<Option<u64>>,
}

impl ConsoleReporter {
    /// Create a reporter; `quiet` hides everything except warnings and failures.
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            interactive: stderr().is_terminal(),
            theme: Theme::default(),
            last_pct: Mutex::new(None),
        }
    }

    /// Print a success line.
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            self.line(self.theme.icons.success, self.theme.colors.success, msg);
        }
    }

    fn line(&self, icon: &str, color: Color, msg: &str) {
        self.end_progress();
        eprintln!("{} {msg}", icon.with(color));
    }

    fn end_progress(&self) {
        let mut last = self.last_pct.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if last.take().is_some() && self.interactive {
            eprintln!();
        }
    }

    fn draw_progress(&self, name: &PackageName, version: &Version, current: u64, total: u64) {
        let pct = if total > 0 {
            (current * 100 / total).min(100)
        } else {
            0
        };
        let mut last = self.last_pct.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if *last == Some(pct) {
            return;
        }
        *last = Some(pct);

        let colors = &self.theme.colors;
        let mut err = stderr();
        // Best effort.
        let _ = err.queue(MoveToColumn(0));
        let _ = err.queue(Clear(ClearType::CurrentLine));
        let _ = write!(
            err,
            "{} {} {}  {}  {pct:>3}%  {}",
            self.theme.icons.active.with(colors.secondary),
            name.as_str().with(colors.package_name),
            version.as_str().with(colors.version),
            format_progress_bar(current, total, 24),
            format_size(total).with(colors.secondary),
        );
        let _ = err.flush();
    }
}

impl Reporter for ConsoleReporter {
    fn section(&self, title: &str) {
        if self.quiet {
            return;
        }
        self.end_progress();
        eprintln!("{}", title.with(self.theme.colors.header).bold());
    }

    fn downloading(&self, name: &PackageName, version: &Version, current: u64, total: Option<u64>) {
        if self.quiet || !self.interactive {
            return;
        }
        if let Some(total) = total {
            self.draw_progress(name, version, current, total);
        }
    }

    fn verified(&self, name: &PackageName, version: &Version, digest: &Sha256Digest) {
        if self.quiet {
            return;
        }
        let colors = &self.theme.colors;
        self.line(
            self.theme.icons.success,
            colors.success,
            &format!(
                "{} {} sha256 {}",
                name.as_str().with(colors.package_name),
                version.as_str().with(colors.version),
                digest.short().with(colors.secondary)
            ),
        );
    }

    fn installing(&self, name: &PackageName, version: &Version) {
        if self.quiet {
            return;
        }
        let colors = &self.theme.colors;
        self.line(
            self.theme.icons.active,
            colors.secondary,
            &format!(
                "installing {} {}",
                name.as_str().with(colors.package_name),
                version.as_str().with(colors.version)
            ),
        );
    }

    fn done(&self, name: &PackageName, version: &Version, detail: &str, size: Option<u64>) {
        if self.quiet {
            return;
        }
        let colors = &self.theme.colors;
        let size = size.map(format_size).unwrap_or_default();
        self.line(
            self.theme.icons.success,
            colors.success,
            &format!(
                "{} {} {detail} {}",
                name.as_str().with(colors.package_name),
                version.as_str().with(colors.version),
                size.with(colors.secondary)
            ),
        );
    }

    fn failed(&self, name: &PackageName, version: &Version, reason: &str) {
        let colors = &self.theme.colors;
        self.line(
            self.theme.icons.error,
            colors.error,
            &format!(
                "{} {} {reason}",
                name.as_str().with(colors.package_name),
                version.as_str().with(colors.version)
            ),
        );
    }

    fn info(&self, msg: &str) {
        if !self.quiet {
            self.line(self.theme.icons.info, self.theme.colors.secondary, msg);
        }
    }

    fn warning(&self, msg: &str) {
        self.line(self.theme.icons.warning, self.theme.colors.warning, msg);
    }
}
