//! Console reporter for release runs
//!
//! Prints one progress line per event to stdout. External commands inherit
//! the same stdout, so every line is flushed before the next step starts.

use crate::{
    cli::output::format_release_event,
    execution::{ReleaseEvent, Reporter},
};
use console::style;
use std::io::{self, Write};

/// Reporter that prints events to the terminal
#[derive(Debug, Clone, Default)]
pub struct ConsoleReporter {
    /// Print a line when each step starts, with its command line
    show_commands: bool,
}

impl ConsoleReporter {
    pub fn new(show_commands: bool) -> Self {
        Self { show_commands }
    }

    /// Print a separator line
    ///
    /// A horizontal rule spanning the terminal width, used to visually
    /// separate stages.
    fn print_separator(&self) {
        // Get terminal width, default to 80 if unavailable
        let width = term_size::dimensions_stdout()
            .map(|(w, _)| w)
            .unwrap_or(80);
        println!("{}", style("─".repeat(width)).dim());
    }

    fn flush_stdout(&self) {
        let _ = io::stdout().flush();
    }
}

impl Reporter for ConsoleReporter {
    fn report(&self, event: &ReleaseEvent) {
        match event {
            ReleaseEvent::StageStarted { .. } => {
                self.print_separator();
                println!("{}", format_release_event(event));
            }
            ReleaseEvent::StepStarted { .. } if !self.show_commands => {}
            ReleaseEvent::RunCompleted { .. } | ReleaseEvent::RunFailed { .. } => {
                self.print_separator();
                println!("{}", format_release_event(event));
            }
            _ => println!("{}", format_release_event(event)),
        }
        self.flush_stdout();
    }
}
