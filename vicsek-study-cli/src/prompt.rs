//! Terminal-backed operator prompt.
//!
//! Implements the core crate's `LinePrompt` over a `linefeed` interface,
//! so the interactive cutoff protocol gets line editing and history for
//! free. Interrupt and end-of-file both map to a closed channel, which
//! the workflow treats as an abort.

use linefeed::{DefaultTerminal, Interface, ReadResult, Signal};

use study::cutoff::LinePrompt;
use study::Result;

pub struct TerminalPrompt {
    interface: Interface<DefaultTerminal>,
}

impl TerminalPrompt {
    pub fn new() -> std::io::Result<Self> {
        let interface = Interface::new("vicsek-study")?;
        interface.set_report_signal(Signal::Interrupt, true);
        interface.set_report_signal(Signal::Break, true);
        interface.set_report_signal(Signal::Quit, true);
        Ok(TerminalPrompt { interface })
    }
}

impl LinePrompt for TerminalPrompt {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        self.interface.set_prompt(prompt)?;
        match self.interface.read_line()? {
            ReadResult::Input(line) => {
                if !line.trim().is_empty() {
                    self.interface.add_history_unique(line.clone());
                }
                Ok(Some(line))
            }
            ReadResult::Signal(_) | ReadResult::Eof => {
                self.interface.cancel_read_line()?;
                Ok(None)
            }
        }
    }

    fn say(&mut self, message: &str) {
        println!("{}", message);
    }
}
