//! Line-oriented terminal front-end: a render surface that prints to stdout and a console
//! that reads commands and confirmation answers from stdin.

use std::io::{self, BufRead, Write};
use std::ops::Range;

use senko_core::controller::{Confirm, ConfirmKind};
use senko_core::history::{Sender, Turn, TurnId};
use senko_core::markup;
use senko_core::view::{RenderSurface, Status, Transcript};

fn speaker(sender: Sender) -> &'static str {
    match sender {
        Sender::User => "you",
        Sender::Assistant => "senko",
    }
}

/// Prints every change the engine reports. Turns are numbered by visible position, which
/// is what the `/edit N`-style commands take.
#[derive(Debug, Default)]
pub struct TerminalSurface {
    transcript: Transcript,
}

impl TerminalSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Id of the visible turn at 1-based position `n`.
    pub fn visible_id(&self, n: usize) -> Option<TurnId> {
        let index = n.checked_sub(1)?;
        self.transcript.rows().get(index).map(|row| row.id)
    }

    fn number_of(&self, id: TurnId) -> Option<usize> {
        self.transcript
            .rows()
            .iter()
            .position(|row| row.id == id)
            .map(|i| i + 1)
    }

    /// Prints the whole visible conversation.
    pub fn print_all(&self) {
        for (i, row) in self.transcript.rows().iter().enumerate() {
            let marker = if row.edited { " (edited)" } else { "" };
            println!(
                "[{}] {}{marker}: {}",
                i + 1,
                speaker(row.sender),
                markup::plain_text(&row.markup)
            );
        }
    }

    fn print_turn(&self, id: TurnId, note: &str) {
        let (Some(n), Some(row)) = (self.number_of(id), self.transcript.row(id)) else {
            return;
        };
        println!(
            "[{n}] {}{note}: {}",
            speaker(row.sender),
            markup::plain_text(&row.markup)
        );
    }
}

impl RenderSurface for TerminalSurface {
    fn on_appended(&mut self, turn: &Turn) {
        self.transcript.on_appended(turn);
        if !turn.is_hidden() {
            self.print_turn(turn.id(), "");
        }
    }

    fn on_removed(&mut self, positions: Range<usize>, turns: &[Turn]) {
        let visible = turns.iter().filter(|turn| !turn.is_hidden()).count();
        self.transcript.on_removed(positions, turns);
        match visible {
            0 => {}
            1 => println!("(removed 1 message)"),
            n => println!("(removed {n} messages)"),
        }
    }

    fn on_replaced(&mut self, turn: &Turn) {
        self.transcript.on_replaced(turn);
        self.print_turn(turn.id(), " (edited)");
    }

    fn on_status(&mut self, status: Status) {
        self.transcript.on_status(status);
        if status.is_error() || status == Status::RateLimited {
            eprintln!("status: {status}");
        }
    }

    fn on_generating(&mut self, generating: bool) {
        self.transcript.on_generating(generating);
    }

    fn on_code_expanded(&mut self, id: TurnId, expanded: bool) {
        self.transcript.on_code_expanded(id, expanded);
        if let Some(n) = self.number_of(id) {
            let state = if expanded { "expanded" } else { "collapsed" };
            println!("(code in [{n}] {state})");
        }
    }
}

/// Line reader over stdin shared by the command loop and confirmation prompts.
pub struct Console<R> {
    lines: io::Lines<R>,
    assume_yes: bool,
}

impl<R: BufRead> Console<R> {
    pub fn new(reader: R, assume_yes: bool) -> Self {
        Self {
            lines: reader.lines(),
            assume_yes,
        }
    }

    /// Next input line without its terminator, or `None` at end of input.
    pub fn next_line(&mut self) -> io::Result<Option<String>> {
        self.lines.next().transpose()
    }

    pub fn prompt(&mut self, text: &str) -> io::Result<Option<String>> {
        print!("{text}");
        io::stdout().flush()?;
        self.next_line()
    }
}

impl<R: BufRead> Confirm for Console<R> {
    fn confirm(&mut self, kind: ConfirmKind) -> bool {
        if self.assume_yes {
            return true;
        }
        match self.prompt(&format!("{} [y/N] ", kind.prompt())) {
            Ok(Some(answer)) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
            // closed or unreadable input never confirms
            Ok(None) | Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use senko_core::conversation::Conversation;

    use super::*;

    #[test]
    fn confirm_reads_yes_and_no() {
        let mut console = Console::new(Cursor::new("y\nno\nYES\n"), false);
        assert!(console.confirm(ConfirmKind::Delete));
        assert!(!console.confirm(ConfirmKind::Delete));
        assert!(console.confirm(ConfirmKind::Rewind));
        assert!(!console.confirm(ConfirmKind::Clear));
    }

    #[test]
    fn assume_yes_skips_input() {
        let mut console = Console::new(Cursor::new("next\n"), true);
        assert!(console.confirm(ConfirmKind::Clear));
        assert_eq!(console.next_line().unwrap().as_deref(), Some("next"));
    }

    #[test]
    fn visible_numbers_skip_hidden_turns() {
        let mut conv = Conversation::new(TerminalSurface::new());
        let first = conv.append("hi", Sender::User, false);
        conv.append("continue", Sender::User, true);
        let reply = conv.append("*waves*", Sender::Assistant, false);

        let surface = conv.surface();
        assert_eq!(surface.visible_id(1), Some(first));
        assert_eq!(surface.visible_id(2), Some(reply));
        assert_eq!(surface.visible_id(0), None);
        assert_eq!(surface.visible_id(3), None);
    }
}
