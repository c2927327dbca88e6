//! Interactive chat: a line-based loop over stdin driving a [`ChatSession`].

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use chrono::Local;
use senko_core::backend::Backend;
use senko_core::chat::{ChatSession, Reply};
use senko_core::config::Config;
use senko_core::controller::{Outcome, Rejection};
use senko_core::export::{self, Snapshot};
use senko_core::history::TurnId;
use senko_core::keymap::{KeyChord, Keymap};
use senko_core::sheet::{SheetAction, SheetEvent};
use tracing::debug;

use crate::cli::ChatArgs;
use crate::terminal::{Console, TerminalSurface};

const HELP: &str = "\
Commands (N is the number shown next to a message):
  /edit N [text]   replace a message (asks for the text when omitted)
  /delete N        delete a message
  /rewind N        drop everything after a message and continue from it
  /code N          expand or collapse the code blocks of a message
  /menu N          open the action menu for a message
  /key CHORD       run a key binding, e.g. /key ctrl+e
  /clear           clear the conversation
  /history         show the conversation
  /stats           show message counts
  /model [NAME]    show or switch the model
  /export [FILE]   save the conversation as JSON
  /import FILE     load a saved conversation
  /help            show this help
  /quit            leave
Anything else is sent as a message; an empty line asks Senko to continue.";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command<'a> {
    Send(&'a str),
    Edit { n: usize, text: Option<&'a str> },
    Delete(usize),
    Rewind(usize),
    Code(usize),
    Menu(usize),
    Key(&'a str),
    Clear,
    History,
    Stats,
    Model(Option<&'a str>),
    Export(Option<&'a str>),
    Import(&'a str),
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Command<'_>> {
    let trimmed = line.trim();
    let Some(rest) = trimmed.strip_prefix('/') else {
        return Ok(Command::Send(trimmed));
    };

    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };
    let arg = (!args.is_empty()).then_some(args);

    let command = match name {
        "edit" => {
            let (n, text) = match args.split_once(char::is_whitespace) {
                Some((n, text)) => (n, Some(text.trim()).filter(|t| !t.is_empty())),
                None => (args, None),
            };
            Command::Edit {
                n: parse_number(n)?,
                text,
            }
        }
        "delete" => Command::Delete(parse_number(args)?),
        "rewind" => Command::Rewind(parse_number(args)?),
        "code" => Command::Code(parse_number(args)?),
        "menu" => Command::Menu(parse_number(args)?),
        "key" => Command::Key(arg.ok_or_else(|| anyhow!("usage: /key CHORD"))?),
        "clear" => Command::Clear,
        "history" => Command::History,
        "stats" => Command::Stats,
        "model" => Command::Model(arg),
        "export" => Command::Export(arg),
        "import" => Command::Import(arg.ok_or_else(|| anyhow!("usage: /import FILE"))?),
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => bail!("unknown command /{other} (try /help)"),
    };
    Ok(command)
}

fn parse_number(arg: &str) -> Result<usize> {
    arg.parse::<usize>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| anyhow!("expected a message number, got {arg:?}"))
}

enum Flow {
    Continue,
    Quit,
}

type Session = ChatSession<TerminalSurface>;

pub async fn run(config: &Config, args: &ChatArgs) -> Result<()> {
    let mut config = config.clone();
    if let Some(model) = &args.model {
        config.model.clone_from(model);
    }
    if let Some(base_url) = &args.base_url {
        config.base_url.clone_from(base_url);
    }

    let backend = Backend::from_config(&config, args.offline)?;
    let keymap = Keymap::from_config(&config.keys).context("invalid key binding in config")?;

    let mut session = ChatSession::new(TerminalSurface::new(), config);
    if let Some(path) = &args.import {
        session.import(Snapshot::read_from(path)?);
    }
    session.start();

    let stdin = io::stdin();
    let mut console = Console::new(stdin.lock(), args.yes);

    let mut repl = Repl {
        session: &mut session,
        console: &mut console,
        backend: &backend,
        keymap: &keymap,
    };
    repl.run().await
}

struct Repl<'a, R> {
    session: &'a mut Session,
    console: &'a mut Console<R>,
    backend: &'a Backend,
    keymap: &'a Keymap,
}

impl<R: BufRead> Repl<'_, R> {
    async fn run(&mut self) -> Result<()> {
        while let Some(line) = self.console.prompt("> ")? {
            let flow = match parse_command(&line) {
                Ok(command) => self.execute(command).await,
                Err(e) => Err(e),
            };
            match flow {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => break,
                Err(e) => eprintln!("error: {e:#}"),
            }
        }
        Ok(())
    }

    async fn execute(&mut self, command: Command<'_>) -> Result<Flow> {
        debug!(?command, "command");
        match command {
            Command::Send(text) => {
                let reply = self.session.send(self.backend, text).await?;
                if reply == Reply::Stale {
                    println!("(reply dropped; the conversation changed)");
                }
            }
            Command::Edit { n, text } => {
                let target = self.target(n)?;
                let outcome = self.session.begin_edit(target);
                self.after(outcome, text)?;
            }
            Command::Delete(n) => {
                let target = self.target(n)?;
                let outcome = self.session.delete(target, &mut *self.console);
                report(outcome);
            }
            Command::Rewind(n) => {
                let target = self.target(n)?;
                let outcome = self.session.rewind(target, &mut *self.console);
                report(outcome);
            }
            Command::Code(n) => {
                let target = self.target(n)?;
                report(self.session.toggle_code(target));
            }
            Command::Menu(n) => {
                let target = self.target(n)?;
                self.menu(target)?;
            }
            Command::Key(chord) => {
                let chord: KeyChord = chord.parse()?;
                let Some(intent) = self.keymap.resolve(chord) else {
                    bail!("{chord} is not bound");
                };
                let outcome = self.session.handle_intent(intent, &mut *self.console);
                self.after(outcome, None)?;
            }
            Command::Clear => {
                let outcome = self.session.clear(&mut *self.console);
                report(outcome);
            }
            Command::History => self.session.surface().print_all(),
            Command::Stats => {
                let stats = self.session.stats();
                println!(
                    "{} messages ({} visible, {} hidden, {} edited)",
                    stats.total, stats.visible, stats.hidden, stats.edited
                );
            }
            Command::Model(None) => println!("model: {}", self.session.model()),
            Command::Model(Some(name)) => {
                self.session.set_model(name);
                println!("model: {}", self.session.model());
            }
            Command::Export(path) => {
                let path = match path {
                    Some(path) => PathBuf::from(path),
                    None => PathBuf::from(export::default_file_name(Local::now().date_naive())),
                };
                self.session.export().write_to(&path)?;
                println!("Exported to {}", path.display());
            }
            Command::Import(path) => {
                let snapshot = Snapshot::read_from(Path::new(path))?;
                self.session.import(snapshot);
                println!("Imported {path}");
            }
            Command::Help => println!("{HELP}"),
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn target(&self, n: usize) -> Result<TurnId> {
        self.session
            .surface()
            .visible_id(n)
            .ok_or_else(|| anyhow!("no message [{n}]"))
    }

    /// Follows up an outcome that opened an edit: commits `text` or asks for it.
    fn after(&mut self, outcome: Outcome, text: Option<&str>) -> Result<()> {
        if outcome != Outcome::EditStarted {
            report(outcome);
            return Ok(());
        }
        match text {
            Some(text) => report(self.session.commit_edit(text)),
            None => self.edit_interactively()?,
        }
        Ok(())
    }

    fn edit_interactively(&mut self) -> Result<()> {
        let Some(editing) = self.session.controller().edit_session() else {
            return Ok(());
        };
        println!("editing: {}", editing.original());
        println!("enter the new text (/cancel to keep it)");

        loop {
            let Some(line) = self.console.prompt("edit> ")? else {
                report(self.session.cancel_edit());
                return Ok(());
            };
            if line.trim() == "/cancel" {
                report(self.session.cancel_edit());
                return Ok(());
            }
            let outcome = self.session.commit_edit(&line);
            report(outcome);
            if outcome != Outcome::Rejected(Rejection::EmptyContent) {
                return Ok(());
            }
        }
    }

    fn menu(&mut self, target: TurnId) -> Result<()> {
        let outcome = self.session.open_sheet(target);
        if outcome != Outcome::SheetOpened {
            report(outcome);
            return Ok(());
        }
        self.session.sheet_event(SheetEvent::Settled, &mut *self.console);

        while self.session.controller().sheet().is_some() {
            let Some(line) = self
                .console
                .prompt("action [edit/delete/rewind/code, enter to close]: ")?
            else {
                self.session.sheet_event(SheetEvent::Escape, &mut *self.console);
                break;
            };
            let event = match line.trim() {
                "" => SheetEvent::Cancel,
                "edit" | "e" => SheetEvent::Choose(SheetAction::Edit),
                "delete" | "d" => SheetEvent::Choose(SheetAction::Delete),
                "rewind" | "r" => SheetEvent::Choose(SheetAction::Rewind),
                "code" | "c" => SheetEvent::Choose(SheetAction::ToggleCode),
                other => {
                    eprintln!("unknown action {other:?}");
                    continue;
                }
            };
            let outcome = self.session.sheet_event(event, &mut *self.console);
            self.after(outcome, None)?;
        }
        Ok(())
    }
}

fn report(outcome: Outcome) {
    match outcome {
        Outcome::Rejected(Rejection::Declined) => println!("(cancelled)"),
        Outcome::Rejected(rejection) => eprintln!("{rejection}"),
        Outcome::Rewound { discarded } => {
            debug!(discarded, "rewound");
            println!("(continuing from here)");
        }
        _ => {}
    }
}
