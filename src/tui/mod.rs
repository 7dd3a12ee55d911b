//! Terminal front end for the wizard
//!
//! Owns the terminal and the event loop. The wizard is only touched from this
//! loop; commands are spawned on tokio and their messages come back through
//! an unbounded channel.

pub mod input;
pub mod progress_modal;
pub mod render;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use log::{debug, info};
use ratatui::{
    Terminal,
    backend::{Backend, CrosstermBackend},
};
use std::io;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use crate::wizard::{Command, Msg, Wizard};
use input::InputState;
use progress_modal::ProgressModal;

const FRAME: Duration = Duration::from_millis(50);
const SPINNER_TICK: Duration = Duration::from_millis(100);

pub async fn run(wizard: Wizard) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, wizard).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn run_loop<B: Backend>(terminal: &mut Terminal<B>, mut wizard: Wizard) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Msg>();
    let mut mappings = wizard.store().subscribe();
    let mut input = InputState::default();
    let mut modal = ProgressModal::new();
    let mut last_tick = Instant::now();

    let init = wizard.init();
    dispatch(init, &tx);

    loop {
        let view = wizard.view();
        terminal.draw(|f| render::render(f, &view, &input, &modal))?;

        let mut pending = Vec::new();
        if event::poll(FRAME)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    pending.extend(input.handle_key(key, &view));
                }
            }
        }
        while let Ok(msg) = rx.try_recv() {
            pending.push(msg);
        }

        for msg in pending {
            if dispatch(wizard.update(msg), &tx) {
                info!("Wizard closed");
                return Ok(());
            }
        }

        if mappings.has_changed().unwrap_or(false) {
            let count = mappings.borrow_and_update().len();
            debug!("Mapping list changed ({} mappings)", count);
        }

        if last_tick.elapsed() >= SPINNER_TICK {
            modal.tick();
            last_tick = Instant::now();
        }
    }
}

/// Spawn the command's effects; returns true on quit
fn dispatch(command: Command<Msg>, tx: &mpsc::UnboundedSender<Msg>) -> bool {
    match command {
        Command::None => false,
        Command::Quit => true,
        Command::Batch(commands) => commands
            .into_iter()
            .fold(false, |quit, command| dispatch(command, tx) || quit),
        Command::Perform(future) => {
            let tx = tx.clone();
            tokio::spawn(async move {
                let msg = future.await;
                let _ = tx.send(msg);
            });
            false
        }
        Command::Stream(mut stream) => {
            let tx = tx.clone();
            tokio::spawn(async move {
                while let Some(msg) = stream.next().await {
                    if tx.send(msg).is_err() {
                        break;
                    }
                }
            });
            false
        }
    }
}
