pub mod app;
pub mod runtime;
pub mod ui;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use taskchain_core::{
    devnet, AppConfig, ContractDescriptor, SessionManager, ToastBoard, WalletProvider,
};
use tracing::info;

use crate::tui::app::{App, InputMode};
use crate::tui::runtime::RuntimeBridge;

pub fn run(config: &AppConfig, descriptor: ContractDescriptor) -> Result<()> {
    let wallet = devnet::launch(config)?;
    let provider = config
        .wallet
        .installed
        .then(|| wallet.clone() as Arc<dyn WalletProvider>);
    if provider.is_none() {
        info!("running without a wallet provider");
    }

    let toasts = Arc::new(ToastBoard::new());
    let session = SessionManager::new(provider, descriptor, toasts.clone());
    let mut app = App::new(session.clone(), toasts, Some(wallet), config.network.name.clone());
    let runtime = RuntimeBridge::spawn(session, app.connect_flag())?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app, &runtime);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    runtime.shutdown();

    if let Err(err) = res {
        println!("{:?}", err);
    }

    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runtime: &RuntimeBridge,
) -> Result<()> {
    loop {
        app.sync();
        terminal
            .draw(|f| ui::draw(f, app))
            .map_err(|e| io::Error::other(e.to_string()))?;

        for command in app.take_commands() {
            runtime.send(command)?;
        }
        if app.should_quit {
            return Ok(());
        }

        if !event::poll(Duration::from_millis(200))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match app.input_mode {
            InputMode::Normal if !app.is_connected() => match key.code {
                KeyCode::Char('q') => app.should_quit = true,
                KeyCode::Char('c') | KeyCode::Enter => app.connect(),
                _ => {}
            },
            InputMode::Normal => match key.code {
                KeyCode::Char('q') => app.should_quit = true,
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::Char(' ') => app.complete_selected(),
                KeyCode::Char('d') | KeyCode::Delete => app.delete_selected(),
                KeyCode::Char('a') => app.enter_add_mode(),
                KeyCode::Char('e') => app.enter_edit_mode(),
                KeyCode::Char('s') => app.switch_account(),
                KeyCode::Char('x') => app.revoke_accounts(),
                _ => {}
            },
            InputMode::Adding(_) | InputMode::Editing { .. } => match key.code {
                KeyCode::Enter => app.submit(),
                KeyCode::Esc => app.exit_input_mode(),
                KeyCode::Tab | KeyCode::BackTab => app.toggle_field(),
                KeyCode::Char(c) => {
                    if let Some(input) = app.active_input() {
                        input.insert(c);
                    }
                }
                KeyCode::Backspace => {
                    if let Some(input) = app.active_input() {
                        input.backspace();
                    }
                }
                KeyCode::Left => {
                    if let Some(input) = app.active_input() {
                        input.left();
                    }
                }
                KeyCode::Right => {
                    if let Some(input) = app.active_input() {
                        input.right();
                    }
                }
                _ => {}
            },
        }
    }
}
