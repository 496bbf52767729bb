pub mod app;
pub mod ui;

use std::{error::Error, io, time::Duration};

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use crate::engine::Tracker;
use app::{App, InputMode};
use ui::ui;

pub fn run_tui(tracker: Tracker) -> Result<(), Box<dyn Error>> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app state
    let mut app = App::new(tracker);

    // Run loop
    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{:?}", err)
    }

    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    // Redraw at least once a second so running timers tick, and poll the
    // persistence gateway on the same cadence.
    let tick_rate = Duration::from_secs(1);

    loop {
        terminal.draw(|f| ui(f, app))?;

        if !event::poll(tick_rate)? {
            app.on_tick();
            continue;
        }

        if let Event::Key(key) = event::read()? {
            app.status_message = None;

            match app.input_mode {
                InputMode::Normal => match key.code {
                    KeyCode::Char('q') => return Ok(()),
                    KeyCode::Down | KeyCode::Char('j') => app.next(),
                    KeyCode::Up | KeyCode::Char('k') => app.previous(),
                    KeyCode::Tab | KeyCode::Char('v') => app.toggle_view(),
                    KeyCode::Char('s') | KeyCode::Char(' ') => app.toggle_timer(),
                    KeyCode::Enter => app.toggle_activation(),
                    KeyCode::Char('a') => app.start_add(),
                    KeyCode::Char('d') | KeyCode::Delete => app.request_delete(),
                    KeyCode::Char('g') => app.open_stats(),
                    KeyCode::Char('e') => app.export(),
                    _ => {}
                },
                InputMode::Adding => match key.code {
                    KeyCode::Enter => app.handle_add_input(),
                    KeyCode::Esc => {
                        app.input_mode = InputMode::Normal;
                        app.input_buffer.clear();
                    }
                    KeyCode::Char(c) => {
                        app.input_buffer.push(c);
                    }
                    KeyCode::Backspace => {
                        app.input_buffer.pop();
                    }
                    _ => {}
                },
                InputMode::ConfirmStart => match key.code {
                    KeyCode::Char('y') | KeyCode::Char('Y') => app.confirm_pending_start(true),
                    KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                        app.confirm_pending_start(false)
                    }
                    _ => {}
                },
                InputMode::ConfirmDelete => match key.code {
                    KeyCode::Char('y') | KeyCode::Char('Y') => app.confirm_pending_delete(true),
                    KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                        app.confirm_pending_delete(false)
                    }
                    _ => {}
                },
                InputMode::Stats => match key.code {
                    KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('g') | KeyCode::Enter => {
                        app.close_modal()
                    }
                    _ => {}
                },
            }
        }
    }
}
