//! TUI effects boundary: event loop, terminal lifecycle, producer threads.
//!
//! Everything that touches the real terminal lives here. States and the
//! compositor stay pure; this module decodes bytes, dispatches events,
//! applies transitions and flushes frames.
//!
//! Architecture: producer threads feed a single mpsc channel.
//! - Input reader thread: forwards raw stdin chunks
//! - Resize watcher thread (unix): forwards SIGWINCH as the new size
//! The loop waits on the channel until the next tick deadline; a timeout
//! becomes a tick, which redraws animations (marquees, toasts). Targets
//! without SIGWINCH poll the terminal size on each tick instead.

use std::io::{self, Read, Write};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use crossterm::cursor::{MoveTo, SetCursorStyle};
use crossterm::execute;
use crossterm::terminal::{
    self, EnterAlternateScreen, LeaveAlternateScreen, SetTitle, disable_raw_mode, enable_raw_mode,
};
use tracing::{debug, error, info, warn};

use crate::error::{AppError, StateError};
use crate::provider::ProviderRegistry;
use crate::settings::SettingsStore;
use crate::source::SourceCatalog;
use crate::types::AppConfig;

use super::compositor::{Compositor, TermSize};
use super::key::KeyDecoder;
use super::screens::{MainMenu, SourceScreen};
use super::state::{AppContext, Payload, StateId, StateMachine, Transition};
use super::toast::Toast;

const WINDOW_TITLE: &str = "PRM";
const BELL: &[u8] = b"\x07";
const READ_CHUNK: usize = 4096;

// ============================================================================
// EVENTS
// ============================================================================

/// Everything the loop reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopEvent {
    /// A chunk of raw bytes read from the terminal.
    Input(Vec<u8>),
    /// The terminal now has this many columns and rows.
    Resize(u16, u16),
    /// The tick deadline passed with nothing else to do.
    Tick,
    /// No more input will arrive.
    Closed,
}

/// Reads the current terminal size as `(cols, rows)`.
pub type SizeProbe = fn() -> io::Result<(u16, u16)>;

/// Where the loop pulls its next event from.
pub trait EventSource {
    fn next_event(&mut self) -> LoopEvent;
}

/// Channel fed by the producer threads, with ticks on a fixed interval.
///
/// A tick is produced once the deadline has passed even if input keeps
/// arriving, so a busy terminal cannot starve animations.
pub struct ChannelSource {
    rx: mpsc::Receiver<LoopEvent>,
    interval: Duration,
    next_tick: Instant,
    size_probe: Option<SizeProbe>,
    last_size: (u16, u16),
}

impl ChannelSource {
    pub fn new(rx: mpsc::Receiver<LoopEvent>, interval: Duration) -> Self {
        ChannelSource {
            rx,
            interval,
            next_tick: Instant::now() + interval,
            size_probe: None,
            last_size: (0, 0),
        }
    }

    /// Check the size with `probe` on every tick, starting from `current`.
    /// A changed size is reported as a resize in place of that tick.
    pub fn with_size_probe(mut self, probe: SizeProbe, current: (u16, u16)) -> Self {
        self.size_probe = Some(probe);
        self.last_size = current;
        self
    }

    fn tick(&mut self) -> LoopEvent {
        self.next_tick = Instant::now() + self.interval;
        if let Some(probe) = self.size_probe {
            if let Ok(size) = probe() {
                if size != self.last_size {
                    self.last_size = size;
                    return LoopEvent::Resize(size.0, size.1);
                }
            }
        }
        LoopEvent::Tick
    }
}

impl EventSource for ChannelSource {
    fn next_event(&mut self) -> LoopEvent {
        let now = Instant::now();
        if now >= self.next_tick {
            return self.tick();
        }
        match self.rx.recv_timeout(self.next_tick - now) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) => self.tick(),
            Err(RecvTimeoutError::Disconnected) => LoopEvent::Closed,
        }
    }
}

// ============================================================================
// MAIN LOOP
// ============================================================================

/// Single-threaded dispatcher between the terminal and the state machine.
///
/// Each input chunk is decoded and every event is dispatched in order.
/// Transitions are applied as soon as they are returned, so the next event
/// of the same chunk already reaches the new state. The frame is drawn and
/// flushed once per chunk, resize or tick.
pub struct MainLoop<W: Write> {
    machine: StateMachine,
    ctx: AppContext,
    decoder: KeyDecoder,
    frame: Compositor,
    out: W,
    running: bool,
}

impl<W: Write> MainLoop<W> {
    pub fn new(machine: StateMachine, ctx: AppContext, size: TermSize, out: W) -> Self {
        MainLoop {
            machine,
            ctx,
            decoder: KeyDecoder::new(),
            frame: Compositor::new(size, Instant::now()),
            out,
            running: true,
        }
    }

    pub fn machine(&self) -> &StateMachine {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut StateMachine {
        &mut self.machine
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    pub fn frame(&self) -> &Compositor {
        &self.frame
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Ask the loop to stop. Observed before the next event is pulled.
    pub fn close(&mut self) {
        self.running = false;
    }

    /// Initialize every state and enter the first one.
    ///
    /// The last opened source is reopened when it still exists; otherwise
    /// the main menu is entered.
    pub fn start(&mut self) -> Result<(), AppError> {
        self.machine.init_all(&mut self.ctx);
        if !self.restore_last_source()? {
            self.machine.switch_to(&mut self.ctx, StateId::MainMenu, None, None)?;
        }
        Ok(())
    }

    fn restore_last_source(&mut self) -> Result<bool, AppError> {
        let Some(id) = self.ctx.settings.last_source_id().map(str::to_string) else {
            return Ok(false);
        };
        if !self.ctx.catalog.exists(&id) {
            info!(source = %id, "last source is gone");
            self.ctx.settings.forget_source();
            return Ok(false);
        }
        let source = match self.ctx.catalog.open_by_id(&id) {
            Ok(source) => source,
            Err(e) => {
                warn!(source = %id, error = %e, "could not reopen last source");
                return Ok(false);
            }
        };
        self.machine
            .switch_to(&mut self.ctx, StateId::Source, Some(Payload::OpenSource(source)), None)?;
        Ok(true)
    }

    /// Pull events until the loop is closed, then exit the active state.
    pub fn run<S: EventSource>(&mut self, events: &mut S) -> Result<(), AppError> {
        while self.running {
            let event = events.next_event();
            self.handle_event(event)?;
        }
        self.machine.exit_active(&mut self.ctx)?;
        debug!("main loop finished");
        Ok(())
    }

    pub fn handle_event(&mut self, event: LoopEvent) -> Result<(), AppError> {
        match event {
            LoopEvent::Input(bytes) => self.handle_input(&bytes),
            LoopEvent::Resize(cols, rows) => {
                debug!(cols, rows, "resize");
                self.frame.set_size(TermSize::new(cols, rows));
                self.render()
            }
            LoopEvent::Tick => {
                if !self.machine.is_active() {
                    self.close();
                    return Ok(());
                }
                self.render()
            }
            LoopEvent::Closed => {
                info!("input closed");
                self.close();
                Ok(())
            }
        }
    }

    /// Decode one chunk, dispatch its events in order, then draw once.
    pub fn handle_input(&mut self, bytes: &[u8]) -> Result<(), AppError> {
        let events = self.decoder.decode(bytes);
        for event in &events {
            match self.machine.dispatch(&mut self.ctx, event) {
                Ok(transition) => self.apply(transition)?,
                Err(e) => self.report(e)?,
            }
        }
        self.render()
    }

    fn apply(&mut self, transition: Transition) -> Result<(), AppError> {
        match transition {
            Transition::Stay => {}
            Transition::Switch { target, enter, exit } => {
                self.machine.switch_to(&mut self.ctx, target, enter, exit)?;
            }
            Transition::Quit => self.close(),
        }
        Ok(())
    }

    /// A failed `input()` is not fatal: log it, toast it and ring the bell.
    fn report(&mut self, e: StateError) -> io::Result<()> {
        warn!(error = %e, "input handler failed");
        if !self.machine.push_toast(Toast::error(e.to_string(), Instant::now())) {
            debug!("active state has no toast queue");
        }
        self.out.write_all(BELL)?;
        self.out.flush()
    }

    /// Reset the frame, let the active state draw, and flush it.
    pub fn render(&mut self) -> Result<(), AppError> {
        self.frame.set_now(Instant::now());
        self.frame.reset();
        self.machine.render(&self.ctx, &mut self.frame);
        self.frame.flush(&mut self.out)?;
        Ok(())
    }
}

// ============================================================================
// TERMINAL LIFECYCLE
// ============================================================================

/// Raw mode and the alternate screen for as long as the guard lives.
pub struct TerminalGuard {
    _private: (),
}

impl TerminalGuard {
    pub fn acquire() -> io::Result<Self> {
        enable_raw_mode()?;
        let guard = TerminalGuard { _private: () };
        execute!(
            io::stdout(),
            EnterAlternateScreen,
            MoveTo(0, 0),
            SetCursorStyle::SteadyBlock,
            SetTitle(WINDOW_TITLE)
        )?;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if let Err(e) = restore_terminal() {
            warn!(error = %e, "could not restore terminal");
        }
    }
}

/// Restore the terminal to normal mode. Tries every step even if one fails.
fn restore_terminal() -> io::Result<()> {
    let screen = execute!(io::stdout(), SetCursorStyle::BlinkingBlock, LeaveAlternateScreen);
    let raw = disable_raw_mode();
    screen.and(raw)
}

/// Install a panic hook that restores the terminal before printing the panic.
fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = restore_terminal();
        error!(panic = %panic_info, "panicked");
        original_hook(panic_info);
    }));
}

// ============================================================================
// PRODUCER THREADS
// ============================================================================

/// Spawn a thread that forwards raw stdin chunks to the channel.
fn spawn_input_reader(tx: mpsc::Sender<LoopEvent>) {
    thread::spawn(move || {
        let mut stdin = io::stdin().lock();
        let mut buf = [0u8; READ_CHUNK];
        loop {
            match stdin.read(&mut buf) {
                Ok(0) => {
                    let _ = tx.send(LoopEvent::Closed);
                    break;
                }
                Ok(n) => {
                    if tx.send(LoopEvent::Input(buf[..n].to_vec())).is_err() {
                        break; // receiver dropped, loop is shutting down
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    warn!(error = %e, "stdin read failed");
                    let _ = tx.send(LoopEvent::Closed);
                    break;
                }
            }
        }
    });
}

/// Spawn a thread that turns SIGWINCH into resize events.
#[cfg(unix)]
fn spawn_resize_watcher(tx: mpsc::Sender<LoopEvent>) -> io::Result<()> {
    use signal_hook::consts::signal::SIGWINCH;
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGWINCH])?;
    thread::spawn(move || {
        for _ in signals.forever() {
            let Ok((cols, rows)) = terminal::size() else {
                continue;
            };
            if tx.send(LoopEvent::Resize(cols, rows)).is_err() {
                break;
            }
        }
    });
    Ok(())
}

// ============================================================================
// ENTRY POINT
// ============================================================================

/// Build the states and run the TUI until the user quits.
pub fn run(config: AppConfig) -> Result<(), AppError> {
    let settings = SettingsStore::load_or_create(&config.settings_path);
    let catalog = SourceCatalog::new(&config.data_dir, ProviderRegistry::builtin());
    let ctx = AppContext::new(settings, catalog);

    let mut machine = StateMachine::new();
    machine.register(Box::new(MainMenu::new()));
    machine.register(Box::new(SourceScreen::new()));

    let (cols, rows) = terminal::size()?;
    let mut main_loop = MainLoop::new(machine, ctx, TermSize::new(cols, rows), io::stdout());
    main_loop.start()?;

    install_panic_hook();
    let _guard = TerminalGuard::acquire()?;

    let (tx, rx) = mpsc::channel();
    spawn_input_reader(tx.clone());
    let events = ChannelSource::new(rx, config.tick_interval);

    #[cfg(unix)]
    spawn_resize_watcher(tx)?;
    #[cfg(not(unix))]
    let events = {
        drop(tx);
        events.with_size_probe(terminal::size, (cols, rows))
    };

    let mut events = events;
    let result = main_loop.run(&mut events);
    if let Err(e) = &result {
        error!(error = %e, "main loop failed");
    }
    result
}

// ============================================================================
// TESTS
// ============================================================================
