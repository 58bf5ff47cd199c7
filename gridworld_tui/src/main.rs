use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use gridworld_core::{
    Item, OccupantId, Position, Rgb,
    agent::{Controller, RandomWalker, TargetSeeker},
    config::{WorldConfig, load_world_from_str},
    world::GridWorld,
};
use ratatui::{
    crossterm::{
        self,
        event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use std::{
    collections::{BTreeSet, VecDeque},
    fs::File,
    io::{self, Stdout},
    path::{Path, PathBuf},
    sync::Mutex,
    time::{Duration, Instant},
};
use tracing_subscriber::EnvFilter;

const LOG_LINES: usize = 64;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Text map file to load
    #[arg(short, long, value_name = "MAP_FILE", conflicts_with = "config")]
    map: Option<PathBuf>,

    /// TOML world config to load
    #[arg(short, long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Target cell as ROW,COL
    #[arg(short, long, value_parser = parse_position, default_value = "4,4")]
    target: Position,

    /// How occupants choose their moves
    #[arg(long, value_enum, default_value_t = ControllerKind::Seek)]
    controller: ControllerKind,

    /// Seed for the controllers
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Stop after this many ticks
    #[arg(long, default_value_t = 100)]
    max_ticks: u64,

    /// Milliseconds between ticks
    #[arg(long, default_value_t = 250)]
    tick_ms: u64,

    /// Write logs to this file (filtered by RUST_LOG)
    #[arg(long, value_name = "LOG_FILE")]
    log: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ControllerKind {
    Random,
    Seek,
}

fn parse_position(s: &str) -> Result<Position, String> {
    let (row, col) = s
        .split_once(',')
        .ok_or_else(|| format!("expected ROW,COL, got '{s}'"))?;
    let row = row.trim().parse().map_err(|e| format!("bad row: {e}"))?;
    let col = col.trim().parse().map_err(|e| format!("bad col: {e}"))?;
    Ok(Position::new(row, col))
}

struct App {
    /// The core simulation world.
    world: GridWorld,
    /// One controller per occupant, in id order.
    controllers: Vec<Box<dyn Controller>>,
    target: Position,
    /// Occupants that have stood on the target.
    arrived: BTreeSet<OccupantId>,
    /// Most recent outcome lines, newest last.
    log: VecDeque<String>,
    tick: u64,
    max_ticks: u64,
    /// Flag to control the main loop.
    should_quit: bool,
    /// Flag to control if the run is over.
    finished: bool,
}

impl App {
    fn new(args: &Args) -> Result<Self> {
        let mut world = load_world(args)?;
        let target_cell = world
            .cell_at(args.target)
            .with_context(|| format!("Target {} is not on the grid", args.target))?;
        if !target_cell.items().contains(&Item::target()) {
            world.place_item(args.target, Item::target())?;
        }

        let controllers = world
            .occupants()
            .map(|id| -> Box<dyn Controller> {
                let seed = args.seed.wrapping_add(u64::from(id));
                match args.controller {
                    ControllerKind::Random => Box::new(RandomWalker::new(id, seed)),
                    ControllerKind::Seek => Box::new(TargetSeeker::new(id, args.target, seed)),
                }
            })
            .collect();

        Ok(App::with_world(world, controllers, args.target, args.max_ticks))
    }

    fn with_world(
        world: GridWorld,
        controllers: Vec<Box<dyn Controller>>,
        target: Position,
        max_ticks: u64,
    ) -> Self {
        App {
            world,
            controllers,
            target,
            arrived: BTreeSet::new(),
            log: VecDeque::with_capacity(LOG_LINES),
            tick: 0,
            max_ticks,
            should_quit: false,
            finished: false,
        }
    }

    /// Marks `id` as arrived if it currently stands on the target.
    fn check_arrival(&mut self, id: OccupantId) -> bool {
        if self.world.position(id) != Some(self.target) {
            return false;
        }
        if self.arrived.insert(id) {
            tracing::info!(id, tick = self.tick, "occupant reached the target");
        }
        true
    }

    fn push_log(&mut self, line: String) {
        if self.log.len() == LOG_LINES {
            self.log.pop_front();
        }
        self.log.push_back(line);
    }

    /// Handles one step of the simulation.
    fn tick(&mut self) {
        if self.finished {
            return;
        }
        self.tick += 1;

        for index in 0..self.controllers.len() {
            let id = self.controllers[index].id();
            // Already there, possibly from the start or after a reset.
            if self.arrived.contains(&id) || self.check_arrival(id) {
                continue;
            }
            let view = self.world.snapshot();
            let direction = self.controllers[index].next_direction(&view);
            let outcome = self.world.step(id, direction);
            self.push_log(format!("[{}] {}", self.tick, outcome));
            self.check_arrival(id);
        }

        if self.arrived.len() == self.controllers.len() {
            self.finished = true;
            self.push_log("All occupants reached the target.".to_string());
        } else if self.tick >= self.max_ticks {
            self.finished = true;
            self.push_log(format!("Stopped after {} ticks.", self.tick));
        }
    }

    /// Puts occupants back on their start cells and starts over.
    fn restart(&mut self) {
        self.world.reset();
        self.arrived.clear();
        self.tick = 0;
        self.finished = false;
        self.push_log("Reset occupants to their start positions.".to_string());
    }

    /// Sets the quit flag.
    fn quit(&mut self) {
        self.should_quit = true;
    }
}

fn load_world(args: &Args) -> Result<GridWorld> {
    if let Some(path) = &args.map {
        let source = read_existing(path)?;
        return load_world_from_str(&source)
            .with_context(|| format!("Failed to load map {}", path.display()));
    }
    let config = match &args.config {
        Some(path) => WorldConfig::from_toml_str(&read_existing(path)?)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => WorldConfig::default(),
    };
    Ok(GridWorld::from_config(&config)?)
}

fn read_existing(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(anyhow::anyhow!("File does not exist: {}", path.display()));
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// The terminal belongs to the UI, so logs only go to a file when asked for.
fn init_logging(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("gridworld_core=info,gridworld_tui=info")),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();
    init_logging(args.log.as_deref())?;

    // Build the world before touching the terminal so errors print normally
    let mut app = App::new(&args)?;
    tracing::info!(
        rows = app.world.rows(),
        cols = app.world.cols(),
        target = %app.target,
        "starting simulation"
    );

    // Set up the terminal
    let mut terminal = setup_terminal()?;

    // Run the main application loop
    let result = run_app(&mut terminal, &mut app, Duration::from_millis(args.tick_ms));

    // Restore the terminal state
    restore_terminal(&mut terminal)?;

    result
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?; // Put terminal in raw mode
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?; // Use alternate screen and enable mouse capture
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into) // Map io::Error to anyhow::Error
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Runs the main loop of the TUI application.
fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    tick_rate: Duration,
) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        // Draw the UI
        terminal.draw(|f| ui(f, app))?;

        // Calculate timeout for event polling
        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        // Poll for events (keyboard, mouse, etc.)
        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => app.quit(),
                    KeyCode::Char('r') => app.restart(),
                    _ => {}
                }
            }
        }

        // Update application state if enough time has passed
        if last_tick.elapsed() >= tick_rate {
            app.tick(); // Perform simulation step
            last_tick = Instant::now();
        }

        // Exit loop if requested
        if app.should_quit {
            break;
        }
    }
    Ok(())
}

/// Renders the user interface.
fn ui(frame: &mut Frame, app: &App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(60), // Area for the map
            Constraint::Percentage(30), // Area for the outcome log
            Constraint::Percentage(10), // Area for status/help
        ])
        .split(frame.area());

    render_map(frame, main_layout[0], app);
    render_log(frame, main_layout[1], &app.log);

    let status = if app.finished { "finished" } else { "running" };
    let help_text = Paragraph::new(format!(
        "Tick {} ({status}). Press 'r' to reset, 'q' or 'Esc' to quit.",
        app.tick
    ))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help_text, main_layout[2]);
}

/// Renders the latest outcome lines that fit in the area.
fn render_log(frame: &mut Frame, area: Rect, log: &VecDeque<String>) {
    let visible = usize::from(area.height.saturating_sub(2));
    let items: Vec<ListItem> = log
        .iter()
        .skip(log.len().saturating_sub(visible))
        .map(|line| ListItem::new(line.as_str()))
        .collect();
    let widget = List::new(items).block(Block::default().borders(Borders::ALL).title("Outcomes"));
    frame.render_widget(widget, area);
}

fn occupant_color(id: OccupantId) -> Color {
    const PALETTE: [Color; 6] = [
        Color::Red,
        Color::Cyan,
        Color::Magenta,
        Color::Green,
        Color::Yellow,
        Color::Blue,
    ];
    PALETTE[id as usize % PALETTE.len()]
}

/// Renders the grid with the highest row on top, so north is up.
fn render_map(frame: &mut Frame, area: Rect, app: &App) {
    let cells = app.world.cells();
    let mut lines: Vec<Line> = Vec::with_capacity(cells.rows());

    for row in (0..cells.rows()).rev() {
        let spans: Vec<Span> = cells
            .row(row)
            .unwrap_or_default()
            .iter()
            .map(|cell| {
                if let Some(id) = cell.occupant() {
                    let glyph = if id < 10 {
                        id.to_string()
                    } else {
                        "@".to_string()
                    };
                    Span::styled(glyph, Style::default().fg(occupant_color(id)).bold())
                } else if cell.is_obstacle() {
                    Span::styled("#", Style::default().fg(Color::DarkGray))
                } else if let Some(item) = cell.items().last() {
                    let glyph = item.category.chars().next().unwrap_or('*').to_string();
                    let Rgb(r, g, b) = item.color;
                    Span::styled(glyph, Style::default().fg(Color::Rgb(r, g, b)))
                } else {
                    Span::raw(".")
                }
            })
            .collect();
        lines.push(Line::from(spans));
    }

    let map_paragraph = Paragraph::new(lines)
        .block(Block::default().title("Grid World").borders(Borders::ALL))
        .alignment(Alignment::Center);

    frame.render_widget(map_paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeker_app(world: GridWorld, target: Position) -> App {
        let controllers = world
            .occupants()
            .map(|id| -> Box<dyn Controller> { Box::new(TargetSeeker::new(id, target, 3)) })
            .collect();
        App::with_world(world, controllers, target, 50)
    }

    #[test]
    fn test_occupant_starting_on_target_counts_as_arrived() {
        let target = Position::new(1, 1);
        let world = GridWorld::new(3, 3, [(0, target)], [], []).unwrap();
        let mut app = seeker_app(world, target);

        app.tick();
        assert!(app.finished);
        assert!(app.arrived.contains(&0));
        assert_eq!(app.world.position(0), Some(target));
    }

    #[test]
    fn test_restart_on_target_is_not_walked_away() {
        let target = Position::new(0, 0);
        let mut world = GridWorld::with_defaults(3, 3).unwrap();
        world.step(0, gridworld_core::action::Direction::North);
        let mut app = seeker_app(world, target);

        app.tick();
        assert!(app.finished);
        assert_eq!(app.world.position(0), Some(target));

        app.restart();
        app.tick();
        assert!(app.finished);
        assert!(app.arrived.contains(&0));
        assert_eq!(app.world.position(0), Some(target));
    }
}
