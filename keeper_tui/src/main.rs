use anyhow::{Context, Result, ensure};
use clap::Parser;
use keeper_core::{
    Cell, Position,
    grid::Bounds,
    keeper::{Explorer, KeeperConfig, Senses},
    maze::{ActionResult, Maze, Tile, load_maze_from_string},
    simulation::Simulation,
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
    collections::HashSet,
    fs::File,
    io::{self, Stdout},
    path::{Path, PathBuf},
    sync::Mutex,
    time::{Duration, Instant},
};
use tracing::{Level, error, info};

#[derive(Parser, Debug)]
#[command(version, about = "Watch a depth-first keeper explore a maze", long_about = None)]
struct Args {
    /// Maze file to load. A maze is generated when omitted.
    #[arg(short, long, value_name = "MAZE_FILE")]
    maze: Option<PathBuf>,

    /// Rooms per column of a generated maze
    #[arg(long, default_value_t = 10)]
    rows: usize,

    /// Rooms per row of a generated maze
    #[arg(long, default_value_t = 18)]
    cols: usize,

    /// Keys hidden in a generated maze
    #[arg(long, default_value_t = 3)]
    keys: usize,

    /// Seed for maze generation
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Milliseconds between simulation ticks
    #[arg(long, default_value_t = 120)]
    tick_ms: u64,

    /// Give up after this many turns
    #[arg(long, default_value_t = 50_000)]
    max_turns: usize,

    /// Let the keeper treat the maze extent as known
    #[arg(long)]
    bounded: bool,

    /// Let the keeper assume the classic 40x40 arena
    #[arg(long, conflicts_with = "bounded")]
    classic: bool,

    /// Run to completion without a terminal UI
    #[arg(long)]
    headless: bool,

    /// Write logs to this file (the only log sink in TUI mode)
    #[arg(long, value_name = "LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Log verbosity
    #[arg(long, default_value_t = Level::INFO)]
    log_level: Level,
}

/// Where the run stands.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Status {
    Running,
    Escaped,
    Failed(String),
}

struct App {
    /// The maze with the keeper inside it.
    simulation: Simulation<Explorer>,
    max_turns: usize,
    status: Status,
    paused: bool,
    /// Flag to control the main loop.
    should_quit: bool,
}

impl App {
    fn new(maze: Maze, config: KeeperConfig, max_turns: usize) -> Self {
        App {
            simulation: Simulation::new(maze, Explorer::new(config)),
            max_turns,
            status: Status::Running,
            paused: false,
            should_quit: false,
        }
    }

    /// Handles one step of the simulation.
    fn tick(&mut self) {
        if self.status != Status::Running {
            return;
        }
        if self.simulation.turns() >= self.max_turns {
            self.status = Status::Failed(format!("no escape within {} turns", self.max_turns));
            return;
        }
        match self.simulation.step() {
            Ok(ActionResult::Escaped) => self.status = Status::Escaped,
            Ok(_) => {}
            Err(err) => {
                error!(%err, "simulation stopped");
                self.status = Status::Failed(err.to_string());
            }
        }
    }

    fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// Sets the quit flag.
    fn quit(&mut self) {
        self.should_quit = true;
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();
    init_logging(&args)?;

    // Load the maze from file, or generate one when none is given
    let maze = match &args.maze {
        Some(path) => load_maze(path)?,
        None => Maze::generate(args.rows, args.cols, args.keys, args.seed)
            .context("Failed to generate maze")?,
    };
    info!(
        rows = maze.bounds().rows,
        cols = maze.bounds().cols,
        keys = maze.total_keys(),
        "maze ready"
    );

    let config = keeper_config(&args, &maze)?;
    if args.headless {
        return run_headless(maze, config, args.max_turns);
    }

    // Set up the terminal
    let mut terminal = setup_terminal()?;

    // Create the application state
    let mut app = App::new(maze, config, args.max_turns);
    let tick_rate = Duration::from_millis(args.tick_ms);

    // Run the main application loop
    let outcome = run_app(&mut terminal, &mut app, tick_rate);

    // Restore the terminal state even when the loop failed
    restore_terminal(&mut terminal)?;
    outcome
}

/// Installs the fmt subscriber: the log file when given, stderr when headless.
fn init_logging(args: &Args) -> Result<()> {
    let builder = tracing_subscriber::fmt().with_max_level(args.log_level);
    match &args.log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            builder.with_writer(Mutex::new(file)).with_ansi(false).init();
        }
        None if args.headless => builder.with_writer(io::stderr).init(),
        None => {}
    }
    Ok(())
}

/// Works out how much of the maze's extent the keeper is told about.
fn keeper_config(args: &Args, maze: &Maze) -> Result<KeeperConfig> {
    if args.classic {
        let bounds = maze.bounds();
        ensure!(
            bounds.rows <= Bounds::CLASSIC.rows && bounds.cols <= Bounds::CLASSIC.cols,
            "Maze of size ({}, {}) does not fit the classic ({}, {}) arena",
            bounds.rows,
            bounds.cols,
            Bounds::CLASSIC.rows,
            Bounds::CLASSIC.cols
        );
        return Ok(KeeperConfig::classic());
    }
    Ok(KeeperConfig {
        bounds: args.bounded.then(|| maze.bounds()),
    })
}

fn load_maze(path: &Path) -> Result<Maze> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read maze file {}", path.display()))?;
    load_maze_from_string(&text)
        .with_context(|| format!("Failed to load maze from {}", path.display()))
}

/// Plays the whole attempt and prints a summary.
fn run_headless(maze: Maze, config: KeeperConfig, max_turns: usize) -> Result<()> {
    println!("{maze}\n");
    let mut simulation = Simulation::new(maze, Explorer::new(config));
    let summary = simulation.run(max_turns)?;
    let keeper = simulation.keeper();
    println!(
        "Escaped after {} turns with {} keys ({} cells visited, {} cells mapped).",
        summary.turns,
        summary.keys_collected,
        keeper.visited().len(),
        keeper.map().known()
    );
    Ok(())
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

        // Poll for keyboard events
        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => app.quit(),
                    KeyCode::Char('p') | KeyCode::Char(' ') => app.toggle_pause(),
                    KeyCode::Char('n') if app.paused => app.tick(),
                    _ => {}
                }
            }
        }

        // Advance the simulation once per tick unless paused
        if last_tick.elapsed() >= tick_rate {
            if !app.paused {
                app.tick(); // Perform simulation step
            }
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
            Constraint::Min(5),    // Area for the maze
            Constraint::Length(6), // Area for keeper status
            Constraint::Length(2), // Area for help
        ])
        .split(frame.area());

    // Render the maze
    render_maze(frame, main_layout[0], &app.simulation);

    // Render the keeper status
    render_status(frame, main_layout[1], app);

    // Render help text
    let help_text = Paragraph::new(
        "q/Esc quit  p/space pause  n step (paused)   @ keeper  ? frontier  · door path  . visited",
    )
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help_text, main_layout[2]);
}

/// Renders the keeper's progress and phase.
fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let maze = app.simulation.maze();
    let keeper = app.simulation.keeper();
    let status = match &app.status {
        Status::Running if app.paused => Span::styled("paused", Style::default().fg(Color::Yellow)),
        Status::Running => Span::styled("running", Style::default().fg(Color::Cyan)),
        Status::Escaped => Span::styled("escaped", Style::default().fg(Color::Green).bold()),
        Status::Failed(reason) => Span::styled(
            format!("failed: {reason}"),
            Style::default().fg(Color::Red).bold(),
        ),
    };
    let door = keeper
        .door()
        .map_or_else(|| "unknown".to_string(), |door| door.to_string());

    let lines = vec![
        ListItem::from(Line::from(vec![Span::raw("Status: "), status])),
        ListItem::from(format!(
            "Turn: {}  Position: {}  Keys: {}/{}  Phase: {:?}",
            app.simulation.turns(),
            maze.keeper(),
            maze.keys_held(),
            maze.total_keys(),
            keeper.phase()
        )),
        ListItem::from(format!(
            "Visited: {}  Frontier: {}  Mapped: {}",
            keeper.visited().len(),
            keeper.frontier().len(),
            keeper.map().known()
        )),
        ListItem::from(format!(
            "Door: {}  Door path: {} steps",
            door,
            keeper.door_path().len()
        )),
    ];

    let status_widget =
        List::new(lines).block(Block::default().borders(Borders::ALL).title("Keeper"));
    frame.render_widget(status_widget, area);
}

/// Renders the maze with the keeper's knowledge overlaid.
fn render_maze(frame: &mut Frame, area: Rect, simulation: &Simulation<Explorer>) {
    let maze = simulation.maze();
    let keeper = simulation.keeper();
    let tiles = maze.tiles();
    let frontier: HashSet<Position> = keeper.frontier().iter().map(|e| e.position).collect();
    let door_path: HashSet<Position> = keeper.door_path().as_slice().iter().copied().collect();

    let mut lines: Vec<Line> = Vec::with_capacity(tiles.rows());
    for row in 0..tiles.rows() {
        let mut spans: Vec<Span> = Vec::with_capacity(tiles.cols());
        for col in 0..tiles.cols() {
            let position = Position::new(row as i32, col as i32);
            let tile = tiles[position];
            let span = if position == maze.keeper() {
                Span::styled("@", Style::default().fg(Color::Red).bold())
            } else if keeper.map().classify(position) == Cell::Unknown
                && !keeper.visited().contains(&position)
            {
                // Never sensed: draw faintly
                Span::styled(tile_glyph(tile), Style::default().fg(Color::DarkGray))
            } else if tile == Tile::Key {
                Span::styled("k", Style::default().fg(Color::Yellow).bold())
            } else if tile == Tile::Door {
                Span::styled("D", Style::default().fg(Color::Green).bold())
            } else if door_path.contains(&position) {
                Span::styled("·", Style::default().fg(Color::Green))
            } else if frontier.contains(&position) {
                Span::styled("?", Style::default().fg(Color::Yellow))
            } else if keeper.visited().contains(&position) {
                Span::styled(".", Style::default().fg(Color::Blue))
            } else {
                Span::styled(tile_glyph(tile), Style::default().fg(Color::Gray))
            };
            spans.push(span);
        }
        lines.push(Line::from(spans));
    }

    let maze_paragraph = Paragraph::new(lines)
        .block(Block::default().title("Keeper Maze").borders(Borders::ALL))
        .alignment(Alignment::Center);

    frame.render_widget(maze_paragraph, area);
}

fn tile_glyph(tile: Tile) -> &'static str {
    match tile {
        Tile::Floor => " ",
        Tile::Wall => "#",
        Tile::Key => "k",
        Tile::Door => "D",
    }
}
