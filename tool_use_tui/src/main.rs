use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
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
    fs::{self, File},
    io::{self, Stdout},
    path::{Path, PathBuf},
    sync::Mutex,
    time::{Duration, Instant},
};
use tool_use_core::{
    Direction as Compass, Position,
    agent::{Agent, PlanningAgent, RandomAgent, ScriptedAgent},
    bridge_building::{BridgeAction, BridgeBuilding, BridgeBuildingConfig},
    environment::{Episode, EpisodeState, Game, Observation, StepResult},
    layer::{Layer, Rgb},
    plot::InfoValue,
    trap_tube::{ToolAction, TrapTube},
};
use tracing_subscriber::EnvFilter;

#[derive(ValueEnum, Clone, Copy, Debug)]
enum GameKind {
    BridgeBuilding,
    ToolUse,
    TrapTube,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum AgentKind {
    /// Uniform random actions
    Random,
    /// Walks to the nearest reachable goal (push-box games only)
    Planner,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Game to play
    #[arg(short, long, value_enum, default_value_t = GameKind::BridgeBuilding)]
    game: GameKind,

    /// TOML file holding the game's configuration
    #[arg(short, long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Seed for level generation and the random agent
    #[arg(short, long, default_value_t = 0)]
    seed: u64,

    /// Truncate each episode after this many steps
    #[arg(long, default_value_t = 50)]
    max_steps: u32,

    /// Agent to run when no script is given
    #[arg(short, long, value_enum, default_value_t = AgentKind::Random)]
    agent: AgentKind,

    /// Scripted actions, comma separated; multi-part actions use ':' (e.g. "1:3,0:0")
    #[arg(long, value_name = "ACTIONS")]
    actions: Option<String>,

    /// Milliseconds between simulation steps
    #[arg(long, default_value_t = 250)]
    tick_ms: u64,

    /// Write tracing output to this file
    #[arg(long, value_name = "LOG_FILE")]
    log_file: Option<PathBuf>,
}

struct App<G: Game> {
    /// Title shown above the board.
    title: &'static str,
    episode: Episode<G>,
    agent: Box<dyn Agent<G::Action>>,
    observation: Observation,
    last_step: Option<StepResult>,
    /// Episodes started so far, including the current one.
    episodes: u32,
    /// Flag to control the main loop.
    should_quit: bool,
    paused: bool,
}

impl<G: Game> App<G> {
    fn new(title: &'static str, mut episode: Episode<G>, agent: Box<dyn Agent<G::Action>>) -> Result<Self> {
        let observation = episode.reset()?;
        Ok(App {
            title,
            episode,
            agent,
            observation,
            last_step: None,
            episodes: 1,
            should_quit: false,
            paused: false,
        })
    }

    /// Handles one step of the simulation.
    fn tick(&mut self) -> Result<()> {
        if self.paused || self.episode.is_done() || self.agent.is_exhausted() {
            return Ok(());
        }
        let action = self.agent.act(&self.observation);
        let step = self.episode.step(action)?;
        tracing::info!(
            step = self.episode.steps(),
            ?action,
            reward = step.reward,
            terminated = step.terminated,
            truncated = step.truncated,
            "step"
        );
        self.observation = step.observation.clone();
        self.last_step = Some(step);
        Ok(())
    }

    /// Starts the next episode.
    fn restart(&mut self) -> Result<()> {
        self.observation = self.episode.reset()?;
        self.last_step = None;
        self.episodes += 1;
        Ok(())
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
    let args = Args::parse();
    setup_logging(args.log_file.as_deref())?;

    match args.game {
        GameKind::BridgeBuilding => run::<BridgeBuilding>(
            &args,
            "Bridge Building",
            BridgeBuildingConfig::default(),
            BridgeAction::Stay,
            Some(Box::new(PlanningAgent::new())),
        ),
        GameKind::ToolUse => run::<BridgeBuilding>(
            &args,
            "Tool Use",
            BridgeBuildingConfig::tool_use(),
            BridgeAction::Stay,
            Some(Box::new(PlanningAgent::new())),
        ),
        GameKind::TrapTube => run::<TrapTube>(
            &args,
            "Trap Tube",
            Default::default(),
            ToolAction::walk(Compass::North),
            None,
        ),
    }
}

/// Builds the episode and agent for one game, then drives the TUI.
fn run<G>(
    args: &Args,
    title: &'static str,
    default_config: G::Config,
    idle: G::Action,
    planner: Option<Box<dyn Agent<G::Action>>>,
) -> Result<()>
where
    G: Game + 'static,
    G::Action: 'static,
{
    let config = match &args.config {
        Some(path) => load_config::<G>(path)?,
        None => default_config,
    };
    let episode = Episode::<G>::new(config, args.seed).with_max_steps(args.max_steps);

    let agent: Box<dyn Agent<G::Action>> = match (&args.actions, args.agent) {
        (Some(script), _) => Box::new(ScriptedAgent::new(parse_script::<G>(script)?, idle)),
        (None, AgentKind::Random) => Box::new(RandomAgent::<G>::new(args.seed)),
        (None, AgentKind::Planner) => {
            planner.ok_or_else(|| anyhow!("the planner agent only plays the push-box games"))?
        }
    };
    // Fail on a bad level before touching the terminal.
    let mut app = App::new(title, episode, agent)?;

    let mut terminal = setup_terminal()?;
    let result = run_app(&mut terminal, &mut app, Duration::from_millis(args.tick_ms));
    restore_terminal(&mut terminal)?;
    result
}

fn load_config<G: Game>(path: &Path) -> Result<G::Config> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("Failed to parse config file {}", path.display()))
}

/// Splits a script like `"1:3, 0:0"` into encoded actions.
fn parse_encoded(script: &str) -> Result<Vec<Vec<usize>>> {
    script
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(|token| {
            token
                .split(':')
                .map(|part| {
                    part.parse::<usize>()
                        .with_context(|| format!("Bad action component '{part}' in '{token}'"))
                })
                .collect()
        })
        .collect()
}

fn parse_script<G: Game>(script: &str) -> Result<Vec<G::Action>> {
    parse_encoded(script)?
        .iter()
        .map(|encoded| {
            G::decode_action(encoded).with_context(|| format!("Invalid action {encoded:?}"))
        })
        .collect()
}

/// Sends tracing output to `path`. Without a path nothing is installed, so
/// the terminal being drawn stays clean.
fn setup_logging(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = File::create(path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?; // Put terminal in raw mode
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into)
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
fn run_app<G: Game>(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App<G>,
    tick_rate: Duration,
) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => app.quit(),
                    KeyCode::Char(' ') => app.toggle_pause(),
                    KeyCode::Char('r') => app.restart()?,
                    _ => {}
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick()?;
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

/// Renders the user interface.
fn ui<G: Game>(frame: &mut Frame, app: &App<G>) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(70), // Area for the board
            Constraint::Percentage(20), // Area for episode status
            Constraint::Percentage(10), // Area for help
        ])
        .split(frame.area());

    render_board::<G>(frame, main_layout[0], app.title, &app.observation);
    render_status(frame, main_layout[1], app);

    let help_text = Paragraph::new("'q'/'Esc' quit, 'space' pause, 'r' new episode.")
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help_text, main_layout[2]);
}

fn rgb((r, g, b): Rgb) -> Color {
    Color::Rgb(r, g, b)
}

/// Renders the board, two terminal columns per cell, coloured by layer.
fn render_board<G: Game>(frame: &mut Frame, area: Rect, title: &str, observation: &Observation) {
    let board = &observation.board;
    let ground = Style::default().bg(rgb(G::ground_color()));

    let lines: Vec<Line> = (0..board.height())
        .filter_map(|row| board.row(row))
        .map(|cells| {
            let spans: Vec<Span> = cells
                .iter()
                .map(|ch| match Layer::from_char(*ch) {
                    Some(layer) => Span::styled(
                        format!("{ch} "),
                        Style::default().bg(rgb(layer.color())).fg(Color::Black).bold(),
                    ),
                    None => Span::styled("  ", ground),
                })
                .collect();
            Line::from(spans)
        })
        .collect();

    let board_paragraph = Paragraph::new(lines)
        .block(Block::default().title(title).borders(Borders::ALL))
        .alignment(Alignment::Center);

    frame.render_widget(board_paragraph, area);
}

fn describe_state(state: EpisodeState) -> Span<'static> {
    match state {
        EpisodeState::Running => Span::raw("running"),
        EpisodeState::Terminated(outcome) => Span::styled(
            format!("terminated ({outcome:?})"),
            Style::default().fg(Color::Green).bold(),
        ),
        EpisodeState::Truncated => {
            Span::styled("truncated", Style::default().fg(Color::Yellow).bold())
        }
    }
}

fn describe_info(key: &str, value: &InfoValue) -> Option<String> {
    let cell = |p: &Position| format!("({}, {})", p.row, p.col);
    match value {
        InfoValue::Flag(true) => Some(key.to_string()),
        InfoValue::Flag(false) => None,
        InfoValue::Position(p) => Some(format!("{key}={}", cell(p))),
        InfoValue::Positions(ps) => Some(format!(
            "{key}=[{}]",
            ps.iter().map(cell).collect::<Vec<_>>().join(", ")
        )),
    }
}

/// Renders step counters, rewards and the last tick's info flags.
fn render_status<G: Game>(frame: &mut Frame, area: Rect, app: &App<G>) {
    let reward = app.last_step.as_ref().map_or(0.0, |step| step.reward);
    let mut state = vec![Span::raw("State: "), describe_state(app.episode.state())];
    if app.paused {
        state.push(Span::styled(" [paused]", Style::default().fg(Color::Cyan)));
    }
    if app.agent.is_exhausted() {
        state.push(Span::styled(" [script finished]", Style::default().fg(Color::Cyan)));
    }
    let info = app
        .last_step
        .as_ref()
        .map(|step| {
            step.info
                .iter()
                .filter_map(|(key, value)| describe_info(key, value))
                .collect::<Vec<_>>()
                .join("  ")
        })
        .unwrap_or_default();

    let items = vec![
        ListItem::from(Line::from(format!(
            "Episode: {}  Step: {}  Reward: {:+.2}  Total: {:+.2}",
            app.episodes,
            app.episode.steps(),
            reward,
            app.episode.total_reward()
        ))),
        ListItem::from(Line::from(state)),
        ListItem::from(Line::from(format!("Info: {info}"))),
    ];
    let status_widget =
        List::new(items).block(Block::default().borders(Borders::ALL).title("Episode"));
    frame.render_widget(status_widget, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tool_use_core::trap_tube::Grasp;

    #[test]
    fn scripts_decode_per_game() {
        let bridge = parse_script::<BridgeBuilding>("3, 3 0,4").unwrap();
        assert_eq!(
            bridge,
            vec![
                BridgeAction::Move(Compass::East),
                BridgeAction::Move(Compass::East),
                BridgeAction::Move(Compass::North),
                BridgeAction::Stay,
            ]
        );
        let tool = parse_script::<TrapTube>("1:3,0:0").unwrap();
        assert_eq!(tool[0], ToolAction::new(Grasp::Push, Compass::East));
        assert_eq!(tool[1], ToolAction::walk(Compass::North));
    }

    #[test]
    fn bad_scripts_are_reported() {
        assert!(parse_script::<BridgeBuilding>("9").is_err());
        assert!(parse_script::<BridgeBuilding>("x").is_err());
        assert!(parse_script::<TrapTube>("1").is_err());
        assert!(parse_encoded("").unwrap().is_empty());
    }

    #[test]
    fn config_files_load_as_toml() {
        let path = std::env::temp_dir().join(format!("tool_use_tui_{}.toml", std::process::id()));
        fs::write(
            &path,
            "[level]\nkind = \"art\"\nart = [\"P G\"]\n\n[rules]\nhydrophobic = true\n",
        )
        .unwrap();
        let config = load_config::<BridgeBuilding>(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert!(config.rules.hydrophobic);
        assert_eq!(config, {
            let mut expected = BridgeBuildingConfig::from_art(&["P G"]);
            expected.rules.hydrophobic = true;
            expected
        });
    }
}
