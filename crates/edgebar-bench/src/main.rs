use std::hint;
use std::io;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use clap::Parser;
use edgebar::platform::WindowHandle;
use edgebar::platform::scripted::{ScriptedDesktop, ScriptedView};
use edgebar::text_layout::TextLayoutEngine;
use edgebar::window_list::{ReorderPolicy, WindowListSynchronizer};

const TITLE_WORDS: [&str; 10] = [
    "Document", "Inbox", "Terminal", "Notes", "Build", "Report", "Untitled", "Player", "Chat",
    "Settings",
];

/// Titles that force the layout search all the way down.
const PATHOLOGICAL_TITLES: [&str; 5] = [
    "",
    "W",
    "An extremely long window title that keeps going well past any sane panel width - Editor",
    "日本語のとても長いウィンドウタイトルがここに入ります - メモ帳",
    "🦀🦀🦀🦀🦀🦀🦀🦀🦀🦀🦀🦀🦀🦀🦀🦀🦀🦀🦀🦀🦀🦀🦀🦀",
];

#[derive(Parser, Debug)]
#[command(
    name = "edgebar-bench",
    version = env!("CARGO_PKG_VERSION"),
    about = "Refresh and label layout benchmark over a scripted desktop"
)]
struct BenchCli {
    /// How long to run each phase.
    #[arg(
        short = 'd',
        long = "duration",
        value_name = "SECONDS",
        default_value_t = 3.0
    )]
    duration_seconds: f64,

    /// Number of open windows on the scripted desktop.
    #[arg(short = 'w', long = "windows", value_name = "COUNT", default_value_t = 200)]
    windows: usize,

    /// Percentage of windows opened, closed or retitled between refreshes.
    #[arg(short = 'c', long = "churn", value_name = "PERCENT", default_value_t = 5.0)]
    churn_percent: f64,

    /// Rebuild first-seen order on structural changes.
    #[arg(long = "reset-order")]
    reset_order: bool,
}

struct BenchConfig {
    duration: Duration,
    windows: usize,
    churn_per_pass: usize,
    policy: ReorderPolicy,
}

impl TryFrom<&BenchCli> for BenchConfig {
    type Error = String;

    fn try_from(cli: &BenchCli) -> Result<Self, Self::Error> {
        if !(0.1..=600.0).contains(&cli.duration_seconds) {
            return Err("duration must be between 0.1 and 600 seconds".to_string());
        }
        if !(1..=100_000).contains(&cli.windows) {
            return Err("windows must be between 1 and 100000".to_string());
        }
        if !(0.0..=100.0).contains(&cli.churn_percent) {
            return Err("churn must be between 0 and 100 percent".to_string());
        }
        let churn = (cli.windows as f64 * cli.churn_percent / 100.0).round() as usize;
        Ok(Self {
            duration: Duration::from_secs_f64(cli.duration_seconds),
            windows: cli.windows,
            churn_per_pass: churn,
            policy: if cli.reset_order {
                ReorderPolicy::Reset
            } else {
                ReorderPolicy::Preserve
            },
        })
    }
}

fn main() -> io::Result<()> {
    let args = BenchCli::parse();
    let config = BenchConfig::try_from(&args)
        .map_err(|msg| io::Error::new(io::ErrorKind::InvalidInput, msg))?;

    let refresh = run_refresh_phase(&config)?;
    println!("{}", refresh.report("Refresh", "passes"));
    let layout = run_layout_phase(&config);
    println!("{}", layout.report("Layout", "labels"));
    Ok(())
}

fn run_refresh_phase(config: &BenchConfig) -> io::Result<PhaseStats> {
    let desktop = ScriptedDesktop::new();
    let wm = desktop.window_manager();
    let view = ScriptedView::new();
    let mut churn = Churn::new(&desktop, config.windows);
    let mut list = WindowListSynchronizer::new(TextLayoutEngine::default(), config.policy);
    let mut stats = PhaseStats::new();

    while stats.elapsed() < config.duration {
        churn.step(config.churn_per_pass);
        let started = Instant::now();
        let report = list.refresh(&wm, &view).map_err(io::Error::other)?;
        stats.record(started.elapsed(), report.dirty().len() + report.removed.len());
    }
    stats.mark_completed();
    Ok(stats)
}

fn run_layout_phase(config: &BenchConfig) -> PhaseStats {
    let view = ScriptedView::new();
    let engine = TextLayoutEngine::default();
    let mut stats = PhaseStats::new();

    while stats.elapsed() < config.duration {
        for title in PATHOLOGICAL_TITLES {
            let started = Instant::now();
            let label = engine.label(&view, hint::black_box(title), true);
            hint::black_box(label);
            stats.record(started.elapsed(), 1);
        }
    }
    stats.mark_completed();
    stats
}

/// Opens, closes and retitles windows on the scripted desktop.
struct Churn<'a> {
    desktop: &'a ScriptedDesktop,
    open: Vec<WindowHandle>,
    next_raw: usize,
    rng: XorShift,
}

impl<'a> Churn<'a> {
    fn new(desktop: &'a ScriptedDesktop, windows: usize) -> Self {
        let mut churn = Self {
            desktop,
            open: Vec::with_capacity(windows),
            next_raw: 1,
            rng: XorShift::seeded_from_clock(),
        };
        for _ in 0..windows {
            churn.open_one();
        }
        churn
    }

    fn title(&mut self) -> String {
        let word = TITLE_WORDS[self.rng.below(TITLE_WORDS.len())];
        format!("{word} {} - Application", self.rng.below(10_000))
    }

    fn open_one(&mut self) {
        let raw = self.next_raw;
        self.next_raw += 1;
        let title = self.title();
        let pid = (raw % 64) as u32 + 1;
        self.open.push(self.desktop.open(raw, &title, pid));
    }

    fn step(&mut self, changes: usize) {
        for _ in 0..changes {
            if self.open.is_empty() {
                self.open_one();
                continue;
            }
            match self.rng.below(3) {
                0 => {
                    let index = self.rng.below(self.open.len());
                    let victim = self.open.swap_remove(index);
                    self.desktop.close(victim);
                    self.open_one();
                }
                _ => {
                    let handle = self.open[self.rng.below(self.open.len())];
                    let title = self.title();
                    self.desktop.set_title(handle, &title);
                }
            }
        }
    }
}

struct XorShift {
    state: u64,
}

impl XorShift {
    fn seeded_from_clock() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0)
            ^ 0xA5A5_A5A5_1234_5678;
        Self { state: seed | 1 }
    }

    fn next(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    fn below(&mut self, bound: usize) -> usize {
        (self.next() % bound.max(1) as u64) as usize
    }
}

struct PhaseStats {
    start: Instant,
    completed_at: Option<Instant>,
    iterations: u64,
    touched: usize,
    total: Duration,
    fastest: Duration,
    slowest: Duration,
}

impl PhaseStats {
    fn new() -> Self {
        Self {
            start: Instant::now(),
            completed_at: None,
            iterations: 0,
            touched: 0,
            total: Duration::ZERO,
            fastest: Duration::MAX,
            slowest: Duration::ZERO,
        }
    }

    fn elapsed(&self) -> Duration {
        match self.completed_at {
            Some(done) => done.duration_since(self.start),
            None => self.start.elapsed(),
        }
    }

    fn mark_completed(&mut self) {
        self.completed_at = Some(Instant::now());
    }

    fn record(&mut self, took: Duration, touched: usize) {
        self.iterations = self.iterations.saturating_add(1);
        self.touched = self.touched.saturating_add(touched);
        self.total += took;
        self.fastest = self.fastest.min(took);
        self.slowest = self.slowest.max(took);
    }

    fn average_us(&self) -> f64 {
        if self.iterations == 0 {
            return 0.0;
        }
        self.total.as_secs_f64() / self.iterations as f64 * 1_000_000.0
    }

    fn fastest_us(&self) -> f64 {
        if self.iterations == 0 {
            return 0.0;
        }
        self.fastest.as_secs_f64() * 1_000_000.0
    }

    fn report(&self, phase: &str, unit: &str) -> String {
        indoc::formatdoc!(
            r#"
            {phase} bench completed.
            Duration: {elapsed:.2}s | {iterations} {unit}
            Avg: {avg:.2} us | Best: {best:.2} us | Worst: {worst:.2} us
            Rows touched: {touched}
            "#,
            elapsed = self.elapsed().as_secs_f64(),
            iterations = self.iterations,
            avg = self.average_us(),
            best = self.fastest_us(),
            worst = self.slowest.as_secs_f64() * 1_000_000.0,
            touched = self.touched,
        )
    }
}
