//! Tianzitui — Chinese poem fill-in-the-blank puzzle in the terminal.

mod app;
mod corpus;
mod game;
mod input;
mod pronounce;
mod theme;
mod ui;

use anyhow::Result;
use app::App;
use clap::Parser;

/// Options derived from CLI that affect round generation and the retry loop.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub line_len: usize,
    pub remove_count: usize,
    pub retry_delay_ms: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let theme = theme::Theme::load(args.theme.as_deref()).unwrap_or_default();
    let corpus = corpus::Corpus::load(args.corpus.as_deref(), args.line_len);
    let config = GameConfig {
        line_len: args.line_len,
        remove_count: args.blanks,
        retry_delay_ms: args.retry_delay_ms,
    };
    let mut app = App::new(args, config, theme, corpus)?;
    app.run()?;
    Ok(())
}

/// Chinese poem fill-in-the-blank puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "tianzitui",
    version,
    about = "Fill the blanked-out characters of a two-line poem. Pick a candidate, place it, and listen to the hint.",
    long_about = "Tianzitui shows two consecutive lines of a children's poem with some characters \
        blanked out, and a shuffled tray of the missing characters.\n\n\
        Place every character back where it belongs. A wrong solution flashes and the board \
        resets so you can retry the same puzzle; solving it lets you draw a new one.\n\n\
        CONTROLS (normal):\n  Left/Right  Select blank   Up/Down   Select candidate\n  Enter/Space Place          U         Undo last placement\n  S           Speak candidate R        New round   Q / Esc  Back / quit\n\n\
        CONTROLS (vim): h/l select blank, k/j select candidate.\n\n\
        Use --corpus to load your own poems (blank-line-separated stanzas, # comments) and \
        --theme to load a btop-style theme (e.g. onedark.theme)."
)]
pub struct Args {
    /// Path to a corpus file (UTF-8; stanzas separated by blank lines, '#' comments).
    /// Falls back to the built-in poems when missing or unusable.
    #[arg(short, long, value_name = "FILE")]
    pub corpus: Option<std::path::PathBuf>,

    /// Characters per poem line; other lines are filtered out at load time.
    #[arg(long, default_value = "5", value_name = "N")]
    pub line_len: usize,

    /// Number of characters blanked out per round (over the 2-line grid).
    #[arg(short, long, default_value = "4", value_name = "N")]
    pub blanks: usize,

    /// Delay in ms between a wrong solution and the board reset.
    #[arg(long, default_value = "1500", value_name = "MS")]
    pub retry_delay_ms: u64,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<std::path::PathBuf>,

    /// Seed for round generation (reproducible puzzles).
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Skip main menu and start a round immediately.
    #[arg(long)]
    pub no_menu: bool,

    /// Disable the wrong-answer flash animation (instant board reset still delayed).
    #[arg(long)]
    pub no_animation: bool,
}
