//! Octoblast — block-blast puzzle game in the terminal.

mod app;
mod game;
mod highscores;
mod input;
mod theme;
mod ui;

use anyhow::Result;
use app::App;
use clap::{Parser, ValueEnum};
use std::time::{SystemTime, UNIX_EPOCH};

/// Options derived from CLI that affect game behaviour.
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Piece RNG seed; the same seed replays the same piece sequence.
    pub seed: u32,
    pub no_animation: bool,
    pub frame_rate: f64,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_default();
    let seed = args.seed.unwrap_or_else(time_seed);
    let config = GameConfig {
        seed,
        no_animation: args.no_animation,
        frame_rate: args.frame_rate,
    };
    let mut app = App::new(args, config, theme)?;
    app.run()?;
    Ok(())
}

/// Seed from the wall clock when --seed is not given.
fn time_seed() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() ^ (d.as_secs() as u32))
        .unwrap_or(0x1234_5678)
}

/// Block-blast puzzle game in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "octoblast",
    version,
    about = "Block-blast puzzle in the terminal. Place polyomino pieces on an 8x8 grid; same-colour clusters of 8+ blast for score.",
    long_about = "Octoblast is a terminal take on the block-blast puzzle genre.\n\n\
        Pick one of three offered pieces, move it over the 8x8 board and drop it. \
        Connected same-colour clusters of 8 or more cells blast for score; higher \
        levels unlock bigger shapes. The game ends when no offered piece fits.\n\n\
        CONTROLS:\n  Left/Right/Up/Down (or hjkl)  Move piece / change tray selection\n  \
        Enter/Space  Pick up / drop    Tab  Next piece    1-3  Select piece\n  \
        Esc  Return piece to tray      P    Pause         Q    Quit\n\n\
        Use --theme to load a btop-style theme (e.g. onedark.theme), --seed for a \
        reproducible piece sequence."
)]
pub struct Args {
    /// Path to theme file (btop-style theme[key]="value"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<std::path::PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Piece RNG seed for a reproducible game. Random when not set.
    #[arg(long, value_name = "N")]
    pub seed: Option<u32>,

    /// Skip main menu and start game immediately.
    #[arg(long)]
    pub no_menu: bool,

    /// Disable blast animation (no shake, no fade).
    #[arg(long)]
    pub no_animation: bool,

    /// Target render frames per second.
    #[arg(long, default_value = "30.0", value_name = "RATE")]
    pub frame_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
