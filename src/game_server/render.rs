//! Render - drawing race frames
//!
//! The simulation never calls a renderer; drivers hand a snapshot to one after
//! each tick.

use std::io::{self, Write};

use crate::game_server::race::{RaceOutcome, RaceSnapshot};

/// ANSI home + clear screen
const CLEAR_SCREEN: &str = "\x1b[H\x1b[2J";

/// Something that can draw the current frame of a race
pub trait Renderer {
    fn render(&mut self, snapshot: &RaceSnapshot) -> io::Result<()>;
}

/// Text renderer for terminals
pub struct ConsoleRenderer<W: Write> {
    out: W,
    clear_screen: bool,
}

impl<W: Write> ConsoleRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            clear_screen: true,
        }
    }

    /// Leave earlier frames on screen (useful when output is piped)
    pub fn without_clear(mut self) -> Self {
        self.clear_screen = false;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Print the final result line
    pub fn announce(&mut self, outcome: &RaceOutcome) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "{}", announcement(outcome))?;
        self.out.flush()
    }
}

impl<W: Write> Renderer for ConsoleRenderer<W> {
    fn render(&mut self, snapshot: &RaceSnapshot) -> io::Result<()> {
        if self.clear_screen {
            write!(self.out, "{CLEAR_SCREEN}")?;
        }
        write!(self.out, "{}", frame_text(snapshot))?;
        self.out.flush()
    }
}

/// One frame: borders plus a line per occupied lane
pub fn frame_text(snapshot: &RaceSnapshot) -> String {
    let length = snapshot.track_length as usize;
    let border = "=".repeat(length + 2);

    let mut frame = String::new();
    frame.push_str(&border);
    frame.push('\n');

    for horse in &snapshot.horses {
        let position = (horse.distance as usize).min(length.saturating_sub(1));
        let glyph = if horse.fallen { 'X' } else { horse.symbol };
        let track: String = (0..length)
            .map(|i| if i == position { glyph } else { ' ' })
            .collect();
        frame.push_str(&format!("|{track}| {:.2}\n", horse.confidence));
    }

    frame.push_str(&border);
    frame.push('\n');
    frame
}

pub fn announcement(outcome: &RaceOutcome) -> String {
    match outcome {
        RaceOutcome::Winner { name, .. } => format!("And the winner is {name}!"),
        RaceOutcome::AllFallen => "All horses fell!".to_string(),
        RaceOutcome::TickLimitReached => "The race was called off before anyone finished.".to_string(),
    }
}
