//! Command-line interface definitions.
//!
//! Only the `clap` surface lives here; `main.rs` wires it to the player.

use crate::model::RepeatMode;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dirplay", version, about = "Play a directory of audio files")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play every audio file in a directory, or a saved playlist
    Play(PlayArgs),

    /// Manage saved playlists
    #[command(subcommand)]
    Playlist(PlaylistCommand),

    /// List output devices and exit
    Devices,
}

#[derive(Args, Debug)]
pub struct PlayArgs {
    /// Directory to play (defaults to the last one played)
    pub dir: Option<PathBuf>,

    /// Play a saved playlist instead of a directory
    #[arg(long, conflicts_with = "dir")]
    pub playlist: Option<String>,

    /// Repeat mode (defaults to the saved setting)
    #[arg(long, value_enum)]
    pub repeat: Option<RepeatArg>,

    /// Shuffle the play order
    #[arg(long)]
    pub shuffle: bool,

    /// Disable shuffle even if it is the saved setting
    #[arg(long, conflicts_with = "shuffle")]
    pub no_shuffle: bool,

    /// Output volume between 0.0 and 1.0
    #[arg(long)]
    pub volume: Option<f32>,

    /// Use a specific output device by exact name
    #[arg(long)]
    pub device: Option<String>,

    /// Play silently against a wall clock instead of an audio device
    #[arg(long)]
    pub null_output: bool,
}

#[derive(Subcommand, Debug)]
pub enum PlaylistCommand {
    /// List saved playlists
    List,

    /// Print the tracks of a playlist
    Show { name: String },

    /// Save the audio files of a directory as a playlist
    Save { name: String, dir: PathBuf },

    /// Append a track to a playlist
    Add { name: String, track: PathBuf },

    /// Remove a track from a playlist
    Remove { name: String, track: PathBuf },

    /// Move the entry at FROM to TO (zero-based)
    Move { name: String, from: usize, to: usize },

    /// Delete a playlist
    Delete { name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RepeatArg {
    Off,
    One,
    All,
}

impl From<RepeatArg> for RepeatMode {
    fn from(value: RepeatArg) -> Self {
        match value {
            RepeatArg::Off => RepeatMode::Off,
            RepeatArg::One => RepeatMode::One,
            RepeatArg::All => RepeatMode::All,
        }
    }
}
