use anyhow::{Context, Result};
use clap::Parser;
use dirplay::backend::{AudioBackend, NullBackend, RodioBackend};
use dirplay::cli::{Cli, Command, PlayArgs, PlaylistCommand};
use dirplay::config;
use dirplay::library;
use dirplay::model::{PlaybackState, Settings, Track};
use dirplay::playlist_store::PlaylistStore;
use dirplay::TransportController;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(250);

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,dirplay=info")),
        )
        .init();

    let settings = config::load_settings().unwrap_or_else(|err| {
        tracing::warn!("falling back to default settings: {err:#}");
        Settings::default()
    });

    match cli.cmd {
        Command::Play(args) => play(args, settings),
        Command::Playlist(cmd) => playlist(cmd, &settings),
        Command::Devices => {
            for name in RodioBackend::available_outputs() {
                println!("{name}");
            }
            Ok(())
        }
    }
}

fn play(args: PlayArgs, mut settings: Settings) -> Result<()> {
    let tracks = match (&args.playlist, &args.dir) {
        (Some(name), _) => {
            let store = PlaylistStore::new(config::playlist_dir(&settings)?);
            store.load(name)?
        }
        (None, dir) => {
            let Some(dir) = dir.clone().or_else(|| settings.last_directory.clone()) else {
                anyhow::bail!("no directory given and none played before");
            };
            let dir = config::normalize_path(&dir);
            let tracks = library::list_audio_files(&dir)?;
            settings.last_directory = Some(dir);
            tracks
        }
    };

    if let Some(repeat) = args.repeat {
        settings.repeat_mode = repeat.into();
    }
    if args.shuffle {
        settings.shuffle = true;
    } else if args.no_shuffle {
        settings.shuffle = false;
    }
    if let Some(volume) = args.volume {
        settings.set_default_volume(volume);
    }
    if let Err(err) = config::save_settings(&settings) {
        tracing::warn!("failed to save settings: {err:#}");
    }

    if tracks.is_empty() {
        println!("Nothing to play.");
        return Ok(());
    }

    let null_output = args.null_output;
    let device = args.device;
    let controller = TransportController::spawn(move || -> Box<dyn AudioBackend> {
        if null_output {
            Box::new(NullBackend::new())
        } else {
            Box::new(RodioBackend::new(device))
        }
    });

    controller.set_repeat_mode(settings.repeat_mode)?;
    controller.set_shuffle_mode(settings.shuffle)?;
    controller.set_volume(settings.default_volume)?;
    controller
        .initialize()
        .context("failed to open the audio output")?;
    controller.load_playlist(tracks)?;
    controller.play()?;

    let mut announced: Option<Track> = None;
    loop {
        let status = controller.status()?;
        if status.is_playing() && status.track != announced {
            if let Some(track) = status.track.as_ref() {
                let index = status.index.map_or(0, |index| index + 1);
                println!("[{index}/{}] {}", status.len, track.title());
            }
            announced = status.track.clone();
        }

        match status.state {
            PlaybackState::Stopped | PlaybackState::Ready => break,
            PlaybackState::Error => {
                let reason = status
                    .error
                    .map_or_else(|| String::from("unknown error"), |err| err.to_string());
                anyhow::bail!("playback failed: {reason}");
            }
            _ => thread::sleep(STATUS_POLL_INTERVAL),
        }
    }

    controller.shutdown();
    Ok(())
}

fn playlist(cmd: PlaylistCommand, settings: &Settings) -> Result<()> {
    let store = PlaylistStore::new(config::playlist_dir(settings)?);
    match cmd {
        PlaylistCommand::List => {
            for name in store.names()? {
                println!("{name}");
            }
        }
        PlaylistCommand::Show { name } => {
            for (index, track) in store.load(&name)?.iter().enumerate() {
                println!("{index:>3}  {track}");
            }
        }
        PlaylistCommand::Save { name, dir } => {
            let tracks = library::list_audio_files(&config::normalize_path(&dir))?;
            store.save(&name, &tracks)?;
            println!("Saved {} tracks to {name}.", tracks.len());
        }
        PlaylistCommand::Add { name, track } => {
            let track = Track::from_path(&config::normalize_path(&track));
            if !store.add_track(&name, &track)? {
                println!("{track} is already listed or is not an audio file.");
            }
        }
        PlaylistCommand::Remove { name, track } => {
            let track = Track::from_path(&config::normalize_path(&track));
            if !store.remove_track(&name, &track)? {
                println!("{track} is not in {name}.");
            }
        }
        PlaylistCommand::Move { name, from, to } => {
            if !store.reorder(&name, from, to)? {
                println!("Nothing moved.");
            }
        }
        PlaylistCommand::Delete { name } => store.delete(&name)?,
    }
    Ok(())
}
