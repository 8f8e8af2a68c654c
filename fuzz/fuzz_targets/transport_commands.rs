#![no_main]

use dirplay::machine::{BackendEvent, Command, Effect, PlaybackStateMachine};
use dirplay::model::{Direction, Track};
use dirplay::playlist::Playlist;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((first, ops)) = data.split_first() else {
        return;
    };
    let mut playlist = Playlist::with_seed(u64::from(*first));
    let len = usize::from(*first % 16);
    playlist.load(
        (0..len)
            .map(|idx| Track::new(format!("track_{idx}.mp3")))
            .collect(),
        first & 1 == 1,
    );

    let mut machine = PlaybackStateMachine::new();
    machine.session_opened();
    let mut loaded = false;

    for byte in ops {
        let generation = if byte & 0x80 == 0 {
            machine.generation()
        } else {
            machine.generation().saturating_sub(1)
        };
        let effect = match byte % 12 {
            0 => machine.apply(Command::Play, &mut playlist),
            1 => machine.apply(Command::Pause, &mut playlist),
            2 => machine.apply(Command::Stop, &mut playlist),
            3 => machine.apply(Command::Skip(Direction::Forward), &mut playlist),
            4 => machine.apply(Command::Skip(Direction::Backward), &mut playlist),
            5 => machine.on_backend(generation, BackendEvent::Loaded, &mut playlist),
            6 => machine.on_backend(generation, BackendEvent::Finished, &mut playlist),
            7 => machine.on_backend(
                generation,
                BackendEvent::Error(String::from("fuzz")),
                &mut playlist,
            ),
            8 => {
                machine.set_repeat_mode(machine.repeat_mode().next());
                None
            }
            9 => {
                playlist.set_shuffle(!playlist.is_shuffled());
                None
            }
            10 => machine.playlist_replaced(),
            _ => match playlist.current().cloned() {
                Some(track) if machine.state().holds_resource() => {
                    machine.load_failed(track, String::from("fuzz"));
                    loaded = false;
                    None
                }
                _ => None,
            },
        };

        match effect {
            Some(Effect::Load { .. }) => loaded = true,
            Some(Effect::Release) => loaded = false,
            _ => {}
        }
        assert_eq!(loaded, machine.state().holds_resource());
        assert!(playlist.cursor().is_none_or(|cursor| cursor < playlist.len()));
    }
});
