//! Play an entrainment session on the default output device
//!
//! Run with: cargo run --example play --features cpal_sink -- [preset] [seconds]
//!
//! Applies the preset (default `relax`) to every generator slot, then walks
//! the carrier of slot 0 slowly up an octave while playing.

use std::thread::sleep;
use std::time::{Duration, Instant};

use entrain::{Advisory, EngineConfig, Session, TargetScope};

fn main() {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let preset = args.next().unwrap_or_else(|| "relax".to_string());
    let seconds: f64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(20.0);

    let mut session = match Session::new(EngineConfig::default()) {
        Ok(session) => session,
        Err(err) => {
            eprintln!("{}", err);
            return;
        }
    };

    match session.start() {
        Ok(Advisory::Ready) => {}
        Ok(Advisory::ResumeRequired) => {
            if session.resume() != Ok(Advisory::Ready) {
                eprintln!("Output device refused to start");
                return;
            }
        }
        Err(err) => {
            eprintln!("{}", err);
            return;
        }
    }

    if let Err(err) = session.apply_preset_to(&preset, TargetScope::All) {
        eprintln!("{}", err);
        return;
    }
    // every slot audible, quiet enough to sum
    session.set_multi_edit(true).unwrap();
    session.set_level(35.0, None).unwrap();
    session.set_multi_edit(false).unwrap();

    let params = session.parameters(0).unwrap();
    println!(
        "Playing '{}': carrier {:.1} Hz, modulation {:.2} Hz. Press Ctrl+C to stop\n",
        preset, params.carrier_hz, params.mod_hz
    );

    let sample_rate = session.sample_rate().unwrap_or(48_000) as f64;
    // ~20ms of audio ahead of the device
    let frames_ahead = (sample_rate * 0.02) as u64;
    let start_carrier = params.carrier_hz;
    let audio_start = Instant::now();

    while audio_start.elapsed().as_secs_f64() < seconds {
        let elapsed = audio_start.elapsed().as_secs_f64();
        let frames_played = (elapsed * sample_rate) as u64;
        let rendered = session.current_frame().unwrap_or(0);

        if rendered < frames_played + frames_ahead {
            session.process().unwrap();
        } else {
            sleep(Duration::from_micros(500));
            let octave = (elapsed / seconds) as f32;
            let _ = session.set_carrier(start_carrier * octave.exp2(), Some(0));
        }
    }

    session.close_session().unwrap();
}
