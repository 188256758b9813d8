/// Sound engine: procedural sonar-style cues via rodio.
///
/// Every cue is synthesized into an in-memory WAV buffer once at startup
/// and played fire-and-forget through a detached Sink.
///
/// Without the "sound" feature the stub SoundEngine does nothing.

use deepecho::sim::event::GameEvent;

#[cfg(feature = "sound")]
mod inner {
    use std::f32::consts::TAU;
    use std::io::Cursor;
    use std::sync::Arc;

    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use rodio::{OutputStream, OutputStreamHandle, Sink};

    const SAMPLE_RATE: u32 = 22050;

    type Buffer = Arc<Vec<u8>>;

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        ping: Buffer,
        decoy: Buffer,
        artifact: Buffer,
        pickup: Buffer,
        exit_open: Buffer,
        reject: Buffer,
        phase: Buffer,
        won: Buffer,
        lost: Buffer,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!(error = %e, "no audio output, running silent");
                    return None;
                }
            };
            let wav = |samples: Vec<f32>| Arc::new(make_wav(&samples));

            Some(SoundEngine {
                _stream: stream,
                handle,
                ping: wav(gen_ping(1400.0, 650.0, 0.5)),
                decoy: wav(gen_ping(900.0, 450.0, 0.3)),
                artifact: wav(gen_notes(&[(988.0, 0.05), (1319.0, 0.05), (1976.0, 0.09)], 0.25)),
                pickup: wav(gen_notes(&[(660.0, 0.05), (880.0, 0.08)], 0.22)),
                exit_open: wav(gen_notes(&[(523.0, 0.08), (784.0, 0.08), (1047.0, 0.16)], 0.28)),
                reject: wav(gen_buzz()),
                phase: wav(gen_phase()),
                won: wav(gen_notes(&[(523.0, 0.1), (659.0, 0.1), (784.0, 0.1), (1047.0, 0.3)], 0.3)),
                lost: wav(gen_notes(&[(392.0, 0.14), (330.0, 0.14), (262.0, 0.14), (196.0, 0.3)], 0.3)),
            })
        }

        fn play(&self, buf: &Buffer) {
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach();
                }
            }
        }

        pub fn play_ping(&self) { self.play(&self.ping); }
        pub fn play_decoy(&self) { self.play(&self.decoy); }
        pub fn play_artifact(&self) { self.play(&self.artifact); }
        pub fn play_pickup(&self) { self.play(&self.pickup); }
        pub fn play_exit_open(&self) { self.play(&self.exit_open); }
        pub fn play_reject(&self) { self.play(&self.reject); }
        pub fn play_phase(&self) { self.play(&self.phase); }
        pub fn play_won(&self) { self.play(&self.won); }
        pub fn play_lost(&self) { self.play(&self.lost); }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators (mono f32 samples)
    // ════════════════════════════════════════════════════════════

    fn sample_count(duration: f32) -> usize {
        (SAMPLE_RATE as f32 * duration) as usize
    }

    /// Sonar ping: falling chirp followed by two fainter echoes.
    fn gen_ping(f_start: f32, f_end: f32, volume: f32) -> Vec<f32> {
        let n = sample_count(0.22);
        let mut phase = 0.0_f32;
        let chirp: Vec<f32> = (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = f_start + (f_end - f_start) * t;
                phase += freq / SAMPLE_RATE as f32;
                let env = (-4.0 * t).exp();
                (phase * TAU).sin() * env * volume
            })
            .collect();

        let gap = sample_count(0.16);
        let mut out = vec![0.0; n + 2 * gap];
        for (k, gain) in [1.0_f32, 0.35, 0.12].iter().enumerate() {
            for (i, s) in chirp.iter().enumerate() {
                out[k * gap + i] += s * gain;
            }
        }
        out
    }

    /// Sequence of (frequency, seconds) notes with a soft square-ish timbre.
    fn gen_notes(notes: &[(f32, f32)], volume: f32) -> Vec<f32> {
        let mut samples = Vec::new();
        for &(freq, dur) in notes {
            let n = sample_count(dur);
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32).powf(0.6);
                let wave = (t * freq * TAU).sin() * 0.75 + (t * freq * 3.0 * TAU).sin() * 0.25;
                samples.push(wave * env * volume);
            }
        }
        samples
    }

    /// Refused action: short low buzz.
    fn gen_buzz() -> Vec<f32> {
        let n = sample_count(0.09);
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let square = if (t * 110.0).fract() < 0.5 { 1.0 } else { -1.0 };
                square * (1.0 - i as f32 / n as f32) * 0.12
            })
            .collect()
    }

    /// Phase jump: rising filtered noise sweep.
    fn gen_phase() -> Vec<f32> {
        let n = sample_count(0.2);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut lp = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let noise: f32 = rng.gen_range(-1.0..1.0);
                // one-pole low-pass whose cutoff opens over time
                let k = 0.05 + 0.6 * t;
                lp += (noise - lp) * k;
                lp * (1.0 - t).powf(0.5) * 0.5
            })
            .collect()
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder (16-bit PCM mono)
    // ════════════════════════════════════════════════════════════

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        const CHANNELS: u16 = 1;
        const BITS: u16 = 16;
        let block_align = CHANNELS * BITS / 8;
        let byte_rate = SAMPLE_RATE * block_align as u32;
        let data_size = samples.len() as u32 * block_align as u32;

        let mut buf = Vec::with_capacity(44 + data_size as usize);
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&(36 + data_size).to_le_bytes());
        buf.extend_from_slice(b"WAVEfmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes());
        buf.extend_from_slice(&CHANNELS.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&BITS.to_le_bytes());
        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());
        for &s in samples {
            let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            buf.extend_from_slice(&v.to_le_bytes());
        }
        buf
    }
}

// ════════════════════════════════════════════════════════════
//  Public API
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play_ping(&self) {}
    pub fn play_decoy(&self) {}
    pub fn play_artifact(&self) {}
    pub fn play_pickup(&self) {}
    pub fn play_exit_open(&self) {}
    pub fn play_reject(&self) {}
    pub fn play_phase(&self) {}
    pub fn play_won(&self) {}
    pub fn play_lost(&self) {}
}

/// Map simulation events onto cues. Repeated rejections in one frame buzz once.
pub fn play_events(sound: Option<&SoundEngine>, events: &[GameEvent]) {
    use deepecho::domain::sonar::PingSource;

    let Some(sfx) = sound else { return };
    let mut rejected = false;
    for event in events {
        match event {
            GameEvent::PingEmitted { source: PingSource::Player, .. } => sfx.play_ping(),
            GameEvent::PingEmitted { source: PingSource::Decoy, .. } => sfx.play_decoy(),
            GameEvent::ArtifactCollected { .. } => sfx.play_artifact(),
            GameEvent::PickupCollected { .. } => sfx.play_pickup(),
            GameEvent::AllArtifactsCollected => sfx.play_exit_open(),
            GameEvent::PhaseJump { .. } => sfx.play_phase(),
            GameEvent::ActionRejected { .. } if !rejected => {
                rejected = true;
                sfx.play_reject();
            }
            GameEvent::Won { .. } => sfx.play_won(),
            GameEvent::Lost { .. } => sfx.play_lost(),
            _ => {}
        }
    }
}
