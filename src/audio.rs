use crate::config::SignalSource;
use crate::tracks::{DemoTrack, TrackSynth};
use anyhow::{Context, anyhow};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Sample, SampleFormat};
use ringbuf::HeapRb;
use ringbuf::traits::{Consumer as _, Producer as _, Split as _};
use rustfft::FftPlanner;
use rustfft::num_complex::Complex;
use std::f32::consts::PI;
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Number of spectrum buckets in every sample. Consumers index positionally,
/// so the count and ordering never change at runtime.
pub const BAND_COUNT: usize = 16;

/// Bucket boundaries in Hz, log-spaced over the musically useful range.
const BAND_EDGES_HZ: [f32; BAND_COUNT + 1] = [
    30.0, 44.0, 66.0, 97.0, 144.0, 214.0, 316.0, 468.0, 693.0, 1026.0, 1520.0, 2250.0, 3332.0,
    4933.0, 7305.0, 10816.0, 16000.0,
];

const WINDOW: usize = 1024;
const HOP: usize = 256;

// Envelope time constants. Attack rises fast enough to feel immediate at
// 60 Hz; release is slow enough that the scalar never flickers at hop rate.
const ATTACK_SECONDS: f32 = 0.045;
const RELEASE_SECONDS: f32 = 0.350;

#[derive(Debug, Clone, Copy)]
pub struct ReactivitySample {
    pub scalar: f32,
    pub bands: [f32; BAND_COUNT],
    pub timestamp: f32,
}

impl ReactivitySample {
    pub const SILENT: Self = Self {
        scalar: 0.0,
        bands: [0.0; BAND_COUNT],
        timestamp: 0.0,
    };
}

impl Default for ReactivitySample {
    fn default() -> Self {
        Self::SILENT
    }
}

/// Lock-free single-writer snapshot of the latest sample. The sequence
/// counter is odd while a store is in progress; readers retry on tears.
pub struct ReactivityCell {
    seq: AtomicU64,
    scalar: AtomicU32,
    bands: [AtomicU32; BAND_COUNT],
    timestamp: AtomicU32,
    updated_ms: AtomicU64,
    epoch: Instant,
}

impl ReactivityCell {
    pub fn new() -> Self {
        Self {
            seq: AtomicU64::new(0),
            scalar: AtomicU32::new(0),
            bands: std::array::from_fn(|_| AtomicU32::new(0)),
            timestamp: AtomicU32::new(0),
            updated_ms: AtomicU64::new(0),
            epoch: Instant::now(),
        }
    }

    pub fn store(&self, s: ReactivitySample) {
        self.seq.fetch_add(1, Ordering::Release); // odd => write in progress
        self.scalar.store(s.scalar.to_bits(), Ordering::Relaxed);
        for (dst, src) in self.bands.iter().zip(s.bands) {
            dst.store(src.to_bits(), Ordering::Relaxed);
        }
        self.timestamp
            .store(s.timestamp.to_bits(), Ordering::Relaxed);
        self.updated_ms
            .store(self.epoch.elapsed().as_millis() as u64, Ordering::Relaxed);
        self.seq.fetch_add(1, Ordering::Release); // even => stable
    }

    pub fn load(&self) -> ReactivitySample {
        loop {
            let v1 = self.seq.load(Ordering::Acquire);
            if v1 & 1 == 1 {
                continue;
            }

            let scalar = f32::from_bits(self.scalar.load(Ordering::Relaxed));
            let mut bands = [0.0f32; BAND_COUNT];
            for (i, src) in self.bands.iter().enumerate() {
                bands[i] = f32::from_bits(src.load(Ordering::Relaxed));
            }
            let timestamp = f32::from_bits(self.timestamp.load(Ordering::Relaxed));

            let v2 = self.seq.load(Ordering::Acquire);
            if v1 == v2 {
                return ReactivitySample {
                    scalar,
                    bands,
                    timestamp,
                };
            }
        }
    }

    /// Milliseconds since the last store; 0 before the first store.
    pub fn age_ms(&self) -> f32 {
        let t = self.updated_ms.load(Ordering::Relaxed);
        if t == 0 {
            return 0.0;
        }
        (self.epoch.elapsed().as_millis() as u64).saturating_sub(t) as f32
    }
}

impl Default for ReactivityCell {
    fn default() -> Self {
        Self::new()
    }
}

pub fn list_input_devices() -> anyhow::Result<()> {
    let host = cpal::default_host();
    let devices = host.input_devices().context("enumerate input devices")?;

    let mut out = io::stdout();
    writeln!(out, "Input devices:")?;
    for dev in devices {
        let name = dev.name().unwrap_or_else(|_| "<unknown>".to_string());
        writeln!(out, "  - {}", name)?;
    }
    Ok(())
}

enum SignalBackend {
    Capture(cpal::Stream),
    Demo(Option<thread::JoinHandle<()>>),
}

pub struct AudioSystem {
    backend: SignalBackend,
    stop: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    gain: Arc<AtomicU32>,
    analyzer_handle: Option<thread::JoinHandle<()>>,
    cell: Arc<ReactivityCell>,
    pub sample_rate_hz: u32,
    pub source_label: String,
}

impl AudioSystem {
    pub fn new(
        source: SignalSource,
        device_query: Option<&str>,
        track: &DemoTrack,
    ) -> anyhow::Result<Self> {
        match source {
            SignalSource::Demo => Self::new_demo(track),
            SignalSource::Mic => Self::new_mic(device_query),
        }
    }

    fn new_mic(device_query: Option<&str>) -> anyhow::Result<Self> {
        let host = cpal::default_host();
        let device = select_input_device(&host, device_query)?;
        let supported = device
            .default_input_config()
            .context("get default input config")?;
        let sample_rate_hz = supported.sample_rate().0;
        let channels = supported.channels() as usize;
        let config: cpal::StreamConfig = supported.clone().into();
        let label = device.name().unwrap_or_else(|_| "mic".to_string());

        let rb_capacity = (sample_rate_hz as usize).saturating_mul(4);
        let rb = HeapRb::<f32>::new(rb_capacity);
        let (mut prod, cons) = rb.split();

        let shared = SharedState::new();
        let err_fn = |err| eprintln!("audio stream error: {err}");

        let stream = match supported.sample_format() {
            SampleFormat::F32 => device.build_input_stream(
                &config,
                move |data: &[f32], _| push_interleaved(data, channels, &mut prod),
                err_fn,
                None,
            )?,
            SampleFormat::I16 => device.build_input_stream(
                &config,
                move |data: &[i16], _| push_interleaved(data, channels, &mut prod),
                err_fn,
                None,
            )?,
            SampleFormat::U16 => device.build_input_stream(
                &config,
                move |data: &[u16], _| push_interleaved(data, channels, &mut prod),
                err_fn,
                None,
            )?,
            fmt => return Err(anyhow!("unsupported sample format: {fmt:?}")),
        };

        stream.play().context("start input stream")?;

        let analyzer_handle = shared.spawn_analyzer(cons, sample_rate_hz);

        Ok(Self {
            backend: SignalBackend::Capture(stream),
            stop: shared.stop,
            paused: shared.paused,
            gain: shared.gain,
            analyzer_handle: Some(analyzer_handle),
            cell: shared.cell,
            sample_rate_hz,
            source_label: label,
        })
    }

    fn new_demo(track: &DemoTrack) -> anyhow::Result<Self> {
        let sample_rate_hz = 48_000u32;

        let rb_capacity = (sample_rate_hz as usize).saturating_mul(4);
        let rb = HeapRb::<f32>::new(rb_capacity);
        let (mut prod, cons) = rb.split();

        let shared = SharedState::new();
        let mut synth = TrackSynth::new(track, sample_rate_hz);
        let stop_for_producer = Arc::clone(&shared.stop);
        let paused_for_producer = Arc::clone(&shared.paused);

        // Real-time paced producer; the analyzer sees the same ring a
        // capture stream would feed.
        let producer_handle = thread::spawn(move || {
            const CHUNK: usize = 512;
            let mut buf = [0.0f32; CHUNK];
            let chunk_dur = Duration::from_secs_f64(CHUNK as f64 / sample_rate_hz as f64);
            let mut next = Instant::now();
            while !stop_for_producer.load(Ordering::Relaxed) {
                if paused_for_producer.load(Ordering::Relaxed) {
                    thread::sleep(Duration::from_millis(10));
                    next = Instant::now();
                    continue;
                }
                synth.fill(&mut buf);
                for &s in &buf {
                    let _ = prod.try_push(s);
                }
                next += chunk_dur;
                let now = Instant::now();
                if next > now {
                    thread::sleep(next - now);
                } else {
                    next = now;
                }
            }
        });

        let analyzer_handle = shared.spawn_analyzer(cons, sample_rate_hz);

        Ok(Self {
            backend: SignalBackend::Demo(Some(producer_handle)),
            stop: shared.stop,
            paused: shared.paused,
            gain: shared.gain,
            analyzer_handle: Some(analyzer_handle),
            cell: shared.cell,
            sample_rate_hz,
            source_label: track.title.to_string(),
        })
    }

    pub fn cell(&self) -> Arc<ReactivityCell> {
        Arc::clone(&self.cell)
    }

    pub fn snapshot(&self) -> ReactivitySample {
        self.cell.load()
    }

    pub fn signal_age_ms(&self) -> f32 {
        self.cell.age_ms()
    }

    pub fn set_paused(&self, on: bool) {
        self.paused.store(on, Ordering::Relaxed);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    pub fn toggle_paused(&self) {
        self.set_paused(!self.is_paused());
    }

    pub fn set_gain(&self, gain: f32) {
        let g = if gain.is_finite() {
            gain.clamp(0.0, 8.0)
        } else {
            1.0
        };
        self.gain.store(g.to_bits(), Ordering::Relaxed);
    }

    pub fn gain(&self) -> f32 {
        f32::from_bits(self.gain.load(Ordering::Relaxed))
    }
}

impl Drop for AudioSystem {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(h) = self.analyzer_handle.take() {
            let _ = h.join();
        }

        match &mut self.backend {
            // The capture stream stays alive for the full AudioSystem
            // lifetime; dropping it here stops the callbacks.
            SignalBackend::Capture(_stream) => {}
            SignalBackend::Demo(handle) => {
                if let Some(h) = handle.take() {
                    let _ = h.join();
                }
            }
        }
    }
}

struct SharedState {
    stop: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    gain: Arc<AtomicU32>,
    cell: Arc<ReactivityCell>,
}

impl SharedState {
    fn new() -> Self {
        Self {
            stop: Arc::new(AtomicBool::new(false)),
            paused: Arc::new(AtomicBool::new(false)),
            gain: Arc::new(AtomicU32::new(1.0f32.to_bits())),
            cell: Arc::new(ReactivityCell::new()),
        }
    }

    fn spawn_analyzer(
        &self,
        mut cons: ringbuf::HeapCons<f32>,
        sample_rate_hz: u32,
    ) -> thread::JoinHandle<()> {
        let stop = Arc::clone(&self.stop);
        let paused = Arc::clone(&self.paused);
        let gain = Arc::clone(&self.gain);
        let cell = Arc::clone(&self.cell);
        thread::spawn(move || analyze_loop(&mut cons, sample_rate_hz, &stop, &paused, &gain, &cell))
    }
}

fn select_input_device(
    host: &cpal::Host,
    device_query: Option<&str>,
) -> anyhow::Result<cpal::Device> {
    let devices = host
        .input_devices()
        .context("enumerate input devices")?
        .collect::<Vec<_>>();

    let want = device_query.map(|s| s.to_lowercase());
    if let Some(want) = want.as_deref() {
        if let Some(dev) = devices.iter().find(|d| {
            d.name()
                .map(|n| n.to_lowercase().contains(want))
                .unwrap_or(false)
        }) {
            return Ok(dev.clone());
        }
        return Err(anyhow!("no input device matching: {want}"));
    }

    host.default_input_device()
        .ok_or_else(|| anyhow!("no default input device found"))
}

fn push_interleaved<T: Sample<Float = f32> + Copy>(
    data: &[T],
    channels: usize,
    prod: &mut ringbuf::HeapProd<f32>,
) {
    for frame in data.chunks(channels) {
        let mut acc = 0.0f32;
        for s in frame {
            acc += (*s).to_float_sample();
        }
        let mono = acc / channels as f32;
        let _ = prod.try_push(mono);
    }
}

/// Attack/release envelope. Rising input is tracked with the fast constant,
/// falling input with the slow one; an exact-zero target settles to exact 0
/// so silence is a true steady state, not an asymptote.
#[derive(Debug, Clone, Copy, Default)]
struct Envelope {
    value: f32,
}

impl Envelope {
    fn feed(&mut self, target: f32, dt: f32) -> f32 {
        let tau = if target > self.value {
            ATTACK_SECONDS
        } else {
            RELEASE_SECONDS
        };
        let k = 1.0 - (-dt / tau.max(1e-4)).exp();
        self.value += (target - self.value) * k;
        if target == 0.0 && self.value < 1e-3 {
            self.value = 0.0;
        }
        self.value = self.value.clamp(0.0, 1.0);
        self.value
    }
}

fn scalar_target(rms: f32, gain: f32) -> f32 {
    (rms * 4.0 * gain).tanh().clamp(0.0, 1.0)
}

fn analyze_loop(
    cons: &mut ringbuf::HeapCons<f32>,
    sample_rate_hz: u32,
    stop: &AtomicBool,
    paused: &AtomicBool,
    gain: &AtomicU32,
    cell: &ReactivityCell,
) {
    let mut scratch = vec![0.0f32; WINDOW];
    let mut write_pos = 0usize;
    let mut filled = 0usize;
    let mut since_last = 0usize;

    let hann = hann_window(WINDOW);

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(WINDOW);
    let mut fft_buf = vec![Complex { re: 0.0, im: 0.0 }; WINDOW];
    let mut mags = vec![0.0f32; WINDOW / 2];

    let mut scalar_env = Envelope::default();
    let mut band_envs = [Envelope::default(); BAND_COUNT];

    let started = Instant::now();
    let hop_dt = HOP as f32 / sample_rate_hz as f32;
    let idle_tick = Duration::from_millis(4);

    while !stop.load(Ordering::Relaxed) {
        if paused.load(Ordering::Relaxed) {
            // Discard whatever arrives and release the envelopes to the
            // silent steady state; the timestamp keeps advancing.
            while cons.try_pop().is_some() {}
            let dt = idle_tick.as_secs_f32();
            let scalar = scalar_env.feed(0.0, dt);
            let mut bands = [0.0f32; BAND_COUNT];
            for (i, env) in band_envs.iter_mut().enumerate() {
                bands[i] = env.feed(0.0, dt);
            }
            cell.store(ReactivitySample {
                scalar,
                bands,
                timestamp: started.elapsed().as_secs_f32(),
            });
            thread::sleep(idle_tick);
            continue;
        }

        let mut got_any = false;
        while let Some(s) = cons.try_pop() {
            got_any = true;
            scratch[write_pos] = s;
            write_pos = (write_pos + 1) % WINDOW;
            if filled < WINDOW {
                filled += 1;
            }
            since_last += 1;
            if filled == WINDOW && since_last >= HOP {
                since_last = 0;
                let (rms, raw_bands) =
                    analyze_window(&scratch, write_pos, &hann, &fft, &mut fft_buf, &mut mags, sample_rate_hz);

                let g = f32::from_bits(gain.load(Ordering::Relaxed));
                let scalar = scalar_env.feed(scalar_target(rms, g), hop_dt);
                let mut bands = [0.0f32; BAND_COUNT];
                for (i, env) in band_envs.iter_mut().enumerate() {
                    bands[i] = env.feed(raw_bands[i], hop_dt);
                }

                cell.store(ReactivitySample {
                    scalar,
                    bands,
                    timestamp: started.elapsed().as_secs_f32(),
                });
            }
        }

        if !got_any {
            thread::sleep(Duration::from_millis(1));
        }
    }
}

fn hann_window(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| 0.5 - 0.5 * ((2.0 * PI * i as f32) / (n as f32)).cos())
        .collect()
}

fn analyze_window(
    scratch: &[f32],
    write_pos: usize,
    hann: &[f32],
    fft: &Arc<dyn rustfft::Fft<f32>>,
    fft_buf: &mut [Complex<f32>],
    mags: &mut [f32],
    sample_rate_hz: u32,
) -> (f32, [f32; BAND_COUNT]) {
    let n = fft_buf.len();
    let half = mags.len();

    let mut rms_acc = 0.0f32;
    for i in 0..n {
        let s = scratch[(write_pos + i) % n];
        rms_acc += s * s;
        fft_buf[i].re = s * hann[i];
        fft_buf[i].im = 0.0;
    }
    let rms = (rms_acc / n as f32).sqrt().clamp(0.0, 1.0);

    fft.process(fft_buf);
    for (i, c) in fft_buf.iter().take(half).enumerate() {
        mags[i] = (c.re * c.re + c.im * c.im).sqrt();
    }

    (rms, fold_bands(mags, n, sample_rate_hz))
}

/// Fold FFT magnitudes into the fixed band buckets. Bucket membership
/// depends only on bin frequency, so the mapping is stable frame to frame.
fn fold_bands(mags: &[f32], n: usize, sample_rate_hz: u32) -> [f32; BAND_COUNT] {
    let half = mags.len();
    let mut bands = [0.0f32; BAND_COUNT];
    let mut counts = [0u32; BAND_COUNT];
    let sr = sample_rate_hz as f32;

    for i in 1..half {
        let f = (i as f32) * sr / (n as f32);
        if f < BAND_EDGES_HZ[0] {
            continue;
        }
        if f >= BAND_EDGES_HZ[BAND_COUNT] {
            break;
        }
        let mut band = 0usize;
        while band + 1 < BAND_COUNT && f >= BAND_EDGES_HZ[band + 1] {
            band += 1;
        }
        bands[band] += mags[i];
        counts[band] += 1;
    }

    for i in 0..BAND_COUNT {
        let denom = counts[i].max(1) as f32;
        // Log-ish compression -> 0..1
        let e = (bands[i] / denom) * 0.01;
        bands[i] = e.tanh();
    }
    bands
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_edges_ascend() {
        for pair in BAND_EDGES_HZ.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn hann_window_is_symmetric_and_bounded() {
        let w = hann_window(WINDOW);
        assert_eq!(w.len(), WINDOW);
        assert!(w[0].abs() < 1e-6);
        for (i, v) in w.iter().enumerate() {
            assert!((0.0..=1.0).contains(v), "w[{i}] = {v}");
        }
        for i in 1..WINDOW / 2 {
            assert!((w[i] - w[WINDOW - i]).abs() < 1e-4);
        }
    }

    #[test]
    fn envelope_attacks_faster_than_it_releases() {
        let mut env = Envelope::default();
        let after_attack = env.feed(1.0, 0.05);
        assert!(after_attack > 0.5);

        let mut env = Envelope { value: 1.0 };
        let after_release = env.feed(0.1, 0.05);
        assert!(after_release > 0.8, "release dropped too fast: {after_release}");
    }

    #[test]
    fn envelope_settles_to_exact_zero_on_silence() {
        let mut env = Envelope { value: 0.4 };
        for _ in 0..2000 {
            env.feed(0.0, 0.005);
        }
        assert_eq!(env.value, 0.0);
    }

    #[test]
    fn fold_bands_is_deterministic() {
        let mags: Vec<f32> = (0..WINDOW / 2).map(|i| (i % 37) as f32 * 0.3).collect();
        let a = fold_bands(&mags, WINDOW, 48_000);
        let b = fold_bands(&mags, WINDOW, 48_000);
        assert_eq!(a, b);
        for v in a {
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn scalar_target_clamps_and_saturates() {
        assert_eq!(scalar_target(0.0, 1.0), 0.0);
        assert!(scalar_target(10.0, 4.0) <= 1.0);
        assert!(scalar_target(0.2, 1.0) > 0.0);
    }

    #[test]
    fn cell_round_trips_latest_sample() {
        let cell = ReactivityCell::new();
        let mut bands = [0.0f32; BAND_COUNT];
        bands[3] = 0.75;
        cell.store(ReactivitySample {
            scalar: 0.5,
            bands,
            timestamp: 1.25,
        });
        let got = cell.load();
        assert_eq!(got.scalar, 0.5);
        assert_eq!(got.bands[3], 0.75);
        assert_eq!(got.timestamp, 1.25);
    }
}
