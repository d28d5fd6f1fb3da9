//! The effect chain: parameters in, interleaved audio through.

use log::{debug, info, warn};

use crate::{
    dsp::{lfo::LfoWaveform, math::sanitize, smoother::SmootherBank},
    error::{ArenaError, EngineError},
    fx::{DiffusionReverb, Frame, GrainCloud, PitchShifter, Stage, TextureDiffuser},
    message::{ControlMessage, MessageReceiver},
    modulation::{LfoDestination, ModulationHub, ModulationSink},
    params::{LfoControl, ParamId, DEFAULT_VALUES, PARAM_COUNT},
    preset::Preset,
    ACTIVE_THRESHOLD, MAX_BLOCK_SIZE, OUTPUT_LIMIT, SAMPLE_RATE, SAMPLE_RATE_HZ,
    SMOOTHING_COEFFICIENT,
};

/*
Pipeline
========

Interleaved host audio is cut into sub-blocks of at most 64 frames. Each
sub-block runs:

    1. smoothers   every smoothed slot steps once; values go to the stages
    2. modulation  both LFOs step once; offsets land on smoother targets
    3. flags       texture / grain / shift run only above 0.001 amount
    4. stages      reverb → diffuser → grains → pitch shifter, in place;
                   a bypassed grain stage still records into its buffer
    5. output      NaN/inf → 0, clamp to ±1

Control work therefore happens at a fixed rate of one update per 64 frames
(or fewer, at the end of a host block), whatever block size the host uses.

Channels
--------

Mono input feeds both sides; mono output is the average of both sides.
Channels beyond the second are ignored on input and written silent.

Lifecycle
---------

    new()      parameters at defaults, no stage memory, not ready
    init()     check the rate, allocate every stage, settle the smoothers
    process()  before init (or after teardown) audio passes straight through
    suspend()  forget reverb, diffuser and shifter history; the grain
               buffer survives so frozen material is still there on resume
    reset()    defaults, all memory cleared, LFOs restarted
*/

/// Start-up configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Must be [`SAMPLE_RATE_HZ`].
    pub sample_rate: u32,
    /// Seeds the grain scheduler and the random LFO shapes.
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE_HZ,
            seed: 0x5EED,
        }
    }
}

/// Which optional stages ran in the most recent sub-block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActiveStages {
    pub diffuser: bool,
    pub granular: bool,
    pub shifter: bool,
}

struct Stages {
    reverb: DiffusionReverb,
    diffuser: TextureDiffuser,
    granular: GrainCloud,
    shifter: PitchShifter,
}

impl Stages {
    fn new(seed: u64) -> Result<Self, ArenaError> {
        Ok(Self {
            reverb: DiffusionReverb::new()?,
            diffuser: TextureDiffuser::new()?,
            granular: GrainCloud::new(seed),
            shifter: PitchShifter::new()?,
        })
    }

    /// Step every smoother once and hand the values to their stages.
    fn pull_smoothed(&mut self, smoothers: &mut SmootherBank<PARAM_COUNT>) -> ActiveStages {
        let mut next = |id: ParamId| smoothers.process(id.index());

        self.reverb.set_amount(next(ParamId::DryWet));
        self.reverb.set_time(next(ParamId::Time));
        self.reverb.set_diffusion(next(ParamId::Diffusion));
        self.reverb.set_lp(next(ParamId::LpDamp));
        self.reverb.set_input_gain(next(ParamId::InputGain));

        let texture = next(ParamId::Texture);
        self.diffuser.set_amount(texture);

        let grain_amount = next(ParamId::GrainAmount);
        self.granular.set_amount(grain_amount);
        self.granular.set_size(next(ParamId::GrainSize));
        self.granular.set_density(next(ParamId::GrainDensity));
        self.granular.set_pitch(next(ParamId::GrainPitch));

        let shift_amount = next(ParamId::ShiftAmount);
        self.shifter.set_amount(shift_amount);
        self.shifter.set_pitch(next(ParamId::ShiftPitch));
        self.shifter.set_size(next(ParamId::ShiftSize));

        ActiveStages {
            diffuser: texture > ACTIVE_THRESHOLD,
            granular: grain_amount > ACTIVE_THRESHOLD,
            shifter: shift_amount > ACTIVE_THRESHOLD,
        }
    }

    fn render(&mut self, block: &mut [Frame], active: ActiveStages) {
        self.reverb.render_block(block);
        if active.diffuser {
            self.diffuser.render_block(block);
        }
        if active.granular {
            self.granular.render_block(block);
        } else {
            self.granular.record_block(block);
        }
        if active.shifter {
            self.shifter.render_block(block);
        }
    }
}

/// Where a slot's value goes once it changes, nominal or modulated.
struct ControlSurface<'a> {
    raw: &'a [i32; PARAM_COUNT],
    smoothers: &'a mut SmootherBank<PARAM_COUNT>,
    granular: Option<&'a mut GrainCloud>,
}

impl ModulationSink for ControlSurface<'_> {
    fn nominal(&self, param: ParamId) -> f32 {
        self.raw[param.index()] as f32
    }

    fn apply(&mut self, param: ParamId, raw: f32) {
        if param.is_smoothed() {
            self.smoothers.set_target(param.index(), param.map(raw));
            return;
        }
        // Grain position is stepped straight into the stage, unsmoothed
        if param == ParamId::GrainPosition {
            if let Some(granular) = self.granular.as_deref_mut() {
                granular.set_position(param.map(raw));
            }
        }
    }
}

pub struct Pipeline {
    config: EngineConfig,
    raw: [i32; PARAM_COUNT],
    smoothers: SmootherBank<PARAM_COUNT>,
    hub: ModulationHub,
    stages: Option<Stages>,
    ready: bool,
    active: ActiveStages,
    work: [Frame; MAX_BLOCK_SIZE],
}

impl Pipeline {
    pub fn new(config: EngineConfig) -> Self {
        let mut pipeline = Self {
            config,
            raw: DEFAULT_VALUES,
            smoothers: SmootherBank::new([0.0; PARAM_COUNT], SMOOTHING_COEFFICIENT),
            hub: ModulationHub::new(SAMPLE_RATE, config.seed),
            stages: None,
            ready: false,
            active: ActiveStages::default(),
            work: [Frame::SILENCE; MAX_BLOCK_SIZE],
        };
        pipeline.sync_from_raw();
        pipeline
    }

    /// Allocate and prepare every stage. The only allocating call.
    pub fn init(&mut self) -> Result<(), EngineError> {
        if self.config.sample_rate != SAMPLE_RATE_HZ {
            warn!(
                "rejecting sample rate {} Hz, only {} Hz is supported",
                self.config.sample_rate, SAMPLE_RATE_HZ
            );
            return Err(EngineError::UnsupportedSampleRate(self.config.sample_rate));
        }

        self.stages = Some(Stages::new(self.config.seed)?);
        self.sync_from_raw();
        self.ready = true;
        info!(
            "effect chain initialised at {} Hz (seed {:#x})",
            self.config.sample_rate, self.config.seed
        );
        Ok(())
    }

    /// Stop processing; audio passes through until the next `init`.
    pub fn teardown(&mut self) {
        self.ready = false;
        info!("effect chain torn down");
    }

    /// Defaults everywhere, all audio memory cleared.
    pub fn reset(&mut self) {
        self.reset_state();
        info!("effect chain reset to defaults");
    }

    /// Clear reverb, diffuser and shifter memory. The grain buffer is kept.
    pub fn suspend(&mut self) {
        if let Some(stages) = self.stages.as_mut() {
            stages.reverb.clear();
            stages.diffuser.clear();
            stages.shifter.clear();
        }
        debug!("suspended");
    }

    pub fn resume(&mut self) {
        debug!("resumed");
    }

    pub fn is_ready(&self) -> bool {
        self.ready && self.stages.is_some()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Process `frames` interleaved frames.
    ///
    /// Channel counts of 1 or 2 are resolved by duplicating mono input or
    /// averaging to mono output. Frames that don't fit `output` are
    /// skipped; missing input reads as silence.
    pub fn process(
        &mut self,
        input: &[f32],
        output: &mut [f32],
        frames: usize,
        in_channels: usize,
        out_channels: usize,
    ) {
        if out_channels == 0 {
            return;
        }
        let frames = frames.min(output.len() / out_channels);
        let ready = self.is_ready();

        let mut done = 0;
        while done < frames {
            let len = (frames - done).min(MAX_BLOCK_SIZE);

            for (i, frame) in self.work[..len].iter_mut().enumerate() {
                *frame = read_frame(input, done + i, in_channels);
            }
            if ready {
                self.render_sub_block(len);
            }
            for (i, frame) in self.work[..len].iter().enumerate() {
                write_frame(output, done + i, out_channels, *frame);
            }

            done += len;
        }
    }

    /// Process non-interleaved stereo frames in place.
    pub fn process_frames(&mut self, frames: &mut [Frame]) {
        let ready = self.is_ready();
        for chunk in frames.chunks_mut(MAX_BLOCK_SIZE) {
            let len = chunk.len();
            self.work[..len].copy_from_slice(chunk);
            if ready {
                self.render_sub_block(len);
            }
            for (out, frame) in chunk.iter_mut().zip(self.work[..len].iter()) {
                *out = Frame::new(limit(frame.l), limit(frame.r));
            }
        }
    }

    fn render_sub_block(&mut self, len: usize) {
        let Some(stages) = self.stages.as_mut() else {
            return;
        };

        let active = stages.pull_smoothed(&mut self.smoothers);

        let mut surface = ControlSurface {
            raw: &self.raw,
            smoothers: &mut self.smoothers,
            granular: Some(&mut stages.granular),
        };
        self.hub.process(len, &mut surface);

        self.active = active;
        stages.render(&mut self.work[..len], active);
    }

    /// Set a raw parameter value. Unknown ids are ignored, values clamped.
    pub fn set_parameter(&mut self, id: u8, value: i32) {
        let Some(param) = ParamId::from_index(id) else {
            return;
        };
        let raw = param.clamp(value);
        self.raw[param.index()] = raw;
        self.route(param, raw);
    }

    /// Raw value of a slot; 0 for unknown ids.
    pub fn parameter_value(&self, id: u8) -> i32 {
        ParamId::from_index(id).map_or(0, |p| self.raw[p.index()])
    }

    /// Display label for enum-valued slots (LFO destination and waveform).
    pub fn parameter_label(&self, id: u8, value: i32) -> Option<&'static str> {
        ParamId::from_index(id).and_then(|p| p.value_label(value))
    }

    pub fn load_preset(&mut self, preset: &Preset) {
        self.load_values(&preset.values);
        debug!("loaded preset {:?}", preset.name);
    }

    fn load_values(&mut self, values: &[i32; PARAM_COUNT]) {
        for (id, &value) in values.iter().enumerate() {
            self.set_parameter(id as u8, value);
        }
    }

    /// Apply every pending control message. Never blocks.
    pub fn drain_messages<R: MessageReceiver + ?Sized>(&mut self, rx: &mut R) -> usize {
        let mut count = 0;
        while let Some(msg) = rx.pop() {
            match msg {
                ControlMessage::SetParameter { id, value } => self.set_parameter(id, value),
                ControlMessage::LoadPreset(values) => self.load_values(&values),
                ControlMessage::Reset => self.reset_state(),
            }
            count += 1;
        }
        count
    }

    /// Stages that ran in the most recent sub-block.
    pub fn active_stages(&self) -> ActiveStages {
        self.active
    }

    /// Current (smoothed) value of a smoothed slot.
    pub fn smoothed_value(&self, param: ParamId) -> Option<f32> {
        if !param.is_smoothed() {
            return None;
        }
        self.smoothers.get(param.index()).map(|s| s.value())
    }

    pub fn modulation(&self) -> &ModulationHub {
        &self.hub
    }

    pub fn grain_cloud(&self) -> Option<&GrainCloud> {
        self.stages.as_ref().map(|s| &s.granular)
    }

    /// Times the reverb has reset non-finite damping state.
    pub fn reverb_recoveries(&self) -> u32 {
        self.stages.as_ref().map_or(0, |s| s.reverb.recoveries())
    }

    fn reset_state(&mut self) {
        self.raw = DEFAULT_VALUES;
        self.hub.reset();
        if let Some(stages) = self.stages.as_mut() {
            stages.reverb.clear();
            stages.diffuser.clear();
            stages.granular.clear();
            stages.shifter.clear();
        }
        self.sync_from_raw();
    }

    /// Push one slot's nominal value to wherever it lives.
    fn route(&mut self, param: ParamId, raw: i32) {
        if let Some((lfo, control)) = param.lfo_control() {
            match control {
                LfoControl::Destination => {
                    self.hub.set_destination(lfo, LfoDestination::from_index(raw))
                }
                LfoControl::Speed => self.hub.set_speed(lfo, raw as f32),
                LfoControl::Depth => self.hub.set_depth(lfo, param.map(raw as f32)),
                LfoControl::Waveform => self.hub.set_waveform(lfo, LfoWaveform::from_index(raw)),
            }
            return;
        }

        if param == ParamId::Freeze {
            if let Some(stages) = self.stages.as_mut() {
                stages.granular.set_freeze(raw != 0);
            }
            return;
        }

        let mut surface = ControlSurface {
            raw: &self.raw,
            smoothers: &mut self.smoothers,
            granular: self.stages.as_mut().map(|s| &mut s.granular),
        };
        surface.apply(param, raw as f32);
    }

    /// Route every slot and settle all smoothing, so the chain starts at
    /// its targets instead of gliding toward them.
    fn sync_from_raw(&mut self) {
        for param in ParamId::all() {
            let raw = self.raw[param.index()];
            self.route(param, raw);
            if param.is_smoothed() {
                self.smoothers.snap(param.index(), param.map(raw as f32));
            }
        }
        if let Some(stages) = self.stages.as_mut() {
            self.active = stages.pull_smoothed(&mut self.smoothers);
            stages.shifter.settle_window();
        }
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[inline]
fn limit(x: f32) -> f32 {
    sanitize(x).clamp(-OUTPUT_LIMIT, OUTPUT_LIMIT)
}

#[inline]
fn read_frame(input: &[f32], index: usize, channels: usize) -> Frame {
    let sample = |i: usize| input.get(i).copied().unwrap_or(0.0);
    match channels {
        0 => Frame::SILENCE,
        1 => Frame::mono(sample(index)),
        _ => {
            let base = index * channels;
            Frame::new(sample(base), sample(base + 1))
        }
    }
}

#[inline]
fn write_frame(output: &mut [f32], index: usize, channels: usize, frame: Frame) {
    let base = index * channels;
    let slots = &mut output[base..base + channels];
    match slots {
        [mono] => *mono = limit((frame.l + frame.r) * 0.5),
        [l, r, rest @ ..] => {
            *l = limit(frame.l);
            *r = limit(frame.r);
            rest.fill(0.0);
        }
        [] => {}
    }
}
