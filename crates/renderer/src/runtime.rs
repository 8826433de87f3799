use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::bounded;
use tracing::{debug, info};

use crate::binding::ShaderBinding;
use crate::clock::{refresh_interval, FrameClock, RefreshDriver};
use crate::types::{PixelBuffer, RenderFrame};

/// High-level behaviour requested by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderPolicy {
    /// Drive the binding from a frame clock refreshed `fps` times a second,
    /// stopping after `frames` frames.
    Animate { fps: f32, frames: u64 },
    /// Render a single frame at a fixed timestamp (seconds).
    Still { time: f32 },
}

impl Default for RenderPolicy {
    fn default() -> Self {
        Self::Still { time: 0.0 }
    }
}

impl RenderPolicy {
    /// Animation covering `duration` at `fps`, rounded up to whole frames.
    pub fn animate_for(fps: f32, duration: Duration) -> Result<Self> {
        refresh_interval(fps)?;
        let frames = (duration.as_secs_f64() * f64::from(fps)).ceil().max(1.0) as u64;
        Ok(Self::Animate { fps, frames })
    }

    pub fn frame_count(&self) -> u64 {
        match self {
            RenderPolicy::Animate { frames, .. } => *frames,
            RenderPolicy::Still { .. } => 1,
        }
    }
}

/// Time state handed to frame sinks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSample {
    /// Elapsed time the frame was rendered at, in seconds.
    pub seconds: f32,
    /// Zero-based index of the frame within the run.
    pub frame_index: u64,
}

impl TimeSample {
    pub fn new(seconds: f32, frame_index: u64) -> Self {
        Self {
            seconds,
            frame_index,
        }
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunReport {
    pub frames: u64,
    /// Timestamp of the last frame rendered.
    pub last_time: f32,
    /// Wall-clock time the run took.
    pub wall_time: Duration,
}

/// Renders frames from `binding` according to `policy`, handing each to `sink`.
///
/// `Still` renders one frame on the calling thread. `Animate` registers the
/// binding with a [`FrameClock`] fed by a [`RefreshDriver`] and blocks until
/// the requested number of frames has been delivered or `sink` fails.
pub fn run<S>(binding: ShaderBinding, policy: &RenderPolicy, sink: S) -> Result<RunReport>
where
    S: FnMut(TimeSample, &RenderFrame, &PixelBuffer) -> Result<()> + Send + 'static,
{
    match *policy {
        RenderPolicy::Still { time } => run_still(binding, time, sink),
        RenderPolicy::Animate { fps, frames } => run_animation(binding, fps, frames, sink),
    }
}

fn run_still<S>(mut binding: ShaderBinding, time: f32, mut sink: S) -> Result<RunReport>
where
    S: FnMut(TimeSample, &RenderFrame, &PixelBuffer) -> Result<()>,
{
    let started = Instant::now();
    let (frame, pixels) = binding.render_frame(time);
    sink(TimeSample::new(frame.timestamp, 0), &frame, &pixels)?;
    Ok(RunReport {
        frames: 1,
        last_time: frame.timestamp,
        wall_time: started.elapsed(),
    })
}

fn run_animation<S>(mut binding: ShaderBinding, fps: f32, frames: u64, mut sink: S) -> Result<RunReport>
where
    S: FnMut(TimeSample, &RenderFrame, &PixelBuffer) -> Result<()> + Send + 'static,
{
    if frames == 0 {
        return Err(anyhow!("animation needs at least one frame"));
    }
    let started = Instant::now();
    let clock = FrameClock::new();
    let (done_tx, done_rx) = bounded::<Result<f32>>(1);

    let mut rendered = 0u64;
    let mut finished = false;
    let registration = clock.start(move |elapsed| {
        if finished {
            return;
        }
        let (frame, pixels) = binding.render_frame(elapsed);
        let sample = TimeSample::new(frame.timestamp, rendered);
        debug!(
            frame = rendered,
            time = frame.timestamp,
            width = frame.surface_width,
            height = frame.surface_height,
            "frame delivered"
        );
        let outcome = sink(sample, &frame, &pixels);
        rendered += 1;
        let result = match outcome {
            Err(err) => Some(Err(err.context(format!("frame {} sink failed", sample.frame_index)))),
            Ok(()) if rendered >= frames => Some(Ok(frame.timestamp)),
            Ok(()) => None,
        };
        if let Some(result) = result {
            finished = true;
            let _ = done_tx.send(result);
        }
    });

    let driver = RefreshDriver::spawn(clock.clone(), fps)?;
    let outcome = done_rx
        .recv()
        .context("frame clock stopped before the animation finished");
    driver.stop();
    registration.stop();

    let last_time = outcome??;
    let report = RunReport {
        frames,
        last_time,
        wall_time: started.elapsed(),
    };
    info!(
        frames = report.frames,
        last_time = report.last_time,
        wall_ms = report.wall_time.as_millis() as u64,
        "animation finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    const CLOCK: &str = "uniform float iTime;\nhalf4 main(float2 p) { return half4(iTime, 0.0, 0.0, 1.0); }";

    #[test]
    fn animate_for_rounds_up_to_whole_frames() {
        let policy = RenderPolicy::animate_for(30.0, Duration::from_millis(1010)).unwrap();
        assert_eq!(policy, RenderPolicy::Animate { fps: 30.0, frames: 31 });
        assert!(RenderPolicy::animate_for(0.0, Duration::from_secs(1)).is_err());
    }

    #[test]
    fn still_policy_renders_one_frame_at_the_requested_time() {
        let binding = ShaderBinding::new(CLOCK, 2, 2).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let report = run(binding, &RenderPolicy::Still { time: 0.75 }, move |sample, _, pixels| {
            sink_seen.lock().unwrap().push((sample, pixels.get(0, 0)));
            Ok(())
        })
        .unwrap();
        assert_eq!(report.frames, 1);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, TimeSample::new(0.75, 0));
        assert_eq!(seen[0].1.map(|c| c.r), Some(0.75));
    }

    #[test]
    fn animation_delivers_increasing_time_starting_at_zero() {
        let binding = ShaderBinding::new(CLOCK, 1, 1).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let policy = RenderPolicy::Animate { fps: 120.0, frames: 4 };
        let report = run(binding, &policy, move |sample, _, pixels| {
            let red = pixels.get(0, 0).map(|c| c.r).unwrap_or(f32::NAN);
            sink_seen.lock().unwrap().push((sample, red));
            Ok(())
        })
        .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(report.frames, 4);
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0].0.seconds, 0.0);
        for (index, (sample, red)) in seen.iter().enumerate() {
            assert_eq!(sample.frame_index, index as u64);
            assert_eq!(*red, sample.seconds);
        }
        assert!(seen.windows(2).all(|pair| pair[1].0.seconds > pair[0].0.seconds));
        assert_eq!(report.last_time, seen[3].0.seconds);
    }

    #[test]
    fn sink_errors_end_the_animation() {
        let binding = ShaderBinding::new(CLOCK, 1, 1).unwrap();
        let policy = RenderPolicy::Animate { fps: 120.0, frames: 100 };
        let err = run(binding, &policy, |sample, _, _| {
            if sample.frame_index == 1 {
                Err(anyhow!("disk full"))
            } else {
                Ok(())
            }
        })
        .unwrap_err();
        assert!(format!("{err:#}").contains("disk full"));
    }
}
