//! CPU renderer for procedurally generated color fields.
//!
//! A [`ShaderBinding`] pairs a compiled program with one surface and keeps the
//! surface uniforms current. Animation is driven by a [`FrameClock`] that a
//! [`RefreshDriver`] ticks at a fixed rate:
//!
//! ```text
//!   RefreshDriver ──▶ FrameClock::deliver ──▶ on_tick(elapsed)
//!                                                 │
//!                                                 ▼
//!                         ShaderBinding::on_frame(elapsed)
//!                           │  set iTime (never decreasing)
//!                           └─▶ program.evaluate(x, y) per pixel (rayon rows)
//!                                                 │
//!                                                 ▼
//!                                    PixelBuffer ──▶ export::write_png
//! ```
//!
//! [`presets`] bundles the named sample programs, and [`wave`] holds the
//! native reference for the `wave-bands` preset.

pub mod binding;
pub mod clock;
pub mod export;
pub mod presets;
pub mod runtime;
pub mod types;
pub mod wave;

pub use binding::{ShaderBinding, SurfaceUniforms};
pub use clock::{FrameClock, FrameRegistration, RefreshDriver};
pub use export::{write_png, ExportError};
pub use presets::Preset;
pub use runtime::{run, RenderPolicy, RunReport, TimeSample};
pub use types::{PixelBuffer, RenderFrame, SurfaceSize};
