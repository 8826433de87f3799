//! Bundled shader programs, addressable by name.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use shaderprog::{compile, CompileError, Rgba, ShaderError, ShaderProgram, UniformStore, UniformValue};

pub const SOLID_SOURCE: &str = r#"// Constant magenta.
half4 main(float2 fragCoord) {
    return half4(1, 0, 1, 1);
}
"#;

pub const UNIFORM_COLOR_SOURCE: &str = r#"// Fills the surface with the iColor uniform.
uniform half4 iColor;

half4 main(float2 fragCoord) {
    return iColor;
}
"#;

pub const GRADIENT_SOURCE: &str = r#"// Green grows left to right, blue top to bottom.
uniform float2 iResolution;

half4 main(float2 fragCoord) {
    float2 scaled = fragCoord / iResolution.xy;
    return half4(0, scaled, 1);
}
"#;

pub const BOUNCE_SOURCE: &str = r#"// Red and green bounce between 0 and 1 once per iDuration seconds.
uniform float2 iResolution;
uniform float iTime;
uniform float iDuration;

half4 main(in float2 fragCoord) {
    float2 scaled = abs(1.0 - mod(fragCoord / iResolution.xy + iTime / (iDuration / 2.0), 2.0));
    return half4(scaled, 0, 1);
}
"#;

pub const BOUNCE_MASKED_SOURCE: &str = r#"// Bounce, with alpha borrowed from the chained `composable` shader.
uniform float2 iResolution;
uniform float iTime;
uniform float iDuration;
uniform shader composable;

half4 main(in float2 fragCoord) {
    float2 scaled = abs(1.0 - mod(fragCoord / iResolution.xy + iTime / (iDuration / 2.0), 2.0));
    return half4(scaled, 0, composable.eval(fragCoord).a);
}
"#;

pub const WAVE_BANDS_SOURCE: &str = r#"// Overlapping horizontal bands with sine-shaped edges, each adding an
// eighth of the complement of iColor.
uniform float2 iResolution;
uniform float iTime;
layout(color) uniform half4 iColor;

float bandMembership(float uy, float loopFactor) {
    return step(loopFactor - 0.1, uy) - step(1.0 + loopFactor * 2.0, uy);
}

half4 main(in float2 fragCoord) {
    const float speedMultiplier = 1.5;
    const float loops = 8.0;
    const float energy = 0.6;

    float2 uv = fragCoord / iResolution.xy;
    float3 color = iColor.rgb;
    float timeOffset = iTime * speedMultiplier;
    float hAdjustment = uv.x * 4.3;
    float3 bandColor = (1.0 - color) / loops;

    for (float i = 1.0; i <= loops; i += 1.0) {
        float loopFactor = i * 0.1;
        float sinInput = (timeOffset + hAdjustment) * energy;
        float curve = sin(sinInput) * (1.0 - loopFactor) * 0.05;
        color += bandColor * bandMembership(uv.y, loopFactor);
        uv.y += curve;
    }

    return half4(color, 1.0);
}
"#;

/// Named bundled program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preset {
    Solid,
    UniformColor,
    Gradient,
    Bounce,
    BounceMasked,
    WaveBands,
}

impl Preset {
    pub const ALL: [Preset; 6] = [
        Preset::Solid,
        Preset::UniformColor,
        Preset::Gradient,
        Preset::Bounce,
        Preset::BounceMasked,
        Preset::WaveBands,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Preset::Solid => "solid",
            Preset::UniformColor => "uniform-color",
            Preset::Gradient => "gradient",
            Preset::Bounce => "bounce",
            Preset::BounceMasked => "bounce-masked",
            Preset::WaveBands => "wave-bands",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|preset| preset.name() == name)
    }

    pub fn source(self) -> &'static str {
        match self {
            Preset::Solid => SOLID_SOURCE,
            Preset::UniformColor => UNIFORM_COLOR_SOURCE,
            Preset::Gradient => GRADIENT_SOURCE,
            Preset::Bounce => BOUNCE_SOURCE,
            Preset::BounceMasked => BOUNCE_MASKED_SOURCE,
            Preset::WaveBands => WAVE_BANDS_SOURCE,
        }
    }

    pub fn compile(self) -> Result<Arc<ShaderProgram>, CompileError> {
        compile(self.source())
    }

    /// Values set once when the preset is bound, before the first frame.
    pub fn defaults(self) -> Vec<(&'static str, UniformValue)> {
        match self {
            Preset::Solid | Preset::Gradient => Vec::new(),
            Preset::UniformColor => vec![("iColor", UniformValue::Color(Rgba::MAGENTA))],
            Preset::Bounce | Preset::BounceMasked => vec![("iDuration", UniformValue::Scalar(4.0))],
            Preset::WaveBands => vec![("iColor", UniformValue::Color(Rgba::YELLOW))],
        }
    }

    /// Writes [`Preset::defaults`] into `store`.
    pub fn apply_defaults(self, store: &mut UniformStore) -> Result<(), ShaderError> {
        for (name, value) in self.defaults() {
            store.set(name, value)?;
        }
        Ok(())
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Preset::from_name(value).ok_or_else(|| {
            let known: Vec<&str> = Preset::ALL.iter().map(|preset| preset.name()).collect();
            format!("unknown preset '{value}' (expected one of: {})", known.join(", "))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shaderprog::UniformType;

    #[test]
    fn every_preset_compiles_and_accepts_its_defaults() {
        for preset in Preset::ALL {
            let program = preset
                .compile()
                .unwrap_or_else(|err| panic!("{preset} failed to compile: {err}"));
            let mut store = UniformStore::new(&program);
            preset.apply_defaults(&mut store).unwrap();
        }
    }

    #[test]
    fn names_round_trip() {
        for preset in Preset::ALL {
            assert_eq!(preset.name().parse::<Preset>(), Ok(preset));
        }
        assert!("plasma".parse::<Preset>().unwrap_err().contains("wave-bands"));
    }

    #[test]
    fn wave_bands_declares_a_color_managed_base_color() {
        let program = Preset::WaveBands.compile().unwrap();
        let color = program.uniform("iColor").unwrap();
        assert_eq!(color.ty, UniformType::Color);
        assert!(color.color_managed);
    }

    #[test]
    fn masked_bounce_exposes_its_chain_slot() {
        let program = Preset::BounceMasked.compile().unwrap();
        assert_eq!(
            program.uniform("composable").map(|decl| decl.ty),
            Some(UniformType::Shader)
        );
    }
}
