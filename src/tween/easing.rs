use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Maps linear progress in [0, 1] onto eased progress
///
/// Named curves serialize as kebab-case ids such as `"quadratic-in-out"`.
#[derive(Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Easing {
    #[default]
    Linear,
    QuadraticIn,
    QuadraticOut,
    QuadraticInOut,
    CubicIn,
    CubicOut,
    CubicInOut,
    SinusoidalIn,
    SinusoidalOut,
    SinusoidalInOut,
    ExponentialIn,
    ExponentialOut,
    ExponentialInOut,
    /// Caller supplied curve; not serializable
    #[serde(skip)]
    Custom(fn(f64) -> f64),
}

impl Easing {
    /// Ease `k`, which is clamped to [0, 1] first
    pub fn apply(self, k: f64) -> f64 {
        let k = k.clamp(0.0, 1.0);
        match self {
            Easing::Linear => k,
            Easing::QuadraticIn => k * k,
            Easing::QuadraticOut => k * (2.0 - k),
            Easing::QuadraticInOut => {
                let k = k * 2.0;
                if k < 1.0 {
                    0.5 * k * k
                } else {
                    let k = k - 1.0;
                    -0.5 * (k * (k - 2.0) - 1.0)
                }
            }
            Easing::CubicIn => k * k * k,
            Easing::CubicOut => {
                let k = k - 1.0;
                k * k * k + 1.0
            }
            Easing::CubicInOut => {
                let k = k * 2.0;
                if k < 1.0 {
                    0.5 * k * k * k
                } else {
                    let k = k - 2.0;
                    0.5 * (k * k * k + 2.0)
                }
            }
            Easing::SinusoidalIn => 1.0 - (k * PI / 2.0).cos(),
            Easing::SinusoidalOut => (k * PI / 2.0).sin(),
            Easing::SinusoidalInOut => 0.5 * (1.0 - (PI * k).cos()),
            Easing::ExponentialIn => {
                if k == 0.0 {
                    0.0
                } else {
                    1024f64.powf(k - 1.0)
                }
            }
            Easing::ExponentialOut => {
                if k == 1.0 {
                    1.0
                } else {
                    1.0 - 2f64.powf(-10.0 * k)
                }
            }
            Easing::ExponentialInOut => {
                if k == 0.0 || k == 1.0 {
                    return k;
                }
                let k = k * 2.0;
                if k < 1.0 {
                    0.5 * 1024f64.powf(k - 1.0)
                } else {
                    0.5 * (2.0 - 2f64.powf(-10.0 * (k - 1.0)))
                }
            }
            Easing::Custom(curve) => curve(k),
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, Easing::Custom(_))
    }
}

impl fmt::Debug for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Easing::Custom(_) => f.write_str("Custom(..)"),
            named => {
                let id = serde_json::to_string(named).map_err(|_| fmt::Error)?;
                f.write_str(id.trim_matches('"'))
            }
        }
    }
}

impl PartialEq for Easing {
    /// Custom curves never compare equal
    fn eq(&self, other: &Self) -> bool {
        if self.is_custom() || other.is_custom() {
            return false;
        }
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}
