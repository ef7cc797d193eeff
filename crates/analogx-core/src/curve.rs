//! Logarithmic mapping between knob positions and physical units

use crate::error::CurveDomainError;
use crate::units::{Hertz, Normalized};

/// Exponential interpolation over a positive domain `[min, max]`
///
/// `to_physical(0) == min`, `to_physical(1) == max`, and values outside
/// `[0, 1]` extrapolate along the same curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogCurve {
    min: f64,
    max: f64,
}

impl LogCurve {
    /// Build a curve from bounds known at compile time.
    ///
    /// An invalid domain fails const evaluation, so a bad fixed curve never
    /// reaches runtime.
    pub const fn fixed(min: f64, max: f64) -> Self {
        assert!(
            is_valid_domain(min, max),
            "log curve bounds must be positive, finite and distinct"
        );
        Self { min, max }
    }

    pub fn new(min: f64, max: f64) -> Result<Self, CurveDomainError> {
        if !is_valid_domain(min, max) {
            return Err(CurveDomainError { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn to_physical(&self, normalized: f64) -> f64 {
        self.min * (self.max / self.min).powf(normalized)
    }

    pub fn to_normalized(&self, physical: f64) -> f64 {
        (physical / self.min).ln() / (self.max / self.min).ln()
    }
}

const fn is_valid_domain(min: f64, max: f64) -> bool {
    min.is_finite() && max.is_finite() && min > 0.0 && max > 0.0 && min != max
}

/// `min * (max/min)^normalized`
pub fn to_physical(normalized: f64, min: f64, max: f64) -> Result<f64, CurveDomainError> {
    Ok(LogCurve::new(min, max)?.to_physical(normalized))
}

/// `ln(physical/min) / ln(max/min)`
pub fn to_normalized(physical: f64, min: f64, max: f64) -> Result<f64, CurveDomainError> {
    Ok(LogCurve::new(min, max)?.to_normalized(physical))
}

/// How a knob position is pre/post-processed around the log curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KnobScaling {
    /// Engine value is `factor * curve(knob)`; inverse divides by `factor` first
    Widened(f64),
    /// Knob sense is reversed: `curve(1 - knob)`, inverse is `1 - curve⁻¹(hz)`
    Inverted,
}

/// A log curve bound to one knob, converting between knob position and Hz
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KnobCurve {
    curve: LogCurve,
    scaling: KnobScaling,
}

impl KnobCurve {
    pub const fn widened(curve: LogCurve, factor: f64) -> Self {
        assert!(factor.is_finite() && factor > 0.0, "widening factor must be positive");
        Self {
            curve,
            scaling: KnobScaling::Widened(factor),
        }
    }

    pub const fn inverted(curve: LogCurve) -> Self {
        Self {
            curve,
            scaling: KnobScaling::Inverted,
        }
    }

    pub fn curve(&self) -> &LogCurve {
        &self.curve
    }

    pub fn scaling(&self) -> KnobScaling {
        self.scaling
    }

    pub fn knob_to_hz(&self, knob: Normalized) -> Hertz {
        match self.scaling {
            KnobScaling::Widened(factor) => Hertz(self.curve.to_physical(knob.0) * factor),
            KnobScaling::Inverted => Hertz(self.curve.to_physical(1.0 - knob.0)),
        }
    }

    pub fn hz_to_knob(&self, hz: Hertz) -> Normalized {
        match self.scaling {
            KnobScaling::Widened(factor) => Normalized(self.curve.to_normalized(hz.0 / factor)),
            KnobScaling::Inverted => Normalized(1.0 - self.curve.to_normalized(hz.0)),
        }
    }

    /// Engine-side bounds for knob positions 0 and 1, lowest first
    pub fn hz_range(&self) -> (Hertz, Hertz) {
        let a = self.knob_to_hz(Normalized(0.0));
        let b = self.knob_to_hz(Normalized(1.0));
        if a.0 <= b.0 { (a, b) } else { (b, a) }
    }
}

/// Relative error bound for Hz -> knob -> Hz through a knob curve
///
/// `ln` and `powf` are not exact inverses, so a frequency captured as a knob
/// position comes back within this bound, not bit for bit. Knob positions
/// themselves round-trip through preset text exactly.
pub const HZ_ROUND_TRIP_TOLERANCE: f64 = 1e-12;

/// Filter cutoff: 30 Hz – 7 kHz, engine frequency widened ×4
pub const CUTOFF_CURVE: KnobCurve = KnobCurve::widened(LogCurve::fixed(30.0, 7_000.0), 4.0);

/// Bit-crusher sample rate: 50 Hz – 8 kHz, knob turned up means lower rate
pub const CRUSH_CURVE: KnobCurve = KnobCurve::inverted(LogCurve::fixed(50.0, 8_000.0));
