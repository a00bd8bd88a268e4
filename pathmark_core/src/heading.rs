//! Heading derivation for the orientation and offset phases.
//!
//! A [`HeadingStrategy`] turns a heading reading into the yaw to hold while
//! dropping and the image-frame offset to drop at. Strategies are pure; the
//! controller normalizes the yaw and rejects non-finite plans.
//!
//! # Contract of the default strategy
//!
//! [`NormalToFeature`] treats `heading_deg` as the direction of the detected
//! feature relative to the vehicle's forward axis, positive in the same sense
//! as yaw. The feature direction in the vehicle's yaw frame is therefore
//! `vehicle_yaw_deg + heading_deg`. The vehicle turns to whichever of the two
//! normals to that direction (`±90°`) needs the smaller rotation from the
//! current yaw; ties pick `+90°`. The result is wrapped to `(-180, 180]`.
//!
//! The drop offset is a pure sway offset `y = -(frame_width * offset_fraction)`.

use pathmark_traits::{HeadingReading, Vector3};

/// Inputs for one heading derivation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadingContext {
    pub reading: HeadingReading,
    pub frame_width: u32,
    pub frame_height: u32,
    pub offset_fraction: f64,
}

impl HeadingContext {
    /// Sway offset shared by the built-in strategies.
    pub fn default_offset(&self) -> Vector3 {
        Vector3::new(0.0, -(f64::from(self.frame_width) * self.offset_fraction), 0.0)
    }
}

/// Yaw to hold and alignment target to drop at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadingPlan {
    pub yaw_deg: f64,
    pub offset: Vector3,
}

impl HeadingPlan {
    pub fn is_finite(&self) -> bool {
        self.yaw_deg.is_finite()
            && self.offset.x.is_finite()
            && self.offset.y.is_finite()
            && self.offset.z.is_finite()
    }
}

/// Pluggable heading derivation. Returning `None` asks the controller to
/// request a fresh heading.
pub trait HeadingStrategy {
    fn plan(&self, ctx: &HeadingContext) -> Option<HeadingPlan>;
}

impl<F> HeadingStrategy for F
where
    F: Fn(&HeadingContext) -> Option<HeadingPlan>,
{
    fn plan(&self, ctx: &HeadingContext) -> Option<HeadingPlan> {
        self(ctx)
    }
}

/// Wrap an angle in degrees to `(-180, 180]`. Non-finite input is returned
/// unchanged.
pub fn wrap_heading_deg(deg: f64) -> f64 {
    if !deg.is_finite() {
        return deg;
    }
    let mut r = deg % 360.0;
    if r <= -180.0 {
        r += 360.0;
    } else if r > 180.0 {
        r -= 360.0;
    }
    r
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NormalToFeature;

impl HeadingStrategy for NormalToFeature {
    fn plan(&self, ctx: &HeadingContext) -> Option<HeadingPlan> {
        let HeadingReading {
            heading_deg,
            vehicle_yaw_deg,
        } = ctx.reading;
        if !(heading_deg.is_finite() && vehicle_yaw_deg.is_finite()) {
            return None;
        }
        // Rotation from the current yaw to each normal.
        let plus = wrap_heading_deg(heading_deg + 90.0);
        let minus = wrap_heading_deg(heading_deg - 90.0);
        let turn = if plus.abs() <= minus.abs() { plus } else { minus };
        Some(HeadingPlan {
            yaw_deg: wrap_heading_deg(vehicle_yaw_deg + turn),
            offset: ctx.default_offset(),
        })
    }
}

/// Keeps the current yaw; only the offset target is applied.
#[derive(Debug, Clone, Copy, Default)]
pub struct HoldCurrent;

impl HeadingStrategy for HoldCurrent {
    fn plan(&self, ctx: &HeadingContext) -> Option<HeadingPlan> {
        let yaw = ctx.reading.vehicle_yaw_deg;
        if !yaw.is_finite() {
            return None;
        }
        Some(HeadingPlan {
            yaw_deg: wrap_heading_deg(yaw),
            offset: ctx.default_offset(),
        })
    }
}

pub(crate) fn strategy_for(mode: crate::config::HeadingMode) -> Box<dyn HeadingStrategy> {
    match mode {
        crate::config::HeadingMode::NormalToFeature => Box::new(NormalToFeature),
        crate::config::HeadingMode::HoldCurrent => Box::new(HoldCurrent),
    }
}
