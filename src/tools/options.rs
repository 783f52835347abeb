use serde::{Deserialize, Serialize};

use crate::render::GuideKind;
use crate::store::{ClipPolicy, Interpolation, TransformDirection, TransformType};

const DEFAULT_RECURSION_LEVEL: u8 = 3;
const DEFAULT_PREVIEW_OPACITY: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstrainFlags {
    #[serde(rename = "move")]
    pub move_: bool,
    pub scale: bool,
    pub rotate: bool,
    pub shear: bool,
    pub perspective: bool,
}

impl ConstrainFlags {
    fn toggle(&mut self) {
        self.move_ = !self.move_;
        self.scale = !self.scale;
        self.rotate = !self.rotate;
        self.shear = !self.shear;
        self.perspective = !self.perspective;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FromPivotFlags {
    pub scale: bool,
    pub shear: bool,
    pub perspective: bool,
}

impl FromPivotFlags {
    fn toggle(&mut self) {
        self.scale = !self.scale;
        self.shear = !self.shear;
        self.perspective = !self.perspective;
    }
}

/// User-facing transform settings, loadable from the config file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformOptions {
    pub target: TransformType,
    pub direction: TransformDirection,
    pub interpolation: Interpolation,
    /// Supersampling depth for perspective resampling.
    pub recursion_level: u8,
    pub clip: ClipPolicy,
    pub show_preview: bool,
    pub preview_opacity: f64,
    pub guides: GuideKind,
    pub constrain: ConstrainFlags,
    pub corner_snap: bool,
    pub from_pivot: FromPivotFlags,
    pub fixed_pivot: bool,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            target: TransformType::default(),
            direction: TransformDirection::default(),
            interpolation: Interpolation::default(),
            recursion_level: DEFAULT_RECURSION_LEVEL,
            clip: ClipPolicy::default(),
            show_preview: true,
            preview_opacity: DEFAULT_PREVIEW_OPACITY,
            guides: GuideKind::default(),
            constrain: ConstrainFlags::default(),
            corner_snap: false,
            from_pivot: FromPivotFlags::default(),
            fixed_pivot: false,
        }
    }
}

impl TransformOptions {
    /// Shift group: corner snapping and every constrain flag.
    pub fn toggle_constrain_group(&mut self) {
        self.corner_snap = !self.corner_snap;
        self.constrain.toggle();
    }

    /// Ctrl group: every from-pivot flag.
    pub fn toggle_from_pivot_group(&mut self) {
        self.from_pivot.toggle();
    }

    pub fn preview_opacity(&self) -> f64 {
        self.preview_opacity.clamp(0.0, 1.0)
    }
}
