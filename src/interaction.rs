//! Pan/zoom and hover as plain state transitions.
//!
//! Nothing here holds state between calls: each function takes the current
//! transform or tooltip and returns the next one.

use crate::config::ZoomConfig;
use crate::types::MeteoriteProperties;
use serde::{Deserialize, Serialize};

/// Pixels between the pointer and the tooltip's top-left corner.
pub const TOOLTIP_OFFSET: f64 = 20.0;

const WHEEL_SENSITIVITY: f64 = 0.002;

/// Translate then uniform scale, applied to the whole drawing group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    pub x: f64,
    pub y: f64,
    pub k: f64,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ViewTransform {
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        k: 1.0,
    };

    /// Scene coordinates to screen coordinates.
    pub fn apply(&self, p: [f64; 2]) -> [f64; 2] {
        [p[0] * self.k + self.x, p[1] * self.k + self.y]
    }

    /// Screen coordinates to scene coordinates.
    pub fn invert(&self, p: [f64; 2]) -> [f64; 2] {
        [(p[0] - self.x) / self.k, (p[1] - self.y) / self.k]
    }

    /// Value for the group's `transform` attribute.
    pub fn attribute(&self) -> String {
        format!("translate({},{}) scale({})", self.x, self.y, self.k)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomBehavior {
    pub min_scale: f64,
    pub max_scale: f64,
}

impl From<&ZoomConfig> for ZoomBehavior {
    fn from(config: &ZoomConfig) -> Self {
        Self {
            min_scale: config.min_scale,
            max_scale: config.max_scale,
        }
    }
}

impl ZoomBehavior {
    /// Pulls a transform's scale back into the allowed extent.
    pub fn constrain(&self, t: ViewTransform) -> ViewTransform {
        ViewTransform {
            k: t.k.clamp(self.min_scale, self.max_scale),
            ..t
        }
    }

    /// Scales by `factor`, keeping the scene point under `pointer` fixed.
    pub fn scale_by(&self, t: ViewTransform, factor: f64, pointer: [f64; 2]) -> ViewTransform {
        let t = self.constrain(t);
        let k = (t.k * factor).clamp(self.min_scale, self.max_scale);
        let [sx, sy] = t.invert(pointer);
        ViewTransform {
            x: pointer[0] - sx * k,
            y: pointer[1] - sy * k,
            k,
        }
    }

    pub fn translate_by(&self, t: ViewTransform, dx: f64, dy: f64) -> ViewTransform {
        let t = self.constrain(t);
        ViewTransform {
            x: t.x + dx,
            y: t.y + dy,
            k: t.k,
        }
    }

    /// Wheel with pixel-mode delta; positive delta zooms out.
    pub fn wheel(&self, t: ViewTransform, delta_y: f64, pointer: [f64; 2]) -> ViewTransform {
        self.scale_by(t, wheel_factor(delta_y), pointer)
    }

    /// Double click doubles the scale, or halves it with shift held.
    pub fn double_click(&self, t: ViewTransform, pointer: [f64; 2], shift: bool) -> ViewTransform {
        self.scale_by(t, if shift { 0.5 } else { 2.0 }, pointer)
    }
}

pub fn wheel_factor(delta_y: f64) -> f64 {
    2f64.powf(-delta_y * WHEEL_SENSITIVITY)
}

/// Meteor outline width for a zoom scale; thinner when zoomed in.
pub fn stroke_width(k: f64) -> f64 {
    if k > 3.0 {
        0.25
    } else if k > 2.0 {
        0.5
    } else {
        1.0
    }
}

/// What the page applies after any transform change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoomUpdate {
    pub transform: ViewTransform,
    pub attribute: String,
    pub stroke_width: f64,
}

pub fn on_zoom(t: ViewTransform) -> ZoomUpdate {
    ZoomUpdate {
        transform: t,
        attribute: t.attribute(),
        stroke_width: stroke_width(t.k),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Over,
    Out,
    Move { page_x: f64, page_y: f64 },
}

/// CSS `display` of the tooltip. `Default` clears the inline style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TooltipDisplay {
    Default,
    #[default]
    None,
    InlineBlock,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TooltipRow {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Tooltip {
    pub display: TooltipDisplay,
    pub left: Option<f64>,
    pub top: Option<f64>,
    pub rows: Vec<TooltipRow>,
}

pub fn tooltip_rows(props: &MeteoriteProperties) -> Vec<TooltipRow> {
    [
        ("Fall", &props.fall),
        ("Mass", &props.mass),
        ("Name", &props.name),
        ("Nametype", &props.nametype),
        ("Recclass", &props.recclass),
        ("Reclat", &props.reclat),
        ("Year", &props.year),
    ]
    .into_iter()
    .map(|(label, value)| TooltipRow {
        label,
        value: value.clone(),
    })
    .collect()
}

/// Next tooltip state for a pointer event on a meteor circle.
pub fn tooltip_on(event: PointerEvent, current: &Tooltip, props: &MeteoriteProperties) -> Tooltip {
    match event {
        PointerEvent::Over => Tooltip {
            display: TooltipDisplay::Default,
            ..current.clone()
        },
        PointerEvent::Out => Tooltip {
            display: TooltipDisplay::None,
            ..current.clone()
        },
        PointerEvent::Move { page_x, page_y } => Tooltip {
            display: TooltipDisplay::InlineBlock,
            left: Some(page_x + TOOLTIP_OFFSET),
            top: Some(page_y + TOOLTIP_OFFSET),
            rows: tooltip_rows(props),
        },
    }
}

/// Whether a country carries the `active_country` class after `event`.
pub fn country_active(event: PointerEvent, current: bool) -> bool {
    match event {
        PointerEvent::Over => true,
        PointerEvent::Out => false,
        PointerEvent::Move { .. } => current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn behavior() -> ZoomBehavior {
        ZoomBehavior::from(&ZoomConfig::default())
    }

    #[test]
    fn stroke_bands_use_strict_greater_than() {
        assert_eq!(stroke_width(7.0), 0.25);
        assert_eq!(stroke_width(3.01), 0.25);
        assert_eq!(stroke_width(3.0), 0.5);
        assert_eq!(stroke_width(2.5), 0.5);
        assert_eq!(stroke_width(2.0), 1.0);
        assert_eq!(stroke_width(1.0), 1.0);
    }

    #[test]
    fn scale_is_clamped_to_extent() {
        let zoom = behavior();
        let t = zoom.scale_by(ViewTransform::IDENTITY, 100.0, [0.0, 0.0]);
        assert_eq!(t.k, 7.0);
        let t = zoom.scale_by(t, 0.001, [0.0, 0.0]);
        assert_eq!(t.k, 1.0);
    }

    #[test]
    fn zoom_keeps_pointer_anchored() {
        let zoom = behavior();
        let pointer = [300.0, 200.0];
        let before = ViewTransform { x: 10.0, y: -20.0, k: 1.5 };
        let anchored = before.invert(pointer);
        let after = zoom.scale_by(before, 2.0, pointer);
        assert_eq!(after.k, 3.0);
        let [x, y] = after.apply(anchored);
        assert!((x - pointer[0]).abs() < 1e-9 && (y - pointer[1]).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_scale_is_constrained_before_use() {
        let zoom = behavior();
        let degenerate = ViewTransform { x: 0.0, y: 0.0, k: 0.0 };
        assert_eq!(zoom.constrain(degenerate).k, 1.0);
        assert_eq!(
            zoom.constrain(ViewTransform { x: 3.0, y: 4.0, k: 40.0 }),
            ViewTransform { x: 3.0, y: 4.0, k: 7.0 }
        );

        let t = zoom.scale_by(degenerate, 2.0, [100.0, 50.0]);
        assert_eq!(t, ViewTransform { x: -100.0, y: -50.0, k: 2.0 });
    }

    #[test]
    fn pan_moves_without_rescaling() {
        let t = behavior().translate_by(ViewTransform { x: 5.0, y: 5.0, k: 2.0 }, 10.0, -4.0);
        assert_eq!(t, ViewTransform { x: 15.0, y: 1.0, k: 2.0 });
    }

    #[test]
    fn wheel_and_double_click() {
        let zoom = behavior();
        assert_eq!(wheel_factor(0.0), 1.0);
        assert_eq!(wheel_factor(-500.0), 2.0);
        let t = zoom.wheel(ViewTransform::IDENTITY, -500.0, [0.0, 0.0]);
        assert_eq!(t.k, 2.0);
        let t = zoom.double_click(t, [0.0, 0.0], false);
        assert_eq!(t.k, 4.0);
        let t = zoom.double_click(t, [0.0, 0.0], true);
        assert_eq!(t.k, 2.0);
    }

    #[test]
    fn zoom_update_carries_attribute_and_stroke() {
        let update = on_zoom(ViewTransform { x: 12.5, y: -3.0, k: 4.0 });
        assert_eq!(update.attribute, "translate(12.5,-3) scale(4)");
        assert_eq!(update.stroke_width, 0.25);
    }

    fn aachen() -> MeteoriteProperties {
        MeteoriteProperties {
            name: "Aachen".into(),
            mass: "21".into(),
            fall: "Fell".into(),
            nametype: "Valid".into(),
            recclass: "L5".into(),
            reclat: "50.775000".into(),
            year: "1880-01-01T00:00:00.000".into(),
            ..Default::default()
        }
    }

    #[test]
    fn tooltip_follows_pointer_with_seven_rows() {
        let props = aachen();
        let shown = tooltip_on(PointerEvent::Over, &Tooltip::default(), &props);
        assert_eq!(shown.display, TooltipDisplay::Default);

        let moved = tooltip_on(PointerEvent::Move { page_x: 100.0, page_y: 40.0 }, &shown, &props);
        assert_eq!(moved.display, TooltipDisplay::InlineBlock);
        assert_eq!((moved.left, moved.top), (Some(120.0), Some(60.0)));
        let labels: Vec<&str> = moved.rows.iter().map(|r| r.label).collect();
        assert_eq!(labels, vec!["Fall", "Mass", "Name", "Nametype", "Recclass", "Reclat", "Year"]);
        assert_eq!(moved.rows[2].value, "Aachen");

        let hidden = tooltip_on(PointerEvent::Out, &moved, &props);
        assert_eq!(hidden.display, TooltipDisplay::None);
        assert_eq!(hidden.rows, moved.rows);
    }

    #[test]
    fn country_hover_toggles_class() {
        assert!(country_active(PointerEvent::Over, false));
        assert!(!country_active(PointerEvent::Out, true));
        assert!(country_active(PointerEvent::Move { page_x: 0.0, page_y: 0.0 }, true));
    }
}
