use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use glam::Vec3;
use log::warn;
use parking_lot::RwLock;
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

use crate::shading::ShadingParams;

/// Edge length of the square shadow map, in texels.
pub const SHADOW_MAP_SIZE: u32 = 2048;
pub const LIGHT_NEAR: f32 = 0.5;
pub const LIGHT_FAR: f32 = 10.0;
pub const CAMERA_FOV_DEGREES: f32 = 60.0;
pub const CAMERA_NEAR: f32 = 1.0;
pub const CAMERA_FAR: f32 = 2000.0;
/// The camera slides in X/Y on the plane `z = CAMERA_Z`, always facing the origin.
pub const CAMERA_Z: f32 = 7.0;

/// Interactively tunable parameters of the demo.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub camera_x: f32,
    pub camera_y: f32,
    pub light_position: Vec3,
    pub light_target: Vec3,
    pub projection_width: f32,
    pub projection_height: f32,
    pub perspective: bool,
    /// Degrees.
    pub field_of_view: f32,
    /// Signed offset added to a fragment's light-space depth before the
    /// shadow comparison; negative values pull it toward the light.
    pub bias: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            camera_x: 6.0,
            camera_y: 5.0,
            light_position: Vec3::new(2.5, 4.8, 4.3),
            light_target: Vec3::new(2.5, 0.0, 3.5),
            projection_width: 1.0,
            projection_height: 1.0,
            perspective: true,
            field_of_view: 120.0,
            bias: -0.0001,
        }
    }
}

/// Every scalar the input layer can nudge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SettingKey {
    CameraX,
    CameraY,
    LightX,
    LightY,
    LightZ,
    TargetX,
    TargetY,
    TargetZ,
    ProjectionWidth,
    ProjectionHeight,
    FieldOfView,
    Bias,
}

/// Inclusive bounds plus the increment applied by one key press.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SettingRange {
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl SettingRange {
    const fn new(min: f32, max: f32, step: f32) -> Self {
        Self { min, max, step }
    }

    pub fn clamp(self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }
}

impl SettingKey {
    pub const ALL: [SettingKey; 12] = [
        SettingKey::CameraX,
        SettingKey::CameraY,
        SettingKey::LightX,
        SettingKey::LightY,
        SettingKey::LightZ,
        SettingKey::TargetX,
        SettingKey::TargetY,
        SettingKey::TargetZ,
        SettingKey::ProjectionWidth,
        SettingKey::ProjectionHeight,
        SettingKey::FieldOfView,
        SettingKey::Bias,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SettingKey::CameraX => "cameraX",
            SettingKey::CameraY => "cameraY",
            SettingKey::LightX => "posX",
            SettingKey::LightY => "posY",
            SettingKey::LightZ => "posZ",
            SettingKey::TargetX => "targetX",
            SettingKey::TargetY => "targetY",
            SettingKey::TargetZ => "targetZ",
            SettingKey::ProjectionWidth => "projWidth",
            SettingKey::ProjectionHeight => "projHeight",
            SettingKey::FieldOfView => "fieldOfView",
            SettingKey::Bias => "bias",
        }
    }

    pub fn range(self) -> SettingRange {
        match self {
            SettingKey::CameraX => SettingRange::new(-10.0, 10.0, 0.25),
            SettingKey::CameraY => SettingRange::new(1.0, 20.0, 0.25),
            SettingKey::LightX => SettingRange::new(-10.0, 10.0, 0.1),
            SettingKey::LightY => SettingRange::new(1.0, 20.0, 0.1),
            SettingKey::LightZ => SettingRange::new(1.0, 20.0, 0.1),
            SettingKey::TargetX => SettingRange::new(-10.0, 10.0, 0.1),
            SettingKey::TargetY => SettingRange::new(0.0, 20.0, 0.1),
            SettingKey::TargetZ => SettingRange::new(-10.0, 20.0, 0.1),
            // a zero extent would make the light projection singular
            SettingKey::ProjectionWidth => SettingRange::new(0.01, 2.0, 0.05),
            SettingKey::ProjectionHeight => SettingRange::new(0.01, 2.0, 0.05),
            SettingKey::FieldOfView => SettingRange::new(1.0, 179.0, 1.0),
            SettingKey::Bias => SettingRange::new(-0.01, 0.00001, 0.0001),
        }
    }
}

impl Settings {
    pub fn get(&self, key: SettingKey) -> f32 {
        match key {
            SettingKey::CameraX => self.camera_x,
            SettingKey::CameraY => self.camera_y,
            SettingKey::LightX => self.light_position.x,
            SettingKey::LightY => self.light_position.y,
            SettingKey::LightZ => self.light_position.z,
            SettingKey::TargetX => self.light_target.x,
            SettingKey::TargetY => self.light_target.y,
            SettingKey::TargetZ => self.light_target.z,
            SettingKey::ProjectionWidth => self.projection_width,
            SettingKey::ProjectionHeight => self.projection_height,
            SettingKey::FieldOfView => self.field_of_view,
            SettingKey::Bias => self.bias,
        }
    }

    /// Stores `value` clamped into the key's range. Returns whether the
    /// stored value changed.
    pub fn set(&mut self, key: SettingKey, value: f32) -> bool {
        if !value.is_finite() {
            return false;
        }
        let value = key.range().clamp(value);
        let slot = match key {
            SettingKey::CameraX => &mut self.camera_x,
            SettingKey::CameraY => &mut self.camera_y,
            SettingKey::LightX => &mut self.light_position.x,
            SettingKey::LightY => &mut self.light_position.y,
            SettingKey::LightZ => &mut self.light_position.z,
            SettingKey::TargetX => &mut self.light_target.x,
            SettingKey::TargetY => &mut self.light_target.y,
            SettingKey::TargetZ => &mut self.light_target.z,
            SettingKey::ProjectionWidth => &mut self.projection_width,
            SettingKey::ProjectionHeight => &mut self.projection_height,
            SettingKey::FieldOfView => &mut self.field_of_view,
            SettingKey::Bias => &mut self.bias,
        };
        if *slot == value {
            return false;
        }
        *slot = value;
        true
    }

    /// Moves `key` by `steps` increments of its range step.
    pub fn nudge(&mut self, key: SettingKey, steps: f32) -> bool {
        let step = key.range().step;
        self.set(key, self.get(key) + step * steps)
    }

    pub fn toggle_perspective(&mut self) {
        self.perspective = !self.perspective;
    }

    /// Reads a settings document from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let xml = fs::read_to_string(path)
            .with_context(|| format!("unable to read settings file {}", path.display()))?;
        Self::from_xml(&xml).with_context(|| format!("invalid settings file {}", path.display()))
    }

    /// Parses a settings document. Absent tags keep their defaults; values
    /// outside a key's range are clamped.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let document = Document::parse(xml).context("invalid settings XML")?;
        let root = document.root_element();
        if !root.has_tag_name("settings") {
            return Err(anyhow!(
                "expected <settings> root element, found <{}>",
                root.tag_name().name()
            ));
        }

        let mut settings = Self::default();
        if let Some(camera) = child(&root, "camera") {
            settings.apply(SettingKey::CameraX, parse_f32(&camera, "x")?);
            settings.apply(SettingKey::CameraY, parse_f32(&camera, "y")?);
        }
        if let Some(light) = child(&root, "light") {
            if let Some(position) = parse_vec3(&light, "position")? {
                settings.apply(SettingKey::LightX, Some(position.x));
                settings.apply(SettingKey::LightY, Some(position.y));
                settings.apply(SettingKey::LightZ, Some(position.z));
            }
            if let Some(target) = parse_vec3(&light, "target")? {
                settings.apply(SettingKey::TargetX, Some(target.x));
                settings.apply(SettingKey::TargetY, Some(target.y));
                settings.apply(SettingKey::TargetZ, Some(target.z));
            }
            if let Some(projection) = optional_text(&light, "projection") {
                settings.perspective = match projection.to_ascii_lowercase().as_str() {
                    "perspective" => true,
                    "orthographic" => false,
                    other => {
                        return Err(anyhow!(
                            "<projection> must be perspective or orthographic, got {other}"
                        ))
                    }
                };
            }
            settings.apply(SettingKey::ProjectionWidth, parse_f32(&light, "width")?);
            settings.apply(SettingKey::ProjectionHeight, parse_f32(&light, "height")?);
            settings.apply(SettingKey::FieldOfView, parse_f32(&light, "fov")?);
            settings.apply(SettingKey::Bias, parse_f32(&light, "bias")?);
        }
        Ok(settings)
    }

    fn apply(&mut self, key: SettingKey, value: Option<f32>) {
        let Some(value) = value else {
            return;
        };
        let range = key.range();
        if value < range.min || value > range.max {
            warn!(
                "{} = {value} is outside [{}, {}]; clamping",
                key.name(),
                range.min,
                range.max
            );
        }
        self.set(key, value);
    }
}

fn child<'a, 'input>(node: &Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|child| child.has_tag_name(tag))
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    child(node, tag)
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_f32(node: &Node<'_, '_>, tag: &str) -> Result<Option<f32>> {
    match optional_text(node, tag) {
        Some(value) => value
            .parse::<f32>()
            .map(Some)
            .map_err(|err| anyhow!("<{tag}> is not a number ({value}): {err}")),
        None => Ok(None),
    }
}

fn parse_vec3(node: &Node<'_, '_>, tag: &str) -> Result<Option<Vec3>> {
    let Some(value) = optional_text(node, tag) else {
        return Ok(None);
    };
    let components = value
        .split_whitespace()
        .map(|component| component.parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| anyhow!("<{tag}> has a non-numeric component ({value}): {err}"))?;
    match components.as_slice() {
        [x, y, z] => Ok(Some(Vec3::new(*x, *y, *z))),
        _ => Err(anyhow!(
            "<{tag}> needs exactly three components, got {}",
            components.len()
        )),
    }
}

/// Settings shared between the input layer and the frame driver.
///
/// Input handlers mutate through [`SettingsStore::update`]; the driver
/// takes one [`SettingsStore::snapshot`] per frame so a frame never sees a
/// half-applied change.
#[derive(Debug, Default)]
pub struct SettingsStore {
    settings: Arc<RwLock<Settings>>,
}

impl Clone for SettingsStore {
    fn clone(&self) -> Self {
        Self {
            settings: Arc::clone(&self.settings),
        }
    }
}

impl SettingsStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Arc::new(RwLock::new(settings)),
        }
    }

    pub fn snapshot(&self) -> Settings {
        *self.settings.read()
    }

    /// Applies a mutation; the closure's result is passed through.
    pub fn update<F, R>(&self, updater: F) -> R
    where
        F: FnOnce(&mut Settings) -> R,
    {
        updater(&mut self.settings.write())
    }
}

/// Immutable inputs of one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameConfig {
    pub settings: Settings,
    /// Viewport width over height.
    pub aspect: f32,
    pub shading: ShadingParams,
}

impl FrameConfig {
    pub fn new(settings: Settings, aspect: f32) -> Self {
        Self {
            settings,
            aspect: if aspect.is_finite() && aspect > 0.0 {
                aspect
            } else {
                1.0
            },
            shading: ShadingParams::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
    <settings>
        <camera>
            <x>-2</x>
            <y>8</y>
        </camera>
        <light>
            <position>1 6 2</position>
            <target>0 0 0</target>
            <projection>orthographic</projection>
            <width>1.5</width>
            <fov>90</fov>
            <bias>-0.002</bias>
        </light>
    </settings>
    "#;

    #[test]
    fn parse_settings_overrides_only_present_fields() {
        let settings = Settings::from_xml(SAMPLE).unwrap();
        assert_eq!(settings.camera_x, -2.0);
        assert_eq!(settings.camera_y, 8.0);
        assert_eq!(settings.light_position, Vec3::new(1.0, 6.0, 2.0));
        assert_eq!(settings.light_target, Vec3::ZERO);
        assert!(!settings.perspective);
        assert_eq!(settings.projection_width, 1.5);
        assert_eq!(settings.projection_height, 1.0);
        assert_eq!(settings.field_of_view, 90.0);
        assert_eq!(settings.bias, -0.002);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let xml = "<settings><light><fov>400</fov><height>0</height></light></settings>";
        let settings = Settings::from_xml(xml).unwrap();
        assert_eq!(settings.field_of_view, 179.0);
        assert_eq!(settings.projection_height, 0.01);
    }

    #[test]
    fn malformed_values_are_errors() {
        assert!(Settings::from_xml("<settings><camera><x>left</x></camera></settings>").is_err());
        assert!(Settings::from_xml("<settings><light><position>1 2</position></light></settings>").is_err());
        assert!(Settings::from_xml("<settings><light><projection>fisheye</projection></light></settings>").is_err());
        assert!(Settings::from_xml("<scene/>").is_err());
    }

    #[test]
    fn nudge_moves_by_step_and_stops_at_bounds() {
        let mut settings = Settings::default();
        assert!(settings.nudge(SettingKey::FieldOfView, 1.0));
        assert_eq!(settings.field_of_view, 121.0);
        settings.set(SettingKey::FieldOfView, 179.0);
        assert!(!settings.nudge(SettingKey::FieldOfView, 1.0));
        assert!(!settings.set(SettingKey::Bias, f32::NAN));
    }

    #[test]
    fn every_key_round_trips_through_get_and_set() {
        let mut settings = Settings::default();
        for key in SettingKey::ALL {
            let range = key.range();
            settings.set(key, range.max);
            assert_eq!(settings.get(key), range.max, "{}", key.name());
        }
    }

    #[test]
    fn store_snapshots_are_detached() {
        let store = SettingsStore::new(Settings::default());
        let before = store.snapshot();
        let shared = store.clone();
        shared.update(|settings| settings.toggle_perspective());
        assert!(before.perspective);
        assert!(!store.snapshot().perspective);
    }

    #[test]
    fn frame_config_rejects_degenerate_aspect() {
        assert_eq!(FrameConfig::new(Settings::default(), 0.0).aspect, 1.0);
        assert_eq!(FrameConfig::new(Settings::default(), f32::NAN).aspect, 1.0);
        assert_eq!(FrameConfig::new(Settings::default(), 2.0).aspect, 2.0);
    }
}
