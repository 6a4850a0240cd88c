//! Frame driver.
//!
//! One call to [`FrameDriver::render`] runs the whole frame against a
//! [`FrameBackend`]: light matrices, depth pass, camera matrices, color
//! pass, frustum overlay. The depth pass always finishes before the color
//! pass is issued, and the driver is back in [`FrameStage::Idle`] when
//! `render` returns, whether or not the frame succeeded.

use anyhow::{Context, Result};
use log::trace;

use crate::rig::{CameraRig, LightRig};
use crate::settings::FrameConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStage {
    Idle,
    ComputeLightMatrices,
    DepthPass,
    ComputeCameraMatrices,
    ColorPass,
    DrawFrustum,
}

/// Target of a frame: the GPU renderer or the CPU reference backend.
pub trait FrameBackend {
    /// Acquires whatever the frame draws into.
    fn begin_frame(&mut self, config: &FrameConfig) -> Result<()>;
    /// Fills the shadow map from the light's point of view.
    fn depth_pass(&mut self, light: &LightRig) -> Result<()>;
    /// Draws the lit scene, reading the shadow map written by `depth_pass`.
    fn color_pass(
        &mut self,
        camera: &CameraRig,
        light: &LightRig,
        config: &FrameConfig,
    ) -> Result<()>;
    fn draw_frustum(&mut self, camera: &CameraRig, light: &LightRig) -> Result<()>;
    /// Submits or presents the frame.
    fn finish_frame(&mut self) -> Result<()>;
}

/// Matrices a completed frame was drawn with.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub frame: u64,
    pub light: LightRig,
    pub camera: CameraRig,
}

#[derive(Debug)]
pub struct FrameDriver {
    stage: FrameStage,
    frames: u64,
}

impl Default for FrameDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDriver {
    pub fn new() -> Self {
        Self {
            stage: FrameStage::Idle,
            frames: 0,
        }
    }

    pub fn stage(&self) -> FrameStage {
        self.stage
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }

    pub fn render<B>(&mut self, config: &FrameConfig, backend: &mut B) -> Result<FrameReport>
    where
        B: FrameBackend + ?Sized,
    {
        let result = self.run(config, backend);
        self.enter(FrameStage::Idle);
        if result.is_ok() {
            self.frames += 1;
        }
        result
    }

    fn run<B>(&mut self, config: &FrameConfig, backend: &mut B) -> Result<FrameReport>
    where
        B: FrameBackend + ?Sized,
    {
        backend.begin_frame(config).context("unable to begin frame")?;

        self.enter(FrameStage::ComputeLightMatrices);
        let light = LightRig::from_settings(&config.settings)
            .context("unable to build light matrices")?;

        self.enter(FrameStage::DepthPass);
        backend.depth_pass(&light).context("depth pass failed")?;

        self.enter(FrameStage::ComputeCameraMatrices);
        let camera = CameraRig::from_settings(&config.settings, config.aspect)
            .context("unable to build camera matrices")?;

        self.enter(FrameStage::ColorPass);
        backend
            .color_pass(&camera, &light, config)
            .context("color pass failed")?;

        self.enter(FrameStage::DrawFrustum);
        backend
            .draw_frustum(&camera, &light)
            .context("frustum overlay failed")?;

        backend.finish_frame().context("unable to finish frame")?;
        Ok(FrameReport {
            frame: self.frames,
            light,
            camera,
        })
    }

    fn enter(&mut self, stage: FrameStage) {
        trace!("frame {}: {:?} -> {:?}", self.frames, self.stage, stage);
        self.stage = stage;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use anyhow::anyhow;
    use glam::Vec3;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<&'static str>,
        fail_color: bool,
    }

    impl FrameBackend for Recorder {
        fn begin_frame(&mut self, _config: &FrameConfig) -> Result<()> {
            self.calls.push("begin");
            Ok(())
        }

        fn depth_pass(&mut self, _light: &LightRig) -> Result<()> {
            self.calls.push("depth");
            Ok(())
        }

        fn color_pass(
            &mut self,
            _camera: &CameraRig,
            _light: &LightRig,
            _config: &FrameConfig,
        ) -> Result<()> {
            self.calls.push("color");
            if self.fail_color {
                return Err(anyhow!("device lost"));
            }
            Ok(())
        }

        fn draw_frustum(&mut self, _camera: &CameraRig, _light: &LightRig) -> Result<()> {
            self.calls.push("frustum");
            Ok(())
        }

        fn finish_frame(&mut self) -> Result<()> {
            self.calls.push("finish");
            Ok(())
        }
    }

    #[test]
    fn passes_run_in_order() {
        let mut driver = FrameDriver::new();
        let mut backend = Recorder::default();
        let config = FrameConfig::new(Settings::default(), 1.0);
        let report = driver.render(&config, &mut backend).unwrap();
        assert_eq!(
            backend.calls,
            ["begin", "depth", "color", "frustum", "finish"]
        );
        assert_eq!(report.frame, 0);
        assert_eq!(driver.stage(), FrameStage::Idle);
        assert_eq!(driver.frames_rendered(), 1);
    }

    #[test]
    fn failed_frame_returns_to_idle() {
        let mut driver = FrameDriver::new();
        let mut backend = Recorder {
            fail_color: true,
            ..Recorder::default()
        };
        let config = FrameConfig::new(Settings::default(), 1.0);
        let err = driver.render(&config, &mut backend).unwrap_err();
        assert!(format!("{err:#}").contains("device lost"));
        assert_eq!(driver.stage(), FrameStage::Idle);
        assert_eq!(driver.frames_rendered(), 0);
        assert!(!backend.calls.contains(&"finish"));
    }

    #[test]
    fn light_on_its_target_skips_both_passes() {
        let mut settings = Settings::default();
        settings.light_position = Vec3::new(2.5, 4.0, 3.5);
        settings.light_target = settings.light_position;
        let mut driver = FrameDriver::new();
        let mut backend = Recorder::default();
        let result = driver.render(&FrameConfig::new(settings, 1.0), &mut backend);
        assert!(result.is_err());
        assert_eq!(backend.calls, ["begin"]);
        assert_eq!(driver.stage(), FrameStage::Idle);
    }
}
