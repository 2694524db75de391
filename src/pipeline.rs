// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # V1 Pipeline
//!
//! Wires the filtering, inhibition and complex-cell crates into the standard primary visual
//! cortex model:
//!
//! ```text
//! image ─► conv(filters) ─► [neighbor inhibition] ─► [kWTA pool] ─► V1 simple
//! V1 simple ─► max_pool ─────────────────────────────────────────► pooled polarity
//! V1 simple ─► max_reduce_filter_y ─► max_pool ─► len_sum4 ──────► length-sum
//!                                              └► end_stop4 ─────► end-stop (2 directions)
//! length-sum, end-stop, pooled ─► feat_agg ──────────────────────► V1 all [Y, X, 5, Angle]
//! ```
//!
//! All intermediate tensors are owned by the pipeline and reused between frames, so a stream
//! of same-sized images allocates only on the first frame.

use feagi_vision_complex::{end_stop4, len_sum4, ComplexError};
use feagi_vision_config::{
    validate_config, ConfigError, FffbConfig, KwtaConfig, VisionConfig,
};
use feagi_vision_filter::{
    conv, deconv, ensure_shape, feat_agg, max_pool, max_reduce_filter_y, unit_norm, unpool,
    wrap_pad_xy, FilterError, Geom, Point2, UnPoolMode, WorkerPool,
};
use feagi_vision_inhibition::{
    Chans, FffbParams, InhibitionError, Inhibs, Kwta, KwtaParams, KwtaReport, NeighInhib,
    Nxx1Params,
};
use ndarray::{s, Array2, Array3, Array4};
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Rows of the combined V1 output: length-sum, 2 end-stop directions, 2 polarities
pub const V1_ALL_ROWS: usize = 5;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Inhibition(#[from] InhibitionError),

    #[error(transparent)]
    Complex(#[from] ComplexError),

    /// A stage was run before the stage that produces its input for the current frame
    #[error("{stage} needs {needs} output for the current frame")]
    NotReady {
        stage: &'static str,
        needs: &'static str,
    },
}

pub type Result<T> = core::result::Result<T, PipelineError>;

fn fffb_params(c: &FffbConfig) -> FffbParams {
    FffbParams {
        on: c.on,
        gi: c.gi,
        ff: c.ff,
        fb: c.fb,
        fb_tau: c.fb_tau,
        max_vs_avg: c.max_vs_avg,
        ff0: c.ff0,
    }
}

fn kwta_params(c: &KwtaConfig) -> Result<KwtaParams> {
    let xx1 = Nxx1Params::builder()
        .thr(c.xx1.thr)
        .gain(c.xx1.gain)
        .nvar(c.xx1.nvar)
        .sig_mult(c.xx1.sig_mult)
        .sig_mult_pow(c.xx1.sig_mult_pow)
        .sig_gain(c.xx1.sig_gain)
        .interp_range(c.xx1.interp_range)
        .gain_cor_range(c.xx1.gain_cor_range)
        .gain_cor(c.xx1.gain_cor)
        .build()?;
    Ok(KwtaParams {
        on: c.on,
        iters: c.iters,
        del_act_thr: c.del_act_thr,
        layer: fffb_params(&c.layer),
        pool: fffb_params(&c.pool),
        xx1,
        act_tau: c.act_tau,
        gbar: Chans::new(c.gbar.e, c.gbar.l, c.gbar.i, c.gbar.k),
        erev: Chans::new(c.erev.e, c.erev.l, c.erev.i, c.erev.k),
    })
}

/// Last stage completed for the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Stage {
    Idle,
    Simple,
    Complex,
}

fn empty4() -> Array4<f32> {
    Array4::zeros((0, 0, 0, 0))
}

/// Simple and complex V1 filtering over a fixed filter bank
#[derive(Debug)]
pub struct V1Pipeline {
    workers: WorkerPool,
    geom: Geom,
    gain: f32,
    filters: Array3<f32>,
    neigh: NeighInhib,
    kwta: Kwta,
    pool_size: Point2,
    pool_spacing: Point2,
    unpool_rng: Option<StdRng>,

    stage: Stage,
    image_size: (usize, usize),
    v1s: Array4<f32>,
    ext_gi: Array4<f32>,
    kwta_act: Array4<f32>,
    inhibs: Inhibs,
    last_report: Option<KwtaReport>,
    pooled: Array4<f32>,
    angle_only: Array4<f32>,
    angle_pool: Array4<f32>,
    len_sum: Array4<f32>,
    end_stop: Array4<f32>,
    v1_all: Array4<f32>,
    unpooled: Array4<f32>,
    reconstruction: Array2<f32>,
}

impl V1Pipeline {
    /// Validate `config` and build a pipeline around `filters` `[Angle, FY, FX]`.
    ///
    /// The filter bank's own extent is used for the geometry; a different
    /// `geometry.filter_size` in the config is logged and ignored.
    pub fn from_config(config: &VisionConfig, filters: Array3<f32>) -> Result<Self> {
        validate_config(config)?;
        let kwta = Kwta::new(kwta_params(&config.kwta)?)?;

        let (_, fy, fx) = filters.dim();
        let [cfg_x, cfg_y] = config.geometry.filter_size;
        if (cfg_x, cfg_y) != (fx, fy) {
            warn!(
                configured = ?config.geometry.filter_size,
                actual = ?[fx, fy],
                "filter bank size differs from geometry.filter_size, using the bank's"
            );
        }
        let [bx, by] = config.geometry.border;
        let [sx, sy] = config.geometry.spacing;
        let geom = Geom::new(Point2::new(bx, by), Point2::new(sx, sy), Point2::new(fx, fy));

        let pooling = &config.pooling;
        let unpool_rng = match (pooling.randomize_unpool, pooling.seed) {
            (false, _) => None,
            (true, Some(seed)) => Some(StdRng::seed_from_u64(seed)),
            (true, None) => Some(StdRng::from_entropy()),
        };

        let workers = WorkerPool::new(config.system.resolved_workers());
        info!(
            workers = workers.workers(),
            filters = filters.dim().0,
            kwta = kwta.is_on(),
            neigh_inhib = config.neigh_inhib.on,
            "V1 pipeline configured"
        );

        Ok(Self {
            workers,
            geom,
            gain: config.geometry.gain,
            filters,
            neigh: NeighInhib {
                on: config.neigh_inhib.on,
                gi: config.neigh_inhib.gi,
            },
            kwta,
            pool_size: Point2::new(pooling.size[0], pooling.size[1]),
            pool_spacing: Point2::new(pooling.spacing[0], pooling.spacing[1]),
            unpool_rng,
            stage: Stage::Idle,
            image_size: (0, 0),
            v1s: empty4(),
            ext_gi: empty4(),
            kwta_act: empty4(),
            inhibs: Inhibs::new(),
            last_report: None,
            pooled: empty4(),
            angle_only: empty4(),
            angle_pool: empty4(),
            len_sum: empty4(),
            end_stop: empty4(),
            v1_all: empty4(),
            unpooled: empty4(),
            reconstruction: Array2::zeros((0, 0)),
        })
    }

    /// Border the filters need on each side of a raw image, per axis
    pub fn padding(&self) -> Point2 {
        self.geom.border
    }

    /// Copy `raw` into the centre of a raster with [`Self::padding`] on each side and fill
    /// the border by wrapping the image around.
    pub fn prepare_image(&self, raw: &Array2<f32>) -> Result<Array2<f32>> {
        let pad = self.padding();
        let (ry, rx) = raw.dim();
        let mut image = Array2::zeros((ry + 2 * pad.y, rx + 2 * pad.x));
        image
            .slice_mut(s![pad.y..pad.y + ry, pad.x..pad.x + rx])
            .assign(raw);
        wrap_pad_xy(&mut image, pad)?;
        Ok(image)
    }

    fn require(&self, stage: &'static str, needed: Stage) -> Result<()> {
        if self.stage >= needed {
            return Ok(());
        }
        let needs = match needed {
            Stage::Complex => "v1_complex",
            _ => "v1_simple",
        };
        Err(PipelineError::NotReady { stage, needs })
    }

    /// Simple cells: filter `image` (already padded), then compete under kWTA.
    ///
    /// Neighbor inhibition, when on, feeds the solver as external inhibition. With kWTA off
    /// the rectified filter output passes through unchanged.
    pub fn v1_simple(&mut self, image: &Array2<f32>) -> Result<&Array4<f32>> {
        self.stage = Stage::Idle;
        conv(
            &self.workers,
            &mut self.geom,
            &self.filters,
            image,
            &mut self.v1s,
            self.gain,
        )?;
        self.image_size = image.dim();

        if self.neigh.on {
            self.neigh.inhib4(&self.workers, &self.v1s, &mut self.ext_gi)?;
        } else {
            ensure_shape(&mut self.ext_gi, self.v1s.raw_dim());
            self.ext_gi.fill(0.0);
        }

        if self.kwta.is_on() {
            let ext = self.neigh.on.then_some(&self.ext_gi);
            let report = self
                .kwta
                .kwta_pool(&self.v1s, &mut self.kwta_act, &mut self.inhibs, ext);
            if !report.converged {
                debug!(
                    iterations = report.iterations,
                    max_delta_act = report.max_delta_act,
                    "V1 simple kWTA stopped at its iteration limit"
                );
            }
            self.last_report = Some(report);
        } else {
            ensure_shape(&mut self.kwta_act, self.v1s.raw_dim());
            self.kwta_act.assign(&self.v1s);
            self.last_report = None;
        }
        self.stage = Stage::Simple;
        Ok(&self.kwta_act)
    }

    /// Complex cells from the last [`Self::v1_simple`] output
    pub fn v1_complex(&mut self) -> Result<()> {
        self.require("v1_complex", Stage::Simple)?;
        self.stage = Stage::Simple;
        let (psz, spc) = (self.pool_size, self.pool_spacing);
        max_pool(&self.workers, psz, spc, &self.kwta_act, &mut self.pooled)?;
        max_reduce_filter_y(&self.workers, &self.kwta_act, &mut self.angle_only)?;
        max_pool(&self.workers, psz, spc, &self.angle_only, &mut self.angle_pool)?;
        len_sum4(&self.workers, &self.angle_pool, &mut self.len_sum)?;
        end_stop4(&self.workers, &self.angle_pool, &self.len_sum, &mut self.end_stop)?;
        debug!(pooled = ?self.pooled.shape(), "V1 complex done");
        self.stage = Stage::Complex;
        Ok(())
    }

    /// Gather length-sum, end-stop and pooled polarity into one `[Y, X, 5, Angle]` tensor.
    ///
    /// Needs [`Self::v1_complex`] to have run on the current frame.
    pub fn v1_all(&mut self) -> Result<&Array4<f32>> {
        self.require("v1_all", Stage::Complex)?;
        let (ny, nx, _, nang) = self.pooled.dim();
        ensure_shape(&mut self.v1_all, (ny, nx, V1_ALL_ROWS, nang));
        feat_agg(&self.workers, &[0], 0, &self.len_sum, &mut self.v1_all)?;
        feat_agg(&self.workers, &[0, 1], 1, &self.end_stop, &mut self.v1_all)?;
        feat_agg(&self.workers, &[0, 1], 3, &self.pooled, &mut self.v1_all)?;
        Ok(&self.v1_all)
    }

    /// Simple, complex and combined stages for one padded image
    pub fn run(&mut self, image: &Array2<f32>) -> Result<&Array4<f32>> {
        self.v1_simple(image)?;
        self.v1_complex()?;
        self.v1_all()
    }

    /// Image implied by the pooled simple cells: un-pool, deconvolve, scale to 0..1.
    ///
    /// Un-pooling puts each pooled value on one random cell of its window when
    /// `pooling.randomize_unpool` is set, else on every cell. Needs [`Self::v1_complex`] to
    /// have run on the current frame.
    pub fn reconstruct(&mut self) -> Result<&Array2<f32>> {
        self.require("reconstruct", Stage::Complex)?;
        let image_size = self.image_size;
        ensure_shape(&mut self.unpooled, self.v1s.raw_dim());
        self.unpooled.fill(0.0);
        let mode = match self.unpool_rng.as_mut() {
            Some(rng) => UnPoolMode::Randomized(rng),
            None => UnPoolMode::Broadcast,
        };
        unpool(
            &self.workers,
            self.pool_size,
            self.pool_spacing,
            &self.pooled,
            &mut self.unpooled,
            mode,
        )?;

        ensure_shape(&mut self.reconstruction, image_size);
        self.reconstruction.fill(0.0);
        deconv(
            &mut self.geom,
            &self.filters,
            &mut self.reconstruction,
            &self.unpooled,
        )?;
        unit_norm(&mut self.reconstruction);
        Ok(&self.reconstruction)
    }

    pub fn geom(&self) -> &Geom {
        &self.geom
    }

    pub fn worker_pool(&self) -> &WorkerPool {
        &self.workers
    }

    pub fn kwta(&self) -> &Kwta {
        &self.kwta
    }

    pub fn neigh_inhib(&self) -> &NeighInhib {
        &self.neigh
    }

    /// Rectified filter output `[Y, X, 2, Angle]`
    pub fn v1s(&self) -> &Array4<f32> {
        &self.v1s
    }

    /// External inhibition from the neighbors (zeros when neighbor inhibition is off)
    pub fn ext_gi(&self) -> &Array4<f32> {
        &self.ext_gi
    }

    /// Simple-cell activation after kWTA
    pub fn kwta_act(&self) -> &Array4<f32> {
        &self.kwta_act
    }

    /// Per-pool inhibition from the last kWTA solve
    pub fn inhibs(&self) -> &Inhibs {
        &self.inhibs
    }

    pub fn last_report(&self) -> Option<&KwtaReport> {
        self.last_report.as_ref()
    }

    pub fn pooled(&self) -> &Array4<f32> {
        &self.pooled
    }

    pub fn angle_pool(&self) -> &Array4<f32> {
        &self.angle_pool
    }

    pub fn len_sum(&self) -> &Array4<f32> {
        &self.len_sum
    }

    pub fn end_stop(&self) -> &Array4<f32> {
        &self.end_stop
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Four 3x3 line detectors: `-`, `/`, `|`, `\`
    fn line_filters() -> Array3<f32> {
        let mut f = Array3::from_elem((4, 3, 3), -0.5f32);
        for i in 0..3 {
            f[[0, 1, i]] = 1.0;
            f[[1, 2 - i, i]] = 1.0;
            f[[2, i, 1]] = 1.0;
            f[[3, i, i]] = 1.0;
        }
        f
    }

    fn small_config() -> VisionConfig {
        let mut config = VisionConfig::default();
        config.system.max_workers = 2;
        config.geometry.filter_size = [3, 3];
        config.geometry.spacing = [1, 1];
        config.pooling.seed = Some(7);
        config
    }

    fn bar_image(v1: &V1Pipeline) -> Array2<f32> {
        let mut raw = Array2::zeros((16, 16));
        raw.slice_mut(s![7..9, 2..14]).fill(1.0);
        v1.prepare_image(&raw).unwrap()
    }

    #[test]
    fn test_from_config_rejects_invalid() {
        let mut config = small_config();
        config.kwta.iters = 0;
        let err = V1Pipeline::from_config(&config, line_filters()).unwrap_err();
        assert!(matches!(err, PipelineError::Config(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_stages_need_simple_output() {
        let mut v1 = V1Pipeline::from_config(&small_config(), line_filters()).unwrap();
        assert!(matches!(
            v1.v1_complex(),
            Err(PipelineError::NotReady {
                stage: "v1_complex",
                needs: "v1_simple"
            })
        ));
        assert!(matches!(
            v1.reconstruct(),
            Err(PipelineError::NotReady { stage: "reconstruct", .. })
        ));
    }

    #[test]
    fn test_combined_output_needs_complex_for_current_frame() {
        let mut v1 = V1Pipeline::from_config(&small_config(), line_filters()).unwrap();
        let image = bar_image(&v1);

        v1.v1_simple(&image).unwrap();
        assert!(matches!(
            v1.v1_all(),
            Err(PipelineError::NotReady {
                stage: "v1_all",
                needs: "v1_complex"
            })
        ));
        assert!(matches!(
            v1.reconstruct(),
            Err(PipelineError::NotReady {
                stage: "reconstruct",
                needs: "v1_complex"
            })
        ));

        // a new frame invalidates the previous frame's complex output
        v1.run(&image).unwrap();
        let blank = Array2::zeros(image.dim());
        v1.v1_simple(&blank).unwrap();
        assert!(v1.v1_all().is_err());
        assert!(v1.reconstruct().is_err());

        v1.v1_complex().unwrap();
        assert_eq!(v1.v1_all().unwrap().shape(), &[8, 8, V1_ALL_ROWS, 4]);
        assert!(v1.reconstruct().is_ok());
    }

    #[test]
    fn test_prepare_image_pads_for_filters() {
        let v1 = V1Pipeline::from_config(&small_config(), line_filters()).unwrap();
        assert_eq!(v1.padding(), Point2::splat(2));
        let image = bar_image(&v1);
        assert_eq!(image.dim(), (20, 20));
        assert_eq!(image[[9, 6]], 1.0);
    }

    #[test]
    fn test_asymmetric_border_pads_each_axis() {
        let mut config = small_config();
        config.geometry.border = [3, 0];
        let mut v1 = V1Pipeline::from_config(&config, line_filters()).unwrap();
        assert_eq!(v1.padding(), Point2::new(3, 2));

        let image = bar_image(&v1);
        assert_eq!(image.dim(), (20, 22));
        assert_eq!(image[[9, 7]], 1.0);
        assert_eq!(image[[2, 3]], 0.0);

        v1.v1_simple(&image).unwrap();
        assert_eq!(v1.v1s().shape(), &[16, 16, 2, 4]);
    }

    #[test]
    fn test_full_run_shapes() {
        let mut v1 = V1Pipeline::from_config(&small_config(), line_filters()).unwrap();
        let image = bar_image(&v1);

        let shape = v1.run(&image).unwrap().shape().to_vec();
        assert_eq!(v1.v1s().shape(), &[16, 16, 2, 4]);
        assert_eq!(v1.kwta_act().shape(), &[16, 16, 2, 4]);
        assert_eq!(v1.pooled().shape(), &[8, 8, 2, 4]);
        assert_eq!(v1.angle_pool().shape(), &[8, 8, 1, 4]);
        assert_eq!(v1.len_sum().shape(), &[8, 8, 1, 4]);
        assert_eq!(v1.end_stop().shape(), &[8, 8, 2, 4]);
        assert_eq!(v1.inhibs().len(), 16 * 16);
        assert!(v1.last_report().is_some());
        assert_eq!(shape, vec![8, 8, V1_ALL_ROWS, 4]);
    }

    #[test]
    fn test_v1_all_rows_copy_their_sources() {
        let mut v1 = V1Pipeline::from_config(&small_config(), line_filters()).unwrap();
        let image = bar_image(&v1);
        v1.run(&image).unwrap();
        let all = v1.v1_all().unwrap().clone();

        // rows 3 and 4 hold the pooled polarity channels
        for y in 0..8 {
            for x in 0..8 {
                for ang in 0..4 {
                    assert_eq!(all[[y, x, 3, ang]], v1.pooled()[[y, x, 0, ang]]);
                    assert_eq!(all[[y, x, 4, ang]], v1.pooled()[[y, x, 1, ang]]);
                }
            }
        }
    }

    #[test]
    fn test_kwta_off_passes_filter_output() {
        let mut config = small_config();
        config.kwta.on = false;
        let mut v1 = V1Pipeline::from_config(&config, line_filters()).unwrap();
        let image = bar_image(&v1);
        v1.v1_simple(&image).unwrap();

        assert_eq!(v1.kwta_act(), v1.v1s());
        assert!(v1.last_report().is_none());
        assert!(v1.ext_gi().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_neighbor_inhibition_feeds_ext_gi() {
        let mut config = small_config();
        config.neigh_inhib.on = true;
        let mut v1 = V1Pipeline::from_config(&config, line_filters()).unwrap();
        let image = bar_image(&v1);
        v1.v1_simple(&image).unwrap();

        assert!(v1.ext_gi().iter().any(|&v| v > 0.0));
        assert!(v1.last_report().is_some_and(|r| r.ext_gi_used));
    }

    #[test]
    fn test_reconstruction_is_unit_range() {
        let mut v1 = V1Pipeline::from_config(&small_config(), line_filters()).unwrap();
        let image = bar_image(&v1);
        v1.run(&image).unwrap();

        let recon = v1.reconstruct().unwrap();
        assert_eq!(recon.dim(), image.dim());
        let max = recon.iter().cloned().fold(f32::MIN, f32::max);
        let min = recon.iter().cloned().fold(f32::MAX, f32::min);
        assert!((max - 1.0).abs() < 1e-6);
        assert!(min.abs() < 1e-6);
    }

    #[test]
    fn test_seeded_reconstruction_repeats() {
        let config = small_config();
        let mut a = V1Pipeline::from_config(&config, line_filters()).unwrap();
        let mut b = V1Pipeline::from_config(&config, line_filters()).unwrap();
        let image = bar_image(&a);
        a.run(&image).unwrap();
        b.run(&image).unwrap();
        assert_eq!(a.reconstruct().unwrap(), b.reconstruct().unwrap());
    }
}
