use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{
    config::AnimationConfig,
    raster::{CircleDescriptor, GlyphMap, Point},
    random::{RandomSource, XorShift64},
};

/// A circle chosen during spawning and where it lands inside its cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedCircle {
    pub circle: CircleDescriptor,
    pub offset: Point,
}

/// One rendered tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub index: u64,
    pub line: String,
    /// Circles spawned on this tick.
    pub circles: usize,
}

/// Scrolling window of upcoming columns that circles are painted into.
///
/// Every tick runs idle → spawning → compositing → idle and emits the front
/// column as one line of text.
#[derive(Debug, Clone)]
pub struct SceneComposer<R = XorShift64> {
    config: AnimationConfig,
    width: usize,
    columns: VecDeque<Vec<char>>,
    rng: R,
    sine_phase: f64,
    ticks: u64,
}

impl SceneComposer<XorShift64> {
    /// Seeds from `config.seed`, or from the wall clock when unset.
    pub fn new(config: AnimationConfig, width: usize) -> Self {
        let rng = match config.seed {
            Some(seed) => XorShift64::new(seed),
            None => XorShift64::from_time(),
        };
        Self::with_rng(config, width, rng)
    }
}

impl<R: RandomSource> SceneComposer<R> {
    /// Creates a composer drawing randomness from `rng`.
    pub fn with_rng(config: AnimationConfig, width: usize, rng: R) -> Self {
        Self {
            columns: VecDeque::with_capacity(config.window_len()),
            config,
            width,
            rng,
            sine_phase: 0.0,
            ticks: 0,
        }
    }

    /// Characters per emitted column.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn config(&self) -> &AnimationConfig {
        &self.config
    }

    /// Columns currently queued ahead of the render position.
    pub fn pending_columns(&self) -> usize {
        self.columns.len()
    }

    /// Advances one frame: tops up the window, maybe spawns a cluster and
    /// emits the front column.
    pub fn tick(&mut self) -> Frame {
        self.fill_window();

        let placed = self.spawn();
        if !placed.is_empty() {
            let cluster = self.rasterize_cluster(&placed);
            self.composite(&cluster);
        }

        let line = self.emit();
        let frame = Frame {
            index: self.ticks,
            line,
            circles: placed.len(),
        };
        self.ticks += 1;
        trace!(index = frame.index, circles = frame.circles, "scene tick");
        frame
    }

    /// Pads the queue with blank columns up to the window length.
    pub fn fill_window(&mut self) {
        while self.columns.len() < self.config.window_len() {
            self.columns.push_back(self.blank_column());
        }
    }

    /// Decides with one Bernoulli trial whether a cluster appears, and if so
    /// draws its circles.
    pub fn spawn(&mut self) -> Vec<PlacedCircle> {
        if !self.rng.chance(self.config.density) {
            return Vec::new();
        }

        let min = u64::from(self.config.min_radius);
        let max = u64::from(self.config.max_radius);
        let spread = u64::from(self.config.cluster_spread);
        let count = self.config.max_radius - self.config.min_radius;

        let placed: Vec<PlacedCircle> = (0..count)
            .map(|_| {
                let radius = self.rng.range_inclusive(min, max) as u32;
                let dx = self.rng.range_inclusive(0, spread) as i64;
                let dy = self.rng.range_inclusive(0, spread) as i64;
                PlacedCircle {
                    circle: CircleDescriptor {
                        radius,
                        center: Point::ORIGIN,
                    },
                    offset: Point::new(dx, dy),
                }
            })
            .collect();

        debug!(circles = placed.len(), "spawned moire cluster");
        placed
    }

    /// Rasterizes every circle, normalizes it, and moves it to its offset.
    pub fn rasterize_cluster(&self, placed: &[PlacedCircle]) -> GlyphMap {
        let mut cluster = GlyphMap::new();
        for placement in placed {
            let normalized = placement.circle.rasterize(self.config.moire_char).normalize();
            cluster.merge(
                &normalized
                    .image
                    .translate(placement.offset.x, placement.offset.y),
            );
        }
        cluster
    }

    /// Merges `image` into the queue starting at the front column, at a
    /// random position along the column. Cells past the width are clipped.
    pub fn composite(&mut self, image: &GlyphMap) {
        let normalized = image.normalize();
        if normalized.image.is_empty() {
            return;
        }

        let free_rows = (self.width as u64).saturating_sub(normalized.height);
        let row_offset = self.rng.range_inclusive(0, free_rows) as usize;

        while (self.columns.len() as u64) < normalized.width {
            self.columns.push_back(self.blank_column());
        }

        for (point, glyph) in normalized.image.iter() {
            let row = point.y as usize + row_offset;
            if row >= self.width {
                continue;
            }
            if let Some(column) = self.columns.get_mut(point.x as usize) {
                column[row] = glyph;
            }
        }
    }

    /// Pops the front column and renders it, stamping the sine trace.
    pub fn emit(&mut self) -> String {
        let mut column = self
            .columns
            .pop_front()
            .unwrap_or_else(|| self.blank_column());

        let sine = &self.config.sine;
        if sine.enabled {
            let row = sine_row(self.width, sine.amplitude, self.sine_phase);
            if let Some(cell) = row.and_then(|row| column.get_mut(row)) {
                if *cell == self.config.empty_char {
                    *cell = sine.glyph;
                }
            }
            self.sine_phase += sine.step;
        }

        column.into_iter().collect()
    }

    fn blank_column(&self) -> Vec<char> {
        vec![self.config.empty_char; self.width]
    }
}

/// Row of the sine trace for `phase`, or `None` when it falls off the column.
fn sine_row(width: usize, amplitude: u32, phase: f64) -> Option<usize> {
    let center = (width / 2) as f64;
    let row = center + (phase.sin() * f64::from(amplitude)).round();
    (row >= 0.0 && row < width as f64).then_some(row as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SineConfig;

    struct Zeros;

    impl RandomSource for Zeros {
        fn next_u64(&mut self) -> u64 {
            0
        }
    }

    fn quiet_config() -> AnimationConfig {
        AnimationConfig {
            sine: SineConfig {
                enabled: false,
                ..SineConfig::default()
            },
            seed: Some(11),
            ..AnimationConfig::default()
        }
    }

    #[test]
    fn window_is_refilled_every_tick() {
        let config = quiet_config();
        let window = config.window_len();
        let mut scene = SceneComposer::new(config, 40);

        for _ in 0..50 {
            let frame = scene.tick();
            assert_eq!(frame.line.chars().count(), 40);
            assert!(scene.pending_columns() >= window - 1);
        }
    }

    #[test]
    fn zero_density_emits_blank_lines() {
        let config = AnimationConfig {
            density: 0.0,
            ..quiet_config()
        };
        let mut scene = SceneComposer::new(config, 10);

        for _ in 0..20 {
            let frame = scene.tick();
            assert_eq!(frame.circles, 0);
            assert_eq!(frame.line, " ".repeat(10));
        }
    }

    #[test]
    fn same_seed_renders_same_frames() {
        let config = AnimationConfig {
            density: 0.8,
            ..quiet_config()
        };
        let mut a = SceneComposer::new(config.clone(), 60);
        let mut b = SceneComposer::new(config, 60);

        for _ in 0..100 {
            assert_eq!(a.tick(), b.tick());
        }
    }

    #[test]
    fn full_density_eventually_paints_glyphs() {
        let config = AnimationConfig {
            density: 1.0,
            ..quiet_config()
        };
        let mut scene = SceneComposer::new(config, 80);

        let painted = (0..20).any(|_| scene.tick().line.contains(':'));
        assert!(painted);
    }

    #[test]
    fn composites_normalized_circle_at_front() {
        let config = AnimationConfig {
            density: 1.0,
            min_radius: 1,
            max_radius: 2,
            ..quiet_config()
        };
        let mut scene = SceneComposer::with_rng(config, 4, Zeros);

        let frame = scene.tick();
        assert_eq!(frame.circles, 1);
        assert_eq!(frame.line, " :  ");
    }

    #[test]
    fn clusters_wider_than_window_grow_the_queue() {
        let config = AnimationConfig {
            min_radius: 1,
            max_radius: 1,
            ..quiet_config()
        };
        let window = config.window_len();
        let mut scene = SceneComposer::with_rng(config, 3, Zeros);
        scene.fill_window();

        let wide: GlyphMap = (0..10).map(|x| (Point::new(x, 0), '#')).collect();
        scene.composite(&wide);

        assert_eq!(window, 3);
        assert_eq!(scene.pending_columns(), 10);
    }

    #[test]
    fn narrow_terminal_clips_large_circles() {
        let config = AnimationConfig {
            density: 1.0,
            ..quiet_config()
        };
        let mut scene = SceneComposer::new(config, 3);

        for _ in 0..30 {
            assert_eq!(scene.tick().line.chars().count(), 3);
        }
    }

    #[test]
    fn sine_trace_starts_at_center() {
        let config = AnimationConfig {
            density: 0.0,
            sine: SineConfig::default(),
            ..quiet_config()
        };
        let mut scene = SceneComposer::new(config, 9);

        assert_eq!(scene.tick().line, "    _    ");
        assert_eq!(sine_row(9, 25, std::f64::consts::FRAC_PI_2), None);
        assert_eq!(sine_row(100, 25, std::f64::consts::FRAC_PI_2), Some(75));
    }
}
