use crate::detection::Detection;
use crate::utils::bbox::BoundingBox;
use rand::distributions::Uniform;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Moves a single box around: every step the position drifts by a random amount added to the
/// constant velocity and the size drifts randomly.
///
pub struct BoxGen {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    vx: f32,
    vy: f32,
    gen: StdRng,
    dist_pos: Uniform<f32>,
    dist_box: Uniform<f32>,
}

impl BoxGen {
    /// # Parameters
    /// * `seed` - the generator is reproducible for the same seed
    /// * `x`, `y` - left top corner of the initial box
    /// * `pos_drift` - maximal random position change per step
    /// * `box_drift` - maximal random size change per step
    ///
    pub fn new(
        seed: u64,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        pos_drift: f32,
        box_drift: f32,
    ) -> Self {
        Self {
            x,
            y,
            width,
            height,
            vx: 0.0,
            vy: 0.0,
            gen: StdRng::seed_from_u64(seed),
            dist_pos: Uniform::new_inclusive(-pos_drift, pos_drift),
            dist_box: Uniform::new_inclusive(-box_drift, box_drift),
        }
    }

    /// Adds the constant velocity to the random drift
    pub fn with_velocity(mut self, vx: f32, vy: f32) -> Self {
        self.vx = vx;
        self.vy = vy;
        self
    }
}

impl Iterator for BoxGen {
    type Item = BoundingBox;

    fn next(&mut self) -> Option<Self::Item> {
        self.x += self.vx + self.gen.sample(self.dist_pos);
        self.y += self.vy + self.gen.sample(self.dist_pos);

        self.width = (self.width + self.gen.sample(self.dist_box)).max(1.0);
        self.height = (self.height + self.gen.sample(self.dist_box)).max(1.0);

        Some(BoundingBox::ltwh(self.x, self.y, self.width, self.height))
    }
}

/// Detections of a frame with the index of the object (in the generator) each one belongs to
pub type GeneratedFrame = Vec<(usize, Detection)>;

/// Synthetic detector: a set of moving objects which are sometimes missed and sometimes
/// detected with a low confidence.
///
pub struct DetectionGen {
    objects: Vec<BoxGen>,
    frame: usize,
    gen: StdRng,
    miss_probability: f64,
    low_confidence_probability: f64,
    high_confidence: Uniform<f32>,
    low_confidence: Uniform<f32>,
}

impl DetectionGen {
    /// Creates `n` objects spread over a `width` x `height` scene
    ///
    pub fn new(seed: u64, n: usize, width: f32, height: f32) -> Self {
        let mut gen = StdRng::seed_from_u64(seed);
        let objects = (0..n)
            .map(|i| {
                let x = gen.gen_range(0.0..width.max(1.0));
                let y = gen.gen_range(0.0..height.max(1.0));
                let w = gen.gen_range(20.0..60.0);
                let h = gen.gen_range(40.0..120.0);
                BoxGen::new(seed.wrapping_add(i as u64 + 1), x, y, w, h, 1.0, 0.5)
                    .with_velocity(gen.gen_range(-4.0..4.0), gen.gen_range(-4.0..4.0))
            })
            .collect();

        Self {
            objects,
            frame: 0,
            gen,
            miss_probability: 0.0,
            low_confidence_probability: 0.0,
            high_confidence: Uniform::new_inclusive(0.7, 1.0),
            low_confidence: Uniform::new(0.15, 0.5),
        }
    }

    /// Probability of an object to be absent in a frame
    pub fn miss_probability(mut self, p: f64) -> Self {
        self.miss_probability = p.clamp(0.0, 1.0);
        self
    }

    /// Probability of an object to be detected with a confidence within `[0.15, 0.5)`
    pub fn low_confidence_probability(mut self, p: f64) -> Self {
        self.low_confidence_probability = p.clamp(0.0, 1.0);
        self
    }

    pub fn objects(&self) -> usize {
        self.objects.len()
    }

    /// Strips the object indices
    pub fn detections(frame: &GeneratedFrame) -> Vec<Detection> {
        frame.iter().map(|(_, d)| *d).collect()
    }
}

impl Iterator for DetectionGen {
    type Item = GeneratedFrame;

    fn next(&mut self) -> Option<Self::Item> {
        self.frame += 1;
        let mut res = Vec::with_capacity(self.objects.len());
        for (i, o) in self.objects.iter_mut().enumerate() {
            let bbox = o.next()?;
            if self.gen.gen_bool(self.miss_probability) {
                continue;
            }
            let confidence = if self.gen.gen_bool(self.low_confidence_probability) {
                self.gen.sample(self.low_confidence)
            } else {
                self.gen.sample(self.high_confidence)
            };
            if let Ok(d) = Detection::new(bbox, confidence) {
                res.push((i, d.with_frame(self.frame)));
            }
        }
        Some(res)
    }
}
