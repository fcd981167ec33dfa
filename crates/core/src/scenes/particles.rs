use std::f32::consts::TAU;

use crate::{
    render::Surface,
    scene::{Rgba, SceneConfig, SurfaceSize, VisualScene},
    AudioFeatureFrame,
};

use super::PARTICLE_BURST;

const MAX_PARTICLES: usize = 1000;
const BEAT_ATTACK: f32 = 0.3;
const BEAT_LEVEL: f32 = 0.6;
const DRAG: f32 = 0.995;
const LIFE_DECAY: f32 = 0.015;

/// Slot index plus the generation it was issued for. A handle goes stale
/// once its particle dies, even if the slot is later reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParticleHandle {
    index: usize,
    generation: u32,
}

impl ParticleHandle {
    pub fn index(&self) -> usize {
        self.index
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Particle {
    pub position: (f32, f32),
    pub velocity: (f32, f32),
    /// Remaining life in `(0, 1]`.
    pub life: f32,
}

#[derive(Debug, Default)]
struct Entry {
    generation: u32,
    particle: Option<Particle>,
}

impl Entry {
    /// Empties the entry. Returns whether a particle was removed.
    fn vacate(&mut self) -> bool {
        if self.particle.take().is_some() {
            self.generation = self.generation.wrapping_add(1);
            true
        } else {
            false
        }
    }
}

/// Fixed-capacity particle storage. Dead slots go on a free list and are
/// reused before the arena grows.
#[derive(Debug)]
pub struct ParticleArena {
    entries: Vec<Entry>,
    free: Vec<usize>,
    capacity: usize,
}

impl ParticleArena {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            free: Vec::new(),
            capacity,
        }
    }

    /// Stores `particle`, or returns `None` when every slot is alive.
    pub fn spawn(&mut self, particle: Particle) -> Option<ParticleHandle> {
        let index = match self.free.pop() {
            Some(index) => index,
            None if self.entries.len() < self.capacity => {
                self.entries.push(Entry::default());
                self.entries.len() - 1
            }
            None => return None,
        };
        let entry = &mut self.entries[index];
        entry.particle = Some(particle);
        Some(ParticleHandle {
            index,
            generation: entry.generation,
        })
    }

    fn entry(&self, handle: ParticleHandle) -> Option<&Entry> {
        self.entries
            .get(handle.index)
            .filter(|entry| entry.generation == handle.generation)
    }

    pub fn get(&self, handle: ParticleHandle) -> Option<&Particle> {
        self.entry(handle).and_then(|entry| entry.particle.as_ref())
    }

    /// Frees the particle behind `handle`. Stale handles are ignored.
    pub fn release(&mut self, handle: ParticleHandle) {
        let Some(entry) = self.entries.get_mut(handle.index) else {
            return;
        };
        if entry.generation == handle.generation && entry.vacate() {
            self.free.push(handle.index);
        }
    }

    pub fn live(&self) -> usize {
        self.entries.len() - self.free.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.entries.iter().filter_map(|entry| entry.particle.as_ref())
    }

    /// Runs `step` on every live particle and releases those it reports dead.
    pub fn retain_mut(&mut self, mut step: impl FnMut(&mut Particle) -> bool) {
        for (index, entry) in self.entries.iter_mut().enumerate() {
            let Some(particle) = entry.particle.as_mut() else {
                continue;
            };
            if !step(particle) && entry.vacate() {
                self.free.push(index);
            }
        }
    }

    /// Releases every particle. Outstanding handles all go stale.
    pub fn clear(&mut self) {
        for (index, entry) in self.entries.iter_mut().enumerate() {
            if entry.vacate() {
                self.free.push(index);
            }
        }
    }
}

/// Particles thrown out of the centre on every strong bass hit.
#[derive(Debug)]
pub struct ParticleBurst {
    color: Rgba,
    unit: f32,
    arena: ParticleArena,
    dot_radius: f32,
    rng: fastrand::Rng,
    visible: bool,
    disposed: bool,
}

impl ParticleBurst {
    pub fn new(size: SurfaceSize, config: &SceneConfig) -> Self {
        Self {
            color: config.foreground,
            unit: size.width.min(size.height).max(1) as f32,
            arena: ParticleArena::with_capacity(MAX_PARTICLES),
            dot_radius: 1.0,
            rng: fastrand::Rng::new(),
            visible: false,
            disposed: false,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = fastrand::Rng::with_seed(seed);
        self
    }

    pub fn arena(&self) -> &ParticleArena {
        &self.arena
    }

    /// Spawns `count` particles at the centre. Stops early once the arena
    /// is full.
    pub fn emit(&mut self, count: usize) {
        for _ in 0..count {
            let angle = self.rng.f32() * TAU;
            let power = (self.rng.f32() * 0.25 + 0.1) * self.unit * 0.02;
            let particle = Particle {
                position: (0.0, 0.0),
                velocity: (angle.cos() * power, angle.sin() * power),
                life: 1.0,
            };
            if self.arena.spawn(particle).is_none() {
                break;
            }
        }
    }
}

impl VisualScene for ParticleBurst {
    fn name(&self) -> &str {
        PARTICLE_BURST
    }

    fn update(&mut self, frame: &AudioFeatureFrame, _elapsed: f32) {
        if self.disposed {
            return;
        }
        if frame.bass_attack > BEAT_ATTACK && frame.bass > BEAT_LEVEL {
            let t = ((frame.bass - BEAT_LEVEL) / (1.0 - BEAT_LEVEL)).clamp(0.0, 1.0);
            self.emit((10.0 + t * 40.0) as usize);
        }

        self.dot_radius = 0.5 + frame.treble.clamp(0.0, 1.0) * 2.0;
        self.arena.retain_mut(|particle| {
            particle.position.0 += particle.velocity.0;
            particle.position.1 += particle.velocity.1;
            particle.velocity.0 *= DRAG;
            particle.velocity.1 *= DRAG;
            particle.life -= LIFE_DECAY;
            particle.life > 0.0
        });
    }

    fn show(&mut self) {
        self.visible = !self.disposed;
    }

    fn hide(&mut self) {
        self.visible = false;
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn render(&self, target: &mut Surface) {
        if !self.visible {
            return;
        }
        let cx = target.width() as f32 / 2.0;
        let cy = target.height() as f32 / 2.0;
        for particle in self.arena.iter() {
            let alpha = (particle.life.clamp(0.0, 1.0) * self.color.a as f32) as u8;
            let (x, y) = particle.position;
            target.fill_circle((cx + x, cy + y), self.dot_radius, self.color.with_alpha(alpha));
        }
    }

    fn update_foreground_color(&mut self, color: Rgba) {
        self.color = color;
    }

    fn dispose(&mut self) {
        self.arena.clear();
        self.visible = false;
        self.disposed = true;
    }
}
