//! Instrumented scene used by the crate's tests and by downstream drivers
//! that want to observe orchestration without drawing anything real.

use std::sync::{Arc, Mutex};

use crate::{
    catalog::SceneFactory,
    render::Surface,
    scene::{Rgba, SceneConfig, SurfaceSize, VisualScene},
    AudioFeatureFrame, Result,
};

/// Everything a [`ProbeScene`] has been asked to do.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeLog {
    pub updates: usize,
    pub last_elapsed: Option<f32>,
    pub shows: usize,
    pub hides: usize,
    pub disposed: bool,
    pub visible: bool,
    pub updates_after_dispose: usize,
    pub foreground: Option<Rgba>,
}

/// Scene that fills the target with a flat color and records every call.
#[derive(Debug)]
pub struct ProbeScene {
    name: String,
    color: Rgba,
    tintable: bool,
    log: Arc<Mutex<ProbeLog>>,
}

impl ProbeScene {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_log(name, Rgba::WHITE, Arc::default())
    }

    pub fn with_log(name: impl Into<String>, color: Rgba, log: Arc<Mutex<ProbeLog>>) -> Self {
        Self {
            name: name.into(),
            color,
            tintable: true,
            log,
        }
    }

    /// Makes the scene ignore foreground color changes.
    pub fn without_tint(mut self) -> Self {
        self.tintable = false;
        self
    }

    pub fn log(&self) -> Arc<Mutex<ProbeLog>> {
        Arc::clone(&self.log)
    }

    fn record(&self, f: impl FnOnce(&mut ProbeLog)) {
        if let Ok(mut log) = self.log.lock() {
            f(&mut log);
        }
    }

    fn visible(&self) -> bool {
        self.log.lock().map(|log| log.visible).unwrap_or(false)
    }
}

impl VisualScene for ProbeScene {
    fn name(&self) -> &str {
        &self.name
    }

    fn update(&mut self, _frame: &AudioFeatureFrame, elapsed: f32) {
        self.record(|log| {
            log.updates += 1;
            log.last_elapsed = Some(elapsed);
            if log.disposed {
                log.updates_after_dispose += 1;
            }
        });
    }

    fn show(&mut self) {
        self.record(|log| {
            log.shows += 1;
            log.visible = true;
        });
    }

    fn hide(&mut self) {
        self.record(|log| {
            log.hides += 1;
            log.visible = false;
        });
    }

    fn is_visible(&self) -> bool {
        self.visible()
    }

    fn render(&self, target: &mut Surface) {
        if self.visible() {
            target.clear(self.color);
        }
    }

    fn update_foreground_color(&mut self, color: Rgba) {
        if self.tintable {
            self.color = color;
            self.record(|log| log.foreground = Some(color));
        }
    }

    fn dispose(&mut self) {
        self.record(|log| {
            log.disposed = true;
            log.visible = false;
        });
    }
}

/// Factory producing [`ProbeScene`]s. Every instance gets its own log, kept
/// in creation order.
#[derive(Debug, Clone)]
pub struct ProbeFactory {
    pub name: String,
    pub color: Rgba,
    created: Arc<Mutex<Vec<Arc<Mutex<ProbeLog>>>>>,
}

impl ProbeFactory {
    pub fn new(name: impl Into<String>, color: Rgba) -> Self {
        Self {
            name: name.into(),
            color,
            created: Arc::default(),
        }
    }

    /// Snapshots of every instance created so far.
    pub fn instances(&self) -> Vec<ProbeLog> {
        let Ok(created) = self.created.lock() else {
            return Vec::new();
        };
        let logs: Vec<ProbeLog> = created
            .iter()
            .filter_map(|log| log.lock().ok().map(|log| log.clone()))
            .collect();
        logs
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().map(|created| created.len()).unwrap_or(0)
    }

    /// Snapshot of the most recently created instance.
    pub fn latest(&self) -> Option<ProbeLog> {
        self.instances().pop()
    }
}

impl SceneFactory for ProbeFactory {
    fn create(&self, _size: SurfaceSize, _config: &SceneConfig) -> Result<Box<dyn VisualScene>> {
        let log = Arc::new(Mutex::new(ProbeLog::default()));
        if let Ok(mut created) = self.created.lock() {
            created.push(Arc::clone(&log));
        }
        Ok(Box::new(ProbeScene::with_log(self.name.clone(), self.color, log)))
    }
}
