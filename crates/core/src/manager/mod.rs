//! Five-slot scene orchestration.
//!
//! The manager is driven once per frame by [`SceneManager::update`]. Scene
//! loads are the only asynchronous work; they are started by
//! [`SceneManager::switch_to`] and [`SceneManager::reassign_slot`], polled at
//! the start of every tick, and installed only if the slot has not been
//! reassigned since the load began.

use std::{
    fmt,
    sync::Arc,
    task::{Context, Poll},
};

use futures::{future::join_all, task::noop_waker_ref, FutureExt};

use crate::{
    catalog::{InstanceFuture, SceneCatalog},
    render::{SceneGraph, Surface},
    scene::{is_empty_scene, Rgba, SceneConfig, SceneKey, SurfaceSize, VisualScene, EMPTY_SCENE},
    AppConfig, AudioFeatureFrame, FrameTime, Result, SlotDeckError, TransitionConfig,
    TransitionController,
};

/// Number of scene slots a manager owns.
pub const SLOT_COUNT: usize = 5;

/// One scene assignment plus its lazily realized instance.
pub struct Slot {
    name: String,
    instance: Option<Box<dyn VisualScene>>,
    generation: u64,
}

impl Slot {
    fn new() -> Self {
        Self {
            name: EMPTY_SCENE.to_string(),
            instance: None,
            generation: 0,
        }
    }

    /// Scene name currently assigned to the slot.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instance(&self) -> Option<&dyn VisualScene> {
        self.instance.as_deref()
    }

    pub fn is_realized(&self) -> bool {
        self.instance.is_some()
    }

    /// `true` when the slot holds the reserved empty assignment.
    pub fn is_empty(&self) -> bool {
        is_empty_scene(&self.name)
    }

    /// Bumped every time the slot is assigned a scene.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("name", &self.name)
            .field("realized", &self.instance.is_some())
            .field("generation", &self.generation)
            .finish()
    }
}

struct PendingLoad {
    slot: usize,
    generation: u64,
    task: InstanceFuture,
}

/// Owns the slots, the current selection and the single crossfade.
///
/// At most one switch is pending or running at any time: `switch_to` sets a
/// guard that is cleared only when the crossfade commits or the switch is
/// abandoned (failed load, reassignment of an involved slot).
pub struct SceneManager {
    catalog: Arc<SceneCatalog>,
    surface: SurfaceSize,
    scene_config: SceneConfig,
    transition_config: TransitionConfig,
    slots: Vec<Slot>,
    current: usize,
    transition: TransitionController,
    switching: bool,
    switch_target: Option<usize>,
    last_switch_time: f32,
    now: f32,
    ready: bool,
    pending: Vec<PendingLoad>,
    rng: fastrand::Rng,
}

impl SceneManager {
    pub fn new(
        catalog: Arc<SceneCatalog>,
        surface: SurfaceSize,
        scene_config: SceneConfig,
        transition_config: TransitionConfig,
    ) -> Self {
        Self {
            catalog,
            surface,
            scene_config,
            transition_config,
            slots: (0..SLOT_COUNT).map(|_| Slot::new()).collect(),
            current: 0,
            transition: TransitionController::new(),
            switching: false,
            switch_target: None,
            last_switch_time: 0.0,
            now: 0.0,
            ready: false,
            pending: Vec::new(),
            rng: fastrand::Rng::new(),
        }
    }

    /// Builds a manager from a validated settings snapshot. Slot assignments
    /// are applied by [`Self::initialize`], not here.
    pub fn from_config(catalog: Arc<SceneCatalog>, config: &AppConfig) -> Self {
        Self::new(
            catalog,
            config.render.surface_size(),
            config.scene_config(),
            config.transition.clone(),
        )
    }

    /// Seeds the generator behind random auto-advance.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = fastrand::Rng::with_seed(seed);
        self
    }

    /// Instantiates all five slots concurrently, hides every instance and
    /// shows slot 0.
    ///
    /// Anything the manager held before is disposed first. Slots whose scene
    /// fails to load stay unrealized; switching to them retries the load.
    pub async fn initialize<I, S>(&mut self, names: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.len() != SLOT_COUNT {
            return Err(SlotDeckError::InvalidInput(
                "exactly five slot assignments are required",
            ));
        }

        self.dispose_all();

        let loads = names
            .iter()
            .map(|name| self.catalog.instantiate(name, self.surface, &self.scene_config));
        let instances = join_all(loads).await;

        for (slot, (name, instance)) in self.slots.iter_mut().zip(names.into_iter().zip(instances)) {
            if instance.is_none() && !is_empty_scene(&name) {
                tracing::warn!(scene = %name, "slot starts without a scene instance");
            }
            slot.generation += 1;
            slot.name = name;
            slot.instance = instance.map(|mut scene| {
                scene.hide();
                scene
            });
        }

        self.current = 0;
        if let Some(scene) = self.slots[0].instance.as_deref_mut() {
            scene.show();
        }
        self.last_switch_time = self.now;
        self.ready = true;
        tracing::info!(slots = ?self.slot_names(), "scene manager initialized");
        Ok(())
    }

    /// Advances one frame: settles finished loads, moves the crossfade,
    /// updates the scenes in play, commits a finished crossfade and finally
    /// considers an automatic switch.
    pub fn update(&mut self, frame: &AudioFeatureFrame, time: FrameTime) {
        self.now = time.elapsed;
        self.poll_loads();

        self.transition
            .update(time.delta, self.transition_config.duration_seconds);

        if let Some((from, to, _)) = self.transition.view() {
            for key in [from, to] {
                if let Some(scene) = self.scene_mut(key) {
                    scene.update(frame, time.elapsed);
                }
            }
        } else if let Some(scene) = self.slots[self.current].instance.as_deref_mut() {
            scene.update(frame, time.elapsed);
        }

        if self.transition.is_complete() {
            self.commit_transition();
        }

        self.auto_advance();
    }

    /// Requests a crossfade to `index`.
    ///
    /// Returns `false` without side effects while another switch is underway,
    /// before initialization, for an out-of-range or current index, or for an
    /// empty slot. Otherwise the switch is accepted: the crossfade starts now
    /// when the slot is realized, or once its lazy load settles. A load that
    /// yields nothing abandons the switch and clears the guard.
    pub fn switch_to(&mut self, index: usize) -> bool {
        if self.switching || !self.ready || index >= SLOT_COUNT || index == self.current {
            return false;
        }

        let slot = &self.slots[index];
        if slot.instance.is_none() && slot.is_empty() {
            return false;
        }

        self.switching = true;
        tracing::debug!(from = self.current, to = index, "switch accepted");
        if slot.instance.is_some() {
            self.begin_transition(index);
        } else {
            self.switch_target = Some(index);
            self.request_load(index);
        }
        true
    }

    pub fn switch_to_next(&mut self) -> bool {
        self.switch_to((self.current + 1) % SLOT_COUNT)
    }

    pub fn switch_to_previous(&mut self) -> bool {
        self.switch_to((self.current + SLOT_COUNT - 1) % SLOT_COUNT)
    }

    /// Switches among non-empty slots only: the next one in slot order, or a
    /// uniformly random one other than the current slot. Needs at least two
    /// non-empty slots.
    pub fn switch_to_next_available(&mut self, random: bool) -> bool {
        let available: Vec<usize> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| !slot.is_empty())
            .map(|(index, _)| index)
            .collect();
        if available.len() < 2 {
            return false;
        }

        let target = if random {
            let choices: Vec<usize> = available
                .iter()
                .copied()
                .filter(|&index| index != self.current)
                .collect();
            choices[self.rng.usize(..choices.len())]
        } else {
            available
                .iter()
                .copied()
                .find(|&index| index > self.current)
                .unwrap_or(available[0])
        };
        self.switch_to(target)
    }

    /// Assigns `name` to slot `index`.
    ///
    /// The old instance is disposed immediately and the new scene starts
    /// loading. If the slot is current, the new instance is shown as soon as
    /// it is ready, without a crossfade; until then the slot shows nothing.
    /// A switch involving the slot is abandoned. Returns `false` only for an
    /// out-of-range index.
    pub fn reassign_slot(&mut self, index: usize, name: impl Into<String>) -> bool {
        if index >= SLOT_COUNT {
            return false;
        }
        let name = name.into();

        self.cancel_switch_involving(index);

        let slot = &mut self.slots[index];
        if let Some(mut old) = slot.instance.take() {
            old.hide();
            old.dispose();
        }
        slot.generation += 1;
        tracing::debug!(slot = index, from = %slot.name, to = %name, "slot reassigned");
        slot.name = name;

        if !self.slots[index].is_empty() {
            self.request_load(index);
        }
        true
    }

    /// Applies a validated settings snapshot through the regular slot
    /// operations. Nothing is touched when validation fails.
    pub fn apply_config(&mut self, config: &AppConfig) -> bool {
        if let Err(err) = config.validate() {
            tracing::warn!(%err, "rejected settings snapshot");
            return false;
        }

        self.cancel_switch();
        self.transition_config = config.transition.clone();
        self.scene_config.background = config.visual.background;
        self.set_foreground_color(config.visual.foreground);

        for (index, name) in config.slots.iter().enumerate() {
            if self.slots[index].name != *name {
                self.reassign_slot(index, name.clone());
            }
        }
        if config.current_slot != self.current {
            self.switch_to(config.current_slot);
        }
        tracing::info!(current = config.current_slot, "settings snapshot applied");
        true
    }

    /// Writes the manager's state into a copy of `base`.
    pub fn snapshot(&self, base: &AppConfig) -> AppConfig {
        let mut config = base.clone();
        config.slots = self.slot_names();
        config.current_slot = self.current;
        config.transition = self.transition_config.clone();
        config.visual.foreground = self.scene_config.foreground;
        config.visual.background = self.scene_config.background;
        config
    }

    /// Forwards a new foreground color to every live instance that supports it.
    pub fn set_foreground_color(&mut self, color: Rgba) {
        self.scene_config.foreground = color;
        for scene in self.slots.iter_mut().filter_map(|slot| slot.instance.as_deref_mut()) {
            scene.update_foreground_color(color);
        }
    }

    pub fn set_transition_config(&mut self, config: TransitionConfig) {
        self.transition_config = config;
    }

    pub fn transition_config(&self) -> &TransitionConfig {
        &self.transition_config
    }

    /// Size handed to scenes created from now on.
    pub fn set_surface_size(&mut self, size: SurfaceSize) {
        self.surface = size;
    }

    /// Waits for every outstanding load and installs the results.
    pub async fn settle(&mut self) {
        while !self.pending.is_empty() {
            let loads = std::mem::take(&mut self.pending);
            let results = join_all(
                loads
                    .into_iter()
                    .map(|load| async move { (load.slot, load.generation, load.task.await) }),
            )
            .await;
            for (slot, generation, scene) in results {
                self.install(slot, generation, scene);
            }
        }
    }

    /// Disposes every instance and forgets pending work. The manager must be
    /// initialized again before it accepts switches.
    pub fn dispose_all(&mut self) {
        self.transition.stop();
        self.switching = false;
        self.switch_target = None;
        self.pending.clear();
        for slot in &mut self.slots {
            if let Some(mut scene) = slot.instance.take() {
                scene.dispose();
            }
        }
        self.ready = false;
    }

    pub fn current_slot(&self) -> usize {
        self.current
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// `true` from an accepted `switch_to` until it commits or is abandoned.
    pub fn is_switching(&self) -> bool {
        self.switching
    }

    pub fn transition(&self) -> &TransitionController {
        &self.transition
    }

    pub fn slot(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn slot_names(&self) -> Vec<String> {
        self.slots.iter().map(|slot| slot.name.clone()).collect()
    }

    pub fn current_scene(&self) -> Option<&dyn VisualScene> {
        self.slots[self.current].instance()
    }

    pub fn pending_loads(&self) -> usize {
        self.pending.len()
    }

    pub fn has_pending_loads(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn catalog(&self) -> &Arc<SceneCatalog> {
        &self.catalog
    }

    fn slot_key(&self, index: usize) -> Option<SceneKey> {
        let slot = self.slots.get(index)?;
        slot.instance
            .as_ref()
            .map(|_| SceneKey::new(index, slot.generation))
    }

    fn scene_mut(&mut self, key: SceneKey) -> Option<&mut (dyn VisualScene + 'static)> {
        let slot = self.slots.get_mut(key.slot)?;
        if slot.generation != key.generation {
            return None;
        }
        slot.instance.as_deref_mut()
    }

    fn begin_transition(&mut self, target: usize) {
        let from = self.slot_key(self.current);
        let to = self.slot_key(target);
        if self.transition.start(from, to, target) {
            return;
        }

        // Nothing on screen to fade from: cut straight to the target.
        if let Some(scene) = self.slots[self.current].instance.as_deref_mut() {
            scene.hide();
        }
        if let Some(scene) = self.slots[target].instance.as_deref_mut() {
            scene.show();
        }
        self.finish_switch(target);
    }

    fn commit_transition(&mut self) {
        let (Some(from), Some(to), Some(target)) = (
            self.transition.from(),
            self.transition.to(),
            self.transition.target_slot(),
        ) else {
            self.transition.stop();
            self.switching = false;
            return;
        };

        if let Some(scene) = self.scene_mut(from) {
            scene.hide();
        }
        if let Some(scene) = self.scene_mut(to) {
            scene.show();
        }
        self.transition.stop();
        self.finish_switch(target);
    }

    fn finish_switch(&mut self, target: usize) {
        self.current = target;
        self.switching = false;
        self.switch_target = None;
        self.last_switch_time = self.now;
        tracing::debug!(slot = target, scene = %self.slots[target].name, "switch committed");
    }

    fn auto_advance(&mut self) {
        if !self.ready
            || !self.transition_config.auto_switch
            || self.switching
            || self.transition.is_active()
        {
            return;
        }
        if self.now - self.last_switch_time > self.transition_config.auto_interval_seconds {
            // Every attempt restarts the interval, so a failing slot is not
            // retried on every frame.
            self.last_switch_time = self.now;
            let random = self.transition_config.random_order;
            self.switch_to_next_available(random);
        }
    }

    fn cancel_switch(&mut self) {
        if let Some((from, to, _)) = self.transition.view() {
            if let Some(scene) = self.scene_mut(to) {
                scene.hide();
            }
            if let Some(scene) = self.scene_mut(from) {
                scene.show();
            }
        }
        if self.switching {
            tracing::debug!("switch abandoned");
        }
        self.transition.stop();
        self.switching = false;
        self.switch_target = None;
    }

    fn cancel_switch_involving(&mut self, index: usize) {
        let in_transition = self
            .transition
            .view()
            .map(|(from, to, _)| from.slot == index || to.slot == index)
            .unwrap_or(false);
        if in_transition || self.switch_target == Some(index) {
            self.cancel_switch();
        }
    }

    fn request_load(&mut self, index: usize) {
        let slot = &self.slots[index];
        let generation = slot.generation;
        if self
            .pending
            .iter()
            .any(|load| load.slot == index && load.generation == generation)
        {
            return;
        }

        let task =
            self.catalog
                .instantiate_task(slot.name.clone(), self.surface, self.scene_config.clone());
        self.pending.push(PendingLoad {
            slot: index,
            generation,
            task,
        });
    }

    fn poll_loads(&mut self) {
        if self.pending.is_empty() {
            return;
        }

        let mut cx = Context::from_waker(noop_waker_ref());
        let mut finished = Vec::new();
        self.pending.retain_mut(|load| match load.task.poll_unpin(&mut cx) {
            Poll::Ready(scene) => {
                finished.push((load.slot, load.generation, scene));
                false
            }
            Poll::Pending => true,
        });

        for (slot, generation, scene) in finished {
            self.install(slot, generation, scene);
        }
    }

    fn install(&mut self, index: usize, generation: u64, scene: Option<Box<dyn VisualScene>>) {
        let Some(slot) = self.slots.get_mut(index) else {
            return;
        };

        if slot.generation != generation {
            if let Some(mut stale) = scene {
                stale.dispose();
            }
            tracing::debug!(slot = index, "discarded stale scene load");
            return;
        }

        let Some(mut scene) = scene else {
            tracing::warn!(slot = index, scene = %slot.name, "slot scene unavailable");
            if self.switch_target == Some(index) {
                self.switch_target = None;
                self.switching = false;
                tracing::debug!(slot = index, "switch abandoned after failed load");
            }
            return;
        };

        scene.hide();
        scene.update_foreground_color(self.scene_config.foreground);
        if index == self.current {
            scene.show();
        }
        if let Some(mut replaced) = slot.instance.replace(scene) {
            replaced.dispose();
        }

        if self.switch_target == Some(index) {
            self.switch_target = None;
            self.begin_transition(index);
        }
    }
}

impl SceneGraph for SceneManager {
    fn active_transition(&self) -> Option<(SceneKey, SceneKey, f32)> {
        self.transition.view()
    }

    fn set_visible(&mut self, key: SceneKey, visible: bool) {
        if let Some(scene) = self.scene_mut(key) {
            if visible {
                scene.show();
            } else {
                scene.hide();
            }
        }
    }

    fn render_visible(&mut self, target: &mut Surface) {
        for scene in self.slots.iter().filter_map(|slot| slot.instance.as_deref()) {
            if scene.is_visible() {
                scene.render(target);
            }
        }
    }
}

impl fmt::Debug for SceneManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneManager")
            .field("slots", &self.slots)
            .field("current", &self.current)
            .field("transition", &self.transition)
            .field("switching", &self.switching)
            .field("ready", &self.ready)
            .field("pending", &self.pending.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    };

    use futures::{
        executor::block_on,
        future::{self, poll_fn},
    };

    use super::*;
    use crate::{
        catalog::{SceneFactory, SceneFuture},
        testing::{ProbeFactory, ProbeLog, ProbeScene},
    };

    const SIZE: SurfaceSize = SurfaceSize::new(4, 4);

    struct Harness {
        catalog: SceneCatalog,
        probes: Vec<ProbeFactory>,
    }

    impl Harness {
        fn new(names: &[&str]) -> Self {
            let mut harness = Self {
                catalog: SceneCatalog::new(),
                probes: Vec::new(),
            };
            for name in names {
                let probe = ProbeFactory::new(*name, Rgba::WHITE);
                harness.catalog.register_factory(*name, probe.clone());
                harness.probes.push(probe);
            }
            harness
        }

        /// Registers a scene whose load stays pending until the gate opens.
        fn gated(&mut self, name: &str) -> (ProbeFactory, Arc<AtomicBool>) {
            let probe = ProbeFactory::new(name, Rgba::WHITE);
            let gate = Arc::new(AtomicBool::new(false));
            let factory: Arc<dyn SceneFactory> = Arc::new(probe.clone());
            let open = gate.clone();
            self.catalog.register(name, move || -> SceneFuture {
                let open = open.clone();
                let factory = factory.clone();
                poll_fn(move |_| {
                    if open.load(Ordering::SeqCst) {
                        Poll::Ready(Ok(factory.clone()))
                    } else {
                        Poll::Pending
                    }
                })
                .boxed()
            });
            (probe, gate)
        }

        fn probe(&self, name: &str) -> &ProbeFactory {
            self.probes.iter().find(|p| p.name == name).unwrap()
        }

        fn manager(self) -> (SceneManager, Vec<ProbeFactory>) {
            let manager = SceneManager::new(
                Arc::new(self.catalog),
                SIZE,
                SceneConfig::default(),
                TransitionConfig::default(),
            );
            (manager, self.probes)
        }
    }

    fn tick(manager: &mut SceneManager, elapsed: f32, delta: f32) {
        manager.update(&AudioFeatureFrame::silent(), FrameTime::new(elapsed, delta));
    }

    fn ready_manager(names: [&str; SLOT_COUNT]) -> (SceneManager, Vec<ProbeFactory>) {
        let (mut manager, probes) = Harness::new(&["a", "b", "c", "d", "e"]).manager();
        block_on(manager.initialize(names)).unwrap();
        (manager, probes)
    }

    #[test]
    fn initialize_requires_five_names() {
        let (mut manager, _) = Harness::new(&["a"]).manager();
        assert!(block_on(manager.initialize(["a", "a"])).is_err());
        assert!(!manager.is_ready());
    }

    #[test]
    fn initialize_shows_only_slot_zero() {
        let (manager, probes) = ready_manager(["a", "b", "c", "d", "e"]);
        assert!(manager.is_ready());
        assert_eq!(manager.current_slot(), 0);

        assert!(probes[0].latest().unwrap().visible);
        assert!(probes[1..].iter().all(|p| !p.latest().unwrap().visible));
    }

    #[test]
    fn hidden_scenes_are_not_updated() {
        let (mut manager, probes) = ready_manager(["a", "b", "c", "d", "e"]);
        tick(&mut manager, 0.1, 0.1);
        tick(&mut manager, 0.2, 0.1);

        assert_eq!(probes[0].latest().unwrap().updates, 2);
        assert!(probes[1..].iter().all(|p| p.latest().unwrap().updates == 0));
    }

    #[test]
    fn transition_updates_both_scenes_then_commits() {
        let (mut manager, probes) = ready_manager(["a", "b", "c", "d", "e"]);
        assert!(manager.switch_to(1));
        tick(&mut manager, 0.5, 0.5);

        assert!(manager.transition().is_active());
        assert_eq!(probes[0].latest().unwrap().updates, 1);
        assert_eq!(probes[1].latest().unwrap().updates, 1);
        assert_eq!(probes[2].latest().unwrap().updates, 0);

        tick(&mut manager, 2.0, 1.5);
        assert_eq!(manager.current_slot(), 1);
        assert!(!manager.is_switching());
        assert!(!probes[0].latest().unwrap().visible);
        assert!(probes[1].latest().unwrap().visible);
    }

    #[test]
    fn switch_rejections_have_no_side_effects() {
        let (mut manager, _) = ready_manager(["a", "b", "c", EMPTY_SCENE, "e"]);
        assert!(!manager.switch_to(0));
        assert!(!manager.switch_to(SLOT_COUNT));
        assert!(!manager.switch_to(3));
        assert!(!manager.is_switching());
        assert!(!manager.transition().is_active());
    }

    #[test]
    fn lazy_slot_is_realized_on_switch() {
        let mut harness = Harness::new(&["a", "b"]);
        let (slow, gate) = harness.gated("slow");
        let (mut manager, _) = harness.manager();
        block_on(manager.initialize(["a", "b", EMPTY_SCENE, EMPTY_SCENE, EMPTY_SCENE])).unwrap();
        manager.reassign_slot(2, "slow");

        assert!(manager.switch_to(2));
        assert!(manager.is_switching());
        assert_eq!(manager.pending_loads(), 1);
        tick(&mut manager, 0.1, 0.1);
        assert!(!manager.transition().is_active());

        gate.store(true, Ordering::SeqCst);
        tick(&mut manager, 0.2, 0.1);
        assert!(manager.transition().is_active());
        assert_eq!(manager.transition().target_slot(), Some(2));
        assert_eq!(slow.created_count(), 1);
    }

    #[test]
    fn stale_load_is_discarded() {
        let mut harness = Harness::new(&["a", "b", "other"]);
        let (slow, gate) = harness.gated("slow");
        let (mut manager, probes) = harness.manager();
        block_on(manager.initialize(["a", "b", "a", "a", "a"])).unwrap();

        manager.reassign_slot(2, "slow");
        manager.reassign_slot(2, "other");
        tick(&mut manager, 0.1, 0.1);
        assert_eq!(manager.slot(2).unwrap().instance().unwrap().name(), "other");

        gate.store(true, Ordering::SeqCst);
        tick(&mut manager, 0.2, 0.1);

        assert!(!manager.has_pending_loads());
        assert_eq!(manager.slot(2).unwrap().name(), "other");
        assert_eq!(manager.slot(2).unwrap().instance().unwrap().name(), "other");
        assert!(slow.latest().unwrap().disposed);
        let other = probes.iter().find(|p| p.name == "other").unwrap();
        assert!(!other.latest().unwrap().disposed);
    }

    #[test]
    fn reassigning_a_target_cancels_the_switch() {
        let (mut manager, probes) = ready_manager(["a", "b", "c", "d", "e"]);
        assert!(manager.switch_to(1));
        tick(&mut manager, 0.1, 0.1);

        manager.reassign_slot(1, "c");
        assert!(!manager.is_switching());
        assert!(!manager.transition().is_active());
        assert!(probes[0].latest().unwrap().visible);
        assert!(probes[1].instances()[0].disposed);

        assert!(manager.switch_to(3));
    }

    #[test]
    fn reassigning_current_swaps_without_crossfade() {
        let (mut manager, probes) = ready_manager(["a", "b", "c", "d", "e"]);
        manager.reassign_slot(0, "e");
        assert!(probes[0].latest().unwrap().disposed);
        assert!(manager.current_scene().is_none());

        tick(&mut manager, 0.1, 0.1);
        assert!(!manager.transition().is_active());
        let fresh = probes[4].latest().unwrap();
        assert!(fresh.visible);
        assert_eq!(manager.current_scene().unwrap().name(), "e");
    }

    #[test]
    fn reassigning_a_hidden_slot_keeps_the_screen() {
        let (mut manager, probes) = ready_manager(["a", "b", "c", "d", "e"]);
        manager.reassign_slot(3, "a");
        tick(&mut manager, 0.1, 0.1);

        assert_eq!(manager.current_slot(), 0);
        let instances = probes[0].instances();
        assert_eq!(instances.len(), 2);
        assert!(instances[0].visible);
        assert!(!instances[1].visible);
    }

    #[test]
    fn cut_when_current_slot_is_blank() {
        let (mut manager, probes) = ready_manager([EMPTY_SCENE, "b", "c", "d", "e"]);
        assert!(manager.switch_to(1));

        assert!(!manager.transition().is_active());
        assert!(!manager.is_switching());
        assert_eq!(manager.current_slot(), 1);
        assert!(probes[1].latest().unwrap().visible);
    }

    #[test]
    fn next_and_previous_wrap() {
        let (mut manager, _) = ready_manager(["a", "b", "c", "d", "e"]);
        assert!(manager.switch_to_previous());
        assert_eq!(manager.transition().target_slot(), Some(4));
        tick(&mut manager, 2.0, 2.0);
        assert_eq!(manager.current_slot(), 4);

        assert!(manager.switch_to_next());
        assert_eq!(manager.transition().target_slot(), Some(0));
    }

    #[test]
    fn next_available_skips_empty_slots() {
        let (mut manager, _) = ready_manager(["a", EMPTY_SCENE, "c", EMPTY_SCENE, EMPTY_SCENE]);
        assert!(manager.switch_to_next_available(false));
        assert_eq!(manager.transition().target_slot(), Some(2));
        tick(&mut manager, 2.0, 2.0);

        assert!(manager.switch_to_next_available(false));
        assert_eq!(manager.transition().target_slot(), Some(0));
    }

    #[test]
    fn next_available_needs_two_slots() {
        let (mut manager, _) =
            ready_manager(["a", EMPTY_SCENE, EMPTY_SCENE, EMPTY_SCENE, EMPTY_SCENE]);
        assert!(!manager.switch_to_next_available(false));
        assert!(!manager.switch_to_next_available(true));
        assert!(!manager.is_switching());
    }

    #[test]
    fn random_choice_never_picks_current() {
        let (manager, _) = ready_manager(["a", "b", "c", "d", "e"]);
        let mut manager = manager.with_seed(7);
        for step in 0..20 {
            let before = manager.current_slot();
            assert!(manager.switch_to_next_available(true));
            assert_ne!(manager.transition().target_slot(), Some(before));
            let t = 2.0 * (step + 1) as f32;
            tick(&mut manager, t, 2.0);
        }
    }

    #[test]
    fn auto_advance_after_interval() {
        let (mut manager, _) = ready_manager(["a", "b", "c", "d", "e"]);
        manager.set_transition_config(TransitionConfig {
            auto_switch: true,
            auto_interval_seconds: 1.0,
            ..TransitionConfig::default()
        });

        tick(&mut manager, 0.5, 0.5);
        assert!(!manager.is_switching());
        tick(&mut manager, 1.1, 0.6);
        assert!(manager.is_switching());
        assert_eq!(manager.transition().target_slot(), Some(1));
    }

    #[test]
    fn foreground_color_reaches_capable_scenes() {
        let (mut manager, probes) = ready_manager(["a", "b", "c", "d", "e"]);
        let teal = Rgba::rgb(0, 128, 128);
        manager.set_foreground_color(teal);
        assert!(probes.iter().all(|p| p.latest().unwrap().foreground == Some(teal)));
    }

    #[test]
    fn dispose_all_releases_everything() {
        let (mut manager, probes) = ready_manager(["a", "b", "c", "d", "e"]);
        manager.switch_to(2);
        manager.dispose_all();

        assert!(!manager.is_ready());
        assert!(!manager.transition().is_active());
        assert!(probes.iter().all(|p| p.latest().unwrap().disposed));
        assert!(!manager.switch_to(1));
    }

    #[test]
    fn settle_installs_outstanding_loads() {
        let (mut manager, _) = ready_manager(["a", "b", "c", "d", "e"]);
        manager.reassign_slot(2, "d");
        manager.reassign_slot(3, "missing");
        assert_eq!(manager.pending_loads(), 2);

        block_on(manager.settle());
        assert!(!manager.has_pending_loads());
        assert!(manager.slot(2).unwrap().is_realized());
        assert!(!manager.slot(3).unwrap().is_realized());
    }

    #[test]
    fn apply_config_is_all_or_nothing() {
        let (mut manager, _) = ready_manager(["a", "b", "c", "d", "e"]);
        let mut bad = AppConfig::default();
        bad.slots.pop();
        assert!(!manager.apply_config(&bad));
        assert_eq!(manager.slot_names(), vec!["a", "b", "c", "d", "e"]);

        let mut good = AppConfig {
            slots: ["e", "b", "c", "d", EMPTY_SCENE].map(String::from).to_vec(),
            current_slot: 1,
            ..AppConfig::default()
        };
        good.transition.duration_seconds = 0.0;
        assert!(manager.apply_config(&good));
        block_on(manager.settle());
        tick(&mut manager, 0.1, 0.1);

        assert_eq!(manager.current_slot(), 1);
        let snapshot = manager.snapshot(&AppConfig::default());
        assert_eq!(snapshot.slots, good.slots);
        assert_eq!(snapshot.current_slot, 1);
        assert_eq!(snapshot.transition, good.transition);
    }

    #[test]
    fn apply_config_rejects_an_empty_current_slot() {
        let (mut manager, factories) = ready_manager(["a", "b", "c", "d", "e"]);
        let config = AppConfig {
            slots: ["b", "b", "c", "d", EMPTY_SCENE].map(String::from).to_vec(),
            current_slot: 4,
            ..AppConfig::default()
        };

        assert!(!manager.apply_config(&config));
        block_on(manager.settle());
        tick(&mut manager, 0.1, 0.1);

        assert_eq!(manager.slot_names(), vec!["a", "b", "c", "d", "e"]);
        assert_eq!(manager.current_slot(), 0);
        assert!(!manager.is_switching());
        assert!(factories.iter().all(|f| f.created_count() == 1));
        assert!(factories.iter().all(|f| !f.latest().unwrap().disposed));
    }

    #[test]
    fn reassigned_scenes_are_never_updated_after_dispose() {
        let (mut manager, factories) = ready_manager(["a", "b", "c", "d", "e"]);
        let mut elapsed = 0.0;
        let mut step = |manager: &mut SceneManager| {
            elapsed += 0.1;
            tick(manager, elapsed, 0.1);
        };

        assert!(manager.switch_to(1));
        step(&mut manager);
        step(&mut manager);
        assert!(manager.transition().is_active());

        // Both ends of the crossfade are replaced mid-flight.
        assert!(manager.reassign_slot(0, "c"));
        assert!(manager.reassign_slot(1, "d"));
        block_on(manager.settle());
        for _ in 0..20 {
            step(&mut manager);
        }
        assert!(!manager.is_switching());

        // And once more after a crossfade has committed.
        assert!(manager.switch_to(2));
        for _ in 0..20 {
            step(&mut manager);
        }
        assert_eq!(manager.current_slot(), 2);
        assert!(manager.reassign_slot(2, "e"));
        block_on(manager.settle());
        for _ in 0..5 {
            step(&mut manager);
        }

        let late_updates: usize = factories
            .iter()
            .flat_map(ProbeFactory::instances)
            .map(|log| log.updates_after_dispose)
            .sum();
        assert_eq!(late_updates, 0);
        assert!(factories[0].instances()[0].disposed);
        assert!(factories[1].instances()[0].disposed);
        assert!(factories[2].instances()[0].disposed);
        assert!(factories[4].latest().unwrap().visible);
    }

    #[test]
    fn foreground_color_skips_scenes_without_tint() {
        let mut harness = Harness::new(&["a", "b", "c", "d"]);
        let plain_log = Arc::new(Mutex::new(ProbeLog::default()));
        let log = Arc::clone(&plain_log);
        harness.catalog.register_factory(
            "plain",
            move |_size: SurfaceSize, _config: &SceneConfig| -> Result<Box<dyn VisualScene>> {
                let scene = ProbeScene::with_log("plain", Rgba::WHITE, Arc::clone(&log));
                Ok(Box::new(scene.without_tint()))
            },
        );
        let (mut manager, factories) = harness.manager();
        block_on(manager.initialize(["a", "plain", "b", "c", "d"])).unwrap();

        let tint = Rgba::rgb(10, 20, 30);
        manager.set_foreground_color(tint);

        assert_eq!(plain_log.lock().unwrap().foreground, None);
        assert!(factories
            .iter()
            .all(|f| f.latest().unwrap().foreground == Some(tint)));
        let snapshot = manager.snapshot(&AppConfig::default());
        assert_eq!(snapshot.visual.foreground, tint);
    }

    #[test]
    fn probe_helper_finds_registered_scenes() {
        let harness = Harness::new(&["a", "b"]);
        assert_eq!(harness.probe("b").name, "b");
        let empty: SceneFuture = future::ready(Err(SlotDeckError::msg("unused"))).boxed();
        assert!(block_on(empty).is_err());
    }
}
