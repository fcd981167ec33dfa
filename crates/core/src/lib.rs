//! Core library for the slotdeck visual performance engine.
//!
//! Audio blocks are reduced to a byte spectrum and then to per-frame band
//! features. Those drive a five-slot deck of lazily loaded visual scenes,
//! switched with timed crossfades and composited onto a software surface.
//! Each module owns one subsystem (analysis, scene catalog, slot
//! orchestration, rendering, etc.) so hosts can drive them from their own
//! loop.

pub mod analysis;
pub mod audio;
pub mod catalog;
pub mod config;
pub mod error;
pub mod features;
pub mod manager;
pub mod render;
pub mod scene;
pub mod scenes;
pub mod testing;
pub mod timeline;
pub mod transition;

pub use analysis::SpectrumAnalyzer;
pub use audio::{AnalysisHandle, AudioEngine};
pub use catalog::{SceneCatalog, SceneFactory, SceneFuture};
pub use config::{AppConfig, AudioConfig, RenderConfig, TransitionConfig, VisualConfig};
pub use error::{Result, SlotDeckError};
pub use features::{AudioFeatureExtractor, AudioFeatureFrame, BandLayout};
pub use manager::{SceneManager, Slot, SLOT_COUNT};
pub use render::{Compositor, SceneGraph, Surface};
pub use scene::{Rgba, SceneConfig, SceneKey, SurfaceSize, VisualScene, EMPTY_SCENE};
pub use scenes::register_builtin_scenes;
pub use timeline::{FrameClock, FramePacer, FrameTime};
pub use transition::TransitionController;
