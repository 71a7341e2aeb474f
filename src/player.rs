use std::{collections::HashSet, sync::Arc};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info};

use crate::rules::CompiledRules;

pub trait VideoElement: Clone {
    fn key(&self) -> u64;
    fn set_inline_playback(&self, enabled: bool);
    fn set_autoplay(&self, enabled: bool);
    fn set_muted(&self, muted: bool);
    fn set_controls(&self, enabled: bool);
    fn is_paused(&self) -> bool;
    fn pause(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FullscreenTransition {
    Entered,
    Exited,
    Unchanged,
}

pub struct NativePlayerController<V> {
    enabled: bool,
    applied: HashSet<u64>,
    fullscreen: Option<V>,
}

impl<V: VideoElement> NativePlayerController<V> {
    pub fn new() -> Self {
        Self {
            enabled: true,
            applied: HashSet::new(),
            fullscreen: None,
        }
    }

    pub fn for_host(rules: &CompiledRules, hostname: &str) -> Self {
        let mut controller = Self::new();
        if rules.player_excluded.matches(hostname) {
            info!(target: "player", host = %hostname, "native player disabled on this host");
            controller.enabled = false;
        }
        controller
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns whether anything was changed.
    pub fn enforce(&mut self, video: &V) -> bool {
        if !self.enabled || !self.applied.insert(video.key()) {
            return false;
        }
        video.set_inline_playback(true);
        video.set_autoplay(false);
        video.set_muted(false);
        video.set_controls(true);
        debug!(target: "player", video = video.key(), "native controls applied");
        true
    }

    pub fn enforce_all<'a, I>(&mut self, videos: I) -> Vec<u64>
    where
        I: IntoIterator<Item = &'a V>,
        V: 'a,
    {
        videos
            .into_iter()
            .filter(|video| self.enforce(video))
            .map(VideoElement::key)
            .collect()
    }

    /// `element` is the current fullscreen element when it is a video.
    pub fn on_fullscreen_change(&mut self, element: Option<&V>) -> FullscreenTransition {
        if !self.enabled {
            return FullscreenTransition::Unchanged;
        }
        match element {
            Some(video) => {
                if self.fullscreen.as_ref().map(VideoElement::key) == Some(video.key()) {
                    return FullscreenTransition::Unchanged;
                }
                video.set_inline_playback(false);
                if !video.is_paused() {
                    video.pause();
                }
                self.fullscreen = Some(video.clone());
                info!(target: "player", video = video.key(), "video entered fullscreen");
                FullscreenTransition::Entered
            }
            None => match self.fullscreen.take() {
                Some(previous) => {
                    previous.set_inline_playback(true);
                    info!(target: "player", video = previous.key(), "video left fullscreen");
                    FullscreenTransition::Exited
                }
                None => FullscreenTransition::Unchanged,
            },
        }
    }

    pub fn fullscreen(&self) -> Option<&V> {
        self.fullscreen.as_ref()
    }
}

impl<V: VideoElement> Default for NativePlayerController<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VideoAttributes {
    pub inline_playback: bool,
    pub autoplay: bool,
    pub muted: bool,
    pub controls: bool,
    pub paused: bool,
}

#[derive(Debug, Clone)]
pub struct SimulatedVideo {
    key: u64,
    attributes: Arc<Mutex<VideoAttributes>>,
}

impl SimulatedVideo {
    pub fn new(key: u64) -> Self {
        Self::with_flags(key, true, true)
    }

    pub fn with_flags(key: u64, autoplay: bool, muted: bool) -> Self {
        Self {
            key,
            attributes: Arc::new(Mutex::new(VideoAttributes {
                autoplay,
                muted,
                paused: true,
                ..Default::default()
            })),
        }
    }

    pub fn play(&self) {
        self.attributes.lock().paused = false;
    }

    pub fn attributes(&self) -> VideoAttributes {
        self.attributes.lock().clone()
    }
}

impl VideoElement for SimulatedVideo {
    fn key(&self) -> u64 {
        self.key
    }

    fn set_inline_playback(&self, enabled: bool) {
        self.attributes.lock().inline_playback = enabled;
    }

    fn set_autoplay(&self, enabled: bool) {
        self.attributes.lock().autoplay = enabled;
    }

    fn set_muted(&self, muted: bool) {
        self.attributes.lock().muted = muted;
    }

    fn set_controls(&self, enabled: bool) {
        self.attributes.lock().controls = enabled;
    }

    fn is_paused(&self) -> bool {
        self.attributes.lock().paused
    }

    fn pause(&self) {
        self.attributes.lock().paused = true;
    }
}
