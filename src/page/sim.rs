use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use super::{MutationBatch, MutationObserver, Page};
use crate::{
    intercept::{HistoryCall, ListenerRegistration, Location, OpenRequest},
    player::{SimulatedVideo, VideoElement},
    policy::resolve,
};

static VIDEO_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<video\b([^>]*)>").expect("valid video regex"));
static VIDEO_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(?:^|\s)id\s*=\s*["']?(\d+)"#).expect("valid video id regex")
});
static AUTOPLAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:^|\s)autoplay\b").expect("valid autoplay regex"));
static MUTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:^|\s)muted\b").expect("valid muted regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowId(pub u32);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub url: String,
    pub state: Value,
}

#[derive(Debug)]
struct PageState {
    href: String,
    loading: bool,
    body: Vec<String>,
    videos: Vec<SimulatedVideo>,
    history: Vec<HistoryEntry>,
    windows: Vec<String>,
    listeners: Vec<String>,
    stops: usize,
    clears: usize,
}

#[derive(Debug)]
pub struct SimulatedPage {
    state: Mutex<PageState>,
    observer: Mutex<Option<MutationObserver>>,
}

impl SimulatedPage {
    pub fn new(href: &str) -> Self {
        Self {
            state: Mutex::new(PageState {
                href: href.to_owned(),
                loading: true,
                body: vec![document_for(href)],
                videos: Vec::new(),
                history: vec![HistoryEntry {
                    url: href.to_owned(),
                    state: Value::Null,
                }],
                windows: Vec::new(),
                listeners: Vec::new(),
                stops: 0,
                clears: 0,
            }),
            observer: Mutex::new(None),
        }
    }

    pub fn attach_observer(&self, observer: MutationObserver) {
        *self.observer.lock() = Some(observer);
    }

    /// Full navigation, as a script assigning `location.href` would do.
    pub fn navigate(&self, url: &str) {
        {
            let mut state = self.state.lock();
            let next = resolve_against(&state.href, url);
            state.body = vec![document_for(&next)];
            state.videos.clear();
            state.history.push(HistoryEntry {
                url: next.clone(),
                state: Value::Null,
            });
            state.href = next;
            state.loading = true;
        }
        self.mutated(1);
    }

    /// `<video>` tags in `html` become elements of the page.
    pub fn insert_node(&self, html: &str) -> bool {
        {
            let mut state = self.state.lock();
            for tag in VIDEO_TAG.captures_iter(html) {
                let attrs = tag.get(1).map_or("", |m| m.as_str());
                let requested = VIDEO_ID
                    .captures(attrs)
                    .and_then(|id| id[1].parse::<u64>().ok())
                    .filter(|key| !state.videos.iter().any(|v| v.key() == *key));
                let key = requested.unwrap_or_else(|| next_video_key(&state.videos));
                state.videos.push(SimulatedVideo::with_flags(
                    key,
                    AUTOPLAY.is_match(attrs),
                    MUTED.is_match(attrs),
                ));
            }
            state.body.push(html.to_owned());
        }
        self.mutated(1)
    }

    pub fn open_window(&self, request: OpenRequest) -> Option<WindowId> {
        let mut state = self.state.lock();
        let url = request.url.unwrap_or_else(|| "about:blank".to_owned());
        state.windows.push(url);
        Some(WindowId(state.windows.len() as u32))
    }

    pub fn push_state(&self, call: HistoryCall<Value>) {
        let mut state = self.state.lock();
        let url = call
            .url
            .map(|url| resolve_against(&state.href, &url))
            .unwrap_or_else(|| state.href.clone());
        state.history.push(HistoryEntry {
            url: url.clone(),
            state: call.state,
        });
        state.href = url;
    }

    pub fn replace_state(&self, call: HistoryCall<Value>) {
        let mut state = self.state.lock();
        let url = call
            .url
            .map(|url| resolve_against(&state.href, &url))
            .unwrap_or_else(|| state.href.clone());
        let entry = HistoryEntry {
            url: url.clone(),
            state: call.state,
        };
        state.history.pop();
        state.history.push(entry);
        state.href = url;
    }

    pub fn add_event_listener(&self, registration: ListenerRegistration<String>) {
        self.state.lock().listeners.push(registration.event);
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().loading
    }

    pub fn videos(&self) -> Vec<SimulatedVideo> {
        self.state.lock().videos.clone()
    }

    pub fn video(&self, key: u64) -> Option<SimulatedVideo> {
        self.state.lock().videos.iter().find(|v| v.key() == key).cloned()
    }

    pub fn body_len(&self) -> usize {
        self.state.lock().body.len()
    }

    pub fn opened_windows(&self) -> Vec<String> {
        self.state.lock().windows.clone()
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.state.lock().history.clone()
    }

    pub fn listeners(&self) -> Vec<String> {
        self.state.lock().listeners.clone()
    }

    pub fn stop_count(&self) -> usize {
        self.state.lock().stops
    }

    pub fn clear_count(&self) -> usize {
        self.state.lock().clears
    }

    // every change here adds or removes children somewhere under the body
    fn mutated(&self, records: usize) -> bool {
        match self.observer.lock().as_ref() {
            Some(observer) => {
                let options = observer.options();
                options.child_list
                    && options.subtree
                    && observer.notify(MutationBatch { records })
            }
            None => false,
        }
    }
}

impl Location for SimulatedPage {
    fn href(&self) -> String {
        self.state.lock().href.clone()
    }
}

impl Page for SimulatedPage {
    fn stop_loading(&self) {
        let mut state = self.state.lock();
        state.loading = false;
        state.stops += 1;
    }

    fn clear_document(&self) {
        let removed = {
            let mut state = self.state.lock();
            let removed = state.body.len();
            state.body.clear();
            state.videos.clear();
            state.clears += 1;
            removed
        };
        if removed > 0 {
            self.mutated(removed);
        }
    }

    fn document_is_empty(&self) -> bool {
        self.state.lock().body.is_empty()
    }
}

fn resolve_against(current: &str, target: &str) -> String {
    let base = resolve(current, None);
    resolve(target, base.as_ref())
        .map(String::from)
        .unwrap_or_else(|| target.to_owned())
}

fn next_video_key(videos: &[SimulatedVideo]) -> u64 {
    videos.iter().map(|v| v.key()).max().map_or(1, |key| key + 1)
}

fn document_for(href: &str) -> String {
    format!("<main data-src=\"{href}\"></main>")
}
