use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::{
    intercept::{
        wrap_add_event_listener, wrap_open, wrap_push_state, wrap_replace_state, Anchor,
        ClickEvent, ClickInterceptor, ClickOutcome, HistoryCall, InterceptContext,
        ListenerRegistration, Location, OpenRequest,
    },
    page::{
        CheckReason, Enforcement, MutationBatch, MutationObserver, PageController, SimulatedPage,
        WindowId,
    },
    player::{FullscreenTransition, NativePlayerController, SimulatedVideo, VideoAttributes},
    policy::{
        hostname_of, resolve, CandidateNavigation, HostnameClass, NavigationGuard, Trigger,
        Verdict,
    },
};

mod command;

pub use command::{Command, CommandError};

type OpenFn = Box<dyn Fn(OpenRequest) -> Option<WindowId>>;
type HistoryFn = Box<dyn Fn(HistoryCall<Value>) -> Option<()>>;
type ListenFn = Box<dyn Fn(ListenerRegistration<String>) -> Option<()>>;

#[derive(Debug, Serialize)]
pub struct SessionEvent {
    pub at: DateTime<Utc>,
    pub command: &'static str,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Debug, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Outcome {
    Navigated {
        href: String,
        enforcement: Enforcement,
        videos_applied: Vec<u64>,
    },
    Opened {
        window: WindowId,
    },
    PopupBlocked,
    HistoryApplied {
        href: String,
    },
    HistorySuppressed,
    Clicked {
        outcome: ClickOutcome,
        href: String,
    },
    ListenerRegistered {
        event: String,
    },
    ListenerDropped {
        event: String,
    },
    Mutated {
        queued: bool,
        videos_applied: Vec<u64>,
    },
    Classified {
        candidate: CandidateNavigation,
        class: HostnameClass,
        media: bool,
        block_navigation: bool,
        block_popup: bool,
        verdict: Verdict,
    },
    Video {
        id: u64,
        applied: bool,
        attributes: VideoAttributes,
    },
    Fullscreen {
        transition: FullscreenTransition,
    },
    Status {
        href: String,
        loading: bool,
        halted: bool,
        halts: u64,
        body_nodes: usize,
        windows: Vec<String>,
        listeners: Vec<String>,
    },
    Error {
        message: String,
    },
}

struct SimClick {
    anchor: Option<Anchor>,
    prevented: bool,
}

impl ClickEvent for SimClick {
    fn closest_anchor(&self) -> Option<Anchor> {
        self.anchor.clone()
    }

    fn prevent_default(&mut self) {
        self.prevented = true;
    }
}

pub struct GuardSession {
    guard: Arc<NavigationGuard>,
    page: Arc<SimulatedPage>,
    controller: Arc<PageController>,
    observer: MutationObserver,
    open: OpenFn,
    push_state: HistoryFn,
    replace_state: HistoryFn,
    add_listener: ListenFn,
    clicks: ClickInterceptor,
    player: NativePlayerController<SimulatedVideo>,
}

impl GuardSession {
    pub fn new(
        guard: Arc<NavigationGuard>,
        page: Arc<SimulatedPage>,
        controller: Arc<PageController>,
        observer: MutationObserver,
    ) -> Self {
        let ctx = InterceptContext::new(guard.clone(), page.clone());

        let open: OpenFn = {
            let page = page.clone();
            Box::new(wrap_open(ctx.clone(), move |req| page.open_window(req)))
        };
        let push_state: HistoryFn = {
            let page = page.clone();
            Box::new(wrap_push_state(ctx.clone(), move |call| page.push_state(call)))
        };
        let replace_state: HistoryFn = {
            let page = page.clone();
            Box::new(wrap_replace_state(ctx.clone(), move |call| page.replace_state(call)))
        };
        let add_listener: ListenFn = {
            let page = page.clone();
            Box::new(wrap_add_event_listener(ctx.clone(), move |reg| {
                page.add_event_listener(reg)
            }))
        };

        let host = hostname_of(&page.href(), None);
        let player = NativePlayerController::for_host(guard.rules(), &host);

        Self {
            clicks: ClickInterceptor::new(ctx),
            guard,
            page,
            controller,
            observer,
            open,
            push_state,
            replace_state,
            add_listener,
            player,
        }
    }

    pub fn execute(&mut self, command: Command) -> SessionEvent {
        let name = command.name();
        let outcome = match command {
            Command::Goto(url) => self.goto(&url),
            Command::Open { url, target } => {
                let request = OpenRequest {
                    url,
                    target,
                    features: None,
                };
                match (self.open)(request) {
                    Some(window) => Outcome::Opened { window },
                    None => Outcome::PopupBlocked,
                }
            }
            Command::Push(url) => self.history(&self.push_state, url),
            Command::Replace(url) => self.history(&self.replace_state, url),
            Command::Click { href, target } => self.click(href, target),
            Command::Listen(event) => {
                match (self.add_listener)(ListenerRegistration::new(event.clone(), event.clone())) {
                    Some(()) => Outcome::ListenerRegistered { event },
                    None => Outcome::ListenerDropped { event },
                }
            }
            Command::Insert(html) => {
                let queued = self.page.insert_node(&html);
                Outcome::Mutated {
                    queued,
                    videos_applied: self.scan_videos(),
                }
            }
            Command::Mutate => Outcome::Mutated {
                queued: self.observer.notify(MutationBatch { records: 0 }),
                videos_applied: Vec::new(),
            },
            Command::Classify(url) => self.classify(&url),
            Command::Video(id) => self.video(id),
            Command::Play(id) => match self.page.video(id) {
                Some(video) => {
                    video.play();
                    Outcome::Video {
                        id,
                        applied: false,
                        attributes: video.attributes(),
                    }
                }
                None => unknown_video(id),
            },
            Command::Fullscreen(None) => Outcome::Fullscreen {
                transition: self.player.on_fullscreen_change(None),
            },
            Command::Fullscreen(Some(id)) => match self.page.video(id) {
                Some(video) => Outcome::Fullscreen {
                    transition: self.player.on_fullscreen_change(Some(&video)),
                },
                None => unknown_video(id),
            },
            Command::Status => self.status(),
        };
        SessionEvent {
            at: Utc::now(),
            command: name,
            outcome,
        }
    }

    pub fn error_event(message: impl Into<String>) -> SessionEvent {
        SessionEvent {
            at: Utc::now(),
            command: "error",
            outcome: Outcome::Error {
                message: message.into(),
            },
        }
    }

    fn goto(&mut self, url: &str) -> Outcome {
        let halts_before = self.controller.halts();
        self.page.navigate(url);
        let href = self.page.href();
        let host = hostname_of(&href, None);
        self.player = NativePlayerController::for_host(self.guard.rules(), &host);
        let enforcement = self.load_check(halts_before);
        Outcome::Navigated {
            href,
            enforcement,
            videos_applied: self.scan_videos(),
        }
    }

    // The watcher may see the navigation's mutation first and halt the page
    // itself; that still counts as this load being halted.
    fn load_check(&self, halts_before: u64) -> Enforcement {
        match self.controller.enforce(CheckReason::Load) {
            Enforcement::AlreadyHalted if self.controller.halts() > halts_before => {
                Enforcement::Halted
            }
            enforcement => enforcement,
        }
    }

    fn scan_videos(&mut self) -> Vec<u64> {
        self.player.enforce_all(&self.page.videos())
    }

    fn video(&mut self, id: u64) -> Outcome {
        if self.page.video(id).is_none() {
            self.page
                .insert_node(&format!("<video id=\"{id}\" autoplay muted></video>"));
        }
        let applied = self.scan_videos().contains(&id);
        match self.page.video(id) {
            Some(video) => Outcome::Video {
                id,
                applied,
                attributes: video.attributes(),
            },
            None => unknown_video(id),
        }
    }

    fn history(&self, primitive: &HistoryFn, url: Option<String>) -> Outcome {
        match primitive(HistoryCall::new(Value::Null, url.as_deref())) {
            Some(()) => Outcome::HistoryApplied {
                href: self.page.href(),
            },
            None => Outcome::HistorySuppressed,
        }
    }

    fn click(&mut self, href: Option<String>, target: Option<String>) -> Outcome {
        let anchor = href.map(|href| Anchor { href, target });
        let mut event = SimClick {
            anchor: anchor.clone(),
            prevented: false,
        };
        let outcome = self.clicks.handle(&mut event);

        let href = anchor.as_ref().map(|a| a.href.clone()).unwrap_or_default();
        if let (Some(anchor), false, ClickOutcome::Allowed) = (anchor, event.prevented, outcome) {
            if anchor.opens_new_context() {
                // the browser opens the tab itself, not through window.open
                let base = resolve(&self.page.href(), None);
                let url = resolve(&anchor.href, base.as_ref()).map(String::from);
                self.page.open_window(OpenRequest {
                    url,
                    target: anchor.target,
                    features: None,
                });
            } else {
                self.page.navigate(&anchor.href);
            }
        }
        Outcome::Clicked { outcome, href }
    }

    fn classify(&self, url: &str) -> Outcome {
        let href = self.page.href();
        let base = resolve(&href, None);
        let candidate = CandidateNavigation::new(&href, url, Trigger::Open);
        Outcome::Classified {
            class: self.guard.classify_hostname(&candidate.target_hostname),
            media: self.guard.is_media_url(url, base.as_ref()),
            block_navigation: self.guard.should_block_navigation(url, base.as_ref()),
            block_popup: self
                .guard
                .should_block_popup(&candidate.source_hostname, url, base.as_ref()),
            verdict: self.guard.verdict(&candidate),
            candidate,
        }
    }

    fn status(&self) -> Outcome {
        Outcome::Status {
            href: self.page.href(),
            loading: self.page.is_loading(),
            halted: self.controller.is_halted(),
            halts: self.controller.halts(),
            body_nodes: self.page.body_len(),
            windows: self.page.opened_windows(),
            listeners: self.page.listeners(),
        }
    }
}

fn unknown_video(id: u64) -> Outcome {
    Outcome::Error {
        message: format!("no video with id {id} in the document"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{observe, ObserveOptions, Page};

    fn session(href: &str) -> (GuardSession, Arc<SimulatedPage>) {
        let guard = Arc::new(NavigationGuard::builtin());
        let page = Arc::new(SimulatedPage::new(href));
        let controller = Arc::new(PageController::new(guard.clone(), page.clone()));
        let (observer, _feed) = observe(ObserveOptions::document(), 4);
        (GuardSession::new(guard, page.clone(), controller, observer), page)
    }

    fn run(session: &mut GuardSession, line: &str) -> Outcome {
        let command = Command::parse(line).unwrap().unwrap();
        session.execute(command).outcome
    }

    #[test]
    fn popups_follow_default_deny() {
        let (mut session, page) = session("https://unlisted.com/");
        assert!(matches!(run(&mut session, "open https://ads.example/x"), Outcome::PopupBlocked));
        assert!(matches!(
            run(&mut session, "open https://cdn.example/a.png"),
            Outcome::Opened { window: WindowId(1) }
        ));
        assert_eq!(page.opened_windows(), vec!["https://cdn.example/a.png".to_string()]);
    }

    #[test]
    fn goto_blocked_host_halts_immediately() {
        let (mut session, page) = session("https://unlisted.com/");
        match run(&mut session, "goto https://shp.ee/abc") {
            Outcome::Navigated { enforcement, .. } => assert_eq!(enforcement, Enforcement::Halted),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(page.document_is_empty());
        assert!(matches!(
            run(&mut session, "listen beforeunload"),
            Outcome::ListenerDropped { .. }
        ));
    }

    #[test]
    fn history_and_clicks_go_through_wrappers() {
        let (mut session, page) = session("https://unlisted.com/");
        assert!(matches!(
            run(&mut session, "push https://lazada.co.id/"),
            Outcome::HistorySuppressed
        ));
        assert!(matches!(
            run(&mut session, "replace /next"),
            Outcome::HistoryApplied { ref href } if href == "https://unlisted.com/next"
        ));

        assert!(matches!(
            run(&mut session, "click https://bukalapak.com/p"),
            Outcome::Clicked { outcome: ClickOutcome::BlockedLink, .. }
        ));
        assert_eq!(page.href(), "https://unlisted.com/next");

        run(&mut session, "click https://files.example/a.mp3 _blank");
        assert_eq!(page.opened_windows(), vec!["https://files.example/a.mp3".to_string()]);

        run(&mut session, "click /about");
        assert_eq!(page.href(), "https://unlisted.com/about");
    }

    #[test]
    fn video_commands_drive_the_player() {
        let (mut session, _page) = session("https://streams.example/");
        assert!(matches!(run(&mut session, "video 1"), Outcome::Video { applied: true, .. }));
        assert!(matches!(run(&mut session, "video 1"), Outcome::Video { applied: false, .. }));
        run(&mut session, "play 1");
        assert!(matches!(
            run(&mut session, "fullscreen 1"),
            Outcome::Fullscreen { transition: FullscreenTransition::Entered }
        ));
        assert!(matches!(
            run(&mut session, "fullscreen exit"),
            Outcome::Fullscreen { transition: FullscreenTransition::Exited }
        ));
        assert!(matches!(run(&mut session, "fullscreen 9"), Outcome::Error { .. }));
    }

    #[test]
    fn inserted_videos_get_native_controls() {
        let (mut session, _page) = session("https://streams.example/");
        match run(&mut session, r#"insert <video id="5" autoplay muted></video>"#) {
            Outcome::Mutated { videos_applied, .. } => assert_eq!(videos_applied, vec![5]),
            other => panic!("unexpected outcome {other:?}"),
        }
        match run(&mut session, "video 5") {
            Outcome::Video {
                applied,
                attributes,
                ..
            } => {
                assert!(!applied);
                assert!(attributes.controls && attributes.inline_playback);
                assert!(!attributes.autoplay && !attributes.muted);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        run(&mut session, "play 5");
        assert!(matches!(
            run(&mut session, "fullscreen 5"),
            Outcome::Fullscreen { transition: FullscreenTransition::Entered }
        ));
    }

    #[test]
    fn goto_drops_videos_of_the_previous_document() {
        let (mut session, _page) = session("https://streams.example/");
        run(&mut session, "video 1");
        match run(&mut session, "goto /other") {
            Outcome::Navigated {
                enforcement,
                videos_applied,
                ..
            } => {
                assert_eq!(enforcement, Enforcement::Allowed);
                assert!(videos_applied.is_empty());
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(matches!(run(&mut session, "play 1"), Outcome::Error { .. }));
    }

    #[test]
    fn load_halted_by_the_watcher_first_still_reports_halted() {
        let guard = Arc::new(NavigationGuard::builtin());
        let page = Arc::new(SimulatedPage::new("https://unlisted.com/"));
        let controller = Arc::new(PageController::new(guard.clone(), page.clone()));
        let (observer, _feed) = observe(ObserveOptions::document(), 4);
        let session = GuardSession::new(guard, page.clone(), controller.clone(), observer);

        let before = controller.halts();
        page.navigate("https://shp.ee/abc");
        assert_eq!(controller.enforce(CheckReason::Mutation), Enforcement::Halted);

        assert_eq!(session.load_check(before), Enforcement::Halted);
        assert_eq!(session.load_check(controller.halts()), Enforcement::AlreadyHalted);
    }

    #[test]
    fn classify_reports_every_check() {
        let (mut session, _page) = session("https://unlisted.com/");
        match run(&mut session, "classify https://www.shopee.co.id/x") {
            Outcome::Classified {
                class,
                block_navigation,
                block_popup,
                verdict,
                ..
            } => {
                assert!(class.is_blocked);
                assert!(block_navigation);
                assert!(block_popup);
                assert_eq!(verdict, Verdict::Blocked);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn events_serialize_as_flat_json() {
        let (mut session, _page) = session("https://unlisted.com/");
        let event = session.execute(Command::Status);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["command"], "status");
        assert_eq!(json["result"], "status");
        assert_eq!(json["href"], "https://unlisted.com/");
    }
}
