mod classify;
mod guard;
mod media;

pub use classify::{classify_hostname, hostname_of, resolve, HostnameClass};
pub use guard::{CandidateNavigation, NavigationGuard, Trigger, Verdict, GUARDED_LISTENER_EVENTS};
pub use media::is_media_url;
