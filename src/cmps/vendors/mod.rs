//! Procedural strategies for CMPs that need more than the step language.
//!
//! | Strategy | Name | Frames |
//! |----------|------|--------|
//! | [`TrustArcTop`] | `TrustArc-top` | top |
//! | [`TrustArcFrame`] | `TrustArc-frame` | sub-frame, `consent-pref.trustarc.com` |
//! | [`Cookiebot`] | `Cybotcookiebot` | top |
//! | [`SourcePoint`] | `Sourcepoint-frame` | any, message and privacy-manager URLs |
//! | [`ConsentManager`] | `consentmanager.net` | top |
//! | [`Evidon`] | `Evidon` | top |
//! | [`Onetrust`] | `Onetrust` | top |
//! | [`Klaro`] | `Klaro` | top |
//! | [`Uniconsent`] | `Uniconsent` | top |
//! | [`Conversant`] | `Conversant` | top |
//! | [`Tiktok`] | `tiktok.com` | top, `tiktok` URLs |
//! | [`Airbnb`] | `airbnb` | top, airbnb hosts |
//! | [`Tumblr`] | `tumblr-com` | top, tumblr hosts |
//! | [`Admiral`] | `Admiral` | top |

// ============================================================================
// Submodules
// ============================================================================

mod admiral;
mod airbnb;
mod consentmanager;
mod conversant;
mod cookiebot;
mod evidon;
mod klaro;
mod onetrust;
mod sourcepoint;
mod tiktok;
mod trustarc;
mod tumblr;
mod uniconsent;

// ============================================================================
// Re-exports
// ============================================================================

pub use admiral::Admiral;
pub use airbnb::Airbnb;
pub use consentmanager::ConsentManager;
pub use conversant::Conversant;
pub use cookiebot::Cookiebot;
pub use evidon::Evidon;
pub use klaro::Klaro;
pub use onetrust::Onetrust;
pub use sourcepoint::SourcePoint;
pub use tiktok::Tiktok;
pub use trustarc::{TrustArcFrame, TrustArcTop};
pub use tumblr::Tumblr;
pub use uniconsent::Uniconsent;

use std::sync::Arc;

use super::CmpStrategy;

/// Fresh instances of every procedural strategy, in detection order.
///
/// Several strategies keep per-page state, so each engine builds its own
/// set.
#[must_use]
pub fn builtin() -> Vec<Arc<dyn CmpStrategy>> {
    vec![
        Arc::new(TrustArcTop::new()),
        Arc::new(TrustArcFrame::new()),
        Arc::new(Cookiebot::new()),
        Arc::new(SourcePoint::new()),
        Arc::new(ConsentManager::new()),
        Arc::new(Evidon::new()),
        Arc::new(Onetrust::new()),
        Arc::new(Klaro::new()),
        Arc::new(Uniconsent::new()),
        Arc::new(Conversant::new()),
        Arc::new(Tiktok::new()),
        Arc::new(Airbnb::new()),
        Arc::new(Tumblr::new()),
        Arc::new(Admiral::new()),
    ]
}

// ============================================================================
// Tests
// ============================================================================
