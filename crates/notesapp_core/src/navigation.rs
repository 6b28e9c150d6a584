//! Session-driven screen gating.
//!
//! # Responsibility
//! - Map session state to the set of reachable screens.
//! - Track the current route by subscribing to the session manager.
//!
//! # Invariants
//! - Nothing but the splash is reachable while the session is resolving.
//! - Note screens are reachable only with an authenticated user.

use crate::backend::AuthGateway;
use crate::service::session_manager::{SessionManager, SessionSnapshot, SubscriptionId};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Auth,
    Home,
    Notes,
}

/// Top-level screen set selected by session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Splash,
    SignedOut,
    SignedIn,
}

impl Route {
    pub fn for_session(session: &SessionSnapshot) -> Self {
        if session.loading {
            Self::Splash
        } else if session.is_authenticated() {
            Self::SignedIn
        } else {
            Self::SignedOut
        }
    }

    pub fn screens(self) -> &'static [Screen] {
        match self {
            Self::Splash => &[],
            Self::SignedOut => &[Screen::Auth],
            Self::SignedIn => &[Screen::Home, Screen::Notes],
        }
    }

    pub fn can_show(self, screen: Screen) -> bool {
        self.screens().contains(&screen)
    }

    /// First screen of the set, `None` for the splash.
    pub fn initial_screen(self) -> Option<Screen> {
        self.screens().first().copied()
    }
}

/// Keeps the current route in step with the session manager.
pub struct NavigationGate {
    route: Arc<Mutex<Route>>,
    subscription: SubscriptionId,
}

impl NavigationGate {
    pub fn attach<A: AuthGateway>(session: &SessionManager<A>) -> Self {
        let route = Arc::new(Mutex::new(Route::for_session(&session.snapshot())));
        let observed = Arc::clone(&route);
        let subscription = session.subscribe(move |snapshot| {
            let mut current = observed
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            *current = Route::for_session(snapshot);
        });
        Self {
            route,
            subscription,
        }
    }

    pub fn route(&self) -> Route {
        *self
            .route
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn can_show(&self, screen: Screen) -> bool {
        self.route().can_show(screen)
    }

    /// Stops tracking the session.
    pub fn detach<A: AuthGateway>(self, session: &SessionManager<A>) {
        session.unsubscribe(self.subscription);
    }
}
