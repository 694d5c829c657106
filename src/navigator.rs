//! Navigation capability used for the login redirect.
//!
//! The transport client has exactly one navigation side effect: after an
//! HTTP 401 it sends the user to the login route. How that happens depends on
//! the host (a router in a desktop shell, a channel drained by a TUI, ...), so
//! it goes through [`Navigator`].

use std::sync::Arc;
use tokio::sync::mpsc;

/// Something that can move the application to a route.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str);
}

impl<F> Navigator for F
where
    F: Fn(&str) + Send + Sync,
{
    fn navigate(&self, route: &str) {
        self(route)
    }
}

/// Navigator that only logs the requested route.
///
/// Used when the host did not install a navigator.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, route: &str) {
        log::info!("[bid-link] Navigation requested to '{}'", route);
    }
}

/// Navigator that forwards routes over an unbounded channel.
///
/// # Example
///
/// ```rust
/// use bid_review_link::navigator::{ChannelNavigator, Navigator};
///
/// let (navigator, mut routes) = ChannelNavigator::new();
/// navigator.navigate("/login");
/// assert_eq!(routes.try_recv().unwrap(), "/login");
/// ```
#[derive(Debug, Clone)]
pub struct ChannelNavigator {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelNavigator {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn shared() -> (Arc<dyn Navigator>, mpsc::UnboundedReceiver<String>) {
        let (navigator, rx) = Self::new();
        (Arc::new(navigator), rx)
    }
}

impl Navigator for ChannelNavigator {
    fn navigate(&self, route: &str) {
        if self.tx.send(route.to_string()).is_err() {
            log::debug!("[bid-link] Navigation receiver dropped, ignoring '{}'", route);
        }
    }
}
