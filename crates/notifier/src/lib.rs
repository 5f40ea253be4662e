#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

//! Downstream delivery of ready events
//!
//! Posts a short message to an HTTP webhook for every file the watcher
//! declares ready. Delivery is best effort: failures are logged and the
//! next event is still attempted.

mod webhook;

pub use webhook::{MessageCard, WebhookNotifier};
