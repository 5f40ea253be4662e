//! Default values and functions for configuration

// Default constants
pub(crate) const DEFAULT_INITIAL_TIMER_INTERVAL_SECS: u64 = 5;
pub(crate) const DEFAULT_DELAYED_TIMER_INTERVAL_ADDITION_SECS: u64 = 1;
pub(crate) const DEFAULT_PERMITTED_SECS_BETWEEN_READY_EVENTS: u64 = 60;
/// Matches the 32KB notification buffer the service has always run with
pub(crate) const DEFAULT_EVENT_BUFFER_CAPACITY: usize = 32_768;
pub(crate) const DEFAULT_NOTIFIER_TIMEOUT_SECS: u64 = 30;
pub(crate) const DEFAULT_MESSAGE_PREFIX: &str = "File changed: ";
/// Upper bound for the debounce interval settings (one day)
pub(crate) const MAX_TIMER_INTERVAL_SECS: u64 = 86_400;

pub(crate) fn default_initial_timer_interval_secs() -> u64 {
    DEFAULT_INITIAL_TIMER_INTERVAL_SECS
}

pub(crate) fn default_delayed_timer_interval_addition_secs() -> u64 {
    DEFAULT_DELAYED_TIMER_INTERVAL_ADDITION_SECS
}

pub(crate) fn default_permitted_secs_between_ready_events() -> u64 {
    DEFAULT_PERMITTED_SECS_BETWEEN_READY_EVENTS
}

pub(crate) fn default_event_buffer_capacity() -> usize {
    DEFAULT_EVENT_BUFFER_CAPACITY
}

pub(crate) fn default_notifier_timeout_secs() -> u64 {
    DEFAULT_NOTIFIER_TIMEOUT_SECS
}

pub(crate) fn default_message_prefix() -> String {
    DEFAULT_MESSAGE_PREFIX.to_string()
}
