//! Prometheus metrics for channel displays

use lazy_static::lazy_static;
use prometheus::{register_counter_vec, CounterVec};

lazy_static! {
    /// Incoming items by outcome (delivered/ignored/parse_error)
    pub static ref DISPLAY_ITEMS_TOTAL: CounterVec = register_counter_vec!(
        "display_items_total",
        "Incoming display items by outcome",
        &["channel", "outcome"]
    )
    .unwrap();

    /// Subscribe attempts by outcome
    pub static ref DISPLAY_SUBSCRIBE_TOTAL: CounterVec = register_counter_vec!(
        "display_subscribe_total",
        "Channel subscribe attempts by outcome",
        &["channel", "outcome"]
    )
    .unwrap();
}
