/// Batch processing over runs of source messages
pub mod batch;
/// URL sanitizing and link buttons
pub mod buttons;
/// Platform client boundary and shared message types
pub mod client;
/// Archiving media into the storage channel
pub mod forward;
/// Update handlers
pub mod handlers;
/// Seen-message cache
pub mod message_cache;
/// User-facing texts
pub mod messages;
/// Operator alerts
pub mod notify;
/// Single-item processing
pub mod pipeline;
/// Flood-wait retry and button fallback
pub mod resilient;
/// teloxide-backed client
pub mod teloxide_client;

pub use message_cache::MessageCache;
