//! Events emitted by the realtime sync channel.

use crate::notifications::Notice;
use splitter_core::Resource;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    Connected,
    Disconnected { reason: String },
    /// Cached queries under these resources were marked stale.
    Invalidated(Vec<Resource>),
    Notice(Notice),
}
