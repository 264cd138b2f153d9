//! Pre-allocated slot storage for live shared textures.
//!
//! Fixed capacity, no growth after startup. A slot is addressed by a
//! [`HandleId`] and guarded by its [`TextureToken`]: a stale handle whose
//! slot was reused fails the token check instead of aliasing a stranger.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use synapse_core::TextureToken;

use crate::backend::HandleId;
use crate::error::ResourceBridgeError;
use crate::fence::{FenceMode, FenceTracker};

/// One live shared texture.
///
/// Size, format and OS handle live in the caller's [`crate::backend::SharedTextureHandle`]
/// and wire descriptor; the table only tracks identity and synchronization.
pub(crate) struct TextureRecord {
    /// Token guarding this slot against stale handles.
    pub token: TextureToken,
    /// Fence guarding reads of the resource.
    pub fence: Arc<FenceTracker>,
}

struct TableInner {
    slots: Box<[Option<TextureRecord>]>,
    next_token: u64,
    live: usize,
}

/// Slot table shared by every backend.
pub(crate) struct TextureTable {
    inner: Mutex<TableInner>,
    device_lost: AtomicBool,
}

impl TextureTable {
    /// Creates a table with `capacity` pre-allocated slots.
    pub fn new(capacity: usize) -> Self {
        let slots: Vec<Option<TextureRecord>> = (0..capacity).map(|_| None).collect();
        Self {
            inner: Mutex::new(TableInner {
                slots: slots.into_boxed_slice(),
                next_token: 1,
                live: 0,
            }),
            device_lost: AtomicBool::new(false),
        }
    }

    /// Inserts a record, allocating a fresh token and fence tracker.
    pub fn insert(
        &self,
        mode: FenceMode,
    ) -> Result<(HandleId, TextureToken, Arc<FenceTracker>), ResourceBridgeError> {
        if self.is_device_lost() {
            return Err(ResourceBridgeError::DeviceLost);
        }

        let mut inner = self.inner.lock();
        let capacity = inner.slots.len();
        let Some(slot) = inner.slots.iter().position(Option::is_none) else {
            return Err(ResourceBridgeError::SlotsExhausted { capacity });
        };

        let token = TextureToken(inner.next_token);
        inner.next_token += 1;
        let fence = Arc::new(FenceTracker::new(mode, 0));

        inner.slots[slot] = Some(TextureRecord {
            token,
            fence: Arc::clone(&fence),
        });
        inner.live += 1;

        Ok((HandleId(slot as u32), token, fence))
    }

    /// Looks up the fence of a live record.
    pub fn fence(
        &self,
        id: HandleId,
        token: TextureToken,
    ) -> Result<Arc<FenceTracker>, ResourceBridgeError> {
        let inner = self.inner.lock();
        inner
            .slots
            .get(id.0 as usize)
            .and_then(Option::as_ref)
            .filter(|record| record.token == token)
            .map(|record| Arc::clone(&record.fence))
            .ok_or(ResourceBridgeError::UnknownHandle)
    }

    /// Looks up a record's token by handle id, for validity checks.
    pub fn contains(&self, id: HandleId, token: TextureToken) -> bool {
        let inner = self.inner.lock();
        inner
            .slots
            .get(id.0 as usize)
            .and_then(Option::as_ref)
            .is_some_and(|record| record.token == token)
    }

    /// Removes a live record.
    pub fn remove(&self, id: HandleId, token: TextureToken) -> Result<(), ResourceBridgeError> {
        let mut inner = self.inner.lock();
        let slot = inner
            .slots
            .get_mut(id.0 as usize)
            .ok_or(ResourceBridgeError::UnknownHandle)?;
        match slot {
            Some(record) if record.token == token => {
                *slot = None;
                inner.live -= 1;
                Ok(())
            }
            _ => Err(ResourceBridgeError::UnknownHandle),
        }
    }

    /// Number of live records.
    pub fn live(&self) -> usize {
        self.inner.lock().live
    }

    /// Marks the device lost and drops every record without waiting on any
    /// fence. Waiters blocked on a dropped fence run out their timeout.
    ///
    /// Returns the number of records invalidated.
    pub fn mark_device_lost(&self) -> usize {
        self.device_lost.store(true, Ordering::Release);
        self.clear()
    }

    /// Returns true if the device is currently lost.
    pub fn is_device_lost(&self) -> bool {
        self.device_lost.load(Ordering::Acquire)
    }

    /// Clears the device-lost flag after a reconnect rebuilt the device.
    ///
    /// Token allocation continues from where it was, so handles from before
    /// the loss can never validate again.
    pub fn reset(&self) {
        self.clear();
        self.device_lost.store(false, Ordering::Release);
    }

    fn clear(&self) -> usize {
        let mut inner = self.inner.lock();
        let mut cleared = 0;
        for slot in inner.slots.iter_mut() {
            if slot.take().is_some() {
                cleared += 1;
            }
        }
        inner.live = 0;
        cleared
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_unique_and_increasing() {
        let table = TextureTable::new(4);
        let (_, t1, _) = table.insert(FenceMode::AtLeast).unwrap();
        let (_, t2, _) = table.insert(FenceMode::AtLeast).unwrap();
        assert!(t2 > t1);
    }

    #[test]
    fn test_slot_reuse_rejects_stale_token() {
        let table = TextureTable::new(1);
        let (id, token, _) = table.insert(FenceMode::AtLeast).unwrap();
        table.remove(id, token).unwrap();

        let (id2, token2, _) = table.insert(FenceMode::AtLeast).unwrap();
        assert_eq!(id.0, id2.0);
        assert!(!table.contains(id, token));
        assert!(table.contains(id2, token2));
        assert_eq!(
            table.fence(id, token).unwrap_err(),
            ResourceBridgeError::UnknownHandle
        );
    }

    #[test]
    fn test_capacity_is_enforced() {
        let table = TextureTable::new(2);
        table.insert(FenceMode::AtLeast).unwrap();
        table.insert(FenceMode::AtLeast).unwrap();
        assert_eq!(
            table.insert(FenceMode::AtLeast).unwrap_err(),
            ResourceBridgeError::SlotsExhausted { capacity: 2 }
        );
    }

    #[test]
    fn test_device_lost_invalidates_everything() {
        let table = TextureTable::new(4);
        let (id, token, _) = table.insert(FenceMode::AtLeast).unwrap();

        assert_eq!(table.mark_device_lost(), 1);
        assert!(table.is_device_lost());
        assert!(!table.contains(id, token));
        assert_eq!(
            table.insert(FenceMode::AtLeast).unwrap_err(),
            ResourceBridgeError::DeviceLost
        );

        table.reset();
        assert!(!table.is_device_lost());
        let (_, token2, _) = table.insert(FenceMode::AtLeast).unwrap();
        assert!(token2 > token);
    }
}
