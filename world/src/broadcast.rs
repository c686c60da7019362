//! Per-round broadcast channel: one flag slot per entity.

use std::collections::BTreeMap;
use std::mem;

use tilebot_core::EntityId;

/// Double-buffered flag storage.
///
/// Writes land in the pending buffer and only become readable once the round
/// advances. A published flag persists until its owner writes a new one; a
/// zero write clears it.
#[derive(Debug, Default)]
pub(crate) struct FlagChannel {
    published: BTreeMap<EntityId, u32>,
    pending: BTreeMap<EntityId, u32>,
}

impl FlagChannel {
    /// Records the outgoing flag of an entity. Later writes in the same round win.
    pub(crate) fn write(&mut self, entity: EntityId, flag: u32) {
        let _ = self.pending.insert(entity, flag);
    }

    /// Makes every pending write readable.
    pub(crate) fn publish(&mut self) {
        for (entity, flag) in mem::take(&mut self.pending) {
            if flag == 0 {
                let _ = self.published.remove(&entity);
            } else {
                let _ = self.published.insert(entity, flag);
            }
        }
    }

    /// Flag visible for the entity this round; zero when it published nothing.
    pub(crate) fn read(&self, entity: EntityId) -> u32 {
        self.published.get(&entity).copied().unwrap_or(0)
    }

    pub(crate) fn forget(&mut self, entity: EntityId) {
        let _ = self.published.remove(&entity);
        let _ = self.pending.remove(&entity);
    }

    pub(crate) fn clear(&mut self) {
        self.published.clear();
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_are_invisible_until_published() {
        let mut channel = FlagChannel::default();
        let entity = EntityId::new(3);

        channel.write(entity, 17);
        assert_eq!(channel.read(entity), 0);

        channel.publish();
        assert_eq!(channel.read(entity), 17);
    }

    #[test]
    fn last_write_wins_and_zero_clears() {
        let mut channel = FlagChannel::default();
        let entity = EntityId::new(3);

        channel.write(entity, 5);
        channel.write(entity, 9);
        channel.publish();
        assert_eq!(channel.read(entity), 9);

        channel.publish();
        assert_eq!(channel.read(entity), 9, "flags persist across silent rounds");

        channel.write(entity, 0);
        channel.publish();
        assert_eq!(channel.read(entity), 0);
    }
}
