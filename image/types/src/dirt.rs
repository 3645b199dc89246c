/*++

Licensed under the Apache-2.0 license.

File Name:

   dirt.rs

Abstract:

    File contains the Data ID Reference Table (DIRT) id space and the
    lookup table built from the VDPA entries.

--*/

/// Number of DIRT ids known to this firmware
pub const DIRT_COUNT: usize = 0x20;

/// Data ID Reference Table id
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DirtId(pub u16);

impl DirtId {
    pub const PERFORMANCE_TABLE: DirtId = DirtId(0x01);
    pub const MEMORY_CLOCK_TABLE: DirtId = DirtId(0x02);
    pub const MEMORY_TWEAK_TABLE: DirtId = DirtId(0x03);
    pub const POWER_POLICY_TABLE: DirtId = DirtId(0x04);
    pub const THERMAL_POLICY_TABLE: DirtId = DirtId(0x05);
    pub const VOLTAGE_RAIL_TABLE: DirtId = DirtId(0x06);
    pub const FAN_COOLER_TABLE: DirtId = DirtId(0x07);
    pub const BOARD_CONFIG_TABLE: DirtId = DirtId(0x08);
    pub const MEMORY_TRAINING_TABLE: DirtId = DirtId(0x09);
    pub const MEMORY_INFORMATION_TABLE: DirtId = DirtId(0x0A);
    pub const MEMORY_TRAINING_PATTERN_TABLE: DirtId = DirtId(0x0B);

    /// Slot index of this id, `None` when it is outside `0..DIRT_COUNT`
    pub fn index(&self) -> Option<usize> {
        let index = self.0 as usize;
        (index < DIRT_COUNT).then_some(index)
    }
}

impl From<DirtId> for u16 {
    fn from(id: DirtId) -> u16 {
        id.0
    }
}

/// Location of a table inside the firmware image
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DirtEntry {
    /// Offset relative to the firmware image start
    pub offset: u32,

    /// Size in bytes
    pub size: u32,
}

/// DIRT id indexed lookup table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirtTable {
    slots: [Option<DirtEntry>; DIRT_COUNT],
}

impl Default for DirtTable {
    fn default() -> Self {
        Self::new()
    }
}

impl DirtTable {
    pub const fn new() -> Self {
        Self {
            slots: [None; DIRT_COUNT],
        }
    }

    pub fn get(&self, id: DirtId) -> Option<DirtEntry> {
        self.slots[id.index()?]
    }

    pub fn is_populated(&self, id: DirtId) -> bool {
        self.get(id).is_some()
    }

    /// Record `entry` for `id`, replacing any earlier entry.
    ///
    /// Returns false if `id` is outside the table.
    pub fn set(&mut self, id: DirtId, entry: DirtEntry) -> bool {
        match id.index() {
            Some(index) => {
                self.slots[index] = Some(entry);
                true
            }
            None => false,
        }
    }

    /// Populated slots in id order
    pub fn iter(&self) -> impl Iterator<Item = (DirtId, DirtEntry)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.map(|entry| (DirtId(index as u16), entry)))
    }

    pub fn populated_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}
