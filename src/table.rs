//! Hand-rolled open-addressing hash table.
//!
//! Used for two things at runtime: the VM's global-variable table and the
//! GC's string-intern table. Both need exact, testable probe semantics
//! (tombstones that keep probe chains intact, a fixed 0.75 max load factor,
//! power-of-two capacity) rather than whatever std's `HashMap` happens to do
//! internally.

use crate::value::{StringId, Value};

const MAX_LOAD: f64 = 0.75;

#[derive(Clone, Copy)]
enum Slot {
    Empty,
    Tombstone,
    Occupied(StringId, Value),
}

/// An open-addressing hash table keyed by interned string id, linear-probed
/// with tombstones for deletion.
pub struct Table {
    entries: Vec<Slot>,
    /// Count of slots that are occupied or were once occupied and are now
    /// tombstones — `delete` never decrements it, matching clox's
    /// `tableDelete`, so this tracks apparent load for the grow threshold
    /// the same way a real occupant would.
    count: usize,
}

impl Default for Table {
    fn default() -> Self {
        Table::new()
    }
}

impl Table {
    pub fn new() -> Self {
        Table {
            entries: Vec::new(),
            count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Find the slot `key` either occupies or would occupy: the first
    /// tombstone seen along the probe chain if the key isn't present, or
    /// the key's own slot if it is. This dual role is what keeps deletion
    /// sound: reusing a tombstone slot on insert doesn't break later probes
    /// for other keys that skipped over it.
    fn find_slot(entries: &[Slot], capacity: usize, key: StringId) -> usize {
        let mut index = (key.0 as usize) & (capacity - 1);
        let mut tombstone: Option<usize> = None;
        loop {
            match entries[index] {
                Slot::Empty => return tombstone.unwrap_or(index),
                Slot::Tombstone => {
                    if tombstone.is_none() {
                        tombstone = Some(index);
                    }
                }
                Slot::Occupied(k, _) if k == key => return index,
                Slot::Occupied(_, _) => {}
            }
            index = (index + 1) & (capacity - 1);
        }
    }

    fn grow(&mut self, new_capacity: usize) {
        let mut new_entries = vec![Slot::Empty; new_capacity];
        let mut new_count = 0;

        for slot in &self.entries {
            if let Slot::Occupied(key, value) = slot {
                let index = Table::find_slot(&new_entries, new_capacity, *key);
                new_entries[index] = Slot::Occupied(*key, *value);
                new_count += 1;
            }
        }

        self.entries = new_entries;
        self.count = new_count;
    }

    /// Insert or overwrite `key => value`. Returns `true` if this created a
    /// brand-new entry (key was absent), `false` if it overwrote an
    /// existing one — the same return convention as clox's `tableSet`,
    /// which `DefineGlobal`/`SetGlobal` rely on to tell "new global" apart
    /// from "reassigned global".
    pub fn set(&mut self, key: StringId, value: Value) -> bool {
        if self.entries.is_empty() || (self.count + 1) as f64 > self.capacity() as f64 * MAX_LOAD
        {
            let new_capacity = if self.entries.is_empty() {
                8
            } else {
                self.capacity() * 2
            };
            self.grow(new_capacity);
        }

        let capacity = self.capacity();
        let index = Table::find_slot(&self.entries, capacity, key);
        let is_new = !matches!(self.entries[index], Slot::Occupied(_, _));
        if is_new {
            self.count += 1;
        }
        self.entries[index] = Slot::Occupied(key, value);
        is_new
    }

    pub fn get(&self, key: StringId) -> Option<Value> {
        if self.entries.is_empty() {
            return None;
        }
        let capacity = self.capacity();
        match self.entries[Table::find_slot(&self.entries, capacity, key)] {
            Slot::Occupied(_, value) => Some(value),
            _ => None,
        }
    }

    /// Remove `key`, leaving a tombstone behind so later probe chains that
    /// passed through this slot still find keys stored past it.
    pub fn delete(&mut self, key: StringId) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        let capacity = self.capacity();
        let index = Table::find_slot(&self.entries, capacity, key);
        if matches!(self.entries[index], Slot::Occupied(_, _)) {
            self.entries[index] = Slot::Tombstone;
            // count tracks occupied slots only; removing one does not
            // increment it back down past what `set` already recorded, it
            // simply leaves count alone here and `set` will re-increment on
            // reinsertion into a tombstone. (Matches clox: tableDelete does
            // not touch `count`.)
            true
        } else {
            false
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (StringId, Value)> + '_ {
        self.entries.iter().filter_map(|slot| match slot {
            Slot::Occupied(k, v) => Some((*k, *v)),
            _ => None,
        })
    }
}

/// A string-interning table maps raw bytes to the id of the canonical
/// `StringId` for that content, so [`crate::gc::Gc`] can dedupe string
/// allocations. Kept separate from [`Table`] because the key here is the
/// string's content/hash, not an already-interned id — interning is exactly
/// the process of turning content into an id in the first place.
pub struct InternTable {
    entries: Vec<InternSlot>,
    count: usize,
}

#[derive(Clone)]
enum InternSlot {
    Empty,
    Tombstone,
    Occupied { hash: u32, text: Box<str>, id: StringId },
}

impl Default for InternTable {
    fn default() -> Self {
        InternTable::new()
    }
}

/// FNV-1a, 32-bit: matches clox's `hashString` byte for byte.
pub fn fnv1a_hash(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 2166136261;
    for &b in bytes {
        hash ^= b as u32;
        hash = hash.wrapping_mul(16777619);
    }
    hash
}

impl InternTable {
    pub fn new() -> Self {
        InternTable {
            entries: Vec::new(),
            count: 0,
        }
    }

    fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// The probe used by clox's `tableFindString`: compares hash first
    /// (cheap) and only falls back to a full byte comparison when hashes
    /// collide, so that interning never has to allocate to look up a key
    /// that's already present.
    pub fn find(&self, text: &str, hash: u32) -> Option<StringId> {
        if self.entries.is_empty() {
            return None;
        }
        let capacity = self.capacity();
        let mut index = (hash as usize) & (capacity - 1);
        loop {
            match &self.entries[index] {
                InternSlot::Empty => return None,
                InternSlot::Tombstone => {}
                InternSlot::Occupied {
                    hash: h,
                    text: t,
                    id,
                } => {
                    if *h == hash && t.as_ref() == text {
                        return Some(*id);
                    }
                }
            }
            index = (index + 1) & (capacity - 1);
        }
    }

    fn find_slot_for_insert(entries: &[InternSlot], capacity: usize, hash: u32, text: &str) -> usize {
        let mut index = (hash as usize) & (capacity - 1);
        let mut tombstone: Option<usize> = None;
        loop {
            match &entries[index] {
                InternSlot::Empty => return tombstone.unwrap_or(index),
                InternSlot::Tombstone => {
                    if tombstone.is_none() {
                        tombstone = Some(index);
                    }
                }
                InternSlot::Occupied { hash: h, text: t, .. } => {
                    if *h == hash && t.as_ref() == text {
                        return index;
                    }
                }
            }
            index = (index + 1) & (capacity - 1);
        }
    }

    fn grow(&mut self, new_capacity: usize) {
        let mut new_entries = vec![InternSlot::Empty; new_capacity];
        let mut new_count = 0;
        for slot in self.entries.drain(..) {
            if let InternSlot::Occupied { hash, text, id } = slot {
                let index = InternTable::find_slot_for_insert(&new_entries, new_capacity, hash, &text);
                new_entries[index] = InternSlot::Occupied { hash, text, id };
                new_count += 1;
            }
        }
        self.entries = new_entries;
        self.count = new_count;
    }

    pub fn insert(&mut self, text: Box<str>, hash: u32, id: StringId) {
        if self.entries.is_empty() || (self.count + 1) as f64 > self.capacity() as f64 * MAX_LOAD {
            let new_capacity = if self.entries.is_empty() {
                8
            } else {
                self.capacity() * 2
            };
            self.grow(new_capacity);
        }
        let capacity = self.capacity();
        let index = InternTable::find_slot_for_insert(&self.entries, capacity, hash, &text);
        if !matches!(self.entries[index], InternSlot::Occupied { .. }) {
            self.count += 1;
        }
        self.entries[index] = InternSlot::Occupied { hash, text, id };
    }

    /// Drop the interned entry for any string whose backing object was just
    /// swept, so a future identical literal interns a fresh (live) id
    /// instead of resurrecting a dangling one. Run once per GC cycle, after
    /// sweep, against the set of ids that survived — this is what keeps the
    /// intern table from holding live references of its own ("weak" intern
    /// table semantics).
    pub fn retain_live(&mut self, is_live: impl Fn(StringId) -> bool) {
        for slot in &mut self.entries {
            if let InternSlot::Occupied { id, .. } = slot {
                if !is_live(*id) {
                    *slot = InternSlot::Tombstone;
                }
            }
        }
        self.count = self
            .entries
            .iter()
            .filter(|s| matches!(s, InternSlot::Occupied { .. }))
            .count();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_roundtrips() {
        let mut table = Table::new();
        assert!(table.set(StringId(1), Value::Number(1.0)));
        assert_eq!(table.get(StringId(1)), Some(Value::Number(1.0)));
    }

    #[test]
    fn set_existing_key_overwrites_and_reports_not_new() {
        let mut table = Table::new();
        assert!(table.set(StringId(1), Value::Number(1.0)));
        assert!(!table.set(StringId(1), Value::Number(2.0)));
        assert_eq!(table.get(StringId(1)), Some(Value::Number(2.0)));
    }

    #[test]
    fn delete_then_lookup_through_tombstone_still_finds_later_key() {
        let mut table = Table::new();
        // Force several keys into the same small table so tombstones matter.
        for i in 0..6u32 {
            table.set(StringId(i), Value::Number(i as f64));
        }
        assert!(table.delete(StringId(2)));
        assert_eq!(table.get(StringId(2)), None);
        // Every other key must still be reachable despite the tombstone.
        for i in 0..6u32 {
            if i == 2 {
                continue;
            }
            assert_eq!(table.get(StringId(i)), Some(Value::Number(i as f64)));
        }
    }

    #[test]
    fn grows_past_load_factor() {
        let mut table = Table::new();
        for i in 0..100u32 {
            table.set(StringId(i), Value::Number(i as f64));
        }
        assert_eq!(table.len(), 100);
        for i in 0..100u32 {
            assert_eq!(table.get(StringId(i)), Some(Value::Number(i as f64)));
        }
    }

    #[test]
    fn fnv1a_matches_known_vector() {
        // clox's hashString("", 0) == 2166136261 (the FNV offset basis).
        assert_eq!(fnv1a_hash(b""), 2166136261);
    }

    #[test]
    fn intern_table_finds_inserted_string() {
        let mut interns = InternTable::new();
        let hash = fnv1a_hash(b"hello");
        interns.insert("hello".into(), hash, StringId(0));
        assert_eq!(interns.find("hello", hash), Some(StringId(0)));
        assert_eq!(interns.find("world", fnv1a_hash(b"world")), None);
    }
}
