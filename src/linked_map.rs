//! Insertion-ordered map with touch reordering.
//!
//! The protocol layer correlates asynchronous responses with a map that keeps
//! request order but can move an entry to either end when it is touched.
//! Entries live in a slot vector linked by indices; no reference counting and
//! no `unsafe`.

use std::collections::HashMap;
use std::hash::Hash;

/// Where to relink a touched entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Touch {
    First,
    Last,
}

const NIL: usize = usize::MAX;

#[derive(Debug)]
struct Slot<K, V> {
    key: K,
    value: V,
    prev: usize,
    next: usize,
}

/// Hash map preserving insertion order, with `touch` to move one entry to the
/// front or back while every other entry keeps its relative order.
#[derive(Debug)]
pub struct LinkedMap<K, V> {
    index: HashMap<K, usize>,
    slots: Vec<Option<Slot<K, V>>>,
    free: Vec<usize>,
    head: usize,
    tail: usize,
}

impl<K: Hash + Eq + Clone, V> LinkedMap<K, V> {
    pub fn new() -> Self {
        Self {
            index: HashMap::new(),
            slots: Vec::new(),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        let slot = *self.index.get(key)?;
        Some(&self.slot(slot).value)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let slot = *self.index.get(key)?;
        Some(&mut self.slots[slot].as_mut().expect("linked slot").value)
    }

    /// Insert a key/value pair. A new key is appended at the back; an
    /// existing key keeps its position and gets its value replaced, which is
    /// returned.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if let Some(&slot) = self.index.get(&key) {
            let old = std::mem::replace(
                &mut self.slots[slot].as_mut().expect("linked slot").value,
                value,
            );
            return Some(old);
        }

        let slot = match self.free.pop() {
            Some(slot) => slot,
            None => {
                self.slots.push(None);
                self.slots.len() - 1
            }
        };
        self.slots[slot] = Some(Slot {
            key: key.clone(),
            value,
            prev: self.tail,
            next: NIL,
        });
        if self.tail == NIL {
            self.head = slot;
        } else {
            self.slots[self.tail].as_mut().expect("linked slot").next = slot;
        }
        self.tail = slot;
        self.index.insert(key, slot);
        None
    }

    /// Move an existing entry to the front or back. Returns whether the key
    /// was present.
    pub fn touch(&mut self, key: &K, touch: Touch) -> bool {
        let Some(&slot) = self.index.get(key) else {
            return false;
        };
        self.unlink(slot);
        match touch {
            Touch::First => {
                self.slot_mut(slot).prev = NIL;
                self.slot_mut(slot).next = self.head;
                if self.head == NIL {
                    self.tail = slot;
                } else {
                    let head = self.head;
                    self.slot_mut(head).prev = slot;
                }
                self.head = slot;
            }
            Touch::Last => {
                self.slot_mut(slot).prev = self.tail;
                self.slot_mut(slot).next = NIL;
                if self.tail == NIL {
                    self.head = slot;
                } else {
                    let tail = self.tail;
                    self.slot_mut(tail).next = slot;
                }
                self.tail = slot;
            }
        }
        true
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let slot = self.index.remove(key)?;
        self.unlink(slot);
        self.free.push(slot);
        Some(self.slots[slot].take().expect("linked slot").value)
    }

    pub fn clear(&mut self) {
        self.index.clear();
        self.slots.clear();
        self.free.clear();
        self.head = NIL;
        self.tail = NIL;
    }

    /// Entries in current order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            map: self,
            cursor: self.head,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(key, _)| key)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, value)| value)
    }

    fn slot(&self, slot: usize) -> &Slot<K, V> {
        self.slots[slot].as_ref().expect("linked slot")
    }

    fn slot_mut(&mut self, slot: usize) -> &mut Slot<K, V> {
        self.slots[slot].as_mut().expect("linked slot")
    }

    /// Detach a slot from the order list, leaving its own links stale.
    fn unlink(&mut self, slot: usize) {
        let (prev, next) = {
            let slot = self.slot(slot);
            (slot.prev, slot.next)
        };
        if prev == NIL {
            self.head = next;
        } else {
            self.slot_mut(prev).next = next;
        }
        if next == NIL {
            self.tail = prev;
        } else {
            self.slot_mut(next).prev = prev;
        }
    }
}

impl<K: Hash + Eq + Clone, V> Default for LinkedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Iter<'a, K, V> {
    map: &'a LinkedMap<K, V>,
    cursor: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == NIL {
            return None;
        }
        let slot = self.map.slots[self.cursor].as_ref().expect("linked slot");
        self.cursor = slot.next;
        Some((&slot.key, &slot.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys<'a>(map: &'a LinkedMap<&'a str, &'a str>) -> Vec<&'a str> {
        map.keys().copied().collect()
    }

    fn values<'a>(map: &'a LinkedMap<&'a str, &'a str>) -> Vec<&'a str> {
        map.values().copied().collect()
    }

    #[test]
    fn keeps_insertion_order() {
        let mut map = LinkedMap::new();
        map.insert("ak", "av");
        map.insert("bk", "bv");
        assert_eq!(keys(&map), ["ak", "bk"]);
        assert_eq!(values(&map), ["av", "bv"]);
    }

    #[test]
    fn touch_single_entry_is_noop() {
        let mut map = LinkedMap::new();
        map.insert("ak", "av");
        assert!(map.touch(&"ak", Touch::First));
        assert_eq!(keys(&map), ["ak"]);
        assert!(map.touch(&"ak", Touch::Last));
        assert_eq!(keys(&map), ["ak"]);
    }

    #[test]
    fn touch_first_of_two() {
        let mut map = LinkedMap::new();
        map.insert("ak", "av");
        map.insert("bk", "bv");
        map.touch(&"bk", Touch::First);
        assert_eq!(keys(&map), ["bk", "ak"]);
        assert_eq!(values(&map), ["bv", "av"]);
    }

    #[test]
    fn touch_last_of_two() {
        let mut map = LinkedMap::new();
        map.insert("ak", "av");
        map.insert("bk", "bv");
        map.touch(&"ak", Touch::Last);
        assert_eq!(keys(&map), ["bk", "ak"]);
        assert_eq!(values(&map), ["bv", "av"]);
    }

    #[test]
    fn touch_first_from_middle() {
        let mut map = LinkedMap::new();
        map.insert("ak", "av");
        map.insert("bk", "bv");
        map.insert("ck", "cv");
        map.touch(&"bk", Touch::First);
        assert_eq!(keys(&map), ["bk", "ak", "ck"]);
        assert_eq!(values(&map), ["bv", "av", "cv"]);
    }

    #[test]
    fn touch_last_from_middle() {
        let mut map = LinkedMap::new();
        map.insert("ak", "av");
        map.insert("bk", "bv");
        map.insert("ck", "cv");
        map.touch(&"bk", Touch::Last);
        assert_eq!(keys(&map), ["ak", "ck", "bk"]);
        assert_eq!(values(&map), ["av", "cv", "bv"]);
    }

    #[test]
    fn touch_missing_key() {
        let mut map: LinkedMap<&str, &str> = LinkedMap::new();
        map.insert("ak", "av");
        assert!(!map.touch(&"zk", Touch::First));
        assert_eq!(keys(&map), ["ak"]);
    }

    #[test]
    fn insert_existing_keeps_position() {
        let mut map = LinkedMap::new();
        map.insert("ak", "av");
        map.insert("bk", "bv");
        assert_eq!(map.insert("ak", "av2"), Some("av"));
        assert_eq!(keys(&map), ["ak", "bk"]);
        assert_eq!(values(&map), ["av2", "bv"]);
    }

    #[test]
    fn remove_relinks_and_reuses_slots() {
        let mut map = LinkedMap::new();
        map.insert("ak", "av");
        map.insert("bk", "bv");
        map.insert("ck", "cv");
        assert_eq!(map.remove(&"bk"), Some("bv"));
        assert_eq!(keys(&map), ["ak", "ck"]);
        assert_eq!(map.len(), 2);
        assert!(!map.contains_key(&"bk"));

        // The freed slot is reused; order is still append-at-back.
        map.insert("dk", "dv");
        assert_eq!(keys(&map), ["ak", "ck", "dk"]);

        assert_eq!(map.remove(&"ak"), Some("av"));
        assert_eq!(map.remove(&"dk"), Some("dv"));
        assert_eq!(map.remove(&"ck"), Some("cv"));
        assert!(map.is_empty());
        assert_eq!(keys(&map), Vec::<&str>::new());
    }

    #[test]
    fn get_and_get_mut() {
        let mut map = LinkedMap::new();
        map.insert("ak", "av");
        assert_eq!(map.get(&"ak"), Some(&"av"));
        *map.get_mut(&"ak").unwrap() = "av2";
        assert_eq!(map.get(&"ak"), Some(&"av2"));
        assert_eq!(map.get(&"zk"), None);
    }

    #[test]
    fn clear_resets_everything() {
        let mut map = LinkedMap::new();
        map.insert("ak", "av");
        map.insert("bk", "bv");
        map.clear();
        assert!(map.is_empty());
        map.insert("ck", "cv");
        assert_eq!(keys(&map), ["ck"]);
    }
}
