use log::debug;

use super::data::{Memory, MemoryPatch};
use crate::error::{Error, Result};

/// The MemoryStore holds every memory plus the shared selection.
/// It is the only place memory records are mutated; views read from it
/// and controllers address records by their stable id.
#[derive(Debug, Default)]
pub struct MemoryStore {
    memories: Vec<Memory>,
    selected_id: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole collection (load-time seeding).
    /// Drops the selection if it no longer points at a memory.
    pub fn replace_all(&mut self, memories: Vec<Memory>) {
        self.memories = memories;
        if let Some(id) = &self.selected_id {
            if self.get(id).is_none() {
                self.selected_id = None;
            }
        }
    }

    /// Append a batch of new memories, keeping insertion order
    pub fn append_batch(&mut self, batch: Vec<Memory>) {
        debug!("appending {} memories to a collection of {}", batch.len(), self.memories.len());
        self.memories.extend(batch);
    }

    /// Apply a partial update to one memory
    pub fn patch(&mut self, id: &str, patch: MemoryPatch) -> Result<()> {
        let memory = self
            .memories
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| Error::UnknownMemory(id.to_string()))?;
        patch.apply(memory);
        Ok(())
    }

    /// Append a continuation to a memory's description.
    ///
    /// No separator is inserted after a CJK character, otherwise a single space.
    pub fn append_description(&mut self, id: &str, continuation: &str) -> Result<()> {
        let memory = self
            .memories
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| Error::UnknownMemory(id.to_string()))?;
        memory.description = join_description(&memory.description, continuation);
        Ok(())
    }

    /// Select a memory by id; unknown ids are ignored
    pub fn select(&mut self, id: &str) {
        if self.get(id).is_some() {
            self.selected_id = Some(id.to_string());
        }
    }

    pub fn deselect(&mut self) {
        self.selected_id = None;
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected_id.as_deref()
    }

    pub fn selected(&self) -> Option<&Memory> {
        self.selected_id.as_deref().and_then(|id| self.get(id))
    }

    pub fn get(&self, id: &str) -> Option<&Memory> {
        self.memories.iter().find(|m| m.id == id)
    }

    /// All memories in insertion order
    pub fn memories(&self) -> &[Memory] {
        &self.memories
    }

    pub fn len(&self) -> usize {
        self.memories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memories.is_empty()
    }

    /// Memories ordered oldest first, as the gallery and world views list them.
    /// Ties keep insertion order.
    pub fn chronological(&self) -> Vec<&Memory> {
        let mut ordered: Vec<&Memory> = self.memories.iter().collect();
        ordered.sort_by_key(|m| m.timestamp);
        ordered
    }

    /// Position of a memory in chronological order
    pub fn chronological_position(&self, id: &str) -> Option<usize> {
        self.chronological().iter().position(|m| m.id == id)
    }
}

/// Whether a character belongs to the CJK scripts that are written without spaces
pub fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3000}'..='\u{9FFF}'
        | '\u{AC00}'..='\u{D7AF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{FF00}'..='\u{FFEF}'
        | '\u{20000}'..='\u{2FFFF}')
}

fn join_description(current: &str, continuation: &str) -> String {
    let current = current.trim_end();
    let continuation = continuation.trim();
    if continuation.is_empty() {
        return current.to_string();
    }
    match current.chars().last() {
        None => continuation.to_string(),
        Some(last) if is_cjk(last) => format!("{current}{continuation}"),
        Some(_) => format!("{current} {continuation}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory(id: &str, timestamp: i64) -> Memory {
        Memory {
            id: id.to_string(),
            url: format!("/photos/{id}.jpg"),
            description: "Reading this memory…".to_string(),
            timestamp,
            theta: 0.0,
            phi: 1.0,
            scale: 1.0,
            rotation: 0.0,
            drift_speed: 1.0,
            is_analyzing: true,
        }
    }

    #[test]
    fn test_append_and_patch_by_id() {
        let mut store = MemoryStore::new();
        store.append_batch(vec![memory("a", 1), memory("b", 2)]);

        store.patch("b", MemoryPatch::caption("harbour lights")).unwrap();

        assert_eq!(store.get("b").unwrap().description, "harbour lights");
        assert!(store.get("a").unwrap().is_analyzing);
    }

    #[test]
    fn test_patch_unknown_id_fails() {
        let mut store = MemoryStore::new();
        let err = store.patch("ghost", MemoryPatch::default()).unwrap_err();
        assert!(matches!(err, Error::UnknownMemory(id) if id == "ghost"));
    }

    #[test]
    fn test_selection() {
        let mut store = MemoryStore::new();
        store.append_batch(vec![memory("a", 1)]);

        store.select("missing");
        assert!(store.selected().is_none());

        store.select("a");
        assert_eq!(store.selected_id(), Some("a"));

        store.deselect();
        assert!(store.selected().is_none());
    }

    #[test]
    fn test_replace_all_drops_stale_selection() {
        let mut store = MemoryStore::new();
        store.append_batch(vec![memory("a", 1)]);
        store.select("a");

        store.replace_all(vec![memory("b", 1)]);

        assert!(store.selected_id().is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_chronological_order_is_stable() {
        let mut store = MemoryStore::new();
        store.append_batch(vec![memory("late", 30), memory("early", 10), memory("tie", 30)]);

        let ids: Vec<&str> = store.chronological().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["early", "late", "tie"]);
        assert_eq!(store.chronological_position("tie"), Some(2));
    }

    #[test]
    fn test_append_latin_after_cjk_has_no_space() {
        let mut store = MemoryStore::new();
        store.append_batch(vec![memory("a", 1)]);
        store.patch("a", MemoryPatch::caption("夕暮れの海")).unwrap();

        store.append_description("a", "golden light").unwrap();

        assert_eq!(store.get("a").unwrap().description, "夕暮れの海golden light");
    }

    #[test]
    fn test_append_after_latin_inserts_one_space() {
        let mut store = MemoryStore::new();
        store.append_batch(vec![memory("a", 1)]);
        store.patch("a", MemoryPatch::caption("A quiet street.")).unwrap();

        store.append_description("a", "Rain had just stopped.").unwrap();

        assert_eq!(
            store.get("a").unwrap().description,
            "A quiet street. Rain had just stopped."
        );
    }

    #[test]
    fn test_append_after_extension_ideograph_has_no_space() {
        assert!(is_cjk('\u{20BB7}'));
        assert_eq!(join_description("\u{20BB7}", "night"), "\u{20BB7}night");
    }

    #[test]
    fn test_append_to_empty_description() {
        assert_eq!(join_description("", "hello"), "hello");
        assert_eq!(join_description("hi", "   "), "hi");
    }
}
