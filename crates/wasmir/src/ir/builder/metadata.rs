//! Code metadata splicing.
//!
//! `metadata.code.*` sections precede the code section, so their entries
//! are queued and matched against instructions as the bodies stream past.
//! Each section is ordered by function index and then by offset, the same
//! order the code section produces, so each queue is only ever consumed
//! from the front.

use super::core::IrBuilder;
use crate::error::Error;
use crate::ir::Expr;
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    func_index: u32,
    offset: u32,
    data: Vec<u8>,
}

impl Entry {
    fn key(&self) -> (u32, u32) {
        (self.func_index, self.offset)
    }
}

/// Pending annotations, one FIFO per metadata name in first-seen order.
#[derive(Debug, Default)]
pub(super) struct CodeMetadataQueue {
    queues: Vec<(String, VecDeque<Entry>)>,
}

impl CodeMetadataQueue {
    pub(super) fn push(&mut self, name: &str, func_index: u32, offset: u32, data: &[u8]) {
        let entry = Entry {
            func_index,
            offset,
            data: data.to_vec(),
        };
        match self.queues.iter_mut().find(|(n, _)| n == name) {
            Some((_, queue)) => queue.push_back(entry),
            None => self
                .queues
                .push((name.to_string(), VecDeque::from([entry]))),
        }
    }

    pub(super) fn is_empty(&self) -> bool {
        self.queues.iter().all(|(_, queue)| queue.is_empty())
    }

    /// Removes every entry for `(func_index, offset)`. Entries keyed before
    /// it matched no instruction and are dropped.
    pub(super) fn pop_matching(&mut self, func_index: u32, offset: u32) -> Vec<(String, Vec<u8>)> {
        let mut matched = Vec::new();
        let key = (func_index, offset);
        for (name, queue) in &mut self.queues {
            while let Some(front) = queue.front() {
                if front.key() > key {
                    break;
                }
                let Some(entry) = queue.pop_front() else {
                    break;
                };
                if entry.key() == key {
                    matched.push((name.clone(), entry.data));
                } else {
                    log::debug!(
                        "metadata.code.{name} entry for function {} offset {:#x} matches no instruction",
                        entry.func_index,
                        entry.offset
                    );
                }
            }
        }
        matched
    }
}

impl IrBuilder {
    /// Inserts any queued metadata for the instruction at `offset` ahead of
    /// it.
    pub(super) fn splice_code_metadata(&mut self, offset: usize) -> Result<(), Error> {
        let Some(func_index) = self.current_func else {
            return Ok(());
        };
        if self.metadata.is_empty() {
            return Ok(());
        }
        let relative = u32::try_from(offset.saturating_sub(self.body_start)).unwrap_or(u32::MAX);
        for (name, data) in self.metadata.pop_matching(func_index, relative) {
            self.append(Expr::CodeMetadata { name, data }, offset)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_pop_in_offset_order() {
        let mut queue = CodeMetadataQueue::default();
        queue.push("branch_hint", 0, 4, &[1]);
        queue.push("branch_hint", 0, 9, &[0]);
        queue.push("branch_hint", 2, 3, &[1]);

        assert!(queue.pop_matching(0, 2).is_empty());
        assert_eq!(
            queue.pop_matching(0, 4),
            vec![("branch_hint".to_string(), vec![1])]
        );
        // Function 1 has no entries; function 2's entry must survive.
        assert!(queue.pop_matching(1, 4).is_empty());
        assert!(!queue.is_empty());
        assert_eq!(queue.pop_matching(2, 3).len(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn unmatched_entries_are_dropped_once_passed() {
        let mut queue = CodeMetadataQueue::default();
        queue.push("hint", 0, 4, &[1]);
        queue.push("hint", 0, 8, &[2]);
        assert_eq!(queue.pop_matching(0, 8), vec![("hint".to_string(), vec![2])]);
        assert!(queue.is_empty());
    }

    #[test]
    fn separate_names_keep_separate_queues() {
        let mut queue = CodeMetadataQueue::default();
        queue.push("a", 1, 5, &[0xa]);
        queue.push("b", 0, 5, &[0xb]);
        assert_eq!(queue.pop_matching(0, 5), vec![("b".to_string(), vec![0xb])]);
        assert_eq!(queue.pop_matching(1, 5), vec![("a".to_string(), vec![0xa])]);
    }
}
