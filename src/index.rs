use ahash::AHashMap;

use crate::types::{BlockDigest, DigestRecord};

/// Digest -> ascending block indices that produced it.
///
/// Built once from the record sequence, read-only afterwards.
#[derive(Debug, Default, Clone)]
pub struct DigestIndex {
    blocks: AHashMap<BlockDigest, Vec<u64>>,
}

impl DigestIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index records in one pass; records must arrive in index order
    pub fn build(records: &[DigestRecord]) -> Self {
        let mut index = Self::new();
        for record in records {
            index.insert(record);
        }
        index
    }

    pub fn insert(&mut self, record: &DigestRecord) {
        let blocks = self.blocks.entry(record.digest).or_default();
        debug_assert!(blocks.last().map_or(true, |&last| last < record.index));
        blocks.push(record.index);
    }

    /// Blocks sharing `digest`, ascending
    pub fn blocks(&self, digest: &BlockDigest) -> &[u64] {
        self.blocks.get(digest).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Groups of two or more blocks with the same digest
    pub fn duplicates(&self) -> impl Iterator<Item = (&BlockDigest, &[u64])> {
        self.blocks
            .iter()
            .filter(|(_, blocks)| blocks.len() > 1)
            .map(|(digest, blocks)| (digest, blocks.as_slice()))
    }

    pub fn distinct_digests(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(ids: &[u8]) -> Vec<DigestRecord> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| DigestRecord::from_bytes(i as u64, &[*id]))
            .collect()
    }

    #[test]
    fn test_groups_blocks_by_digest() {
        let records = records(&[1, 2, 1, 3, 1, 2]);
        let index = DigestIndex::build(&records);

        assert_eq!(index.distinct_digests(), 3);
        assert_eq!(index.blocks(&records[0].digest), &[0, 2, 4]);
        assert_eq!(index.blocks(&records[1].digest), &[1, 5]);
        assert_eq!(index.blocks(&records[3].digest), &[3]);
    }

    #[test]
    fn test_duplicates_skip_unique_digests() {
        let records = records(&[1, 2, 1, 3]);
        let index = DigestIndex::build(&records);

        let duplicates: Vec<_> = index.duplicates().collect();
        assert_eq!(duplicates.len(), 1);
        assert_eq!(duplicates[0].1, &[0, 2]);
    }

    #[test]
    fn test_unknown_digest_has_no_blocks() {
        let index = DigestIndex::new();
        assert!(index.is_empty());
        assert!(index.blocks(&crate::types::BlockDigest::of(b"x")).is_empty());
    }
}
