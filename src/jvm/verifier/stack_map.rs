use super::VerificationType;
use crate::jvm::Error;

/// Declared types of the locals and stack at one bytecode offset
///
/// Entries are stored slot by slot: a `long` occupies a `Long` slot followed by a
/// `LongSecondHalf` slot (and likewise for `double`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackMapEntry {
    offset: u16,
    locals: Vec<VerificationType>,
    stack: Vec<VerificationType>,
}

impl StackMapEntry {
    /// Build an entry from class-file style item lists
    ///
    /// Like the `StackMap` attribute, each `long` or `double` is listed once; the second-half slot
    /// is added here. Listing a second half explicitly is an error.
    pub fn new(
        offset: u16,
        locals: Vec<VerificationType>,
        stack: Vec<VerificationType>,
    ) -> Result<StackMapEntry, Error> {
        Ok(StackMapEntry {
            offset,
            locals: expand_items(offset, locals)?,
            stack: expand_items(offset, stack)?,
        })
    }

    /// Bytecode offset this entry describes
    pub fn offset(&self) -> u16 {
        self.offset
    }

    /// Declared local slots
    pub fn locals(&self) -> &[VerificationType] {
        &self.locals
    }

    /// Declared stack slots (bottom of the stack first)
    pub fn stack(&self) -> &[VerificationType] {
        &self.stack
    }

    /// Does code at this offset still run before `this` has been initialized?
    pub fn mentions_uninitialized_this(&self) -> bool {
        self.locals
            .iter()
            .chain(self.stack.iter())
            .any(|vtype| *vtype == VerificationType::UninitializedThis)
    }
}

fn expand_items(
    offset: u16,
    items: Vec<VerificationType>,
) -> Result<Vec<VerificationType>, Error> {
    let mut slots = Vec::with_capacity(items.len());
    for item in items {
        if item.is_second_half() {
            return Err(Error::MalformedStackMap(offset));
        }
        let second_half = item.second_half();
        slots.push(item);
        slots.extend(second_half);
    }
    Ok(slots)
}

/// Stack map entries of one method, ordered by offset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackMapTable {
    entries: Vec<StackMapEntry>,
}

impl StackMapTable {
    /// Build a table, rejecting offsets that have more than one entry
    pub fn new(mut entries: Vec<StackMapEntry>) -> Result<StackMapTable, Error> {
        entries.sort_by_key(|entry| entry.offset);
        if let Some(pair) = entries.windows(2).find(|pair| pair[0].offset == pair[1].offset) {
            return Err(Error::ConflictingStackMaps(pair[0].offset));
        }
        Ok(StackMapTable { entries })
    }

    /// Table for a method without any control flow joins
    pub fn empty() -> StackMapTable {
        StackMapTable::default()
    }

    /// Find the entry for a bytecode offset
    pub fn get(&self, offset: u16) -> Option<&StackMapEntry> {
        self.entries
            .binary_search_by_key(&offset, |entry| entry.offset)
            .ok()
            .map(|idx| &self.entries[idx])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StackMapEntry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::BinaryName;
    use VerificationType::*;

    #[test]
    fn wide_items_expand() {
        let entry = StackMapEntry::new(4, vec![Long, Integer, Double], vec![Double]).unwrap();
        assert_eq!(
            entry.locals(),
            &[Long, LongSecondHalf, Integer, Double, DoubleSecondHalf]
        );
        assert_eq!(entry.stack(), &[Double, DoubleSecondHalf]);
    }

    #[test]
    fn explicit_second_half_is_malformed() {
        assert!(matches!(
            StackMapEntry::new(9, vec![Long, LongSecondHalf], vec![]),
            Err(Error::MalformedStackMap(9))
        ));
    }

    #[test]
    fn uninitialized_this() {
        let before = StackMapEntry::new(0, vec![UninitializedThis], vec![]).unwrap();
        let after = StackMapEntry::new(
            0,
            vec![VerificationType::object(BinaryName::OBJECT)],
            vec![UninitializedNew(2)],
        )
        .unwrap();
        assert!(before.mentions_uninitialized_this());
        assert!(!after.mentions_uninitialized_this());
    }

    #[test]
    fn lookup_by_offset() {
        let table = StackMapTable::new(vec![
            StackMapEntry::new(20, vec![], vec![]).unwrap(),
            StackMapEntry::new(3, vec![Integer], vec![]).unwrap(),
            StackMapEntry::new(11, vec![], vec![Float]).unwrap(),
        ])
        .unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.get(3).map(|e| e.locals().len()), Some(1));
        assert_eq!(table.get(11).map(|e| e.offset()), Some(11));
        assert!(table.get(12).is_none());
        assert_eq!(
            table.iter().map(|e| e.offset()).collect::<Vec<_>>(),
            vec![3, 11, 20]
        );
    }

    #[test]
    fn conflicting_offsets() {
        let result = StackMapTable::new(vec![
            StackMapEntry::new(7, vec![], vec![]).unwrap(),
            StackMapEntry::new(7, vec![Integer], vec![]).unwrap(),
        ]);
        assert!(matches!(result, Err(Error::ConflictingStackMaps(7))));
    }
}
