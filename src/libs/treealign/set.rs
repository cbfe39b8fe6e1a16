//! Subsets of a sibling list as `u32` bit masks.
//!
//! Bit `i` stands for the `i`-th child, so a vertex may have at most
//! [`MAX_DEGREE`] children. A [`ChildSet`] remembers the list it indexes
//! into; combining sets over different lists is an error.

use super::error::AlignError;

/// Largest sibling count a mask can address.
pub const MAX_DEGREE: usize = 31;

/// Mask with the lowest `n` bits set.
///
/// ```
/// assert_eq!(ftalign::libs::treealign::set_of(5), 31);
/// assert_eq!(ftalign::libs::treealign::set_of(0), 0);
/// ```
pub fn set_of(n: usize) -> u32 {
    if n >= 32 {
        u32::MAX
    } else {
        (1u32 << n) - 1
    }
}

pub fn check_degree(degree: usize, limit: usize) -> Result<(), AlignError> {
    if degree > limit {
        Err(AlignError::DegreeOverflow { degree, limit })
    } else {
        Ok(())
    }
}

/// Indices of the bits of `mask`, lowest first.
pub fn bits_of(mask: u32) -> impl Iterator<Item = usize> {
    let mut rest = mask;
    std::iter::from_fn(move || {
        if rest == 0 {
            None
        } else {
            let i = rest.trailing_zeros() as usize;
            rest &= rest - 1;
            Some(i)
        }
    })
}

/// All subsets of `mask`, from `mask` itself down to the empty set.
pub fn subsets_of(mask: u32) -> impl Iterator<Item = u32> {
    let mut next = Some(mask);
    std::iter::from_fn(move || {
        let current = next?;
        next = if current == 0 {
            None
        } else {
            Some((current - 1) & mask)
        };
        Some(current)
    })
}

#[derive(Debug)]
pub struct ChildSet<'a, T> {
    bits: u32,
    basis: &'a [T],
}

impl<'a, T> Clone for ChildSet<'a, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T> Copy for ChildSet<'a, T> {}

impl<'a, T> ChildSet<'a, T> {
    /// The set holding every element of `basis`.
    pub fn of(basis: &'a [T]) -> Result<Self, AlignError> {
        check_degree(basis.len(), MAX_DEGREE)?;
        Ok(Self {
            bits: set_of(basis.len()),
            basis,
        })
    }

    pub fn empty(basis: &'a [T]) -> Self {
        Self { bits: 0, basis }
    }

    /// Bits beyond the length of `basis` are dropped.
    pub fn from_bits(basis: &'a [T], bits: u32) -> Self {
        Self {
            bits: bits & set_of(basis.len()),
            basis,
        }
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    pub fn basis(&self) -> &'a [T] {
        self.basis
    }

    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    pub fn contains(&self, index: usize) -> bool {
        index < 32 && self.bits & (1 << index) != 0
    }

    pub fn with(self, index: usize) -> Self {
        Self::from_bits(self.basis, self.bits | (1u32 << index.min(31)))
    }

    pub fn without(self, index: usize) -> Self {
        if index >= 32 {
            return self;
        }
        Self {
            bits: self.bits & !(1u32 << index),
            basis: self.basis,
        }
    }

    pub fn complement(self) -> Self {
        Self::from_bits(self.basis, !self.bits)
    }

    pub fn union(self, other: Self) -> Result<Self, AlignError> {
        self.check(&other)?;
        Ok(Self::from_bits(self.basis, self.bits | other.bits))
    }

    pub fn intersection(self, other: Self) -> Result<Self, AlignError> {
        self.check(&other)?;
        Ok(Self::from_bits(self.basis, self.bits & other.bits))
    }

    pub fn difference(self, other: Self) -> Result<Self, AlignError> {
        self.check(&other)?;
        Ok(Self::from_bits(self.basis, self.bits & !other.bits))
    }

    /// Positions of the members, ascending.
    pub fn indices(&self) -> impl Iterator<Item = usize> {
        bits_of(self.bits)
    }

    /// Members in ascending bit order.
    pub fn as_list(&self) -> Vec<&'a T> {
        let basis = self.basis;
        self.indices().map(|i| &basis[i]).collect()
    }

    fn check(&self, other: &Self) -> Result<(), AlignError> {
        if std::ptr::eq(self.basis, other.basis) {
            Ok(())
        } else {
            Err(AlignError::IncompatibleSets)
        }
    }
}

impl<'a, T> PartialEq for ChildSet<'a, T> {
    fn eq(&self, other: &Self) -> bool {
        self.bits == other.bits && std::ptr::eq(self.basis, other.basis)
    }
}

/// Precomputed subset lists for every mask up to some maximum.
///
/// `table.subsets(m)` lists every subset of `m`, the empty set first and `m`
/// itself last. The dense solver partitions remaining children with it.
#[derive(Debug, Clone, Default)]
pub struct SubsetTable {
    table: Vec<Vec<u32>>,
}

impl SubsetTable {
    pub fn until(max_mask: u32) -> Self {
        let table = (0..=max_mask)
            .map(|mask| {
                let mut subs: Vec<u32> = subsets_of(mask).collect();
                subs.reverse();
                subs
            })
            .collect();
        Self { table }
    }

    pub fn subsets(&self, mask: u32) -> &[u32] {
        &self.table[mask as usize]
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_of() {
        let list = vec!['a', 'b', 'c', 'd', 'e'];
        let set = ChildSet::of(&list).unwrap();
        assert_eq!(set.bits(), 31);
        assert_eq!(set.len(), 5);
        assert_eq!(set_of(5), 31);
    }

    #[test]
    fn test_with_without() {
        let list = vec!['a', 'b', 'c', 'd', 'e'];
        let set = ChildSet::empty(&list).with(1).with(3);
        assert_eq!(set.as_list(), vec![&'b', &'d']);
        assert!(set.contains(3));

        let full = ChildSet::of(&list).unwrap();
        let trimmed = full.without(0).without(4);
        assert_eq!(trimmed.as_list(), vec![&'b', &'c', &'d']);
        assert_eq!(trimmed.with(0).with(4), full);
    }

    #[test]
    fn test_set_algebra() {
        let list = vec![1, 2, 3, 4];
        let a = ChildSet::from_bits(&list, 0b0011);
        let b = ChildSet::from_bits(&list, 0b0110);

        assert_eq!(a.union(b).unwrap().bits(), 0b0111);
        assert_eq!(a.intersection(b).unwrap().bits(), 0b0010);
        assert_eq!(a.difference(b).unwrap().bits(), 0b0001);
        assert_eq!(a.complement().bits(), 0b1100);
        assert_eq!(a.complement().as_list(), vec![&3, &4]);
    }

    #[test]
    fn test_incompatible_sets() {
        let left = vec![1, 2, 3];
        let right = vec![1, 2, 3];
        let a = ChildSet::of(&left).unwrap();
        let b = ChildSet::of(&right).unwrap();

        assert_eq!(a.union(b), Err(AlignError::IncompatibleSets));
        assert_eq!(a.intersection(b), Err(AlignError::IncompatibleSets));
        assert_eq!(a.difference(b), Err(AlignError::IncompatibleSets));
    }

    #[test]
    fn test_degree_overflow() {
        let list = vec![0u8; 32];
        assert!(matches!(
            ChildSet::of(&list),
            Err(AlignError::DegreeOverflow { degree: 32, .. })
        ));
    }

    #[test]
    fn test_subset_enumeration() {
        let subs: Vec<u32> = subsets_of(0b101).collect();
        assert_eq!(subs, vec![0b101, 0b100, 0b001, 0]);

        let table = SubsetTable::until(7);
        assert_eq!(table.len(), 8);
        assert_eq!(table.subsets(0), &[0]);
        assert_eq!(table.subsets(0b101), &[0, 0b001, 0b100, 0b101]);
        assert_eq!(table.subsets(7).len(), 8);
    }

    #[test]
    fn test_bits_of() {
        assert_eq!(bits_of(0b10110).collect::<Vec<_>>(), vec![1, 2, 4]);
        assert_eq!(bits_of(0).count(), 0);
    }
}
