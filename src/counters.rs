//! Byte, flop and operation counters
//!
//! A [`CounterSet`] is the fixed-shape aggregate that every level of attribution
//! accumulates into: the open basic block at each call depth, every function,
//! every partition and the global totals.
//!
//! All arithmetic wraps on overflow. A single run is not expected to overflow
//! 64-bit counters, and the hot path must not pay for overflow checks.

use crate::tally::Tally;

/// Number of operand-type buckets tracked for loads and stores
pub const OPERAND_TYPES: usize = 8;

/// Operand type of an instrumented load or store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandType {
    /// Single-precision floating point
    Float,
    /// Double-precision floating point
    Double,
    Int8,
    Int16,
    Int32,
    Int64,
    /// Pointer or address
    Pointer,
    /// Anything else (aggregates, vectors, odd-sized integers)
    Other,
}

impl OperandType {
    /// All operand types in report order
    pub const ALL: [OperandType; OPERAND_TYPES] = [
        OperandType::Float,
        OperandType::Double,
        OperandType::Int8,
        OperandType::Int16,
        OperandType::Int32,
        OperandType::Int64,
        OperandType::Pointer,
        OperandType::Other,
    ];

    /// Bucket index into the per-type counter arrays
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Column-name prefix used by block and function headers (`Flt` in `Flt_LD`)
    pub const fn column_prefix(self) -> &'static str {
        match self {
            OperandType::Float => "Flt",
            OperandType::Double => "Dbl",
            OperandType::Int8 => "I8",
            OperandType::Int16 => "I16",
            OperandType::Int32 => "I32",
            OperandType::Int64 => "I64",
            OperandType::Pointer => "Ptr",
            OperandType::Other => "Other",
        }
    }
}

/// How a basic block ended when its tallies were finalized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlockEnd {
    /// The block has not actually terminated (e.g. flushed before a call)
    #[default]
    NotEnd,
    /// Terminated with an unconditional branch
    Unconditional,
    /// Terminated with a conditional or indirect branch
    Conditional,
}

impl BlockEnd {
    /// Decode the raw value passed by instrumented code (0, 1 or 2)
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(BlockEnd::NotEnd),
            1 => Some(BlockEnd::Unconditional),
            2 => Some(BlockEnd::Conditional),
            _ => None,
        }
    }

    /// True when the block really terminated
    #[inline]
    pub fn is_terminal(self) -> bool {
        self != BlockEnd::NotEnd
    }

    /// Contribution of this end kind to the conditional-branch counter
    #[inline]
    fn cond_brs(self) -> u64 {
        u64::from(self == BlockEnd::Conditional)
    }

    /// Contribution of this end kind to the basic-block counter
    #[inline]
    fn basic_blocks(self) -> u64 {
        u64::from(self.is_terminal())
    }
}

/// The 26 counters tracked per block, function, partition and program
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSet {
    /// Bytes loaded
    pub loads: u64,
    /// Bytes stored
    pub stores: u64,
    /// Load instructions executed
    pub load_ins: u64,
    /// Load instructions by operand type, indexed by [`OperandType::index`]
    pub load_type_ins: [u64; OPERAND_TYPES],
    /// Store instructions executed
    pub store_ins: u64,
    /// Store instructions by operand type, indexed by [`OperandType::index`]
    pub store_type_ins: [u64; OPERAND_TYPES],
    /// Floating-point operations
    pub flops: u64,
    /// Bits consumed or produced by floating-point operations
    pub fp_bits: u64,
    /// Operations of any type
    pub ops: u64,
    /// Bits consumed or produced by any operation
    pub op_bits: u64,
    /// Conditional or indirect branches
    pub cond_brs: u64,
    /// Basic blocks executed
    pub basic_blocks: u64,
}

impl CounterSet {
    /// Create a zeroed counter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a thread's raw scalar tallies, plus the branch and block flags
    /// derived from how the block ended
    #[inline]
    pub fn accumulate_tally(&mut self, tally: &Tally, end: BlockEnd) {
        self.loads = self.loads.wrapping_add(tally.loads);
        self.stores = self.stores.wrapping_add(tally.stores);
        self.load_ins = self.load_ins.wrapping_add(tally.load_ins);
        self.store_ins = self.store_ins.wrapping_add(tally.store_ins);
        add_buckets(&mut self.load_type_ins, &tally.load_type_ins);
        add_buckets(&mut self.store_type_ins, &tally.store_type_ins);
        self.flops = self.flops.wrapping_add(tally.flops);
        self.fp_bits = self.fp_bits.wrapping_add(tally.fp_bits);
        self.ops = self.ops.wrapping_add(tally.ops);
        self.op_bits = self.op_bits.wrapping_add(tally.op_bits);
        self.cond_brs = self.cond_brs.wrapping_add(end.cond_brs());
        self.basic_blocks = self.basic_blocks.wrapping_add(end.basic_blocks());
    }

    /// Add another counter set field by field
    #[inline]
    pub fn accumulate(&mut self, other: &CounterSet) {
        *self = self.combine(other, u64::wrapping_add);
    }

    /// Return `self - other` field by field
    ///
    /// Only meaningful when every field of `self` is at least the matching
    /// field of `other`; the caller guarantees that counters only grew.
    pub fn difference(&self, other: &CounterSet) -> CounterSet {
        self.combine(other, u64::wrapping_sub)
    }

    /// Zero every counter
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// True when every counter is zero
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    /// Bytes loaded plus bytes stored
    pub fn total_bytes(&self) -> u64 {
        self.loads.wrapping_add(self.stores)
    }

    /// Load plus store instructions
    pub fn memory_ops(&self) -> u64 {
        self.load_ins.wrapping_add(self.store_ins)
    }

    /// Load instructions of one operand type
    pub fn loads_of(&self, ty: OperandType) -> u64 {
        self.load_type_ins[ty.index()]
    }

    /// Store instructions of one operand type
    pub fn stores_of(&self, ty: OperandType) -> u64 {
        self.store_type_ins[ty.index()]
    }

    fn combine(&self, other: &CounterSet, op: fn(u64, u64) -> u64) -> CounterSet {
        CounterSet {
            loads: op(self.loads, other.loads),
            stores: op(self.stores, other.stores),
            load_ins: op(self.load_ins, other.load_ins),
            load_type_ins: std::array::from_fn(|i| {
                op(self.load_type_ins[i], other.load_type_ins[i])
            }),
            store_ins: op(self.store_ins, other.store_ins),
            store_type_ins: std::array::from_fn(|i| {
                op(self.store_type_ins[i], other.store_type_ins[i])
            }),
            flops: op(self.flops, other.flops),
            fp_bits: op(self.fp_bits, other.fp_bits),
            ops: op(self.ops, other.ops),
            op_bits: op(self.op_bits, other.op_bits),
            cond_brs: op(self.cond_brs, other.cond_brs),
            basic_blocks: op(self.basic_blocks, other.basic_blocks),
        }
    }
}

#[inline]
pub(crate) fn add_buckets(into: &mut [u64; OPERAND_TYPES], from: &[u64; OPERAND_TYPES]) {
    for (dst, src) in into.iter_mut().zip(from) {
        *dst = dst.wrapping_add(*src);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tally() -> Tally {
        let mut tally = Tally::default();
        tally.record_load(8, OperandType::Double);
        tally.record_load(4, OperandType::Int32);
        tally.record_store(8, OperandType::Double);
        tally.record_flops(2, 128);
        tally.record_ops(3, 160);
        tally
    }

    #[test]
    fn test_counter_set_starts_zeroed() {
        let counters = CounterSet::new();
        assert!(counters.is_zero());
        assert_eq!(counters.total_bytes(), 0);
    }

    #[test]
    fn test_accumulate_tally_not_end() {
        let mut counters = CounterSet::new();
        counters.accumulate_tally(&sample_tally(), BlockEnd::NotEnd);

        assert_eq!(counters.loads, 12);
        assert_eq!(counters.stores, 8);
        assert_eq!(counters.load_ins, 2);
        assert_eq!(counters.store_ins, 1);
        assert_eq!(counters.loads_of(OperandType::Double), 1);
        assert_eq!(counters.loads_of(OperandType::Int32), 1);
        assert_eq!(counters.stores_of(OperandType::Double), 1);
        assert_eq!(counters.flops, 2);
        assert_eq!(counters.fp_bits, 128);
        assert_eq!(counters.ops, 3);
        assert_eq!(counters.op_bits, 160);
        assert_eq!(counters.cond_brs, 0);
        assert_eq!(counters.basic_blocks, 0);
    }

    #[test]
    fn test_accumulate_tally_block_end_flags() {
        let mut counters = CounterSet::new();
        let tally = Tally::default();

        counters.accumulate_tally(&tally, BlockEnd::Unconditional);
        assert_eq!(counters.basic_blocks, 1);
        assert_eq!(counters.cond_brs, 0);

        counters.accumulate_tally(&tally, BlockEnd::Conditional);
        assert_eq!(counters.basic_blocks, 2);
        assert_eq!(counters.cond_brs, 1);
    }

    #[test]
    fn test_accumulate_then_difference_restores_original() {
        let mut a = CounterSet::new();
        a.accumulate_tally(&sample_tally(), BlockEnd::Conditional);
        let mut b = CounterSet::new();
        b.accumulate_tally(&sample_tally(), BlockEnd::Unconditional);
        b.accumulate_tally(&sample_tally(), BlockEnd::NotEnd);

        let original = a;
        a.accumulate(&b);
        assert_eq!(a.difference(&b), original);
    }

    #[test]
    fn test_reset_zeroes_everything() {
        let mut counters = CounterSet::new();
        counters.accumulate_tally(&sample_tally(), BlockEnd::Conditional);
        assert!(!counters.is_zero());

        counters.reset();
        assert!(counters.is_zero());
    }

    #[test]
    fn test_accumulate_wraps_instead_of_panicking() {
        let mut a = CounterSet {
            loads: u64::MAX,
            ..CounterSet::default()
        };
        let b = CounterSet {
            loads: 2,
            ..CounterSet::default()
        };
        a.accumulate(&b);
        assert_eq!(a.loads, 1);
    }

    #[test]
    fn test_block_end_from_raw() {
        assert_eq!(BlockEnd::from_raw(0), Some(BlockEnd::NotEnd));
        assert_eq!(BlockEnd::from_raw(1), Some(BlockEnd::Unconditional));
        assert_eq!(BlockEnd::from_raw(2), Some(BlockEnd::Conditional));
        assert_eq!(BlockEnd::from_raw(3), None);
    }

    #[test]
    fn test_operand_type_indices_are_dense() {
        for (i, ty) in OperandType::ALL.iter().enumerate() {
            assert_eq!(ty.index(), i);
        }
    }
}
