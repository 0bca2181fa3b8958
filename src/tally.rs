//! Per-thread scalar tallies
//!
//! Instrumented code bumps these counters inline at every load, store, flop
//! and operation. Nothing here is shared between threads, so the increments
//! are plain additions. At basic-block boundaries the owning thread moves the
//! values into the top frame of its block stack and the tally starts again
//! from zero.

use crate::counters::{add_buckets, OperandType, OPERAND_TYPES};

/// Raw scalar counters owned by one executing thread
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub loads: u64,
    pub stores: u64,
    pub load_ins: u64,
    pub load_type_ins: [u64; OPERAND_TYPES],
    pub store_ins: u64,
    pub store_type_ins: [u64; OPERAND_TYPES],
    pub flops: u64,
    pub fp_bits: u64,
    pub ops: u64,
    pub op_bits: u64,
}

impl Tally {
    /// Record one load instruction moving `bytes` bytes
    #[inline(always)]
    pub fn record_load(&mut self, bytes: u64, ty: OperandType) {
        self.loads = self.loads.wrapping_add(bytes);
        self.load_ins = self.load_ins.wrapping_add(1);
        let bucket = &mut self.load_type_ins[ty.index()];
        *bucket = bucket.wrapping_add(1);
    }

    /// Record one store instruction moving `bytes` bytes
    #[inline(always)]
    pub fn record_store(&mut self, bytes: u64, ty: OperandType) {
        self.stores = self.stores.wrapping_add(bytes);
        self.store_ins = self.store_ins.wrapping_add(1);
        let bucket = &mut self.store_type_ins[ty.index()];
        *bucket = bucket.wrapping_add(1);
    }

    /// Record `count` floating-point operations touching `bits` bits in total
    #[inline(always)]
    pub fn record_flops(&mut self, count: u64, bits: u64) {
        self.flops = self.flops.wrapping_add(count);
        self.fp_bits = self.fp_bits.wrapping_add(bits);
    }

    /// Record `count` generic operations touching `bits` bits in total
    #[inline(always)]
    pub fn record_ops(&mut self, count: u64, bits: u64) {
        self.ops = self.ops.wrapping_add(count);
        self.op_bits = self.op_bits.wrapping_add(bits);
    }

    /// Move the current values out, leaving the tally zeroed
    #[inline]
    pub fn take(&mut self) -> Tally {
        std::mem::take(self)
    }

    /// Zero the tally without reporting it anywhere
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Add another tally into this one (used to park tallies of exited threads)
    pub fn merge(&mut self, other: &Tally) {
        self.record_flops(other.flops, other.fp_bits);
        self.record_ops(other.ops, other.op_bits);
        self.loads = self.loads.wrapping_add(other.loads);
        self.stores = self.stores.wrapping_add(other.stores);
        self.load_ins = self.load_ins.wrapping_add(other.load_ins);
        self.store_ins = self.store_ins.wrapping_add(other.store_ins);
        add_buckets(&mut self.load_type_ins, &other.load_type_ins);
        add_buckets(&mut self.store_type_ins, &other.store_type_ins);
    }

    /// True when nothing has been tallied since the last flush
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}
