//! Query interfaces of the external analyzers
//!
//! Vector-operation histograms, reuse distance and unique-address tallies are
//! computed elsewhere; the reporter only asks for their results. Every
//! interface has a no-op default so a missing analyzer degrades to "no data"
//! rather than an error.

use crate::partitions::{Categorize, NoCategories};
use std::fmt;
use std::io::{self, Write};

/// Median reuse distance meaning "no byte was ever reused"
pub const INFINITE_REUSE_DISTANCE: u64 = u64::MAX;

/// Aggregate vector-operation statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VectorSummary {
    /// Vector operations executed
    pub operations: u64,
    /// Elements across all vector operations
    pub elements: u64,
    /// Bits across all vector elements
    pub bits: u64,
}

pub trait VectorAnalysis: Send + Sync {
    /// Statistics for one partition, or for the whole program when `tag` is `None`
    fn vector_stats(&self, tag: Option<&str>) -> VectorSummary;

    /// Print the vector-operation histogram
    fn report_histogram(&self, max_call_depth: usize, out: &mut dyn Write) -> io::Result<()>;
}

/// Reuse-distance histogram plus the unique bytes it observed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReuseSummary {
    pub histogram: Vec<u64>,
    pub unique_bytes: u64,
}

pub trait ReuseAnalysis: Send + Sync {
    fn reuse_distance(&self) -> ReuseSummary;

    /// Median reuse distance and its mean absolute deviation
    fn median_reuse_distance(&self) -> (u64, u64);
}

pub trait AddressTally: Send + Sync {
    /// Unique addresses touched by `function`, or by the whole program
    fn unique_addresses(&self, function: Option<&str>) -> u64;
}

/// Stand-in for every analyzer when none is linked in
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAnalysis;

impl VectorAnalysis for NoAnalysis {
    fn vector_stats(&self, _tag: Option<&str>) -> VectorSummary {
        VectorSummary::default()
    }

    fn report_histogram(&self, _max_call_depth: usize, _out: &mut dyn Write) -> io::Result<()> {
        Ok(())
    }
}

impl ReuseAnalysis for NoAnalysis {
    fn reuse_distance(&self) -> ReuseSummary {
        ReuseSummary::default()
    }

    fn median_reuse_distance(&self) -> (u64, u64) {
        (INFINITE_REUSE_DISTANCE, 0)
    }
}

impl AddressTally for NoAnalysis {
    fn unique_addresses(&self, _function: Option<&str>) -> u64 {
        0
    }
}

/// The engine's external collaborators, selected once at initialization
pub struct Collaborators {
    pub categorizer: Box<dyn Categorize>,
    pub vectors: Box<dyn VectorAnalysis>,
    pub reuse: Box<dyn ReuseAnalysis>,
    pub addresses: Box<dyn AddressTally>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Collaborators {
            categorizer: Box::new(NoCategories),
            vectors: Box::new(NoAnalysis),
            reuse: Box::new(NoAnalysis),
            addresses: Box::new(NoAnalysis),
        }
    }
}

impl Collaborators {
    pub fn with_categorizer(mut self, categorizer: impl Categorize + 'static) -> Self {
        self.categorizer = Box::new(categorizer);
        self
    }

    pub fn with_vectors(mut self, vectors: impl VectorAnalysis + 'static) -> Self {
        self.vectors = Box::new(vectors);
        self
    }

    pub fn with_reuse(mut self, reuse: impl ReuseAnalysis + 'static) -> Self {
        self.reuse = Box::new(reuse);
        self
    }

    pub fn with_addresses(mut self, addresses: impl AddressTally + 'static) -> Self {
        self.addresses = Box::new(addresses);
        self
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
