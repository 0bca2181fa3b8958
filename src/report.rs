//! Text reports
//!
//! Every line starts with a tag naming its kind so the output can be mixed
//! into a program's own stdout and filtered later:
//!
//! - `BYFL_BB_HEADER` / `BYFL_BB`: decimated samples of the global totals
//! - `BYFL_FUNC_HEADER` / `BYFL_FUNC`: per-function totals
//! - `BYFL_CALLEE_HEADER` / `BYFL_CALLEE`: call tallies per callee
//! - `BYFL_SUMMARY` / `BYFL_SUMMARY(tag)`: global and per-partition summaries
//!
//! Sample and function rows are plain right-aligned integers. Summary values
//! carry thousands separators.

use crate::analysis::{Collaborators, INFINITE_REUSE_DISTANCE};
use crate::config::EngineConfig;
use crate::counters::{CounterSet, OperandType};
use crate::functions::FunctionTable;
use crate::symbols::SymbolTable;
use std::io::{self, Write};
use thousands::Separable;

/// Width of block and function columns
pub const COLUMN_WIDTH: usize = 20;

/// Width of the value column in summaries
pub const SUMMARY_WIDTH: usize = 25;

/// Rule between summary sections
pub const SEPARATOR: &str = "-----------------------------------------------------------------";

const BB_HEADER_TAG: &str = "BYFL_BB_HEADER: ";
const BB_TAG: &str = "BYFL_BB:        ";
const FUNC_HEADER_TAG: &str = "BYFL_FUNC_HEADER: ";
const FUNC_TAG: &str = "BYFL_FUNC:        ";
const SUMMARY_TAG: &str = "BYFL_SUMMARY";

/// Column names of the counter fields selected by `config`
pub fn counter_column_names(config: &EngineConfig) -> Vec<String> {
    let mut names: Vec<String> = ["Bytes_LD", "Bytes_ST", "Ops_LD", "Ops_ST", "Flops", "FP_bits"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    if config.reports_all_ops() {
        names.push("Int_Ops".to_string());
        names.push("Int_Op_bits".to_string());
        if config.types {
            for ty in OperandType::ALL {
                names.push(format!("{}_LD", ty.column_prefix()));
            }
            for ty in OperandType::ALL {
                names.push(format!("{}_ST", ty.column_prefix()));
            }
        }
    }
    names
}

/// Counter values in the order of [`counter_column_names`]
pub fn counter_columns(config: &EngineConfig, counters: &CounterSet) -> Vec<u64> {
    let mut values = vec![
        counters.loads,
        counters.stores,
        counters.load_ins,
        counters.store_ins,
        counters.flops,
        counters.fp_bits,
    ];
    if config.reports_all_ops() {
        values.push(counters.ops);
        values.push(counters.op_bits);
        if config.types {
            values.extend_from_slice(&counters.load_type_ins);
            values.extend_from_slice(&counters.store_type_ins);
        }
    }
    values
}

fn write_columns<T: std::fmt::Display>(out: &mut dyn Write, columns: &[T]) -> io::Result<()> {
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            out.write_all(b" ")?;
        }
        write!(out, "{column:>COLUMN_WIDTH$}")?;
    }
    Ok(())
}

/// Formats every report section for one engine configuration
pub struct Reporter<'a> {
    config: &'a EngineConfig,
    collaborators: &'a Collaborators,
}

impl<'a> Reporter<'a> {
    pub fn new(config: &'a EngineConfig, collaborators: &'a Collaborators) -> Self {
        Reporter {
            config,
            collaborators,
        }
    }

    pub fn block_header(&self, out: &mut dyn Write) -> io::Result<()> {
        out.write_all(BB_HEADER_TAG.as_bytes())?;
        write_columns(out, &counter_column_names(self.config))?;
        out.write_all(b"\n")
    }

    /// One decimated sample
    pub fn block_sample(&self, out: &mut dyn Write, delta: &CounterSet) -> io::Result<()> {
        out.write_all(BB_TAG.as_bytes())?;
        write_columns(out, &counter_columns(self.config, delta))?;
        out.write_all(b"\n")
    }

    /// Per-function totals sorted by attribution key
    pub fn functions(
        &self,
        out: &mut dyn Write,
        functions: &FunctionTable,
        symbols: &SymbolTable,
        max_call_depth: usize,
    ) -> io::Result<()> {
        out.write_all(FUNC_HEADER_TAG.as_bytes())?;
        let mut names = counter_column_names(self.config);
        if self.config.unique_bytes {
            names.push("Uniq_bytes".to_string());
        }
        names.push("Cond_brs".to_string());
        names.push("Invocations".to_string());
        write_columns(out, &names)?;
        out.write_all(b" Function")?;
        if self.config.call_stack {
            for depth in 1..max_call_depth {
                write!(out, " Parent_func_{depth}")?;
            }
        }
        out.write_all(b"\n")?;

        for (key, record) in functions.sorted_records(symbols) {
            let mut values = counter_columns(self.config, &record.counters);
            if self.config.unique_bytes {
                values.push(self.collaborators.addresses.unique_addresses(Some(key)));
            }
            values.push(record.counters.cond_brs);
            values.push(record.invocations);

            out.write_all(FUNC_TAG.as_bytes())?;
            write_columns(out, &values)?;
            writeln!(out, " {key}")?;
        }
        Ok(())
    }

    /// Call tallies of every called function, instrumented or not
    pub fn callees(
        &self,
        out: &mut dyn Write,
        functions: &FunctionTable,
        symbols: &SymbolTable,
    ) -> io::Result<()> {
        writeln!(out, "BYFL_CALLEE_HEADER: {:>13} Byfl Function", "Invocations")?;
        for row in functions.sorted_callees(symbols) {
            let instrumented = if row.instrumented { "Yes " } else { "No  " };
            writeln!(
                out,
                "BYFL_CALLEE: {:>COLUMN_WIDTH$} {} {}",
                row.calls, instrumented, row.name
            )?;
        }
        Ok(())
    }

    /// Summary with derived ratios for one partition, or the whole program
    pub fn summary(
        &self,
        out: &mut dyn Write,
        partition: Option<&str>,
        totals: &CounterSet,
    ) -> io::Result<()> {
        let config = self.config;
        let global = partition.is_none();
        let reuse = self.collaborators.reuse.reuse_distance();
        let unique_bytes = if reuse.unique_bytes > 0 {
            reuse.unique_bytes
        } else if config.unique_bytes && global {
            self.collaborators.addresses.unique_addresses(None)
        } else {
            0
        };
        let bytes = totals.total_bytes();
        let mem_ops = totals.memory_ops();

        let tag = match partition {
            Some(name) => format!("{SUMMARY_TAG}({name})"),
            None => SUMMARY_TAG.to_string(),
        };
        let mut w = SummaryWriter { out, tag: &tag };

        w.separator()?;
        if totals.cond_brs > 0 {
            w.count(totals.basic_blocks, "basic blocks")?;
            w.count(totals.cond_brs, "conditional or indirect branches")?;
            w.separator()?;
        }

        // Bytes and operations
        w.count(
            bytes,
            &format!(
                "bytes ({} loaded + {} stored)",
                totals.loads.separate_with_commas(),
                totals.stores.separate_with_commas()
            ),
        )?;
        if config.unique_bytes && global {
            w.count(unique_bytes, "unique bytes")?;
        }
        w.count(totals.flops, "flops")?;
        if config.reports_all_ops() {
            w.count(totals.ops, "integer ops")?;
            w.count(
                mem_ops,
                &format!(
                    "memory ops ({} loads + {} stores)",
                    totals.load_ins.separate_with_commas(),
                    totals.store_ins.separate_with_commas()
                ),
            )?;
            if config.types {
                self.type_breakdown(&mut w, totals)?;
            }
        }
        if reuse.unique_bytes > 0 {
            let (median, deviation) = self.collaborators.reuse.median_reuse_distance();
            if median == INFINITE_REUSE_DISTANCE {
                w.text("infinite", "median reuse distance")?;
            } else {
                w.count(
                    median,
                    &format!(
                        "median reuse distance (+/- {})",
                        deviation.separate_with_commas()
                    ),
                )?;
            }
        }
        w.separator()?;

        // Bits and bit operations
        w.count(
            bytes.wrapping_mul(8),
            &format!(
                "bits ({} loaded + {} stored)",
                totals.loads.wrapping_mul(8).separate_with_commas(),
                totals.stores.wrapping_mul(8).separate_with_commas()
            ),
        )?;
        if config.unique_bytes && global {
            w.count(unique_bytes.wrapping_mul(8), "unique bits")?;
        }
        w.count(totals.fp_bits, "flop bits")?;
        if config.reports_all_ops() {
            w.count(totals.op_bits, "integer op bits")?;
        }
        w.separator()?;

        // Vector operations
        let mut vector_ops = 0;
        if config.vectors {
            let vectors = self.collaborators.vectors.vector_stats(partition);
            vector_ops = vectors.operations;
            w.count(vectors.operations, "vector operations")?;
            w.ratio(vectors.elements, vectors.operations, "elements per vector")?;
            w.ratio(vectors.bits, vectors.operations, "bits per element")?;
            w.separator()?;
        }

        // Derived ratios
        w.ratio(totals.loads, totals.stores, "bytes loaded per byte stored")?;
        if config.reports_all_ops() {
            w.ratio(totals.ops, totals.load_ins, "integer ops per load instruction")?;
            w.ratio(
                bytes.wrapping_mul(8),
                mem_ops,
                "bits loaded/stored per memory op",
            )?;
        }
        if totals.cond_brs > 0 {
            if totals.flops > 0 {
                w.ratio(
                    totals.flops,
                    totals.cond_brs,
                    "flops per conditional/indirect branch",
                )?;
            }
            if totals.ops > 0 {
                w.ratio(
                    totals.ops,
                    totals.cond_brs,
                    "ops per conditional/indirect branch",
                )?;
            }
            if vector_ops > 0 {
                w.ratio(
                    vector_ops,
                    totals.cond_brs,
                    "vector ops per conditional/indirect branch",
                )?;
            }
        }
        if vector_ops > 0 {
            w.ratio(
                vector_ops,
                totals.flops,
                "vector operations (FP & int) per flop",
            )?;
            w.ratio(vector_ops, totals.ops, "vector operations per integer op")?;
        }
        w.separator()?;
        w.ratio(bytes, totals.flops, "bytes per flop")?;
        if totals.flops > 0 {
            w.ratio(bytes.wrapping_mul(8), totals.fp_bits, "bits per flop bit")?;
        }
        w.ratio(bytes, totals.ops, "bytes per integer op")?;
        if totals.ops > 0 {
            w.ratio(bytes.wrapping_mul(8), totals.op_bits, "bits per integer op bit")?;
        }
        if config.unique_bytes && (totals.flops > 0 || totals.ops > 0) {
            w.separator()?;
            w.ratio(unique_bytes, totals.flops, "unique bytes per flop")?;
            if totals.flops > 0 {
                w.ratio(
                    unique_bytes.wrapping_mul(8),
                    totals.fp_bits,
                    "unique bits per flop bit",
                )?;
            }
            w.ratio(unique_bytes, totals.ops, "unique bytes per integer op")?;
            if totals.ops > 0 {
                w.ratio(
                    unique_bytes.wrapping_mul(8),
                    totals.op_bits,
                    "unique bits per integer op bit",
                )?;
            }
        }
        if config.unique_bytes && global {
            w.ratio(bytes, unique_bytes, "bytes per unique byte")?;
        }
        w.separator()
    }

    fn type_breakdown(&self, w: &mut SummaryWriter<'_>, totals: &CounterSet) -> io::Result<()> {
        const LOADS: [&str; 8] = [
            "single-precision floating point loads",
            "double-precision floating point loads",
            " 8-bit integer loads",
            "16-bit integer loads",
            "32-bit integer loads",
            "64-bit integer loads",
            "pointer/address loads",
            "loads of other types",
        ];
        const STORES: [&str; 8] = [
            "single-precision floating point stores",
            "double-precision floating point stores",
            " 8-bit integer stores",
            "16-bit integer stores",
            "32-bit integer stores",
            "64-bit integer stores",
            "pointer/address stores",
            "stores of other types",
        ];

        w.separator()?;
        for ty in OperandType::ALL {
            w.count(totals.loads_of(ty), LOADS[ty.index()])?;
        }
        w.separator()?;
        for ty in OperandType::ALL {
            w.count(totals.stores_of(ty), STORES[ty.index()])?;
        }
        Ok(())
    }
}

/// Writes tagged summary lines
struct SummaryWriter<'a> {
    out: &'a mut dyn Write,
    tag: &'a str,
}

impl SummaryWriter<'_> {
    fn separator(&mut self) -> io::Result<()> {
        writeln!(self.out, "{}: {SEPARATOR}", self.tag)
    }

    fn text(&mut self, value: &str, label: &str) -> io::Result<()> {
        writeln!(self.out, "{}: {value:>SUMMARY_WIDTH$} {label}", self.tag)
    }

    fn count(&mut self, value: u64, label: &str) -> io::Result<()> {
        self.text(&value.separate_with_commas(), label)
    }

    /// `numerator / denominator` to four places, skipped for a zero denominator
    fn ratio(&mut self, numerator: u64, denominator: u64, label: &str) -> io::Result<()> {
        if denominator == 0 {
            return Ok(());
        }
        let value = numerator as f64 / denominator as f64;
        self.text(&format!("{value:.4}").separate_with_commas(), label)
    }
}
