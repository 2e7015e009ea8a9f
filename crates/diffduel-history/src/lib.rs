//! Git history access: commit traversal and per-file diff invocation.
//!
//! [`mining`] enumerates commits with git2 and lists the files each one
//! touched. [`invoker`] runs one diff algorithm for one file between two
//! revisions behind the [`invoker::DiffProvider`] trait, so the comparison
//! engine never talks to git directly.

pub mod invoker;
pub mod mining;
