// SPDX-License-Identifier: MIT OR Apache-2.0
//! Typed test bindings and the append-only registry the compiler reads.
//!
//! Registration happens during single-threaded startup, before compilation;
//! the registry is read-only afterwards, so lookups during compilation need
//! no synchronization. A [`Registry`] is an explicit object handed to the
//! compiler — there is no ambient global store.

#![deny(unsafe_code)]

use std::collections::BTreeMap;
use tmx_core::{IndependentTestFn, PairTestFn, SingleTestFn};

/// One test function applied to every fixture of a category.
#[derive(Debug, Clone)]
pub struct SingleBinding {
    /// The registered function.
    pub function: SingleTestFn,
}

/// One test function applied to every (fixture1, fixture2) cross product of
/// two categories.
#[derive(Debug, Clone)]
pub struct PairBinding {
    /// Second category name.
    pub partner: String,
    /// The registered function.
    pub function: PairTestFn,
}

/// A single binding restricted to a pattern-selected fixture subset.
#[derive(Debug, Clone)]
pub struct SubsetSingleBinding {
    /// The registered function.
    pub function: SingleTestFn,
    /// Selection pattern over the category's fixture names.
    pub which: String,
}

/// A pair binding restricted to pattern-selected subsets on both sides.
#[derive(Debug, Clone)]
pub struct SubsetPairBinding {
    /// Second category name.
    pub partner: String,
    /// The registered function.
    pub function: PairTestFn,
    /// Selection pattern over the first category.
    pub which1: String,
    /// Selection pattern over the second category.
    pub which2: String,
}

/// A test function bound to no category at all.
#[derive(Debug, Clone)]
pub struct IndependentBinding {
    /// The registered function.
    pub function: IndependentTestFn,
}

/// Append-only store of declared test bindings, keyed by (first) category
/// name. Lookups return bindings in registration order.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    singles: BTreeMap<String, Vec<SingleBinding>>,
    pairs: BTreeMap<String, Vec<PairBinding>>,
    subset_singles: BTreeMap<String, Vec<SubsetSingleBinding>>,
    subset_pairs: BTreeMap<String, Vec<SubsetPairBinding>>,
    independent: Vec<IndependentBinding>,
}

impl Registry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `function` to every fixture of `category`.
    pub fn register_single(&mut self, category: impl Into<String>, function: SingleTestFn) {
        self.singles
            .entry(category.into())
            .or_default()
            .push(SingleBinding { function });
    }

    /// Bind `function` to the full `category1` × `category2` cross product.
    pub fn register_pair(
        &mut self,
        category1: impl Into<String>,
        category2: impl Into<String>,
        function: PairTestFn,
    ) {
        self.pairs.entry(category1.into()).or_default().push(PairBinding {
            partner: category2.into(),
            function,
        });
    }

    /// Bind `function` to the fixtures of `category` selected by `which`.
    pub fn register_subset_single(
        &mut self,
        category: impl Into<String>,
        which: impl Into<String>,
        function: SingleTestFn,
    ) {
        self.subset_singles
            .entry(category.into())
            .or_default()
            .push(SubsetSingleBinding { function, which: which.into() });
    }

    /// Bind `function` to the cross product of the subsets selected by
    /// `which1` and `which2`.
    pub fn register_subset_pair(
        &mut self,
        category1: impl Into<String>,
        category2: impl Into<String>,
        which1: impl Into<String>,
        which2: impl Into<String>,
        function: PairTestFn,
    ) {
        self.subset_pairs
            .entry(category1.into())
            .or_default()
            .push(SubsetPairBinding {
                partner: category2.into(),
                function,
                which1: which1.into(),
                which2: which2.into(),
            });
    }

    /// Register a category-less function, compiled into one job with no
    /// fixture dependencies.
    pub fn register_independent(&mut self, function: IndependentTestFn) {
        self.independent.push(IndependentBinding { function });
    }

    /// Single bindings for `category`, in registration order.
    pub fn singles_for(&self, category: &str) -> &[SingleBinding] {
        self.singles.get(category).map_or(&[], Vec::as_slice)
    }

    /// Pair bindings whose first category is `category`.
    pub fn pairs_for(&self, category: &str) -> &[PairBinding] {
        self.pairs.get(category).map_or(&[], Vec::as_slice)
    }

    /// Subset-single bindings for `category`.
    pub fn subset_singles_for(&self, category: &str) -> &[SubsetSingleBinding] {
        self.subset_singles.get(category).map_or(&[], Vec::as_slice)
    }

    /// Subset-pair bindings whose first category is `category`.
    pub fn subset_pairs_for(&self, category: &str) -> &[SubsetPairBinding] {
        self.subset_pairs.get(category).map_or(&[], Vec::as_slice)
    }

    /// Category-less bindings, in registration order.
    pub fn independent(&self) -> &[IndependentBinding] {
        &self.independent
    }

    /// `true` if any binding (of any kind) names `category` first.
    pub fn has_bindings_for(&self, category: &str) -> bool {
        !self.singles_for(category).is_empty()
            || !self.pairs_for(category).is_empty()
            || !self.subset_singles_for(category).is_empty()
            || !self.subset_pairs_for(category).is_empty()
    }
}
