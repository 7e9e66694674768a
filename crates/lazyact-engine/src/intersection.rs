//! Viewport intersection primitive
//!
//! Stand-in for the host's native intersection observer: observes a set of
//! nodes and reports the ones whose intersecting state changed since the last
//! check.

use std::str::FromStr;

use lazyact_dom::{DOMRect, DomTree, NodeId};

use crate::{EngineError, EngineResult};

/// Margin length
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Length {
    Px(f64),
    /// Percentage of the viewport size along the same axis
    Percent(f64),
}

impl Length {
    fn parse(s: &str) -> Option<Self> {
        if let Some(px) = s.strip_suffix("px") {
            px.parse().ok().map(Length::Px)
        } else if let Some(pct) = s.strip_suffix('%') {
            pct.parse().ok().map(Length::Percent)
        } else if s.parse::<f64>().ok() == Some(0.0) {
            Some(Length::Px(0.0))
        } else {
            None
        }
    }

    fn resolve(self, basis: f64) -> f64 {
        match self {
            Length::Px(px) => px,
            Length::Percent(pct) => basis * pct / 100.0,
        }
    }
}

/// CSS-style margin shorthand (top, right, bottom, left) grown around the viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootMargin {
    pub top: Length,
    pub right: Length,
    pub bottom: Length,
    pub left: Length,
}

impl RootMargin {
    pub const ZERO: RootMargin = RootMargin::uniform(Length::Px(0.0));

    pub const fn uniform(length: Length) -> Self {
        Self {
            top: length,
            right: length,
            bottom: length,
            left: length,
        }
    }

    /// Parse `"300px 100px"` style shorthand (1 to 4 lengths)
    pub fn parse(margin: &str) -> EngineResult<Self> {
        let invalid = || EngineError::RootMargin(margin.to_string());
        let lengths = margin
            .split_whitespace()
            .map(|part| Length::parse(part).ok_or_else(invalid))
            .collect::<EngineResult<Vec<_>>>()?;

        let [top, right, bottom, left] = match lengths.as_slice() {
            [all] => [*all; 4],
            [vertical, horizontal] => [*vertical, *horizontal, *vertical, *horizontal],
            [top, horizontal, bottom] => [*top, *horizontal, *bottom, *horizontal],
            [top, right, bottom, left] => [*top, *right, *bottom, *left],
            _ => return Err(invalid()),
        };
        Ok(Self { top, right, bottom, left })
    }

    /// Viewport grown by this margin
    pub fn apply(&self, viewport: DOMRect) -> DOMRect {
        viewport.expand(
            self.top.resolve(viewport.height),
            self.right.resolve(viewport.width),
            self.bottom.resolve(viewport.height),
            self.left.resolve(viewport.width),
        )
    }
}

impl Default for RootMargin {
    fn default() -> Self {
        Self::ZERO
    }
}

impl FromStr for RootMargin {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Intersection observer options
#[derive(Debug, Clone, PartialEq)]
pub struct ObserverOptions {
    pub root_margin: RootMargin,
    /// Ratios at which a node counts as intersecting
    pub thresholds: Vec<f64>,
}

impl Default for ObserverOptions {
    fn default() -> Self {
        Self {
            root_margin: RootMargin::ZERO,
            thresholds: vec![0.0],
        }
    }
}

impl ObserverOptions {
    pub fn with_margin(root_margin: RootMargin) -> Self {
        Self {
            root_margin,
            ..Self::default()
        }
    }

    /// Parse a margin into options with the default threshold
    pub fn from_margin(margin: &str) -> EngineResult<Self> {
        Ok(Self::with_margin(RootMargin::parse(margin)?))
    }
}

/// Intersection observer entry
#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionEntry {
    pub target: NodeId,
    pub is_intersecting: bool,
    pub intersection_ratio: f64,
    /// Virtual time of the check (ms)
    pub time: u64,
}

/// Intersection observer
#[derive(Debug, Clone)]
pub struct IntersectionObserver {
    options: ObserverOptions,
    /// Observed nodes and their last reported state
    observed: Vec<(NodeId, Option<bool>)>,
}

impl IntersectionObserver {
    pub fn new(options: ObserverOptions) -> Self {
        Self {
            options,
            observed: Vec::new(),
        }
    }

    pub fn options(&self) -> &ObserverOptions {
        &self.options
    }

    /// Observe a node (no-op if already observed)
    pub fn observe(&mut self, target: NodeId) {
        if !self.is_observing(target) {
            self.observed.push((target, None));
        }
    }

    /// Stop observing (safe on unobserved nodes)
    pub fn unobserve(&mut self, target: NodeId) {
        self.observed.retain(|&(node, _)| node != target);
    }

    pub fn is_observing(&self, target: NodeId) -> bool {
        self.observed.iter().any(|&(node, _)| node == target)
    }

    pub fn observed(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.observed.iter().map(|&(node, _)| node)
    }

    /// Compute state for one node against the margin-expanded viewport
    fn measure(&self, rect: Option<DOMRect>, root: &DOMRect) -> (bool, f64) {
        let Some(rect) = rect else {
            return (false, 0.0);
        };
        let Some(overlap) = rect.intersection(root) else {
            return (false, 0.0);
        };
        let ratio = if rect.area() > 0.0 {
            overlap.area() / rect.area()
        } else {
            1.0
        };
        let min_threshold = self
            .options
            .thresholds
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min);
        let intersecting = min_threshold <= 0.0 || min_threshold.is_infinite() || ratio >= min_threshold;
        (intersecting, ratio)
    }

    /// Check all observed nodes, returning entries for changed states
    ///
    /// The first check after `observe` always reports. Nodes outside the
    /// document never intersect, whatever rect they last had.
    pub fn check(&mut self, viewport: DOMRect, tree: &DomTree, time: u64) -> Vec<IntersectionEntry> {
        let root = self.options.root_margin.apply(viewport);
        let mut entries = Vec::new();

        for index in 0..self.observed.len() {
            let (node, last) = self.observed[index];
            let rect = tree.rect(node).filter(|_| tree.is_connected(node));
            let (is_intersecting, intersection_ratio) = self.measure(rect, &root);
            if last != Some(is_intersecting) {
                self.observed[index].1 = Some(is_intersecting);
                entries.push(IntersectionEntry {
                    target: node,
                    is_intersecting,
                    intersection_ratio,
                    time,
                });
            }
        }
        entries
    }

    /// Record an externally reported state, so geometry checks don't repeat it
    pub fn record(&mut self, target: NodeId, is_intersecting: bool) {
        if let Some(slot) = self.observed.iter_mut().find(|(node, _)| *node == target) {
            slot.1 = Some(is_intersecting);
        }
    }
}
