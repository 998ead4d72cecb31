//! Interval semantics for datatype restrictions.
//!
//! Features are functional: an individual has at most one value per
//! feature. A restriction therefore denotes an interval of admissible
//! values, restriction `a` implies `b` when `a`'s interval lies inside
//! `b`'s, and two restrictions conflict when their intervals are disjoint.

use std::cmp::Ordering;
use std::ops::Bound;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::model::{Literal, Operator};

use super::interner::FeatureId;

/// An interned `feature op value` restriction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Restriction {
    pub feature: FeatureId,
    pub operator: Operator,
    pub value: Literal,
}

/// The values a feature may take under one or more restrictions.
#[derive(Debug, Clone, PartialEq)]
pub struct Interval {
    lower: Bound<Literal>,
    upper: Bound<Literal>,
}

impl Interval {
    pub fn unbounded() -> Self {
        Self {
            lower: Bound::Unbounded,
            upper: Bound::Unbounded,
        }
    }

    /// The values admitted by both `self` and `other`.
    pub fn intersect(self, other: Interval) -> Result<Interval, ModelError> {
        let lower = if lower_within(&self.lower, &other.lower)? {
            self.lower
        } else {
            other.lower
        };
        let upper = if upper_within(&self.upper, &other.upper)? {
            self.upper
        } else {
            other.upper
        };
        Ok(Interval { lower, upper })
    }

    pub fn is_empty(&self) -> Result<bool, ModelError> {
        separated(&self.lower, &self.upper)
    }

    /// Every value in `self` is also in `other`.
    pub fn within(&self, other: &Interval) -> Result<bool, ModelError> {
        Ok(lower_within(&self.lower, &other.lower)? && upper_within(&self.upper, &other.upper)?)
    }
}

impl Restriction {
    /// The admissible values, `None` when no value can satisfy the
    /// restriction (e.g. `> i32::MAX`).
    pub fn interval(&self) -> Option<Interval> {
        let discrete = self.value.kind().is_discrete();
        let v = self.value.clone();
        let (lower, upper) = match self.operator {
            Operator::Equals => (Bound::Included(v.clone()), Bound::Included(v)),
            Operator::LessThanEquals => (Bound::Unbounded, Bound::Included(v)),
            Operator::GreaterThanEquals => (Bound::Included(v), Bound::Unbounded),
            Operator::LessThan if discrete => (Bound::Unbounded, Bound::Included(v.predecessor()?)),
            Operator::LessThan => (Bound::Unbounded, Bound::Excluded(v)),
            Operator::GreaterThan if discrete => (Bound::Included(v.successor()?), Bound::Unbounded),
            Operator::GreaterThan => (Bound::Excluded(v), Bound::Unbounded),
        };
        Some(Interval { lower, upper })
    }

    /// Whether no value satisfies this restriction on its own.
    pub fn is_empty(&self) -> bool {
        self.interval().is_none()
    }

    /// Every value admitted by `self` is admitted by `other`.
    pub fn implies(&self, other: &Restriction) -> Result<bool, ModelError> {
        if self.feature != other.feature {
            return Ok(false);
        }
        let Some(mine) = self.interval() else {
            return Ok(true);
        };
        let Some(theirs) = other.interval() else {
            return Ok(false);
        };
        mine.within(&theirs)
    }

    /// No single value satisfies both restrictions.
    pub fn conflicts(&self, other: &Restriction) -> Result<bool, ModelError> {
        if self.feature != other.feature {
            return Ok(false);
        }
        let (Some(a), Some(b)) = (self.interval(), other.interval()) else {
            return Ok(true);
        };
        Ok(separated(&a.lower, &b.upper)? || separated(&b.lower, &a.upper)?)
    }
}

/// `a` is at least as tight as `b` as a lower bound.
fn lower_within(a: &Bound<Literal>, b: &Bound<Literal>) -> Result<bool, ModelError> {
    Ok(match (a, b) {
        (_, Bound::Unbounded) => true,
        (Bound::Unbounded, _) => false,
        (Bound::Included(x), Bound::Excluded(y)) => x.try_cmp(y)? == Ordering::Greater,
        (Bound::Included(x), Bound::Included(y))
        | (Bound::Excluded(x), Bound::Excluded(y))
        | (Bound::Excluded(x), Bound::Included(y)) => x.try_cmp(y)? != Ordering::Less,
    })
}

/// `a` is at least as tight as `b` as an upper bound.
fn upper_within(a: &Bound<Literal>, b: &Bound<Literal>) -> Result<bool, ModelError> {
    Ok(match (a, b) {
        (_, Bound::Unbounded) => true,
        (Bound::Unbounded, _) => false,
        (Bound::Included(x), Bound::Excluded(y)) => x.try_cmp(y)? == Ordering::Less,
        (Bound::Included(x), Bound::Included(y))
        | (Bound::Excluded(x), Bound::Excluded(y))
        | (Bound::Excluded(x), Bound::Included(y)) => x.try_cmp(y)? != Ordering::Greater,
    })
}

/// The lower bound lies above the upper bound.
fn separated(lower: &Bound<Literal>, upper: &Bound<Literal>) -> Result<bool, ModelError> {
    Ok(match (lower, upper) {
        (Bound::Unbounded, _) | (_, Bound::Unbounded) => false,
        (Bound::Included(x), Bound::Included(y)) => x.try_cmp(y)? == Ordering::Greater,
        (Bound::Included(x), Bound::Excluded(y))
        | (Bound::Excluded(x), Bound::Included(y))
        | (Bound::Excluded(x), Bound::Excluded(y)) => x.try_cmp(y)? != Ordering::Less,
    })
}
