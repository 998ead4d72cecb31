//! Typed literal values used in datatype restrictions.
//!
//! Literals carry a total order within a type (floats compare with
//! `total_cmp`) so they can be hashed, deduplicated and stored in ordered
//! sets. Comparing literals of different types is an error, never a silent
//! `false`.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// The type of a [`Literal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LiteralKind {
    Boolean,
    Integer,
    Long,
    Float,
    Double,
    Date,
    String,
}

impl LiteralKind {
    /// Whether values of this kind have no values strictly between neighbours.
    pub fn is_discrete(self) -> bool {
        matches!(self, Self::Integer | Self::Long | Self::Date)
    }

    /// Whether the ordered comparison operators make sense for this kind.
    pub fn is_ordered(self) -> bool {
        !matches!(self, Self::Boolean)
    }
}

impl fmt::Display for LiteralKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Date => "date",
            Self::String => "string",
        };
        f.write_str(name)
    }
}

/// A typed constant on the right-hand side of a datatype restriction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Literal {
    Boolean(bool),
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Date(NaiveDate),
    String(Arc<str>),
}

impl Literal {
    pub fn kind(&self) -> LiteralKind {
        match self {
            Self::Boolean(_) => LiteralKind::Boolean,
            Self::Integer(_) => LiteralKind::Integer,
            Self::Long(_) => LiteralKind::Long,
            Self::Float(_) => LiteralKind::Float,
            Self::Double(_) => LiteralKind::Double,
            Self::Date(_) => LiteralKind::Date,
            Self::String(_) => LiteralKind::String,
        }
    }

    /// Compare two literals of the same kind.
    ///
    /// Returns [`ModelError::TypeMismatch`] when the kinds differ.
    pub fn try_cmp(&self, other: &Literal) -> Result<Ordering, ModelError> {
        match (self, other) {
            (Self::Boolean(a), Self::Boolean(b)) => Ok(a.cmp(b)),
            (Self::Integer(a), Self::Integer(b)) => Ok(a.cmp(b)),
            (Self::Long(a), Self::Long(b)) => Ok(a.cmp(b)),
            (Self::Float(a), Self::Float(b)) => Ok(a.total_cmp(b)),
            (Self::Double(a), Self::Double(b)) => Ok(a.total_cmp(b)),
            (Self::Date(a), Self::Date(b)) => Ok(a.cmp(b)),
            (Self::String(a), Self::String(b)) => Ok(a.cmp(b)),
            _ => Err(ModelError::TypeMismatch {
                left: self.kind().to_string(),
                right: other.kind().to_string(),
            }),
        }
    }

    /// Reject values that cannot take part in comparisons.
    pub fn validate(&self) -> Result<(), ModelError> {
        let nan = match self {
            Self::Float(v) => v.is_nan(),
            Self::Double(v) => v.is_nan(),
            _ => false,
        };
        if nan {
            return Err(ModelError::InvalidLiteral {
                message: format!("{} literal is NaN", self.kind()),
            });
        }
        Ok(())
    }

    /// The next value of a discrete kind, `None` at the end of the domain
    /// or for dense kinds.
    pub fn successor(&self) -> Option<Literal> {
        match self {
            Self::Integer(v) => v.checked_add(1).map(Self::Integer),
            Self::Long(v) => v.checked_add(1).map(Self::Long),
            Self::Date(d) => d.succ_opt().map(Self::Date),
            _ => None,
        }
    }

    /// The previous value of a discrete kind, `None` at the start of the
    /// domain or for dense kinds.
    pub fn predecessor(&self) -> Option<Literal> {
        match self {
            Self::Integer(v) => v.checked_sub(1).map(Self::Integer),
            Self::Long(v) => v.checked_sub(1).map(Self::Long),
            Self::Date(d) => d.pred_opt().map(Self::Date),
            _ => None,
        }
    }
}

impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Literal {}

impl PartialOrd for Literal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Literal {
    /// Total order across kinds: kind first, then value.
    fn cmp(&self, other: &Self) -> Ordering {
        self.kind()
            .cmp(&other.kind())
            .then_with(|| self.try_cmp(other).unwrap_or(Ordering::Equal))
    }
}

impl Hash for Literal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        match self {
            Self::Boolean(v) => v.hash(state),
            Self::Integer(v) => v.hash(state),
            Self::Long(v) => v.hash(state),
            Self::Float(v) => v.to_bits().hash(state),
            Self::Double(v) => v.to_bits().hash(state),
            Self::Date(v) => v.hash(state),
            Self::String(v) => v.hash(state),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}L"),
            Self::Float(v) => write!(f, "{v}f"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Date(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "\"{v}\""),
        }
    }
}

impl From<bool> for Literal {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<i32> for Literal {
    fn from(v: i32) -> Self {
        Self::Integer(v)
    }
}

impl From<i64> for Literal {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<f32> for Literal {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<f64> for Literal {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<NaiveDate> for Literal {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl From<&str> for Literal {
    fn from(v: &str) -> Self {
        Self::String(Arc::from(v))
    }
}

impl From<String> for Literal {
    fn from(v: String) -> Self {
        Self::String(Arc::from(v))
    }
}
