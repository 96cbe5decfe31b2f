//! Stage-signal phases and the per-category threshold table.
//!
//! Thresholds are expressed in *seconds remaining*: a green threshold of 120
//! means the green card goes up with two minutes left. Negative values sit in
//! overtime, so a white threshold of -30 fires thirty seconds past the target.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::types::ValidationError;

/// Default overtime grace before the white card.
pub const DEFAULT_WHITE_GRACE_SECS: i64 = 30;

/// The signal shown for the current remaining time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Normal,
    Green,
    Yellow,
    Red,
    White,
}

impl Phase {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Red => "red",
            Self::White => "white",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A threshold set, in seconds remaining.
///
/// Invariant: `green >= yellow >= red >= white`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseRules {
    pub green: i64,
    pub yellow: i64,
    pub red: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub white: Option<i64>,
}

impl PhaseRules {
    /// Builds a rule set, rejecting thresholds that are out of order.
    pub fn new(green: i64, yellow: i64, red: i64, white: Option<i64>) -> Result<Self, ValidationError> {
        let rules = Self {
            green,
            yellow,
            red,
            white,
        };
        let ordered = green >= yellow && yellow >= red && white.is_none_or(|w| red >= w);
        if ordered {
            Ok(rules)
        } else {
            Err(ValidationError::UnorderedThresholds {
                rules: rules.to_string(),
            })
        }
    }

    /// Preset rules for a category with the default white grace.
    pub const fn preset(category: Category) -> Self {
        Self::preset_with_grace(category, Some(DEFAULT_WHITE_GRACE_SECS))
    }

    /// Preset rules for a category.
    ///
    /// `white_grace_secs` is how far past the target the white card goes up;
    /// `None` disables the white phase.
    pub const fn preset_with_grace(category: Category, white_grace_secs: Option<i64>) -> Self {
        let (green, yellow) = match category {
            Category::PreparedSpeech | Category::LongEvaluation => (120, 60),
            Category::ShortEvaluation => (60, 30),
            Category::ShareOrHost => (300, 120),
            // No separate green stage: yellow takes over at 30s left.
            Category::Other => (30, 30),
        };
        let white = match white_grace_secs {
            Some(grace) => Some(-grace.abs()),
            None => None,
        };
        Self {
            green,
            yellow,
            red: 0,
            white,
        }
    }

    /// Computes the phase for an elapsed count against a target duration.
    ///
    /// Checked from the most severe stage down, so exactly one phase applies.
    pub fn phase_at(&self, elapsed_secs: i64, target_secs: i64) -> Phase {
        let remaining = target_secs - elapsed_secs;
        if self.white.is_some_and(|white| remaining <= white) {
            Phase::White
        } else if remaining <= self.red {
            Phase::Red
        } else if remaining <= self.yellow {
            Phase::Yellow
        } else if remaining <= self.green {
            Phase::Green
        } else {
            Phase::Normal
        }
    }
}

impl fmt::Display for PhaseRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "green {}s, yellow {}s, red {}s",
            self.green, self.yellow, self.red
        )?;
        if let Some(white) = self.white {
            write!(f, ", white {white}s")?;
        }
        Ok(())
    }
}
