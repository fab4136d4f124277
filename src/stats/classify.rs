use std::fmt;

use serde::{Deserialize, Serialize};

/// Labeled band of a correlation coefficient, for choropleth legends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CorrelationClass {
    StrongNegative,     // r <= -0.6
    ModerateNegative,   // -0.6 < r <= -0.2
    Weak,               // |r| < 0.2
    ModeratePositive,   // 0.2 <= r < 0.6
    StrongPositive,     // r >= 0.6
}

impl CorrelationClass {
    pub const ALL: [CorrelationClass; 5] = [
        CorrelationClass::StrongNegative,
        CorrelationClass::ModerateNegative,
        CorrelationClass::Weak,
        CorrelationClass::ModeratePositive,
        CorrelationClass::StrongPositive,
    ];

    /// Band containing `r`. Non-finite input falls in `Weak`.
    pub fn from_r(r: f64) -> Self {
        match r {
            r if r <= -0.6 => Self::StrongNegative,
            r if r <= -0.2 => Self::ModerateNegative,
            r if r >= 0.6 => Self::StrongPositive,
            r if r >= 0.2 => Self::ModeratePositive,
            _ => Self::Weak,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::StrongNegative => "Strong Negative",
            Self::ModerateNegative => "Moderate Negative",
            Self::Weak => "Weak",
            Self::ModeratePositive => "Moderate Positive",
            Self::StrongPositive => "Strong Positive",
        }
    }
}

impl fmt::Display for CorrelationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.label()) }
}
