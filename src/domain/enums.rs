use serde::{Deserialize, Serialize};

/// Part of the day a task is planned for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeBlock {
    Morning,
    Evening,
    Night,
}

impl TimeBlock {
    /// Parse a block from its tag like "morning"
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_lowercase().as_str() {
            "morning" => Some(Self::Morning),
            "evening" => Some(Self::Evening),
            "night" => Some(Self::Night),
            _ => None,
        }
    }

    pub fn to_tag(&self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Evening => "evening",
            Self::Night => "night",
        }
    }

    pub fn all() -> &'static [TimeBlock] {
        &[TimeBlock::Morning, TimeBlock::Evening, TimeBlock::Night]
    }
}

impl Default for TimeBlock {
    fn default() -> Self {
        TimeBlock::Morning
    }
}

/// Eisenhower quadrant of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    /// Important and urgent
    Iap,
    /// Important but not urgent
    Ibnu,
    /// Not important but urgent
    Nibu,
    /// Neither important nor urgent
    Ninu,
}

impl Priority {
    /// Parse priority from its tag like "IAP"
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_uppercase().as_str() {
            "IAP" => Some(Self::Iap),
            "IBNU" => Some(Self::Ibnu),
            "NIBU" => Some(Self::Nibu),
            "NINU" => Some(Self::Ninu),
            _ => None,
        }
    }

    pub fn to_tag(&self) -> &'static str {
        match self {
            Self::Iap => "IAP",
            Self::Ibnu => "IBNU",
            Self::Nibu => "NIBU",
            Self::Ninu => "NINU",
        }
    }

    /// Human readable quadrant name
    pub fn label(&self) -> &'static str {
        match self {
            Self::Iap => "Important & urgent",
            Self::Ibnu => "Important, not urgent",
            Self::Nibu => "Urgent, not important",
            Self::Ninu => "Neither",
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Iap
    }
}
