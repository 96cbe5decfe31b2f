//! Session categories and the title/duration classifier.
//!
//! Classification is an ordered table of rules evaluated top to bottom; the
//! first rule that returns a category wins. Order matters: a title such as
//! `备稿演讲 - 即兴主题` carries both a prepared and an impromptu keyword and
//! must resolve to [`Category::PreparedSpeech`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::ValidationError;

/// Timing category of an agenda item. Selects the preset phase rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Prepared speech (typically 5-7 minutes).
    PreparedSpeech,
    /// Long-form evaluation: general evaluator, impromptu evaluation.
    LongEvaluation,
    /// Short evaluations, officer reports and impromptu (table topics) turns.
    ShortEvaluation,
    /// Sharing sessions, hosting, introductions and openings.
    ShareOrHost,
    /// Breaks, ceremonies, anything else.
    Other,
}

impl Category {
    pub const ALL: [Self; 5] = [
        Self::PreparedSpeech,
        Self::LongEvaluation,
        Self::ShortEvaluation,
        Self::ShareOrHost,
        Self::Other,
    ];

    /// String representation for storage and CLI output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PreparedSpeech => "prepared_speech",
            Self::LongEvaluation => "long_evaluation",
            Self::ShortEvaluation => "short_evaluation",
            Self::ShareOrHost => "share_or_host",
            Self::Other => "other",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::PreparedSpeech => "Prepared speech",
            Self::LongEvaluation => "Long evaluation",
            Self::ShortEvaluation => "Short evaluation / impromptu",
            Self::ShareOrHost => "Share / host",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "prepared_speech" | "speech" => Ok(Self::PreparedSpeech),
            "long_evaluation" | "longeval" => Ok(Self::LongEvaluation),
            "short_evaluation" | "shorteval" | "impromptu" | "table-topics" => {
                Ok(Self::ShortEvaluation)
            }
            "share_or_host" | "sharehost" => Ok(Self::ShareOrHost),
            "other" | "break" => Ok(Self::Other),
            _ => Err(ValidationError::InvalidCategory {
                value: s.to_string(),
            }),
        }
    }
}

/// Inputs shared by every rule.
#[derive(Debug, Clone)]
pub struct Signals {
    title: String,
    duration_secs: i64,
}

impl Signals {
    pub fn new(title: &str, duration_secs: i64) -> Self {
        Self {
            title: title.to_lowercase(),
            duration_secs,
        }
    }

    fn has_any(&self, keywords: &[&str]) -> bool {
        keywords.iter().any(|k| self.title.contains(k))
    }
}

/// One entry of the classification table.
pub struct Rule {
    /// Stable rule name, reported by [`matching_rule`].
    pub name: &'static str,
    /// Returns a category when the rule applies.
    pub decide: fn(&Signals) -> Option<Category>,
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule").field("name", &self.name).finish()
    }
}

const PREPARED: &[&str] = &["备稿", "prepared"];
const EVALUATION: &[&str] = &["评估", "点评", "评", "evaluat", "critique"];
const LONG_EVALUATION: &[&str] = &[
    "总评",
    "overall",
    "general evaluat",
    "即兴评估",
    "impromptu evaluat",
];
const SHORT_EVALUATION: &[&str] = &["个体评估", "个评", "individual evaluat"];
const OFFICER_REPORT: &[&str] = &[
    "时间官",
    "计时官",
    "语法官",
    "哼哈官",
    "timer",
    "grammarian",
    "ah-counter",
    "ah counter",
    "filler",
    "报告",
    "report",
];
const SHARE_OR_HOST: &[&str] = &[
    "分享", "主持", "介绍", "开场", "致辞", "share", "sharing", "host", "intro", "opening",
    "toast", "welcome",
];
const SPEECH: &[&str] = &["演讲", "speech"];
const BREAK: &[&str] = &[
    "休息",
    "茶歇",
    "中场",
    "暖场",
    "合影",
    "颁奖",
    "投票",
    "break",
    "award",
    "photo",
    "vote",
    "networking",
    "ceremony",
];

const PREPARED_RANGE: std::ops::RangeInclusive<i64> = 300..=480;

fn prepared_keyword(s: &Signals) -> Option<Category> {
    s.has_any(PREPARED).then_some(Category::PreparedSpeech)
}

fn impromptu_keyword(s: &Signals) -> Option<Category> {
    has_impromptu_keyword(&s.title).then_some(Category::ShortEvaluation)
}

fn evaluation_keyword(s: &Signals) -> Option<Category> {
    if !s.has_any(EVALUATION) {
        return None;
    }
    if s.has_any(LONG_EVALUATION) {
        Some(Category::LongEvaluation)
    } else if s.has_any(SHORT_EVALUATION) {
        Some(Category::ShortEvaluation)
    } else if s.duration_secs > 180 {
        Some(Category::LongEvaluation)
    } else {
        Some(Category::ShortEvaluation)
    }
}

fn officer_report(s: &Signals) -> Option<Category> {
    s.has_any(OFFICER_REPORT).then_some(Category::ShortEvaluation)
}

fn share_or_host(s: &Signals) -> Option<Category> {
    s.has_any(SHARE_OR_HOST).then_some(Category::ShareOrHost)
}

fn generic_speech(s: &Signals) -> Option<Category> {
    if !s.has_any(SPEECH) {
        return None;
    }
    if PREPARED_RANGE.contains(&s.duration_secs) {
        Some(Category::PreparedSpeech)
    } else {
        Some(Category::ShortEvaluation)
    }
}

fn break_or_ceremony(s: &Signals) -> Option<Category> {
    s.has_any(BREAK).then_some(Category::Other)
}

#[allow(clippy::unnecessary_wraps)]
fn duration_fallback(s: &Signals) -> Option<Category> {
    let d = s.duration_secs;
    Some(if PREPARED_RANGE.contains(&d) {
        Category::PreparedSpeech
    } else if d >= 900 {
        Category::ShareOrHost
    } else if d <= 180 {
        Category::ShortEvaluation
    } else {
        Category::Other
    })
}

/// The classification table, in precedence order.
pub static RULES: [Rule; 8] = [
    Rule {
        name: "prepared_keyword",
        decide: prepared_keyword,
    },
    Rule {
        name: "impromptu_keyword",
        decide: impromptu_keyword,
    },
    Rule {
        name: "evaluation_keyword",
        decide: evaluation_keyword,
    },
    Rule {
        name: "officer_report",
        decide: officer_report,
    },
    Rule {
        name: "share_or_host",
        decide: share_or_host,
    },
    Rule {
        name: "generic_speech",
        decide: generic_speech,
    },
    Rule {
        name: "break_or_ceremony",
        decide: break_or_ceremony,
    },
    Rule {
        name: "duration_fallback",
        decide: duration_fallback,
    },
];

/// Classifies an agenda item by title and duration (seconds).
pub fn classify(title: &str, duration_secs: i64) -> Category {
    classify_with_rule(title, duration_secs).1
}

/// Returns the name of the rule that decided the category.
pub fn matching_rule(title: &str, duration_secs: i64) -> &'static str {
    classify_with_rule(title, duration_secs).0
}

fn classify_with_rule(title: &str, duration_secs: i64) -> (&'static str, Category) {
    let signals = Signals::new(title, duration_secs);
    RULES
        .iter()
        .find_map(|rule| (rule.decide)(&signals).map(|category| (rule.name, category)))
        .unwrap_or(("duration_fallback", Category::Other))
}

/// `即兴评估` and "impromptu evaluation" are evaluations, not impromptu turns.
fn has_impromptu_keyword(lower_title: &str) -> bool {
    (lower_title.contains("即兴") && !lower_title.contains("即兴评估"))
        || lower_title.contains("table topic")
        || (lower_title.contains("impromptu") && !lower_title.contains("impromptu evaluat"))
}

/// Whether an item runs as an impromptu session with personal sub-timers.
///
/// Any short-evaluation item qualifies, as does any title naming an
/// impromptu format regardless of its category.
pub fn is_impromptu_session(title: &str, category: Category) -> bool {
    category == Category::ShortEvaluation || has_impromptu_keyword(&title.to_lowercase())
}
