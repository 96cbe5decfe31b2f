//! Agenda ingestion from pasted text.
//!
//! Meeting agendas arrive as text copied out of spreadsheets, chat messages
//! or documents. Each non-empty line becomes at most one [`AgendaEntry`]:
//!
//! 1. Header rows and divider/section lines are dropped.
//! 2. Columns come from tabs, else runs of two or more spaces, else a
//!    composed `[time] title duration [speaker]` pattern, else plain
//!    whitespace splitting.
//! 3. Columns map to fields by position; lines with fewer than two columns
//!    are skipped.
//!
//! Parsing never fails. Problems with assembled entries are reported by
//! [`validate_entries`] as plain strings so the caller can decide whether to
//! block the import.

use std::fmt::Write as _;
use std::sync::LazyLock;

use chrono::NaiveTime;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::category::{Category, classify};
use crate::duration::{format_duration_token, normalize_duration};
use crate::types::ItemId;

/// A parsed agenda row, not yet assigned an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgendaEntry {
    pub title: String,
    /// Planned duration in seconds.
    pub duration_secs: i64,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    /// Planned start time of day.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<NaiveTime>,
    /// Member level or rank tag (e.g. `CC`, `DTM`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

impl AgendaEntry {
    /// Creates an entry, classifying it from title and duration.
    pub fn new(title: impl Into<String>, duration_secs: i64) -> Self {
        let title = title.into();
        let category = classify(&title, duration_secs);
        Self {
            title,
            duration_secs,
            category,
            speaker: None,
            scheduled_time: None,
            level: None,
        }
    }

    /// Scheduled time in canonical `HH:MM:SS` form.
    pub fn scheduled_time_text(&self) -> Option<String> {
        self.scheduled_time
            .map(|t| t.format("%H:%M:%S").to_string())
    }
}

/// An agenda entry with its identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgendaItem {
    pub id: ItemId,
    #[serde(flatten)]
    pub entry: AgendaEntry,
}

impl AgendaItem {
    pub const fn new(id: ItemId, entry: AgendaEntry) -> Self {
        Self { id, entry }
    }
}

/// Result of parsing a text block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedAgenda {
    /// Entries in input line order.
    pub entries: Vec<AgendaEntry>,
    /// Validation messages; empty when the import may proceed.
    pub errors: Vec<String>,
}

impl ParsedAgenda {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

const TIME_MARKERS: &[&str] = &["时间", "开始时间", "time", "start", "start time"];
const ITEM_MARKERS: &[&str] = &[
    "项目", "议程", "环节", "内容", "item", "agenda", "title", "session", "activity",
];
const SECTION_TITLES: &[&str] = &[
    "会议议程",
    "议程",
    "议程安排",
    "上半场",
    "下半场",
    "第一部分",
    "第二部分",
    "第三部分",
    "agenda",
    "meeting agenda",
    "program",
    "programme",
];

static MULTI_SPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("valid multi-space regex"));

static TIME_CELL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{1,2}[:：]\d{2}(?:[:：]\d{2})?$").expect("valid time cell regex")
});

static TIME_SEARCH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2})[:：](\d{2})(?:[:：](\d{2}))?").expect("valid time search regex")
});

/// `[time] title duration [speaker...]` for single-space separated rows.
static SINGLE_SPACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    let unit = r"(?:分钟|分|秒钟|秒|minutes?|mins?|seconds?|secs?|m|s)";
    let duration = format!(r"\d[\d\-'′’:+~～]*{unit}?(?:\+\d[\d\-'′’:~～]*{unit}?)*");
    Regex::new(&format!(
        r"(?i)^(?:(?P<time>\d{{1,2}}[:：]\d{{2}}(?:[:：]\d{{2}})?)\s+)?(?P<title>.+?)\s+(?P<duration>{duration})(?:\s+(?P<speaker>.+))?$"
    ))
    .expect("valid single-space row regex")
});

static ANNOTATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[(（][^)）]*[)）]").expect("valid annotation regex"));

static LEVEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Z0-9]{1,4}$").expect("valid level regex"));

/// Parses a text block and validates the resulting entries.
pub fn parse_agenda(text: &str) -> ParsedAgenda {
    let entries = parse_entries(text);
    let errors = validate_entries(&entries);
    ParsedAgenda { entries, errors }
}

/// Parses a text block into entries without validating them.
pub fn parse_entries(text: &str) -> Vec<AgendaEntry> {
    let mut entries = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if is_divider(line) || is_header(line) {
            tracing::debug!(line = idx + 1, "skipping header or divider");
            continue;
        }
        let columns = split_columns(line);
        match entry_from_columns(&columns) {
            Some(entry) => entries.push(entry),
            None => tracing::debug!(line = idx + 1, "skipping line with fewer than two columns"),
        }
    }
    entries
}

/// Flags entries with an empty title or a non-positive duration.
pub fn validate_entries(entries: &[AgendaEntry]) -> Vec<String> {
    let mut errors = Vec::new();
    for (idx, entry) in entries.iter().enumerate() {
        let n = idx + 1;
        if entry.title.trim().is_empty() {
            errors.push(format!("item {n}: missing title"));
        }
        if entry.duration_secs <= 0 {
            errors.push(format!(
                "item {n}: invalid duration ({}s)",
                entry.duration_secs
            ));
        }
    }
    errors
}

/// Renders entries as tab-delimited text that parses back to the same entries.
///
/// Rows with a scheduled time use `time, title, duration, speaker, level`.
/// Rows without one use `title, duration, speaker` with the level appended
/// to the speaker, since collapsed tabs cannot carry an empty time column.
pub fn to_tab_text(entries: &[AgendaEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        let duration = format_duration_token(entry.duration_secs);
        let mut cells: Vec<String> = Vec::with_capacity(5);
        if let Some(time) = entry.scheduled_time_text() {
            cells.extend([time, entry.title.clone(), duration]);
            if let Some(speaker) = &entry.speaker {
                cells.push(speaker.clone());
                cells.extend(entry.level.clone());
            }
        } else {
            cells.extend([entry.title.clone(), duration]);
            if let Some(speaker) = &entry.speaker {
                match &entry.level {
                    Some(level) => cells.push(format!("{speaker} {level}")),
                    None => cells.push(speaker.clone()),
                }
            }
        }
        let _ = writeln!(out, "{}", cells.join("\t"));
    }
    out
}

const DIVIDER_CHARS: &[char] = &['-', '=', '_', '*', '—', '─', '━', '~'];

/// A divider is a run of rule characters, optionally framing a section title.
fn is_divider(line: &str) -> bool {
    let title = line
        .trim_matches(|c: char| c.is_whitespace() || DIVIDER_CHARS.contains(&c))
        .trim_end_matches([':', '：'])
        .trim()
        .to_lowercase();
    title.is_empty() || SECTION_TITLES.contains(&title.as_str())
}

/// A header has a delimiter, a cell naming the time column and another
/// naming the item column. Duration cells make a row data, so header
/// cells never carry digits.
fn is_header(line: &str) -> bool {
    let cells: Vec<String> = line
        .split(|c: char| c.is_whitespace())
        .map(|cell| cell.trim().to_lowercase())
        .filter(|cell| !cell.is_empty())
        .collect();
    if cells.len() < 2 || cells.iter().any(|c| c.chars().any(|ch| ch.is_ascii_digit())) {
        return false;
    }
    let time_cell = cells.iter().position(|c| has_marker(c, TIME_MARKERS));
    let item_cell = cells.iter().rposition(|c| has_marker(c, ITEM_MARKERS));
    matches!((time_cell, item_cell), (Some(t), Some(i)) if t != i)
}

/// CJK markers match inside a cell (`议程项目`); ASCII markers match whole cells.
fn has_marker(cell: &str, markers: &[&str]) -> bool {
    markers.iter().any(|marker| {
        if marker.is_ascii() {
            cell == *marker
        } else {
            cell.contains(marker)
        }
    })
}

/// Splits a row into trimmed, non-empty columns.
fn split_columns(line: &str) -> Vec<String> {
    if line.contains('\t') {
        return line
            .split('\t')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(String::from)
            .collect();
    }
    if MULTI_SPACE_RE.is_match(line) {
        return MULTI_SPACE_RE
            .split(line)
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(String::from)
            .collect();
    }
    if let Some(caps) = SINGLE_SPACE_RE.captures(line) {
        return ["time", "title", "duration", "speaker"]
            .iter()
            .filter_map(|name| caps.name(name))
            .map(|m| m.as_str().trim().to_string())
            .filter(|part| !part.is_empty())
            .collect();
    }
    line.split_whitespace().map(String::from).collect()
}

fn entry_from_columns(columns: &[String]) -> Option<AgendaEntry> {
    let cell = |i: usize| columns.get(i).map(String::as_str);
    let (time, title, duration, speaker, level) = match columns.len() {
        0 | 1 => return None,
        2 => (None, cell(0)?, cell(1)?, None, None),
        3 if is_time_cell(cell(0)?) => (cell(0), cell(1)?, cell(2)?, None, None),
        3 => (None, cell(0)?, cell(1)?, cell(2), None),
        _ => (cell(0), cell(1)?, cell(2)?, cell(3), cell(4)),
    };

    let duration_secs = normalize_duration(duration);
    let title = title.trim().to_string();
    let (speaker, trailing_level) = speaker.map_or((None, None), clean_speaker);
    let level = level
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .or(trailing_level);

    Some(AgendaEntry {
        category: classify(&title, duration_secs),
        title,
        duration_secs,
        speaker,
        scheduled_time: time.and_then(parse_time_of_day),
        level,
    })
}

fn is_time_cell(cell: &str) -> bool {
    TIME_CELL_RE.is_match(cell.trim())
}

/// Strips `(...)` annotations and a trailing level token from a speaker.
///
/// Returns the cleaned speaker and the level token, if one was removed.
fn clean_speaker(raw: &str) -> (Option<String>, Option<String>) {
    let without_notes = ANNOTATION_RE.replace_all(raw, "");
    let mut tokens: Vec<&str> = without_notes.split_whitespace().collect();
    let mut level = None;
    if tokens.len() > 1 && tokens.last().is_some_and(|t| LEVEL_RE.is_match(t)) {
        level = tokens.pop().map(String::from);
    }
    let speaker = tokens.join(" ");
    let speaker = (!speaker.is_empty()).then_some(speaker);
    (speaker, level)
}

/// Parses `HH:MM` or `HH:MM:SS` anywhere in a cell; invalid times yield `None`.
pub fn parse_time_of_day(cell: &str) -> Option<NaiveTime> {
    let caps = TIME_SEARCH_RE.captures(cell)?;
    let hours: u32 = caps[1].parse().ok()?;
    let minutes: u32 = caps[2].parse().ok()?;
    let seconds: u32 = caps.get(3).map_or(Some(0), |s| s.as_str().parse().ok())?;
    NaiveTime::from_hms_opt(hours, minutes, seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANONICAL: &str = "时间\t项目\t时长\t姓名\t等级
19:00\t开场致辞\t3'\t张主席\tDTM
19:05\t暖场分享\t8'\t李小明\tCC
19:15\t会议介绍\t2'\t王主持\tCL
19:20\t备稿演讲：《科技改变生活》\t5-7'\t陈演讲者\tCC
19:28\t即兴演讲环节\t20'\t刘主持人\tACB
19:50\t备稿演讲：《团队协作的力量》\t5-7'\t赵发言人\tCC
19:58\t个体评估1\t2-3'\t孙评估员\tACB
20:02\t个体评估2\t2-3'\t周点评人\tCC
20:08\t即兴评估\t5-7'\t吴评估师\tDTM
20:16\t语法官报告\t2'\t郑语法官\tCL
20:19\t总评报告\t3'\t何总评官\tDTM
20:25\t休息时间\t10'\t\t";

    fn time(h: u32, m: u32) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(h, m, 0)
    }

    #[test]
    fn canonical_block_yields_twelve_items() {
        let parsed = parse_agenda(CANONICAL);
        assert_eq!(parsed.entries.len(), 12);
        assert!(parsed.is_valid(), "{:?}", parsed.errors);

        let first = &parsed.entries[0];
        assert_eq!(first.title, "开场致辞");
        assert_eq!(first.duration_secs, 180);
        assert_eq!(first.category, Category::ShareOrHost);
        assert_eq!(first.speaker.as_deref(), Some("张主席"));
        assert_eq!(first.level.as_deref(), Some("DTM"));
        assert_eq!(first.scheduled_time_text().as_deref(), Some("19:00:00"));

        let last = &parsed.entries[11];
        assert_eq!(last.title, "休息时间");
        assert_eq!(last.duration_secs, 600);
        assert_eq!(last.speaker, None);
        assert_eq!(last.category, Category::Other);
        assert_eq!(last.scheduled_time, time(20, 25));
    }

    #[test]
    fn canonical_block_categories() {
        let categories: Vec<Category> = parse_entries(CANONICAL)
            .iter()
            .map(|e| e.category)
            .collect();
        assert_eq!(
            categories,
            vec![
                Category::ShareOrHost,
                Category::ShareOrHost,
                Category::ShareOrHost,
                Category::PreparedSpeech,
                Category::ShortEvaluation,
                Category::PreparedSpeech,
                Category::ShortEvaluation,
                Category::ShortEvaluation,
                Category::LongEvaluation,
                Category::ShortEvaluation,
                Category::LongEvaluation,
                Category::Other,
            ]
        );
    }

    #[test]
    fn single_space_rows_use_pattern() {
        let text = "暖场环节 8分钟 Sherry.Zhang
会议开场 1分钟 Sophy
主席联合致辞 6分钟 许闻怡、童大喵、莫婷
备稿演讲 - 技术出海新篇章 5-7分钟 Janson
个体评估 - 备稿1 2-3分钟 佳霖
时间官报告 1-2分钟 大米";
        let entries = parse_entries(text);
        assert_eq!(entries.len(), 6);
        assert_eq!(entries[0].title, "暖场环节");
        assert_eq!(entries[0].duration_secs, 480);
        assert_eq!(entries[0].speaker.as_deref(), Some("Sherry.Zhang"));
        assert_eq!(entries[3].title, "备稿演讲 - 技术出海新篇章");
        assert_eq!(entries[3].duration_secs, 360);
        assert_eq!(entries[3].category, Category::PreparedSpeech);
        assert_eq!(entries[4].title, "个体评估 - 备稿1");
        assert_eq!(entries[4].duration_secs, 180);
        assert_eq!(entries[5].category, Category::ShortEvaluation);
    }

    #[test]
    fn single_space_row_with_time_and_level() {
        let entries = parse_entries("19:20 备稿演讲 7' 陈演讲者 CC");
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.scheduled_time, time(19, 20));
        assert_eq!(entry.title, "备稿演讲");
        assert_eq!(entry.duration_secs, 420);
        assert_eq!(entry.speaker.as_deref(), Some("陈演讲者"));
        assert_eq!(entry.level.as_deref(), Some("CC"));
    }

    #[test]
    fn multi_space_rows_split_on_runs() {
        let entries = parse_entries("Opening remarks   3'   Alice Wong\nTable Topics  20  Bob");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, "Opening remarks");
        assert_eq!(entries[0].speaker.as_deref(), Some("Alice Wong"));
        assert_eq!(entries[1].duration_secs, 1200);
        assert_eq!(entries[1].category, Category::ShortEvaluation);
    }

    #[test]
    fn three_columns_with_leading_time() {
        let entries = parse_entries("20:25\t休息时间\t10'");
        assert_eq!(entries[0].scheduled_time, time(20, 25));
        assert_eq!(entries[0].title, "休息时间");
        assert_eq!(entries[0].speaker, None);
    }

    #[test]
    fn two_columns_are_title_and_duration() {
        let entries = parse_entries("Break\t10'");
        assert_eq!(entries[0].title, "Break");
        assert_eq!(entries[0].duration_secs, 600);
    }

    #[test]
    fn single_column_lines_are_skipped() {
        let entries = parse_entries("Welcome!\n\nSpeech\t7'");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Speech");
    }

    #[test]
    fn dividers_and_section_titles_are_skipped() {
        let text = "会议议程\n----------\nSpeech\t7'\n=====\nAgenda:\n";
        let entries = parse_entries(text);
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn english_header_is_skipped() {
        let entries = parse_entries("Time  Item  Duration  Speaker\n19:00  Opening  3'  Ann");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Opening");
    }

    #[test]
    fn headers_with_compound_markers_are_skipped() {
        let entries = parse_entries("时间\t议程项目\t时长\t讲者\n19:00\t开场致辞\t3'\t张主席");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "开场致辞");

        let entries = parse_entries("开始时间  项目名称  时长  负责人\n19:05  会议介绍  2'  王主持");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "会议介绍");
    }

    #[test]
    fn decorated_section_titles_are_skipped() {
        let text = "--- 第一部分 ---\n开场致辞\t3'\t张主席\n=== 上半场 ===\n━━ Agenda ━━";
        let parsed = parse_agenda(text);
        assert_eq!(parsed.entries.len(), 1);
        assert_eq!(parsed.entries[0].title, "开场致辞");
        assert!(parsed.is_valid());
    }

    #[test]
    fn decorated_title_that_is_not_a_section_is_parsed() {
        let entries = parse_entries("-- 备稿演讲 --\t7'");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "-- 备稿演讲 --");
    }

    #[test]
    fn speaker_initial_is_not_a_level() {
        let entries = parse_entries("Opening\t3'\tJohn D");
        assert_eq!(entries[0].speaker.as_deref(), Some("John D"));
        assert_eq!(entries[0].level, None);
        let entries = parse_entries("Opening\t3'\tJohn L3");
        assert_eq!(entries[0].level.as_deref(), Some("L3"));
    }

    #[test]
    fn timer_report_is_not_a_header() {
        let entries = parse_entries("时间官报告\t2'\t大米");
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn speaker_annotations_are_stripped() {
        let entries = parse_entries("备稿演讲\t7'\t陈演讲者（新会员） CC");
        assert_eq!(entries[0].speaker.as_deref(), Some("陈演讲者"));
        assert_eq!(entries[0].level.as_deref(), Some("CC"));
    }

    #[test]
    fn lone_level_like_speaker_is_kept() {
        let entries = parse_entries("颁奖环节\t5'\t主席团");
        assert_eq!(entries[0].speaker.as_deref(), Some("主席团"));
        let entries = parse_entries("Awards\t5'\tDTM");
        assert_eq!(entries[0].speaker.as_deref(), Some("DTM"));
        assert_eq!(entries[0].level, None);
    }

    #[test]
    fn malformed_time_is_omitted() {
        let entries = parse_entries("25:99\tSpeech\t7'\tAnn");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].scheduled_time, None);
        assert_eq!(entries[0].title, "Speech");
    }

    #[test]
    fn time_with_seconds_is_canonical() {
        assert_eq!(
            parse_time_of_day("7:05:30").map(|t| t.format("%H:%M:%S").to_string()),
            Some("07:05:30".to_string())
        );
        assert_eq!(parse_time_of_day("soon"), None);
    }

    #[test]
    fn line_order_is_preserved() {
        let entries = parse_entries("B\t2'\nA\t1'\nC\t3'");
        let titles: Vec<&str> = entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["B", "A", "C"]);
    }

    #[test]
    fn validation_flags_zero_duration() {
        let parsed = parse_agenda("Speech\t0\nBreak\t10'");
        assert_eq!(parsed.entries.len(), 2);
        assert_eq!(parsed.errors, vec!["item 1: invalid duration (0s)".to_string()]);
    }

    #[test]
    fn validation_flags_missing_title() {
        let mut entry = AgendaEntry::new("", 120);
        let errors = validate_entries(std::slice::from_ref(&entry));
        assert_eq!(errors, vec!["item 1: missing title".to_string()]);
        entry.title = "Fixed".to_string();
        assert!(validate_entries(&[entry]).is_empty());
    }

    #[test]
    fn empty_input_yields_nothing() {
        let parsed = parse_agenda("  \n\n");
        assert!(parsed.entries.is_empty());
        assert!(parsed.is_valid());
    }

    #[test]
    fn crlf_input_is_accepted() {
        let entries = parse_entries("Speech\t7'\r\nBreak\t10'\r\n");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].title, "Break");
    }

    #[test]
    fn tab_text_reparses_identically() {
        let entries = parse_entries(CANONICAL);
        let text = to_tab_text(&entries);
        assert_eq!(parse_entries(&text), entries);

        let loose = parse_entries("暖场环节 8分钟 Sherry.Zhang\n备稿演讲 7' 陈 CC\nBreak\t90s");
        assert_eq!(parse_entries(&to_tab_text(&loose)), loose);
    }

    #[test]
    fn tab_text_layout() {
        let entries = parse_entries("19:20\t备稿演讲\t5-7'\t陈演讲者\tCC\nBreak\t10'");
        insta::assert_snapshot!(to_tab_text(&entries), @r"
        19:20:00	备稿演讲	6'	陈演讲者	CC
        Break	10'
        ");
    }

    #[test]
    fn agenda_item_serializes_flat() {
        let item = AgendaItem::new(ItemId::new("a1").unwrap(), AgendaEntry::new("Speech", 420));
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["id"], "a1");
        assert_eq!(json["title"], "Speech");
        assert_eq!(json["category"], "prepared_speech");
        assert!(json.get("speaker").is_none());
    }
}
