use std::sync::Arc;

use anyhow::anyhow;
use chrono::{DateTime, Datelike, Local, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dates::days_in_month;

pub const MIN_ZOOM: f64 = 0.5;
pub const MAX_ZOOM: f64 = 2.0;
pub const DEFAULT_ZOOM: f64 = 1.0;

pub fn clamp_zoom(zoom: f64) -> f64 {
    zoom.clamp(MIN_ZOOM, MAX_ZOOM)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

/// A positioned decoration inside a day cell. Exactly two kinds exist, so
/// consumers match exhaustively instead of probing optional fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CalendarObject {
    #[serde(rename_all = "camelCase")]
    Png {
        id: Uuid,
        /// Pixel offset relative to the day cell.
        x: f64,
        y: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        z_index: Option<i32>,
        /// Binary-safe encoded image (data URL) or a path.
        src: String,
        width: f64,
        height: f64,
        /// Degrees.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rotation: Option<f64>,
    },
    #[serde(rename_all = "camelCase")]
    Text {
        id: Uuid,
        x: f64,
        y: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        z_index: Option<i32>,
        text: String,
        font_size: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        font_weight: Option<u16>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        color: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        align: Option<TextAlign>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        font_family: Option<String>,
    },
}

impl CalendarObject {
    pub fn new_png(src: String, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::Png {
            id: Uuid::new_v4(),
            x,
            y,
            z_index: None,
            src,
            width,
            height,
            rotation: None,
        }
    }

    pub fn new_text(text: String, x: f64, y: f64, font_size: f64, color: Option<String>) -> Self {
        Self::Text {
            id: Uuid::new_v4(),
            x,
            y,
            z_index: None,
            text,
            font_size,
            font_weight: None,
            color,
            align: None,
            font_family: None,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Self::Png { id, .. } | Self::Text { id, .. } => *id,
        }
    }

    pub fn position(&self) -> (f64, f64) {
        match self {
            Self::Png { x, y, .. } | Self::Text { x, y, .. } => (*x, *y),
        }
    }

    pub fn set_position(&mut self, new_x: f64, new_y: f64) {
        match self {
            Self::Png { x, y, .. } | Self::Text { x, y, .. } => {
                *x = new_x;
                *y = new_y;
            }
        }
    }
}

/// Visual state of one calendar date. The `date` key is assigned at
/// construction and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayVisual {
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default)]
    pub objects: Vec<CalendarObject>,
    /// Derived cache of "a detail record exists and has content". Only ever
    /// recomputed from the detail map, never set directly.
    #[serde(default)]
    pub has_day_detail: bool,
}

impl DayVisual {
    pub fn blank(date: String) -> Self {
        Self {
            date,
            background_color: None,
            objects: Vec::new(),
            has_day_detail: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthData {
    pub month_index: u32,
    pub year: i32,
    pub days: Vec<DayVisual>,
}

/// Full-year snapshot: always 12 months, every calendar date present.
///
/// Months are held behind `Arc` so single-day updates share the 11 untouched
/// months with the previous snapshot; consumers can change-detect with
/// `Arc::ptr_eq`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearData {
    pub year: i32,
    pub months: Vec<Arc<MonthData>>,
}

/// Partial update applied to a single day by [`YearData::replace_day`].
#[derive(Debug, Clone, Default)]
pub struct DayPatch {
    /// `Some(None)` clears the color, `None` leaves it untouched.
    pub background_color: Option<Option<String>>,
    pub objects: Option<Vec<CalendarObject>>,
    pub has_day_detail: Option<bool>,
}

impl DayPatch {
    pub fn background(color: Option<String>) -> Self {
        Self {
            background_color: Some(color),
            ..Self::default()
        }
    }

    pub fn objects(objects: Vec<CalendarObject>) -> Self {
        Self {
            objects: Some(objects),
            ..Self::default()
        }
    }

    pub fn detail_flag(has_day_detail: bool) -> Self {
        Self {
            has_day_detail: Some(has_day_detail),
            ..Self::default()
        }
    }

    /// Blank background and decorations; the detail flag is left alone
    /// because clearing visuals does not touch the detail map.
    pub fn cleared() -> Self {
        Self {
            background_color: Some(None),
            objects: Some(Vec::new()),
            has_day_detail: None,
        }
    }

    fn apply(&self, day: &mut DayVisual) {
        if let Some(color) = &self.background_color {
            day.background_color = color.clone();
        }
        if let Some(objects) = &self.objects {
            day.objects = objects.clone();
        }
        if let Some(flag) = self.has_day_detail {
            day.has_day_detail = flag;
        }
    }
}

impl YearData {
    /// Deterministic blank snapshot: 12 months covering the whole Gregorian
    /// year, one blank day per date.
    pub fn empty(year: i32) -> Self {
        let months = (0..12u32)
            .map(|month_index| {
                let days = (1..=days_in_month(year, month_index))
                    .map(|day| {
                        DayVisual::blank(format!("{year:04}-{:02}-{day:02}", month_index + 1))
                    })
                    .collect();
                Arc::new(MonthData {
                    month_index,
                    year,
                    days,
                })
            })
            .collect();
        Self { year, months }
    }

    /// Not-found is an ordinary outcome here: dates outside the loaded year
    /// simply return `None`.
    pub fn find_day(&self, date: &str) -> Option<&DayVisual> {
        self.months
            .iter()
            .flat_map(|month| month.days.iter())
            .find(|day| day.date == date)
    }

    /// New snapshot with exactly the targeted day merged with `patch`.
    ///
    /// Unknown keys are a deliberate silent no-op: stale UI references must
    /// never corrupt another year's data. Untouched months stay shared.
    pub fn replace_day(&self, date: &str, patch: &DayPatch) -> Self {
        let months = self
            .months
            .iter()
            .map(|month| {
                if month.days.iter().any(|day| day.date == date) {
                    let mut updated = MonthData::clone(month);
                    for day in &mut updated.days {
                        if day.date == date {
                            patch.apply(day);
                        }
                    }
                    Arc::new(updated)
                } else {
                    Arc::clone(month)
                }
            })
            .collect();
        Self {
            year: self.year,
            months,
        }
    }

    /// Appends a decoration, preserving insertion order (stacking order).
    pub fn push_object(&self, date: &str, object: CalendarObject) -> Self {
        match self.find_day(date) {
            Some(day) => {
                let mut objects = day.objects.clone();
                objects.push(object);
                self.replace_day(date, &DayPatch::objects(objects))
            }
            None => self.clone(),
        }
    }

    /// Updates one decoration in place; unknown date or id is a no-op.
    pub fn update_object<F>(&self, date: &str, id: Uuid, f: F) -> Self
    where
        F: FnOnce(&mut CalendarObject),
    {
        let Some(day) = self.find_day(date) else {
            return self.clone();
        };
        let Some(idx) = day.objects.iter().position(|object| object.id() == id) else {
            return self.clone();
        };
        let mut objects = day.objects.clone();
        if let Some(object) = objects.get_mut(idx) {
            f(object);
        }
        self.replace_day(date, &DayPatch::objects(objects))
    }

    /// Removes one decoration; unknown date or id is a no-op.
    pub fn remove_object(&self, date: &str, id: Uuid) -> Self {
        let Some(day) = self.find_day(date) else {
            return self.clone();
        };
        if !day.objects.iter().any(|object| object.id() == id) {
            return self.clone();
        }
        let objects = day
            .objects
            .iter()
            .filter(|object| object.id() != id)
            .cloned()
            .collect();
        self.replace_day(date, &DayPatch::objects(objects))
    }

    pub fn day_count(&self) -> usize {
        self.months.iter().map(|month| month.days.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItem {
    pub id: Uuid,
    pub text: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// Manual sort position, unique within its detail; overrides insertion
    /// order when rendering.
    #[serde(default)]
    pub order: u32,
}

/// Checklist/notes record for one date. Lives in its own map keyed by the
/// same date string as the day, not embedded in the year snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayDetail {
    pub date: String,
    #[serde(default)]
    pub checklist: Vec<ChecklistItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

impl DayDetail {
    pub fn new(date: &str) -> Self {
        Self {
            date: date.to_string(),
            checklist: Vec::new(),
            notes: None,
            last_modified: None,
        }
    }

    /// The one predicate behind every `has_day_detail` flag.
    pub fn has_content(&self) -> bool {
        !self.checklist.is_empty() || self.notes.as_deref().is_some_and(|n| !n.trim().is_empty())
    }

    /// Items in manual order.
    pub fn checklist_sorted(&self) -> Vec<&ChecklistItem> {
        let mut items: Vec<&ChecklistItem> = self.checklist.iter().collect();
        items.sort_by_key(|item| item.order);
        items
    }
}

/// Partial update applied to a detail record by the store.
#[derive(Debug, Clone, Default)]
pub struct DetailPatch {
    pub checklist: Option<Vec<ChecklistItem>>,
    pub notes: Option<String>,
}

impl DetailPatch {
    pub fn checklist(checklist: Vec<ChecklistItem>) -> Self {
        Self {
            checklist: Some(checklist),
            ..Self::default()
        }
    }

    pub fn notes(notes: String) -> Self {
        Self {
            notes: Some(notes),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewMode {
    #[default]
    Remaining,
    FullYear,
}

impl std::str::FromStr for ViewMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "remaining" => Ok(Self::Remaining),
            "fullyear" | "full-year" | "full" => Ok(Self::FullYear),
            other => Err(anyhow!("unknown view mode: {other}")),
        }
    }
}

impl std::fmt::Display for ViewMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remaining => write!(f, "remaining"),
            Self::FullYear => write!(f, "fullYear"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    He,
}

impl Language {
    /// Text direction the hosting surface must apply: Hebrew is RTL.
    pub fn direction(self) -> TextDirection {
        match self {
            Self::En => TextDirection::Ltr,
            Self::He => TextDirection::Rtl,
        }
    }
}

impl std::str::FromStr for Language {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "en" => Ok(Self::En),
            "he" => Ok(Self::He),
            other => Err(anyhow!("unknown language: {other}")),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::En => write!(f, "en"),
            Self::He => write!(f, "he"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextDirection {
    Ltr,
    Rtl,
}

impl std::fmt::Display for TextDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ltr => write!(f, "ltr"),
            Self::Rtl => write!(f, "rtl"),
        }
    }
}

fn default_last_year() -> i32 {
    Local::now().year()
}

fn default_zoom() -> f64 {
    DEFAULT_ZOOM
}

/// Persisted singleton of user settings. Every field has a decode default so
/// partially-written or older records still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default)]
    pub last_view_mode: ViewMode,
    #[serde(default = "default_last_year")]
    pub last_year: i32,
    #[serde(default = "default_zoom")]
    pub zoom: f64,
    #[serde(default)]
    pub language: Language,
}

impl Preferences {
    pub fn defaults(year: i32) -> Self {
        Self {
            last_view_mode: ViewMode::Remaining,
            last_year: year,
            zoom: DEFAULT_ZOOM,
            language: Language::En,
        }
    }
}

/// What a day-click performs. Transient UI state, never persisted.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ActiveTool {
    #[default]
    Select,
    /// Pending background color.
    Color(String),
    /// Pending image payload.
    Image { src: String, width: f64, height: f64 },
    /// Pending text content.
    Text(String),
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn empty_year_covers_the_whole_calendar() {
        let common = YearData::empty(2026);
        assert_eq!(common.months.len(), 12);
        assert_eq!(common.day_count(), 365);

        let leap = YearData::empty(2024);
        assert_eq!(leap.months.len(), 12);
        assert_eq!(leap.day_count(), 366);

        assert!(common.find_day("2026-01-01").is_some());
        assert!(common.find_day("2026-12-31").is_some());
        assert!(common.find_day("2026-02-29").is_none());
        assert!(leap.find_day("2024-02-29").is_some());
    }

    #[test]
    fn month_days_are_contiguous_and_agree_with_month_header() {
        let year = YearData::empty(2026);
        for month in &year.months {
            assert_eq!(month.year, 2026);
            for (idx, day) in month.days.iter().enumerate() {
                let expected = format!("2026-{:02}-{:02}", month.month_index + 1, idx + 1);
                assert_eq!(day.date, expected);
                assert!(day.objects.is_empty());
                assert!(day.background_color.is_none());
                assert!(!day.has_day_detail);
            }
        }
    }

    #[test]
    fn replace_day_targets_one_day_and_shares_the_rest() {
        let year = YearData::empty(2026);
        let updated = year.replace_day(
            "2026-03-05",
            &DayPatch::background(Some("#fff".to_string())),
        );

        let day = updated.find_day("2026-03-05").expect("day exists");
        assert_eq!(day.background_color.as_deref(), Some("#fff"));
        assert_eq!(
            year.find_day("2026-03-05")
                .expect("original day")
                .background_color,
            None
        );

        for (before, after) in year.months.iter().zip(updated.months.iter()) {
            if before.month_index == 2 {
                assert!(!Arc::ptr_eq(before, after));
            } else {
                assert!(Arc::ptr_eq(before, after));
            }
        }
    }

    #[test]
    fn replace_day_on_unknown_key_is_a_structural_noop() {
        let year = YearData::empty(2026);
        let updated = year.replace_day("2027-01-01", &DayPatch::detail_flag(true));
        assert_eq!(updated, year);
        for (before, after) in year.months.iter().zip(updated.months.iter()) {
            assert!(Arc::ptr_eq(before, after));
        }
    }

    #[test]
    fn object_helpers_compose_replace_day() {
        let year = YearData::empty(2026);
        let text = CalendarObject::new_text("hi".to_string(), 2.0, 3.0, 12.0, None);
        let id = text.id();

        let with_object = year.push_object("2026-06-10", text);
        assert_eq!(
            with_object.find_day("2026-06-10").expect("day").objects.len(),
            1
        );

        let moved = with_object.update_object("2026-06-10", id, |object| {
            object.set_position(9.0, 9.0);
        });
        let day = moved.find_day("2026-06-10").expect("day");
        assert_eq!(day.objects[0].position(), (9.0, 9.0));

        let removed = moved.remove_object("2026-06-10", id);
        assert!(removed.find_day("2026-06-10").expect("day").objects.is_empty());

        // Unknown ids and dates leave everything untouched.
        assert_eq!(moved.remove_object("2026-06-10", Uuid::new_v4()), moved);
        assert_eq!(moved.update_object("2031-01-01", id, |_| {}), moved);
        assert_eq!(
            moved.push_object(
                "2031-01-01",
                CalendarObject::new_text("x".to_string(), 0.0, 0.0, 10.0, None)
            ),
            moved
        );
    }

    #[test]
    fn insertion_order_is_preserved_for_stacking() {
        let mut year = YearData::empty(2026);
        let mut ids = Vec::new();
        for i in 0..3 {
            let object =
                CalendarObject::new_text(format!("t{i}"), 0.0, 0.0, 10.0, None);
            ids.push(object.id());
            year = year.push_object("2026-01-15", object);
        }
        let day = year.find_day("2026-01-15").expect("day");
        let stored: Vec<Uuid> = day.objects.iter().map(CalendarObject::id).collect();
        assert_eq!(stored, ids);
    }

    #[test]
    fn year_snapshot_round_trips_through_json() {
        let mut year = YearData::empty(2024);
        year = year.replace_day(
            "2024-02-29",
            &DayPatch::background(Some("#abcdef".to_string())),
        );
        year = year.push_object(
            "2024-02-29",
            CalendarObject::new_png("cat.png".to_string(), 1.0, 2.0, 32.0, 32.0),
        );
        year = year.push_object(
            "2024-07-01",
            CalendarObject::new_text("עברית".to_string(), 0.0, 0.0, 14.0, Some("#333".to_string())),
        );

        let raw = serde_json::to_string(&year).expect("serialize");
        let back: YearData = serde_json::from_str(&raw).expect("deserialize");
        assert_eq!(back, year);
    }

    #[test]
    fn object_tags_match_the_wire_shape() {
        let png = CalendarObject::new_png("a.png".to_string(), 0.0, 0.0, 10.0, 10.0);
        let value = serde_json::to_value(&png).expect("serialize");
        assert_eq!(value["type"], "png");
        assert!(value.get("rotation").is_none());

        let text = CalendarObject::new_text("x".to_string(), 0.0, 0.0, 12.0, None);
        let value = serde_json::to_value(&text).expect("serialize");
        assert_eq!(value["type"], "text");
        assert_eq!(value["fontSize"], 12.0);
    }

    #[test]
    fn detail_content_predicate() {
        let mut detail = DayDetail::new("2026-03-05");
        assert!(!detail.has_content());

        detail.notes = Some("   ".to_string());
        assert!(!detail.has_content());

        detail.notes = Some("remember".to_string());
        assert!(detail.has_content());

        detail.notes = None;
        detail.checklist.push(ChecklistItem {
            id: Uuid::new_v4(),
            text: "Buy milk".to_string(),
            done: false,
            created_at: Utc::now(),
            order: 0,
        });
        assert!(detail.has_content());
    }

    #[test]
    fn checklist_manual_order_overrides_insertion() {
        let mut detail = DayDetail::new("2026-03-05");
        for (text, order) in [("second", 1), ("first", 0), ("third", 2)] {
            detail.checklist.push(ChecklistItem {
                id: Uuid::new_v4(),
                text: text.to_string(),
                done: false,
                created_at: Utc::now(),
                order,
            });
        }
        let sorted: Vec<&str> = detail
            .checklist_sorted()
            .iter()
            .map(|item| item.text.as_str())
            .collect();
        assert_eq!(sorted, vec!["first", "second", "third"]);
    }

    #[test]
    fn preferences_decode_fills_defaults() {
        let prefs: Preferences = serde_json::from_str("{}").expect("decode empty record");
        assert_eq!(prefs.last_view_mode, ViewMode::Remaining);
        assert_eq!(prefs.language, Language::En);
        assert!((prefs.zoom - DEFAULT_ZOOM).abs() < f64::EPSILON);

        let prefs: Preferences =
            serde_json::from_str(r#"{"lastViewMode":"fullYear","lastYear":2027,"language":"he"}"#)
                .expect("decode partial record");
        assert_eq!(prefs.last_view_mode, ViewMode::FullYear);
        assert_eq!(prefs.last_year, 2027);
        assert_eq!(prefs.language, Language::He);
        assert_eq!(prefs.language.direction(), TextDirection::Rtl);
    }

    #[test]
    fn zoom_clamps_to_bounds() {
        assert!((clamp_zoom(3.0) - MAX_ZOOM).abs() < f64::EPSILON);
        assert!((clamp_zoom(-1.0) - MIN_ZOOM).abs() < f64::EPSILON);
        assert!((clamp_zoom(1.25) - 1.25).abs() < f64::EPSILON);
    }
}
