use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::model::{
    ActiveTool, CalendarObject, ChecklistItem, DayDetail, DayPatch, DetailPatch, Language,
    Preferences, TextDirection, ViewMode, YearData, clamp_zoom,
};
use crate::storage::{DetailMap, Storage};

/// Everything a consumer may read. Snapshots handed to subscribers are
/// borrowed immutably; mutation happens only through store actions.
#[derive(Debug)]
pub struct AppState {
    pub current_year: i32,
    pub year_data: YearData,
    pub view_mode: ViewMode,
    pub zoom: f64,
    pub language: Language,
    /// Direction the hosting surface must apply; follows `language`.
    pub direction: TextDirection,
    pub day_details: DetailMap,
    pub selected_date: Option<String>,
    pub active_tool: ActiveTool,
    pub is_loading: bool,
}

type Subscriber = Box<dyn FnMut(&AppState)>;

/// The single process-wide state container. Owns the year snapshot, the
/// detail map, view preferences and the transient tool/selection state, and
/// writes through to [`Storage`] after every mutation.
///
/// Actions run synchronously to completion; none of them surfaces a storage
/// failure (the gateway logs and swallows those).
pub struct CalendarStore {
    storage: Storage,
    state: AppState,
    subscribers: Vec<Subscriber>,
}

impl CalendarStore {
    pub fn new(storage: Storage, today_year: i32) -> Self {
        let state = AppState {
            current_year: today_year,
            year_data: YearData::empty(today_year),
            view_mode: ViewMode::default(),
            zoom: crate::model::DEFAULT_ZOOM,
            language: Language::default(),
            direction: Language::default().direction(),
            day_details: BTreeMap::new(),
            selected_date: None,
            active_tool: ActiveTool::default(),
            is_loading: false,
        };
        Self {
            storage,
            state,
            subscribers: Vec::new(),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn subscribe(&mut self, subscriber: Subscriber) {
        self.subscribers.push(subscriber);
    }

    fn notify(&mut self) {
        for subscriber in &mut self.subscribers {
            subscriber(&self.state);
        }
    }

    /// Preferences are derived from live state, so a save can never drift
    /// from what the session actually shows.
    fn preferences(&self) -> Preferences {
        Preferences {
            last_view_mode: self.state.view_mode,
            last_year: self.state.current_year,
            zoom: self.state.zoom,
            language: self.state.language,
        }
    }

    fn load_or_create_year(&self, year: i32) -> YearData {
        match self.storage.load_year(year) {
            Some(data) => data,
            None => {
                let fresh = YearData::empty(year);
                self.storage.save_year(&fresh);
                fresh
            }
        }
    }

    /// One-time startup: preferences (or defaults for `today_year`), the
    /// last viewed year (or a fresh one), the full detail map.
    #[instrument(skip(self))]
    pub fn initialize(&mut self, today_year: i32) {
        self.state.is_loading = true;
        self.notify();

        let prefs = self
            .storage
            .load_preferences()
            .unwrap_or_else(|| Preferences::defaults(today_year));
        let year_data = self.load_or_create_year(prefs.last_year);
        let day_details = self.storage.load_day_details();

        self.state.current_year = prefs.last_year;
        self.state.year_data = year_data;
        self.state.view_mode = prefs.last_view_mode;
        self.state.zoom = clamp_zoom(prefs.zoom);
        self.state.language = prefs.language;
        self.state.direction = prefs.language.direction();
        self.state.day_details = day_details;
        self.state.is_loading = false;

        info!(year = self.state.current_year, "store initialized");
        self.notify();
    }

    /// Persists the outgoing year before loading the incoming one; that
    /// ordering is what makes rapid year switches safe.
    #[instrument(skip(self))]
    pub fn set_year(&mut self, year: i32) {
        self.state.is_loading = true;
        self.notify();

        self.storage.save_year(&self.state.year_data);

        let year_data = self.load_or_create_year(year);
        self.state.current_year = year;
        self.state.year_data = year_data;
        self.state.is_loading = false;

        self.storage.save_preferences(&self.preferences());
        info!(year, "switched year");
        self.notify();
    }

    #[instrument(skip(self))]
    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.state.view_mode = mode;
        self.storage.save_preferences(&self.preferences());
        self.notify();
    }

    #[instrument(skip(self))]
    pub fn set_zoom(&mut self, zoom: f64) {
        self.state.zoom = clamp_zoom(zoom);
        self.storage.save_preferences(&self.preferences());
        self.notify();
    }

    #[instrument(skip(self))]
    pub fn set_language(&mut self, language: Language) {
        self.state.language = language;
        self.state.direction = language.direction();
        self.storage.save_preferences(&self.preferences());
        self.notify();
    }

    /// Pure in-memory switch of the pending day-click behavior.
    pub fn set_active_tool(&mut self, tool: ActiveTool) {
        self.state.active_tool = tool;
        self.notify();
    }

    /// Opens (or closes, with `None`) a day for detail editing. Does not
    /// touch calendar data.
    pub fn select_date(&mut self, date: Option<String>) {
        self.state.selected_date = date;
        self.notify();
    }

    fn install_year_data(&mut self, updated: YearData) {
        self.state.year_data = updated;
        self.storage.save_year(&self.state.year_data);
        self.notify();
    }

    /// The single choke point for visual mutations: every background, object
    /// or flag change flows through `replace_day` and lands here.
    #[instrument(skip(self, patch))]
    pub fn update_day_visual(&mut self, date: &str, patch: &DayPatch) {
        let updated = self.state.year_data.replace_day(date, patch);
        self.install_year_data(updated);
    }

    pub fn set_day_background_color(&mut self, date: &str, color: Option<String>) {
        self.update_day_visual(date, &DayPatch::background(color));
    }

    /// Clears background and decorations; the detail record (and its flag)
    /// are left alone.
    pub fn clear_day(&mut self, date: &str) {
        self.update_day_visual(date, &DayPatch::cleared());
    }

    /// Appends a decoration and returns its assigned id.
    #[instrument(skip(self, object), fields(id = %object.id()))]
    pub fn add_object_to_day(&mut self, date: &str, object: CalendarObject) -> Uuid {
        let id = object.id();
        let updated = self.state.year_data.push_object(date, object);
        self.install_year_data(updated);
        id
    }

    #[instrument(skip(self, f))]
    pub fn update_object<F>(&mut self, date: &str, id: Uuid, f: F)
    where
        F: FnOnce(&mut CalendarObject),
    {
        let updated = self.state.year_data.update_object(date, id, f);
        self.install_year_data(updated);
    }

    #[instrument(skip(self))]
    pub fn remove_object(&mut self, date: &str, id: Uuid) {
        let updated = self.state.year_data.remove_object(date, id);
        self.install_year_data(updated);
    }

    /// Merges into the detail record (creating it lazily), stamps
    /// `last_modified`, persists the whole map, then recomputes the derived
    /// `has_day_detail` flag and routes it through [`Self::update_day_visual`].
    /// This is the one place the two entities are kept consistent.
    #[instrument(skip(self, patch))]
    pub fn update_day_detail(&mut self, date: &str, patch: DetailPatch, now: DateTime<Utc>) {
        let mut detail = self
            .state
            .day_details
            .get(date)
            .cloned()
            .unwrap_or_else(|| DayDetail::new(date));
        if let Some(checklist) = patch.checklist {
            detail.checklist = checklist;
        }
        if let Some(notes) = patch.notes {
            detail.notes = Some(notes);
        }
        detail.last_modified = Some(now);
        let has_content = detail.has_content();

        self.state.day_details.insert(date.to_string(), detail);
        self.storage.save_day_details(&self.state.day_details);

        self.update_day_visual(date, &DayPatch::detail_flag(has_content));
    }

    /// Appends a checklist item; `order` is the current list length.
    #[instrument(skip(self, text))]
    pub fn add_checklist_item(&mut self, date: &str, text: &str, now: DateTime<Utc>) -> Uuid {
        let current = self.state.day_details.get(date);
        let order = current
            .map(|detail| u32::try_from(detail.checklist.len()).unwrap_or(u32::MAX))
            .unwrap_or(0);
        let item = ChecklistItem {
            id: Uuid::new_v4(),
            text: text.to_string(),
            done: false,
            created_at: now,
            order,
        };
        let id = item.id;

        let mut checklist = current
            .map(|detail| detail.checklist.clone())
            .unwrap_or_default();
        checklist.push(item);
        self.update_day_detail(date, DetailPatch::checklist(checklist), now);
        id
    }

    #[instrument(skip(self))]
    pub fn toggle_checklist_item(&mut self, date: &str, id: Uuid, now: DateTime<Utc>) {
        let Some(detail) = self.state.day_details.get(date) else {
            debug!(date, "toggle on unknown detail; ignoring");
            return;
        };
        if !detail.checklist.iter().any(|item| item.id == id) {
            debug!(date, %id, "toggle on unknown item; ignoring");
            return;
        }
        let checklist = detail
            .checklist
            .iter()
            .cloned()
            .map(|mut item| {
                if item.id == id {
                    item.done = !item.done;
                }
                item
            })
            .collect();
        self.update_day_detail(date, DetailPatch::checklist(checklist), now);
    }

    #[instrument(skip(self))]
    pub fn delete_checklist_item(&mut self, date: &str, id: Uuid, now: DateTime<Utc>) {
        let Some(detail) = self.state.day_details.get(date) else {
            debug!(date, "delete on unknown detail; ignoring");
            return;
        };
        if !detail.checklist.iter().any(|item| item.id == id) {
            debug!(date, %id, "delete on unknown item; ignoring");
            return;
        }
        let checklist = detail
            .checklist
            .iter()
            .filter(|item| item.id != id)
            .cloned()
            .collect();
        self.update_day_detail(date, DetailPatch::checklist(checklist), now);
    }

    #[instrument(skip(self, text))]
    pub fn rename_checklist_item(&mut self, date: &str, id: Uuid, text: &str, now: DateTime<Utc>) {
        let Some(detail) = self.state.day_details.get(date) else {
            debug!(date, "rename on unknown detail; ignoring");
            return;
        };
        if !detail.checklist.iter().any(|item| item.id == id) {
            debug!(date, %id, "rename on unknown item; ignoring");
            return;
        }
        let checklist = detail
            .checklist
            .iter()
            .cloned()
            .map(|mut item| {
                if item.id == id {
                    item.text = text.to_string();
                }
                item
            })
            .collect();
        self.update_day_detail(date, DetailPatch::checklist(checklist), now);
    }

    #[instrument(skip(self, notes))]
    pub fn set_day_notes(&mut self, date: &str, notes: &str, now: DateTime<Utc>) {
        self.update_day_detail(date, DetailPatch::notes(notes.to_string()), now);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use tempfile::tempdir;

    use super::*;

    fn fresh_store(dir: &std::path::Path) -> CalendarStore {
        let storage = Storage::open(dir).expect("open storage");
        CalendarStore::new(storage, 2026)
    }

    #[test]
    fn subscribers_observe_loading_edges() {
        let temp = tempdir().expect("tempdir");
        let mut store = fresh_store(temp.path());

        let seen: Rc<RefCell<Vec<bool>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        store.subscribe(Box::new(move |state| {
            sink.borrow_mut().push(state.is_loading);
        }));

        store.initialize(2026);
        assert_eq!(*seen.borrow(), vec![true, false]);
        assert!(!store.state().is_loading);
    }

    #[test]
    fn active_tool_and_selection_are_memory_only() {
        let temp = tempdir().expect("tempdir");
        let mut store = fresh_store(temp.path());
        store.initialize(2026);

        store.set_active_tool(ActiveTool::Color("#f00".to_string()));
        store.select_date(Some("2026-04-01".to_string()));
        assert_eq!(
            store.state().active_tool,
            ActiveTool::Color("#f00".to_string())
        );
        assert_eq!(store.state().selected_date.as_deref(), Some("2026-04-01"));

        // Nothing of the tool or selection reaches the preferences record.
        let storage = Storage::open(temp.path()).expect("reopen");
        let prefs = storage.load_preferences();
        assert!(prefs.is_none() || prefs.is_some_and(|p| p.last_year == 2026));

        store.select_date(None);
        assert!(store.state().selected_date.is_none());
    }

    #[test]
    fn toggle_twice_returns_to_original_state() {
        let temp = tempdir().expect("tempdir");
        let mut store = fresh_store(temp.path());
        store.initialize(2026);

        let now = Utc::now();
        let id = store.add_checklist_item("2026-03-05", "Buy milk", now);

        let done_of = |store: &CalendarStore| {
            store.state().day_details["2026-03-05"]
                .checklist
                .iter()
                .find(|item| item.id == id)
                .map(|item| item.done)
        };

        assert_eq!(done_of(&store), Some(false));
        store.toggle_checklist_item("2026-03-05", id, now);
        assert_eq!(done_of(&store), Some(true));
        store.toggle_checklist_item("2026-03-05", id, now);
        assert_eq!(done_of(&store), Some(false));

        // Unknown ids never create or disturb records.
        store.toggle_checklist_item("2026-03-05", Uuid::new_v4(), now);
        store.toggle_checklist_item("1999-01-01", id, now);
        assert_eq!(store.state().day_details.len(), 1);
    }

    #[test]
    fn checklist_orders_are_appended_without_gap_filling() {
        let temp = tempdir().expect("tempdir");
        let mut store = fresh_store(temp.path());
        store.initialize(2026);

        let now = Utc::now();
        let first = store.add_checklist_item("2026-07-07", "one", now);
        store.add_checklist_item("2026-07-07", "two", now);
        store.delete_checklist_item("2026-07-07", first, now);
        store.add_checklist_item("2026-07-07", "three", now);

        let orders: Vec<u32> = store.state().day_details["2026-07-07"]
            .checklist
            .iter()
            .map(|item| item.order)
            .collect();
        // "three" reuses length-based order 1; no renumbering of survivors.
        assert_eq!(orders, vec![1, 1]);
    }

    #[test]
    fn notes_alone_control_the_detail_flag() {
        let temp = tempdir().expect("tempdir");
        let mut store = fresh_store(temp.path());
        store.initialize(2026);

        let now = Utc::now();
        store.set_day_notes("2026-09-09", "call home", now);
        assert!(
            store
                .state()
                .year_data
                .find_day("2026-09-09")
                .expect("day")
                .has_day_detail
        );

        store.set_day_notes("2026-09-09", "   ", now);
        assert!(
            !store
                .state()
                .year_data
                .find_day("2026-09-09")
                .expect("day")
                .has_day_detail
        );
        // The emptied record lingers; only its derived flag went false.
        assert!(store.state().day_details.contains_key("2026-09-09"));
        assert!(
            store.state().day_details["2026-09-09"]
                .last_modified
                .is_some()
        );
    }

    #[test]
    fn zoom_is_clamped_at_the_action_boundary() {
        let temp = tempdir().expect("tempdir");
        let mut store = fresh_store(temp.path());
        store.initialize(2026);

        store.set_zoom(3.0);
        assert!((store.state().zoom - 2.0).abs() < f64::EPSILON);
        store.set_zoom(-1.0);
        assert!((store.state().zoom - 0.5).abs() < f64::EPSILON);

        let storage = Storage::open(temp.path()).expect("reopen");
        let prefs = storage.load_preferences().expect("prefs saved");
        assert!((prefs.zoom - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn language_switch_updates_direction_and_preferences() {
        let temp = tempdir().expect("tempdir");
        let mut store = fresh_store(temp.path());
        store.initialize(2026);
        assert_eq!(store.state().direction, TextDirection::Ltr);

        store.set_language(Language::He);
        assert_eq!(store.state().direction, TextDirection::Rtl);

        let storage = Storage::open(temp.path()).expect("reopen");
        assert_eq!(
            storage.load_preferences().expect("prefs").language,
            Language::He
        );
    }
}
