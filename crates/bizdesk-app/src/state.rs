// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeMap;

use crate::{
    CommitTicket, DateFilter, FilterState, NumericRange, Overlay, OverlayEvent, PanelMode,
    PlacementOptions, Record, Selection, Size, SortSpec, SortState, TriggerGeometry, ViewCache,
};

/// What a floating panel in a list view is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelTarget<F> {
    Filter(F),
    Edit { record_id: i64, field: F },
}

impl<F> PanelTarget<F> {
    const fn mode(&self) -> PanelMode {
        match self {
            Self::Filter(_) => PanelMode::Filter,
            Self::Edit { .. } => PanelMode::InlineEdit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FetchTicket(u64);

impl FetchTicket {
    pub const fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCommit<F> {
    pub ticket: CommitTicket,
    pub record_id: i64,
    pub field: F,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListCommand<F> {
    SetQuery(String),
    ToggleValue {
        field: F,
        value: String,
    },
    SetSelection {
        field: F,
        selection: Selection,
    },
    SetRange {
        field: F,
        range: NumericRange,
    },
    SetDateRange(Option<DateFilter<F>>),
    ToggleSort(F),
    ClearSort,
    /// Resets filters and sort to their mount-time defaults.
    ClearFilters,
    Refresh,
    OpenPanel {
        target: PanelTarget<F>,
        trigger: TriggerGeometry,
        size: Size,
        viewport: Size,
    },
    PointerDown {
        x: i32,
        y: i32,
    },
    CancelPanel,
    /// `value` is the choice an inline editor commits; filter panels ignore it.
    ConfirmPanel {
        value: Option<String>,
    },
    ShowNotice(Notice),
    ClearNotice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEvent<F> {
    FiltersChanged { active: usize },
    SortChanged(Option<SortSpec<F>>),
    FetchRequested(FetchTicket),
    FetchIgnored(FetchTicket),
    RowsReplaced { count: usize },
    Panel(OverlayEvent<PanelTarget<F>>),
    CommitRequested(PendingCommit<F>),
    CommitSucceeded(CommitTicket),
    CommitIgnored(CommitTicket),
    NoticeUpdated(Notice),
    NoticeCleared,
}

/// View-level state of one list screen: the latest fetched snapshot, the
/// user's filters and sort, and its floating panel.
#[derive(Debug, Clone)]
pub struct ListViewState<R: Record> {
    records: Vec<R>,
    generation: u64,
    filters: FilterState<R::Field>,
    sort: SortState<R::Field>,
    cache: ViewCache<R::Field>,
    overlay: Overlay<PanelTarget<R::Field>>,
    issued_fetch: u64,
    applied_fetch: u64,
    pending_commits: BTreeMap<CommitTicket, PendingCommit<R::Field>>,
    notice: Option<Notice>,
}

impl<R: Record> Default for ListViewState<R> {
    fn default() -> Self {
        Self::new(PlacementOptions::default())
    }
}

impl<R: Record> ListViewState<R> {
    pub fn new(options: PlacementOptions) -> Self {
        Self {
            records: Vec::new(),
            generation: 0,
            filters: FilterState::default(),
            sort: SortState::default(),
            cache: ViewCache::default(),
            overlay: Overlay::new(options),
            issued_fetch: 0,
            applied_fetch: 0,
            pending_commits: BTreeMap::new(),
            notice: None,
        }
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn filters(&self) -> &FilterState<R::Field> {
        &self.filters
    }

    pub fn sort(&self) -> &SortState<R::Field> {
        &self.sort
    }

    pub fn overlay(&self) -> &Overlay<PanelTarget<R::Field>> {
        &self.overlay
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.issued_fetch > self.applied_fetch
    }

    pub fn pending_commits(&self) -> usize {
        self.pending_commits.len()
    }

    pub fn visible_indices(&mut self) -> &[usize] {
        self.cache
            .indices(self.generation, &self.records, &self.filters, &self.sort)
    }

    pub fn visible_rows(&mut self) -> Vec<&R> {
        let indices = self
            .cache
            .indices(self.generation, &self.records, &self.filters, &self.sort);
        indices.iter().map(|index| &self.records[*index]).collect()
    }

    pub fn dispatch(&mut self, command: ListCommand<R::Field>) -> Vec<ListEvent<R::Field>> {
        match command {
            ListCommand::SetQuery(query) => {
                self.filters.set_query(query);
                vec![self.filters_changed()]
            }
            ListCommand::ToggleValue { field, value } => {
                self.filters.toggle_value(field, &value);
                vec![self.filters_changed()]
            }
            ListCommand::SetSelection { field, selection } => {
                self.filters.set_selection(field, selection);
                vec![self.filters_changed()]
            }
            ListCommand::SetRange { field, range } => {
                self.filters.set_range(field, range);
                vec![self.filters_changed()]
            }
            ListCommand::SetDateRange(filter) => {
                self.filters.set_date_range(filter);
                vec![self.filters_changed()]
            }
            ListCommand::ToggleSort(field) => {
                let spec = self.sort.toggle(field);
                vec![ListEvent::SortChanged(Some(spec))]
            }
            ListCommand::ClearSort => {
                self.sort.clear();
                vec![ListEvent::SortChanged(None)]
            }
            ListCommand::ClearFilters => {
                self.filters.clear();
                self.sort.clear();
                vec![self.filters_changed(), ListEvent::SortChanged(None)]
            }
            ListCommand::Refresh => vec![ListEvent::FetchRequested(self.begin_fetch())],
            ListCommand::OpenPanel {
                target,
                trigger,
                size,
                viewport,
            } => self
                .overlay
                .open(target, target.mode(), trigger, size, viewport)
                .into_iter()
                .map(ListEvent::Panel)
                .collect(),
            ListCommand::PointerDown { x, y } => {
                self.overlay.pointer_down(x, y).map(ListEvent::Panel).into_iter().collect()
            }
            ListCommand::CancelPanel => {
                self.overlay.cancel().map(ListEvent::Panel).into_iter().collect()
            }
            ListCommand::ConfirmPanel { value } => self.confirm_panel(value),
            ListCommand::ShowNotice(notice) => vec![self.set_notice(notice)],
            ListCommand::ClearNotice => {
                self.notice = None;
                vec![ListEvent::NoticeCleared]
            }
        }
    }

    /// Issues a ticket for a new fetch of this view's collection.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.issued_fetch += 1;
        FetchTicket(self.issued_fetch)
    }

    /// Applies a fetch result unless a newer one was already applied.
    ///
    /// A failed fetch leaves the view empty and raises an error notice.
    pub fn apply_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<R>, String>,
    ) -> Vec<ListEvent<R::Field>> {
        if ticket.0 <= self.applied_fetch {
            return vec![ListEvent::FetchIgnored(ticket)];
        }
        self.applied_fetch = ticket.0;
        self.generation += 1;

        match result {
            Ok(records) => {
                self.records = records;
                vec![ListEvent::RowsReplaced {
                    count: self.records.len(),
                }]
            }
            Err(message) => {
                self.records.clear();
                vec![
                    ListEvent::RowsReplaced { count: 0 },
                    self.set_notice(Notice::error(format!("load failed: {message}"))),
                ]
            }
        }
    }

    /// Settles an inline-edit commit. Success asks for a refetch instead of
    /// patching local rows; failure leaves the rows untouched.
    pub fn finish_commit(
        &mut self,
        ticket: CommitTicket,
        result: Result<(), String>,
    ) -> Vec<ListEvent<R::Field>> {
        let Some(pending) = self.pending_commits.remove(&ticket) else {
            return vec![ListEvent::CommitIgnored(ticket)];
        };

        let mut events = Vec::new();
        if let Some(event) = self.overlay.resolve(ticket) {
            events.push(ListEvent::Panel(event));
        }
        match result {
            Ok(()) => {
                events.push(ListEvent::CommitSucceeded(ticket));
                events.push(self.set_notice(Notice::info(format!(
                    "saved {} on #{}",
                    pending.value, pending.record_id
                ))));
                events.push(ListEvent::FetchRequested(self.begin_fetch()));
            }
            Err(message) => {
                let message = if message.trim().is_empty() {
                    "save failed -- try again".to_owned()
                } else {
                    message
                };
                events.push(self.set_notice(Notice::error(message)));
            }
        }
        events
    }

    fn confirm_panel(&mut self, value: Option<String>) -> Vec<ListEvent<R::Field>> {
        let Some(panel) = self.overlay.panel() else {
            return Vec::new();
        };
        let target = panel.owner;
        if let PanelTarget::Edit { record_id, field } = target
            && !self.overlay.is_saving()
            && self
                .pending_commits
                .values()
                .any(|pending| pending.record_id == record_id && pending.field == field)
        {
            let notice =
                Notice::error(format!("previous save on #{record_id} is still in progress"));
            return vec![
                ListEvent::Panel(OverlayEvent::Busy(target)),
                self.set_notice(notice),
            ];
        }
        let value = match (target, value) {
            (PanelTarget::Edit { .. }, None) if !self.overlay.is_saving() => {
                return vec![self.set_notice(Notice::error("pick a value before saving"))];
            }
            (_, value) => value.unwrap_or_default(),
        };

        match self.overlay.confirm() {
            Some(OverlayEvent::SaveStarted { owner, ticket }) => {
                let PanelTarget::Edit { record_id, field } = owner else {
                    return vec![ListEvent::Panel(OverlayEvent::SaveStarted { owner, ticket })];
                };
                let pending = PendingCommit {
                    ticket,
                    record_id,
                    field,
                    value,
                };
                self.pending_commits.insert(ticket, pending.clone());
                vec![
                    ListEvent::Panel(OverlayEvent::SaveStarted { owner, ticket }),
                    ListEvent::CommitRequested(pending),
                ]
            }
            Some(event) => vec![ListEvent::Panel(event)],
            None => Vec::new(),
        }
    }

    fn filters_changed(&self) -> ListEvent<R::Field> {
        ListEvent::FiltersChanged {
            active: self.filters.active_count(),
        }
    }

    fn set_notice(&mut self, notice: Notice) -> ListEvent<R::Field> {
        self.notice = Some(notice.clone());
        ListEvent::NoticeUpdated(notice)
    }
}

#[cfg(test)]
mod tests {
    use super::{ListCommand, ListEvent, ListViewState, Notice, NoticeLevel, PanelTarget};
    use crate::{
        CloseReason, FieldValue, OverlayEvent, Record, Selection, Size, SortDirection,
        TriggerGeometry,
    };

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    enum Column {
        Name,
        Role,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: i64,
        name: &'static str,
        role: &'static str,
    }

    impl Record for Row {
        type Field = Column;

        fn id(&self) -> i64 {
            self.id
        }

        fn value(&self, field: Column) -> FieldValue {
            match field {
                Column::Name => FieldValue::text(self.name),
                Column::Role => FieldValue::text(self.role),
            }
        }

        fn search_text(&self) -> String {
            self.name.to_owned()
        }
    }

    fn rows() -> Vec<Row> {
        vec![
            Row {
                id: 1,
                name: "Alice",
                role: "admin",
            },
            Row {
                id: 2,
                name: "Bob",
                role: "member",
            },
        ]
    }

    fn loaded() -> ListViewState<Row> {
        let mut state = ListViewState::default();
        let ticket = state.begin_fetch();
        state.apply_fetch(ticket, Ok(rows()));
        state
    }

    fn open_edit(state: &mut ListViewState<Row>, record_id: i64) {
        state.dispatch(ListCommand::OpenPanel {
            target: PanelTarget::Edit {
                record_id,
                field: Column::Role,
            },
            trigger: TriggerGeometry::from_origin(10, 10, 20, 2),
            size: Size::new(30, 8),
            viewport: Size::new(120, 40),
        });
    }

    fn names(state: &mut ListViewState<Row>) -> Vec<&'static str> {
        state.visible_rows().iter().map(|row| row.name).collect()
    }

    #[test]
    fn filter_commands_narrow_visible_rows() {
        let mut state = loaded();
        let events = state.dispatch(ListCommand::ToggleValue {
            field: Column::Role,
            value: "admin".to_owned(),
        });
        assert_eq!(events, vec![ListEvent::FiltersChanged { active: 1 }]);
        assert_eq!(names(&mut state), vec!["Alice"]);

        state.dispatch(ListCommand::SetSelection {
            field: Column::Role,
            selection: Selection::Any,
        });
        assert_eq!(names(&mut state), vec!["Alice", "Bob"]);
    }

    #[test]
    fn clear_filters_resets_sort_too() {
        let mut state = loaded();
        state.dispatch(ListCommand::SetQuery("bo".to_owned()));
        state.dispatch(ListCommand::ToggleSort(Column::Name));
        assert_eq!(names(&mut state), vec!["Bob"]);

        let events = state.dispatch(ListCommand::ClearFilters);
        assert_eq!(
            events,
            vec![
                ListEvent::FiltersChanged { active: 0 },
                ListEvent::SortChanged(None),
            ]
        );
        assert!(state.filters().is_empty());
        assert_eq!(state.sort().spec(), None);
        assert_eq!(names(&mut state), vec!["Alice", "Bob"]);
    }

    #[test]
    fn toggle_sort_reports_direction() {
        let mut state = loaded();
        state.dispatch(ListCommand::ToggleSort(Column::Name));
        let events = state.dispatch(ListCommand::ToggleSort(Column::Name));
        let [ListEvent::SortChanged(Some(spec))] = events.as_slice() else {
            panic!("expected sort change, got {events:?}");
        };
        assert_eq!(spec.direction, SortDirection::Desc);
        assert_eq!(names(&mut state), vec!["Bob", "Alice"]);
    }

    #[test]
    fn stale_fetch_results_are_ignored() {
        let mut state = ListViewState::<Row>::default();
        let first = state.begin_fetch();
        let second = state.begin_fetch();
        assert!(state.is_loading());

        state.apply_fetch(second, Ok(rows()));
        let events = state.apply_fetch(first, Ok(Vec::new()));
        assert_eq!(events, vec![ListEvent::FetchIgnored(first)]);
        assert_eq!(state.records().len(), 2);
        assert!(!state.is_loading());
    }

    #[test]
    fn older_fetch_arriving_first_is_replaced_by_newer() {
        let mut state = ListViewState::<Row>::default();
        let first = state.begin_fetch();
        let second = state.begin_fetch();
        state.apply_fetch(first, Ok(rows()[..1].to_vec()));
        assert!(state.is_loading());
        state.apply_fetch(second, Ok(rows()));
        assert_eq!(state.records().len(), 2);
    }

    #[test]
    fn failed_fetch_shows_empty_list_and_error() {
        let mut state = loaded();
        let ticket = state.begin_fetch();
        let events = state.apply_fetch(ticket, Err("server returned 503".to_owned()));
        assert_eq!(
            events,
            vec![
                ListEvent::RowsReplaced { count: 0 },
                ListEvent::NoticeUpdated(Notice::error("load failed: server returned 503")),
            ]
        );
        assert!(state.visible_rows().is_empty());
    }

    #[test]
    fn new_snapshot_invalidates_visible_rows() {
        let mut state = loaded();
        assert_eq!(names(&mut state).len(), 2);
        let ticket = state.begin_fetch();
        state.apply_fetch(ticket, Ok(rows()[1..].to_vec()));
        assert_eq!(names(&mut state), vec!["Bob"]);
    }

    #[test]
    fn confirmed_edit_requests_commit_then_refetch() {
        let mut state = loaded();
        open_edit(&mut state, 2);

        let events = state.dispatch(ListCommand::ConfirmPanel {
            value: Some("admin".to_owned()),
        });
        let Some(ListEvent::CommitRequested(pending)) = events.last() else {
            panic!("expected commit request, got {events:?}");
        };
        assert_eq!(pending.record_id, 2);
        assert_eq!(pending.field, Column::Role);
        assert_eq!(pending.value, "admin");
        let ticket = pending.ticket;
        assert_eq!(state.pending_commits(), 1);

        let again = state.dispatch(ListCommand::ConfirmPanel {
            value: Some("admin".to_owned()),
        });
        assert!(matches!(again.as_slice(), [ListEvent::Panel(OverlayEvent::Busy(_))]));

        let events = state.finish_commit(ticket, Ok(()));
        assert!(events.contains(&ListEvent::CommitSucceeded(ticket)));
        assert!(events.iter().any(|event| matches!(event, ListEvent::FetchRequested(_))));
        assert!(events.iter().any(|event| matches!(
            event,
            ListEvent::Panel(OverlayEvent::Closed {
                reason: CloseReason::Saved,
                ..
            })
        )));
        assert!(!state.overlay().is_open());
        assert_eq!(state.records()[1].role, "member");
    }

    #[test]
    fn failed_commit_keeps_rows_and_surfaces_detail() {
        let mut state = loaded();
        open_edit(&mut state, 1);
        let events = state.dispatch(ListCommand::ConfirmPanel {
            value: Some("member".to_owned()),
        });
        let Some(ListEvent::CommitRequested(pending)) = events.last() else {
            panic!("expected commit request");
        };
        let ticket = pending.ticket;

        state.finish_commit(ticket, Err("workspace must keep one admin".to_owned()));
        let notice = state.notice().expect("error notice");
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.message, "workspace must keep one admin");
        assert_eq!(state.records()[0].role, "admin");
        assert!(!state.overlay().is_open());
    }

    #[test]
    fn blank_commit_error_uses_generic_message() {
        let mut state = loaded();
        open_edit(&mut state, 1);
        let events = state.dispatch(ListCommand::ConfirmPanel {
            value: Some("member".to_owned()),
        });
        let Some(ListEvent::CommitRequested(pending)) = events.last() else {
            panic!("expected commit request");
        };
        state.finish_commit(pending.ticket, Err(String::new()));
        assert_eq!(
            state.notice().map(|notice| notice.message.as_str()),
            Some("save failed -- try again")
        );
    }

    #[test]
    fn commit_result_after_cancel_still_reports_once_then_is_ignored() {
        let mut state = loaded();
        open_edit(&mut state, 1);
        let events = state.dispatch(ListCommand::ConfirmPanel {
            value: Some("member".to_owned()),
        });
        let Some(ListEvent::CommitRequested(pending)) = events.last() else {
            panic!("expected commit request");
        };
        let ticket = pending.ticket;

        state.dispatch(ListCommand::CancelPanel);
        assert!(!state.overlay().is_open());

        let events = state.finish_commit(ticket, Ok(()));
        assert!(events.contains(&ListEvent::CommitSucceeded(ticket)));
        let repeat = state.finish_commit(ticket, Ok(()));
        assert_eq!(repeat, vec![ListEvent::CommitIgnored(ticket)]);
    }

    #[test]
    fn reopened_editor_waits_for_the_hidden_save_of_the_same_field() {
        let mut state = loaded();
        open_edit(&mut state, 1);
        let events = state.dispatch(ListCommand::ConfirmPanel {
            value: Some("member".to_owned()),
        });
        let Some(ListEvent::CommitRequested(pending)) = events.last() else {
            panic!("expected commit request");
        };
        let ticket = pending.ticket;
        state.dispatch(ListCommand::CancelPanel);

        open_edit(&mut state, 1);
        let events = state.dispatch(ListCommand::ConfirmPanel {
            value: Some("member".to_owned()),
        });
        assert!(matches!(
            events.as_slice(),
            [
                ListEvent::Panel(OverlayEvent::Busy(PanelTarget::Edit { record_id: 1, .. })),
                ListEvent::NoticeUpdated(_),
            ]
        ));
        assert!(
            !events
                .iter()
                .any(|event| matches!(event, ListEvent::CommitRequested(_)))
        );
        assert_eq!(state.pending_commits(), 1);
        assert!(state.overlay().is_open());
        assert!(!state.overlay().is_saving());

        state.finish_commit(ticket, Ok(()));
        assert_eq!(state.pending_commits(), 0);
        assert!(state.overlay().is_open());
        let events = state.dispatch(ListCommand::ConfirmPanel {
            value: Some("admin".to_owned()),
        });
        assert!(matches!(events.last(), Some(ListEvent::CommitRequested(_))));
    }

    #[test]
    fn other_records_can_save_while_one_is_pending() {
        let mut state = loaded();
        open_edit(&mut state, 1);
        state.dispatch(ListCommand::ConfirmPanel {
            value: Some("member".to_owned()),
        });
        state.dispatch(ListCommand::CancelPanel);

        open_edit(&mut state, 2);
        let events = state.dispatch(ListCommand::ConfirmPanel {
            value: Some("admin".to_owned()),
        });
        assert!(matches!(events.last(), Some(ListEvent::CommitRequested(_))));
        assert_eq!(state.pending_commits(), 2);
    }

    #[test]
    fn edit_confirm_without_value_is_rejected() {
        let mut state = loaded();
        open_edit(&mut state, 1);
        let events = state.dispatch(ListCommand::ConfirmPanel { value: None });
        assert!(matches!(events.as_slice(), [ListEvent::NoticeUpdated(_)]));
        assert!(state.overlay().is_open());
        assert_eq!(state.pending_commits(), 0);
    }

    #[test]
    fn filter_panel_closes_on_outside_pointer() {
        let mut state = loaded();
        state.dispatch(ListCommand::OpenPanel {
            target: PanelTarget::Filter(Column::Role),
            trigger: TriggerGeometry::from_origin(0, 0, 10, 1),
            size: Size::new(20, 5),
            viewport: Size::new(80, 24),
        });
        let events = state.dispatch(ListCommand::PointerDown { x: 70, y: 20 });
        assert_eq!(
            events,
            vec![ListEvent::Panel(OverlayEvent::Closed {
                owner: PanelTarget::Filter(Column::Role),
                reason: CloseReason::OutsideClick,
            })]
        );
    }

    #[test]
    fn clear_notice_drops_message() {
        let mut state = loaded();
        let ticket = state.begin_fetch();
        state.apply_fetch(ticket, Err("offline".to_owned()));
        assert!(state.notice().is_some());
        state.dispatch(ListCommand::ClearNotice);
        assert!(state.notice().is_none());
    }
}
