// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use bizdesk_app::{
    Collection, CommitTicket, DateFilter, DateRange, FetchTicket, FieldEdit, FilterState, Goal,
    GoalField, ItemField, ItemService, ListCommand, ListEvent, ListViewState, MemberField, Notice,
    NoticeLevel, NumericRange, OverlayEvent, PanelTarget, PlacementOptions, Record, ResourceKind,
    Selection, Size, SortDirection, SortState, TeamMember, TenantContext, TriggerGeometry,
    editable_options,
};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers,
    MouseEvent, MouseEventKind,
};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs};
use std::collections::{BTreeSet, VecDeque};
use std::io::{self, Write};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

const FILTER_MARK_ACTIVE: &str = "▼";
const SORT_MARK_ASC: &str = "↑";
const SORT_MARK_DESC: &str = "↓";
const NOTICE_TTL: Duration = Duration::from_secs(4);
const ERROR_NOTICE_TTL: Duration = Duration::from_secs(8);
const KEY_HINTS: &str =
    "q quit  tab switch  / search  s sort  f filter  e edit  r refresh  c clear";

/// Runs `$body` with `$tab` bound to the view for `$kind` and `$shell` to the
/// state shared by all views.
macro_rules! with_tab {
    ($state:expr, $kind:expr, |$tab:ident, $shell:ident| $body:expr) => {{
        let kind = $kind;
        let state = &mut *$state;
        let $shell = &mut state.shell;
        match kind {
            ResourceKind::Members => {
                let $tab = &mut state.members;
                $body
            }
            ResourceKind::Goals => {
                let $tab = &mut state.goals;
                $body
            }
            ResourceKind::Items => {
                let $tab = &mut state.items;
                $body
            }
        }
    }};
}

pub trait AppRuntime {
    fn load_collection(&mut self, kind: ResourceKind) -> Result<Collection>;
    fn commit_edit(&mut self, edit: &FieldEdit) -> Result<()>;
    fn spawn_load(
        &mut self,
        kind: ResourceKind,
        ticket: FetchTicket,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let result = self
            .load_collection(kind)
            .map_err(|error| format!("{error:#}"));
        tx.send(InternalEvent::Loaded {
            kind,
            ticket,
            result,
        })
        .map_err(|_| anyhow!("load event channel closed"))?;
        Ok(())
    }
    fn spawn_commit(
        &mut self,
        ticket: CommitTicket,
        edit: FieldEdit,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        // Only the top-level message: a backend `detail` is shown as is.
        let result = self.commit_edit(&edit).map_err(|error| error.to_string());
        tx.send(InternalEvent::Committed {
            kind: edit.kind,
            ticket,
            result,
        })
        .map_err(|_| anyhow!("commit event channel closed"))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InternalEvent {
    ClearNotice {
        kind: ResourceKind,
        token: u64,
    },
    Loaded {
        kind: ResourceKind,
        ticket: FetchTicket,
        result: Result<Collection, String>,
    },
    Committed {
        kind: ResourceKind,
        ticket: CommitTicket,
        result: Result<(), String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnFilter {
    /// Reachable through free-text search only.
    None,
    Choices,
    Numeric,
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec<F> {
    pub field: F,
    pub label: &'static str,
    pub width: u16,
    pub filter: ColumnFilter,
}

const fn column<F>(field: F, label: &'static str, width: u16, filter: ColumnFilter) -> ColumnSpec<F> {
    ColumnSpec {
        field,
        label,
        width,
        filter,
    }
}

static MEMBER_COLUMNS: [ColumnSpec<MemberField>; 8] = [
    column(MemberField::Name, "name", 20, ColumnFilter::None),
    column(MemberField::Email, "email", 26, ColumnFilter::None),
    column(MemberField::Role, "role", 9, ColumnFilter::Choices),
    column(MemberField::Department, "department", 12, ColumnFilter::Choices),
    column(MemberField::Status, "status", 9, ColumnFilter::Choices),
    column(MemberField::EfficiencyScore, "score", 6, ColumnFilter::Numeric),
    column(MemberField::OpenTasks, "tasks", 6, ColumnFilter::Numeric),
    column(MemberField::JoinedAt, "joined", 11, ColumnFilter::Date),
];

static GOAL_COLUMNS: [ColumnSpec<GoalField>; 5] = [
    column(GoalField::Title, "title", 28, ColumnFilter::None),
    column(GoalField::Owner, "owner", 18, ColumnFilter::Choices),
    column(GoalField::Status, "status", 12, ColumnFilter::Choices),
    column(GoalField::Progress, "progress %", 10, ColumnFilter::Numeric),
    column(GoalField::DueAt, "due", 11, ColumnFilter::Date),
];

static ITEM_COLUMNS: [ColumnSpec<ItemField>; 7] = [
    column(ItemField::Name, "name", 20, ColumnFilter::None),
    column(ItemField::Kind, "kind", 8, ColumnFilter::Choices),
    column(ItemField::Category, "category", 14, ColumnFilter::Choices),
    column(ItemField::UnitPrice, "price", 9, ColumnFilter::Numeric),
    column(ItemField::Stock, "stock", 6, ColumnFilter::Numeric),
    column(ItemField::Active, "active", 7, ColumnFilter::Choices),
    column(ItemField::CreatedAt, "created", 11, ColumnFilter::Date),
];

/// A record kind the terminal UI can list.
pub trait TabRecord: Record<Field: 'static> + Clone {
    const KIND: ResourceKind;

    fn columns() -> &'static [ColumnSpec<Self::Field>];

    /// Wire name of `field`, as used by inline edits.
    fn field_name(field: Self::Field) -> &'static str;

    fn from_collection(collection: Collection) -> Option<Vec<Self>>;
}

impl TabRecord for TeamMember {
    const KIND: ResourceKind = ResourceKind::Members;

    fn columns() -> &'static [ColumnSpec<MemberField>] {
        &MEMBER_COLUMNS
    }

    fn field_name(field: MemberField) -> &'static str {
        field.as_str()
    }

    fn from_collection(collection: Collection) -> Option<Vec<Self>> {
        match collection {
            Collection::Members(rows) => Some(rows),
            _ => None,
        }
    }
}

impl TabRecord for Goal {
    const KIND: ResourceKind = ResourceKind::Goals;

    fn columns() -> &'static [ColumnSpec<GoalField>] {
        &GOAL_COLUMNS
    }

    fn field_name(field: GoalField) -> &'static str {
        field.as_str()
    }

    fn from_collection(collection: Collection) -> Option<Vec<Self>> {
        match collection {
            Collection::Goals(rows) => Some(rows),
            _ => None,
        }
    }
}

impl TabRecord for ItemService {
    const KIND: ResourceKind = ResourceKind::Items;

    fn columns() -> &'static [ColumnSpec<ItemField>] {
        &ITEM_COLUMNS
    }

    fn field_name(field: ItemField) -> &'static str {
        field.as_str()
    }

    fn from_collection(collection: Collection) -> Option<Vec<Self>> {
        match collection {
            Collection::Items(rows) => Some(rows),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiOptions {
    pub start_tab: ResourceKind,
    pub panel_width: u16,
    pub panel_height: u16,
}

impl Default for UiOptions {
    fn default() -> Self {
        Self {
            start_tab: ResourceKind::Members,
            panel_width: 32,
            panel_height: 12,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct PanelUi {
    options: Vec<String>,
    cursor: usize,
    input: String,
    range: bool,
}

impl PanelUi {
    fn choices(options: Vec<String>, cursor: usize) -> Self {
        Self {
            options,
            cursor,
            ..Self::default()
        }
    }

    fn range(input: String) -> Self {
        Self {
            input,
            range: true,
            ..Self::default()
        }
    }

    fn size(&self, limit: Size, viewport: Size) -> Size {
        // Content plus one hint line, inside a border.
        let content = if self.range {
            3
        } else {
            self.options.len().max(1) as i32 + 1
        };
        Size::new(
            limit.width.min(viewport.width),
            (content + 2).min(limit.height).min(viewport.height),
        )
    }

    fn move_cursor(&mut self, delta: isize) {
        if self.options.is_empty() {
            return;
        }
        let last = self.options.len() - 1;
        self.cursor = self.cursor.saturating_add_signed(delta).min(last);
    }
}

struct TabView<R: TabRecord> {
    list: ListViewState<R>,
    selected_row: usize,
    selected_col: usize,
    offset: usize,
    panel: PanelUi,
}

impl<R: TabRecord> TabView<R> {
    fn new() -> Self {
        Self {
            list: ListViewState::new(PlacementOptions::CELLS),
            selected_row: 0,
            selected_col: 0,
            offset: 0,
            panel: PanelUi::default(),
        }
    }

    fn column(&self) -> ColumnSpec<R::Field> {
        let columns = R::columns();
        columns[self.selected_col.min(columns.len() - 1)]
    }

    fn row_count(&mut self) -> usize {
        self.list.visible_indices().len()
    }

    fn move_row(&mut self, delta: isize) {
        let count = self.row_count();
        self.selected_row = self
            .selected_row
            .saturating_add_signed(delta)
            .min(count.saturating_sub(1));
    }

    fn move_col(&mut self, delta: isize) {
        self.selected_col = self
            .selected_col
            .saturating_add_signed(delta)
            .min(R::columns().len() - 1);
    }

    fn clamp_selection(&mut self) {
        let count = self.row_count();
        self.selected_row = self.selected_row.min(count.saturating_sub(1));
        self.offset = self.offset.min(self.selected_row);
    }

    fn scroll_to_selection(&mut self, body_height: usize) {
        if self.selected_row < self.offset {
            self.offset = self.selected_row;
        } else if body_height > 0 && self.selected_row >= self.offset + body_height {
            self.offset = self.selected_row + 1 - body_height;
        }
    }

    fn selected_record(&mut self) -> Option<&R> {
        let index = self.list.visible_indices().get(self.selected_row).copied()?;
        self.list.records().get(index)
    }
}

struct Shell {
    context: TenantContext,
    viewport: Size,
    panel_limit: Size,
    searching: bool,
    notice_token: u64,
}

/// Everything the terminal UI shows: one list view per collection plus the
/// caller's tenant context.
pub struct TuiState {
    active: ResourceKind,
    members: TabView<TeamMember>,
    goals: TabView<Goal>,
    items: TabView<ItemService>,
    shell: Shell,
}

impl TuiState {
    pub fn new(context: TenantContext, options: UiOptions) -> Self {
        Self {
            active: options.start_tab,
            members: TabView::new(),
            goals: TabView::new(),
            items: TabView::new(),
            shell: Shell {
                context,
                viewport: Size::new(120, 40),
                panel_limit: Size::new(
                    i32::from(options.panel_width.max(12)),
                    i32::from(options.panel_height.max(4)),
                ),
                searching: false,
                notice_token: 0,
            },
        }
    }

    pub fn active_tab(&self) -> ResourceKind {
        self.active
    }

    pub fn context(&self) -> &TenantContext {
        &self.shell.context
    }

    pub fn set_viewport(&mut self, width: u16, height: u16) {
        self.shell.viewport = Size::new(i32::from(width), i32::from(height));
    }

    pub fn wants_pointer_events(&self) -> bool {
        self.members.list.overlay().wants_pointer_events()
            || self.goals.list.overlay().wants_pointer_events()
            || self.items.list.overlay().wants_pointer_events()
    }

    pub fn record_count(&self, kind: ResourceKind) -> usize {
        match kind {
            ResourceKind::Members => self.members.list.records().len(),
            ResourceKind::Goals => self.goals.list.records().len(),
            ResourceKind::Items => self.items.list.records().len(),
        }
    }
}

pub fn run_app<R: AppRuntime>(state: &mut TuiState, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    let size = terminal.size().context("read terminal size")?;
    state.set_viewport(size.width, size.height);

    let (internal_tx, internal_rx) = mpsc::channel();
    request_initial_loads(state, runtime, &internal_tx);

    let mut mouse_captured = false;
    let mut result = Ok(());
    loop {
        process_internal_events(state, runtime, &internal_tx, &internal_rx);

        let wanted = state.wants_pointer_events();
        if let Err(error) = sync_mouse_capture(terminal.backend_mut(), &mut mouse_captured, wanted)
        {
            result = Err(error);
            break;
        }

        let screen = build_screen(state);
        if let Err(error) = terminal.draw(|frame| render(frame, &screen)) {
            result = Err(error).context("draw frame");
            break;
        }

        match next_event() {
            Ok(Some(Event::Key(key))) => {
                if handle_key_event(state, runtime, &internal_tx, key) {
                    break;
                }
            }
            Ok(Some(Event::Mouse(mouse))) => {
                handle_mouse_event(state, runtime, &internal_tx, mouse);
            }
            Ok(Some(Event::Resize(width, height))) => state.set_viewport(width, height),
            Ok(_) => {}
            Err(error) => {
                result = Err(error);
                break;
            }
        }
    }

    if mouse_captured {
        execute!(io::stdout(), DisableMouseCapture).context("disable mouse capture")?;
    }
    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn next_event() -> Result<Option<Event>> {
    if event::poll(Duration::from_millis(120)).context("poll event")? {
        return event::read().context("read event").map(Some);
    }
    Ok(None)
}

/// Outside-click detection needs mouse reports, so capture is on only while
/// a panel is open.
fn sync_mouse_capture<W: Write>(out: &mut W, captured: &mut bool, wanted: bool) -> Result<()> {
    if *captured == wanted {
        return Ok(());
    }
    if wanted {
        execute!(out, EnableMouseCapture).context("enable mouse capture")?;
    } else {
        execute!(out, DisableMouseCapture).context("disable mouse capture")?;
    }
    *captured = wanted;
    debug!(enabled = wanted, "mouse capture changed");
    Ok(())
}

fn request_initial_loads<R: AppRuntime>(
    state: &mut TuiState,
    runtime: &mut R,
    tx: &Sender<InternalEvent>,
) {
    for kind in ResourceKind::ALL {
        with_tab!(state, kind, |tab, shell| {
            let events = tab.list.dispatch(ListCommand::Refresh);
            apply_list_events(tab, shell, runtime, tx, events);
        });
    }
}

fn process_internal_events<R: AppRuntime>(
    state: &mut TuiState,
    runtime: &mut R,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearNotice { kind, token } if token == state.shell.notice_token => {
                with_tab!(state, kind, |tab, _shell| {
                    tab.list.dispatch(ListCommand::ClearNotice);
                });
            }
            InternalEvent::ClearNotice { .. } => {}
            InternalEvent::Loaded {
                kind,
                ticket,
                result,
            } => with_tab!(state, kind, |tab, shell| {
                let events = apply_loaded(tab, ticket, result);
                apply_list_events(tab, shell, runtime, tx, events);
            }),
            InternalEvent::Committed {
                kind,
                ticket,
                result,
            } => with_tab!(state, kind, |tab, shell| {
                if let Err(error) = &result {
                    warn!(resource = kind.label(), ticket = ticket.get(), %error, "commit failed");
                }
                let events = tab.list.finish_commit(ticket, result);
                apply_list_events(tab, shell, runtime, tx, events);
            }),
        }
    }
}

fn apply_loaded<R: TabRecord>(
    tab: &mut TabView<R>,
    ticket: FetchTicket,
    result: Result<Collection, String>,
) -> Vec<ListEvent<R::Field>> {
    let rows = result.and_then(|collection| {
        let received = collection.kind();
        R::from_collection(collection).ok_or_else(|| {
            format!(
                "expected {} but received {}",
                R::KIND.label(),
                received.label()
            )
        })
    });
    if let Err(error) = &rows {
        warn!(resource = R::KIND.label(), ticket = ticket.get(), %error, "fetch failed");
    }
    tab.list.apply_fetch(ticket, rows)
}

fn apply_list_events<R: TabRecord, A: AppRuntime>(
    tab: &mut TabView<R>,
    shell: &mut Shell,
    runtime: &mut A,
    tx: &Sender<InternalEvent>,
    events: Vec<ListEvent<R::Field>>,
) {
    let resource = R::KIND.label();
    let mut queue: VecDeque<ListEvent<R::Field>> = events.into();
    while let Some(event) = queue.pop_front() {
        match event {
            ListEvent::FetchRequested(ticket) => {
                debug!(resource, ticket = ticket.get(), "fetch requested");
                if let Err(error) = runtime.spawn_load(R::KIND, ticket, tx.clone()) {
                    queue.extend(tab.list.apply_fetch(ticket, Err(format!("{error:#}"))));
                }
            }
            ListEvent::FetchIgnored(ticket) => {
                debug!(resource, ticket = ticket.get(), "stale fetch result dropped");
            }
            ListEvent::RowsReplaced { count } => {
                debug!(resource, count, "rows replaced");
                tab.clamp_selection();
            }
            ListEvent::FiltersChanged { .. } | ListEvent::SortChanged(_) => {
                tab.clamp_selection();
            }
            ListEvent::CommitRequested(pending) => {
                let edit = FieldEdit::new(
                    R::KIND,
                    pending.record_id,
                    R::field_name(pending.field),
                    &pending.value,
                );
                debug!(
                    resource,
                    record_id = pending.record_id,
                    field = %edit.field,
                    "commit requested"
                );
                if let Err(error) = runtime.spawn_commit(pending.ticket, edit, tx.clone()) {
                    queue.extend(tab.list.finish_commit(pending.ticket, Err(error.to_string())));
                }
            }
            ListEvent::CommitSucceeded(ticket) => {
                debug!(resource, ticket = ticket.get(), "commit saved");
            }
            ListEvent::CommitIgnored(ticket) => {
                debug!(resource, ticket = ticket.get(), "unknown commit result ignored");
            }
            ListEvent::Panel(OverlayEvent::Closed { .. }) => {
                // A replacement panel may already be open.
                if !tab.list.overlay().is_open() {
                    tab.panel = PanelUi::default();
                }
            }
            ListEvent::Panel(_) => {}
            ListEvent::NoticeUpdated(notice) => {
                let ttl = match notice.level {
                    NoticeLevel::Info => NOTICE_TTL,
                    NoticeLevel::Error => ERROR_NOTICE_TTL,
                };
                shell.notice_token = shell.notice_token.saturating_add(1);
                schedule_notice_clear(tx, R::KIND, shell.notice_token, ttl);
            }
            ListEvent::NoticeCleared => {}
        }
    }
}

fn schedule_notice_clear(
    internal_tx: &Sender<InternalEvent>,
    kind: ResourceKind,
    token: u64,
    ttl: Duration,
) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(ttl);
        let _ = sender.send(InternalEvent::ClearNotice { kind, token });
    });
}

fn handle_key_event<R: AppRuntime>(
    state: &mut TuiState,
    runtime: &mut R,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return true;
    }

    if state.shell.searching {
        with_tab!(state, state.active, |tab, shell| {
            handle_search_key(tab, shell, runtime, tx, key);
        });
        return false;
    }

    let panel_open = with_tab!(state, state.active, |tab, _shell| {
        tab.list.overlay().is_open()
    });
    if panel_open {
        with_tab!(state, state.active, |tab, shell| {
            handle_panel_key(tab, shell, runtime, tx, key);
        });
        return false;
    }

    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Tab => switch_tab(state, 1),
        KeyCode::BackTab => switch_tab(state, -1),
        KeyCode::Char('/') => state.shell.searching = true,
        _ => with_tab!(state, state.active, |tab, shell| {
            handle_table_key(tab, shell, runtime, tx, key);
        }),
    }
    false
}

fn handle_mouse_event<R: AppRuntime>(
    state: &mut TuiState,
    runtime: &mut R,
    tx: &Sender<InternalEvent>,
    mouse: MouseEvent,
) {
    if !matches!(mouse.kind, MouseEventKind::Down(_)) {
        return;
    }
    with_tab!(state, state.active, |tab, shell| {
        let events = tab.list.dispatch(ListCommand::PointerDown {
            x: i32::from(mouse.column),
            y: i32::from(mouse.row),
        });
        apply_list_events(tab, shell, runtime, tx, events);
    });
}

fn switch_tab(state: &mut TuiState, delta: isize) {
    with_tab!(state, state.active, |tab, _shell| {
        tab.list.dispatch(ListCommand::CancelPanel);
        tab.panel = PanelUi::default();
    });
    let count = ResourceKind::ALL.len() as isize;
    let position = ResourceKind::ALL
        .iter()
        .position(|kind| *kind == state.active)
        .unwrap_or(0) as isize;
    state.active = ResourceKind::ALL[(position + delta).rem_euclid(count) as usize];
}

fn handle_search_key<R: TabRecord, A: AppRuntime>(
    tab: &mut TabView<R>,
    shell: &mut Shell,
    runtime: &mut A,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let mut query = tab.list.filters().query().to_owned();
    match key.code {
        KeyCode::Enter => {
            shell.searching = false;
            return;
        }
        KeyCode::Esc => {
            shell.searching = false;
            query.clear();
        }
        KeyCode::Backspace => {
            query.pop();
        }
        KeyCode::Char(ch) => query.push(ch),
        _ => return,
    }
    let events = tab.list.dispatch(ListCommand::SetQuery(query));
    apply_list_events(tab, shell, runtime, tx, events);
}

fn handle_table_key<R: TabRecord, A: AppRuntime>(
    tab: &mut TabView<R>,
    shell: &mut Shell,
    runtime: &mut A,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let field = tab.column().field;
    let events = match key.code {
        KeyCode::Down | KeyCode::Char('j') => {
            tab.move_row(1);
            return;
        }
        KeyCode::Up | KeyCode::Char('k') => {
            tab.move_row(-1);
            return;
        }
        KeyCode::Left | KeyCode::Char('h') => {
            tab.move_col(-1);
            return;
        }
        KeyCode::Right | KeyCode::Char('l') => {
            tab.move_col(1);
            return;
        }
        KeyCode::Char('g') => {
            tab.selected_row = 0;
            return;
        }
        KeyCode::Char('G') => {
            tab.move_row(isize::MAX);
            return;
        }
        KeyCode::Char('s') => tab.list.dispatch(ListCommand::ToggleSort(field)),
        KeyCode::Char('S') => tab.list.dispatch(ListCommand::ClearSort),
        KeyCode::Char('c') => tab.list.dispatch(ListCommand::ClearFilters),
        KeyCode::Char('r') => tab.list.dispatch(ListCommand::Refresh),
        KeyCode::Char('f') => open_filter_panel(tab, shell),
        KeyCode::Char('e') | KeyCode::Enter => open_edit_panel(tab, shell),
        KeyCode::Esc => tab.list.dispatch(ListCommand::ClearNotice),
        _ => return,
    };
    apply_list_events(tab, shell, runtime, tx, events);
}

fn open_filter_panel<R: TabRecord>(
    tab: &mut TabView<R>,
    shell: &Shell,
) -> Vec<ListEvent<R::Field>> {
    let spec = tab.column();
    let panel = match spec.filter {
        ColumnFilter::None => {
            return tab.list.dispatch(ListCommand::ShowNotice(Notice::info(format!(
                "{} has no column filter -- press / to search",
                spec.label
            ))));
        }
        ColumnFilter::Choices => {
            let options = distinct_values(tab.list.records(), spec.field);
            if options.is_empty() {
                return tab.list.dispatch(ListCommand::ShowNotice(Notice::info(format!(
                    "no {} values to filter yet",
                    spec.label
                ))));
            }
            PanelUi::choices(options, 0)
        }
        ColumnFilter::Numeric => {
            PanelUi::range(numeric_range_text(tab.list.filters().range(spec.field)))
        }
        ColumnFilter::Date => PanelUi::range(
            tab.list
                .filters()
                .date_range()
                .filter(|filter| filter.field == spec.field)
                .map(|filter| date_range_text(filter.range))
                .unwrap_or_default(),
        ),
    };

    let trigger = header_trigger(shell.viewport, R::columns(), tab.selected_col);
    let size = panel.size(shell.panel_limit, shell.viewport);
    tab.panel = panel;
    tab.list.dispatch(ListCommand::OpenPanel {
        target: PanelTarget::Filter(spec.field),
        trigger,
        size,
        viewport: shell.viewport,
    })
}

fn open_edit_panel<R: TabRecord>(tab: &mut TabView<R>, shell: &Shell) -> Vec<ListEvent<R::Field>> {
    let spec = tab.column();
    let name = R::field_name(spec.field);
    let Some(options) = editable_options(R::KIND, name) else {
        return tab.list.dispatch(ListCommand::ShowNotice(Notice::info(format!(
            "{} is not inline-editable -- open the full edit form instead",
            spec.label
        ))));
    };
    if !shell.context.can_edit(R::KIND, name) {
        return tab.list.dispatch(ListCommand::ShowNotice(Notice::error(format!(
            "role {} cannot edit {} {} -- ask a workspace admin",
            shell.context.role.as_str(),
            R::KIND.label(),
            spec.label
        ))));
    }
    let Some(record) = tab.selected_record() else {
        return Vec::new();
    };
    let record_id = record.id();
    let current = record.value(spec.field).selection_key();

    let cursor = options
        .iter()
        .position(|option| *option == current)
        .unwrap_or(0);
    let panel = PanelUi::choices(
        options.iter().map(|option| (*option).to_owned()).collect(),
        cursor,
    );
    let window_row = tab.selected_row.saturating_sub(tab.offset);
    let trigger = cell_trigger(shell.viewport, R::columns(), tab.selected_col, window_row);
    let size = panel.size(shell.panel_limit, shell.viewport);
    tab.panel = panel;
    tab.list.dispatch(ListCommand::OpenPanel {
        target: PanelTarget::Edit {
            record_id,
            field: spec.field,
        },
        trigger,
        size,
        viewport: shell.viewport,
    })
}

fn handle_panel_key<R: TabRecord, A: AppRuntime>(
    tab: &mut TabView<R>,
    shell: &mut Shell,
    runtime: &mut A,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(panel) = tab.list.overlay().panel() else {
        return;
    };
    let target = panel.owner;
    let saving = tab.list.overlay().is_saving();

    let events = match (key.code, target) {
        (KeyCode::Esc, _) => tab.list.dispatch(ListCommand::CancelPanel),
        _ if saving => return,
        (_, PanelTarget::Filter(field)) if tab.panel.range => range_panel_key(tab, field, key),
        (_, PanelTarget::Filter(field)) => choice_filter_key(tab, field, key),
        (_, PanelTarget::Edit { .. }) => edit_panel_key(tab, key),
    };
    apply_list_events(tab, shell, runtime, tx, events);
}

fn choice_filter_key<R: TabRecord>(
    tab: &mut TabView<R>,
    field: R::Field,
    key: KeyEvent,
) -> Vec<ListEvent<R::Field>> {
    match key.code {
        KeyCode::Down | KeyCode::Char('j') => {
            tab.panel.move_cursor(1);
            Vec::new()
        }
        KeyCode::Up | KeyCode::Char('k') => {
            tab.panel.move_cursor(-1);
            Vec::new()
        }
        KeyCode::Char(' ') | KeyCode::Char('x') => {
            let Some(value) = tab.panel.options.get(tab.panel.cursor).cloned() else {
                return Vec::new();
            };
            tab.list.dispatch(ListCommand::ToggleValue { field, value })
        }
        KeyCode::Char('a') => tab.list.dispatch(ListCommand::SetSelection {
            field,
            selection: Selection::Any,
        }),
        KeyCode::Enter => tab.list.dispatch(ListCommand::ConfirmPanel { value: None }),
        _ => Vec::new(),
    }
}

fn range_panel_key<R: TabRecord>(
    tab: &mut TabView<R>,
    field: R::Field,
    key: KeyEvent,
) -> Vec<ListEvent<R::Field>> {
    match key.code {
        KeyCode::Char(ch) => {
            tab.panel.input.push(ch);
            Vec::new()
        }
        KeyCode::Backspace => {
            tab.panel.input.pop();
            Vec::new()
        }
        KeyCode::Enter => apply_range_input(tab, field),
        _ => Vec::new(),
    }
}

fn apply_range_input<R: TabRecord>(
    tab: &mut TabView<R>,
    field: R::Field,
) -> Vec<ListEvent<R::Field>> {
    let filter = R::columns()
        .iter()
        .find(|spec| spec.field == field)
        .map_or(ColumnFilter::None, |spec| spec.filter);
    let input = tab.panel.input.clone();

    let mut events = match filter {
        ColumnFilter::Numeric => match NumericRange::parse(&input) {
            Ok(range) => tab.list.dispatch(ListCommand::SetRange { field, range }),
            Err(error) => {
                return tab
                    .list
                    .dispatch(ListCommand::ShowNotice(Notice::error(format!("{error:#}"))));
            }
        },
        ColumnFilter::Date => match DateRange::parse(&input) {
            Ok(range) if range.is_unset() => {
                let on_this_field = tab
                    .list
                    .filters()
                    .date_range()
                    .is_some_and(|current| current.field == field);
                if on_this_field {
                    tab.list.dispatch(ListCommand::SetDateRange(None))
                } else {
                    Vec::new()
                }
            }
            Ok(range) => tab
                .list
                .dispatch(ListCommand::SetDateRange(Some(DateFilter { field, range }))),
            Err(error) => {
                return tab
                    .list
                    .dispatch(ListCommand::ShowNotice(Notice::error(format!("{error:#}"))));
            }
        },
        ColumnFilter::None | ColumnFilter::Choices => Vec::new(),
    };
    events.extend(tab.list.dispatch(ListCommand::ConfirmPanel { value: None }));
    events
}

fn edit_panel_key<R: TabRecord>(tab: &mut TabView<R>, key: KeyEvent) -> Vec<ListEvent<R::Field>> {
    match key.code {
        KeyCode::Down | KeyCode::Char('j') => {
            tab.panel.move_cursor(1);
            Vec::new()
        }
        KeyCode::Up | KeyCode::Char('k') => {
            tab.panel.move_cursor(-1);
            Vec::new()
        }
        KeyCode::Enter => {
            let value = tab.panel.options.get(tab.panel.cursor).cloned();
            tab.list.dispatch(ListCommand::ConfirmPanel { value })
        }
        _ => Vec::new(),
    }
}

fn distinct_values<R: Record>(records: &[R], field: R::Field) -> Vec<String> {
    records
        .iter()
        .map(|record| record.value(field).selection_key())
        .filter(|value| !value.is_empty())
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect()
}

fn numeric_range_text(range: NumericRange) -> String {
    if range.is_unset() {
        return String::new();
    }
    let bound = |value: Option<f64>| value.map(|value| value.to_string()).unwrap_or_default();
    format!("{}..{}", bound(range.min), bound(range.max))
}

fn date_range_text(range: DateRange) -> String {
    if range.is_unset() {
        return String::new();
    }
    let bound = |value: Option<time::Date>| value.map(|value| value.to_string()).unwrap_or_default();
    format!("{}..{}", bound(range.from), bound(range.to))
}

fn viewport_rect(viewport: Size) -> Rect {
    let clamp = |value: i32| value.clamp(0, i32::from(u16::MAX)) as u16;
    Rect::new(0, 0, clamp(viewport.width), clamp(viewport.height))
}

fn layout_areas(area: Rect) -> (Rect, Rect, Rect) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(area);
    (layout[0], layout[1], layout[2])
}

fn column_left<F>(table_area: Rect, columns: &[ColumnSpec<F>], index: usize) -> i32 {
    // Border, then each earlier column and its one-cell spacing.
    i32::from(table_area.x)
        + 1
        + columns
            .iter()
            .take(index)
            .map(|spec| i32::from(spec.width) + 1)
            .sum::<i32>()
}

fn header_trigger<F>(viewport: Size, columns: &[ColumnSpec<F>], index: usize) -> TriggerGeometry {
    let (_, table_area, _) = layout_areas(viewport_rect(viewport));
    let width = columns.get(index).map_or(1, |spec| i32::from(spec.width));
    TriggerGeometry::from_origin(
        column_left(table_area, columns, index),
        i32::from(table_area.y) + 1,
        width,
        1,
    )
}

fn cell_trigger<F>(
    viewport: Size,
    columns: &[ColumnSpec<F>],
    index: usize,
    window_row: usize,
) -> TriggerGeometry {
    let (_, table_area, _) = layout_areas(viewport_rect(viewport));
    let width = columns.get(index).map_or(1, |spec| i32::from(spec.width));
    TriggerGeometry::from_origin(
        column_left(table_area, columns, index),
        i32::from(table_area.y) + 2 + window_row as i32,
        width,
        1,
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PanelView {
    area: Rect,
    title: String,
    lines: Vec<String>,
    scroll: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Screen {
    tabs: Vec<String>,
    active_tab: usize,
    title: String,
    headers: Vec<String>,
    widths: Vec<u16>,
    rows: Vec<Vec<String>>,
    selected: Option<(usize, usize)>,
    status: String,
    status_is_error: bool,
    panel: Option<PanelView>,
}

fn build_screen(state: &mut TuiState) -> Screen {
    let (_, table_area, _) = layout_areas(viewport_rect(state.shell.viewport));
    let body_height = usize::from(table_area.height.saturating_sub(3));

    let tabs = ResourceKind::ALL
        .iter()
        .map(|kind| format!("{} ({})", kind.label(), state.record_count(*kind)))
        .collect();
    let active_tab = ResourceKind::ALL
        .iter()
        .position(|kind| *kind == state.active)
        .unwrap_or(0);

    let mut screen = with_tab!(state, state.active, |tab, shell| {
        tab_screen(tab, shell, body_height)
    });
    screen.tabs = tabs;
    screen.active_tab = active_tab;
    screen
}

fn tab_screen<R: TabRecord>(tab: &mut TabView<R>, shell: &Shell, body_height: usize) -> Screen {
    tab.clamp_selection();
    tab.scroll_to_selection(body_height);
    let columns = R::columns();

    let headers = columns
        .iter()
        .map(|spec| header_label(spec, tab.list.filters(), tab.list.sort()))
        .collect();
    let widths = columns.iter().map(|spec| spec.width).collect();
    let filtered = !tab.list.filters().is_empty();
    let total = tab.list.records().len();
    let offset = tab.offset;

    let (visible, rows) = {
        let visible = tab.list.visible_rows();
        let rows = visible
            .iter()
            .skip(offset)
            .take(body_height)
            .map(|record| {
                columns
                    .iter()
                    .map(|spec| record.value(spec.field).display())
                    .collect()
            })
            .collect::<Vec<Vec<String>>>();
        (visible.len(), rows)
    };

    let mut title = format!("{} {visible}/{total}", R::KIND.label());
    if filtered {
        title.push_str(" filtered");
    }
    let selected = (visible > 0).then(|| (tab.selected_row - offset, tab.selected_col));

    let (status, status_is_error) = status_line(tab, shell);
    Screen {
        tabs: Vec::new(),
        active_tab: 0,
        title,
        headers,
        widths,
        rows,
        selected,
        status,
        status_is_error,
        panel: panel_view(tab, shell),
    }
}

fn header_label<F: Copy + Ord>(
    spec: &ColumnSpec<F>,
    filters: &FilterState<F>,
    sort: &SortState<F>,
) -> String {
    let mut label = spec.label.to_owned();
    if let Some(sort) = sort.spec()
        && sort.field == spec.field
    {
        label.push(' ');
        label.push_str(match sort.direction {
            SortDirection::Asc => SORT_MARK_ASC,
            SortDirection::Desc => SORT_MARK_DESC,
        });
    }
    let date_active = filters
        .date_range()
        .is_some_and(|filter| filter.field == spec.field && !filter.range.is_unset());
    if !filters.selection(spec.field).is_any() || !filters.range(spec.field).is_unset() || date_active
    {
        label.push(' ');
        label.push_str(FILTER_MARK_ACTIVE);
    }
    label
}

fn status_line<R: TabRecord>(tab: &TabView<R>, shell: &Shell) -> (String, bool) {
    let query = tab.list.filters().query();
    if shell.searching {
        return (format!("/{query}"), false);
    }
    if let Some(notice) = tab.list.notice() {
        return (notice.message.clone(), notice.level == NoticeLevel::Error);
    }
    let mut parts = Vec::new();
    if !query.is_empty() {
        parts.push(format!("search: {query}"));
    }
    if tab.list.is_loading() {
        parts.push(format!("loading {}...", R::KIND.label()));
    }
    parts.push(format!("{} as {}", shell.context.tenant_id, shell.context.role.as_str()));
    parts.push(KEY_HINTS.to_owned());
    (parts.join(" | "), false)
}

fn panel_view<R: TabRecord>(tab: &TabView<R>, shell: &Shell) -> Option<PanelView> {
    let overlay = tab.list.overlay();
    let panel = overlay.panel()?;
    let viewport = viewport_rect(shell.viewport);
    let area = Rect::new(
        panel.placement.left.clamp(0, i32::from(u16::MAX)) as u16,
        panel.placement.top.clamp(0, i32::from(u16::MAX)) as u16,
        panel.size.width.clamp(0, i32::from(u16::MAX)) as u16,
        panel.size.height.clamp(0, i32::from(u16::MAX)) as u16,
    )
    .intersection(viewport);

    let label_for = |field: R::Field| {
        R::columns()
            .iter()
            .find(|spec| spec.field == field)
            .map_or("", |spec| spec.label)
    };

    let ui = &tab.panel;
    let (title, lines) = match panel.owner {
        PanelTarget::Filter(field) if ui.range => (
            format!("filter {}", label_for(field)),
            vec![
                "min..max (either side optional)".to_owned(),
                format!("> {}_", ui.input),
                "enter apply  esc cancel".to_owned(),
            ],
        ),
        PanelTarget::Filter(field) => {
            let selection = tab.list.filters().selection(field);
            let mut lines: Vec<String> = ui
                .options
                .iter()
                .enumerate()
                .map(|(index, option)| {
                    let cursor = if index == ui.cursor { ">" } else { " " };
                    let mark = if !selection.is_any() && selection.contains(option) {
                        "x"
                    } else {
                        " "
                    };
                    format!("{cursor} [{mark}] {option}")
                })
                .collect();
            lines.push("space toggle  a all  enter done".to_owned());
            (format!("filter {}", label_for(field)), lines)
        }
        PanelTarget::Edit { record_id, field } => {
            let mut lines: Vec<String> = ui
                .options
                .iter()
                .enumerate()
                .map(|(index, option)| {
                    let cursor = if index == ui.cursor { ">" } else { " " };
                    format!("{cursor} {option}")
                })
                .collect();
            lines.push(if overlay.is_saving() {
                "saving...".to_owned()
            } else {
                "enter save  esc cancel".to_owned()
            });
            (format!("set {} #{record_id}", label_for(field)), lines)
        }
    };

    let body = usize::from(area.height.saturating_sub(2)).max(1);
    let scroll = if ui.range {
        0
    } else {
        ui.cursor.saturating_sub(body - 1) as u16
    };
    Some(PanelView {
        area,
        title,
        lines,
        scroll,
    })
}

fn render(frame: &mut ratatui::Frame<'_>, screen: &Screen) {
    let (tabs_area, table_area, status_area) = layout_areas(frame.area());

    let tabs = Tabs::new(screen.tabs.clone())
        .block(Block::default().title("bizdesk").borders(Borders::ALL))
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(screen.active_tab);
    frame.render_widget(tabs, tabs_area);

    let header = Row::new(screen.headers.iter().map(|label| {
        Cell::from(label.clone()).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));
    let rows = screen.rows.iter().enumerate().map(|(row_index, row)| {
        let cells = row
            .iter()
            .enumerate()
            .map(|(column_index, text)| {
                let mut style = Style::default();
                if let Some((selected_row, selected_col)) = screen.selected
                    && selected_row == row_index
                {
                    style = style.bg(Color::DarkGray);
                    if selected_col == column_index {
                        style = Style::default()
                            .fg(Color::Black)
                            .bg(Color::Cyan)
                            .add_modifier(Modifier::BOLD);
                    }
                }
                Cell::from(text.clone()).style(style)
            })
            .collect::<Vec<_>>();
        Row::new(cells)
    });
    let widths = screen
        .widths
        .iter()
        .map(|width| Constraint::Length(*width))
        .collect::<Vec<_>>();
    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(
            Block::default()
                .title(screen.title.clone())
                .borders(Borders::ALL),
        );
    frame.render_widget(table, table_area);

    let status_color = if screen.status_is_error {
        Color::Red
    } else {
        Color::Yellow
    };
    let status = Paragraph::new(screen.status.clone())
        .style(Style::default().fg(status_color))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, status_area);

    if let Some(panel) = &screen.panel {
        let area = panel.area.intersection(frame.area());
        frame.render_widget(Clear, area);
        let body = Paragraph::new(panel.lines.join("\n"))
            .scroll((panel.scroll, 0))
            .block(
                Block::default()
                    .title(panel.title.clone())
                    .borders(Borders::ALL)
                    .style(Style::default().fg(Color::Cyan)),
            );
        frame.render_widget(body, area);
    }
}

#[cfg(test)]
mod tests {
    use super::{
        AppRuntime, InternalEvent, TuiState, UiOptions, build_screen, handle_key_event,
        handle_mouse_event, process_internal_events, request_initial_loads, sync_mouse_capture,
    };
    use anyhow::{Result, anyhow};
    use bizdesk_app::{
        AccessRole, Collection, EditValue, FieldEdit, MemberRole, ResourceKind, TenantContext,
    };
    use bizdesk_testkit::{alice_and_bob, demo_goals, demo_items};
    use crossterm::event::{
        KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    };
    use std::sync::mpsc::{self, Receiver, Sender};

    #[derive(Debug)]
    struct TestRuntime {
        members: Vec<bizdesk_app::TeamMember>,
        commits: Vec<FieldEdit>,
        commit_error: Option<String>,
        load_error: Option<String>,
        loads: usize,
    }

    impl Default for TestRuntime {
        fn default() -> Self {
            Self {
                members: alice_and_bob(),
                commits: Vec::new(),
                commit_error: None,
                load_error: None,
                loads: 0,
            }
        }
    }

    impl AppRuntime for TestRuntime {
        fn load_collection(&mut self, kind: ResourceKind) -> Result<Collection> {
            self.loads += 1;
            if let Some(error) = &self.load_error {
                return Err(anyhow!("{error}"));
            }
            Ok(match kind {
                ResourceKind::Members => Collection::Members(self.members.clone()),
                ResourceKind::Goals => Collection::Goals(demo_goals(1, &self.members, 4)),
                ResourceKind::Items => Collection::Items(demo_items(1, 5)),
            })
        }

        fn commit_edit(&mut self, edit: &FieldEdit) -> Result<()> {
            self.commits.push(edit.clone());
            if let Some(error) = &self.commit_error {
                return Err(anyhow!("{error}"));
            }
            if let (ResourceKind::Members, "role", EditValue::Text(value)) =
                (edit.kind, edit.field.as_str(), &edit.value)
                && let Some(member) = self
                    .members
                    .iter_mut()
                    .find(|member| member.id.get() == edit.record_id)
            {
                member.role = MemberRole::parse(value).ok_or_else(|| anyhow!("bad role"))?;
            }
            Ok(())
        }
    }

    struct Harness {
        state: TuiState,
        runtime: TestRuntime,
        tx: Sender<InternalEvent>,
        rx: Receiver<InternalEvent>,
    }

    impl Harness {
        fn new(role: AccessRole, runtime: TestRuntime) -> Self {
            let mut state = TuiState::new(TenantContext::new("acme", role), UiOptions::default());
            state.set_viewport(120, 40);
            let (tx, rx) = mpsc::channel();
            let mut harness = Self {
                state,
                runtime,
                tx,
                rx,
            };
            request_initial_loads(&mut harness.state, &mut harness.runtime, &harness.tx);
            harness.pump();
            harness
        }

        fn admin() -> Self {
            Self::new(AccessRole::Admin, TestRuntime::default())
        }

        fn pump(&mut self) {
            process_internal_events(&mut self.state, &mut self.runtime, &self.tx, &self.rx);
        }

        fn press(&mut self, code: KeyCode) -> bool {
            let quit = handle_key_event(
                &mut self.state,
                &mut self.runtime,
                &self.tx,
                KeyEvent::new(code, KeyModifiers::NONE),
            );
            self.pump();
            quit
        }

        fn keys(&mut self, codes: &[KeyCode]) {
            for code in codes {
                self.press(*code);
            }
        }

        fn type_text(&mut self, text: &str) {
            for ch in text.chars() {
                self.press(KeyCode::Char(ch));
            }
        }

        fn click(&mut self, column: u16, row: u16) {
            handle_mouse_event(
                &mut self.state,
                &mut self.runtime,
                &self.tx,
                MouseEvent {
                    kind: MouseEventKind::Down(MouseButton::Left),
                    column,
                    row,
                    modifiers: KeyModifiers::NONE,
                },
            );
            self.pump();
        }

        fn first_column(&mut self) -> Vec<String> {
            build_screen(&mut self.state)
                .rows
                .iter()
                .map(|row| row[0].clone())
                .collect()
        }
    }

    #[test]
    fn initial_load_fills_every_tab() {
        let harness = Harness::admin();
        assert_eq!(harness.runtime.loads, 3);
        assert_eq!(harness.state.record_count(ResourceKind::Members), 2);
        assert_eq!(harness.state.record_count(ResourceKind::Goals), 4);
        assert_eq!(harness.state.record_count(ResourceKind::Items), 5);
    }

    #[test]
    fn tab_key_cycles_tabs_and_q_quits() {
        let mut harness = Harness::admin();
        assert!(!harness.press(KeyCode::Tab));
        assert_eq!(harness.state.active_tab(), ResourceKind::Goals);
        harness.press(KeyCode::BackTab);
        harness.press(KeyCode::BackTab);
        assert_eq!(harness.state.active_tab(), ResourceKind::Items);
        assert!(harness.press(KeyCode::Char('q')));
    }

    #[test]
    fn search_narrows_rows_and_escape_clears_it() {
        let mut harness = Harness::admin();
        harness.press(KeyCode::Char('/'));
        harness.type_text("BOB");
        assert_eq!(harness.first_column(), vec!["Bob"]);
        assert_eq!(build_screen(&mut harness.state).status, "/BOB");

        harness.press(KeyCode::Esc);
        assert_eq!(harness.first_column(), vec!["Alice", "Bob"]);
    }

    #[test]
    fn sort_key_toggles_direction_and_marks_header() {
        let mut harness = Harness::admin();
        // score column
        harness.keys(&[KeyCode::Char('l'); 5]);
        harness.press(KeyCode::Char('s'));
        assert_eq!(harness.first_column(), vec!["Bob", "Alice"]);
        assert_eq!(build_screen(&mut harness.state).headers[5], "score ↑");

        harness.press(KeyCode::Char('s'));
        assert_eq!(harness.first_column(), vec!["Alice", "Bob"]);
        assert_eq!(build_screen(&mut harness.state).headers[5], "score ↓");

        harness.press(KeyCode::Char('S'));
        assert_eq!(build_screen(&mut harness.state).headers[5], "score");
    }

    #[test]
    fn role_filter_panel_toggles_values_and_tracks_mouse() {
        let mut harness = Harness::admin();
        harness.keys(&[KeyCode::Char('l'), KeyCode::Char('l'), KeyCode::Char('f')]);
        assert!(harness.state.wants_pointer_events());

        let screen = build_screen(&mut harness.state);
        let panel = screen.panel.expect("filter panel is shown");
        assert_eq!(panel.title, "filter role");
        assert_eq!(panel.lines[0], "> [ ] admin");
        assert!(panel.area.right() <= 120 && panel.area.bottom() <= 40);

        harness.press(KeyCode::Char(' '));
        assert_eq!(harness.first_column(), vec!["Alice"]);
        harness.press(KeyCode::Enter);
        assert!(!harness.state.wants_pointer_events());
        let screen = build_screen(&mut harness.state);
        assert!(screen.panel.is_none());
        assert_eq!(screen.headers[2], "role ▼");
        assert_eq!(screen.title, "members 1/2 filtered");

        harness.press(KeyCode::Char('c'));
        assert_eq!(harness.first_column(), vec!["Alice", "Bob"]);
    }

    #[test]
    fn outside_click_closes_panel_but_inside_click_does_not() {
        let mut harness = Harness::admin();
        harness.keys(&[KeyCode::Char('l'), KeyCode::Char('l'), KeyCode::Char('f')]);
        let panel = build_screen(&mut harness.state)
            .panel
            .expect("filter panel is shown");

        harness.click(panel.area.x + 1, panel.area.y + 1);
        assert!(harness.state.wants_pointer_events());

        harness.click(119, 39);
        assert!(!harness.state.wants_pointer_events());
        assert!(build_screen(&mut harness.state).panel.is_none());
    }

    #[test]
    fn numeric_range_filter_uses_typed_bounds() {
        let mut harness = Harness::admin();
        harness.keys(&[KeyCode::Char('l'); 5]);
        harness.press(KeyCode::Char('f'));
        harness.type_text("60..");
        harness.press(KeyCode::Enter);
        assert_eq!(harness.first_column(), vec!["Alice"]);
        assert_eq!(build_screen(&mut harness.state).headers[5], "score ▼");
    }

    #[test]
    fn invalid_range_keeps_panel_open_with_error() {
        let mut harness = Harness::admin();
        harness.keys(&[KeyCode::Char('l'); 5]);
        harness.press(KeyCode::Char('f'));
        harness.type_text("lots");
        harness.press(KeyCode::Enter);
        let screen = build_screen(&mut harness.state);
        assert!(screen.panel.is_some());
        assert!(screen.status_is_error);
        assert!(screen.status.contains("min..max"), "status: {}", screen.status);
    }

    #[test]
    fn inline_edit_commits_then_refetches() {
        let mut harness = Harness::admin();
        harness.keys(&[KeyCode::Char('j'), KeyCode::Char('l'), KeyCode::Char('l')]);
        harness.press(KeyCode::Char('e'));
        let panel = build_screen(&mut harness.state)
            .panel
            .expect("edit panel is shown");
        assert_eq!(panel.title, "set role #2");
        assert_eq!(panel.lines[2], "> member");

        harness.keys(&[KeyCode::Char('k'), KeyCode::Enter]);
        assert_eq!(
            harness.runtime.commits,
            vec![FieldEdit::new(ResourceKind::Members, 2, "role", "manager")]
        );
        let screen = build_screen(&mut harness.state);
        assert!(screen.panel.is_none());
        assert_eq!(screen.rows[1][2], "manager");
        assert_eq!(screen.status, "saved manager on #2");
        assert_eq!(harness.runtime.loads, 4);
    }

    #[test]
    fn rejected_edit_shows_detail_and_keeps_value() {
        let runtime = TestRuntime {
            commit_error: Some("A workspace must keep at least one active admin.".to_owned()),
            ..TestRuntime::default()
        };
        let mut harness = Harness::new(AccessRole::Admin, runtime);
        harness.keys(&[KeyCode::Char('l'), KeyCode::Char('l'), KeyCode::Char('e')]);
        harness.keys(&[KeyCode::Char('j'), KeyCode::Char('j'), KeyCode::Enter]);

        let screen = build_screen(&mut harness.state);
        assert!(screen.status_is_error);
        assert_eq!(
            screen.status,
            "A workspace must keep at least one active admin."
        );
        assert_eq!(screen.rows[0][2], "admin");
        assert_eq!(harness.runtime.loads, 3);
    }

    #[test]
    fn viewer_cannot_open_inline_editor() {
        let mut harness = Harness::new(AccessRole::Viewer, TestRuntime::default());
        harness.keys(&[KeyCode::Char('l'), KeyCode::Char('l'), KeyCode::Char('e')]);
        let screen = build_screen(&mut harness.state);
        assert!(screen.panel.is_none());
        assert!(screen.status.contains("ask a workspace admin"));
    }

    #[test]
    fn free_text_column_points_to_full_form() {
        let mut harness = Harness::admin();
        harness.press(KeyCode::Char('e'));
        let screen = build_screen(&mut harness.state);
        assert!(screen.panel.is_none());
        assert!(screen.status.contains("full edit form"));
    }

    #[test]
    fn failed_load_shows_empty_list_and_error() {
        let runtime = TestRuntime {
            load_error: Some("cannot reach backend".to_owned()),
            ..TestRuntime::default()
        };
        let mut harness = Harness::new(AccessRole::Admin, runtime);
        let screen = build_screen(&mut harness.state);
        assert!(screen.rows.is_empty());
        assert!(screen.status_is_error);
        assert_eq!(screen.status, "load failed: cannot reach backend");
    }

    #[test]
    fn mouse_capture_follows_panel_visibility() -> Result<()> {
        let mut out = Vec::new();
        let mut captured = false;
        sync_mouse_capture(&mut out, &mut captured, true)?;
        assert!(captured);
        assert!(!out.is_empty());

        out.clear();
        sync_mouse_capture(&mut out, &mut captured, true)?;
        assert!(out.is_empty());

        sync_mouse_capture(&mut out, &mut captured, false)?;
        assert!(!captured);
        Ok(())
    }
}
