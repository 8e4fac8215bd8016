// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Floating panels anchored to a trigger.
//!
//! [`place_panel`] turns a trigger rectangle into viewport coordinates that
//! keep the panel on screen, flipping above the trigger when there is no room
//! below. [`Overlay`] tracks the single open panel of a list view and decides
//! when it closes.

/// Trigger rectangle captured when a panel opens. It is a snapshot and does
/// not follow later scrolling or resizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerGeometry {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub width: i32,
    pub height: i32,
}

impl TriggerGeometry {
    pub const fn from_origin(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            right: left + width,
            bottom: top + height,
            width,
            height,
        }
    }

    pub const fn from_edges(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
            width: right - left,
            height: bottom - top,
        }
    }

    pub const fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelPlacement {
    pub left: i32,
    pub top: i32,
}

impl PanelPlacement {
    pub const fn contains(&self, size: Size, x: i32, y: i32) -> bool {
        x >= self.left && x < self.left + size.width && y >= self.top && y < self.top + size.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementOptions {
    /// Space between the trigger and the panel.
    pub gap: i32,
    /// Preferred distance from the viewport edge when the panel is clamped.
    pub edge_padding: i32,
}

impl PlacementOptions {
    pub const DEFAULT_GAP: i32 = 4;
    pub const DEFAULT_EDGE_PADDING: i32 = 8;

    /// Settings for terminal cells, where every row and column is precious.
    pub const CELLS: Self = Self {
        gap: 0,
        edge_padding: 1,
    };
}

impl Default for PlacementOptions {
    fn default() -> Self {
        Self {
            gap: Self::DEFAULT_GAP,
            edge_padding: Self::DEFAULT_EDGE_PADDING,
        }
    }
}

pub fn place_panel(trigger: TriggerGeometry, panel: Size, viewport: Size) -> PanelPlacement {
    place_panel_with(trigger, panel, viewport, PlacementOptions::default())
}

pub fn place_panel_with(
    trigger: TriggerGeometry,
    panel: Size,
    viewport: Size,
    options: PlacementOptions,
) -> PanelPlacement {
    let PlacementOptions { gap, edge_padding } = options;

    let mut left = trigger.left;
    if left + panel.width > viewport.width {
        left = viewport.width - panel.width - edge_padding;
        if left < edge_padding {
            left = edge_padding;
        }
    }

    let mut top = trigger.bottom + gap;
    if top + panel.height > viewport.height {
        top = trigger.top - panel.height - gap;
        if top < edge_padding {
            top = viewport.height - panel.height - edge_padding;
        }
    }

    // Padding is a preference; staying inside the viewport is not.
    PanelPlacement {
        left: contain(left, panel.width, viewport.width),
        top: contain(top, panel.height, viewport.height),
    }
}

fn contain(position: i32, size: i32, extent: i32) -> i32 {
    position.min(extent - size).max(0)
}

/// Opaque id for an inline-edit commit in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CommitTicket(u64);

impl CommitTicket {
    pub const fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelMode {
    /// Confirm just closes the panel.
    Filter,
    /// Confirm starts a save and keeps the panel until it resolves.
    InlineEdit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenPanel<K> {
    pub owner: K,
    pub mode: PanelMode,
    pub trigger: TriggerGeometry,
    pub size: Size,
    pub placement: PanelPlacement,
}

impl<K> OpenPanel<K> {
    fn hit(&self, x: i32, y: i32) -> bool {
        self.trigger.contains(x, y) || self.placement.contains(self.size, x, y)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayState<K> {
    Closed,
    Open(OpenPanel<K>),
    Saving {
        panel: OpenPanel<K>,
        ticket: CommitTicket,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    OutsideClick,
    Cancelled,
    Confirmed,
    Replaced,
    Saved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayEvent<K> {
    Opened(K),
    Closed { owner: K, reason: CloseReason },
    SaveStarted { owner: K, ticket: CommitTicket },
    /// The panel is saving and cannot be confirmed or reopened yet.
    Busy(K),
}

/// The one floating panel a list view may show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlay<K> {
    state: OverlayState<K>,
    options: PlacementOptions,
    next_ticket: u64,
}

impl<K> Default for Overlay<K> {
    fn default() -> Self {
        Self::new(PlacementOptions::default())
    }
}

impl<K> Overlay<K> {
    pub const fn new(options: PlacementOptions) -> Self {
        Self {
            state: OverlayState::Closed,
            options,
            next_ticket: 1,
        }
    }
}

impl<K: Clone + PartialEq> Overlay<K> {
    pub fn state(&self) -> &OverlayState<K> {
        &self.state
    }

    pub fn panel(&self) -> Option<&OpenPanel<K>> {
        match &self.state {
            OverlayState::Closed => None,
            OverlayState::Open(panel) | OverlayState::Saving { panel, .. } => Some(panel),
        }
    }

    pub fn is_open(&self) -> bool {
        self.panel().is_some()
    }

    pub fn is_saving(&self) -> bool {
        matches!(self.state, OverlayState::Saving { .. })
    }

    /// Outside-click tracking is only needed while a panel is shown.
    pub fn wants_pointer_events(&self) -> bool {
        self.is_open()
    }

    pub fn open(
        &mut self,
        owner: K,
        mode: PanelMode,
        trigger: TriggerGeometry,
        size: Size,
        viewport: Size,
    ) -> Vec<OverlayEvent<K>> {
        if let OverlayState::Saving { panel, .. } = &self.state
            && panel.owner == owner
        {
            return vec![OverlayEvent::Busy(owner)];
        }

        let mut events = Vec::new();
        if let Some(event) = self.close(CloseReason::Replaced) {
            events.push(event);
        }
        let placement = place_panel_with(trigger, size, viewport, self.options);
        self.state = OverlayState::Open(OpenPanel {
            owner: owner.clone(),
            mode,
            trigger,
            size,
            placement,
        });
        events.push(OverlayEvent::Opened(owner));
        events
    }

    /// Closes the panel when the press lands outside both the trigger and the
    /// panel.
    pub fn pointer_down(&mut self, x: i32, y: i32) -> Option<OverlayEvent<K>> {
        let panel = self.panel()?;
        if panel.hit(x, y) {
            return None;
        }
        self.close(CloseReason::OutsideClick)
    }

    /// Closing a saving panel leaves its request running; the result is
    /// matched by ticket elsewhere.
    pub fn cancel(&mut self) -> Option<OverlayEvent<K>> {
        self.close(CloseReason::Cancelled)
    }

    pub fn confirm(&mut self) -> Option<OverlayEvent<K>> {
        match &self.state {
            OverlayState::Closed => None,
            OverlayState::Saving { panel, .. } => Some(OverlayEvent::Busy(panel.owner.clone())),
            OverlayState::Open(panel) if panel.mode == PanelMode::Filter => {
                self.close(CloseReason::Confirmed)
            }
            OverlayState::Open(panel) => {
                let panel = panel.clone();
                let ticket = CommitTicket(self.next_ticket);
                self.next_ticket += 1;
                let owner = panel.owner.clone();
                self.state = OverlayState::Saving { panel, ticket };
                Some(OverlayEvent::SaveStarted { owner, ticket })
            }
        }
    }

    /// Settles a save. Only the ticket the panel is waiting on closes it.
    pub fn resolve(&mut self, ticket: CommitTicket) -> Option<OverlayEvent<K>> {
        match &self.state {
            OverlayState::Saving { ticket: waiting, .. } if *waiting == ticket => {
                self.close(CloseReason::Saved)
            }
            _ => None,
        }
    }

    fn close(&mut self, reason: CloseReason) -> Option<OverlayEvent<K>> {
        match std::mem::replace(&mut self.state, OverlayState::Closed) {
            OverlayState::Closed => None,
            OverlayState::Open(panel) | OverlayState::Saving { panel, .. } => {
                Some(OverlayEvent::Closed {
                    owner: panel.owner,
                    reason,
                })
            }
        }
    }
}
