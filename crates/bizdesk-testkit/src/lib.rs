// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use bizdesk_app::{
    Collection, Goal, GoalId, GoalStatus, ItemKind, ItemService, ItemServiceId, MemberRole,
    MemberStatus, ResourceKind, TeamMember, TeamMemberId,
};
use time::{Duration, OffsetDateTime, macros::datetime};

const FIRST_NAMES: [&str; 16] = [
    "Avery", "Jordan", "Taylor", "Riley", "Morgan", "Casey", "Alex", "Quinn", "Parker", "Drew",
    "Kai", "Elliot", "Robin", "Cameron", "Hayden", "Rowan",
];
const LAST_NAMES: [&str; 18] = [
    "Walker", "Martin", "Hill", "Evans", "Lopez", "Gray", "Ward", "Young", "Diaz", "Reed",
    "Campbell", "Turner", "Flores", "Bennett", "Price", "Morris", "Foster", "Brooks",
];

const DEPARTMENTS: [&str; 8] = [
    "Engineering",
    "Sales",
    "Marketing",
    "Finance",
    "Operations",
    "Support",
    "People",
    "Design",
];

const GOAL_VERBS: [&str; 8] = [
    "Grow", "Reduce", "Launch", "Improve", "Close", "Hire", "Automate", "Expand",
];
const GOAL_OBJECTS: [&str; 10] = [
    "monthly revenue",
    "support backlog",
    "partner program",
    "onboarding flow",
    "enterprise deals",
    "regional team",
    "invoice reminders",
    "customer retention",
    "trial conversions",
    "release cadence",
];

const ITEM_CATEGORIES: [&str; 6] = [
    "Hardware",
    "Software",
    "Consulting",
    "Training",
    "Maintenance",
    "Subscriptions",
];
const ITEM_NAMES: [&str; 10] = [
    "Desk Phone",
    "Label Printer",
    "Barcode Scanner",
    "POS Terminal",
    "Docking Station",
    "Wireless Headset",
    "Receipt Paper",
    "Card Reader",
    "Router",
    "Webcam",
];
const SERVICE_NAMES: [&str; 8] = [
    "Onboarding Session",
    "Quarterly Review",
    "Data Migration",
    "Priority Support",
    "Security Audit",
    "Custom Report",
    "On-site Setup",
    "Staff Workshop",
];

const REFERENCE_NOW: OffsetDateTime = datetime!(2026-01-01 00:00 UTC);

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    /// True roughly `percent` times out of a hundred.
    fn chance(&mut self, percent: u64) -> bool {
        self.next_u64() % 100 < percent
    }
}

/// Seeded generator of plausible tenant data. The same seed always yields the
/// same records.
#[derive(Debug, Clone)]
pub struct BizFaker {
    rng: DeterministicRng,
    seed: u64,
}

impl BizFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            seed: normalized,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    pub fn team_member(&mut self, id: i64) -> TeamMember {
        let first = self.pick(&FIRST_NAMES);
        let last = self.pick(&LAST_NAMES);
        let username = format!("{}.{}", first.to_lowercase(), last.to_lowercase());
        let status = MemberStatus::ALL[self.rng.int_n(MemberStatus::ALL.len())];
        // Invited members have not done anything yet.
        let (efficiency_score, open_tasks, joined_at) = if status == MemberStatus::Invited {
            (None, None, None)
        } else {
            (
                Some(self.int_range(40, 100) as f64),
                Some(self.int_range(0, 25)),
                Some(self.datetime_within_days(REFERENCE_NOW, -900, -1)),
            )
        };

        TeamMember {
            id: TeamMemberId::new(id),
            name: format!("{first} {last}"),
            email: format!("{username}@example.com"),
            username,
            role: MemberRole::ALL[self.rng.int_n(MemberRole::ALL.len())],
            department: self.pick(&DEPARTMENTS).to_owned(),
            status,
            efficiency_score,
            open_tasks,
            joined_at,
        }
    }

    pub fn goal(&mut self, id: i64, owner: &str) -> Goal {
        let status = GoalStatus::ALL[self.rng.int_n(GoalStatus::ALL.len())];
        let target = self.int_range(10, 500) as f64;
        let current = match status {
            GoalStatus::NotStarted => None,
            GoalStatus::Completed => Some(target),
            GoalStatus::OnTrack | GoalStatus::AtRisk => {
                Some(self.int_range(0, target as i64) as f64)
            }
        };
        let due_at = if self.rng.chance(85) {
            Some(self.datetime_within_days(REFERENCE_NOW, -60, 240))
        } else {
            None
        };

        Goal {
            id: GoalId::new(id),
            title: format!(
                "{} {}",
                self.pick(&GOAL_VERBS),
                self.pick(&GOAL_OBJECTS)
            ),
            owner: owner.to_owned(),
            status,
            target_value: Some(target),
            current_value: current,
            due_at,
        }
    }

    pub fn item_service(&mut self, id: i64) -> ItemService {
        let kind = if self.rng.chance(60) {
            ItemKind::Item
        } else {
            ItemKind::Service
        };
        let (name, stock) = match kind {
            ItemKind::Item => (self.pick(&ITEM_NAMES), Some(self.int_range(0, 400))),
            ItemKind::Service => (self.pick(&SERVICE_NAMES), None),
        };

        ItemService {
            id: ItemServiceId::new(id),
            name: name.to_owned(),
            kind,
            category: self.pick(&ITEM_CATEGORIES).to_owned(),
            unit_price_cents: Some(self.int_range(5, 2_500) * 100 + self.int_range(0, 99)),
            stock,
            active: self.rng.chance(85),
            created_at: Some(self.datetime_within_days(REFERENCE_NOW, -720, -1)),
        }
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    fn int_range(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = max - min + 1;
        min + (self.rng.next_u64() % (span as u64)) as i64
    }

    fn datetime_within_days(
        &mut self,
        anchor: OffsetDateTime,
        min_days: i64,
        max_days: i64,
    ) -> OffsetDateTime {
        let seconds = self.int_range(min_days * 86_400, max_days * 86_400);
        anchor + Duration::seconds(seconds)
    }
}

pub fn demo_members(seed: u64, count: usize) -> Vec<TeamMember> {
    let mut faker = BizFaker::new(seed);
    let mut members: Vec<TeamMember> = (1..=count as i64)
        .map(|id| faker.team_member(id))
        .collect();
    // A workspace always has at least one active admin.
    if let Some(first) = members.first_mut() {
        first.role = MemberRole::Admin;
        first.status = MemberStatus::Active;
    }
    members
}

pub fn demo_goals(seed: u64, owners: &[TeamMember], count: usize) -> Vec<Goal> {
    let mut faker = BizFaker::new(seed.wrapping_add(1));
    (1..=count as i64)
        .map(|id| {
            let owner = if owners.is_empty() {
                String::new()
            } else {
                owners[faker.int_n(owners.len())].name.clone()
            };
            faker.goal(id, &owner)
        })
        .collect()
}

pub fn demo_items(seed: u64, count: usize) -> Vec<ItemService> {
    let mut faker = BizFaker::new(seed.wrapping_add(2));
    (1..=count as i64)
        .map(|id| faker.item_service(id))
        .collect()
}

/// All three collections of a seeded demo tenant.
pub fn demo_collections(seed: u64) -> Vec<Collection> {
    let members = demo_members(seed, 24);
    let goals = demo_goals(seed, &members, 18);
    let items = demo_items(seed, 30);
    vec![
        Collection::Members(members),
        Collection::Goals(goals),
        Collection::Items(items),
    ]
}

pub fn demo_collection(seed: u64, kind: ResourceKind) -> Collection {
    demo_collections(seed)
        .into_iter()
        .find(|collection| collection.kind() == kind)
        .unwrap_or(match kind {
            ResourceKind::Members => Collection::Members(Vec::new()),
            ResourceKind::Goals => Collection::Goals(Vec::new()),
            ResourceKind::Items => Collection::Items(Vec::new()),
        })
}

/// Alice (admin, score 80) and Bob (member, score 50), in that order.
pub fn alice_and_bob() -> Vec<TeamMember> {
    vec![
        TeamMember {
            id: TeamMemberId::new(1),
            name: "Alice".to_owned(),
            email: "alice@example.com".to_owned(),
            username: "alice".to_owned(),
            role: MemberRole::Admin,
            department: "Engineering".to_owned(),
            status: MemberStatus::Active,
            efficiency_score: Some(80.0),
            open_tasks: Some(3),
            joined_at: Some(datetime!(2024-03-04 09:00 UTC)),
        },
        TeamMember {
            id: TeamMemberId::new(2),
            name: "Bob".to_owned(),
            email: "bob@example.com".to_owned(),
            username: "bob".to_owned(),
            role: MemberRole::Member,
            department: "Sales".to_owned(),
            status: MemberStatus::Active,
            efficiency_score: Some(50.0),
            open_tasks: Some(7),
            joined_at: Some(datetime!(2025-06-16 09:00 UTC)),
        },
    ]
}

pub fn fixture_datetime() -> &'static str {
    "2026-02-19T12:34:56Z"
}

pub fn departments() -> &'static [&'static str] {
    &DEPARTMENTS
}
