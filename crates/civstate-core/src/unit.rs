//! Unit system - activities, orders and the unit record.

use crate::coord::Direction8;
use crate::terrain::ExtraKind;
use crate::types::{CityId, ExtraId, PlayerId, TileIndex, UnitId, UnitTypeId};
use serde::{Deserialize, Serialize};

/// Longest order queue a unit may hold.
pub const MAX_ORDERS_LEN: usize = 2000;

/// What a unit is currently doing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Activity {
    #[default]
    Idle,
    Pollution,
    Mine,
    Irrigate,
    Fortified,
    Sentry,
    Pillage,
    Explore,
    Transform,
    Fortifying,
    Fallout,
    Base,
    GenRoad,
    Convert,
    Cultivate,
    Plant,
}

impl Activity {
    pub const ALL: [Activity; 16] = [
        Activity::Idle,
        Activity::Pollution,
        Activity::Mine,
        Activity::Irrigate,
        Activity::Fortified,
        Activity::Sentry,
        Activity::Pillage,
        Activity::Explore,
        Activity::Transform,
        Activity::Fortifying,
        Activity::Fallout,
        Activity::Base,
        Activity::GenRoad,
        Activity::Convert,
        Activity::Cultivate,
        Activity::Plant,
    ];

    pub const fn name(&self) -> &'static str {
        match self {
            Activity::Idle => "Idle",
            Activity::Pollution => "Pollution",
            Activity::Mine => "Mine",
            Activity::Irrigate => "Irrigate",
            Activity::Fortified => "Fortified",
            Activity::Sentry => "Sentry",
            Activity::Pillage => "Pillage",
            Activity::Explore => "Explore",
            Activity::Transform => "Transform",
            Activity::Fortifying => "Fortifying",
            Activity::Fallout => "Fallout",
            Activity::Base => "Base",
            Activity::GenRoad => "Road",
            Activity::Convert => "Convert",
            Activity::Cultivate => "Cultivate",
            Activity::Plant => "Plant",
        }
    }

    /// Whether the activity acts on a specific extra.
    pub const fn takes_target(&self) -> bool {
        matches!(
            self,
            Activity::Pollution
                | Activity::Mine
                | Activity::Irrigate
                | Activity::Pillage
                | Activity::Fallout
                | Activity::Base
                | Activity::GenRoad
        )
    }

    /// Whether an extra of `kind` is a valid target for this activity.
    pub const fn accepts_target(&self, kind: ExtraKind) -> bool {
        match self {
            Activity::Pollution => matches!(kind, ExtraKind::Pollution),
            Activity::Fallout => matches!(kind, ExtraKind::Fallout),
            Activity::Mine => matches!(kind, ExtraKind::Mine),
            Activity::Irrigate => matches!(kind, ExtraKind::Irrigation),
            Activity::Base => matches!(kind, ExtraKind::Base),
            Activity::GenRoad => matches!(kind, ExtraKind::Road),
            Activity::Pillage => matches!(
                kind,
                ExtraKind::Road | ExtraKind::Base | ExtraKind::Irrigation | ExtraKind::Mine
            ),
            _ => false,
        }
    }
}

impl std::fmt::Display for Activity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Actions a unit can be ordered to perform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionId {
    EstablishEmbassy,
    InvestigateCity,
    TradeRoute,
    HelpWonder,
    FoundCity,
    JoinCity,
    Pillage,
    Fortify,
    DisbandUnit,
    HomeCity,
    CaptureUnits,
    Bombard,
    ConquerCity,
    TransportBoard,
}

impl ActionId {
    pub const ALL: [ActionId; 14] = [
        ActionId::EstablishEmbassy,
        ActionId::InvestigateCity,
        ActionId::TradeRoute,
        ActionId::HelpWonder,
        ActionId::FoundCity,
        ActionId::JoinCity,
        ActionId::Pillage,
        ActionId::Fortify,
        ActionId::DisbandUnit,
        ActionId::HomeCity,
        ActionId::CaptureUnits,
        ActionId::Bombard,
        ActionId::ConquerCity,
        ActionId::TransportBoard,
    ];

    /// Rule name, used in the savefile action table.
    pub const fn name(&self) -> &'static str {
        match self {
            ActionId::EstablishEmbassy => "Establish Embassy",
            ActionId::InvestigateCity => "Investigate City",
            ActionId::TradeRoute => "Enter Trade Route",
            ActionId::HelpWonder => "Help Wonder",
            ActionId::FoundCity => "Found City",
            ActionId::JoinCity => "Join City",
            ActionId::Pillage => "Pillage",
            ActionId::Fortify => "Fortify",
            ActionId::DisbandUnit => "Disband Unit",
            ActionId::HomeCity => "Home City",
            ActionId::CaptureUnits => "Capture Units",
            ActionId::Bombard => "Bombard",
            ActionId::ConquerCity => "Conquer City",
            ActionId::TransportBoard => "Transport Board",
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.name() == name)
    }
}

/// One entry of a unit's order queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Order {
    /// Move one tile.
    Move(Direction8),
    /// Start an activity, optionally aimed at an extra.
    Activity {
        activity: Activity,
        target: Option<ExtraId>,
    },
    /// Perform an action toward the unit's next tile.
    PerformAction(ActionId),
    /// Wait until movement is fully restored.
    FullMovePoints,
    /// Go back to the home city.
    ReturnHome,
}

/// A unit's pending order queue.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitOrders {
    pub list: Vec<Order>,
    /// Next order to execute.
    pub index: usize,
    /// Restart from the beginning when finished.
    pub repeat: bool,
    /// Cancel orders when an enemy comes into view.
    pub vigilant: bool,
}

impl UnitOrders {
    pub fn new(list: Vec<Order>) -> Self {
        Self {
            list,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

/// AI scratch data. References are other unit ids.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitAi {
    pub done: bool,
    pub passenger: Option<UnitId>,
    pub ferryboat: Option<UnitId>,
    pub charge: Option<UnitId>,
    pub bodyguard: Option<UnitId>,
}

/// A unit on the game map.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Identity number.
    pub id: UnitId,
    /// Owning player.
    pub owner: PlayerId,
    /// Player the unit was built for; may differ from the owner.
    pub nationality: PlayerId,
    pub unit_type: UnitTypeId,
    pub tile: TileIndex,
    /// Home city, by identity number.
    pub homecity: Option<CityId>,
    /// Remaining movement points.
    pub moves_left: u32,
    pub fuel: u32,
    pub hp: u32,
    pub veteran: u8,
    pub activity: Activity,
    pub activity_target: Option<ExtraId>,
    /// Work accumulated on the current activity.
    pub activity_count: i32,
    pub done_moving: bool,
    pub orders: UnitOrders,
    /// Carrier, by identity number.
    pub transported_by: Option<UnitId>,
    pub battlegroup: Option<u8>,
    pub birth_turn: i32,
    pub ai: UnitAi,
}

impl Unit {
    /// Create an idle unit with full health and movement.
    pub fn new(
        id: UnitId,
        owner: PlayerId,
        unit_type: UnitTypeId,
        tile: TileIndex,
        hp: u32,
        moves: u32,
    ) -> Self {
        Self {
            id,
            owner,
            nationality: owner,
            unit_type,
            tile,
            homecity: None,
            moves_left: moves,
            fuel: 0,
            hp,
            veteran: 0,
            activity: Activity::Idle,
            activity_target: None,
            activity_count: 0,
            done_moving: false,
            orders: UnitOrders::default(),
            transported_by: None,
            battlegroup: None,
            birth_turn: 0,
            ai: UnitAi::default(),
        }
    }

    /// Whether the unit is being carried.
    pub fn is_transported(&self) -> bool {
        self.transported_by.is_some()
    }

    pub fn has_orders(&self) -> bool {
        !self.orders.is_empty()
    }

    /// Drop all orders.
    pub fn clear_orders(&mut self) {
        self.orders = UnitOrders::default();
    }

    /// Return to idle.
    pub fn set_idle(&mut self) {
        self.activity = Activity::Idle;
        self.activity_target = None;
        self.activity_count = 0;
    }
}
