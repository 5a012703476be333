//! Cell/table identity and the weekday table rotation.

use chrono::{Datelike, NaiveDate, Weekday};

/// One of the six fixed cell colors. Cell identity is immutable config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CellColor {
    Red,
    Blue,
    Green,
    Black,
    Purple,
    Orange,
}

impl CellColor {
    pub const ALL: [CellColor; 6] = [
        CellColor::Red,
        CellColor::Blue,
        CellColor::Green,
        CellColor::Black,
        CellColor::Purple,
        CellColor::Orange,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CellColor::Red => "RED",
            CellColor::Blue => "BLUE",
            CellColor::Green => "GREEN",
            CellColor::Black => "BLACK",
            CellColor::Purple => "PURPLE",
            CellColor::Orange => "ORANGE",
        }
    }

    pub fn mold_name(&self) -> String {
        format!("{}_MOLD", self.as_str())
    }
}

impl std::fmt::Display for CellColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which of a cell's two tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TableIndex {
    One,
    Two,
}

impl TableIndex {
    pub fn opposite(&self) -> TableIndex {
        match self {
            TableIndex::One => TableIndex::Two,
            TableIndex::Two => TableIndex::One,
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            TableIndex::One => 1,
            TableIndex::Two => 2,
        }
    }
}

/// A table identifier, e.g. `RED_1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableId {
    pub cell: CellColor,
    pub table: TableIndex,
}

impl std::fmt::Display for TableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.cell, self.table.as_u8())
    }
}

/// Labor-difficulty class affecting pairing constraints on opposite tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SchedClass {
    A,
    B,
    C,
    D,
    E,
}

/// True if placing `sched_class` on one table while `opposite_class` (if
/// any) occupies the other table of the same cell would create a
/// concurrent conflict.
///
/// Conflict iff both tables run class C, or both tables run a class in
/// `{D, E}`.
pub fn has_concurrent_conflict(sched_class: SchedClass, opposite_class: Option<SchedClass>) -> bool {
    let Some(other) = opposite_class else {
        return false;
    };
    let both_c = sched_class == SchedClass::C && other == SchedClass::C;
    let de = |c: SchedClass| matches!(c, SchedClass::D | SchedClass::E);
    let both_de = de(sched_class) && de(other);
    both_c || both_de
}

const WEEKDAY_TABLE_ORDER: [[CellColor; 6]; 5] = [
    [
        CellColor::Blue,
        CellColor::Green,
        CellColor::Red,
        CellColor::Black,
        CellColor::Purple,
        CellColor::Orange,
    ],
    [
        CellColor::Green,
        CellColor::Red,
        CellColor::Black,
        CellColor::Purple,
        CellColor::Blue,
        CellColor::Orange,
    ],
    [
        CellColor::Red,
        CellColor::Black,
        CellColor::Purple,
        CellColor::Blue,
        CellColor::Green,
        CellColor::Orange,
    ],
    [
        CellColor::Black,
        CellColor::Purple,
        CellColor::Blue,
        CellColor::Green,
        CellColor::Red,
        CellColor::Orange,
    ],
    [
        CellColor::Purple,
        CellColor::Blue,
        CellColor::Green,
        CellColor::Red,
        CellColor::Black,
        CellColor::Orange,
    ],
];

/// Table processing order for `schedule_date`, filtered to `active_cells`.
///
/// Saturday and Sunday use Friday's ordering (index 4). This prevents
/// systematic bias toward any single cell across the working week.
pub fn table_order(schedule_date: NaiveDate, active_cells: &[CellColor]) -> Vec<CellColor> {
    let idx = match schedule_date.weekday() {
        Weekday::Mon => 0,
        Weekday::Tue => 1,
        Weekday::Wed => 2,
        Weekday::Thu => 3,
        Weekday::Fri | Weekday::Sat | Weekday::Sun => 4,
    };
    WEEKDAY_TABLE_ORDER[idx]
        .iter()
        .filter(|c| active_cells.contains(c))
        .copied()
        .collect()
}
