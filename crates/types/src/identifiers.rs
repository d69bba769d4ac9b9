//! Domain-specific identifier types.

use std::fmt;

/// Table identifier.
///
/// Active tables are numbered from zero; the overflow table takes the index
/// right after the last active table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub u32);

impl TableId {
    /// Position of this table in the coordinator's table list.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Table({})", self.0)
    }
}

/// Seat position within a table ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeatIndex(pub u32);

impl SeatIndex {
    /// Get the seat to the right in a ring of `seats` places.
    pub fn next(self, seats: u32) -> Self {
        SeatIndex((self.0 + 1) % seats)
    }

    /// Position of this seat in the table's seat list.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SeatIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Seat({})", self.0)
    }
}

/// Philosopher identifier.
///
/// Assigned table-major at startup (`table * seats + seat`) and kept when a
/// philosopher is migrated, so the same person keeps the same id and name
/// across tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PhilosopherId(pub u32);

impl PhilosopherId {
    /// Derive the startup id of the philosopher seated at `seat` of `table`.
    pub fn at(table: TableId, seat: SeatIndex, seats_per_table: u32) -> Self {
        PhilosopherId(table.0 * seats_per_table + seat.0)
    }

    /// Human-readable name.
    ///
    /// The first 26 philosophers are lettered `A` to `Z`; later ones fall
    /// back to their number.
    pub fn display_name(self) -> String {
        match char::from_u32(u32::from(b'A') + self.0) {
            Some(letter) if self.0 < 26 => format!("Philosopher {letter}"),
            _ => format!("Philosopher {}", self.0),
        }
    }
}

impl fmt::Display for PhilosopherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Philosopher({})", self.0)
    }
}

/// Fork identifier: the table it belongs to and its position in the ring.
///
/// Fork `i` sits between seat `i - 1` (as its right fork) and seat `i`
/// (as its left fork).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ForkId {
    /// Owning table.
    pub table: TableId,
    /// Position in the table ring.
    pub index: u32,
}

impl ForkId {
    /// Create a fork identifier.
    pub fn new(table: TableId, index: u32) -> Self {
        Self { table, index }
    }
}

impl fmt::Display for ForkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fork({}.{})", self.table.0, self.index)
    }
}
