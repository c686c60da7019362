//! Residue-class layouts that carve the flag space into labels.

use crate::{FLAG_SPACE, MAX_FIELDS};

/// Closed set of message kinds carried on the broadcast channel.
///
/// Variants are declared in decode priority order: moduli never increase
/// from one variant to the next.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Label {
    /// Request to spread out and explore.
    Explore,
    /// Request to retreat out of sight.
    Hide,
    /// The sender is holding its position.
    Defending,
    /// Request to strengthen the sender.
    Buff,
    /// Scouting report along one of 8 directions.
    Scout,
    /// A direction believed to be free of enemies.
    SafeDir,
    /// Attack in progress: a 256-valued strength and a 2-valued phase.
    Attacking,
    /// Wrapped location of a friendly base.
    AllyBase,
    /// Wrapped location to converge on.
    AttackLocation,
    /// Wrapped location of an enemy base plus a 16-valued strength bucket.
    EnemyBase,
    /// Wrapped location of a neutral base plus a 16-valued strength bucket.
    NeutralBase,
    /// Wrapped location of a threat plus a 32-valued severity.
    DangerInfo,
}

impl Label {
    /// Every label in decode priority order.
    pub const ALL: [Label; 12] = [
        Label::Explore,
        Label::Hide,
        Label::Defending,
        Label::Buff,
        Label::Scout,
        Label::SafeDir,
        Label::Attacking,
        Label::AllyBase,
        Label::AttackLocation,
        Label::EnemyBase,
        Label::NeutralBase,
        Label::DangerInfo,
    ];

    /// Bit layout reserved for the label.
    #[must_use]
    pub const fn layout(self) -> LabelLayout {
        LAYOUTS[self as usize]
    }

    /// Number of data fields the label carries.
    #[must_use]
    pub const fn arity(self) -> usize {
        self.layout().bounds.len()
    }
}

/// Residue class and mixed-radix field bounds of one label.
///
/// A label owns every value `v` with `v % modulus == residue`; its fields are
/// packed into `v / modulus`, first field in the lowest radix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LabelLayout {
    /// Modulus of the residue class.
    pub modulus: u32,
    /// Residue that identifies the label.
    pub residue: u32,
    /// Exclusive upper bound of each field.
    pub bounds: &'static [u32],
}

impl LabelLayout {
    /// Number of distinct payloads the fields can express.
    #[must_use]
    pub const fn capacity(&self) -> u64 {
        let mut capacity: u64 = 1;
        let mut index = 0;
        while index < self.bounds.len() {
            capacity *= self.bounds[index] as u64;
            index += 1;
        }
        capacity
    }
}

/// Layouts indexed by [`Label`] discriminant.
pub const LAYOUTS: [LabelLayout; 12] = [
    LabelLayout {
        modulus: 1 << 24,
        residue: 0,
        bounds: &[],
    },
    LabelLayout {
        modulus: 1 << 24,
        residue: 1 << 23,
        bounds: &[],
    },
    LabelLayout {
        modulus: 1 << 24,
        residue: 1 << 22,
        bounds: &[],
    },
    LabelLayout {
        modulus: 1 << 24,
        residue: 3 << 22,
        bounds: &[],
    },
    LabelLayout {
        modulus: 1 << 21,
        residue: 1 << 20,
        bounds: &[8],
    },
    LabelLayout {
        modulus: 1 << 21,
        residue: 1 << 19,
        bounds: &[8],
    },
    LabelLayout {
        modulus: 1 << 15,
        residue: 1 << 14,
        bounds: &[256, 2],
    },
    LabelLayout {
        modulus: 1 << 10,
        residue: 1 << 9,
        bounds: &[128, 128],
    },
    LabelLayout {
        modulus: 1 << 10,
        residue: 1 << 8,
        bounds: &[128, 128],
    },
    LabelLayout {
        modulus: 1 << 6,
        residue: 1 << 5,
        bounds: &[128, 128, 16],
    },
    LabelLayout {
        modulus: 1 << 6,
        residue: 1 << 4,
        bounds: &[128, 128, 16],
    },
    LabelLayout {
        modulus: 1 << 5,
        residue: 1 << 3,
        bounds: &[128, 128, 32],
    },
];

/// Checks a layout table for encodings that could collide or escape the flag
/// space when combined with `mask`.
///
/// A consistent table satisfies all of:
/// - every modulus is non-zero and every residue is below its modulus;
/// - every field bound is non-zero and no layout has more than
///   [`MAX_FIELDS`] fields;
/// - the largest encodable value, offset by one and masked, stays inside the
///   flag space;
/// - residue classes are pairwise disjoint;
/// - no payload encodes to the empty flag `0`;
/// - moduli never increase along the table, which is the decode order.
#[must_use]
pub const fn layouts_are_consistent(layouts: &[LabelLayout], mask: u32) -> bool {
    if mask >= FLAG_SPACE {
        return false;
    }

    let mut i = 0;
    while i < layouts.len() {
        let layout = layouts[i];
        if layout.modulus == 0 || layout.residue >= layout.modulus {
            return false;
        }
        if layout.bounds.len() > MAX_FIELDS {
            return false;
        }
        let mut field = 0;
        while field < layout.bounds.len() {
            if layout.bounds[field] == 0 {
                return false;
            }
            field += 1;
        }

        let largest =
            (layout.capacity() - 1) * layout.modulus as u64 + layout.residue as u64 + 1;
        if largest >= FLAG_SPACE as u64 {
            return false;
        }

        if mask > 0 {
            let sentinel = mask - 1;
            if sentinel % layout.modulus == layout.residue
                && ((sentinel / layout.modulus) as u64) < layout.capacity()
            {
                return false;
            }
        }

        if i > 0 && layout.modulus > layouts[i - 1].modulus {
            return false;
        }

        let mut j = i + 1;
        while j < layouts.len() {
            let other = layouts[j];
            let shared = gcd(layout.modulus, other.modulus);
            if shared > 0 && layout.residue % shared == other.residue % shared {
                return false;
            }
            j += 1;
        }
        i += 1;
    }
    true
}

const fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let rest = a % b;
        a = b;
        b = rest;
    }
    a
}
