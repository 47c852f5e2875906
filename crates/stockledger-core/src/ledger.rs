//! # Ledger Rules
//!
//! The rules that derive and guard an item's balance:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Ledger Rules                                    │
//! │                                                                         │
//! │  1. BALANCE (always a full re-scan, never incremental)                 │
//! │     available = Σinbound − Σoutbound − Σloaned + Σreturned             │
//! │     • no time window, order irrelevant                                 │
//! │     • may go negative, never clamped                                   │
//! │                                                                         │
//! │  2. COMPENSATION (item create/update with a target quantity)           │
//! │     delta = requested − available                                      │
//! │     delta > 0 → inbound  |delta|                                       │
//! │     delta < 0 → outbound |delta|                                       │
//! │     delta = 0 → nothing                                                │
//! │                                                                         │
//! │  3. AVAILABILITY (direct outbound/loaned movements only)               │
//! │     quantity <= available, checked before the movement is applied      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{CoreError, CoreResult};
use crate::types::{Movement, MovementType};

/// Aggregates an item's full movement history into its available quantity.
///
/// Sums in `i64` so that no partial sum can overflow; the final value must
/// fit the persisted `i32` column.
///
/// ## Example
/// ```rust
/// use stockledger_core::ledger::balance_from_entries;
/// use stockledger_core::MovementType::*;
///
/// let entries = [(Inbound, 10), (Loaned, 4), (Returned, 1), (Outbound, 2)];
/// assert_eq!(balance_from_entries(entries).unwrap(), 5);
/// ```
pub fn balance_from_entries<I>(entries: I) -> CoreResult<i32>
where
    I: IntoIterator<Item = (MovementType, i32)>,
{
    let total: i64 = entries
        .into_iter()
        .map(|(movement_type, quantity)| movement_type.sign() * i64::from(quantity))
        .sum();

    i32::try_from(total).map_err(|_| CoreError::QuantityOverflow { value: total })
}

/// Same as [`balance_from_entries`] over stored movement rows.
pub fn compute_balance<'a, I>(movements: I) -> CoreResult<i32>
where
    I: IntoIterator<Item = &'a Movement>,
{
    balance_from_entries(
        movements
            .into_iter()
            .map(|m| (m.movement_type, m.quantity)),
    )
}

/// A movement synthesized to bring the balance to a requested target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compensation {
    pub movement_type: MovementType,
    pub quantity: i32,
}

/// Derives the compensating movement that moves `available` to `requested`.
///
/// Returns `None` when they are equal. Only `Inbound`/`Outbound` are ever
/// produced, and the result is not checked against availability: the item
/// write path may take the balance below zero.
///
/// Fails with [`CoreError::QuantityOverflow`] when the difference does not
/// fit one movement's quantity.
///
/// ## Example
/// ```rust
/// use stockledger_core::ledger::compensating_movement;
/// use stockledger_core::MovementType;
///
/// let comp = compensating_movement(0, -3).unwrap().unwrap();
/// assert_eq!(comp.movement_type, MovementType::Outbound);
/// assert_eq!(comp.quantity, 3);
///
/// assert!(compensating_movement(7, 7).unwrap().is_none());
/// ```
pub fn compensating_movement(
    available: i32,
    requested: i32,
) -> CoreResult<Option<Compensation>> {
    let delta = i64::from(requested) - i64::from(available);
    let movement_type = match delta.signum() {
        0 => return Ok(None),
        1 => MovementType::Inbound,
        _ => MovementType::Outbound,
    };

    let quantity = i32::try_from(delta.unsigned_abs())
        .map_err(|_| CoreError::QuantityOverflow { value: delta })?;

    Ok(Some(Compensation {
        movement_type,
        quantity,
    }))
}

/// Checks a direct ledger movement against the current balance.
///
/// `available` is the balance *before* this movement is applied. Types that
/// add stock always pass.
pub fn ensure_available(
    item_id: &str,
    available: i32,
    movement_type: MovementType,
    quantity: i32,
) -> CoreResult<()> {
    if movement_type.consumes_stock() && quantity > available {
        return Err(CoreError::InsufficientQuantity {
            item_id: item_id.to_string(),
            available,
            requested: quantity,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
