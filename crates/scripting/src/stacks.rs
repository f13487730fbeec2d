use std::slice;

use cardtable_engine::game::StackId;
use mlua::UserData;

/// A stack argument as a script sees it: either one named pile or an
/// ordered set of candidate piles. Every API function pattern-matches
/// on this explicitly; there is no duck typing at the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackSel {
    Single(StackId),
    Many(Vec<StackId>),
}

impl StackSel {
    /// Candidate piles in fixed enumeration order.
    pub fn candidates(&self) -> &[StackId] {
        match self {
            StackSel::Single(id) => slice::from_ref(id),
            StackSel::Many(ids) => ids,
        }
    }

    pub fn is_many(&self) -> bool {
        matches!(self, StackSel::Many(_))
    }
}

/// Opaque handle passed through Lua. Scripts obtain these from
/// `waste()`, `foundation()`, `tableau()` and `column(i)` and hand them
/// back to the move and query functions; there is nothing to call on
/// them from the script side.
#[derive(Debug, Clone)]
pub struct PileHandle(pub StackSel);

impl UserData for PileHandle {}
