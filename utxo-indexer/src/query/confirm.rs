use crate::db::{Eligibility, UtxoStore};

/// Highest block whose outputs a request may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationCeiling {
    Unbounded,
    AtMost(u64),
    // The threshold covers the whole chain, nothing is confirmed yet
    Empty,
}

impl ConfirmationCeiling {
    /// `threshold` only applies when `only_confirmed` is set.
    pub fn compute(head: Option<u64>, only_confirmed: bool, threshold: u64) -> Self {
        if !only_confirmed {
            return ConfirmationCeiling::Unbounded;
        }

        match head {
            Some(head) if threshold < head => ConfirmationCeiling::AtMost(head - threshold),
            _ => ConfirmationCeiling::Empty,
        }
    }

    /// Resolve with a single head lookup, the result is reused for every
    /// store call of the request.
    pub fn resolve(
        store: &dyn UtxoStore,
        only_confirmed: Option<bool>,
        confirm_threshold: Option<u64>,
        default_threshold: u64,
    ) -> Result<Self, String> {
        let only_confirmed = only_confirmed.unwrap_or(false);
        if !only_confirmed {
            return Ok(ConfirmationCeiling::Unbounded);
        }

        let threshold = confirm_threshold.unwrap_or(default_threshold);
        let head = store.current_head_height()?;
        let ceiling = Self::compute(head, true, threshold);
        debug!(
            "Confirmation ceiling: head={:?}, threshold={}, ceiling={:?}",
            head, threshold, ceiling
        );

        Ok(ceiling)
    }

    /// `None` means no output can match and the store need not be asked.
    pub fn eligibility(&self) -> Option<Eligibility> {
        match self {
            ConfirmationCeiling::Unbounded => Some(Eligibility::Unspent {
                max_block_number: None,
            }),
            ConfirmationCeiling::AtMost(max) => Some(Eligibility::Unspent {
                max_block_number: Some(*max),
            }),
            ConfirmationCeiling::Empty => None,
        }
    }
}
