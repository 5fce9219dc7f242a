//! Proposal directory trait.

use crate::StoreError;
use govsync_types::ProposalId;

/// Read access to the registry of proposals known to the application.
///
/// The directory is populated outside the sync core; the core only lists it.
pub trait ProposalDirectory {
    /// All known proposal ids, ascending.
    ///
    /// Must fail rather than return a partial list: a truncated directory
    /// would silently hide proposals from callers.
    fn list_known_proposal_ids(&self) -> Result<Vec<ProposalId>, StoreError>;
}
