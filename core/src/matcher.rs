//! Rule-based auto-assignment matcher.
//!
//! Routing is a boolean predicate, not a score: a staff member qualifies when
//! they work in the complaint's city and their profession's keyword list hits
//! the complaint category. Ties break to the first candidate in directory
//! order — callers that want a different priority (least-loaded, round-robin)
//! sort the directory before calling. No load balancing here.

use crate::complaint::{Complaint, ComplaintCategory};
use crate::config::EngineConfig;
use crate::staff::{Profession, StaffProfile};

/// Case-insensitive city equality, the assignment rule's only geography.
pub fn same_city(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Does this profession handle this category?
///
/// True when the category label, lowercased, contains any of the profession's
/// configured keywords. An empty keyword list never matches.
pub fn profession_handles(
    config: &EngineConfig,
    profession: Profession,
    category: ComplaintCategory,
) -> bool {
    let label = category.label().to_ascii_lowercase();
    config
        .profession_keywords
        .get(&profession)
        .map(|keywords| keywords.iter().any(|k| label.contains(k.as_str())))
        .unwrap_or(false)
}

/// Select an assignee for a complaint, or `None` when no one qualifies.
///
/// `None` is a valid outcome, not a fault — the complaint stays OPEN and
/// unassigned. A fault only occurs upstream, if the directory itself cannot
/// be read.
pub fn select<'a>(
    config: &EngineConfig,
    complaint: &Complaint,
    directory: &'a [StaffProfile],
) -> Option<&'a StaffProfile> {
    directory
        .iter()
        .filter(|staff| same_city(&staff.city, &complaint.location.city))
        .find(|staff| profession_handles(config, staff.profession, complaint.category))
}
