//! Course-relatedness heuristic.
//!
//! A turn only runs the retrieval step when the question mentions one of
//! the known assignment or topic names. This is a deliberately simple
//! keyword gate: false negatives merely skip the enrichment step, they
//! never block the turn, so a missed phrasing costs nothing but context.

/// Known assignment, project and topic names for the course.
pub const COURSE_TERMS: &[&str] = &[
    "metrosim",
    "passengerqueue",
    "calcyoulater",
    "gerp",
    "zap",
    "huffman",
    "arraylist",
    "linked list",
    "binary search tree",
    "hash table",
    "heap",
    "big o",
];

/// Returns `true` when the message mentions a known course term.
#[must_use]
pub fn is_course_related(message: &str) -> bool {
    let message = message.to_lowercase();
    COURSE_TERMS.iter().any(|term| message.contains(term))
}
