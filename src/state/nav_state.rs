/// Navigation state definitions for index-page traversal
///
/// This module defines the states the navigation controller moves through
/// while walking a paginated listing search.
use std::fmt;

/// Why traversal stopped normally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExhaustReason {
    /// The index page had no usable "next" control
    NoNextControl,

    /// The configured page bound was reached
    PageBound,

    /// The "next" control pointed at an already visited index page
    Loop,

    /// An index page could not be loaded
    NavigationFailure,
}

impl ExhaustReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoNextControl => "no_next_control",
            Self::PageBound => "page_bound",
            Self::Loop => "loop",
            Self::NavigationFailure => "navigation_failure",
        }
    }
}

impl fmt::Display for ExhaustReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Represents the current state of index-page traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavState {
    // ===== Active States =====
    /// An index page is selected and not yet enumerated
    AtIndexPage,

    /// Listing URLs of the current index page have been handed out
    EnumeratingListings,

    /// Looking for the next index page
    AdvancingPage,

    // ===== Terminal States =====
    /// No further index pages will be visited
    Exhausted(ExhaustReason),

    /// The fetch session became unusable
    Failed,
}

impl NavState {
    /// Returns true if traversal is over
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Exhausted(_) | Self::Failed)
    }

    /// Returns true if traversal ended without a session failure
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AtIndexPage => "at_index_page",
            Self::EnumeratingListings => "enumerating_listings",
            Self::AdvancingPage => "advancing_page",
            Self::Exhausted(_) => "exhausted",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for NavState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted(reason) => write!(f, "exhausted ({})", reason),
            other => write!(f, "{}", other.as_str()),
        }
    }
}
