/// Pagination state definitions for tracking crawl progress
use std::fmt;

/// Why the pagination loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Termination {
    /// The site answered `page` with its "no such page" status
    EndOfPages { page: u32, status: u16 },

    /// The configured page cap was reached after `last_page`
    PageLimit { last_page: u32 },

    /// Fetching or persisting `page` failed unrecoverably
    Fatal { page: u32 },
}

impl Termination {
    /// Returns true if this ends the crawl as a successful completion
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Fatal { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EndOfPages { .. } => "end_of_pages",
            Self::PageLimit { .. } => "page_limit",
            Self::Fatal { .. } => "fatal",
        }
    }
}

/// Represents the current state of the pagination loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlState {
    /// Listing page `page` is the next one to fetch
    Running { page: u32 },

    /// The crawl is over
    Terminated(Termination),
}

impl Default for CrawlState {
    fn default() -> Self {
        Self::initial()
    }
}

impl CrawlState {
    /// The state every crawl starts in
    pub fn initial() -> Self {
        Self::Running { page: 1 }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminated(_))
    }

    /// Returns the page about to be fetched, if still running
    pub fn current_page(&self) -> Option<u32> {
        match self {
            Self::Running { page } => Some(*page),
            Self::Terminated(_) => None,
        }
    }

    /// Returns the termination reason, if terminated
    pub fn termination(&self) -> Option<Termination> {
        match self {
            Self::Running { .. } => None,
            Self::Terminated(reason) => Some(*reason),
        }
    }

    /// Moves `Running(N)` to `Running(N+1)`; terminal states are left as they are
    pub fn advance(self) -> Self {
        match self {
            Self::Running { page } => Self::Running {
                page: page.saturating_add(1),
            },
            terminated => terminated,
        }
    }

    /// Terminates a running crawl; the first termination reason wins
    pub fn terminate(self, reason: Termination) -> Self {
        match self {
            Self::Running { .. } => Self::Terminated(reason),
            terminated => terminated,
        }
    }

    /// Returns the highest listing page whose fan-out fully drained
    pub fn last_completed_page(&self) -> u32 {
        match self {
            Self::Running { page } => page.saturating_sub(1),
            Self::Terminated(Termination::EndOfPages { page, .. })
            | Self::Terminated(Termination::Fatal { page }) => page.saturating_sub(1),
            Self::Terminated(Termination::PageLimit { last_page }) => *last_page,
        }
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running { page } => write!(f, "running(page={})", page),
            Self::Terminated(reason) => write!(f, "terminated({})", reason.as_str()),
        }
    }
}
