use anyhow::Result;

use crate::types::{ClickOutcome, ElementSummary, LogCounts};

/// Blocking browser capability the environment is built on.
///
/// Interactable elements are addressed by their position in the most recent
/// [`BrowserDriver::interactables`] query; no element handle outlives a call.
/// Windows are addressed by opaque handle strings.
pub trait BrowserDriver {
    fn navigate(&mut self, url: &str) -> Result<()>;

    fn current_url(&mut self) -> Result<String>;

    /// Query the page for its clickable elements, in document order.
    fn interactables(&mut self) -> Result<Vec<ElementSummary>>;

    /// Number of elements whose text contains `keyword`. Zero when absent.
    fn count_text_matches(&mut self, keyword: &str) -> Result<u64>;

    /// Click the element at `index`. Element-level failures are an
    /// `Ok(ClickOutcome::Failed)`; `Err` means the session itself broke.
    fn click(&mut self, index: usize) -> Result<ClickOutcome>;

    fn hover(&mut self, index: usize) -> Result<()>;

    /// Open window handles, oldest first.
    fn window_handles(&mut self) -> Result<Vec<String>>;

    fn current_window(&mut self) -> Result<String>;

    fn switch_to_window(&mut self, handle: &str) -> Result<()>;

    fn close_window(&mut self, handle: &str) -> Result<()>;

    /// Console entries logged since the previous call.
    fn drain_console_logs(&mut self) -> Result<LogCounts>;

    /// Shut the browser down. Calling it again is a no-op.
    fn quit(&mut self) -> Result<()>;
}
