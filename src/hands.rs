use anyhow::{Result, anyhow};
use headless_chrome::protocol::cdp::Log::LogEntryLevel;
use headless_chrome::protocol::cdp::types::Event;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::RenderMode;
use crate::dom;
use crate::driver::BrowserDriver;
use crate::types::{ClickOutcome, ElementSummary, INTERACTABLE_SELECTOR, LogCounts, Severity};

/// Chrome stays alive this long without protocol traffic. Agents may think
/// for a while between steps.
const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(600);

/// A Chrome session driven over the DevTools protocol.
pub struct ChromeDriver {
    browser: Option<Browser>,
    tab: Arc<Tab>,
    console: Arc<Mutex<LogCounts>>,
    instrumented: HashSet<String>,
}

impl ChromeDriver {
    pub fn launch(render_mode: RenderMode, chrome_path: Option<PathBuf>) -> Result<Self> {
        let options = LaunchOptions {
            headless: render_mode == RenderMode::Headless,
            path: chrome_path,
            args: vec![
                OsStr::new("--no-first-run"),
                OsStr::new("--no-default-browser-check"),
            ],
            idle_browser_timeout: IDLE_BROWSER_TIMEOUT,
            ..Default::default()
        };

        info!(target: "hands", ?render_mode, "starting Chrome");
        let browser =
            Browser::new(options).map_err(|e| anyhow!("Browser launch failed: {}", e))?;
        let tab = browser.wait_for_initial_tab()?;

        let mut driver = Self {
            browser: Some(browser),
            tab: Arc::clone(&tab),
            console: Arc::new(Mutex::new(LogCounts::default())),
            instrumented: HashSet::new(),
        };
        driver.instrument(&tab)?;
        info!(target: "hands", "Chrome ready");
        Ok(driver)
    }

    fn browser(&self) -> Result<&Browser> {
        self.browser
            .as_ref()
            .ok_or_else(|| anyhow!("browser session has been closed"))
    }

    fn find_tab(&self, handle: &str) -> Result<Arc<Tab>> {
        let tabs = self
            .browser()?
            .get_tabs()
            .lock()
            .map_err(|_| anyhow!("tab registry lock poisoned"))?;
        tabs.iter()
            .find(|tab| tab.get_target_id() == handle)
            .cloned()
            .ok_or_else(|| anyhow!("no open window with handle {}", handle))
    }

    /// Route the tab's console output into the shared counter. Once per tab.
    fn instrument(&mut self, tab: &Arc<Tab>) -> Result<()> {
        if !self.instrumented.insert(tab.get_target_id().clone()) {
            return Ok(());
        }
        tab.enable_log()?;
        tab.enable_runtime()?;
        let sink = Arc::clone(&self.console);
        tab.add_event_listener(Arc::new(move |event: &Event| {
            if let Some(severity) = severity_of(event) {
                if let Ok(mut counts) = sink.lock() {
                    counts.record(severity);
                }
            }
        }))?;
        Ok(())
    }

    fn element_at<'a>(
        tab: &'a Tab,
        index: usize,
    ) -> Result<headless_chrome::Element<'a>> {
        tab.find_elements(INTERACTABLE_SELECTOR)?
            .into_iter()
            .nth(index)
            .ok_or_else(|| anyhow!("no interactable element at index {}", index))
    }
}

impl BrowserDriver for ChromeDriver {
    fn navigate(&mut self, url: &str) -> Result<()> {
        debug!(target: "hands", url, "navigating");
        self.tab.navigate_to(url)?.wait_until_navigated()?;
        Ok(())
    }

    fn current_url(&mut self) -> Result<String> {
        Ok(self.tab.get_url())
    }

    fn interactables(&mut self) -> Result<Vec<ElementSummary>> {
        dom::query_interactables(&self.tab)
    }

    fn count_text_matches(&mut self, keyword: &str) -> Result<u64> {
        dom::count_keyword(&self.tab, keyword)
    }

    fn click(&mut self, index: usize) -> Result<ClickOutcome> {
        let attempt =
            Self::element_at(&self.tab, index).and_then(|element| element.click().map(|_| ()));
        match attempt {
            Ok(()) => Ok(ClickOutcome::Clicked),
            Err(e) => {
                // Only a live session turns this into a scored click failure.
                self.tab
                    .evaluate("1", false)
                    .map_err(|fault| anyhow!("browser session lost during click: {:#}", fault))?;
                Ok(ClickOutcome::Failed(format!("{:#}", e)))
            }
        }
    }

    fn hover(&mut self, index: usize) -> Result<()> {
        Self::element_at(&self.tab, index)?.move_mouse_over()?;
        Ok(())
    }

    fn window_handles(&mut self) -> Result<Vec<String>> {
        let tabs = self
            .browser()?
            .get_tabs()
            .lock()
            .map_err(|_| anyhow!("tab registry lock poisoned"))?;
        Ok(tabs.iter().map(|tab| tab.get_target_id().clone()).collect())
    }

    fn current_window(&mut self) -> Result<String> {
        Ok(self.tab.get_target_id().clone())
    }

    fn switch_to_window(&mut self, handle: &str) -> Result<()> {
        let tab = self.find_tab(handle)?;
        tab.activate()?;
        self.instrument(&tab)?;
        self.tab = tab;
        debug!(target: "hands", handle, "switched window");
        Ok(())
    }

    fn close_window(&mut self, handle: &str) -> Result<()> {
        let tab = self.find_tab(handle)?;
        tab.close(false)?;
        self.instrumented.remove(handle);
        debug!(target: "hands", handle, "closed window");
        Ok(())
    }

    fn drain_console_logs(&mut self) -> Result<LogCounts> {
        let mut counts = self
            .console
            .lock()
            .map_err(|_| anyhow!("console log buffer poisoned"))?;
        Ok(std::mem::take(&mut *counts))
    }

    fn quit(&mut self) -> Result<()> {
        if self.browser.take().is_some() {
            info!(target: "hands", "Chrome shut down");
        } else {
            warn!(target: "hands", "quit called on a closed browser session");
        }
        Ok(())
    }
}

/// Severity of a CDP event that belongs in the console log, if any.
///
/// Covers Log domain entries, `console.*` calls and uncaught exceptions.
pub fn severity_of(event: &Event) -> Option<Severity> {
    match event {
        Event::LogEntryAdded(added) => log_level_severity(&added.params.entry.level),
        Event::RuntimeConsoleAPICalled(called) => serde_json::to_value(&called.params.Type)
            .ok()
            .and_then(|kind| kind.as_str().and_then(console_api_severity)),
        Event::RuntimeExceptionThrown(_) => Some(Severity::Severe),
        _ => None,
    }
}

fn log_level_severity(level: &LogEntryLevel) -> Option<Severity> {
    match level {
        LogEntryLevel::Error => Some(Severity::Severe),
        LogEntryLevel::Warning => Some(Severity::Warning),
        LogEntryLevel::Info => Some(Severity::Info),
        LogEntryLevel::Verbose => None,
    }
}

/// Maps the `type` of a `Runtime.consoleAPICalled` event.
fn console_api_severity(kind: &str) -> Option<Severity> {
    match kind {
        "error" | "assert" => Some(Severity::Severe),
        "warning" => Some(Severity::Warning),
        "log" | "info" | "debug" => Some(Severity::Info),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_domain_levels_map_to_severities() {
        assert_eq!(log_level_severity(&LogEntryLevel::Error), Some(Severity::Severe));
        assert_eq!(log_level_severity(&LogEntryLevel::Warning), Some(Severity::Warning));
        assert_eq!(log_level_severity(&LogEntryLevel::Info), Some(Severity::Info));
        assert_eq!(log_level_severity(&LogEntryLevel::Verbose), None);
    }

    #[test]
    fn console_calls_map_to_severities() {
        assert_eq!(console_api_severity("error"), Some(Severity::Severe));
        assert_eq!(console_api_severity("assert"), Some(Severity::Severe));
        assert_eq!(console_api_severity("warning"), Some(Severity::Warning));
        for kind in ["log", "info", "debug"] {
            assert_eq!(console_api_severity(kind), Some(Severity::Info));
        }
        assert_eq!(console_api_severity("table"), None);
        assert_eq!(console_api_severity("endGroup"), None);
    }
}
