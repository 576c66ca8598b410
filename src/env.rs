//! Episodic web-exploration environment.
//!
//! Each episode starts on the configured page. The agent walks a selection
//! cursor over the page's interactable elements and clicks one to close an
//! action phase. Completing a phase is scored from the console logs the page
//! produced and whether the click went through. Episodes never terminate on
//! their own; they truncate once the page has nothing left to click.

use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

use crate::config::{EnvConfig, RenderMode};
use crate::driver::BrowserDriver;
use crate::error::EnvError;
use crate::hands::ChromeDriver;
use crate::reward::{InfoWeighting, RewardTable};
use crate::spaces::{ActionSpace, ExplorationAction, ObservationSpace};
use crate::types::{ClickOutcome, ElementSummary, Info, Observation, Transition};

pub const TRUNCATED_NO_INTERACTABLES: &str = "no interactable elements left on the page";

/// Standard reset/step/render/close contract for episodic environments.
pub trait Environment {
    type Action;
    type Observation;
    type Info;

    fn reset(&mut self, seed: Option<u64>) -> Result<(Self::Observation, Self::Info), EnvError>;

    fn step(
        &mut self,
        action: Self::Action,
    ) -> Result<Transition<Self::Observation, Self::Info>, EnvError>;

    fn render(&mut self) -> Result<(), EnvError>;

    fn close(&mut self) -> Result<(), EnvError>;
}

pub struct WebExplorationEnvironment<D: BrowserDriver = ChromeDriver> {
    driver: D,
    target_url: String,
    keywords: Vec<String>,
    rewards: RewardTable,
    info_weighting: InfoWeighting,
    render_mode: RenderMode,
    observation_space: ObservationSpace,
    action_space: ActionSpace,
    interactables: Vec<ElementSummary>,
    cursor: usize,
    actions_taken: u64,
    windows: BTreeSet<String>,
    closed: bool,
}

impl WebExplorationEnvironment<ChromeDriver> {
    /// Validate `config` and launch a Chrome session for it.
    pub fn new(config: EnvConfig) -> Result<Self, EnvError> {
        config.target_url()?;
        let driver = ChromeDriver::launch(config.render_mode, config.chrome_path.clone())?;
        Self::with_driver(config, driver)
    }
}

impl<D: BrowserDriver> WebExplorationEnvironment<D> {
    pub fn with_driver(config: EnvConfig, driver: D) -> Result<Self, EnvError> {
        let target_url = config.target_url()?.to_string();
        let rewards = RewardTable::from_overrides(&config.rewards)?;
        if config.info_weighting == InfoWeighting::WarningCount {
            warn!(
                target: "env",
                "INFO log reward is weighted by the WARNING log count (legacy scoring)"
            );
        }

        let mut keywords = Vec::new();
        for keyword in config.keywords {
            if !keywords.contains(&keyword) {
                keywords.push(keyword);
            }
        }

        Ok(Self {
            driver,
            target_url,
            observation_space: ObservationSpace::new(&keywords),
            action_space: ActionSpace::discrete(2),
            keywords,
            rewards,
            info_weighting: config.info_weighting,
            render_mode: config.render_mode,
            interactables: Vec::new(),
            cursor: 0,
            actions_taken: 0,
            windows: BTreeSet::new(),
            closed: false,
        })
    }

    pub fn action_space(&self) -> &ActionSpace {
        &self.action_space
    }

    pub fn observation_space(&self) -> &ObservationSpace {
        &self.observation_space
    }

    pub fn reward_table(&self) -> &RewardTable {
        &self.rewards
    }

    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    /// Index of the currently selected interactable.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn actions_taken(&self) -> u64 {
        self.actions_taken
    }

    pub fn interactables(&self) -> &[ElementSummary] {
        &self.interactables
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Window handles the environment currently tracks.
    pub fn tracked_windows(&self) -> impl Iterator<Item = &str> {
        self.windows.iter().map(String::as_str)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> Result<(), EnvError> {
        if self.closed {
            Err(EnvError::Closed)
        } else {
            Ok(())
        }
    }

    /// Re-query the page and keep the cursor inside the new set.
    fn refresh_interactables(&mut self) -> Result<(), EnvError> {
        self.interactables = self.driver.interactables()?;
        self.cursor = match self.interactables.len() {
            0 => 0,
            len => self.cursor % len,
        };
        Ok(())
    }

    /// Hover the selected element. Purely cosmetic, so failures are dropped.
    fn highlight_selection(&mut self) {
        if self.interactables.is_empty() {
            return;
        }
        if let Err(e) = self.driver.hover(self.cursor) {
            debug!(target: "env", cursor = self.cursor, "hover failed: {:#}", e);
        }
    }

    /// Follow windows opened or closed by the page onto the newest one.
    fn reconcile_windows(&mut self) -> Result<(), EnvError> {
        let live = self.driver.window_handles()?;
        let live_set: BTreeSet<String> = live.iter().cloned().collect();
        if live_set == self.windows {
            return Ok(());
        }
        if let Some(latest) = live.last() {
            info!(target: "env", window = %latest, "window set changed, switching focus");
            self.driver.switch_to_window(latest)?;
        }
        self.windows = live_set;
        Ok(())
    }

    fn observe(&mut self) -> Result<Observation, EnvError> {
        let mut keywords = BTreeMap::new();
        for keyword in &self.keywords {
            let count = self.driver.count_text_matches(keyword)?;
            keywords.insert(keyword.clone(), count);
        }
        Ok(Observation {
            keywords,
            interactables: self.interactables.len() as u64,
            actions_since_interaction: self.actions_taken,
        })
    }
}

impl<D: BrowserDriver> Environment for WebExplorationEnvironment<D> {
    type Action = u64;
    type Observation = Observation;
    type Info = Info;

    fn reset(&mut self, seed: Option<u64>) -> Result<(Observation, Info), EnvError> {
        self.ensure_open()?;
        debug!(target: "env", ?seed, url = %self.target_url, "reset");

        let focused = self.driver.current_window()?;
        for handle in self.driver.window_handles()? {
            if handle != focused {
                self.driver.close_window(&handle)?;
            }
        }
        self.windows = self.driver.window_handles()?.into_iter().collect();

        self.driver.navigate(&self.target_url)?;
        self.cursor = 0;
        self.refresh_interactables()?;
        self.highlight_selection();

        let discarded = self.driver.drain_console_logs()?;
        if !discarded.is_empty() {
            debug!(target: "env", ?discarded, "dropped page-load console logs");
        }
        self.actions_taken = 0;

        let observation = self.observe()?;
        let info = Info::at(self.driver.current_url()?);
        Ok((observation, info))
    }

    fn step(&mut self, action: u64) -> Result<Transition<Observation, Info>, EnvError> {
        self.ensure_open()?;
        let action = ExplorationAction::try_from(action)?;
        self.refresh_interactables()?;

        let mut reward: i64 = 0;
        let mut phase_completed = false;

        if !self.interactables.is_empty() {
            match action {
                ExplorationAction::AdvanceSelection => {
                    self.cursor = (self.cursor + 1) % self.interactables.len();
                    self.highlight_selection();
                    self.actions_taken += 1;
                }
                ExplorationAction::Interact => {
                    if let ClickOutcome::Failed(reason) = self.driver.click(self.cursor)? {
                        debug!(target: "env", cursor = self.cursor, "click failed: {}", reason);
                        reward = reward.saturating_add(self.rewards.click_failure());
                    }
                    self.cursor = 0;
                    phase_completed = true;
                }
            }
        }

        if phase_completed {
            let logs = self.driver.drain_console_logs()?;
            reward = reward.saturating_add(self.rewards.score_logs(&logs, self.info_weighting));
            self.actions_taken = 0;
            debug!(target: "env", ?logs, reward, "action phase completed");
        }

        self.reconcile_windows()?;
        self.refresh_interactables()?;

        let truncated = self.interactables.is_empty();
        let mut info = Info::at(self.driver.current_url()?);
        info.interactables = Some(self.interactables.clone());
        info.selection = Some(self.cursor);
        if truncated {
            info!(target: "env", url = %info.url, "episode truncated: {}", TRUNCATED_NO_INTERACTABLES);
            info.truncated = Some(TRUNCATED_NO_INTERACTABLES.to_string());
        }

        Ok(Transition {
            observation: self.observe()?,
            reward,
            terminated: false,
            truncated,
            info,
        })
    }

    fn render(&mut self) -> Result<(), EnvError> {
        match self.render_mode {
            RenderMode::Human => {
                debug!(target: "env", "render requested; the browser window is the render surface")
            }
            RenderMode::Headless => {
                debug!(target: "env", "render requested in headless mode; nothing to show")
            }
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), EnvError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.driver.quit()?;
        Ok(())
    }
}

impl<D: BrowserDriver> Drop for WebExplorationEnvironment<D> {
    fn drop(&mut self) {
        if !self.closed {
            self.closed = true;
            if let Err(e) = self.driver.quit() {
                warn!(target: "env", "failed to shut browser down: {:#}", e);
            }
        }
    }
}
