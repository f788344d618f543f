use crate::{browser::config::{ConnectionOptions, LaunchOptions, WaitOptions},
            error::{HarvestError, Result},
            tree::{ChromeTree, chrome::tree_ready_script}};
use headless_chrome::{Browser, Tab};
use std::{ffi::OsStr, sync::Arc, time::{Duration, Instant}};

/// Browser session that owns a Chrome instance and the tab hosting the tree
pub struct HarvestSession {
    /// The underlying headless_chrome Browser instance
    browser: Browser,

    /// The single tab the harvest works in
    tab: Arc<Tab>,
}

impl HarvestSession {
    /// Launch a new browser instance with the given options
    pub fn launch(options: LaunchOptions) -> Result<Self> {
        let mut launch_opts = headless_chrome::LaunchOptions::default();

        // Ignore default arguments to prevent detection by anti-bot services
        launch_opts.ignore_default_args.push(OsStr::new("--enable-automation"));
        launch_opts.args.push(OsStr::new("--disable-blink-features=AutomationControlled"));
        launch_opts.args.push(OsStr::new("--no-restore-session-state"));

        // Set the browser's idle timeout to 1 hour (default is 30 seconds); the user may take a while to log in
        launch_opts.idle_browser_timeout = Duration::from_secs(60 * 60);

        launch_opts.headless = options.headless;
        launch_opts.window_size = Some((options.window_width, options.window_height));

        if let Some(path) = options.chrome_path {
            launch_opts.path = Some(path);
        }

        // Persistent profile keeps the login cookies between runs
        if let Some(dir) = options.user_data_dir {
            launch_opts.user_data_dir = Some(dir);
        }

        launch_opts.sandbox = options.sandbox;

        let browser = Browser::new(launch_opts).map_err(|e| HarvestError::LaunchFailed(e.to_string()))?;

        Self::with_browser(browser)
    }

    /// Connect to an existing browser instance via WebSocket
    pub fn connect(options: ConnectionOptions) -> Result<Self> {
        let browser = Browser::connect(options.ws_url).map_err(|e| HarvestError::ConnectionFailed(e.to_string()))?;

        let session = Self::with_browser(browser)?;
        session.tab.set_default_timeout(Duration::from_millis(options.timeout));
        Ok(session)
    }

    /// Keep the first open tab (creating one if needed) and close the rest
    fn with_browser(browser: Browser) -> Result<Self> {
        let tabs = browser
            .get_tabs()
            .lock()
            .map_err(|e| HarvestError::TabOperationFailed(format!("Failed to get tabs: {}", e)))?
            .clone();

        let tab = match tabs.first() {
            Some(tab) => tab.clone(),
            None => browser
                .new_tab()
                .map_err(|e| HarvestError::TabOperationFailed(format!("Failed to create tab: {}", e)))?,
        };

        for extra in tabs.iter().skip(1) {
            if let Err(e) = extra.close(false) {
                log::debug!("Failed to close extra tab: {}", e);
            }
        }

        Ok(Self { browser, tab })
    }

    /// The tab the harvest works in
    pub fn tab(&self) -> Arc<Tab> {
        Arc::clone(&self.tab)
    }

    /// Navigate to a URL
    pub fn navigate(&self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .map_err(|e| HarvestError::NavigationFailed(format!("Failed to navigate to {}: {}", url, e)))?;

        Ok(())
    }

    /// Wait for navigation to complete
    pub fn wait_for_navigation(&self) -> Result<()> {
        self.tab
            .wait_until_navigated()
            .map_err(|e| HarvestError::NavigationFailed(format!("Navigation timeout: {}", e)))?;

        Ok(())
    }

    /// Navigate and wait for the load, tolerating a slow login page
    pub fn open(&self, url: &str) -> Result<()> {
        self.navigate(url)?;

        if let Err(e) = self.wait_for_navigation() {
            log::warn!("Page load timed out, continuing anyway (login page may still be loading): {}", e);
        }

        Ok(())
    }

    /// Whether the tree element is currently in the page
    pub fn tree_present(&self, selector: &str) -> bool {
        self.tab.find_element(selector).is_ok()
    }

    /// Wait until the tree element appears, i.e. until the user has logged in.
    ///
    /// Failed checks while the page is navigating are treated as "not yet".
    pub fn wait_for_login(&self, selector: &str, options: &WaitOptions) -> Result<()> {
        log::info!("Checking login state...");

        if self.tree_present(selector) {
            log::info!("Already logged in. Tree found.");
            return Ok(());
        }

        log::info!("==> Please log in in the browser window.");
        log::info!("==> The harvest will continue automatically when the tree loads.");

        poll_until(options, || self.tree_present(selector))?;
        log::info!("Login detected. Tree found.");
        Ok(())
    }

    /// Wait until jQuery and the Fancytree instance are initialised, then pause for the ready delay
    pub fn wait_for_tree_ready(&self, selector: &str, options: &WaitOptions) -> Result<()> {
        let script = tree_ready_script(selector);
        poll_until(options, || {
            self.tab
                .evaluate(&script, false)
                .ok()
                .and_then(|remote| remote.value)
                .and_then(|value| value.as_bool())
                .unwrap_or(false)
        })?;

        std::thread::sleep(options.ready_delay);
        Ok(())
    }

    /// Handle onto the tree widget in this session's tab
    pub fn tree(&self, selector: &str) -> ChromeTree {
        ChromeTree::new(self.tab(), selector)
    }

    /// Close the browser
    pub fn close(&self) -> Result<()> {
        // headless_chrome closes the browser when the Browser is dropped;
        // closing the tabs shuts it down right away
        let tabs = self
            .browser
            .get_tabs()
            .lock()
            .map_err(|e| HarvestError::TabOperationFailed(format!("Failed to get tabs: {}", e)))?
            .clone();
        for tab in tabs {
            let _ = tab.close(false);
        }
        Ok(())
    }
}

/// Check `ready` every poll interval until it holds or the timeout elapses
fn poll_until(options: &WaitOptions, mut ready: impl FnMut() -> bool) -> Result<()> {
    let started = Instant::now();
    loop {
        if ready() {
            return Ok(());
        }
        if let Some(timeout) = options.timeout {
            if started.elapsed() >= timeout {
                return Err(HarvestError::LoginTimeout(timeout));
            }
        }
        std::thread::sleep(options.poll_interval);
    }
}
