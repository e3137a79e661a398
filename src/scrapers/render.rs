//! Rendering of JavaScript-driven pages.
//!
//! A [`PageRenderer`] opens a [`RenderSession`] (one browser instance); the
//! session is released when it is dropped, so a failed navigation or a wait
//! that times out still closes the browser before the adapter returns.
//!
//! The Chrome implementation is only built with the `browser` feature.

use crate::error::Result;
use std::time::Duration;
use tracing::{debug, instrument};

pub trait PageRenderer: Send + Sync {
    fn open(&self) -> Result<Box<dyn RenderSession>>;
}

pub trait RenderSession {
    /// Navigate to `url`, wait up to `timeout` for `wait_for` to match, and
    /// return the rendered HTML.
    fn render(&self, url: &str, wait_for: &str, timeout: Duration) -> Result<String>;
}

/// Open a session, render one page and release the session.
#[instrument(level = "debug", skip(renderer))]
pub fn render_page(
    renderer: &dyn PageRenderer,
    url: &str,
    wait_for: &str,
    timeout: Duration,
) -> Result<String> {
    let session = renderer.open()?;
    let html = session.render(url, wait_for, timeout)?;
    debug!(bytes = html.len(), "Rendered page");
    Ok(html)
}

#[cfg(feature = "browser")]
pub use chrome::ChromeRenderer;

#[cfg(feature = "browser")]
mod chrome {
    use super::{PageRenderer, RenderSession};
    use crate::error::{NewsError, Result};
    use headless_chrome::{Browser, LaunchOptions};
    use std::time::Duration;
    use tracing::debug;

    fn render_error(e: impl std::fmt::Display) -> NewsError {
        NewsError::Render(e.to_string())
    }

    /// Headless Chrome, one fresh browser per session.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct ChromeRenderer;

    struct ChromeSession {
        browser: Browser,
    }

    impl PageRenderer for ChromeRenderer {
        fn open(&self) -> Result<Box<dyn RenderSession>> {
            let options = LaunchOptions::default_builder()
                .headless(true)
                .sandbox(false)
                .build()
                .map_err(render_error)?;
            let browser = Browser::new(options).map_err(render_error)?;
            debug!("Launched headless browser");
            Ok(Box::new(ChromeSession { browser }))
        }
    }

    impl RenderSession for ChromeSession {
        fn render(&self, url: &str, wait_for: &str, timeout: Duration) -> Result<String> {
            let tab = self.browser.new_tab().map_err(render_error)?;
            tab.navigate_to(url).map_err(render_error)?;
            tab.wait_for_element_with_custom_timeout(wait_for, timeout)
                .map_err(|e| NewsError::Render(format!("{wait_for:?} not found on {url}: {e}")))?;
            tab.get_content().map_err(render_error)
        }
    }

    impl Drop for ChromeSession {
        fn drop(&mut self) {
            // Browser's own Drop kills the Chrome process.
            debug!("Closing headless browser");
        }
    }
}
