//! Computer tool: model-driven control of a virtual device.
//!
//! Every call runs in two fixed steps: perform the action (skipped for a bare
//! screenshot request), then capture a screenshot that becomes the output.
//! Pending safety checks are put to the acknowledgement callback first; a
//! single rejection stops the action before it touches the device.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use baton_core::{ComputerAction, ComputerCall, Environment, MouseButton, Point, SafetyCheck, ToolSpec};
use tracing::{debug, warn};

use crate::errors::ToolError;

/// A device the model can drive.
///
/// Screenshots are base64-encoded PNG data.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Computer: Send + Sync {
    /// Device environment.
    fn environment(&self) -> Environment;

    /// Viewport `(width, height)` in pixels.
    fn dimensions(&self) -> (u32, u32);

    /// Capture the screen.
    async fn screenshot(&self) -> Result<String, ToolError>;

    /// Click at a position.
    async fn click(&self, x: i32, y: i32, button: MouseButton) -> Result<(), ToolError>;

    /// Double click at a position.
    async fn double_click(&self, x: i32, y: i32) -> Result<(), ToolError>;

    /// Scroll at a position.
    async fn scroll(&self, x: i32, y: i32, scroll_x: i32, scroll_y: i32) -> Result<(), ToolError>;

    /// Type text.
    async fn type_text(&self, text: &str) -> Result<(), ToolError>;

    /// Wait for the device to settle.
    async fn wait(&self) -> Result<(), ToolError>;

    /// Move the pointer.
    async fn move_to(&self, x: i32, y: i32) -> Result<(), ToolError>;

    /// Press keys together.
    async fn keypress(&self, keys: &[String]) -> Result<(), ToolError>;

    /// Drag along a path.
    async fn drag(&self, path: &[Point]) -> Result<(), ToolError>;
}

/// Decides whether a pending safety check may be acknowledged.
pub type SafetyCheckCallback = Arc<dyn Fn(&ComputerCall, &SafetyCheck) -> bool + Send + Sync>;

/// Result of one computer call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComputerOutput {
    /// `data:image/png;base64,...` URL of the post-action screenshot.
    pub image_url: String,
    /// Checks acknowledged before acting.
    pub acknowledged_safety_checks: Vec<SafetyCheck>,
}

/// The computer tool an agent declares.
#[derive(Clone)]
pub struct ComputerTool {
    computer: Arc<dyn Computer>,
    on_safety_check: Option<SafetyCheckCallback>,
}

impl ComputerTool {
    /// Wrap a device. Calls with pending safety checks are rejected until a
    /// callback is installed.
    pub fn new(computer: Arc<dyn Computer>) -> Self {
        Self {
            computer,
            on_safety_check: None,
        }
    }

    /// Install the safety check callback.
    #[must_use]
    pub fn with_safety_check<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ComputerCall, &SafetyCheck) -> bool + Send + Sync + 'static,
    {
        self.on_safety_check = Some(Arc::new(callback));
        self
    }

    /// Tool name as sent to the provider.
    pub fn name(&self) -> &'static str {
        "computer_use_preview"
    }

    /// Provider-neutral description.
    pub fn spec(&self) -> ToolSpec {
        let (display_width, display_height) = self.computer.dimensions();
        ToolSpec::Computer {
            environment: self.computer.environment(),
            display_width,
            display_height,
        }
    }

    /// Acknowledge safety checks, act, then screenshot.
    pub async fn run(&self, call: &ComputerCall) -> Result<ComputerOutput, ToolError> {
        let acknowledged = self.acknowledge(call)?;

        debug!(call_id = %call.call_id, action = call.action.kind(), "running computer action");
        self.perform(&call.action).await?;
        let screenshot = self.computer.screenshot().await?;

        Ok(ComputerOutput {
            image_url: format!("data:image/png;base64,{screenshot}"),
            acknowledged_safety_checks: acknowledged,
        })
    }

    fn acknowledge(&self, call: &ComputerCall) -> Result<Vec<SafetyCheck>, ToolError> {
        let mut acknowledged = Vec::with_capacity(call.pending_safety_checks.len());
        for check in &call.pending_safety_checks {
            let approved = self
                .on_safety_check
                .as_ref()
                .is_some_and(|callback| callback(call, check));
            if !approved {
                warn!(call_id = %call.call_id, check_id = %check.id, code = %check.code, "safety check rejected");
                return Err(ToolError::SafetyCheckRejected {
                    check_id: check.id.clone(),
                    code: check.code.clone(),
                });
            }
            acknowledged.push(check.clone());
        }
        Ok(acknowledged)
    }

    async fn perform(&self, action: &ComputerAction) -> Result<(), ToolError> {
        let c = &self.computer;
        match action {
            ComputerAction::Click { x, y, button } => c.click(*x, *y, *button).await,
            ComputerAction::DoubleClick { x, y } => c.double_click(*x, *y).await,
            ComputerAction::Scroll {
                x,
                y,
                scroll_x,
                scroll_y,
            } => c.scroll(*x, *y, *scroll_x, *scroll_y).await,
            ComputerAction::Type { text } => c.type_text(text).await,
            ComputerAction::Wait => c.wait().await,
            ComputerAction::Move { x, y } => c.move_to(*x, *y).await,
            ComputerAction::Keypress { keys } => c.keypress(keys).await,
            ComputerAction::Drag { path } => c.drag(path).await,
            ComputerAction::Screenshot => Ok(()),
        }
    }
}

impl fmt::Debug for ComputerTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputerTool")
            .field("environment", &self.computer.environment())
            .field("has_safety_callback", &self.on_safety_check.is_some())
            .finish()
    }
}
