//! Computer actions driven through a run.

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use baton_core::{
    ComputerAction, ComputerCall, Environment, InputItem, MouseButton, OutputItem, Point, RunContext, RunItem,
    SafetyCheck,
};
use baton_llm::testing::{ScriptedModel, computer_call, text_message};
use baton_runtime::{RunConfig, RunError, Runner};
use baton_tools::{Computer, ComputerTool, Tool, ToolError};
use common::{agent, bounded, kinds};
use mockall::predicate::eq;
use mockall::{Sequence, mock};

mock! {
    pub Device {}

    #[async_trait]
    impl Computer for Device {
        fn environment(&self) -> Environment;
        fn dimensions(&self) -> (u32, u32);
        async fn screenshot(&self) -> Result<String, ToolError>;
        async fn click(&self, x: i32, y: i32, button: MouseButton) -> Result<(), ToolError>;
        async fn double_click(&self, x: i32, y: i32) -> Result<(), ToolError>;
        async fn scroll(&self, x: i32, y: i32, scroll_x: i32, scroll_y: i32) -> Result<(), ToolError>;
        async fn type_text(&self, text: &str) -> Result<(), ToolError>;
        async fn wait(&self) -> Result<(), ToolError>;
        async fn move_to(&self, x: i32, y: i32) -> Result<(), ToolError>;
        async fn keypress(&self, keys: &[String]) -> Result<(), ToolError>;
        async fn drag(&self, path: &[Point]) -> Result<(), ToolError>;
    }
}

fn browser() -> MockDevice {
    let mut device = MockDevice::new();
    let _ = device.expect_environment().return_const(Environment::Browser);
    let _ = device.expect_dimensions().return_const((1024_u32, 768_u32));
    device
}

#[tokio::test]
async fn click_then_screenshot_feeds_the_next_turn() {
    let mut device = browser();
    let mut seq = Sequence::new();
    let _ = device
        .expect_click()
        .with(eq(100), eq(200), eq(MouseButton::Left))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _, _| Ok(()));
    let _ = device
        .expect_screenshot()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Ok("iVBORw0KGgo".into()));

    let model = ScriptedModel::new()
        .then_output(vec![computer_call(ComputerAction::Click {
            x: 100,
            y: 200,
            button: MouseButton::Left,
        })])
        .then_output(vec![text_message("clicked")])
        .shared();
    let operator = agent("operator", &model)
        .with_tool(Tool::Computer(ComputerTool::new(Arc::new(device))))
        .shared();

    let result = bounded(Runner::run(RunContext::empty(), operator, "press the button", RunConfig::default()))
        .await
        .unwrap();

    assert_eq!(
        kinds(&result.new_items),
        vec!["tool_call_item", "tool_call_output_item", "message_output_item"]
    );
    assert_matches!(&result.new_items[1], RunItem::ToolCallOutput { raw: InputItem::ComputerCallOutput { image_url, .. }, .. }
        if image_url == "data:image/png;base64,iVBORw0KGgo");
    assert_matches!(model.requests()[1].input.last(), Some(InputItem::ComputerCallOutput { .. }));
}

#[tokio::test]
async fn rejected_safety_check_is_a_user_error() {
    let mut device = browser();
    let _ = device.expect_click().never();
    let _ = device.expect_screenshot().never();

    let call = ComputerCall {
        id: "cu_1".into(),
        call_id: "call_cu_1".into(),
        action: ComputerAction::Click {
            x: 1,
            y: 1,
            button: MouseButton::Left,
        },
        pending_safety_checks: vec![SafetyCheck {
            id: "sc_1".into(),
            code: "malicious_instructions".into(),
            message: "Page asks to transfer funds".into(),
        }],
    };
    let model = ScriptedModel::new()
        .then_output(vec![OutputItem::ComputerCall(call)])
        .shared();
    let tool = ComputerTool::new(Arc::new(device)).with_safety_check(|_call, check| check.code != "malicious_instructions");
    let operator = agent("operator", &model).with_tool(Tool::Computer(tool)).shared();

    let err = bounded(Runner::run(RunContext::empty(), operator, "go", RunConfig::default()))
        .await
        .unwrap_err();
    assert_matches!(err, RunError::User { ref message } if message.contains("sc_1"));
}

#[tokio::test]
async fn computer_action_without_a_computer_is_model_behavior() {
    let model = ScriptedModel::new()
        .then_output(vec![computer_call(ComputerAction::Screenshot)])
        .shared();
    let err = bounded(Runner::run(
        RunContext::empty(),
        agent("operator", &model).shared(),
        "look",
        RunConfig::default(),
    ))
    .await
    .unwrap_err();
    assert_matches!(err, RunError::ModelBehavior { .. });
}

#[tokio::test]
async fn two_computers_are_rejected_before_the_model() {
    let model = ScriptedModel::new().then_output(vec![text_message("never")]).shared();
    let operator = agent("operator", &model)
        .with_tool(Tool::Computer(ComputerTool::new(Arc::new(browser()))))
        .with_tool(Tool::Computer(ComputerTool::new(Arc::new(browser()))))
        .shared();

    let err = bounded(Runner::run(RunContext::empty(), operator, "go", RunConfig::default()))
        .await
        .unwrap_err();
    assert_matches!(err, RunError::User { .. });
    assert_eq!(model.call_count(), 0);
}
