//! End-to-end control-loop scenarios against a mock host and a scripted
//! model.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redress_agent::{CaseAgent, PolicyConfig};
use redress_api::host::mock::{MockHost, MockNode};
use redress_api::llm::ScriptedTransport;
use redress_api::{AppLauncher, CollectingSink};
use redress_drivers::AccessibilityEngine;
use redress_types::{AgentEvent, AgentResult, CaseContext, DecisionError};
use serde_json::json;

const OWN_PACKAGE: &str = "com.redress.app";
const TARGET_PACKAGE: &str = "com.shop.app";

fn refund_case() -> CaseContext {
    CaseContext {
        case_id: "case-1".into(),
        customer_name: "Dana".into(),
        issue: "refund my order".into(),
        desired_outcome: "Full refund".into(),
        order_id: Some("123".into()),
        has_attachments: false,
        target_package: TARGET_PACKAGE.into(),
        target_platform: "ShopApp".into(),
    }
}

fn chat_screen() -> MockNode {
    MockNode::root(TARGET_PACKAGE)
        .child(MockNode::new("android.widget.Button").text("Help").clickable().bounds(0, 100, 200, 180))
        .child(MockNode::new("android.widget.Button").text("Back").clickable().bounds(0, 200, 200, 280))
        .child(MockNode::new("android.widget.EditText").editable().bounds(0, 2200, 900, 2290))
        .child(
            MockNode::new("android.widget.ImageButton")
                .view_id("com.shop.app:id/send_button")
                .description("Send")
                .clickable()
                .bounds(900, 2200, 1000, 2290),
        )
}

fn fast_policy(max_iterations: u32) -> PolicyConfig {
    PolicyConfig {
        max_iterations,
        min_action_delay_ms: 10,
        auto_approve_safe_actions: false,
    }
}

struct Fixture {
    host: Arc<MockHost>,
    transport: Arc<ScriptedTransport>,
    sink: Arc<CollectingSink>,
    agent: CaseAgent,
}

fn fixture(root: MockNode, script: Vec<Result<redress_api::ToolInvocation, DecisionError>>) -> Fixture {
    fixture_with(root, ScriptedTransport::new(script))
}

fn fixture_with(root: MockNode, transport: ScriptedTransport) -> Fixture {
    let host = Arc::new(MockHost::with_root(root));
    let engine = Arc::new(AccessibilityEngine::new(host.clone()));
    let transport = Arc::new(transport);
    let sink = Arc::new(CollectingSink::new());
    let agent = CaseAgent::new(engine, transport.clone())
        .with_policy(fast_policy(30))
        .with_sink(sink.clone())
        .with_own_package(OWN_PACKAGE);
    Fixture { host, transport, sink, agent }
}

fn count_events(events: &[AgentEvent], kind: fn(&AgentEvent) -> bool) -> usize {
    events.iter().filter(|e| kind(e)).count()
}

#[tokio::test(start_paused = true)]
async fn happy_path_resolves_in_four_iterations() {
    let fx = fixture(
        chat_screen(),
        vec![
            ScriptedTransport::call("click_element", json!({ "label": "Help" })),
            ScriptedTransport::call(
                "type_message",
                json!({ "text": "I'd like a refund for order 123." }),
            ),
            ScriptedTransport::call("wait", json!({ "reason": "waiting for support" })),
            ScriptedTransport::call("mark_resolved", json!({ "summary": "Refund issued" })),
        ],
    );

    let result = fx.agent.run(&refund_case()).await;
    assert_eq!(
        result,
        AgentResult::Resolved { summary: "Refund issued".into(), iterations: 4 }
    );

    let events = fx.sink.events();
    assert!(matches!(events[0], AgentEvent::Started { .. }));
    assert_eq!(count_events(&events, |e| matches!(e, AgentEvent::ScreenCaptured { .. })), 4);
    assert_eq!(count_events(&events, |e| matches!(e, AgentEvent::ThinkingStarted)), 4);
    assert_eq!(count_events(&events, |e| matches!(e, AgentEvent::DecisionMade { .. })), 4);
    assert_eq!(count_events(&events, |e| matches!(e, AgentEvent::ActionExecuted { .. })), 3);
    assert_eq!(count_events(&events, |e| matches!(e, AgentEvent::Resolved { .. })), 1);

    let actions = fx.host.actions();
    assert!(actions.iter().any(|a| a == "click:Help"));
    assert!(actions.iter().any(|a| a == "set_text:I'd like a refund for order 123."));
    assert_eq!(fx.host.live_handles(), 0);
}

#[tokio::test(start_paused = true)]
async fn card_number_is_blocked_and_loop_continues() {
    let fx = fixture(
        chat_screen(),
        vec![
            ScriptedTransport::call(
                "type_message",
                json!({ "text": "My card is 4532015112830366" }),
            ),
            ScriptedTransport::call("mark_resolved", json!({ "summary": "done" })),
        ],
    );

    let result = fx.agent.run(&refund_case()).await;
    assert_eq!(result, AgentResult::Resolved { summary: "done".into(), iterations: 2 });

    let events = fx.sink.events();
    assert_eq!(count_events(&events, |e| matches!(e, AgentEvent::ActionBlocked { .. })), 1);

    // The card never reached the screen, and no action failure was recorded.
    assert!(!fx.host.actions().iter().any(|a| a.starts_with("set_text:")));
    let second_request = &fx.transport.requests()[1];
    assert!(!second_request.user_message.contains("FAILED"));
}

#[tokio::test(start_paused = true)]
async fn financial_click_terminates_with_human_review() {
    let fx = fixture(
        chat_screen(),
        vec![ScriptedTransport::call(
            "click_element",
            json!({ "label": "Confirm payment" }),
        )],
    );

    let result = fx.agent.run(&refund_case()).await;
    match result {
        AgentResult::NeedsHumanReview { reason, iterations } => {
            assert!(reason.contains("financial"));
            assert_eq!(iterations, 1);
        }
        other => panic!("expected human review, got {:?}", other),
    }

    let events = fx.sink.events();
    assert_eq!(count_events(&events, |e| matches!(e, AgentEvent::ApprovalNeeded { .. })), 1);
    assert!(fx.host.actions().is_empty());
}

struct FlippingLauncher {
    host: Arc<MockHost>,
    invocations: AtomicUsize,
}

#[async_trait]
impl AppLauncher for FlippingLauncher {
    async fn launch_target_app(&self) -> bool {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        self.host.set_root(chat_screen());
        true
    }
}

#[tokio::test(start_paused = true)]
async fn own_app_recovery_relaunches_without_consuming_iterations() {
    let own_screen = MockNode::root(OWN_PACKAGE)
        .child(MockNode::new("android.widget.TextView").text("Redress monitor"));
    let fx = fixture(
        own_screen,
        vec![ScriptedTransport::call("mark_resolved", json!({ "summary": "ok" }))],
    );
    let launcher = Arc::new(FlippingLauncher {
        host: fx.host.clone(),
        invocations: AtomicUsize::new(0),
    });
    let agent = fx.agent.with_launcher(launcher.clone());

    let result = agent.run(&refund_case()).await;
    assert_eq!(result, AgentResult::Resolved { summary: "ok".into(), iterations: 1 });

    assert_eq!(launcher.invocations.load(Ordering::SeqCst), 1);
    // No model call happened while stuck in our own app.
    assert_eq!(fx.transport.request_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn own_app_stall_fails_after_the_window() {
    let own_screen = MockNode::root(OWN_PACKAGE)
        .child(MockNode::new("android.widget.TextView").text("Redress monitor"));
    let fx = fixture(own_screen, vec![]);

    let result = fx.agent.run(&refund_case()).await;
    assert_eq!(result, AgentResult::Failed { reason: "could not open target app".into() });
    assert_eq!(fx.transport.request_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn oscillation_skips_the_third_duplicate() {
    let fx = fixture(
        chat_screen(),
        vec![
            ScriptedTransport::call("click_element", json!({ "label": "Back" })),
            ScriptedTransport::call("click_element", json!({ "label": "Back" })),
            ScriptedTransport::call("click_element", json!({ "label": "Back" })),
            ScriptedTransport::call("mark_resolved", json!({ "summary": "done" })),
        ],
    );

    let result = fx.agent.run(&refund_case()).await;
    assert_eq!(result, AgentResult::Resolved { summary: "done".into(), iterations: 4 });

    // Two clicks landed; the third identical decision was skipped.
    let clicks = fx.host.actions().iter().filter(|a| *a == "click:Back").count();
    assert_eq!(clicks, 2);

    // The decision after the skip sees the synthetic marker.
    let requests = fx.transport.requests();
    assert!(requests[3]
        .user_message
        .contains("REPEATED ACTION SKIPPED: Click element: \"Back\""));
}

#[tokio::test(start_paused = true)]
async fn auth_failure_fails_immediately_without_retry() {
    let fx = fixture(chat_screen(), vec![Err(DecisionError::Auth { status: 401 })]);

    let result = fx.agent.run(&refund_case()).await;
    assert_eq!(result, AgentResult::Failed { reason: "API key invalid or expired".into() });
    assert_eq!(fx.transport.request_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn transient_failures_back_off_and_recover() {
    let fx = fixture(
        chat_screen(),
        vec![
            Err(DecisionError::Timeout),
            Err(DecisionError::RateLimited),
            ScriptedTransport::call("mark_resolved", json!({ "summary": "done" })),
        ],
    );

    let result = fx.agent.run(&refund_case()).await;
    assert_eq!(result, AgentResult::Resolved { summary: "done".into(), iterations: 1 });
    assert_eq!(fx.transport.request_count(), 3);

    let events = fx.sink.events();
    assert_eq!(count_events(&events, |e| matches!(e, AgentEvent::Error { .. })), 2);
}

#[tokio::test(start_paused = true)]
async fn five_consecutive_failures_give_up_classified() {
    let fx = fixture_with(
        chat_screen(),
        ScriptedTransport::new(vec![Err(DecisionError::Timeout)]).with_repeat_last(),
    );

    let result = fx.agent.run(&refund_case()).await;
    assert_eq!(result, AgentResult::Failed { reason: "Timeout".into() });
    assert_eq!(fx.transport.request_count(), 5);
}

#[tokio::test(start_paused = true)]
async fn iteration_budget_bounds_the_run() {
    let host = Arc::new(MockHost::with_root(chat_screen()));
    let engine = Arc::new(AccessibilityEngine::new(host.clone()));
    let transport = Arc::new(
        ScriptedTransport::new(vec![ScriptedTransport::call(
            "click_element",
            json!({ "label": "Help" }),
        )])
        .with_repeat_last(),
    );
    let agent = CaseAgent::new(engine, transport.clone()).with_policy(fast_policy(3));

    let result = agent.run(&refund_case()).await;
    assert_eq!(result, AgentResult::Failed { reason: "max iterations reached".into() });

    // Three think-act cycles, then the budget check rejected the fourth.
    assert_eq!(transport.request_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn block_on_last_iteration_fails_the_next_cycle() {
    let fx = fixture_with(
        chat_screen(),
        ScriptedTransport::new(vec![ScriptedTransport::call(
            "type_message",
            json!({ "text": "My card is 4532015112830366" }),
        )])
        .with_repeat_last(),
    );
    let agent = fx.agent.with_policy(fast_policy(1));

    let result = agent.run(&refund_case()).await;
    assert_eq!(result, AgentResult::Failed { reason: "max iterations reached".into() });
    assert_eq!(fx.transport.request_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn cancellation_wins_over_a_busy_loop() {
    let fx = fixture_with(
        chat_screen(),
        ScriptedTransport::new(vec![ScriptedTransport::call(
            "wait",
            json!({ "reason": "settling" }),
        )])
        .with_repeat_last(),
    );
    let agent = Arc::new(fx.agent);
    let controller = agent.controller();

    let case = refund_case();
    let run = tokio::spawn({
        let agent = agent.clone();
        async move { agent.run(&case).await }
    });

    tokio::time::sleep(Duration::from_secs(2)).await;
    controller.cancel();

    let result = run.await.unwrap();
    assert_eq!(result, AgentResult::Cancelled);
    assert_eq!(controller.phase(), redress_agent::AgentPhase::Cancelled);
    assert!(fx
        .sink
        .events()
        .iter()
        .any(|e| matches!(e, AgentEvent::Cancelled)));
}

#[tokio::test(start_paused = true)]
async fn pause_holds_the_loop_until_resume() {
    let fx = fixture(
        chat_screen(),
        vec![ScriptedTransport::call("mark_resolved", json!({ "summary": "done" }))],
    );
    let agent = Arc::new(fx.agent);
    let controller = agent.controller();
    controller.pause();

    let case = refund_case();
    let run = tokio::spawn({
        let agent = agent.clone();
        async move { agent.run(&case).await }
    });

    // Plenty of virtual time: still no model call while paused.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(fx.transport.request_count(), 0);
    assert_eq!(controller.phase(), redress_agent::AgentPhase::Paused);

    controller.resume();
    let result = run.await.unwrap();
    assert_eq!(result, AgentResult::Resolved { summary: "done".into(), iterations: 1 });
}
