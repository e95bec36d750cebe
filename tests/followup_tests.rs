mod common;

use chrono::{Duration, Utc};
use tokio_util::sync::CancellationToken;

use common::*;
use dispatch_engine::{
    application::handlers::followup_scheduler::TemplateSelection,
    domain::{
        errors::SendError,
        models::{AuditEventKind, NURTURE_STAGE},
        repositories::ConversationRepository,
    },
};

#[tokio::test]
async fn first_followup_goes_out_once_the_threshold_has_elapsed() {
    let harness = followup_harness(always_open(), TemplateSelection::BySequence);
    harness.instances.insert(instance("inst-a")).await;
    harness.templates.insert(template(1, 24, None)).await;
    harness.templates.insert(template(2, 48, None)).await;

    let convo = conversation("5511999990001", 25);
    harness.conversations.insert(convo.clone()).await;

    let summary = harness
        .scheduler
        .run_once(CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.sent, 1);

    let stored = harness.conversations.get(convo.id).await.unwrap().unwrap();
    assert_eq!(stored.followup_count, 1);
    assert!(stored.last_followup_at.is_some());
    assert_ne!(stored.stage_tag, NURTURE_STAGE);

    let audit = harness.audit.entries().await;
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].event, AuditEventKind::FollowupSent);
}

#[tokio::test]
async fn not_due_conversations_are_left_untouched() {
    let harness = followup_harness(always_open(), TemplateSelection::BySequence);
    harness.instances.insert(instance("inst-a")).await;
    harness.templates.insert(template(1, 24, None)).await;

    // broadcast went out 10 hours ago, threshold is 24
    let convo = conversation("5511999990001", 10);
    harness.conversations.insert(convo.clone()).await;

    let summary = harness
        .scheduler
        .run_once(CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.sent, 0);
    assert_eq!(summary.skipped, 1);

    let stored = harness.conversations.get(convo.id).await.unwrap().unwrap();
    assert_eq!(stored.followup_count, 0);
    assert!(stored.last_followup_at.is_none());
}

#[tokio::test]
async fn second_followup_measures_from_the_previous_followup() {
    let harness = followup_harness(always_open(), TemplateSelection::BySequence);
    harness.instances.insert(instance("inst-a")).await;
    harness.templates.insert(template(1, 24, None)).await;
    harness.templates.insert(template(2, 48, None)).await;

    // first follow-up went out 10h ago; the 48h threshold counts from there,
    // not from the original broadcast 80h ago
    let mut convo = conversation("5511999990001", 80);
    convo.followup_count = 1;
    convo.last_followup_at = Some(Utc::now() - Duration::hours(10));
    harness.conversations.insert(convo.clone()).await;

    let summary = harness
        .scheduler
        .run_once(CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.sent, 0);

    // move the previous follow-up past the threshold
    let mut due = harness.conversations.get(convo.id).await.unwrap().unwrap();
    due.last_followup_at = Some(Utc::now() - Duration::hours(49));
    harness.conversations.insert(due).await;

    let summary = harness
        .scheduler
        .run_once(CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.sent, 1);
    let stored = harness.conversations.get(convo.id).await.unwrap().unwrap();
    assert_eq!(stored.followup_count, 2);
}

#[tokio::test]
async fn replied_conversations_are_never_candidates() {
    let harness = followup_harness(always_open(), TemplateSelection::BySequence);
    harness.instances.insert(instance("inst-a")).await;
    harness.templates.insert(template(1, 24, None)).await;

    let mut convo = conversation("5511999990001", 500);
    convo.last_lead_message_at = Some(Utc::now() - Duration::hours(1));
    harness.conversations.insert(convo).await;

    let summary = harness
        .scheduler
        .run_once(CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.processed, 0);
    assert!(harness.gateway.send_calls().await.is_empty());
}

#[tokio::test]
async fn paused_conversations_are_never_candidates() {
    let harness = followup_harness(always_open(), TemplateSelection::BySequence);
    harness.instances.insert(instance("inst-a")).await;
    harness.templates.insert(template(1, 24, None)).await;

    let mut convo = conversation("5511999990001", 48);
    convo.ai_paused = true;
    harness.conversations.insert(convo).await;

    let summary = harness
        .scheduler
        .run_once(CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.processed, 0);
}

#[tokio::test]
async fn last_template_parks_the_conversation_in_nurture() {
    let harness = followup_harness(always_open(), TemplateSelection::BySequence);
    harness.instances.insert(instance("inst-a")).await;
    harness.templates.insert(template(1, 24, None)).await;
    harness.templates.insert(template(2, 48, None)).await;

    let mut convo = conversation("5511999990001", 200);
    convo.followup_count = 1;
    convo.last_followup_at = Some(Utc::now() - Duration::hours(49));
    harness.conversations.insert(convo.clone()).await;

    let summary = harness
        .scheduler
        .run_once(CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.sent, 1);

    let stored = harness.conversations.get(convo.id).await.unwrap().unwrap();
    assert_eq!(stored.followup_count, 2);
    assert_eq!(stored.stage_tag, NURTURE_STAGE);

    // terminal: the next sweep finds nothing
    let summary = harness
        .scheduler
        .run_once(CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.processed, 0);
}

#[tokio::test]
async fn closed_business_hours_skip_the_whole_sweep() {
    let harness = followup_harness(always_closed(), TemplateSelection::BySequence);
    harness.instances.insert(instance("inst-a")).await;
    harness.templates.insert(template(1, 24, None)).await;
    harness
        .conversations
        .insert(conversation("5511999990001", 48))
        .await;

    let summary = harness
        .scheduler
        .run_once(CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.processed, 0);
    assert!(harness.gateway.send_calls().await.is_empty());
}

#[tokio::test]
async fn send_failure_leaves_the_conversation_due_for_the_next_sweep() {
    let harness = followup_harness(always_open(), TemplateSelection::BySequence);
    harness.instances.insert(instance("inst-a")).await;
    harness.templates.insert(template(1, 24, None)).await;

    let convo = conversation("5511999990001", 48);
    harness.conversations.insert(convo.clone()).await;
    harness
        .gateway
        .script_send_error(&convo.phone, SendError::Timeout)
        .await;

    let summary = harness
        .scheduler
        .run_once(CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.sent, 0);
    assert_eq!(summary.skipped, 1);

    let stored = harness.conversations.get(convo.id).await.unwrap().unwrap();
    assert_eq!(stored.followup_count, 0);
    assert!(stored.last_followup_at.is_none());

    // unscripted retry on the next sweep succeeds
    let summary = harness
        .scheduler
        .run_once(CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.sent, 1);
}

#[tokio::test]
async fn no_active_templates_abort_the_run() {
    let harness = followup_harness(always_open(), TemplateSelection::BySequence);
    harness.instances.insert(instance("inst-a")).await;
    harness
        .conversations
        .insert(conversation("5511999990001", 48))
        .await;

    assert!(harness.scheduler.run_once(CancellationToken::new()).await.is_err());
}

#[tokio::test]
async fn stage_keyed_selection_matches_the_conversation_stage() {
    let harness = followup_harness(always_open(), TemplateSelection::ByStage);
    harness.instances.insert(instance("inst-a")).await;
    harness.templates.insert(template(1, 24, Some("contacted"))).await;
    harness.templates.insert(template(2, 24, Some("negotiating"))).await;

    let convo = conversation("5511999990001", 48);
    harness.conversations.insert(convo.clone()).await;

    let summary = harness
        .scheduler
        .run_once(CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.sent, 1);

    let calls = harness.gateway.send_calls().await;
    assert_eq!(calls.len(), 1);
    // template 1 is the one tagged for the "contacted" stage
    assert!(calls[0].message.contains("Follow-up 1"));
}

#[tokio::test]
async fn followup_messages_are_transformed_before_sending() {
    let harness = followup_harness(always_open(), TemplateSelection::BySequence);
    harness.instances.insert(instance("inst-a")).await;
    harness.templates.insert(template(1, 24, None)).await;
    harness
        .conversations
        .insert(conversation("5511999990001", 48))
        .await;

    harness
        .scheduler
        .run_once(CancellationToken::new())
        .await
        .unwrap();

    let calls = harness.gateway.send_calls().await;
    assert_eq!(calls.len(), 1);
    // variable resolved from lead data, plus the invisible marker
    let visible =
        dispatch_engine::application::services::message_mutator::strip_invisible(&calls[0].message);
    assert_eq!(visible, "Follow-up 1, Maria?");
    assert_eq!(calls[0].message.chars().count(), visible.chars().count() + 1);
}
