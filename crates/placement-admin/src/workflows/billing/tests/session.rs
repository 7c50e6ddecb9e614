use rust_decimal_macros::dec;

use super::common::*;
use crate::workflows::backend::GatewayError;
use crate::workflows::billing::{
    ConfirmOutcome, ItemCategory, RequestKind, ReviewError, ReviewMode, ReviewSession,
    ReviewStatus, SimulationOutcome, SimulationResponse,
};

fn diff_session() -> ReviewSession {
    let mut session = ReviewSession::new(stored_plan(ReviewStatus::NeedsReview));
    let ticket = session.begin_simulation().expect("ticket");
    let outcome = session
        .finish_simulation(ticket, Ok(simulation()))
        .expect("simulation applies");
    assert_eq!(
        outcome,
        SimulationOutcome::Applied {
            lines: 3,
            different: 2
        }
    );
    session
}

#[test]
fn changed_line_keeps_existing_amount_until_accepted() {
    let mut session = diff_session();
    assert_eq!(session.mode(), ReviewMode::Diff);

    assert_eq!(
        amounts(&session.resolved_items()),
        vec![
            (ItemCategory::ServiceFee, dec!(1000)),
            (ItemCategory::DormitoryFee, dec!(500)),
        ]
    );

    assert!(session.toggle(service_fee_key()).expect("toggle"));
    assert_eq!(
        amounts(&session.resolved_items()),
        vec![
            (ItemCategory::ServiceFee, dec!(1200)),
            (ItemCategory::DormitoryFee, dec!(500)),
        ]
    );

    assert!(!session.toggle(service_fee_key()).expect("toggle back"));
    assert_eq!(session.resolved_items()[0].amount, dec!(1000));
}

#[test]
fn new_line_is_dropped_unless_accepted() {
    let mut session = diff_session();
    assert_eq!(session.resolved_items().len(), 2);

    session
        .set_accepted(health_check_key(), true)
        .expect("accept new line");
    let resolved = session.resolved_items();
    assert_eq!(resolved.len(), 3);
    assert_eq!(resolved[2].item_category, ItemCategory::HealthCheckFee);
    assert_eq!(resolved[2].amount, dec!(500));
}

#[test]
fn accept_all_is_idempotent() {
    let mut session = diff_session();
    assert_eq!(session.accept_all().expect("accept all"), 2);
    let first = session.resolved_items();
    assert_eq!(session.accept_all().expect("accept all again"), 2);
    assert_eq!(session.resolved_items(), first);
    assert_eq!(
        session.accepted_keys(),
        vec![service_fee_key(), health_check_key()]
    );
}

#[test]
fn unchanged_and_unknown_lines_cannot_be_toggled() {
    let mut session = diff_session();
    assert_eq!(
        session.toggle(dormitory_key()),
        Err(ReviewError::LineUnchanged(dormitory_key()))
    );

    let mut missing = service_fee_key();
    missing.occurrence = 4;
    assert_eq!(
        session.toggle(missing.clone()),
        Err(ReviewError::UnknownLine(missing))
    );
}

#[test]
fn selections_require_comparison_mode() {
    let mut session = ReviewSession::new(stored_plan(ReviewStatus::NeedsReview));
    assert_eq!(
        session.toggle(service_fee_key()),
        Err(ReviewError::NotInDiffMode)
    );
    assert_eq!(session.accept_all(), Err(ReviewError::NotInDiffMode));
    assert_eq!(session.resolved_items(), session.plan().items);
}

#[test]
fn leaving_comparison_discards_selections() {
    let mut session = diff_session();
    session.accept_all().expect("accept all");
    session.exit_comparison();
    assert_eq!(session.mode(), ReviewMode::Normal);
    assert!(session.accepted_keys().is_empty());

    let ticket = session.begin_simulation().expect("ticket");
    session
        .finish_simulation(ticket, Ok(simulation()))
        .expect("simulation applies");
    assert!(!session.is_accepted(&service_fee_key()));
}

#[test]
fn response_after_exit_is_discarded() {
    let mut session = ReviewSession::new(stored_plan(ReviewStatus::NeedsReview));
    let ticket = session.begin_simulation().expect("ticket");
    session.exit_comparison();

    let outcome = session
        .finish_simulation(ticket, Ok(simulation()))
        .expect("stale responses are not errors");
    assert_eq!(outcome, SimulationOutcome::Stale);
    assert_eq!(session.mode(), ReviewMode::Normal);
    assert!(session.pending_request().is_none());
}

#[test]
fn only_one_request_in_flight() {
    let mut session = ReviewSession::new(stored_plan(ReviewStatus::NeedsReview));
    let ticket = session.begin_simulation().expect("ticket");
    assert_eq!(session.pending_request(), Some(RequestKind::Simulate));
    assert_eq!(
        session.begin_simulation(),
        Err(ReviewError::RequestInFlight(RequestKind::Simulate))
    );
    assert_eq!(
        session.begin_confirm().map(|(ticket, _)| ticket),
        Err(ReviewError::RequestInFlight(RequestKind::Simulate))
    );

    session
        .finish_simulation(ticket, Ok(simulation()))
        .expect("simulation applies");
    assert!(session.begin_simulation().is_ok());
}

#[test]
fn empty_simulation_keeps_previous_comparison() {
    let mut session = diff_session();
    session.toggle(service_fee_key()).expect("toggle");

    let ticket = session.begin_simulation().expect("ticket");
    let outcome = session
        .finish_simulation(ticket, Ok(SimulationResponse { items: None }))
        .expect("empty response");
    assert_eq!(outcome, SimulationOutcome::Empty);
    assert_eq!(session.mode(), ReviewMode::Diff);
    assert!(session.is_accepted(&service_fee_key()));

    let ticket = session.begin_simulation().expect("ticket");
    let outcome = session
        .finish_simulation(ticket, Ok(SimulationResponse { items: Some(Vec::new()) }))
        .expect("empty list");
    assert_eq!(outcome, SimulationOutcome::Empty);
    assert_eq!(session.lines().len(), 3);
}

#[test]
fn failed_simulation_keeps_mode_and_sets_banner() {
    let mut session = ReviewSession::new(stored_plan(ReviewStatus::NeedsReview));
    let ticket = session.begin_simulation().expect("ticket");
    let err = session
        .finish_simulation(ticket, Err(GatewayError::Transport("timed out".to_string())))
        .expect_err("failure surfaces");

    assert_eq!(
        err,
        ReviewError::Gateway(GatewayError::Transport("timed out".to_string()))
    );
    assert_eq!(session.mode(), ReviewMode::Normal);
    assert_eq!(
        session.banner(),
        Some("Simulation failed: backend unreachable: timed out")
    );
    assert!(session.pending_request().is_none());

    session.dismiss_banner();
    assert!(session.banner().is_none());
}

#[test]
fn confirm_marks_plan_reviewed_and_locks_session() {
    let mut session = diff_session();
    session.accept_all().expect("accept all");

    let (ticket, items) = session.begin_confirm().expect("confirm ticket");
    assert_eq!(ticket.kind(), RequestKind::Confirm);
    assert_eq!(items.len(), 3);

    let outcome = session
        .finish_confirm(ticket, items.clone(), Ok(()))
        .expect("confirm succeeds");
    assert_eq!(outcome, ConfirmOutcome::Confirmed { items: items.clone() });
    assert_eq!(session.plan().items, items);
    assert_eq!(session.plan().review_status, ReviewStatus::Reviewed);

    assert_eq!(
        session.toggle(service_fee_key()),
        Err(ReviewError::AlreadyConfirmed)
    );
    assert_eq!(
        session.begin_confirm().map(|(ticket, _)| ticket),
        Err(ReviewError::AlreadyConfirmed)
    );
}

#[test]
fn failed_confirm_can_be_retried() {
    let mut session = diff_session();
    let (ticket, items) = session.begin_confirm().expect("confirm ticket");
    let err = session
        .finish_confirm(
            ticket,
            items,
            Err(GatewayError::Status {
                status: 500,
                message: "boom".to_string(),
            }),
        )
        .expect_err("failure surfaces");
    assert!(matches!(err, ReviewError::Gateway(_)));
    assert_eq!(
        session.banner(),
        Some("Confirm failed: backend returned 500: boom")
    );
    assert_eq!(session.mode(), ReviewMode::Diff);
    assert!(session.begin_confirm().is_ok());
}

#[test]
fn closed_session_ignores_late_confirm() {
    let mut session = diff_session();
    let (ticket, items) = session.begin_confirm().expect("confirm ticket");
    session.close();

    let outcome = session
        .finish_confirm(ticket, items, Ok(()))
        .expect("late response ignored");
    assert_eq!(outcome, ConfirmOutcome::Stale);
    assert!(session.is_closed());
    assert_eq!(session.plan().review_status, ReviewStatus::NeedsReview);
    assert_eq!(session.begin_simulation(), Err(ReviewError::Closed));
}

#[test]
fn snapshot_reports_lines_and_resolved_total() {
    let mut session = diff_session();
    session.toggle(service_fee_key()).expect("toggle");

    let snapshot = session.snapshot();
    assert_eq!(snapshot.mode, ReviewMode::Diff);
    assert_eq!(snapshot.lines.len(), 3);
    assert_eq!(snapshot.resolved_total, dec!(1700));

    let service_fee = &snapshot.lines[0];
    assert!(service_fee.accepted);
    assert_eq!(service_fee.delta, dec!(200));
    assert_eq!(service_fee.resolved_amount, Some(dec!(1200)));

    let new_line = &snapshot.lines[2];
    assert!(!new_line.accepted);
    assert_eq!(new_line.resolved_amount, None);

    let json = serde_json::to_value(&snapshot).expect("serialize snapshot");
    assert_eq!(json["mode"], "diff");
    assert_eq!(json["lines"][0]["key"], "2025-02-01:SERVICE_FEE:0");
    assert_eq!(json["lines"][0]["change"]["kind"], "changed");
    assert!(json.get("banner").is_none());
}
