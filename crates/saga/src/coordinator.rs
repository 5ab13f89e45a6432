//! Payment coordinator driving the reservation and membership workflows.

use std::sync::Arc;
use std::time::Instant;

use domain::{PaymentRecorder, format_timestamp};
use storage::PaymentStore;

use crate::commands::{MembershipPaymentRequest, MembershipPurchase, Reservation, ReservationRequest};
use crate::report::WorkflowReport;
use crate::services::{BookingReserver, Invoice, MembershipUpdater, NotificationEmitter};
use crate::state::WorkflowKind;
use crate::workflow;

/// Orchestrates the payment workflows.
///
/// Reservation: validate → reserve booking → record payment → send invoice.
/// Membership: validate → record payment → update membership → send invoice.
///
/// Each step commits on its own and runs at most once per request. There is
/// no compensation: a failed run reports what it committed and stops.
pub struct PaymentCoordinator<S> {
    recorder: PaymentRecorder<S>,
    reserver: Arc<dyn BookingReserver>,
    membership: Arc<dyn MembershipUpdater>,
    notifier: Arc<dyn NotificationEmitter>,
}

impl<S: PaymentStore> PaymentCoordinator<S> {
    /// Creates a new coordinator recording payments in `store`.
    pub fn new(
        store: S,
        reserver: Arc<dyn BookingReserver>,
        membership: Arc<dyn MembershipUpdater>,
        notifier: Arc<dyn NotificationEmitter>,
    ) -> Self {
        Self {
            recorder: PaymentRecorder::new(store),
            reserver,
            membership,
            notifier,
        }
    }

    /// Runs the reservation workflow for a booking payment request.
    #[tracing::instrument(skip(self, request), fields(workflow = "Reservation"))]
    pub async fn execute_reservation(&self, request: &ReservationRequest) -> WorkflowReport {
        let started = Self::begin(WorkflowKind::Reservation);
        let mut report = WorkflowReport::start(WorkflowKind::Reservation);
        tracing::info!(workflow_id = %report.workflow_id, "workflow started");

        let reservation = match request.validate() {
            Ok(reservation) => reservation,
            Err(e) => return Self::finish(report.fail(workflow::STEP_VALIDATE_REQUEST, e), started),
        };
        report.step_completed(workflow::STEP_VALIDATE_REQUEST);

        tracing::info!(step = workflow::STEP_RESERVE_BOOKING, "workflow step started");
        let booking_id = match self.reserver.reserve(&reservation).await {
            Ok(booking_id) => booking_id,
            Err(e) => return Self::finish(report.fail(workflow::STEP_RESERVE_BOOKING, e), started),
        };
        report.booking_id = Some(booking_id);
        report.step_completed(workflow::STEP_RESERVE_BOOKING);

        tracing::info!(step = workflow::STEP_RECORD_PAYMENT, %booking_id, "workflow step started");
        let payment = match self
            .recorder
            .record_booking_payment(
                reservation.user_id,
                booking_id,
                reservation.total_price,
                &reservation.payment_method,
            )
            .await
        {
            Ok(payment) => payment,
            Err(e) => {
                return Self::finish(report.fail(workflow::STEP_RECORD_PAYMENT, e.into()), started);
            }
        };
        report.payment_id = Some(payment.id);
        report.step_completed(workflow::STEP_RECORD_PAYMENT);

        let invoice = reservation_invoice(&reservation, booking_id, payment.id);
        self.notify(report, &invoice, started).await
    }

    /// Runs the membership workflow for a membership payment request.
    #[tracing::instrument(skip(self, request), fields(workflow = "Membership"))]
    pub async fn execute_membership_payment(
        &self,
        request: &MembershipPaymentRequest,
    ) -> WorkflowReport {
        let started = Self::begin(WorkflowKind::Membership);
        let mut report = WorkflowReport::start(WorkflowKind::Membership);
        tracing::info!(workflow_id = %report.workflow_id, "workflow started");

        let purchase = match request.validate() {
            Ok(purchase) => purchase,
            Err(e) => return Self::finish(report.fail(workflow::STEP_VALIDATE_REQUEST, e), started),
        };
        report.membership_level = Some(purchase.term.level.clone());
        report.step_completed(workflow::STEP_VALIDATE_REQUEST);

        tracing::info!(step = workflow::STEP_RECORD_PAYMENT, "workflow step started");
        let payment = match self
            .recorder
            .record_membership_payment(
                purchase.user_id,
                purchase.term.clone(),
                purchase.amount,
                &purchase.payment_method,
            )
            .await
        {
            Ok(payment) => payment,
            Err(e) => {
                return Self::finish(report.fail(workflow::STEP_RECORD_PAYMENT, e.into()), started);
            }
        };
        report.payment_id = Some(payment.id);
        report.step_completed(workflow::STEP_RECORD_PAYMENT);

        tracing::info!(step = workflow::STEP_UPDATE_MEMBERSHIP, "workflow step started");
        if let Err(e) = self
            .membership
            .update_tier(purchase.user_id, &purchase.term.level)
            .await
        {
            return Self::finish(report.fail(workflow::STEP_UPDATE_MEMBERSHIP, e), started);
        }
        report.step_completed(workflow::STEP_UPDATE_MEMBERSHIP);

        let invoice = membership_invoice(&purchase, payment.id);
        self.notify(report, &invoice, started).await
    }

    async fn notify(
        &self,
        mut report: WorkflowReport,
        invoice: &Invoice,
        started: Instant,
    ) -> WorkflowReport {
        tracing::info!(step = workflow::STEP_SEND_INVOICE, "workflow step started");
        if let Err(e) = self.notifier.send_invoice(invoice).await {
            return Self::finish(report.fail(workflow::STEP_SEND_INVOICE, e), started);
        }
        report.step_completed(workflow::STEP_SEND_INVOICE);
        Self::finish(report.complete(), started)
    }

    fn begin(kind: WorkflowKind) -> Instant {
        metrics::counter!("workflow_executions_total", "kind" => kind.as_str()).increment(1);
        Instant::now()
    }

    fn finish(report: WorkflowReport, started: Instant) -> WorkflowReport {
        let duration = started.elapsed().as_secs_f64();
        let kind = report.kind.as_str();
        metrics::histogram!("workflow_duration_seconds", "kind" => kind).record(duration);
        metrics::counter!(
            "workflow_outcomes_total",
            "kind" => kind,
            "state" => report.state.as_str()
        )
        .increment(1);

        match (&report.error, report.failed_step) {
            (Some(error), Some(step)) => tracing::warn!(
                workflow_id = %report.workflow_id,
                state = %report.state,
                step,
                booking_id = ?report.booking_id,
                payment_id = ?report.payment_id,
                %error,
                "workflow stopped"
            ),
            _ => tracing::info!(
                workflow_id = %report.workflow_id,
                duration,
                "workflow completed successfully"
            ),
        }
        report
    }
}

fn reservation_invoice(
    reservation: &Reservation,
    booking_id: storage::BookingId,
    payment_id: storage::PaymentId,
) -> Invoice {
    Invoice {
        to: reservation.email.clone(),
        user_id: reservation.user_id,
        booking_id: Some(booking_id),
        payment_id,
        total: reservation.total_price,
        payment_method: reservation.payment_method.clone(),
        period_start: format_timestamp(&reservation.interval.start()),
        period_end: format_timestamp(&reservation.interval.end()),
        membership_level: None,
    }
}

fn membership_invoice(purchase: &MembershipPurchase, payment_id: storage::PaymentId) -> Invoice {
    Invoice {
        to: purchase.email.clone(),
        user_id: purchase.user_id,
        booking_id: None,
        payment_id,
        total: purchase.amount,
        payment_method: purchase.payment_method.clone(),
        period_start: purchase.term.start.to_string(),
        period_end: purchase.term.end.to_string(),
        membership_level: Some(purchase.term.level.clone()),
    }
}
