//! Booking lifecycle features.
//!
//! Two cooperating stores: the [`orchestrator`] drives creation and the
//! per-booking payment state machine; the [`reconciler`] keeps the cached
//! booking list in sync with the server (optimistic cancellation,
//! pending-payment polling, derived categorization). The stores stay
//! decoupled; [`spawn_refresh_forwarder`] observes the orchestrator's
//! action stream and nudges the list to refetch whenever the server-side
//! booking set changed.

pub mod orchestrator;
pub mod reconciler;

use concierge_runtime::Store;
use orchestrator::{
    BookingFlowAction, BookingFlowEnvironment, BookingFlowReducer, BookingFlowState,
};
use reconciler::{BookingListAction, BookingListEnvironment, BookingListReducer, BookingListState};
use tokio::task::JoinHandle;

/// Store type for the payment orchestrator
pub type BookingFlowStore =
    Store<BookingFlowState, BookingFlowAction, BookingFlowEnvironment, BookingFlowReducer>;

/// Store type for the booking list
pub type BookingListStore =
    Store<BookingListState, BookingListAction, BookingListEnvironment, BookingListReducer>;

/// Forward list-affecting orchestrator outcomes to the list store
///
/// Creation, pay-online initiation, confirmed payment, and a completed
/// revert all change the server's booking set; each one triggers a list
/// refresh. Initiation matters even before confirmation: it flips the
/// booking to a pending online payment, which must arm the poll loop.
/// The task ends when the orchestrator store shuts down.
pub fn spawn_refresh_forwarder(
    flow: &BookingFlowStore,
    list: BookingListStore,
) -> JoinHandle<()> {
    let mut actions = flow.subscribe_actions();
    tokio::spawn(async move {
        loop {
            match actions.recv().await {
                Ok(action) => {
                    let list_changed = matches!(
                        action,
                        BookingFlowAction::BookingCreated { .. }
                            | BookingFlowAction::PaymentInitiated { .. }
                            | BookingFlowAction::GatewayConfirmed { .. }
                            | BookingFlowAction::RevertSucceeded { .. }
                    );
                    if list_changed && list.send(BookingListAction::Refresh).await.is_err() {
                        break;
                    }
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    // A lagged observer refetches anyway on the next trigger.
                    tracing::debug!(skipped, "refresh forwarder lagged");
                },
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
