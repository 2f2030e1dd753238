//! Ledger reducer.
//!
//! Each command is validated completely against the current state and the
//! clock, then turned into at most one fact which is applied through
//! [`LedgerState::apply`]. Rejections return before anything is written.
//! Refund payouts are the only external call made during a transition; they
//! run after validation and before the burn is applied.

use crate::actions::{LedgerAction, LedgerOutput};
use crate::environment::LedgerEnvironment;
use crate::error::{LedgerError, LedgerResult};
use crate::events::LedgerEvent;
use crate::notifications::Notification;
use crate::registry::validate_schedule;
use crate::state::LedgerState;
use crate::types::{EventId, Identity, Money, Role, TicketId};
use chrono::{DateTime, Utc};
use ticket_ledger_core::event::Event;
use ticket_ledger_core::reducer::{Reduced, Reducer};

type LedgerReduced = Reduced<LedgerOutput, LedgerAction>;

/// Reducer for the ticket ledger
#[derive(Clone, Copy, Debug, Default)]
pub struct LedgerReducer;

impl LedgerReducer {
    /// Creates a new `LedgerReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Apply a validated fact and log it
    fn commit(state: &mut LedgerState, fact: &LedgerEvent) -> LedgerResult<()> {
        state.apply(fact)?;
        tracing::info!(
            fact = fact.event_type(),
            event_id = ?fact.event_id().map(EventId::value),
            ticket_id = ?fact.ticket_id().map(TicketId::value),
            "Fact applied"
        );
        Ok(())
    }

    fn accepted(
        output: LedgerOutput,
        notification: Notification,
        env: &LedgerEnvironment,
    ) -> LedgerReduced {
        Reduced::new(output).with_effect(notification.publish(env))
    }

    // ========================================================================
    // Roles
    // ========================================================================

    fn grant_role(
        state: &mut LedgerState,
        caller: Identity,
        role: Role,
        account: Identity,
    ) -> LedgerResult<LedgerReduced> {
        state.roles.require(Role::Admin, &caller)?;
        if state.roles.has_role(role, &account) {
            return Ok(Reduced::new(LedgerOutput::Unit));
        }
        Self::commit(
            state,
            &LedgerEvent::RoleGranted {
                role,
                account,
                granted_by: caller,
            },
        )?;
        Ok(Reduced::new(LedgerOutput::Unit))
    }

    fn revoke_role(
        state: &mut LedgerState,
        caller: Identity,
        role: Role,
        account: Identity,
    ) -> LedgerResult<LedgerReduced> {
        state.roles.require(Role::Admin, &caller)?;
        Self::remove_role(state, caller, role, account)
    }

    fn remove_role(
        state: &mut LedgerState,
        caller: Identity,
        role: Role,
        account: Identity,
    ) -> LedgerResult<LedgerReduced> {
        if !state.roles.has_role(role, &account) {
            return Ok(Reduced::new(LedgerOutput::Unit));
        }
        state.roles.ensure_removable(role, &account)?;
        Self::commit(
            state,
            &LedgerEvent::RoleRevoked {
                role,
                account,
                revoked_by: caller,
            },
        )?;
        Ok(Reduced::new(LedgerOutput::Unit))
    }

    // ========================================================================
    // Event Registry
    // ========================================================================

    #[allow(clippy::too_many_arguments)]
    fn create_event(
        state: &mut LedgerState,
        env: &LedgerEnvironment,
        now: DateTime<Utc>,
        caller: Identity,
        metadata_ref: String,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        ticket_price: Money,
        max_tickets: u32,
    ) -> LedgerResult<LedgerReduced> {
        state.roles.require(Role::Organizer, &caller)?;
        validate_schedule(start_time, end_time, now)?;
        if max_tickets == 0 {
            return Err(LedgerError::InvalidCapacity(
                "max tickets must be greater than zero".to_string(),
            ));
        }
        if max_tickets > env.max_tickets_per_event {
            return Err(LedgerError::InvalidCapacity(format!(
                "max tickets {max_tickets} exceeds the limit of {}",
                env.max_tickets_per_event
            )));
        }

        let event_id = state.next_event_id;
        Self::commit(
            state,
            &LedgerEvent::EventCreated {
                event_id,
                organizer: caller.clone(),
                metadata_ref,
                start_time,
                end_time,
                ticket_price,
                max_tickets,
                created_at: now,
            },
        )?;

        Ok(Self::accepted(
            LedgerOutput::EventCreated(event_id),
            Notification::EventCreated {
                event_id,
                organizer: caller,
            },
            env,
        ))
    }

    fn update_event(
        state: &mut LedgerState,
        now: DateTime<Utc>,
        caller: &Identity,
        event_id: EventId,
        metadata_ref: String,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> LedgerResult<LedgerReduced> {
        let record = state.registry.require_organizer(event_id, caller)?;
        if now >= record.end_time {
            return Err(LedgerError::EventEnded(event_id));
        }
        validate_schedule(start_time, end_time, now)?;

        Self::commit(
            state,
            &LedgerEvent::EventUpdated {
                event_id,
                metadata_ref,
                start_time,
                end_time,
                updated_at: now,
            },
        )?;
        Ok(Reduced::new(LedgerOutput::Unit))
    }

    fn cancel_event(
        state: &mut LedgerState,
        env: &LedgerEnvironment,
        now: DateTime<Utc>,
        caller: Identity,
        event_id: EventId,
    ) -> LedgerResult<LedgerReduced> {
        let record = state.registry.require_organizer(event_id, &caller)?;
        if record.cancelled {
            return Err(LedgerError::AlreadyCancelled(event_id));
        }
        if now >= record.end_time {
            return Err(LedgerError::EventEnded(event_id));
        }
        let outstanding_tickets = state.inventory_of(event_id)?.tickets_sold;

        Self::commit(
            state,
            &LedgerEvent::EventCancelled {
                event_id,
                cancelled_at: now,
            },
        )?;

        Ok(Self::accepted(
            LedgerOutput::Unit,
            Notification::EventCancelled {
                event_id,
                organizer: caller,
                outstanding_tickets,
            },
            env,
        ))
    }

    // ========================================================================
    // Ticket Ledger
    // ========================================================================

    fn mint_ticket(
        state: &mut LedgerState,
        env: &LedgerEnvironment,
        now: DateTime<Utc>,
        caller: Identity,
        event_id: EventId,
        payment: Money,
    ) -> LedgerResult<LedgerReduced> {
        let record = state.registry.require(event_id)?;
        if record.is_closed(now) {
            return Err(LedgerError::EventEnded(event_id));
        }
        let price = record.ticket_price;
        if payment != price {
            return Err(LedgerError::IncorrectPayment {
                expected: price.units(),
                received: payment.units(),
            });
        }
        state.inventory_of(event_id)?.ensure_available(event_id)?;

        let ticket_id = state.next_ticket_id;
        Self::commit(
            state,
            &LedgerEvent::TicketMinted {
                ticket_id,
                event_id,
                owner: caller.clone(),
                price,
                minted_at: now,
            },
        )?;

        Ok(Self::accepted(
            LedgerOutput::TicketMinted(ticket_id),
            Notification::TicketMinted {
                event_id,
                ticket_id,
                owner: caller,
                price,
            },
            env,
        ))
    }

    fn transfer_ticket(
        state: &mut LedgerState,
        env: &LedgerEnvironment,
        now: DateTime<Utc>,
        caller: Identity,
        ticket_id: TicketId,
        to: Identity,
    ) -> LedgerResult<LedgerReduced> {
        let event_id = state.tickets.require_owner(ticket_id, &caller)?.event_id;
        if state.registry.require(event_id)?.has_started(now) {
            return Err(LedgerError::TransferWindowClosed(event_id));
        }

        Self::commit(
            state,
            &LedgerEvent::TicketTransferred {
                ticket_id,
                from: caller.clone(),
                to: to.clone(),
                transferred_at: now,
            },
        )?;

        Ok(Self::accepted(
            LedgerOutput::Unit,
            Notification::TicketTransferred {
                event_id,
                ticket_id,
                from: caller,
                to,
            },
            env,
        ))
    }

    fn mark_used(
        state: &mut LedgerState,
        env: &LedgerEnvironment,
        now: DateTime<Utc>,
        caller: &Identity,
        ticket_id: TicketId,
        used: bool,
    ) -> LedgerResult<LedgerReduced> {
        let ticket = state.tickets.require(ticket_id)?;
        let (event_id, holder) = (ticket.event_id, ticket.owner.clone());
        state.registry.require_organizer(event_id, caller)?;

        Self::commit(
            state,
            &LedgerEvent::TicketUsageMarked {
                ticket_id,
                used,
                marked_at: now,
            },
        )?;

        Ok(Self::accepted(
            LedgerOutput::Unit,
            Notification::TicketUsed {
                event_id,
                ticket_id,
                holder,
                used,
            },
            env,
        ))
    }

    fn request_refund(
        state: &mut LedgerState,
        env: &LedgerEnvironment,
        now: DateTime<Utc>,
        caller: Identity,
        ticket_id: TicketId,
    ) -> LedgerResult<LedgerReduced> {
        let event_id = state.tickets.require_owner(ticket_id, &caller)?.event_id;
        if state.registry.require(event_id)?.has_started(now) {
            return Err(LedgerError::RefundWindowClosed(event_id));
        }
        Self::refund(state, env, now, caller, ticket_id, event_id)
    }

    fn refund_cancelled(
        state: &mut LedgerState,
        env: &LedgerEnvironment,
        now: DateTime<Utc>,
        caller: Identity,
        ticket_id: TicketId,
    ) -> LedgerResult<LedgerReduced> {
        let event_id = state.tickets.require_owner(ticket_id, &caller)?.event_id;
        if !state.registry.require(event_id)?.cancelled {
            return Err(LedgerError::EventNotCancelled(event_id));
        }
        Self::refund(state, env, now, caller, ticket_id, event_id)
    }

    /// Pay out, then burn. Both refund paths end here once their own gate passed.
    fn refund(
        state: &mut LedgerState,
        env: &LedgerEnvironment,
        now: DateTime<Utc>,
        caller: Identity,
        ticket_id: TicketId,
        event_id: EventId,
    ) -> LedgerResult<LedgerReduced> {
        let amount = state.registry.require(event_id)?.ticket_price;
        state
            .inventory_of(event_id)?
            .ensure_releasable(event_id, amount)?;

        let receipt = if amount.is_zero() {
            None
        } else {
            let receipt = env
                .treasury
                .pay_out(&caller, amount, ticket_id)
                .map_err(|error| LedgerError::PayoutFailed {
                    ticket_id,
                    reason: error.to_string(),
                })?;
            Some(receipt)
        };

        Self::commit(
            state,
            &LedgerEvent::TicketRefunded {
                ticket_id,
                event_id,
                owner: caller.clone(),
                amount,
                receipt: receipt.as_ref().map(|r| r.reference.clone()),
                refunded_at: now,
            },
        )?;

        Ok(Self::accepted(
            LedgerOutput::Refunded {
                ticket_id,
                amount,
                receipt,
            },
            Notification::RefundIssued {
                event_id,
                ticket_id,
                recipient: caller,
                amount,
            },
            env,
        ))
    }

    // ========================================================================
    // Waitlist Manager
    // ========================================================================

    fn join_waitlist(
        state: &mut LedgerState,
        env: &LedgerEnvironment,
        now: DateTime<Utc>,
        caller: Identity,
        event_id: EventId,
    ) -> LedgerResult<LedgerReduced> {
        state.registry.require(event_id)?;
        if !state.inventory_of(event_id)?.is_sold_out() {
            return Err(LedgerError::NotSoldOut(event_id));
        }
        if state.waitlists.contains(event_id, &caller) {
            return Err(LedgerError::AlreadyWaitlisted(event_id));
        }

        Self::commit(
            state,
            &LedgerEvent::WaitlistJoined {
                event_id,
                user: caller.clone(),
                joined_at: now,
            },
        )?;
        let position = state.waitlists.count(event_id);

        Ok(Self::accepted(
            LedgerOutput::Unit,
            Notification::WaitlistJoined {
                event_id,
                user: caller,
                position,
            },
            env,
        ))
    }

    fn leave_waitlist(
        state: &mut LedgerState,
        now: DateTime<Utc>,
        caller: Identity,
        event_id: EventId,
    ) -> LedgerResult<LedgerReduced> {
        state.registry.require(event_id)?;
        if !state.waitlists.contains(event_id, &caller) {
            return Err(LedgerError::NotFound(format!(
                "{caller} is not on the waitlist for event {event_id}"
            )));
        }

        Self::commit(
            state,
            &LedgerEvent::WaitlistLeft {
                event_id,
                user: caller,
                left_at: now,
            },
        )?;
        Ok(Reduced::new(LedgerOutput::Unit))
    }

    fn dispatch(
        state: &mut LedgerState,
        action: LedgerAction,
        env: &LedgerEnvironment,
        now: DateTime<Utc>,
    ) -> LedgerResult<LedgerReduced> {
        match action {
            LedgerAction::GrantRole {
                caller,
                role,
                account,
            } => Self::grant_role(state, caller, role, account),
            LedgerAction::RevokeRole {
                caller,
                role,
                account,
            } => Self::revoke_role(state, caller, role, account),
            LedgerAction::RenounceRole { caller, role } => {
                Self::remove_role(state, caller.clone(), role, caller)
            },
            LedgerAction::CreateEvent {
                caller,
                metadata_ref,
                start_time,
                end_time,
                ticket_price,
                max_tickets,
            } => Self::create_event(
                state,
                env,
                now,
                caller,
                metadata_ref,
                start_time,
                end_time,
                ticket_price,
                max_tickets,
            ),
            LedgerAction::UpdateEvent {
                caller,
                event_id,
                metadata_ref,
                start_time,
                end_time,
            } => Self::update_event(
                state,
                now,
                &caller,
                event_id,
                metadata_ref,
                start_time,
                end_time,
            ),
            LedgerAction::CancelEvent { caller, event_id } => {
                Self::cancel_event(state, env, now, caller, event_id)
            },
            LedgerAction::MintTicket {
                caller,
                event_id,
                payment,
            } => Self::mint_ticket(state, env, now, caller, event_id, payment),
            LedgerAction::TransferTicket {
                caller,
                ticket_id,
                to,
            } => Self::transfer_ticket(state, env, now, caller, ticket_id, to),
            LedgerAction::MarkUsed {
                caller,
                ticket_id,
                used,
            } => Self::mark_used(state, env, now, &caller, ticket_id, used),
            LedgerAction::RequestRefund { caller, ticket_id } => {
                Self::request_refund(state, env, now, caller, ticket_id)
            },
            LedgerAction::RefundTicket { caller, ticket_id } => {
                Self::refund_cancelled(state, env, now, caller, ticket_id)
            },
            LedgerAction::JoinWaitlist { caller, event_id } => {
                Self::join_waitlist(state, env, now, caller, event_id)
            },
            LedgerAction::LeaveWaitlist { caller, event_id } => {
                Self::leave_waitlist(state, now, caller, event_id)
            },
        }
    }
}

impl Reducer for LedgerReducer {
    type State = LedgerState;
    type Action = LedgerAction;
    type Environment = LedgerEnvironment;
    type Output = LedgerOutput;
    type Error = LedgerError;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Result<Reduced<Self::Output, Self::Action>, Self::Error> {
        let now = env.now();
        let operation = action.name();
        let caller = action.caller().clone();

        let result = Self::dispatch(state, action, env, now);
        if let Err(error) = &result {
            tracing::warn!(
                operation,
                %caller,
                kind = error.kind(),
                %error,
                "Command rejected"
            );
        }
        result
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::treasury::InMemoryTreasury;
    use chrono::Duration;
    use std::sync::Arc;
    use ticket_ledger_core::environment::Clock;
    use ticket_ledger_testing::{FixedClock, InMemoryEventBus, ReducerTest, assertions, test_clock};

    fn id(s: &str) -> Identity {
        Identity::new(s).unwrap()
    }

    fn now() -> DateTime<Utc> {
        test_clock().now()
    }

    fn env_at(time: DateTime<Utc>) -> LedgerEnvironment {
        LedgerEnvironment::new(
            Arc::new(FixedClock::new(time)),
            Arc::new(InMemoryEventBus::new()),
            InMemoryTreasury::shared(),
            &Config::for_admin(id("admin")),
        )
    }

    fn env() -> LedgerEnvironment {
        env_at(now())
    }

    fn price() -> Money {
        Money::from_units(100)
    }

    /// Genesis plus one event (id 1) starting in a day, lasting a day
    fn with_event(max_tickets: u32) -> LedgerState {
        let mut state = LedgerState::genesis(&id("admin"));
        LedgerReducer
            .reduce(
                &mut state,
                LedgerAction::CreateEvent {
                    caller: id("admin"),
                    metadata_ref: "ipfs://concert".to_string(),
                    start_time: now() + Duration::days(1),
                    end_time: now() + Duration::days(2),
                    ticket_price: price(),
                    max_tickets,
                },
                &env(),
            )
            .unwrap();
        state
    }

    fn with_ticket(owner: &str) -> LedgerState {
        let mut state = with_event(5);
        LedgerReducer
            .reduce(
                &mut state,
                LedgerAction::MintTicket {
                    caller: id(owner),
                    event_id: EventId::new(1),
                    payment: price(),
                },
                &env(),
            )
            .unwrap();
        state
    }

    #[test]
    fn create_event_requires_organizer() {
        ReducerTest::new(LedgerReducer)
            .with_env(env())
            .given_state(LedgerState::genesis(&id("admin")))
            .when_action(LedgerAction::CreateEvent {
                caller: id("stranger"),
                metadata_ref: "ipfs://x".to_string(),
                start_time: now() + Duration::hours(1),
                end_time: now() + Duration::hours(2),
                ticket_price: price(),
                max_tickets: 10,
            })
            .then_outcome(|outcome| {
                assert!(matches!(outcome, Err(LedgerError::Unauthorized(_))));
            })
            .then_state(|state| assert!(state.registry.is_empty()))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn create_event_assigns_ids_and_announces() {
        ReducerTest::new(LedgerReducer)
            .with_env(env())
            .given_state(with_event(10))
            .when_action(LedgerAction::CreateEvent {
                caller: id("admin"),
                metadata_ref: "ipfs://second".to_string(),
                start_time: now() + Duration::hours(1),
                end_time: now() + Duration::hours(2),
                ticket_price: Money::ZERO,
                max_tickets: 1,
            })
            .then_outcome(|outcome| {
                assert_eq!(outcome, &Ok(LedgerOutput::EventCreated(EventId::new(2))));
            })
            .then_state(|state| {
                assert_eq!(
                    state.events_of(&id("admin")),
                    vec![EventId::new(1), EventId::new(2)]
                );
            })
            .then_effects(|effects| {
                assertions::assert_published_types(effects, &["EventCreated.v1"]);
            })
            .run();
    }

    #[test]
    fn create_event_rejects_bad_schedule_and_capacity() {
        let mut state = LedgerState::genesis(&id("admin"));
        let create = |start: DateTime<Utc>, end: DateTime<Utc>, max_tickets: u32| {
            LedgerAction::CreateEvent {
                caller: id("admin"),
                metadata_ref: "ipfs://x".to_string(),
                start_time: start,
                end_time: end,
                ticket_price: price(),
                max_tickets,
            }
        };
        let later = now() + Duration::hours(1);

        let past_start = LedgerReducer.reduce(&mut state, create(now(), later, 1), &env());
        assert!(matches!(past_start, Err(LedgerError::InvalidSchedule(_))));

        let inverted = LedgerReducer.reduce(&mut state, create(later, later, 1), &env());
        assert!(matches!(inverted, Err(LedgerError::InvalidSchedule(_))));

        let empty = LedgerReducer.reduce(
            &mut state,
            create(later, later + Duration::hours(1), 0),
            &env(),
        );
        assert!(matches!(empty, Err(LedgerError::InvalidCapacity(_))));

        let huge = LedgerReducer.reduce(
            &mut state,
            create(later, later + Duration::hours(1), 1_000_001),
            &env(),
        );
        assert!(matches!(huge, Err(LedgerError::InvalidCapacity(_))));

        assert_eq!(state, LedgerState::genesis(&id("admin")));
    }

    #[test]
    fn mint_checks_payment_before_capacity() {
        ReducerTest::new(LedgerReducer)
            .with_env(env())
            .given_state(with_event(1))
            .when_action(LedgerAction::MintTicket {
                caller: id("alice"),
                event_id: EventId::new(1),
                payment: Money::from_units(101),
            })
            .then_outcome(|outcome| {
                assert_eq!(
                    outcome,
                    &Err(LedgerError::IncorrectPayment {
                        expected: 100,
                        received: 101
                    })
                );
            })
            .then_state(|state| {
                assert_eq!(state.inventory_of(EventId::new(1)).unwrap().tickets_sold, 0);
            })
            .run();
    }

    #[test]
    fn mint_issues_ticket_and_notifies() {
        ReducerTest::new(LedgerReducer)
            .with_env(env())
            .given_state(with_event(1))
            .when_action(LedgerAction::MintTicket {
                caller: id("alice"),
                event_id: EventId::new(1),
                payment: price(),
            })
            .then_outcome(|outcome| {
                assert_eq!(outcome, &Ok(LedgerOutput::TicketMinted(TicketId::new(1))));
            })
            .then_state(|state| {
                assert_eq!(state.owner_of(TicketId::new(1)).unwrap(), id("alice"));
                assert!(state.is_sold_out(EventId::new(1)).unwrap());
                assert_eq!(state.escrow_balance(EventId::new(1)).unwrap(), price());
            })
            .then_effects(|effects| {
                assertions::assert_published_types(effects, &["TicketMinted.v1"]);
            })
            .run();
    }

    #[test]
    fn mint_after_end_or_cancel_is_rejected() {
        let state = with_event(3);
        let mint = LedgerAction::MintTicket {
            caller: id("alice"),
            event_id: EventId::new(1),
            payment: price(),
        };

        // Started but not ended still sells
        let mut live = state.clone();
        assert!(
            LedgerReducer
                .reduce(&mut live, mint.clone(), &env_at(now() + Duration::hours(30)))
                .is_ok()
        );

        let mut ended = state.clone();
        assert_eq!(
            LedgerReducer
                .reduce(&mut ended, mint.clone(), &env_at(now() + Duration::days(2)))
                .unwrap_err(),
            LedgerError::EventEnded(EventId::new(1))
        );

        let mut cancelled = state;
        LedgerReducer
            .reduce(
                &mut cancelled,
                LedgerAction::CancelEvent {
                    caller: id("admin"),
                    event_id: EventId::new(1),
                },
                &env(),
            )
            .unwrap();
        assert_eq!(
            LedgerReducer.reduce(&mut cancelled, mint, &env()).unwrap_err(),
            LedgerError::EventEnded(EventId::new(1))
        );
    }

    #[test]
    fn transfer_closes_at_start() {
        let mut state = with_ticket("alice");
        let transfer = LedgerAction::TransferTicket {
            caller: id("alice"),
            ticket_id: TicketId::new(1),
            to: id("bob"),
        };

        assert_eq!(
            LedgerReducer
                .reduce(&mut state, transfer.clone(), &env_at(now() + Duration::days(1)))
                .unwrap_err(),
            LedgerError::TransferWindowClosed(EventId::new(1))
        );

        LedgerReducer.reduce(&mut state, transfer, &env()).unwrap();
        assert_eq!(state.tickets_of(&id("bob")), vec![TicketId::new(1)]);
        assert!(state.tickets_of(&id("alice")).is_empty());
    }

    #[test]
    fn only_the_holder_transfers() {
        ReducerTest::new(LedgerReducer)
            .with_env(env())
            .given_state(with_ticket("alice"))
            .when_action(LedgerAction::TransferTicket {
                caller: id("mallory"),
                ticket_id: TicketId::new(1),
                to: id("mallory"),
            })
            .then_outcome(|outcome| {
                assert!(matches!(outcome, Err(LedgerError::Unauthorized(_))));
            })
            .then_state(|state| {
                assert_eq!(state.owner_of(TicketId::new(1)).unwrap(), id("alice"));
            })
            .run();
    }

    #[test]
    fn mark_used_toggles_for_the_organizer_only() {
        let mut state = with_ticket("alice");
        let mark = |caller: &str, used: bool| LedgerAction::MarkUsed {
            caller: id(caller),
            ticket_id: TicketId::new(1),
            used,
        };

        assert!(matches!(
            LedgerReducer.reduce(&mut state, mark("alice", true), &env()),
            Err(LedgerError::Unauthorized(_))
        ));

        let reduced = LedgerReducer.reduce(&mut state, mark("admin", true), &env()).unwrap();
        assertions::assert_published_types(&reduced.effects, &["TicketUsed.v1"]);
        assert!(state.get_ticket(TicketId::new(1)).unwrap().used);

        LedgerReducer.reduce(&mut state, mark("admin", false), &env()).unwrap();
        assert!(!state.get_ticket(TicketId::new(1)).unwrap().used);
    }

    #[test]
    fn refund_before_start_burns_and_pays() {
        let treasury = InMemoryTreasury::shared();
        let mut env = env();
        env.treasury = treasury.clone();

        ReducerTest::new(LedgerReducer)
            .with_env(env)
            .given_state(with_ticket("alice"))
            .when_action(LedgerAction::RequestRefund {
                caller: id("alice"),
                ticket_id: TicketId::new(1),
            })
            .then_outcome(|outcome| {
                let Ok(LedgerOutput::Refunded { amount, receipt, .. }) = outcome else {
                    panic!("expected a refund, got {outcome:?}");
                };
                assert_eq!(*amount, Money::from_units(100));
                assert!(receipt.is_some());
            })
            .then_state(move |state| {
                assert!(matches!(
                    state.owner_of(TicketId::new(1)),
                    Err(LedgerError::NotFound(_))
                ));
                assert_eq!(state.available_tickets(EventId::new(1)).unwrap(), 5);
                assert_eq!(state.escrow_balance(EventId::new(1)).unwrap(), Money::ZERO);
                assert_eq!(treasury.paid_to(&id("alice")), Money::from_units(100));
            })
            .then_effects(|effects| {
                assertions::assert_published_types(effects, &["RefundIssued.v1"]);
            })
            .run();
    }

    #[test]
    fn refund_after_start_needs_cancellation() {
        let mut state = with_ticket("alice");
        let after_start = env_at(now() + Duration::days(1) + Duration::minutes(1));

        assert_eq!(
            LedgerReducer
                .reduce(
                    &mut state,
                    LedgerAction::RequestRefund {
                        caller: id("alice"),
                        ticket_id: TicketId::new(1),
                    },
                    &after_start,
                )
                .unwrap_err(),
            LedgerError::RefundWindowClosed(EventId::new(1))
        );
        assert_eq!(
            LedgerReducer
                .reduce(
                    &mut state,
                    LedgerAction::RefundTicket {
                        caller: id("alice"),
                        ticket_id: TicketId::new(1),
                    },
                    &after_start,
                )
                .unwrap_err(),
            LedgerError::EventNotCancelled(EventId::new(1))
        );
        assert_eq!(state.tickets.len(), 1);
    }

    #[test]
    fn failed_payout_leaves_ticket_in_place() {
        let treasury = InMemoryTreasury::shared();
        treasury.set_failing(true);
        let mut env = env();
        env.treasury = treasury;

        let before = with_ticket("alice");
        let mut state = before.clone();
        let outcome = LedgerReducer.reduce(
            &mut state,
            LedgerAction::RequestRefund {
                caller: id("alice"),
                ticket_id: TicketId::new(1),
            },
            &env,
        );

        assert!(matches!(outcome, Err(LedgerError::PayoutFailed { .. })));
        assert_eq!(state, before);
    }

    #[test]
    fn cancel_is_one_way_and_closed_after_end() {
        let mut state = with_event(2);
        let cancel = LedgerAction::CancelEvent {
            caller: id("admin"),
            event_id: EventId::new(1),
        };

        assert_eq!(
            LedgerReducer
                .reduce(&mut state.clone(), cancel.clone(), &env_at(now() + Duration::days(3)))
                .unwrap_err(),
            LedgerError::EventEnded(EventId::new(1))
        );

        let reduced = LedgerReducer.reduce(&mut state, cancel.clone(), &env()).unwrap();
        assertions::assert_published_types(&reduced.effects, &["EventCancelled.v1"]);
        assert_eq!(
            LedgerReducer.reduce(&mut state, cancel, &env()).unwrap_err(),
            LedgerError::AlreadyCancelled(EventId::new(1))
        );
    }

    #[test]
    fn ended_event_cannot_be_rescheduled() {
        let state = with_event(2);
        let later = now() + Duration::days(3);
        let reschedule = LedgerAction::UpdateEvent {
            caller: id("admin"),
            event_id: EventId::new(1),
            metadata_ref: "ipfs://encore".to_string(),
            start_time: later + Duration::days(1),
            end_time: later + Duration::days(2),
        };

        ReducerTest::new(LedgerReducer)
            .with_env(env_at(later))
            .given_state(state.clone())
            .when_action(reschedule)
            .then_outcome(|outcome| {
                assert_eq!(outcome, &Err(LedgerError::EventEnded(EventId::new(1))));
            })
            .then_state(move |after| assert_eq!(after, &state))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn waitlist_requires_sold_out_and_rejects_duplicates() {
        let mut state = with_event(1);
        let join = |who: &str| LedgerAction::JoinWaitlist {
            caller: id(who),
            event_id: EventId::new(1),
        };

        assert_eq!(
            LedgerReducer.reduce(&mut state, join("bob"), &env()).unwrap_err(),
            LedgerError::NotSoldOut(EventId::new(1))
        );

        LedgerReducer
            .reduce(
                &mut state,
                LedgerAction::MintTicket {
                    caller: id("alice"),
                    event_id: EventId::new(1),
                    payment: price(),
                },
                &env(),
            )
            .unwrap();

        LedgerReducer.reduce(&mut state, join("bob"), &env()).unwrap();
        assert_eq!(
            LedgerReducer.reduce(&mut state, join("bob"), &env()).unwrap_err(),
            LedgerError::AlreadyWaitlisted(EventId::new(1))
        );
        assert_eq!(state.waitlist_count(EventId::new(1)).unwrap(), 1);

        let leave = LedgerAction::LeaveWaitlist {
            caller: id("bob"),
            event_id: EventId::new(1),
        };
        LedgerReducer.reduce(&mut state, leave.clone(), &env()).unwrap();
        assert!(matches!(
            LedgerReducer.reduce(&mut state, leave, &env()),
            Err(LedgerError::NotFound(_))
        ));
    }

    #[test]
    fn roles_are_admin_managed_and_keep_an_admin() {
        let mut state = LedgerState::genesis(&id("admin"));

        assert!(matches!(
            LedgerReducer.reduce(
                &mut state,
                LedgerAction::GrantRole {
                    caller: id("org"),
                    role: Role::Organizer,
                    account: id("org"),
                },
                &env(),
            ),
            Err(LedgerError::Unauthorized(_))
        ));

        LedgerReducer
            .reduce(
                &mut state,
                LedgerAction::GrantRole {
                    caller: id("admin"),
                    role: Role::Organizer,
                    account: id("org"),
                },
                &env(),
            )
            .unwrap();
        assert!(state.has_role(Role::Organizer, &id("org")));

        assert_eq!(
            LedgerReducer
                .reduce(
                    &mut state,
                    LedgerAction::RenounceRole {
                        caller: id("admin"),
                        role: Role::Admin,
                    },
                    &env(),
                )
                .unwrap_err(),
            LedgerError::LastAdmin(Role::Admin)
        );

        LedgerReducer
            .reduce(
                &mut state,
                LedgerAction::RevokeRole {
                    caller: id("admin"),
                    role: Role::Organizer,
                    account: id("org"),
                },
                &env(),
            )
            .unwrap();
        assert!(!state.has_role(Role::Organizer, &id("org")));
    }
}
