//! Reducer for the ticket lifecycle.

use crate::access;
use crate::attachment::NewAttachment;
use crate::conversation::{NewMessage, SystemNotice};
use crate::effect::Effect;
use crate::error::TicketError;
use crate::events::TicketEvent;
use crate::lifecycle::environment::{LifecycleEnvironment, ProductionLifecycleEnvironment};
use crate::lifecycle::policy;
use crate::lifecycle::TicketAction;
use crate::reducer::Reducer;
use crate::status::TicketStatus;
use crate::ticket::{Ticket, TicketPatch};
use crate::user::Actor;
use smallvec::{SmallVec, smallvec};

type Effects = SmallVec<[Effect; 4]>;

/// Reducer for ticket changes.
///
/// Validates every action against the transition table, the role rules and
/// the access gate before touching the ticket. On success the ticket has
/// been mutated in place and the returned effects describe what else must
/// be persisted with it (`AppendMessage`, `AttachFile`) and who must hear
/// about it afterwards (`Notify`).
#[derive(Debug, Clone, Copy, Default)]
pub struct TicketLifecycleReducer;

impl TicketLifecycleReducer {
    /// Create a new lifecycle reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn change_status(
        ticket: &mut Ticket,
        actor: Actor,
        target: TicketStatus,
        env: &impl LifecycleEnvironment,
    ) -> Result<Effects, TicketError> {
        policy::authorize_transition(&actor, ticket, target)?;

        let now = env.clock().now();
        let from = ticket.status;
        ticket.status = target;
        ticket.touch(now);

        Ok(smallvec![
            Effect::AppendMessage(NewMessage::system(
                ticket.id,
                SystemNotice::StatusChanged { from, to: target },
                now,
            )),
            Effect::Notify(TicketEvent::StatusChanged {
                from,
                to: target,
                initiator: actor,
            }),
        ])
    }

    fn assign(
        ticket: &mut Ticket,
        actor: Actor,
        env: &impl LifecycleEnvironment,
    ) -> Result<Effects, TicketError> {
        policy::authorize_assign(&actor, ticket)?;

        let now = env.clock().now();
        let mut effects = Effects::new();
        ticket.assignee_id = Some(actor.id);

        // Taking a fresh ticket starts work on it
        if ticket.status == TicketStatus::New {
            ticket.status = TicketStatus::InProgress;
            effects.push(Effect::AppendMessage(NewMessage::system(
                ticket.id,
                SystemNotice::StatusChanged {
                    from: TicketStatus::New,
                    to: TicketStatus::InProgress,
                },
                now,
            )));
        }
        ticket.touch(now);

        effects.push(Effect::Notify(TicketEvent::Assigned { assignee: actor }));
        Ok(effects)
    }

    fn set_urgent(
        ticket: &mut Ticket,
        actor: Actor,
        urgent: bool,
        env: &impl LifecycleEnvironment,
    ) -> Result<Effects, TicketError> {
        policy::authorize_urgency(&actor, ticket)?;

        let now = env.clock().now();
        ticket.is_urgent = urgent;
        ticket.touch(now);

        let notice = if urgent {
            SystemNotice::UrgentSet
        } else {
            SystemNotice::UrgentCleared
        };
        let mut effects: Effects =
            smallvec![Effect::AppendMessage(NewMessage::system(ticket.id, notice, now))];
        if urgent {
            effects.push(Effect::Notify(TicketEvent::Urgent { initiator: actor }));
        }
        Ok(effects)
    }

    fn edit(
        ticket: &mut Ticket,
        actor: &Actor,
        patch: TicketPatch,
        env: &impl LifecycleEnvironment,
    ) -> Result<Effects, TicketError> {
        access::authorize_edit(actor, ticket)?;
        patch.validate()?;

        patch.apply(ticket);
        ticket.touch(env.clock().now());
        Ok(smallvec![Effect::None])
    }

    fn post_message(
        ticket: &mut Ticket,
        actor: Actor,
        text: String,
        attachment: Option<NewAttachment>,
        env: &impl LifecycleEnvironment,
    ) -> Result<Effects, TicketError> {
        access::authorize_message(&actor, ticket)?;
        if text.trim().is_empty() {
            return Err(TicketError::Validation("text is required".to_string()));
        }
        if let Some(attachment) = &attachment {
            check_attachment(ticket, attachment, env)?;
        }

        let now = env.clock().now();
        ticket.touch(now);

        let message =
            NewMessage::from_actor(ticket.id, &actor, text.clone(), now).with_attachment(attachment);
        Ok(smallvec![
            Effect::AppendMessage(message),
            Effect::Notify(TicketEvent::NewMessage { sender: actor, text }),
        ])
    }

    fn attach_file(
        ticket: &mut Ticket,
        actor: &Actor,
        attachment: NewAttachment,
        env: &impl LifecycleEnvironment,
    ) -> Result<Effects, TicketError> {
        access::authorize_upload(actor, ticket)?;
        check_attachment(ticket, &attachment, env)?;

        ticket.touch(env.clock().now());
        Ok(smallvec![Effect::AttachFile(attachment)])
    }
}

fn check_attachment(
    ticket: &Ticket,
    attachment: &NewAttachment,
    env: &impl LifecycleEnvironment,
) -> Result<(), TicketError> {
    if attachment.ticket_id != ticket.id {
        return Err(TicketError::Validation(format!(
            "attachment belongs to ticket {}",
            attachment.ticket_id
        )));
    }
    env.attachment_policy()
        .check(&attachment.filename, attachment.filesize)
}

impl Reducer for TicketLifecycleReducer {
    type State = Ticket;
    type Action = TicketAction;
    type Environment = ProductionLifecycleEnvironment;
    type Error = TicketError;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Result<SmallVec<[Effect; 4]>, Self::Error> {
        match action {
            TicketAction::ChangeStatus { actor, target } => {
                Self::change_status(state, actor, target, env)
            }
            TicketAction::Assign { actor } => Self::assign(state, actor, env),
            TicketAction::SetUrgent { actor, urgent } => Self::set_urgent(state, actor, urgent, env),
            TicketAction::Edit { actor, patch } => Self::edit(state, &actor, patch, env),
            TicketAction::PostMessage {
                actor,
                text,
                attachment,
            } => Self::post_message(state, actor, text, attachment, env),
            TicketAction::AttachFile { actor, attachment } => {
                Self::attach_file(state, &actor, attachment, env)
            }
        }
    }
}
