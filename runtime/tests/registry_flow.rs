//! End-to-end ticket flows through the registry.

#![allow(clippy::unwrap_used, clippy::panic)] // Test code

use helpdesk_core::access::ListMode;
use helpdesk_core::conversation::SystemNotice;
use helpdesk_core::{SenderRole, TicketDraft, TicketError, TicketId, TicketPatch, TicketStatus};
use helpdesk_testing::{TestHelpdesk, draft};

#[tokio::test]
async fn tickets_are_numbered_per_year() {
    let desk = TestHelpdesk::new();
    let author = desk.sign_in(100, "Olga").await;

    let first = desk.registry.create(&author, draft("VPN")).await.unwrap();
    let second = desk.registry.create(&author, draft("Mail")).await.unwrap();

    assert_eq!(first.number, "#2025-001");
    assert_eq!(second.number, "#2025-002");
    assert_eq!(first.status, TicketStatus::New);
    assert_eq!(first.assignee_id, None);
    assert_eq!(first.author_id, author.id);
}

#[tokio::test]
async fn blank_title_is_rejected() {
    let desk = TestHelpdesk::new();
    let author = desk.sign_in(100, "Olga").await;
    let result = desk
        .registry
        .create(
            &author,
            TicketDraft {
                title: "   ".into(),
                description: "something".into(),
                ..TicketDraft::default()
            },
        )
        .await;
    assert!(matches!(result, Err(TicketError::Validation(_))));
}

#[tokio::test]
async fn full_lifecycle_leaves_an_ordered_trail() {
    let desk = TestHelpdesk::new();
    let author = desk.sign_in(100, "Olga").await;
    let support = desk.support().await;

    let ticket = desk.registry.create(&author, draft("Printer")).await.unwrap();

    let ticket = desk.registry.assign(&support, ticket.id).await.unwrap();
    assert_eq!(ticket.status, TicketStatus::InProgress);
    assert_eq!(ticket.assignee_id, Some(support.id));

    desk.registry
        .send_message(&support, ticket.id, "Please check now".into(), None)
        .await
        .unwrap();
    desk.registry
        .change_status(&support, ticket.id, TicketStatus::BizReview)
        .await
        .unwrap();
    desk.registry
        .change_status(&author, ticket.id, TicketStatus::Closed)
        .await
        .unwrap();

    let late = desk
        .registry
        .send_message(&author, ticket.id, "One more thing".into(), None)
        .await;
    assert!(matches!(late, Err(TicketError::Conflict(_))));

    desk.registry
        .change_status(&author, ticket.id, TicketStatus::Reopened)
        .await
        .unwrap();
    let ticket = desk
        .registry
        .change_status(&support, ticket.id, TicketStatus::InProgress)
        .await
        .unwrap();
    assert_eq!(ticket.status, TicketStatus::InProgress);

    let trail: Vec<(SenderRole, String)> = desk
        .registry
        .list_messages(&author, ticket.id)
        .await
        .unwrap()
        .into_iter()
        .map(|view| (view.message.sender_role, view.message.text))
        .collect();

    assert_eq!(
        trail,
        vec![
            (
                SenderRole::System,
                SystemNotice::StatusChanged {
                    from: TicketStatus::New,
                    to: TicketStatus::InProgress
                }
                .text()
            ),
            (SenderRole::Support, "Please check now".to_string()),
            (
                SenderRole::System,
                SystemNotice::StatusChanged {
                    from: TicketStatus::InProgress,
                    to: TicketStatus::BizReview
                }
                .text()
            ),
            (SenderRole::System, "── Обращение закрыто".to_string()),
            (SenderRole::System, "── Обращение переоткрыто".to_string()),
            (
                SenderRole::System,
                SystemNotice::StatusChanged {
                    from: TicketStatus::Reopened,
                    to: TicketStatus::InProgress
                }
                .text()
            ),
        ]
    );
}

#[tokio::test]
async fn second_assignment_is_refused() {
    let desk = TestHelpdesk::new();
    let author = desk.sign_in(100, "Olga").await;
    let support = desk.support().await;
    let admin = desk.admin().await;

    let ticket = desk.registry.create(&author, draft("Chair")).await.unwrap();
    desk.registry.assign(&support, ticket.id).await.unwrap();

    let again = desk.registry.assign(&admin, ticket.id).await;
    assert_eq!(again.unwrap_err(), TicketError::AlreadyAssigned);

    let stored = desk.registry.get(&admin, ticket.id).await.unwrap();
    assert_eq!(stored.assignee_id, Some(support.id));
}

#[tokio::test]
async fn concurrent_assignments_have_one_winner() {
    let desk = TestHelpdesk::new();
    let author = desk.sign_in(100, "Olga").await;
    let support = desk.support().await;
    let admin = desk.admin().await;
    let ticket = desk.registry.create(&author, draft("Race")).await.unwrap();

    let (a, b) = tokio::join!(
        desk.registry.assign(&support, ticket.id),
        desk.registry.assign(&admin, ticket.id)
    );
    let winners = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(winners, 1);

    let messages = desk.registry.list_messages(&admin, ticket.id).await.unwrap();
    assert_eq!(messages.len(), 1);
}

#[tokio::test]
async fn authors_see_only_their_own_tickets() {
    let desk = TestHelpdesk::new();
    let olga = desk.sign_in(100, "Olga").await;
    let ivan = desk.sign_in(101, "Ivan").await;
    let support = desk.support().await;

    let own = desk.registry.create(&olga, draft("Mine")).await.unwrap();
    let other = desk.registry.create(&ivan, draft("Theirs")).await.unwrap();

    let listed = desk
        .registry
        .list(&olga, ListMode::Mine, None)
        .await
        .unwrap();
    assert_eq!(listed.iter().map(|t| t.id).collect::<Vec<_>>(), vec![own.id]);

    assert!(matches!(
        desk.registry.list(&olga, ListMode::All, None).await,
        Err(TicketError::Forbidden(_))
    ));
    assert!(matches!(
        desk.registry.get(&olga, other.id).await,
        Err(TicketError::Forbidden(_))
    ));
    assert!(desk.registry.get(&support, other.id).await.is_ok());
}

#[tokio::test]
async fn listing_puts_recent_activity_first() {
    let desk = TestHelpdesk::new();
    let author = desk.sign_in(100, "Olga").await;
    let support = desk.support().await;

    let older = desk.registry.create(&author, draft("Older")).await.unwrap();
    let newer = desk.registry.create(&author, draft("Newer")).await.unwrap();

    let listed = desk
        .registry
        .list(&support, ListMode::All, None)
        .await
        .unwrap();
    assert_eq!(
        listed.iter().map(|t| t.id).collect::<Vec<_>>(),
        vec![newer.id, older.id]
    );

    desk.registry
        .send_message(&author, older.id, "bump".into(), None)
        .await
        .unwrap();
    let listed = desk
        .registry
        .list(&support, ListMode::All, None)
        .await
        .unwrap();
    assert_eq!(
        listed.iter().map(|t| t.id).collect::<Vec<_>>(),
        vec![older.id, newer.id]
    );
}

#[tokio::test]
async fn closed_and_urgent_filters() {
    let desk = TestHelpdesk::new();
    let author = desk.sign_in(100, "Olga").await;
    let support = desk.support().await;

    let calm = desk.registry.create(&author, draft("Calm")).await.unwrap();
    let burning = desk.registry.create(&author, draft("Burning")).await.unwrap();
    desk.registry
        .set_urgent(&author, burning.id, true)
        .await
        .unwrap();

    desk.registry.assign(&support, calm.id).await.unwrap();
    desk.registry
        .change_status(&support, calm.id, TicketStatus::Closed)
        .await
        .unwrap();

    let closed = desk
        .registry
        .list(&author, ListMode::Closed, None)
        .await
        .unwrap();
    assert_eq!(closed.iter().map(|t| t.id).collect::<Vec<_>>(), vec![calm.id]);

    let urgent = desk
        .registry
        .list(&support, ListMode::All, Some(true))
        .await
        .unwrap();
    assert_eq!(urgent.iter().map(|t| t.id).collect::<Vec<_>>(), vec![burning.id]);
}

#[tokio::test]
async fn edits_stop_once_work_starts() {
    let desk = TestHelpdesk::new();
    let author = desk.sign_in(100, "Olga").await;
    let support = desk.support().await;
    let ticket = desk.registry.create(&author, draft("Typo")).await.unwrap();

    let edited = desk
        .registry
        .edit(
            &author,
            ticket.id,
            TicketPatch {
                title: Some("Fixed title".into()),
                ..TicketPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(edited.title, "Fixed title");
    assert!(edited.updated_at > ticket.updated_at);

    desk.registry.assign(&support, ticket.id).await.unwrap();
    let refused = desk
        .registry
        .edit(
            &author,
            ticket.id,
            TicketPatch {
                title: Some("Too late".into()),
                ..TicketPatch::default()
            },
        )
        .await;
    assert!(matches!(refused, Err(TicketError::Forbidden(_))));
}

#[tokio::test]
async fn unknown_ticket_is_not_found() {
    let desk = TestHelpdesk::new();
    let support = desk.support().await;

    let missing = TicketId(404);
    assert!(matches!(
        desk.registry.get(&support, missing).await,
        Err(TicketError::NotFound { .. })
    ));
    assert!(matches!(
        desk.registry
            .change_status(&support, missing, TicketStatus::OnPause)
            .await,
        Err(TicketError::NotFound { .. })
    ));
}

#[tokio::test]
async fn views_resolve_people() {
    let desk = TestHelpdesk::new();
    let author = desk.sign_in(100, "Olga").await;
    let support = desk.support().await;
    let ticket = desk.registry.create(&author, draft("View")).await.unwrap();
    let ticket = desk.registry.assign(&support, ticket.id).await.unwrap();

    let view = desk.registry.ticket_view(ticket).await.unwrap();
    assert_eq!(view.author.unwrap().display_name, "Olga");
    assert_eq!(view.assignee.unwrap().display_name, "Support");
    assert!(view.files.is_empty());
}
