use palace_core::{
    AnchorInfo, Connection, Element, ElementKind, PalaceService, PalaceServiceError,
    PalaceSnapshot, Point, QuizService, QuizSession, Rating, Size, SqlitePalaceRepository,
};
use uuid::Uuid;

fn anchor(x: f64) -> Element {
    Element::new(ElementKind::Anchor, 1, Point::new(x, 10.0), Size::square(20.0))
}

#[test]
fn deck_from_storage_follows_connections_with_defaults() {
    let conn = palace_core::open_db_in_memory().unwrap();
    let palaces = PalaceService::new(SqlitePalaceRepository::try_new(&conn).unwrap());
    let quiz = QuizService::new(SqlitePalaceRepository::try_new(&conn).unwrap());

    let hall = Element::new(ElementKind::Room, 1, Point::new(300.0, 0.0), Size::new(400.0, 100.0));
    let (c, a, b) = (anchor(200.0), anchor(0.0), anchor(100.0));
    let a = a.within(hall.id);

    let mut snapshot = PalaceSnapshot::named("Route");
    snapshot.push_element(hall.clone());
    for element in [c.clone(), a.clone(), b.clone()] {
        snapshot.push_element(element);
    }
    snapshot.connections.push(Connection::new(a.id, b.id));
    snapshot.connections.push(Connection::new(b.id, c.id));
    snapshot.infos.push(AnchorInfo::new(a.id, "Gate", "Hydrogen"));
    snapshot.infos.push(AnchorInfo::new(b.id, "Well", ""));
    let saved = palaces.save_palace("u1", &snapshot).unwrap();

    let deck = quiz.quiz_deck("u1", saved.palace.palace_uuid).unwrap();

    let ids: Vec<_> = deck.iter().map(|card| card.anchor_id).collect();
    assert_eq!(ids, vec![a.id, b.id, c.id]);
    assert_eq!(deck[0].title, "Gate");
    assert_eq!(deck[0].material, "Hydrogen");
    assert_eq!(deck[0].display_hint.position, Point::new(300.0, 10.0));
    assert_eq!(deck[0].display_hint.room, Some(hall.id));
    assert_eq!(deck[1].title, "Well");
    assert_eq!(deck[1].material, "No material yet");
    assert_eq!(deck[2].title, "Untitled anchor");
    assert_eq!(deck[2].display_hint.room, None);
}

#[test]
fn deck_of_foreign_or_missing_palace_is_not_found() {
    let conn = palace_core::open_db_in_memory().unwrap();
    let palaces = PalaceService::new(SqlitePalaceRepository::try_new(&conn).unwrap());
    let quiz = QuizService::new(SqlitePalaceRepository::try_new(&conn).unwrap());
    let saved = palaces
        .save_palace("u1", &PalaceSnapshot::named("Route"))
        .unwrap();

    assert!(matches!(
        quiz.quiz_deck("u2", saved.palace.palace_uuid),
        Err(PalaceServiceError::PalaceNotFound(_))
    ));
    assert!(matches!(
        quiz.quiz_deck("u1", Uuid::new_v4()),
        Err(PalaceServiceError::PalaceNotFound(_))
    ));
    assert!(quiz
        .quiz_deck("u1", saved.palace.palace_uuid)
        .unwrap()
        .is_empty());
}

#[test]
fn session_runs_until_every_card_is_retired() {
    let conn = palace_core::open_db_in_memory().unwrap();
    let palaces = PalaceService::new(SqlitePalaceRepository::try_new(&conn).unwrap());
    let quiz = QuizService::new(SqlitePalaceRepository::try_new(&conn).unwrap());
    let (first, second) = (anchor(0.0), anchor(100.0));
    let mut snapshot = PalaceSnapshot::named("Route");
    snapshot.push_element(first.clone());
    snapshot.push_element(second.clone());
    snapshot.connections.push(Connection::new(first.id, second.id));
    let saved = palaces.save_palace("u1", &snapshot).unwrap();

    let mut session = QuizSession::new(quiz.quiz_deck("u1", saved.palace.palace_uuid).unwrap());
    assert_eq!(session.deck_len(), 2);

    let mut shown = Vec::new();
    for rating in [Rating::Again, Rating::Good, Rating::Hard, Rating::Easy] {
        let entry = session.current().unwrap();
        shown.push((entry.card.anchor_id, entry.is_retry));
        assert!(session.rate(rating));
    }

    assert_eq!(
        shown,
        vec![
            (first.id, false),
            (second.id, false),
            (first.id, true),
            (first.id, true),
        ]
    );
    assert!(session.is_complete());
    assert!(session.current().is_none());
    assert_eq!(session.retired(), 2);
}
