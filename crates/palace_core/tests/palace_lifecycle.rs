use palace_core::{
    AnchorInfo, Connection, Element, ElementKind, PalaceService, PalaceServiceError,
    PalaceSnapshot, Point, Size, SqlitePalaceRepository, SteppingClock,
};
use rusqlite::Connection as SqliteConnection;
use uuid::Uuid;

fn setup() -> SqliteConnection {
    palace_core::open_db_in_memory().unwrap()
}

fn service(conn: &SqliteConnection) -> PalaceService<SqlitePalaceRepository<'_>, SteppingClock> {
    PalaceService::with_clock(
        SqlitePalaceRepository::try_new(conn).unwrap(),
        SteppingClock::starting_at(10_000, 100),
    )
}

fn room_at(x: f64, y: f64) -> Element {
    Element::new(ElementKind::Room, 1, Point::new(x, y), Size::new(100.0, 100.0))
}

fn element_rows(conn: &SqliteConnection) -> i64 {
    conn.query_row(
        "SELECT (SELECT COUNT(*) FROM palace_rooms)
              + (SELECT COUNT(*) FROM palace_objects)
              + (SELECT COUNT(*) FROM palace_anchors);",
        [],
        |row| row.get(0),
    )
    .unwrap()
}

#[test]
fn palaces_are_listed_newest_first() {
    let conn = setup();
    let service = service(&conn);

    let older = service
        .save_palace("u1", &PalaceSnapshot::named("Childhood home"))
        .unwrap();
    let newer = service
        .save_palace("u1", &PalaceSnapshot::named("Office"))
        .unwrap();

    let names: Vec<String> = service
        .list_palaces("u1")
        .unwrap()
        .into_iter()
        .map(|palace| palace.name)
        .collect();
    assert_eq!(names, vec!["Office", "Childhood home"]);
    assert!(newer.palace.created_at > older.palace.created_at);
}

#[test]
fn palace_names_are_normalized_for_lookup() {
    let conn = setup();
    let service = service(&conn);

    let saved = service
        .save_palace("u1", &PalaceSnapshot::named("  Grand \t Hall  "))
        .unwrap();

    assert_eq!(saved.palace.name, "Grand Hall");
    assert!(service.palace_exists("u1", "Grand   Hall").unwrap());
    assert!(!service.palace_exists("u1", "Grand Hall 2").unwrap());

    let again = service
        .save_palace("u1", &PalaceSnapshot::named("Grand Hall"))
        .unwrap();
    assert!(!again.created);
    assert_eq!(again.palace.palace_uuid, saved.palace.palace_uuid);
}

#[test]
fn blank_name_and_owner_are_rejected() {
    let conn = setup();
    let service = service(&conn);

    assert!(matches!(
        service.save_palace("u1", &PalaceSnapshot::named(" \n ")),
        Err(PalaceServiceError::InvalidName)
    ));
    assert!(matches!(
        service.save_palace("   ", &PalaceSnapshot::named("Home")),
        Err(PalaceServiceError::InvalidOwner)
    ));
    assert!(service.list_palaces("u1").unwrap().is_empty());
}

#[test]
fn deleted_palace_is_gone_and_name_is_reusable() {
    let conn = setup();
    let service = service(&conn);
    let mut snapshot = PalaceSnapshot::named("Home");
    snapshot.push_element(room_at(0.0, 0.0));
    let saved = service.save_palace("u1", &snapshot).unwrap();
    let palace_uuid = saved.palace.palace_uuid;

    service.delete_palace("u1", palace_uuid).unwrap();

    assert!(matches!(
        service.load_palace("u1", palace_uuid),
        Err(PalaceServiceError::PalaceNotFound(id)) if id == palace_uuid
    ));
    assert!(matches!(
        service.delete_palace("u1", palace_uuid),
        Err(PalaceServiceError::PalaceNotFound(_))
    ));
    assert!(!service.palace_exists("u1", "Home").unwrap());

    let recreated = service.save_palace("u1", &snapshot).unwrap();
    assert!(recreated.created);
    assert_ne!(recreated.palace.palace_uuid, palace_uuid);
}

#[test]
fn other_owners_cannot_see_or_touch_a_palace() {
    let conn = setup();
    let service = service(&conn);
    let saved = service
        .save_palace("u1", &PalaceSnapshot::named("Home"))
        .unwrap();
    let palace_uuid = saved.palace.palace_uuid;

    assert!(service.list_palaces("u2").unwrap().is_empty());
    assert!(!service.palace_exists("u2", "Home").unwrap());
    assert!(matches!(
        service.load_palace("u2", palace_uuid),
        Err(PalaceServiceError::PalaceNotFound(_))
    ));
    assert!(matches!(
        service.delete_palace("u2", palace_uuid),
        Err(PalaceServiceError::PalaceNotFound(_))
    ));
    assert!(service.load_palace("u1", palace_uuid).is_ok());
}

#[test]
fn unknown_palace_is_not_found() {
    let conn = setup();
    let service = service(&conn);
    let missing = Uuid::new_v4();

    assert!(matches!(
        service.load_palace("u1", missing),
        Err(PalaceServiceError::PalaceNotFound(id)) if id == missing
    ));
    assert!(matches!(
        service.element_history("u1", missing, ElementKind::Room, Uuid::new_v4()),
        Err(PalaceServiceError::PalaceNotFound(_))
    ));
}

#[test]
fn overlapping_rooms_reject_the_whole_save() {
    let conn = setup();
    let service = service(&conn);
    let mut snapshot = PalaceSnapshot::named("Home");
    snapshot.push_element(room_at(0.0, 0.0));
    snapshot.push_element(room_at(50.0, 50.0));

    let result = service.save_palace("u1", &snapshot);

    assert!(matches!(
        result,
        Err(PalaceServiceError::OverlappingRooms { .. })
    ));
    assert!(service.list_palaces("u1").unwrap().is_empty());
    assert_eq!(element_rows(&conn), 0);
}

#[test]
fn cyclic_containment_rejects_the_whole_save() {
    let conn = setup();
    let service = service(&conn);
    let first_id = Uuid::new_v4();
    let second_id = Uuid::new_v4();
    let mut snapshot = PalaceSnapshot::named("Home");
    snapshot.push_element(
        Element::with_id(
            first_id,
            ElementKind::Object,
            1,
            Point::new(0.0, 0.0),
            Size::square(40.0),
        )
        .within(second_id),
    );
    snapshot.push_element(
        Element::with_id(
            second_id,
            ElementKind::Object,
            1,
            Point::new(0.0, 0.0),
            Size::square(40.0),
        )
        .within(first_id),
    );

    assert!(matches!(
        service.save_palace("u1", &snapshot),
        Err(PalaceServiceError::CyclicContainment(_))
    ));
    assert_eq!(element_rows(&conn), 0);
}

#[test]
fn dangling_references_are_pruned_before_storage() {
    let conn = setup();
    let service = service(&conn);
    let room = room_at(0.0, 0.0);
    let anchor = Element::new(ElementKind::Anchor, 1, Point::new(5.0, 5.0), Size::square(32.0))
        .within(room.id);
    let orphan = Element::new(ElementKind::Anchor, 1, Point::new(5.0, 5.0), Size::square(32.0))
        .within(Uuid::new_v4());
    let ghost = Uuid::new_v4();

    let mut snapshot = PalaceSnapshot::named("Home");
    snapshot.push_element(room);
    snapshot.push_element(anchor.clone());
    snapshot.push_element(orphan.clone());
    snapshot.connections.push(Connection::new(anchor.id, ghost));
    snapshot.connections.push(Connection::new(anchor.id, anchor.id));
    snapshot.infos.push(AnchorInfo::new(ghost, "Lost", "nowhere"));
    snapshot.infos.push(AnchorInfo::new(anchor.id, "Door", "Knock twice"));

    let outcome = service.save_palace("u1", &snapshot).unwrap();

    assert_eq!(outcome.pruned.elements, vec![orphan.id]);
    assert_eq!(outcome.pruned.connections, 2);
    assert_eq!(outcome.pruned.infos, 1);

    let loaded = service
        .load_palace("u1", outcome.palace.palace_uuid)
        .unwrap();
    assert_eq!(loaded.contents.anchors, vec![anchor.clone()]);
    assert!(loaded.contents.connections.is_empty());
    assert_eq!(
        loaded.info_for(anchor.id).map(|info| info.title.as_str()),
        Some("Door")
    );
}

#[test]
fn load_returns_saved_contents_in_insertion_order() {
    let conn = setup();
    let service = service(&conn);
    let room = room_at(0.0, 0.0);
    let desk = Element::new(ElementKind::Object, 3, Point::new(10.0, 10.0), Size::square(40.0))
        .within(room.id);
    let first = Element::new(ElementKind::Anchor, 1, Point::new(2.0, 2.0), Size::square(16.0))
        .within(desk.id);
    let second = Element::new(ElementKind::Anchor, 2, Point::new(200.0, 0.0), Size::square(16.0));

    let mut snapshot = PalaceSnapshot::named("Home");
    for element in [room, desk, first.clone(), second.clone()] {
        snapshot.push_element(element);
    }
    snapshot.connections.push(Connection::new(first.id, second.id));
    snapshot.infos.push(AnchorInfo::new(second.id, "Lamp", "Light"));

    let saved = service.save_palace("u1", &snapshot).unwrap();
    let loaded = service
        .load_palace("u1", saved.palace.palace_uuid)
        .unwrap();

    assert_eq!(loaded.contents, snapshot);
    let joined: Vec<bool> = loaded
        .anchors_with_info()
        .map(|(_, info)| info.is_some())
        .collect();
    assert_eq!(joined, vec![false, true]);
}
