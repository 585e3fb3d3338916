use palace_core::{linearize, Connection, Element, ElementKind, Point, Size};
use uuid::Uuid;

fn ids(count: usize) -> Vec<Uuid> {
    (0..count).map(|_| Uuid::new_v4()).collect()
}

fn assert_permutation(input: &[Uuid], output: &[Uuid]) {
    let mut left = input.to_vec();
    let mut right = output.to_vec();
    left.sort();
    right.sort();
    assert_eq!(left, right);
}

#[test]
fn chain_is_followed_regardless_of_input_order() {
    let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let edges = [Connection::new(a, b), Connection::new(b, c)];

    assert_eq!(linearize(vec![c, a, b], &edges), vec![a, b, c]);
}

#[test]
fn unconnected_anchor_listed_first_starts_the_walk() {
    let (lone, a, b) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    let ordered = linearize(vec![lone, b, a], &[Connection::new(a, b)]);

    assert_eq!(ordered, vec![lone, b, a]);
}

#[test]
fn destinations_listed_first_are_skipped_when_choosing_start() {
    let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let edges = [Connection::new(a, b), Connection::new(b, c)];

    assert_eq!(linearize(vec![b, c, a], &edges), vec![a, b, c]);
}

#[test]
fn later_edge_from_same_source_wins() {
    let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let edges = [Connection::new(a, b), Connection::new(a, c)];

    assert_eq!(linearize(vec![a, b, c], &edges), vec![a, c, b]);
}

#[test]
fn no_connections_keeps_input_order() {
    let anchors = ids(5);
    assert_eq!(linearize(anchors.clone(), &[]), anchors);
}

#[test]
fn full_cycle_starts_at_first_anchor() {
    let anchors = ids(3);
    let edges = [
        Connection::new(anchors[1], anchors[2]),
        Connection::new(anchors[2], anchors[0]),
        Connection::new(anchors[0], anchors[1]),
    ];

    assert_eq!(linearize(anchors.clone(), &edges), anchors);
}

#[test]
fn disconnected_chains_append_unvisited_in_input_order() {
    let anchors = ids(5);
    let edges = [
        Connection::new(anchors[3], anchors[4]),
        Connection::new(anchors[0], anchors[1]),
    ];

    let ordered = linearize(anchors.clone(), &edges);

    assert_eq!(
        ordered,
        vec![anchors[0], anchors[1], anchors[2], anchors[3], anchors[4]]
    );
}

#[test]
fn dangling_and_branching_edges_never_drop_anchors() {
    let anchors = ids(6);
    let ghost = Uuid::new_v4();
    let edges = [
        Connection::new(anchors[0], ghost),
        Connection::new(anchors[1], anchors[2]),
        Connection::new(anchors[1], anchors[3]),
        Connection::new(anchors[2], anchors[1]),
        Connection::new(anchors[4], anchors[4]),
        Connection::new(ghost, anchors[5]),
    ];

    let ordered = linearize(anchors.clone(), &edges);

    assert_permutation(&anchors, &ordered);
    assert_eq!(ordered[0], anchors[0]);
}

#[test]
fn permutation_holds_for_many_shuffled_graphs() {
    for seed in 0..25usize {
        let anchors = ids(8);
        let edges: Vec<Connection> = (0..8)
            .map(|index| {
                let from = anchors[(index * 3 + seed) % 8];
                let to = anchors[(index * 5 + seed * 7) % 8];
                Connection::new(from, to)
            })
            .collect();

        assert_permutation(&anchors, &linearize(anchors.clone(), &edges));
    }
}

#[test]
fn elements_are_ordered_by_their_ids() {
    let size = Size::square(32.0);
    let first = Element::new(ElementKind::Anchor, 1, Point::new(0.0, 0.0), size);
    let second = Element::new(ElementKind::Anchor, 1, Point::new(40.0, 0.0), size);
    let edges = [Connection::new(second.id, first.id)];

    let ordered = linearize(vec![first.clone(), second.clone()], &edges);

    assert_eq!(ordered, vec![second, first]);
}
