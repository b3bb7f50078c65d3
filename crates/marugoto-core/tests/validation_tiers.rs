//! # Validation Tier Tests (T0-T5)
//!
//! If ANY tier fails, the codec is INVALID.
//!
//! ## Tiers
//! - T0: Graph Consistency
//! - T1: Round Trip
//! - T2: Single Emission & Cycles
//! - T3: Order Independence & Determinism
//! - T4: Decode Failures
//! - T5: Game Scenarios

use chrono::{Duration, TimeZone, Utc};
use marugoto_core::{
    Follow, Graph, IdStrategy, MarugotoError, NodeId, NodeKind, Payload, decode, encode,
    encode_roots, identity_equal, structurally_equal, walk,
};

// =============================================================================
// FIXTURES
// =============================================================================

/// The reference game.
///
/// ```text
///               start  (offers the dialog)
///               /   \
///             w1     w2
///               \   /
///               knot   <- tasks t1, t2, t3
///
///          w3   w4   w5
///            \  |
///             end      <- reached from the dialog
/// ```
struct Fixture {
    graph: Graph,
    game: NodeId,
    dialog: NodeId,
    start: NodeId,
    knot: NodeId,
    end: NodeId,
    dialog_start: NodeId,
    d1: NodeId,
    td1: NodeId,
}

fn fixture() -> Fixture {
    let mut graph = Graph::with_strategy(IdStrategy::Sequential);

    let dialog = graph.create_dialog();
    let dialog_start = graph.create_mail(dialog, "start sub", "start body").expect("mail");
    let m1 = graph.create_mail(dialog, "second sub", "second body").expect("mail");
    let td1 = graph.create_task("some task 1", "some task", Some("some solution"));
    let d1 = graph.create_speech(dialog, "content").expect("speech");

    let game = graph.create_game("test");
    let start = graph.create_waypoint(game, "start").expect("start");
    let w1 = graph.create_waypoint(game, "w1").expect("w1");
    let w2 = graph.create_waypoint(game, "w2").expect("w2");
    let knot = graph.create_waypoint(game, "knot").expect("knot");
    let w3 = graph.create_waypoint(game, "w3").expect("w3");
    let w4 = graph.create_waypoint(game, "w4").expect("w4");
    graph.create_waypoint(game, "w5").expect("w5");
    let end = graph.create_waypoint(game, "end").expect("end");
    let t1 = graph.create_task("some task 1", "some task", None);
    let t2 = graph.create_task("some task 2", "some task", None);
    let t3 = graph.create_task("some task 3", "some task", None);

    graph.add_destination(start, w1, Some(1.1)).expect("edge");
    graph.add_destination(start, w2, None).expect("edge");
    graph.add_destination(w1, knot, None).expect("edge");
    graph.add_destination(w2, knot, None).expect("edge");
    for task in [t1, t2, t3] {
        graph.add_task(knot, task).expect("task");
    }
    graph.add_destination(w3, end, None).expect("edge");
    graph.add_destination(w4, end, None).expect("edge");
    graph.set_start(game, start).expect("game start");

    let dialog_end = graph.create_speech(dialog, "next content").expect("speech");
    graph.set_destination(dialog_end, end).expect("destination");
    graph.set_start(dialog, dialog_start).expect("dialog start");
    graph.add_follow_up(dialog_start, d1, Some(td1)).expect("follow up");
    graph.add_follow_up(dialog_start, m1, None).expect("follow up");
    graph.offer_at(dialog_start, start).expect("offer");
    graph.add_follow_up(d1, dialog_end, None).expect("follow up");

    let npc = graph.create_npc("bob", "test", dialog).expect("npc");
    graph.add_non_playable_character(game, npc).expect("cast");

    Fixture {
        graph,
        game,
        dialog,
        start,
        knot,
        end,
        dialog_start,
        d1,
        td1,
    }
}

fn round_trip(graph: &Graph, root: NodeId) -> marugoto_core::Decoded {
    let payload = encode(graph, Some(root)).expect("encode");
    decode(&payload).expect("decode").expect("root present")
}

// =============================================================================
// TIER T0: GRAPH CONSISTENCY
// =============================================================================

mod t0_graph_consistency {
    use super::*;

    /// T0.1: The reference game is consistent.
    #[test]
    fn fixture_is_consistent() {
        let f = fixture();
        assert!(f.graph.check_consistency().is_ok());
    }

    /// T0.2: Destinations never cross games.
    #[test]
    fn destination_across_games_rejected() {
        let mut f = fixture();
        let other = f.graph.create_game("other");
        let foreign = f.graph.create_waypoint(other, "foreign").expect("foreign");
        let before = f.graph.waypoint(f.start).expect("start").clone();

        let result = f.graph.add_destination(f.start, foreign, None);
        assert!(matches!(result, Err(MarugotoError::GraphConsistency(_))));
        assert_eq!(f.graph.waypoint(f.start).expect("start"), &before);
    }

    /// T0.3: Follow-ups never cross dialogs.
    #[test]
    fn follow_up_across_dialogs_rejected() {
        let mut f = fixture();
        let other = f.graph.create_dialog();
        let stranger = f.graph.create_speech(other, "hi").expect("speech");
        let result = f.graph.add_follow_up(f.dialog_start, stranger, None);
        assert!(matches!(result, Err(MarugotoError::GraphConsistency(_))));
    }

    /// T0.4: A start node must belong to its container.
    #[test]
    fn foreign_start_rejected() {
        let mut f = fixture();
        let result = f.graph.set_start(f.game, f.d1);
        assert!(result.is_err());
        let result = f.graph.set_start(f.dialog, f.start);
        assert!(result.is_err());
    }

    /// T0.5: Weak back-references are not ownership.
    #[test]
    fn strong_walk_from_dialog_skips_offering_waypoint() {
        let f = fixture();
        let strong = walk(&f.graph, &[f.dialog], Follow::Strong).expect("walk");
        let all = walk(&f.graph, &[f.dialog], Follow::All).expect("walk");
        assert!(all.contains(&f.start));
        assert!(!strong.contains(&f.start));
        assert!(strong.contains(&f.end));
    }
}

// =============================================================================
// TIER T1: ROUND TRIP
// =============================================================================

mod t1_round_trip {
    use super::*;

    /// T1.1: Every node of the reference game survives a round trip from itself.
    #[test]
    fn every_root_kind_round_trips() {
        let f = fixture();
        for (id, _) in f.graph.nodes() {
            let decoded = round_trip(&f.graph, id);
            assert!(
                structurally_equal(&f.graph, id, &decoded.graph, decoded.root).expect("compare"),
                "kind {}",
                f.graph.kind(id).expect("kind")
            );
            assert!(identity_equal(&f.graph, id, &decoded.graph, decoded.root).expect("compare"));
        }
    }

    /// T1.2: A play-through with players and progression round trips.
    #[test]
    fn instance_round_trips() {
        let mut f = fixture();
        let host = f.graph.create_player("game@master.com", "");
        let player = f.graph.create_player("test@player.com", "Test");
        let now = Utc::now();
        let instance = f
            .graph
            .start_new_instance(f.game, "ours", host, now - Duration::days(1), now + Duration::days(1))
            .expect("instance");
        f.graph.add_player(instance, player, "pseudonym", "one").expect("join");
        f.graph.complete_task(instance, player, f.td1).expect("complete");

        let decoded = round_trip(&f.graph, instance);
        assert!(structurally_equal(&f.graph, instance, &decoded.graph, decoded.root).expect("compare"));
        let loaded = decoded.graph.game_instance(decoded.root).expect("instance");
        assert_eq!(loaded.start, now - Duration::days(1));
        assert_eq!(loaded.player_states.len(), 1);
    }

    /// T1.3: Timestamps keep sub-second precision.
    #[test]
    fn instance_window_exact() {
        let mut graph = Graph::new();
        let game = graph.create_game("g");
        let host = graph.create_player("h@x", "");
        let start = Utc
            .with_ymd_and_hms(2024, 2, 29, 23, 59, 59)
            .single()
            .expect("date")
            + Duration::nanoseconds(123_456_789);
        let instance = graph
            .start_new_instance(game, "leap", host, start, start + Duration::milliseconds(1))
            .expect("instance");
        let decoded = round_trip(&graph, instance);
        let loaded = decoded.graph.game_instance(decoded.root).expect("instance");
        assert_eq!(loaded.start, start);
    }

    /// T1.4: Several roots share one payload.
    #[test]
    fn multiple_roots_share_records() {
        let f = fixture();
        let payload = encode_roots(&f.graph, &[f.knot, f.start]).expect("encode");
        let decoded = decode(&payload).expect("decode").expect("roots");
        assert_eq!(decoded.roots.len(), 2);
        assert_eq!(decoded.root, decoded.roots[0]);
        for (original, copy) in [f.knot, f.start].into_iter().zip(&decoded.roots) {
            assert!(structurally_equal(&f.graph, original, &decoded.graph, *copy).expect("compare"));
        }
    }

    /// T1.5: A JSON round trip changes nothing.
    #[test]
    fn json_round_trip() {
        let f = fixture();
        let payload = encode(&f.graph, Some(f.game)).expect("encode");
        let text = payload.to_json_pretty().expect("json");
        let parsed = Payload::from_json(&text).expect("parse");
        assert_eq!(parsed, payload);
    }

    /// T1.6: No root, no graph.
    #[test]
    fn absent_root_round_trips_to_none() {
        let f = fixture();
        let payload = encode(&f.graph, None).expect("encode");
        assert!(payload.is_empty());
        assert!(decode(&payload).expect("decode").is_none());
    }
}

// =============================================================================
// TIER T2: SINGLE EMISSION & CYCLES
// =============================================================================

mod t2_single_emission {
    use super::*;
    use std::collections::BTreeSet;

    /// T2.1: One record per distinct reachable node.
    #[test]
    fn distinct_identity_count_matches_reachable_nodes() {
        let f = fixture();
        let payload = encode(&f.graph, Some(f.game)).expect("encode");
        let reachable = walk(&f.graph, &[f.game], Follow::All).expect("walk");
        let ids: BTreeSet<_> = payload.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids.len(), payload.len());
        assert_eq!(payload.len(), reachable.len());
    }

    /// T2.2: A waypoint cycle survives by identity.
    #[test]
    fn cycle_preserved() {
        let mut graph = Graph::new();
        let game = graph.create_game("g");
        let a = graph.create_waypoint(game, "a").expect("a");
        let b = graph.create_waypoint(game, "b").expect("b");
        graph.add_destination(a, b, None).expect("a->b");
        graph.add_destination(b, a, None).expect("b->a");

        let decoded = round_trip(&graph, a);
        let g = &decoded.graph;
        let b2 = g.waypoint(decoded.root).expect("a").destinations[0].target;
        let a2 = g.waypoint(b2).expect("b").destinations[0].target;
        assert_eq!(a2, decoded.root);
        assert_eq!(g.len(), 2);
    }

    /// T2.3: Deep chains neither recurse nor repeat.
    #[test]
    fn deep_chain_round_trips() {
        let mut graph = Graph::new();
        let game = graph.create_game("deep");
        let first = graph.create_waypoint(game, "0").expect("first");
        let mut previous = first;
        for i in 1..20_000 {
            let next = graph.create_waypoint(game, i.to_string()).expect("next");
            graph.add_destination(previous, next, None).expect("edge");
            previous = next;
        }
        graph.add_destination(previous, first, None).expect("close");

        let decoded = round_trip(&graph, first);
        assert_eq!(decoded.graph.len(), 20_000);
        assert!(structurally_equal(&graph, first, &decoded.graph, decoded.root).expect("compare"));
    }

    /// T2.4: A node following up on itself.
    #[test]
    fn self_follow_up() {
        let mut graph = Graph::new();
        let dialog = graph.create_dialog();
        let again = graph.create_speech(dialog, "again?").expect("speech");
        graph.add_follow_up(again, again, None).expect("self");
        graph.set_start(dialog, again).expect("start");

        let decoded = round_trip(&graph, dialog);
        let start = decoded.graph.dialog(decoded.root).expect("dialog").start.expect("start");
        let (_, links) = decoded.graph.dialog_node(start).expect("node");
        assert_eq!(links.follow_ups[0].target, start);
    }
}

// =============================================================================
// TIER T3: ORDER INDEPENDENCE & DETERMINISM
// =============================================================================

mod t3_order_and_determinism {
    use super::*;

    /// T3.1: Record order does not matter.
    #[test]
    fn shuffled_records_decode_identically() {
        let f = fixture();
        let payload = encode(&f.graph, Some(f.game)).expect("encode");
        let mut reversed = payload.clone();
        reversed.records.reverse();
        let mut rotated = payload.clone();
        rotated.records.rotate_left(payload.len() / 2);

        for shuffled in [reversed, rotated] {
            let decoded = decode(&shuffled).expect("decode").expect("root");
            assert!(structurally_equal(&f.graph, f.game, &decoded.graph, decoded.root).expect("compare"));
        }
    }

    /// T3.2: Same graph, same roots, same bytes.
    #[test]
    fn encoding_twice_is_byte_identical() {
        let f = fixture();
        let first = encode(&f.graph, Some(f.game)).expect("encode").to_json().expect("json");
        let second = encode(&f.graph, Some(f.game)).expect("encode").to_json().expect("json");
        assert_eq!(first, second);
    }

    /// T3.3: A decoded graph re-encodes to the same bytes.
    #[test]
    fn decoded_graph_reencodes_identically() {
        let f = fixture();
        let payload = encode(&f.graph, Some(f.game)).expect("encode");
        let decoded = decode(&payload).expect("decode").expect("root");
        let again = encode(&decoded.graph, Some(decoded.root)).expect("encode");
        assert_eq!(again.to_json().expect("json"), payload.to_json().expect("json"));
    }

    /// T3.4: Sequential identities make whole payloads reproducible.
    #[test]
    fn sequential_fixture_reproducible() {
        let first = fixture();
        let second = fixture();
        let a = encode(&first.graph, Some(first.game)).expect("encode").to_json().expect("json");
        let b = encode(&second.graph, Some(second.game)).expect("encode").to_json().expect("json");
        assert_eq!(a, b);
    }
}

// =============================================================================
// TIER T4: DECODE FAILURES
// =============================================================================

mod t4_decode_failures {
    use super::*;
    use marugoto_core::{Field, Item, Record, Reference, Scalar};

    /// T4.1: A dangling reference fails the whole decode.
    #[test]
    fn missing_reference_fails() {
        let f = fixture();
        let mut payload = encode(&f.graph, Some(f.game)).expect("encode");
        let knot = f.graph.uid(f.knot).expect("uid").to_string();
        payload.records.retain(|record| record.id != knot);

        let result = decode(&payload);
        assert!(matches!(
            result,
            Err(MarugotoError::UnresolvedReference { target, .. }) if target == knot
        ));
    }

    /// T4.2: A reference to an id no record carries.
    #[test]
    fn unknown_reference_target_fails() {
        let f = fixture();
        let mut payload = encode(&f.graph, Some(f.end)).expect("encode");
        payload.records[0].fields.insert(
            "tasks".into(),
            Field::List(vec![Item::Ref(Reference::new("X"))]),
        );
        assert!(matches!(
            decode(&payload),
            Err(MarugotoError::UnresolvedReference { field, target, .. }) if field == "tasks" && target == "X"
        ));
    }

    /// T4.3: Unknown kinds indicate version skew.
    #[test]
    fn unknown_kind_fails() {
        let f = fixture();
        let mut payload = encode(&f.graph, Some(f.end)).expect("encode");
        payload.records[0].kind = "teleporter".into();
        assert!(matches!(decode(&payload), Err(MarugotoError::UnknownNodeKind(_))));
    }

    /// T4.4: Malformed scalars are schema violations.
    #[test]
    fn malformed_scalar_fails() {
        let f = fixture();
        let mut payload = encode(&f.graph, Some(f.end)).expect("encode");
        payload.records[0]
            .fields
            .insert("name".into(), Field::Scalar(Scalar::Bool(true)));
        assert!(matches!(decode(&payload), Err(MarugotoError::SchemaViolation { .. })));
    }

    /// T4.5: Decoded graphs obey the same membership rules as edits.
    #[test]
    fn inconsistent_payload_rejected() {
        let mut graph = Graph::new();
        let one = graph.create_game("one");
        let two = graph.create_game("two");
        let a = graph.create_waypoint(one, "a").expect("a");
        let b = graph.create_waypoint(two, "b").expect("b");
        let mut payload = encode_roots(&graph, &[a, b]).expect("encode");
        let b_id = graph.uid(b).expect("uid").to_string();
        payload.records[0].fields.insert(
            "destinations".into(),
            Field::List(vec![Item::Ref(Reference::new(b_id))]),
        );
        payload.records[0]
            .fields
            .insert("weights".into(), Field::List(vec![Item::Scalar(Scalar::Number(1.0))]));
        assert!(matches!(decode(&payload), Err(MarugotoError::GraphConsistency(_))));
    }

    /// T4.6: Oversized or foreign-version payloads are refused before decoding.
    #[test]
    fn unsupported_version_fails() {
        let f = fixture();
        let mut payload = encode(&f.graph, Some(f.end)).expect("encode");
        payload.version = 99;
        assert!(matches!(decode(&payload), Err(MarugotoError::SerializationError(_))));
    }

    fn record<'a>(payload: &'a mut Payload, graph: &Graph, node: NodeId) -> &'a mut Record {
        let id = graph.uid(node).expect("uid").to_string();
        payload
            .records
            .iter_mut()
            .find(|record| record.id == id)
            .expect("record present")
    }

    fn reference(graph: &Graph, node: NodeId) -> Field<Reference> {
        Field::Ref(Reference::new(graph.uid(node).expect("uid").to_string()))
    }

    fn bob(f: &Fixture) -> NodeId {
        f.graph.game(f.game).expect("game").characters[0]
    }

    /// T4.7: Two characters cannot share one dialog.
    #[test]
    fn shared_dialog_rejected() {
        let mut f = fixture();
        let dialog = f.graph.create_dialog();
        let eve = f.graph.create_npc("eve", "test", dialog).expect("npc");
        f.graph.add_non_playable_character(f.game, eve).expect("cast");
        assert!(f.graph.create_npc("mallory", "test", f.dialog).is_err());

        let mut payload = encode(&f.graph, Some(f.game)).expect("encode");
        let bobs_dialog = reference(&f.graph, f.dialog);
        record(&mut payload, &f.graph, eve).fields.insert("dialog".into(), bobs_dialog);
        assert!(matches!(decode(&payload), Err(MarugotoError::GraphConsistency(_))));
    }

    /// T4.8: Every character owns a dialog.
    #[test]
    fn character_without_dialog_rejected() {
        let f = fixture();
        let mut payload = encode(&f.graph, Some(f.game)).expect("encode");
        record(&mut payload, &f.graph, bob(&f))
            .fields
            .insert("dialog".into(), Field::Scalar(Scalar::Null));
        assert!(matches!(decode(&payload), Err(MarugotoError::GraphConsistency(_))));
    }

    /// T4.9: A character belongs to one game's cast.
    #[test]
    fn character_in_two_games_rejected() {
        let mut f = fixture();
        let other = f.graph.create_game("other");
        let bob = bob(&f);
        assert!(f.graph.add_non_playable_character(other, bob).is_err());

        let mut payload = encode_roots(&f.graph, &[f.game, other]).expect("encode");
        let cast = Field::List(vec![Item::Ref(Reference::new(
            f.graph.uid(bob).expect("uid").to_string(),
        ))]);
        record(&mut payload, &f.graph, other).fields.insert("characters".into(), cast);
        assert!(matches!(decode(&payload), Err(MarugotoError::GraphConsistency(_))));
    }

    /// A running instance of the fixture game with two joined players.
    fn running(f: &mut Fixture) -> (NodeId, NodeId, NodeId) {
        let host = f.graph.create_player("game@master.com", "");
        let player = f.graph.create_player("test@player.com", "Test");
        let now = Utc::now();
        let instance = f
            .graph
            .start_new_instance(f.game, "ours", host, now, now + Duration::hours(2))
            .expect("instance");
        let first = f.graph.add_player(instance, host, "gm", "host").expect("join");
        let second = f.graph.add_player(instance, player, "pseudonym", "one").expect("join");
        (instance, first, second)
    }

    /// T4.10: The instance window must be ordered on the wire too.
    #[test]
    fn unordered_instance_window_rejected() {
        let mut f = fixture();
        let (instance, _, _) = running(&mut f);
        let mut payload = encode(&f.graph, Some(instance)).expect("encode");
        let fields = &mut record(&mut payload, &f.graph, instance).fields;
        let start = fields.get("start").cloned().expect("start");
        fields.insert("end".into(), start);
        assert!(matches!(decode(&payload), Err(MarugotoError::InvalidTimeWindow)));
    }

    /// T4.11: A player holds one state per instance.
    #[test]
    fn duplicate_player_state_rejected() {
        let mut f = fixture();
        let (instance, first, second) = running(&mut f);
        let mut payload = encode(&f.graph, Some(instance)).expect("encode");
        let host = f.graph.player_state(first).expect("state").player.expect("player");
        let host = reference(&f.graph, host);
        record(&mut payload, &f.graph, second).fields.insert("player".into(), host);
        assert!(matches!(decode(&payload), Err(MarugotoError::GraphConsistency(_))));
    }

    /// T4.12: Progression stays inside the instance's game.
    #[test]
    fn foreign_current_waypoint_rejected() {
        let mut f = fixture();
        let (instance, _, second) = running(&mut f);
        let other = f.graph.create_game("other");
        let away = f.graph.create_waypoint(other, "away").expect("away");
        let mut payload = encode_roots(&f.graph, &[instance, other]).expect("encode");
        let away = reference(&f.graph, away);
        record(&mut payload, &f.graph, second)
            .fields
            .insert("current_waypoint".into(), away);
        assert!(matches!(decode(&payload), Err(MarugotoError::GraphConsistency(_))));
    }

    /// T4.13: An instance always names its game and host.
    #[test]
    fn instance_without_host_rejected() {
        let mut f = fixture();
        let (instance, _, _) = running(&mut f);
        let mut payload = encode(&f.graph, Some(instance)).expect("encode");
        record(&mut payload, &f.graph, instance)
            .fields
            .insert("host".into(), Field::Scalar(Scalar::Null));
        assert!(matches!(decode(&payload), Err(MarugotoError::GraphConsistency(_))));

        let mut payload = encode(&f.graph, Some(instance)).expect("encode");
        record(&mut payload, &f.graph, instance)
            .fields
            .insert("game".into(), Field::Scalar(Scalar::Null));
        assert!(matches!(decode(&payload), Err(MarugotoError::GraphConsistency(_))));
    }

    /// T4.14: Field values of the wrong shape are schema violations.
    #[test]
    fn nested_field_value_rejected() {
        let f = fixture();
        let payload = encode(&f.graph, Some(f.td1)).expect("encode");
        let mut json: serde_json::Value =
            serde_json::from_str(&payload.to_json().expect("json")).expect("parse");
        json["records"][0]["fields"]["title"] = serde_json::json!({ "nested": 1 });
        let text = json.to_string();
        assert!(matches!(
            Payload::from_json(&text),
            Err(MarugotoError::SchemaViolation { .. })
        ));

        json["records"][0]["fields"]["title"] = serde_json::json!([[1]]);
        assert!(matches!(
            Payload::from_json(&json.to_string()),
            Err(MarugotoError::SchemaViolation { .. })
        ));
    }
}

// =============================================================================
// TIER T5: GAME SCENARIOS
// =============================================================================

mod t5_scenarios {
    use super::*;
    use marugoto_core::{dialog_nodes, reachable_tasks, reachable_waypoints};

    /// T5.1: Diamond with a task-laden knot.
    #[test]
    fn diamond_with_tasks() {
        let mut graph = Graph::new();
        let game = graph.create_game("diamond");
        let start = graph.create_waypoint(game, "start").expect("start");
        let w1 = graph.create_waypoint(game, "w1").expect("w1");
        let w2 = graph.create_waypoint(game, "w2").expect("w2");
        let knot = graph.create_waypoint(game, "knot").expect("knot");
        graph.add_destination(start, w1, None).expect("edge");
        graph.add_destination(start, w2, None).expect("edge");
        graph.add_destination(w1, knot, None).expect("edge");
        graph.add_destination(w2, knot, None).expect("edge");
        for i in 1..=3 {
            let task = graph.create_task(format!("t{}", i), "some task", None);
            graph.add_task(knot, task).expect("task");
        }

        let payload = encode(&graph, Some(start)).expect("encode");
        assert_eq!(payload.count_kind(NodeKind::Waypoint.as_str()), 4);
        assert_eq!(payload.count_kind(NodeKind::Task.as_str()), 3);

        let decoded = decode(&payload).expect("decode").expect("root");
        let knot_uid = graph.uid(knot).expect("uid");
        let knot2 = decoded.graph.find_by_uid(knot_uid).expect("knot decoded");
        let knot2 = decoded.graph.waypoint(knot2).expect("waypoint");
        assert!(knot2.destinations.is_empty());
        assert_eq!(knot2.tasks.len(), 3);
    }

    /// T5.2: A dialog's destination crosses into the game graph.
    #[test]
    fn dialog_destination_reaches_waypoint() {
        let mut graph = Graph::new();
        let game = graph.create_game("g");
        let end = graph.create_waypoint(game, "end").expect("end");
        let dialog = graph.create_dialog();
        let d1 = graph.create_speech(dialog, "go").expect("speech");
        graph.set_start(dialog, d1).expect("start");
        graph.set_destination(d1, end).expect("destination");

        let payload = encode(&graph, Some(dialog)).expect("encode");
        assert_eq!(payload.count_kind("waypoint"), 1);
        assert_eq!(payload.count_kind("game"), 0);

        let decoded = decode(&payload).expect("decode").expect("root");
        let d1_2 = decoded.graph.dialog(decoded.root).expect("dialog").start.expect("start");
        let (_, links) = decoded.graph.dialog_node(d1_2).expect("node");
        let end2 = links.destination.expect("destination");
        assert!(structurally_equal(&graph, end, &decoded.graph, end2).expect("compare"));
        assert_eq!(decoded.graph.kind(end2).expect("kind"), NodeKind::Waypoint);
    }

    /// T5.3: Collectors over the reference game.
    #[test]
    fn collectors_on_fixture() {
        let f = fixture();
        let waypoints = reachable_waypoints(&f.graph, f.game).expect("waypoints");
        assert_eq!(waypoints.len(), 4);
        assert!(!waypoints.contains(&f.end));

        let nodes = dialog_nodes(&f.graph, f.dialog).expect("dialog nodes");
        assert_eq!(nodes.len(), 4);
        assert_eq!(nodes[0], f.dialog_start);

        let tasks = reachable_tasks(&f.graph, f.game).expect("tasks");
        assert_eq!(tasks.len(), 4);
        assert!(tasks.contains(&f.td1));
    }

    /// T5.4: Progression persists through a round trip.
    #[test]
    fn progression_survives_round_trip() {
        let mut f = fixture();
        let host = f.graph.create_player("game@master.com", "");
        let player = f.graph.create_player("test@player.com", "");
        let now = Utc::now();
        let instance = f
            .graph
            .start_new_instance(f.game, "ours", host, now, now + Duration::hours(3))
            .expect("instance");
        f.graph.add_player(instance, player, "pseudonym", "one").expect("join");
        f.graph.advance_player(instance, player, f.knot).expect("advance");

        let mut decoded = round_trip(&f.graph, instance);
        let g = &mut decoded.graph;
        let player2 = g.find_by_uid(f.graph.uid(player).expect("uid")).expect("player");
        let state = g.state_of(decoded.root, player2).expect("lookup").expect("joined");
        let knot2 = g.find_by_uid(f.graph.uid(f.knot).expect("uid")).expect("knot");
        assert_eq!(g.player_state(state).expect("state").current_waypoint, Some(knot2));

        let task = g.waypoint(knot2).expect("knot").tasks[0];
        g.complete_task(decoded.root, player2, task).expect("complete after decode");
    }
}
